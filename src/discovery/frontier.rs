//! The crawl frontier: FIFO queue of URL tasks plus the visited set
//!
//! The frontier is mutated only by the coordinator loop, which makes the
//! check-then-insert on the visited set race free without locking.

use crate::crawler::TaskQueue;
use crate::state::{TaskLedger, TaskState};
use crate::url::{normalize_url, same_origin, PathFilter};
use std::collections::VecDeque;
use tracing::{trace, warn};
use url::Url;

/// How a task entered the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOrigin {
    Sitemap,
    Discovered,
    Listed,
    /// Carried over from an interrupted run
    Resumed,
}

impl TaskOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sitemap => "sitemap",
            Self::Discovered => "discovered",
            Self::Listed => "listed",
            Self::Resumed => "resumed",
        }
    }
}

/// A unit of work: one URL to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTask {
    pub url: Url,
    pub depth: u32,
    pub origin: TaskOrigin,
    /// Enqueue order, used to present results deterministically
    pub seq: u64,
}

/// Frontier limits and link-following policy
#[derive(Debug, Clone)]
pub struct FrontierLimits {
    /// Cap on the number of URLs ever recorded
    pub max_count: usize,
    pub max_depth: Option<u32>,
    /// Whether outbound links of fetched pages are enqueued
    pub follow_links: bool,
}

/// FIFO frontier with an integrated visited set
///
/// Every URL accepted into the queue is registered in a [`TaskLedger`],
/// which doubles as the visited set: a URL is recorded at most once per run.
#[derive(Debug)]
pub struct Frontier {
    queue: VecDeque<UrlTask>,
    ledger: TaskLedger,
    origin: Url,
    filter: PathFilter,
    limits: FrontierLimits,
    next_seq: u64,
}

impl Frontier {
    /// Creates an empty frontier
    ///
    /// `origin` is the site whose links may be followed; off-origin links are
    /// dropped during extension.
    pub fn new(origin: Url, filter: PathFilter, limits: FrontierLimits) -> Self {
        Self {
            queue: VecDeque::new(),
            ledger: TaskLedger::new(),
            origin,
            filter,
            limits,
            next_seq: 0,
        }
    }

    /// Adds a URL at depth 0 without applying the path filter
    ///
    /// Returns false if the URL was already recorded or the cap is reached.
    pub fn seed(&mut self, url: Url, origin: TaskOrigin) -> bool {
        self.push(url, 0, origin)
    }

    fn push(&mut self, url: Url, depth: u32, origin: TaskOrigin) -> bool {
        if self.is_capped() {
            return false;
        }
        if !self.ledger.enqueue(url.as_str()) {
            return false;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push_back(UrlTask {
            url,
            depth,
            origin,
            seq,
        });
        true
    }

    /// Enqueues the qualifying outbound links of a fetched page
    ///
    /// A link qualifies when it parses as an http(s) URL, shares the
    /// frontier's origin, matches the path filter, has not been recorded yet,
    /// and the depth bound (if any) allows `parent.depth + 1`. Returns the
    /// number of new tasks.
    pub fn extend_from(&mut self, parent: &UrlTask, links: &[String]) -> usize {
        if !self.limits.follow_links {
            return 0;
        }

        let depth = parent.depth + 1;
        if let Some(max_depth) = self.limits.max_depth {
            if depth > max_depth {
                return 0;
            }
        }

        let mut added = 0;
        for link in links {
            if self.is_capped() {
                break;
            }

            let url = match normalize_url(link) {
                Ok(url) => url,
                Err(e) => {
                    trace!(link = %link, error = %e, "Dropping malformed link");
                    continue;
                }
            };

            if !same_origin(&url, &self.origin) {
                trace!(link = %url, "Dropping off-origin link");
                continue;
            }
            if !self.filter.matches(&url) {
                trace!(link = %url, filter = self.filter.prefix(), "Dropping link outside path filter");
                continue;
            }

            if self.push(url, depth, TaskOrigin::Discovered) {
                added += 1;
            }
        }
        added
    }

    /// Marks a URL finished by an earlier run as visited
    ///
    /// The URL counts toward the cap but is never dispatched.
    pub fn restore(&mut self, url: &Url, state: TaskState) -> bool {
        if self.is_capped() {
            return false;
        }
        self.ledger.restore(url.as_str(), state)
    }

    /// Records the terminal outcome of a dispatched task
    pub fn complete(&mut self, task: &UrlTask, outcome: TaskState) -> crate::Result<()> {
        self.ledger.transition(task.url.as_str(), outcome)
    }

    pub fn follows_links(&self) -> bool {
        self.limits.follow_links
    }

    /// True once the number of recorded URLs reaches the cap
    pub fn is_capped(&self) -> bool {
        self.ledger.len() >= self.limits.max_count
    }

    /// Number of URLs ever recorded (queued, in flight or finished)
    pub fn visited_len(&self) -> usize {
        self.ledger.len()
    }

    /// Tasks still waiting for dispatch
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn ledger(&self) -> &TaskLedger {
        &self.ledger
    }

    /// URLs currently waiting in the queue, in dispatch order
    pub fn queued_urls(&self) -> Vec<String> {
        self.queue.iter().map(|t| t.url.to_string()).collect()
    }
}

impl TaskQueue for Frontier {
    type Task = UrlTask;

    fn next_task(&mut self) -> Option<UrlTask> {
        let task = self.queue.pop_front()?;
        if let Err(e) = self.ledger.transition(task.url.as_str(), TaskState::Fetching) {
            warn!(url = %task.url, error = %e, "Task dispatched out of order");
        }
        Some(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn frontier(max_count: usize, max_depth: Option<u32>) -> Frontier {
        Frontier::new(
            url("https://example.com/docs/"),
            PathFilter::new("/docs/"),
            FrontierLimits {
                max_count,
                max_depth,
                follow_links: true,
            },
        )
    }

    fn links(paths: &[&str]) -> Vec<String> {
        paths
            .iter()
            .map(|p| format!("https://example.com{}", p))
            .collect()
    }

    #[test]
    fn test_seed_ignores_filter() {
        let mut f = frontier(10, None);
        assert!(f.seed(url("https://example.com/start"), TaskOrigin::Discovered));
        assert_eq!(f.pending(), 1);
    }

    #[test]
    fn test_fifo_order_and_seq() {
        let mut f = frontier(10, None);
        f.seed(url("https://example.com/docs/"), TaskOrigin::Discovered);
        let root = f.next_task().unwrap();
        assert_eq!(root.seq, 0);

        f.extend_from(&root, &links(&["/docs/a", "/docs/b"]));
        let a = f.next_task().unwrap();
        let b = f.next_task().unwrap();
        assert_eq!(a.url.path(), "/docs/a");
        assert_eq!(b.url.path(), "/docs/b");
        assert_eq!(a.depth, 1);
        assert_eq!(b.seq, 2);
        assert!(f.next_task().is_none());
    }

    #[test]
    fn test_links_recorded_once() {
        let mut f = frontier(10, None);
        f.seed(url("https://example.com/docs/"), TaskOrigin::Discovered);
        let root = f.next_task().unwrap();

        let added = f.extend_from(
            &root,
            &links(&["/docs/a", "/docs/a#intro", "/docs/a", "/docs/"]),
        );
        assert_eq!(added, 1);
        assert_eq!(f.visited_len(), 2);
    }

    #[test]
    fn test_filter_and_origin_applied() {
        let mut f = frontier(10, None);
        f.seed(url("https://example.com/docs/"), TaskOrigin::Discovered);
        let root = f.next_task().unwrap();

        let mut found = links(&["/docs/a", "/blog/post"]);
        found.push("https://other.com/docs/b".to_string());
        found.push("not a url".to_string());
        found.push("mailto:team@example.com".to_string());

        assert_eq!(f.extend_from(&root, &found), 1);
        assert_eq!(f.queued_urls(), vec!["https://example.com/docs/a"]);
    }

    #[test]
    fn test_query_preserved_as_distinct_url() {
        let mut f = frontier(10, None);
        f.seed(url("https://example.com/docs/"), TaskOrigin::Discovered);
        let root = f.next_task().unwrap();

        assert_eq!(f.extend_from(&root, &links(&["/docs/a", "/docs/a?v=2"])), 2);
    }

    #[test]
    fn test_max_count_caps_recorded_urls() {
        let mut f = frontier(3, None);
        f.seed(url("https://example.com/docs/"), TaskOrigin::Discovered);

        let mut dispatched = 0;
        let mut n = 0;
        while let Some(task) = f.next_task() {
            dispatched += 1;
            let page_links: Vec<String> = (0..5)
                .map(|_| {
                    n += 1;
                    format!("https://example.com/docs/p{}", n)
                })
                .collect();
            f.extend_from(&task, &page_links);
            f.complete(&task, TaskState::Succeeded).unwrap();
        }

        assert_eq!(dispatched, 3);
        assert_eq!(f.visited_len(), 3);
        assert!(f.is_capped());
    }

    #[test]
    fn test_max_depth() {
        let mut f = frontier(100, Some(1));
        f.seed(url("https://example.com/docs/"), TaskOrigin::Discovered);
        let root = f.next_task().unwrap();
        f.extend_from(&root, &links(&["/docs/a"]));

        let a = f.next_task().unwrap();
        assert_eq!(f.extend_from(&a, &links(&["/docs/a/deeper"])), 0);
    }

    #[test]
    fn test_no_follow() {
        let mut f = Frontier::new(
            url("https://example.com/"),
            PathFilter::allow_all(),
            FrontierLimits {
                max_count: 10,
                max_depth: None,
                follow_links: false,
            },
        );
        f.seed(url("https://example.com/docs/a"), TaskOrigin::Listed);
        let task = f.next_task().unwrap();
        assert_eq!(f.extend_from(&task, &links(&["/docs/b"])), 0);
    }

    #[test]
    fn test_restored_urls_not_enqueued_again() {
        let mut f = frontier(10, None);
        assert!(f.restore(&url("https://example.com/docs/a"), TaskState::Succeeded));
        f.seed(url("https://example.com/docs/b"), TaskOrigin::Resumed);

        let b = f.next_task().unwrap();
        assert_eq!(f.extend_from(&b, &links(&["/docs/a", "/docs/c"])), 1);
        assert_eq!(f.queued_urls(), vec!["https://example.com/docs/c"]);
        assert_eq!(f.visited_len(), 3);
    }

    #[test]
    fn test_dispatch_and_complete_tracks_state() {
        let mut f = frontier(10, None);
        f.seed(url("https://example.com/docs/"), TaskOrigin::Discovered);
        let task = f.next_task().unwrap();
        assert_eq!(
            f.ledger().state_of("https://example.com/docs/"),
            Some(TaskState::Fetching)
        );

        f.complete(&task, TaskState::Failed).unwrap();
        assert!(f.complete(&task, TaskState::Succeeded).is_err());
    }
}
