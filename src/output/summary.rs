//! Crawl summary types and console presentation

use serde::Serialize;

/// One page that failed every attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub url: String,
    /// Failure classification (`timeout`, `http-error`, ...)
    pub kind: String,
    pub error: String,
    pub attempts: u32,
    #[serde(skip)]
    pub seq: u64,
}

/// Summary statistics for a crawl
///
/// `total` counts dispatched tasks only; tasks never dispatched because of
/// cancellation are counted in `pending`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    pub total: usize,
    pub succeeded: usize,
    pub skipped_unchanged: usize,
    pub failed: usize,
    /// Failures in enqueue order
    pub failures: Vec<FailureRecord>,
    pub pending: usize,
    pub cancelled: bool,
}

impl CrawlSummary {
    /// Percentage of dispatched pages that ended written or skipped
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.succeeded + self.skipped_unchanged) as f64 / self.total as f64 * 100.0
    }

    /// Process exit status for this run
    ///
    /// `2` when every dispatched page failed, `0` otherwise (including runs
    /// with some failures and runs that dispatched nothing).
    pub fn exit_code(&self) -> i32 {
        if self.total > 0 && self.failed == self.total {
            2
        } else {
            0
        }
    }
}

/// Prints a crawl summary to stdout
pub fn print_summary(summary: &CrawlSummary) {
    println!("=== Crawl Summary ===\n");

    println!("Overview:");
    println!("  Pages dispatched: {}", summary.total);
    println!("  Written: {}", summary.succeeded);
    println!("  Skipped (unchanged): {}", summary.skipped_unchanged);
    println!("  Failed: {}", summary.failed);
    if summary.cancelled {
        println!("  Cancelled with {} pages never dispatched", summary.pending);
    }
    println!();

    if !summary.failures.is_empty() {
        println!("Failures ({}):", summary.failures.len());
        for failure in &summary.failures {
            println!(
                "  - {} [{}] after {} attempt(s): {}",
                failure.url, failure.kind, failure.attempts, failure.error
            );
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} pages)",
        summary.success_rate(),
        summary.succeeded + summary.skipped_unchanged,
        summary.total
    );
}
