//! Aggregation pipeline configuration

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use libloan_core::batcher::DEFAULT_PLACEHOLDER;

/// Book count column of a loan-list file
pub const BOOK_COUNT: &str = "도서권수";
/// Loan count column of a loan-list file
pub const LOAN_COUNT: &str = "대출건수";

/// Configuration for the aggregation pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backing dataset file
    pub dataset: PathBuf,
    /// Where snapshots go. `None` = the dataset's directory
    pub output_dir: Option<PathBuf>,
    /// Snapshot file name prefix
    pub output_stem: String,
    /// Numeric columns summed per file (all required)
    pub sum_columns: Vec<String>,
    /// Checkpoint every N processed rows. `None` disables intermediate snapshots
    pub checkpoint_every: Option<NonZeroUsize>,
    /// Timestamps kept for the ETA
    pub window: usize,
    /// Per-row estimate before the window has an interval
    pub placeholder: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset: PathBuf::from("datasource.csv"),
            output_dir: None,
            output_stem: "도서관별_월간_대출건수".to_string(),
            sum_columns: vec![BOOK_COUNT.to_string(), LOAN_COUNT.to_string()],
            checkpoint_every: NonZeroUsize::new(1000),
            window: 50,
            placeholder: DEFAULT_PLACEHOLDER,
        }
    }
}
