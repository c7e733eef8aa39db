//! Libloan Download - fetch every valid dataset row to its `SaveAt` path
//!
//! Rows whose destination already holds content are skipped, so re-running
//! resumes where the last run stopped. A url that fails once is marked
//! invalid in the dataset and never retried.
//!
//! # Example
//!
//! ```ignore
//! use libloan_download::{Config, HttpFetcher, run};
//!
//! let config = Config {
//!     dataset: "datasource.csv".into(),
//!     ..Default::default()
//! };
//!
//! let summary = run(&config, HttpFetcher::new(&config.charset), None)?;
//! println!("Downloaded {} files", summary.downloaded);
//! ```

pub mod config;
pub mod runner;
pub mod task;

// Re-exports
pub use config::Config;
pub use runner::{Summary, run};
pub use task::{DownloadTask, Fetcher, HttpFetcher};
