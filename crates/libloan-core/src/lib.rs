//! Libloan Core - resumable batch processing over a file-backed dataset
//!
//! This crate provides the dataset model ([`RowSource`]), the generic batch
//! driver ([`Batcher`] + [`BatchTask`]) with trailing-window ETA, and the
//! shared plumbing (HTTP fetch, logging, progress) used by the download and
//! aggregation pipelines.

pub mod batcher;
pub mod catalog;
pub mod error;
pub mod logging;
pub mod progress;
pub mod row;
pub mod source;
pub mod stream;
pub mod timing;

// Re-exports for convenience
pub use batcher::{BatchStats, BatchTask, Batcher, Passthrough, Progress, RowSpan};
pub use catalog::{FeedEntry, build_rows, parse_title, read_feed};
pub use error::{DatasetError, RowError};
pub use logging::{BatchLogger, init_logging};
pub use progress::{ProgressContext, SharedProgress, fmt_bytes, fmt_duration, fmt_num};
pub use row::{Field, FieldValue, Row};
pub use source::{RowSource, is_complete, write_atomic};
pub use stream::{HttpConfig, StreamError, fetch_text, set_http_config};
pub use timing::TimingWindow;
