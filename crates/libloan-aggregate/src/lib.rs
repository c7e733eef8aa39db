//! libloan-aggregate: monthly totals per library
//!
//! Streams every downloaded loan-list file once, sums its book and loan
//! counts, and writes the accumulated table as checkpoint snapshots every
//! N files plus a final snapshot.

pub mod config;
pub mod runner;
pub mod summary;
pub mod task;

// Re-exports
pub use config::{BOOK_COUNT, Config, LOAN_COUNT};
pub use runner::{Summary, run};
pub use summary::{SnapshotWriter, SummaryRow, SummaryTable, sum_columns};
pub use task::AggregateTask;
