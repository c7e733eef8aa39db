//! Main runner for the download pipeline

use std::time::Duration;

use anyhow::{Context, Result};
use libloan_core::progress::{ProgressContext, fmt_bytes, fmt_duration};
use libloan_core::{Batcher, RowSource};

use crate::config::Config;
use crate::task::{DownloadTask, Fetcher};

/// Pipeline execution summary
#[derive(Debug)]
pub struct Summary {
    pub total_rows: usize,
    pub selected: usize,
    pub downloaded: usize,
    pub invalidated: usize,
    pub bytes_written: u64,
    /// Backing-file rewrites caused by invalidated urls
    pub dataset_rewrites: usize,
    pub elapsed: Duration,
}

/// Run the download pipeline over `config.dataset`.
pub fn run<F: Fetcher>(
    config: &Config,
    fetcher: F,
    progress: Option<&ProgressContext>,
) -> Result<Summary> {
    let mut source = RowSource::load(&config.dataset)
        .with_context(|| format!("Failed to load dataset {}", config.dataset.display()))?;
    let total_rows = source.len();

    let mut batcher = Batcher::new(&mut source, DownloadTask::new(fetcher))
        .with_window(config.window)
        .with_placeholder(config.placeholder);
    if let Some(ctx) = progress {
        batcher = batcher.with_progress(ctx);
    }
    let stats = batcher.run().context("Download batch aborted")?;
    let task = batcher.into_task();

    let summary = Summary {
        total_rows,
        selected: stats.selected,
        downloaded: task.downloaded,
        invalidated: task.invalidated,
        bytes_written: task.bytes_written,
        dataset_rewrites: source.revision(),
        elapsed: stats.elapsed,
    };

    log::info!("=== Download Summary ===");
    log::info!(
        "Rows: {}/{} selected, {} downloaded, {} invalidated",
        summary.selected,
        summary.total_rows,
        summary.downloaded,
        summary.invalidated
    );
    log::info!("Written: {}", fmt_bytes(summary.bytes_written));
    log::info!("Time: {}", fmt_duration(summary.elapsed));

    Ok(summary)
}
