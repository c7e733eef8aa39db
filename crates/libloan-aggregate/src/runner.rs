//! Main runner for the aggregation pipeline

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use libloan_core::progress::{ProgressContext, fmt_duration};
use libloan_core::{Batcher, RowSource};

use crate::config::Config;
use crate::summary::SnapshotWriter;
use crate::task::AggregateTask;

/// Aggregation summary
#[derive(Debug)]
pub struct Summary {
    pub total_rows: usize,
    pub selected: usize,
    pub summarized: usize,
    pub parse_failures: usize,
    pub checkpoints: Vec<PathBuf>,
    pub output: Option<PathBuf>,
    pub elapsed: Duration,
}

/// Run the aggregation pipeline over `config.dataset`.
pub fn run(config: &Config, progress: Option<&ProgressContext>) -> Result<Summary> {
    let mut source = RowSource::load(&config.dataset)
        .with_context(|| format!("Failed to load dataset {}", config.dataset.display()))?;
    let total_rows = source.len();

    let output_dir = config
        .output_dir
        .clone()
        .unwrap_or_else(|| source.base_dir().to_path_buf());
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output dir: {}", output_dir.display()))?;

    let task = AggregateTask::new(
        config.sum_columns.clone(),
        config.checkpoint_every,
        SnapshotWriter::new(output_dir, config.output_stem.clone()),
    );
    let mut batcher = Batcher::new(&mut source, task)
        .with_window(config.window)
        .with_placeholder(config.placeholder);
    if let Some(ctx) = progress {
        batcher = batcher.with_progress(ctx);
    }
    let stats = batcher.run().context("Aggregation batch aborted")?;
    let task = batcher.into_task();

    let summary = Summary {
        total_rows,
        selected: stats.selected,
        summarized: task.table().len(),
        parse_failures: task.parse_failures,
        checkpoints: task.checkpoints,
        output: task.output,
        elapsed: stats.elapsed,
    };

    log::info!("=== Aggregation Summary ===");
    log::info!(
        "Files: {}/{} summarized ({} parse failures)",
        summary.summarized,
        summary.selected,
        summary.parse_failures
    );
    log::info!("Checkpoints: {}", summary.checkpoints.len());
    log::info!("Time: {}", fmt_duration(summary.elapsed));

    Ok(summary)
}
