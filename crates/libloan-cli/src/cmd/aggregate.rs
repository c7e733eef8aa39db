//! Aggregate subcommand - monthly loan totals per library

use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use libloan_core::{SharedProgress, fmt_duration, fmt_num};

use crate::cmd::print_summary;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct AggregateArgs {
    /// Dataset file (default from config)
    #[arg(short, long)]
    pub dataset: Option<PathBuf>,

    /// Snapshot directory (default: next to the dataset)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write a checkpoint snapshot every N files (0 = final snapshot only)
    #[arg(short = 'n', long)]
    pub checkpoint_every: Option<usize>,

    /// Number of recent rows used for the ETA
    #[arg(short, long)]
    pub window: Option<usize>,
}

pub fn run(args: AggregateArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let agg = &config.aggregate;
    let agg_config = libloan_aggregate::Config {
        dataset: args.dataset.unwrap_or_else(|| config.dataset.path.clone()),
        output_dir: args.output.or_else(|| agg.output_dir.clone()),
        output_stem: agg.output_stem.clone(),
        sum_columns: agg.sum_columns.clone(),
        checkpoint_every: NonZeroUsize::new(args.checkpoint_every.unwrap_or(agg.checkpoint_every)),
        window: args.window.unwrap_or(agg.window),
        placeholder: config.batch.placeholder(),
    };

    log::info!("Aggregating loan lists");
    log::info!("  Dataset: {}", agg_config.dataset.display());
    log::info!("  Columns: {}", agg_config.sum_columns.join(", "));

    let summary = libloan_aggregate::run(&agg_config, Some(progress.as_ref()))?;

    let output = summary
        .output
        .as_ref()
        .map_or_else(|| "-".to_string(), |p| p.display().to_string());
    print_summary(
        "Aggregate",
        &[
            (
                "Files",
                format!(
                    "{}/{} summarized",
                    fmt_num(summary.summarized),
                    fmt_num(summary.selected)
                ),
            ),
            ("Parse failures", fmt_num(summary.parse_failures)),
            ("Checkpoints", summary.checkpoints.len().to_string()),
            ("Output", output),
            ("Time", fmt_duration(summary.elapsed)),
        ],
    );

    Ok(())
}
