//! Download subcommand - fetch every published loan-list file not yet on disk

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use libloan_core::{SharedProgress, fmt_bytes, fmt_duration, fmt_num};
use libloan_download::HttpFetcher;

use crate::cmd::print_summary;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// Dataset file (default from config)
    #[arg(short, long)]
    pub dataset: Option<PathBuf>,

    /// Charset the published files are encoded in
    #[arg(long)]
    pub charset: Option<String>,

    /// Number of recent rows used for the ETA
    #[arg(short, long)]
    pub window: Option<usize>,
}

pub fn run(args: DownloadArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let dl_config = libloan_download::Config {
        dataset: args.dataset.unwrap_or_else(|| config.dataset.path.clone()),
        charset: args
            .charset
            .unwrap_or_else(|| config.download.charset.clone()),
        window: args.window.unwrap_or(config.download.window),
        placeholder: config.batch.placeholder(),
    };

    log::info!("Downloading loan lists");
    log::info!("  Dataset: {}", dl_config.dataset.display());
    log::info!("  Charset: {}", dl_config.charset);

    let fetcher = HttpFetcher::new(dl_config.charset.clone());
    let summary = libloan_download::run(&dl_config, fetcher, Some(progress.as_ref()))?;

    print_summary(
        "Download",
        &[
            (
                "Rows",
                format!(
                    "{}/{} selected",
                    fmt_num(summary.selected),
                    fmt_num(summary.total_rows)
                ),
            ),
            ("Downloaded", fmt_num(summary.downloaded)),
            ("Invalidated", fmt_num(summary.invalidated)),
            ("Written", fmt_bytes(summary.bytes_written)),
            ("Dataset rewrites", summary.dataset_rewrites.to_string()),
            ("Time", fmt_duration(summary.elapsed)),
        ],
    );

    Ok(())
}
