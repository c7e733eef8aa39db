//! Catalog subcommand - build the dataset from a published-files feed

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use libloan_core::{RowSource, build_rows, fmt_num, read_feed};

use crate::cmd::print_summary;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct CatalogArgs {
    /// JSON-lines feed of {"name", "url"} entries
    #[arg(short, long)]
    pub feed: PathBuf,

    /// Dataset file to create (default from config)
    #[arg(short, long)]
    pub dataset: Option<PathBuf>,

    /// Origin prepended to relative links
    #[arg(long)]
    pub url_prefix: Option<String>,

    /// Replace an existing dataset (drops recorded url validity)
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: CatalogArgs, config: &Config) -> Result<()> {
    let dataset = args.dataset.unwrap_or_else(|| config.dataset.path.clone());
    if dataset.exists() && !args.force {
        anyhow::bail!(
            "Dataset {} already exists (use --force to rebuild)",
            dataset.display()
        );
    }
    let url_prefix = args
        .url_prefix
        .unwrap_or_else(|| config.dataset.url_prefix.clone());

    let file = File::open(&args.feed)
        .with_context(|| format!("Failed to open feed: {}", args.feed.display()))?;
    let entries = read_feed(BufReader::new(file))
        .with_context(|| format!("Failed to read feed: {}", args.feed.display()))?;
    let total = entries.len();

    let rows = build_rows(entries, &url_prefix);
    let skipped = total - rows.len();
    let source = RowSource::create(&dataset, rows)
        .with_context(|| format!("Failed to write dataset {}", dataset.display()))?;

    log::info!("Wrote {} rows to {}", source.len(), dataset.display());

    print_summary(
        "Catalog",
        &[
            ("Feed entries", fmt_num(total)),
            ("Rows", fmt_num(source.len())),
            ("Skipped", fmt_num(skipped)),
            ("Dataset", dataset.display().to_string()),
        ],
    );

    Ok(())
}
