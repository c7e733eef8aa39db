//! libloan - library loan-list collection and aggregation
//!
//! Builds a dataset of published monthly loan lists, downloads each file
//! once, and sums them into a per-library monthly table. Every batch can be
//! interrupted and rerun; finished rows are skipped.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "libloan")]
#[command(about = "Resumable download and aggregation of library loan lists")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "debug")]
    quiet: bool,

    /// Config file path (default: ./libloan.toml or ~/.config/libloan/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Also append log lines to this file
    #[arg(long, global = true)]
    log_file: Option<std::path::PathBuf>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Build the dataset from a feed of published files
    Catalog(cmd::catalog::CatalogArgs),
    /// Download every valid row whose file is not on disk yet
    Download(cmd::download::DownloadArgs),
    /// Sum downloaded files into a per-library monthly table
    Aggregate(cmd::aggregate::AggregateArgs),
    /// Show per-library download state
    Status(cmd::status::StatusArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = if let Some(path) = &cli.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    // Progress context (TTY auto-detect)
    let progress = Arc::new(libloan_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug; progress bars show activity
    //   non-TTY: info unless --quiet; logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = cli.quiet || (is_tty && !cli.debug);
    let log_file = cli.log_file.as_deref().or(config.logging.file.as_deref());
    libloan_core::init_logging(quiet, cli.debug, multi, log_file).with_context(|| {
        format!(
            "Failed to open log file: {}",
            log_file.map_or_else(String::new, |p| p.display().to_string())
        )
    })?;

    if let Some(path) = &config.source {
        log::debug!("Loaded config from {}", path.display());
    }

    // Apply HTTP settings (config file defaults, CLI overrides)
    let http_config = libloan_core::HttpConfig {
        connect_timeout: Duration::from_secs(config.download.connect_timeout_secs),
        timeout: Duration::from_secs(cli.timeout.unwrap_or(config.download.timeout_secs)),
        user_agent: config.download.user_agent.clone(),
    };
    libloan_core::set_http_config(http_config);

    match cli.command {
        Command::Catalog(args) => cmd::catalog::run(args, &config),
        Command::Download(args) => cmd::download::run(args, &config, &progress),
        Command::Aggregate(args) => cmd::aggregate::run(args, &config, &progress),
        Command::Status(args) => cmd::status::run(args, &config),
        Command::Config => {
            use comfy_table::{
                Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
            };

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Setting").fg(Color::Cyan),
                    Cell::new("Value").fg(Color::Cyan),
                ]);

            table.add_row(vec![
                "Config file",
                &config
                    .source
                    .as_ref()
                    .map_or_else(|| "defaults".to_string(), |p| p.display().to_string()),
            ]);
            table.add_row(vec!["Dataset", &config.dataset.path.display().to_string()]);
            table.add_row(vec!["URL prefix", &config.dataset.url_prefix]);
            table.add_row(vec![
                "ETA placeholder",
                &format!("{}s", config.batch.placeholder_secs),
            ]);
            table.add_row(vec!["Charset", &config.download.charset]);
            table.add_row(vec![
                "Download window",
                &config.download.window.to_string(),
            ]);
            table.add_row(vec![
                "Timeouts",
                &format!(
                    "{}s connect, {}s request",
                    config.download.connect_timeout_secs, config.download.timeout_secs
                ),
            ]);
            table.add_row(vec![
                "User agent",
                config.download.user_agent.as_deref().unwrap_or("default"),
            ]);
            table.add_row(vec![
                "Sum columns",
                &config.aggregate.sum_columns.join(", "),
            ]);
            table.add_row(vec![
                "Checkpoint every",
                &match config.aggregate.checkpoint_every {
                    0 => "disabled".to_string(),
                    n => format!("{n} files"),
                },
            ]);
            table.add_row(vec!["Output stem", &config.aggregate.output_stem]);
            table.add_row(vec![
                "Aggregate window",
                &config.aggregate.window.to_string(),
            ]);
            table.add_row(vec![
                "Log file",
                &config
                    .logging
                    .file
                    .as_ref()
                    .map_or_else(|| "not set".to_string(), |p| p.display().to_string()),
            ]);

            eprintln!("\n{table}");
            Ok(())
        }
    }
}
