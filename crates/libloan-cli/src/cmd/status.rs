//! Status subcommand - per-library download state of the dataset

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{
    Cell, CellAlignment, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
};
use libloan_core::{RowSource, fmt_num, is_complete};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Dataset file (default from config)
    #[arg(short, long)]
    pub dataset: Option<PathBuf>,
}

/// Row counts for one library (or the whole dataset)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counts {
    pub rows: usize,
    pub invalid: usize,
    pub complete: usize,
}

impl Counts {
    /// Valid rows whose file is not yet on disk
    pub fn pending(&self) -> usize {
        self.rows - self.invalid - self.complete
    }

    fn add(&mut self, other: Counts) {
        self.rows += other.rows;
        self.invalid += other.invalid;
        self.complete += other.complete;
    }
}

/// Tally rows per library
pub fn tally(source: &RowSource) -> BTreeMap<String, Counts> {
    let mut libraries: BTreeMap<String, Counts> = BTreeMap::new();
    for row in source.rows() {
        let counts = libraries.entry(row.source_name.clone()).or_default();
        counts.rows += 1;
        if !row.valid_url {
            counts.invalid += 1;
        } else if is_complete(&source.resolve(row)) {
            counts.complete += 1;
        }
    }
    libraries
}

pub fn run(args: StatusArgs, config: &Config) -> Result<()> {
    let dataset = args.dataset.unwrap_or_else(|| config.dataset.path.clone());
    let source = RowSource::load(&dataset)
        .with_context(|| format!("Failed to load dataset {}", dataset.display()))?;

    if source.is_empty() {
        eprintln!("Dataset {} has no rows.", dataset.display());
        return Ok(());
    }

    let libraries = tally(&source);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Library").fg(Color::Cyan),
            Cell::new("Rows").fg(Color::Cyan),
            Cell::new("Complete").fg(Color::Cyan),
            Cell::new("Pending").fg(Color::Cyan),
            Cell::new("Invalid").fg(Color::Cyan),
        ]);

    let mut total = Counts::default();
    for (library, counts) in &libraries {
        total.add(*counts);
        table.add_row(counts_row(Cell::new(library), counts));
    }
    table.add_row(counts_row(Cell::new("Total").fg(Color::Yellow), &total));

    eprintln!("\n{table}");
    eprintln!(
        "{} libraries, {} rows in {}",
        fmt_num(libraries.len()),
        fmt_num(total.rows),
        dataset.display()
    );
    Ok(())
}

fn counts_row(label: Cell, counts: &Counts) -> Vec<Cell> {
    let num = |n: usize| Cell::new(fmt_num(n)).set_alignment(CellAlignment::Right);
    let invalid = if counts.invalid > 0 {
        num(counts.invalid).fg(Color::Red)
    } else {
        num(0)
    };
    vec![
        label,
        num(counts.rows),
        num(counts.complete),
        num(counts.pending()),
        invalid,
    ]
}
