//! Summarize each downloaded loan-list file into one row

use std::num::NonZeroUsize;
use std::path::PathBuf;

use libloan_core::batcher::{BatchStats, BatchTask, RowSpan};
use libloan_core::error::{DatasetError, RowError};
use libloan_core::progress::fmt_bytes;
use libloan_core::{Row, RowSource};

use crate::summary::{SnapshotWriter, SummaryRow, SummaryTable, sum_columns};

/// Selects rows whose destination file exists, sums the configured columns
/// and snapshots the accumulated table periodically and at the end.
#[derive(Debug)]
pub struct AggregateTask {
    sum_columns: Vec<String>,
    checkpoint_every: Option<NonZeroUsize>,
    writer: SnapshotWriter,
    table: SummaryTable,
    pub parse_failures: usize,
    pub checkpoints: Vec<PathBuf>,
    pub output: Option<PathBuf>,
}

impl AggregateTask {
    pub fn new(
        sum_columns: Vec<String>,
        checkpoint_every: Option<NonZeroUsize>,
        writer: SnapshotWriter,
    ) -> Self {
        Self {
            table: SummaryTable::new(sum_columns.clone()),
            sum_columns,
            checkpoint_every,
            writer,
            parse_failures: 0,
            checkpoints: Vec::new(),
            output: None,
        }
    }

    pub fn table(&self) -> &SummaryTable {
        &self.table
    }
}

impl BatchTask for AggregateTask {
    fn name(&self) -> &str {
        "aggregate"
    }

    fn should_process(&self, _index: usize, row: &Row, source: &RowSource) -> bool {
        source.resolve(row).exists()
    }

    fn process(&mut self, _index: usize, row: &Row, source: &mut RowSource) -> Result<(), RowError> {
        let path = source.resolve(row);
        log::debug!(
            "\"{}\" (summary memory {})",
            path.display(),
            fmt_bytes(self.table.approx_bytes())
        );

        let sums = sum_columns(&path, &self.sum_columns).inspect_err(|e| {
            if matches!(e, RowError::Parse { .. }) {
                self.parse_failures += 1;
            }
        })?;
        self.table.push(SummaryRow {
            library: row.source_name.clone(),
            year: row.year,
            month: row.month,
            sums,
        });
        Ok(())
    }

    fn checkpoint_every(&self) -> Option<NonZeroUsize> {
        self.checkpoint_every
    }

    fn checkpoint(&mut self, span: RowSpan) -> Result<(), DatasetError> {
        let path = self.writer.write_checkpoint(&self.table, span)?;
        log::info!("Saved checkpoint \"{}\"", path.display());
        self.checkpoints.push(path);
        Ok(())
    }

    fn finish(&mut self, _stats: &BatchStats) -> Result<(), DatasetError> {
        let path = self.writer.write_final(&self.table)?;
        log::info!(
            "Summarized {} files into \"{}\"",
            self.table.len(),
            path.display()
        );
        self.output = Some(path);
        Ok(())
    }
}
