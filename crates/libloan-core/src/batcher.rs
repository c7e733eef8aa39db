//! Generic resumable batch driver over a [`RowSource`].
//!
//! A [`BatchTask`] supplies the row predicate and the per-row action; the
//! [`Batcher`] owns iteration order, counting, ETA and failure bookkeeping.
//! Nothing here is persisted: resuming a batch means running it again and
//! letting the predicate skip rows whose work is already on disk.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use indicatif::ProgressBar;

use crate::error::{DatasetError, RowError};
use crate::progress::{ProgressContext, fmt_duration, fmt_num};
use crate::row::Row;
use crate::source::RowSource;
use crate::timing::{DEFAULT_CAPACITY, TimingWindow};

/// Per-item estimate used until the timing window holds an interval
pub const DEFAULT_PLACEHOLDER: Duration = Duration::from_secs(10);

/// Predicate + action pair driven by a [`Batcher`].
///
/// Every method has a default, so a unit task turns the batcher into a pure
/// iteration and ETA instrument.
pub trait BatchTask {
    /// Label used in logs and on the progress bar
    fn name(&self) -> &str {
        "batch"
    }

    /// Whether the row at `index` should be handed to [`BatchTask::process`].
    fn should_process(&self, _index: usize, _row: &Row, _source: &RowSource) -> bool {
        true
    }

    /// Do the row's work. Row-scoped errors are logged and the run continues;
    /// [`RowError::Dataset`] aborts the run.
    fn process(
        &mut self,
        _index: usize,
        _row: &Row,
        _source: &mut RowSource,
    ) -> Result<(), RowError> {
        Ok(())
    }

    /// Snapshot interval in processed rows. `None` disables checkpoints.
    fn checkpoint_every(&self) -> Option<NonZeroUsize> {
        None
    }

    /// Write a snapshot covering the rows processed so far.
    fn checkpoint(&mut self, _span: RowSpan) -> Result<(), DatasetError> {
        Ok(())
    }

    /// Called once after the last row.
    fn finish(&mut self, _stats: &BatchStats) -> Result<(), DatasetError> {
        Ok(())
    }
}

/// Task that selects every row and does nothing with it
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

impl BatchTask for Passthrough {}

/// Inclusive range of dataset indices, `first..=last`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSpan {
    pub first: usize,
    pub last: usize,
}

impl std::fmt::Display for RowSpan {
    /// 1-based, as shown to operators
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}~{}", self.first + 1, self.last + 1)
    }
}

/// Progress report emitted before each selected row is processed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Dataset index of the row about to be processed
    pub index: usize,
    /// Selected rows finished so far
    pub processed: usize,
    /// Cached batch size
    pub size: usize,
    pub eta: Duration,
}

impl Progress {
    pub fn fraction(&self) -> f64 {
        if self.size == 0 {
            return 1.0;
        }
        (self.processed as f64 / self.size as f64).min(1.0)
    }
}

/// Counters from one [`Batcher::run`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchStats {
    /// Rows examined by the predicate
    pub scanned: usize,
    /// Rows handed to `process`
    pub selected: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub checkpoints: usize,
    /// Indices of the first and last selected rows
    pub span: Option<RowSpan>,
    pub elapsed: Duration,
}

/// Drives a [`BatchTask`] over every row of a [`RowSource`] in index order.
pub struct Batcher<'a, T> {
    source: &'a mut RowSource,
    task: T,
    window: TimingWindow,
    placeholder: Duration,
    size: Option<usize>,
    clock: Box<dyn FnMut() -> Instant + 'a>,
    observer: Option<Box<dyn FnMut(&Progress) + 'a>>,
    progress: Option<&'a ProgressContext>,
}

impl<'a, T: BatchTask> Batcher<'a, T> {
    pub fn new(source: &'a mut RowSource, task: T) -> Self {
        Self {
            source,
            task,
            window: TimingWindow::new(DEFAULT_CAPACITY),
            placeholder: DEFAULT_PLACEHOLDER,
            size: None,
            clock: Box::new(Instant::now),
            observer: None,
            progress: None,
        }
    }

    /// Number of recent timestamps kept for the ETA.
    pub fn with_window(mut self, capacity: usize) -> Self {
        self.window = TimingWindow::new(capacity);
        self
    }

    /// Per-row estimate used before two samples exist.
    pub fn with_placeholder(mut self, placeholder: Duration) -> Self {
        self.placeholder = placeholder;
        self
    }

    /// Replace the time source (deterministic tests).
    pub fn with_clock(mut self, clock: impl FnMut() -> Instant + 'a) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Receive every progress report.
    pub fn on_progress(mut self, observer: impl FnMut(&Progress) + 'a) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Draw a progress bar through `ctx` (no-op when not a TTY).
    pub fn with_progress(mut self, ctx: &'a ProgressContext) -> Self {
        self.progress = Some(ctx);
        self
    }

    pub fn task(&self) -> &T {
        &self.task
    }

    pub fn into_task(self) -> T {
        self.task
    }

    pub fn source(&self) -> &RowSource {
        self.source
    }

    /// Number of rows the predicate selects.
    ///
    /// Scanned once on first call and cached for the life of this batcher,
    /// even if row state changes afterwards.
    pub fn size(&mut self) -> usize {
        if let Some(size) = self.size {
            return size;
        }
        log::info!(
            "{}: measuring batch size over {} rows...",
            self.task.name(),
            fmt_num(self.source.len())
        );
        let size = self
            .source
            .rows()
            .iter()
            .enumerate()
            .filter(|(index, row)| self.task.should_process(*index, row, self.source))
            .count();
        log::info!("{}: batch size {}", self.task.name(), fmt_num(size));
        self.size = Some(size);
        size
    }

    /// Process every selected row in index order.
    ///
    /// Row-scoped failures are logged and counted; dataset errors (including
    /// failed checkpoint writes) stop the run and are returned.
    pub fn run(&mut self) -> Result<BatchStats, DatasetError> {
        let size = self.size();
        let started = (self.clock)();
        let name = self.task.name().to_string();
        let checkpoint_every = self.task.checkpoint_every();
        let bar = match self.progress {
            Some(ctx) => ctx.batch_bar(&name, size as u64),
            None => ProgressBar::hidden(),
        };

        log::info!("{name}: starting batch of {}", fmt_num(size));
        let mut stats = BatchStats::default();

        for index in 0..self.source.len() {
            stats.scanned += 1;
            let row = self.source.get(index)?.clone();
            if !self.task.should_process(index, &row, self.source) {
                continue;
            }

            self.window.record((self.clock)());
            let report = Progress {
                index,
                processed: stats.selected,
                size,
                eta: self
                    .window
                    .estimate(size.saturating_sub(stats.selected), self.placeholder),
            };
            self.report(&report, &row, &bar);

            match self.task.process(index, &row, self.source) {
                Ok(()) => stats.succeeded += 1,
                Err(RowError::Dataset(e)) => {
                    bar.abandon();
                    log::error!("{name}: [{}] {}: {e}", index + 1, row.label());
                    return Err(e);
                }
                Err(e) => {
                    stats.failed += 1;
                    log::error!("{name}: [{}] {}: {e}", index + 1, row.label());
                }
            }
            stats.selected += 1;
            bar.inc(1);

            let span = match stats.span {
                Some(span) => RowSpan { last: index, ..span },
                None => RowSpan {
                    first: index,
                    last: index,
                },
            };
            stats.span = Some(span);

            if let Some(every) = checkpoint_every {
                if stats.selected % every.get() == 0 {
                    log::info!("{name}: checkpoint after rows {span}");
                    self.task.checkpoint(span)?;
                    stats.checkpoints += 1;
                }
            }
        }

        stats.elapsed = (self.clock)().saturating_duration_since(started);
        self.task.finish(&stats)?;
        bar.finish_and_clear();

        log::info!(
            "{name}: done. {} processed ({} ok, {} failed) of {} rows in {}",
            fmt_num(stats.selected),
            fmt_num(stats.succeeded),
            fmt_num(stats.failed),
            fmt_num(stats.scanned),
            fmt_duration(stats.elapsed)
        );
        Ok(stats)
    }

    fn report(&mut self, progress: &Progress, row: &Row, bar: &ProgressBar) {
        log::info!(
            "[{}/{}] {:.1}% {}",
            progress.processed + 1,
            progress.size,
            progress.fraction() * 100.0,
            row.label()
        );
        log::info!("eta {}", fmt_duration(progress.eta));
        bar.set_message(format!("{} | eta {}", row.label(), fmt_duration(progress.eta)));
        if let Some(observer) = self.observer.as_mut() {
            observer(progress);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::HashSet;
    use std::fs;
    use std::path::PathBuf;
    use std::rc::Rc;

    use tempfile::TempDir;

    fn dataset(dir: &TempDir, n: usize) -> PathBuf {
        let mut text = String::from("LibraryName,Year,Month,Url,ValidUrl,SaveAt\n");
        for i in 0..n {
            text.push_str(&format!(
                "Lib{i},2023,{},https://example.org/{i},True,out/{i}.csv\n",
                i % 12 + 1
            ));
        }
        let path = dir.path().join("datasource.csv");
        fs::write(&path, text).unwrap();
        path
    }

    /// Selects rows whose destination is missing; records calls.
    #[derive(Default)]
    struct Recorder {
        processed: Vec<usize>,
        fail_on: HashSet<usize>,
        every: Option<NonZeroUsize>,
        checkpoints: Vec<RowSpan>,
        finished: bool,
    }

    impl BatchTask for Recorder {
        fn should_process(&self, _index: usize, row: &Row, source: &RowSource) -> bool {
            !source.resolve(row).exists()
        }

        fn process(&mut self, index: usize, row: &Row, _: &mut RowSource) -> Result<(), RowError> {
            self.processed.push(index);
            if self.fail_on.contains(&index) {
                return Err(RowError::parse(&row.save_at, "boom"));
            }
            Ok(())
        }

        fn checkpoint_every(&self) -> Option<NonZeroUsize> {
            self.every
        }

        fn checkpoint(&mut self, span: RowSpan) -> Result<(), DatasetError> {
            self.checkpoints.push(span);
            Ok(())
        }

        fn finish(&mut self, _: &BatchStats) -> Result<(), DatasetError> {
            self.finished = true;
            Ok(())
        }
    }

    #[test]
    fn size_counts_selected_rows() {
        let dir = TempDir::new().unwrap();
        let mut source = RowSource::load(dataset(&dir, 5)).unwrap();
        fs::create_dir_all(dir.path().join("out")).unwrap();
        fs::write(dir.path().join("out/1.csv"), "x").unwrap();
        fs::write(dir.path().join("out/3.csv"), "x").unwrap();

        let mut batcher = Batcher::new(&mut source, Recorder::default());
        assert_eq!(batcher.size(), 3);
    }

    #[test]
    fn size_is_cached_for_batcher_lifetime() {
        let dir = TempDir::new().unwrap();
        let mut source = RowSource::load(dataset(&dir, 4)).unwrap();
        let mut batcher = Batcher::new(&mut source, Recorder::default());
        assert_eq!(batcher.size(), 4);

        fs::create_dir_all(dir.path().join("out")).unwrap();
        fs::write(dir.path().join("out/0.csv"), "x").unwrap();
        assert_eq!(batcher.size(), 4);

        // a fresh batcher sees the new state
        drop(batcher);
        let mut batcher = Batcher::new(&mut source, Recorder::default());
        assert_eq!(batcher.size(), 3);
    }

    #[test]
    fn run_processes_in_index_order_and_survives_failures() {
        let dir = TempDir::new().unwrap();
        let mut source = RowSource::load(dataset(&dir, 5)).unwrap();
        let task = Recorder {
            fail_on: HashSet::from([1, 3]),
            ..Default::default()
        };
        let mut batcher = Batcher::new(&mut source, task);
        let stats = batcher.run().unwrap();
        let task = batcher.into_task();

        assert_eq!(task.processed, vec![0, 1, 2, 3, 4]);
        assert!(task.finished);
        assert_eq!(stats.selected, 5);
        assert_eq!(stats.succeeded, 3);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.span, Some(RowSpan { first: 0, last: 4 }));
    }

    #[test]
    fn dataset_error_aborts_run() {
        struct Fatal(usize);
        impl BatchTask for Fatal {
            fn process(&mut self, _: usize, _: &Row, _: &mut RowSource) -> Result<(), RowError> {
                self.0 += 1;
                Err(RowError::Dataset(DatasetError::IndexOutOfRange { index: 99, len: 0 }))
            }
        }

        let dir = TempDir::new().unwrap();
        let mut source = RowSource::load(dataset(&dir, 3)).unwrap();
        let mut batcher = Batcher::new(&mut source, Fatal(0));
        assert!(batcher.run().is_err());
        assert_eq!(batcher.task().0, 1);
    }

    #[test]
    fn checkpoints_every_n_processed_rows() {
        let dir = TempDir::new().unwrap();
        let mut source = RowSource::load(dataset(&dir, 7)).unwrap();
        fs::create_dir_all(dir.path().join("out")).unwrap();
        fs::write(dir.path().join("out/2.csv"), "x").unwrap();

        let task = Recorder {
            every: NonZeroUsize::new(3),
            ..Default::default()
        };
        let mut batcher = Batcher::new(&mut source, task);
        let stats = batcher.run().unwrap();
        let task = batcher.into_task();

        // selected: 0,1,3,4,5,6 → checkpoints after the 3rd and 6th
        assert_eq!(stats.checkpoints, 2);
        assert_eq!(
            task.checkpoints,
            vec![RowSpan { first: 0, last: 3 }, RowSpan { first: 0, last: 6 }]
        );
    }

    #[test]
    fn passthrough_selects_everything() {
        let dir = TempDir::new().unwrap();
        let mut source = RowSource::load(dataset(&dir, 4)).unwrap();
        let stats = Batcher::new(&mut source, Passthrough).run().unwrap();
        assert_eq!(stats.selected, 4);
        assert_eq!(stats.scanned, 4);
    }

    #[test]
    fn eta_decreases_for_constant_rate() {
        struct Sleeper(Rc<Cell<Instant>>);
        impl BatchTask for Sleeper {
            fn process(&mut self, _: usize, _: &Row, _: &mut RowSource) -> Result<(), RowError> {
                self.0.set(self.0.get() + Duration::from_secs(1));
                Ok(())
            }
        }

        let dir = TempDir::new().unwrap();
        let mut source = RowSource::load(dataset(&dir, 10)).unwrap();
        let now = Rc::new(Cell::new(Instant::now()));
        let reports = RefCell::new(Vec::new());

        let clock = now.clone();
        Batcher::new(&mut source, Sleeper(now.clone()))
            .with_window(8)
            .with_clock(move || clock.get())
            .on_progress(|p| reports.borrow_mut().push(*p))
            .run()
            .unwrap();

        let reports = reports.into_inner();
        assert_eq!(reports.len(), 10);
        assert_eq!(reports[0].eta, DEFAULT_PLACEHOLDER * 10);
        for pair in reports.windows(2) {
            assert!(pair[1].eta < pair[0].eta, "{pair:?}");
        }
        assert_eq!(reports[9].eta, Duration::from_secs(1));
        assert_eq!(reports[9].processed, 9);
    }

    #[test]
    fn progress_fraction() {
        let p = Progress {
            index: 0,
            processed: 1,
            size: 4,
            eta: Duration::ZERO,
        };
        assert!((p.fraction() - 0.25).abs() < f64::EPSILON);
        let empty = Progress { size: 0, ..p };
        assert_eq!(empty.fraction(), 1.0);
    }

    #[test]
    fn row_span_display_is_one_based() {
        assert_eq!(RowSpan { first: 0, last: 999 }.to_string(), "1~1000");
    }
}
