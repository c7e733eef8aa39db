//! Trailing window of completion timestamps for throughput estimates

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Default window for interactive batches
pub const DEFAULT_CAPACITY: usize = 10;

/// Bounded FIFO of recent sample instants. Oldest entries are evicted first.
#[derive(Debug, Clone)]
pub struct TimingWindow {
    samples: VecDeque<Instant>,
    capacity: usize,
}

impl TimingWindow {
    /// `capacity` is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn record(&mut self, at: Instant) {
        self.samples.push_back(at);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn oldest(&self) -> Option<Instant> {
        self.samples.front().copied()
    }

    pub fn newest(&self) -> Option<Instant> {
        self.samples.back().copied()
    }

    /// Mean gap between consecutive samples. Needs at least two samples.
    ///
    /// The span is divided by `len - 1` gaps, not `len` samples, so a
    /// constant rate yields its exact interval and the ETA shrinks each row.
    pub fn mean_interval(&self) -> Option<Duration> {
        let (oldest, newest) = (self.oldest()?, self.newest()?);
        let gaps = self.samples.len().checked_sub(1).filter(|&n| n > 0)?;
        Some(newest.saturating_duration_since(oldest) / gaps as u32)
    }

    /// Time left for `remaining` items at the current pace, or at
    /// `placeholder` per item while the window has no interval yet.
    pub fn estimate(&self, remaining: usize, placeholder: Duration) -> Duration {
        let per_item = self.mean_interval().unwrap_or(placeholder);
        per_item.mul_f64(remaining as f64)
    }
}

impl Default for TimingWindow {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn never_exceeds_capacity() {
        let start = Instant::now();
        let mut window = TimingWindow::new(3);
        for i in 0..10 {
            window.record(start + secs(i));
            assert!(window.len() <= 3);
        }
    }

    #[test]
    fn evicts_oldest_first() {
        let start = Instant::now();
        let mut window = TimingWindow::new(4);
        for i in 0..5 {
            window.record(start + secs(i));
        }
        assert_eq!(window.len(), 4);
        assert_eq!(window.oldest(), Some(start + secs(1)));
        assert_eq!(window.newest(), Some(start + secs(4)));
    }

    #[test]
    fn zero_capacity_clamped() {
        let mut window = TimingWindow::new(0);
        window.record(Instant::now());
        assert_eq!(window.capacity(), 1);
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn mean_interval_needs_two_samples() {
        let start = Instant::now();
        let mut window = TimingWindow::new(8);
        assert_eq!(window.mean_interval(), None);
        window.record(start);
        assert_eq!(window.mean_interval(), None);
        window.record(start + secs(2));
        window.record(start + secs(4));
        assert_eq!(window.mean_interval(), Some(secs(2)));
    }

    #[test]
    fn estimate_uses_placeholder_when_empty() {
        let window = TimingWindow::new(8);
        assert_eq!(window.estimate(3, secs(10)), secs(30));
    }

    #[test]
    fn estimate_scales_with_remaining() {
        let start = Instant::now();
        let mut window = TimingWindow::new(8);
        for i in 0..4 {
            window.record(start + secs(i * 3));
        }
        assert_eq!(window.estimate(5, secs(10)), secs(15));
        assert_eq!(window.estimate(0, secs(10)), Duration::ZERO);
    }
}
