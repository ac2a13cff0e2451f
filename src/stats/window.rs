//! Trailing time-window accumulation.
//!
//! [`WindowedAccumulator`] turns discrete per-event values (bytes sent,
//! loss events) into a smoothed series by summing everything that falls in
//! the last `window` time units. Eviction pops from the front of a deque so
//! each entry is added and removed once.

use std::collections::VecDeque;

use super::TimePoint;

/// How the running sum is turned into an emitted value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Normalization {
    /// Multiply the sum by `base_unit / window` (bytes to kbps, say).
    Rate(f64),
    /// Emit the raw sum, for pure event counts.
    Count,
}

#[derive(Debug, Clone)]
pub struct WindowedAccumulator {
    window: f64,
    time_scale: f64,
    normalization: Normalization,
    sum: f64,
    entries: VecDeque<(f64, f64)>, // (timestamp, value), pushed in arrival order
    regressions: usize,
}

impl WindowedAccumulator {
    pub fn new(window: f64, time_scale: f64, normalization: Normalization) -> Self {
        Self {
            window,
            time_scale,
            normalization,
            sum: 0.0,
            entries: VecDeque::new(),
            regressions: 0,
        }
    }

    /// Rate accumulator whose factor is `base_unit / window`.
    pub fn rate(window: f64, time_scale: f64, base_unit: f64) -> Self {
        Self::new(window, time_scale, Normalization::Rate(base_unit / window))
    }

    pub fn count(window: f64, time_scale: f64) -> Self {
        Self::new(window, time_scale, Normalization::Count)
    }

    /// Adds `value` at `timestamp` and returns the emitted point.
    ///
    /// Timestamps must be non-decreasing. Entries older than
    /// `timestamp - window` are evicted first, so the running sum covers
    /// `[timestamp - window, timestamp]`. A timestamp that goes backwards
    /// is still added but the sum keeps the newer entries; such points are
    /// counted in [`regressions`](Self::regressions).
    pub fn accumulate(&mut self, timestamp: f64, value: f64) -> TimePoint {
        if let Some(&(last, _)) = self.entries.back() {
            if timestamp < last {
                self.regressions += 1;
                log::debug!("window input went backwards: {} after {}", timestamp, last);
            }
        }
        let horizon = timestamp - self.window;
        while let Some(&(ts, v)) = self.entries.front() {
            if ts >= horizon {
                break;
            }
            self.sum -= v;
            self.entries.pop_front();
        }

        self.sum += value;
        self.entries.push_back((timestamp, value));

        let emitted = match self.normalization {
            Normalization::Rate(factor) => self.sum * factor,
            Normalization::Count => self.sum,
        };
        TimePoint::new(timestamp / self.time_scale, emitted)
    }

    /// Points whose timestamp was below the previous one.
    pub fn regressions(&self) -> usize {
        self.regressions
    }

    pub fn current_sum(&self) -> f64 {
        self.sum
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn window(&self) -> f64 {
        self.window
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rate_is_normalized_by_window() {
        // 1 s window in µs, bytes to kbps.
        let mut acc = WindowedAccumulator::rate(1_000_000.0, 1_000_000.0, 8_000.0);
        let p = acc.accumulate(0.0, 1000.0);
        assert_eq!(p.timestamp, 0.0);
        assert!((p.value - 8.0).abs() < 1e-9);

        let p = acc.accumulate(500_000.0, 1000.0);
        assert_eq!(p.timestamp, 0.5);
        assert!((p.value - 16.0).abs() < 1e-9);
    }

    #[test]
    fn expired_entries_are_evicted() {
        let mut acc = WindowedAccumulator::count(10.0, 1.0);
        acc.accumulate(0.0, 1.0);
        acc.accumulate(5.0, 1.0);
        // 10 - 10 = 0, entry at 0 is still inside the window
        assert_eq!(acc.accumulate(10.0, 1.0).value, 3.0);
        // horizon 1: the entry at 0 goes
        assert_eq!(acc.accumulate(11.0, 1.0).value, 3.0);
        assert_eq!(acc.len(), 3);
        // horizon 20: everything goes except the new entry
        assert_eq!(acc.accumulate(30.0, 0.0).value, 0.0);
        assert_eq!(acc.len(), 1);
    }

    #[test]
    fn count_emits_raw_sum() {
        let mut acc = WindowedAccumulator::count(1_000_000.0, 1_000_000.0);
        acc.accumulate(0.0, 1.0);
        let p = acc.accumulate(1.0, 1.0);
        assert_eq!(p.value, 2.0);
        assert_eq!(acc.normalization(), Normalization::Count);
    }

    #[test]
    fn backwards_timestamps_are_counted() {
        let mut acc = WindowedAccumulator::count(10.0, 1.0);
        acc.accumulate(0.0, 1.0);
        acc.accumulate(20.0, 1.0);
        // horizon -5 evicts nothing; the entry at 20 stays in the sum
        assert_eq!(acc.accumulate(5.0, 1.0).value, 2.0);
        assert_eq!(acc.regressions(), 1);
        acc.accumulate(21.0, 1.0);
        assert_eq!(acc.regressions(), 1);
    }

    proptest! {
        #[test]
        fn sum_matches_entries_in_window(
            steps in prop::collection::vec((0u32..50, 0u32..1000), 1..200),
            window in 1u32..100,
        ) {
            let mut acc = WindowedAccumulator::count(window as f64, 1.0);
            let mut history: Vec<(f64, f64)> = Vec::new();
            let mut ts = 0.0;
            for (dt, value) in steps {
                ts += dt as f64;
                acc.accumulate(ts, value as f64);
                history.push((ts, value as f64));

                let expected: f64 = history
                    .iter()
                    .filter(|(t, _)| *t >= ts - window as f64 && *t <= ts)
                    .map(|(_, v)| v)
                    .sum();
                prop_assert!((acc.current_sum() - expected).abs() < 1e-6);
            }
        }
    }
}
