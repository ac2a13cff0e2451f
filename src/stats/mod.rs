//! Statistics primitives shared by every trace format.

pub mod quartile;
pub mod running;
pub mod window;

pub use quartile::{BoxSummary, BucketGrouper, SortedGroup, TimedGroup};
pub use running::{LossStat, Moments, RunningStat};
pub use window::{Normalization, WindowedAccumulator};

/// One sample of a derived series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimePoint {
    pub timestamp: f64,
    pub value: f64,
}

impl TimePoint {
    pub fn new(timestamp: f64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Stable sort by timestamp. Sources are expected to be ordered already,
/// so this is a no-op pass in the common case.
pub fn sort_by_time(points: &mut [TimePoint]) {
    if points.windows(2).all(|w| w[0].timestamp <= w[1].timestamp) {
        return;
    }
    points.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
}
