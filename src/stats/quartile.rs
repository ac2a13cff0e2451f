//! Quartile extraction and box-plot summaries.
//!
//! Everything here works on a [`SortedGroup`], which can only be built by
//! sorting, so the summarizer never sees unsorted input. Quartiles use the
//! exclusive-median (Tukey hinges) method: the lower quartile is the median
//! of `[0, n/2)`, the upper quartile the median of `[n/2 + n%2, n)`.

/// Values sorted ascending. Construct with [`SortedGroup::from_unsorted`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortedGroup(Vec<f64>);

impl SortedGroup {
    pub fn from_unsorted(mut values: Vec<f64>) -> Self {
        values.sort_by(|a, b| a.total_cmp(b));
        Self(values)
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Median of `[begin, end)`; `None` for an empty or out-of-range span.
    pub fn median(&self, begin: usize, end: usize) -> Option<f64> {
        if begin >= end || end > self.0.len() {
            return None;
        }
        let len = end - begin;
        let mid = begin + len / 2;
        if len % 2 == 1 {
            Some(self.0[mid])
        } else {
            Some((self.0[mid - 1] + self.0[mid]) / 2.0)
        }
    }

    pub fn average(&self) -> Option<f64> {
        if self.0.is_empty() {
            return None;
        }
        Some(self.0.iter().sum::<f64>() / self.0.len() as f64)
    }

    /// `(lower, upper)` quartile. A single value is its own quartiles.
    pub fn quartiles(&self) -> Option<(f64, f64)> {
        let count = self.0.len();
        let median = self.median(0, count)?;
        let lower = self.median(0, count / 2).unwrap_or(median);
        let upper = self.median(count / 2 + count % 2, count).unwrap_or(median);
        Some((lower, upper))
    }

    /// Mean of the values within `[Q1, Q3]`, divided by how many qualify.
    pub fn interquartile_mean(&self) -> Option<f64> {
        let (q1, q3) = self.quartiles()?;
        let (sum, n) = self
            .0
            .iter()
            .filter(|&&v| v >= q1 && v <= q3)
            .fold((0.0, 0usize), |(sum, n), &v| (sum + v, n + 1));
        if n == 0 {
            return None;
        }
        Some(sum / n as f64)
    }
}

/// A sorted value group behind one time bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedGroup {
    pub timestamp: f64,
    pub values: SortedGroup,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxSummary {
    pub label: String,
    pub lower_extreme: f64,
    pub upper_extreme: f64,
    pub median: f64,
    pub lower_quartile: f64,
    pub upper_quartile: f64,
}

impl BoxSummary {
    /// `None` for an empty group.
    pub fn from_group(label: impl Into<String>, group: &SortedGroup) -> Option<Self> {
        let values = group.values();
        let count = values.len();
        let median = group.median(0, count)?;
        let (lower_quartile, upper_quartile) = group.quartiles()?;

        Some(Self {
            label: label.into(),
            lower_extreme: values[0],
            upper_extreme: values[count - 1],
            median,
            lower_quartile,
            upper_quartile,
        })
    }
}

/// Collects `(seconds, value)` samples into fixed-width time buckets.
#[derive(Debug, Clone)]
pub struct BucketGrouper {
    width: f64,
    current: Option<(i64, Vec<f64>)>,
    done: Vec<TimedGroup>,
}

impl BucketGrouper {
    pub fn new(width: f64) -> Self {
        Self {
            width,
            current: None,
            done: Vec::new(),
        }
    }

    pub fn push(&mut self, seconds: f64, value: f64) {
        let bucket = (seconds / self.width).floor() as i64;
        match &mut self.current {
            Some((b, values)) if *b == bucket => values.push(value),
            _ => {
                self.flush();
                self.current = Some((bucket, vec![value]));
            }
        }
    }

    fn flush(&mut self) {
        if let Some((bucket, values)) = self.current.take() {
            self.done.push(TimedGroup {
                timestamp: bucket as f64 * self.width,
                values: SortedGroup::from_unsorted(values),
            });
        }
    }

    /// Groups in arrival order. Out-of-order samples land in a fresh
    /// group for their bucket rather than reopening an earlier one.
    pub fn finish(mut self) -> Vec<TimedGroup> {
        self.flush();
        self.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(values: &[f64]) -> SortedGroup {
        SortedGroup::from_unsorted(values.to_vec())
    }

    #[test]
    fn interquartile_mean_divides_by_qualifying_count() {
        let g = group(&[8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0]);
        assert_eq!(g.quartiles(), Some((2.5, 6.5)));
        assert_eq!(g.interquartile_mean(), Some(4.5));
        assert_eq!(g.average(), Some(4.5));
    }

    #[test]
    fn interquartile_mean_differs_from_trimmed_mean() {
        let g = group(&[1.0, 2.0, 3.0, 4.0, 100.0]);
        // q1 = median(0,2) = 1.5, q3 = median(3,5) = 52
        assert_eq!(g.quartiles(), Some((1.5, 52.0)));
        assert_eq!(g.interquartile_mean(), Some(3.0));
    }

    #[test]
    fn box_summary_odd_count() {
        let b = BoxSummary::from_group("t", &group(&[30.0, 10.0, 20.0])).unwrap();
        assert_eq!(b.median, 20.0);
        assert_eq!(b.lower_quartile, 10.0);
        assert_eq!(b.upper_quartile, 30.0);
        assert_eq!(b.lower_extreme, 10.0);
        assert_eq!(b.upper_extreme, 30.0);
    }

    #[test]
    fn box_summary_even_count() {
        let b = BoxSummary::from_group("t", &group(&[10.0, 20.0, 30.0, 40.0])).unwrap();
        assert_eq!(b.median, 25.0);
        assert_eq!(b.lower_quartile, 15.0);
        assert_eq!(b.upper_quartile, 35.0);
    }

    #[test]
    fn single_value_is_its_own_box() {
        let b = BoxSummary::from_group("t", &group(&[7.0])).unwrap();
        assert_eq!(
            (b.lower_extreme, b.lower_quartile, b.median, b.upper_quartile, b.upper_extreme),
            (7.0, 7.0, 7.0, 7.0, 7.0)
        );
        assert_eq!(group(&[7.0]).interquartile_mean(), Some(7.0));
    }

    #[test]
    fn empty_group_is_not_summarized() {
        let g = SortedGroup::default();
        assert!(BoxSummary::from_group("t", &g).is_none());
        assert!(g.average().is_none());
        assert!(g.interquartile_mean().is_none());
        assert!(g.median(0, 0).is_none());
    }

    #[test]
    fn median_rejects_out_of_range() {
        let g = group(&[1.0, 2.0]);
        assert_eq!(g.median(0, 3), None);
        assert_eq!(g.median(1, 2), Some(2.0));
    }

    #[test]
    fn grouper_buckets_by_width() {
        let mut grouper = BucketGrouper::new(1.0);
        grouper.push(0.1, 3.0);
        grouper.push(0.9, 1.0);
        grouper.push(1.0, 5.0);
        grouper.push(2.5, 4.0);
        let groups = grouper.finish();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].timestamp, 0.0);
        assert_eq!(groups[0].values.values(), &[1.0, 3.0]);
        assert_eq!(groups[1].timestamp, 1.0);
        assert_eq!(groups[2].timestamp, 2.0);
    }
}
