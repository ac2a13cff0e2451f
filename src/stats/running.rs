//! Single-pass mean/variance and loss accounting.

/// Accumulates `n`, `Σx` and `Σx²`; meaningful only through [`finalize`].
///
/// Uses the computational variance formula. Precision is fine for network
/// metrics (ms latencies, kbps rates) but degrades for huge offsets with a
/// tiny spread.
///
/// [`finalize`]: RunningStat::finalize
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningStat {
    n: u64,
    sum: f64,
    sum_sq: f64,
}

/// Finalized population statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moments {
    pub n: u64,
    pub mean: f64,
    pub variance: f64,
    /// `stddev / mean`, absent when the mean is zero.
    pub var_coeff: Option<f64>,
}

impl Moments {
    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }
}

impl RunningStat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, value: f64) {
        self.n += 1;
        self.sum += value;
        self.sum_sq += value * value;
    }

    pub fn count(&self) -> u64 {
        self.n
    }

    /// `None` when no sample was seen.
    pub fn finalize(&self) -> Option<Moments> {
        if self.n == 0 {
            return None;
        }
        let n = self.n as f64;
        let mean = self.sum / n;
        // rounding can push a zero variance slightly negative
        let variance = (self.sum_sq / n - mean * mean).max(0.0);
        let var_coeff = if mean != 0.0 {
            Some(variance.sqrt() / mean)
        } else {
            None
        };

        Some(Moments {
            n: self.n,
            mean,
            variance,
            var_coeff,
        })
    }
}

impl Extend<f64> for RunningStat {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for v in iter {
            self.update(v);
        }
    }
}

/// Lost and sent unit counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LossStat {
    pub loss: u64,
    pub sent: u64,
}

impl LossStat {
    pub fn new(loss: u64, sent: u64) -> Self {
        Self { loss, sent }
    }

    /// Counts one sent unit, `lost` of which were lost (0 or 1).
    pub fn update(&mut self, lost: u64) {
        self.sent += 1;
        self.loss += lost;
    }

    pub fn add(&mut self, loss: u64, sent: u64) {
        self.loss += loss;
        self.sent += sent;
    }

    /// `100 * loss / sent`, `None` when nothing was sent.
    pub fn percentage(&self) -> Option<f64> {
        if self.sent == 0 {
            return None;
        }
        Some(100.0 * self.loss as f64 / self.sent as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn textbook_population_variance() {
        let mut stat = RunningStat::new();
        stat.extend([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let m = stat.finalize().unwrap();
        assert_eq!(m.n, 8);
        assert!((m.mean - 5.0).abs() < 1e-12);
        assert!((m.variance - 4.0).abs() < 1e-12);
        assert!((m.var_coeff.unwrap() - 0.4).abs() < 1e-12);
        assert!((m.std_dev() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn empty_stat_has_no_data() {
        assert!(RunningStat::new().finalize().is_none());
    }

    #[test]
    fn zero_mean_has_no_coefficient() {
        let mut stat = RunningStat::new();
        stat.extend([-1.0, 1.0]);
        let m = stat.finalize().unwrap();
        assert_eq!(m.mean, 0.0);
        assert_eq!(m.variance, 1.0);
        assert!(m.var_coeff.is_none());
    }

    #[test]
    fn constant_samples_never_go_negative() {
        let mut stat = RunningStat::new();
        stat.extend(std::iter::repeat(0.1).take(1000));
        let m = stat.finalize().unwrap();
        assert!(m.variance >= 0.0);
        assert!(m.var_coeff.unwrap().is_finite());
    }

    #[test]
    fn loss_percentage() {
        assert_eq!(LossStat::new(5, 100).percentage(), Some(5.0));
        assert_eq!(LossStat::new(0, 0).percentage(), None);

        let mut loss = LossStat::default();
        for lost in [0, 1, 0, 0] {
            loss.update(lost);
        }
        assert_eq!(loss, LossStat::new(1, 4));
        assert_eq!(loss.percentage(), Some(25.0));
    }
}
