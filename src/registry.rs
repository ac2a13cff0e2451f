//! Loss counters shared across every loaded experiment.
//!
//! Experiments are aggregated independently (possibly on worker threads)
//! and notify the registry once they finish. A repeated notification for
//! the same path and source replaces the stored pair.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::aggregate::{ExperimentReport, TraceFormat};
use crate::stats::LossStat;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossSource {
    /// Relay-side packet loss.
    Relay,
    /// QUIC stack loss from the protocol trace.
    Protocol,
}

impl LossSource {
    pub fn from_format(format: TraceFormat) -> Option<Self> {
        match format {
            TraceFormat::Relay => Some(LossSource::Relay),
            TraceFormat::Protocol => Some(LossSource::Protocol),
            TraceFormat::ReceivedBitrate | TraceFormat::SentBitrate => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LossSource::Relay => "relay",
            LossSource::Protocol => "protocol",
        }
    }
}

/// The bar pair shown for one experiment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LossBars {
    pub relay: Option<LossStat>,
    pub protocol: Option<LossStat>,
}

impl LossBars {
    pub fn get(&self, source: LossSource) -> Option<LossStat> {
        match source {
            LossSource::Relay => self.relay,
            LossSource::Protocol => self.protocol,
        }
    }

    fn slot(&mut self, source: LossSource) -> &mut Option<LossStat> {
        match source {
            LossSource::Relay => &mut self.relay,
            LossSource::Protocol => &mut self.protocol,
        }
    }
}

#[derive(Debug, Default)]
pub struct LossRegistry {
    entries: Mutex<BTreeMap<PathBuf, LossBars>>,
}

impl LossRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<PathBuf, LossBars>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn notify(&self, path: &Path, source: LossSource, loss: u64, sent: u64) {
        log::debug!("{} loss for {}: {}/{}", source.name(), path.display(), loss, sent);
        let mut entries = self.lock();
        *entries.entry(path.to_path_buf()).or_default().slot(source) = Some(LossStat::new(loss, sent));
    }

    /// Notifies every loss-bearing section of `report`.
    pub fn record_report(&self, report: &ExperimentReport) {
        for (&format, section) in &report.sections {
            if let (Some(source), Some(loss)) = (LossSource::from_format(format), section.loss) {
                self.notify(&report.path, source, loss.loss, loss.sent);
            }
        }
    }

    pub fn forget(&self, path: &Path) -> Option<LossBars> {
        self.lock().remove(path)
    }

    pub fn get(&self, path: &Path) -> Option<LossBars> {
        self.lock().get(path).copied()
    }

    /// `None` when the entry is absent or nothing was sent.
    pub fn percentage(&self, path: &Path, source: LossSource) -> Option<f64> {
        self.get(path)?.get(source)?.percentage()
    }

    pub fn snapshot(&self) -> Vec<(PathBuf, LossBars)> {
        self.lock().iter().map(|(p, b)| (p.clone(), *b)).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
