//! Per-experiment aggregation.
//!
//! An experiment directory is searched for every [`TraceFormat`]; each file
//! found is handed to the loader the `(format, mode)` table picks, and the
//! finished [`MetricSection`]s are collected into an [`ExperimentReport`].
//! Both load modes fill the same metric keys, so consumers never need to
//! know which one produced a report.

pub mod bitrate;
pub mod boxes;
pub mod info;
pub mod metric;
pub mod protocol;
pub mod relay;
pub mod series;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::settings::AnalysisSettings;
use crate::error::{Result, StatsError};
use crate::stats::{LossStat, Normalization, WindowedAccumulator};
use crate::utils::helpers::{experiment_label, find_file, find_in_dir};

pub use info::ExperimentInfo;
pub use metric::{MetricKey, Unit};
pub use series::{MetricData, MetricSection, Series};

/// Leaf directory name that marks a pre-aggregated result set.
pub const AVERAGE_DIR: &str = "average";

pub const RELAY_TRACE_PREFIX: &str = "quic-relay-";
pub const BITRATE_TRACE: &str = "bitrate.csv";
pub const SENT_BITRATE_TRACE: &str = "quic.csv";
pub const PROTOCOL_TRACE_EXTENSIONS: [&str; 2] = ["qlog", "sqlog"];
pub const RELAY_SUMMARY: &str = "relay.csv";
pub const PROTOCOL_SUMMARY: &str = "protocol.csv";
pub const RELAY_RTT_STATS: &str = "relay_rtt_stats.csv";
pub const RELAY_BITRATE_STATS: &str = "relay_bitrate_stats.csv";
pub const PROTOCOL_RTT_STATS: &str = "protocol_rtt_stats.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadMode {
    /// Raw traces, every record fed through the accumulators.
    PerEvent,
    /// Summary rows already bucketed per time window.
    PreAggregated,
}

impl LoadMode {
    pub fn name(&self) -> &'static str {
        match self {
            LoadMode::PerEvent => "per-event",
            LoadMode::PreAggregated => "pre-aggregated",
        }
    }

    pub fn detect(dir: &Path) -> Self {
        match dir.file_name().and_then(|n| n.to_str()) {
            Some(AVERAGE_DIR) => LoadMode::PreAggregated,
            _ => LoadMode::PerEvent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TraceFormat {
    Relay,
    Protocol,
    ReceivedBitrate,
    SentBitrate,
}

impl TraceFormat {
    pub const ALL: [TraceFormat; 4] = [
        TraceFormat::Relay,
        TraceFormat::Protocol,
        TraceFormat::ReceivedBitrate,
        TraceFormat::SentBitrate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TraceFormat::Relay => "relay",
            TraceFormat::Protocol => "protocol",
            TraceFormat::ReceivedBitrate => "received bitrate",
            TraceFormat::SentBitrate => "sent bitrate",
        }
    }

    pub fn metrics(&self) -> &'static [MetricKey] {
        use MetricKey::*;
        match self {
            TraceFormat::Relay => &[
                MediaBitrate,
                RtxBitrate,
                ProbingBitrate,
                TotalBitrate,
                TargetBitrate,
                Bwe,
                AvailableBitrate,
                Rtt,
                MinRtt,
                FeedbackDelay,
                Loss,
                LossAccumulated,
                RttBox,
                RttInterquartile,
                BitrateBox,
                BitrateInterquartile,
            ],
            TraceFormat::Protocol => &[Rtt, Loss, LossAccumulated, Cwnd, BytesInFlight, RttBox, RttInterquartile],
            TraceFormat::ReceivedBitrate => &[ReceivedBitrate, LinkCapacity, Fps, FramesDropped],
            TraceFormat::SentBitrate => &[SentBitrate],
        }
    }

    fn is_relay_trace(name: &str) -> bool {
        name.starts_with(RELAY_TRACE_PREFIX) && name.ends_with(".csv")
    }

    fn is_protocol_trace(name: &str) -> bool {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| PROTOCOL_TRACE_EXTENSIONS.contains(&e))
    }

    /// Whether `name` is an input of this format in either load mode.
    pub fn recognizes(&self, name: &str) -> bool {
        match self {
            TraceFormat::Relay => Self::is_relay_trace(name) || name == RELAY_SUMMARY,
            TraceFormat::Protocol => Self::is_protocol_trace(name) || name == PROTOCOL_SUMMARY,
            TraceFormat::ReceivedBitrate => name == BITRATE_TRACE,
            TraceFormat::SentBitrate => name == SENT_BITRATE_TRACE,
        }
    }

    /// Input file for this format, `None` when the experiment lacks it.
    pub fn locate(&self, dir: &Path, mode: LoadMode) -> std::io::Result<Option<PathBuf>> {
        match (self, mode) {
            (TraceFormat::Relay, LoadMode::PerEvent) => find_file(dir, Self::is_relay_trace),
            (TraceFormat::Protocol, LoadMode::PerEvent) => find_file(dir, Self::is_protocol_trace),
            (TraceFormat::Relay, LoadMode::PreAggregated) => Ok(find_in_dir(dir, RELAY_SUMMARY)),
            (TraceFormat::Protocol, LoadMode::PreAggregated) => Ok(find_in_dir(dir, PROTOCOL_SUMMARY)),
            (TraceFormat::ReceivedBitrate, _) => Ok(find_in_dir(dir, BITRATE_TRACE)),
            (TraceFormat::SentBitrate, _) => Ok(find_in_dir(dir, SENT_BITRATE_TRACE)),
        }
    }
}

/// What a loader knows about the experiment it is filling.
#[derive(Debug, Clone)]
pub struct LoadContext<'a> {
    pub settings: &'a AnalysisSettings,
    pub experiment: &'a Path,
    pub label: String,
    pub info: ExperimentInfo,
}

impl LoadContext<'_> {
    pub fn section(&self, format: TraceFormat, source: &Path) -> MetricSection {
        MetricSection::new(format, self.experiment, &self.label, source)
    }

    /// Accumulator for `metric` on a trace clock in settings units.
    pub fn accumulator(&self, metric: MetricKey) -> WindowedAccumulator {
        self.accumulator_in(metric, self.settings.time_scale)
    }

    /// Accumulator for a trace clock ticking `units_per_second`.
    pub fn accumulator_in(&self, metric: MetricKey, units_per_second: f64) -> WindowedAccumulator {
        let s = self.settings;
        let window = s.window_duration / s.time_scale * units_per_second;
        let normalization = if metric.is_count() {
            Normalization::Count
        } else {
            // bytes per window to kbps, independent of the trace clock
            Normalization::Rate(s.rate_factor())
        };
        WindowedAccumulator::new(window, units_per_second, normalization)
    }
}

pub type Loader = fn(&Path, &LoadContext<'_>) -> Result<MetricSection>;

/// Loader for one `(format, mode)` pair.
pub fn strategy(format: TraceFormat, mode: LoadMode) -> Loader {
    match (format, mode) {
        (TraceFormat::Relay, LoadMode::PerEvent) => relay::load_trace,
        (TraceFormat::Relay, LoadMode::PreAggregated) => relay::load_summary,
        (TraceFormat::Protocol, LoadMode::PerEvent) => protocol::load_trace,
        (TraceFormat::Protocol, LoadMode::PreAggregated) => protocol::load_summary,
        (TraceFormat::ReceivedBitrate, _) => bitrate::load_received,
        (TraceFormat::SentBitrate, _) => bitrate::load_sent,
    }
}

#[derive(Debug, Clone)]
pub struct ExperimentReport {
    pub path: PathBuf,
    pub label: String,
    pub info: ExperimentInfo,
    pub mode: LoadMode,
    pub sections: BTreeMap<TraceFormat, MetricSection>,
}

impl ExperimentReport {
    pub fn section(&self, format: TraceFormat) -> Option<&MetricSection> {
        self.sections.get(&format)
    }

    pub fn loss(&self, format: TraceFormat) -> Option<LossStat> {
        self.section(format).and_then(|s| s.loss)
    }

    pub fn series(&self) -> impl Iterator<Item = &MetricData> {
        self.sections.values().flat_map(|s| s.iter())
    }
}

/// Loads every trace format found under `dir`.
///
/// A file that exists but cannot be opened aborts this experiment only.
pub fn load_experiment(dir: &Path, settings: &AnalysisSettings) -> Result<ExperimentReport> {
    let mode = LoadMode::detect(dir);
    let ctx = LoadContext {
        settings,
        experiment: dir,
        label: experiment_label(dir),
        info: ExperimentInfo::classify(dir),
    };

    let mut sections = BTreeMap::new();
    for format in TraceFormat::ALL {
        let located = format.locate(dir, mode).map_err(|e| StatsError::open(dir, e))?;
        let Some(path) = located else {
            log::debug!("{}: no {} input", dir.display(), format.name());
            continue;
        };
        log::info!("{}: loading {} from {}", ctx.label, format.name(), path.display());
        let section = strategy(format, mode)(&path, &ctx)?;
        sections.insert(format, section);
    }

    if sections.is_empty() {
        log::warn!("{}: no recognized trace files", dir.display());
    }

    Ok(ExperimentReport {
        path: dir.to_path_buf(),
        label: ctx.label,
        info: ctx.info,
        mode,
        sections,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_leaf_selects_pre_aggregated() {
        assert_eq!(LoadMode::detect(Path::new("/r/mvfst_bbr/average")), LoadMode::PreAggregated);
        assert_eq!(LoadMode::detect(Path::new("/r/average/mvfst_bbr")), LoadMode::PerEvent);
        assert_eq!(LoadMode::detect(Path::new("/r/averages")), LoadMode::PerEvent);
    }

    #[test]
    fn recognizes_inputs_of_both_modes() {
        assert!(TraceFormat::Relay.recognizes("quic-relay-1234.csv"));
        assert!(TraceFormat::Relay.recognizes("relay.csv"));
        assert!(!TraceFormat::Relay.recognizes("quic-relay-1234.txt"));
        assert!(TraceFormat::Protocol.recognizes("client.sqlog"));
        assert!(TraceFormat::Protocol.recognizes("protocol.csv"));
        assert!(TraceFormat::SentBitrate.recognizes("quic.csv"));
        assert!(!TraceFormat::ReceivedBitrate.recognizes("quic.csv"));
    }

    #[test]
    fn loss_accumulator_counts_and_bitrate_accumulator_normalizes() {
        let settings = AnalysisSettings::default();
        let ctx = LoadContext {
            settings: &settings,
            experiment: Path::new("e"),
            label: "e".into(),
            info: ExperimentInfo::default(),
        };

        let mut loss = ctx.accumulator(MetricKey::Loss);
        loss.accumulate(0.0, 1.0);
        assert_eq!(loss.accumulate(10.0, 1.0).value, 2.0);

        let mut media = ctx.accumulator(MetricKey::MediaBitrate);
        // 125000 bytes in a 1 s window is 1000 kbps
        let p = media.accumulate(2_000_000.0, 125_000.0);
        assert_eq!(p.timestamp, 2.0);
        assert!((p.value - 1000.0).abs() < 1e-9);

        // same rate on a millisecond clock
        let mut ms = ctx.accumulator_in(MetricKey::MediaBitrate, 1000.0);
        let p = ms.accumulate(2000.0, 125_000.0);
        assert_eq!(p.timestamp, 2.0);
        assert!((p.value - 1000.0).abs() < 1e-9);
    }
}
