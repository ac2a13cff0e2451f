//! Metric identities.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricKey {
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
    Cwnd,
    BytesInFlight,
    ReceivedBitrate,
    LinkCapacity,
    Fps,
    FramesDropped,
    SentBitrate,
    RttBox,
    RttInterquartile,
    BitrateBox,
    BitrateInterquartile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Kbps,
    Millis,
    Bytes,
    Packets,
    FramesPerSecond,
    Frames,
}

impl Unit {
    pub fn label(&self) -> &'static str {
        match self {
            Unit::Kbps => "kbps",
            Unit::Millis => "ms",
            Unit::Bytes => "bytes",
            Unit::Packets => "packets",
            Unit::FramesPerSecond => "fps",
            Unit::Frames => "frames",
        }
    }
}

impl MetricKey {
    pub fn name(&self) -> &'static str {
        match self {
            MetricKey::MediaBitrate => "Media",
            MetricKey::RtxBitrate => "RTX",
            MetricKey::ProbingBitrate => "Probing",
            MetricKey::TotalBitrate => "Total",
            MetricKey::TargetBitrate => "Target",
            MetricKey::Bwe => "Bwe",
            MetricKey::AvailableBitrate => "Available bitrate",
            MetricKey::Rtt => "RTT",
            MetricKey::MinRtt => "Min rtt",
            MetricKey::FeedbackDelay => "Feedback delay",
            MetricKey::Loss => "Loss",
            MetricKey::LossAccumulated => "Loss accumulated",
            MetricKey::Cwnd => "Cwnd",
            MetricKey::BytesInFlight => "Bytes in flight",
            MetricKey::ReceivedBitrate => "Received bitrate",
            MetricKey::LinkCapacity => "Link",
            MetricKey::Fps => "FPS",
            MetricKey::FramesDropped => "Frames dropped",
            MetricKey::SentBitrate => "QUIC sent bitrate",
            MetricKey::RttBox => "RTT box",
            MetricKey::RttInterquartile => "RTT interquartile mean",
            MetricKey::BitrateBox => "Bitrate box",
            MetricKey::BitrateInterquartile => "Bitrate interquartile mean",
        }
    }

    pub fn unit(&self) -> Unit {
        match self {
            MetricKey::MediaBitrate
            | MetricKey::RtxBitrate
            | MetricKey::ProbingBitrate
            | MetricKey::TotalBitrate
            | MetricKey::TargetBitrate
            | MetricKey::Bwe
            | MetricKey::AvailableBitrate
            | MetricKey::ReceivedBitrate
            | MetricKey::LinkCapacity
            | MetricKey::SentBitrate
            | MetricKey::BitrateBox
            | MetricKey::BitrateInterquartile => Unit::Kbps,
            MetricKey::Rtt
            | MetricKey::MinRtt
            | MetricKey::FeedbackDelay
            | MetricKey::RttBox
            | MetricKey::RttInterquartile => Unit::Millis,
            MetricKey::Loss | MetricKey::LossAccumulated => Unit::Packets,
            MetricKey::Cwnd | MetricKey::BytesInFlight => Unit::Bytes,
            MetricKey::Fps => Unit::FramesPerSecond,
            MetricKey::FramesDropped => Unit::Frames,
        }
    }

    /// Windowed as a raw event count instead of a normalized rate.
    pub fn is_count(&self) -> bool {
        matches!(self, MetricKey::Loss)
    }

    /// Carries box summaries; its series holds the bucket medians.
    pub fn is_box(&self) -> bool {
        matches!(self, MetricKey::RttBox | MetricKey::BitrateBox)
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
