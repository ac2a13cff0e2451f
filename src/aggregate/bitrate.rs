//! Receiver-side `bitrate.csv` and sender-side `quic.csv`.

use std::path::Path;

use super::metric::MetricKey;
use super::series::MetricSection;
use super::{LoadContext, TraceFormat};
use crate::error::Result;
use crate::reader::records::{BitrateRecord, SentBitrateRecord, BITRATE_ARITY};
use crate::reader::RecordReader;
use crate::stats::TimePoint;

const MILLIS: f64 = 1_000.0;

pub fn load_received(path: &Path, ctx: &LoadContext<'_>) -> Result<MetricSection> {
    let reader = RecordReader::<_, i64, BITRATE_ARITY>::open(path, b',', ctx.settings.parse_policy)?;
    let mut section = ctx.section(TraceFormat::ReceivedBitrate, path);

    for record in reader.map(BitrateRecord::from) {
        let t = record.time as f64 / MILLIS;
        section.push(MetricKey::ReceivedBitrate, TimePoint::new(t, record.bitrate as f64));
        section.push(MetricKey::LinkCapacity, TimePoint::new(t, record.link as f64));
        section.push(MetricKey::Fps, TimePoint::new(t, record.fps as f64));
        section.push(MetricKey::FramesDropped, TimePoint::new(t, record.frames_dropped as f64));
    }
    Ok(section.finish())
}

pub fn load_sent(path: &Path, ctx: &LoadContext<'_>) -> Result<MetricSection> {
    let reader = RecordReader::<_, f64, 2>::open(path, b',', ctx.settings.parse_policy)?;
    let mut section = ctx.section(TraceFormat::SentBitrate, path);

    for record in reader.map(SentBitrateRecord::from) {
        section.push(MetricKey::SentBitrate, TimePoint::new(record.time / MILLIS, record.kbps()));
    }
    Ok(section.finish())
}
