//! QUIC protocol traces (qlog) and their pre-aggregated summary.

use std::path::Path;

use super::boxes::{apply_groups, apply_stats_file};
use super::info::QuicImpl;
use super::metric::MetricKey;
use super::series::MetricSection;
use super::{LoadContext, TraceFormat, PROTOCOL_RTT_STATS};
use crate::error::Result;
use crate::reader::records::ProtocolSummaryRecord;
use crate::reader::{read_events, EventKind, RecordReader};
use crate::stats::{BucketGrouper, LossStat, TimePoint};

const MICROS: f64 = 1_000_000.0;
const MILLIS: f64 = 1_000.0;

/// Ticks per second of a trace's clock: mvfst logs µs, the others ms.
pub fn trace_clock(path: &Path, ctx: &LoadContext<'_>) -> f64 {
    let parent_is_mvfst = path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("mvfst"));

    if parent_is_mvfst || ctx.info.implementation == Some(QuicImpl::Mvfst) {
        MICROS
    } else {
        MILLIS
    }
}

/// Loads a qlog trace. Times are relative to the first relevant event.
pub fn load_trace(path: &Path, ctx: &LoadContext<'_>) -> Result<MetricSection> {
    let events = read_events(path)?;
    let clock = trace_clock(path, ctx);
    let mut section = ctx.section(TraceFormat::Protocol, path);

    let mut loss = ctx.accumulator_in(MetricKey::Loss, clock);
    let mut rtt_groups = BucketGrouper::new(ctx.settings.bucket_width);
    let mut origin = None;
    let mut sent = 0u64;
    let mut lost = 0u64;
    let mut reported_sent = None;

    for event in &events {
        let kind = event.kind();
        if kind == EventKind::Other {
            continue;
        }
        let t0 = *origin.get_or_insert(event.time);
        let rel = event.time - t0;
        let secs = rel / clock;

        match kind {
            EventKind::MetricsUpdated => {
                if let Some(cwnd) = event.field("congestion_window") {
                    section.push(MetricKey::Cwnd, TimePoint::new(secs, cwnd));
                }
                if let Some(in_flight) = event.field("bytes_in_flight") {
                    section.push(MetricKey::BytesInFlight, TimePoint::new(secs, in_flight));
                }
                if let Some(rtt) = event.field("latest_rtt").or_else(|| event.field("smoothed_rtt")) {
                    section.push(MetricKey::Rtt, TimePoint::new(secs, rtt));
                    rtt_groups.push(secs, rtt);
                }
            }
            EventKind::PacketsLost | EventKind::PacketLost => {
                let n = match kind {
                    EventKind::PacketsLost => event.field("lost_packets").unwrap_or(1.0).max(0.0),
                    _ => 1.0,
                };
                lost += n.round() as u64;
                section.push(MetricKey::Loss, loss.accumulate(rel, n));
                section.push(MetricKey::LossAccumulated, TimePoint::new(secs, lost as f64));
            }
            EventKind::PacketSent => sent += 1,
            EventKind::Other => {}
        }

        if let Some(total) = event.field("total_send_packets") {
            reported_sent = Some(total.max(0.0) as u64);
        }
    }

    if events.is_empty() {
        log::warn!("{}: no protocol events", path.display());
    }

    apply_groups(&mut section, MetricKey::RttBox, MetricKey::RttInterquartile, &rtt_groups.finish());
    section.loss = Some(LossStat::new(lost, reported_sent.unwrap_or(sent)));
    Ok(section.finish())
}

/// Loads `average/protocol.csv` and `protocol_rtt_stats.csv`.
pub fn load_summary(path: &Path, ctx: &LoadContext<'_>) -> Result<MetricSection> {
    let reader = RecordReader::<_, f64, 4>::open(path, b',', ctx.settings.parse_policy)?;
    let mut section = ctx.section(TraceFormat::Protocol, path);
    let mut loss_stat = LossStat::default();

    for row in reader.map(ProtocolSummaryRecord::from) {
        section.push(MetricKey::Rtt, TimePoint::new(row.time, row.rtt));
        section.push(MetricKey::Loss, TimePoint::new(row.time, row.loss));
        loss_stat.add(row.loss.round() as u64, row.sent.round() as u64);
        section.push(MetricKey::LossAccumulated, TimePoint::new(row.time, loss_stat.loss as f64));
    }

    let dir = path.parent().unwrap_or(Path::new("."));
    apply_stats_file(
        &mut section,
        MetricKey::RttBox,
        MetricKey::RttInterquartile,
        &dir.join(PROTOCOL_RTT_STATS),
    )?;

    section.loss = Some(loss_stat);
    Ok(section.finish())
}
