//! Relay congestion-controller traces.

use std::path::Path;

use super::boxes::{apply_groups, apply_stats_file};
use super::metric::MetricKey;
use super::series::MetricSection;
use super::{LoadContext, TraceFormat, RELAY_BITRATE_STATS, RELAY_RTT_STATS};
use crate::error::Result;
use crate::reader::records::{
    PacketClass, RelayRecord, RelaySummaryRecord, RELAY_ARITY, RELAY_SUMMARY_NARROW, RELAY_SUMMARY_WIDE,
};
use crate::reader::{field_count, RecordReader};
use crate::stats::{BucketGrouper, LossStat, TimePoint};

const TRACE_DELIMITER: u8 = b'|';
const SUMMARY_DELIMITER: u8 = b',';

/// Loads a raw `quic-relay-*.csv` trace, one packet per record.
pub fn load_trace(path: &Path, ctx: &LoadContext<'_>) -> Result<MetricSection> {
    let settings = ctx.settings;
    let mut reader = RecordReader::<_, i64, RELAY_ARITY>::open(path, TRACE_DELIMITER, settings.parse_policy)?;
    let mut section = ctx.section(TraceFormat::Relay, path);

    let mut media = ctx.accumulator(MetricKey::MediaBitrate);
    let mut rtx = ctx.accumulator(MetricKey::RtxBitrate);
    let mut probing = ctx.accumulator(MetricKey::ProbingBitrate);
    let mut total = ctx.accumulator(MetricKey::TotalBitrate);
    let mut loss = ctx.accumulator(MetricKey::Loss);
    let mut loss_stat = LossStat::default();
    let mut rtt_groups = BucketGrouper::new(settings.bucket_width);
    let mut bitrate_groups = BucketGrouper::new(settings.bucket_width);

    for record in reader.by_ref().map(RelayRecord::from) {
        let ts = record.sent_time as f64;
        let secs = ts / settings.time_scale;
        let bytes = record.packet_size as f64;
        let class = record.class();
        let bytes_of = |c: PacketClass| if class == c { bytes } else { 0.0 };

        section.push(MetricKey::MediaBitrate, media.accumulate(ts, bytes_of(PacketClass::Media)));
        section.push(MetricKey::RtxBitrate, rtx.accumulate(ts, bytes_of(PacketClass::Retransmission)));
        section.push(MetricKey::ProbingBitrate, probing.accumulate(ts, bytes_of(PacketClass::Probing)));
        let total_point = total.accumulate(ts, bytes);
        section.push(MetricKey::TotalBitrate, total_point);
        bitrate_groups.push(secs, total_point.value);

        // bps on the wire
        section.push(MetricKey::TargetBitrate, TimePoint::new(secs, record.target as f64 / 1000.0));
        section.push(MetricKey::Bwe, TimePoint::new(secs, record.bwe as f64 / 1000.0));
        section.push(
            MetricKey::AvailableBitrate,
            TimePoint::new(secs, record.available_bitrate as f64 / 1000.0),
        );

        let lost = u64::from(record.is_lost());
        loss_stat.update(lost);
        section.push(MetricKey::Loss, loss.accumulate(ts, lost as f64));
        section.push(MetricKey::LossAccumulated, TimePoint::new(secs, loss_stat.loss as f64));

        if lost == 0 {
            let rtt = record.rtt as f64;
            section.push(MetricKey::Rtt, TimePoint::new(secs, rtt));
            section.push(MetricKey::MinRtt, TimePoint::new(secs, record.min_rtt as f64));
            rtt_groups.push(secs, rtt);

            let delay = record.feedback_ts - record.sent_time;
            if delay >= 0 {
                section.push(MetricKey::FeedbackDelay, TimePoint::new(secs, delay as f64 / 1000.0));
            }
        }
    }

    if reader.skipped() > 0 {
        log::warn!("{}: skipped {} relay records", path.display(), reader.skipped());
    }
    if total.regressions() > 0 {
        log::warn!("{}: {} packets sent out of order", path.display(), total.regressions());
    }

    apply_groups(&mut section, MetricKey::RttBox, MetricKey::RttInterquartile, &rtt_groups.finish());
    apply_groups(
        &mut section,
        MetricKey::BitrateBox,
        MetricKey::BitrateInterquartile,
        &bitrate_groups.finish(),
    );
    section.loss = Some(loss_stat);
    Ok(section.finish())
}

fn summary_rows(path: &Path, ctx: &LoadContext<'_>) -> Result<Vec<RelaySummaryRecord>> {
    let policy = ctx.settings.parse_policy;
    let wide = field_count(path, SUMMARY_DELIMITER)?.is_some_and(|n| n >= RELAY_SUMMARY_WIDE);
    let rows: Vec<RelaySummaryRecord> = if wide {
        RecordReader::<_, f64, RELAY_SUMMARY_WIDE>::open(path, SUMMARY_DELIMITER, policy)?
            .map(RelaySummaryRecord::from_ten)
            .collect()
    } else {
        RecordReader::<_, f64, RELAY_SUMMARY_NARROW>::open(path, SUMMARY_DELIMITER, policy)?
            .map(RelaySummaryRecord::from_nine)
            .collect()
    };
    Ok(rows)
}

/// Loads `average/relay.csv` and its stats-line companions.
pub fn load_summary(path: &Path, ctx: &LoadContext<'_>) -> Result<MetricSection> {
    let mut section = ctx.section(TraceFormat::Relay, path);
    let mut loss_stat = LossStat::default();

    for row in summary_rows(path, ctx)? {
        let t = row.time;
        section.push(MetricKey::MediaBitrate, TimePoint::new(t, row.media / 1000.0));
        section.push(MetricKey::RtxBitrate, TimePoint::new(t, row.rtx / 1000.0));
        section.push(MetricKey::ProbingBitrate, TimePoint::new(t, row.probing / 1000.0));
        section.push(MetricKey::TotalBitrate, TimePoint::new(t, row.total / 1000.0));
        section.push(MetricKey::TargetBitrate, TimePoint::new(t, row.target / 1000.0));
        section.push(MetricKey::Rtt, TimePoint::new(t, row.rtt));
        section.push(MetricKey::MinRtt, TimePoint::new(t, row.min_rtt));
        section.push(MetricKey::Loss, TimePoint::new(t, row.loss));

        loss_stat.add(row.loss.round() as u64, row.sent.round() as u64);
        section.push(MetricKey::LossAccumulated, TimePoint::new(t, loss_stat.loss as f64));
    }

    let dir = path.parent().unwrap_or(Path::new("."));
    apply_stats_file(
        &mut section,
        MetricKey::RttBox,
        MetricKey::RttInterquartile,
        &dir.join(RELAY_RTT_STATS),
    )?;
    apply_stats_file(
        &mut section,
        MetricKey::BitrateBox,
        MetricKey::BitrateInterquartile,
        &dir.join(RELAY_BITRATE_STATS),
    )?;

    section.loss = Some(loss_stat);
    Ok(section.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::ExperimentInfo;
    use crate::core::settings::AnalysisSettings;
    use std::fs;

    fn relay_line(sent_us: i64, size: i64, received: i64, rtt: i64, rtx: i64, probing: i64) -> String {
        // fb_ts|twcc|fb|size|sent|recv|dsent|drecv|delta|bwe|target|avail|rtt|minrtt|flag|rtx|probing
        format!(
            "{}|1|1|{}|{}|{}|0|0|0|900000|800000|700000|{}|10|0|{}|{}\n",
            sent_us + 5000,
            size,
            sent_us,
            received,
            rtt,
            rtx,
            probing
        )
    }

    fn ctx<'a>(settings: &'a AnalysisSettings, dir: &'a Path) -> LoadContext<'a> {
        LoadContext {
            settings,
            experiment: dir,
            label: "exp".into(),
            info: ExperimentInfo::default(),
        }
    }

    #[test]
    fn per_event_trace_splits_classes_and_counts_loss() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quic-relay-1.csv");
        let mut content = String::new();
        content += &relay_line(0, 1000, 1, 20, 0, 0);
        content += &relay_line(100_000, 500, 1, 30, 1, 0);
        content += &relay_line(200_000, 250, 0, 0, 0, 1);
        content += &relay_line(300_000, 250, 1, 40, 0, 0);
        fs::write(&path, content).unwrap();

        let settings = AnalysisSettings::default();
        let section = load_trace(&path, &ctx(&settings, dir.path())).unwrap();

        let total = section.get(MetricKey::TotalBitrate).unwrap();
        assert_eq!(total.points().len(), 4);
        // 2000 bytes inside one second of window
        assert!((total.last().unwrap().value - 16.0).abs() < 1e-9);

        let media = section.get(MetricKey::MediaBitrate).unwrap().last().unwrap();
        assert!((media.value - 10.0).abs() < 1e-9);

        assert_eq!(section.loss, Some(LossStat::new(1, 4)));
        assert_eq!(section.get(MetricKey::Rtt).unwrap().points().len(), 3);
        assert_eq!(section.get(MetricKey::FeedbackDelay).unwrap().points()[0].value, 5.0);
        assert_eq!(section.get(MetricKey::TargetBitrate).unwrap().points()[0].value, 800.0);

        let boxes = &section.get(MetricKey::RttBox).unwrap().boxes;
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].median, 30.0);
    }

    #[test]
    fn nine_and_ten_column_summaries_agree() {
        let dir = tempfile::tempdir().unwrap();
        let settings = AnalysisSettings::default();

        let narrow = dir.path().join("narrow.csv");
        fs::write(&narrow, "1,1000000,200000,0,30,20,1500000,2,100\n").unwrap();
        let wide = dir.path().join("wide.csv");
        fs::write(&wide, "1,1000000,200000,0,1200000,30,20,1500000,2,100\n").unwrap();

        let a = load_summary(&narrow, &ctx(&settings, dir.path())).unwrap();
        let b = load_summary(&wide, &ctx(&settings, dir.path())).unwrap();

        for key in [MetricKey::TotalBitrate, MetricKey::Rtt, MetricKey::Loss, MetricKey::TargetBitrate] {
            assert_eq!(a.get(key).unwrap().points(), b.get(key).unwrap().points(), "{key}");
        }
        assert_eq!(a.get(MetricKey::TotalBitrate).unwrap().points()[0].value, 1200.0);
        assert_eq!(a.loss, Some(LossStat::new(2, 100)));
    }

    #[test]
    fn summary_reads_stats_companions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.csv");
        fs::write(&path, "0,1000,0,0,10,10,1000,0,10\n").unwrap();
        fs::write(dir.path().join(RELAY_RTT_STATS), "0,10,20,30\n1,40\n").unwrap();

        let settings = AnalysisSettings::default();
        let section = load_summary(&path, &ctx(&settings, dir.path())).unwrap();
        let rtt_box = section.get(MetricKey::RttBox).unwrap();
        assert_eq!(rtt_box.boxes.len(), 2);
        assert_eq!(rtt_box.points()[0].value, 20.0);
        assert!(section.get(MetricKey::BitrateBox).unwrap().is_empty());
    }

    #[test]
    fn summary_survives_a_non_utf8_stats_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.csv");
        fs::write(&path, "0,1000,0,0,10,10,1000,0,10\n").unwrap();
        fs::write(dir.path().join(RELAY_RTT_STATS), b"0 10 20\n1 \xff\n2 5 6\n").unwrap();

        let settings = AnalysisSettings::default();
        let section = load_summary(&path, &ctx(&settings, dir.path())).unwrap();
        let rtt_box = section.get(MetricKey::RttBox).unwrap();
        assert_eq!(rtt_box.boxes.len(), 2);
        assert_eq!(rtt_box.points()[1].value, 5.5);
    }
}
