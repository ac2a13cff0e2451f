//! Box and interquartile-mean series from grouped samples.

use std::path::Path;

use super::metric::MetricKey;
use super::series::MetricSection;
use crate::error::Result;
use crate::reader::read_groups;
use crate::stats::{BoxSummary, TimePoint, TimedGroup};

/// Fills `box_key` with one box per non-empty group (its series gets the
/// medians) and `iqm_key` with the interquartile means.
pub fn apply_groups(section: &mut MetricSection, box_key: MetricKey, iqm_key: MetricKey, groups: &[TimedGroup]) {
    for group in groups {
        let Some(summary) = BoxSummary::from_group(format!("{}", group.timestamp), &group.values) else {
            continue;
        };
        section.push(box_key, TimePoint::new(group.timestamp, summary.median));
        section.push_box(box_key, summary);

        if let Some(iqm) = group.values.interquartile_mean() {
            section.push(iqm_key, TimePoint::new(group.timestamp, iqm));
        }
    }
}

/// Same as [`apply_groups`] for a stats-line companion file. A missing
/// file leaves both keys empty.
pub fn apply_stats_file(section: &mut MetricSection, box_key: MetricKey, iqm_key: MetricKey, path: &Path) -> Result<()> {
    if !path.is_file() {
        log::debug!("no stats lines at {}", path.display());
        return Ok(());
    }
    let groups = read_groups(path)?;
    apply_groups(section, box_key, iqm_key, &groups);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::TraceFormat;
    use crate::stats::SortedGroup;

    #[test]
    fn empty_groups_yield_no_box() {
        let mut section = MetricSection::new(TraceFormat::Protocol, Path::new("e"), "e", Path::new("e/t.qlog"));
        let groups = vec![
            TimedGroup {
                timestamp: 0.0,
                values: SortedGroup::from_unsorted(vec![]),
            },
            TimedGroup {
                timestamp: 1.0,
                values: SortedGroup::from_unsorted(vec![30.0, 10.0, 20.0, 40.0]),
            },
        ];
        apply_groups(&mut section, MetricKey::RttBox, MetricKey::RttInterquartile, &groups);

        let boxes = &section.get(MetricKey::RttBox).unwrap().boxes;
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].label, "1");
        assert_eq!(boxes[0].median, 25.0);
        assert_eq!(boxes[0].lower_quartile, 15.0);
        assert_eq!(boxes[0].upper_quartile, 35.0);

        let iqm = section.get(MetricKey::RttInterquartile).unwrap().points();
        assert_eq!(iqm, &[TimePoint::new(1.0, 25.0)]);
    }

    #[test]
    fn missing_stats_file_is_not_an_error() {
        let mut section = MetricSection::new(TraceFormat::Protocol, Path::new("e"), "e", Path::new("e/t.qlog"));
        apply_stats_file(
            &mut section,
            MetricKey::RttBox,
            MetricKey::RttInterquartile,
            Path::new("/nonexistent/protocol_rtt_stats.csv"),
        )
        .unwrap();
        assert!(section.get(MetricKey::RttBox).unwrap().is_empty());
    }
}
