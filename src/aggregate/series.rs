//! Per-metric results of one loaded trace.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::metric::MetricKey;
use super::TraceFormat;
use crate::stats::{sort_by_time, BoxSummary, LossStat, Moments, RunningStat, TimePoint};

/// Points of one metric of one experiment.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub experiment: PathBuf,
    pub metric: MetricKey,
    pub label: String,
    pub points: Vec<TimePoint>,
}

#[derive(Debug, Clone)]
pub struct MetricData {
    pub series: Series,
    pub summary: Option<Moments>,
    pub boxes: Vec<BoxSummary>,
    stat: RunningStat,
}

impl MetricData {
    fn new(experiment: &Path, metric: MetricKey, label: String) -> Self {
        Self {
            series: Series {
                experiment: experiment.to_path_buf(),
                metric,
                label,
                points: Vec::new(),
            },
            summary: None,
            boxes: Vec::new(),
            stat: RunningStat::new(),
        }
    }

    pub fn key(&self) -> MetricKey {
        self.series.metric
    }

    pub fn points(&self) -> &[TimePoint] {
        &self.series.points
    }

    pub fn is_empty(&self) -> bool {
        self.series.points.is_empty() && self.boxes.is_empty()
    }

    pub fn last(&self) -> Option<TimePoint> {
        self.series.points.last().copied()
    }
}

/// Every metric one trace format declares, plus its loss counters.
#[derive(Debug, Clone)]
pub struct MetricSection {
    pub format: TraceFormat,
    pub source: PathBuf,
    pub loss: Option<LossStat>,
    metrics: BTreeMap<MetricKey, MetricData>,
}

impl MetricSection {
    pub fn new(format: TraceFormat, experiment: &Path, label: &str, source: &Path) -> Self {
        let metrics = format
            .metrics()
            .iter()
            .map(|&key| {
                let name = format!("{} ({})", key.name(), label);
                (key, MetricData::new(experiment, key, name))
            })
            .collect();

        Self {
            format,
            source: source.to_path_buf(),
            loss: None,
            metrics,
        }
    }

    /// Appends a point; keys the format does not declare are ignored.
    pub fn push(&mut self, key: MetricKey, point: TimePoint) {
        match self.metrics.get_mut(&key) {
            Some(data) => {
                data.stat.update(point.value);
                data.series.points.push(point);
            }
            None => log::debug!("{:?} has no {:?} metric", self.format, key),
        }
    }

    pub fn push_box(&mut self, key: MetricKey, summary: BoxSummary) {
        if let Some(data) = self.metrics.get_mut(&key) {
            data.boxes.push(summary);
        }
    }

    /// Sorts every series by time and finalizes the summaries.
    pub fn finish(mut self) -> Self {
        for data in self.metrics.values_mut() {
            sort_by_time(&mut data.series.points);
            data.summary = data.stat.finalize();
        }
        self
    }

    pub fn get(&self, key: MetricKey) -> Option<&MetricData> {
        self.metrics.get(&key)
    }

    pub fn keys(&self) -> impl Iterator<Item = MetricKey> + '_ {
        self.metrics.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricData> {
        self.metrics.values()
    }
}
