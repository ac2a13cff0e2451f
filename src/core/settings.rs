//! Analysis settings loaded from `appsettings.json`.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StatsError};

pub const SETTINGS_FILE: &str = "appsettings.json";

/// What the record reader does with a field that does not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum ParsePolicy {
    /// Unparsable or missing fields become zero, the record is kept.
    #[default]
    ZeroFill,
    /// The whole record is dropped.
    SkipRecord,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalysisSettings {
    /// Sliding window length in trace time units (µs).
    #[serde(rename = "WindowDuration", deserialize_with = "validate_positive_f64", default = "default_window")]
    pub window_duration: f64,
    /// Numerator of the rate normalization factor (`base / window`).
    #[serde(rename = "RateBaseUnit", deserialize_with = "validate_positive_f64", default = "default_base_unit")]
    pub rate_base_unit: f64,
    /// Divisor turning trace timestamps into seconds.
    #[serde(rename = "TimeScale", deserialize_with = "validate_positive_f64", default = "default_time_scale")]
    pub time_scale: f64,
    /// Box-plot bucket width in seconds.
    #[serde(rename = "BucketWidth", deserialize_with = "validate_positive_f64", default = "default_bucket")]
    pub bucket_width: f64,
    #[serde(rename = "ParsePolicy", default)]
    pub parse_policy: ParsePolicy,
    #[serde(rename = "Workers", deserialize_with = "validate_positive_usize", default = "default_workers")]
    pub workers: usize,
}

fn default_window() -> f64 {
    1_000_000.0
}

fn default_base_unit() -> f64 {
    8_000.0
}

fn default_time_scale() -> f64 {
    1_000_000.0
}

fn default_bucket() -> f64 {
    1.0
}

fn default_workers() -> usize {
    4
}

fn validate_positive_f64<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(serde::de::Error::custom("Value must be positive"))
    }
}

fn validate_positive_usize<'de, D>(deserializer: D) -> std::result::Result<usize, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = usize::deserialize(deserializer)?;
    if value > 0 {
        Ok(value)
    } else {
        Err(serde::de::Error::custom("Value must be positive"))
    }
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            window_duration: default_window(),
            rate_base_unit: default_base_unit(),
            time_scale: default_time_scale(),
            bucket_width: default_bucket(),
            parse_policy: ParsePolicy::default(),
            workers: default_workers(),
        }
    }
}

impl AnalysisSettings {
    /// Reads settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_json(&content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!("no settings at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(StatsError::open(path, e)),
        }
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| StatsError::Settings(e.to_string()))
    }

    /// Factor converting a windowed byte sum into kbps.
    pub fn rate_factor(&self) -> f64 {
        self.rate_base_unit / self.window_duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let s = AnalysisSettings::from_json("{}").unwrap();
        assert_eq!(s.window_duration, 1_000_000.0);
        assert_eq!(s.parse_policy, ParsePolicy::ZeroFill);
        assert_eq!(s.workers, 4);
        assert!((s.rate_factor() - 0.008).abs() < 1e-12);
    }

    #[test]
    fn rejects_non_positive_window() {
        let err = AnalysisSettings::from_json(r#"{"WindowDuration": 0}"#).unwrap_err();
        assert!(matches!(err, StatsError::Settings(_)));
    }

    #[test]
    fn reads_policy_and_workers() {
        let s = AnalysisSettings::from_json(r#"{"ParsePolicy": "SkipRecord", "Workers": 2}"#).unwrap();
        assert_eq!(s.parse_policy, ParsePolicy::SkipRecord);
        assert_eq!(s.workers, 2);
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let s = AnalysisSettings::load(&dir.path().join(SETTINGS_FILE)).unwrap();
        assert_eq!(s.bucket_width, 1.0);
    }
}
