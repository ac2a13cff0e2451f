//! Protocol trace events (qlog).
//!
//! Two layouts are accepted: one JSON document with `traces[].events[]`,
//! or one event object per line (JSON-SEQ lines may carry a leading RS
//! byte). Events that do not deserialize are skipped.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, StatsError};

#[derive(Debug, Clone, Deserialize)]
pub struct TraceEvent {
    pub name: String,
    pub time: f64,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    MetricsUpdated,
    /// Batch loss report carrying `lost_packets`.
    PacketsLost,
    PacketSent,
    /// One lost packet.
    PacketLost,
    Other,
}

impl EventKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "recovery:metrics_updated" => EventKind::MetricsUpdated,
            "loss:packets_lost" => EventKind::PacketsLost,
            "transport:packet_sent" => EventKind::PacketSent,
            "transport:packet_lost" | "recovery:packet_lost" => EventKind::PacketLost,
            _ => EventKind::Other,
        }
    }
}

impl TraceEvent {
    pub fn kind(&self) -> EventKind {
        EventKind::from_name(&self.name)
    }

    pub fn field(&self, key: &str) -> Option<f64> {
        self.data.get(key).and_then(Value::as_f64)
    }
}

/// Reads and parses the whole trace; only the open is fatal.
pub fn read_events(path: &Path) -> Result<Vec<TraceEvent>> {
    let content = fs::read(path).map_err(|e| StatsError::open(path, e))?;
    Ok(parse_events(&content))
}

fn strip_line(line: &[u8]) -> &[u8] {
    let line = line.trim_ascii();
    line.strip_prefix(b"\x1e").unwrap_or(line).trim_ascii()
}

pub fn parse_events(content: &[u8]) -> Vec<TraceEvent> {
    if let Ok(doc) = serde_json::from_slice::<Value>(content) {
        if let Some(traces) = doc.get("traces").and_then(Value::as_array) {
            return traces
                .iter()
                .filter_map(|t| t.get("events").and_then(Value::as_array))
                .flatten()
                .filter_map(|ev| match TraceEvent::deserialize(ev) {
                    Ok(event) => Some(event),
                    Err(e) => {
                        log::debug!("skipping trace event: {}", e);
                        None
                    }
                })
                .collect();
        }
    }

    let mut skipped = 0usize;
    let events: Vec<TraceEvent> = content
        .split(|&b| b == b'\n')
        .map(strip_line)
        .filter(|l| !l.is_empty())
        .filter_map(|l| match serde_json::from_slice::<TraceEvent>(l) {
            Ok(event) => Some(event),
            Err(_) => {
                skipped += 1;
                None
            }
        })
        .collect();
    if skipped > 0 {
        log::warn!("skipped {} malformed trace lines", skipped);
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_trace_array_document() {
        let doc = r#"{"qlog_version":"0.3","traces":[{"events":[
            {"name":"recovery:metrics_updated","time":100,"data":{"congestion_window":12000,"bytes_in_flight":3000}},
            {"name":"transport:packet_sent","time":110,"data":{}},
            [1, "broken"]
        ]}]}"#;
        let events = parse_events(doc.as_bytes());
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind(), EventKind::MetricsUpdated);
        assert_eq!(events[0].field("congestion_window"), Some(12000.0));
        assert_eq!(events[1].kind(), EventKind::PacketSent);
    }

    #[test]
    fn reads_json_lines_and_skips_bad_lines() {
        let lines = "\u{1e}{\"qlog_format\":\"JSON-SEQ\"}\n\
                     \u{1e}{\"name\":\"recovery:packet_lost\",\"time\":1.5}\n\
                     not json\n\
                     {\"name\":\"loss:packets_lost\",\"time\":2,\"data\":{\"lost_packets\":3}}\n";
        let events = parse_events(lines.as_bytes());
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind(), EventKind::PacketLost);
        assert_eq!(events[0].time, 1.5);
        assert_eq!(events[1].field("lost_packets"), Some(3.0));
    }

    #[test]
    fn invalid_utf8_line_is_skipped() {
        let mut content = b"{\"name\":\"transport:packet_sent\",\"time\":1}\n".to_vec();
        content.extend_from_slice(b"\x1e{\"name\":\"\xff\xfe\",\"time\":2}\n");
        content.extend_from_slice(b"\x1e{\"name\":\"transport:packet_sent\",\"time\":3}\r\n");
        let events = parse_events(&content);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].time, 3.0);
    }

    #[test]
    fn unreadable_bytes_do_not_fail_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.sqlog");
        fs::write(&path, b"\xff\xfe garbage\n{\"name\":\"recovery:packet_lost\",\"time\":5}\n").unwrap();
        let events = read_events(&path).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), EventKind::PacketLost);
    }

    #[test]
    fn unknown_names_are_other() {
        assert_eq!(EventKind::from_name("transport:packet_received"), EventKind::Other);
    }
}
