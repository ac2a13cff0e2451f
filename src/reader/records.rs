//! Typed views over the raw record tuples of each log format.

/// One line of a `quic-relay-*.csv` trace (17 `|`-separated integers).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayRecord {
    pub feedback_ts: i64,
    pub twcc_num: i64,
    pub feedback_num: i64,
    pub packet_size: i64,
    /// µs
    pub sent_time: i64,
    pub received_ts: i64,
    pub delta_sent: i64,
    pub delta_received: i64,
    pub delta: i64,
    pub bwe: i64,
    pub target: i64,
    pub available_bitrate: i64,
    pub rtt: i64,
    pub min_rtt: i64,
    pub flag: i64,
    pub rtx: i64,
    pub probing: i64,
}

pub const RELAY_ARITY: usize = 17;

impl From<[i64; RELAY_ARITY]> for RelayRecord {
    fn from(f: [i64; RELAY_ARITY]) -> Self {
        let [feedback_ts, twcc_num, feedback_num, packet_size, sent_time, received_ts, delta_sent, delta_received, delta, bwe, target, available_bitrate, rtt, min_rtt, flag, rtx, probing] =
            f;
        Self {
            feedback_ts,
            twcc_num,
            feedback_num,
            packet_size,
            sent_time,
            received_ts,
            delta_sent,
            delta_received,
            delta,
            bwe,
            target,
            available_bitrate,
            rtt,
            min_rtt,
            flag,
            rtx,
            probing,
        }
    }
}

/// Bitrate class of a relayed packet, from its rtx/probing flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketClass {
    Media,
    Retransmission,
    Probing,
    /// Both flags set; counted only in the total.
    Other,
}

impl RelayRecord {
    pub fn class(&self) -> PacketClass {
        match (self.rtx, self.probing) {
            (0, 0) => PacketClass::Media,
            (1, 0) => PacketClass::Retransmission,
            (0, 1) => PacketClass::Probing,
            _ => PacketClass::Other,
        }
    }

    /// The receiver never reported the packet.
    pub fn is_lost(&self) -> bool {
        self.received_ts == 0
    }
}

/// One line of `bitrate.csv` (8 comma-separated integers).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitrateRecord {
    /// ms
    pub time: i64,
    pub bitrate: i64,
    pub link: i64,
    pub fps: i64,
    pub frames_dropped: i64,
    pub frames_decoded: i64,
    pub key_frames_decoded: i64,
    pub frames_rendered: i64,
}

pub const BITRATE_ARITY: usize = 8;

impl From<[i64; BITRATE_ARITY]> for BitrateRecord {
    fn from(f: [i64; BITRATE_ARITY]) -> Self {
        let [time, bitrate, link, fps, frames_dropped, frames_decoded, key_frames_decoded, frames_rendered] = f;
        Self {
            time,
            bitrate,
            link,
            fps,
            frames_dropped,
            frames_decoded,
            key_frames_decoded,
            frames_rendered,
        }
    }
}

/// One line of `quic.csv`: time (ms) and bytes sent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentBitrateRecord {
    pub time: f64,
    pub bytes: f64,
}

impl SentBitrateRecord {
    pub fn kbps(&self) -> f64 {
        self.bytes * 8.0 / 1000.0
    }
}

impl From<[f64; 2]> for SentBitrateRecord {
    fn from([time, bytes]: [f64; 2]) -> Self {
        Self { time, bytes }
    }
}

/// One row of the pre-aggregated relay summary (`average/relay.csv`).
///
/// The 9-column layout has no total; it is derived from the three classes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelaySummaryRecord {
    /// s
    pub time: f64,
    pub media: f64,
    pub rtx: f64,
    pub probing: f64,
    pub total: f64,
    pub rtt: f64,
    pub min_rtt: f64,
    pub target: f64,
    pub loss: f64,
    pub sent: f64,
}

/// Columns of the summary layout without a total.
pub const RELAY_SUMMARY_NARROW: usize = 9;
/// Columns of the summary layout with a total after the probing rate.
pub const RELAY_SUMMARY_WIDE: usize = 10;

impl RelaySummaryRecord {
    pub fn from_nine(f: [f64; RELAY_SUMMARY_NARROW]) -> Self {
        let [time, media, rtx, probing, rtt, min_rtt, target, loss, sent] = f;
        Self {
            time,
            media,
            rtx,
            probing,
            total: media + rtx + probing,
            rtt,
            min_rtt,
            target,
            loss,
            sent,
        }
    }

    pub fn from_ten(f: [f64; RELAY_SUMMARY_WIDE]) -> Self {
        let [time, media, rtx, probing, total, rtt, min_rtt, target, loss, sent] = f;
        Self {
            time,
            media,
            rtx,
            probing,
            total,
            rtt,
            min_rtt,
            target,
            loss,
            sent,
        }
    }
}

/// One row of `average/protocol.csv`: time (s), mean RTT, loss, sent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProtocolSummaryRecord {
    pub time: f64,
    pub rtt: f64,
    pub loss: f64,
    pub sent: f64,
}

impl From<[f64; 4]> for ProtocolSummaryRecord {
    fn from([time, rtt, loss, sent]: [f64; 4]) -> Self {
        Self { time, rtt, loss, sent }
    }
}
