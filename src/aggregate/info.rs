//! Experiment classification from directory names.
//!
//! Every path component is split on `_` and each token is compared, case
//! sensitively, against a fixed vocabulary. Tokens outside it are ignored.

use std::collections::HashMap;
use std::path::Path;

use lazy_static::lazy_static;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuicImpl {
    Mvfst,
    QuicGo,
    MsQuic,
    Quiche,
    Udp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CcAlgo {
    Bbr,
    Cubic,
    NewReno,
    Copa,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportMode {
    Stream,
    Datagram,
}

lazy_static! {
    static ref IMPL_TOKENS: HashMap<&'static str, QuicImpl> = HashMap::from([
        ("mvfst", QuicImpl::Mvfst),
        ("quicgo", QuicImpl::QuicGo),
        ("msquic", QuicImpl::MsQuic),
        ("quiche", QuicImpl::Quiche),
        ("udp", QuicImpl::Udp),
    ]);
    static ref CC_TOKENS: HashMap<&'static str, CcAlgo> = HashMap::from([
        ("bbr", CcAlgo::Bbr),
        ("cubic", CcAlgo::Cubic),
        ("newreno", CcAlgo::NewReno),
        ("copa", CcAlgo::Copa),
    ]);
    static ref MODE_TOKENS: HashMap<&'static str, TransportMode> = HashMap::from([
        ("stream", TransportMode::Stream),
        ("dgram", TransportMode::Datagram),
        ("datagram", TransportMode::Datagram),
    ]);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExperimentInfo {
    pub implementation: Option<QuicImpl>,
    pub cc: Option<CcAlgo>,
    pub mode: TransportMode,
}

impl Default for ExperimentInfo {
    fn default() -> Self {
        Self {
            implementation: None,
            cc: None,
            mode: TransportMode::Stream,
        }
    }
}

impl ExperimentInfo {
    /// Later components win when a path names a category twice.
    pub fn classify(path: &Path) -> Self {
        let mut info = Self::default();
        let tokens = path
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .flat_map(|c| c.split('_'));

        for token in tokens {
            if let Some(&i) = IMPL_TOKENS.get(token) {
                info.implementation = Some(i);
            } else if let Some(&cc) = CC_TOKENS.get(token) {
                info.cc = Some(cc);
            } else if let Some(&mode) = MODE_TOKENS.get(token) {
                info.mode = mode;
            }
        }
        info
    }

    pub fn is_stream(&self) -> bool {
        self.mode == TransportMode::Stream
    }

    pub fn impl_str(&self) -> &'static str {
        match self.implementation {
            Some(QuicImpl::Mvfst) => "mvfst",
            Some(QuicImpl::QuicGo) => "quic-go",
            Some(QuicImpl::MsQuic) => "msquic",
            Some(QuicImpl::Quiche) => "quiche",
            Some(QuicImpl::Udp) => "udp",
            None => "-",
        }
    }

    pub fn cc_str(&self) -> &'static str {
        match self.cc {
            Some(CcAlgo::Bbr) => "BBR",
            Some(CcAlgo::Cubic) => "Cubic",
            Some(CcAlgo::NewReno) => "NewReno",
            Some(CcAlgo::Copa) => "Copa",
            None => "-",
        }
    }

    pub fn mode_str(&self) -> &'static str {
        match self.mode {
            TransportMode::Stream => "stream",
            TransportMode::Datagram => "datagram",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_from_directory_tokens() {
        let info = ExperimentInfo::classify(Path::new("/results/2024/mvfst_bbr_dgram_run1"));
        assert_eq!(info.implementation, Some(QuicImpl::Mvfst));
        assert_eq!(info.cc, Some(CcAlgo::Bbr));
        assert_eq!(info.mode, TransportMode::Datagram);
        assert!(!info.is_stream());
    }

    #[test]
    fn matching_is_case_sensitive_and_exact() {
        let info = ExperimentInfo::classify(Path::new("MVFST_bbrv2_cubicish/run"));
        assert_eq!(info, ExperimentInfo::default());
        assert!(info.is_stream());
    }

    #[test]
    fn tokens_spread_over_components() {
        let info = ExperimentInfo::classify(Path::new("quicgo/newreno/stream"));
        assert_eq!(info.impl_str(), "quic-go");
        assert_eq!(info.cc_str(), "NewReno");
        assert_eq!(info.mode_str(), "stream");
    }
}
