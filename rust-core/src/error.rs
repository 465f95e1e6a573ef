//! Error types shared by the DSP stages and the engine
//!
//! Configuration errors are returned at the call boundary and never leave
//! partial state behind. Faults raised inside a callback are not errors in
//! the `Result` sense: they are latched on the engine and turned into a
//! `CallbackResult::Stop`.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field}: expected {expected} entries, got {actual}")]
    ParameterCount {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid band edges {low_hz} Hz..{high_hz} Hz (must satisfy 0 < low < high < {nyquist_hz} Hz)")]
    InvalidBandEdges {
        low_hz: f64,
        high_hz: f64,
        nyquist_hz: f64,
    },

    #[error("{field} must be > 0 seconds, got {value}")]
    NonPositiveTime { field: &'static str, value: f32 },

    #[error("Ratio must be finite and > 0, got {0}")]
    InvalidRatio(f32),

    #[error("{field} must be finite")]
    NonFinite { field: &'static str },

    #[error("Channel {channel} out of range for {channels} channel(s)")]
    ChannelOutOfRange { channel: usize, channels: usize },

    #[error("Invalid noise gate: threshold={threshold}, knee={knee} (need 0 <= knee < threshold)")]
    InvalidGate { threshold: f32, knee: f32 },

    #[error("Invalid de-esser: threshold={threshold}, reduction={reduction} (need threshold > 0, 0 < reduction < 1)")]
    InvalidDeEsser { threshold: f32, reduction: f32 },

    #[error("Limiter ceiling must be in (0, 1], got {0}")]
    InvalidCeiling(f32),

    #[error("Amplification must be finite and >= 0, got {0}")]
    InvalidAmplification(f32),

    #[error("Invalid stream format: {0}")]
    InvalidFormat(String),

    #[error("Failed to parse config: {0}")]
    Yaml(String),

    #[error("Failed to read config file: {0}")]
    Io(String),
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to construct engine: {0}")]
    Construction(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Invariant violation detected inside a real-time callback
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Fault {
    #[error("Host delivered no buffer")]
    NullBuffer = 1,

    #[error("Block index out of range for the negotiated frame/channel layout")]
    IndexBounds = 2,
}

impl Fault {
    pub(crate) fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Fault::NullBuffer),
            2 => Some(Fault::IndexBounds),
            _ => None,
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
