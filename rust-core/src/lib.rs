//! Hearing amplification core - real-time multi-band WDRC engine
//!
//! Processing chain: Mic Input → Noise Gate → 4-Band WDRC → De-esser →
//! Amplification → Limiter → Ring Buffer → Output

pub mod audio;
pub mod dsp;
pub mod error;

// Re-export main types
pub use audio::{
    AudioCallback, AudioRingBuffer, CallbackResult, ChannelSelector, Direction, Engine,
    EngineConfig, EngineStats, ProcessingState,
};
pub use dsp::{BandParams, NUM_BANDS};
pub use error::{ConfigError, EngineError, Fault};
