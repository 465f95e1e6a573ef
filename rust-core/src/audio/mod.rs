//! Audio buffering, parameter sharing and the callback engine

pub mod buffer;
pub mod config;
pub mod engine;
pub mod params;

#[cfg(feature = "host")]
pub mod device;
#[cfg(feature = "host")]
pub mod host;

pub use buffer::AudioRingBuffer;
pub use config::{load_config, EngineConfig};
pub use engine::{AudioCallback, CallbackResult, Direction, Engine, EngineStats, ProcessingState};
pub use params::{ChannelSelector, ParameterSet, Preset, SharedParameters, StageSettings};

#[cfg(feature = "host")]
pub use device::{list_input_devices, list_output_devices, DeviceInfo};
#[cfg(feature = "host")]
pub use host::{HostError, HostStreams};
