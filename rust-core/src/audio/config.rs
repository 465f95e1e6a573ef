//! Engine configuration
//!
//! Stream format, buffering and the starting values of every processing
//! stage. Loaded from YAML by the host binary; everything has a default so a
//! partial file is fine.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::params::{Preset, StageSettings};
use crate::dsp::biquad::NUM_BANDS;
use crate::dsp::compressor::BandParams;
use crate::error::{ConfigError, ConfigResult};

/// Default sample rate (48kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Default channel count (interleaved stereo)
pub const DEFAULT_CHANNELS: usize = 2;

/// Default frames per callback (4ms @ 48kHz)
pub const DEFAULT_FRAMES_PER_CALLBACK: usize = 192;

/// Default ring capacity, in callback blocks
pub const DEFAULT_RING_BLOCKS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sample_rate: u32,
    pub channels: usize,
    pub frames_per_callback: usize,
    /// Ring buffer capacity as a multiple of one callback block
    pub ring_blocks: usize,
    /// Render-side wait for data; one callback period when unset
    pub read_timeout_ms: Option<u64>,
    /// Linear output scale applied before the limiter
    pub amplification: f32,
    pub stages: StageSettings,
    pub preset: Preset,
    /// Explicit band parameters, overriding `preset`
    pub bands: Option<Vec<BandParams>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            frames_per_callback: DEFAULT_FRAMES_PER_CALLBACK,
            ring_blocks: DEFAULT_RING_BLOCKS,
            read_timeout_ms: None,
            amplification: 1.0,
            stages: StageSettings::default(),
            preset: Preset::default(),
            bands: None,
        }
    }
}

impl EngineConfig {
    /// Default configuration with the given stream format
    pub fn with_format(sample_rate: u32, channels: usize, frames_per_callback: usize) -> Self {
        Self {
            sample_rate,
            channels,
            frames_per_callback,
            ..Self::default()
        }
    }

    /// Check every field; nothing downstream re-validates the format
    pub fn validate(&self) -> ConfigResult<()> {
        if self.sample_rate == 0 {
            return Err(ConfigError::InvalidFormat("sample_rate must be > 0".to_string()));
        }
        if self.channels == 0 {
            return Err(ConfigError::InvalidFormat("channels must be > 0".to_string()));
        }
        if self.frames_per_callback == 0 {
            return Err(ConfigError::InvalidFormat("frames_per_callback must be > 0".to_string()));
        }
        if self.ring_blocks == 0 {
            return Err(ConfigError::InvalidFormat("ring_blocks must be > 0".to_string()));
        }
        if !self.amplification.is_finite() || self.amplification < 0.0 {
            return Err(ConfigError::InvalidAmplification(self.amplification));
        }
        self.stages.validate()?;

        let bands = self.band_params();
        if bands.len() != NUM_BANDS {
            return Err(ConfigError::ParameterCount {
                field: "bands",
                expected: NUM_BANDS,
                actual: bands.len(),
            });
        }
        for band in &bands {
            band.validate()?;
        }
        Ok(())
    }

    /// Starting band parameters: explicit `bands` if given, else the preset
    pub fn band_params(&self) -> Vec<BandParams> {
        match &self.bands {
            Some(bands) => bands.clone(),
            None => self.preset.band_params().to_vec(),
        }
    }

    /// Samples in one interleaved callback block
    pub fn block_samples(&self) -> usize {
        self.frames_per_callback * self.channels
    }

    /// Ring buffer capacity in samples, `None` if it overflows `usize`
    pub fn ring_capacity(&self) -> Option<usize> {
        self.frames_per_callback
            .checked_mul(self.channels)
            .and_then(|block| block.checked_mul(self.ring_blocks))
    }

    /// Duration of one callback block
    pub fn callback_period(&self) -> Duration {
        Duration::from_secs_f64(self.frames_per_callback as f64 / self.sample_rate as f64)
    }

    /// Bounded wait for the render side
    pub fn read_timeout(&self) -> Duration {
        match self.read_timeout_ms {
            Some(ms) => Duration::from_millis(ms),
            None => {
                let period_ms = (self.callback_period().as_secs_f64() * 1000.0).ceil() as u64;
                Duration::from_millis(period_ms.max(1))
            }
        }
    }

    pub fn from_yaml_str(contents: &str) -> ConfigResult<Self> {
        let config: Self =
            serde_yaml::from_str(contents).map_err(|e| ConfigError::Yaml(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Yaml(e.to_string()))
    }
}

/// Load configuration from a YAML file
///
/// A missing file yields the defaults. A file that exists but cannot be read
/// or parsed is an error, so a typo never silently falls back.
pub fn load_config(path: &Path) -> ConfigResult<EngineConfig> {
    log::info!("load_config: Loading from {:?}", path);

    if !path.exists() {
        log::info!("load_config: Config file doesn't exist, using defaults");
        return Ok(EngineConfig::default());
    }

    let contents = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
    let config = EngineConfig::from_yaml_str(&contents)?;
    log::info!("load_config: Successfully loaded config from {:?}", path);
    Ok(config)
}
