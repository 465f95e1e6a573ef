//! Wide dynamic range compressor (WDRC) with a peak envelope follower
//!
//! One `Compressor` exists per (band, channel). It runs sample by sample so
//! attack and release behave the same whether a transient lands at the
//! start or the end of a callback block.
//!
//! Parameters live in `BandParams` (user units) and are turned into
//! `BandCoefficients` when they are updated, so the audio thread only does
//! multiplies, one compare and one `powf` per sample.

use serde::{Deserialize, Serialize};

use super::util;
use crate::error::{ConfigError, ConfigResult};

/// User-facing compression parameters for one (band, channel)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BandParams {
    /// Threshold in dBFS above which the band is compressed
    pub threshold_db: f32,
    /// Compression ratio; 1.0 = no compression, < 1.0 expands
    pub ratio: f32,
    /// Envelope attack time constant in seconds
    pub attack_seconds: f32,
    /// Envelope release time constant in seconds
    pub release_seconds: f32,
    /// Band gain in dB
    pub gain_db: f32,
}

impl Default for BandParams {
    fn default() -> Self {
        Self {
            threshold_db: -40.0,
            ratio: 3.0,
            attack_seconds: 0.005,
            release_seconds: 0.05,
            gain_db: 10.0,
        }
    }
}

impl BandParams {
    pub fn new(
        threshold_db: f32,
        ratio: f32,
        attack_seconds: f32,
        release_seconds: f32,
        gain_db: f32,
    ) -> Self {
        Self {
            threshold_db,
            ratio,
            attack_seconds,
            release_seconds,
            gain_db,
        }
    }

    /// Check the parameters can be used on the audio thread
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.threshold_db.is_finite() {
            return Err(ConfigError::NonFinite {
                field: "threshold_db",
            });
        }
        if !self.gain_db.is_finite() {
            return Err(ConfigError::NonFinite { field: "gain_db" });
        }
        if !self.ratio.is_finite() || self.ratio <= 0.0 {
            return Err(ConfigError::InvalidRatio(self.ratio));
        }
        if !self.attack_seconds.is_finite() || self.attack_seconds <= 0.0 {
            return Err(ConfigError::NonPositiveTime {
                field: "attack_seconds",
                value: self.attack_seconds,
            });
        }
        if !self.release_seconds.is_finite() || self.release_seconds <= 0.0 {
            return Err(ConfigError::NonPositiveTime {
                field: "release_seconds",
                value: self.release_seconds,
            });
        }
        Ok(())
    }
}

/// `BandParams` pre-derived for a given sample rate
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BandCoefficients {
    attack_coeff: f64,
    release_coeff: f64,
    threshold_linear: f64,
    gain_linear: f64,
    /// `1/ratio - 1`
    exponent: f64,
}

impl BandCoefficients {
    pub fn from_params(params: &BandParams, sample_rate: f64) -> ConfigResult<Self> {
        params.validate()?;

        Ok(Self {
            attack_coeff: util::time_constant_to_coeff(params.attack_seconds as f64, sample_rate),
            release_coeff: util::time_constant_to_coeff(
                params.release_seconds as f64,
                sample_rate,
            ),
            threshold_linear: util::db_to_linear(params.threshold_db as f64),
            gain_linear: util::db_to_linear(params.gain_db as f64),
            exponent: 1.0 / params.ratio as f64 - 1.0,
        })
    }

    pub fn threshold_linear(&self) -> f64 {
        self.threshold_linear
    }

    pub fn gain_linear(&self) -> f64 {
        self.gain_linear
    }

    /// Compression gain once the envelope has settled at `level`
    #[inline]
    pub fn static_gain(&self, level: f64) -> f64 {
        if level > self.threshold_linear {
            (level / self.threshold_linear).powf(self.exponent)
        } else {
            1.0
        }
    }
}

/// Per-band, per-channel WDRC unit
#[derive(Clone, Debug)]
pub struct Compressor {
    /// Smoothed peak level (linear, always >= 0)
    envelope: f64,

    /// Last applied compression gain (linear, for metering)
    last_gain: f64,
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compressor {
    pub fn new() -> Self {
        Self {
            envelope: 0.0,
            last_gain: 1.0,
        }
    }

    /// Process a single band-filtered sample
    #[inline]
    pub fn process_sample(&mut self, input: f32, coeffs: &BandCoefficients) -> f32 {
        let input_f64 = input as f64;
        let input_level = input_f64.abs();

        // Attack while the level rises, release while it falls
        let alpha = if input_level > self.envelope {
            coeffs.attack_coeff
        } else {
            coeffs.release_coeff
        };
        self.envelope = alpha * self.envelope + (1.0 - alpha) * input_level;
        debug_assert!(self.envelope >= 0.0);

        let compression_gain = coeffs.static_gain(self.envelope);
        self.last_gain = compression_gain;

        (input_f64 * coeffs.gain_linear * compression_gain) as f32
    }

    /// Current envelope level (linear)
    pub fn envelope(&self) -> f64 {
        self.envelope
    }

    /// Compression gain applied to the last sample, in dB
    pub fn current_gain_db(&self) -> f64 {
        util::linear_to_db(self.last_gain, 1e-10)
    }

    pub fn reset(&mut self) {
        self.envelope = 0.0;
        self.last_gain = 1.0;
    }
}
