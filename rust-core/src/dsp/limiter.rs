//! Hard limiter (brick-wall clamp)
//!
//! Last stage of the chain and always active. No attack or release: every
//! sample is clamped to `[-ceiling, ceiling]`.

use crate::error::{ConfigError, ConfigResult};

/// Default ceiling as a fraction of full scale
pub const DEFAULT_CEILING: f32 = 0.9;

/// Hard limiter with brick-wall ceiling
#[derive(Clone, Debug)]
pub struct Limiter {
    /// Ceiling as linear amplitude
    ceiling: f32,

    /// Samples clamped since the last query
    clipped: u64,
}

impl Default for Limiter {
    fn default() -> Self {
        Self {
            ceiling: DEFAULT_CEILING,
            clipped: 0,
        }
    }
}

impl Limiter {
    /// Create a new limiter
    ///
    /// # Arguments
    /// * `ceiling` - Linear ceiling in (0, 1]
    pub fn new(ceiling: f32) -> ConfigResult<Self> {
        Self::validate(ceiling)?;
        Ok(Self {
            ceiling,
            clipped: 0,
        })
    }

    pub fn validate(ceiling: f32) -> ConfigResult<()> {
        if ceiling.is_finite() && ceiling > 0.0 && ceiling <= 1.0 {
            Ok(())
        } else {
            Err(ConfigError::InvalidCeiling(ceiling))
        }
    }

    /// Set ceiling (linear)
    pub fn set_ceiling(&mut self, ceiling: f32) -> ConfigResult<()> {
        Self::validate(ceiling)?;
        self.ceiling = ceiling;
        Ok(())
    }

    /// Get current ceiling (linear)
    pub fn ceiling(&self) -> f32 {
        self.ceiling
    }

    /// Number of clamped samples since the last call; resets the count.
    pub fn take_clipped_count(&mut self) -> u64 {
        std::mem::take(&mut self.clipped)
    }

    /// Process a single sample
    #[inline]
    pub fn process_sample(&mut self, input: f32) -> f32 {
        // NaN would pass straight through clamp
        if input.is_nan() {
            self.clipped += 1;
            return 0.0;
        }
        let output = input.clamp(-self.ceiling, self.ceiling);
        if output != input {
            self.clipped += 1;
        }
        output
    }
}
