//! Transient-difference de-esser.
//!
//! Treats the sample-to-sample difference as a crude high-frequency
//! detector. When the jump from the previous output exceeds the threshold
//! the jump is scaled by `reduction`, and the reduced value becomes the new
//! reference, so a burst of sibilance is smoothed by first-order feedback.

use crate::error::{ConfigError, ConfigResult};

/// Default jump threshold (linear amplitude)
pub const DEFAULT_DEESSER_THRESHOLD: f32 = 0.1;

/// Default fraction of the jump that is kept
pub const DEFAULT_DEESSER_REDUCTION: f32 = 0.5;

/// Real-time de-esser processor.
#[derive(Clone, Debug)]
pub struct DeEsser {
    enabled: bool,
    threshold: f32,
    reduction: f32,
    /// Previous output, one slot per channel
    previous: Vec<f32>,
    /// Samples reduced since the last query
    engaged: u64,
}

impl DeEsser {
    /// Create a de-esser for `channels` interleaved channels.
    pub fn new(channels: usize, threshold: f32, reduction: f32) -> ConfigResult<Self> {
        Self::validate(threshold, reduction)?;
        Ok(Self {
            enabled: true,
            threshold,
            reduction,
            previous: vec![0.0; channels],
            engaged: 0,
        })
    }

    pub fn validate(threshold: f32, reduction: f32) -> ConfigResult<()> {
        let ok = threshold.is_finite()
            && reduction.is_finite()
            && threshold > 0.0
            && reduction > 0.0
            && reduction < 1.0;
        if ok {
            Ok(())
        } else {
            Err(ConfigError::InvalidDeEsser {
                threshold,
                reduction,
            })
        }
    }

    /// Replace threshold and reduction together.
    pub fn set_params(&mut self, threshold: f32, reduction: f32) -> ConfigResult<()> {
        Self::validate(threshold, reduction)?;
        self.threshold = threshold;
        self.reduction = reduction;
        Ok(())
    }

    /// Enable or disable de-essing.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn reduction(&self) -> f32 {
        self.reduction
    }

    /// Number of reduced samples since the last call; resets the count.
    pub fn take_engaged_count(&mut self) -> u64 {
        std::mem::take(&mut self.engaged)
    }

    #[inline]
    pub fn process_sample(&mut self, channel: usize, input: f32) -> f32 {
        if !self.enabled {
            // Output equals input, so it is also the next reference
            self.previous[channel] = input;
            return input;
        }

        let prev = self.previous[channel];
        let high_freq = input - prev;
        let output = if high_freq.abs() > self.threshold {
            self.engaged += 1;
            prev + high_freq * self.reduction
        } else {
            input
        };

        self.previous[channel] = output;
        output
    }

    /// Reset internal state.
    pub fn reset(&mut self) {
        self.previous.iter_mut().for_each(|p| *p = 0.0);
        self.engaged = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_passthrough() {
        let mut deesser = DeEsser::new(1, 0.1, 0.5).unwrap();
        deesser.set_enabled(false);
        let x = 0.25f32;
        assert_eq!(deesser.process_sample(0, x), x);
    }

    #[test]
    fn test_reenable_tracks_signal_seen_while_disabled() {
        let mut deesser = DeEsser::new(1, 0.1, 0.5).unwrap();
        deesser.set_enabled(false);
        for _ in 0..100 {
            deesser.process_sample(0, 0.8);
        }
        deesser.set_enabled(true);
        assert_eq!(deesser.process_sample(0, 0.8), 0.8);
        assert_eq!(deesser.take_engaged_count(), 0);
    }

    #[test]
    fn test_small_steps_pass_unchanged() {
        let mut deesser = DeEsser::new(1, 0.1, 0.5).unwrap();
        for x in [0.05f32, 0.1, 0.15, 0.1] {
            assert_eq!(deesser.process_sample(0, x), x);
        }
        assert_eq!(deesser.take_engaged_count(), 0);
    }

    #[test]
    fn test_jump_is_reduced_and_fed_back() {
        let mut deesser = DeEsser::new(1, 0.1, 0.5).unwrap();
        // 0 -> 0.8 is a jump of 0.8, halved to 0.4.
        assert!((deesser.process_sample(0, 0.8) - 0.4).abs() < 1e-7);
        // Reference is now 0.4, so 0.8 is a jump of 0.4, halved to 0.6.
        assert!((deesser.process_sample(0, 0.8) - 0.6).abs() < 1e-7);
        assert_eq!(deesser.take_engaged_count(), 2);
        assert_eq!(deesser.take_engaged_count(), 0);
    }

    #[test]
    fn test_channels_track_separately() {
        let mut deesser = DeEsser::new(2, 0.1, 0.5).unwrap();
        deesser.process_sample(0, 0.8);
        // Channel 1 still references 0.0
        assert_eq!(deesser.process_sample(1, 0.05), 0.05);
    }

    #[test]
    fn test_rejects_invalid_reduction() {
        assert!(DeEsser::new(1, 0.1, 0.0).is_err());
        assert!(DeEsser::new(1, 0.1, 1.0).is_err());
        assert!(DeEsser::new(1, 0.0, 0.5).is_err());
    }
}
