//! Soft-knee noise gate
//!
//! Runs before compression so room noise below the threshold is silenced
//! instead of being lifted by the band gains. Stateless per sample: the
//! decision depends only on the instantaneous magnitude.
//!
//! Below `threshold - knee` the output is 0, above `threshold + knee` the
//! sample passes unchanged, and inside the knee the sample is faded by
//! `(|x| - (threshold - knee)) / (2 * knee)`.

use crate::error::{ConfigError, ConfigResult};

/// Default gate threshold (linear amplitude)
pub const DEFAULT_GATE_THRESHOLD: f32 = 0.005;

/// Default knee half-width (linear amplitude)
pub const DEFAULT_GATE_KNEE: f32 = 0.002;

/// Noise gate with a linear fade across the knee
#[derive(Clone, Debug)]
pub struct NoiseGate {
    /// Threshold (linear amplitude)
    threshold: f32,

    /// Knee half-width (linear amplitude)
    knee: f32,

    /// Whether gate is enabled
    enabled: bool,
}

impl Default for NoiseGate {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_GATE_THRESHOLD,
            knee: DEFAULT_GATE_KNEE,
            enabled: true,
        }
    }
}

impl NoiseGate {
    /// Create a new noise gate
    ///
    /// # Arguments
    /// * `threshold` - Linear amplitude around which the gate opens
    /// * `knee` - Half-width of the fade region; 0 gives a hard gate
    pub fn new(threshold: f32, knee: f32) -> ConfigResult<Self> {
        Self::validate(threshold, knee)?;
        Ok(Self {
            threshold,
            knee,
            enabled: true,
        })
    }

    pub fn validate(threshold: f32, knee: f32) -> ConfigResult<()> {
        let ok = threshold.is_finite()
            && knee.is_finite()
            && threshold > 0.0
            && knee >= 0.0
            && knee < threshold;
        if ok {
            Ok(())
        } else {
            Err(ConfigError::InvalidGate { threshold, knee })
        }
    }

    /// Replace threshold and knee together; previous values are kept on error
    pub fn set_threshold(&mut self, threshold: f32, knee: f32) -> ConfigResult<()> {
        Self::validate(threshold, knee)?;
        self.threshold = threshold;
        self.knee = knee;
        Ok(())
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn knee(&self) -> f32 {
        self.knee
    }

    /// Enable or disable the gate
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Check if gate is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Process a single sample
    #[inline]
    pub fn process_sample(&self, input: f32) -> f32 {
        if !self.enabled {
            return input;
        }

        let level = input.abs();
        let lower = self.threshold - self.knee;
        let upper = self.threshold + self.knee;

        if level < lower {
            0.0
        } else if level > upper || self.knee == 0.0 {
            input
        } else {
            input * (level - lower) / (2.0 * self.knee)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silences_below_knee() {
        let gate = NoiseGate::new(0.01, 0.004).unwrap();
        for x in [0.0f32, 0.001, -0.005, 0.0059] {
            assert_eq!(gate.process_sample(x), 0.0, "input {}", x);
        }
    }

    #[test]
    fn test_passes_above_knee() {
        let gate = NoiseGate::new(0.01, 0.004).unwrap();
        for x in [0.0141f32, -0.02, 0.5, -1.0] {
            assert_eq!(gate.process_sample(x), x, "input {}", x);
        }
    }

    #[test]
    fn test_knee_fades_linearly() {
        let gate = NoiseGate::new(0.01, 0.004).unwrap();
        // At the threshold the fade factor is exactly one half.
        let y = gate.process_sample(0.01);
        assert!((y - 0.005).abs() < 1e-7, "got {}", y);
        let y = gate.process_sample(-0.01);
        assert!((y + 0.005).abs() < 1e-7, "got {}", y);
    }

    #[test]
    fn test_knee_is_monotonic() {
        let gate = NoiseGate::new(0.01, 0.004).unwrap();
        let mut last = 0.0f32;
        for i in 0..=100 {
            let x = 0.005 + 0.0001 * i as f32;
            let y = gate.process_sample(x);
            assert!(y >= last);
            last = y;
        }
    }

    #[test]
    fn test_zero_knee_is_hard_gate() {
        let gate = NoiseGate::new(0.01, 0.0).unwrap();
        assert_eq!(gate.process_sample(0.009), 0.0);
        assert_eq!(gate.process_sample(0.01), 0.01);
    }

    #[test]
    fn test_rejects_knee_wider_than_threshold() {
        assert!(NoiseGate::new(0.01, 0.01).is_err());
        assert!(NoiseGate::new(0.01, -0.001).is_err());
        assert!(NoiseGate::new(0.0, 0.0).is_err());
    }

    #[test]
    fn test_failed_update_keeps_previous_values() {
        let mut gate = NoiseGate::default();
        assert!(gate.set_threshold(0.01, 0.02).is_err());
        assert_eq!(gate.threshold(), DEFAULT_GATE_THRESHOLD);
        assert_eq!(gate.knee(), DEFAULT_GATE_KNEE);
    }

    #[test]
    fn test_noise_gate_disabled() {
        let mut gate = NoiseGate::default();
        gate.set_enabled(false);

        let input = 0.0001f32;
        assert_eq!(gate.process_sample(input), input);
    }
}
