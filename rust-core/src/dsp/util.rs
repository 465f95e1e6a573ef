//! Shared DSP utility math helpers.

/// Convert a time constant in seconds to a single-pole smoothing coefficient.
///
/// `coeff = exp(-1 / (sample_rate * seconds))`. Callers validate `seconds > 0`
/// before getting here; the audio thread never sees a zero time constant.
#[inline]
pub fn time_constant_to_coeff(seconds: f64, sample_rate: f64) -> f64 {
    (-1.0 / (sample_rate * seconds)).exp()
}

/// Convert dBFS to linear amplitude.
#[inline]
pub fn db_to_linear(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

/// Convert linear amplitude to dBFS with a configurable floor.
#[inline]
pub fn linear_to_db(linear: f64, min_linear: f64) -> f64 {
    20.0 * linear.abs().max(min_linear).log10()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_round_trip_reference_points() {
        assert!((db_to_linear(0.0) - 1.0).abs() < 1e-12);
        assert!((db_to_linear(-20.0) - 0.1).abs() < 1e-12);
        assert!((linear_to_db(0.1, 1e-10) + 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_linear_to_db_floor() {
        assert!((linear_to_db(0.0, 1e-6) + 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_time_constant_one_tau() {
        // After `tau * sr` steps the one-pole has covered 1 - 1/e of the gap.
        let sr = 1000.0;
        let coeff = time_constant_to_coeff(0.01, sr);
        let remaining = coeff.powi(10);
        assert!((remaining - (-1.0f64).exp()).abs() < 1e-9);
    }
}
