//! Band-pass biquad filter and the fixed four-band filter bank
//!
//! Coefficients are derived once at construction (RBJ cookbook band-pass,
//! constant 0 dB peak gain) and never re-tuned. Uses f64 internally for
//! coefficient precision, f32 for audio samples.

use std::f64::consts::{LN_2, PI};

use crate::error::{ConfigError, ConfigResult};

/// Number of compression bands
pub const NUM_BANDS: usize = 4;

/// Band edges in Hz (low, high) for the fixed filter bank
pub const BAND_EDGES_HZ: [(f64, f64); NUM_BANDS] = [
    (100.0, 500.0),
    (500.0, 1000.0),
    (1000.0, 2000.0),
    (2000.0, 6000.0),
];

/// Band-pass biquad, direct form I
///
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
#[derive(Clone, Debug)]
pub struct BandpassFilter {
    // Coefficients (normalized so a0 = 1)
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,

    // Direct form I history
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,

    low_hz: f64,
    high_hz: f64,
    q: f64,
    sample_rate: f64,
}

impl BandpassFilter {
    /// Create a band-pass filter covering `low_hz..high_hz`
    ///
    /// # Arguments
    /// * `sample_rate` - Sample rate in Hz
    /// * `low_hz` - Lower band edge, must be > 0
    /// * `high_hz` - Upper band edge, must be above `low_hz` and below Nyquist
    pub fn new(sample_rate: f64, low_hz: f64, high_hz: f64) -> ConfigResult<Self> {
        let nyquist_hz = sample_rate / 2.0;
        let valid = sample_rate.is_finite()
            && low_hz.is_finite()
            && high_hz.is_finite()
            && low_hz > 0.0
            && low_hz < high_hz
            && high_hz < nyquist_hz;
        if !valid {
            return Err(ConfigError::InvalidBandEdges {
                low_hz,
                high_hz,
                nyquist_hz,
            });
        }

        let center_hz = (low_hz * high_hz).sqrt();
        let bandwidth_octaves = (high_hz / low_hz).log2();

        let omega = 2.0 * PI * center_hz / sample_rate;
        let sin_omega = omega.sin();
        let cos_omega = omega.cos();
        let q = 1.0 / (2.0 * (LN_2 / 2.0 * bandwidth_octaves * omega / sin_omega).sinh());
        let alpha = sin_omega / (2.0 * q);

        let a0 = 1.0 + alpha;

        Ok(Self {
            b0: alpha / a0,
            b1: 0.0,
            b2: -alpha / a0,
            a1: -2.0 * cos_omega / a0,
            a2: (1.0 - alpha) / a0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
            low_hz,
            high_hz,
            q,
            sample_rate,
        })
    }

    /// Process a single sample
    #[inline]
    pub fn process_sample(&mut self, input: f32) -> f32 {
        let x0 = input as f64;
        let y0 = self.b0 * x0 + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = x0;
        self.y2 = self.y1;
        self.y1 = y0;

        y0 as f32
    }

    /// Process a block of samples in-place
    pub fn process_block_inplace(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }

    /// Reset filter history
    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }

    pub fn low_hz(&self) -> f64 {
        self.low_hz
    }

    pub fn high_hz(&self) -> f64 {
        self.high_hz
    }

    /// Geometric centre of the band
    pub fn center_hz(&self) -> f64 {
        (self.low_hz * self.high_hz).sqrt()
    }

    pub fn q(&self) -> f64 {
        self.q
    }

    /// Analytic magnitude response at `frequency` Hz
    pub fn magnitude_at(&self, frequency: f64) -> f64 {
        let w = 2.0 * PI * frequency / self.sample_rate;
        let (s1, c1) = w.sin_cos();
        let (s2, c2) = (2.0 * w).sin_cos();

        let num_re = self.b0 + self.b1 * c1 + self.b2 * c2;
        let num_im = -(self.b1 * s1 + self.b2 * s2);
        let den_re = 1.0 + self.a1 * c1 + self.a2 * c2;
        let den_im = -(self.a1 * s1 + self.a2 * s2);

        (num_re.hypot(num_im)) / (den_re.hypot(den_im))
    }
}

/// Fixed four-band filter bank with independent history per (band, channel)
#[derive(Clone, Debug)]
pub struct FilterBank {
    filters: Vec<BandpassFilter>,
    channels: usize,
}

impl FilterBank {
    /// Build the bank for `BAND_EDGES_HZ` at `sample_rate`
    pub fn new(sample_rate: f64, channels: usize) -> ConfigResult<Self> {
        let mut filters = Vec::with_capacity(NUM_BANDS * channels);
        for &(low, high) in BAND_EDGES_HZ.iter() {
            let prototype = BandpassFilter::new(sample_rate, low, high)?;
            for _ in 0..channels {
                filters.push(prototype.clone());
            }
        }

        Ok(Self { filters, channels })
    }

    /// Filter one sample of `channel` through `band`
    #[inline]
    pub fn process(&mut self, band: usize, channel: usize, input: f32) -> f32 {
        self.filters[band * self.channels + channel].process_sample(input)
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn reset(&mut self) {
        for filter in self.filters.iter_mut() {
            filter.reset();
        }
    }
}
