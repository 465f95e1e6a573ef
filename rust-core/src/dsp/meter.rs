//! Per-band spectral level meter
//!
//! Collects the processed mono mix into a Hann-windowed analysis frame and,
//! each time the frame fills, measures the energy that falls into each of
//! the compressor bands. Levels are published as f32 bits in atomics so a
//! control thread can read them without touching the audio thread's lock.

use std::sync::atomic::{AtomicU32, Ordering};

use super::biquad::{BAND_EDGES_HZ, NUM_BANDS};
use super::fft::Fft;
use super::util;

/// log2 of the analysis frame length
pub const METER_FFT_RANK: u32 = 8;

/// Floor reported for silent bands
pub const METER_FLOOR_DB: f32 = -120.0;

/// Lock-free band levels shared with readers
#[derive(Debug)]
pub struct BandLevels {
    levels: [AtomicU32; NUM_BANDS],
}

impl Default for BandLevels {
    fn default() -> Self {
        Self {
            levels: std::array::from_fn(|_| AtomicU32::new(METER_FLOOR_DB.to_bits())),
        }
    }
}

impl BandLevels {
    pub fn load(&self) -> [f32; NUM_BANDS] {
        std::array::from_fn(|band| f32::from_bits(self.levels[band].load(Ordering::Relaxed)))
    }

    fn store(&self, band: usize, level_db: f32) {
        self.levels[band].store(level_db.to_bits(), Ordering::Relaxed);
    }

    pub fn reset(&self) {
        for band in 0..NUM_BANDS {
            self.store(band, METER_FLOOR_DB);
        }
    }
}

/// Spectral band meter, owned by the capture path
#[derive(Clone, Debug)]
pub struct BandMeter {
    fft: Fft,
    window: Vec<f32>,
    frame: Vec<f32>,
    filled: usize,
    re: Vec<f32>,
    im: Vec<f32>,
    /// FFT bin ranges (start, end) for each band
    bin_ranges: [(usize, usize); NUM_BANDS],
    /// Sum of squared window values, for power normalisation
    window_power: f32,
}

impl BandMeter {
    pub fn new(sample_rate: f64) -> Self {
        let fft = Fft::new(METER_FFT_RANK);
        let n = fft.len();

        let window: Vec<f32> = (0..n)
            .map(|i| {
                let phase = 2.0 * std::f64::consts::PI * i as f64 / n as f64;
                (0.5 - 0.5 * phase.cos()) as f32
            })
            .collect();
        let window_power = window.iter().map(|w| w * w).sum();

        let bin_hz = sample_rate / n as f64;
        let bin_ranges = std::array::from_fn(|band| {
            let (low, high) = BAND_EDGES_HZ[band];
            let start = ((low / bin_hz).round() as usize).clamp(1, n / 2);
            let end = ((high / bin_hz).round() as usize).clamp(start + 1, n / 2 + 1);
            (start, end)
        });

        Self {
            fft,
            window,
            frame: vec![0.0; n],
            filled: 0,
            re: vec![0.0; n],
            im: vec![0.0; n],
            bin_ranges,
            window_power,
        }
    }

    /// Feed one mono sample; publishes to `levels` whenever a frame completes
    #[inline]
    pub fn push(&mut self, sample: f32, levels: &BandLevels) {
        self.frame[self.filled] = sample;
        self.filled += 1;
        if self.filled == self.frame.len() {
            self.filled = 0;
            self.analyze(levels);
        }
    }

    fn analyze(&mut self, levels: &BandLevels) {
        for ((re, im), (&x, &w)) in self
            .re
            .iter_mut()
            .zip(self.im.iter_mut())
            .zip(self.frame.iter().zip(self.window.iter()))
        {
            *re = x * w;
            *im = 0.0;
        }

        self.fft.forward(&mut self.re, &mut self.im);

        for (band, &(start, end)) in self.bin_ranges.iter().enumerate() {
            let power: f32 = (start..end)
                .map(|k| self.re[k] * self.re[k] + self.im[k] * self.im[k])
                .sum();
            // One-sided spectrum: double the bins to get back the mean square
            let mean_square = 2.0 * power / (self.frame.len() as f32 * self.window_power);
            let level_db =
                util::linear_to_db(mean_square.sqrt() as f64, 1e-6).max(METER_FLOOR_DB as f64);
            levels.store(band, level_db as f32);
        }
    }

    pub fn reset(&mut self) {
        self.filled = 0;
        self.frame.iter_mut().for_each(|s| *s = 0.0);
    }
}
