//! Digital Signal Processing components

pub mod biquad;
pub mod compressor;
pub mod deesser;
pub mod fft;
pub mod gate;
pub mod limiter;
pub mod meter;
pub mod util;

pub use biquad::{BandpassFilter, FilterBank, BAND_EDGES_HZ, NUM_BANDS};
pub use compressor::{BandCoefficients, BandParams, Compressor};
pub use deesser::DeEsser;
pub use fft::Fft;
pub use gate::NoiseGate;
pub use limiter::Limiter;
pub use meter::{BandLevels, BandMeter};
