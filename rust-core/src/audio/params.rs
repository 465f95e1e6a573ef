//! Compression parameters shared between the control thread and the
//! capture callback
//!
//! The control thread builds a complete replacement `ParameterSet`, validates
//! it, and swaps it in under a lock held only for the copy. The capture
//! callback copies the latest set into its own snapshot at the top of a
//! block, so a block never sees two generations at once.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

use crate::dsp::biquad::NUM_BANDS;
use crate::dsp::compressor::{BandCoefficients, BandParams};
use crate::dsp::deesser::{DeEsser, DEFAULT_DEESSER_REDUCTION, DEFAULT_DEESSER_THRESHOLD};
use crate::dsp::gate::{NoiseGate, DEFAULT_GATE_KNEE, DEFAULT_GATE_THRESHOLD};
use crate::dsp::limiter::{Limiter, DEFAULT_CEILING};
use crate::error::{ConfigError, ConfigResult};

/// Which channels an update applies to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelSelector {
    All,
    Channel(usize),
}

/// Starting band parameters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Every band at `BandParams::default()`
    #[default]
    Flat,
    /// Thresholds and ratios rising with frequency
    Sloped,
}

impl Preset {
    pub fn band_params(self) -> [BandParams; NUM_BANDS] {
        match self {
            Preset::Flat => [BandParams::default(); NUM_BANDS],
            Preset::Sloped => [
                BandParams::new(-50.0, 2.0, 0.005, 0.05, 5.0),
                BandParams::new(-45.0, 2.5, 0.005, 0.05, 5.0),
                BandParams::new(-40.0, 3.0, 0.005, 0.05, 5.0),
                BandParams::new(-35.0, 3.5, 0.005, 0.05, 5.0),
            ],
        }
    }
}

/// Settings of the non-band stages, swapped together with the band set
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageSettings {
    pub gate_threshold: f32,
    pub gate_knee: f32,
    pub gate_enabled: bool,
    pub deesser_threshold: f32,
    pub deesser_reduction: f32,
    pub deesser_enabled: bool,
    pub limiter_ceiling: f32,
}

impl Default for StageSettings {
    fn default() -> Self {
        Self {
            gate_threshold: DEFAULT_GATE_THRESHOLD,
            gate_knee: DEFAULT_GATE_KNEE,
            gate_enabled: true,
            deesser_threshold: DEFAULT_DEESSER_THRESHOLD,
            deesser_reduction: DEFAULT_DEESSER_REDUCTION,
            deesser_enabled: true,
            limiter_ceiling: DEFAULT_CEILING,
        }
    }
}

impl StageSettings {
    pub fn validate(&self) -> ConfigResult<()> {
        NoiseGate::validate(self.gate_threshold, self.gate_knee)?;
        DeEsser::validate(self.deesser_threshold, self.deesser_reduction)?;
        Limiter::validate(self.limiter_ceiling)
    }
}

/// One complete generation of processing parameters
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterSet {
    channels: usize,
    sample_rate: f64,
    /// Indexed `band * channels + channel`
    params: Vec<BandParams>,
    coeffs: Vec<BandCoefficients>,
    stages: StageSettings,
    generation: u64,
}

impl ParameterSet {
    /// Build a set with `bands` applied to every channel
    pub fn new(
        bands: &[BandParams],
        stages: StageSettings,
        channels: usize,
        sample_rate: f64,
    ) -> ConfigResult<Self> {
        if bands.len() != NUM_BANDS {
            return Err(ConfigError::ParameterCount {
                field: "bands",
                expected: NUM_BANDS,
                actual: bands.len(),
            });
        }
        stages.validate()?;

        let mut params = Vec::with_capacity(NUM_BANDS * channels);
        let mut coeffs = Vec::with_capacity(NUM_BANDS * channels);
        for band in bands {
            let derived = BandCoefficients::from_params(band, sample_rate)?;
            for _ in 0..channels {
                params.push(*band);
                coeffs.push(derived);
            }
        }

        Ok(Self {
            channels,
            sample_rate,
            params,
            coeffs,
            stages,
            generation: 0,
        })
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn params(&self, band: usize, channel: usize) -> &BandParams {
        &self.params[band * self.channels + channel]
    }

    #[inline]
    pub fn coefficients(&self, band: usize, channel: usize) -> &BandCoefficients {
        &self.coeffs[band * self.channels + channel]
    }

    pub fn stages(&self) -> &StageSettings {
        &self.stages
    }

    /// Replace band parameters from per-band arrays
    ///
    /// Every slice must hold exactly `NUM_BANDS` entries. Nothing is modified
    /// unless every value validates.
    pub fn apply_band_arrays(
        &mut self,
        thresholds_db: &[f32],
        ratios: &[f32],
        attack_seconds: &[f32],
        release_seconds: &[f32],
        gains_db: &[f32],
        selector: ChannelSelector,
    ) -> ConfigResult<()> {
        for (field, values) in [
            ("thresholds_db", thresholds_db),
            ("ratios", ratios),
            ("attack_seconds", attack_seconds),
            ("release_seconds", release_seconds),
            ("gains_db", gains_db),
        ] {
            if values.len() != NUM_BANDS {
                return Err(ConfigError::ParameterCount {
                    field,
                    expected: NUM_BANDS,
                    actual: values.len(),
                });
            }
        }

        let channel_range = match selector {
            ChannelSelector::All => 0..self.channels,
            ChannelSelector::Channel(channel) if channel < self.channels => channel..channel + 1,
            ChannelSelector::Channel(channel) => {
                return Err(ConfigError::ChannelOutOfRange {
                    channel,
                    channels: self.channels,
                })
            }
        };

        // Validate and derive everything before touching self
        let staged = (0..NUM_BANDS)
            .map(|band| {
                let params = BandParams::new(
                    thresholds_db[band],
                    ratios[band],
                    attack_seconds[band],
                    release_seconds[band],
                    gains_db[band],
                );
                BandCoefficients::from_params(&params, self.sample_rate).map(|c| (params, c))
            })
            .collect::<ConfigResult<Vec<_>>>()?;

        for (band, (params, derived)) in staged.into_iter().enumerate() {
            for channel in channel_range.clone() {
                let index = band * self.channels + channel;
                self.params[index] = params;
                self.coeffs[index] = derived;
            }
        }
        Ok(())
    }

    /// Replace the non-band stage settings
    pub fn apply_stages(&mut self, stages: StageSettings) -> ConfigResult<()> {
        stages.validate()?;
        self.stages = stages;
        Ok(())
    }

    /// Overwrite `self` with `other`, reusing existing allocations
    pub fn copy_from(&mut self, other: &ParameterSet) {
        self.channels = other.channels;
        self.sample_rate = other.sample_rate;
        self.params.clone_from(&other.params);
        self.coeffs.clone_from(&other.coeffs);
        self.stages = other.stages;
        self.generation = other.generation;
    }
}

/// Latest parameter generation, published by the control thread
#[derive(Debug)]
pub struct SharedParameters {
    latest: Mutex<ParameterSet>,
    /// Serialises control-thread updates so none is lost
    update_lock: Mutex<()>,
    generation: AtomicU64,
}

impl SharedParameters {
    pub fn new(initial: ParameterSet) -> Self {
        let generation = initial.generation;
        Self {
            latest: Mutex::new(initial),
            update_lock: Mutex::new(()),
            generation: AtomicU64::new(generation),
        }
    }

    fn latest(&self) -> MutexGuard<'_, ParameterSet> {
        self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `change` to a copy of the latest set and publish it
    ///
    /// # Returns
    /// The new generation number, or the validation error with nothing
    /// published
    pub fn modify<F>(&self, change: F) -> ConfigResult<u64>
    where
        F: FnOnce(&mut ParameterSet) -> ConfigResult<()>,
    {
        let _serial = self
            .update_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let mut next = self.latest().clone();
        change(&mut next)?;

        let generation = next.generation + 1;
        next.generation = generation;

        let previous = std::mem::replace(&mut *self.latest(), next);
        self.generation.store(generation, Ordering::Release);
        drop(previous);

        Ok(generation)
    }

    /// Copy of the latest published set
    pub fn current(&self) -> ParameterSet {
        self.latest().clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Refresh `local` if a newer generation exists, without blocking
    ///
    /// When the control thread holds the lock the refresh is skipped and
    /// picked up on a later call.
    ///
    /// # Returns
    /// Whether `local` was replaced
    pub fn refresh(&self, local: &mut ParameterSet) -> bool {
        if self.generation.load(Ordering::Acquire) == local.generation {
            return false;
        }

        match self.latest.try_lock() {
            Ok(latest) => {
                local.copy_from(&latest);
                true
            }
            Err(TryLockError::Poisoned(poisoned)) => {
                local.copy_from(&poisoned.into_inner());
                true
            }
            Err(TryLockError::WouldBlock) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_set(channels: usize) -> ParameterSet {
        ParameterSet::new(
            &Preset::Flat.band_params(),
            StageSettings::default(),
            channels,
            48000.0,
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_wrong_array_length() {
        let mut set = flat_set(2);
        let before = set.clone();
        let err = set
            .apply_band_arrays(
                &[-30.0; 3],
                &[2.0; 4],
                &[0.01; 4],
                &[0.1; 4],
                &[5.0; 4],
                ChannelSelector::All,
            )
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::ParameterCount {
                field: "thresholds_db",
                expected: 4,
                actual: 3
            }
        );
        assert_eq!(set, before);
    }

    #[test]
    fn test_invalid_value_leaves_set_untouched() {
        let mut set = flat_set(2);
        let before = set.clone();
        // Last band has a zero release time
        let result = set.apply_band_arrays(
            &[-30.0; 4],
            &[2.0; 4],
            &[0.01; 4],
            &[0.1, 0.1, 0.1, 0.0],
            &[5.0; 4],
            ChannelSelector::All,
        );
        assert!(result.is_err());
        assert_eq!(set, before);
    }

    #[test]
    fn test_channel_selector_targets_one_channel() {
        let mut set = flat_set(2);
        set.apply_band_arrays(
            &[-20.0; 4],
            &[4.0; 4],
            &[0.01; 4],
            &[0.1; 4],
            &[0.0; 4],
            ChannelSelector::Channel(1),
        )
        .unwrap();

        for band in 0..NUM_BANDS {
            assert_eq!(set.params(band, 0), &BandParams::default());
            assert_eq!(set.params(band, 1).threshold_db, -20.0);
        }

        assert!(matches!(
            set.apply_band_arrays(
                &[-20.0; 4],
                &[4.0; 4],
                &[0.01; 4],
                &[0.1; 4],
                &[0.0; 4],
                ChannelSelector::Channel(2),
            ),
            Err(ConfigError::ChannelOutOfRange { channel: 2, .. })
        ));
    }

    #[test]
    fn test_modify_bumps_generation_and_refresh_copies() {
        let shared = SharedParameters::new(flat_set(1));
        let mut local = shared.current();
        assert!(!shared.refresh(&mut local));

        let generation = shared
            .modify(|set| set.apply_stages(StageSettings {
                limiter_ceiling: 0.5,
                ..StageSettings::default()
            }))
            .unwrap();
        assert_eq!(generation, 1);

        assert!(shared.refresh(&mut local));
        assert_eq!(local.generation(), 1);
        assert_eq!(local.stages().limiter_ceiling, 0.5);
    }

    #[test]
    fn test_failed_modify_publishes_nothing() {
        let shared = SharedParameters::new(flat_set(1));
        let result = shared.modify(|set| {
            set.apply_stages(StageSettings {
                gate_knee: 1.0,
                ..StageSettings::default()
            })
        });
        assert!(result.is_err());
        assert_eq!(shared.generation(), 0);
        assert_eq!(shared.current().stages(), &StageSettings::default());
    }

    #[test]
    fn test_refresh_skips_while_locked() {
        let shared = SharedParameters::new(flat_set(1));
        let mut local = shared.current();
        shared.modify(|_| Ok(())).unwrap();

        let held = shared.latest.lock().unwrap();
        assert!(!shared.refresh(&mut local));
        drop(held);
        assert!(shared.refresh(&mut local));
    }

    #[test]
    fn test_sloped_preset_is_valid() {
        for params in Preset::Sloped.band_params() {
            params.validate().unwrap();
        }
    }
}
