//! Real-time hearing amplification engine
//!
//! Capture chain: Noise Gate → 4 × (Band-pass → WDRC) → Band average →
//! De-esser → Amplification → Limiter → Ring buffer
//!
//! Render: Ring buffer → Output (zero-filled on shortfall)
//!
//! The engine never opens devices itself. A host calls `on_capture` and
//! `on_render` from its two audio threads and `start`/`stop`/`update_*` from
//! a control thread. Every callback checks the fault latch and the run state
//! once at entry and answers `CallbackResult::Stop` instead of processing
//! when either says so.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::{Duration, Instant};

use super::buffer::AudioRingBuffer;
use super::config::EngineConfig;
use super::params::{ChannelSelector, ParameterSet, SharedParameters, StageSettings};
use crate::dsp::biquad::{FilterBank, NUM_BANDS};
use crate::dsp::compressor::Compressor;
use crate::dsp::deesser::DeEsser;
use crate::dsp::gate::NoiseGate;
use crate::dsp::limiter::Limiter;
use crate::dsp::meter::{BandLevels, BandMeter, METER_FLOOR_DB};
use crate::dsp::util;
use crate::error::{ConfigError, ConfigResult, EngineError, Fault};

/// Stream direction of a host callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Capture,
    Render,
}

/// What a callback tells its host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackResult {
    Continue,
    Stop,
}

/// Cooperative run state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ProcessingState {
    Running = 0,
    /// `stop()` was called; the next callback to enter moves to `Stopped`
    StopRequested = 1,
    Stopped = 2,
}

impl ProcessingState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ProcessingState::Running,
            1 => ProcessingState::StopRequested,
            _ => ProcessingState::Stopped,
        }
    }
}

/// Capability interface a host drives from its audio threads
///
/// Buffers are interleaved f32 PCM of `num_frames × channels` samples. A
/// `None` buffer means the host delivered nothing.
pub trait AudioCallback: Send + Sync {
    fn on_capture(&self, input: Option<&[f32]>, num_frames: usize) -> CallbackResult;

    fn on_render(&self, output: Option<&mut [f32]>, num_frames: usize) -> CallbackResult;

    /// Direction-tagged entry point for hosts with a single callback
    fn on_block(
        &self,
        direction: Direction,
        buffer: Option<&mut [f32]>,
        num_frames: usize,
    ) -> CallbackResult {
        match direction {
            Direction::Capture => self.on_capture(buffer.as_deref(), num_frames),
            Direction::Render => self.on_render(buffer, num_frames),
        }
    }

    fn on_stream_opened(&self, _direction: Direction) {}

    fn on_stream_closing(&self, _direction: Direction) {}

    fn on_error_before_close(&self, _direction: Direction, _message: &str) {}

    fn on_error_after_close(&self, _direction: Direction, _message: &str) {}
}

/// Point-in-time view of the engine's counters and meters
#[derive(Debug, Clone, PartialEq)]
pub struct EngineStats {
    pub state: ProcessingState,
    pub fault: Option<Fault>,
    pub capture_callbacks: u64,
    pub render_callbacks: u64,
    /// Render callbacks that found less than one block in the ring
    pub underruns: u64,
    /// Samples zero-filled by those underruns
    pub underrun_samples: u64,
    /// Unread samples overwritten in the ring
    pub ring_evictions: u64,
    /// Capture blocks skipped because the processing chain was busy
    pub skipped_blocks: u64,
    pub limiter_clips: u64,
    pub deesser_engagements: u64,
    pub ring_fill: usize,
    /// Latest published parameter generation
    pub parameter_generation: u64,
    /// Generation the capture path last processed with
    pub applied_generation: u64,
    pub input_peak_db: f32,
    pub output_peak_db: f32,
    pub amplification: f32,
}

#[derive(Debug, Default)]
struct Counters {
    capture_callbacks: AtomicU64,
    render_callbacks: AtomicU64,
    underruns: AtomicU64,
    underrun_samples: AtomicU64,
    ring_evictions: AtomicU64,
    skipped_blocks: AtomicU64,
    limiter_clips: AtomicU64,
    deesser_engagements: AtomicU64,
}

/// Marks a callback as in flight for the lifetime of the guard
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(count: &'a AtomicUsize) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Self(count)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Everything the capture thread mutates per sample
struct CaptureChain {
    channels: usize,
    params: ParameterSet,
    gate: NoiseGate,
    filters: FilterBank,
    /// Indexed `band * channels + channel`
    compressors: Vec<Compressor>,
    deesser: DeEsser,
    limiter: Limiter,
    meter: BandMeter,
    /// Output of one configured block
    scratch: Vec<f32>,
}

impl CaptureChain {
    fn new(config: &EngineConfig, params: ParameterSet) -> ConfigResult<Self> {
        let sample_rate = config.sample_rate as f64;
        let channels = config.channels;
        let stages = *params.stages();

        let mut chain = Self {
            channels,
            gate: NoiseGate::new(stages.gate_threshold, stages.gate_knee)?,
            filters: FilterBank::new(sample_rate, channels)?,
            compressors: vec![Compressor::new(); NUM_BANDS * channels],
            deesser: DeEsser::new(
                channels,
                stages.deesser_threshold,
                stages.deesser_reduction,
            )?,
            limiter: Limiter::new(stages.limiter_ceiling)?,
            meter: BandMeter::new(sample_rate),
            scratch: vec![0.0; config.block_samples()],
            params,
        };
        chain.apply_stages(&stages)?;
        Ok(chain)
    }

    fn apply_stages(&mut self, stages: &StageSettings) -> ConfigResult<()> {
        self.gate.set_threshold(stages.gate_threshold, stages.gate_knee)?;
        self.gate.set_enabled(stages.gate_enabled);
        self.deesser.set_params(stages.deesser_threshold, stages.deesser_reduction)?;
        self.deesser.set_enabled(stages.deesser_enabled);
        self.limiter.set_ceiling(stages.limiter_ceiling)
    }

    fn reset(&mut self) {
        self.filters.reset();
        self.compressors.iter_mut().for_each(Compressor::reset);
        self.deesser.reset();
        self.meter.reset();
    }

    /// Process at most one configured block; returns the processed samples
    /// and the (input, output) peaks
    fn process(
        &mut self,
        input: &[f32],
        amplification: f32,
        levels: &BandLevels,
    ) -> (&[f32], f32, f32) {
        let channels = self.channels;
        let output = &mut self.scratch[..input.len()];
        let mut input_peak = 0.0f32;
        let mut output_peak = 0.0f32;

        for (frame_in, frame_out) in input
            .chunks_exact(channels)
            .zip(output.chunks_exact_mut(channels))
        {
            let mut mono = 0.0f32;

            for (channel, (&raw, out)) in
                frame_in.iter().zip(frame_out.iter_mut()).enumerate()
            {
                let sample = if raw.is_finite() { raw } else { 0.0 };
                input_peak = input_peak.max(sample.abs());

                let gated = self.gate.process_sample(sample);

                let mut mixed = 0.0f32;
                for band in 0..NUM_BANDS {
                    let filtered = self.filters.process(band, channel, gated);
                    let index = band * channels + channel;
                    mixed += self.compressors[index]
                        .process_sample(filtered, self.params.coefficients(band, channel));
                }
                mixed /= NUM_BANDS as f32;
                // Extreme expansion can overflow f32; keep it out of the de-esser history
                if !mixed.is_finite() {
                    mixed = 0.0;
                }

                let deessed = self.deesser.process_sample(channel, mixed);
                let limited = self.limiter.process_sample(deessed * amplification);

                *out = limited;
                output_peak = output_peak.max(limited.abs());
                mono += limited;
            }

            self.meter.push(mono / channels as f32, levels);
        }

        (&self.scratch[..input.len()], input_peak, output_peak)
    }
}

/// Hearing amplification engine shared by the host's capture, render and
/// control threads
pub struct Engine {
    config: EngineConfig,
    state: AtomicU8,
    /// `Fault` code, 0 when clear
    fault: AtomicU8,
    in_flight: AtomicUsize,
    amplification: AtomicU32,
    params: SharedParameters,
    chain: Mutex<CaptureChain>,
    ring: AudioRingBuffer,
    read_timeout: Duration,
    counters: Counters,
    applied_generation: AtomicU64,
    levels: BandLevels,
    input_peak_db: AtomicU32,
    output_peak_db: AtomicU32,
}

impl Engine {
    /// Construct with default processing settings for the given stream format
    pub fn new(
        sample_rate: u32,
        channels: usize,
        frames_per_callback: usize,
    ) -> Result<Self, EngineError> {
        Self::with_config(EngineConfig::with_format(
            sample_rate,
            channels,
            frames_per_callback,
        ))
    }

    /// Construct from a full configuration. The engine starts `Stopped`.
    pub fn with_config(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;

        let capacity = config.ring_capacity().ok_or_else(|| {
            EngineError::Construction(format!(
                "ring capacity overflows: {} frames × {} channels × {} blocks",
                config.frames_per_callback, config.channels, config.ring_blocks
            ))
        })?;

        let params = ParameterSet::new(
            &config.band_params(),
            config.stages,
            config.channels,
            config.sample_rate as f64,
        )?;
        let chain = CaptureChain::new(&config, params.clone())?;
        let read_timeout = config.read_timeout();

        log::info!(
            "Engine created: {} Hz, {} ch, {} frames/callback, ring {} samples, read timeout {:?}",
            config.sample_rate,
            config.channels,
            config.frames_per_callback,
            capacity,
            read_timeout
        );

        Ok(Self {
            state: AtomicU8::new(ProcessingState::Stopped as u8),
            fault: AtomicU8::new(0),
            in_flight: AtomicUsize::new(0),
            amplification: AtomicU32::new(config.amplification.to_bits()),
            params: SharedParameters::new(params),
            chain: Mutex::new(chain),
            ring: AudioRingBuffer::with_read_timeout(capacity, read_timeout),
            read_timeout,
            counters: Counters::default(),
            applied_generation: AtomicU64::new(0),
            levels: BandLevels::default(),
            input_peak_db: AtomicU32::new(METER_FLOOR_DB.to_bits()),
            output_peak_db: AtomicU32::new(METER_FLOOR_DB.to_bits()),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.config.channels
    }

    pub fn frames_per_callback(&self) -> usize {
        self.config.frames_per_callback
    }

    // === State machine ===

    pub fn state(&self) -> ProcessingState {
        ProcessingState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_running(&self) -> bool {
        self.state() == ProcessingState::Running
    }

    /// Resume processing. Does not open or close any stream.
    ///
    /// Starting from `Stopped` clears the ring, the meters and all
    /// filter/envelope state.
    ///
    /// # Returns
    /// Whether the state changed
    pub fn start(&self) -> bool {
        if self
            .state
            .compare_exchange(
                ProcessingState::StopRequested as u8,
                ProcessingState::Running as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
        {
            log::info!("Engine: stop request withdrawn, running");
            return true;
        }

        if self.state() == ProcessingState::Stopped {
            self.lock_chain().reset();
            self.ring.clear();
            self.levels.reset();
            self.input_peak_db.store(METER_FLOOR_DB.to_bits(), Ordering::Relaxed);
            self.output_peak_db.store(METER_FLOOR_DB.to_bits(), Ordering::Relaxed);
        }

        match self.state.compare_exchange(
            ProcessingState::Stopped as u8,
            ProcessingState::Running as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(_) => {
                log::info!("Engine: running");
                true
            }
            Err(_) => false,
        }
    }

    /// Request a cooperative stop, observed at the next callback entry
    ///
    /// # Returns
    /// Whether a stop was newly requested
    pub fn stop(&self) -> bool {
        let requested = self
            .state
            .compare_exchange(
                ProcessingState::Running as u8,
                ProcessingState::StopRequested as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok();
        if requested {
            log::info!("Engine: stop requested");
        }
        requested
    }

    /// Number of callbacks currently executing
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Wait until no callback is executing
    ///
    /// # Returns
    /// `false` if callbacks were still in flight when `timeout` expired
    pub fn wait_quiescent(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.in_flight() == 0 {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_micros(200));
        }
    }

    /// Force `Stopped` and wait for in-flight callbacks to drain
    ///
    /// After this returns `true`, every later callback answers `Stop`
    /// without touching the processing chain, so the host may tear its
    /// streams down and release the engine.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        self.state.store(ProcessingState::Stopped as u8, Ordering::SeqCst);
        let quiescent = self.wait_quiescent(timeout);
        if quiescent {
            log::info!("Engine: shut down");
        } else {
            log::warn!(
                "Engine: {} callback(s) still in flight after {:?}",
                self.in_flight(),
                timeout
            );
        }
        quiescent
    }

    // === Fault latch ===

    pub fn fault(&self) -> Option<Fault> {
        Fault::from_code(self.fault.load(Ordering::SeqCst))
    }

    /// Clear a latched fault; callbacks resume if the engine is still running
    pub fn clear_fault(&self) {
        if let Some(previous) = Fault::from_code(self.fault.swap(0, Ordering::SeqCst)) {
            log::info!("Engine: cleared fault: {}", previous);
        }
    }

    /// Latch `fault`; the first fault wins until cleared
    fn raise(&self, fault: Fault) {
        if self
            .fault
            .compare_exchange(0, fault as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            log::error!("Engine fault: {}", fault);
        }
    }

    /// Entry check shared by both callbacks
    fn admit(&self) -> bool {
        if self.fault.load(Ordering::SeqCst) != 0 {
            return false;
        }
        match self.state() {
            ProcessingState::Running => true,
            ProcessingState::StopRequested => {
                if self
                    .state
                    .compare_exchange(
                        ProcessingState::StopRequested as u8,
                        ProcessingState::Stopped as u8,
                        Ordering::SeqCst,
                        Ordering::SeqCst,
                    )
                    .is_ok()
                {
                    log::info!("Engine: stopped");
                }
                false
            }
            ProcessingState::Stopped => false,
        }
    }

    // === Control surface ===

    /// Set the linear output scale applied before the limiter
    pub fn set_amplification(&self, amplification: f32) -> ConfigResult<()> {
        if !amplification.is_finite() || amplification < 0.0 {
            return Err(ConfigError::InvalidAmplification(amplification));
        }
        self.amplification.store(amplification.to_bits(), Ordering::Relaxed);
        log::debug!("Engine: amplification = {}", amplification);
        Ok(())
    }

    pub fn amplification(&self) -> f32 {
        f32::from_bits(self.amplification.load(Ordering::Relaxed))
    }

    /// Replace band parameters for the selected channels
    ///
    /// Every array must hold exactly `NUM_BANDS` entries. On any error the
    /// previous parameters stay in effect. The new set is picked up at the
    /// start of the next capture callback.
    ///
    /// # Returns
    /// The published parameter generation
    pub fn update_parameters(
        &self,
        thresholds_db: &[f32],
        ratios: &[f32],
        attack_seconds: &[f32],
        release_seconds: &[f32],
        gains_db: &[f32],
        selector: ChannelSelector,
    ) -> ConfigResult<u64> {
        let generation = self.params.modify(|set| {
            set.apply_band_arrays(
                thresholds_db,
                ratios,
                attack_seconds,
                release_seconds,
                gains_db,
                selector,
            )
        })?;
        log::debug!(
            "Engine: band parameters updated ({:?}), generation {}",
            selector,
            generation
        );
        Ok(generation)
    }

    pub fn update_gate(&self, threshold: f32, knee: f32, enabled: bool) -> ConfigResult<u64> {
        self.update_stages(|stages| {
            stages.gate_threshold = threshold;
            stages.gate_knee = knee;
            stages.gate_enabled = enabled;
        })
    }

    pub fn update_deesser(
        &self,
        threshold: f32,
        reduction: f32,
        enabled: bool,
    ) -> ConfigResult<u64> {
        self.update_stages(|stages| {
            stages.deesser_threshold = threshold;
            stages.deesser_reduction = reduction;
            stages.deesser_enabled = enabled;
        })
    }

    pub fn set_limiter_ceiling(&self, ceiling: f32) -> ConfigResult<u64> {
        self.update_stages(|stages| stages.limiter_ceiling = ceiling)
    }

    fn update_stages<F>(&self, change: F) -> ConfigResult<u64>
    where
        F: FnOnce(&mut StageSettings),
    {
        let generation = self.params.modify(|set| {
            let mut stages = *set.stages();
            change(&mut stages);
            set.apply_stages(stages)
        })?;
        log::debug!("Engine: stage settings updated, generation {}", generation);
        Ok(generation)
    }

    /// Copy of the latest published parameters
    pub fn parameters(&self) -> ParameterSet {
        self.params.current()
    }

    // === Diagnostics ===

    /// Per-band output level in dBFS from the spectral meter
    pub fn band_levels_db(&self) -> [f32; NUM_BANDS] {
        self.levels.load()
    }

    pub fn ring(&self) -> &AudioRingBuffer {
        &self.ring
    }

    pub fn stats(&self) -> EngineStats {
        let counters = &self.counters;
        EngineStats {
            state: self.state(),
            fault: self.fault(),
            capture_callbacks: counters.capture_callbacks.load(Ordering::Relaxed),
            render_callbacks: counters.render_callbacks.load(Ordering::Relaxed),
            underruns: counters.underruns.load(Ordering::Relaxed),
            underrun_samples: counters.underrun_samples.load(Ordering::Relaxed),
            ring_evictions: counters.ring_evictions.load(Ordering::Relaxed),
            skipped_blocks: counters.skipped_blocks.load(Ordering::Relaxed),
            limiter_clips: counters.limiter_clips.load(Ordering::Relaxed),
            deesser_engagements: counters.deesser_engagements.load(Ordering::Relaxed),
            ring_fill: self.ring.size(),
            parameter_generation: self.params.generation(),
            applied_generation: self.applied_generation.load(Ordering::Relaxed),
            input_peak_db: f32::from_bits(self.input_peak_db.load(Ordering::Relaxed)),
            output_peak_db: f32::from_bits(self.output_peak_db.load(Ordering::Relaxed)),
            amplification: self.amplification(),
        }
    }

    fn lock_chain(&self) -> MutexGuard<'_, CaptureChain> {
        self.chain.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn store_peak(slot: &AtomicU32, peak: f32) {
        let db = util::linear_to_db(peak as f64, 1e-6).max(METER_FLOOR_DB as f64) as f32;
        slot.store(db.to_bits(), Ordering::Relaxed);
    }
}

impl AudioCallback for Engine {
    fn on_capture(&self, input: Option<&[f32]>, num_frames: usize) -> CallbackResult {
        let _in_flight = InFlight::enter(&self.in_flight);
        if !self.admit() {
            return CallbackResult::Stop;
        }

        let Some(input) = input else {
            self.raise(Fault::NullBuffer);
            return CallbackResult::Stop;
        };

        let channels = self.config.channels;
        let expected = match num_frames.checked_mul(channels) {
            Some(expected) if expected <= input.len() => expected,
            _ => {
                self.raise(Fault::IndexBounds);
                return CallbackResult::Stop;
            }
        };
        self.counters.capture_callbacks.fetch_add(1, Ordering::Relaxed);
        if expected == 0 {
            return CallbackResult::Continue;
        }

        // Only the control thread's start() competes for this lock
        let mut chain = match self.chain.try_lock() {
            Ok(chain) => chain,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                self.counters.skipped_blocks.fetch_add(1, Ordering::Relaxed);
                return CallbackResult::Continue;
            }
        };

        // One generation for the whole callback
        if self.params.refresh(&mut chain.params) {
            let stages = *chain.params.stages();
            // Published sets are already validated
            let applied = chain.apply_stages(&stages);
            debug_assert!(applied.is_ok());
            self.applied_generation.store(chain.params.generation(), Ordering::Relaxed);
        }

        let amplification = self.amplification();
        let block = chain.scratch.len();
        let mut input_peak = 0.0f32;
        let mut output_peak = 0.0f32;

        for part in input[..expected].chunks(block) {
            let (processed, peak_in, peak_out) = chain.process(part, amplification, &self.levels);
            input_peak = input_peak.max(peak_in);
            output_peak = output_peak.max(peak_out);

            let evicted = self.ring.write(processed);
            if evicted > 0 {
                self.counters
                    .ring_evictions
                    .fetch_add(evicted as u64, Ordering::Relaxed);
            }
        }

        let clipped = chain.limiter.take_clipped_count();
        let engaged = chain.deesser.take_engaged_count();
        drop(chain);

        if clipped > 0 {
            self.counters.limiter_clips.fetch_add(clipped, Ordering::Relaxed);
        }
        if engaged > 0 {
            self.counters
                .deesser_engagements
                .fetch_add(engaged, Ordering::Relaxed);
        }
        Self::store_peak(&self.input_peak_db, input_peak);
        Self::store_peak(&self.output_peak_db, output_peak);

        CallbackResult::Continue
    }

    fn on_render(&self, output: Option<&mut [f32]>, num_frames: usize) -> CallbackResult {
        let _in_flight = InFlight::enter(&self.in_flight);
        if !self.admit() {
            if let Some(output) = output {
                output.fill(0.0);
            }
            return CallbackResult::Stop;
        }

        let Some(output) = output else {
            self.raise(Fault::NullBuffer);
            return CallbackResult::Stop;
        };

        let expected = match num_frames.checked_mul(self.config.channels) {
            Some(expected) if expected <= output.len() => expected,
            _ => {
                self.raise(Fault::IndexBounds);
                output.fill(0.0);
                return CallbackResult::Stop;
            }
        };
        self.counters.render_callbacks.fetch_add(1, Ordering::Relaxed);

        let (block, rest) = output.split_at_mut(expected);
        rest.fill(0.0);
        if block.is_empty() {
            return CallbackResult::Continue;
        }

        let read = self.ring.read_timeout(block, self.read_timeout);
        if read < block.len() {
            block[read..].fill(0.0);
            self.counters.underruns.fetch_add(1, Ordering::Relaxed);
            self.counters
                .underrun_samples
                .fetch_add((block.len() - read) as u64, Ordering::Relaxed);
        }

        CallbackResult::Continue
    }

    fn on_stream_opened(&self, direction: Direction) {
        log::info!("Engine: {:?} stream opened", direction);
    }

    fn on_stream_closing(&self, direction: Direction) {
        log::info!("Engine: {:?} stream closing", direction);
        self.stop();
    }

    fn on_error_before_close(&self, direction: Direction, message: &str) {
        log::warn!("Engine: {:?} stream error: {}", direction, message);
        self.stop();
    }

    fn on_error_after_close(&self, direction: Direction, message: &str) {
        log::warn!("Engine: {:?} stream closed after error: {}", direction, message);
        self.state.store(ProcessingState::Stopped as u8, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("fault", &self.fault())
            .field("in_flight", &self.in_flight())
            .finish_non_exhaustive()
    }
}
