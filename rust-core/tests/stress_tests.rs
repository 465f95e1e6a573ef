//! Stress tests for parameter changes and shutdown under live callbacks
//!
//! These tests validate that the engine can handle:
//! - Rapid control-surface interaction (slider spam, invalid values)
//! - Parameter swaps racing the capture callback
//! - Shutdown while both callback threads are still running

use hearing_amp_core::audio::ChannelSelector;
use hearing_amp_core::{AudioCallback, CallbackResult, Engine, ProcessingState, NUM_BANDS};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const FRAMES: usize = 64;
const CHANNELS: usize = 2;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn new_engine() -> Engine {
    init_logging();
    Engine::new(48000, CHANNELS, FRAMES).unwrap()
}

fn sine_block(offset: usize, freq: f32, amplitude: f32) -> Vec<f32> {
    (0..FRAMES)
        .flat_map(|n| {
            let t = (offset + n) as f32 / 48000.0;
            let x = amplitude * (2.0 * std::f32::consts::PI * freq * t).sin();
            std::iter::repeat(x).take(CHANNELS)
        })
        .collect()
}

/// Random parameter changes, some of them invalid, interleaved with
/// processing. No update may leave the engine with a partial set, and the
/// output must stay finite and under the limiter ceiling.
#[test]
fn test_rapid_parameter_changes() {
    let engine = new_engine();
    assert!(engine.start());

    let mut rng = rand::thread_rng();
    let mut output = vec![0.0f32; FRAMES * CHANNELS];
    let mut accepted = 0u64;

    for i in 0..1000 {
        match rng.gen_range(0..5) {
            0 => {
                let threshold: f32 = rng.gen_range(-80.0..0.0);
                let ratio: f32 = if rng.gen_bool(0.1) {
                    -1.0
                } else {
                    rng.gen_range(0.5..20.0)
                };
                let attack: f32 = rng.gen_range(-0.001..0.1);
                let release: f32 = rng.gen_range(0.0..1.0);
                let gain: f32 = rng.gen_range(-12.0..30.0);
                let selector = if rng.gen_bool(0.5) {
                    ChannelSelector::All
                } else {
                    ChannelSelector::Channel(rng.gen_range(0..3))
                };
                if engine
                    .update_parameters(
                        &[threshold; NUM_BANDS],
                        &[ratio; NUM_BANDS],
                        &[attack; NUM_BANDS],
                        &[release; NUM_BANDS],
                        &[gain; NUM_BANDS],
                        selector,
                    )
                    .is_ok()
                {
                    accepted += 1;
                }
            }
            1 => {
                let threshold: f32 = rng.gen_range(0.0..0.05);
                let knee: f32 = rng.gen_range(0.0..0.05);
                if engine.update_gate(threshold, knee, rng.gen_bool(0.8)).is_ok() {
                    accepted += 1;
                }
            }
            2 => {
                let threshold: f32 = rng.gen_range(0.0..0.5);
                let reduction: f32 = rng.gen_range(0.0..1.2);
                if engine
                    .update_deesser(threshold, reduction, rng.gen_bool(0.8))
                    .is_ok()
                {
                    accepted += 1;
                }
            }
            3 => {
                let ceiling: f32 = rng.gen_range(0.0..1.1);
                if engine.set_limiter_ceiling(ceiling).is_ok() {
                    accepted += 1;
                }
            }
            4 => {
                let amplification: f32 = rng.gen_range(-1.0..20.0);
                let _ = engine.set_amplification(amplification);
            }
            _ => unreachable!(),
        }

        let input = sine_block(i * FRAMES, 1000.0, rng.gen_range(0.0..1.0));
        assert_eq!(engine.on_capture(Some(&input), FRAMES), CallbackResult::Continue);
        assert_eq!(
            engine.on_render(Some(&mut output), FRAMES),
            CallbackResult::Continue
        );

        let ceiling = engine.parameters().stages().limiter_ceiling;
        for &s in &output {
            assert!(s.is_finite(), "non-finite output at iteration {}", i);
            assert!(s.abs() <= ceiling + 1e-6, "{} above ceiling {}", s, ceiling);
        }
    }

    let stats = engine.stats();
    assert_eq!(stats.parameter_generation, accepted);
    assert_eq!(stats.applied_generation, accepted);
    assert_eq!(stats.fault, None);
    assert!(engine.is_running());
}

/// Updates racing both callbacks. Control-side snapshots must be whole sets
/// and capture must end on the last published generation.
#[test]
fn test_parameter_swaps_are_atomic_under_callbacks() {
    let engine = Arc::new(new_engine());
    engine.start();
    let done = Arc::new(AtomicBool::new(false));

    let capture = {
        let engine = Arc::clone(&engine);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut offset = 0;
            while !done.load(Ordering::Relaxed) {
                let input = sine_block(offset, 750.0, 0.8);
                assert_eq!(engine.on_capture(Some(&input), FRAMES), CallbackResult::Continue);
                offset += FRAMES;
            }
        })
    };

    let render = {
        let engine = Arc::clone(&engine);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut output = vec![0.0f32; FRAMES * CHANNELS];
            while !done.load(Ordering::Relaxed) {
                engine.on_render(Some(&mut output), FRAMES);
                assert!(output.iter().all(|s| s.is_finite() && s.abs() <= 0.9));
            }
        })
    };

    let observer = {
        let engine = Arc::clone(&engine);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut checked = 0u64;
            while !done.load(Ordering::Relaxed) {
                let set = engine.parameters();
                let first = *set.params(0, 0);
                for band in 0..NUM_BANDS {
                    for channel in 0..CHANNELS {
                        assert_eq!(
                            set.params(band, channel),
                            &first,
                            "torn set at generation {}",
                            set.generation()
                        );
                    }
                }
                checked += 1;
            }
            checked
        })
    };

    // Each update writes one value to every band and channel
    let mut rng = rand::thread_rng();
    for _ in 0..2000 {
        let k: f32 = rng.gen_range(1.0..60.0);
        engine
            .update_parameters(
                &[-k; NUM_BANDS],
                &[1.0 + k / 10.0; NUM_BANDS],
                &[0.001 * k; NUM_BANDS],
                &[0.01 * k; NUM_BANDS],
                &[k / 4.0; NUM_BANDS],
                ChannelSelector::All,
            )
            .unwrap();
    }

    done.store(true, Ordering::Relaxed);
    capture.join().unwrap();
    render.join().unwrap();
    assert!(observer.join().unwrap() > 0);

    // The next callback catches up with the last published generation
    let input = sine_block(0, 750.0, 0.8);
    engine.on_capture(Some(&input), FRAMES);
    let stats = engine.stats();
    assert_eq!(stats.applied_generation, 2000);
    assert_eq!(stats.fault, None);
}

/// Shutdown drains both callback threads before the engine is released
#[test]
fn test_shutdown_with_callbacks_in_flight() {
    let engine = Arc::new(new_engine());
    engine.start();

    let capture = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            let input = sine_block(0, 440.0, 0.5);
            let mut blocks = 0u64;
            while engine.on_capture(Some(&input), FRAMES) == CallbackResult::Continue {
                blocks += 1;
            }
            blocks
        })
    };

    let render = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            let mut output = vec![0.0f32; FRAMES * CHANNELS];
            while engine.on_render(Some(&mut output), FRAMES) == CallbackResult::Continue {}
            // The stopping callback hands back silence
            assert!(output.iter().all(|&s| s == 0.0));
        })
    };

    thread::sleep(Duration::from_millis(50));
    assert!(engine.shutdown(Duration::from_secs(2)));
    assert_eq!(engine.state(), ProcessingState::Stopped);

    assert!(capture.join().unwrap() > 0);
    render.join().unwrap();
    assert_eq!(engine.in_flight(), 0);

    // Both threads have released their handles
    assert_eq!(Arc::strong_count(&engine), 1);
    drop(engine);
}

/// A stop request is observed by whichever callback enters first; both
/// threads then stop
#[test]
fn test_stop_request_reaches_both_threads() {
    let engine = Arc::new(new_engine());
    engine.start();

    let handles: Vec<_> = (0..2)
        .map(|direction| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let mut buffer = vec![0.1f32; FRAMES * CHANNELS];
                loop {
                    let result = if direction == 0 {
                        engine.on_capture(Some(&buffer), FRAMES)
                    } else {
                        engine.on_render(Some(&mut buffer), FRAMES)
                    };
                    if result == CallbackResult::Stop {
                        break;
                    }
                }
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(20));
    assert!(engine.stop());
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(engine.state(), ProcessingState::Stopped);
    assert_eq!(engine.fault(), None);
}

/// Device enumeration must never panic, even without audio hardware
#[cfg(feature = "host")]
#[test]
fn test_device_enumeration_is_stable() {
    use hearing_amp_core::audio::list_input_devices;

    for _ in 0..20 {
        match list_input_devices() {
            Ok(devices) => {
                assert!(!devices
                    .iter()
                    .any(|d| d.name.contains("FAKE_DEVICE_DOES_NOT_EXIST")));
            }
            Err(e) => {
                // Enumeration can fail in CI environments
                println!("Device enumeration failed (expected in CI): {:?}", e);
            }
        }
    }
}
