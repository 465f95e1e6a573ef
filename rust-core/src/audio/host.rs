//! cpal capture/render bridge
//!
//! Opens one input and one output stream at the engine's sample rate,
//! channel count and block size, and forwards every hardware callback into
//! the engine. All processing decisions stay in the engine; this module only
//! forwards buffers and stream notifications.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize, Device, SampleRate, Stream, StreamConfig};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::device::{find_input_device, find_output_device};
use super::engine::{AudioCallback, Direction, Engine};

#[derive(Error, Debug)]
pub enum HostError {
    #[error("No audio device found")]
    NoDevice,

    #[error("Failed to enumerate devices: {0}")]
    Enumerate(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to get device name: {0}")]
    DeviceName(String),

    #[error("Failed to build stream: {0}")]
    BuildStream(String),

    #[error("Failed to play stream: {0}")]
    PlayStream(String),
}

/// Running capture and render streams bound to one engine
pub struct HostStreams {
    engine: Arc<Engine>,
    input: Stream,
    output: Stream,
    input_name: String,
    output_name: String,
}

impl HostStreams {
    /// Open streams on the named devices (`None` = system default)
    ///
    /// Streams are built paused; call `play` to start them.
    pub fn open(
        engine: Arc<Engine>,
        input_name: Option<&str>,
        output_name: Option<&str>,
    ) -> Result<Self, HostError> {
        let input_device = find_input_device(input_name)?;
        let output_device = find_output_device(output_name)?;

        let input_name = input_device
            .name()
            .map_err(|e| HostError::DeviceName(e.to_string()))?;
        let output_name = output_device
            .name()
            .map_err(|e| HostError::DeviceName(e.to_string()))?;

        let input = build_capture(&input_device, &engine)?;
        engine.on_stream_opened(Direction::Capture);
        let output = build_render(&output_device, &engine)?;
        engine.on_stream_opened(Direction::Render);

        log::info!(
            "Streams open: '{}' -> '{}' @ {} Hz, {} ch",
            input_name,
            output_name,
            engine.sample_rate(),
            engine.channels()
        );

        Ok(Self {
            engine,
            input,
            output,
            input_name,
            output_name,
        })
    }

    /// Start both streams and the engine
    pub fn play(&self) -> Result<(), HostError> {
        self.engine.start();
        self.output
            .play()
            .map_err(|e| HostError::PlayStream(e.to_string()))?;
        self.input
            .play()
            .map_err(|e| HostError::PlayStream(e.to_string()))
    }

    /// Pause both streams and request a stop
    pub fn pause(&self) -> Result<(), HostError> {
        self.engine.stop();
        self.input
            .pause()
            .map_err(|e| HostError::PlayStream(e.to_string()))?;
        self.output
            .pause()
            .map_err(|e| HostError::PlayStream(e.to_string()))
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    /// Stop the engine, wait for callbacks to drain, then drop the streams
    ///
    /// # Returns
    /// Whether the engine reached quiescence within `timeout`
    pub fn close(self, timeout: Duration) -> bool {
        self.engine.on_stream_closing(Direction::Capture);
        self.engine.on_stream_closing(Direction::Render);
        let quiescent = self.engine.shutdown(timeout);

        if let Err(e) = self.input.pause() {
            log::warn!("Failed to pause input stream: {}", e);
        }
        if let Err(e) = self.output.pause() {
            log::warn!("Failed to pause output stream: {}", e);
        }
        drop(self.input);
        drop(self.output);
        quiescent
    }
}

fn stream_config(engine: &Engine, buffer_size: BufferSize) -> StreamConfig {
    StreamConfig {
        channels: engine.channels() as u16,
        sample_rate: SampleRate(engine.sample_rate()),
        buffer_size,
    }
}

/// Try the engine's block size first; fall back to the device default
fn with_buffer_fallback<F>(engine: &Engine, mut build: F) -> Result<Stream, HostError>
where
    F: FnMut(&StreamConfig) -> Result<Stream, cpal::BuildStreamError>,
{
    let fixed = stream_config(
        engine,
        BufferSize::Fixed(engine.frames_per_callback() as u32),
    );
    match build(&fixed) {
        Ok(stream) => Ok(stream),
        Err(e) => {
            log::warn!(
                "Fixed buffer of {} frames rejected ({}), using device default",
                engine.frames_per_callback(),
                e
            );
            build(&stream_config(engine, BufferSize::Default))
                .map_err(|e| HostError::BuildStream(e.to_string()))
        }
    }
}

fn build_capture(device: &Device, engine: &Arc<Engine>) -> Result<Stream, HostError> {
    let channels = engine.channels();
    with_buffer_fallback(engine, |config| {
        let data_engine = Arc::clone(engine);
        let error_engine = Arc::clone(engine);
        device.build_input_stream(
            config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                // cpal cannot be stopped from inside its callback; the engine
                // keeps answering Stop until the control thread pauses us
                data_engine.on_capture(Some(data), data.len() / channels);
            },
            move |err| {
                error_engine.on_error_before_close(Direction::Capture, &err.to_string());
            },
            None,
        )
    })
}

fn build_render(device: &Device, engine: &Arc<Engine>) -> Result<Stream, HostError> {
    let channels = engine.channels();
    with_buffer_fallback(engine, |config| {
        let data_engine = Arc::clone(engine);
        let error_engine = Arc::clone(engine);
        device.build_output_stream(
            config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels;
                data_engine.on_render(Some(data), frames);
            },
            move |err| {
                error_engine.on_error_before_close(Direction::Render, &err.to_string());
            },
            None,
        )
    })
}
