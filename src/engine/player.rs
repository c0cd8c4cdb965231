//! Real-time audio playback using cpal

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{error, info};

use super::Engine;

/// Real-time audio player
pub struct Player {
    stream: Option<Stream>,
    running: Arc<AtomicBool>,
}

impl Player {
    pub fn new() -> Self {
        Self {
            stream: None,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Open the output device and start rendering the engine into it
    ///
    /// `device` selects an output by name; `None` uses the host default.
    pub fn start(&mut self, engine: Arc<Mutex<Engine>>, device: Option<&str>) -> Result<()> {
        let device = find_device(device)?;
        let config = device
            .default_output_config()
            .context("failed to query output config")?;
        let sample_format = config.sample_format();
        let stream_config: StreamConfig = config.into();

        let engine_rate = engine
            .lock()
            .map_err(|_| anyhow!("engine lock poisoned"))?
            .sample_rate();
        if (stream_config.sample_rate.0 as f64 - engine_rate).abs() > f64::EPSILON {
            info!(
                device = stream_config.sample_rate.0,
                engine = engine_rate,
                "device sample rate differs from engine"
            );
        }

        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();

        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32>(&device, &stream_config, engine, running)?,
            SampleFormat::I16 => Self::build_stream::<i16>(&device, &stream_config, engine, running)?,
            SampleFormat::U16 => Self::build_stream::<u16>(&device, &stream_config, engine, running)?,
            _ => return Err(anyhow!("Unsupported sample format")),
        };

        stream.play()?;
        self.stream = Some(stream);
        info!(device = %device.name().unwrap_or_default(), "audio stream started");

        Ok(())
    }

    /// Stop playback
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.stream = None;
    }

    /// Check if currently playing
    pub fn is_playing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn build_stream<T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32>>(
        device: &Device,
        config: &StreamConfig,
        engine: Arc<Mutex<Engine>>,
        running: Arc<AtomicBool>,
    ) -> Result<Stream> {
        let channels = config.channels as usize;
        let mut mono: Vec<f32> = Vec::new();

        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                if !running.load(Ordering::SeqCst) {
                    data.fill(T::from_sample(0.0f32));
                    return;
                }

                let frames = data.len() / channels.max(1);
                mono.resize(frames, 0.0);

                if let Ok(mut eng) = engine.try_lock() {
                    eng.fill_buffer(&mut mono);
                } else {
                    // Control thread holds the engine, skip this block
                    mono.fill(0.0);
                }

                for (frame, &sample) in data.chunks_mut(channels).zip(mono.iter()) {
                    for channel_sample in frame.iter_mut() {
                        *channel_sample = T::from_sample(sample);
                    }
                }
            },
            |err| {
                error!(%err, "audio stream error");
            },
            None,
        )?;

        Ok(stream)
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}

fn find_device(name: Option<&str>) -> Result<Device> {
    let host = cpal::default_host();
    match name {
        Some(name) => host
            .output_devices()?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| anyhow!("Output device '{}' not found", name)),
        None => host
            .default_output_device()
            .ok_or_else(|| anyhow!("No output device available")),
    }
}

/// Native sample rate of an output device
pub fn output_sample_rate(name: Option<&str>) -> Result<u32> {
    let config = find_device(name)?
        .default_output_config()
        .context("failed to query output config")?;
    Ok(config.sample_rate().0)
}

/// Get the default output device name
pub fn default_device_name() -> Option<String> {
    let host = cpal::default_host();
    host.default_output_device().and_then(|d| d.name().ok())
}

/// List all available output devices
pub fn list_output_devices() -> Vec<(String, StreamConfig)> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    if let Ok(output_devices) = host.output_devices() {
        for device in output_devices {
            if let (Ok(name), Ok(config)) = (device.name(), device.default_output_config()) {
                devices.push((name, config.into()));
            }
        }
    }

    devices
}
