//! WAV capture of the engine's output
//!
//! Offline rendering drives the engine's clock directly instead of a
//! device callback, so a recording is sample-exact and faster than real
//! time.

use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

use super::Engine;

/// Mono 32-bit float WAV writer
pub struct Recorder {
    writer: WavWriter<BufWriter<File>>,
    sample_rate: u32,
    frames_written: u64,
    peak: f32,
    block: Vec<f32>,
}

impl Recorder {
    /// Create a recorder writing to `path`
    pub fn new(path: &Path, sample_rate: u32) -> Result<Self> {
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };

        let writer = WavWriter::create(path, spec)
            .with_context(|| format!("failed to create WAV file: {:?}", path))?;

        Ok(Self {
            writer,
            sample_rate,
            frames_written: 0,
            peak: 0.0,
            block: Vec::new(),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Largest absolute sample written so far
    pub fn peak(&self) -> f32 {
        self.peak
    }

    /// Get the duration recorded in seconds
    pub fn duration_secs(&self) -> f64 {
        self.frames_written as f64 / self.sample_rate as f64
    }

    /// Write a buffer of samples
    pub fn write_buffer(&mut self, buffer: &[f32]) -> Result<()> {
        for &sample in buffer {
            self.writer
                .write_sample(sample)
                .context("failed to write sample")?;
            self.peak = self.peak.max(sample.abs());
        }
        self.frames_written += buffer.len() as u64;
        Ok(())
    }

    /// Render `frames` samples from the engine in blocks of `block_size`
    pub fn capture(&mut self, engine: &mut Engine, frames: usize, block_size: usize) -> Result<()> {
        let block_size = block_size.max(1);
        let mut remaining = frames;
        let mut block = std::mem::take(&mut self.block);
        while remaining > 0 {
            let n = remaining.min(block_size);
            block.resize(n, 0.0);
            engine.fill_buffer(&mut block);
            self.write_buffer(&block)?;
            remaining -= n;
        }
        self.block = block;
        Ok(())
    }

    /// Write the header and close the file
    pub fn finalize(self) -> Result<()> {
        info!(
            seconds = self.duration_secs(),
            peak = self.peak,
            "recording finished"
        );
        self.writer.finalize().context("failed to finalize WAV file")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrankboxConfig;
    use crate::engine::AudioBackend;
    use crate::synth::Timbre;
    use tempfile::NamedTempFile;

    fn running_engine(sample_rate: u32) -> Engine {
        Engine::with_backend(
            &CrankboxConfig::default(),
            AudioBackend::running(sample_rate as f64),
        )
    }

    #[test]
    fn test_recorder_creation() {
        let file = NamedTempFile::new().unwrap();
        let recorder = Recorder::new(file.path(), 44100).unwrap();

        assert_eq!(recorder.sample_rate(), 44100);
        assert_eq!(recorder.frames_written(), 0);
        assert_eq!(recorder.duration_secs(), 0.0);
    }

    #[test]
    fn test_recorder_write_buffer_tracks_peak() {
        let file = NamedTempFile::new().unwrap();
        let mut recorder = Recorder::new(file.path(), 44100).unwrap();

        recorder.write_buffer(&[0.1, -0.6, 0.3]).unwrap();

        assert_eq!(recorder.frames_written(), 3);
        assert_eq!(recorder.peak(), 0.6);
    }

    #[test]
    fn test_capture_advances_engine_clock() {
        let file = NamedTempFile::new().unwrap();
        let mut recorder = Recorder::new(file.path(), 22050).unwrap();
        let mut engine = running_engine(22050);

        recorder.capture(&mut engine, 22050, 500).unwrap();

        assert_eq!(recorder.frames_written(), 22050);
        assert!((recorder.duration_secs() - 1.0).abs() < 1e-9);
        assert!((engine.now() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_capture_produces_valid_wav() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();

        {
            let mut recorder = Recorder::new(&path, 44100).unwrap();
            let mut engine = running_engine(44100);
            engine.trigger("E5", 1.0, 1.0, Timbre::MusicBox, 120.0);
            recorder.capture(&mut engine, 4410, 512).unwrap();
            assert!(recorder.peak() > 0.05);
            recorder.finalize().unwrap();
        }

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();

        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 44100);
        assert_eq!(spec.bits_per_sample, 32);
        assert_eq!(spec.sample_format, SampleFormat::Float);

        let samples: Vec<f32> = reader.into_samples().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 4410);
        assert!(samples.iter().any(|s| s.abs() > 0.05));
    }
}
