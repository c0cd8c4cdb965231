//! Audio engine for crankbox
//!
//! Turns note triggers into scheduled voices and renders the mix on the
//! backend's sample clock.

mod backend;
mod player;
mod polyphony;
mod recorder;

pub use backend::{AudioBackend, BackendError, BackendState};
pub use player::{default_device_name, list_output_devices, output_sample_rate, Player};
pub use polyphony::Polyphony;
pub use recorder::Recorder;

use crate::config::CrankboxConfig;
use crate::synth::{recipe_for, resolve, NoteContext, Pitch, Reverb, Source, Timbre, Voice, VoiceId};
use crate::transport::{NoteRequest, NoteSink};
use tracing::{debug, info};

/// Notes shorter than this many beats are inaudible and skipped
pub const MIN_DURATION_BEATS: f64 = 0.05;

/// The main audio engine
pub struct Engine {
    backend: AudioBackend,
    polyphony: Polyphony,
    reverb: Reverb,
    volume: f64,
    reverb_mix: f64,
    transpose: i32,
}

impl Engine {
    /// Create an engine whose backend waits for the first [`Engine::wake`]
    pub fn new(config: &CrankboxConfig) -> Self {
        let backend = AudioBackend::new(config.audio.sample_rate as f64);
        Self::with_backend(config, backend)
    }

    /// Create an engine on an existing backend handle
    pub fn with_backend(config: &CrankboxConfig, backend: AudioBackend) -> Self {
        let sample_rate = backend.sample_rate();
        Self {
            backend,
            polyphony: Polyphony::new(config.polyphony.max_voices, config.polyphony.evict_batch),
            reverb: Reverb::new(sample_rate),
            volume: config.master.volume as f64,
            reverb_mix: config.master.reverb_mix as f64,
            transpose: config.master.transpose,
        }
    }

    /// Get the sample rate
    pub fn sample_rate(&self) -> f64 {
        self.backend.sample_rate()
    }

    /// Current time on the sample clock
    pub fn now(&self) -> f64 {
        self.backend.now()
    }

    pub fn backend(&self) -> &AudioBackend {
        &self.backend
    }

    /// Check if the engine is running
    pub fn is_running(&self) -> bool {
        self.backend.is_running()
    }

    /// Resume the backend after a user interaction
    pub fn wake(&mut self) {
        if self.backend.is_running() {
            return;
        }
        match self.backend.resume() {
            Ok(()) => info!(sample_rate = self.sample_rate(), "audio backend running"),
            Err(err) => debug!(%err, "cannot resume audio backend"),
        }
    }

    /// Close the backend; triggers are ignored afterwards
    pub fn close(&mut self) {
        self.stop_all();
        self.backend.close();
        info!("audio backend closed");
    }

    pub fn transpose(&self) -> i32 {
        self.transpose
    }

    /// Shift later triggers by `semitones`, within two octaves either way
    pub fn set_transpose(&mut self, semitones: i32) {
        self.transpose = semitones.clamp(-24, 24);
        info!(transpose = self.transpose, "transpose changed");
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: f64) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    /// Number of live voices
    pub fn voice_count(&self) -> usize {
        self.polyphony.len()
    }

    pub fn polyphony(&self) -> &Polyphony {
        &self.polyphony
    }

    /// Schedule one note starting now
    ///
    /// Returns `None` when nothing was scheduled: the backend is not
    /// running, the note is too short or silent, or its name does not
    /// resolve.
    pub fn trigger(
        &mut self,
        note: &str,
        duration_beats: f64,
        velocity: f64,
        timbre: Timbre,
        bpm: f64,
    ) -> Option<VoiceId> {
        if !self.backend.is_running() {
            debug!(note, "backend not running, trigger ignored");
            return None;
        }
        if duration_beats < MIN_DURATION_BEATS || bpm <= 0.0 {
            debug!(note, duration_beats, "note too short, trigger ignored");
            return None;
        }
        if !(velocity > 0.0 && velocity.is_finite()) {
            debug!(note, velocity, "silent velocity, trigger ignored");
            return None;
        }
        let Some(pitch) = resolve(note, self.transpose) else {
            debug!(note, "unresolvable note skipped");
            return None;
        };

        let id = self.polyphony.next_id();
        let ctx = NoteContext {
            start: self.now(),
            length: duration_beats * 60.0 / bpm,
            frequency: match pitch {
                Pitch::Tone(hz) => Some(hz),
                Pitch::Drum(_) => None,
            },
            velocity: velocity.min(1.0),
            sample_rate: self.sample_rate(),
            seed: id.0,
        };
        let voice = Voice::from_recipe(id, note, recipe_for(pitch, timbre), &ctx);
        self.polyphony.register(voice, ctx.start);
        Some(id)
    }

    /// Play a 440 Hz sine for half a second
    pub fn test_tone(&mut self) -> Option<VoiceId> {
        if !self.backend.is_running() {
            return None;
        }
        let id = self.polyphony.next_id();
        let now = self.now();
        let source = Source::steady(440.0, 0.2, now, now + 0.5, self.sample_rate());
        let voice = Voice::from_sources(id, "A4", now, vec![source]);
        self.polyphony.register(voice, now);
        Some(id)
    }

    /// Stop every sounding voice immediately
    pub fn stop_all(&mut self) {
        let now = self.now();
        self.polyphony.stop_all(now);
        self.reverb.reset();
    }

    /// Generate the next sample and move the clock forward
    pub fn process(&mut self) -> f64 {
        if !self.backend.is_running() {
            return 0.0;
        }
        let t = self.now();

        let mut dry = 0.0;
        for voice in self.polyphony.voices_mut() {
            dry += voice.process(t);
        }
        if !dry.is_finite() {
            dry = 0.0;
        }
        let wet = self.reverb.process(dry * self.reverb_mix);

        self.backend.advance(1);
        soft_clip((dry + wet) * self.volume)
    }

    /// Fill a buffer with samples, then drop finished voices
    pub fn fill_buffer(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process() as f32;
        }
        self.polyphony.reap(self.now());
    }
}

impl NoteSink for Engine {
    fn play(&mut self, request: &NoteRequest<'_>) -> Option<VoiceId> {
        self.trigger(
            request.note,
            request.duration,
            request.velocity,
            request.timbre,
            request.bpm,
        )
    }

    fn wake(&mut self) {
        Engine::wake(self);
    }

    fn stop_all(&mut self) {
        Engine::stop_all(self);
    }

    fn reap(&mut self) {
        let now = self.now();
        self.polyphony.reap(now);
    }
}

fn soft_clip(x: f64) -> f64 {
    x.tanh()
}
