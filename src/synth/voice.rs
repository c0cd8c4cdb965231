//! One sounding note
//!
//! A [`Voice`] is every source a trigger created, summed through one gain.
//! All timing is fixed when the voice is built: each source knows when it
//! starts, how its gain and frequency move, and when it stops.

use super::envelope::Envelope;
use super::filter::Filter;
use super::oscillator::{Oscillator, Waveform};
use super::recipe::{FrequencySpec, GainSpec, SourceSpec, SILENCE};
use std::fmt;

/// Identity of a voice: a monotonic trigger sequence number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VoiceId(pub u64);

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Everything a recipe needs to become sound
#[derive(Debug, Clone, Copy)]
pub struct NoteContext {
    /// Clock time of the onset, seconds
    pub start: f64,
    /// Note length in seconds
    pub length: f64,
    /// Resolved frequency, `None` for drums
    pub frequency: Option<f64>,
    pub velocity: f64,
    pub sample_rate: f64,
    pub seed: u64,
}

impl NoteContext {
    /// Clock time the note is released
    pub fn stop(&self) -> f64 {
        self.start + self.length
    }
}

/// A single generator with its gain envelope and filters
#[derive(Debug, Clone)]
pub struct Source {
    oscillator: Oscillator,
    filters: Vec<Filter>,
    gain: Envelope,
    frequency: Option<Envelope>,
    start: f64,
    stop: f64,
}

impl Source {
    /// Schedule a source from its spec
    pub fn from_spec(spec: &SourceSpec, note: &NoteContext) -> Self {
        let t0 = note.start;
        let sample_rate = note.sample_rate;

        let (oscillator, frequency) = match (spec.waveform, spec.frequency) {
            (Waveform::Noise, _) => (Oscillator::noise(note.seed, sample_rate), None),
            (waveform, FrequencySpec::Ratio(ratio)) => {
                let hz = note.frequency.unwrap_or(0.0) * ratio;
                (Oscillator::new(waveform, hz, sample_rate), None)
            }
            (waveform, FrequencySpec::Fixed(hz)) => (Oscillator::new(waveform, hz, sample_rate), None),
            (waveform, FrequencySpec::Sweep { from, to, over }) => {
                let mut env = Envelope::new(from);
                env.set_value_at(from, t0).exponential_ramp_to(to, t0 + over);
                (Oscillator::new(waveform, from, sample_rate), Some(env))
            }
        };

        let level = |value: f64| value * note.velocity;
        let mut gain = Envelope::new(0.0);
        let stop = match spec.gain {
            GainSpec::Hit { level: peak, decay } => {
                gain.set_value_at(level(peak), t0)
                    .exponential_ramp_to(SILENCE, t0 + decay);
                t0 + decay
            }
            GainSpec::Sustained {
                attack,
                peak,
                decay_to,
                decay_time,
                sustain,
                release_lead,
                release_tau,
                tail,
            } => {
                gain.set_value_at(0.0, t0)
                    .linear_ramp_to(level(peak), t0 + attack)
                    .exponential_ramp_to(level(decay_to), t0 + decay_time);
                if let Some((sustain_level, tau)) = sustain {
                    gain.set_target_at(level(sustain_level), t0 + decay_time, tau);
                }
                let release_at = (note.stop() - release_lead).max(t0);
                gain.set_target_at(0.0, release_at, release_tau);
                note.stop() + tail
            }
            GainSpec::Bell {
                attack,
                peak,
                ring,
                hold,
            } => {
                gain.set_value_at(0.0, t0)
                    .linear_ramp_to(level(peak), t0 + attack)
                    .exponential_ramp_to(SILENCE, t0 + (note.length * ring).max(attack * 2.0));
                t0 + (note.length * hold).max(attack * 2.0)
            }
        };

        let filters = spec
            .filters
            .iter()
            .map(|f| Filter::new(f.kind, f.cutoff, f.q, sample_rate))
            .collect();

        Self {
            oscillator,
            filters,
            gain,
            frequency,
            start: t0,
            stop,
        }
    }

    /// A plain sine at a fixed level between `start` and `stop`
    pub fn steady(hz: f64, level: f64, start: f64, stop: f64, sample_rate: f64) -> Self {
        let mut gain = Envelope::new(0.0);
        gain.set_value_at(level, start);
        Self {
            oscillator: Oscillator::new(Waveform::Sine, hz, sample_rate),
            filters: Vec::new(),
            gain,
            frequency: None,
            start,
            stop,
        }
    }

    pub fn stop_time(&self) -> f64 {
        self.stop
    }

    pub fn gain_at(&self, t: f64) -> f64 {
        self.gain.value_at(t)
    }

    /// Render the sample at clock time `t`
    pub fn process(&mut self, t: f64) -> f64 {
        if t < self.start || t >= self.stop {
            return 0.0;
        }
        if let Some(frequency) = &self.frequency {
            self.oscillator.set_frequency(frequency.value_at(t));
        }
        let mut sample = self.oscillator.generate();
        for filter in &mut self.filters {
            sample = filter.process(sample);
        }
        sample * self.gain.value_at(t)
    }
}

/// A live note: all sources of one trigger behind one summing gain
#[derive(Debug, Clone)]
pub struct Voice {
    id: VoiceId,
    note: String,
    start: f64,
    sources: Vec<Source>,
    gain: f64,
}

impl Voice {
    /// Build a voice from a recipe, skipping layers that don't apply
    pub fn from_recipe(id: VoiceId, note: &str, recipe: &[SourceSpec], ctx: &NoteContext) -> Self {
        let sources = recipe
            .iter()
            .enumerate()
            .filter(|(_, spec)| spec.applies_to(ctx.frequency))
            .map(|(i, spec)| {
                let ctx = NoteContext {
                    seed: ctx.seed.wrapping_add(i as u64),
                    ..*ctx
                };
                Source::from_spec(spec, &ctx)
            })
            .collect();
        Self::from_sources(id, note, ctx.start, sources)
    }

    pub fn from_sources(id: VoiceId, note: &str, start: f64, sources: Vec<Source>) -> Self {
        Self {
            id,
            note: note.to_string(),
            start,
            sources,
            gain: 1.0,
        }
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn note(&self) -> &str {
        &self.note
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Clock time the last source stops
    pub fn end_time(&self) -> f64 {
        self.sources
            .iter()
            .map(Source::stop_time)
            .fold(self.start, f64::max)
    }

    /// Whether every source has stopped by clock time `t`
    pub fn is_finished(&self, t: f64) -> bool {
        t >= self.end_time()
    }

    /// Stop every source at clock time `t` and mute the summing gain
    pub fn stop(&mut self, t: f64) {
        for source in &mut self.sources {
            source.stop = source.stop.min(t).max(source.start);
        }
        self.gain = 0.0;
    }

    /// Render the voice's sample at clock time `t`
    pub fn process(&mut self, t: f64) -> f64 {
        if self.gain == 0.0 {
            return 0.0;
        }
        let sum: f64 = self.sources.iter_mut().map(|s| s.process(t)).sum();
        sum * self.gain
    }
}
