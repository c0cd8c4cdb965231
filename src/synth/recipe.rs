//! Declarative voice recipes
//!
//! Every instrument is a short list of [`SourceSpec`]s: what to generate,
//! how its gain moves, and which filters it passes through. One generic
//! builder ([`crate::synth::Voice::from_recipe`]) interprets them, so adding
//! an instrument means adding a table, not another synthesis routine.

use super::filter::FilterType;
use super::oscillator::Waveform;
use super::pitch::{Drum, Pitch};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Level an exponential decay aims for (-60 dB)
pub const SILENCE: f64 = 0.001;

/// Selected instrument for tonal notes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Timbre {
    Sine,
    Square,
    Saw,
    Triangle,
    Piano,
    #[default]
    #[serde(rename = "Music Box")]
    MusicBox,
}

impl Timbre {
    pub const ALL: [Timbre; 6] = [
        Timbre::Sine,
        Timbre::Square,
        Timbre::Saw,
        Timbre::Triangle,
        Timbre::Piano,
        Timbre::MusicBox,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Timbre::Sine => "Sine",
            Timbre::Square => "Square",
            Timbre::Saw => "Saw",
            Timbre::Triangle => "Triangle",
            Timbre::Piano => "Piano",
            Timbre::MusicBox => "Music Box",
        }
    }

    /// The next timbre in menu order, wrapping around
    pub fn next(self) -> Timbre {
        let index = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Timbre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a source's frequency comes from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrequencySpec {
    /// A multiple of the note frequency
    Ratio(f64),
    /// A fixed frequency in Hz
    Fixed(f64),
    /// Exponential sweep from `from` to `to` Hz over `over` seconds
    Sweep { from: f64, to: f64, over: f64 },
}

/// How a source's gain moves over time; levels are scaled by velocity
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GainSpec {
    /// Instant onset at `level`, exponential decay to silence at `decay` s
    Hit { level: f64, decay: f64 },
    /// Attack, decay, optional sustain approach, release before note stop
    Sustained {
        attack: f64,
        peak: f64,
        /// Level reached at `decay_time` after onset
        decay_to: f64,
        decay_time: f64,
        /// Sustain level and time constant
        sustain: Option<(f64, f64)>,
        /// Release starts this long before the note's stop time
        release_lead: f64,
        release_tau: f64,
        /// Source keeps running this long after the note's stop time
        tail: f64,
    },
    /// Fast attack then exponential decay over `ring` x the note length;
    /// the source stops at `hold` x the note length
    Bell {
        attack: f64,
        peak: f64,
        ring: f64,
        hold: f64,
    },
}

/// A filter stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSpec {
    pub kind: FilterType,
    pub cutoff: f64,
    pub q: f64,
}

/// When a source is part of the voice
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Layer {
    Always,
    /// Only for notes below this frequency
    Below(f64),
}

/// One generator in a recipe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceSpec {
    pub waveform: Waveform,
    pub frequency: FrequencySpec,
    pub gain: GainSpec,
    pub filters: &'static [FilterSpec],
    pub layer: Layer,
}

impl SourceSpec {
    const fn tone(waveform: Waveform, frequency: FrequencySpec, gain: GainSpec) -> Self {
        Self {
            waveform,
            frequency,
            gain,
            filters: &[],
            layer: Layer::Always,
        }
    }

    const fn noise(gain: GainSpec, filters: &'static [FilterSpec]) -> Self {
        Self {
            waveform: Waveform::Noise,
            frequency: FrequencySpec::Fixed(0.0),
            gain,
            filters,
            layer: Layer::Always,
        }
    }

    const fn below(mut self, hz: f64) -> Self {
        self.layer = Layer::Below(hz);
        self
    }

    /// Whether this source plays for a note of the given frequency
    pub fn applies_to(&self, note_hz: Option<f64>) -> bool {
        match (self.layer, note_hz) {
            (Layer::Always, _) => true,
            (Layer::Below(limit), Some(hz)) => hz < limit,
            (Layer::Below(_), None) => false,
        }
    }
}

const fn hit(level: f64, decay: f64) -> GainSpec {
    GainSpec::Hit { level, decay }
}

const fn sweep(from: f64, to: f64, over: f64) -> FrequencySpec {
    FrequencySpec::Sweep { from, to, over }
}

const KICK: &[SourceSpec] = &[
    // Click
    SourceSpec::tone(Waveform::Sine, sweep(160.0, 50.0, 0.03), hit(0.9, 0.1)),
    // Body
    SourceSpec::tone(Waveform::Sine, sweep(60.0, 40.0, 0.2), hit(0.8, 0.4)),
    // Sub
    SourceSpec::tone(Waveform::Sine, sweep(45.0, 30.0, 0.3), hit(0.35, 0.5)),
];

const SNARE: &[SourceSpec] = &[
    SourceSpec::noise(
        hit(0.4, 0.2),
        &[FilterSpec {
            kind: FilterType::BandPass,
            cutoff: 3000.0,
            q: 0.8,
        }],
    ),
    SourceSpec::tone(Waveform::Triangle, FrequencySpec::Fixed(180.0), hit(0.5, 0.1)),
];

const HAT: &[SourceSpec] = &[SourceSpec::noise(
    hit(0.3, 0.1),
    &[FilterSpec {
        kind: FilterType::HighPass,
        cutoff: 8000.0,
        q: 1.5,
    }],
)];

const RIDE: &[SourceSpec] = &[
    SourceSpec::noise(
        hit(0.3, 0.4),
        &[
            FilterSpec {
                kind: FilterType::HighPass,
                cutoff: 6000.0,
                q: 1.5,
            },
            FilterSpec {
                kind: FilterType::Peaking { gain_db: 6.0 },
                cutoff: 10000.0,
                q: 1.0,
            },
        ],
    ),
    // Bell
    SourceSpec::tone(Waveform::Triangle, FrequencySpec::Fixed(1000.0), hit(0.1, 0.3)),
];

const fn synth_gain(peak: f64, decay_to: f64, sustain: f64) -> GainSpec {
    GainSpec::Sustained {
        attack: 0.01,
        peak,
        decay_to,
        decay_time: 0.1,
        sustain: Some((sustain, 0.3)),
        release_lead: 0.05,
        release_tau: 0.1,
        tail: 0.1,
    }
}

const fn synth(waveform: Waveform) -> [SourceSpec; 3] {
    [
        SourceSpec::tone(waveform, FrequencySpec::Ratio(1.0), synth_gain(0.6, 0.4, 0.3)),
        // Detuned copy for width
        SourceSpec::tone(waveform, FrequencySpec::Ratio(1.003), synth_gain(0.1, 0.07, 0.05)),
        // Octave-down weight for bass notes
        SourceSpec::tone(Waveform::Sine, FrequencySpec::Ratio(0.5), synth_gain(0.3, 0.2, 0.15))
            .below(220.0),
    ]
}

const SINE: [SourceSpec; 3] = synth(Waveform::Sine);
const SQUARE: [SourceSpec; 3] = synth(Waveform::Square);
const SAW: [SourceSpec; 3] = synth(Waveform::Saw);
const TRIANGLE: [SourceSpec; 3] = synth(Waveform::Triangle);

const fn piano_gain(peak: f64, decay_to: f64, sustain: Option<(f64, f64)>) -> GainSpec {
    GainSpec::Sustained {
        attack: 0.005,
        peak,
        decay_to,
        decay_time: 0.1,
        sustain,
        release_lead: 0.1,
        release_tau: 0.2,
        tail: 0.2,
    }
}

/// Harmonics fall to half their level by the end of the decay
const fn piano_harmonic(ratio: f64, level: f64, half: f64) -> SourceSpec {
    SourceSpec::tone(
        Waveform::Sine,
        FrequencySpec::Ratio(ratio),
        piano_gain(level, half, None),
    )
}

const PIANO: &[SourceSpec] = &[
    SourceSpec::tone(
        Waveform::Triangle,
        FrequencySpec::Ratio(1.0),
        piano_gain(0.5, 0.3, Some((0.2, 0.8))),
    ),
    piano_harmonic(2.0, 0.25, 0.125),
    piano_harmonic(3.0, 0.15, 0.075),
    piano_harmonic(4.0, 0.1, 0.05),
    piano_harmonic(5.0, 0.05, 0.025),
];

const fn bell(ratio: f64, peak: f64, ring: f64) -> SourceSpec {
    SourceSpec::tone(
        Waveform::Sine,
        FrequencySpec::Ratio(ratio),
        GainSpec::Bell {
            attack: 0.002,
            peak,
            ring,
            hold: 2.0,
        },
    )
}

// Higher partials ring shorter
const MUSIC_BOX: &[SourceSpec] = &[
    bell(1.0, 0.7, 2.0),
    bell(3.0, 0.3, 1.5),
    bell(4.0, 0.2, 1.3),
    bell(7.0, 0.1, 1.1),
    bell(10.0, 0.05, 0.9),
];

/// The recipe for a resolved note in a timbre
///
/// Drums ignore the timbre.
pub fn recipe_for(pitch: Pitch, timbre: Timbre) -> &'static [SourceSpec] {
    match pitch {
        Pitch::Drum(drum) => drum_recipe(drum),
        Pitch::Tone(_) => tonal_recipe(timbre),
    }
}

pub fn drum_recipe(drum: Drum) -> &'static [SourceSpec] {
    match drum {
        Drum::Kick => KICK,
        Drum::Snare => SNARE,
        Drum::Hat => HAT,
        Drum::Ride => RIDE,
    }
}

pub fn tonal_recipe(timbre: Timbre) -> &'static [SourceSpec] {
    match timbre {
        Timbre::Sine => &SINE,
        Timbre::Square => &SQUARE,
        Timbre::Saw => &SAW,
        Timbre::Triangle => &TRIANGLE,
        Timbre::Piano => PIANO,
        Timbre::MusicBox => MUSIC_BOX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timbre_serde_names() {
        let json = serde_json::to_string(&Timbre::MusicBox).unwrap();
        assert_eq!(json, "\"Music Box\"");

        let saw: Timbre = serde_json::from_str("\"Saw\"").unwrap();
        assert_eq!(saw, Timbre::Saw);
        assert!(serde_json::from_str::<Timbre>("\"Kazoo\"").is_err());
    }

    #[test]
    fn test_timbre_cycle() {
        let mut t = Timbre::Sine;
        for _ in 0..Timbre::ALL.len() {
            t = t.next();
        }
        assert_eq!(t, Timbre::Sine);
    }

    #[test]
    fn test_drum_envelopes_in_range() {
        for drum in Drum::ALL {
            let recipe = drum_recipe(drum);
            assert!(!recipe.is_empty() && recipe.len() <= 3);
            for source in recipe {
                match source.gain {
                    GainSpec::Hit { decay, .. } => assert!((0.03..=0.6).contains(&decay)),
                    other => panic!("{drum} uses {other:?}"),
                }
            }
        }
    }

    #[test]
    fn test_sub_oscillator_only_for_bass() {
        let sub = &tonal_recipe(Timbre::Saw)[2];
        assert!(sub.applies_to(Some(110.0)));
        assert!(!sub.applies_to(Some(440.0)));
        assert!(tonal_recipe(Timbre::Saw)[0].applies_to(Some(440.0)));
    }

    #[test]
    fn test_piano_and_music_box_have_overtones() {
        assert_eq!(tonal_recipe(Timbre::Piano).len(), 5);
        let ratios: Vec<f64> = tonal_recipe(Timbre::MusicBox)
            .iter()
            .map(|s| match s.frequency {
                FrequencySpec::Ratio(r) => r,
                _ => 0.0,
            })
            .collect();
        assert_eq!(ratios, vec![1.0, 3.0, 4.0, 7.0, 10.0]);
    }

    #[test]
    fn test_recipe_ignores_timbre_for_drums() {
        let a = recipe_for(Pitch::Drum(Drum::Hat), Timbre::Piano);
        let b = recipe_for(Pitch::Drum(Drum::Hat), Timbre::Sine);
        assert_eq!(a, b);
    }
}
