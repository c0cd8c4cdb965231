//! Note-name resolution
//!
//! Turns identifiers such as `"A4"`, `"Eb3"` or `"KICK"` into either an
//! equal-tempered frequency or a drum.

use std::fmt;
use std::str::FromStr;

/// Concert pitch of A4 in Hz
pub const A4_HZ: f64 = 440.0;

/// Highest octave a note name may carry
pub const MAX_OCTAVE: i32 = 10;

/// The fixed percussion vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Drum {
    Kick,
    Snare,
    Hat,
    Ride,
}

impl Drum {
    pub const ALL: [Drum; 4] = [Drum::Kick, Drum::Snare, Drum::Hat, Drum::Ride];

    pub fn name(self) -> &'static str {
        match self {
            Drum::Kick => "KICK",
            Drum::Snare => "SNARE",
            Drum::Hat => "HAT",
            Drum::Ride => "RIDE",
        }
    }
}

impl FromStr for Drum {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "KICK" => Ok(Drum::Kick),
            "SNARE" => Ok(Drum::Snare),
            "HAT" => Ok(Drum::Hat),
            "RIDE" => Ok(Drum::Ride),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Drum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a note identifier resolves to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pitch {
    /// A pitched note, in Hz
    Tone(f64),
    /// No pitch: synthesize with the drum recipe
    Drum(Drum),
}

/// Whether an identifier names a drum
pub fn is_percussion(identifier: &str) -> bool {
    identifier.parse::<Drum>().is_ok()
}

/// Semitones above C for a letter plus optional accidental
fn pitch_class(name: &str) -> Option<i32> {
    let class = match name {
        "C" => 0,
        "C#" | "Db" => 1,
        "D" => 2,
        "D#" | "Eb" => 3,
        "E" => 4,
        "F" => 5,
        "F#" | "Gb" => 6,
        "G" => 7,
        "G#" | "Ab" => 8,
        "A" => 9,
        "A#" | "Bb" => 10,
        "B" => 11,
        _ => return None,
    };
    Some(class)
}

/// Split `"Eb4"` into its pitch class and octave
fn parse_note(identifier: &str) -> Option<(i32, i32)> {
    let digits_at = identifier.find(|c: char| c.is_ascii_digit())?;
    let (name, octave) = identifier.split_at(digits_at);
    if octave.is_empty() || !octave.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let octave: i32 = octave.parse().ok()?;
    if octave > MAX_OCTAVE {
        return None;
    }
    Some((pitch_class(name)?, octave))
}

/// Resolve a note identifier, transposed by `transpose` semitones
///
/// Returns `None` for identifiers that are neither a drum nor a
/// well-formed note in octaves 0 to [`MAX_OCTAVE`], and for transpositions
/// that leave no finite frequency; callers skip synthesis for those.
pub fn resolve(identifier: &str, transpose: i32) -> Option<Pitch> {
    if let Ok(drum) = identifier.parse::<Drum>() {
        return Some(Pitch::Drum(drum));
    }

    let (class, octave) = parse_note(identifier)?;
    let hz = frequency(class, octave, transpose);
    (hz.is_finite() && hz > 0.0).then_some(Pitch::Tone(hz))
}

/// Frequency of a pitch class in an octave, relative to A4
fn frequency(class: i32, octave: i32, transpose: i32) -> f64 {
    let from_a4 = (class - 9) as f64 / 12.0;
    A4_HZ * 2f64.powf(from_a4) * 2f64.powi(octave - 4) * 2f64.powf(transpose as f64 / 12.0)
}

/// Convenience for callers that only care about tones
pub fn frequency_of(identifier: &str, transpose: i32) -> Option<f64> {
    match resolve(identifier, transpose)? {
        Pitch::Tone(hz) => Some(hz),
        Pitch::Drum(_) => None,
    }
}

/// Octave of a note identifier, if it has one
pub fn octave_of(identifier: &str) -> Option<i32> {
    parse_note(identifier).map(|(_, octave)| octave)
}

/// Pitch class index (0 = C) of a note identifier
pub fn class_of(identifier: &str) -> Option<i32> {
    parse_note(identifier).map(|(class, _)| class)
}
