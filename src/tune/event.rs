//! Note events

use crate::synth::Timbre;
use serde::{Deserialize, Serialize};

/// One note name or an ordered chord
///
/// Serialized as a bare string or an array of strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Notes {
    One(String),
    Chord(Vec<String>),
}

impl Notes {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let names: &[String] = match self {
            Notes::One(name) => std::slice::from_ref(name),
            Notes::Chord(names) => names,
        };
        names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        match self {
            Notes::One(_) => 1,
            Notes::Chord(names) => names.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, pitch: &str) -> bool {
        self.iter().any(|n| n == pitch)
    }

    /// First note of the chord
    pub fn lead(&self) -> Option<&str> {
        self.iter().next()
    }

    /// Add a note, turning a single note into a chord
    pub fn push(&mut self, pitch: &str) {
        match self {
            Notes::One(name) => {
                *self = Notes::Chord(vec![std::mem::take(name), pitch.to_string()]);
            }
            Notes::Chord(names) => names.push(pitch.to_string()),
        }
    }

    /// Remove every occurrence of a note; a chord of one collapses
    pub fn remove(&mut self, pitch: &str) {
        match self {
            Notes::One(name) if name == pitch => *self = Notes::Chord(Vec::new()),
            Notes::One(_) => {}
            Notes::Chord(names) => {
                names.retain(|n| n != pitch);
                if names.len() == 1 {
                    *self = Notes::One(names.remove(0));
                }
            }
        }
    }
}

impl From<&str> for Notes {
    fn from(name: &str) -> Self {
        Notes::One(name.to_string())
    }
}

impl From<&[&str]> for Notes {
    fn from(names: &[&str]) -> Self {
        match names {
            [one] => Notes::One(one.to_string()),
            _ => Notes::Chord(names.iter().map(|n| n.to_string()).collect()),
        }
    }
}

/// A note or chord at a beat offset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// Beats from the start of the tune
    pub time: f64,
    pub note: Notes,
    /// Length in beats
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<f64>,
    /// Instrument override; `None` plays the tune's timbre
    #[serde(default, alias = "synthType", skip_serializing_if = "Option::is_none")]
    pub timbre: Option<Timbre>,
}

impl NoteEvent {
    pub fn new(time: f64, note: impl Into<Notes>, duration: f64) -> Self {
        Self {
            time,
            note: note.into(),
            duration,
            velocity: None,
            timbre: None,
        }
    }

    pub fn with_velocity(mut self, velocity: f64) -> Self {
        self.velocity = Some(velocity);
        self
    }

    pub fn with_timbre(mut self, timbre: Timbre) -> Self {
        self.timbre = Some(timbre);
        self
    }

    /// Velocity, defaulting to full
    pub fn velocity(&self) -> f64 {
        self.velocity.unwrap_or(1.0)
    }

    /// Beat the event ends on
    pub fn end(&self) -> f64 {
        self.time + self.duration
    }

    /// Timbre to play with, given the tune default
    pub fn timbre_or(&self, default: Timbre) -> Timbre {
        self.timbre.unwrap_or(default)
    }

    /// Grid beats covered by the event
    pub fn covered_beats(&self) -> std::ops::RangeInclusive<i64> {
        let first = self.time.floor() as i64;
        let last = ((self.time + self.duration - 0.001).floor() as i64).max(first);
        first..=last
    }
}
