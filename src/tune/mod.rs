//! Tunes and their note patterns
//!
//! A tune is a named, looping pattern with a tempo and a default timbre.
//! Tune files are JSON:
//!
//! ```json
//! {
//!   "name": "Waltz",
//!   "bpm": 96,
//!   "timbre": "Music Box",
//!   "totalBeats": 24,
//!   "pattern": [
//!     { "time": 0, "note": "C5", "duration": 1 },
//!     { "time": 1, "note": ["E4", "G4"], "duration": 0.5, "velocity": 0.6 }
//!   ]
//! }
//! ```

mod event;
pub mod library;
mod pattern;

pub use event::{NoteEvent, Notes};
pub use pattern::{BeatTarget, CellState, GridRow, Pattern, TOGGLE_DURATION};

use crate::synth::Timbre;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Error type for loading and validating tunes
#[derive(Debug, Error)]
pub enum TuneError {
    #[error("failed to access tune file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed tune: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid tune: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tune {
    pub name: String,
    pub bpm: f64,
    /// Default instrument for events without an override
    #[serde(alias = "synthType")]
    pub timbre: Timbre,
    pub pattern: Pattern,
    pub total_beats: f64,
}

impl Tune {
    pub fn new(name: &str, bpm: f64, timbre: Timbre, total_beats: f64, events: Vec<NoteEvent>) -> Self {
        Self {
            name: name.to_string(),
            bpm,
            timbre,
            pattern: Pattern::new(events),
            total_beats,
        }
    }

    /// Parse and validate a tune from JSON text
    pub fn from_json(text: &str) -> Result<Self, TuneError> {
        let tune: Tune = serde_json::from_str(text)?;
        tune.validate()?;
        Ok(tune)
    }

    /// Pretty JSON, events in pattern order
    pub fn to_json(&self) -> Result<String, TuneError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, TuneError> {
        let text = std::fs::read_to_string(path).map_err(|source| TuneError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn save(&self, path: &Path) -> Result<(), TuneError> {
        std::fs::write(path, self.to_json()?).map_err(|source| TuneError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// File name the tune saves under by default
    pub fn file_name(&self) -> String {
        let stem: Vec<String> = self
            .name
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();
        format!("{}.json", stem.join("_"))
    }

    /// Check the invariants load relies on
    ///
    /// Events running past the end of the loop are tolerated with a warning.
    pub fn validate(&self) -> Result<(), TuneError> {
        if self.name.trim().is_empty() {
            return Err(TuneError::Invalid("name is empty".into()));
        }
        if !(self.bpm.is_finite() && self.bpm > 0.0) {
            return Err(TuneError::Invalid(format!("bpm must be positive, got {}", self.bpm)));
        }
        if !(self.total_beats.is_finite() && self.total_beats > 0.0) {
            return Err(TuneError::Invalid(format!(
                "totalBeats must be positive, got {}",
                self.total_beats
            )));
        }

        for (index, event) in self.pattern.events().iter().enumerate() {
            if !(event.time.is_finite() && event.time >= 0.0) {
                return Err(TuneError::Invalid(format!("event {index}: bad time {}", event.time)));
            }
            if !(event.duration.is_finite() && event.duration > 0.0) {
                return Err(TuneError::Invalid(format!(
                    "event {index}: duration must be positive, got {}",
                    event.duration
                )));
            }
            if event.note.is_empty() {
                return Err(TuneError::Invalid(format!("event {index}: no notes")));
            }
            if let Some(velocity) = event.velocity {
                if !(velocity > 0.0 && velocity <= 1.0) {
                    return Err(TuneError::Invalid(format!(
                        "event {index}: velocity must be in (0, 1], got {velocity}"
                    )));
                }
            }
            if event.end() > self.total_beats {
                warn!(
                    tune = %self.name,
                    index,
                    end = event.end(),
                    total_beats = self.total_beats,
                    "event runs past the end of the tune"
                );
            }
        }
        Ok(())
    }

    /// Scale the tune's timeline, loop length included
    pub fn retime(&mut self, factor: f64) -> bool {
        if self.pattern.retime(factor) {
            self.total_beats *= factor;
            true
        } else {
            false
        }
    }

    /// Timbre an event plays with
    pub fn timbre_of(&self, event: &NoteEvent) -> Timbre {
        event.timbre_or(self.timbre)
    }
}
