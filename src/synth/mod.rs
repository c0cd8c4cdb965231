//! Synthesis building blocks
//!
//! Pitch resolution, oscillators, filters, envelopes, the recipe tables and
//! the voices built from them.

pub mod envelope;
pub mod filter;
pub mod oscillator;
pub mod pitch;
pub mod recipe;
mod reverb;
mod voice;

pub use envelope::{Automation, Envelope, EnvelopeEvent};
pub use filter::{Filter, FilterType};
pub use oscillator::{Oscillator, Waveform};
pub use pitch::{resolve, Drum, Pitch};
pub use recipe::{recipe_for, SourceSpec, Timbre};
pub use reverb::Reverb;
pub use voice::{NoteContext, Source, Voice, VoiceId};
