//! crankbox - A hand-cranked music box
//!
//! A step sequencer whose playhead is driven either by automatic playback
//! or by a virtual crank with momentum. Every move of the playhead works out
//! which notes it passed and hands them to a real-time synthesis engine.

pub mod config;
pub mod synth;
pub mod tune;
pub mod transport;
pub mod engine;

pub use config::CrankboxConfig;
pub use engine::Engine;
pub use transport::MusicBox;
pub use tune::Tune;
