//! Configuration schema definitions

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Main configuration for crankbox
///
/// Every section is optional; missing keys take their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrankboxConfig {
    /// Audio output settings
    #[serde(default)]
    pub audio: AudioConfig,

    /// Master bus settings (volume, transpose, reverb)
    #[serde(default)]
    pub master: MasterConfig,

    /// Playback and dispatch settings
    #[serde(default)]
    pub transport: TransportConfig,

    /// Voice ceiling
    #[serde(default)]
    pub polyphony: PolyphonyConfig,

    /// Crank feel
    #[serde(default)]
    pub crank: CrankConfig,
}

impl CrankboxConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // Validate audio settings
        if self.audio.sample_rate < 8000 || self.audio.sample_rate > 192000 {
            bail!("Sample rate must be between 8000 and 192000");
        }
        if self.audio.buffer_size < 64 || self.audio.buffer_size > 8192 {
            bail!("Buffer size must be between 64 and 8192");
        }

        // Validate master settings
        if !(0.0..=1.0).contains(&self.master.volume) {
            bail!("Master volume must be between 0.0 and 1.0");
        }
        if !(-24..=24).contains(&self.master.transpose) {
            bail!("Transpose must be between -24 and 24 semitones");
        }
        if !(0.0..=1.0).contains(&self.master.reverb_mix) {
            bail!("Reverb mix must be between 0.0 and 1.0");
        }

        let transport = &self.transport;
        if transport.tick_rate_hz <= 0.0 {
            bail!("Transport tick rate must be positive");
        }
        if transport.beats_per_page == 0 {
            bail!("Beats per page must be at least 1");
        }
        if transport.max_dispatch == 0 {
            bail!("Max dispatch must be at least 1");
        }
        if transport.playback_chord_notes == 0 || transport.crank_chord_notes == 0 {
            bail!("Chord note limits must be at least 1");
        }
        if transport.crank_step <= 0.0 {
            bail!("Crank step must be positive");
        }

        if self.polyphony.max_voices == 0 {
            bail!("Max voices must be at least 1");
        }
        if self.polyphony.evict_batch == 0 || self.polyphony.evict_batch > self.polyphony.max_voices {
            bail!(
                "Evict batch must be between 1 and max voices ({})",
                self.polyphony.max_voices
            );
        }

        let crank = &self.crank;
        if crank.threshold_deg <= 0.0 {
            bail!("Crank threshold must be positive");
        }
        if crank.cap <= 0.0 {
            bail!("Momentum cap must be positive");
        }
        if crank.deposit < 0.0 || crank.reverse_drain < 0.0 {
            bail!("Momentum deposit and drain must not be negative");
        }
        if crank.decay_step <= 0.0 || crank.decay_period_ms == 0 {
            bail!("Momentum decay must be positive");
        }
        if crank.coast_hz <= 0.0 {
            bail!("Coast rate must be positive");
        }
        if crank.drag_gain <= 0.0 || crank.drag_deadzone < 0.0 {
            bail!("Drag gain must be positive and deadzone not negative");
        }

        Ok(())
    }
}

/// Audio output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sample rate in Hz (default: 44100)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Buffer size in samples (default: 512)
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Output device name (None = default device)
    #[serde(default)]
    pub device: Option<String>,
}

fn default_sample_rate() -> u32 { 44100 }
fn default_buffer_size() -> usize { 512 }

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            buffer_size: default_buffer_size(),
            device: None,
        }
    }
}

/// Master bus settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterConfig {
    /// Master volume 0.0-1.0 (default: 0.7)
    #[serde(default = "default_volume")]
    pub volume: f32,

    /// Semitones applied to every tonal note (default: 0)
    #[serde(default)]
    pub transpose: i32,

    /// Send level into the shared reverb (default: 0.1)
    #[serde(default = "default_reverb_mix")]
    pub reverb_mix: f32,
}

fn default_volume() -> f32 { 0.7 }
fn default_reverb_mix() -> f32 { 0.1 }

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            transpose: 0,
            reverb_mix: default_reverb_mix(),
        }
    }
}

/// Playback and dispatch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Automatic playback ticks per second (default: 30)
    #[serde(default = "default_tick_rate")]
    pub tick_rate_hz: f64,

    /// Beats shown per grid page (default: 8)
    #[serde(default = "default_beats_per_page")]
    pub beats_per_page: u32,

    /// Most note triggers one advance may send (default: 12)
    #[serde(default = "default_max_dispatch")]
    pub max_dispatch: usize,

    /// Chord notes played during automatic playback (default: 4)
    #[serde(default = "default_playback_chord_notes")]
    pub playback_chord_notes: usize,

    /// Chord notes played per crank step (default: 1)
    #[serde(default = "default_crank_chord_notes")]
    pub crank_chord_notes: usize,

    /// Beats moved by one crank step (default: 0.125)
    #[serde(default = "default_crank_step")]
    pub crank_step: f64,
}

fn default_tick_rate() -> f64 { 30.0 }
fn default_beats_per_page() -> u32 { 8 }
fn default_max_dispatch() -> usize { 12 }
fn default_playback_chord_notes() -> usize { 4 }
fn default_crank_chord_notes() -> usize { 1 }
fn default_crank_step() -> f64 { 0.125 }

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: default_tick_rate(),
            beats_per_page: default_beats_per_page(),
            max_dispatch: default_max_dispatch(),
            playback_chord_notes: default_playback_chord_notes(),
            crank_chord_notes: default_crank_chord_notes(),
            crank_step: default_crank_step(),
        }
    }
}

/// Voice table limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolyphonyConfig {
    /// Most voices alive at once (default: 24)
    #[serde(default = "default_max_voices")]
    pub max_voices: usize,

    /// Oldest voices dropped when the ceiling is hit (default: 8)
    #[serde(default = "default_evict_batch")]
    pub evict_batch: usize,
}

fn default_max_voices() -> usize { 24 }
fn default_evict_batch() -> usize { 8 }

impl Default for PolyphonyConfig {
    fn default() -> Self {
        Self {
            max_voices: default_max_voices(),
            evict_batch: default_evict_batch(),
        }
    }
}

/// Which way the crank is allowed to turn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CrankLock {
    #[default]
    TwoWay,
    /// Backward turns are ignored
    Forward,
    /// Forward turns are ignored
    Rewind,
}

impl CrankLock {
    /// The next lock mode, wrapping around
    pub fn next(self) -> CrankLock {
        match self {
            CrankLock::TwoWay => CrankLock::Forward,
            CrankLock::Forward => CrankLock::Rewind,
            CrankLock::Rewind => CrankLock::TwoWay,
        }
    }
}

/// Crank input and momentum settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrankConfig {
    /// Allowed turning direction: two-way, forward or rewind (default: two-way)
    #[serde(default)]
    pub lock: CrankLock,

    /// Degrees of rotation per step (default: 15)
    #[serde(default = "default_threshold")]
    pub threshold_deg: f64,

    /// Minimum time between steps (default: 16)
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,

    /// Momentum added per forward step (default: 20)
    #[serde(default = "default_deposit")]
    pub deposit: f64,

    /// Momentum removed per backward step (default: 10)
    #[serde(default = "default_reverse_drain")]
    pub reverse_drain: f64,

    /// Momentum ceiling (default: 100)
    #[serde(default = "default_cap")]
    pub cap: f64,

    /// Momentum lost per decay tick (default: 0.6)
    #[serde(default = "default_decay_step")]
    pub decay_step: f64,

    /// Time between decay ticks (default: 60)
    #[serde(default = "default_decay_period")]
    pub decay_period_ms: u64,

    /// Coasting ticks per second (default: 20)
    #[serde(default = "default_coast_hz")]
    pub coast_hz: f64,

    /// Beats per second of coasting per unit of momentum (default: 0.0125)
    #[serde(default = "default_coast_gain")]
    pub coast_gain: f64,

    /// Winding becomes coasting after this long without steps (default: 250)
    #[serde(default = "default_winding_idle")]
    pub winding_idle_ms: u64,

    /// Degrees of rotation per dragged pixel (default: 1.2)
    #[serde(default = "default_drag_gain")]
    pub drag_gain: f64,

    /// Drag movements at or below this many pixels are ignored (default: 5)
    #[serde(default = "default_drag_deadzone")]
    pub drag_deadzone: f64,
}

fn default_threshold() -> f64 { 15.0 }
fn default_debounce() -> u64 { 16 }
fn default_deposit() -> f64 { 20.0 }
fn default_reverse_drain() -> f64 { 10.0 }
fn default_cap() -> f64 { 100.0 }
fn default_decay_step() -> f64 { 0.6 }
fn default_decay_period() -> u64 { 60 }
fn default_coast_hz() -> f64 { 20.0 }
fn default_coast_gain() -> f64 { 0.0125 }
fn default_winding_idle() -> u64 { 250 }
fn default_drag_gain() -> f64 { 1.2 }
fn default_drag_deadzone() -> f64 { 5.0 }

impl Default for CrankConfig {
    fn default() -> Self {
        Self {
            lock: CrankLock::default(),
            threshold_deg: default_threshold(),
            debounce_ms: default_debounce(),
            deposit: default_deposit(),
            reverse_drain: default_reverse_drain(),
            cap: default_cap(),
            decay_step: default_decay_step(),
            decay_period_ms: default_decay_period(),
            coast_hz: default_coast_hz(),
            coast_gain: default_coast_gain(),
            winding_idle_ms: default_winding_idle(),
            drag_gain: default_drag_gain(),
            drag_deadzone: default_drag_deadzone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_audio_config() {
        let yaml = "sample_rate: 48000";
        let config: AudioConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.sample_rate, 48000);
        assert_eq!(config.buffer_size, 512); // default
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: CrankboxConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.polyphony.max_voices, 24);
        assert_eq!(config.polyphony.evict_batch, 8);
        assert_eq!(config.transport.max_dispatch, 12);
        assert_eq!(config.crank.threshold_deg, 15.0);
        assert_eq!(config.master.reverb_mix, 0.1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_crank_config() {
        let yaml = r#"
deposit: 30
cap: 150
drag_gain: 2.0
"#;
        let config: CrankConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.deposit, 30.0);
        assert_eq!(config.cap, 150.0);
        assert_eq!(config.drag_gain, 2.0);
        assert_eq!(config.decay_period_ms, 60);
        assert_eq!(config.lock, CrankLock::TwoWay);
    }

    #[test]
    fn test_crank_lock() {
        let config: CrankConfig = serde_yaml::from_str("lock: rewind").unwrap();
        assert_eq!(config.lock, CrankLock::Rewind);
        let config: CrankConfig = serde_yaml::from_str("lock: two-way").unwrap();
        assert_eq!(config.lock, CrankLock::TwoWay);
        assert!(serde_yaml::from_str::<CrankConfig>("lock: sideways").is_err());

        assert_eq!(CrankLock::Rewind.next(), CrankLock::TwoWay);
    }

    #[test]
    fn test_config_validation() {
        let mut config = CrankboxConfig::default();
        assert!(config.validate().is_ok());

        config.master.volume = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_evict_batch() {
        let mut config = CrankboxConfig::default();
        config.polyphony.max_voices = 4;
        config.polyphony.evict_batch = 8;
        assert!(config.validate().is_err());

        config.polyphony.evict_batch = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_transpose() {
        let mut config = CrankboxConfig::default();
        config.master.transpose = -25;
        assert!(config.validate().is_err());

        config.master.transpose = 24;
        assert!(config.validate().is_ok());
    }
}
