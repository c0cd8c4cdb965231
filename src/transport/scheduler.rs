//! The music box session
//!
//! [`MusicBox`] owns the active tune, the transport and the crank. The
//! control loop calls [`MusicBox::tick`] with a millisecond clock; every
//! periodic job (automatic playback, momentum decay, coasting) runs from
//! there, and input handlers call into the same struct. Nothing blocks.

use super::{Advance, Crank, Direction, DispatchPolicy, NoteSink, Transport};
use crate::config::{CrankLock, CrankboxConfig};
use crate::synth::Timbre;
use crate::tune::{library, BeatTarget, GridRow, Tune, TuneError};
use std::path::Path;
use tracing::{debug, info};

/// What the session did in one call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Activity {
    /// Note triggers sent to the sink
    pub dispatched: usize,
    /// The playhead crossed the loop point
    pub wrapped: bool,
    /// Page the playhead moved onto
    pub page: Option<u32>,
}

impl Activity {
    fn absorb(&mut self, advance: Advance) {
        self.dispatched += advance.dispatched;
        self.wrapped |= advance.wrapped;
        if advance.page.is_some() {
            self.page = advance.page;
        }
    }
}

/// A fixed-rate job on the control clock
///
/// Fires at most once per check. A stalled loop skips the missed periods
/// instead of bursting through them.
#[derive(Debug, Clone)]
struct Timer {
    period_ms: f64,
    next_ms: Option<f64>,
}

impl Timer {
    fn new(period_ms: f64) -> Self {
        Self {
            period_ms,
            next_ms: None,
        }
    }

    fn from_hz(hz: f64) -> Self {
        Self::new(1000.0 / hz)
    }

    /// Whether the job is due; the first check only arms the timer
    fn due(&mut self, now_ms: u64) -> bool {
        let now = now_ms as f64;
        let Some(next) = self.next_ms else {
            self.next_ms = Some(now + self.period_ms);
            return false;
        };
        if now < next {
            return false;
        }
        let mut next = next + self.period_ms;
        if next <= now {
            next = now + self.period_ms;
        }
        self.next_ms = Some(next);
        true
    }

    fn disarm(&mut self) {
        self.next_ms = None;
    }
}

pub struct MusicBox {
    playlist: Vec<Tune>,
    current: usize,
    tune: Tune,
    transport: Transport,
    crank: Crank,
    playback_policy: DispatchPolicy,
    crank_policy: DispatchPolicy,
    crank_step: f64,
    tick_rate_hz: f64,
    playback: Timer,
    decay: Timer,
    coast: Timer,
}

impl MusicBox {
    /// Start on the first tune of `playlist`
    ///
    /// An empty playlist falls back to the built-in tunes.
    pub fn new(config: &CrankboxConfig, playlist: Vec<Tune>) -> Self {
        let mut playlist = playlist;
        if playlist.is_empty() {
            playlist = library::builtin();
        }
        let tune = playlist[0].clone();
        let transport = Transport::new(tune.total_beats, config.transport.beats_per_page);

        Self {
            playlist,
            current: 0,
            transport,
            crank: Crank::new(&config.crank),
            playback_policy: DispatchPolicy::playback(&config.transport),
            crank_policy: DispatchPolicy::crank(&config.transport),
            crank_step: config.transport.crank_step,
            tick_rate_hz: config.transport.tick_rate_hz,
            playback: Timer::from_hz(config.transport.tick_rate_hz),
            decay: Timer::new(config.crank.decay_period_ms as f64),
            coast: Timer::from_hz(config.crank.coast_hz),
            tune,
        }
    }

    pub fn tune(&self) -> &Tune {
        &self.tune
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn crank(&self) -> &Crank {
        &self.crank
    }

    pub fn playlist(&self) -> &[Tune] {
        &self.playlist
    }

    pub fn position(&self) -> f64 {
        self.transport.position()
    }

    pub fn momentum(&self) -> f64 {
        self.crank.momentum()
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    /// Run whatever periodic jobs are due at `now_ms`
    pub fn tick(&mut self, now_ms: u64, sink: &mut dyn NoteSink) -> Activity {
        let mut activity = Activity::default();
        self.crank.update(now_ms);

        if self.transport.is_playing() && self.playback.due(now_ms) {
            let delta = self.tune.bpm / 60.0 / self.tick_rate_hz;
            let advance = self
                .transport
                .advance(delta, &self.tune, self.playback_policy, sink);
            activity.absorb(advance);
        }

        if self.decay.due(now_ms) {
            self.crank.decay();
        }

        if self.coast.due(now_ms) {
            if let Some(delta) = self.crank.coast_delta(self.transport.is_playing()) {
                let advance = self
                    .transport
                    .advance(delta, &self.tune, self.crank_policy, sink);
                activity.absorb(advance);
            }
        }

        sink.reap();
        activity
    }

    fn step(&mut self, direction: Option<Direction>, sink: &mut dyn NoteSink) -> Activity {
        let mut activity = Activity::default();
        if let Some(direction) = direction {
            let delta = direction.sign() * self.crank_step;
            let advance = self
                .transport
                .advance(delta, &self.tune, self.crank_policy, sink);
            activity.absorb(advance);
        }
        activity
    }

    /// Crank turned to an absolute angle in degrees
    pub fn crank_to(&mut self, angle: f64, now_ms: u64, sink: &mut dyn NoteSink) -> Activity {
        sink.wake();
        let direction = self.crank.rotate_to(angle, now_ms);
        self.step(direction, sink)
    }

    /// Pointer dragged across the crank
    pub fn drag(&mut self, pixels: f64, now_ms: u64, sink: &mut dyn NoteSink) -> Activity {
        sink.wake();
        let direction = self.crank.drag(pixels, now_ms);
        self.step(direction, sink)
    }

    /// One discrete crank step
    pub fn key_step(&mut self, direction: Direction, now_ms: u64, sink: &mut dyn NoteSink) -> Activity {
        sink.wake();
        let direction = self.crank.key_step(direction, now_ms);
        self.step(direction, sink)
    }

    /// The crank was let go
    pub fn release(&mut self) {
        self.crank.release();
    }

    /// Start or pause automatic playback
    ///
    /// Pausing only stops scheduling; sounding voices ring out.
    pub fn toggle_playing(&mut self, sink: &mut dyn NoteSink) -> bool {
        sink.wake();
        let playing = self.transport.toggle_playing();
        if !playing {
            self.playback.disarm();
        }
        info!(playing, position = self.transport.position(), "playback toggled");
        playing
    }

    /// Make `tune` the active tune
    ///
    /// Silences every voice, pauses playback and puts the playhead back at
    /// beat 0.
    fn activate(&mut self, tune: Tune, sink: &mut dyn NoteSink) {
        sink.stop_all();
        self.transport.set_playing(false);
        self.transport.reset(tune.total_beats);
        self.crank.halt();
        self.playback.disarm();
        info!(
            tune = %tune.name,
            bpm = tune.bpm,
            timbre = %tune.timbre,
            events = tune.pattern.len(),
            "tune loaded"
        );
        self.tune = tune;
    }

    /// Switch to the playlist entry at `index`; `false` if out of range
    pub fn select(&mut self, index: usize, sink: &mut dyn NoteSink) -> bool {
        let Some(tune) = self.playlist.get(index).cloned() else {
            return false;
        };
        self.current = index;
        self.activate(tune, sink);
        true
    }

    /// Switch to the next playlist entry, wrapping
    pub fn next_tune(&mut self, sink: &mut dyn NoteSink) -> &Tune {
        let index = (self.current + 1) % self.playlist.len();
        self.select(index, sink);
        &self.tune
    }

    /// Replace the active tune with one from outside the playlist
    ///
    /// The tune joins the end of the playlist.
    pub fn load_tune(&mut self, tune: Tune, sink: &mut dyn NoteSink) {
        self.playlist.push(tune.clone());
        self.current = self.playlist.len() - 1;
        self.activate(tune, sink);
    }

    /// Load a tune file; on error the current tune keeps playing
    pub fn load_tune_file(&mut self, path: &Path, sink: &mut dyn NoteSink) -> Result<(), TuneError> {
        let tune = Tune::load(path)?;
        self.load_tune(tune, sink);
        Ok(())
    }

    /// Save the active tune, edits included
    pub fn save_tune(&self, path: &Path) -> Result<(), TuneError> {
        self.tune.save(path)
    }

    /// Toggle `pitch` at `beat` in the active tune
    pub fn toggle_cell(&mut self, pitch: &str, beat: f64) -> bool {
        let present = self.tune.pattern.toggle(pitch, beat);
        debug!(pitch, beat, present, "cell toggled");
        present
    }

    pub fn set_timbre(&mut self, pitch: &str, target: BeatTarget, timbre: Option<Timbre>) -> usize {
        self.tune.pattern.set_timbre(pitch, target, timbre)
    }

    /// Move the crank on to the next lock mode
    pub fn cycle_lock(&mut self) -> CrankLock {
        let lock = self.crank.lock().next();
        self.crank.set_lock(lock);
        info!(?lock, "crank lock changed");
        lock
    }

    /// Move the active tune's default timbre on to the next one
    pub fn cycle_timbre(&mut self) -> Timbre {
        self.tune.timbre = self.tune.timbre.next();
        info!(tune = %self.tune.name, timbre = %self.tune.timbre, "timbre changed");
        self.tune.timbre
    }

    /// Empty the active pattern
    pub fn clear_pattern(&mut self) {
        self.tune.pattern.clear();
        info!(tune = %self.tune.name, "pattern cleared");
    }

    /// Scale the active tune's timeline by `factor`
    pub fn retime(&mut self, factor: f64) -> bool {
        if !self.tune.retime(factor) {
            return false;
        }
        self.transport.resize(self.tune.total_beats);
        true
    }

    /// Flip the grid to the next page
    pub fn next_page(&mut self) -> u32 {
        self.transport.next_page()
    }

    /// Grid rows for the page on show
    pub fn grid(&self) -> Vec<GridRow> {
        let width = self.transport.beats_per_page();
        let first = self.transport.page() as i64 * width as i64;
        self.tune.pattern.cells(first, width as usize)
    }
}
