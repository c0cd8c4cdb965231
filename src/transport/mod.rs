//! Transport: the playhead and what it triggers
//!
//! The transport owns the position on the looping timeline. Every move goes
//! through [`Transport::advance`], which works out which events the move
//! passed over (across the loop point in either direction) and hands their
//! notes to a [`NoteSink`].

pub mod crank;
pub mod scheduler;

pub use crank::{Crank, CrankState, Direction};
pub use scheduler::{Activity, MusicBox};

use crate::config::TransportConfig;
use crate::synth::{Timbre, VoiceId};
use crate::tune::{NoteEvent, Tune};
use tracing::debug;

/// One note to sound now
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteRequest<'a> {
    pub note: &'a str,
    /// Length in beats
    pub duration: f64,
    pub velocity: f64,
    pub timbre: Timbre,
    pub bpm: f64,
}

/// Where the transport sends note triggers
pub trait NoteSink {
    /// Sound one note; `None` if nothing was scheduled
    fn play(&mut self, request: &NoteRequest<'_>) -> Option<VoiceId>;

    /// A user interaction happened; a suspended output may resume
    fn wake(&mut self) {}

    /// Silence and forget every sounding voice
    fn stop_all(&mut self) {}

    /// Drop voices that finished
    fn reap(&mut self) {}
}

/// How much of a crossed event gets played
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchPolicy {
    /// Notes of a chord to play, in chord order
    pub chord_limit: usize,
    /// Note triggers allowed per advance
    pub max_dispatch: usize,
}

impl DispatchPolicy {
    /// Automatic playback
    pub const PLAYBACK: DispatchPolicy = DispatchPolicy {
        chord_limit: 4,
        max_dispatch: 12,
    };

    /// Manual crank steps: one note per click
    pub const CRANK: DispatchPolicy = DispatchPolicy {
        chord_limit: 1,
        max_dispatch: 12,
    };

    pub fn playback(config: &TransportConfig) -> Self {
        Self {
            chord_limit: config.playback_chord_notes,
            max_dispatch: config.max_dispatch,
        }
    }

    pub fn crank(config: &TransportConfig) -> Self {
        Self {
            chord_limit: config.crank_chord_notes,
            max_dispatch: config.max_dispatch,
        }
    }
}

/// What one advance did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Advance {
    /// Note triggers handed to the sink
    pub dispatched: usize,
    /// The move crossed the loop point
    pub wrapped: bool,
    /// New page, if the playhead moved onto another one
    pub page: Option<u32>,
}

/// Playhead position and play state
#[derive(Debug, Clone)]
pub struct Transport {
    position: f64,
    playing: bool,
    total_beats: f64,
    beats_per_page: u32,
    page: u32,
}

impl Transport {
    pub fn new(total_beats: f64, beats_per_page: u32) -> Self {
        Self {
            position: 0.0,
            playing: false,
            total_beats: positive_or_one(total_beats),
            beats_per_page: beats_per_page.max(1),
            page: 0,
        }
    }

    /// Back to beat 0 on a timeline of `total_beats`
    pub fn reset(&mut self, total_beats: f64) {
        self.position = 0.0;
        self.page = 0;
        self.total_beats = positive_or_one(total_beats);
    }

    /// Change the loop length, scaling the playhead with it
    pub fn resize(&mut self, total_beats: f64) {
        let total_beats = positive_or_one(total_beats);
        let position = self.position * total_beats / self.total_beats;
        self.total_beats = total_beats;
        self.position = if position < total_beats { position } else { 0.0 };
        self.page = self.page.min(self.page_count() - 1);
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn total_beats(&self) -> f64 {
        self.total_beats
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    /// Flip play state, returning the new one
    pub fn toggle_playing(&mut self) -> bool {
        self.playing = !self.playing;
        self.playing
    }

    /// Page shown in the grid
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn beats_per_page(&self) -> u32 {
        self.beats_per_page
    }

    pub fn page_count(&self) -> u32 {
        ((self.total_beats / self.beats_per_page as f64).ceil() as u32).max(1)
    }

    /// Show the next page, wrapping; the playhead does not move
    pub fn next_page(&mut self) -> u32 {
        self.page = (self.page + 1) % self.page_count();
        self.page
    }

    fn page_of(&self, position: f64) -> u32 {
        position.floor() as u32 / self.beats_per_page
    }

    /// Move the playhead by `delta` beats and trigger what it passed
    ///
    /// Forward moves play events with `prev <= time < new`; backward moves
    /// play `new < time <= prev` latest first. Either may cross the loop
    /// point. A move longer than the loop plays every event once.
    pub fn advance(
        &mut self,
        delta: f64,
        tune: &Tune,
        policy: DispatchPolicy,
        sink: &mut dyn NoteSink,
    ) -> Advance {
        if delta == 0.0 || !delta.is_finite() {
            return Advance::default();
        }

        let total = self.total_beats;
        let prev = self.position;
        let new = prev + delta;
        let mut dispatch = Dispatch::new(tune, policy, sink);
        let mut wrapped = false;

        if delta > 0.0 {
            if new >= total {
                wrapped = true;
                dispatch.send(tune.pattern.events_in_range(prev, total));
                let rest = (new - total).min(prev);
                dispatch.send(tune.pattern.events_in_range(0.0, rest));
            } else {
                dispatch.send(tune.pattern.events_in_range(prev, new));
            }
        } else if new < 0.0 {
            wrapped = true;
            dispatch.send(tune.pattern.events_in_range_rev(new, prev));
            let floor = (new + total).max(prev);
            dispatch.send(tune.pattern.events_in_range_rev(floor, total));
        } else {
            dispatch.send(tune.pattern.events_in_range_rev(new, prev));
        }
        let dispatched = dispatch.sent;

        let mut position = new.rem_euclid(total);
        if position >= total {
            position = 0.0;
        }
        self.position = position;

        let page = self.page_of(position);
        let page = (page != self.page).then(|| {
            self.page = page;
            page
        });

        if dispatched > 0 {
            debug!(from = prev, to = position, dispatched, wrapped, "advance");
        }
        Advance {
            dispatched,
            wrapped,
            page,
        }
    }
}

fn positive_or_one(beats: f64) -> f64 {
    if beats.is_finite() && beats > 0.0 {
        beats
    } else {
        1.0
    }
}

/// Hands crossed events to the sink until the trigger budget is spent
struct Dispatch<'t, 's> {
    tune: &'t Tune,
    policy: DispatchPolicy,
    sink: &'s mut dyn NoteSink,
    sent: usize,
}

impl<'t, 's> Dispatch<'t, 's> {
    fn new(tune: &'t Tune, policy: DispatchPolicy, sink: &'s mut dyn NoteSink) -> Self {
        Self {
            tune,
            policy,
            sink,
            sent: 0,
        }
    }

    fn send<'e>(&mut self, events: impl IntoIterator<Item = &'e NoteEvent>) {
        for event in events {
            let timbre = self.tune.timbre_of(event);
            for note in event.note.iter().take(self.policy.chord_limit) {
                if self.sent >= self.policy.max_dispatch {
                    return;
                }
                self.sink.play(&NoteRequest {
                    note,
                    duration: event.duration,
                    velocity: event.velocity(),
                    timbre,
                    bpm: self.tune.bpm,
                });
                self.sent += 1;
            }
        }
    }
}

/// A sink that records what it was asked to play
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    pub notes: Vec<(String, Timbre)>,
    pub wakes: usize,
    pub stops: usize,
}

#[cfg(test)]
impl RecordingSink {
    pub fn names(&self) -> Vec<&str> {
        self.notes.iter().map(|(n, _)| n.as_str()).collect()
    }
}

#[cfg(test)]
impl NoteSink for RecordingSink {
    fn play(&mut self, request: &NoteRequest<'_>) -> Option<VoiceId> {
        self.notes.push((request.note.to_string(), request.timbre));
        Some(VoiceId(self.notes.len() as u64))
    }

    fn wake(&mut self) {
        self.wakes += 1;
    }

    fn stop_all(&mut self) {
        self.stops += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tune(total_beats: f64, events: Vec<NoteEvent>) -> Tune {
        Tune::new("test", 120.0, Timbre::Sine, total_beats, events)
    }

    fn eight_beats() -> Tune {
        tune(
            8.0,
            vec![
                NoteEvent::new(0.0, "C4", 1.0),
                NoteEvent::new(1.5, "E4", 1.0),
                NoteEvent::new(3.0, "G4", 1.0),
                NoteEvent::new(7.9, "C5", 0.1),
            ],
        )
    }

    #[test]
    fn test_forward_range() {
        let tune = eight_beats();
        let mut transport = Transport::new(8.0, 8);
        let mut sink = RecordingSink::default();

        transport.advance(1.5, &tune, DispatchPolicy::PLAYBACK, &mut sink);
        assert_eq!(sink.names(), vec!["C4"]);

        transport.advance(2.0, &tune, DispatchPolicy::PLAYBACK, &mut sink);
        assert_eq!(sink.names(), vec!["C4", "E4", "G4"]);
        assert_eq!(transport.position(), 3.5);
    }

    #[test]
    fn test_forward_wrap_plays_both_sides() {
        let tune = eight_beats();
        let mut transport = Transport::new(8.0, 8);
        let mut sink = RecordingSink::default();
        transport.advance(7.5, &tune, DispatchPolicy::PLAYBACK, &mut sink);
        sink.notes.clear();

        let result = transport.advance(1.0, &tune, DispatchPolicy::PLAYBACK, &mut sink);
        assert!(result.wrapped);
        assert_eq!(sink.names(), vec!["C5", "C4"]);
        assert!((transport.position() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_full_loop_plays_once() {
        let tune = tune(4.0, vec![NoteEvent::new(0.0, "C4", 1.0)]);
        let mut transport = Transport::new(4.0, 8);
        let mut sink = RecordingSink::default();

        transport.advance(4.0, &tune, DispatchPolicy::PLAYBACK, &mut sink);
        assert_eq!(sink.names(), vec!["C4"]);
        assert_eq!(transport.position(), 0.0);
    }

    #[test]
    fn test_oversized_delta_is_one_lap() {
        let tune = eight_beats();
        let mut transport = Transport::new(8.0, 8);
        let mut sink = RecordingSink::default();
        transport.advance(2.0, &tune, DispatchPolicy::PLAYBACK, &mut sink);
        sink.notes.clear();

        transport.advance(30.0, &tune, DispatchPolicy::PLAYBACK, &mut sink);
        assert_eq!(sink.names(), vec!["G4", "C5", "C4", "E4"]);
        assert_eq!(transport.position(), 0.0);
    }

    #[test]
    fn test_backward_plays_in_reverse() {
        let tune = eight_beats();
        let mut transport = Transport::new(8.0, 8);
        let mut sink = RecordingSink::default();
        transport.advance(3.0, &tune, DispatchPolicy::PLAYBACK, &mut sink);
        sink.notes.clear();

        // (0.5, 3.0]
        transport.advance(-2.5, &tune, DispatchPolicy::PLAYBACK, &mut sink);
        assert_eq!(sink.names(), vec!["G4", "E4"]);
        assert_eq!(transport.position(), 0.5);
    }

    #[test]
    fn test_backward_wrap() {
        let tune = eight_beats();
        let mut transport = Transport::new(8.0, 8);
        let mut sink = RecordingSink::default();
        transport.advance(0.5, &tune, DispatchPolicy::PLAYBACK, &mut sink);
        sink.notes.clear();

        let result = transport.advance(-1.0, &tune, DispatchPolicy::CRANK, &mut sink);
        assert!(result.wrapped);
        assert_eq!(sink.names(), vec!["C4", "C5"]);
        assert!((transport.position() - 7.5).abs() < 1e-12);
    }

    #[test]
    fn test_chord_limits() {
        let tune = tune(
            4.0,
            vec![NoteEvent::new(0.0, &["C4", "E4", "G4", "B4", "D5"][..], 1.0)],
        );
        let mut transport = Transport::new(4.0, 8);

        let mut sink = RecordingSink::default();
        transport.advance(0.5, &tune, DispatchPolicy::PLAYBACK, &mut sink);
        assert_eq!(sink.names(), vec!["C4", "E4", "G4", "B4"]);

        transport.reset(4.0);
        let mut sink = RecordingSink::default();
        transport.advance(0.125, &tune, DispatchPolicy::CRANK, &mut sink);
        assert_eq!(sink.names(), vec!["C4"]);
    }

    #[test]
    fn test_dispatch_cap() {
        let events = (0..20)
            .map(|i| NoteEvent::new(i as f64 * 0.1, "HAT", 0.1))
            .collect();
        let tune = tune(4.0, events);
        let mut transport = Transport::new(4.0, 8);
        let mut sink = RecordingSink::default();

        let result = transport.advance(3.0, &tune, DispatchPolicy::PLAYBACK, &mut sink);
        assert_eq!(result.dispatched, 12);
        assert_eq!(sink.notes.len(), 12);
    }

    #[test]
    fn test_event_timbre_override() {
        let tune = tune(
            4.0,
            vec![
                NoteEvent::new(0.0, "C4", 1.0),
                NoteEvent::new(1.0, "D4", 1.0).with_timbre(Timbre::Piano),
            ],
        );
        let mut transport = Transport::new(4.0, 8);
        let mut sink = RecordingSink::default();
        transport.advance(2.0, &tune, DispatchPolicy::PLAYBACK, &mut sink);

        let timbres: Vec<Timbre> = sink.notes.iter().map(|(_, t)| *t).collect();
        assert_eq!(timbres, vec![Timbre::Sine, Timbre::Piano]);
    }

    #[test]
    fn test_position_always_normalized() {
        let tune = eight_beats();
        let mut transport = Transport::new(8.0, 8);
        let mut sink = RecordingSink::default();
        for delta in [5.3, -17.2, 100.0, -0.001, 7.999, -8.0, 1e-13] {
            transport.advance(delta, &tune, DispatchPolicy::PLAYBACK, &mut sink);
            let p = transport.position();
            assert!((0.0..8.0).contains(&p), "{delta} gave {p}");
        }
    }

    #[test]
    fn test_page_changes_reported() {
        let tune = tune(32.0, vec![]);
        let mut transport = Transport::new(32.0, 8);
        let mut sink = RecordingSink::default();
        assert_eq!(transport.page_count(), 4);

        let result = transport.advance(7.9, &tune, DispatchPolicy::PLAYBACK, &mut sink);
        assert_eq!(result.page, None);
        let result = transport.advance(0.2, &tune, DispatchPolicy::PLAYBACK, &mut sink);
        assert_eq!(result.page, Some(1));
        assert_eq!(transport.page(), 1);

        assert_eq!(transport.next_page(), 2);
        assert_eq!(transport.next_page(), 3);
        assert_eq!(transport.next_page(), 0);
    }

    #[test]
    fn test_resize_scales_position() {
        let tune = tune(8.0, vec![]);
        let mut transport = Transport::new(8.0, 8);
        let mut sink = RecordingSink::default();
        transport.advance(3.0, &tune, DispatchPolicy::PLAYBACK, &mut sink);

        transport.resize(16.0);
        assert_eq!(transport.total_beats(), 16.0);
        assert_eq!(transport.position(), 6.0);
        assert_eq!(transport.page_count(), 2);
    }

    #[test]
    fn test_toggle_playing() {
        let mut transport = Transport::new(4.0, 8);
        assert!(!transport.is_playing());
        assert!(transport.toggle_playing());
        transport.set_playing(false);
        assert!(!transport.is_playing());
    }
}
