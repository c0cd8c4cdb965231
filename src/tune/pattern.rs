//! Time-sorted note events
//!
//! The pattern keeps its events sorted by start beat (stable for equal
//! times), which is what lets the transport answer range queries with two
//! binary searches.

use super::event::NoteEvent;
use crate::synth::pitch::{class_of, is_percussion, octave_of};
use crate::synth::{Drum, Timbre};
use serde::{Deserialize, Serialize};

/// Length in beats of an event created from the grid
pub const TOGGLE_DURATION: f64 = 0.75;

/// Which beats a bulk edit applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeatTarget {
    At(i64),
    All,
}

/// Display state of one grid cell
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellState {
    pub active: bool,
    /// The cell holds the first beat of an event
    pub is_start: bool,
}

/// One pitch's row of the grid
#[derive(Debug, Clone, PartialEq)]
pub struct GridRow {
    pub pitch: String,
    pub cells: Vec<CellState>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<NoteEvent>", into = "Vec<NoteEvent>")]
pub struct Pattern {
    events: Vec<NoteEvent>,
}

impl From<Vec<NoteEvent>> for Pattern {
    fn from(mut events: Vec<NoteEvent>) -> Self {
        events.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { events }
    }
}

impl From<Pattern> for Vec<NoteEvent> {
    fn from(pattern: Pattern) -> Self {
        pattern.events
    }
}

impl Pattern {
    pub fn new(events: Vec<NoteEvent>) -> Self {
        events.into()
    }

    /// All events in time order
    pub fn events(&self) -> &[NoteEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Insert keeping time order; lands after events at the same time
    pub fn insert(&mut self, event: NoteEvent) {
        let index = self.events.partition_point(|e| e.time <= event.time);
        self.events.insert(index, event);
    }

    /// Events with `start <= time < end`, in order
    pub fn events_in_range(&self, start: f64, end: f64) -> &[NoteEvent] {
        if start >= end {
            return &[];
        }
        let from = self.events.partition_point(|e| e.time < start);
        let to = self.events.partition_point(|e| e.time < end);
        &self.events[from..to.max(from)]
    }

    /// Events with `after < time <= upto`, latest first
    pub fn events_in_range_rev(&self, after: f64, upto: f64) -> impl Iterator<Item = &NoteEvent> {
        let (from, to) = if after >= upto {
            (0, 0)
        } else {
            let from = self.events.partition_point(|e| e.time <= after);
            let to = self.events.partition_point(|e| e.time <= upto);
            (from, to.max(from))
        };
        self.events[from..to].iter().rev()
    }

    /// Toggle `pitch` on the grid cell at `floor(beat)`
    ///
    /// Returns whether the pitch is present afterwards.
    pub fn toggle(&mut self, pitch: &str, beat: f64) -> bool {
        let beat = beat.floor();

        if let Some(index) = self
            .events
            .iter()
            .position(|e| e.time.floor() == beat && e.note.contains(pitch))
        {
            let event = &mut self.events[index];
            event.note.remove(pitch);
            if event.note.is_empty() {
                self.events.remove(index);
            }
            return false;
        }

        if let Some(event) = self.events.iter_mut().find(|e| e.time == beat) {
            event.note.push(pitch);
        } else {
            self.insert(NoteEvent::new(beat, pitch, TOGGLE_DURATION).with_velocity(1.0));
        }
        true
    }

    /// Override the timbre of every matching event containing `pitch`
    ///
    /// Returns how many events changed.
    pub fn set_timbre(&mut self, pitch: &str, target: BeatTarget, timbre: Option<Timbre>) -> usize {
        let mut changed = 0;
        for event in &mut self.events {
            let on_target = match target {
                BeatTarget::All => true,
                BeatTarget::At(beat) => event.time.floor() as i64 == beat,
            };
            if on_target && event.note.contains(pitch) && event.timbre != timbre {
                event.timbre = timbre;
                changed += 1;
            }
        }
        changed
    }

    /// Remove every event
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Scale every event's time and duration
    ///
    /// Returns `false` (and changes nothing) unless `factor` is a positive
    /// finite number.
    pub fn retime(&mut self, factor: f64) -> bool {
        if !(factor.is_finite() && factor > 0.0) {
            return false;
        }
        for event in &mut self.events {
            event.time *= factor;
            event.duration *= factor;
        }
        true
    }

    /// Every note name used, highest octave first, percussion last
    pub fn pitches(&self) -> Vec<String> {
        let mut pitches: Vec<String> = Vec::new();
        for name in self.events.iter().flat_map(|e| e.note.iter()) {
            if !pitches.iter().any(|p| p == name) {
                pitches.push(name.to_string());
            }
        }
        pitches.sort_by_key(|p| pitch_order(p));
        pitches
    }

    /// Grid projection of `beat_count` beats starting at `first_beat`
    ///
    /// Rows follow [`Pattern::pitches`]. An event lights every beat from
    /// its start up to the beat its end falls in.
    pub fn cells(&self, first_beat: i64, beat_count: usize) -> Vec<GridRow> {
        let mut rows: Vec<GridRow> = self
            .pitches()
            .into_iter()
            .map(|pitch| GridRow {
                pitch,
                cells: vec![CellState::default(); beat_count],
            })
            .collect();
        let last_beat = first_beat.saturating_add(beat_count as i64);

        for event in &self.events {
            let start = event.time.floor() as i64;
            for name in event.note.iter() {
                let Some(row) = rows.iter_mut().find(|r| r.pitch == name) else {
                    continue;
                };
                // Only the part of the event inside the window
                let covered = event.covered_beats();
                let from = (*covered.start()).max(first_beat);
                let to = (*covered.end()).min(last_beat.saturating_sub(1));
                for beat in from..=to {
                    let cell = &mut row.cells[(beat - first_beat) as usize];
                    cell.active = true;
                    cell.is_start |= beat == start;
                }
            }
        }
        rows
    }
}

/// Sort key for grid rows
fn pitch_order(name: &str) -> (i32, i32, i32) {
    if is_percussion(name) {
        let index = Drum::ALL.iter().position(|d| d.name() == name).unwrap_or(0);
        return (1, 0, index as i32);
    }
    let descending = octave_of(name).map_or(i32::MAX, |octave| -octave);
    (0, descending, class_of(name).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tune::Notes;

    fn times(events: &[NoteEvent]) -> Vec<f64> {
        events.iter().map(|e| e.time).collect()
    }

    fn sample() -> Pattern {
        Pattern::new(vec![
            NoteEvent::new(7.9, "C5", 0.5),
            NoteEvent::new(0.0, "C4", 1.0),
            NoteEvent::new(3.0, "G4", 1.0),
            NoteEvent::new(1.5, "E4", 0.5),
        ])
    }

    #[test]
    fn test_new_sorts_by_time() {
        assert_eq!(times(sample().events()), vec![0.0, 1.5, 3.0, 7.9]);
    }

    #[test]
    fn test_equal_times_keep_order() {
        let pattern = Pattern::new(vec![
            NoteEvent::new(1.0, "A4", 1.0),
            NoteEvent::new(0.0, "KICK", 1.0),
            NoteEvent::new(1.0, "B4", 1.0),
        ]);
        let leads: Vec<_> = pattern.events().iter().filter_map(|e| e.note.lead()).collect();
        assert_eq!(leads, vec!["KICK", "A4", "B4"]);
    }

    #[test]
    fn test_events_in_range() {
        let pattern = sample();
        assert_eq!(times(pattern.events_in_range(1.0, 4.0)), vec![1.5, 3.0]);
        assert_eq!(times(pattern.events_in_range(0.0, 1.5)), vec![0.0]);
        assert_eq!(times(pattern.events_in_range(7.5, 8.0)), vec![7.9]);
        assert!(pattern.events_in_range(4.0, 4.0).is_empty());
        assert!(pattern.events_in_range(5.0, 2.0).is_empty());
    }

    #[test]
    fn test_events_in_range_rev() {
        let pattern = sample();
        let rev: Vec<f64> = pattern.events_in_range_rev(0.0, 3.0).map(|e| e.time).collect();
        assert_eq!(rev, vec![3.0, 1.5]);

        let rev: Vec<f64> = pattern.events_in_range_rev(-1.0, 0.0).map(|e| e.time).collect();
        assert_eq!(rev, vec![0.0]);
        assert_eq!(pattern.events_in_range_rev(3.0, 3.0).count(), 0);
    }

    #[test]
    fn test_toggle_is_idempotent_pair() {
        let mut pattern = sample();
        let before = pattern.clone();

        assert!(pattern.toggle("A4", 5.0));
        assert_eq!(pattern.len(), 5);
        assert!(!pattern.toggle("A4", 5.0));
        assert_eq!(pattern, before);
    }

    #[test]
    fn test_toggle_uses_floor_of_beat() {
        let mut pattern = Pattern::default();
        assert!(pattern.toggle("D4", 2.7));
        let event = &pattern.events()[0];
        assert_eq!(event.time, 2.0);
        assert_eq!(event.duration, TOGGLE_DURATION);
        assert_eq!(event.velocity, Some(1.0));

        // Removal matches events starting anywhere inside the beat
        let mut pattern = sample();
        assert!(!pattern.toggle("E4", 1.0));
        assert_eq!(times(pattern.events()), vec![0.0, 3.0, 7.9]);
    }

    #[test]
    fn test_toggle_folds_chords() {
        let mut pattern = sample();
        assert!(pattern.toggle("E4", 3.0));
        assert_eq!(pattern.len(), 4);
        assert_eq!(pattern.events()[2].note, Notes::Chord(vec!["G4".into(), "E4".into()]));

        // Removing from the chord collapses it back to a single note
        assert!(!pattern.toggle("G4", 3.0));
        assert_eq!(pattern.events()[2].note, Notes::One("E4".into()));

        assert!(!pattern.toggle("E4", 3.0));
        assert_eq!(times(pattern.events()), vec![0.0, 1.5, 7.9]);
    }

    #[test]
    fn test_toggle_keeps_sort_order() {
        let mut pattern = sample();
        for beat in [6.0, 2.0, 9.0, 0.0] {
            pattern.toggle("HAT", beat);
        }
        let times = times(pattern.events());
        assert!(times.windows(2).all(|w| w[0] <= w[1]), "{times:?}");
    }

    #[test]
    fn test_set_timbre() {
        let mut pattern = sample();
        pattern.toggle("C4", 3.0);

        assert_eq!(pattern.set_timbre("C4", BeatTarget::At(3), Some(Timbre::Saw)), 1);
        assert_eq!(pattern.events()[2].timbre, Some(Timbre::Saw));
        assert_eq!(pattern.events()[0].timbre, None);

        assert_eq!(pattern.set_timbre("C4", BeatTarget::All, Some(Timbre::Saw)), 1);
        assert_eq!(pattern.set_timbre("C4", BeatTarget::All, None), 2);
        assert_eq!(pattern.set_timbre("B7", BeatTarget::All, Some(Timbre::Sine)), 0);
    }

    #[test]
    fn test_clear() {
        let mut pattern = sample();
        pattern.clear();
        assert!(pattern.is_empty());
    }

    #[test]
    fn test_retime() {
        let mut pattern = sample();
        assert!(pattern.retime(2.0));
        assert_eq!(times(pattern.events()), vec![0.0, 3.0, 6.0, 15.8]);
        assert_eq!(pattern.events()[1].duration, 1.0);

        assert!(!pattern.retime(0.0));
        assert!(!pattern.retime(f64::NAN));
        assert_eq!(pattern.events()[3].time, 15.8);
    }

    #[test]
    fn test_pitches_order() {
        let pattern = Pattern::new(vec![
            NoteEvent::new(0.0, "SNARE", 1.0),
            NoteEvent::new(0.0, &["C4", "Eb5"][..], 1.0),
            NoteEvent::new(1.0, "KICK", 1.0),
            NoteEvent::new(2.0, "A4", 1.0),
            NoteEvent::new(3.0, "C4", 1.0),
        ]);
        assert_eq!(pattern.pitches(), vec!["Eb5", "C4", "A4", "KICK", "SNARE"]);
    }

    #[test]
    fn test_cells_projection() {
        let pattern = Pattern::new(vec![
            NoteEvent::new(1.0, "C4", 2.0),
            NoteEvent::new(9.0, "C4", 1.0),
            NoteEvent::new(2.5, "KICK", 0.25),
        ]);
        let rows = pattern.cells(0, 8);
        assert_eq!(rows.len(), 2);

        let c4 = &rows[0];
        assert_eq!(c4.pitch, "C4");
        assert!(!c4.cells[0].active);
        assert_eq!(c4.cells[1], CellState { active: true, is_start: true });
        assert_eq!(c4.cells[2], CellState { active: true, is_start: false });
        assert!(!c4.cells[3].active);

        let kick = &rows[1];
        assert_eq!(kick.cells[2], CellState { active: true, is_start: true });

        // Second page
        let rows = pattern.cells(8, 8);
        assert!(rows[0].cells[1].is_start);
    }

    #[test]
    fn test_cells_with_huge_duration() {
        let pattern = Pattern::new(vec![
            NoteEvent::new(0.0, "C4", 3e11),
            NoteEvent::new(40.0, "E4", 3e11),
        ]);

        let rows = pattern.cells(0, 8);
        assert_eq!(rows[0].cells[0], CellState { active: true, is_start: true });
        assert!(rows[0].cells[1..].iter().all(|c| c.active && !c.is_start));
        assert!(rows[1].cells.iter().all(|c| !c.active));

        let rows = pattern.cells(1_000_000_000, 8);
        assert!(rows.iter().all(|r| r.cells.iter().all(|c| c.active && !c.is_start)));

        assert!(pattern.cells(16, 0).iter().all(|r| r.cells.is_empty()));
    }
}
