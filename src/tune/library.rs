//! Built-in tunes

use super::{NoteEvent, Tune};
use crate::synth::Timbre;

fn note(time: f64, name: &str, duration: f64) -> NoteEvent {
    NoteEvent::new(time, name, duration)
}

fn chord(time: f64, names: &[&str], duration: f64) -> NoteEvent {
    NoteEvent::new(time, names, duration)
}

/// A 3/4 music-box waltz in C
fn waltz() -> Tune {
    let melody = [
        (0.0, "E5", 1.0),
        (1.0, "G5", 1.0),
        (2.0, "C6", 1.0),
        (3.0, "B5", 2.0),
        (5.0, "G5", 1.0),
        (6.0, "A5", 1.0),
        (7.0, "F5", 1.0),
        (8.0, "D5", 1.0),
        (9.0, "E5", 3.0),
        (12.0, "E5", 1.0),
        (13.0, "G5", 1.0),
        (14.0, "C6", 1.0),
        (15.0, "D6", 2.0),
        (17.0, "B5", 1.0),
        (18.0, "C6", 1.0),
        (19.0, "G5", 1.0),
        (20.0, "E5", 1.0),
        (21.0, "C5", 3.0),
    ];
    let bass = ["C4", "G3", "F3", "C4", "C4", "G3", "F3", "C4"];

    let mut events: Vec<NoteEvent> = melody
        .iter()
        .map(|&(t, n, d)| note(t, n, d).with_velocity(0.9))
        .collect();
    for (bar, root) in bass.iter().enumerate() {
        let t = bar as f64 * 3.0;
        events.push(note(t, root, 1.0).with_velocity(0.6));
        events.push(chord(t + 1.0, &["E4", "G4"], 0.5).with_velocity(0.4));
        events.push(chord(t + 2.0, &["E4", "G4"], 0.5).with_velocity(0.4));
    }
    Tune::new("Crank Waltz", 96.0, Timbre::MusicBox, 24.0, events)
}

/// Drums and a square bass
fn groove() -> Tune {
    let mut events = Vec::new();
    for bar in 0..4 {
        let t = bar as f64 * 4.0;
        for beat in [0.0, 2.5] {
            events.push(note(t + beat, "KICK", 0.5));
        }
        for beat in [1.0, 3.0] {
            events.push(note(t + beat, "SNARE", 0.5).with_velocity(0.8));
        }
        for step in 0..8 {
            events.push(note(t + step as f64 * 0.5, "HAT", 0.25).with_velocity(0.5));
        }
        let root = ["A2", "A2", "F2", "G2"][bar];
        events.push(note(t, root, 1.5).with_velocity(0.8));
        events.push(note(t + 2.0, root, 0.5).with_velocity(0.7));
        events.push(note(t + 3.0, root, 0.75).with_velocity(0.7));
    }
    events.push(note(15.5, "RIDE", 0.5));
    Tune::new("Box Groove", 112.0, Timbre::Square, 16.0, events)
}

/// Slow piano chords with a sine melody
fn nocturne() -> Tune {
    let progression: [&[&str]; 4] = [
        &["A3", "C4", "E4"],
        &["F3", "A3", "C4"],
        &["C3", "E3", "G3", "C4"],
        &["G3", "B3", "D4"],
    ];
    let mut events: Vec<NoteEvent> = progression
        .iter()
        .enumerate()
        .map(|(i, names)| chord(i as f64 * 4.0, names, 3.5).with_velocity(0.7))
        .collect();

    let melody = [
        (0.0, "E5", 1.5),
        (2.0, "D5", 0.5),
        (2.5, "C5", 1.5),
        (4.0, "A4", 2.0),
        (6.0, "C5", 2.0),
        (8.0, "G5", 1.5),
        (10.0, "E5", 2.0),
        (12.0, "D5", 3.0),
    ];
    events.extend(
        melody
            .iter()
            .map(|&(t, n, d)| note(t, n, d).with_timbre(Timbre::Triangle).with_velocity(0.8)),
    );
    Tune::new("Nocturne", 72.0, Timbre::Piano, 16.0, events)
}

/// Every built-in tune, in menu order
pub fn builtin() -> Vec<Tune> {
    vec![waltz(), groove(), nocturne()]
}

/// Look up a built-in tune by name, ignoring case
pub fn by_name(name: &str) -> Option<Tune> {
    builtin()
        .into_iter()
        .find(|t| t.name.eq_ignore_ascii_case(name))
}

pub fn names() -> Vec<String> {
    builtin().into_iter().map(|t| t.name).collect()
}
