//! Live voice table
//!
//! Voices are kept in trigger order, so the front of the deque is always
//! the oldest. Admitting a voice at the ceiling drops a batch of the oldest
//! ones first.

use crate::synth::{Voice, VoiceId};
use std::collections::VecDeque;
use tracing::trace;

#[derive(Debug)]
pub struct Polyphony {
    voices: VecDeque<Voice>,
    ceiling: usize,
    batch: usize,
    next_id: u64,
}

impl Polyphony {
    pub fn new(ceiling: usize, batch: usize) -> Self {
        let ceiling = ceiling.max(1);
        Self {
            voices: VecDeque::with_capacity(ceiling),
            ceiling,
            batch: batch.clamp(1, ceiling),
            next_id: 0,
        }
    }

    /// Hand out the next voice id
    pub fn next_id(&mut self) -> VoiceId {
        self.next_id += 1;
        VoiceId(self.next_id)
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Admit a voice, evicting the oldest ones if the table is full
    ///
    /// Returns how many voices were evicted.
    pub fn register(&mut self, voice: Voice, now: f64) -> usize {
        let mut evicted = 0;
        if self.voices.len() >= self.ceiling {
            let count = self.batch.max(self.voices.len() + 1 - self.ceiling);
            let count = count.min(self.voices.len());
            for mut old in self.voices.drain(..count) {
                old.stop(now);
                evicted += 1;
            }
            trace!(evicted, "voice ceiling reached");
        }
        self.voices.push_back(voice);
        evicted
    }

    /// Drop every voice whose last source has stopped by `now`
    pub fn reap(&mut self, now: f64) -> usize {
        let before = self.voices.len();
        self.voices.retain(|v| !v.is_finished(now));
        before - self.voices.len()
    }

    /// Stop and drop every voice
    pub fn stop_all(&mut self, now: f64) {
        for voice in &mut self.voices {
            voice.stop(now);
        }
        self.voices.clear();
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = VoiceId> + '_ {
        self.voices.iter().map(Voice::id)
    }

    pub fn voices_mut(&mut self) -> impl Iterator<Item = &mut Voice> {
        self.voices.iter_mut()
    }
}

impl Default for Polyphony {
    fn default() -> Self {
        Self::new(24, 8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::Source;

    fn voice(table: &mut Polyphony, start: f64, length: f64) -> Voice {
        let id = table.next_id();
        let source = Source::steady(440.0, 0.1, start, start + length, 44100.0);
        Voice::from_sources(id, "A4", start, vec![source])
    }

    #[test]
    fn test_ids_are_monotonic() {
        let mut table = Polyphony::default();
        let a = table.next_id();
        let b = table.next_id();
        assert!(b > a);
    }

    #[test]
    fn test_ceiling_evicts_oldest_batch() {
        let mut table = Polyphony::default();
        for _ in 0..24 {
            let v = voice(&mut table, 0.0, 10.0);
            assert_eq!(table.register(v, 0.0), 0);
        }
        assert_eq!(table.len(), 24);

        let v = voice(&mut table, 0.0, 10.0);
        assert_eq!(table.register(v, 0.0), 8);
        assert_eq!(table.len(), 17);

        // Oldest survivor is the ninth voice registered
        assert_eq!(table.ids().next(), Some(VoiceId(9)));
        assert_eq!(table.ids().last(), Some(VoiceId(25)));
    }

    #[test]
    fn test_never_exceeds_ceiling() {
        let mut table = Polyphony::new(5, 2);
        for i in 0..100 {
            let v = voice(&mut table, i as f64 * 0.01, 10.0);
            table.register(v, i as f64 * 0.01);
            assert!(table.len() <= 5);
        }
    }

    #[test]
    fn test_reap_drops_finished() {
        let mut table = Polyphony::default();
        for length in [0.1, 0.5, 2.0] {
            let v = voice(&mut table, 0.0, length);
            table.register(v, 0.0);
        }

        assert_eq!(table.reap(0.05), 0);
        assert_eq!(table.reap(1.0), 2);
        assert_eq!(table.len(), 1);
        assert_eq!(table.reap(2.0), 1);
        assert!(table.is_empty());
    }

    #[test]
    fn test_stop_all_clears() {
        let mut table = Polyphony::default();
        for _ in 0..3 {
            let v = voice(&mut table, 0.0, 1.0);
            table.register(v, 0.0);
        }
        table.stop_all(0.5);
        assert!(table.is_empty());
    }
}
