//! Master-bus reverb
//!
//! Schroeder topology: four damped feedback combs in parallel feeding two
//! all-pass diffusers in series. Delay lengths are tuned at 44.1 kHz and
//! scaled to the running sample rate.

use std::collections::VecDeque;

const COMB_DELAYS: [usize; 4] = [1557, 1617, 1491, 1422];
const ALLPASS_DELAYS: [usize; 2] = [225, 556];
const TUNED_RATE: f64 = 44100.0;

const FEEDBACK: f64 = 0.84;
const DAMPING: f64 = 0.4;
const ALLPASS_GAIN: f64 = 0.5;

fn scaled(delay: usize, sample_rate: f64) -> usize {
    ((delay as f64 * sample_rate / TUNED_RATE).round() as usize).max(1)
}

#[derive(Debug, Clone)]
struct Comb {
    buffer: VecDeque<f64>,
    filter_state: f64,
}

impl Comb {
    fn new(delay: usize) -> Self {
        Self {
            buffer: VecDeque::from(vec![0.0; delay]),
            filter_state: 0.0,
        }
    }

    fn process(&mut self, input: f64) -> f64 {
        let delayed = self.buffer.pop_front().unwrap_or(0.0);
        // One-pole lowpass in the loop absorbs highs
        self.filter_state = delayed * (1.0 - DAMPING) + self.filter_state * DAMPING;
        self.buffer.push_back(input + self.filter_state * FEEDBACK);
        delayed
    }
}

#[derive(Debug, Clone)]
struct Allpass {
    buffer: VecDeque<f64>,
}

impl Allpass {
    fn new(delay: usize) -> Self {
        Self {
            buffer: VecDeque::from(vec![0.0; delay]),
        }
    }

    fn process(&mut self, input: f64) -> f64 {
        let delayed = self.buffer.pop_front().unwrap_or(0.0);
        self.buffer.push_back(input + delayed * ALLPASS_GAIN);
        delayed - input
    }
}

/// Shared reverb fed by a send from every voice
#[derive(Debug, Clone)]
pub struct Reverb {
    combs: Vec<Comb>,
    allpasses: Vec<Allpass>,
}

impl Reverb {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            combs: COMB_DELAYS
                .iter()
                .map(|&d| Comb::new(scaled(d, sample_rate)))
                .collect(),
            allpasses: ALLPASS_DELAYS
                .iter()
                .map(|&d| Allpass::new(scaled(d, sample_rate)))
                .collect(),
        }
    }

    /// Clear the tail
    pub fn reset(&mut self) {
        for comb in &mut self.combs {
            comb.buffer.iter_mut().for_each(|s| *s = 0.0);
            comb.filter_state = 0.0;
        }
        for allpass in &mut self.allpasses {
            allpass.buffer.iter_mut().for_each(|s| *s = 0.0);
        }
    }

    /// Process one sample of send signal, returning the wet output
    ///
    /// Non-finite input is treated as silence so it never enters the
    /// feedback loops.
    pub fn process(&mut self, input: f64) -> f64 {
        let input = if input.is_finite() { input } else { 0.0 };
        let mut wet: f64 = self.combs.iter_mut().map(|c| c.process(input)).sum::<f64>() * 0.25;
        for allpass in &mut self.allpasses {
            wet = allpass.process(wet);
        }
        wet
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverb_silent_on_silence() {
        let mut reverb = Reverb::new(44100.0);
        for _ in 0..10000 {
            assert_eq!(reverb.process(0.0), 0.0);
        }
    }

    #[test]
    fn test_reverb_impulse_has_delayed_tail() {
        let mut reverb = Reverb::new(44100.0);
        let mut output = vec![reverb.process(1.0)];
        for _ in 0..20000 {
            output.push(reverb.process(0.0));
        }

        // Nothing before the shortest comb delay
        assert!(output[..1422].iter().all(|s| *s == 0.0));
        assert!(output[1422..4000].iter().any(|s| s.abs() > 0.01));
    }

    #[test]
    fn test_reverb_tail_decays() {
        let mut reverb = Reverb::new(44100.0);
        for _ in 0..4410 {
            reverb.process(0.5);
        }
        for _ in 0..(44100 * 4) {
            reverb.process(0.0);
        }
        let tail = (0..1000).map(|_| reverb.process(0.0).abs()).fold(0.0, f64::max);
        assert!(tail < 1e-3, "tail {}", tail);
    }

    #[test]
    fn test_reverb_stays_bounded() {
        let mut reverb = Reverb::new(48000.0);
        let mut peak = 0.0f64;
        for i in 0..48000 {
            let input = if i % 100 < 50 { 1.0 } else { -1.0 };
            peak = peak.max(reverb.process(input).abs());
        }
        assert!(peak.is_finite());
        // Combs are bounded by 1/(1 - feedback), each all-pass by 3
        assert!(peak < 60.0, "peak {}", peak);
    }

    #[test]
    fn test_reverb_ignores_non_finite_input() {
        let mut reverb = Reverb::new(44100.0);
        reverb.process(f64::NAN);
        reverb.process(f64::INFINITY);
        for _ in 0..10000 {
            assert_eq!(reverb.process(0.0), 0.0);
        }
        let tail: Vec<f64> = (0..4000).map(|i| reverb.process(if i == 0 { 1.0 } else { 0.0 })).collect();
        assert!(tail.iter().all(|s| s.is_finite()));
        assert!(tail.iter().any(|s| s.abs() > 0.01));
    }

    #[test]
    fn test_reverb_reset_clears_tail() {
        let mut reverb = Reverb::new(44100.0);
        for _ in 0..2000 {
            reverb.process(1.0);
        }
        reverb.reset();
        for _ in 0..3000 {
            assert_eq!(reverb.process(0.0), 0.0);
        }
    }
}
