//! Phase-accumulating oscillator and white-noise generator

use std::f64::consts::PI;

/// Waveform types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Triangle,
    Saw,
    Square,
    /// White noise (uniform random), frequency is ignored
    Noise,
}

/// A basic oscillator that generates waveforms
#[derive(Debug, Clone)]
pub struct Oscillator {
    waveform: Waveform,
    phase: f64,
    frequency: f64,
    sample_rate: f64,
    /// Xorshift state for noise
    rng_state: u64,
}

impl Oscillator {
    /// Create a new oscillator
    pub fn new(waveform: Waveform, frequency: f64, sample_rate: f64) -> Self {
        Self {
            waveform,
            phase: 0.0,
            frequency,
            sample_rate,
            rng_state: ((frequency * 1000.0) as u64).max(1),
        }
    }

    /// Create a white-noise source with an explicit seed
    pub fn noise(seed: u64, sample_rate: f64) -> Self {
        Self {
            waveform: Waveform::Noise,
            phase: 0.0,
            frequency: 0.0,
            sample_rate,
            // Scramble so consecutive seeds don't start correlated
            rng_state: seed.wrapping_mul(0x9E37_79B9_7F4A_7C15).max(1),
        }
    }

    /// Set the frequency
    pub fn set_frequency(&mut self, frequency: f64) {
        self.frequency = frequency;
    }

    /// Get the current frequency
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Generate the next sample
    pub fn generate(&mut self) -> f64 {
        let sample = match self.waveform {
            Waveform::Sine => (self.phase * 2.0 * PI).sin(),
            Waveform::Triangle => self.triangle(),
            Waveform::Saw => 2.0 * self.phase - 1.0,
            Waveform::Square => {
                if self.phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Noise => return self.random(),
        };

        self.phase += self.frequency / self.sample_rate;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }

        sample
    }

    fn triangle(&self) -> f64 {
        let p = self.phase;
        if p < 0.25 {
            4.0 * p
        } else if p < 0.75 {
            2.0 - 4.0 * p
        } else {
            4.0 * p - 4.0
        }
    }

    /// Xorshift RNG mapped to -1.0..1.0
    fn random(&mut self) -> f64 {
        let mut x = self.rng_state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.rng_state = x;
        (x as f64 / u64::MAX as f64) * 2.0 - 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sine_oscillator() {
        let mut osc = Oscillator::new(Waveform::Sine, 440.0, 44100.0);

        // First sample should be 0 (sin(0))
        let sample = osc.generate();
        assert!(sample.abs() < 0.001);
    }

    #[test]
    fn test_square_oscillator() {
        let mut osc = Oscillator::new(Waveform::Square, 1.0, 4.0);

        assert_eq!(osc.generate(), 1.0);
        assert_eq!(osc.generate(), 1.0);
        assert_eq!(osc.generate(), -1.0);
        assert_eq!(osc.generate(), -1.0);
    }

    #[test]
    fn test_saw_oscillator() {
        let mut osc = Oscillator::new(Waveform::Saw, 1.0, 4.0);

        assert_eq!(osc.generate(), -1.0);
        assert_eq!(osc.generate(), -0.5);
        assert_eq!(osc.generate(), 0.0);
        assert_eq!(osc.generate(), 0.5);
    }

    #[test]
    fn test_triangle_peaks() {
        let mut osc = Oscillator::new(Waveform::Triangle, 1.0, 4.0);

        assert_eq!(osc.generate(), 0.0);
        assert_eq!(osc.generate(), 1.0);
        assert_eq!(osc.generate(), 0.0);
        assert_eq!(osc.generate(), -1.0);
    }

    #[test]
    fn test_frequency_sweep_keeps_phase_bounded() {
        let mut osc = Oscillator::new(Waveform::Sine, 160.0, 44100.0);
        for i in 0..2000 {
            osc.set_frequency(160.0 - i as f64 * 0.05);
            let s = osc.generate();
            assert!((-1.0..=1.0).contains(&s));
        }
        assert!(osc.phase < 1.0);
    }

    #[test]
    fn test_noise_in_range() {
        let mut osc = Oscillator::noise(7, 44100.0);
        assert_eq!(osc.waveform(), Waveform::Noise);

        let mut sum = 0.0;
        for _ in 0..1000 {
            let sample = osc.generate();
            assert!((-1.0..=1.0).contains(&sample), "Sample out of range: {}", sample);
            sum += sample;
        }

        let mean = sum / 1000.0;
        assert!(mean.abs() < 0.1, "Mean too far from 0: {}", mean);
    }

    #[test]
    fn test_noise_seeds_differ() {
        let mut a = Oscillator::noise(1, 44100.0);
        let mut b = Oscillator::noise(2, 44100.0);
        assert_ne!(a.generate(), b.generate());
    }
}
