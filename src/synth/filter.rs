//! Biquad filter implementation
//!
//! RBJ-cookbook biquads used to shape noise bursts and partials.

use std::f64::consts::PI;

/// Filter type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterType {
    LowPass,
    HighPass,
    BandPass,
    /// Bell boost/cut around the cutoff, gain in dB
    Peaking { gain_db: f64 },
}

/// Biquad filter coefficients
#[derive(Debug, Clone, Copy)]
struct Coefficients {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Default for Coefficients {
    fn default() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }
}

/// Biquad filter for audio processing
#[derive(Debug, Clone)]
pub struct Filter {
    filter_type: FilterType,
    sample_rate: f64,
    cutoff: f64,
    resonance: f64, // Q factor

    coeffs: Coefficients,

    // Direct Form II transposed state
    z1: f64,
    z2: f64,
}

impl Filter {
    /// Create a filter of the given type, cutoff and Q
    pub fn new(filter_type: FilterType, cutoff: f64, q: f64, sample_rate: f64) -> Self {
        let mut filter = Self {
            filter_type,
            sample_rate,
            cutoff: 1000.0,
            resonance: 0.707,
            coeffs: Coefficients::default(),
            z1: 0.0,
            z2: 0.0,
        };
        filter.cutoff = filter.clamp_cutoff(cutoff);
        filter.resonance = q.clamp(0.1, 20.0);
        filter.calculate_coefficients();
        filter
    }

    /// Set cutoff frequency in Hz
    pub fn set_cutoff(&mut self, hz: f64) {
        self.cutoff = self.clamp_cutoff(hz);
        self.calculate_coefficients();
    }

    /// Get cutoff frequency
    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Set resonance (Q factor)
    pub fn set_resonance(&mut self, q: f64) {
        self.resonance = q.clamp(0.1, 20.0);
        self.calculate_coefficients();
    }

    /// Get resonance
    pub fn resonance(&self) -> f64 {
        self.resonance
    }

    /// Reset filter state (clear history)
    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }

    // 20 Hz to just under Nyquist
    fn clamp_cutoff(&self, hz: f64) -> f64 {
        hz.clamp(20.0, self.sample_rate * 0.45)
    }

    fn calculate_coefficients(&mut self) {
        let omega = 2.0 * PI * self.cutoff / self.sample_rate;
        let sin_omega = omega.sin();
        let cos_omega = omega.cos();
        let alpha = sin_omega / (2.0 * self.resonance);

        let (b0, b1, b2, a0, a1, a2) = match self.filter_type {
            FilterType::LowPass => (
                (1.0 - cos_omega) / 2.0,
                1.0 - cos_omega,
                (1.0 - cos_omega) / 2.0,
                1.0 + alpha,
                -2.0 * cos_omega,
                1.0 - alpha,
            ),
            FilterType::HighPass => (
                (1.0 + cos_omega) / 2.0,
                -(1.0 + cos_omega),
                (1.0 + cos_omega) / 2.0,
                1.0 + alpha,
                -2.0 * cos_omega,
                1.0 - alpha,
            ),
            FilterType::BandPass => (
                alpha,
                0.0,
                -alpha,
                1.0 + alpha,
                -2.0 * cos_omega,
                1.0 - alpha,
            ),
            FilterType::Peaking { gain_db } => {
                let a = 10f64.powf(gain_db / 40.0);
                (
                    1.0 + alpha * a,
                    -2.0 * cos_omega,
                    1.0 - alpha * a,
                    1.0 + alpha / a,
                    -2.0 * cos_omega,
                    1.0 - alpha / a,
                )
            }
        };

        self.coeffs = Coefficients {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        };
    }

    /// Process a single sample through the filter
    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.coeffs.b0 * input + self.z1;

        self.z1 = self.coeffs.b1 * input - self.coeffs.a1 * output + self.z2;
        self.z2 = self.coeffs.b2 * input - self.coeffs.a2 * output;

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peak_after_settling(filter: &mut Filter, freq: f64) -> f64 {
        let mut max_output = 0.0f64;
        for i in 0..4410 {
            let t = i as f64 / 44100.0;
            let output = filter.process((2.0 * PI * freq * t).sin());
            if i > 1000 {
                max_output = max_output.max(output.abs());
            }
        }
        max_output
    }

    #[test]
    fn test_filter_creation() {
        let filter = Filter::new(FilterType::LowPass, 1000.0, 0.707, 44100.0);
        assert_eq!(filter.cutoff(), 1000.0);
        assert!((filter.resonance() - 0.707).abs() < 0.001);
    }

    #[test]
    fn test_filter_cutoff_clamping() {
        let mut filter = Filter::new(FilterType::LowPass, 1000.0, 0.707, 44100.0);

        filter.set_cutoff(5.0);
        assert_eq!(filter.cutoff(), 20.0);

        filter.set_cutoff(25000.0);
        assert!(filter.cutoff() < 44100.0 * 0.5);
    }

    #[test]
    fn test_filter_resonance_clamping() {
        let mut filter = Filter::new(FilterType::BandPass, 1000.0, 0.707, 44100.0);

        filter.set_resonance(0.01);
        assert_eq!(filter.resonance(), 0.1);

        filter.set_resonance(100.0);
        assert_eq!(filter.resonance(), 20.0);
    }

    #[test]
    fn test_lowpass_attenuates_high_frequencies() {
        let mut filter = Filter::new(FilterType::LowPass, 100.0, 0.707, 44100.0);
        let peak = peak_after_settling(&mut filter, 5000.0);
        assert!(peak < 0.1, "Expected attenuation, got {}", peak);
    }

    #[test]
    fn test_highpass_filter() {
        // Hat-style high-pass kills low content
        let mut filter = Filter::new(FilterType::HighPass, 8000.0, 1.5, 44100.0);
        let peak = peak_after_settling(&mut filter, 200.0);
        assert!(peak < 0.05, "Expected attenuation, got {}", peak);
    }

    #[test]
    fn test_bandpass_passes_center() {
        let mut filter = Filter::new(FilterType::BandPass, 3000.0, 0.8, 44100.0);
        let center = peak_after_settling(&mut filter, 3000.0);
        filter.reset();
        let low = peak_after_settling(&mut filter, 100.0);
        assert!(center > 0.9, "center {}", center);
        assert!(low < 0.1, "low {}", low);
    }

    #[test]
    fn test_peaking_boosts_center() {
        let mut filter = Filter::new(FilterType::Peaking { gain_db: 6.0 }, 10000.0, 1.0, 44100.0);
        let center = peak_after_settling(&mut filter, 10000.0);
        filter.reset();
        let away = peak_after_settling(&mut filter, 200.0);

        // +6 dB is roughly double amplitude
        assert!(center > 1.8, "center {}", center);
        assert!((away - 1.0).abs() < 0.05, "away {}", away);
    }

    #[test]
    fn test_filter_reset() {
        let mut filter = Filter::new(FilterType::LowPass, 1000.0, 0.707, 44100.0);
        for _ in 0..100 {
            filter.process(1.0);
        }

        filter.reset();

        let output = filter.process(0.0);
        assert!(output.abs() < 0.001, "Expected near-zero after reset, got {}", output);
    }
}
