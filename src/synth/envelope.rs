//! Timestamped parameter envelopes
//!
//! An [`Envelope`] is a list of automation events placed on the audio
//! clock ahead of time, the same way a hardware sequencer programs a VCA:
//! jump to a value, ramp linearly or exponentially to a value, or approach
//! a target with a time constant. Evaluating the envelope at any clock time
//! gives the parameter value without per-sample state, so a voice can be
//! scheduled completely at trigger time and rendered later.

/// Kind of automation event
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Automation {
    /// Jump to the value at the event time
    Set(f64),
    /// Linear ramp from the previous event, arriving at the value
    Linear(f64),
    /// Exponential ramp from the previous event, arriving at the value
    Exponential(f64),
    /// Exponential approach towards `target` with time constant `tau`
    Target { target: f64, tau: f64 },
}

/// One automation event on the clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeEvent {
    pub time: f64,
    pub automation: Automation,
}

/// A piecewise parameter curve over absolute clock time (seconds)
#[derive(Debug, Clone, Default)]
pub struct Envelope {
    initial: f64,
    events: Vec<EnvelopeEvent>,
}

impl Envelope {
    /// Create an envelope that holds `initial` until its first event
    pub fn new(initial: f64) -> Self {
        Self {
            initial,
            events: Vec::new(),
        }
    }

    /// Jump to `value` at `time`
    pub fn set_value_at(&mut self, value: f64, time: f64) -> &mut Self {
        self.push(time, Automation::Set(value))
    }

    /// Ramp linearly to `value`, arriving at `time`
    pub fn linear_ramp_to(&mut self, value: f64, time: f64) -> &mut Self {
        self.push(time, Automation::Linear(value))
    }

    /// Ramp exponentially to `value`, arriving at `time`
    ///
    /// Exponential ramps cannot cross or touch zero; a ramp starting from
    /// zero (or of opposite sign) holds the start value and jumps at `time`.
    pub fn exponential_ramp_to(&mut self, value: f64, time: f64) -> &mut Self {
        self.push(time, Automation::Exponential(value))
    }

    /// Approach `target` from `start` onwards with time constant `tau`
    pub fn set_target_at(&mut self, target: f64, start: f64, tau: f64) -> &mut Self {
        self.push(
            start,
            Automation::Target {
                target,
                tau: tau.max(1e-6),
            },
        )
    }

    /// Scheduled events in clock order
    pub fn events(&self) -> &[EnvelopeEvent] {
        &self.events
    }

    /// Time of the last scheduled event
    pub fn last_event_time(&self) -> Option<f64> {
        self.events.last().map(|e| e.time)
    }

    fn push(&mut self, time: f64, automation: Automation) -> &mut Self {
        // Events are kept sorted; equal times keep insertion order
        let index = self.events.partition_point(|e| e.time <= time);
        self.events.insert(index, EnvelopeEvent { time, automation });
        self
    }

    /// Evaluate the curve at clock time `t`
    pub fn value_at(&self, t: f64) -> f64 {
        let mut value = self.initial;
        let mut anchor = self.events.first().map_or(0.0, |e| e.time.min(t));
        let mut target: Option<(f64, f64)> = None;

        for event in &self.events {
            if t < event.time {
                let span = event.time - anchor;
                let frac = if span > 0.0 { (t - anchor) / span } else { 1.0 };
                return match event.automation {
                    Automation::Linear(end) => value + (end - value) * frac,
                    Automation::Exponential(end) => {
                        if value * end <= 0.0 {
                            value
                        } else {
                            value * (end / value).powf(frac)
                        }
                    }
                    _ => approach(value, target, anchor, t),
                };
            }

            value = approach(value, target, anchor, event.time);
            match event.automation {
                Automation::Set(v) | Automation::Linear(v) | Automation::Exponential(v) => {
                    value = v;
                    target = None;
                }
                Automation::Target { target: goal, tau } => target = Some((goal, tau)),
            }
            anchor = event.time;
        }

        approach(value, target, anchor, t)
    }
}

/// Hold `value`, or follow a set-target curve that started at `anchor`
fn approach(value: f64, target: Option<(f64, f64)>, anchor: f64, t: f64) -> f64 {
    match target {
        Some((goal, tau)) => goal + (value - goal) * (-(t - anchor) / tau).exp(),
        None => value,
    }
}
