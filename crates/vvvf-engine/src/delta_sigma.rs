//! First-order single-bit delta-sigma quantizer.
//!
//! The integrator runs on every call; the output bit is only re-evaluated
//! once `feedback_interval` seconds have passed since the last decision.

/// Delta-sigma modulator state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeltaSigmaModulator {
    feedback_interval: f64,
    integrator: f64,
    output: f64,
    last_time: Option<f64>,
    last_feedback: Option<f64>,
}

impl DeltaSigmaModulator {
    /// Creates a modulator deciding at most once per `feedback_interval` seconds.
    pub fn new(feedback_interval: f64) -> Self {
        Self {
            feedback_interval: feedback_interval.max(0.0),
            integrator: 0.0,
            output: 0.0,
            last_time: None,
            last_feedback: None,
        }
    }

    /// Seconds between output decisions.
    pub fn feedback_interval(&self) -> f64 {
        self.feedback_interval
    }

    /// Current output, -1.0 or 1.0 (0.0 before the first decision).
    pub fn output(&self) -> f64 {
        self.output
    }

    /// Current integrator value.
    pub fn integrator(&self) -> f64 {
        self.integrator
    }

    /// Feeds one input sample taken at `time` and returns the output bit.
    pub fn process(&mut self, input: f64, time: f64) -> f64 {
        let dt = self.last_time.map(|t| (time - t).max(0.0)).unwrap_or(0.0);
        self.integrator += (input - self.output) * dt;
        self.last_time = Some(time);

        let due = match self.last_feedback {
            None => true,
            Some(last) => time - last >= self.feedback_interval,
        };
        if due {
            self.output = if self.integrator >= 0.0 { 1.0 } else { -1.0 };
            self.last_feedback = Some(time);
        }
        self.output
    }

    /// Clears the integrator, the output and both timestamps.
    pub fn reset(&mut self) {
        *self = Self::new(self.feedback_interval);
    }

    /// Resets if `time` lies before the last processed sample.
    ///
    /// Returns true if a reset happened.
    pub fn reset_if_last_time(&mut self, time: f64) -> bool {
        match self.last_time {
            Some(last) if time < last => {
                self.reset();
                true
            }
            _ => false,
        }
    }
}
