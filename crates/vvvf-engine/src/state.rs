//! Mutable per-run control state.

use std::f64::consts::TAU;

use rand_pcg::Pcg32;

use crate::carrier::CarrierState;
use crate::rng::create_stream_rng;

/// Name of the PRNG stream used by carrier randomization.
pub const CARRIER_RANDOM_STREAM: &str = "carrier_random";

/// A phase generator `phase = ω · t`.
///
/// Changing `ω` rescales `t` so that the phase stays continuous. While `ω`
/// is zero the phase is held and restored when it becomes positive again.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhaseGenerator {
    angular_frequency: f64,
    time: f64,
    held_phase: f64,
}

impl PhaseGenerator {
    /// Angular frequency in rad/s.
    pub fn angular_frequency(&self) -> f64 {
        self.angular_frequency
    }

    /// Accumulated time in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Current phase in radians.
    pub fn phase(&self) -> f64 {
        if self.angular_frequency > 0.0 {
            self.angular_frequency * self.time
        } else {
            self.held_phase
        }
    }

    /// Sets the angular frequency, keeping the phase continuous.
    pub fn set_angular_frequency(&mut self, angular_frequency: f64) {
        let angular_frequency = if angular_frequency.is_finite() {
            angular_frequency.max(0.0)
        } else {
            0.0
        };
        if angular_frequency == self.angular_frequency {
            return;
        }
        let phase = self.phase();
        self.angular_frequency = angular_frequency;
        if angular_frequency > 0.0 {
            self.time = phase / angular_frequency;
        } else {
            self.held_phase = phase;
        }
    }

    /// Advances the generator by `dt` seconds.
    pub fn advance(&mut self, dt: f64) {
        if self.angular_frequency > 0.0 {
            self.time += dt;
        }
    }

    /// Restarts at phase zero without changing the frequency.
    pub fn reset_phase(&mut self) {
        self.time = 0.0;
        self.held_phase = 0.0;
    }
}

/// Everything that evolves while a run advances.
///
/// `Clone` is a deep copy, including the PRNG, so a clone can be stepped for
/// side calculations without affecting the original.
#[derive(Debug, Clone)]
pub struct ControlState {
    commanded_frequency: f64,
    control_frequency: f64,
    sine: PhaseGenerator,
    saw: PhaseGenerator,
    /// Braking sub-pattern selected.
    pub brake: bool,
    /// Control frequency is converging toward the sine frequency.
    pub free_run: bool,
    /// Power is not commanded.
    pub mascon_off: bool,
    /// Time since the start of the run in seconds.
    pub generation_time: f64,
    /// Carrier modulation bookkeeping.
    pub carrier: CarrierState,
    /// Run PRNG.
    pub rng: Pcg32,
    /// Pattern entry used by the previous sample.
    pub active_entry: Option<usize>,
    /// Timeline segment used by the previous step.
    pub segment: Option<usize>,
    /// Power was applied early to catch up with the next timeline segment.
    pub catching_up: bool,
}

impl ControlState {
    /// Creates a stopped state with the PRNG seeded from `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            commanded_frequency: 0.0,
            control_frequency: 0.0,
            sine: PhaseGenerator::default(),
            saw: PhaseGenerator::default(),
            brake: false,
            free_run: false,
            mascon_off: false,
            generation_time: 0.0,
            carrier: CarrierState::default(),
            rng: create_stream_rng(seed, CARRIER_RANDOM_STREAM),
            active_entry: None,
            segment: None,
            catching_up: false,
        }
    }

    /// Commanded frequency in Hz.
    pub fn commanded_frequency(&self) -> f64 {
        self.commanded_frequency
    }

    /// Sets the commanded frequency, clamped at zero.
    pub fn set_commanded_frequency(&mut self, frequency: f64) {
        self.commanded_frequency = non_negative(frequency);
    }

    /// Control frequency in Hz.
    pub fn control_frequency(&self) -> f64 {
        self.control_frequency
    }

    /// Sets the control frequency, clamped at zero.
    pub fn set_control_frequency(&mut self, frequency: f64) {
        self.control_frequency = non_negative(frequency);
    }

    /// Reference (sine) generator.
    pub fn sine(&self) -> &PhaseGenerator {
        &self.sine
    }

    /// Carrier (saw) generator.
    pub fn saw(&self) -> &PhaseGenerator {
        &self.saw
    }

    /// Sine frequency in Hz.
    pub fn sine_frequency(&self) -> f64 {
        self.sine.angular_frequency() / TAU
    }

    /// Sets the sine angular frequency, rescaling the sine time.
    pub fn set_sine_angular_frequency(&mut self, angular_frequency: f64) {
        self.sine.set_angular_frequency(angular_frequency);
    }

    /// Sets the sine frequency in Hz.
    pub fn set_sine_frequency(&mut self, frequency: f64) {
        self.sine.set_angular_frequency(TAU * frequency);
    }

    /// Sets the carrier frequency in Hz, rescaling the saw time.
    pub fn set_saw_frequency(&mut self, frequency: f64) {
        self.saw.set_angular_frequency(TAU * frequency);
    }

    /// Reference phase in radians.
    pub fn sine_phase(&self) -> f64 {
        self.sine.phase()
    }

    /// Carrier phase in radians.
    pub fn saw_phase(&self) -> f64 {
        self.saw.phase()
    }

    /// Restarts the reference at phase zero.
    pub fn reset_sine_phase(&mut self) {
        self.sine.reset_phase();
    }

    /// Advances both generators and the run clock by `dt` seconds.
    pub fn advance_time(&mut self, dt: f64) {
        self.sine.advance(dt);
        self.saw.advance(dt);
        self.generation_time += dt;
    }
}

impl Default for ControlState {
    fn default() -> Self {
        Self::new(0)
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}
