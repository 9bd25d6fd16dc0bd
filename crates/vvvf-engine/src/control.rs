//! Throttle (mascon) state machine.
//!
//! Three frequencies are tracked:
//!
//! - the **commanded** frequency, set by the driver or a timeline;
//! - the **sine** frequency, the reference generator, which follows the command;
//! - the **control** frequency, which selects pattern entries and amplitudes.
//!
//! Outside free-run the control frequency equals the sine frequency. Cutting
//! power starts free-run: the control frequency decays toward zero at the
//! mascon-off rate and never exceeds the mascon-off maximum. When power
//! returns, it ramps back up at the mascon-on rate until it meets the sine
//! frequency, and free-run ends.

use vvvf_spec::JerkSettings;

use crate::state::ControlState;

/// Tolerance when testing whether the control frequency met its target.
const FREQUENCY_EPSILON: f64 = 1e-9;

/// How the commanded frequency moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrequencyTarget {
    /// Move by `rate · dt` per step while power is on (downward when braking).
    Ramp {
        /// Rate in Hz/s.
        rate: f64,
    },
    /// Set directly, in Hz.
    Absolute(f64),
}

/// Driver input for one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Command {
    /// Use the braking sub-pattern.
    pub brake: bool,
    /// Power commanded.
    pub mascon_on: bool,
    /// Commanded frequency movement.
    pub target: FrequencyTarget,
}

impl Command {
    /// Power on, accelerating at `rate`.
    pub fn accelerate(rate: f64) -> Self {
        Self {
            brake: false,
            mascon_on: true,
            target: FrequencyTarget::Ramp { rate },
        }
    }

    /// Power on, braking at `rate`.
    pub fn brake(rate: f64) -> Self {
        Self {
            brake: true,
            mascon_on: true,
            target: FrequencyTarget::Ramp { rate },
        }
    }

    /// Power off, commanded frequency held.
    pub fn coast(brake: bool) -> Self {
        Self {
            brake,
            mascon_on: false,
            target: FrequencyTarget::Ramp { rate: 0.0 },
        }
    }
}

/// Moves `value` toward `target` by at most `step`.
fn approach(value: f64, target: f64, step: f64) -> f64 {
    if value < target {
        (value + step).min(target)
    } else {
        (value - step).max(target)
    }
}

/// Advances the state machine by `dt` seconds.
///
/// Only frequencies and flags change; generator time is advanced separately
/// by [`ControlState::advance_time`].
pub fn advance(state: &mut ControlState, command: &Command, jerk: &JerkSettings, dt: f64) {
    state.brake = command.brake;

    let commanded = match command.target {
        FrequencyTarget::Ramp { rate } if command.mascon_on => {
            let delta = rate * dt;
            if command.brake {
                state.commanded_frequency() - delta
            } else {
                state.commanded_frequency() + delta
            }
        }
        FrequencyTarget::Ramp { .. } => state.commanded_frequency(),
        FrequencyTarget::Absolute(frequency) => frequency,
    };
    state.set_commanded_frequency(commanded);
    state.set_sine_frequency(state.commanded_frequency());
    let sine_frequency = state.sine_frequency();

    let params = jerk.select(command.mascon_on);
    let step = params.frequency_change_rate.max(0.0) * dt;

    if command.mascon_on {
        if state.mascon_off {
            tracing::debug!(
                control_frequency = state.control_frequency(),
                sine_frequency,
                "mascon on"
            );
        }
        state.mascon_off = false;
        if !state.free_run {
            state.set_control_frequency(sine_frequency);
            return;
        }

        let target = sine_frequency.min(params.max_control_frequency);
        let control = approach(state.control_frequency(), target, step);
        state.set_control_frequency(control);
        if control >= sine_frequency - FREQUENCY_EPSILON {
            tracing::debug!(control_frequency = control, "free-run finished");
            state.free_run = false;
        }
    } else {
        if !state.mascon_off {
            tracing::debug!(
                control_frequency = state.control_frequency(),
                sine_frequency,
                "mascon off"
            );
        }
        state.mascon_off = true;
        state.free_run = true;
        let control = approach(state.control_frequency(), 0.0, step)
            .min(params.max_control_frequency.max(0.0));
        state.set_control_frequency(control);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vvvf_spec::JerkParams;

    fn jerk(on_rate: f64, off_rate: f64) -> JerkSettings {
        JerkSettings {
            on: JerkParams {
                frequency_change_rate: on_rate,
                max_control_frequency: 200.0,
            },
            off: JerkParams {
                frequency_change_rate: off_rate,
                max_control_frequency: 200.0,
            },
        }
    }

    #[test]
    fn test_accelerate_from_standstill() {
        let mut state = ControlState::new(0);
        advance(&mut state, &Command::accelerate(60.0), &jerk(60.0, 60.0), 0.1);
        assert!((state.control_frequency() - 6.0).abs() < 1e-9);
        assert!((state.sine_frequency() - 6.0).abs() < 1e-9);
        assert!(!state.free_run);
    }

    #[test]
    fn test_braking_ramps_down_and_clamps() {
        let mut state = ControlState::new(0);
        advance(
            &mut state,
            &Command {
                brake: true,
                mascon_on: true,
                target: FrequencyTarget::Absolute(3.0),
            },
            &jerk(60.0, 60.0),
            0.0,
        );
        for _ in 0..10 {
            advance(&mut state, &Command::brake(10.0), &jerk(60.0, 60.0), 0.1);
        }
        assert_eq!(state.commanded_frequency(), 0.0);
        assert_eq!(state.control_frequency(), 0.0);
        assert!(state.brake);
    }

    #[test]
    fn test_coast_decays_control_and_keeps_sine() {
        let settings = jerk(40.0, 20.0);
        let mut state = ControlState::new(0);
        for _ in 0..10 {
            advance(&mut state, &Command::accelerate(50.0), &settings, 0.1);
        }
        assert!((state.control_frequency() - 50.0).abs() < 1e-9);

        advance(&mut state, &Command::coast(false), &settings, 0.5);
        assert!(state.free_run);
        assert!(state.mascon_off);
        assert!((state.control_frequency() - 40.0).abs() < 1e-9);
        assert!((state.sine_frequency() - 50.0).abs() < 1e-9);

        for _ in 0..10 {
            advance(&mut state, &Command::coast(false), &settings, 0.5);
        }
        assert_eq!(state.control_frequency(), 0.0);
        assert!(state.free_run);
    }

    #[test]
    fn test_free_run_recovers_at_on_rate() {
        let settings = jerk(40.0, 20.0);
        let mut state = ControlState::new(0);
        advance(
            &mut state,
            &Command {
                brake: false,
                mascon_on: true,
                target: FrequencyTarget::Absolute(30.0),
            },
            &settings,
            0.0,
        );
        advance(&mut state, &Command::coast(false), &settings, 1.0);
        assert!((state.control_frequency() - 10.0).abs() < 1e-9);

        let hold = Command {
            brake: false,
            mascon_on: true,
            target: FrequencyTarget::Absolute(30.0),
        };
        advance(&mut state, &hold, &settings, 0.25);
        assert!((state.control_frequency() - 20.0).abs() < 1e-9);
        assert!(state.free_run);
        advance(&mut state, &hold, &settings, 0.25);
        assert!((state.control_frequency() - 30.0).abs() < 1e-9);
        assert!(!state.free_run);
    }

    #[test]
    fn test_free_run_cap_is_approached_not_jumped() {
        let mut settings = jerk(10.0, 10.0);
        settings.on.max_control_frequency = 5.0;
        let mut state = ControlState::new(0);
        advance(
            &mut state,
            &Command {
                brake: false,
                mascon_on: true,
                target: FrequencyTarget::Absolute(50.0),
            },
            &settings,
            0.0,
        );
        advance(&mut state, &Command::coast(false), &settings, 5.0);
        assert_eq!(state.control_frequency(), 0.0);
        let hold = Command {
            brake: false,
            mascon_on: true,
            target: FrequencyTarget::Absolute(50.0),
        };
        let dt = 0.01;
        for _ in 0..200 {
            let before = state.control_frequency();
            advance(&mut state, &hold, &settings, dt);
            let delta = (state.control_frequency() - before).abs();
            assert!(delta <= 10.0 * dt + 1e-9, "delta = {}", delta);
        }
        assert!((state.control_frequency() - 5.0).abs() < 1e-9);
        assert!(state.free_run);
    }

    #[test]
    fn test_coast_clamps_to_off_maximum() {
        let mut settings = jerk(10.0, 10.0);
        settings.off.max_control_frequency = 50.0;
        let mut state = ControlState::new(0);
        advance(
            &mut state,
            &Command {
                brake: false,
                mascon_on: true,
                target: FrequencyTarget::Absolute(100.0),
            },
            &settings,
            0.0,
        );
        assert_eq!(state.control_frequency(), 100.0);

        let dt = 0.001;
        advance(&mut state, &Command::coast(false), &settings, dt);
        assert!(state.free_run);
        assert_eq!(state.control_frequency(), 50.0);

        let mut peak: f64 = 0.0;
        for _ in 1..1000 {
            advance(&mut state, &Command::coast(false), &settings, dt);
            peak = peak.max(state.control_frequency());
        }
        assert!(peak <= 50.0);
        assert!((state.control_frequency() - 40.01).abs() < 1e-6);
        assert_eq!(state.sine_frequency(), 100.0);
    }

    #[test]
    fn test_clone_step_leaves_original() {
        let settings = jerk(60.0, 60.0);
        let mut original = ControlState::new(3);
        advance(&mut original, &Command::accelerate(60.0), &settings, 0.1);
        let snapshot = (
            original.control_frequency(),
            original.sine_phase(),
            original.generation_time,
        );

        let mut clone = original.clone();
        for _ in 0..5 {
            advance(&mut clone, &Command::coast(false), &settings, 0.1);
            clone.advance_time(0.1);
        }

        assert_eq!(
            (
                original.control_frequency(),
                original.sine_phase(),
                original.generation_time
            ),
            snapshot
        );
        assert!(!original.free_run);
    }
}
