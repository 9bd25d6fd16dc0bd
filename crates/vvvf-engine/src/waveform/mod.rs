//! Three-phase switching state synthesis.
//!
//! [`calculate_phases`] turns the control state and the compiled entry values
//! into one [`WaveValues`] sample. Each leg is computed on its own: a leg that
//! cannot be computed outputs the lowest level and clears the `ok` flag, and
//! the other two legs are unaffected.

pub mod base;
pub mod compare;
pub mod svm;

use std::f64::consts::TAU;

use serde::Serialize;
use thiserror::Error;
use vvvf_spec::{PulseDataKey, PulseKind};

use crate::state::ControlState;
use crate::values::PwmCalculateValues;

/// Output levels of the three legs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct WaveValues {
    /// U leg.
    pub u: u8,
    /// V leg.
    pub v: u8,
    /// W leg.
    pub w: u8,
}

impl WaveValues {
    /// Creates a sample from three levels.
    pub fn new(u: u8, v: u8, w: u8) -> Self {
        Self { u, v, w }
    }

    /// Levels as an array in U, V, W order.
    pub fn as_array(&self) -> [u8; 3] {
        [self.u, self.v, self.w]
    }

    /// U-V line level difference.
    pub fn line_uv(&self) -> i16 {
        self.u as i16 - self.v as i16
    }
}

/// Why a leg could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PhaseFault {
    /// The delta-sigma kind has no generator path.
    #[error("delta-sigma modulation is not available in the waveform generator")]
    DeltaSigmaUnwired,
    /// A tabulated kind has no table in the library.
    #[error("no switch-angle table for {kind} with {count} pulses")]
    MissingTable {
        /// Kind name.
        kind: &'static str,
        /// Pulse count.
        count: u32,
    },
    /// The reference evaluated to NaN or infinity.
    #[error("reference value is not finite")]
    NonFinite,
}

/// One synthesized sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseOutput {
    /// Leg levels.
    pub values: WaveValues,
    /// False if any leg fell back to the lowest level.
    pub ok: bool,
    /// First fault seen, if any.
    pub fault: Option<PhaseFault>,
}

/// Leg offsets in radians, U, V, W.
pub const PHASE_OFFSETS: [f64; 3] = [0.0, -TAU / 3.0, TAU / 3.0];

/// Modulating value of a leg at angle `x`, clamped to [-1, 1].
pub fn modulating_value(values: &PwmCalculateValues<'_>, x: f64) -> Result<f64, PhaseFault> {
    let mut reference = base::reference(values.pulse.base_wave, x, values.amplitude);
    for harmonic in &values.harmonics {
        reference += base::harmonic(harmonic, x);
    }
    if !reference.is_finite() {
        return Err(PhaseFault::NonFinite);
    }
    Ok(reference.clamp(-1.0, 1.0))
}

/// Level of one leg.
///
/// `x` is the leg's reference angle (quantized, bias and offset applied).
pub fn calculate_phase(
    state: &ControlState,
    values: &PwmCalculateValues<'_>,
    x: f64,
) -> Result<u8, PhaseFault> {
    let level = values.level;
    match values.pulse.kind {
        PulseKind::Chm { count, .. } | PulseKind::She { count, .. } => {
            let table = values.table.ok_or(PhaseFault::MissingTable {
                kind: values.pulse.kind.as_str(),
                count,
            })?;
            Ok(table.level_at(x, values.amplitude, level.max_output()))
        }
        PulseKind::Ho { count } => {
            let pulse_width = values.data(PulseDataKey::PulseWidth).unwrap_or(0.0);
            Ok(compare::overmodulation(
                level,
                x,
                count,
                pulse_width,
                values.amplitude,
            ))
        }
        PulseKind::DeltaSigma => Err(PhaseFault::DeltaSigmaUnwired),
        PulseKind::Async => {
            let reference = modulating_value(values, x)?;
            let carrier = compare::carrier_value(values.pulse.carrier_wave, state.saw_phase());
            Ok(compare::compare(level, reference, carrier))
        }
        PulseKind::Sync { count } => {
            let reference = modulating_value(values, x)?;
            let carrier_phase = values.data(PulseDataKey::CarrierPhase).unwrap_or(0.0);
            let carrier =
                compare::carrier_value(values.pulse.carrier_wave, count as f64 * x + carrier_phase);
            Ok(compare::compare(level, reference, carrier))
        }
    }
}

/// Common reference angle of the current sample, before leg offsets.
pub fn reference_angle(state: &ControlState, values: &PwmCalculateValues<'_>) -> f64 {
    let x = state.sine_phase() + values.initial_phase;
    match &values.pulse.discrete_time {
        Some(discrete) => base::quantize(x, discrete),
        None => x,
    }
}

/// Synthesizes the three legs for the current sample.
pub fn calculate_phases(state: &ControlState, values: &PwmCalculateValues<'_>) -> PhaseOutput {
    let x = reference_angle(state, values);
    let mut levels = [0u8; 3];
    let mut fault = None;

    for (level, offset) in levels.iter_mut().zip(PHASE_OFFSETS) {
        match calculate_phase(state, values, x + offset) {
            Ok(value) => *level = value,
            Err(err) => {
                *level = 0;
                fault.get_or_insert(err);
            }
        }
    }

    PhaseOutput {
        values: WaveValues::new(levels[0], levels[1], levels[2]),
        ok: fault.is_none(),
        fault,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custom_table::{CustomPwmTable, SwitchBlock, SwitchEntry};
    use vvvf_spec::{BaseWave, Level, PulseMode};

    fn running_state(frequency: f64, carrier: f64) -> ControlState {
        let mut state = ControlState::new(0);
        state.set_control_frequency(frequency);
        state.set_sine_frequency(frequency);
        state.set_saw_frequency(carrier);
        state
    }

    #[test]
    fn test_sine_pwm_duty_matches_reference() {
        // 50 Hz sine against a 1 kHz triangle, amplitude 1.0
        let mode = PulseMode::new(PulseKind::Async);
        let values = PwmCalculateValues::new(&mode, Level::Two, 1.0).with_carrier_frequency(1000.0);
        let mut state = running_state(50.0, 1000.0);

        let sample_rate = 1_000_000.0;
        let samples = (sample_rate / 50.0) as usize;
        let dt = 1.0 / sample_rate;
        let mut high = 0usize;
        let mut window_high = 0usize;
        let window = (sample_rate / 1000.0) as usize;
        for i in 0..samples {
            let out = calculate_phases(&state, &values);
            assert!(out.ok);
            high += out.values.u as usize;
            // First carrier period after the quarter cycle (reference near its peak)
            if (samples / 4..samples / 4 + window).contains(&i) {
                window_high += out.values.u as usize;
            }
            state.advance_time(dt);
        }

        let duty = high as f64 / samples as f64;
        assert!((duty - 0.5).abs() < 0.01, "duty = {}", duty);

        // Local duty over one carrier period tracks (1 + m·sin x) / 2
        let x = std::f64::consts::TAU * 50.0 * (samples / 4) as f64 * dt
            + std::f64::consts::PI / 20.0;
        let expected = 0.5 * (1.0 + x.sin());
        let local = window_high as f64 / window as f64;
        assert!((local - expected).abs() < 0.01, "local = {}, expected = {}", local, expected);
    }

    #[test]
    fn test_sync_mode_is_symmetric() {
        let mode = PulseMode::new(PulseKind::Sync { count: 9 });
        let values = PwmCalculateValues::new(&mode, Level::Two, 0.8);
        let state = running_state(30.0, 0.0);
        for i in 0..90 {
            let x = i as f64 * TAU / 90.0 + 0.01;
            let u = calculate_phase(&state, &values, x).unwrap();
            let mirrored = calculate_phase(&state, &values, x + std::f64::consts::PI).unwrap();
            assert_eq!(u + mirrored, 1, "x = {}", x);
        }
    }

    #[test]
    fn test_table_lookup_uses_amplitude() {
        let table = CustomPwmTable::new(
            1.0,
            0.0,
            vec![SwitchBlock {
                start_level: 0,
                switches: vec![SwitchEntry {
                    level: 1,
                    angle: std::f64::consts::FRAC_PI_4,
                }],
            }],
        )
        .unwrap();
        let mode = PulseMode::new(PulseKind::Chm {
            count: 1,
            alternative: 0,
        });
        let mut values = PwmCalculateValues::new(&mode, Level::Two, 0.5);
        values.table = Some(&table);
        let state = running_state(40.0, 0.0);
        assert_eq!(calculate_phase(&state, &values, 0.1), Ok(0));
        assert_eq!(calculate_phase(&state, &values, 1.0), Ok(1));
    }

    #[test]
    fn test_missing_table_fails_softly() {
        let mode = PulseMode::new(PulseKind::She {
            count: 5,
            alternative: 0,
        });
        let values = PwmCalculateValues::new(&mode, Level::Three, 0.5);
        let state = running_state(40.0, 0.0);
        let out = calculate_phases(&state, &values);
        assert!(!out.ok);
        assert_eq!(out.values, WaveValues::default());
        assert!(matches!(out.fault, Some(PhaseFault::MissingTable { count: 5, .. })));
    }

    #[test]
    fn test_delta_sigma_fails_softly() {
        let mode = PulseMode::new(PulseKind::DeltaSigma);
        let values = PwmCalculateValues::new(&mode, Level::Two, 0.5);
        let out = calculate_phases(&running_state(10.0, 0.0), &values);
        assert!(!out.ok);
        assert_eq!(out.fault, Some(PhaseFault::DeltaSigmaUnwired));
    }

    #[test]
    fn test_svm_three_level_outputs_all_levels() {
        let mode = PulseMode::new(PulseKind::Async).with_base_wave(BaseWave::Svm);
        let values =
            PwmCalculateValues::new(&mode, Level::Three, 0.9).with_carrier_frequency(900.0);
        let mut state = running_state(20.0, 900.0);
        let mut seen = [false; 3];
        for _ in 0..10_000 {
            let out = calculate_phases(&state, &values);
            for level in out.values.as_array() {
                seen[level as usize] = true;
            }
            state.advance_time(5e-6);
        }
        assert_eq!(seen, [true, true, true]);
    }
}
