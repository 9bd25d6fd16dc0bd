//! Per-sample compiled view of the active pattern entry.

use std::collections::BTreeMap;
use std::f64::consts::FRAC_PI_2;

use vvvf_spec::{
    AmplitudeLaw, CurveShape, Harmonic, HarmonicWave, Level, PatternConfig, PulseDataKey,
    PulseKind, PulseMode, RunCondition, SimulationSettings,
};

use crate::custom_table::{CustomPwmTable, TableLibrary};
use crate::error::EngineResult;
use crate::state::ControlState;

/// A harmonic with its amplitude resolved for the current sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedHarmonic {
    /// Harmonic waveform.
    pub wave: HarmonicWave,
    /// Multiple of the fundamental.
    pub order: f64,
    /// Phase in radians.
    pub initial_phase: f64,
    /// Amplitude added to the reference.
    pub amplitude: f64,
}

impl ResolvedHarmonic {
    /// Resolves a harmonic at a control frequency and fundamental amplitude.
    pub fn resolve(harmonic: &Harmonic, control_frequency: f64, amplitude: f64) -> Self {
        let mut resolved = if harmonic.proportional_to_frequency {
            harmonic.amplitude.resolve(control_frequency)
        } else {
            harmonic.amplitude.resolve(0.0)
        };
        if harmonic.proportional_to_amplitude {
            resolved *= amplitude;
        }
        Self {
            wave: harmonic.wave,
            order: harmonic.order,
            initial_phase: harmonic.initial_phase,
            amplitude: resolved,
        }
    }
}

/// Everything the waveform generator needs for one sample.
#[derive(Debug, Clone)]
pub struct PwmCalculateValues<'a> {
    /// Active pulse mode.
    pub pulse: &'a PulseMode,
    /// Output level count.
    pub level: Level,
    /// Reference amplitude (also the modulation index of tabulated modes).
    pub amplitude: f64,
    /// Carrier frequency in Hz (asynchronous modes only, 0 otherwise).
    pub carrier_frequency: f64,
    /// Pulse data resolved at the control frequency.
    pub pulse_data: BTreeMap<PulseDataKey, f64>,
    /// Output frequency floor in Hz.
    pub minimum_frequency: f64,
    /// Harmonics resolved for this sample.
    pub harmonics: Vec<ResolvedHarmonic>,
    /// Switch-angle table for tabulated modes, if present in the library.
    pub table: Option<&'a CustomPwmTable>,
    /// Phase bias of all legs in radians.
    pub initial_phase: f64,
}

impl<'a> PwmCalculateValues<'a> {
    /// Creates values for a pulse mode with no harmonics, pulse data or table.
    pub fn new(pulse: &'a PulseMode, level: Level, amplitude: f64) -> Self {
        Self {
            pulse,
            level,
            amplitude,
            carrier_frequency: 0.0,
            pulse_data: BTreeMap::new(),
            minimum_frequency: 0.0,
            harmonics: Vec::new(),
            table: None,
            initial_phase: 0.0,
        }
    }

    /// Sets the carrier frequency.
    pub fn with_carrier_frequency(mut self, carrier_frequency: f64) -> Self {
        self.carrier_frequency = carrier_frequency;
        self
    }

    /// Replaces the amplitude and re-resolves amplitude-proportional harmonics.
    pub fn override_amplitude(&mut self, amplitude: f64, control_frequency: f64) {
        self.amplitude = amplitude;
        self.harmonics = resolve_harmonics(self.pulse, control_frequency, amplitude);
    }

    /// Resolved pulse data value.
    pub fn data(&self, key: PulseDataKey) -> Option<f64> {
        self.pulse_data.get(&key).copied()
    }
}

/// Evaluates an amplitude law at a control frequency.
pub fn evaluate_amplitude(law: &AmplitudeLaw, control_frequency: f64) -> f64 {
    match law {
        AmplitudeLaw::Constant { value } => *value,
        AmplitudeLaw::Curve {
            start_frequency,
            start_amplitude,
            end_frequency,
            end_amplitude,
            shape,
            cut_off,
            max,
        } => {
            let span = end_frequency - start_frequency;
            let t = if span.abs() < f64::EPSILON {
                if control_frequency < *start_frequency {
                    0.0
                } else {
                    1.0
                }
            } else {
                ((control_frequency - start_frequency) / span).clamp(0.0, 1.0)
            };
            let (a, b) = (*start_amplitude, *end_amplitude);
            let mut value = match shape {
                CurveShape::Linear => a + (b - a) * t,
                CurveShape::InverseProportional if a != 0.0 && b != 0.0 => {
                    let inverse = 1.0 / a + (1.0 / b - 1.0 / a) * t;
                    if inverse == 0.0 {
                        b
                    } else {
                        1.0 / inverse
                    }
                }
                CurveShape::Exponential if a > 0.0 && b > 0.0 => a * (b / a).powf(t),
                CurveShape::Sine => a + (b - a) * (t * FRAC_PI_2).sin(),
                // Degenerate anchors fall back to a straight line
                _ => a + (b - a) * t,
            };
            if let Some(cut_off) = cut_off {
                if value < *cut_off {
                    value = 0.0;
                }
            }
            if let Some(max) = max {
                value = value.min(*max);
            }
            value
        }
        AmplitudeLaw::Table {
            points,
            interpolate,
        } => {
            let (first, last) = match (points.first(), points.last()) {
                (Some(first), Some(last)) => (first, last),
                _ => return 0.0,
            };
            if control_frequency <= first.frequency {
                return first.amplitude;
            }
            if control_frequency >= last.frequency {
                return last.amplitude;
            }
            let upper = points.partition_point(|p| p.frequency <= control_frequency);
            let low = &points[upper - 1];
            if !interpolate || upper >= points.len() {
                return low.amplitude;
            }
            let high = &points[upper];
            let span = high.frequency - low.frequency;
            if span <= 0.0 {
                return low.amplitude;
            }
            low.amplitude
                + (high.amplitude - low.amplitude) * (control_frequency - low.frequency) / span
        }
    }
}

/// Condition used to filter pattern entries for a state.
pub fn run_condition(state: &ControlState) -> RunCondition {
    match (state.free_run, state.mascon_off) {
        (false, _) => RunCondition::Normal,
        (true, false) => RunCondition::FreeRunOn,
        (true, true) => RunCondition::FreeRunOff,
    }
}

/// Compiles the active pattern entry for the current sample.
///
/// Returns `None` when there is no output: no entry admits the control
/// frequency and condition, or power is off and the control frequency has
/// decayed to zero. Also applies the minimum-frequency floor to the sine
/// generator and retunes the carrier generator for asynchronous modes.
pub fn calculate_values<'a>(
    state: &mut ControlState,
    pattern: &'a PatternConfig,
    tables: &'a TableLibrary,
    settings: &SimulationSettings,
) -> EngineResult<Option<PwmCalculateValues<'a>>> {
    let control_frequency = state.control_frequency();
    if state.mascon_off && control_frequency <= 0.0 {
        note_entry(state, None);
        return Ok(None);
    }

    let sub = pattern.sub_pattern(state.brake);
    let condition = run_condition(state);
    let index = match sub.active(control_frequency, condition) {
        Some(index) => index,
        None => {
            note_entry(state, None);
            return Ok(None);
        }
    };
    note_entry(state, Some(index));
    let entry = &sub.pulses[index];

    let minimum_frequency = pattern.minimum(state.brake);
    if control_frequency > 0.0 && state.sine_frequency() < minimum_frequency {
        state.set_sine_frequency(minimum_frequency);
    }

    let amplitude = evaluate_amplitude(entry.amplitude.select(state.free_run), control_frequency);

    let carrier_frequency = if entry.pulse.kind == PulseKind::Async {
        let time = state.generation_time;
        let frequency = state.carrier.calculate(
            &mut state.rng,
            &entry.carrier,
            control_frequency,
            time,
            settings.use_simple_carrier,
        )?;
        state.set_saw_frequency(frequency);
        frequency
    } else {
        0.0
    };

    let pulse_data = entry
        .pulse
        .pulse_data
        .iter()
        .map(|(key, law)| (*key, law.resolve(control_frequency)))
        .collect();

    let harmonics = resolve_harmonics(&entry.pulse, control_frequency, amplitude);

    Ok(Some(PwmCalculateValues {
        pulse: &entry.pulse,
        level: pattern.level,
        amplitude,
        carrier_frequency,
        pulse_data,
        minimum_frequency,
        harmonics,
        table: tables.for_pulse(&entry.pulse.kind, pattern.level),
        initial_phase: settings.initial_phase,
    }))
}

fn resolve_harmonics(
    pulse: &PulseMode,
    control_frequency: f64,
    amplitude: f64,
) -> Vec<ResolvedHarmonic> {
    pulse
        .harmonics
        .iter()
        .map(|h| ResolvedHarmonic::resolve(h, control_frequency, amplitude))
        .collect()
}

fn note_entry(state: &mut ControlState, entry: Option<usize>) {
    if state.active_entry != entry {
        tracing::debug!(
            from = ?state.active_entry,
            to = ?entry,
            brake = state.brake,
            control_frequency = state.control_frequency(),
            "pattern entry changed"
        );
        state.active_entry = entry;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vvvf_spec::{AmplitudePoint, PulseControl, SubPattern, ValueLaw};

    fn pattern() -> PatternConfig {
        let mut entry_low = PulseControl::new(
            0.0,
            PulseMode::new(PulseKind::Async),
            AmplitudeLaw::Curve {
                start_frequency: 0.0,
                start_amplitude: 0.0,
                end_frequency: 50.0,
                end_amplitude: 1.0,
                shape: CurveShape::Linear,
                cut_off: None,
                max: None,
            },
        );
        entry_low.amplitude.free_run = Some(AmplitudeLaw::Constant { value: 0.25 });
        let entry_high = PulseControl::new(
            40.0,
            PulseMode::new(PulseKind::Sync { count: 3 }),
            AmplitudeLaw::Constant { value: 1.0 },
        );
        PatternConfig {
            level: Level::Two,
            minimum_frequency: vvvf_spec::MinimumFrequency {
                accelerate: 2.0,
                braking: 2.0,
            },
            accelerate: SubPattern {
                jerk: Default::default(),
                pulses: vec![entry_low, entry_high],
            },
            braking: SubPattern::default(),
        }
    }

    #[test]
    fn test_curve_shapes() {
        let curve = |shape| AmplitudeLaw::Curve {
            start_frequency: 0.0,
            start_amplitude: 0.1,
            end_frequency: 10.0,
            end_amplitude: 0.9,
            shape,
            cut_off: None,
            max: None,
        };
        assert!((evaluate_amplitude(&curve(CurveShape::Linear), 5.0) - 0.5).abs() < 1e-12);
        assert!((evaluate_amplitude(&curve(CurveShape::Exponential), 5.0) - 0.3).abs() < 1e-12);
        let inverse = evaluate_amplitude(&curve(CurveShape::InverseProportional), 5.0);
        assert!((inverse - 0.18).abs() < 1e-12);
        assert!((evaluate_amplitude(&curve(CurveShape::Sine), 10.0) - 0.9).abs() < 1e-12);
        assert_eq!(evaluate_amplitude(&curve(CurveShape::Linear), 20.0), 0.9);
    }

    #[test]
    fn test_curve_cut_off_and_max() {
        let law = AmplitudeLaw::Curve {
            start_frequency: 0.0,
            start_amplitude: 0.0,
            end_frequency: 10.0,
            end_amplitude: 2.0,
            shape: CurveShape::Linear,
            cut_off: Some(0.5),
            max: Some(1.2),
        };
        assert_eq!(evaluate_amplitude(&law, 1.0), 0.0);
        assert!((evaluate_amplitude(&law, 4.0) - 0.8).abs() < 1e-12);
        assert_eq!(evaluate_amplitude(&law, 9.0), 1.2);
    }

    #[test]
    fn test_table_amplitude() {
        let points = vec![
            AmplitudePoint {
                frequency: 0.0,
                amplitude: 0.2,
            },
            AmplitudePoint {
                frequency: 10.0,
                amplitude: 0.6,
            },
        ];
        let stepped = AmplitudeLaw::Table {
            points: points.clone(),
            interpolate: false,
        };
        let smooth = AmplitudeLaw::Table {
            points,
            interpolate: true,
        };
        assert_eq!(evaluate_amplitude(&stepped, 5.0), 0.2);
        assert!((evaluate_amplitude(&smooth, 5.0) - 0.4).abs() < 1e-12);
        assert_eq!(evaluate_amplitude(&smooth, 50.0), 0.6);
    }

    #[test]
    fn test_harmonic_resolution() {
        let harmonic = Harmonic {
            wave: HarmonicWave::Sine,
            order: 3.0,
            initial_phase: 0.0,
            amplitude: ValueLaw::Moving {
                start_frequency: 0.0,
                start: 0.1,
                end_frequency: 10.0,
                end: 0.3,
            },
            proportional_to_frequency: false,
            proportional_to_amplitude: true,
        };
        let fixed = ResolvedHarmonic::resolve(&harmonic, 10.0, 0.5);
        assert!((fixed.amplitude - 0.05).abs() < 1e-12);

        let tracking = Harmonic {
            proportional_to_frequency: true,
            proportional_to_amplitude: false,
            ..harmonic
        };
        assert!((ResolvedHarmonic::resolve(&tracking, 10.0, 0.5).amplitude - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_calculate_values_selects_entry() {
        let pattern = pattern();
        let tables = TableLibrary::new();
        let settings = SimulationSettings::default();
        let mut state = ControlState::new(0);
        state.set_control_frequency(20.0);
        state.set_sine_frequency(20.0);

        let values = calculate_values(&mut state, &pattern, &tables, &settings)
            .unwrap()
            .unwrap();
        assert_eq!(values.pulse.kind, PulseKind::Async);
        assert!((values.amplitude - 0.4).abs() < 1e-12);
        assert_eq!(values.carrier_frequency, 1000.0);
        assert_eq!(state.active_entry, Some(0));

        state.free_run = true;
        let values = calculate_values(&mut state, &pattern, &tables, &settings)
            .unwrap()
            .unwrap();
        assert_eq!(values.amplitude, 0.25);
    }

    #[test]
    fn test_no_output_when_coasting_at_zero() {
        let pattern = pattern();
        let tables = TableLibrary::new();
        let settings = SimulationSettings::default();
        let mut state = ControlState::new(0);
        state.mascon_off = true;
        state.free_run = true;
        state.set_sine_frequency(30.0);
        let values = calculate_values(&mut state, &pattern, &tables, &settings).unwrap();
        assert!(values.is_none());
    }

    #[test]
    fn test_minimum_frequency_floor() {
        let pattern = pattern();
        let tables = TableLibrary::new();
        let settings = SimulationSettings::default();
        let mut state = ControlState::new(0);
        state.set_control_frequency(0.5);
        state.set_sine_frequency(0.5);
        calculate_values(&mut state, &pattern, &tables, &settings).unwrap();
        assert!((state.sine_frequency() - 2.0).abs() < 1e-12);
    }
}
