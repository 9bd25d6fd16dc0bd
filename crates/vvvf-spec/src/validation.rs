//! Pattern, program and motor validation.
//!
//! The engine treats its inputs as already validated. Everything that would
//! otherwise surface as a configuration error at the point of use is caught
//! here first.

use crate::amplitude::AmplitudeLaw;
use crate::carrier::{CarrierBase, CarrierControl};
use crate::error::{ErrorCode, ValidationError, ValidationResult, ValidationWarning, WarningCode};
use crate::motor::MotorParameters;
use crate::pattern::{JerkParams, PatternConfig, PulseControl, SubPattern};
use crate::program::MasconProgram;
use crate::pulse::{PulseKind, PulseMode};
use crate::value::ValueLaw;

/// Amplitudes above this value leave the linear modulation range of every base wave.
const LINEAR_AMPLITUDE_LIMIT: f64 = 1.3;

/// Validates a control pattern.
///
/// # Example
/// ```
/// use vvvf_spec::{AmplitudeLaw, PatternConfig, PulseControl, PulseKind, PulseMode, SubPattern};
/// use vvvf_spec::validation::validate_pattern;
///
/// let entry = PulseControl::new(
///     0.0,
///     PulseMode::new(PulseKind::Async),
///     AmplitudeLaw::Constant { value: 0.8 },
/// );
/// let pattern = PatternConfig {
///     level: Default::default(),
///     minimum_frequency: Default::default(),
///     accelerate: SubPattern { jerk: Default::default(), pulses: vec![entry.clone()] },
///     braking: SubPattern { jerk: Default::default(), pulses: vec![entry] },
/// };
/// assert!(validate_pattern(&pattern).is_ok());
/// ```
pub fn validate_pattern(pattern: &PatternConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    check_non_negative(
        pattern.minimum_frequency.accelerate,
        ErrorCode::InvalidFrequency,
        "minimum_frequency.accelerate",
        &mut result,
    );
    check_non_negative(
        pattern.minimum_frequency.braking,
        ErrorCode::InvalidFrequency,
        "minimum_frequency.braking",
        &mut result,
    );

    validate_sub_pattern(&pattern.accelerate, "accelerate", &mut result);
    validate_sub_pattern(&pattern.braking, "braking", &mut result);

    result
}

fn validate_sub_pattern(sub: &SubPattern, name: &str, result: &mut ValidationResult) {
    validate_jerk(&sub.jerk.on, &format!("{}.jerk.on", name), result);
    validate_jerk(&sub.jerk.off, &format!("{}.jerk.off", name), result);

    if sub.pulses.is_empty() {
        result.add_error(ValidationError::with_path(
            ErrorCode::EmptyPulseList,
            "sub-pattern must declare at least one pulse control",
            format!("{}.pulses", name),
        ));
        return;
    }

    for (i, window) in sub.pulses.windows(2).enumerate() {
        if window[1].from_frequency < window[0].from_frequency {
            result.add_error(ValidationError::with_path(
                ErrorCode::UnsortedThresholds,
                format!(
                    "from_frequency {} is below the previous threshold {}",
                    window[1].from_frequency, window[0].from_frequency
                ),
                format!("{}.pulses[{}].from_frequency", name, i + 1),
            ));
        }
    }

    for (i, pulse) in sub.pulses.iter().enumerate() {
        validate_pulse_control(pulse, &format!("{}.pulses[{}]", name, i), result);
    }
}

fn validate_jerk(jerk: &JerkParams, path: &str, result: &mut ValidationResult) {
    if !jerk.frequency_change_rate.is_finite() || jerk.frequency_change_rate < 0.0 {
        result.add_error(ValidationError::with_path(
            ErrorCode::InvalidJerk,
            format!(
                "frequency_change_rate must be non-negative, got {}",
                jerk.frequency_change_rate
            ),
            format!("{}.frequency_change_rate", path),
        ));
    }
    check_non_negative(
        jerk.max_control_frequency,
        ErrorCode::InvalidJerk,
        &format!("{}.max_control_frequency", path),
        result,
    );
}

fn validate_pulse_control(pulse: &PulseControl, path: &str, result: &mut ValidationResult) {
    check_non_negative(
        pulse.from_frequency,
        ErrorCode::InvalidFrequency,
        &format!("{}.from_frequency", path),
        result,
    );

    if !pulse.enable_normal && !pulse.enable_free_run_on && !pulse.enable_free_run_off {
        result.add_warning(ValidationWarning::with_path(
            WarningCode::UnreachablePulse,
            "entry is disabled for every run condition",
            path,
        ));
    }

    validate_pulse_mode(&pulse.pulse, &format!("{}.pulse", path), result);
    validate_amplitude(&pulse.amplitude.normal, &format!("{}.amplitude.normal", path), result);
    if let Some(ref free_run) = pulse.amplitude.free_run {
        validate_amplitude(free_run, &format!("{}.amplitude.free_run", path), result);
    }
    if matches!(pulse.pulse.kind, PulseKind::Async) {
        validate_carrier(&pulse.carrier, &format!("{}.carrier", path), result);
    }
}

fn validate_pulse_mode(mode: &PulseMode, path: &str, result: &mut ValidationResult) {
    if mode.kind.count() == Some(0) {
        result.add_error(ValidationError::with_path(
            ErrorCode::InvalidPulseCount,
            format!("{} pulse count must be positive", mode.kind.as_str()),
            format!("{}.kind.count", path),
        ));
    }

    if mode.kind == PulseKind::DeltaSigma {
        result.add_warning(ValidationWarning::with_path(
            WarningCode::DeltaSigmaUnwired,
            "delta_sigma entries produce no switching output",
            format!("{}.kind", path),
        ));
    }

    if let Some(discrete) = mode.discrete_time {
        if discrete.steps == 0 {
            result.add_error(ValidationError::with_path(
                ErrorCode::InvalidDiscreteSteps,
                "discrete_time.steps must be positive",
                format!("{}.discrete_time.steps", path),
            ));
        }
    }

    for (i, harmonic) in mode.harmonics.iter().enumerate() {
        if !harmonic.order.is_finite() || harmonic.order <= 0.0 {
            result.add_error(ValidationError::with_path(
                ErrorCode::InvalidHarmonic,
                format!("harmonic order must be positive, got {}", harmonic.order),
                format!("{}.harmonics[{}].order", path, i),
            ));
        }
        if !harmonic.amplitude.is_finite() {
            result.add_error(ValidationError::with_path(
                ErrorCode::InvalidHarmonic,
                "harmonic amplitude must be finite",
                format!("{}.harmonics[{}].amplitude", path, i),
            ));
        }
    }
}

fn validate_amplitude(law: &AmplitudeLaw, path: &str, result: &mut ValidationResult) {
    match law {
        AmplitudeLaw::Constant { value } => {
            check_non_negative(*value, ErrorCode::InvalidAmplitude, path, result);
            warn_over_range(*value, path, result);
        }
        AmplitudeLaw::Curve {
            start_frequency,
            start_amplitude,
            end_frequency,
            end_amplitude,
            max,
            ..
        } => {
            for value in [start_frequency, start_amplitude, end_frequency, end_amplitude] {
                check_non_negative(*value, ErrorCode::InvalidAmplitude, path, result);
            }
            let peak = max.unwrap_or(start_amplitude.max(*end_amplitude));
            warn_over_range(peak, path, result);
        }
        AmplitudeLaw::Table { points, .. } => {
            if points.is_empty() {
                result.add_error(ValidationError::with_path(
                    ErrorCode::InvalidAmplitude,
                    "amplitude table must not be empty",
                    path,
                ));
            }
            if points.windows(2).any(|w| w[1].frequency < w[0].frequency) {
                result.add_error(ValidationError::with_path(
                    ErrorCode::InvalidAmplitude,
                    "amplitude table frequencies must ascend",
                    path,
                ));
            }
        }
    }
}

fn validate_carrier(carrier: &CarrierControl, path: &str, result: &mut ValidationResult) {
    match &carrier.base {
        CarrierBase::Constant { frequency } => {
            check_positive(*frequency, &format!("{}.base.frequency", path), result);
        }
        CarrierBase::Moving {
            start_carrier,
            end_carrier,
            ..
        } => {
            check_positive(*start_carrier, &format!("{}.base.start_carrier", path), result);
            check_positive(*end_carrier, &format!("{}.base.end_carrier", path), result);
        }
        CarrierBase::Periodic {
            lowest,
            highest,
            interval,
            ..
        } => {
            check_law_positive(lowest, &format!("{}.base.lowest", path), result);
            check_law_positive(highest, &format!("{}.base.highest", path), result);
            check_law_positive(interval, &format!("{}.base.interval", path), result);
        }
        CarrierBase::Table { points } => {
            if points.is_empty() {
                result.add_error(ValidationError::with_path(
                    ErrorCode::InvalidCarrier,
                    "carrier table must not be empty",
                    format!("{}.base.points", path),
                ));
            }
        }
    }

    if let Some(random) = carrier.random {
        if !random.range.is_finite() || random.range.min_value() < 0.0 {
            result.add_error(ValidationError::with_path(
                ErrorCode::InvalidCarrier,
                "random range must be non-negative",
                format!("{}.random.range", path),
            ));
        }
        check_law_positive(&random.interval, &format!("{}.random.interval", path), result);
    }
}

/// Validates a mascon program.
pub fn validate_program(program: &MasconProgram) -> ValidationResult {
    let mut result = ValidationResult::default();

    check_non_negative(
        program.initial_frequency,
        ErrorCode::InvalidFrequency,
        "initial_frequency",
        &mut result,
    );

    if program.points.is_empty() {
        result.add_error(ValidationError::with_path(
            ErrorCode::EmptyProgram,
            "program must contain at least one point",
            "points",
        ));
    }

    for (i, point) in program.points.iter().enumerate() {
        if !point.duration.is_finite() {
            result.add_error(ValidationError::with_path(
                ErrorCode::InvalidDuration,
                "duration must be finite",
                format!("points[{}].duration", i),
            ));
        } else if point.duration <= 0.0 {
            result.add_warning(ValidationWarning::with_path(
                WarningCode::ZeroDurationPoint,
                "point has no positive duration and will be skipped",
                format!("points[{}].duration", i),
            ));
        }
        if !point.rate.is_finite() || point.rate < 0.0 {
            result.add_error(ValidationError::with_path(
                ErrorCode::InvalidRate,
                format!("rate must be non-negative, got {}", point.rate),
                format!("points[{}].rate", i),
            ));
        }
    }

    result
}

/// Validates motor parameters.
pub fn validate_motor(motor: &MotorParameters) -> ValidationResult {
    let mut result = ValidationResult::default();

    let positive = [
        ("rs", motor.rs),
        ("rr", motor.rr),
        ("ls", motor.ls),
        ("lr", motor.lr),
        ("lm", motor.lm),
        ("pole_pairs", motor.pole_pairs),
        ("inertia", motor.inertia),
        ("supply_voltage", motor.supply_voltage),
    ];
    for (name, value) in positive {
        if !value.is_finite() || value <= 0.0 {
            result.add_error(ValidationError::with_path(
                ErrorCode::InvalidMotorParameter,
                format!("{} must be positive, got {}", name, value),
                name,
            ));
        }
    }

    if motor.lm * motor.lm >= motor.ls * motor.lr {
        result.add_error(ValidationError::with_path(
            ErrorCode::InvalidMotorParameter,
            "lm^2 must be smaller than ls * lr",
            "lm",
        ));
    }

    for (name, value) in [
        ("damping", motor.damping),
        ("static_friction", motor.static_friction),
    ] {
        if !value.is_finite() || value < 0.0 {
            result.add_error(ValidationError::with_path(
                ErrorCode::InvalidMotorParameter,
                format!("{} must be non-negative, got {}", name, value),
                name,
            ));
        }
    }

    result
}

fn check_non_negative(value: f64, code: ErrorCode, path: &str, result: &mut ValidationResult) {
    if !value.is_finite() || value < 0.0 {
        result.add_error(ValidationError::with_path(
            code,
            format!("value must be a non-negative number, got {}", value),
            path,
        ));
    }
}

fn check_positive(value: f64, path: &str, result: &mut ValidationResult) {
    if !value.is_finite() || value <= 0.0 {
        result.add_error(ValidationError::with_path(
            ErrorCode::InvalidCarrier,
            format!("value must be positive, got {}", value),
            path,
        ));
    }
}

fn check_law_positive(law: &ValueLaw, path: &str, result: &mut ValidationResult) {
    if !law.is_finite() || law.min_value() <= 0.0 {
        result.add_error(ValidationError::with_path(
            ErrorCode::InvalidCarrier,
            "value must be positive over the whole frequency range",
            path,
        ));
    }
}

fn warn_over_range(value: f64, path: &str, result: &mut ValidationResult) {
    if value > LINEAR_AMPLITUDE_LIMIT {
        result.add_warning(ValidationWarning::with_path(
            WarningCode::AmplitudeOverRange,
            format!("amplitude {} exceeds the linear modulation range", value),
            path,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carrier::RandomModulation;
    use crate::pattern::{Level, MinimumFrequency};
    use crate::program::MasconPoint;

    fn async_entry(from: f64) -> PulseControl {
        PulseControl::new(
            from,
            PulseMode::new(PulseKind::Async),
            AmplitudeLaw::Constant { value: 0.5 },
        )
    }

    fn pattern(pulses: Vec<PulseControl>) -> PatternConfig {
        PatternConfig {
            level: Level::Two,
            minimum_frequency: MinimumFrequency::default(),
            accelerate: SubPattern {
                jerk: Default::default(),
                pulses: pulses.clone(),
            },
            braking: SubPattern {
                jerk: Default::default(),
                pulses,
            },
        }
    }

    #[test]
    fn test_valid_pattern() {
        let result = validate_pattern(&pattern(vec![async_entry(0.0), async_entry(30.0)]));
        assert!(result.is_ok(), "{:?}", result.errors);
    }

    #[test]
    fn test_unsorted_thresholds() {
        let result = validate_pattern(&pattern(vec![async_entry(30.0), async_entry(10.0)]));
        assert!(!result.is_ok());
        assert!(result
            .errors
            .iter()
            .any(|e| e.code == ErrorCode::UnsortedThresholds));
    }

    #[test]
    fn test_empty_sub_pattern() {
        let result = validate_pattern(&pattern(vec![]));
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors.iter().all(|e| e.code == ErrorCode::EmptyPulseList));
    }

    #[test]
    fn test_zero_sync_count() {
        let mut entry = async_entry(0.0);
        entry.pulse.kind = PulseKind::Sync { count: 0 };
        let result = validate_pattern(&pattern(vec![entry]));
        assert!(result
            .errors
            .iter()
            .any(|e| e.code == ErrorCode::InvalidPulseCount));
    }

    #[test]
    fn test_random_interval_must_be_positive() {
        let mut entry = async_entry(0.0);
        entry.carrier.random = Some(RandomModulation {
            range: ValueLaw::Const(100.0),
            interval: ValueLaw::Const(0.0),
        });
        let result = validate_pattern(&pattern(vec![entry]));
        assert!(result.errors.iter().any(|e| e.code == ErrorCode::InvalidCarrier));
    }

    #[test]
    fn test_delta_sigma_warns() {
        let mut entry = async_entry(0.0);
        entry.pulse.kind = PulseKind::DeltaSigma;
        let result = validate_pattern(&pattern(vec![entry]));
        assert!(result.is_ok());
        assert!(result
            .warnings
            .iter()
            .any(|w| w.code == WarningCode::DeltaSigmaUnwired));
    }

    #[test]
    fn test_program_validation() {
        let program = MasconProgram {
            initial_frequency: 0.0,
            points: vec![
                MasconPoint::accelerate(5.0, 2.0),
                MasconPoint::coast(0.0),
                MasconPoint::brake(5.0, -1.0),
            ],
        };
        let result = validate_program(&program);
        assert!(!result.is_ok());
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.errors[0].code, ErrorCode::InvalidRate);
    }

    #[test]
    fn test_default_motor_is_valid() {
        assert!(validate_motor(&MotorParameters::default()).is_ok());
    }

    #[test]
    fn test_motor_inductance_consistency() {
        let motor = MotorParameters {
            lm: 0.3,
            ..MotorParameters::default()
        };
        assert!(!validate_motor(&motor).is_ok());
    }
}
