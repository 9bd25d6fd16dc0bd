//! Integration tests for cycle synthesis, harmonic analysis and amplitude search.

use std::f64::consts::PI;

use vvvf_engine::fourier::{coefficients_edges, voltage_rate};
use vvvf_engine::{
    solve_amplitude, synthesize_cycle, AnalysisContext, ControlState, CycleRequest, SolveMethod,
    SolveOptions, TableLibrary,
};
use vvvf_spec::{PatternConfig, SimulationSettings};

const SYNC_PATTERN_YAML: &str = r#"
accelerate:
  pulses:
    - from_frequency: 0.0
      pulse: { kind: { type: sync, count: 9 } }
      amplitude: { normal: { type: constant, value: 0.8 } }
braking:
  pulses:
    - from_frequency: 0.0
      pulse: { kind: { type: sync, count: 15 } }
      amplitude: { normal: { type: constant, value: 0.4 } }
"#;

const SAMPLES: usize = 4000;

fn pattern() -> PatternConfig {
    PatternConfig::from_yaml(SYNC_PATTERN_YAML).unwrap()
}

#[test]
fn test_cycle_leaves_state_untouched() {
    let pattern = pattern();
    let tables = TableLibrary::new();
    let settings = SimulationSettings::default();
    let context = AnalysisContext {
        pattern: &pattern,
        tables: &tables,
        settings: &settings,
    };
    let state = ControlState::new(9);

    let cycle = synthesize_cycle(&state, &context, &CycleRequest::new(30.0, SAMPLES)).unwrap();
    assert_eq!(cycle.len(), SAMPLES);
    assert_eq!(state.control_frequency(), 0.0);
    assert_eq!(state.generation_time, 0.0);
}

#[test]
fn test_sine_pwm_voltage_rate() {
    let pattern = pattern();
    let tables = TableLibrary::new();
    let settings = SimulationSettings::default();
    let context = AnalysisContext {
        pattern: &pattern,
        tables: &tables,
        settings: &settings,
    };
    let state = ControlState::default();

    // Line fundamental of sine PWM is a·√3/2 of the DC link, so the rate is a·π/4
    let cycle = synthesize_cycle(&state, &context, &CycleRequest::new(30.0, SAMPLES)).unwrap();
    let rate = voltage_rate(&cycle, pattern.level);
    assert!((rate - 0.8 * PI / 4.0).abs() < 0.01, "rate = {}", rate);

    let braking = CycleRequest {
        brake: true,
        ..CycleRequest::new(30.0, SAMPLES)
    };
    let cycle = synthesize_cycle(&state, &context, &braking).unwrap();
    let rate = voltage_rate(&cycle, pattern.level);
    assert!((rate - 0.4 * PI / 4.0).abs() < 0.01, "rate = {}", rate);

    // Balanced three-phase output has no triplen line harmonics
    let coefficients = coefficients_edges(&cycle, pattern.level, 3);
    assert!(coefficients[2].magnitude() < 0.01);
}

#[test]
fn test_amplitude_override() {
    let pattern = pattern();
    let tables = TableLibrary::new();
    let settings = SimulationSettings::default();
    let context = AnalysisContext {
        pattern: &pattern,
        tables: &tables,
        settings: &settings,
    };
    let request = CycleRequest {
        amplitude: Some(0.2),
        ..CycleRequest::new(30.0, SAMPLES)
    };

    let cycle = synthesize_cycle(&ControlState::default(), &context, &request).unwrap();
    let rate = voltage_rate(&cycle, pattern.level);
    assert!((rate - 0.2 * PI / 4.0).abs() < 0.01, "rate = {}", rate);
}

fn harmonic_pattern(amplitude: f64) -> PatternConfig {
    let entry = format!(
        r#"
    - from_frequency: 0.0
      pulse:
        kind: {{ type: sync, count: 9 }}
        harmonics:
          - {{ wave: sine, order: 3.0, amplitude: 0.5, proportional_to_amplitude: true }}
      amplitude: {{ normal: {{ type: constant, value: {} }} }}"#,
        amplitude
    );
    PatternConfig::from_yaml(&format!(
        "accelerate:\n  pulses:{}\nbraking:\n  pulses:{}\n",
        entry, entry
    ))
    .unwrap()
}

#[test]
fn test_amplitude_override_rescales_proportional_harmonics() {
    let tables = TableLibrary::new();
    let settings = SimulationSettings::default();
    let full = harmonic_pattern(1.0);
    let native = harmonic_pattern(0.2);

    let overridden = synthesize_cycle(
        &ControlState::default(),
        &AnalysisContext {
            pattern: &full,
            tables: &tables,
            settings: &settings,
        },
        &CycleRequest {
            amplitude: Some(0.2),
            ..CycleRequest::new(30.0, SAMPLES)
        },
    )
    .unwrap();
    let expected = synthesize_cycle(
        &ControlState::default(),
        &AnalysisContext {
            pattern: &native,
            tables: &tables,
            settings: &settings,
        },
        &CycleRequest::new(30.0, SAMPLES),
    )
    .unwrap();

    let differing = overridden
        .iter()
        .zip(&expected)
        .filter(|(a, b)| a != b)
        .count();
    assert_eq!(differing, 0);
    assert_eq!(
        voltage_rate(&overridden, full.level),
        voltage_rate(&expected, native.level)
    );
}

#[test]
fn test_bisection_finds_amplitude() {
    let pattern = pattern();
    let tables = TableLibrary::new();
    let settings = SimulationSettings::default();
    let context = AnalysisContext {
        pattern: &pattern,
        tables: &tables,
        settings: &settings,
    };

    let result = solve_amplitude(
        &ControlState::default(),
        &context,
        &CycleRequest::new(30.0, SAMPLES),
        0.5,
        SolveMethod::Bisection {
            low: 0.0,
            high: 1.0,
        },
        SolveOptions {
            tolerance: 1e-3,
            max_iterations: 40,
        },
    )
    .unwrap();

    assert!((result.value - 2.0 / PI).abs() < 0.015, "amplitude = {}", result.value);
    assert!(result.residual.abs() < 0.01);
}

#[test]
fn test_newton_improves_on_initial_guess() {
    let pattern = pattern();
    let tables = TableLibrary::new();
    let settings = SimulationSettings::default();
    let context = AnalysisContext {
        pattern: &pattern,
        tables: &tables,
        settings: &settings,
    };
    // Finer sampling keeps the finite-difference slope away from zero
    let request = CycleRequest::new(30.0, 10 * SAMPLES);

    let result = solve_amplitude(
        &ControlState::default(),
        &context,
        &request,
        0.5,
        SolveMethod::Newton { initial: 0.2 },
        SolveOptions {
            tolerance: 1e-3,
            max_iterations: 10,
        },
    )
    .unwrap();

    let initial_residual = 0.2 * PI / 4.0 - 0.5;
    assert!(result.residual.is_finite());
    assert!(result.residual.abs() < initial_residual.abs());
}

#[test]
fn test_invalid_request_is_rejected() {
    let pattern = pattern();
    let tables = TableLibrary::new();
    let settings = SimulationSettings::default();
    let context = AnalysisContext {
        pattern: &pattern,
        tables: &tables,
        settings: &settings,
    };

    let err = synthesize_cycle(&ControlState::default(), &context, &CycleRequest::new(0.0, 100))
        .unwrap_err();
    assert_eq!(err.code(), "ENGINE_002");

    let err = solve_amplitude(
        &ControlState::default(),
        &context,
        &CycleRequest::new(30.0, 0),
        0.5,
        SolveMethod::Newton { initial: 0.5 },
        SolveOptions::default(),
    )
    .unwrap_err();
    assert_eq!(err.code(), "ENGINE_002");
}
