//! Fourier analysis of synthesized cycles and amplitude solving.
//!
//! A cycle is a slice of [`WaveValues`] sampled uniformly over one
//! fundamental period. The analyzed signal is the U-V line voltage in
//! per-unit of the DC link, held constant between samples.

use std::f64::consts::{PI, TAU};

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};
use vvvf_spec::{Level, PatternConfig, SimulationSettings};

use crate::custom_table::TableLibrary;
use crate::error::{EngineError, EngineResult};
use crate::math::{bisection, newton, RootResult};
use crate::state::ControlState;
use crate::values::calculate_values;
use crate::waveform::{calculate_phases, WaveValues};

/// Fundamental of six-step line voltage in per-unit, 2√3/π.
///
/// Dividing a fundamental magnitude by this gives the voltage rate, which is
/// 1.0 at full six-step output.
pub const VOLTAGE_CONVERT_FACTOR: f64 = 1.102_657_790_842_5;

/// Finite-difference step of the Newton amplitude search.
pub const NEWTON_STEP: f64 = 1e-3;

/// Fourier coefficient of one harmonic order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FourierCoefficient {
    /// Harmonic order (1 is the fundamental).
    pub order: usize,
    /// Cosine coefficient.
    pub cos: f64,
    /// Sine coefficient.
    pub sin: f64,
}

impl FourierCoefficient {
    /// Peak magnitude `√(a² + b²)`.
    pub fn magnitude(&self) -> f64 {
        self.cos.hypot(self.sin)
    }
}

/// Line voltage of a sample in per-unit of the DC link.
pub fn line_voltage(wave: WaveValues, level: Level) -> f64 {
    wave.line_uv() as f64 / level.max_output() as f64
}

/// Coefficients by integrating each sample interval exactly.
pub fn coefficients_direct(
    cycle: &[WaveValues],
    level: Level,
    orders: usize,
) -> Vec<FourierCoefficient> {
    let n = cycle.len();
    if n == 0 {
        return Vec::new();
    }
    let interval = 1.0 / n as f64;

    (1..=orders)
        .map(|order| {
            let w = TAU * order as f64;
            let mut a = 0.0;
            let mut b = 0.0;
            for (k, wave) in cycle.iter().enumerate() {
                let y = line_voltage(*wave, level);
                if y == 0.0 {
                    continue;
                }
                let t0 = k as f64 * interval;
                let t1 = t0 + interval;
                a += y * ((w * t1).sin() - (w * t0).sin());
                b += y * ((w * t0).cos() - (w * t1).cos());
            }
            let scale = 1.0 / (PI * order as f64);
            FourierCoefficient {
                order,
                cos: a * scale,
                sin: b * scale,
            }
        })
        .collect()
}

/// Coefficients from switching edges only.
///
/// The signal is piecewise constant, so each coefficient is a sum over the
/// instants where the level changes. Equal to [`coefficients_direct`] up to
/// rounding, and much cheaper for sparse switching.
pub fn coefficients_edges(
    cycle: &[WaveValues],
    level: Level,
    orders: usize,
) -> Vec<FourierCoefficient> {
    let n = cycle.len();
    if n == 0 {
        return Vec::new();
    }

    let mut edges = Vec::new();
    let mut previous = line_voltage(cycle[n - 1], level);
    for (k, wave) in cycle.iter().enumerate() {
        let y = line_voltage(*wave, level);
        if y != previous {
            edges.push((k as f64 / n as f64, y - previous));
        }
        previous = y;
    }

    (1..=orders)
        .map(|order| {
            let w = TAU * order as f64;
            let mut a = 0.0;
            let mut b = 0.0;
            for &(t, step) in &edges {
                let (sin, cos) = (w * t).sin_cos();
                a -= step * sin;
                b += step * cos;
            }
            let scale = 1.0 / (PI * order as f64);
            FourierCoefficient {
                order,
                cos: a * scale,
                sin: b * scale,
            }
        })
        .collect()
}

/// Fundamental magnitude normalized by [`VOLTAGE_CONVERT_FACTOR`].
pub fn voltage_rate(cycle: &[WaveValues], level: Level) -> f64 {
    coefficients_edges(cycle, level, 1)
        .first()
        .map(|c| c.magnitude() / VOLTAGE_CONVERT_FACTOR)
        .unwrap_or(0.0)
}

/// Magnitude spectrum of a cycle via FFT, bins 0 to `len / 2`.
///
/// Bin `k` is harmonic order `k`, scaled to peak amplitude.
pub fn spectrum_fft(cycle: &[WaveValues], level: Level) -> Vec<f64> {
    let n = cycle.len();
    if n == 0 {
        return Vec::new();
    }
    let mut buffer: Vec<Complex<f64>> = cycle
        .iter()
        .map(|w| Complex::new(line_voltage(*w, level), 0.0))
        .collect();
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buffer);

    let scale = 2.0 / n as f64;
    buffer
        .iter()
        .take(n / 2 + 1)
        .enumerate()
        .map(|(k, c)| {
            if k == 0 {
                c.norm() / n as f64
            } else {
                c.norm() * scale
            }
        })
        .collect()
}

/// Static inputs shared by every cycle synthesized for an analysis.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisContext<'a> {
    /// Control pattern.
    pub pattern: &'a PatternConfig,
    /// Switch-angle tables.
    pub tables: &'a TableLibrary,
    /// Run settings.
    pub settings: &'a SimulationSettings,
}

/// Operating point of a synthesized cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleRequest {
    /// Output frequency in Hz (control and sine frequency).
    pub frequency: f64,
    /// Use the braking sub-pattern.
    pub brake: bool,
    /// Samples per cycle.
    pub samples: usize,
    /// Replaces the pattern amplitude when set.
    pub amplitude: Option<f64>,
}

impl CycleRequest {
    /// Request for the accelerate pattern at `frequency`.
    pub fn new(frequency: f64, samples: usize) -> Self {
        Self {
            frequency,
            brake: false,
            samples,
            amplitude: None,
        }
    }
}

/// Synthesizes one fundamental cycle at a fixed operating point.
///
/// Works on a clone of `state`, so the caller's state is untouched. Samples
/// without an active entry are all-low.
pub fn synthesize_cycle(
    state: &ControlState,
    context: &AnalysisContext<'_>,
    request: &CycleRequest,
) -> EngineResult<Vec<WaveValues>> {
    if !(request.frequency > 0.0) || request.samples == 0 {
        return Err(EngineError::invalid_param(
            "cycle",
            format!(
                "frequency must be positive and samples non-zero, got {} Hz and {} samples",
                request.frequency, request.samples
            ),
        ));
    }

    let mut state = state.clone();
    state.brake = request.brake;
    state.free_run = false;
    state.mascon_off = false;
    state.set_commanded_frequency(request.frequency);
    state.set_control_frequency(request.frequency);
    state.set_sine_frequency(request.frequency);
    state.reset_sine_phase();

    let dt = 1.0 / (request.frequency * request.samples as f64);
    let mut cycle = Vec::with_capacity(request.samples);
    for _ in 0..request.samples {
        let values = calculate_values(
            &mut state,
            context.pattern,
            context.tables,
            context.settings,
        )?;
        let wave = match values {
            Some(mut values) => {
                if let Some(amplitude) = request.amplitude {
                    values.override_amplitude(amplitude, state.control_frequency());
                }
                calculate_phases(&state, &values).values
            }
            None => WaveValues::default(),
        };
        cycle.push(wave);
        state.advance_time(dt);
    }
    Ok(cycle)
}

/// Root search used by [`solve_amplitude`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum SolveMethod {
    /// Bisection between two amplitudes that bracket the target.
    Bisection {
        /// Lower amplitude.
        low: f64,
        /// Upper amplitude.
        high: f64,
    },
    /// Newton iteration from an initial amplitude.
    Newton {
        /// Starting amplitude.
        initial: f64,
    },
}

/// Iteration limits of an amplitude search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolveOptions {
    /// Accepted voltage-rate error.
    pub tolerance: f64,
    /// Iteration budget.
    pub max_iterations: usize,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-4,
            max_iterations: 50,
        }
    }
}

/// Finds the amplitude whose cycle has voltage rate `target_rate`.
///
/// The best estimate is returned with `converged = false` if the budget runs
/// out. Synthesis errors (configuration problems) abort the search.
pub fn solve_amplitude(
    state: &ControlState,
    context: &AnalysisContext<'_>,
    request: &CycleRequest,
    target_rate: f64,
    method: SolveMethod,
    options: SolveOptions,
) -> EngineResult<RootResult> {
    let mut failure: Option<EngineError> = None;
    let residual = |amplitude: f64| -> f64 {
        if failure.is_some() {
            return f64::NAN;
        }
        let trial = CycleRequest {
            amplitude: Some(amplitude),
            ..*request
        };
        match synthesize_cycle(state, context, &trial) {
            Ok(cycle) => voltage_rate(&cycle, context.pattern.level) - target_rate,
            Err(err) => {
                failure = Some(err);
                f64::NAN
            }
        }
    };

    let result = match method {
        SolveMethod::Bisection { low, high } => {
            bisection(residual, low, high, options.tolerance, options.max_iterations)
        }
        SolveMethod::Newton { initial } => newton(
            residual,
            initial,
            NEWTON_STEP,
            options.tolerance,
            options.max_iterations,
        ),
    };

    match failure {
        Some(err) => Err(err),
        None => {
            if !result.converged {
                tracing::warn!(
                    target_rate,
                    amplitude = result.value,
                    residual = result.residual,
                    "amplitude search did not converge"
                );
            }
            Ok(result)
        }
    }
}
