//! Per-sample pipeline.
//!
//! Every sample runs the same steps in the same order, whether the caller is
//! stepping interactively or rendering a whole program:
//!
//! 1. the control state machine advances (driver command or timeline);
//! 2. the active pattern entry is compiled into [`PwmCalculateValues`];
//! 3. the three legs are synthesized;
//! 4. the motor model, if any, integrates one sample;
//! 5. the audio value is derived and the generators advance by `dt`.

use serde::Serialize;
use vvvf_spec::{AudioSource, MotorParameters, PatternConfig, SimulationSettings};

use crate::control::{advance, Command};
use crate::custom_table::TableLibrary;
use crate::error::{EngineError, EngineResult};
use crate::fourier::line_voltage;
use crate::motor::{InductionMotor, MotorState};
use crate::state::ControlState;
use crate::timeline::Timeline;
use crate::values::{calculate_values, PwmCalculateValues};
use crate::waveform::{calculate_phases, PhaseFault, PhaseOutput, WaveValues};

/// Phase current mapped to full-scale audio, in A.
pub const CURRENT_FULL_SCALE: f64 = 100.0;

/// Result of one sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SampleOutput {
    /// Leg levels.
    pub wave: WaveValues,
    /// False if a leg fell back to the lowest level.
    pub ok: bool,
    /// Why a leg fell back.
    #[serde(skip)]
    pub fault: Option<PhaseFault>,
    /// Audio value in [-1, 1].
    pub audio: f64,
    /// Control frequency used for the sample, in Hz.
    pub control_frequency: f64,
    /// Timeline segment, when stepping a timeline.
    pub segment: Option<usize>,
}

/// Drives a pattern sample by sample.
#[derive(Debug, Clone)]
pub struct Simulator<'a> {
    pattern: &'a PatternConfig,
    tables: &'a TableLibrary,
    settings: SimulationSettings,
    motor: Option<InductionMotor>,
    state: ControlState,
    motor_state: MotorState,
    dt: f64,
    soft_failures: usize,
}

impl<'a> Simulator<'a> {
    /// Creates a simulator at standstill.
    ///
    /// A default motor is installed when the audio source is the motor current.
    pub fn new(
        pattern: &'a PatternConfig,
        tables: &'a TableLibrary,
        settings: SimulationSettings,
    ) -> EngineResult<Self> {
        if settings.sample_rate == 0 {
            return Err(EngineError::invalid_param(
                "sample_rate",
                "must be greater than zero",
            ));
        }
        if !settings.gain.is_finite() {
            return Err(EngineError::invalid_param("gain", "must be finite"));
        }
        if !settings.initial_phase.is_finite() {
            return Err(EngineError::invalid_param("initial_phase", "must be finite"));
        }

        let motor = match settings.audio_source {
            AudioSource::MotorCurrent => Some(InductionMotor::new(MotorParameters::default())),
            AudioSource::LineVoltage => None,
        };

        Ok(Self {
            pattern,
            tables,
            dt: 1.0 / settings.sample_rate as f64,
            state: ControlState::new(settings.seed),
            settings,
            motor,
            motor_state: MotorState::default(),
            soft_failures: 0,
        })
    }

    /// Installs a motor model.
    pub fn with_motor(mut self, params: MotorParameters) -> Self {
        self.motor = Some(InductionMotor::new(params));
        self
    }

    /// Sample period in seconds.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Run settings.
    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    /// Control state.
    pub fn state(&self) -> &ControlState {
        &self.state
    }

    /// Mutable control state, for seeding a run at a given operating point.
    pub fn state_mut(&mut self) -> &mut ControlState {
        &mut self.state
    }

    /// Motor state; stays at rest without a motor.
    pub fn motor_state(&self) -> &MotorState {
        &self.motor_state
    }

    /// Samples with at least one leg forced low so far.
    pub fn soft_failures(&self) -> usize {
        self.soft_failures
    }

    /// Advances one sample under a driver command.
    pub fn step(&mut self, command: &Command) -> EngineResult<SampleOutput> {
        let jerk = self.pattern.sub_pattern(command.brake).jerk;
        advance(&mut self.state, command, &jerk, self.dt);
        self.synthesize(None)
    }

    /// Advances one sample of a timeline at time `t`.
    ///
    /// Returns `None` once `t` is past the end of the program.
    pub fn step_timeline(
        &mut self,
        timeline: &Timeline,
        t: f64,
    ) -> EngineResult<Option<SampleOutput>> {
        match timeline.step(&mut self.state, self.pattern, t, self.dt) {
            Some(segment) => self.synthesize(Some(segment)).map(Some),
            None => Ok(None),
        }
    }

    fn synthesize(&mut self, segment: Option<usize>) -> EngineResult<SampleOutput> {
        let values: Option<PwmCalculateValues<'a>> =
            calculate_values(&mut self.state, self.pattern, self.tables, &self.settings)?;
        let output = match &values {
            Some(values) => calculate_phases(&self.state, values),
            None => PhaseOutput {
                values: WaveValues::default(),
                ok: true,
                fault: None,
            },
        };

        if !output.ok {
            if self.soft_failures == 0 {
                tracing::warn!(
                    fault = ?output.fault,
                    control_frequency = self.state.control_frequency(),
                    time = self.state.generation_time,
                    "leg forced low"
                );
            }
            self.soft_failures += 1;
        }

        let level = self.pattern.level;
        if let Some(motor) = &self.motor {
            let angle = self.motor_state.field_angle;
            self.motor_state = motor.step(&self.motor_state, output.values, level, angle, self.dt);
        }

        let raw = match self.settings.audio_source {
            AudioSource::LineVoltage => line_voltage(output.values, level),
            AudioSource::MotorCurrent => self.motor_state.i_u / CURRENT_FULL_SCALE,
        };
        let audio = if raw.is_finite() {
            (raw * self.settings.gain).clamp(-1.0, 1.0)
        } else {
            0.0
        };

        let sample = SampleOutput {
            wave: output.values,
            ok: output.ok,
            fault: output.fault,
            audio,
            control_frequency: self.state.control_frequency(),
            segment,
        };
        self.state.advance_time(self.dt);
        Ok(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vvvf_spec::{AmplitudeLaw, PulseControl, PulseKind, PulseMode, SubPattern};

    fn pattern(kind: PulseKind) -> PatternConfig {
        let entry = PulseControl::new(
            0.0,
            PulseMode::new(kind),
            AmplitudeLaw::Constant { value: 0.8 },
        );
        PatternConfig {
            level: Default::default(),
            minimum_frequency: Default::default(),
            accelerate: SubPattern {
                jerk: Default::default(),
                pulses: vec![entry.clone()],
            },
            braking: SubPattern {
                jerk: Default::default(),
                pulses: vec![entry],
            },
        }
    }

    fn settings() -> SimulationSettings {
        SimulationSettings {
            sample_rate: 48_000,
            ..SimulationSettings::default()
        }
    }

    #[test]
    fn test_rejects_zero_sample_rate() {
        let pattern = pattern(PulseKind::Async);
        let tables = TableLibrary::new();
        let settings = SimulationSettings {
            sample_rate: 0,
            ..SimulationSettings::default()
        };
        let err = Simulator::new(&pattern, &tables, settings).unwrap_err();
        assert_eq!(err.code(), "ENGINE_002");
    }

    #[test]
    fn test_accelerating_produces_switching() {
        let pattern = pattern(PulseKind::Async);
        let tables = TableLibrary::new();
        let mut sim = Simulator::new(&pattern, &tables, settings()).unwrap();

        let mut levels_seen = [false; 2];
        for _ in 0..4800 {
            let sample = sim.step(&Command::accelerate(60.0)).unwrap();
            assert!(sample.ok);
            assert!(sample.audio.abs() <= 1.0);
            levels_seen[sample.wave.u as usize] = true;
        }
        assert!(levels_seen[0] && levels_seen[1]);
        assert!((sim.state().control_frequency() - 6.0).abs() < 1e-6);
        assert!((sim.state().generation_time - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_line_voltage_audio_uses_gain() {
        let pattern = pattern(PulseKind::Async);
        let tables = TableLibrary::new();
        let mut sim = Simulator::new(&pattern, &tables, settings()).unwrap();
        for _ in 0..4800 {
            let sample = sim.step(&Command::accelerate(60.0)).unwrap();
            let expected = sample.wave.line_uv() as f64 * 0.5;
            assert!((sample.audio - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_missing_table_counts_soft_failures() {
        let pattern = pattern(PulseKind::Chm {
            count: 5,
            alternative: 0,
        });
        let tables = TableLibrary::new();
        let mut sim = Simulator::new(&pattern, &tables, settings()).unwrap();
        for _ in 0..10 {
            let sample = sim.step(&Command::accelerate(60.0)).unwrap();
            assert!(!sample.ok);
            assert_eq!(sample.wave, WaveValues::default());
            assert!(matches!(sample.fault, Some(PhaseFault::MissingTable { .. })));
        }
        assert_eq!(sim.soft_failures(), 10);
    }

    #[test]
    fn test_motor_current_source_installs_motor() {
        let pattern = pattern(PulseKind::Async);
        let tables = TableLibrary::new();
        let settings = SimulationSettings {
            audio_source: AudioSource::MotorCurrent,
            ..settings()
        };
        let mut sim = Simulator::new(&pattern, &tables, settings).unwrap();
        for _ in 0..4800 {
            let sample = sim.step(&Command::accelerate(60.0)).unwrap();
            assert!(sample.audio.is_finite());
        }
        assert!(sim.motor_state().flux != 0.0);
    }

    #[test]
    fn test_coasting_to_zero_is_silent() {
        let pattern = pattern(PulseKind::Async);
        let tables = TableLibrary::new();
        let mut sim = Simulator::new(&pattern, &tables, settings()).unwrap();
        for _ in 0..480 {
            sim.step(&Command::accelerate(60.0)).unwrap();
        }
        // 0.6 Hz decays at 60 Hz/s within 10 ms
        for _ in 0..960 {
            sim.step(&Command::coast(false)).unwrap();
        }
        let sample = sim.step(&Command::coast(false)).unwrap();
        assert_eq!(sample.wave, WaveValues::default());
        assert_eq!(sample.audio, 0.0);
        assert_eq!(sample.control_frequency, 0.0);
    }
}
