//! Run settings shared by the renderer and the CLI.

use serde::{Deserialize, Serialize};

/// Signal written to the audio output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioSource {
    /// U-V line voltage taken straight from the switching state.
    #[default]
    LineVoltage,
    /// U phase current from the motor model.
    MotorCurrent,
}

impl AudioSource {
    /// Returns the source name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioSource::LineVoltage => "line_voltage",
            AudioSource::MotorCurrent => "motor_current",
        }
    }
}

/// Per-run simulation settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationSettings {
    /// Samples per simulated second.
    pub sample_rate: u32,
    /// Seed of the run PRNG.
    pub seed: u64,
    /// Phase bias added to every leg, in radians.
    pub initial_phase: f64,
    /// Bypass carrier modulation (periodic and random).
    pub use_simple_carrier: bool,
    /// Signal written to audio.
    pub audio_source: AudioSource,
    /// Output gain applied before clipping.
    pub gain: f64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            sample_rate: 192_000,
            seed: 0,
            initial_phase: 0.0,
            use_simple_carrier: false,
            audio_source: AudioSource::LineVoltage,
            gain: 0.5,
        }
    }
}
