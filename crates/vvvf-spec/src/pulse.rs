//! Pulse mode types: how one pattern entry turns a reference into switching.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::ValueLaw;

/// Modulation strategy of a pulse control entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum PulseKind {
    /// Asynchronous PWM: the carrier runs at its own frequency.
    Async,
    /// Synchronous PWM: `count` carrier periods per fundamental period.
    Sync {
        /// Carrier periods per fundamental period.
        count: u32,
    },
    /// Current-harmonic-minimization pulses from a precomputed table.
    Chm {
        /// Pulses per half period.
        count: u32,
        /// Table alternative.
        #[serde(default)]
        alternative: u32,
    },
    /// Selective-harmonic-elimination pulses from a precomputed table.
    She {
        /// Pulses per half period.
        count: u32,
        /// Table alternative.
        #[serde(default)]
        alternative: u32,
    },
    /// High-efficiency overmodulation (saw carrier against a trapezoid).
    Ho {
        /// Carrier teeth per half period.
        count: u32,
    },
    /// Single-bit delta-sigma quantization.
    DeltaSigma,
}

impl PulseKind {
    /// Returns the pulse count, if the kind carries one.
    pub fn count(&self) -> Option<u32> {
        match *self {
            PulseKind::Sync { count }
            | PulseKind::Chm { count, .. }
            | PulseKind::She { count, .. }
            | PulseKind::Ho { count } => Some(count),
            PulseKind::Async | PulseKind::DeltaSigma => None,
        }
    }

    /// Returns true for kinds that resolve their output from a switch-angle table.
    pub fn is_tabulated(&self) -> bool {
        matches!(self, PulseKind::Chm { .. } | PulseKind::She { .. })
    }

    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PulseKind::Async => "async",
            PulseKind::Sync { .. } => "sync",
            PulseKind::Chm { .. } => "chm",
            PulseKind::She { .. } => "she",
            PulseKind::Ho { .. } => "ho",
            PulseKind::DeltaSigma => "delta_sigma",
        }
    }
}

/// Reference waveform compared against the carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseWave {
    /// Pure sine.
    #[default]
    Sine,
    /// Inverted sawtooth.
    Saw,
    /// Square.
    Square,
    /// Sine with third-harmonic injection.
    ModifiedSine1,
    /// Flat-topped sine.
    ModifiedSine2,
    /// Sawtooth with flattened extremes.
    ModifiedSaw1,
    /// Space-vector modulation.
    Svm,
    /// Discontinuous PWM, 30 degree clamps.
    Dpwm30,
    /// Discontinuous PWM, 60 degree clamps centered on the peaks.
    Dpwm60c,
    /// Discontinuous PWM, 60 degree clamps at the positive rail only.
    Dpwm60p,
    /// Discontinuous PWM, 60 degree clamps at the negative rail only.
    Dpwm60n,
    /// Discontinuous PWM, 120 degree clamps at the positive rail.
    Dpwm120p,
    /// Discontinuous PWM, 120 degree clamps at the negative rail.
    Dpwm120n,
}

/// Carrier shape used by comparison-based modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarrierWave {
    /// Symmetric triangle.
    #[default]
    Triangle,
    /// Rising sawtooth.
    SawUp,
    /// Falling sawtooth.
    SawDown,
    /// Sine carrier.
    Sine,
}

/// Rounding applied when quantizing the phase angle onto a discrete grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscreteMode {
    /// Round to the nearest grid point.
    #[default]
    Round,
    /// Round down.
    Floor,
    /// Round up.
    Ceil,
}

/// Discrete-time quantization of the reference phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiscreteTime {
    /// Number of grid steps per fundamental period.
    pub steps: u32,
    /// Rounding mode.
    #[serde(default)]
    pub mode: DiscreteMode,
}

/// Waveform of an injected harmonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarmonicWave {
    /// Sine.
    #[default]
    Sine,
    /// Sawtooth.
    Saw,
    /// Square.
    Square,
}

/// A harmonic component added to the scaled reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Harmonic {
    /// Harmonic waveform.
    #[serde(default)]
    pub wave: HarmonicWave,
    /// Multiple of the fundamental.
    pub order: f64,
    /// Phase of the harmonic in radians.
    #[serde(default)]
    pub initial_phase: f64,
    /// Harmonic amplitude (may follow control frequency).
    pub amplitude: ValueLaw,
    /// When set, `amplitude` is resolved against control frequency; otherwise its
    /// value at zero frequency is used.
    #[serde(default)]
    pub proportional_to_frequency: bool,
    /// When set, the harmonic amplitude is multiplied by the fundamental amplitude.
    #[serde(default)]
    pub proportional_to_amplitude: bool,
}

/// Keys of the per-entry pulse data map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PulseDataKey {
    /// Trapezoid rise width in radians (HO mode).
    PulseWidth,
    /// Phase shift of the synchronous carrier in radians.
    CarrierPhase,
}

/// Complete pulse description of one pattern entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PulseMode {
    /// Modulation strategy.
    pub kind: PulseKind,
    /// Reference waveform.
    #[serde(default)]
    pub base_wave: BaseWave,
    /// Carrier shape.
    #[serde(default)]
    pub carrier_wave: CarrierWave,
    /// Optional phase quantization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discrete_time: Option<DiscreteTime>,
    /// Injected harmonics.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub harmonics: Vec<Harmonic>,
    /// Additional per-kind parameters.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub pulse_data: BTreeMap<PulseDataKey, ValueLaw>,
}

impl PulseMode {
    /// Creates a pulse mode with the given kind and defaults for everything else.
    pub fn new(kind: PulseKind) -> Self {
        Self {
            kind,
            base_wave: BaseWave::default(),
            carrier_wave: CarrierWave::default(),
            discrete_time: None,
            harmonics: Vec::new(),
            pulse_data: BTreeMap::new(),
        }
    }

    /// Sets the base wave.
    pub fn with_base_wave(mut self, base_wave: BaseWave) -> Self {
        self.base_wave = base_wave;
        self
    }
}
