//! Amplitude (modulation depth) laws.

use serde::{Deserialize, Serialize};

/// Interpolation shape of an amplitude curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveShape {
    /// Straight line between the anchors.
    #[default]
    Linear,
    /// Linear in `1 / amplitude`.
    InverseProportional,
    /// Geometric interpolation.
    Exponential,
    /// Quarter-sine easing.
    Sine,
}

/// A point of an amplitude table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AmplitudePoint {
    /// Control frequency in Hz.
    pub frequency: f64,
    /// Amplitude at this frequency.
    pub amplitude: f64,
}

/// How the reference amplitude depends on control frequency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum AmplitudeLaw {
    /// Fixed amplitude.
    Constant {
        /// Amplitude value.
        value: f64,
    },
    /// Interpolated between two anchors.
    Curve {
        /// Control frequency of the first anchor.
        start_frequency: f64,
        /// Amplitude at the first anchor.
        start_amplitude: f64,
        /// Control frequency of the second anchor.
        end_frequency: f64,
        /// Amplitude at the second anchor.
        end_amplitude: f64,
        /// Interpolation shape.
        #[serde(default)]
        shape: CurveShape,
        /// Amplitudes below this value are forced to zero.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cut_off: Option<f64>,
        /// Upper clamp.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    /// Piecewise table, ascending by frequency.
    Table {
        /// Table points.
        points: Vec<AmplitudePoint>,
        /// Linear interpolation between points instead of a step lookup.
        #[serde(default)]
        interpolate: bool,
    },
}

/// Amplitude configuration of a pulse control entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AmplitudeControl {
    /// Law used while the control frequency tracks the sine frequency.
    pub normal: AmplitudeLaw,
    /// Law used while free-running; falls back to `normal` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_run: Option<AmplitudeLaw>,
}

impl AmplitudeControl {
    /// Creates an amplitude control with a single law.
    pub fn new(normal: AmplitudeLaw) -> Self {
        Self {
            normal,
            free_run: None,
        }
    }

    /// Returns the law to use for the given free-run condition.
    pub fn select(&self, free_run: bool) -> &AmplitudeLaw {
        match (&self.free_run, free_run) {
            (Some(law), true) => law,
            _ => &self.normal,
        }
    }
}
