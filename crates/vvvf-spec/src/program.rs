//! Mascon programs: scripted throttle sequences for batch rendering.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SpecError;

/// One step of a mascon program.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MasconPoint {
    /// Length of the step in seconds.
    pub duration: f64,
    /// Frequency ramp in Hz/s while power is commanded.
    #[serde(default)]
    pub rate: f64,
    /// Braking instead of accelerating.
    #[serde(default)]
    pub brake: bool,
    /// Power commanded.
    #[serde(default)]
    pub mascon_on: bool,
}

impl MasconPoint {
    /// Powered acceleration step.
    pub fn accelerate(duration: f64, rate: f64) -> Self {
        Self {
            duration,
            rate,
            brake: false,
            mascon_on: true,
        }
    }

    /// Powered braking step.
    pub fn brake(duration: f64, rate: f64) -> Self {
        Self {
            duration,
            rate,
            brake: true,
            mascon_on: true,
        }
    }

    /// Coasting step.
    pub fn coast(duration: f64) -> Self {
        Self {
            duration,
            rate: 0.0,
            brake: false,
            mascon_on: false,
        }
    }
}

/// An ordered mascon program.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MasconProgram {
    /// Frequency at time zero in Hz.
    #[serde(default)]
    pub initial_frequency: f64,
    /// Program steps in order.
    pub points: Vec<MasconPoint>,
}

impl MasconProgram {
    /// Total duration of every positive-length step.
    pub fn duration(&self) -> f64 {
        self.points
            .iter()
            .filter(|p| p.duration > 0.0)
            .map(|p| p.duration)
            .sum()
    }

    /// Parses a program from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Loads a program file, choosing the format from the extension.
    pub fn load(path: &Path) -> Result<Self, SpecError> {
        crate::load_document(path)
    }
}
