//! VVVF Control Pattern Library
//!
//! This crate provides the static configuration of a simulated VVVF traction
//! inverter: control patterns, mascon programs, motor constants and run
//! settings, together with loading and validation.
//!
//! # Overview
//!
//! A [`PatternConfig`] holds two [`SubPattern`]s (accelerate and braking).
//! Each sub-pattern is an ascending list of [`PulseControl`] entries; the entry
//! whose threshold is the highest one not above the current control frequency
//! is active. Every entry describes:
//!
//! - **Pulse mode** - modulation kind, base wave, carrier shape, harmonics
//! - **Amplitude** - constant, curve or table law over control frequency
//! - **Carrier** - constant, moving, periodic or table base plus random offset
//!
//! # Example
//!
//! ```
//! use vvvf_spec::PatternConfig;
//! use vvvf_spec::validation::validate_pattern;
//!
//! let yaml = r#"
//! level: 2
//! accelerate:
//!   pulses:
//!     - from_frequency: 0.0
//!       pulse: { kind: { type: async } }
//!       amplitude: { normal: { type: constant, value: 0.5 } }
//! braking:
//!   pulses:
//!     - from_frequency: 0.0
//!       pulse: { kind: { type: sync, count: 9 } }
//!       amplitude: { normal: { type: constant, value: 0.5 } }
//! "#;
//!
//! let pattern = PatternConfig::from_yaml(yaml).unwrap();
//! assert!(validate_pattern(&pattern).is_ok());
//! ```
//!
//! # Modules
//!
//! - [`error`]: Error and warning types
//! - [`pattern`]: Pattern document and entry lookup
//! - [`pulse`]: Pulse mode types
//! - [`amplitude`]: Amplitude laws
//! - [`carrier`]: Carrier frequency laws
//! - [`program`]: Mascon programs
//! - [`motor`]: Motor parameters
//! - [`settings`]: Run settings
//! - [`validation`]: Validation functions

pub mod amplitude;
pub mod carrier;
pub mod error;
pub mod motor;
pub mod pattern;
pub mod program;
pub mod pulse;
pub mod settings;
pub mod validation;
pub mod value;

use std::path::Path;

use serde::de::DeserializeOwned;

pub use amplitude::{AmplitudeControl, AmplitudeLaw, AmplitudePoint, CurveShape};
pub use carrier::{CarrierBase, CarrierControl, CarrierPoint, PeriodicShape, RandomModulation};
pub use error::{
    ErrorCode, SpecError, ValidationError, ValidationResult, ValidationWarning, WarningCode,
};
pub use motor::MotorParameters;
pub use pattern::{
    JerkParams, JerkSettings, Level, MinimumFrequency, PatternConfig, PulseControl, RunCondition,
    SubPattern,
};
pub use program::{MasconPoint, MasconProgram};
pub use pulse::{
    BaseWave, CarrierWave, DiscreteMode, DiscreteTime, Harmonic, HarmonicWave, PulseDataKey,
    PulseKind, PulseMode,
};
pub use settings::{AudioSource, SimulationSettings};
pub use value::ValueLaw;

/// Loads a JSON or YAML document, choosing the format from the file extension.
pub fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T, SpecError> {
    let text = std::fs::read_to_string(path)?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "json" => Ok(serde_json::from_str(&text)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(&text)?),
        other => Err(SpecError::UnsupportedFormat(other.to_string())),
    }
}
