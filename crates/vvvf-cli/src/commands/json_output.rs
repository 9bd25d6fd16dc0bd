//! JSON output types for machine-readable CLI output.
//!
//! Every command accepting `--json` prints exactly one of these documents to
//! stdout.

use serde::Serialize;
use vvvf_engine::fourier::FourierCoefficient;
use vvvf_engine::{RenderOutput, RootResult};
use vvvf_spec::{ValidationError, ValidationResult, ValidationWarning};

/// Error codes for CLI operations.
///
/// These codes are stable. Validation failures pass through their `E1xx`
/// codes instead.
pub mod error_codes {
    /// A document could not be read or parsed
    pub const LOAD: &str = "CLI_001";
    /// A switch-angle table could not be decoded
    pub const TABLE: &str = "CLI_002";
    /// The engine rejected its input
    pub const ENGINE: &str = "CLI_003";
    /// The output file could not be written
    pub const OUTPUT: &str = "CLI_004";
    /// The render was interrupted before completion
    pub const CANCELLED: &str = "CLI_005";
}

/// A structured error in JSON output.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct JsonError {
    /// Stable error code (e.g. "CLI_001", "E101").
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Path to the problematic field, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl JsonError {
    /// Creates an error with code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            path: None,
        }
    }
}

impl From<&ValidationError> for JsonError {
    fn from(error: &ValidationError) -> Self {
        Self {
            code: error.code.code().to_string(),
            message: error.message.clone(),
            path: error.path.clone(),
        }
    }
}

/// A structured warning in JSON output.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct JsonWarning {
    /// Stable warning code (e.g. "W101").
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Path to the problematic field, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl From<&ValidationWarning> for JsonWarning {
    fn from(warning: &ValidationWarning) -> Self {
        Self {
            code: warning.code.code().to_string(),
            message: warning.message.clone(),
            path: warning.path.clone(),
        }
    }
}

/// Validation report of one document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    /// Document kind: `pattern`, `program` or `motor`.
    pub kind: &'static str,
    /// File path.
    pub path: String,
    /// Whether the document loaded and validated without errors.
    pub ok: bool,
    /// Errors.
    pub errors: Vec<JsonError>,
    /// Warnings.
    pub warnings: Vec<JsonWarning>,
}

impl DocumentReport {
    /// Report of a document that validated.
    pub fn from_validation(kind: &'static str, path: &str, result: &ValidationResult) -> Self {
        Self {
            kind,
            path: path.to_string(),
            ok: result.is_ok(),
            errors: result.errors.iter().map(JsonError::from).collect(),
            warnings: result.warnings.iter().map(JsonWarning::from).collect(),
        }
    }

    /// Report of a document that failed to load.
    pub fn load_failure(kind: &'static str, path: &str, message: String) -> Self {
        Self {
            kind,
            path: path.to_string(),
            ok: false,
            errors: vec![JsonError::new(error_codes::LOAD, message)],
            warnings: Vec::new(),
        }
    }
}

/// Output of `validate --json`.
#[derive(Debug, Clone, Serialize)]
pub struct ValidateOutput {
    /// Whether every document is valid.
    pub ok: bool,
    /// Per-document reports.
    pub documents: Vec<DocumentReport>,
}

/// Output of `render --json`.
#[derive(Debug, Clone, Serialize)]
pub struct RenderReport {
    /// Whether the WAV file was written.
    pub ok: bool,
    /// Output path.
    pub output: String,
    /// Number of samples written.
    pub num_samples: usize,
    /// Render summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render: Option<RenderOutput>,
    /// Errors.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<JsonError>,
}

/// One harmonic line of an analysis.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct HarmonicLine {
    /// Harmonic order.
    pub order: usize,
    /// Peak magnitude in per-unit of the DC link.
    pub magnitude: f64,
    /// Magnitude relative to the fundamental.
    pub relative: f64,
    /// Coefficients.
    pub coefficient: FourierCoefficient,
}

/// Output of `analyze --json`.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeOutput {
    /// Output frequency in Hz.
    pub frequency: f64,
    /// Braking sub-pattern analyzed.
    pub brake: bool,
    /// Samples per cycle.
    pub samples: usize,
    /// Fundamental voltage rate (1.0 at six-step).
    pub voltage_rate: f64,
    /// Total harmonic distortion over the listed orders.
    pub thd: f64,
    /// Harmonic lines.
    pub harmonics: Vec<HarmonicLine>,
    /// FFT magnitude spectrum, if requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spectrum: Option<Vec<f64>>,
}

/// Output of `solve --json`.
#[derive(Debug, Clone, Serialize)]
pub struct SolveOutput {
    /// Output frequency in Hz.
    pub frequency: f64,
    /// Requested voltage rate.
    pub target_rate: f64,
    /// Search result; `value` is the amplitude.
    pub result: RootResult,
}
