//! Error types for pattern loading and validation.

use thiserror::Error;

/// Error codes for pattern validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Pattern errors (E101-E109)
    /// E101: A sub-pattern declares no pulse controls
    EmptyPulseList,
    /// E102: Pulse control thresholds are not ascending
    UnsortedThresholds,
    /// E103: A frequency or frequency threshold is negative or not finite
    InvalidFrequency,
    /// E104: A jerk rate is negative or not finite
    InvalidJerk,
    /// E105: Pulse count is zero for a kind that requires one
    InvalidPulseCount,
    /// E106: Discrete time step count is zero
    InvalidDiscreteSteps,
    /// E107: Harmonic order is not positive
    InvalidHarmonic,
    /// E108: Carrier configuration is incomplete or out of range
    InvalidCarrier,
    /// E109: Amplitude law is malformed
    InvalidAmplitude,

    // Program errors (E120-E122)
    /// E120: Mascon program is empty
    EmptyProgram,
    /// E121: Mascon point rate is negative or not finite
    InvalidRate,
    /// E122: Mascon point duration is not finite
    InvalidDuration,

    // Motor errors (E130)
    /// E130: Motor parameter is out of physical range
    InvalidMotorParameter,
}

impl ErrorCode {
    /// Returns the error code string (e.g., "E101").
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::EmptyPulseList => "E101",
            ErrorCode::UnsortedThresholds => "E102",
            ErrorCode::InvalidFrequency => "E103",
            ErrorCode::InvalidJerk => "E104",
            ErrorCode::InvalidPulseCount => "E105",
            ErrorCode::InvalidDiscreteSteps => "E106",
            ErrorCode::InvalidHarmonic => "E107",
            ErrorCode::InvalidCarrier => "E108",
            ErrorCode::InvalidAmplitude => "E109",
            ErrorCode::EmptyProgram => "E120",
            ErrorCode::InvalidRate => "E121",
            ErrorCode::InvalidDuration => "E122",
            ErrorCode::InvalidMotorParameter => "E130",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Warning codes for pattern validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningCode {
    /// W101: Delta-sigma pulse kind is not produced by the waveform generator
    DeltaSigmaUnwired,
    /// W102: Amplitude may exceed the linear modulation range
    AmplitudeOverRange,
    /// W103: Mascon program contains zero-length points that will be skipped
    ZeroDurationPoint,
    /// W104: Pulse control can never become active
    UnreachablePulse,
}

impl WarningCode {
    /// Returns the warning code string (e.g., "W101").
    pub fn code(&self) -> &'static str {
        match self {
            WarningCode::DeltaSigmaUnwired => "W101",
            WarningCode::AmplitudeOverRange => "W102",
            WarningCode::ZeroDurationPoint => "W103",
            WarningCode::UnreachablePulse => "W104",
        }
    }
}

impl std::fmt::Display for WarningCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A validation error with code, message, and optional field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The error code.
    pub code: ErrorCode,
    /// Human-readable error message.
    pub message: String,
    /// Path to the problematic field (e.g., "accelerate.pulses\[2\].carrier").
    pub path: Option<String>,
}

impl ValidationError {
    /// Creates a new validation error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
        }
    }

    /// Creates a new validation error with a field path.
    pub fn with_path(code: ErrorCode, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: Some(path.into()),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref path) = self.path {
            write!(f, "{}: {} (at {})", self.code, self.message, path)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

/// A validation warning with code, message, and optional field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// The warning code.
    pub code: WarningCode,
    /// Human-readable warning message.
    pub message: String,
    /// Path to the problematic field.
    pub path: Option<String>,
}

impl ValidationWarning {
    /// Creates a new validation warning with a field path.
    pub fn with_path(
        code: WarningCode,
        message: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            path: Some(path.into()),
        }
    }
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref path) = self.path {
            write!(f, "{}: {} (at {})", self.code, self.message, path)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

/// Top-level error type for loading configuration documents.
#[derive(Debug, Error)]
pub enum SpecError {
    /// Validation failed with one or more errors.
    #[error("validation failed with {0} error(s)")]
    ValidationFailed(usize),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// The file extension does not name a supported format.
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of validation.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether validation passed (no errors).
    pub ok: bool,
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of validation warnings.
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    /// Creates a successful validation result.
    pub fn success() -> Self {
        Self {
            ok: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Adds an error to the result.
    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
        self.ok = false;
    }

    /// Adds a warning to the result.
    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Merges another result into this one.
    pub fn merge(&mut self, other: ValidationResult) {
        self.ok &= other.ok;
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Returns true if there are no errors.
    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// Converts to a Result, returning Err if there are errors.
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, Vec<ValidationError>> {
        if self.ok {
            Ok(self.warnings)
        } else {
            Err(self.errors)
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_with_path() {
        let err = ValidationError::with_path(
            ErrorCode::UnsortedThresholds,
            "thresholds must ascend",
            "accelerate.pulses[1]",
        );
        assert_eq!(
            err.to_string(),
            "E102: thresholds must ascend (at accelerate.pulses[1])"
        );
    }

    #[test]
    fn test_result_merge_propagates_failure() {
        let mut a = ValidationResult::success();
        let mut b = ValidationResult::success();
        b.add_error(ValidationError::new(ErrorCode::EmptyProgram, "empty"));
        a.merge(b);
        assert!(!a.is_ok());
        assert_eq!(a.errors.len(), 1);
    }
}
