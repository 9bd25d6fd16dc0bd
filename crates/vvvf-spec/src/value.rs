//! Scalar values that may follow the control frequency.

use serde::{Deserialize, Serialize};

/// A numeric parameter that is either fixed or interpolated over control frequency.
///
/// Serialized as a bare number for the constant case:
///
/// ```
/// use vvvf_spec::ValueLaw;
///
/// let fixed: ValueLaw = serde_json::from_str("1000.0").unwrap();
/// assert_eq!(fixed.resolve(42.0), 1000.0);
///
/// let moving: ValueLaw = serde_json::from_str(
///     r#"{"start_frequency": 0.0, "start": 200.0, "end_frequency": 10.0, "end": 400.0}"#,
/// ).unwrap();
/// assert_eq!(moving.resolve(5.0), 300.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueLaw {
    /// Fixed value.
    Const(f64),
    /// Linear interpolation between two control-frequency anchors, held outside them.
    Moving {
        /// Control frequency (Hz) at which `start` applies.
        start_frequency: f64,
        /// Value at `start_frequency`.
        start: f64,
        /// Control frequency (Hz) at which `end` applies.
        end_frequency: f64,
        /// Value at `end_frequency`.
        end: f64,
    },
}

impl ValueLaw {
    /// Resolves the value at the given control frequency.
    pub fn resolve(&self, control_frequency: f64) -> f64 {
        match *self {
            ValueLaw::Const(value) => value,
            ValueLaw::Moving {
                start_frequency,
                start,
                end_frequency,
                end,
            } => {
                let span = end_frequency - start_frequency;
                if span.abs() < f64::EPSILON {
                    return if control_frequency < start_frequency {
                        start
                    } else {
                        end
                    };
                }
                let t = ((control_frequency - start_frequency) / span).clamp(0.0, 1.0);
                start + (end - start) * t
            }
        }
    }

    /// Returns true if every value this law can produce is finite.
    pub fn is_finite(&self) -> bool {
        match *self {
            ValueLaw::Const(value) => value.is_finite(),
            ValueLaw::Moving {
                start_frequency,
                start,
                end_frequency,
                end,
            } => {
                start_frequency.is_finite()
                    && start.is_finite()
                    && end_frequency.is_finite()
                    && end.is_finite()
            }
        }
    }

    /// Smallest value the law can produce.
    pub fn min_value(&self) -> f64 {
        match *self {
            ValueLaw::Const(value) => value,
            ValueLaw::Moving { start, end, .. } => start.min(end),
        }
    }
}

impl Default for ValueLaw {
    fn default() -> Self {
        ValueLaw::Const(0.0)
    }
}

impl From<f64> for ValueLaw {
    fn from(value: f64) -> Self {
        ValueLaw::Const(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moving_value_holds_outside_range() {
        let law = ValueLaw::Moving {
            start_frequency: 10.0,
            start: 1.0,
            end_frequency: 20.0,
            end: 3.0,
        };
        assert_eq!(law.resolve(0.0), 1.0);
        assert_eq!(law.resolve(15.0), 2.0);
        assert_eq!(law.resolve(99.0), 3.0);
    }

    #[test]
    fn test_degenerate_span_steps() {
        let law = ValueLaw::Moving {
            start_frequency: 10.0,
            start: 1.0,
            end_frequency: 10.0,
            end: 3.0,
        };
        assert_eq!(law.resolve(9.0), 1.0);
        assert_eq!(law.resolve(10.0), 3.0);
    }
}
