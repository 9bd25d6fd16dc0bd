//! Control pattern document: the static description of an inverter.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::amplitude::{AmplitudeControl, AmplitudeLaw};
use crate::carrier::CarrierControl;
use crate::error::SpecError;
use crate::pulse::PulseMode;

/// Number of output levels of each phase leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Level {
    /// Two-level leg: outputs 0 or 1.
    #[default]
    Two,
    /// Three-level (neutral point clamped) leg: outputs 0, 1 or 2.
    Three,
}

impl Level {
    /// Highest output level of a leg.
    pub fn max_output(&self) -> u8 {
        match self {
            Level::Two => 1,
            Level::Three => 2,
        }
    }

    /// Number of levels as an integer.
    pub fn count(&self) -> u8 {
        self.max_output() + 1
    }
}

impl TryFrom<u8> for Level {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(Level::Two),
            3 => Ok(Level::Three),
            other => Err(format!("level must be 2 or 3, got {}", other)),
        }
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> Self {
        level.count()
    }
}

/// Minimum output frequency floors.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MinimumFrequency {
    /// Floor while accelerating, in Hz.
    #[serde(default)]
    pub accelerate: f64,
    /// Floor while braking, in Hz.
    #[serde(default)]
    pub braking: f64,
}

/// Free-run ramp parameters for one mascon state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JerkParams {
    /// Rate at which the control frequency moves while free-running, in Hz/s.
    pub frequency_change_rate: f64,
    /// Ceiling of the control frequency while free-running, in Hz.
    pub max_control_frequency: f64,
}

impl Default for JerkParams {
    fn default() -> Self {
        Self {
            frequency_change_rate: 60.0,
            max_control_frequency: 200.0,
        }
    }
}

/// Jerk settings for mascon on and mascon off.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JerkSettings {
    /// Parameters while power is commanded.
    #[serde(default)]
    pub on: JerkParams,
    /// Parameters while coasting.
    #[serde(default)]
    pub off: JerkParams,
}

impl JerkSettings {
    /// Selects the parameters for the given mascon state.
    pub fn select(&self, mascon_on: bool) -> &JerkParams {
        if mascon_on {
            &self.on
        } else {
            &self.off
        }
    }
}

/// Operating condition used to filter pulse control entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunCondition {
    /// Control frequency tracks the sine frequency.
    Normal,
    /// Free-running with power commanded.
    FreeRunOn,
    /// Free-running while coasting.
    FreeRunOff,
}

fn default_true() -> bool {
    true
}

/// One entry of a sub-pattern, active above its frequency threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PulseControl {
    /// Lower control-frequency threshold in Hz.
    pub from_frequency: f64,
    /// Entry may be used outside free-run.
    #[serde(default = "default_true")]
    pub enable_normal: bool,
    /// Entry may be used while free-running with power on.
    #[serde(default = "default_true")]
    pub enable_free_run_on: bool,
    /// Entry may be used while free-running with power off.
    #[serde(default = "default_true")]
    pub enable_free_run_off: bool,
    /// Pulse description.
    pub pulse: PulseMode,
    /// Amplitude description.
    pub amplitude: AmplitudeControl,
    /// Carrier description (used by asynchronous modes).
    #[serde(default)]
    pub carrier: CarrierControl,
}

impl PulseControl {
    /// Creates an entry enabled for every condition.
    pub fn new(from_frequency: f64, pulse: PulseMode, amplitude: AmplitudeLaw) -> Self {
        Self {
            from_frequency,
            enable_normal: true,
            enable_free_run_on: true,
            enable_free_run_off: true,
            pulse,
            amplitude: AmplitudeControl::new(amplitude),
            carrier: CarrierControl::default(),
        }
    }

    /// Sets the carrier configuration.
    pub fn with_carrier(mut self, carrier: CarrierControl) -> Self {
        self.carrier = carrier;
        self
    }

    /// Returns true if the entry admits the given condition.
    pub fn is_enabled(&self, condition: RunCondition) -> bool {
        match condition {
            RunCondition::Normal => self.enable_normal,
            RunCondition::FreeRunOn => self.enable_free_run_on,
            RunCondition::FreeRunOff => self.enable_free_run_off,
        }
    }
}

/// Accelerate or braking half of a pattern.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubPattern {
    /// Free-run ramp settings.
    #[serde(default)]
    pub jerk: JerkSettings,
    /// Entries sorted ascending by `from_frequency`.
    pub pulses: Vec<PulseControl>,
}

impl SubPattern {
    /// Finds the active entry for a control frequency.
    ///
    /// The active entry is the last one whose threshold does not exceed the
    /// control frequency and that admits `condition`. Returns the entry index.
    pub fn active(&self, control_frequency: f64, condition: RunCondition) -> Option<usize> {
        let upper = self
            .pulses
            .partition_point(|p| p.from_frequency <= control_frequency);
        self.pulses[..upper]
            .iter()
            .rposition(|p| p.is_enabled(condition))
    }
}

/// Complete control pattern of an inverter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternConfig {
    /// Output level count.
    #[serde(default)]
    pub level: Level,
    /// Output frequency floors.
    #[serde(default)]
    pub minimum_frequency: MinimumFrequency,
    /// Pattern used while accelerating or coasting.
    pub accelerate: SubPattern,
    /// Pattern used while braking.
    pub braking: SubPattern,
}

impl PatternConfig {
    /// Selects the sub-pattern for the brake state.
    pub fn sub_pattern(&self, brake: bool) -> &SubPattern {
        if brake {
            &self.braking
        } else {
            &self.accelerate
        }
    }

    /// Selects the minimum frequency floor for the brake state.
    pub fn minimum(&self, brake: bool) -> f64 {
        if brake {
            self.minimum_frequency.braking
        } else {
            self.minimum_frequency.accelerate
        }
    }

    /// Parses a pattern from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Parses a pattern from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serializes the pattern to a pretty JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Loads a pattern file, choosing the format from the extension.
    pub fn load(path: &Path) -> Result<Self, SpecError> {
        crate::load_document(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pulse::PulseKind;

    fn entry(from: f64) -> PulseControl {
        PulseControl::new(
            from,
            PulseMode::new(PulseKind::Async),
            AmplitudeLaw::Constant { value: 0.5 },
        )
    }

    #[test]
    fn test_active_entry_by_threshold() {
        let sub = SubPattern {
            jerk: JerkSettings::default(),
            pulses: vec![entry(0.0), entry(20.0), entry(40.0)],
        };
        assert_eq!(sub.active(0.0, RunCondition::Normal), Some(0));
        assert_eq!(sub.active(19.9, RunCondition::Normal), Some(0));
        assert_eq!(sub.active(20.0, RunCondition::Normal), Some(1));
        assert_eq!(sub.active(100.0, RunCondition::Normal), Some(2));
    }

    #[test]
    fn test_active_entry_skips_disabled() {
        let mut second = entry(20.0);
        second.enable_free_run_off = false;
        let sub = SubPattern {
            jerk: JerkSettings::default(),
            pulses: vec![entry(0.0), second],
        };
        assert_eq!(sub.active(30.0, RunCondition::FreeRunOff), Some(0));
        assert_eq!(sub.active(30.0, RunCondition::FreeRunOn), Some(1));
    }

    #[test]
    fn test_no_entry_below_first_threshold() {
        let sub = SubPattern {
            jerk: JerkSettings::default(),
            pulses: vec![entry(5.0)],
        };
        assert_eq!(sub.active(1.0, RunCondition::Normal), None);
    }

    #[test]
    fn test_level_serde() {
        assert_eq!(serde_json::to_string(&Level::Three).unwrap(), "3");
        let level: Level = serde_json::from_str("2").unwrap();
        assert_eq!(level, Level::Two);
        assert!(serde_json::from_str::<Level>("4").is_err());
    }
}
