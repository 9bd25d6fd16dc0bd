//! Carrier frequency laws for asynchronous modulation.

use serde::{Deserialize, Serialize};

use crate::value::ValueLaw;

/// Shape of a periodic carrier sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodicShape {
    /// Sine sweep.
    #[default]
    Sine,
    /// Triangle sweep.
    Triangle,
    /// Alternate between the extremes.
    Square,
    /// Rise from lowest to highest, then restart.
    SawUp,
    /// Fall from highest to lowest, then restart.
    SawDown,
}

/// A point of a carrier table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CarrierPoint {
    /// Control frequency threshold in Hz.
    pub from_frequency: f64,
    /// Carrier frequency in Hz.
    pub carrier: f64,
}

/// Base carrier frequency source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum CarrierBase {
    /// Fixed carrier frequency.
    Constant {
        /// Carrier frequency in Hz.
        frequency: f64,
    },
    /// Carrier interpolated over control frequency.
    Moving {
        /// Control frequency of the first anchor.
        start_frequency: f64,
        /// Carrier at the first anchor.
        start_carrier: f64,
        /// Control frequency of the second anchor.
        end_frequency: f64,
        /// Carrier at the second anchor.
        end_carrier: f64,
    },
    /// Carrier swept periodically (vibrato).
    Periodic {
        /// Lowest carrier frequency in Hz.
        lowest: ValueLaw,
        /// Highest carrier frequency in Hz.
        highest: ValueLaw,
        /// Sweep period in seconds.
        interval: ValueLaw,
        /// Sweep shape.
        #[serde(default)]
        shape: PeriodicShape,
    },
    /// Step lookup on control frequency.
    Table {
        /// Table points, ascending by threshold.
        points: Vec<CarrierPoint>,
    },
}

/// Random carrier offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RandomModulation {
    /// Total width of the offset distribution in Hz; zero disables randomization.
    pub range: ValueLaw,
    /// Hold time of each drawn offset in seconds.
    pub interval: ValueLaw,
}

/// Carrier configuration of a pulse control entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CarrierControl {
    /// Base carrier frequency.
    pub base: CarrierBase,
    /// Optional random offset added to the base.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random: Option<RandomModulation>,
}

impl CarrierControl {
    /// Creates a constant carrier without randomization.
    pub fn constant(frequency: f64) -> Self {
        Self {
            base: CarrierBase::Constant { frequency },
            random: None,
        }
    }
}

impl Default for CarrierControl {
    fn default() -> Self {
        Self::constant(1000.0)
    }
}
