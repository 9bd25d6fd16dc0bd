//! Induction motor parameters.

use serde::{Deserialize, Serialize};

/// Electrical and mechanical constants of a squirrel-cage induction motor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MotorParameters {
    /// Stator resistance in ohms.
    pub rs: f64,
    /// Rotor resistance in ohms.
    pub rr: f64,
    /// Stator inductance in henries.
    pub ls: f64,
    /// Rotor inductance in henries.
    pub lr: f64,
    /// Mutual inductance in henries.
    pub lm: f64,
    /// Pole pairs.
    pub pole_pairs: f64,
    /// Rotor inertia in kg m^2.
    pub inertia: f64,
    /// Viscous damping in N m s.
    pub damping: f64,
    /// Net torque below which a stationary rotor does not start, in N m.
    pub static_friction: f64,
    /// Load torque in N m.
    pub load_torque: f64,
    /// DC link voltage in volts.
    pub supply_voltage: f64,
}

impl MotorParameters {
    /// Leakage factor `1 - Lm^2 / (Ls Lr)`.
    pub fn leakage_factor(&self) -> f64 {
        1.0 - self.lm * self.lm / (self.ls * self.lr)
    }

    /// Rotor time constant `Lr / Rr`.
    pub fn rotor_time_constant(&self) -> f64 {
        self.lr / self.rr
    }
}

impl Default for MotorParameters {
    fn default() -> Self {
        Self {
            rs: 1.898,
            rr: 1.45,
            ls: 0.196,
            lr: 0.196,
            lm: 0.187,
            pole_pairs: 2.0,
            inertia: 1.0,
            damping: 0.5,
            static_friction: 50.0,
            load_torque: 0.0,
            supply_voltage: 1500.0,
        }
    }
}
