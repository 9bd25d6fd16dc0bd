//! Induction motor model.
//!
//! A d-q model in the rotor-flux frame, integrated with forward Euler once per
//! sample. [`InductionMotor::step`] transforms with the electrical angle it is
//! given. For a rotor-flux-oriented frame that is the field angle: the rotor
//! electrical angle plus the integrated slip, kept in
//! [`MotorState::field_angle`].

use std::f64::consts::TAU;

use serde::Serialize;
use vvvf_spec::{Level, MotorParameters};

use crate::waveform::WaveValues;

const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// Electrical and mechanical state of the motor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MotorState {
    /// d-axis (excitation) stator current in A.
    pub i_d: f64,
    /// q-axis (torque) stator current in A.
    pub i_q: f64,
    /// d-axis stator voltage in V.
    pub v_d: f64,
    /// q-axis stator voltage in V.
    pub v_q: f64,
    /// Rotor flux in Wb.
    pub flux: f64,
    /// Slip angular speed in rad/s.
    pub slip_speed: f64,
    /// Mechanical rotor speed in rad/s.
    pub rotor_speed: f64,
    /// Field angle (rotor electrical angle plus integrated slip) in [0, 2π).
    pub field_angle: f64,
    /// Rotor electrical angle (pole pairs times mechanical angle) in [0, 2π).
    pub rotor_electrical_angle: f64,
    /// Mechanical rotor angle in [0, 2π).
    pub rotor_angle: f64,
    /// Electromagnetic torque in N m.
    pub torque: f64,
    /// Change of `i_d` in the previous step.
    pub delta_i_d: f64,
    /// Change of `i_q` in the previous step.
    pub delta_i_q: f64,
    /// U phase current in A.
    pub i_u: f64,
    /// V phase current in A.
    pub i_v: f64,
    /// W phase current in A.
    pub i_w: f64,
}

/// Squirrel-cage induction motor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InductionMotor {
    params: MotorParameters,
}

impl InductionMotor {
    /// Creates a motor from its parameters.
    pub fn new(params: MotorParameters) -> Self {
        Self { params }
    }

    /// Motor parameters.
    pub fn params(&self) -> &MotorParameters {
        &self.params
    }

    /// Phase voltages for a switching state, common mode removed.
    pub fn phase_voltages(&self, wave: WaveValues, level: Level) -> [f64; 3] {
        let vdc = self.params.supply_voltage;
        let pole = |l: u8| match level {
            Level::Two => (l as f64 - 0.5) * vdc,
            Level::Three => (l as f64 - 1.0) * vdc / 2.0,
        };
        let [a, b, c] = wave.as_array().map(pole);
        let common = (a + b + c) / 3.0;
        [a - common, b - common, c - common]
    }

    /// Advances the motor by `dt` seconds under a switching state.
    ///
    /// `electrical_angle` is the angle of the d-q frame used for both the
    /// voltage and the current transform.
    pub fn step(
        &self,
        state: &MotorState,
        wave: WaveValues,
        level: Level,
        electrical_angle: f64,
        dt: f64,
    ) -> MotorState {
        let p = &self.params;
        let mut next = *state;

        let [va, vb, vc] = self.phase_voltages(wave, level);
        let alpha = (2.0 / 3.0) * (va - 0.5 * vb - 0.5 * vc);
        let beta = (vb - vc) / SQRT_3;
        let (sin, cos) = electrical_angle.sin_cos();
        next.v_d = alpha * cos + beta * sin;
        next.v_q = -alpha * sin + beta * cos;

        let lm_over_lr = p.lm / p.lr;
        let sigma_ls = p.leakage_factor() * p.ls;
        let r_eq = p.rs + p.rr * lm_over_lr * lm_over_lr;
        let tr = p.rotor_time_constant();
        let electrical_speed = p.pole_pairs * state.rotor_speed;
        let field_speed = electrical_speed + state.slip_speed;

        let d_i_d = (next.v_d - r_eq * state.i_d
            + field_speed * sigma_ls * state.i_q
            + lm_over_lr * state.flux / tr)
            / sigma_ls
            * dt;
        let d_i_q = (next.v_q
            - r_eq * state.i_q
            - field_speed * sigma_ls * state.i_d
            - lm_over_lr * electrical_speed * state.flux)
            / sigma_ls
            * dt;
        next.i_d = state.i_d + d_i_d;
        next.i_q = state.i_q + d_i_q;
        next.delta_i_d = d_i_d;
        next.delta_i_q = d_i_q;

        next.flux = state.flux + (p.lm * next.i_d - state.flux) * dt / tr;
        next.slip_speed = if next.flux == 0.0 {
            0.0
        } else {
            p.lm * next.i_q / (tr * next.flux)
        };
        next.torque = p.pole_pairs * next.i_q * next.flux * lm_over_lr;

        let drive = next.torque - p.load_torque;
        if state.rotor_speed == 0.0 && drive.abs() < p.static_friction {
            next.rotor_speed = 0.0;
        } else {
            let accel = (drive - p.damping * state.rotor_speed) / p.inertia;
            next.rotor_speed = state.rotor_speed + accel * dt;
        }

        let electrical_speed = p.pole_pairs * next.rotor_speed;
        next.field_angle =
            (state.field_angle + (electrical_speed + next.slip_speed) * dt).rem_euclid(TAU);
        next.rotor_electrical_angle =
            (state.rotor_electrical_angle + electrical_speed * dt).rem_euclid(TAU);
        next.rotor_angle = (state.rotor_angle + next.rotor_speed * dt).rem_euclid(TAU);

        let i_alpha = next.i_d * cos - next.i_q * sin;
        let i_beta = next.i_d * sin + next.i_q * cos;
        next.i_u = i_alpha;
        next.i_v = -0.5 * i_alpha + 0.5 * SQRT_3 * i_beta;
        next.i_w = -0.5 * i_alpha - 0.5 * SQRT_3 * i_beta;

        next
    }
}
