//! Periodic waveform helpers and root finders.
//!
//! All waveform helpers take a phase angle in radians and return a value in
//! [-1.0, 1.0]. They are periodic in 2π and accept any finite angle.

use std::f64::consts::{PI, TAU};

use serde::Serialize;

/// Wraps an angle into [0, 2π).
#[inline]
pub fn wrap_angle(x: f64) -> f64 {
    let wrapped = x.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Fractional position of an angle within its period, in [0, 1).
#[inline]
pub fn cycle_position(x: f64) -> f64 {
    wrap_angle(x) / TAU
}

/// Sine wave.
#[inline]
pub fn sine(x: f64) -> f64 {
    x.sin()
}

/// Rising sawtooth: 0 at x = 0, approaching 1 just before π, -1 at π.
#[inline]
pub fn saw(x: f64) -> f64 {
    let p = cycle_position(x + PI);
    2.0 * p - 1.0
}

/// Square wave: 1 in the first half period, -1 in the second.
#[inline]
pub fn square(x: f64) -> f64 {
    if cycle_position(x) < 0.5 {
        1.0
    } else {
        -1.0
    }
}

/// Triangle wave in phase with the sine: 0 at x = 0, 1 at π/2, -1 at 3π/2.
#[inline]
pub fn triangle(x: f64) -> f64 {
    let p = cycle_position(x);
    if p < 0.25 {
        4.0 * p
    } else if p < 0.75 {
        2.0 - 4.0 * p
    } else {
        4.0 * p - 4.0
    }
}

/// Outcome of a root search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RootResult {
    /// Best estimate of the root.
    pub value: f64,
    /// Residual `f(value)`.
    pub residual: f64,
    /// Iterations spent.
    pub iterations: usize,
    /// Whether the tolerance was reached.
    pub converged: bool,
}

/// Newton's method with a forward finite-difference derivative.
///
/// Returns the best estimate seen if the tolerance is not reached within
/// `max_iterations` or the derivative vanishes.
pub fn newton<F>(
    mut f: F,
    initial: f64,
    step: f64,
    tolerance: f64,
    max_iterations: usize,
) -> RootResult
where
    F: FnMut(f64) -> f64,
{
    let mut x = initial;
    let mut best = RootResult {
        value: x,
        residual: f(x),
        iterations: 0,
        converged: false,
    };

    for i in 0..max_iterations {
        let fx = f(x);
        if fx.abs() < best.residual.abs() || i == 0 {
            best.value = x;
            best.residual = fx;
        }
        best.iterations = i + 1;
        if fx.abs() <= tolerance {
            best.value = x;
            best.residual = fx;
            best.converged = true;
            return best;
        }

        let derivative = (f(x + step) - fx) / step;
        if derivative == 0.0 || !derivative.is_finite() {
            break;
        }
        let next = x - fx / derivative;
        if !next.is_finite() {
            break;
        }
        x = next;
    }

    let fx = f(x);
    if fx.abs() < best.residual.abs() {
        best.value = x;
        best.residual = fx;
        best.converged = fx.abs() <= tolerance;
    }
    best
}

/// Bisection on `[low, high]`.
///
/// If the endpoints do not bracket a sign change, the endpoint with the smaller
/// residual is returned unconverged.
pub fn bisection<F>(
    mut f: F,
    low: f64,
    high: f64,
    tolerance: f64,
    max_iterations: usize,
) -> RootResult
where
    F: FnMut(f64) -> f64,
{
    let (mut lo, mut hi) = if low <= high { (low, high) } else { (high, low) };
    let mut f_lo = f(lo);
    let f_hi = f(hi);

    if f_lo.abs() <= tolerance {
        return RootResult {
            value: lo,
            residual: f_lo,
            iterations: 0,
            converged: true,
        };
    }
    if f_hi.abs() <= tolerance {
        return RootResult {
            value: hi,
            residual: f_hi,
            iterations: 0,
            converged: true,
        };
    }
    if f_lo.signum() == f_hi.signum() {
        let (value, residual) = if f_lo.abs() <= f_hi.abs() {
            (lo, f_lo)
        } else {
            (hi, f_hi)
        };
        return RootResult {
            value,
            residual,
            iterations: 0,
            converged: false,
        };
    }

    let mut best = if f_lo.abs() <= f_hi.abs() {
        (lo, f_lo)
    } else {
        (hi, f_hi)
    };

    for i in 0..max_iterations {
        let mid = 0.5 * (lo + hi);
        let f_mid = f(mid);
        if f_mid.abs() < best.1.abs() {
            best = (mid, f_mid);
        }
        if f_mid.abs() <= tolerance {
            return RootResult {
                value: mid,
                residual: f_mid,
                iterations: i + 1,
                converged: true,
            };
        }
        if f_mid.signum() == f_lo.signum() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }

    RootResult {
        value: best.0,
        residual: best.1,
        iterations: max_iterations,
        converged: false,
    }
}
