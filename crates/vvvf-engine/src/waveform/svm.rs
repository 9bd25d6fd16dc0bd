//! Space-vector modulation.
//!
//! Pole voltages are normalized to ±1 (a DC link of 2), so the active vectors
//! have magnitude 4/3 in the amplitude-invariant α-β frame.

use std::f64::consts::FRAC_PI_3;

/// Magnitude of an active switching vector.
pub const ACTIVE_VECTOR_MAGNITUDE: f64 = 4.0 / 3.0;

/// Switching states of the six active vectors, phases (a, b, c).
const ACTIVE_STATES: [[u8; 3]; 6] = [
    [1, 0, 0],
    [1, 1, 0],
    [0, 1, 0],
    [0, 1, 1],
    [0, 0, 1],
    [1, 0, 1],
];

const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// Amplitude-invariant Clarke transform of three phase values.
pub fn clarke(a: f64, b: f64, c: f64) -> (f64, f64) {
    let alpha = (2.0 / 3.0) * (a - 0.5 * b - 0.5 * c);
    let beta = (b - c) / SQRT_3;
    (alpha, beta)
}

/// Sector (1..=6) of an α-β vector from three sign tests.
///
/// The origin satisfies no pattern exactly and is placed in sector 1.
pub fn sector(alpha: f64, beta: f64) -> u8 {
    let s1 = beta >= 0.0;
    let s2 = SQRT_3 * alpha - beta >= 0.0;
    let s3 = -SQRT_3 * alpha - beta >= 0.0;
    match (s1, s2, s3) {
        (true, true, false) => 1,
        (true, false, false) => 2,
        (true, false, true) => 3,
        (false, false, true) => 4,
        (false, true, true) => 5,
        (false, true, false) => 6,
        _ => 1,
    }
}

/// Dwell fractions of one switching period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dwell {
    /// Sector, 1 to 6.
    pub sector: u8,
    /// Fraction spent on the leading active vector.
    pub t1: f64,
    /// Fraction spent on the trailing active vector.
    pub t2: f64,
    /// Fraction spent on the zero vectors.
    pub t0: f64,
}

fn active_vector(index: usize) -> (f64, f64) {
    let angle = index as f64 * FRAC_PI_3;
    (
        ACTIVE_VECTOR_MAGNITUDE * angle.cos(),
        ACTIVE_VECTOR_MAGNITUDE * angle.sin(),
    )
}

fn cross(a: (f64, f64), b: (f64, f64)) -> f64 {
    a.0 * b.1 - a.1 * b.0
}

/// Dwell fractions for a reference vector.
///
/// Outside the hexagon the active fractions are scaled down to sum to one
/// and the zero-vector fraction is zero.
pub fn dwell(alpha: f64, beta: f64) -> Dwell {
    let sector = sector(alpha, beta);
    let first = (sector - 1) as usize;
    let va = active_vector(first);
    let vb = active_vector((first + 1) % 6);
    let v = (alpha, beta);

    let determinant = cross(va, vb);
    let mut t1 = (cross(v, vb) / determinant).max(0.0);
    let mut t2 = (cross(va, v) / determinant).max(0.0);
    let active = t1 + t2;
    let t0 = if active > 1.0 {
        t1 /= active;
        t2 /= active;
        0.0
    } else {
        1.0 - active
    };

    Dwell { sector, t1, t2, t0 }
}

/// Modulating values of the three phases for a three-phase reference.
///
/// Each phase's duty is `T1·s1 + T2·s2 + T0/2`, where `s1` and `s2` are the
/// phase's bits in the sector's two active vectors; the modulating value is
/// `2·duty − 1`.
pub fn modulate(a: f64, b: f64, c: f64) -> [f64; 3] {
    let (alpha, beta) = clarke(a, b, c);
    let Dwell { sector, t1, t2, t0 } = dwell(alpha, beta);
    let first = ACTIVE_STATES[(sector - 1) as usize];
    let second = ACTIVE_STATES[sector as usize % 6];

    let mut out = [0.0; 3];
    for (phase, value) in out.iter_mut().enumerate() {
        let duty = t1 * first[phase] as f64 + t2 * second[phase] as f64 + 0.5 * t0;
        *value = 2.0 * duty - 1.0;
    }
    out
}
