//! Reference-to-carrier comparison.

use std::f64::consts::PI;

use vvvf_spec::{CarrierWave, Level};

use crate::math::{saw, sine, triangle, wrap_angle};

/// Carrier value in [-1, 1] at carrier phase `phase`.
pub fn carrier_value(wave: CarrierWave, phase: f64) -> f64 {
    match wave {
        CarrierWave::Triangle => triangle(phase),
        CarrierWave::SawUp => saw(phase),
        CarrierWave::SawDown => -saw(phase),
        CarrierWave::Sine => sine(phase),
    }
}

/// Compares a modulating value against a carrier value in [-1, 1].
///
/// Two-level legs output 1 while the reference is above the carrier. Three-level
/// legs use the carrier folded into [0, 1] against the reference magnitude:
/// a positive reference switches between 1 and 2, a negative one between 0 and 1.
pub fn compare(level: Level, reference: f64, carrier: f64) -> u8 {
    match level {
        Level::Two => u8::from(reference > carrier),
        Level::Three => {
            let carrier = 0.5 * (carrier + 1.0);
            if reference >= 0.0 {
                if reference > carrier {
                    2
                } else {
                    1
                }
            } else if reference < -carrier {
                0
            } else {
                1
            }
        }
    }
}

/// High-efficiency overmodulation.
///
/// Within each half period a saw carrier with `count` teeth is compared with
/// a trapezoid that rises over `pulse_width` radians from each zero crossing
/// and is scaled by `amplitude`. The second half period mirrors the first
/// around the middle level.
pub fn overmodulation(level: Level, x: f64, count: u32, pulse_width: f64, amplitude: f64) -> u8 {
    let theta = wrap_angle(x);
    let half = theta % PI;
    let carrier = (half * count as f64 / PI).fract();
    let edge = half.min(PI - half);
    let rise = if pulse_width > 0.0 {
        (edge / pulse_width).min(1.0)
    } else {
        1.0
    };
    let reference = (rise * amplitude).clamp(0.0, 1.0);
    let active = reference > carrier;
    let first_half = theta < PI;

    match (level, first_half, active) {
        (Level::Two, true, active) => u8::from(active),
        (Level::Two, false, active) => u8::from(!active),
        (Level::Three, true, true) => 2,
        (Level::Three, false, true) => 0,
        (Level::Three, _, false) => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_two_level_compare() {
        assert_eq!(compare(Level::Two, 0.5, 0.2), 1);
        assert_eq!(compare(Level::Two, 0.2, 0.2), 0);
        assert_eq!(compare(Level::Two, -0.5, 0.2), 0);
    }

    #[test]
    fn test_three_level_compare() {
        // Carrier -1 folds to 0, +1 folds to 1
        assert_eq!(compare(Level::Three, 0.5, -1.0), 2);
        assert_eq!(compare(Level::Three, 0.5, 1.0), 1);
        assert_eq!(compare(Level::Three, -0.5, -1.0), 0);
        assert_eq!(compare(Level::Three, -0.5, 1.0), 1);
        assert_eq!(compare(Level::Three, 0.0, 0.0), 1);
    }

    #[test]
    fn test_overmodulation_symmetry() {
        for i in 1..100 {
            let x = i as f64 * PI / 100.0;
            let first = overmodulation(Level::Two, x, 3, 0.4, 0.9);
            let second = overmodulation(Level::Two, x + PI, 3, 0.4, 0.9);
            assert_eq!(first, 1 - second, "x = {}", x);

            let first = overmodulation(Level::Three, x, 3, 0.4, 0.9);
            let second = overmodulation(Level::Three, x + PI, 3, 0.4, 0.9);
            assert_eq!(first, 2 - second, "x = {}", x);
        }
    }

    #[test]
    fn test_overmodulation_full_amplitude_near_peak() {
        // Full trapezoid beats every carrier tooth except its very top
        assert_eq!(overmodulation(Level::Two, FRAC_PI_2 + 0.01, 5, 0.3, 1.0), 1);
        assert_eq!(overmodulation(Level::Two, 3.0 * FRAC_PI_2 + 0.01, 5, 0.3, 1.0), 0);
    }
}
