//! Reference waveforms.

use std::f64::consts::{PI, TAU};

use vvvf_spec::{BaseWave, DiscreteMode, DiscreteTime, HarmonicWave};

use super::svm;
use crate::math::{saw, sine, square};
use crate::values::ResolvedHarmonic;

/// 2/√3, the gain that restores a unit peak after third-harmonic injection.
const MODIFIED_SINE_GAIN: f64 = 1.154_700_538_379_251_5;

/// Quantizes an angle onto a grid of `steps` points per period.
pub fn quantize(x: f64, discrete: &DiscreteTime) -> f64 {
    if discrete.steps == 0 {
        return x;
    }
    let step = TAU / discrete.steps as f64;
    let n = x / step;
    let n = match discrete.mode {
        DiscreteMode::Round => n.round(),
        DiscreteMode::Floor => n.floor(),
        DiscreteMode::Ceil => n.ceil(),
    };
    n * step
}

/// Angles of the three legs for a common angle.
pub fn leg_angles(x: f64) -> [f64; 3] {
    [x, x - TAU / 3.0, x + TAU / 3.0]
}

/// Reference value of the leg at angle `x`, already scaled by `amplitude`.
///
/// Space-vector and discontinuous waves depend on all three legs; they take
/// the other two legs at ±120° from `x`.
pub fn reference(wave: BaseWave, x: f64, amplitude: f64) -> f64 {
    match wave {
        BaseWave::Sine => amplitude * sine(x),
        BaseWave::Saw => -amplitude * saw(x),
        BaseWave::Square => amplitude * square(x),
        BaseWave::ModifiedSine1 => {
            amplitude * MODIFIED_SINE_GAIN * (x.sin() + (3.0 * x).sin() / 6.0)
        }
        BaseWave::ModifiedSine2 => amplitude * (MODIFIED_SINE_GAIN * x.sin()).clamp(-1.0, 1.0),
        BaseWave::ModifiedSaw1 => amplitude * (-1.5 * saw(x)).clamp(-1.0, 1.0),
        BaseWave::Svm => {
            let [a, b, c] = leg_angles(x).map(|angle| amplitude * angle.sin());
            svm::modulate(a, b, c)[0]
        }
        BaseWave::Dpwm30
        | BaseWave::Dpwm60c
        | BaseWave::Dpwm60p
        | BaseWave::Dpwm60n
        | BaseWave::Dpwm120p
        | BaseWave::Dpwm120n => {
            let [a, b, c] = leg_angles(x).map(|angle| amplitude * angle.sin());
            (a + zero_sequence(wave, a, b, c)).clamp(-1.0, 1.0)
        }
    }
}

/// Zero-sequence offset of a discontinuous wave.
///
/// In each 60° sector one leg is clamped to a rail; the rule picks which.
fn zero_sequence(wave: BaseWave, a: f64, b: f64, c: f64) -> f64 {
    let max = a.max(b).max(c);
    let min = a.min(b).min(c);
    let positive = 1.0 - max;
    let negative = -1.0 - min;
    let centered = -(max + min) / 2.0;
    let peak_is_positive = max.abs() >= min.abs();

    match wave {
        BaseWave::Dpwm120p => positive,
        BaseWave::Dpwm120n => negative,
        BaseWave::Dpwm60c => {
            if peak_is_positive {
                positive
            } else {
                negative
            }
        }
        BaseWave::Dpwm30 => {
            if peak_is_positive {
                negative
            } else {
                positive
            }
        }
        BaseWave::Dpwm60p => {
            if peak_is_positive {
                positive
            } else {
                centered
            }
        }
        BaseWave::Dpwm60n => {
            if peak_is_positive {
                centered
            } else {
                negative
            }
        }
        _ => 0.0,
    }
}

/// Value of one harmonic at fundamental angle `x`.
pub fn harmonic(h: &ResolvedHarmonic, x: f64) -> f64 {
    let angle = h.order * x + h.initial_phase;
    let unit = match h.wave {
        HarmonicWave::Sine => sine(angle),
        HarmonicWave::Saw => -saw(angle),
        HarmonicWave::Square => square(angle),
    };
    h.amplitude * unit
}

/// Angle of the leg in the current half period, in [0, π).
pub fn half_period_angle(x: f64) -> f64 {
    crate::math::wrap_angle(x) % PI
}
