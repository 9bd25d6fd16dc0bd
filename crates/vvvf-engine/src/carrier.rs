//! Carrier frequency modulation for asynchronous PWM.
//!
//! The base frequency comes from the entry's [`CarrierBase`]. Two stateful
//! sources may modify it: a periodic sweep between two frequencies and a held
//! random offset. Both keep their bookkeeping in [`CarrierState`], which lives
//! inside the run's control state.

use std::f64::consts::TAU;

use rand::Rng;
use rand_pcg::Pcg32;
use vvvf_spec::{CarrierBase, CarrierControl, PeriodicShape, RandomModulation, ValueLaw};

use crate::error::{EngineError, EngineResult};
use crate::math::triangle;

/// Held random offset.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RandomHold {
    /// Time of the last draw, `None` before the first one.
    pub last_update: Option<f64>,
    /// Offset currently held, in Hz.
    pub offset: f64,
}

/// Phase bookkeeping of a periodic sweep.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PeriodicSweep {
    /// Time at which the current cycle numbering started.
    pub origin: f64,
    /// Interval used on the previous call.
    pub last_interval: Option<f64>,
}

/// A stateful modifier of the carrier frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrequencySource {
    /// Random offset redrawn every interval.
    Random(RandomHold),
    /// Periodic sweep between a lowest and highest frequency.
    Periodic(PeriodicSweep),
}

/// Inputs of one source evaluation.
#[derive(Debug, Clone, Copy)]
pub enum SourceInput<'a> {
    /// Random offset parameters.
    Random(&'a RandomModulation),
    /// Periodic sweep parameters.
    Periodic {
        /// Lowest carrier frequency.
        lowest: &'a ValueLaw,
        /// Highest carrier frequency.
        highest: &'a ValueLaw,
        /// Sweep period in seconds.
        interval: &'a ValueLaw,
        /// Sweep shape.
        shape: PeriodicShape,
    },
}

impl FrequencySource {
    /// Evaluates the source at `time`.
    ///
    /// The random source returns an offset to add to the base frequency; the
    /// periodic source returns an absolute carrier frequency. A mismatched
    /// input resets nothing and yields 0.
    pub fn calculate(
        &mut self,
        rng: &mut Pcg32,
        input: SourceInput<'_>,
        control_frequency: f64,
        time: f64,
    ) -> EngineResult<f64> {
        match (self, input) {
            (FrequencySource::Random(hold), SourceInput::Random(modulation)) => {
                let range = modulation.range.resolve(control_frequency);
                let interval = modulation.interval.resolve(control_frequency);
                if !(interval > 0.0) {
                    return Err(EngineError::invalid_param(
                        "random.interval",
                        format!("must be positive, got {}", interval),
                    ));
                }
                if range == 0.0 {
                    hold.offset = 0.0;
                    return Ok(0.0);
                }

                let due = match hold.last_update {
                    None => true,
                    Some(last) => time < last || time - last >= interval,
                };
                if due {
                    let half = range.abs() / 2.0;
                    hold.offset = rng.gen_range(-half..=half);
                    hold.last_update = Some(time);
                }
                Ok(hold.offset)
            }
            (
                FrequencySource::Periodic(sweep),
                SourceInput::Periodic {
                    lowest,
                    highest,
                    interval,
                    shape,
                },
            ) => {
                let lowest = lowest.resolve(control_frequency);
                let highest = highest.resolve(control_frequency);
                let interval = interval.resolve(control_frequency);
                if !(interval > 0.0) {
                    return Err(EngineError::invalid_param(
                        "periodic.interval",
                        format!("must be positive, got {}", interval),
                    ));
                }

                if let Some(previous) = sweep.last_interval {
                    if previous != interval {
                        // Keep the cycle position when the period changes
                        let position = (time - sweep.origin) / previous;
                        sweep.origin = time - position * interval;
                    }
                }
                sweep.last_interval = Some(interval);

                let position = ((time - sweep.origin) / interval).rem_euclid(1.0);
                let weight = sweep_weight(shape, position);
                Ok(lowest + (highest - lowest) * weight)
            }
            _ => Ok(0.0),
        }
    }
}

/// Position of a sweep between lowest (0) and highest (1) for a cycle position in [0, 1).
fn sweep_weight(shape: PeriodicShape, position: f64) -> f64 {
    match shape {
        PeriodicShape::Sine => 0.5 + 0.5 * (TAU * position).sin(),
        PeriodicShape::Triangle => 0.5 + 0.5 * triangle(TAU * position),
        PeriodicShape::Square => {
            if position < 0.5 {
                1.0
            } else {
                0.0
            }
        }
        PeriodicShape::SawUp => position,
        PeriodicShape::SawDown => 1.0 - position,
    }
}

/// Carrier modulation bookkeeping of one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarrierState {
    /// Random offset source.
    pub random: FrequencySource,
    /// Periodic sweep source.
    pub periodic: FrequencySource,
}

impl Default for CarrierState {
    fn default() -> Self {
        Self {
            random: FrequencySource::Random(RandomHold::default()),
            periodic: FrequencySource::Periodic(PeriodicSweep::default()),
        }
    }
}

impl CarrierState {
    /// Forgets held offsets and sweep phase.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Computes the carrier frequency for an entry.
    ///
    /// With `use_simple` set, periodic sweeps collapse to their lowest
    /// frequency and no random offset is applied.
    pub fn calculate(
        &mut self,
        rng: &mut Pcg32,
        control: &CarrierControl,
        control_frequency: f64,
        time: f64,
        use_simple: bool,
    ) -> EngineResult<f64> {
        let base = match &control.base {
            CarrierBase::Constant { frequency } => *frequency,
            CarrierBase::Moving {
                start_frequency,
                start_carrier,
                end_frequency,
                end_carrier,
            } => ValueLaw::Moving {
                start_frequency: *start_frequency,
                start: *start_carrier,
                end_frequency: *end_frequency,
                end: *end_carrier,
            }
            .resolve(control_frequency),
            CarrierBase::Table { points } => {
                let first = points.first().ok_or(EngineError::MissingCarrierTable)?;
                points
                    .iter()
                    .rev()
                    .find(|p| p.from_frequency <= control_frequency)
                    .unwrap_or(first)
                    .carrier
            }
            CarrierBase::Periodic {
                lowest,
                highest,
                interval,
                shape,
            } => {
                if use_simple {
                    lowest.resolve(control_frequency)
                } else {
                    self.periodic.calculate(
                        rng,
                        SourceInput::Periodic {
                            lowest,
                            highest,
                            interval,
                            shape: *shape,
                        },
                        control_frequency,
                        time,
                    )?
                }
            }
        };

        let offset = match (&control.random, use_simple) {
            (Some(modulation), false) => self.random.calculate(
                rng,
                SourceInput::Random(modulation),
                control_frequency,
                time,
            )?,
            _ => 0.0,
        };

        Ok((base + offset).max(0.0))
    }
}
