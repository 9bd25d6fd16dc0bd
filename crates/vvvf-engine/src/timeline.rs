//! Scripted mascon programs.
//!
//! A [`MasconProgram`] is compiled into contiguous [`Segment`]s. Stepping the
//! timeline at time `t` commands the segment's interpolated frequency through
//! the control state machine.

use serde::Serialize;
use vvvf_spec::{MasconProgram, PatternConfig};

use crate::control::{advance, Command, FrequencyTarget};
use crate::state::ControlState;

/// One contiguous part of a program.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Segment {
    /// Start time in seconds.
    pub start_time: f64,
    /// End time in seconds (exclusive).
    pub end_time: f64,
    /// Commanded frequency at the start.
    pub start_frequency: f64,
    /// Commanded frequency at the end.
    pub end_frequency: f64,
    /// Braking sub-pattern selected.
    pub brake: bool,
    /// Power commanded.
    pub mascon_on: bool,
}

impl Segment {
    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Commanded frequency at `time`, interpolated linearly.
    pub fn frequency_at(&self, time: f64) -> f64 {
        let duration = self.duration();
        if duration <= 0.0 {
            return self.end_frequency;
        }
        let t = ((time - self.start_time) / duration).clamp(0.0, 1.0);
        self.start_frequency + (self.end_frequency - self.start_frequency) * t
    }
}

/// A compiled program.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Timeline {
    segments: Vec<Segment>,
}

impl Timeline {
    /// Compiles a program. Points with non-positive or non-finite duration are skipped.
    ///
    /// Powered points move the frequency by `rate · duration` (down when
    /// braking, clamped at zero); coasting points hold it.
    pub fn compile(program: &MasconProgram) -> Self {
        let mut segments = Vec::with_capacity(program.points.len());
        let mut time = 0.0;
        let mut frequency = program.initial_frequency.max(0.0);

        for (i, point) in program.points.iter().enumerate() {
            if !(point.duration > 0.0) || !point.duration.is_finite() {
                tracing::debug!(
                    index = i,
                    duration = point.duration,
                    "skipping empty mascon point"
                );
                continue;
            }
            let end_frequency = if point.mascon_on {
                let delta = point.rate * point.duration;
                if point.brake {
                    (frequency - delta).max(0.0)
                } else {
                    frequency + delta
                }
            } else {
                frequency
            };
            segments.push(Segment {
                start_time: time,
                end_time: time + point.duration,
                start_frequency: frequency,
                end_frequency,
                brake: point.brake,
                mascon_on: point.mascon_on,
            });
            time += point.duration;
            frequency = end_frequency;
        }

        Self { segments }
    }

    /// All segments.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Total length in seconds.
    pub fn duration(&self) -> f64 {
        self.segments.last().map(|s| s.end_time).unwrap_or(0.0)
    }

    /// Index of the segment containing `time`, or `None` outside the program.
    pub fn segment_at(&self, time: f64) -> Option<usize> {
        let index = self.segments.partition_point(|s| s.end_time <= time);
        let segment = self.segments.get(index)?;
        if segment.start_time <= time {
            Some(index)
        } else {
            None
        }
    }

    /// Commands the state for time `t` and advances the state machine by `dt`.
    ///
    /// While coasting into a powered segment, power is applied early if the
    /// control frequency could not otherwise catch up with the next segment's
    /// start frequency at the mascon-on rate before the segment begins. Once
    /// applied, power stays on until the segment ends.
    ///
    /// Returns the active segment, or `None` once `t` is outside the program.
    pub fn step(
        &self,
        state: &mut ControlState,
        pattern: &PatternConfig,
        t: f64,
        dt: f64,
    ) -> Option<usize> {
        let index = self.segment_at(t)?;
        let segment = &self.segments[index];
        if state.segment != Some(index) {
            tracing::debug!(
                index,
                start_time = segment.start_time,
                brake = segment.brake,
                mascon_on = segment.mascon_on,
                "timeline segment"
            );
            state.segment = Some(index);
            state.catching_up = false;
        }

        let natural = segment.frequency_at(t);
        let mut brake = segment.brake;
        let mut mascon_on = segment.mascon_on;

        if !segment.mascon_on {
            if let Some(next) = self.segments.get(index + 1).filter(|n| n.mascon_on) {
                let rate = pattern
                    .sub_pattern(next.brake)
                    .jerk
                    .on
                    .frequency_change_rate;
                let remaining = segment.end_time - t;
                if state.catching_up
                    || (rate > 0.0
                        && (next.start_frequency - state.control_frequency()) / rate
                            >= remaining)
                {
                    state.catching_up = true;
                    brake = next.brake;
                    mascon_on = true;
                }
            }
        }

        let command = Command {
            brake,
            mascon_on,
            target: FrequencyTarget::Absolute(natural),
        };
        advance(state, &command, &pattern.sub_pattern(brake).jerk, dt);
        Some(index)
    }
}
