//! Batch rendering of a mascon program.
//!
//! The render loop runs the same [`Simulator`] pipeline as interactive
//! stepping, one sample at a time, and checks a cancel flag between samples.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use vvvf_spec::{MasconProgram, MotorParameters, PatternConfig, SimulationSettings};

use crate::custom_table::TableLibrary;
use crate::error::EngineResult;
use crate::simulator::Simulator;
use crate::timeline::Timeline;

/// Result of a render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderOutput {
    /// Audio samples in [-1, 1].
    #[serde(skip)]
    pub samples: Vec<f64>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Length of the program in seconds.
    pub program_duration: f64,
    /// The cancel flag stopped the render early.
    pub cancelled: bool,
    /// Samples with at least one leg forced low.
    pub soft_failures: usize,
    /// BLAKE3 hash of the 16-bit PCM data.
    pub pcm_hash: String,
}

impl RenderOutput {
    /// Rendered length in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Samples as 16-bit PCM.
    pub fn pcm16(&self) -> Vec<i16> {
        self.samples.iter().map(|&s| to_pcm16(s)).collect()
    }
}

/// Converts a sample in [-1, 1] to 16-bit PCM, clipping outside the range.
pub fn to_pcm16(sample: f64) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0).round() as i16
}

/// BLAKE3 hash of samples encoded as little-endian 16-bit PCM.
pub fn pcm_hash(samples: &[f64]) -> String {
    let mut hasher = blake3::Hasher::new();
    for &sample in samples {
        hasher.update(&to_pcm16(sample).to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Renders a program from standstill.
///
/// `motor` replaces the default motor parameters when the audio source is the
/// motor current, or adds a motor to a line-voltage render. Setting `cancel`
/// stops the loop before the next sample; the samples rendered so far are
/// returned with `cancelled = true`.
pub fn render_program(
    pattern: &PatternConfig,
    tables: &TableLibrary,
    program: &MasconProgram,
    settings: &SimulationSettings,
    motor: Option<&MotorParameters>,
    cancel: &AtomicBool,
) -> EngineResult<RenderOutput> {
    let timeline = Timeline::compile(program);
    let mut simulator = Simulator::new(pattern, tables, *settings)?;
    if let Some(params) = motor {
        simulator = simulator.with_motor(*params);
    }
    if program.initial_frequency > 0.0 {
        let state = simulator.state_mut();
        state.set_commanded_frequency(program.initial_frequency);
        state.set_control_frequency(program.initial_frequency);
        state.set_sine_frequency(program.initial_frequency);
    }

    let dt = simulator.dt();
    let total = (timeline.duration() * settings.sample_rate as f64).ceil() as usize;
    tracing::debug!(
        segments = timeline.segments().len(),
        duration = timeline.duration(),
        samples = total,
        "render started"
    );

    let mut samples = Vec::with_capacity(total);
    let mut cancelled = false;
    for i in 0..total {
        if cancel.load(Ordering::Relaxed) {
            tracing::info!(rendered = i, total, "render cancelled");
            cancelled = true;
            break;
        }
        let t = i as f64 * dt;
        match simulator.step_timeline(&timeline, t)? {
            Some(sample) => samples.push(sample.audio),
            None => break,
        }
    }

    if simulator.soft_failures() > 0 {
        tracing::warn!(
            soft_failures = simulator.soft_failures(),
            "render finished with legs forced low"
        );
    }

    Ok(RenderOutput {
        pcm_hash: pcm_hash(&samples),
        samples,
        sample_rate: settings.sample_rate,
        program_duration: timeline.duration(),
        cancelled,
        soft_failures: simulator.soft_failures(),
    })
}
