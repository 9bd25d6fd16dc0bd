//! Analyze command implementation
//!
//! Synthesizes one cycle of a pattern at a fixed output frequency and reports
//! the line-voltage harmonics.

use std::process::ExitCode;

use anyhow::{Context, Result};
use colored::Colorize;
use vvvf_engine::fourier::{coefficients_edges, spectrum_fft, VOLTAGE_CONVERT_FACTOR};
use vvvf_engine::{synthesize_cycle, AnalysisContext, ControlState, CycleRequest};
use vvvf_spec::SimulationSettings;

use super::json_output::{AnalyzeOutput, HarmonicLine};
use crate::input::{load_pattern, load_tables};

/// Options of the analyze command.
#[derive(Debug, Clone)]
pub struct AnalyzeArgs {
    /// Pattern file.
    pub pattern: String,
    /// Directory of switch-angle tables.
    pub tables: Option<String>,
    /// Output frequency in Hz.
    pub frequency: f64,
    /// Samples per cycle.
    pub samples: usize,
    /// Highest harmonic order listed.
    pub harmonics: usize,
    /// Analyze the braking sub-pattern.
    pub brake: bool,
    /// Amplitude override.
    pub amplitude: Option<f64>,
    /// Include the FFT spectrum.
    pub fft: bool,
}

impl Default for AnalyzeArgs {
    fn default() -> Self {
        Self {
            pattern: String::new(),
            tables: None,
            frequency: 50.0,
            samples: 10_000,
            harmonics: 25,
            brake: false,
            amplitude: None,
            fft: false,
        }
    }
}

/// Analyzes the cycle described by `args`.
pub fn analyze(args: &AnalyzeArgs) -> Result<AnalyzeOutput> {
    let pattern = load_pattern(&args.pattern)?;
    let tables = load_tables(args.tables.as_deref())?;
    let settings = SimulationSettings::default();
    let context = AnalysisContext {
        pattern: &pattern,
        tables: &tables,
        settings: &settings,
    };
    let request = CycleRequest {
        frequency: args.frequency,
        brake: args.brake,
        samples: args.samples,
        amplitude: args.amplitude,
    };

    let cycle = synthesize_cycle(&ControlState::default(), &context, &request)
        .context("Cycle synthesis failed")?;
    let coefficients = coefficients_edges(&cycle, pattern.level, args.harmonics.max(1));

    let fundamental = coefficients.first().map(|c| c.magnitude()).unwrap_or(0.0);
    let harmonics: Vec<HarmonicLine> = coefficients
        .iter()
        .map(|c| HarmonicLine {
            order: c.order,
            magnitude: c.magnitude(),
            relative: if fundamental > 0.0 {
                c.magnitude() / fundamental
            } else {
                0.0
            },
            coefficient: *c,
        })
        .collect();
    let distortion: f64 = harmonics
        .iter()
        .skip(1)
        .map(|h| h.magnitude * h.magnitude)
        .sum::<f64>()
        .sqrt();

    Ok(AnalyzeOutput {
        frequency: args.frequency,
        brake: args.brake,
        samples: args.samples,
        voltage_rate: fundamental / VOLTAGE_CONVERT_FACTOR,
        thd: if fundamental > 0.0 {
            distortion / fundamental
        } else {
            0.0
        },
        harmonics,
        spectrum: args.fft.then(|| spectrum_fft(&cycle, pattern.level)),
    })
}

/// Run the analyze command
///
/// # Returns
/// Exit code: 0 on success
pub fn run(args: &AnalyzeArgs, json_output: bool) -> Result<ExitCode> {
    let output = analyze(args)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!(
        "{} {} at {} Hz ({})",
        "Analyzing:".cyan().bold(),
        args.pattern,
        args.frequency,
        if args.brake { "braking" } else { "accelerate" }
    );
    println!("{} {:.4}", "Voltage rate:".dimmed(), output.voltage_rate);
    println!("{} {:.2}%", "THD:".dimmed(), output.thd * 100.0);
    println!("\n  {:>5}  {:>10}  {:>8}", "order", "magnitude", "rel");
    for line in &output.harmonics {
        let row = format!(
            "  {:>5}  {:>10.5}  {:>7.2}%",
            line.order,
            line.magnitude,
            line.relative * 100.0
        );
        if line.order > 1 && line.relative >= 0.05 {
            println!("{}", row.yellow());
        } else {
            println!("{}", row);
        }
    }
    if let Some(spectrum) = &output.spectrum {
        let peak = spectrum
            .iter()
            .enumerate()
            .skip(2)
            .max_by(|a, b| a.1.total_cmp(b.1));
        if let Some((order, magnitude)) = peak {
            println!(
                "\n{} order {} ({:.5})",
                "Largest FFT harmonic:".dimmed(),
                order,
                magnitude
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}
