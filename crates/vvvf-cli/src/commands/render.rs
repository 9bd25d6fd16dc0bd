//! Render command implementation
//!
//! Runs a mascon program through a pattern and writes the audio as a 16-bit
//! mono WAV file.

use std::path::Path;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use anyhow::{Context, Result};
use colored::Colorize;
use vvvf_engine::{render_program, RenderOutput};
use vvvf_spec::validation::{validate_pattern, validate_program};
use vvvf_spec::{AudioSource, SimulationSettings};

use super::json_output::{error_codes, JsonError, RenderReport};
use crate::input::{load_motor, load_pattern, load_program, load_settings, load_tables};

/// Options of the render command.
#[derive(Debug, Clone, Default)]
pub struct RenderArgs {
    /// Pattern file.
    pub pattern: String,
    /// Mascon program file.
    pub program: String,
    /// Output WAV path.
    pub output: String,
    /// Settings file; command-line values override it.
    pub settings: Option<String>,
    /// Sample rate override.
    pub sample_rate: Option<u32>,
    /// Seed override.
    pub seed: Option<u64>,
    /// Audio source override.
    pub source: Option<AudioSource>,
    /// Directory of switch-angle tables.
    pub tables: Option<String>,
    /// Motor parameter file.
    pub motor: Option<String>,
}

impl RenderArgs {
    /// Resolves run settings from the settings file and overrides.
    pub fn resolve_settings(&self) -> Result<SimulationSettings> {
        let mut settings = match &self.settings {
            Some(path) => load_settings(path)?,
            None => SimulationSettings::default(),
        };
        if let Some(sample_rate) = self.sample_rate {
            settings.sample_rate = sample_rate;
        }
        if let Some(seed) = self.seed {
            settings.seed = seed;
        }
        if let Some(source) = self.source {
            settings.audio_source = source;
        }
        Ok(settings)
    }
}

/// Run the render command
///
/// Rendering stops between samples once `cancel` is set; nothing is written
/// then.
///
/// # Returns
/// Exit code: 0 on success, 1 if the documents are invalid or the render was
/// cancelled
pub fn run(args: &RenderArgs, json_output: bool, cancel: &AtomicBool) -> Result<ExitCode> {
    let start = Instant::now();
    let pattern = load_pattern(&args.pattern)?;
    let program = load_program(&args.program)?;
    let settings = args.resolve_settings()?;
    let motor = args.motor.as_deref().map(load_motor).transpose()?;
    let tables = load_tables(args.tables.as_deref())?;

    let mut validation = validate_pattern(&pattern);
    validation.merge(validate_program(&program));
    if !validation.is_ok() {
        if json_output {
            let report = RenderReport {
                ok: false,
                output: args.output.clone(),
                num_samples: 0,
                render: None,
                errors: validation.errors.iter().map(JsonError::from).collect(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            for error in &validation.errors {
                println!("  {} {}", "x".red(), error);
            }
            println!("\n{} documents are invalid", "FAILED".red().bold());
        }
        return Ok(ExitCode::from(1));
    }

    if !json_output {
        println!("{} {}", "Rendering:".cyan().bold(), args.program);
        println!(
            "{} {} Hz, seed {}, {}",
            "Settings:".dimmed(),
            settings.sample_rate,
            settings.seed,
            settings.audio_source.as_str()
        );
        if !tables.is_empty() {
            println!("{} {} table(s)", "Tables:".dimmed(), tables.len());
        }
    }

    let output = match render_program(
        &pattern,
        &tables,
        &program,
        &settings,
        motor.as_ref(),
        cancel,
    ) {
        Ok(output) => output,
        Err(err) if json_output => {
            let report = RenderReport {
                ok: false,
                output: args.output.clone(),
                num_samples: 0,
                render: None,
                errors: vec![JsonError::new(error_codes::ENGINE, err.to_string())],
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(ExitCode::from(1));
        }
        Err(err) => return Err(err).context("Render failed"),
    };

    if output.cancelled {
        let rendered = output.samples.len();
        if json_output {
            let report = RenderReport {
                ok: false,
                output: args.output.clone(),
                num_samples: rendered,
                render: None,
                errors: vec![JsonError::new(
                    error_codes::CANCELLED,
                    format!("render cancelled after {} sample(s)", rendered),
                )],
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!(
                "\n{} cancelled after {} sample(s), nothing written",
                "CANCELLED".yellow().bold(),
                rendered
            );
        }
        return Ok(ExitCode::from(1));
    }

    if let Err(err) = write_wav(Path::new(&args.output), &output) {
        if json_output {
            let report = RenderReport {
                ok: false,
                output: args.output.clone(),
                num_samples: 0,
                render: None,
                errors: vec![JsonError::new(error_codes::OUTPUT, format!("{:#}", err))],
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(ExitCode::from(1));
        }
        return Err(err).with_context(|| format!("Failed to write WAV file: {}", args.output));
    }

    let duration_ms = start.elapsed().as_millis() as u64;
    if json_output {
        let report = RenderReport {
            ok: true,
            output: args.output.clone(),
            num_samples: output.samples.len(),
            render: Some(output),
            errors: Vec::new(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        if output.soft_failures > 0 {
            println!(
                "  {} {} sample(s) with a leg forced low",
                "!".yellow(),
                output.soft_failures
            );
        }
        println!("{} {}", "PCM hash:".dimmed(), output.pcm_hash);
        println!(
            "\n{} Wrote {} ({:.2}s, {}ms)",
            "SUCCESS".green().bold(),
            args.output,
            output.duration_seconds(),
            duration_ms
        );
    }
    Ok(ExitCode::SUCCESS)
}

/// Writes rendered samples as a 16-bit mono WAV file.
pub fn write_wav(path: &Path, output: &RenderOutput) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: output.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for sample in output.pcm16() {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}
