//! VVVF CLI - Command-line interface for the VVVF inverter simulator
//!
//! This binary provides commands for validating pattern documents, rendering
//! mascon programs to audio, and analyzing the harmonics of a pattern.

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use vvvf_cli::{commands, interrupt};
use vvvf_engine::{SolveMethod, SolveOptions};
use vvvf_spec::AudioSource;

/// VVVF - Traction inverter sound simulator
#[derive(Parser)]
#[command(name = "vvvf")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate pattern, program and motor documents
    Validate {
        /// Path to the control pattern (JSON or YAML)
        #[arg(long)]
        pattern: Option<String>,

        /// Path to the mascon program
        #[arg(long)]
        program: Option<String>,

        /// Path to the motor parameters
        #[arg(long)]
        motor: Option<String>,

        /// Output machine-readable JSON diagnostics (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Render a mascon program through a pattern to a WAV file
    Render {
        /// Path to the control pattern
        #[arg(short, long)]
        pattern: String,

        /// Path to the mascon program
        #[arg(long)]
        program: String,

        /// Output WAV path
        #[arg(short, long)]
        output: String,

        /// Path to a settings document; flags below override it
        #[arg(long)]
        settings: Option<String>,

        /// Output sample rate in Hz
        #[arg(long)]
        sample_rate: Option<u32>,

        /// Seed of the run PRNG
        #[arg(long)]
        seed: Option<u64>,

        /// Signal written to the audio output
        #[arg(long, value_parser = ["line_voltage", "motor_current"])]
        source: Option<String>,

        /// Directory of switch-angle table files
        #[arg(long)]
        tables: Option<String>,

        /// Path to the motor parameters
        #[arg(long)]
        motor: Option<String>,

        /// Output machine-readable JSON diagnostics (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Analyze one output cycle of a pattern
    Analyze {
        /// Path to the control pattern
        #[arg(short, long)]
        pattern: String,

        /// Output frequency in Hz
        #[arg(short, long, default_value_t = 50.0)]
        frequency: f64,

        /// Samples per cycle
        #[arg(long, default_value_t = 10_000)]
        samples: usize,

        /// Highest harmonic order listed
        #[arg(long, default_value_t = 25)]
        harmonics: usize,

        /// Analyze the braking sub-pattern
        #[arg(long)]
        brake: bool,

        /// Override the amplitude from the pattern
        #[arg(long)]
        amplitude: Option<f64>,

        /// Include the FFT spectrum
        #[arg(long)]
        fft: bool,

        /// Directory of switch-angle table files
        #[arg(long)]
        tables: Option<String>,

        /// Output machine-readable JSON (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Find the amplitude that yields a target voltage rate
    Solve {
        /// Path to the control pattern
        #[arg(short, long)]
        pattern: String,

        /// Output frequency in Hz
        #[arg(short, long)]
        frequency: f64,

        /// Target voltage rate (fundamental relative to square-wave)
        #[arg(short, long)]
        target: f64,

        /// Root search method
        #[arg(long, default_value = "bisection", value_parser = ["bisection", "newton"])]
        method: String,

        /// Lower bracket for bisection
        #[arg(long, default_value_t = 0.0)]
        low: f64,

        /// Upper bracket for bisection
        #[arg(long, default_value_t = 1.0)]
        high: f64,

        /// Starting amplitude for Newton iteration
        #[arg(long, default_value_t = 0.5)]
        initial: f64,

        /// Accepted voltage-rate error
        #[arg(long, default_value_t = 1e-4)]
        tolerance: f64,

        /// Iteration budget
        #[arg(long, default_value_t = 50)]
        max_iterations: usize,

        /// Samples per cycle
        #[arg(long, default_value_t = 10_000)]
        samples: usize,

        /// Use the braking sub-pattern
        #[arg(long)]
        brake: bool,

        /// Directory of switch-angle table files
        #[arg(long)]
        tables: Option<String>,

        /// Output machine-readable JSON (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Inspect a switch-angle table file
    Table {
        /// Path to the table file
        #[arg(short, long)]
        input: String,

        /// Print every block
        #[arg(long)]
        blocks: bool,

        /// Output machine-readable JSON (no colored output)
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // A subscriber may already be installed when embedded.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn parse_source(source: Option<&str>) -> Option<AudioSource> {
    source.map(|s| match s {
        "motor_current" => AudioSource::MotorCurrent,
        _ => AudioSource::LineVoltage,
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Validate {
            pattern,
            program,
            motor,
            json,
        } => commands::validate::run(
            &commands::validate::ValidateArgs {
                pattern: pattern.as_deref(),
                program: program.as_deref(),
                motor: motor.as_deref(),
            },
            json,
        ),
        Commands::Render {
            pattern,
            program,
            output,
            settings,
            sample_rate,
            seed,
            source,
            tables,
            motor,
            json,
        } => {
            let cancel = Arc::new(AtomicBool::new(false));
            if let Err(e) = interrupt::cancel_on_ctrl_c(Arc::clone(&cancel)) {
                tracing::warn!(error = %e, "Ctrl-C will not cancel the render");
            }
            commands::render::run(
                &commands::render::RenderArgs {
                    pattern,
                    program,
                    output,
                    settings,
                    sample_rate,
                    seed,
                    source: parse_source(source.as_deref()),
                    tables,
                    motor,
                },
                json,
                &cancel,
            )
        }
        Commands::Analyze {
            pattern,
            frequency,
            samples,
            harmonics,
            brake,
            amplitude,
            fft,
            tables,
            json,
        } => commands::analyze::run(
            &commands::analyze::AnalyzeArgs {
                pattern,
                tables,
                frequency,
                samples,
                harmonics,
                brake,
                amplitude,
                fft,
            },
            json,
        ),
        Commands::Solve {
            pattern,
            frequency,
            target,
            method,
            low,
            high,
            initial,
            tolerance,
            max_iterations,
            samples,
            brake,
            tables,
            json,
        } => {
            let method = match method.as_str() {
                "newton" => SolveMethod::Newton { initial },
                _ => SolveMethod::Bisection { low, high },
            };
            commands::solve::run(
                &commands::solve::SolveArgs {
                    pattern,
                    tables,
                    frequency,
                    samples,
                    brake,
                    target,
                    method,
                    options: SolveOptions {
                        tolerance,
                        max_iterations,
                    },
                },
                json,
            )
        }
        Commands::Table {
            input,
            blocks,
            json,
        } => commands::table::run(&input, blocks, json),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", colored::Colorize::red("error"), e);
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_render() {
        let cli = Cli::try_parse_from([
            "vvvf",
            "render",
            "--pattern",
            "e231.yaml",
            "--program",
            "run.yaml",
            "-o",
            "out.wav",
            "--seed",
            "7",
            "--source",
            "motor_current",
        ])
        .unwrap();
        assert!(!cli.verbose);
        match cli.command {
            Commands::Render {
                pattern,
                output,
                seed,
                source,
                sample_rate,
                json,
                ..
            } => {
                assert_eq!(pattern, "e231.yaml");
                assert_eq!(output, "out.wav");
                assert_eq!(seed, Some(7));
                assert_eq!(sample_rate, None);
                assert_eq!(
                    parse_source(source.as_deref()),
                    Some(AudioSource::MotorCurrent)
                );
                assert!(!json);
            }
            _ => panic!("expected render command"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_source() {
        let result = Cli::try_parse_from([
            "vvvf",
            "render",
            "-p",
            "a.yaml",
            "--program",
            "b.yaml",
            "-o",
            "c.wav",
            "--source",
            "phase_current",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parses_analyze_defaults() {
        let cli = Cli::try_parse_from(["vvvf", "-v", "analyze", "-p", "a.yaml"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Analyze {
                frequency,
                samples,
                harmonics,
                brake,
                amplitude,
                ..
            } => {
                assert_eq!(frequency, 50.0);
                assert_eq!(samples, 10_000);
                assert_eq!(harmonics, 25);
                assert!(!brake);
                assert_eq!(amplitude, None);
            }
            _ => panic!("expected analyze command"),
        }
    }

    #[test]
    fn test_cli_parses_solve_newton() {
        let cli = Cli::try_parse_from([
            "vvvf",
            "solve",
            "-p",
            "a.yaml",
            "-f",
            "30",
            "-t",
            "0.4",
            "--method",
            "newton",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::Solve {
                frequency,
                target,
                method,
                initial,
                json,
                ..
            } => {
                assert_eq!(frequency, 30.0);
                assert_eq!(target, 0.4);
                assert_eq!(method, "newton");
                assert_eq!(initial, 0.5);
                assert!(json);
            }
            _ => panic!("expected solve command"),
        }
    }

    #[test]
    fn test_cli_validate_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["vvvf", "validate", "--program", "p.yaml", "--verbose"])
            .unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Validate {
                program: Some(_),
                pattern: None,
                ..
            }
        ));
    }
}
