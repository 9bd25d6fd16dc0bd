//! Solve command implementation
//!
//! Searches for the amplitude that gives a target voltage rate.

use std::process::ExitCode;

use anyhow::{Context, Result};
use colored::Colorize;
use vvvf_engine::{
    solve_amplitude, AnalysisContext, ControlState, CycleRequest, SolveMethod, SolveOptions,
};
use vvvf_spec::SimulationSettings;

use super::json_output::SolveOutput;
use crate::input::{load_pattern, load_tables};

/// Options of the solve command.
#[derive(Debug, Clone)]
pub struct SolveArgs {
    /// Pattern file.
    pub pattern: String,
    /// Directory of switch-angle tables.
    pub tables: Option<String>,
    /// Output frequency in Hz.
    pub frequency: f64,
    /// Samples per cycle.
    pub samples: usize,
    /// Use the braking sub-pattern.
    pub brake: bool,
    /// Target voltage rate.
    pub target: f64,
    /// Root search.
    pub method: SolveMethod,
    /// Iteration limits.
    pub options: SolveOptions,
}

/// Runs the amplitude search described by `args`.
pub fn solve(args: &SolveArgs) -> Result<SolveOutput> {
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
        amplitude: None,
    };

    let result = solve_amplitude(
        &ControlState::default(),
        &context,
        &request,
        args.target,
        args.method,
        args.options,
    )
    .context("Amplitude search failed")?;

    Ok(SolveOutput {
        frequency: args.frequency,
        target_rate: args.target,
        result,
    })
}

/// Run the solve command
///
/// # Returns
/// Exit code: 0 if the search converged, 1 otherwise
pub fn run(args: &SolveArgs, json_output: bool) -> Result<ExitCode> {
    let output = solve(args)?;
    let converged = output.result.converged;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!(
            "{} rate {} at {} Hz",
            "Solving:".cyan().bold(),
            args.target,
            args.frequency
        );
        println!(
            "{} {} iteration(s), residual {:.2e}",
            "Search:".dimmed(),
            output.result.iterations,
            output.result.residual
        );
        if converged {
            println!(
                "\n{} amplitude = {:.6}",
                "SUCCESS".green().bold(),
                output.result.value
            );
        } else {
            println!(
                "\n{} best amplitude = {:.6} (not converged)",
                "FAILED".red().bold(),
                output.result.value
            );
        }
    }

    Ok(if converged {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}
