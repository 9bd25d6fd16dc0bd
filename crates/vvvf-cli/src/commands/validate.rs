//! Validate command implementation
//!
//! Loads pattern, program and motor documents and reports validation errors
//! and warnings.

use std::process::ExitCode;

use anyhow::{bail, Result};
use colored::Colorize;
use vvvf_spec::validation::{validate_motor, validate_pattern, validate_program};
use vvvf_spec::ValidationResult;

use super::json_output::{DocumentReport, ValidateOutput};
use crate::input::{load_motor, load_pattern, load_program};

/// Documents to validate.
#[derive(Debug, Clone, Default)]
pub struct ValidateArgs<'a> {
    /// Pattern file.
    pub pattern: Option<&'a str>,
    /// Mascon program file.
    pub program: Option<&'a str>,
    /// Motor parameter file.
    pub motor: Option<&'a str>,
}

/// Run the validate command
///
/// # Returns
/// Exit code: 0 if every document is valid, 1 otherwise
pub fn run(args: &ValidateArgs<'_>, json_output: bool) -> Result<ExitCode> {
    if args.pattern.is_none() && args.program.is_none() && args.motor.is_none() {
        bail!("nothing to validate: pass --pattern, --program or --motor");
    }

    let reports = collect_reports(args);
    let ok = reports.iter().all(|r| r.ok);

    if json_output {
        let output = ValidateOutput {
            ok,
            documents: reports,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for report in &reports {
            print_report(report);
        }
        let errors: usize = reports.iter().map(|r| r.errors.len()).sum();
        if ok {
            println!("\n{} All documents are valid", "SUCCESS".green().bold());
        } else {
            println!("\n{} {} error(s)", "FAILED".red().bold(), errors);
        }
    }

    Ok(if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

/// Loads and validates every document named in `args`.
pub fn collect_reports(args: &ValidateArgs<'_>) -> Vec<DocumentReport> {
    let mut reports = Vec::new();
    if let Some(path) = args.pattern {
        reports.push(report("pattern", path, || {
            load_pattern(path).map(|p| validate_pattern(&p))
        }));
    }
    if let Some(path) = args.program {
        reports.push(report("program", path, || {
            load_program(path).map(|p| validate_program(&p))
        }));
    }
    if let Some(path) = args.motor {
        reports.push(report("motor", path, || {
            load_motor(path).map(|m| validate_motor(&m))
        }));
    }
    reports
}

fn report(
    kind: &'static str,
    path: &str,
    validate: impl FnOnce() -> Result<ValidationResult>,
) -> DocumentReport {
    match validate() {
        Ok(result) => DocumentReport::from_validation(kind, path, &result),
        Err(err) => DocumentReport::load_failure(kind, path, format!("{:#}", err)),
    }
}

fn print_report(report: &DocumentReport) {
    println!("{} {} {}", "Validating:".cyan().bold(), report.kind, report.path);
    for error in &report.errors {
        let location = error
            .path
            .as_ref()
            .map(|p| format!(" at {}", p))
            .unwrap_or_default();
        println!(
            "  {} [{}]{}: {}",
            "x".red(),
            error.code,
            location.dimmed(),
            error.message
        );
    }
    for warning in &report.warnings {
        let location = warning
            .path
            .as_ref()
            .map(|p| format!(" at {}", p))
            .unwrap_or_default();
        println!(
            "  {} [{}]{}: {}",
            "!".yellow(),
            warning.code,
            location.dimmed(),
            warning.message
        );
    }
    if report.ok {
        println!("  {} ok", "✓".green());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> String {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_valid_and_invalid_documents() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = write_file(
            &dir,
            "pattern.yaml",
            r#"
accelerate:
  pulses:
    - from_frequency: 0.0
      pulse: { kind: { type: async } }
      amplitude: { normal: { type: constant, value: 0.5 } }
braking:
  pulses: []
"#,
        );
        let motor = write_file(&dir, "motor.json", r#"{ "inertia": 2.0 }"#);

        let reports = collect_reports(&ValidateArgs {
            pattern: Some(&pattern),
            program: None,
            motor: Some(&motor),
        });
        assert_eq!(reports.len(), 2);
        assert!(!reports[0].ok);
        assert!(reports[0].errors.iter().any(|e| e.code == "E101"));
        assert!(reports[1].ok);
    }

    #[test]
    fn test_unreadable_document_is_reported() {
        let reports = collect_reports(&ValidateArgs {
            program: Some("missing/program.yaml"),
            ..ValidateArgs::default()
        });
        assert_eq!(reports.len(), 1);
        assert!(!reports[0].ok);
        assert_eq!(reports[0].errors[0].code, "CLI_001");
    }

    #[test]
    fn test_nothing_to_validate() {
        assert!(run(&ValidateArgs::default(), true).is_err());
    }
}
