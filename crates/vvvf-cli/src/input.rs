//! Loading of pattern, program, motor and table files.
//!
//! Documents are JSON or YAML, chosen by extension. Switch-angle tables are
//! raw binary files named `{kind}_{pulse_count}_{alternative}_{level}.bin`,
//! for example `chm_7_0_2.bin`.

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use vvvf_engine::{TableKey, TableKind, TableLibrary};
use vvvf_spec::{
    load_document, Level, MasconProgram, MotorParameters, PatternConfig, SimulationSettings,
};
use walkdir::WalkDir;

/// Extension of switch-angle table files.
pub const TABLE_EXTENSION: &str = "bin";

fn load<T: DeserializeOwned>(path: &str, what: &str) -> Result<T> {
    load_document(Path::new(path))
        .with_context(|| format!("Failed to load {} file: {}", what, path))
}

/// Loads a control pattern.
pub fn load_pattern(path: &str) -> Result<PatternConfig> {
    load(path, "pattern")
}

/// Loads a mascon program.
pub fn load_program(path: &str) -> Result<MasconProgram> {
    load(path, "program")
}

/// Loads motor parameters.
pub fn load_motor(path: &str) -> Result<MotorParameters> {
    load(path, "motor")
}

/// Loads run settings.
pub fn load_settings(path: &str) -> Result<SimulationSettings> {
    load(path, "settings")
}

/// Parses a table file stem such as `she_5_1_3`.
pub fn parse_table_name(stem: &str) -> Option<TableKey> {
    let mut parts = stem.split('_');
    let kind = TableKind::parse(parts.next()?)?;
    let pulse_count = parts.next()?.parse().ok()?;
    let alternative = parts.next()?.parse().ok()?;
    let level = Level::try_from(parts.next()?.parse::<u8>().ok()?).ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(TableKey {
        kind,
        pulse_count,
        alternative,
        level,
    })
}

/// Loads every table file in a directory (not recursive).
///
/// Files whose names do not follow the table naming scheme are skipped.
pub fn load_table_dir(dir: &str) -> Result<TableLibrary> {
    let mut library = TableLibrary::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to read table directory: {}", dir))?;
        let path = entry.path();
        if !entry.file_type().is_file()
            || path.extension().and_then(|e| e.to_str()) != Some(TABLE_EXTENSION)
        {
            continue;
        }
        let Some(key) = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(parse_table_name)
        else {
            tracing::debug!(path = %path.display(), "skipping file with unrecognized table name");
            continue;
        };
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read table file: {}", path.display()))?;
        library
            .insert_bytes(key, &bytes)
            .with_context(|| format!("Invalid table file: {}", path.display()))?;
        tracing::debug!(path = %path.display(), ?key, "loaded table");
    }
    Ok(library)
}

/// Loads a table directory if one is given, else returns an empty library.
pub fn load_tables(dir: Option<&str>) -> Result<TableLibrary> {
    match dir {
        Some(dir) => load_table_dir(dir),
        None => Ok(TableLibrary::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_table_name() {
        assert_eq!(
            parse_table_name("chm_7_0_2"),
            Some(TableKey {
                kind: TableKind::Chm,
                pulse_count: 7,
                alternative: 0,
                level: Level::Two,
            })
        );
        assert_eq!(
            parse_table_name("she_11_2_3").map(|k| (k.kind, k.level)),
            Some((TableKind::She, Level::Three))
        );
        assert_eq!(parse_table_name("chm_7_0"), None);
        assert_eq!(parse_table_name("chm_7_0_4"), None);
        assert_eq!(parse_table_name("sync_7_0_2"), None);
        assert_eq!(parse_table_name("chm_7_0_2_x"), None);
    }

    #[test]
    fn test_missing_pattern_has_context() {
        let err = load_pattern("does/not/exist.yaml").unwrap_err();
        assert!(format!("{:#}", err).contains("does/not/exist.yaml"));
    }
}
