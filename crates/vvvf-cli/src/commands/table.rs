//! Table command implementation
//!
//! Decodes a switch-angle table file and prints its header and blocks.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use vvvf_engine::CustomPwmTable;

use super::json_output::{error_codes, JsonError};
use crate::input::parse_table_name;

/// Summary of one block.
#[derive(Debug, Clone, Serialize)]
pub struct BlockSummary {
    /// Block index.
    pub index: usize,
    /// Modulation index at which the block starts.
    pub modulation_index: f64,
    /// Level before the first switch.
    pub start_level: u8,
    /// `(level, angle)` pairs.
    pub switches: Vec<(u8, f64)>,
}

/// Output of `table --json`.
#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    /// File path.
    pub path: String,
    /// Library key parsed from the file name, if it follows the naming scheme.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Switches per block.
    pub switch_count: u8,
    /// Width of a modulation-index bucket.
    pub modulation_index_division: f64,
    /// Modulation index of the first block.
    pub minimum_modulation_index: f64,
    /// Number of blocks.
    pub block_count: usize,
    /// Blocks.
    pub blocks: Vec<BlockSummary>,
}

/// Decodes a table file.
pub fn summarize(path: &str) -> Result<TableSummary> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read table file: {}", path))?;
    let table = CustomPwmTable::decode(&bytes)
        .with_context(|| format!("Failed to decode table file: {}", path))?;

    let key = Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .and_then(parse_table_name)
        .map(|k| {
            format!(
                "{} {} pulses, alternative {}, {} levels",
                k.kind.as_str(),
                k.pulse_count,
                k.alternative,
                k.level.count()
            )
        });

    let blocks = table
        .blocks()
        .iter()
        .enumerate()
        .map(|(index, block)| BlockSummary {
            index,
            modulation_index: table.minimum_modulation_index()
                + index as f64 * table.modulation_index_division(),
            start_level: block.start_level,
            switches: block.switches.iter().map(|s| (s.level, s.angle)).collect(),
        })
        .collect();

    Ok(TableSummary {
        path: path.to_string(),
        key,
        switch_count: table.switch_count(),
        modulation_index_division: table.modulation_index_division(),
        minimum_modulation_index: table.minimum_modulation_index(),
        block_count: table.blocks().len(),
        blocks,
    })
}

/// Run the table command
///
/// # Returns
/// Exit code: 0 on success
pub fn run(path: &str, show_blocks: bool, json_output: bool) -> Result<ExitCode> {
    let summary = match summarize(path) {
        Ok(summary) => summary,
        Err(err) if json_output => {
            let error = JsonError::new(error_codes::TABLE, format!("{:#}", err));
            println!("{}", serde_json::to_string_pretty(&error)?);
            return Ok(ExitCode::from(1));
        }
        Err(err) => return Err(err),
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("{} {}", "Table:".cyan().bold(), summary.path);
    if let Some(key) = &summary.key {
        println!("{} {}", "Key:".dimmed(), key);
    }
    println!("{} {}", "Switches per block:".dimmed(), summary.switch_count);
    println!(
        "{} {} from M = {} in steps of {}",
        "Blocks:".dimmed(),
        summary.block_count,
        summary.minimum_modulation_index,
        summary.modulation_index_division
    );
    if show_blocks {
        for block in &summary.blocks {
            let switches: Vec<String> = block
                .switches
                .iter()
                .map(|(level, angle)| format!("{}@{:.4}", level, angle))
                .collect();
            println!(
                "  [{:>3}] M={:.3} start={} {}",
                block.index,
                block.modulation_index,
                block.start_level,
                switches.join(" ")
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}
