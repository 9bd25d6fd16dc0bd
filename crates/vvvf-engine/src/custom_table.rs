//! Precomputed switch-angle tables for CHM and SHE modulation.
//!
//! # Binary layout
//!
//! Little-endian, no padding:
//!
//! ```text
//! u8   switch_count
//! f64  modulation_index_division
//! f64  minimum_modulation_index
//! u32  block_count
//! block_count x {
//!     u8 start_level
//!     switch_count x { u8 output_level, f64 angle }
//! }
//! ```
//!
//! Each block covers one quarter period; the other three quarters follow by
//! symmetry (see [`CustomPwmTable::level_at`]).

use std::collections::HashMap;
use std::f64::consts::FRAC_PI_2;
use std::io::{Cursor, Read};
use std::sync::Arc;

use byteorder::{LittleEndian, ReadBytesExt};
use vvvf_spec::{Level, PulseKind};

use crate::error::{EngineError, EngineResult};
use crate::math::wrap_angle;

/// Size of the fixed header in bytes.
const HEADER_SIZE: usize = 1 + 8 + 8 + 4;

/// One switching instant inside a block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwitchEntry {
    /// Output level from this angle on.
    pub level: u8,
    /// Switch angle in radians, within [0, π/2].
    pub angle: f64,
}

/// Switching instants for one modulation-index bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchBlock {
    /// Level before the first switch.
    pub start_level: u8,
    /// Switches in ascending angle order.
    pub switches: Vec<SwitchEntry>,
}

impl SwitchBlock {
    /// Level at a folded (first-quarter) angle.
    pub fn level_at(&self, folded_angle: f64) -> u8 {
        let upper = self.switches.partition_point(|s| s.angle <= folded_angle);
        if upper == 0 {
            self.start_level
        } else {
            self.switches[upper - 1].level
        }
    }
}

/// A decoded switch-angle table.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomPwmTable {
    switch_count: u8,
    modulation_index_division: f64,
    minimum_modulation_index: f64,
    blocks: Vec<SwitchBlock>,
}

impl CustomPwmTable {
    /// Creates a table from blocks. Every block must hold `switch_count` switches.
    pub fn new(
        modulation_index_division: f64,
        minimum_modulation_index: f64,
        blocks: Vec<SwitchBlock>,
    ) -> EngineResult<Self> {
        let switch_count = blocks.first().map(|b| b.switches.len()).unwrap_or(0);
        if switch_count > u8::MAX as usize {
            return Err(EngineError::invalid_table(format!(
                "{} switches per block exceeds the format limit",
                switch_count
            )));
        }
        if let Some(i) = blocks.iter().position(|b| b.switches.len() != switch_count) {
            return Err(EngineError::invalid_table(format!(
                "block {} has {} switches, expected {}",
                i,
                blocks[i].switches.len(),
                switch_count
            )));
        }
        Ok(Self {
            switch_count: switch_count as u8,
            modulation_index_division,
            minimum_modulation_index,
            blocks,
        })
    }

    /// Decodes a table from its binary representation.
    pub fn decode(bytes: &[u8]) -> EngineResult<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(EngineError::invalid_table(format!(
                "{} bytes is shorter than the {} byte header",
                bytes.len(),
                HEADER_SIZE
            )));
        }

        let mut cursor = Cursor::new(bytes);
        let switch_count = cursor.read_u8()?;
        let modulation_index_division = cursor.read_f64::<LittleEndian>()?;
        let minimum_modulation_index = cursor.read_f64::<LittleEndian>()?;
        let block_count = cursor.read_u32::<LittleEndian>()? as usize;

        let block_size = 1 + switch_count as usize * 9;
        let remaining = bytes.len() - HEADER_SIZE;
        if block_count.saturating_mul(block_size) > remaining {
            return Err(EngineError::invalid_table(format!(
                "{} blocks of {} bytes need {} bytes, found {}",
                block_count,
                block_size,
                block_count.saturating_mul(block_size),
                remaining
            )));
        }

        let mut blocks = Vec::with_capacity(block_count);
        for _ in 0..block_count {
            let start_level = cursor.read_u8()?;
            let mut switches = Vec::with_capacity(switch_count as usize);
            for _ in 0..switch_count {
                let level = cursor.read_u8()?;
                let angle = cursor.read_f64::<LittleEndian>()?;
                switches.push(SwitchEntry { level, angle });
            }
            blocks.push(SwitchBlock {
                start_level,
                switches,
            });
        }

        let mut trailing = Vec::new();
        cursor.read_to_end(&mut trailing)?;
        if !trailing.is_empty() {
            tracing::debug!(bytes = trailing.len(), "ignoring trailing pulse table bytes");
        }

        Ok(Self {
            switch_count,
            modulation_index_division,
            minimum_modulation_index,
            blocks,
        })
    }

    /// Encodes the table into its binary representation.
    pub fn encode(&self) -> Vec<u8> {
        let block_size = 1 + self.switch_count as usize * 9;
        let mut out = Vec::with_capacity(HEADER_SIZE + self.blocks.len() * block_size);
        out.push(self.switch_count);
        out.extend_from_slice(&self.modulation_index_division.to_le_bytes());
        out.extend_from_slice(&self.minimum_modulation_index.to_le_bytes());
        out.extend_from_slice(&(self.blocks.len() as u32).to_le_bytes());
        for block in &self.blocks {
            out.push(block.start_level);
            for switch in &block.switches {
                out.push(switch.level);
                out.extend_from_slice(&switch.angle.to_le_bytes());
            }
        }
        out
    }

    /// Switches per block.
    pub fn switch_count(&self) -> u8 {
        self.switch_count
    }

    /// Width of one modulation-index bucket.
    pub fn modulation_index_division(&self) -> f64 {
        self.modulation_index_division
    }

    /// Modulation index of the first bucket.
    pub fn minimum_modulation_index(&self) -> f64 {
        self.minimum_modulation_index
    }

    /// All blocks.
    pub fn blocks(&self) -> &[SwitchBlock] {
        &self.blocks
    }

    /// A table without blocks or without switches cannot produce output.
    pub fn is_valid(&self) -> bool {
        !self.blocks.is_empty() && self.switch_count > 0
    }

    /// Index of the block serving a modulation index.
    pub fn block_index(&self, modulation_index: f64) -> usize {
        if self.blocks.is_empty() {
            return 0;
        }
        let last = self.blocks.len() - 1;
        let position =
            (modulation_index - self.minimum_modulation_index) / self.modulation_index_division;
        if position.is_nan() || position <= 0.0 {
            return 0;
        }
        if position.is_infinite() {
            return last;
        }
        (position.floor() as usize).min(last)
    }

    /// Level at a first-quarter angle for a modulation index, without symmetry.
    pub fn lookup(&self, modulation_index: f64, folded_angle: f64) -> u8 {
        if !self.is_valid() {
            return 0;
        }
        self.blocks[self.block_index(modulation_index)].level_at(folded_angle)
    }

    /// Level at any angle, applying quarter-period symmetry.
    ///
    /// The angle is folded into the first quarter, mirrored in odd quarters,
    /// and the level is inverted (`max_level - level`) in the second half period.
    pub fn level_at(&self, angle: f64, modulation_index: f64, max_level: u8) -> u8 {
        if !self.is_valid() {
            return 0;
        }
        let theta = wrap_angle(angle);
        let orthant = ((theta / FRAC_PI_2) as usize).min(3);
        let mut folded = theta - orthant as f64 * FRAC_PI_2;
        if orthant % 2 == 1 {
            folded = FRAC_PI_2 - folded;
        }
        let level = self.lookup(modulation_index, folded).min(max_level);
        if orthant >= 2 {
            max_level - level
        } else {
            level
        }
    }
}

/// Family of a tabulated pulse pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableKind {
    /// Current-harmonic minimization.
    Chm,
    /// Selective harmonic elimination.
    She,
}

impl TableKind {
    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TableKind::Chm => "chm",
            TableKind::She => "she",
        }
    }

    /// Parses a kind name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "chm" => Some(TableKind::Chm),
            "she" => Some(TableKind::She),
            _ => None,
        }
    }
}

/// Identifies one table in a library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableKey {
    /// Table family.
    pub kind: TableKind,
    /// Pulses per half period.
    pub pulse_count: u32,
    /// Alternative index.
    pub alternative: u32,
    /// Output level count.
    pub level: Level,
}

impl TableKey {
    /// Key for a tabulated pulse kind, or `None` for other kinds.
    pub fn for_pulse(kind: &PulseKind, level: Level) -> Option<Self> {
        match *kind {
            PulseKind::Chm { count, alternative } => Some(Self {
                kind: TableKind::Chm,
                pulse_count: count,
                alternative,
                level,
            }),
            PulseKind::She { count, alternative } => Some(Self {
                kind: TableKind::She,
                pulse_count: count,
                alternative,
                level,
            }),
            _ => None,
        }
    }
}

/// Read-only collection of tables shared by every run.
#[derive(Debug, Clone, Default)]
pub struct TableLibrary {
    tables: HashMap<TableKey, Arc<CustomPwmTable>>,
}

impl TableLibrary {
    /// Creates an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a table.
    pub fn insert(&mut self, key: TableKey, table: CustomPwmTable) {
        self.tables.insert(key, Arc::new(table));
    }

    /// Decodes and adds a table.
    pub fn insert_bytes(&mut self, key: TableKey, bytes: &[u8]) -> EngineResult<()> {
        let table = CustomPwmTable::decode(bytes)?;
        self.insert(key, table);
        Ok(())
    }

    /// Looks up a table.
    pub fn get(&self, key: &TableKey) -> Option<&CustomPwmTable> {
        self.tables.get(key).map(Arc::as_ref)
    }

    /// Table for a pulse kind, if it is tabulated and present.
    pub fn for_pulse(&self, kind: &PulseKind, level: Level) -> Option<&CustomPwmTable> {
        TableKey::for_pulse(kind, level).and_then(|key| self.get(&key))
    }

    /// Alternatives available for a pulse count, ascending.
    ///
    /// Only alternatives actually present in the library are listed.
    pub fn alternatives(&self, kind: TableKind, pulse_count: u32, level: Level) -> Vec<u32> {
        let mut found: Vec<u32> = self
            .tables
            .keys()
            .filter(|k| k.kind == kind && k.pulse_count == pulse_count && k.level == level)
            .map(|k| k.alternative)
            .collect();
        found.sort_unstable();
        found.dedup();
        found
    }

    /// Number of tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns true if the library holds no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::f64::consts::{FRAC_PI_4, PI};

    fn single_switch_table() -> CustomPwmTable {
        CustomPwmTable::new(
            0.1,
            0.0,
            vec![SwitchBlock {
                start_level: 0,
                switches: vec![SwitchEntry {
                    level: 1,
                    angle: FRAC_PI_4,
                }],
            }],
        )
        .unwrap()
    }

    fn two_block_table() -> CustomPwmTable {
        CustomPwmTable::new(
            0.5,
            0.2,
            vec![
                SwitchBlock {
                    start_level: 0,
                    switches: vec![
                        SwitchEntry { level: 1, angle: 0.3 },
                        SwitchEntry { level: 0, angle: 0.6 },
                        SwitchEntry { level: 1, angle: 1.0 },
                    ],
                },
                SwitchBlock {
                    start_level: 1,
                    switches: vec![
                        SwitchEntry { level: 0, angle: 0.2 },
                        SwitchEntry { level: 1, angle: 0.4 },
                        SwitchEntry { level: 1, angle: 1.2 },
                    ],
                },
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_single_switch_symmetry() {
        let table = single_switch_table();
        assert_eq!(table.level_at(0.0, 0.5, 1), 0);
        assert_eq!(table.level_at(FRAC_PI_4 + 0.01, 0.5, 1), 1);
        // Second quarter mirrors: π/2 folds onto π/2 - 0 = π/2, past the switch
        assert_eq!(table.level_at(PI / 2.0, 0.5, 1), 1);
        // Just before π mirrors onto ~0, before the switch
        assert_eq!(table.level_at(PI - 0.01, 0.5, 1), 0);
        // Second half inverts
        assert_eq!(table.level_at(PI + 0.01, 0.5, 1), 1);
        assert_eq!(table.level_at(PI + FRAC_PI_4 + 0.01, 0.5, 1), 0);
    }

    #[test]
    fn test_round_trip_is_byte_exact() {
        let table = two_block_table();
        let bytes = table.encode();
        assert_eq!(bytes.len(), HEADER_SIZE + 2 * (1 + 3 * 9));
        let decoded = CustomPwmTable::decode(&bytes).unwrap();
        assert_eq!(decoded, table);
        assert_eq!(decoded.encode(), bytes);
        assert_eq!(bytes[0], 3);
        assert_eq!(&bytes[1..9], &0.5f64.to_le_bytes());
        assert_eq!(&bytes[17..21], &2u32.to_le_bytes());
        assert_eq!(bytes[HEADER_SIZE], 0);
        assert_eq!(&bytes[HEADER_SIZE + 2..HEADER_SIZE + 10], &0.3f64.to_le_bytes());
    }

    #[test]
    fn test_block_index_clamps() {
        let table = two_block_table();
        assert_eq!(table.block_index(-5.0), 0);
        assert_eq!(table.block_index(0.2), 0);
        assert_eq!(table.block_index(0.69), 0);
        assert_eq!(table.block_index(0.7), 1);
        assert_eq!(table.block_index(100.0), 1);
        assert_eq!(table.block_index(f64::NAN), 0);
    }

    #[test]
    fn test_zero_division_selects_edge_blocks() {
        let blocks = two_block_table().blocks().to_vec();
        let table = CustomPwmTable::new(0.0, 0.2, blocks).unwrap();
        assert_eq!(table.block_index(0.9), 1);
        assert_eq!(table.block_index(0.1), 0);
        assert_eq!(table.block_index(0.2), 0);
        assert_eq!(table.lookup(0.9, 0.3), 0);
        assert_eq!(table.lookup(0.1, 0.3), 1);
    }

    #[test]
    fn test_lookup_uses_last_entry_not_past_angle() {
        let table = two_block_table();
        assert_eq!(table.lookup(0.2, 0.1), 0);
        assert_eq!(table.lookup(0.2, 0.3), 1);
        assert_eq!(table.lookup(0.2, 0.59), 1);
        assert_eq!(table.lookup(0.2, 0.6), 0);
        assert_eq!(table.lookup(0.9, 0.1), 1);
        assert_eq!(table.lookup(0.9, 0.3), 0);
    }

    #[test]
    fn test_truncated_table_is_rejected() {
        let bytes = two_block_table().encode();
        let err = CustomPwmTable::decode(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTable { .. }));
        assert!(CustomPwmTable::decode(&bytes[..5]).is_err());
    }

    #[test]
    fn test_empty_table_degrades_to_zero() {
        let table = CustomPwmTable::new(0.1, 0.0, vec![]).unwrap();
        assert!(!table.is_valid());
        assert_eq!(table.level_at(1.0, 0.5, 1), 0);
        assert_eq!(table.level_at(4.0, 0.5, 1), 0);
    }

    #[test]
    fn test_mismatched_block_rejected() {
        let blocks = vec![
            SwitchBlock {
                start_level: 0,
                switches: vec![SwitchEntry { level: 1, angle: 0.1 }],
            },
            SwitchBlock {
                start_level: 0,
                switches: vec![],
            },
        ];
        assert!(CustomPwmTable::new(0.1, 0.0, blocks).is_err());
    }

    #[test]
    fn test_library_alternatives() {
        let mut library = TableLibrary::new();
        for alternative in [2, 0] {
            library.insert(
                TableKey {
                    kind: TableKind::Chm,
                    pulse_count: 7,
                    alternative,
                    level: Level::Two,
                },
                single_switch_table(),
            );
        }
        library.insert(
            TableKey {
                kind: TableKind::She,
                pulse_count: 7,
                alternative: 1,
                level: Level::Two,
            },
            single_switch_table(),
        );

        assert_eq!(library.alternatives(TableKind::Chm, 7, Level::Two), vec![0, 2]);
        assert_eq!(library.alternatives(TableKind::Chm, 7, Level::Three), Vec::<u32>::new());
        assert!(library
            .for_pulse(
                &PulseKind::She {
                    count: 7,
                    alternative: 1
                },
                Level::Two
            )
            .is_some());
        assert!(library.for_pulse(&PulseKind::Async, Level::Two).is_none());
    }
}
