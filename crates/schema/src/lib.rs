//! Command schema tables for spring-force tester files.
//!
//! Defines the static registry mapping a test-sequence command code (e.g.
//! `ZF`, `TH`, `Mv(P)`) to its human-readable description, the ordered list
//! of operand roles it consumes, and its trailing padding convention. The
//! table is the single source of truth consulted by both the semantic
//! reconstructor (how many following cells to consume, and into which role)
//! and the encoder (how many cells to emit, and in which order) — keeping the
//! two directions of the codec symmetric by construction.
//!
//! The table is an immutable value with process-wide lifetime: [`builtin`]
//! constructs it once behind a `OnceLock` and hands out `&'static` references.

#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Current format version for the schema table JSON shape.
pub const TABLE_FORMAT_VERSION: &str = "0.1.0";

/// Semantic slot a step operand cell is assigned to.
///
/// `Message`, `LoopSpec`, and `PositionValue` are distinct roles in the wire
/// format but all land in a step's `condition` column on export — the
/// distinction drives encoding order and text formatting, not storage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum OperandRole {
    /// Human-readable step description cell (always first).
    Description,
    /// Trigger or input value (force threshold, delay, formula).
    Condition,
    /// Measurement unit (`mm`, `Sec`, `N`, `kgf`, …).
    Unit,
    /// Target value, possibly with a parenthesised range (`120(119,121)`).
    Tolerance,
    /// Movement or measurement speed.
    Speed,
    /// Free-text operator message (`PMsg`, `PUi`).
    Message,
    /// Loop target and count (`R03,3`).
    LoopSpec,
    /// Position operand of a move command; exported as the condition.
    PositionValue,
}

impl OperandRole {
    /// The export column this role's value lands in.
    pub fn column(self) -> Column {
        match self {
            OperandRole::Description => Column::Description,
            OperandRole::Condition
            | OperandRole::Message
            | OperandRole::LoopSpec
            | OperandRole::PositionValue => Column::Condition,
            OperandRole::Unit => Column::Unit,
            OperandRole::Tolerance => Column::Tolerance,
            OperandRole::Speed => Column::Speed,
        }
    }
}

/// Export columns of a reconstructed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    /// `Description` column.
    Description,
    /// `Condition` column.
    Condition,
    /// `Unit` column.
    Unit,
    /// `Tolerance` column.
    Tolerance,
    /// `Speed` column.
    Speed,
}

/// Metadata for a single test-sequence command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandEntry {
    /// Wire-format command code (e.g., `"TH"`, `"Mv(P)"`).
    pub code: String,
    /// Canonical human-readable description (e.g., `"Search Contact"`).
    pub description: String,
    /// Ordered operand roles this command consumes after its code cell.
    pub roles: Vec<OperandRole>,
    /// Number of zero bytes emitted after the last operand cell (0 or 16).
    #[serde(default)]
    pub padding_after: usize,
}

/// Top-level container for the command schema table.
///
/// Consulted identically by the reconstructor and the encoder; constructed
/// once and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaTable {
    /// Table format version for compatibility checks.
    #[serde(default = "default_format_version")]
    pub format_version: String,
    /// All known command entries, in registry order.
    pub commands: Vec<CommandEntry>,

    /// Cached map from command code → index into `commands`.
    #[serde(skip)]
    cmd_map: OnceLock<HashMap<String, usize>>,
}

fn default_format_version() -> String {
    TABLE_FORMAT_VERSION.to_string()
}

impl SchemaTable {
    /// Create a new `SchemaTable` from a list of command entries.
    /// The lookup cache is initialized lazily on first access.
    pub fn new(commands: Vec<CommandEntry>) -> Self {
        Self {
            format_version: default_format_version(),
            commands,
            cmd_map: OnceLock::new(),
        }
    }

    fn cmd_map(&self) -> &HashMap<String, usize> {
        self.cmd_map.get_or_init(|| {
            self.commands
                .iter()
                .enumerate()
                .map(|(i, c)| (c.code.clone(), i))
                .collect()
        })
    }

    /// Look up a `CommandEntry` by its command code (e.g., `"TH"`).
    /// Uses a cached `HashMap` for O(1) lookup.
    pub fn entry(&self, code: &str) -> Option<&CommandEntry> {
        self.cmd_map().get(code).map(|&i| &self.commands[i])
    }

    /// Whether `code` is a registered command.
    pub fn is_known(&self, code: &str) -> bool {
        self.cmd_map().contains_key(code)
    }
}

macro_rules! entry {
    ($code:expr, $desc:expr, [$($role:ident),*], pad $pad:expr) => {
        CommandEntry {
            code: $code.to_string(),
            description: $desc.to_string(),
            roles: vec![$(OperandRole::$role),*],
            padding_after: $pad,
        }
    };
}

/// The built-in command vocabulary observed across spring-force tester
/// captures. Constructed once; callers share the `&'static` reference.
pub fn builtin() -> &'static SchemaTable {
    static TABLE: OnceLock<SchemaTable> = OnceLock::new();
    TABLE.get_or_init(|| {
        SchemaTable::new(vec![
            entry!("ZF", "Zero Force", [Description], pad 16),
            entry!("ZD", "Zero Displacement", [Description], pad 16),
            entry!("TH", "Search Contact", [Description, Condition, Unit, Tolerance], pad 0),
            entry!("FL(P)", "Measure Free Length", [Description, Unit, Tolerance], pad 0),
            entry!("Mv(P)", "Move to Position", [Description, PositionValue, Unit, Tolerance], pad 0),
            entry!("Fr(P)", "Force @ Position", [Description, Unit, Tolerance], pad 0),
            entry!("TD", "Time Delay", [Description, Condition, Unit], pad 0),
            entry!("Scrag", "Scragging", [Description, LoopSpec], pad 16),
            entry!("PMsg", "User Message", [Description, Message], pad 16),
            entry!("LP", "Loop", [Description, LoopSpec], pad 16),
            entry!("Calc", "Formula Calculation", [Description, Condition], pad 0),
            entry!("SR", "Spring Rate", [Description, Condition, Unit, Tolerance], pad 0),
            entry!("PkF", "Measure Peak Force", [Description, Unit, Tolerance], pad 0),
            entry!("PkP", "Measure Peak Position", [Description, Unit, Tolerance], pad 0),
            entry!("Po(F)", "Position at Force", [Description, Unit, Tolerance], pad 0),
            entry!("Po(PkF)", "Position at Peak Force", [Description, Unit, Tolerance], pad 0),
            entry!("Mv(F)", "Move to Force", [Description, Condition, Unit, Tolerance], pad 0),
            entry!("PUi", "User Input", [Description, Message], pad 0),
        ])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_lookup_by_code() {
        let table = builtin();
        let th = table.entry("TH").expect("TH registered");
        assert_eq!(th.description, "Search Contact");
        assert_eq!(
            th.roles,
            vec![
                OperandRole::Description,
                OperandRole::Condition,
                OperandRole::Unit,
                OperandRole::Tolerance
            ]
        );
        assert_eq!(th.padding_after, 0);
    }

    #[test]
    fn builtin_codes_are_unique() {
        let table = builtin();
        let mut seen = std::collections::HashSet::new();
        for cmd in &table.commands {
            assert!(seen.insert(&cmd.code), "duplicate code {}", cmd.code);
        }
    }

    #[test]
    fn padded_commands_declare_16_zero_bytes() {
        let table = builtin();
        for code in ["ZF", "ZD", "Scrag", "PMsg", "LP"] {
            assert_eq!(table.entry(code).unwrap().padding_after, 16, "{code}");
        }
        for code in ["TH", "Mv(P)", "TD", "FL(P)"] {
            assert_eq!(table.entry(code).unwrap().padding_after, 0, "{code}");
        }
    }

    #[test]
    fn every_entry_starts_with_description() {
        for cmd in &builtin().commands {
            assert_eq!(
                cmd.roles.first(),
                Some(&OperandRole::Description),
                "{} must lead with a description cell",
                cmd.code
            );
        }
    }

    #[test]
    fn unknown_code_is_none() {
        assert!(builtin().entry("XX").is_none());
        assert!(!builtin().is_known("XX"));
    }

    #[test]
    fn role_columns() {
        assert_eq!(OperandRole::PositionValue.column(), Column::Condition);
        assert_eq!(OperandRole::Message.column(), Column::Condition);
        assert_eq!(OperandRole::LoopSpec.column(), Column::Condition);
        assert_eq!(OperandRole::Tolerance.column(), Column::Tolerance);
        assert_eq!(OperandRole::Speed.column(), Column::Speed);
    }

    #[test]
    fn table_serde_roundtrip() {
        let json = serde_json::to_string(builtin()).unwrap();
        let table: SchemaTable = serde_json::from_str(&json).unwrap();
        assert_eq!(table.commands.len(), builtin().commands.len());
        assert_eq!(table.entry("LP").unwrap().description, "Loop");
    }
}
