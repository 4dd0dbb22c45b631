//! The in-memory document model shared by the decoder and encoder.
//!
//! [`Document`] is the interchange point of the whole toolchain: the
//! reconstructor produces one, the encoder consumes one, and the JSON
//! representation is the user-facing artifact. Field order and the derived
//! `Row` labels are part of that representation, so serialization here is
//! written by hand where derive cannot express it.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq, SerializeStruct};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use sft_toolchain_schema::Column;

/// Test-header key/value pairs, in file order.
///
/// Serializes as a JSON object whose key order matches insertion order.
/// Re-inserting an existing key overwrites its value in place rather than
/// appending, so the header region never grows duplicate labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: Vec<(String, String)>,
}

impl Metadata {
    /// An empty header.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a key, preserving first-seen position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Look up a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Number of header pairs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the header is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Merge another header into this one. Keys already present keep their
    /// position and take the other header's value.
    pub fn update(&mut self, other: &Metadata) {
        for (k, v) in other.iter() {
            self.insert(k, v);
        }
    }
}

impl Serialize for Metadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Metadata {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MetadataVisitor;

        impl<'de> Visitor<'de> for MetadataVisitor {
            type Value = Metadata;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of header labels to values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Metadata, A::Error> {
                let mut metadata = Metadata::new();
                while let Some((key, value)) = access.next_entry::<String, String>()? {
                    metadata.insert(key, value);
                }
                Ok(metadata)
            }
        }

        deserializer.deserialize_map(MetadataVisitor)
    }
}

/// One sequence step: a command code plus its column values.
///
/// Empty columns serialize as empty strings, matching what the equipment's
/// own export shows for unused cells. `extra` collects operands the schema
/// and the heuristics both failed to place; it is omitted when empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Command code, e.g. `TH` or `Mv(P)`.
    #[serde(rename = "CMD")]
    pub cmd: String,
    /// Human-readable description column.
    #[serde(rename = "Description", default)]
    pub description: String,
    /// Target value, formula, or structural condition.
    #[serde(rename = "Condition", default)]
    pub condition: String,
    /// Measurement unit.
    #[serde(rename = "Unit", default)]
    pub unit: String,
    /// Parenthesised acceptance bounds.
    #[serde(rename = "Tolerance", default)]
    pub tolerance: String,
    /// Movement speed, where the command carries one.
    #[serde(rename = "Speed", default)]
    pub speed: String,
    /// Operands no rule could place, in encounter order.
    #[serde(rename = "Extra", default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<String>,
}

impl Step {
    /// A step with only its command code set.
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            ..Self::default()
        }
    }

    /// The field backing a schema column.
    pub fn column(&self, column: Column) -> &str {
        match column {
            Column::Description => &self.description,
            Column::Condition => &self.condition,
            Column::Unit => &self.unit,
            Column::Tolerance => &self.tolerance,
            Column::Speed => &self.speed,
        }
    }

    /// Mutable access to the field backing a schema column.
    pub fn column_mut(&mut self, column: Column) -> &mut String {
        match column {
            Column::Description => &mut self.description,
            Column::Condition => &mut self.condition,
            Column::Unit => &mut self.unit,
            Column::Tolerance => &mut self.tolerance,
            Column::Speed => &mut self.speed,
        }
    }
}

/// The derived label for step `index` (zero-based): `R00`, `R01`, ...
///
/// Labels are presentation only. They are recomputed from position on
/// every serialization and ignored, if present, on the way back in.
pub fn row_label(index: usize) -> String {
    format!("R{index:02}")
}

/// A fully reconstructed test program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    /// Header key/value pairs, in file order.
    pub metadata: Metadata,
    /// Sequence steps, in file order.
    pub steps: Vec<Step>,
}

// Serialization injects the positional "Row" label ahead of each step's own
// fields; deserialization accepts and discards it. Stored row labels would
// go stale the moment a step is inserted or removed, so they are never state.
impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Steps<'a>(&'a [Step]);

        struct LabeledStep<'a> {
            label: String,
            step: &'a Step,
        }

        impl Serialize for LabeledStep<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                #[derive(Serialize)]
                struct Repr<'a> {
                    #[serde(rename = "Row")]
                    row: &'a str,
                    #[serde(flatten)]
                    step: &'a Step,
                }
                Repr {
                    row: &self.label,
                    step: self.step,
                }
                .serialize(serializer)
            }
        }

        impl Serialize for Steps<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
                for (i, step) in self.0.iter().enumerate() {
                    seq.serialize_element(&LabeledStep {
                        label: row_label(i),
                        step,
                    })?;
                }
                seq.end()
            }
        }

        let mut doc = serializer.serialize_struct("Document", 2)?;
        doc.serialize_field("metadata", &self.metadata)?;
        doc.serialize_field("test_sequence", &Steps(&self.steps))?;
        doc.end()
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct ImportStep {
            #[serde(rename = "Row", default)]
            _row: Option<String>,
            #[serde(flatten)]
            step: Step,
        }

        #[derive(Deserialize)]
        struct Repr {
            #[serde(default)]
            metadata: Metadata,
            #[serde(rename = "test_sequence", default)]
            steps: Vec<ImportStep>,
        }

        let repr = Repr::deserialize(deserializer)?;
        Ok(Document {
            metadata: repr.metadata,
            steps: repr.steps.into_iter().map(|s| s.step).collect(),
        })
    }
}
