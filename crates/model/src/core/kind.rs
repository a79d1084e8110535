use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// The catalog entity a source document carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Sets,
    Cards,
}

#[derive(Debug, Error)]
#[error("Unknown record kind '{0}', expected one of: sets, cards")]
pub struct UnknownRecordKind(pub String);

impl RecordKind {
    pub const ALL: [RecordKind; 2] = [RecordKind::Sets, RecordKind::Cards];

    /// Stable key used by the import registry and in run ids.
    pub fn key(&self) -> &'static str {
        match self {
            RecordKind::Sets => "sets",
            RecordKind::Cards => "cards",
        }
    }

    /// Label used in artifact file names (`failed_<label>_<ts>.json`).
    pub fn artifact_label(&self) -> &'static str {
        self.key()
    }

    /// Relational table holding this kind of record.
    pub fn table_name(&self) -> &'static str {
        match self {
            RecordKind::Sets => "card_sets",
            RecordKind::Cards => "cards",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for RecordKind {
    type Err = UnknownRecordKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sets" | "set" => Ok(RecordKind::Sets),
            "cards" | "card" => Ok(RecordKind::Cards),
            other => Err(UnknownRecordKind(other.to_string())),
        }
    }
}
