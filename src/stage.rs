//! Progress indicator shared between the turn pipeline and the UI

use serde::{Deserialize, Serialize};
use std::fmt;

/// What the assistant is currently doing.
///
/// `Loading` and `Ready` are idle indicators owned by the caller. The
/// remaining variants are pipeline stages and are emitted in the order they
/// are declared; `Diagnosis`/`RefineDiagnosis` and `Cite` are conditional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    /// Resources (the knowledge base) are not available yet
    #[default]
    #[serde(rename = "load")]
    Loading,
    Ready,
    Notes,
    Diagnosis,
    RefineDiagnosis,
    Respond,
    Cite,
}

impl Stage {
    /// Stable name used on the wire
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Loading => "load",
            Stage::Ready => "ready",
            Stage::Notes => "notes",
            Stage::Diagnosis => "diagnosis",
            Stage::RefineDiagnosis => "refineDiagnosis",
            Stage::Respond => "respond",
            Stage::Cite => "cite",
        }
    }

    /// Human-readable progress message
    pub fn label(self) -> &'static str {
        match self {
            Stage::Loading => "Loading resources",
            Stage::Ready => "Ready",
            Stage::Notes => "Taking notes",
            Stage::Diagnosis => "Looking up diagnoses",
            Stage::RefineDiagnosis => "Refining the diagnoses",
            Stage::Respond => "Responding",
            Stage::Cite => "Linking to references",
        }
    }

    /// True while a turn is in flight
    pub fn is_busy(self) -> bool {
        !matches!(self, Stage::Loading | Stage::Ready)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
