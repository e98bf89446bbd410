//! Turn failure type

use crate::engine::EngineError;
use crate::stage::Stage;
use std::fmt;
use thiserror::Error;

/// Appended to every user-facing failure message
pub const REMEDIATION_HINT: &str =
    "Please try again, and change your message if the problem persists.";

/// Engine operation invoked by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    RewriteStatement,
    BuildNotes,
    InitialDiagnosis,
    RefineDiagnosis,
    Respond,
    Cite,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::RewriteStatement => "rewrite_statement",
            Operation::BuildNotes => "build_notes",
            Operation::InitialDiagnosis => "initial_diagnosis",
            Operation::RefineDiagnosis => "refine_diagnosis",
            Operation::Respond => "respond",
            Operation::Cite => "cite",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An engine call failed and the turn was abandoned at `stage`
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{operation} failed during {stage} stage: {source}")]
pub struct StageFailure {
    pub stage: Stage,
    pub operation: Operation,
    pub source: EngineError,
}

impl StageFailure {
    pub fn new(stage: Stage, operation: Operation, source: EngineError) -> Self {
        Self {
            stage,
            operation,
            source,
        }
    }

    /// Message shown to the user in the error banner
    pub fn user_message(&self) -> String {
        format!("Error: {} {REMEDIATION_HINT}", self.source)
    }
}
