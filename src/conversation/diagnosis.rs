//! Candidate diagnoses

use super::heading;
use serde::{Deserialize, Serialize};

/// A candidate diagnosis, optionally assessed by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likelihood: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment: Option<String>,
}

impl Diagnosis {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            likelihood: None,
            assessment: None,
        }
    }

    #[must_use]
    pub fn with_likelihood(mut self, likelihood: impl Into<String>) -> Self {
        self.likelihood = Some(likelihood.into());
        self
    }

    #[must_use]
    pub fn with_assessment(mut self, assessment: impl Into<String>) -> Self {
        self.assessment = Some(assessment.into());
        self
    }

    fn to_markdown(&self, depth: usize) -> String {
        let mut parts = vec![heading(depth, &self.name)];
        if let Some(likelihood) = &self.likelihood {
            parts.push(format!("Likelihood: {likelihood}"));
        }
        if let Some(assessment) = &self.assessment {
            parts.push(assessment.clone());
        }
        parts.join("\n\n")
    }
}

pub(super) fn to_markdown(diagnoses: &[Diagnosis], depth: usize) -> String {
    diagnoses
        .iter()
        .map(|d| d.to_markdown(depth))
        .collect::<Vec<_>>()
        .join("\n\n")
}
