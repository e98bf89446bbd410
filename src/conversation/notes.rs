//! Structured clinical notes

use super::heading;
use serde::{Deserialize, Serialize};

/// One titled group of note entries (e.g. "Symptoms", "History")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteSection {
    pub title: String,
    pub entries: Vec<String>,
}

/// Notes derived from the patient's statements, in insertion order
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClinicalNotes {
    sections: Vec<NoteSection>,
}

impl ClinicalNotes {
    pub fn sections(&self) -> &[NoteSection] {
        &self.sections
    }

    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(|s| s.entries.is_empty())
    }

    /// Merge `entries` into the section called `title`, creating it if needed.
    ///
    /// Entries already present in the section are skipped.
    pub fn upsert(&mut self, title: &str, entries: impl IntoIterator<Item = String>) {
        let index = match self.sections.iter().position(|s| s.title == title) {
            Some(index) => index,
            None => {
                self.sections.push(NoteSection {
                    title: title.to_string(),
                    entries: Vec::new(),
                });
                self.sections.len() - 1
            }
        };

        let section = &mut self.sections[index];
        for entry in entries {
            if !section.entries.contains(&entry) {
                section.entries.push(entry);
            }
        }
    }

    pub fn to_markdown(&self, depth: usize) -> String {
        self.sections
            .iter()
            .filter(|s| !s.entries.is_empty())
            .map(|s| {
                let items: Vec<String> = s.entries.iter().map(|e| format!("- {e}")).collect();
                format!("{}\n\n{}", heading(depth, &s.title), items.join("\n"))
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
