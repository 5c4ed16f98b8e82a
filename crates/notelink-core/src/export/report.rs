//! Per-unit export results

use std::path::PathBuf;

use serde::Serialize;

use super::error::{ErrorKind, ExportError};
use super::render::DocumentKind;
use crate::models::NoteId;
use crate::resolver::ResolutionMiss;

/// Result of exporting one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnitOutcome {
    /// A file was written
    Written { note: NoteId, path: PathBuf },
    /// The external renderer delivered the document itself
    Delivered { note: NoteId, kind: DocumentKind },
    /// The user declined to pick a destination
    Skipped { note: NoteId, reason: String },
    Failed {
        note: NoteId,
        kind: ErrorKind,
        message: String,
    },
}

impl UnitOutcome {
    pub fn failed(note: NoteId, error: &ExportError) -> Self {
        UnitOutcome::Failed {
            note,
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    pub fn note(&self) -> NoteId {
        match self {
            UnitOutcome::Written { note, .. }
            | UnitOutcome::Delivered { note, .. }
            | UnitOutcome::Skipped { note, .. }
            | UnitOutcome::Failed { note, .. } => *note,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, UnitOutcome::Failed { .. })
    }
}

/// Outcome list of one export operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub outcomes: Vec<UnitOutcome>,
    /// Links whose targets could not be resolved
    pub misses: Vec<ResolutionMiss>,
    /// Resolved copy kept as a new note
    pub kept_note: Option<NoteId>,
    /// Temporary notes retained because their content was not written
    pub retained: Vec<NoteId>,
}

impl ExportReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, outcome: UnitOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn merge(&mut self, other: ExportReport) {
        self.outcomes.extend(other.outcomes);
        self.misses.extend(other.misses);
        self.retained.extend(other.retained);
        if other.kept_note.is_some() {
            self.kept_note = other.kept_note;
        }
    }

    /// Paths of every written file
    pub fn written(&self) -> Vec<&PathBuf> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                UnitOutcome::Written { path, .. } => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn failures(&self) -> Vec<&UnitOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure()).collect()
    }

    pub fn is_success(&self) -> bool {
        !self.outcomes.iter().any(UnitOutcome::is_failure)
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty() && self.kept_note.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_json() {
        let outcome = UnitOutcome::failed(NoteId(3), &ExportError::Cancelled);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["kind"], "cancelled");
        assert_eq!(json["note"], 3);
    }

    #[test]
    fn test_report_queries() {
        let mut report = ExportReport::new();
        assert!(report.is_empty());

        report.push(UnitOutcome::Written {
            note: NoteId(1),
            path: PathBuf::from("/out/a.md"),
        });
        report.push(UnitOutcome::failed(NoteId(2), &ExportError::Cancelled));

        let mut other = ExportReport::new();
        other.kept_note = Some(NoteId(9));
        report.merge(other);

        assert_eq!(report.written(), vec![&PathBuf::from("/out/a.md")]);
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.failures()[0].note(), NoteId(2));
        assert!(!report.is_success());
        assert_eq!(report.kept_note, Some(NoteId(9)));
    }
}
