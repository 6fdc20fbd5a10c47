//! Error taxonomy for the generation pipeline.
//!
//! Parse and read failures are fatal to the whole run; per-file write errors
//! are logged and accumulated; merge conflicts are warnings, not errors.
//! Render contract violations (internal invariants) assert immediately and
//! are deliberately absent here.

use crate::model::EntityKind;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("failed to parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("failed to read {}: {source}", path.display())]
    SourceRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    OutputWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parser backend unavailable: {0}")]
    Backend(String),

    #[error("worker thread panicked")]
    WorkerPanic,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type GenerateResult<T> = Result<T, GenerateError>;

/// Divergent duplicate declarations reconciled by precedence.
///
/// Non-fatal: generation proceeds with the chosen entity and the conflict is
/// reported alongside successful output.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeConflict {
    pub name: String,
    pub kind: EntityKind,
    pub chosen: PathBuf,
    pub rejected: Vec<PathBuf>,
}

impl std::fmt::Display for MergeConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "conflicting declarations of {} {}: kept {}, ignored {}",
            self.kind,
            self.name,
            self.chosen.display(),
            self.rejected
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_reports_path_and_reason() {
        let err = GenerateError::Parse {
            path: PathBuf::from("Sources/Foo.swift"),
            reason: "syntax tree unavailable".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Sources/Foo.swift"));
        assert!(msg.contains("syntax tree unavailable"));
    }

    #[test]
    fn merge_conflict_display_names_both_sides() {
        let conflict = MergeConflict {
            name: "Session".into(),
            kind: EntityKind::Class,
            chosen: PathBuf::from("a.swift"),
            rejected: vec![PathBuf::from("b.swift")],
        };
        let msg = conflict.to_string();
        assert!(msg.contains("class Session"));
        assert!(msg.contains("a.swift"));
        assert!(msg.contains("b.swift"));
    }
}
