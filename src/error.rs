//! Error types for note loading and graph construction.
//!
//! Dangling links are not errors: they are reported as warnings on the
//! build report and never abort a build.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum NotesError {
    #[error("failed to read notes directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("failed to read note {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Note identities must arrive as `0, 1, 2, ...` in source order.
    #[error("note identity out of order: expected index {expected}, got {found}")]
    NonDenseIndex { expected: usize, found: usize },
    #[error("references supplied for unknown note index {0}")]
    UnknownNote(usize),
    #[error(transparent)]
    Source(#[from] NotesError),
}

pub type Result<T> = std::result::Result<T, GraphError>;
