use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while migrating or moving notes.
///
/// Only fatal conditions end up here. Unresolved titles, dangling note links
/// and failed folder deletions are logged and skipped instead.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("note body not found: {0}")]
    MissingNoteBody(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Evernote database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("report error: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed report row {line}: {message}")]
    Report { line: u64, message: String },

    /// The destination of a move already holds a file with the same name.
    #[error("destination already exists: {0}")]
    DuplicateOnMove(PathBuf),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, MigrationError>;

impl MigrationError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MigrationError::Io {
            path: path.into(),
            source,
        }
    }
}
