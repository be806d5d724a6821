//! Error types for the project model and its file adapter.

use std::path::PathBuf;

use thiserror::Error;

/// A textual ID that does not follow the `<prefix><suffix>` scheme.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseIdError {
    #[error("Unknown element prefix: \"{0}\"")]
    UnknownPrefix(String),
    #[error("Malformed element ID: \"{0}\"")]
    Malformed(String),
}

/// Errors raised while reading or writing a `.stlx` project file.
#[derive(Error, Debug)]
pub enum StlxError {
    #[error("Cannot access file \"{}\": {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed XML: {0}")]
    Parse(#[from] roxmltree::Error),
    #[error("{0}")]
    Format(String),
}

impl StlxError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }
}

/// Errors surfaced by project lifecycle operations.
#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("No project is open")]
    NoProject,
    #[error("The project has no file path yet")]
    NoPath,
    #[error("The file \"{}\" was changed by another program", .0.display())]
    Conflict(PathBuf),
    #[error("The file \"{}\" already exists", .0.display())]
    Exists(PathBuf),
    #[error(transparent)]
    File(#[from] StlxError),
}
