//! Storage errors
//!
//! Every variant carries the path it concerns, so a logged failure says
//! which position file is at fault.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Why a write to the position store failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteFailure {
    Denied,
    NoSpace,
    Other,
}

impl WriteFailure {
    fn classify(error: &io::Error) -> Self {
        if error.kind() == io::ErrorKind::PermissionDenied {
            return WriteFailure::Denied;
        }
        let msg = error.to_string().to_lowercase();
        if ["no space left", "disk full", "quota exceeded", "not enough space"]
            .iter()
            .any(|needle| msg.contains(needle))
        {
            WriteFailure::NoSpace
        } else {
            WriteFailure::Other
        }
    }
}

impl fmt::Display for WriteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteFailure::Denied => write!(f, "permission denied"),
            WriteFailure::NoSpace => write!(f, "out of disk space"),
            WriteFailure::Other => write!(f, "I/O error"),
        }
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Could not create position directory '{path}': {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not read positions from '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not save positions to '{path}' ({failure}): {source}")]
    Write {
        path: PathBuf,
        failure: WriteFailure,
        #[source]
        source: io::Error,
    },

    /// The file did not hold a JSON object of strings and was moved aside
    #[error("Position store at '{path}' was unreadable ({details}); it was moved to '{backup_path}'")]
    Corrupt {
        path: PathBuf,
        backup_path: PathBuf,
        details: String,
    },

    #[error("Could not move '{from}' to '{to}': {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not encode positions: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StorageError {
    /// A failed write to `path`, classified by cause
    pub fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StorageError::Write {
            path: path.into(),
            failure: WriteFailure::classify(&source),
            source,
        }
    }

    /// Whether the reader can keep going with in-memory state only
    pub fn is_recoverable(&self) -> bool {
        match self {
            StorageError::Write { failure, .. } => *failure != WriteFailure::Other,
            StorageError::Corrupt { .. } => true,
            _ => false,
        }
    }

    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::Write {
                failure: WriteFailure::NoSpace,
                ..
            } => Some("Free up disk space; positions are kept in memory until then."),
            StorageError::Write {
                failure: WriteFailure::Denied,
                ..
            }
            | StorageError::Directory { .. } => {
                Some("Check permissions on the data directory (see `folio config show`).")
            }
            StorageError::Corrupt { .. } => {
                Some("Saved reading positions were reset. The old file is kept next to the new one.")
            }
            _ => None,
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
