//! Error types for summarizing a directory.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors. Any of these aborts the run before output is written.
#[derive(Debug, Error)]
pub enum FosumError {
    /// Root path does not exist.
    #[error("cannot access '{path}': No such file or directory")]
    RootNotFound { path: PathBuf },

    /// Root path is not a directory.
    #[error("'{path}' is not a directory")]
    NotADirectory { path: PathBuf },

    /// Root exists but cannot be opened.
    #[error("cannot read '{path}': {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid or contradictory configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// An ignore or skip pattern is not a valid glob.
    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// The budget cannot hold even the outline and the statistics footer.
    #[error(
        "budget of {budget} bytes is too small, the outline, omission notices and statistics need {required} bytes"
    )]
    BudgetTooSmall { budget: usize, required: usize },

    /// The run was interrupted.
    #[error("interrupted")]
    Cancelled,

    /// The report could not be written.
    #[error("cannot write '{path}': {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FosumError {
    /// Wrap an I/O error on the root, classifying not-found separately.
    pub fn root(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::RootNotFound { path },
            _ => Self::RootUnreadable { path, source },
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::RootNotFound { .. }
            | Self::NotADirectory { .. }
            | Self::RootUnreadable { .. }
            | Self::Output { .. } => 1,
            Self::InvalidConfig { .. }
            | Self::InvalidPattern { .. }
            | Self::BudgetTooSmall { .. } => 2,
            Self::Cancelled => 130,
        }
    }
}

/// Non-fatal error attached to a single entry. The walk continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryError {
    #[error("permission denied")]
    PermissionDenied,

    #[error("cyclic symlink")]
    CyclicSymlink,

    #[error("symlink points outside root")]
    OutsideRoot,

    #[error("broken symlink")]
    BrokenSymlink,

    #[error("timeout")]
    Timeout,

    /// FIFO, socket or device that cannot be read safely without a timeout.
    #[error("special file")]
    SpecialFile,

    #[error("{0}")]
    Io(String),
}

impl EntryError {
    pub fn io(source: &std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::Io(source.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, FosumError>;
