use std::io;
use std::path::PathBuf;

use crate::sanitize::SanitizeError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to sanitize entry name '{name}': {source}")]
    Sanitize {
        name:   String,
        source: SanitizeError,
    },

    #[error("{} cannot be extracted outside of chroot ({})", path.display(), root.display())]
    PathEscape { path: PathBuf, root: PathBuf },

    #[error("failed to create directory: {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to extract '{}': {source}", path.display())]
    Copy { path: PathBuf, source: io::Error },

    #[error("extraction cancelled")]
    Cancelled,

    #[error("write task panicked: {source}")]
    TaskPanicked { source: tokio::task::JoinError },

    #[error("invalid extraction root '{}': {source}", path.display())]
    InvalidRoot { path: PathBuf, source: io::Error },

    #[error("concurrency must be at least 1")]
    InvalidConcurrency,

    #[error("archive is corrupted")]
    Corrupted,

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Whether the extraction stopped because the caller asked it to.
    pub fn is_cancelled(&self) -> bool { matches!(self, Self::Cancelled) }

    /// Whether the error was caused by an entry trying to leave the extraction root.
    pub fn is_path_escape(&self) -> bool { matches!(self, Self::PathEscape { .. }) }
}

pub type Result<T> = std::result::Result<T, Error>;
