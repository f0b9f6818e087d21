use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read '{path}': {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write '{path}': {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to create directory '{path}': {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to move '{from}' into place at '{to}': {source}")]
    Persist {
        from:   PathBuf,
        to:     PathBuf,
        source: io::Error,
    },

    #[error("'{path}' already exists")]
    AlreadyExists { path: PathBuf },

    #[error("'{path}' has no parent directory")]
    NoParent { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, Error>;
