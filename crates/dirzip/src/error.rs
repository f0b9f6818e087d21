use std::io;
use std::path::PathBuf;

use crate::status::CodecStatus;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot read directory '{path}': {source}")]
    DirectoryAccess { path: PathBuf, source: io::Error },

    #[error("cannot add file '{path}' to zip archive, file does not exist")]
    FileNotFound { path: PathBuf },

    #[error("cannot add file '{path}': {status}")]
    AddFile { path: PathBuf, status: CodecStatus },

    #[error("cannot create zip archive '{path}': {status}")]
    AlreadyExists { path: PathBuf, status: CodecStatus },

    #[error("cannot create zip archive '{path}': {status}")]
    Open { path: PathBuf, status: CodecStatus },

    #[error("cannot open zip archive '{path}': {status}")]
    ArchiveNotFound { path: PathBuf, status: CodecStatus },

    #[error("cannot open zip archive '{path}': {status}")]
    CorruptArchive { path: PathBuf, status: CodecStatus },

    /// Any other failure to open an archive for reading.
    #[error("cannot open zip archive '{path}': {status}")]
    OpenRead { path: PathBuf, status: CodecStatus },

    #[error("zip-slip attack detected: entry '{entry}' resolves to '{resolved}'")]
    ZipSlip { entry: String, resolved: PathBuf },

    #[error("cannot extract zip archive '{archive}' to '{target}': {status}")]
    Extraction {
        archive: PathBuf,
        target:  PathBuf,
        status:  CodecStatus,
    },

    #[error("cannot save zip archive '{path}': {status}")]
    Save { path: PathBuf, status: CodecStatus },

    #[error("invalid mask '{mask}': {source}")]
    InvalidMask {
        mask:   String,
        source: glob::PatternError,
    },

    #[error("path is not valid UTF-8: '{path}'")]
    NonUtf8Path { path: PathBuf },
}

impl Error {
    /// The codec status behind this error, when one was reported.
    pub fn status(&self) -> Option<&CodecStatus> {
        match self {
            Self::AddFile { status, .. }
            | Self::AlreadyExists { status, .. }
            | Self::Open { status, .. }
            | Self::ArchiveNotFound { status, .. }
            | Self::CorruptArchive { status, .. }
            | Self::OpenRead { status, .. }
            | Self::Extraction { status, .. }
            | Self::Save { status, .. } => Some(status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
