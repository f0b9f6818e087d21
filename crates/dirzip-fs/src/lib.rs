//! Filesystem primitives used by `dirzip`.
//!
//! - [`AtomicFile`] writes next to a destination and renames over it on commit.
//! - [`Workspace`] stages a directory tree and merges it into a destination.

mod atomic_file;
mod error;
mod workspace;

pub use atomic_file::{AtomicFile, AtomicFileOptions};
pub use error::{Error, Result};
pub use workspace::{CommitOptions, Workspace};
