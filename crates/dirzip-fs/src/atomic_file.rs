use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::{Error, Result};

#[derive(Clone, Copy, Debug)]
pub struct AtomicFileOptions {
    prefix: &'static str,
    suffix: &'static str,
    sync:   bool,
}

impl Default for AtomicFileOptions {
    fn default() -> Self { Self::new() }
}

impl AtomicFileOptions {
    pub fn new() -> Self {
        Self {
            prefix: ".",
            suffix: ".tmp",
            sync:   true,
        }
    }

    pub fn prefix(mut self, prefix: &'static str) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn suffix(mut self, suffix: &'static str) -> Self {
        self.suffix = suffix;
        self
    }

    pub fn sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    pub fn prefix_str(&self) -> &'static str { self.prefix }

    pub fn suffix_str(&self) -> &'static str { self.suffix }
}

/// A file written next to its final location and renamed over it on commit.
///
/// Until [`AtomicFile::commit`] succeeds the destination is never touched.
/// Dropping an uncommitted file removes the temporary sibling.
#[derive(Debug)]
pub struct AtomicFile {
    tmp:         NamedTempFile,
    destination: PathBuf,
    sync:        bool,
}

impl AtomicFile {
    pub fn create(destination: impl AsRef<Path>, options: AtomicFileOptions) -> Result<Self> {
        let destination = destination.as_ref().to_path_buf();
        let parent = match destination.parent() {
            Some(p) if p.as_os_str().is_empty() => Path::new("."),
            Some(p) => p,
            None => return Err(Error::NoParent { path: destination }),
        };

        let tmp = tempfile::Builder::new()
            .prefix(options.prefix_str())
            .suffix(options.suffix_str())
            .tempfile_in(parent)
            .map_err(|e| Error::Write {
                path:   destination.clone(),
                source: e,
            })?;

        tracing::trace!(tmp = %tmp.path().display(), dest = %destination.display(), "atomic file opened");

        Ok(Self {
            tmp,
            destination,
            sync: options.sync,
        })
    }

    pub fn temp_path(&self) -> &Path { self.tmp.path() }

    /// Flush, optionally fsync, and rename over the destination.
    pub fn commit(mut self) -> Result<()> {
        let tmp_path = self.tmp.path().to_path_buf();
        let write_err = |source| Error::Write {
            path: tmp_path.clone(),
            source,
        };

        self.tmp.flush().map_err(write_err)?;
        if self.sync {
            self.tmp.as_file().sync_all().map_err(write_err)?;
        }

        self.tmp.persist(&self.destination).map_err(|e| Error::Persist {
            from:   tmp_path.clone(),
            to:     self.destination.clone(),
            source: e.error,
        })?;

        tracing::debug!(dest = %self.destination.display(), "atomic file committed");
        Ok(())
    }
}

impl Write for AtomicFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> { self.tmp.write(buf) }

    fn flush(&mut self) -> io::Result<()> { self.tmp.flush() }
}

impl Seek for AtomicFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> { self.tmp.seek(pos) }
}
