use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::instrument;

use crate::codec::{ArchiveWriter, OpenMode};
use crate::collect::PathCollector;
use crate::error::{Error, Result};
use crate::options::{CollectOptions, FailurePolicy};
use crate::report::AddReport;
use crate::sanitize::archive_name;

/// An archive opened for writing.
///
/// Entries are queued by [`add_file`](Self::add_file) and
/// [`add_files`](Self::add_files) and written by [`save`](Self::save).
/// Dropping the builder, or calling [`discard`](Self::discard), abandons the
/// pending entries and leaves any existing file at the path untouched.
pub struct ArchiveBuilder<W: ArchiveWriter> {
    writer: W,
    path:   PathBuf,
    mode:   OpenMode,
    policy: FailurePolicy,
}

impl<W: ArchiveWriter> ArchiveBuilder<W> {
    pub(crate) fn new(writer: W, path: PathBuf, mode: OpenMode, policy: FailurePolicy) -> Self {
        Self {
            writer,
            path,
            mode,
            policy,
        }
    }

    pub fn path(&self) -> &Path { &self.path }

    pub fn mode(&self) -> OpenMode { self.mode }

    /// Number of entries waiting for [`save`](Self::save).
    pub fn pending(&self) -> usize { self.writer.pending() }

    pub fn contains(&self, name: &str) -> bool { self.writer.contains(name) }

    /// Queue `source` under the archive name `name`.
    ///
    /// Leading separators are stripped from `name`. The source must be a
    /// readable regular file; otherwise [`Error::FileNotFound`] is returned
    /// and nothing is queued.
    pub fn add_file(&mut self, source: impl AsRef<Path>, name: &str) -> Result<&mut Self> {
        let source = source.as_ref();

        let readable = source.is_file() && File::open(source).is_ok();
        if !readable {
            return Err(Error::FileNotFound {
                path: source.to_path_buf(),
            });
        }

        let add_err = |status| Error::AddFile {
            path: source.to_path_buf(),
            status,
        };
        let name = archive_name(name).map_err(add_err)?;
        self.writer.add_entry(&name, source).map_err(add_err)?;

        tracing::debug!(source = %source.display(), name = %name, "queued entry");
        Ok(self)
    }

    /// Queue every file under `root` selected by `options`.
    ///
    /// Under [`FailurePolicy::FailFast`] the first failure is returned and
    /// entries queued before it stay queued. Under
    /// [`FailurePolicy::CollectAll`] failures are gathered in the report.
    #[instrument(skip_all, fields(root = %root.as_ref().display(), mask = %options.mask))]
    pub fn add_files(&mut self, root: impl AsRef<Path>, options: &CollectOptions) -> Result<AddReport> {
        let mut report = AddReport::default();

        for mapping in PathCollector::new(root.as_ref(), options)? {
            let outcome = mapping.and_then(|m| self.add_file(&m.source, &m.relative).map(|_| ()));
            match outcome {
                Ok(()) => report.added += 1,
                Err(e) if self.policy == FailurePolicy::CollectAll => {
                    tracing::warn!(error = %e, "entry not added");
                    report.failures.push(e);
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            added = report.added,
            failed = report.failures.len(),
            "directory queued"
        );
        Ok(report)
    }

    /// Write the archive. The handle is consumed whether or not this succeeds.
    #[instrument(skip_all, fields(path = %self.path.display(), entries = self.writer.pending()))]
    pub fn save(self) -> Result<()> {
        let Self { writer, path, .. } = self;
        writer.close().map_err(|status| Error::Save {
            path: path.clone(),
            status,
        })?;

        tracing::info!("archive saved");
        Ok(())
    }

    /// Abandon the pending entries without writing anything.
    pub fn discard(self) {
        tracing::debug!(path = %self.path.display(), pending = self.writer.pending(), "archive discarded");
    }
}

impl<W: ArchiveWriter> std::fmt::Debug for ArchiveBuilder<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveBuilder")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("pending", &self.writer.pending())
            .finish()
    }
}
