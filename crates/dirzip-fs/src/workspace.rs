use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::{Error, Result};

const STAGING_PREFIX: &str = ".dirzip-stage-";

#[derive(Clone, Copy, Debug)]
pub struct CommitOptions {
    overwrite: bool,
}

impl Default for CommitOptions {
    fn default() -> Self { Self::new() }
}

impl CommitOptions {
    pub fn new() -> Self { Self { overwrite: true } }

    /// Replace files that already exist at the destination.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

/// Staging area that is merged into a destination directory in one step.
///
/// The staging directory lives inside the destination so that the final
/// merge is a series of same-filesystem renames. It is removed on drop,
/// committed or not.
pub struct Workspace {
    staging:     TempDir,
    destination: PathBuf,
}

#[derive(Debug)]
struct Staged {
    relative: PathBuf,
    is_dir:   bool,
}

impl Workspace {
    /// Create the destination if needed and open a fresh staging area in it.
    pub fn new(destination: impl AsRef<Path>) -> Result<Self> {
        let destination = destination.as_ref().to_path_buf();

        fs::create_dir_all(&destination).map_err(|e| Error::CreateDir {
            path:   destination.clone(),
            source: e,
        })?;

        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&destination)
            .map_err(|e| Error::CreateDir {
                path:   destination.clone(),
                source: e,
            })?;

        Ok(Self {
            staging,
            destination,
        })
    }

    pub fn path(&self) -> &Path { self.staging.path() }

    pub fn create_dir_all(&self, relative: &Path) -> Result<()> {
        let full_path = self.staging.path().join(relative);
        fs::create_dir_all(&full_path).map_err(|e| Error::CreateDir {
            path:   full_path,
            source: e,
        })
    }

    /// Create a new staged file for writing, creating parent directories.
    pub fn create_file(&self, relative: &Path) -> Result<fs::File> {
        let full_path = self.staging.path().join(relative);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::CreateDir {
                path:   parent.to_path_buf(),
                source: e,
            })?;
        }

        fs::File::create(&full_path).map_err(|e| Error::Write {
            path:   full_path,
            source: e,
        })
    }

    /// Merge the staged tree into the destination.
    ///
    /// Every conflict is detected before the first rename, so a rejected
    /// commit leaves the destination untouched.
    pub fn commit(self, options: CommitOptions) -> Result<()> {
        let mut staged = Vec::new();
        collect_staged(self.staging.path(), Path::new(""), &mut staged)?;

        for entry in &staged {
            let target = self.destination.join(&entry.relative);
            let existing = match fs::symlink_metadata(&target) {
                Ok(meta) => meta,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(Error::Read { path: target, source: e }),
            };

            let conflict = if entry.is_dir {
                !existing.is_dir()
            } else {
                existing.is_dir() || !options.overwrite
            };
            if conflict {
                return Err(Error::AlreadyExists { path: target });
            }
        }

        for entry in &staged {
            let source = self.staging.path().join(&entry.relative);
            let target = self.destination.join(&entry.relative);

            if entry.is_dir {
                fs::create_dir_all(&target).map_err(|e| Error::CreateDir {
                    path:   target,
                    source: e,
                })?;
                continue;
            }

            if target.exists() {
                fs::remove_file(&target).map_err(|e| Error::Write {
                    path:   target.clone(),
                    source: e,
                })?;
            }
            fs::rename(&source, &target).map_err(|e| Error::Persist {
                from:   source,
                to:     target,
                source: e,
            })?;
        }

        tracing::debug!(
            dest = %self.destination.display(),
            entries = staged.len(),
            "workspace committed"
        );
        Ok(())
    }
}

/// Depth-first listing of the staged tree, parents before children.
fn collect_staged(root: &Path, relative: &Path, out: &mut Vec<Staged>) -> Result<()> {
    let dir = root.join(relative);
    let read_err = |e| Error::Read {
        path:   dir.clone(),
        source: e,
    };

    let mut children = fs::read_dir(&dir)
        .map_err(read_err)?
        .collect::<io::Result<Vec<_>>>()
        .map_err(read_err)?;
    children.sort_by_key(|e| e.file_name());

    for child in children {
        let ty = child.file_type().map_err(read_err)?;
        let child_rel = relative.join(child.file_name());
        if ty.is_dir() {
            out.push(Staged {
                relative: child_rel.clone(),
                is_dir:   true,
            });
            collect_staged(root, &child_rel, out)?;
        } else {
            out.push(Staged {
                relative: child_rel,
                is_dir:   false,
            });
        }
    }

    Ok(())
}
