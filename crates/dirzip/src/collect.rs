//! Directory traversal producing (source path, archive name) pairs.
//!
//! Listings are sorted by name at every level and the walk is depth-first,
//! so the same tree always yields the same sequence. All paths are composed
//! from the root passed in; the process working directory is never used.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};

use crate::error::{Error, Result};
use crate::options::{CollectOptions, MaskScope};

/// A file on disk and the name it gets inside the archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryMapping {
    pub source:   PathBuf,
    pub relative: String,
}

#[derive(Debug)]
struct Mask {
    pattern: Pattern,
    options: MatchOptions,
    scope:   MaskScope,
    hidden:  bool,
}

impl Mask {
    fn new(options: &CollectOptions) -> Result<Self> {
        let pattern = Pattern::new(&options.mask).map_err(|e| Error::InvalidMask {
            mask:   options.mask.clone(),
            source: e,
        })?;

        Ok(Self {
            pattern,
            options: MatchOptions {
                case_sensitive:              true,
                require_literal_separator:   true,
                require_literal_leading_dot: !options.match_hidden,
            },
            scope:   options.mask_scope,
            hidden:  options.match_hidden,
        })
    }

    fn matches(&self, name: &str) -> bool { self.pattern.matches_with(name, self.options) }

    /// Whether a directory is descended at all.
    fn admits_dir(&self, name: &str) -> bool {
        match self.scope {
            // Already filtered when the parent was listed.
            MaskScope::EveryLevel => true,
            MaskScope::FilesOnly => self.hidden || !name.starts_with('.'),
        }
    }
}

#[derive(Debug)]
struct Frame {
    dir:       PathBuf,
    /// Symlink-free form of `dir`, used to detect cycles.
    canonical: PathBuf,
    prefix:    String,
    /// Raw names; a name that is not UTF-8 fails on its own when reached.
    entries:   std::vec::IntoIter<OsString>,
}

impl Frame {
    fn open(dir: PathBuf, canonical: PathBuf, prefix: String, mask: &Mask) -> Result<Self> {
        let access = |source| Error::DirectoryAccess {
            path: dir.clone(),
            source,
        };

        let mut names = Vec::new();
        for entry in fs::read_dir(&dir).map_err(access)? {
            let name = entry.map_err(access)?.file_name();
            if name == "." || name == ".." {
                continue;
            }
            if mask.scope == MaskScope::EveryLevel && !mask.matches(&name.to_string_lossy()) {
                continue;
            }
            names.push(name);
        }
        names.sort();

        Ok(Self {
            dir,
            canonical,
            prefix,
            entries: names.into_iter(),
        })
    }
}

fn canonical(dir: &Path) -> Result<PathBuf> {
    fs::canonicalize(dir).map_err(|source| Error::DirectoryAccess {
        path: dir.to_path_buf(),
        source,
    })
}

/// Lazy, depth-first walk of a directory under a [`CollectOptions`] mask.
///
/// Yields `Err` for subdirectories that cannot be listed and for names that
/// are not valid UTF-8; the walk continues past either. Entries that are
/// neither regular files nor directories, such as dangling symlinks, are
/// skipped. Symlinked directories are followed unless they lead back to a
/// directory already being walked.
#[derive(Debug)]
pub struct PathCollector {
    mask:      Mask,
    recursive: bool,
    stack:     Vec<Frame>,
}

impl PathCollector {
    /// Start a walk at `root`. Fails if `root` cannot be listed.
    pub fn new(root: impl AsRef<Path>, options: &CollectOptions) -> Result<Self> {
        let mask = Mask::new(options)?;
        let prefix = options.prefix.trim_matches('/').to_owned();
        let root = root.as_ref().to_path_buf();
        let root_canonical = canonical(&root)?;
        let root = Frame::open(root, root_canonical, prefix, &mask)?;

        Ok(Self {
            mask,
            recursive: options.recursive,
            stack: vec![root],
        })
    }
}

impl Iterator for PathCollector {
    type Item = Result<EntryMapping>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;
            let Some(name) = frame.entries.next() else {
                self.stack.pop();
                continue;
            };

            let source = frame.dir.join(&name);
            let (name, relative) = match name.into_string() {
                Ok(name) => {
                    let relative = join_prefix(&frame.prefix, &name);
                    (name, Some(relative))
                }
                Err(raw) => (raw.to_string_lossy().into_owned(), None),
            };

            let meta = match fs::metadata(&source) {
                Ok(meta) => meta,
                Err(e) => {
                    tracing::debug!(path = %source.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };

            if meta.is_dir() {
                if !self.recursive || !self.mask.admits_dir(&name) {
                    continue;
                }
                let Some(relative) = relative else {
                    return Some(Err(Error::NonUtf8Path { path: source }));
                };
                let resolved = match canonical(&source) {
                    Ok(resolved) => resolved,
                    Err(e) => return Some(Err(e)),
                };
                if self.stack.iter().any(|f| f.canonical == resolved) {
                    tracing::warn!(path = %source.display(), "skipping directory cycle");
                    continue;
                }
                match Frame::open(source, resolved, relative, &self.mask) {
                    Ok(child) => self.stack.push(child),
                    Err(e) => return Some(Err(e)),
                }
                continue;
            }

            if !meta.is_file() {
                continue;
            }
            if self.mask.scope == MaskScope::FilesOnly && !self.mask.matches(&name) {
                continue;
            }

            return Some(match relative {
                Some(relative) => Ok(EntryMapping { source, relative }),
                None => Err(Error::NonUtf8Path { path: source }),
            });
        }
    }
}

/// Walk `root` under `options`.
pub fn collect(root: impl AsRef<Path>, options: &CollectOptions) -> Result<PathCollector> {
    PathCollector::new(root, options)
}

fn join_prefix(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_owned()
    } else {
        format!("{prefix}/{name}")
    }
}
