use std::path::{Path, PathBuf};

use dirzip_fs::{CommitOptions, Workspace};
use tracing::instrument;

use crate::codec::{ArchiveReader, RawEntry};
use crate::error::{Error, Result};
use crate::options::{ExtractOptions, Progress};
use crate::report::{ExtractReport, ExtractedEntry};
use crate::sanitize::{SanitizedPath, sanitize_entry};
use crate::status::{CodecStatus, StatusCode};

/// An archive opened for reading.
///
/// [`extract_all`](Self::extract_all) validates every entry name before the
/// first byte lands on disk, decodes into a staging directory inside the
/// target and merges it in one commit. A failed extraction leaves no
/// partial files behind.
pub struct ArchiveExtractor<R: ArchiveReader> {
    reader: R,
    path:   PathBuf,
}

impl<R: ArchiveReader> ArchiveExtractor<R> {
    pub(crate) fn new(reader: R, path: PathBuf) -> Self { Self { reader, path } }

    pub fn path(&self) -> &Path { &self.path }

    pub fn len(&self) -> usize { self.reader.len() }

    pub fn is_empty(&self) -> bool { self.reader.is_empty() }

    /// Stored entries, in archive order, as the container reports them.
    pub fn entries(&mut self) -> Result<Vec<RawEntry>> {
        let path = self.path.clone();
        (0..self.reader.len())
            .map(|i| {
                self.reader.entry(i).map_err(|status| Error::CorruptArchive {
                    path: path.clone(),
                    status,
                })
            })
            .collect()
    }

    /// Extract every entry below `target`, creating it if needed.
    #[instrument(skip_all, fields(archive = %self.path.display(), target = %target.as_ref().display()))]
    pub fn extract_all(mut self, target: impl AsRef<Path>, options: &ExtractOptions) -> Result<ExtractReport> {
        let target = target.as_ref().to_path_buf();
        let raw = self.entries()?;

        let planned = raw
            .iter()
            .map(|entry| sanitize_entry(&entry.name, &target))
            .collect::<Result<Vec<SanitizedPath>>>()?;

        // Sizes come from the central directory and are not trusted.
        let total_bytes = raw
            .iter()
            .filter(|e| !e.is_dir)
            .fold(0u64, |acc, e| acc.saturating_add(e.size));
        let extraction = |status: CodecStatus| Error::Extraction {
            archive: self.path.clone(),
            target:  target.clone(),
            status,
        };
        let fs_err = |e: dirzip_fs::Error| extraction(CodecStatus::from(&e));

        let workspace = Workspace::new(&target).map_err(fs_err)?;
        let mut entries = Vec::with_capacity(raw.len());
        let mut processed = 0u64;

        for (index, (entry, sanitized)) in raw.iter().zip(&planned).enumerate() {
            if sanitized.relative.as_os_str().is_empty() {
                continue;
            }

            if entry.is_dir {
                workspace.create_dir_all(&sanitized.relative).map_err(fs_err)?;
                entries.push(ExtractedEntry {
                    name:         entry.name.clone(),
                    target_path:  sanitized.resolved.clone(),
                    size:         0,
                    is_directory: true,
                    hash:         None,
                });
                continue;
            }

            let file = workspace.create_file(&sanitized.relative).map_err(fs_err)?;
            let mut writer = options.hash_strategy.writer(file);
            let size = self
                .reader
                .read_entry(index, &mut writer)
                .map_err(extraction)?;
            let hash = writer
                .finish()
                .map_err(|e| extraction(CodecStatus::from_io(&e, StatusCode::WRITE)))?;

            processed = processed.saturating_add(size);
            if let Some(callback) = &options.on_progress {
                callback(Progress {
                    bytes_processed: processed,
                    total_bytes:     Some(total_bytes),
                    current_entry:   Some(entry.name.clone()),
                });
            }

            tracing::debug!(entry = %entry.name, size, "entry staged");
            entries.push(ExtractedEntry {
                name: entry.name.clone(),
                target_path: sanitized.resolved.clone(),
                size,
                is_directory: false,
                hash,
            });
        }

        workspace
            .commit(CommitOptions::new().overwrite(options.overwrite))
            .map_err(fs_err)?;

        tracing::info!(entries = entries.len(), bytes = processed, "archive extracted");
        Ok(ExtractReport {
            archive: self.path.clone(),
            target: target.clone(),
            entry_count: entries.len(),
            total_bytes: processed,
            entries,
        })
    }
}

impl<R: ArchiveReader> std::fmt::Debug for ArchiveExtractor<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveExtractor")
            .field("path", &self.path)
            .field("entries", &self.reader.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Codec, ZipCodec};
    use crate::options::HashStrategy;
    use std::fs;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;

    fn craft(path: &Path, entries: &[(&str, &[u8])]) {
        let mut zip = zip::ZipWriter::new(fs::File::create(path).unwrap());
        for (name, body) in entries {
            if name.ends_with('/') {
                zip.add_directory(name.trim_end_matches('/'), SimpleFileOptions::default())
                    .unwrap();
            } else {
                zip.start_file(*name, SimpleFileOptions::default()).unwrap();
                zip.write_all(body).unwrap();
            }
        }
        zip.finish().unwrap();
    }

    fn open(path: &Path) -> ArchiveExtractor<<ZipCodec as Codec>::Reader> {
        let reader = ZipCodec::new().open_read(path).unwrap();
        ArchiveExtractor::new(reader, path.to_path_buf())
    }

    #[test]
    fn extracts_files_and_directories() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("a.zip");
        craft(&archive, &[("empty/", b""), ("a.txt", b"alpha"), ("sub/b.txt", b"beta")]);

        let target = dir.path().join("out");
        let report = open(&archive)
            .extract_all(&target, &ExtractOptions::default())
            .unwrap();

        assert_eq!(fs::read(target.join("a.txt")).unwrap(), b"alpha");
        assert_eq!(fs::read(target.join("sub/b.txt")).unwrap(), b"beta");
        assert!(target.join("empty").is_dir());
        assert_eq!(report.entry_count, 3);
        assert_eq!(report.total_bytes, 9);
        assert!(report.entries.iter().all(|e| e.hash.is_none()));
    }

    #[test]
    fn staging_directory_is_gone_after_extraction() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("a.zip");
        craft(&archive, &[("a.txt", b"alpha")]);

        let target = dir.path().join("out");
        open(&archive)
            .extract_all(&target, &ExtractOptions::default())
            .unwrap();

        let names: Vec<_> = fs::read_dir(&target)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["a.txt"]);
    }

    #[test]
    fn zip_slip_entry_aborts_before_writing() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("evil.zip");
        craft(&archive, &[("good.txt", b"ok"), ("../evil.txt", b"pwned")]);

        let target = dir.path().join("out");
        let err = open(&archive)
            .extract_all(&target, &ExtractOptions::default())
            .unwrap_err();

        assert!(matches!(err, Error::ZipSlip { .. }));
        assert!(!target.exists());
        assert!(!dir.path().join("evil.txt").exists());
    }

    #[test]
    fn sha256_hashes_are_reported() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("a.zip");
        craft(&archive, &[("hello.txt", b"hello world")]);

        let options = ExtractOptions::default().hash_strategy(HashStrategy::Sha256);
        let report = open(&archive)
            .extract_all(dir.path().join("out"), &options)
            .unwrap();

        assert_eq!(
            report.entries[0].hash.as_deref(),
            Some("b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9")
        );
    }

    #[test]
    fn progress_reaches_total() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("a.zip");
        craft(&archive, &[("a", b"12345"), ("b", b"67890")]);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let options = ExtractOptions::default().on_progress(Arc::new(move |p: Progress| {
            sink.lock().unwrap().push(p.bytes_processed);
        }));

        open(&archive)
            .extract_all(dir.path().join("out"), &options)
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![5, 10]);
    }

    #[test]
    fn existing_file_is_kept_without_overwrite() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("a.zip");
        craft(&archive, &[("a.txt", b"new"), ("b.txt", b"b")]);

        let target = dir.path().join("out");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("a.txt"), "old").unwrap();

        let err = open(&archive)
            .extract_all(&target, &ExtractOptions::default().overwrite(false))
            .unwrap_err();

        assert!(matches!(err, Error::Extraction { .. }));
        assert_eq!(fs::read(target.join("a.txt")).unwrap(), b"old");
        assert!(!target.join("b.txt").exists());

        open(&archive)
            .extract_all(&target, &ExtractOptions::default())
            .unwrap();
        assert_eq!(fs::read(target.join("a.txt")).unwrap(), b"new");
    }

    /// Reader serving small bodies under whatever sizes the directory claims.
    struct ClaimedSizes {
        entries: Vec<(RawEntry, &'static [u8])>,
    }

    impl ArchiveReader for ClaimedSizes {
        fn len(&self) -> usize { self.entries.len() }

        fn entry(&mut self, index: usize) -> std::result::Result<RawEntry, CodecStatus> {
            Ok(self.entries[index].0.clone())
        }

        fn read_entry(&mut self, index: usize, out: &mut dyn Write) -> std::result::Result<u64, CodecStatus> {
            let body = self.entries[index].1;
            out.write_all(body)
                .map_err(|e| CodecStatus::from_io(&e, StatusCode::WRITE))?;
            Ok(body.len() as u64)
        }
    }

    #[test]
    fn oversized_directory_sizes_saturate_progress_total() {
        let dir = tempdir().unwrap();
        let huge = 0xFFFF_FFFF_FFFF_FFF0;
        let reader = ClaimedSizes {
            entries: vec![
                (
                    RawEntry {
                        name:   "a".to_owned(),
                        size:   huge,
                        is_dir: false,
                    },
                    b"aa",
                ),
                (
                    RawEntry {
                        name:   "b".to_owned(),
                        size:   huge,
                        is_dir: false,
                    },
                    b"bbb",
                ),
            ],
        };

        let totals = Arc::new(Mutex::new(Vec::new()));
        let sink = totals.clone();
        let options = ExtractOptions::default().on_progress(Arc::new(move |p: Progress| {
            sink.lock().unwrap().push((p.bytes_processed, p.total_bytes));
        }));

        let target = dir.path().join("out");
        let report = ArchiveExtractor::new(reader, dir.path().join("claimed.zip"))
            .extract_all(&target, &options)
            .unwrap();

        assert_eq!(report.total_bytes, 5);
        assert_eq!(*totals.lock().unwrap(), vec![
            (2, Some(u64::MAX)),
            (5, Some(u64::MAX)),
        ]);
        assert_eq!(fs::read(target.join("b")).unwrap(), b"bbb");
    }

    #[test]
    fn entries_lists_archive_order() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("a.zip");
        craft(&archive, &[("z", b"1"), ("a", b"22")]);

        let mut extractor = open(&archive);
        let entries = extractor.entries().unwrap();
        assert_eq!(extractor.len(), 2);
        assert_eq!(entries[0].name, "z");
        assert_eq!(entries[1].size, 2);
    }
}
