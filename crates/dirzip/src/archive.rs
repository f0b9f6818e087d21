use std::path::Path;

use tracing::instrument;

use crate::builder::ArchiveBuilder;
use crate::codec::{Codec, OpenMode, ZipCodec};
use crate::error::{Error, Result};
use crate::extract::ArchiveExtractor;
use crate::options::{CollectOptions, CreateOptions, ExtractOptions};
use crate::report::{AddReport, ExtractReport};
use crate::status::{CodecStatus, StatusCode};

/// Entry point for creating and extracting archives with a given codec.
#[derive(Clone, Copy, Debug, Default)]
pub struct Archive<C: Codec = ZipCodec> {
    codec: C,
}

impl Archive<ZipCodec> {
    pub fn new() -> Self { Self::default() }
}

impl<C: Codec> Archive<C> {
    pub fn with_codec(codec: C) -> Self { Self { codec } }

    pub fn codec(&self) -> &C { &self.codec }

    /// Open `path` for writing.
    ///
    /// An existing file at `path` is replaced on save unless
    /// `options.overwrite` is off, in which case this fails with
    /// [`Error::AlreadyExists`].
    pub fn create(&self, path: impl AsRef<Path>, options: &CreateOptions) -> Result<ArchiveBuilder<C::Writer>> {
        let path = path.as_ref();
        let exists = path.symlink_metadata().is_ok();

        let (opened, mode) = if exists && options.overwrite {
            (self.codec.open_overwrite(path), OpenMode::Overwrite)
        } else {
            (self.codec.open_create(path), OpenMode::Create)
        };

        let writer = opened.map_err(|status| create_error(path, status))?;
        tracing::debug!(path = %path.display(), ?mode, "archive opened for writing");
        Ok(ArchiveBuilder::new(
            writer,
            path.to_path_buf(),
            mode,
            options.failure_policy,
        ))
    }

    /// Pack the files under `dir` selected by `collect` into `path`.
    ///
    /// Nothing is written unless every selected file was queued, or the
    /// failure policy collects failures instead of stopping.
    #[instrument(skip_all, fields(dir = %dir.as_ref().display(), archive = %path.as_ref().display()))]
    pub fn from_directory(
        &self,
        dir: impl AsRef<Path>,
        path: impl AsRef<Path>,
        options: &CreateOptions,
        collect: &CollectOptions,
    ) -> Result<AddReport> {
        let mut builder = self.create(path, options)?;
        let report = builder.add_files(dir, collect)?;
        builder.save()?;
        Ok(report)
    }

    /// Open an existing archive for reading.
    pub fn open(&self, path: impl AsRef<Path>) -> Result<ArchiveExtractor<C::Reader>> {
        let path = path.as_ref();
        let reader = self
            .codec
            .open_read(path)
            .map_err(|status| open_error(path, status))?;
        Ok(ArchiveExtractor::new(reader, path.to_path_buf()))
    }

    /// Extract every entry of `archive` into `dir`.
    pub fn extract(
        &self,
        archive: impl AsRef<Path>,
        dir: impl AsRef<Path>,
        options: &ExtractOptions,
    ) -> Result<ExtractReport> {
        self.open(archive)?.extract_all(dir, options)
    }
}

fn create_error(path: &Path, status: CodecStatus) -> Error {
    let path = path.to_path_buf();
    match status.code() {
        StatusCode::EXISTS => Error::AlreadyExists { path, status },
        _ => Error::Open { path, status },
    }
}

fn open_error(path: &Path, status: CodecStatus) -> Error {
    let path = path.to_path_buf();
    match status.code() {
        StatusCode::NO_ENTRY => Error::ArchiveNotFound { path, status },
        StatusCode::NOT_ZIP | StatusCode::INCONSISTENT => Error::CorruptArchive { path, status },
        _ => Error::OpenRead { path, status },
    }
}

/// Open `path` for writing with the zip codec and default options.
pub fn create(path: impl AsRef<Path>) -> Result<ArchiveBuilder<<ZipCodec as Codec>::Writer>> {
    Archive::new().create(path, &CreateOptions::default())
}

/// Pack `dir` into `path` with the zip codec and default options.
pub fn from_directory(dir: impl AsRef<Path>, path: impl AsRef<Path>) -> Result<AddReport> {
    Archive::new().from_directory(dir, path, &CreateOptions::default(), &CollectOptions::default())
}

/// Extract `archive` into `dir` with the zip codec and default options.
pub fn extract(archive: impl AsRef<Path>, dir: impl AsRef<Path>) -> Result<ExtractReport> {
    Archive::new().extract(archive, dir, &ExtractOptions::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn create_picks_mode_from_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.zip");

        let builder = create(&path).unwrap();
        assert_eq!(builder.mode(), OpenMode::Create);
        builder.discard();

        fs::write(&path, "old").unwrap();
        let builder = create(&path).unwrap();
        assert_eq!(builder.mode(), OpenMode::Overwrite);
    }

    #[test]
    fn create_without_overwrite_reports_exists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.zip");
        fs::write(&path, "old").unwrap();

        let err = Archive::new()
            .create(&path, &CreateOptions::default().overwrite(false))
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { .. }));
        assert_eq!(
            err.to_string(),
            format!("cannot create zip archive '{}': File already exists.", path.display())
        );
    }

    #[test]
    fn create_in_missing_directory_is_an_open_error() {
        let dir = tempdir().unwrap();
        let err = create(dir.path().join("missing/a.zip")).unwrap_err();
        assert!(matches!(err, Error::Open { .. }));
    }

    #[test]
    fn open_classifies_failures() {
        let dir = tempdir().unwrap();

        let err = Archive::new().open(dir.path().join("missing.zip")).unwrap_err();
        assert!(matches!(err, Error::ArchiveNotFound { .. }));

        let garbage = dir.path().join("garbage.zip");
        fs::write(&garbage, "definitely not a zip").unwrap();
        let err = Archive::new().open(&garbage).unwrap_err();
        assert!(matches!(err, Error::CorruptArchive { .. }));
    }

    #[test]
    fn directory_in_place_of_archive_is_a_read_error() {
        let dir = tempdir().unwrap();
        let not_archive = dir.path().join("folder.zip");
        fs::create_dir_all(&not_archive).unwrap();

        let err = extract(&not_archive, dir.path().join("out")).unwrap_err();
        assert!(matches!(err, Error::OpenRead { .. }), "{err}");
        assert_eq!(err.status().map(CodecStatus::code), Some(StatusCode::OPEN));
        assert_eq!(
            err.to_string(),
            format!("cannot open zip archive '{}': Can't open file.", not_archive.display())
        );
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn from_directory_writes_archive() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.txt"), "a").unwrap();
        let path = dir.path().join("out.zip");

        let report = from_directory(&src, &path).unwrap();
        assert_eq!(report.added, 1);
        assert_eq!(Archive::new().open(&path).unwrap().len(), 1);
    }
}
