use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

use dirzip_fs::{AtomicFile, AtomicFileOptions};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::{ArchiveReader, ArchiveWriter, Codec, OpenMode, RawEntry};
use crate::status::{CodecStatus, StatusCode};

/// Compression applied to every entry written by [`ZipCodec`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Compression {
    Stored,
    #[default]
    Deflated,
}

impl Compression {
    fn method(self) -> CompressionMethod {
        match self {
            Self::Stored => CompressionMethod::Stored,
            Self::Deflated => CompressionMethod::Deflated,
        }
    }
}

/// Zip container codec backed by the `zip` crate.
///
/// Entry timestamps are left at the format's epoch, so packing the same
/// tree twice produces byte-identical archives.
#[derive(Clone, Copy, Debug)]
pub struct ZipCodec {
    compression: Compression,
    sync:        bool,
}

impl Default for ZipCodec {
    fn default() -> Self { Self::new() }
}

impl ZipCodec {
    pub fn new() -> Self {
        Self {
            compression: Compression::default(),
            sync:        true,
        }
    }

    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Fsync the archive before it is renamed into place.
    pub fn sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    fn writer(&self, path: &Path, mode: OpenMode) -> Result<ZipArchiveWriter, CodecStatus> {
        let parent = match path.parent() {
            Some(p) if p.as_os_str().is_empty() => Path::new("."),
            Some(p) => p,
            None => return Err(CodecStatus::new(StatusCode::INVALID, "archive path has no parent")),
        };
        if !parent.is_dir() {
            return Err(CodecStatus::new(
                StatusCode::OPEN,
                format!("directory '{}' does not exist", parent.display()),
            ));
        }

        Ok(ZipArchiveWriter {
            path: path.to_path_buf(),
            mode,
            compression: self.compression,
            sync: self.sync,
            pending: Vec::new(),
        })
    }
}

impl Codec for ZipCodec {
    type Writer = ZipArchiveWriter;
    type Reader = ZipArchiveReader;

    fn open_create(&self, path: &Path) -> Result<Self::Writer, CodecStatus> {
        if path.symlink_metadata().is_ok() {
            return Err(CodecStatus::new(
                StatusCode::EXISTS,
                format!("'{}' already exists", path.display()),
            ));
        }
        self.writer(path, OpenMode::Create)
    }

    fn open_overwrite(&self, path: &Path) -> Result<Self::Writer, CodecStatus> {
        if path.is_dir() {
            return Err(CodecStatus::new(
                StatusCode::OPEN,
                format!("'{}' is a directory", path.display()),
            ));
        }
        self.writer(path, OpenMode::Overwrite)
    }

    fn open_read(&self, path: &Path) -> Result<Self::Reader, CodecStatus> {
        let file = File::open(path).map_err(|e| io_status(&e, StatusCode::OPEN, path))?;
        let meta = file
            .metadata()
            .map_err(|e| io_status(&e, StatusCode::READ, path))?;
        if meta.is_dir() {
            return Err(CodecStatus::new(
                StatusCode::OPEN,
                format!("'{}' is a directory", path.display()),
            ));
        }

        let archive =
            ZipArchive::new(BufReader::new(file)).map_err(|e| zip_status(&e, StatusCode::NOT_ZIP))?;
        Ok(ZipArchiveReader { archive })
    }
}

#[derive(Debug)]
struct PendingEntry {
    name:   String,
    source: PathBuf,
}

/// Pending entries for a zip archive, written atomically on close.
#[derive(Debug)]
pub struct ZipArchiveWriter {
    path:        PathBuf,
    mode:        OpenMode,
    compression: Compression,
    sync:        bool,
    pending:     Vec<PendingEntry>,
}

impl ZipArchiveWriter {
    pub fn mode(&self) -> OpenMode { self.mode }
}

impl ArchiveWriter for ZipArchiveWriter {
    fn add_entry(&mut self, name: &str, source: &Path) -> Result<(), CodecStatus> {
        if name.is_empty() {
            return Err(CodecStatus::new(StatusCode::INVALID, "entry name is empty"));
        }

        match self.pending.iter_mut().find(|e| e.name == name) {
            Some(existing) => existing.source = source.to_path_buf(),
            None => self.pending.push(PendingEntry {
                name:   name.to_owned(),
                source: source.to_path_buf(),
            }),
        }
        Ok(())
    }

    fn pending(&self) -> usize { self.pending.len() }

    fn contains(&self, name: &str) -> bool { self.pending.iter().any(|e| e.name == name) }

    fn close(self) -> Result<(), CodecStatus> {
        let options = AtomicFileOptions::new()
            .prefix(".dirzip-")
            .suffix(".zip.tmp")
            .sync(self.sync);
        let out = AtomicFile::create(&self.path, options).map_err(|e| CodecStatus::from(&e))?;

        let mut zip = ZipWriter::new(out);
        let file_options = SimpleFileOptions::default().compression_method(self.compression.method());

        for entry in &self.pending {
            let mut source = File::open(&entry.source)
                .map_err(|e| io_status(&e, StatusCode::READ, &entry.source))?;
            zip.start_file(entry.name.as_str(), file_options)
                .map_err(|e| zip_status(&e, StatusCode::WRITE))?;
            io::copy(&mut source, &mut zip)
                .map_err(|e| io_status(&e, StatusCode::WRITE, &entry.source))?;
        }

        let out = zip.finish().map_err(|e| zip_status(&e, StatusCode::WRITE))?;
        out.commit().map_err(|e| CodecStatus::from(&e))
    }
}

/// Read handle over an existing zip archive.
pub struct ZipArchiveReader {
    archive: ZipArchive<BufReader<File>>,
}

impl ArchiveReader for ZipArchiveReader {
    fn len(&self) -> usize { self.archive.len() }

    fn entry(&mut self, index: usize) -> Result<RawEntry, CodecStatus> {
        let file = self
            .archive
            .by_index_raw(index)
            .map_err(|e| zip_status(&e, StatusCode::READ))?;
        Ok(RawEntry {
            name:   file.name().to_owned(),
            size:   file.size(),
            is_dir: file.is_dir(),
        })
    }

    fn read_entry(&mut self, index: usize, out: &mut dyn Write) -> Result<u64, CodecStatus> {
        let mut file = self
            .archive
            .by_index(index)
            .map_err(|e| zip_status(&e, StatusCode::READ))?;
        io::copy(&mut file, out).map_err(|e| CodecStatus::from_io(&e, StatusCode::READ))
    }
}

fn io_status(err: &io::Error, fallback: StatusCode, path: &Path) -> CodecStatus {
    let code = CodecStatus::from_io(err, fallback).code();
    CodecStatus::new(code, format!("{}: {err}", path.display()))
}

fn zip_status(err: &ZipError, fallback: StatusCode) -> CodecStatus {
    match err {
        ZipError::Io(e) => CodecStatus::from_io(e, fallback),
        ZipError::InvalidArchive(_) => CodecStatus::new(StatusCode::NOT_ZIP, err.to_string()),
        ZipError::UnsupportedArchive(_) => CodecStatus::new(StatusCode::INCONSISTENT, err.to_string()),
        ZipError::FileNotFound => CodecStatus::new(StatusCode::NO_ENTRY, err.to_string()),
        _ => CodecStatus::new(fallback, err.to_string()),
    }
}
