//! The archive container codec seam.
//!
//! Everything that knows about the on-disk container format lives behind
//! these traits. The rest of the crate only deals in entry names, source
//! paths and [`CodecStatus`] failures.

use std::io::Write;
use std::path::Path;

use crate::status::CodecStatus;

mod zip_codec;

pub use self::zip_codec::{Compression, ZipArchiveReader, ZipArchiveWriter, ZipCodec};

/// How an archive handle was opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenMode {
    /// No file existed at the path.
    Create,
    /// An existing file is replaced on commit.
    Overwrite,
    Read,
}

/// Entry metadata as stored in the container, before any sanitizing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawEntry {
    pub name:   String,
    pub size:   u64,
    pub is_dir: bool,
}

pub trait Codec {
    type Writer: ArchiveWriter;
    type Reader: ArchiveReader;

    /// Open a handle for a new archive. Fails with `EXISTS` if `path` exists.
    fn open_create(&self, path: &Path) -> Result<Self::Writer, CodecStatus>;

    /// Open a handle whose commit replaces whatever is at `path`.
    fn open_overwrite(&self, path: &Path) -> Result<Self::Writer, CodecStatus>;

    fn open_read(&self, path: &Path) -> Result<Self::Reader, CodecStatus>;
}

/// A handle collecting entries for an archive that is written on close.
pub trait ArchiveWriter {
    /// Queue `source` under `name`. Nothing is written until [`close`].
    ///
    /// Adding a name that is already pending replaces the earlier entry.
    ///
    /// [`close`]: ArchiveWriter::close
    fn add_entry(&mut self, name: &str, source: &Path) -> Result<(), CodecStatus>;

    fn pending(&self) -> usize;

    fn contains(&self, name: &str) -> bool;

    /// Write out every pending entry. The handle is gone afterwards.
    fn close(self) -> Result<(), CodecStatus>;
}

/// A handle over an existing archive.
pub trait ArchiveReader {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool { self.len() == 0 }

    fn entry(&mut self, index: usize) -> Result<RawEntry, CodecStatus>;

    /// Decode the contents of entry `index` into `out`, returning bytes written.
    fn read_entry(&mut self, index: usize, out: &mut dyn Write) -> Result<u64, CodecStatus>;
}
