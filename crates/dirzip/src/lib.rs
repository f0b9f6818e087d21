//! Pack directory trees into zip archives and unpack them again.
//!
//! # Creating
//!
//! [`Archive::create`] returns an [`ArchiveBuilder`]. Files are queued with
//! [`ArchiveBuilder::add_file`] or, for a whole tree,
//! [`ArchiveBuilder::add_files`], and written by [`ArchiveBuilder::save`].
//! The archive file appears at its path only when `save` succeeds.
//!
//! # Extracting
//!
//! [`Archive::extract`] checks every entry name before touching the target
//! and rejects names that would land outside it with [`Error::ZipSlip`].
//! Entries are decoded into a staging directory and merged on success.
//!
//! # Codecs
//!
//! The container format is behind the [`Codec`] trait; [`ZipCodec`] is the
//! default. Codec failures carry a [`CodecStatus`] whose message follows the
//! familiar zip library wording.

mod archive;
mod builder;
pub mod codec;
mod collect;
mod error;
mod extract;
mod options;
mod report;
mod sanitize;
mod status;

pub use archive::{Archive, create, extract, from_directory};
pub use builder::ArchiveBuilder;
pub use codec::{ArchiveReader, ArchiveWriter, Codec, Compression, OpenMode, RawEntry, ZipCodec};
pub use collect::{EntryMapping, PathCollector, collect};
pub use error::{Error, Result};
pub use extract::ArchiveExtractor;
pub use options::{
    CollectOptions, CreateOptions, ExtractOptions, FailurePolicy, HashStrategy, MaskScope, Progress,
};
pub use report::{AddReport, ExtractReport, ExtractedEntry};
pub use sanitize::{SanitizedPath, archive_name, sanitize_entry};
pub use status::{CodecStatus, StatusCode};
