use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::status::{CodecStatus, StatusCode};

const SEPARATORS: [char; 2] = ['/', '\\'];

/// Result of checking an archive entry name against an extraction root.
#[derive(Clone, Debug)]
pub struct SanitizedPath {
    pub original: String,
    /// Path below the extraction root. Empty for the root itself.
    pub relative: PathBuf,
    pub resolved: PathBuf,
}

/// Normalize a requested archive name for storage.
///
/// Leading separators are stripped so entries are always relative, empty
/// and `.` segments are dropped, and `/` is the only separator stored.
/// Names that are empty afterwards, or that contain a `..` segment, are
/// rejected with an `INVALID` status.
pub fn archive_name(requested: &str) -> std::result::Result<String, CodecStatus> {
    let mut segments = Vec::new();
    for segment in requested.split(SEPARATORS) {
        match segment {
            "" | "." => {}
            ".." => {
                return Err(CodecStatus::new(
                    StatusCode::INVALID,
                    format!("entry name '{requested}' escapes the archive root"),
                ));
            }
            part => segments.push(part),
        }
    }

    if segments.is_empty() {
        return Err(CodecStatus::new(
            StatusCode::INVALID,
            format!("entry name '{requested}' is empty"),
        ));
    }

    Ok(segments.join("/"))
}

/// Resolve a stored entry name below `base`, rejecting zip-slip names.
///
/// Absolute names, drive-prefixed names and any `..` segment fail with
/// [`Error::ZipSlip`]. `.` and empty segments are dropped.
pub fn sanitize_entry(entry: &str, base: &Path) -> Result<SanitizedPath> {
    let zip_slip = |resolved: PathBuf| Error::ZipSlip {
        entry: entry.to_owned(),
        resolved,
    };

    if entry.starts_with(SEPARATORS) || has_drive_prefix(entry) {
        return Err(zip_slip(PathBuf::from(entry)));
    }

    let mut relative = PathBuf::new();
    for segment in entry.split(SEPARATORS) {
        match segment {
            "" | "." => {}
            ".." => return Err(zip_slip(base.join(entry))),
            part => relative.push(part),
        }
    }

    // Catches anything the platform still treats as rooted.
    if relative.has_root() || relative.is_absolute() {
        return Err(zip_slip(relative));
    }

    Ok(SanitizedPath {
        original: entry.to_owned(),
        resolved: base.join(&relative),
        relative,
    })
}

fn has_drive_prefix(entry: &str) -> bool {
    let bytes = entry.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
