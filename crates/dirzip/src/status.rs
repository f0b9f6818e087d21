//! Codec status codes and their human-readable messages.

use std::fmt;
use std::io;

/// Numeric status reported by an archive codec.
///
/// The values follow the libzip `ZIP_ER_*` numbering so that codes coming
/// from foreign codecs keep their meaning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StatusCode(pub i32);

impl StatusCode {
    pub const OK: Self = Self(0);
    pub const SEEK: Self = Self(4);
    pub const READ: Self = Self(5);
    pub const WRITE: Self = Self(6);
    pub const NO_ENTRY: Self = Self(9);
    pub const EXISTS: Self = Self(10);
    pub const OPEN: Self = Self(11);
    pub const MEMORY: Self = Self(14);
    pub const INVALID: Self = Self(18);
    pub const NOT_ZIP: Self = Self(19);
    pub const INCONSISTENT: Self = Self(21);

    /// Message from the fixed table, if this code is one of the known ones.
    pub fn known_message(self) -> Option<&'static str> {
        STATUS_MESSAGES
            .iter()
            .find(|(code, _)| *code == self)
            .map(|(_, message)| *message)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

const STATUS_MESSAGES: &[(StatusCode, &str)] = &[
    (StatusCode::EXISTS, "File already exists."),
    (StatusCode::INCONSISTENT, "Zip archive inconsistent."),
    (StatusCode::INVALID, "Invalid argument."),
    (StatusCode::MEMORY, "Malloc failure."),
    (StatusCode::NO_ENTRY, "No such file."),
    (StatusCode::NOT_ZIP, "Not a zip archive."),
    (StatusCode::OPEN, "Can't open file."),
    (StatusCode::READ, "Read error."),
    (StatusCode::SEEK, "Seek error."),
];

/// A failed codec call: the status code plus the codec's own description.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodecStatus {
    code:   StatusCode,
    detail: String,
}

impl CodecStatus {
    pub fn new(code: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }

    /// Map an I/O failure onto the closest codec status.
    ///
    /// `fallback` is used for error kinds with no dedicated code.
    pub fn from_io(err: &io::Error, fallback: StatusCode) -> Self {
        let code = match err.kind() {
            io::ErrorKind::NotFound => StatusCode::NO_ENTRY,
            io::ErrorKind::AlreadyExists => StatusCode::EXISTS,
            io::ErrorKind::PermissionDenied => StatusCode::OPEN,
            io::ErrorKind::OutOfMemory => StatusCode::MEMORY,
            io::ErrorKind::InvalidInput => StatusCode::INVALID,
            io::ErrorKind::InvalidData => StatusCode::INCONSISTENT,
            _ => fallback,
        };
        Self::new(code, err.to_string())
    }

    pub fn code(&self) -> StatusCode { self.code }

    pub fn detail(&self) -> &str { &self.detail }

    /// The table message for known codes, otherwise the codec's detail text.
    pub fn message(&self) -> &str {
        match self.code.known_message() {
            Some(message) => message,
            None => &self.detail,
        }
    }
}

impl fmt::Display for CodecStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.message()) }
}

impl From<&dirzip_fs::Error> for CodecStatus {
    fn from(err: &dirzip_fs::Error) -> Self {
        let code = match err {
            dirzip_fs::Error::AlreadyExists { .. } => StatusCode::EXISTS,
            dirzip_fs::Error::Read { .. } => StatusCode::READ,
            dirzip_fs::Error::NoParent { .. } => StatusCode::OPEN,
            dirzip_fs::Error::Write { .. }
            | dirzip_fs::Error::CreateDir { .. }
            | dirzip_fs::Error::Persist { .. } => StatusCode::WRITE,
        };
        Self::new(code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_use_table_message() {
        let status = CodecStatus::new(StatusCode::NOT_ZIP, "invalid Zip archive: EOCD not found");
        assert_eq!(status.message(), "Not a zip archive.");
        assert_eq!(status.to_string(), "Not a zip archive.");
        assert_eq!(status.detail(), "invalid Zip archive: EOCD not found");
    }

    #[test]
    fn unknown_codes_fall_back_to_detail() {
        let status = CodecStatus::new(StatusCode::WRITE, "disk full");
        assert_eq!(status.message(), "disk full");

        let status = CodecStatus::new(StatusCode(999), "something odd");
        assert_eq!(status.to_string(), "something odd");
    }

    #[test]
    fn table_covers_nine_codes() {
        let known = [
            StatusCode::EXISTS,
            StatusCode::INCONSISTENT,
            StatusCode::INVALID,
            StatusCode::MEMORY,
            StatusCode::NO_ENTRY,
            StatusCode::NOT_ZIP,
            StatusCode::OPEN,
            StatusCode::READ,
            StatusCode::SEEK,
        ];
        assert!(known.iter().all(|c| c.known_message().is_some()));
        assert!(StatusCode::OK.known_message().is_none());
        assert!(StatusCode::WRITE.known_message().is_none());
    }

    #[test]
    fn io_errors_map_to_codes() {
        let err = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert_eq!(CodecStatus::from_io(&err, StatusCode::READ).code(), StatusCode::NO_ENTRY);

        let err = io::Error::other("boom");
        let status = CodecStatus::from_io(&err, StatusCode::WRITE);
        assert_eq!(status.code(), StatusCode::WRITE);
        assert_eq!(status.message(), "boom");
    }

    #[test]
    fn fs_errors_map_to_codes() {
        let err = dirzip_fs::Error::AlreadyExists {
            path: "a.txt".into(),
        };
        assert_eq!(CodecStatus::from(&err).code(), StatusCode::EXISTS);
    }
}
