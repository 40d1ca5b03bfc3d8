//! Error codes and internal error types.
//!
//! Public engine operations never return `Result`. They report failure
//! through a boolean or sentinel return value and leave a sticky
//! [`ErrorCode`] on the handle, retrievable afterwards. [`EngineError`] is
//! only used inside the crate for file work and is always folded into an
//! [`ErrorCode`] before it reaches a caller.

use std::io;
use thiserror::Error;

/// Status code shared by every backend kind.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Success.
    Success = 0,
    /// Threading error.
    Thread = 1,
    /// Invalid operation.
    Invalid = 2,
    /// File not found.
    NoFile = 3,
    /// No permission.
    NoPerm = 4,
    /// Invalid meta data.
    Meta = 5,
    /// Invalid record header.
    RecordHeader = 6,
    /// Open error.
    Open = 7,
    /// Close error.
    Close = 8,
    /// Trunc error.
    Trunc = 9,
    /// Sync error.
    Sync = 10,
    /// Stat error.
    Stat = 11,
    /// Seek error.
    Seek = 12,
    /// Read error.
    Read = 13,
    /// Write error.
    Write = 14,
    /// Mmap error.
    Mmap = 15,
    /// Lock error.
    Lock = 16,
    /// Unlink error.
    Unlink = 17,
    /// Rename error.
    Rename = 18,
    /// Mkdir error.
    Mkdir = 19,
    /// Rmdir error.
    Rmdir = 20,
    /// Existing record.
    Keep = 21,
    /// No record found.
    NoRecord = 22,
    /// Miscellaneous error.
    Misc = 9999,
}

impl ErrorCode {
    /// Every code, in declaration order.
    pub const ALL: [ErrorCode; 24] = [
        ErrorCode::Success,
        ErrorCode::Thread,
        ErrorCode::Invalid,
        ErrorCode::NoFile,
        ErrorCode::NoPerm,
        ErrorCode::Meta,
        ErrorCode::RecordHeader,
        ErrorCode::Open,
        ErrorCode::Close,
        ErrorCode::Trunc,
        ErrorCode::Sync,
        ErrorCode::Stat,
        ErrorCode::Seek,
        ErrorCode::Read,
        ErrorCode::Write,
        ErrorCode::Mmap,
        ErrorCode::Lock,
        ErrorCode::Unlink,
        ErrorCode::Rename,
        ErrorCode::Mkdir,
        ErrorCode::Rmdir,
        ErrorCode::Keep,
        ErrorCode::NoRecord,
        ErrorCode::Misc,
    ];

    /// Returns the numeric code.
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Returns true for [`ErrorCode::Success`].
    pub const fn is_success(self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Looks up a code by its numeric value.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.code() == code)
    }

    /// Constant name exposed to hosts, e.g. `"ENOREC"`.
    pub const fn name(self) -> &'static str {
        match self {
            ErrorCode::Success => "ESUCCESS",
            ErrorCode::Thread => "ETHREAD",
            ErrorCode::Invalid => "EINVALID",
            ErrorCode::NoFile => "ENOFILE",
            ErrorCode::NoPerm => "ENOPERM",
            ErrorCode::Meta => "EMETA",
            ErrorCode::RecordHeader => "ERHEAD",
            ErrorCode::Open => "EOPEN",
            ErrorCode::Close => "ECLOSE",
            ErrorCode::Trunc => "ETRUNC",
            ErrorCode::Sync => "ESYNC",
            ErrorCode::Stat => "ESTAT",
            ErrorCode::Seek => "ESEEK",
            ErrorCode::Read => "EREAD",
            ErrorCode::Write => "EWRITE",
            ErrorCode::Mmap => "EMMAP",
            ErrorCode::Lock => "ELOCK",
            ErrorCode::Unlink => "EUNLINK",
            ErrorCode::Rename => "ERENAME",
            ErrorCode::Mkdir => "EMKDIR",
            ErrorCode::Rmdir => "ERMDIR",
            ErrorCode::Keep => "EKEEP",
            ErrorCode::NoRecord => "ENOREC",
            ErrorCode::Misc => "EMISC",
        }
    }

    /// Human readable message.
    pub const fn message(self) -> &'static str {
        match self {
            ErrorCode::Success => "success",
            ErrorCode::Thread => "threading error",
            ErrorCode::Invalid => "invalid operation",
            ErrorCode::NoFile => "file not found",
            ErrorCode::NoPerm => "no permission",
            ErrorCode::Meta => "invalid meta data",
            ErrorCode::RecordHeader => "invalid record header",
            ErrorCode::Open => "open error",
            ErrorCode::Close => "close error",
            ErrorCode::Trunc => "trunc error",
            ErrorCode::Sync => "sync error",
            ErrorCode::Stat => "stat error",
            ErrorCode::Seek => "seek error",
            ErrorCode::Read => "read error",
            ErrorCode::Write => "write error",
            ErrorCode::Mmap => "mmap error",
            ErrorCode::Lock => "lock error",
            ErrorCode::Unlink => "unlink error",
            ErrorCode::Rename => "rename error",
            ErrorCode::Mkdir => "mkdir error",
            ErrorCode::Rmdir => "rmdir error",
            ErrorCode::Keep => "existing record",
            ErrorCode::NoRecord => "no record found",
            ErrorCode::Misc => "miscellaneous error",
        }
    }
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Returns the message for a raw numeric code.
///
/// Codes outside the table map to `"unknown error"`.
pub fn errmsg(code: i32) -> &'static str {
    ErrorCode::from_code(code).map_or("unknown error", ErrorCode::message)
}

/// Result type for internal file operations.
pub(crate) type EngineResult<T> = Result<T, EngineError>;

/// Failures of the snapshot file layer.
#[derive(Debug, Error)]
pub enum EngineError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file does not start with the snapshot header.
    #[error("bad file header: {0}")]
    BadHeader(String),

    /// The payload hash does not match the header.
    #[error("snapshot checksum mismatch")]
    Checksum,

    /// The payload could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// Another handle holds a conflicting lock.
    #[error("file is locked by another handle")]
    Locked,
}

impl EngineError {
    /// Maps the failure onto the shared code table.
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::Io(e) => match e.kind() {
                io::ErrorKind::NotFound => ErrorCode::NoFile,
                io::ErrorKind::PermissionDenied => ErrorCode::NoPerm,
                io::ErrorKind::UnexpectedEof => ErrorCode::Read,
                io::ErrorKind::WouldBlock => ErrorCode::Lock,
                _ => ErrorCode::Open,
            },
            EngineError::BadHeader(_) | EngineError::Checksum | EngineError::Codec(_) => {
                ErrorCode::Meta
            }
            EngineError::Locked => ErrorCode::Lock,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_native_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::NoFile.code(), 3);
        assert_eq!(ErrorCode::Keep.code(), 21);
        assert_eq!(ErrorCode::NoRecord.code(), 22);
        assert_eq!(ErrorCode::Misc.code(), 9999);
    }

    #[test]
    fn from_code_round_trips_every_entry() {
        for code in ErrorCode::ALL {
            assert_eq!(ErrorCode::from_code(code.code()), Some(code));
        }
        assert_eq!(ErrorCode::from_code(23), None);
    }

    #[test]
    fn messages() {
        assert_eq!(errmsg(0), "success");
        assert_eq!(errmsg(22), "no record found");
        assert_eq!(errmsg(-7), "unknown error");
        assert_eq!(ErrorCode::Lock.name(), "ELOCK");
    }

    #[test]
    fn io_errors_map_to_codes() {
        let missing = EngineError::from(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert_eq!(missing.code(), ErrorCode::NoFile);

        let denied = EngineError::from(io::Error::new(io::ErrorKind::PermissionDenied, "no"));
        assert_eq!(denied.code(), ErrorCode::NoPerm);

        assert_eq!(EngineError::Checksum.code(), ErrorCode::Meta);
        assert_eq!(EngineError::Locked.code(), ErrorCode::Lock);
    }
}
