//! Translation of native OS error numbers into a portable error taxonomy

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;

/// Portable error code reported for every failed OS operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortableErrorCode {
    NotFound,
    AccessDenied,
    TooManyOpenFiles,
    InvalidHandle,
    OutOfMemory,
    InvalidArgument,
    BrokenPipe,
    DiskFull,
    AlreadyExists,
    TemporarilyUnavailable,
    /// No OS error number was available to translate
    Unknown,
}

/// Win32 error numbers consulted by the translation table
pub mod win32 {
    pub const NO_ERROR: u32 = 0;
    pub const ERROR_FILE_NOT_FOUND: u32 = 2;
    pub const ERROR_PATH_NOT_FOUND: u32 = 3;
    pub const ERROR_TOO_MANY_OPEN_FILES: u32 = 4;
    pub const ERROR_ACCESS_DENIED: u32 = 5;
    pub const ERROR_INVALID_HANDLE: u32 = 6;
    pub const ERROR_NOT_ENOUGH_MEMORY: u32 = 8;
    pub const ERROR_INVALID_BLOCK: u32 = 9;
    pub const ERROR_INVALID_ACCESS: u32 = 12;
    pub const ERROR_INVALID_DATA: u32 = 13;
    pub const ERROR_INVALID_DRIVE: u32 = 15;
    pub const ERROR_NO_MORE_FILES: u32 = 18;
    pub const ERROR_WRITE_PROTECT: u32 = 19;
    pub const ERROR_SHARING_VIOLATION: u32 = 32;
    pub const ERROR_LOCK_VIOLATION: u32 = 33;
    pub const ERROR_SHARING_BUFFER_EXCEEDED: u32 = 36;
    pub const ERROR_BAD_NETPATH: u32 = 53;
    pub const ERROR_NETWORK_ACCESS_DENIED: u32 = 65;
    pub const ERROR_FAIL_I24: u32 = 83;
    pub const ERROR_INVALID_PARAMETER: u32 = 87;
    pub const ERROR_DRIVE_LOCKED: u32 = 108;
    pub const ERROR_BROKEN_PIPE: u32 = 109;
    pub const ERROR_DISK_FULL: u32 = 112;
    pub const ERROR_SEEK_ON_DEVICE: u32 = 132;
    pub const ERROR_NOT_LOCKED: u32 = 158;
    pub const ERROR_BAD_PATHNAME: u32 = 161;
    pub const ERROR_LOCK_FAILED: u32 = 167;
    pub const ERROR_ALREADY_EXISTS: u32 = 183;
    pub const ERROR_FILENAME_EXCED_RANGE: u32 = 206;
    pub const ERROR_NESTING_NOT_ALLOWED: u32 = 215;
    pub const ERROR_NO_DATA: u32 = 232;
    pub const ERROR_NO_UNICODE_TRANSLATION: u32 = 1113;
    pub const ERROR_NOT_ENOUGH_QUOTA: u32 = 1816;
}

impl PortableErrorCode {
    /// Translate a Win32 error number. `NO_ERROR` has no translation.
    pub fn from_win32(code: u32) -> Option<Self> {
        use win32::*;

        let portable = match code {
            NO_ERROR => return None,
            ERROR_FILE_NOT_FOUND
            | ERROR_PATH_NOT_FOUND
            | ERROR_INVALID_DRIVE
            | ERROR_BAD_NETPATH
            | ERROR_BAD_PATHNAME
            | ERROR_FILENAME_EXCED_RANGE => Self::NotFound,
            ERROR_TOO_MANY_OPEN_FILES => Self::TooManyOpenFiles,
            ERROR_ACCESS_DENIED
            | ERROR_SHARING_VIOLATION
            | ERROR_NETWORK_ACCESS_DENIED
            | ERROR_FAIL_I24
            | ERROR_SEEK_ON_DEVICE
            | ERROR_LOCK_VIOLATION
            | ERROR_DRIVE_LOCKED
            | ERROR_NOT_LOCKED
            | ERROR_LOCK_FAILED => Self::AccessDenied,
            ERROR_INVALID_HANDLE => Self::InvalidHandle,
            ERROR_NOT_ENOUGH_MEMORY | ERROR_INVALID_BLOCK | ERROR_NOT_ENOUGH_QUOTA => {
                Self::OutOfMemory
            }
            ERROR_INVALID_ACCESS | ERROR_INVALID_DATA | ERROR_INVALID_PARAMETER => {
                Self::InvalidArgument
            }
            ERROR_BROKEN_PIPE | ERROR_NO_DATA => Self::BrokenPipe,
            ERROR_DISK_FULL => Self::DiskFull,
            ERROR_ALREADY_EXISTS => Self::AlreadyExists,
            ERROR_NESTING_NOT_ALLOWED => Self::TemporarilyUnavailable,
            // device and media access errors
            ERROR_WRITE_PROTECT..=ERROR_SHARING_BUFFER_EXCEEDED => Self::AccessDenied,
            _ => Self::InvalidArgument,
        };

        Some(portable)
    }

    /// Translate a POSIX errno value. Zero has no translation.
    #[cfg(not(windows))]
    pub fn from_errno(errno: i32) -> Option<Self> {
        let portable = match errno {
            0 => return None,
            libc::ENOENT | libc::ENOTDIR | libc::ENAMETOOLONG | libc::ELOOP => Self::NotFound,
            libc::EMFILE | libc::ENFILE => Self::TooManyOpenFiles,
            libc::EACCES | libc::EPERM | libc::EROFS | libc::ETXTBSY => Self::AccessDenied,
            libc::EBADF => Self::InvalidHandle,
            libc::ENOMEM => Self::OutOfMemory,
            libc::EPIPE => Self::BrokenPipe,
            libc::ENOSPC | libc::EDQUOT => Self::DiskFull,
            libc::EEXIST => Self::AlreadyExists,
            libc::EAGAIN => Self::TemporarilyUnavailable,
            _ => Self::InvalidArgument,
        };

        Some(portable)
    }

    /// Translate an I/O error, preferring its raw OS number
    pub fn from_io_error(err: &io::Error) -> Self {
        if let Some(raw) = err.raw_os_error() {
            if let Some(code) = translate_os_error(raw) {
                return code;
            }
        }

        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::PermissionDenied => Self::AccessDenied,
            io::ErrorKind::AlreadyExists => Self::AlreadyExists,
            io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData => Self::InvalidArgument,
            io::ErrorKind::BrokenPipe => Self::BrokenPipe,
            io::ErrorKind::WouldBlock => Self::TemporarilyUnavailable,
            io::ErrorKind::OutOfMemory => Self::OutOfMemory,
            _ => Self::Unknown,
        }
    }

    /// Short human readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotFound => "No such file or directory",
            Self::AccessDenied => "Permission denied",
            Self::TooManyOpenFiles => "Too many open files",
            Self::InvalidHandle => "Bad file descriptor",
            Self::OutOfMemory => "Not enough memory",
            Self::InvalidArgument => "Invalid argument",
            Self::BrokenPipe => "Broken pipe",
            Self::DiskFull => "No space left on device",
            Self::AlreadyExists => "File exists",
            Self::TemporarilyUnavailable => "Resource temporarily unavailable",
            Self::Unknown => "Unknown error",
        }
    }
}

impl fmt::Display for PortableErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl From<&io::Error> for PortableErrorCode {
    fn from(err: &io::Error) -> Self {
        Self::from_io_error(err)
    }
}

/// Translate a raw OS error number of the host platform
#[cfg(windows)]
pub fn translate_os_error(raw: i32) -> Option<PortableErrorCode> {
    PortableErrorCode::from_win32(raw as u32)
}

/// Translate a raw OS error number of the host platform
#[cfg(not(windows))]
pub fn translate_os_error(raw: i32) -> Option<PortableErrorCode> {
    PortableErrorCode::from_errno(raw)
}

/// Translate the calling thread's most recent OS error.
///
/// Reads the error without modifying it, so repeated calls agree.
pub fn translate_last_os_error() -> Option<PortableErrorCode> {
    io::Error::last_os_error()
        .raw_os_error()
        .and_then(translate_os_error)
}
