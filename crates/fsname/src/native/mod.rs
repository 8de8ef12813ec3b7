//! Native OS layer
//!
//! One implementation per platform family. Windows goes through the Win32
//! wide-character APIs; other hosts emulate them on top of `std::fs`,
//! `encoding_rs` and advisory `flock` locks.

#[cfg(windows)]
mod win32;
#[cfg(windows)]
use self::win32 as imp;

#[cfg(not(windows))]
mod unix;
#[cfg(not(windows))]
use self::unix as imp;

use crate::os_error::translate_os_error;
use crate::{PortableErrorCode, WideString};
use std::fmt;
use std::fs::File;
use std::io;

pub use imp::NativeDirectory;

pub(crate) use imp::{decode_codepage, encode_codepage, host_codepages, is_codepage_supported};

/// A native OS failure together with its portable translation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeError {
    raw: Option<i32>,
    code: PortableErrorCode,
}

impl NativeError {
    /// Wrap a raw OS error number of the host platform
    pub fn from_raw(raw: i32) -> Self {
        Self {
            raw: Some(raw),
            code: translate_os_error(raw).unwrap_or(PortableErrorCode::Unknown),
        }
    }

    pub fn from_io(err: &io::Error) -> Self {
        Self {
            raw: err.raw_os_error(),
            code: PortableErrorCode::from_io_error(err),
        }
    }

    /// The calling thread's most recent OS error
    pub fn last() -> Self {
        Self::from_io(&io::Error::last_os_error())
    }

    /// The error a native listing reports when access is denied
    pub fn access_denied() -> Self {
        Self::from_raw(imp::ACCESS_DENIED)
    }

    /// The error a native listing reports when nothing matches
    pub fn not_found() -> Self {
        Self::from_raw(imp::NOT_FOUND)
    }

    /// A lock held elsewhere prevents the requested sharing
    #[cfg(not(windows))]
    pub(crate) fn sharing_violation(raw: Option<i32>) -> Self {
        Self {
            raw,
            code: PortableErrorCode::AccessDenied,
        }
    }

    pub fn raw(&self) -> Option<i32> {
        self.raw
    }

    pub fn code(&self) -> PortableErrorCode {
        self.code
    }

    /// Exactly the native "access denied" error, not the wider family
    pub fn is_access_denied(&self) -> bool {
        self.raw.is_some_and(imp::is_access_denied)
    }
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.raw {
            Some(raw) => write!(f, "{} (os error {})", self.code, raw),
            None => write!(f, "{}", self.code),
        }
    }
}

/// One record produced by native directory enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindRecord {
    pub name: WideString,
    pub is_dir: bool,
}

impl FindRecord {
    pub fn new(name: impl Into<WideString>, is_dir: bool) -> Self {
        Self {
            name: name.into(),
            is_dir,
        }
    }
}

/// Native directory enumeration.
///
/// `find_first` lists every name in a directory and returns the first
/// record; the listing includes the `.` and `..` pseudo-entries where the
/// platform produces them. Dropping the handle releases the enumeration.
pub trait DirectorySource {
    type Handle;

    fn find_first(&self, dir: &[u16]) -> Result<(Self::Handle, FindRecord), NativeError>;

    /// Next record, or `None` once the listing has ended
    fn find_next(&self, handle: &mut Self::Handle) -> Option<FindRecord>;
}

/// Share mode requested when opening a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sharing {
    /// Other handles may read and write
    DenyNone,
    /// Other handles may only read
    DenyWrite,
}

/// Access flags of a parsed `fopen`-style mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenMode {
    pub read: bool,
    pub write: bool,
    pub append: bool,
    pub truncate: bool,
    pub create: bool,
    pub create_new: bool,
}

impl OpenMode {
    pub fn read_only() -> Self {
        Self {
            read: true,
            ..Default::default()
        }
    }

    pub fn is_writable(&self) -> bool {
        self.write || self.append
    }
}

/// Open a file by wide path with the given share mode
pub(crate) fn open_file(path: &[u16], mode: &OpenMode, sharing: Sharing) -> Result<File, NativeError> {
    imp::open_file(path, mode, sharing)
}
