//! FsName - file name compatibility layer
//!
//! Lets an application work with file and directory names in one narrow
//! encoding (UTF-8, the system ANSI codepage, or the OEM codepage) while the
//! OS works with its native wide names:
//! - Codepage conversion with a primary/secondary retry policy
//! - Path composition in the wide representation
//! - Exclusive ("deny other writers") file opening and probing
//! - A one-entry-at-a-time directory iterator
//! - Translation of OS errors into portable error codes

mod codepage;
mod config;
mod dir_iter;
mod exclusive;
pub mod native;
pub mod os_error;
mod path;
mod wide;

pub use codepage::{utf8_to_wide, Attempt, Codepage, CodepageSelector, Conversion, EncodingMode, NameCodec};
pub use config::FsConfig;
pub use dir_iter::{CursorState, DirEntry, DirectoryIterator, Entries, OwnedDirEntry};
pub use exclusive::{can_open_exclusive, open_file};
pub use native::{DirectorySource, FindRecord, NativeDirectory, NativeError};
pub use os_error::{translate_last_os_error, translate_os_error, PortableErrorCode};
pub use path::{is_separator, make_path, SEPARATOR};
pub use wide::WideString;

use thiserror::Error;

/// File name layer errors
#[derive(Error, Debug)]
pub enum FsError {
    #[error("{path}: {code}")]
    Os {
        code: PortableErrorCode,
        raw: Option<i32>,
        path: String,
    },

    #[error("Name not representable in any configured codepage: {0}")]
    Conversion(String),

    #[error("Invalid open mode: {0}")]
    InvalidMode(String),

    #[error("Unsupported codepage: {0}")]
    UnsupportedCodepage(u32),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FsError {
    /// Portable code to report for this error
    pub fn code(&self) -> PortableErrorCode {
        match self {
            FsError::Os { code, .. } => *code,
            FsError::Conversion(_)
            | FsError::InvalidMode(_)
            | FsError::UnsupportedCodepage(_)
            | FsError::Config(_) => PortableErrorCode::InvalidArgument,
            FsError::Io(e) => PortableErrorCode::from_io_error(e),
        }
    }

    pub(crate) fn native(err: NativeError, path: &[u8]) -> Self {
        FsError::Os {
            code: err.code(),
            raw: err.raw(),
            path: String::from_utf8_lossy(path).into_owned(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FsError>;
