//! Emulation of the wide-character OS layer on POSIX hosts

use super::{DirectorySource, FindRecord, NativeError, OpenMode, Sharing};
use crate::WideString;
use encoding_rs::{EncoderResult, Encoding};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;

pub(crate) const ACCESS_DENIED: i32 = libc::EACCES;
pub(crate) const NOT_FOUND: i32 = libc::ENOENT;

const CP_UTF8: u32 = 65001;

/// Codepages assumed when the host has no notion of them
const DEFAULT_SYSTEM_CODEPAGE: u32 = 1252;
const DEFAULT_OEM_CODEPAGE: u32 = 866;

pub(crate) fn is_access_denied(raw: i32) -> bool {
    raw == libc::EACCES || raw == libc::EPERM
}

pub(crate) fn host_codepages() -> (u32, u32) {
    (DEFAULT_SYSTEM_CODEPAGE, DEFAULT_OEM_CODEPAGE)
}

/// Map a Windows codepage number to the matching codec
fn encoding_for(codepage: u32) -> Option<&'static Encoding> {
    let encoding = match codepage {
        CP_UTF8 => encoding_rs::UTF_8,
        866 => encoding_rs::IBM866,
        874 => encoding_rs::WINDOWS_874,
        932 => encoding_rs::SHIFT_JIS,
        936 => encoding_rs::GBK,
        949 => encoding_rs::EUC_KR,
        950 => encoding_rs::BIG5,
        1250 => encoding_rs::WINDOWS_1250,
        1251 => encoding_rs::WINDOWS_1251,
        1252 => encoding_rs::WINDOWS_1252,
        1253 => encoding_rs::WINDOWS_1253,
        1254 => encoding_rs::WINDOWS_1254,
        1255 => encoding_rs::WINDOWS_1255,
        1256 => encoding_rs::WINDOWS_1256,
        1257 => encoding_rs::WINDOWS_1257,
        1258 => encoding_rs::WINDOWS_1258,
        10000 => encoding_rs::MACINTOSH,
        10007 => encoding_rs::X_MAC_CYRILLIC,
        20866 => encoding_rs::KOI8_R,
        21866 => encoding_rs::KOI8_U,
        20932 | 51932 => encoding_rs::EUC_JP,
        28592 => encoding_rs::ISO_8859_2,
        28593 => encoding_rs::ISO_8859_3,
        28594 => encoding_rs::ISO_8859_4,
        28595 => encoding_rs::ISO_8859_5,
        28596 => encoding_rs::ISO_8859_6,
        28597 => encoding_rs::ISO_8859_7,
        28598 => encoding_rs::ISO_8859_8,
        28603 => encoding_rs::ISO_8859_13,
        28605 => encoding_rs::ISO_8859_15,
        50220 => encoding_rs::ISO_2022_JP,
        54936 => encoding_rs::GB18030,
        _ => return None,
    };
    Some(encoding)
}

pub(crate) fn is_codepage_supported(codepage: u32) -> bool {
    encoding_for(codepage).is_some()
}

/// Strictly decode `text`; any malformed sequence fails the whole conversion
pub(crate) fn decode_codepage(codepage: u32, text: &[u8]) -> Option<Vec<u16>> {
    let encoding = encoding_for(codepage)?;
    let decoded = encoding.decode_without_bom_handling_and_without_replacement(text)?;
    Some(decoded.encode_utf16().collect())
}

/// Encode `wide`, replacing unmappable characters with `?`.
///
/// Returns the bytes and whether a replacement happened. UTF-8 never
/// replaces: unpaired surrogates fail the conversion instead.
pub(crate) fn encode_codepage(codepage: u32, wide: &[u16]) -> Option<(Vec<u8>, bool)> {
    let encoding = encoding_for(codepage)?;
    if encoding == encoding_rs::UTF_8 {
        return String::from_utf16(wide).ok().map(|s| (s.into_bytes(), false));
    }

    let mut substituted = false;
    let text: String = char::decode_utf16(wide.iter().copied())
        .map(|unit| {
            unit.unwrap_or_else(|_| {
                substituted = true;
                '?'
            })
        })
        .collect();

    let mut encoder = encoding.new_encoder();
    let mut narrow = Vec::with_capacity(text.len() + 8);
    let mut rest = text.as_str();
    loop {
        let (result, read) = encoder.encode_from_utf8_to_vec_without_replacement(rest, &mut narrow, true);
        rest = &rest[read..];
        match result {
            EncoderResult::InputEmpty => break,
            EncoderResult::OutputFull => narrow.reserve(rest.len() + 8),
            EncoderResult::Unmappable(_) => {
                narrow.push(b'?');
                substituted = true;
            }
        }
    }

    Some((narrow, substituted))
}

/// Directory enumeration over `std::fs::read_dir`
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeDirectory;

/// Open listing; the parent pseudo-entry is queued ahead of the real names
#[derive(Debug)]
pub struct ReadDirHandle {
    pending: Option<FindRecord>,
    entries: fs::ReadDir,
}

impl DirectorySource for NativeDirectory {
    type Handle = ReadDirHandle;

    fn find_first(&self, dir: &[u16]) -> Result<(ReadDirHandle, FindRecord), NativeError> {
        let dir = if dir.is_empty() {
            PathBuf::from(".")
        } else {
            WideString::from(dir).to_path_buf()
        };
        let entries = fs::read_dir(&dir).map_err(|e| NativeError::from_io(&e))?;

        let handle = ReadDirHandle {
            pending: Some(FindRecord::new("..", true)),
            entries,
        };
        Ok((handle, FindRecord::new(".", true)))
    }

    fn find_next(&self, handle: &mut ReadDirHandle) -> Option<FindRecord> {
        if let Some(record) = handle.pending.take() {
            return Some(record);
        }

        let entry = match handle.entries.next()? {
            Ok(entry) => entry,
            Err(e) => {
                tracing::trace!("Directory listing ended early: {}", e);
                return None;
            }
        };

        let is_dir = match entry.file_type() {
            Ok(file_type) if file_type.is_symlink() => entry.path().is_dir(),
            Ok(file_type) => file_type.is_dir(),
            Err(_) => false,
        };

        Some(FindRecord::new(WideString::from_os_str(&entry.file_name()), is_dir))
    }
}

/// Open a file, emulating Windows share modes with advisory locks.
///
/// "Deny writers" takes a shared lock for read-only handles and an exclusive
/// lock for writable ones, so a probe fails while a writer holds the file.
pub(crate) fn open_file(path: &[u16], mode: &OpenMode, sharing: Sharing) -> Result<File, NativeError> {
    let path = WideString::from(path).to_path_buf();
    let lock = match sharing {
        Sharing::DenyNone => None,
        Sharing::DenyWrite if mode.is_writable() => Some(libc::LOCK_EX),
        Sharing::DenyWrite => Some(libc::LOCK_SH),
    };

    // Truncation waits until the lock is held
    let file = OpenOptions::new()
        .read(mode.read)
        .write(mode.write)
        .append(mode.append)
        .create(mode.create)
        .create_new(mode.create_new)
        .truncate(mode.truncate && lock.is_none())
        .open(&path)
        .map_err(|e| NativeError::from_io(&e))?;

    if let Some(operation) = lock {
        lock_file(&file, operation)?;
        if mode.truncate {
            file.set_len(0).map_err(|e| NativeError::from_io(&e))?;
        }
    }

    Ok(file)
}

fn lock_file(file: &File, operation: libc::c_int) -> Result<(), NativeError> {
    // SAFETY: the descriptor is owned by `file` and stays open for the call
    let rc = unsafe { libc::flock(file.as_raw_fd(), operation | libc::LOCK_NB) };
    if rc == 0 {
        return Ok(());
    }

    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::EWOULDBLOCK) {
        Err(NativeError::sharing_violation(err.raw_os_error()))
    } else {
        Err(NativeError::from_io(&err))
    }
}
