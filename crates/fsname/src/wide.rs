//! WideString - owned native wide-character names

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::ops::Deref;
use std::path::PathBuf;

/// An owned sequence of UTF-16 code units in the OS's wide name representation.
///
/// Holds no terminator. On Windows the units are exactly what the OS stores;
/// elsewhere, name bytes that are not valid UTF-8 are carried as lone
/// surrogates `U+DC80..=U+DCFF` so the original bytes survive a round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WideString(Vec<u16>);

impl WideString {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    pub fn from_vec(units: Vec<u16>) -> Self {
        Self(units)
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<u16> {
        self.0
    }

    pub fn push(&mut self, unit: u16) {
        self.0.push(unit);
    }

    pub fn extend_from_slice(&mut self, units: &[u16]) {
        self.0.extend_from_slice(units);
    }

    /// Lossy UTF-8 rendering for logs and display
    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(&self.0)
    }

    /// Build from an OS string
    #[cfg(windows)]
    pub fn from_os_str(s: &OsStr) -> Self {
        use std::os::windows::ffi::OsStrExt;
        Self(s.encode_wide().collect())
    }

    /// Build from an OS string
    #[cfg(not(windows))]
    pub fn from_os_str(s: &OsStr) -> Self {
        use std::os::unix::ffi::OsStrExt;
        Self(bytes_to_wide(s.as_bytes()))
    }

    /// Convert back to an OS string
    #[cfg(windows)]
    pub fn to_os_string(&self) -> OsString {
        use std::os::windows::ffi::OsStringExt;
        OsString::from_wide(&self.0)
    }

    /// Convert back to an OS string
    #[cfg(not(windows))]
    pub fn to_os_string(&self) -> OsString {
        use std::os::unix::ffi::OsStringExt;
        OsString::from_vec(wide_to_bytes(&self.0))
    }

    pub fn to_path_buf(&self) -> PathBuf {
        PathBuf::from(self.to_os_string())
    }
}

/// Decode name bytes, escaping invalid UTF-8 bytes as lone low surrogates
#[cfg(not(windows))]
fn bytes_to_wide(bytes: &[u8]) -> Vec<u16> {
    let mut wide = Vec::with_capacity(bytes.len());
    let mut rest = bytes;

    while !rest.is_empty() {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                wide.extend(valid.encode_utf16());
                break;
            }
            Err(e) => {
                let (valid, after) = rest.split_at(e.valid_up_to());
                if let Ok(valid) = std::str::from_utf8(valid) {
                    wide.extend(valid.encode_utf16());
                }
                let invalid_len = e.error_len().unwrap_or(after.len());
                wide.extend(after[..invalid_len].iter().map(|&b| 0xDC00 | u16::from(b)));
                rest = &after[invalid_len..];
            }
        }
    }

    wide
}

#[cfg(not(windows))]
fn wide_to_bytes(wide: &[u16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(wide.len());
    let mut utf8 = [0u8; 4];

    for unit in char::decode_utf16(wide.iter().copied()) {
        match unit {
            Ok(c) => bytes.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes()),
            Err(e) => match e.unpaired_surrogate() {
                escaped @ 0xDC80..=0xDCFF => bytes.push((escaped & 0xFF) as u8),
                _ => bytes.extend_from_slice(
                    char::REPLACEMENT_CHARACTER.encode_utf8(&mut utf8).as_bytes(),
                ),
            },
        }
    }

    bytes
}

impl Deref for WideString {
    type Target = [u16];

    fn deref(&self) -> &[u16] {
        &self.0
    }
}

impl AsRef<[u16]> for WideString {
    fn as_ref(&self) -> &[u16] {
        &self.0
    }
}

impl From<Vec<u16>> for WideString {
    fn from(units: Vec<u16>) -> Self {
        Self(units)
    }
}

impl From<&[u16]> for WideString {
    fn from(units: &[u16]) -> Self {
        Self(units.to_vec())
    }
}

impl From<&str> for WideString {
    fn from(s: &str) -> Self {
        Self(s.encode_utf16().collect())
    }
}

impl From<&OsStr> for WideString {
    fn from(s: &OsStr) -> Self {
        Self::from_os_str(s)
    }
}

impl fmt::Display for WideString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_lossy())
    }
}
