//! Win32 implementation of the native OS layer

use super::{DirectorySource, FindRecord, NativeError, OpenMode, Sharing};
use crate::os_error::win32::{ERROR_ACCESS_DENIED, ERROR_FILE_NOT_FOUND};
use crate::path::make_path;
use crate::WideString;
use std::fs::{File, OpenOptions};
use std::os::windows::fs::OpenOptionsExt;
use windows::core::{PCSTR, PCWSTR};
use windows::Win32::Foundation::{BOOL, HANDLE};
use windows::Win32::Globalization::{
    GetACP, GetOEMCP, IsValidCodePage, MultiByteToWideChar, WideCharToMultiByte,
    MB_ERR_INVALID_CHARS, MULTI_BYTE_TO_WIDE_CHAR_FLAGS,
};
use windows::Win32::Storage::FileSystem::{
    FindClose, FindFirstFileW, FindNextFileW, FILE_ATTRIBUTE_DIRECTORY, FILE_SHARE_READ,
    FILE_SHARE_WRITE, WIN32_FIND_DATAW,
};

pub(crate) const ACCESS_DENIED: i32 = ERROR_ACCESS_DENIED as i32;
pub(crate) const NOT_FOUND: i32 = ERROR_FILE_NOT_FOUND as i32;

const CP_UTF8: u32 = 65001;
const WC_ERR_INVALID_CHARS: u32 = 0x80;

pub(crate) fn is_access_denied(raw: i32) -> bool {
    raw == ACCESS_DENIED
}

pub(crate) fn host_codepages() -> (u32, u32) {
    unsafe { (GetACP(), GetOEMCP()) }
}

pub(crate) fn is_codepage_supported(codepage: u32) -> bool {
    unsafe { IsValidCodePage(codepage).as_bool() }
}

/// Strictly decode `text`; any invalid sequence fails the whole conversion
pub(crate) fn decode_codepage(codepage: u32, text: &[u8]) -> Option<Vec<u16>> {
    if text.is_empty() {
        return Some(Vec::new());
    }

    let size = unsafe { MultiByteToWideChar(codepage, MB_ERR_INVALID_CHARS, text, None) };
    if size <= 0 {
        return None;
    }

    let mut wide = vec![0u16; size as usize];
    let written = unsafe {
        MultiByteToWideChar(codepage, MULTI_BYTE_TO_WIDE_CHAR_FLAGS(0), text, Some(&mut wide))
    };
    wide.truncate(written.max(0) as usize);
    Some(wide)
}

/// Encode `wide`, reporting whether the default character was used.
///
/// UTF-8 rejects unpaired surrogates instead of replacing them.
pub(crate) fn encode_codepage(codepage: u32, wide: &[u16]) -> Option<(Vec<u8>, bool)> {
    if wide.is_empty() {
        return Some((Vec::new(), false));
    }

    let flags = if codepage == CP_UTF8 { WC_ERR_INVALID_CHARS } else { 0 };
    let size = unsafe { WideCharToMultiByte(codepage, flags, wide, None, PCSTR::null(), None) };
    if size <= 0 {
        return None;
    }

    let mut narrow = vec![0u8; size as usize];
    let mut used_default = BOOL(0);
    // lpUsedDefaultChar must be null for CP_UTF8
    let tracking = (codepage != CP_UTF8).then_some(&mut used_default as *mut BOOL);
    let written = unsafe {
        WideCharToMultiByte(codepage, flags, wide, Some(&mut narrow), PCSTR::null(), tracking)
    };
    narrow.truncate(written.max(0) as usize);
    Some((narrow, used_default.as_bool()))
}

fn native_error(err: &windows::core::Error) -> NativeError {
    let hresult = err.code().0 as u32;
    if hresult & 0xFFFF_0000 == 0x8007_0000 {
        NativeError::from_raw((hresult & 0xFFFF) as i32)
    } else {
        NativeError::last()
    }
}

/// Directory enumeration through `FindFirstFileW`
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeDirectory;

/// Search handle, closed on drop
#[derive(Debug)]
pub struct FindHandle(HANDLE);

// SAFETY: a search handle is not tied to the thread that created it
unsafe impl Send for FindHandle {}

impl Drop for FindHandle {
    fn drop(&mut self) {
        if !self.0.is_invalid() {
            unsafe {
                let _ = FindClose(self.0);
            }
        }
    }
}

fn record_from(data: &WIN32_FIND_DATAW) -> FindRecord {
    let len = data
        .cFileName
        .iter()
        .position(|&unit| unit == 0)
        .unwrap_or(data.cFileName.len());
    let is_dir = data.dwFileAttributes & FILE_ATTRIBUTE_DIRECTORY.0 != 0;
    FindRecord::new(&data.cFileName[..len], is_dir)
}

impl DirectorySource for NativeDirectory {
    type Handle = FindHandle;

    fn find_first(&self, dir: &[u16]) -> Result<(FindHandle, FindRecord), NativeError> {
        let mut pattern = make_path(Some(dir), None, &[u16::from(b'*')]).into_vec();
        pattern.push(0);

        let mut data = WIN32_FIND_DATAW::default();
        let handle = unsafe { FindFirstFileW(PCWSTR(pattern.as_ptr()), &mut data) }
            .map_err(|e| native_error(&e))?;
        Ok((FindHandle(handle), record_from(&data)))
    }

    fn find_next(&self, handle: &mut FindHandle) -> Option<FindRecord> {
        let mut data = WIN32_FIND_DATAW::default();
        unsafe { FindNextFileW(handle.0, &mut data) }.ok()?;
        Some(record_from(&data))
    }
}

pub(crate) fn open_file(path: &[u16], mode: &OpenMode, sharing: Sharing) -> Result<File, NativeError> {
    let path = WideString::from(path).to_path_buf();
    let share_mode = match sharing {
        Sharing::DenyWrite => FILE_SHARE_READ.0,
        Sharing::DenyNone => FILE_SHARE_READ.0 | FILE_SHARE_WRITE.0,
    };

    OpenOptions::new()
        .read(mode.read)
        .write(mode.write)
        .append(mode.append)
        .create(mode.create)
        .create_new(mode.create_new)
        .truncate(mode.truncate)
        .share_mode(share_mode)
        .open(&path)
        .map_err(|e| NativeError::from_io(&e))
}
