//! fsname-ls - list directories through the name compatibility layer
//!
//! Usage: `fsname-ls [DIR...]`

use anyhow::Result;
use fsname::{
    can_open_exclusive, make_path, CodepageSelector, CursorState, DirectoryIterator, FsConfig, NameCodec, WideString,
};
use std::ffi::OsString;
use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> Result<ExitCode> {
    let _log = fsname_log::init()?;

    if let Err(e) = fsname_log::cleanup_old_logs(7) {
        tracing::warn!("Failed to cleanup old logs: {}", e);
    }

    let config = FsConfig::load().unwrap_or_else(|e| {
        tracing::warn!("Ignoring unreadable configuration: {}", e);
        FsConfig::default()
    });
    config.codec()?.install()?;
    let codec = NameCodec::global();

    let mut dirs: Vec<OsString> = std::env::args_os().skip(1).collect();
    if dirs.is_empty() {
        dirs.push(OsString::from("."));
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut failed = false;

    for dir in &dirs {
        if dirs.len() > 1 {
            writeln!(out, "{}:", dir.to_string_lossy())?;
        }
        if !list_dir(&codec, dir, &mut out)? {
            failed = true;
        }
    }

    Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

/// Print one directory; returns false when it could not be listed
fn list_dir(codec: &NameCodec, dir: &OsString, out: &mut impl Write) -> Result<bool> {
    let wide_dir = WideString::from_os_str(dir);

    let mut iter = match DirectoryIterator::open_wide(codec, &wide_dir) {
        Ok(iter) => iter,
        Err(e) => {
            eprintln!("{}: {}", dir.to_string_lossy(), e.code());
            return Ok(false);
        }
    };

    if iter.state() == CursorState::Exhausted {
        if let Some(code) = iter.diagnostic() {
            eprintln!("{}: {}", dir.to_string_lossy(), code);
            return Ok(false);
        }
    }

    while let Some(entry) = iter.advance() {
        let display = codec
            .narrow_to_utf8(entry.name())
            .unwrap_or_else(|| String::from_utf8_lossy(entry.name()).into_owned());

        if entry.is_dir() {
            writeln!(out, "{}/", display)?;
            continue;
        }

        if is_locked(codec, &wide_dir, entry.wide_name()) {
            writeln!(out, "{} [locked]", display)?;
        } else {
            writeln!(out, "{}", display)?;
        }
    }

    Ok(true)
}

/// Check whether another handle keeps the file from being locked.
///
/// A path the active encoding cannot spell exactly is never probed, and is
/// not reported as locked.
fn is_locked(codec: &NameCodec, dir: &[u16], name: &[u16]) -> bool {
    let full = make_path(Some(dir), None, name);
    match codec.wide_to_narrow(&full, CodepageSelector::Default, true).into_faithful() {
        Some(path) => !can_open_exclusive(codec, &path),
        None => {
            tracing::debug!("Not probing {}: not representable in the active encoding", full);
            false
        }
    }
}
