//! Opening files with "deny other writers" sharing

use crate::native::{self, NativeError, OpenMode, Sharing};
use crate::{Attempt, FsError, NameCodec, PortableErrorCode, Result};
use std::fs::File;

/// Parse a C `fopen`-style mode such as `"rb"`, `"w+"` or `"ab"`
fn parse_mode(mode: &str) -> Result<OpenMode> {
    let invalid = || FsError::InvalidMode(mode.to_string());
    let mut chars = mode.chars();

    let mut open_mode = match chars.next() {
        Some('r') => OpenMode::read_only(),
        Some('w') => OpenMode {
            write: true,
            create: true,
            truncate: true,
            ..Default::default()
        },
        Some('a') => OpenMode {
            append: true,
            create: true,
            ..Default::default()
        },
        _ => return Err(invalid()),
    };

    let mut seen_plus = false;
    for c in chars {
        match c {
            '+' if !seen_plus => {
                seen_plus = true;
                open_mode.read = true;
                if !open_mode.append {
                    open_mode.write = true;
                }
            }
            'b' | 't' => {}
            'x' if open_mode.truncate => {
                open_mode.create_new = true;
                open_mode.truncate = false;
            }
            _ => return Err(invalid()),
        }
    }

    Ok(open_mode)
}

/// Open a file whose path is given in the active narrow encoding.
///
/// The path is converted with the primary codepage first; the secondary one
/// is tried when that conversion fails or the file is not found under the
/// first spelling. With `exclusive`, other handles are denied write access
/// for as long as the returned file stays open.
pub fn open_file(codec: &NameCodec, path: &[u8], mode: &str, exclusive: bool) -> Result<File> {
    let open_mode = parse_mode(mode)?;
    let sharing = if exclusive {
        Sharing::DenyWrite
    } else {
        Sharing::DenyNone
    };

    let mut last_error: Option<NativeError> = None;
    for attempt in Attempt::ALL {
        let Some(wide) = codec.narrow_to_wide(path, attempt) else {
            continue;
        };

        match native::open_file(&wide, &open_mode, sharing) {
            Ok(file) => {
                tracing::debug!(
                    "Opened {} (mode {}, exclusive {}, attempt {})",
                    wide,
                    mode,
                    exclusive,
                    attempt.index()
                );
                return Ok(file);
            }
            Err(err) => {
                let retry = err.code() == PortableErrorCode::NotFound;
                tracing::trace!("Open of {} failed: {}", wide, err);
                last_error = Some(err);
                if !retry {
                    break;
                }
            }
        }
    }

    Err(match last_error {
        Some(err) => FsError::native(err, path),
        None => FsError::Conversion(String::from_utf8_lossy(path).into_owned()),
    })
}

/// Check whether the file could currently be opened with writers denied.
///
/// The probe handle is closed immediately; no lock outlives the call.
pub fn can_open_exclusive(codec: &NameCodec, path: &[u8]) -> bool {
    Attempt::ALL.into_iter().any(|attempt| {
        codec
            .narrow_to_wide(path, attempt)
            .is_some_and(|wide| native::open_file(&wide, &OpenMode::read_only(), Sharing::DenyWrite).is_ok())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EncodingMode;
    use std::io::{Read, Write};

    fn utf8_path(path: &std::path::Path) -> Vec<u8> {
        path.to_str().unwrap().as_bytes().to_vec()
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode("rb").unwrap(), OpenMode::read_only());

        let write = parse_mode("w+b").unwrap();
        assert!(write.read && write.write && write.truncate && write.create);

        let append = parse_mode("a+").unwrap();
        assert!(append.read && append.append && !append.write);

        let create_new = parse_mode("wx").unwrap();
        assert!(create_new.create_new && !create_new.truncate);

        for bad in ["", "q", "r++", "rx", "rw"] {
            assert!(matches!(parse_mode(bad), Err(FsError::InvalidMode(_))), "{:?}", bad);
        }
    }

    #[test]
    fn test_open_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = utf8_path(&dir.path().join("data.txt"));
        let codec = NameCodec::new(EncodingMode::Universal);

        let mut file = open_file(&codec, &path, "wb", true).unwrap();
        file.write_all(b"payload").unwrap();
        drop(file);

        let mut content = String::new();
        open_file(&codec, &path, "rb", false)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "payload");
    }

    #[test]
    fn test_missing_file_reports_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = utf8_path(&dir.path().join("missing.txt"));
        let codec = NameCodec::new(EncodingMode::Universal);

        let err = open_file(&codec, &path, "r", false).unwrap_err();
        assert_eq!(err.code(), PortableErrorCode::NotFound);
    }

    #[test]
    fn test_invalid_mode_is_invalid_argument() {
        let codec = NameCodec::new(EncodingMode::Universal);
        let err = open_file(&codec, b"whatever", "z", false).unwrap_err();
        assert_eq!(err.code(), PortableErrorCode::InvalidArgument);
    }

    #[test]
    fn test_probe_free_then_held() {
        let dir = tempfile::tempdir().unwrap();
        let path = utf8_path(&dir.path().join("probe.bin"));
        let codec = NameCodec::new(EncodingMode::Universal);

        drop(open_file(&codec, &path, "wb", false).unwrap());
        assert!(can_open_exclusive(&codec, &path));

        let held = open_file(&codec, &path, "r+b", true).unwrap();
        assert!(!can_open_exclusive(&codec, &path));

        drop(held);
        assert!(can_open_exclusive(&codec, &path));
    }

    fn legacy_codec() -> NameCodec {
        NameCodec::with_codepages(EncodingMode::SystemLegacy, 1251, 866).unwrap()
    }

    #[test]
    fn test_legacy_mode_opens_utf8_name_on_second_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Привет.txt");
        std::fs::write(&file, b"hello").unwrap();
        let path = utf8_path(&file);
        let codec = legacy_codec();

        // Read as windows-1251 the UTF-8 bytes name a different, missing file
        let primary = codec.narrow_to_wide(&path, Attempt::Primary).unwrap();
        assert_ne!(primary.to_path_buf(), file);

        let mut content = String::new();
        open_file(&codec, &path, "rb", false)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "hello");
        assert!(can_open_exclusive(&codec, &path));
    }

    #[test]
    fn test_conflict_on_first_attempt_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Привет.txt");
        std::fs::write(&file, b"utf8 spelling").unwrap();
        let path = utf8_path(&file);
        let codec = legacy_codec();

        // Create and hold the file the first attempt resolves to
        let primary = codec.narrow_to_wide(&path, Attempt::Primary).unwrap();
        std::fs::write(primary.to_path_buf(), b"legacy spelling").unwrap();
        let writer = OpenMode {
            read: true,
            write: true,
            ..Default::default()
        };
        let _held = native::open_file(&primary, &writer, Sharing::DenyWrite).unwrap();

        let err = open_file(&codec, &path, "rb", true).unwrap_err();
        assert_eq!(err.code(), PortableErrorCode::AccessDenied);

        // The probe tries every spelling, and the UTF-8 one is free
        assert!(can_open_exclusive(&codec, &path));
    }

    #[test]
    fn test_unconvertible_path_is_conversion_error() {
        // A dangling Shift_JIS lead byte is invalid in both UTF-8 and cp932
        let codec = NameCodec::with_codepages(EncodingMode::Universal, 932, 866).unwrap();
        let path = [b'a', 0x81];

        let err = open_file(&codec, &path, "rb", false).unwrap_err();
        assert!(matches!(err, FsError::Conversion(_)));
        assert_eq!(err.code(), PortableErrorCode::InvalidArgument);
        assert!(!can_open_exclusive(&codec, &path));
    }

    #[test]
    fn test_probe_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = utf8_path(&dir.path().join("nothing"));
        assert!(!can_open_exclusive(&NameCodec::new(EncodingMode::Universal), &path));
    }
}
