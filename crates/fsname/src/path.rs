//! Joining directory and file names in the wide representation

use crate::WideString;

/// Separator inserted between a directory and a file name
pub const SEPARATOR: u16 = std::path::MAIN_SEPARATOR as u16;

/// Check whether a wide code unit is a path separator on this platform
pub fn is_separator(unit: u16) -> bool {
    unit == u16::from(b'/') || (cfg!(windows) && unit == u16::from(b'\\'))
}

/// Concatenate a directory path with a file name.
///
/// Leading separators are stripped from `filename`. Without a directory the
/// result is the stripped file name; otherwise exactly one separator joins
/// the two parts. `dir_len` limits how much of `dir` is used, `None` meaning
/// all of it.
pub fn make_path(dir: Option<&[u16]>, dir_len: Option<usize>, filename: &[u16]) -> WideString {
    let name_start = filename
        .iter()
        .position(|&unit| !is_separator(unit))
        .unwrap_or(filename.len());
    let filename = &filename[name_start..];

    let dir = match dir {
        Some(dir) => &dir[..dir_len.map_or(dir.len(), |len| len.min(dir.len()))],
        None => &[],
    };
    let needs_separator = dir.last().is_some_and(|&unit| !is_separator(unit));

    let mut path = WideString::with_capacity(dir.len() + usize::from(needs_separator) + filename.len());
    path.extend_from_slice(dir);
    if needs_separator {
        path.push(SEPARATOR);
    }
    path.extend_from_slice(filename);
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wide(s: &str) -> Vec<u16> {
        s.encode_utf16().collect()
    }

    fn joined(parts: &[&str]) -> String {
        parts.join(std::path::MAIN_SEPARATOR_STR)
    }

    #[test]
    fn test_strips_leading_separators() {
        let path = make_path(Some(wide("/a/b").as_slice()), None, &wide("/c"));
        assert_eq!(path.to_string(), joined(&["/a/b", "c"]));

        let path = make_path(Some(wide("/a/b").as_slice()), None, &wide("///c"));
        assert_eq!(path.to_string(), joined(&["/a/b", "c"]));
    }

    #[cfg(not(windows))]
    #[test]
    fn test_no_duplicate_separator() {
        let first = make_path(Some(wide("/a/b").as_slice()), None, &wide("/c"));
        let second = make_path(Some(wide("/a/b/").as_slice()), None, &wide("c"));
        assert_eq!(first.to_string(), "/a/b/c");
        assert_eq!(first, second);
    }

    #[test]
    fn test_without_directory() {
        let path = make_path(None, None, &wide("//name.txt"));
        assert_eq!(path.to_string(), "name.txt");

        let path = make_path(None, Some(10), &wide("name.txt"));
        assert_eq!(path.to_string(), "name.txt");
    }

    #[test]
    fn test_explicit_directory_length() {
        let dir = wide("/data/ignored");
        let path = make_path(Some(dir.as_slice()), Some(5), &wide("file"));
        assert_eq!(path.to_string(), joined(&["/data", "file"]));

        let path = make_path(Some(dir.as_slice()), Some(100), &wide("file"));
        assert_eq!(path.to_string(), joined(&["/data/ignored", "file"]));
    }

    #[test]
    fn test_empty_directory_adds_no_separator() {
        let path = make_path(Some(&[] as &[u16]), None, &wide("file"));
        assert_eq!(path.to_string(), "file");
    }

    #[test]
    fn test_inputs_untouched() {
        let dir = wide("/a");
        let name = wide("/b");
        let _ = make_path(Some(dir.as_slice()), None, &name);
        assert_eq!(dir, wide("/a"));
        assert_eq!(name, wide("/b"));
    }

    #[cfg(windows)]
    #[test]
    fn test_backslash_is_a_separator_on_windows() {
        let path = make_path(Some(wide("C:\\dir\\").as_slice()), None, &wide("\\file"));
        assert_eq!(path.to_string(), "C:\\dir\\file");

        let path = make_path(Some(wide("C:/dir/").as_slice()), None, &wide("file"));
        assert_eq!(path.to_string(), "C:/dir/file");
    }
}
