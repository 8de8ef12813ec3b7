use fsname::{
    can_open_exclusive, make_path, open_file, CursorState, DirectoryIterator, EncodingMode, NameCodec,
    PortableErrorCode, WideString,
};
use std::fs;
use std::path::Path;

fn narrow(path: &Path) -> Vec<u8> {
    path.to_str().unwrap().as_bytes().to_vec()
}

fn utf8_codec() -> NameCodec {
    NameCodec::new(EncodingMode::Universal)
}

#[test]
fn test_empty_directory_yields_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut iter = DirectoryIterator::open(&utf8_codec(), &narrow(dir.path())).unwrap();

    assert_eq!(iter.state(), CursorState::NotStarted);
    assert!(iter.advance().is_none());
    assert!(iter.advance().is_none());
    assert_eq!(iter.state(), CursorState::Exhausted);
}

#[test]
fn test_lists_files_and_directories() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"a").unwrap();
    fs::write(dir.path().join("Привет.txt"), b"b").unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();

    let iter = DirectoryIterator::open(&utf8_codec(), &narrow(dir.path())).unwrap();
    let mut entries: Vec<(String, bool)> = iter
        .into_entries()
        .map(|entry| (entry.name_str().unwrap().to_string(), entry.is_dir()))
        .collect();
    entries.sort();

    assert_eq!(
        entries,
        vec![
            ("a.txt".to_string(), false),
            ("sub".to_string(), true),
            ("Привет.txt".to_string(), false),
        ]
    );
}

#[test]
fn test_never_returns_pseudo_entries() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(".hidden"), b"").unwrap();

    let mut iter = DirectoryIterator::open(&utf8_codec(), &narrow(dir.path())).unwrap();
    let mut seen = Vec::new();
    while let Some(entry) = iter.advance() {
        seen.push(entry.name().to_vec());
    }

    assert_eq!(seen, vec![b".hidden".to_vec()]);
}

#[test]
fn test_missing_directory_opens_exhausted() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing");

    let mut iter = DirectoryIterator::open(&utf8_codec(), &narrow(&missing)).unwrap();
    assert_eq!(iter.state(), CursorState::Exhausted);
    assert_eq!(iter.diagnostic(), Some(PortableErrorCode::NotFound));
    assert!(iter.advance().is_none());
}

#[test]
fn test_open_wide_lists_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("one"), b"").unwrap();

    let wide = WideString::from_os_str(dir.path().as_os_str());
    let names: Vec<_> = DirectoryIterator::open_wide(&utf8_codec(), &wide)
        .unwrap()
        .into_entries()
        .map(|entry| entry.into_name())
        .collect();
    assert_eq!(names, vec![b"one".to_vec()]);
}

#[test]
fn test_composed_path_opens_listed_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("data.bin"), b"xyz").unwrap();
    let codec = utf8_codec();

    let mut iter = DirectoryIterator::open(&codec, &narrow(dir.path())).unwrap();
    let entry = iter.advance().unwrap().to_owned_entry();
    iter.close();

    let dir_wide = WideString::from_os_str(dir.path().as_os_str());
    let full = make_path(Some(dir_wide.as_slice()), None, entry.wide_name());
    let full = codec.wide_to_narrow_default(&full).unwrap();

    assert!(can_open_exclusive(&codec, &full));
    assert_eq!(fs::read(String::from_utf8(full).unwrap()).unwrap(), b"xyz");
}

#[test]
fn test_probe_reflects_exclusive_holder() {
    let dir = tempfile::tempdir().unwrap();
    let path = narrow(&dir.path().join("held.bin"));
    let codec = utf8_codec();

    drop(open_file(&codec, &path, "wb", false).unwrap());
    assert!(can_open_exclusive(&codec, &path));

    {
        let _held = open_file(&codec, &path, "r+b", true).unwrap();
        assert!(!can_open_exclusive(&codec, &path));
    }

    assert!(can_open_exclusive(&codec, &path));
}
