//! One-entry-at-a-time directory cursor over native enumeration

use crate::native::{DirectorySource, FindRecord, NativeDirectory};
use crate::{Attempt, CodepageSelector, FsError, NameCodec, PortableErrorCode, Result, WideString};
use std::fmt;

/// Position of a [`DirectoryIterator`].
///
/// `Active(n)` counts the entries returned so far, the current one included:
/// it is `Active(1)` after the first successful advance. Skipped native
/// records are not counted here; see [`DirectoryIterator::position`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Opened, nothing returned yet
    NotStarted,
    /// This many entries have been returned
    Active(usize),
    /// The listing has ended; every further advance returns `None`
    Exhausted,
}

/// Entry borrowed from the iterator, valid until the next advance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry<'a> {
    name: &'a [u8],
    wide_name: &'a [u16],
    is_dir: bool,
}

impl<'a> DirEntry<'a> {
    /// Name in the active narrow encoding
    pub fn name(&self) -> &'a [u8] {
        self.name
    }

    /// Name as `str`, when the narrow encoding produced valid UTF-8
    pub fn name_str(&self) -> Option<&'a str> {
        std::str::from_utf8(self.name).ok()
    }

    /// Name exactly as the OS reported it
    pub fn wide_name(&self) -> &'a [u16] {
        self.wide_name
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// Copy the entry so it outlives the next advance
    pub fn to_owned_entry(&self) -> OwnedDirEntry {
        OwnedDirEntry {
            name: self.name.to_vec(),
            wide_name: WideString::from(self.wide_name),
            is_dir: self.is_dir,
        }
    }
}

/// Persistent copy of a [`DirEntry`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnedDirEntry {
    name: Vec<u8>,
    wide_name: WideString,
    is_dir: bool,
}

impl OwnedDirEntry {
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    pub fn name_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.name).ok()
    }

    pub fn wide_name(&self) -> &WideString {
        &self.wide_name
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    pub fn into_name(self) -> Vec<u8> {
        self.name
    }
}

fn is_pseudo_entry(name: &[u16]) -> bool {
    const DOT: u16 = b'.' as u16;
    matches!(name, [DOT] | [DOT, DOT])
}

/// Directory listing cursor.
///
/// Produces the entries of one directory in native order, without the `.`
/// and `..` pseudo-entries and without names that cannot be represented
/// exactly in the active narrow encoding.
pub struct DirectoryIterator<S: DirectorySource = NativeDirectory> {
    source: S,
    codec: NameCodec,
    handle: Option<S::Handle>,
    /// Record delivered by `find_first`, not yet examined
    pending: Option<FindRecord>,
    current: Option<FindRecord>,
    name: Vec<u8>,
    state: CursorState,
    consumed: usize,
    diagnostic: Option<PortableErrorCode>,
}

impl DirectoryIterator {
    /// Open a directory given in the active narrow encoding
    pub fn open(codec: &NameCodec, dir_path: &[u8]) -> Result<Self> {
        Self::open_with(NativeDirectory, *codec, dir_path)
    }

    /// Open a directory given in the wide form, without conversion or retry
    pub fn open_wide(codec: &NameCodec, dir_path: &[u16]) -> Result<Self> {
        Self::open_wide_with(NativeDirectory, *codec, dir_path)
    }
}

impl<S: DirectorySource> DirectoryIterator<S> {
    fn new(source: S, codec: NameCodec) -> Self {
        Self {
            source,
            codec,
            handle: None,
            pending: None,
            current: None,
            name: Vec::new(),
            state: CursorState::Exhausted,
            consumed: 0,
            diagnostic: None,
        }
    }

    fn start(&mut self, handle: S::Handle, first: FindRecord) {
        self.handle = Some(handle);
        self.pending = Some(first);
        self.state = CursorState::NotStarted;
    }

    /// Open through an explicit directory source.
    ///
    /// The path is converted with the primary attempt first. Access denied
    /// fails immediately; any other failure retries with the secondary
    /// attempt. When both attempts fail the iterator starts out exhausted
    /// and [`diagnostic`](Self::diagnostic) tells why.
    pub fn open_with(source: S, codec: NameCodec, dir_path: &[u8]) -> Result<Self> {
        let mut iter = Self::new(source, codec);

        for attempt in Attempt::ALL {
            let Some(wide) = codec.narrow_to_wide(dir_path, attempt) else {
                iter.diagnostic.get_or_insert(PortableErrorCode::InvalidArgument);
                continue;
            };

            match iter.source.find_first(&wide) {
                Ok((handle, first)) => {
                    iter.start(handle, first);
                    tracing::debug!("Opened directory {} (attempt {})", wide, attempt.index());
                    return Ok(iter);
                }
                Err(err) if err.is_access_denied() => {
                    tracing::debug!("Directory {} denied: {}", wide, err);
                    return Err(FsError::native(err, dir_path));
                }
                Err(err) => {
                    tracing::trace!("Listing {} failed (attempt {}): {}", wide, attempt.index(), err);
                    iter.diagnostic = Some(err.code());
                }
            }
        }

        tracing::debug!(
            "Directory {} opened empty ({:?})",
            String::from_utf8_lossy(dir_path),
            iter.diagnostic
        );
        Ok(iter)
    }

    pub fn open_wide_with(source: S, codec: NameCodec, dir_path: &[u16]) -> Result<Self> {
        let mut iter = Self::new(source, codec);

        match iter.source.find_first(dir_path) {
            Ok((handle, first)) => iter.start(handle, first),
            Err(err) if err.is_access_denied() => {
                return Err(FsError::native(err, WideString::from(dir_path).to_string_lossy().as_bytes()));
            }
            Err(err) => iter.diagnostic = Some(err.code()),
        }

        tracing::debug!("Opened directory {} ({:?})", WideString::from(dir_path), iter.state);
        Ok(iter)
    }

    /// Move to the next entry.
    ///
    /// The previous entry is released first. Returns `None` at the end of
    /// the listing and on every call after that.
    pub fn advance(&mut self) -> Option<DirEntry<'_>> {
        if self.state == CursorState::Exhausted {
            return None;
        }

        self.current = None;
        self.name.clear();

        loop {
            let next = match self.pending.take() {
                Some(record) => Some(record),
                None => match self.handle.as_mut() {
                    Some(handle) => self.source.find_next(handle),
                    None => None,
                },
            };

            let Some(record) = next else {
                self.finish();
                return None;
            };
            self.consumed += 1;

            if is_pseudo_entry(&record.name) {
                continue;
            }

            let converted = self
                .codec
                .wide_to_narrow(&record.name, CodepageSelector::Default, true)
                .into_faithful();
            match converted {
                Some(name) => {
                    self.name = name;
                    self.current = Some(record);
                    break;
                }
                None => tracing::trace!("Skipping unrepresentable name {}", record.name),
            }
        }

        self.state = match self.state {
            CursorState::Active(returned) => CursorState::Active(returned + 1),
            _ => CursorState::Active(1),
        };

        let record = self.current.as_ref()?;
        Some(DirEntry {
            name: &self.name,
            wide_name: &record.name,
            is_dir: record.is_dir,
        })
    }

    fn finish(&mut self) {
        self.handle = None;
        self.pending = None;
        self.current = None;
        self.name.clear();
        self.state = CursorState::Exhausted;
    }

    /// Release the native handle and the current entry
    pub fn close(mut self) {
        self.finish();
    }

    /// Portable translation of the last native error seen while opening
    pub fn diagnostic(&self) -> Option<PortableErrorCode> {
        self.diagnostic
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Native records consumed so far, including `.`, `..` and skipped names
    pub fn position(&self) -> usize {
        self.consumed
    }

    pub fn codec(&self) -> &NameCodec {
        &self.codec
    }

    /// Iterate over owned copies of the remaining entries
    pub fn into_entries(self) -> Entries<S> {
        Entries { inner: self }
    }
}

impl<S: DirectorySource> fmt::Debug for DirectoryIterator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryIterator")
            .field("state", &self.state)
            .field("position", &self.consumed)
            .field("diagnostic", &self.diagnostic)
            .finish_non_exhaustive()
    }
}

/// Owned-entry adaptor returned by [`DirectoryIterator::into_entries`]
pub struct Entries<S: DirectorySource = NativeDirectory> {
    inner: DirectoryIterator<S>,
}

impl<S: DirectorySource> Iterator for Entries<S> {
    type Item = OwnedDirEntry;

    fn next(&mut self) -> Option<OwnedDirEntry> {
        self.inner.advance().map(|entry| entry.to_owned_entry())
    }
}
