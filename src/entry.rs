/*
MIT License

Copyright (c) 2021 Philipp Schuster

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/
//! Descriptors of the entries handed to the [`crate::ArchiveEncoder`].

use crate::header::{Metadata, DEV_DIGITS, ID_DIGITS, MTIME_DIGITS, OWNER_NAME_LEN};
use crate::{split_pathname, Error, ModeFlags, PathnameError, Result, SplitPathname};
use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::{Debug, Formatter};

/// Body of a file: a finite, single-pass sequence of byte chunks.
pub type Body<'a> = Box<dyn Iterator<Item = Result<Vec<u8>>> + 'a>;

/// Pathname of an entry, either as logical path or already split into the
/// bytes of the `prefix` and `name` fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pathname {
    Path(String),
    Split(SplitPathname),
}

impl Pathname {
    /// Splits the pathname. Logical paths are normalized first, see
    /// [`crate::normalize_pathname`].
    pub fn split(&self, is_directory: bool) -> Result<SplitPathname> {
        match self {
            Self::Path(path) => split_pathname(path, is_directory),
            Self::Split(split) => Ok(split.clone()),
        }
    }
}

impl From<&str> for Pathname {
    fn from(value: &str) -> Self {
        Self::Path(value.into())
    }
}

impl From<String> for Pathname {
    fn from(value: String) -> Self {
        Self::Path(value)
    }
}

impl From<SplitPathname> for Pathname {
    fn from(value: SplitPathname) -> Self {
        Self::Split(value)
    }
}

/// Optional metadata of an entry, in ustar notation: numeric fields are octal
/// strings, names are plain text. Absent numbers are written as `0`, an absent
/// `mtime` as the current time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryOptions {
    pub mode: Option<String>,
    pub uid: Option<String>,
    pub gid: Option<String>,
    pub uname: Option<String>,
    pub gname: Option<String>,
    pub devmajor: Option<String>,
    pub devminor: Option<String>,
    /// Seconds since the epoch.
    pub mtime: Option<u64>,
}

impl EntryOptions {
    #[must_use]
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    #[must_use]
    pub fn with_mode_flags(self, flags: ModeFlags) -> Self {
        self.with_mode(format!("{:o}", flags.bits()))
    }

    #[must_use]
    pub fn with_owner(mut self, uid: impl Into<String>, gid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self.gid = Some(gid.into());
        self
    }

    #[must_use]
    pub fn with_owner_names(mut self, uname: impl Into<String>, gname: impl Into<String>) -> Self {
        self.uname = Some(uname.into());
        self.gname = Some(gname.into());
        self
    }

    #[must_use]
    pub fn with_device(mut self, major: impl Into<String>, minor: impl Into<String>) -> Self {
        self.devmajor = Some(major.into());
        self.devminor = Some(minor.into());
        self
    }

    #[must_use]
    pub const fn with_mtime(mut self, mtime: u64) -> Self {
        self.mtime = Some(mtime);
        self
    }

    /// Checks every field against its format and converts the options to
    /// header [`Metadata`]. `default_mtime` is used if `mtime` is absent.
    ///
    /// # Errors
    /// [`Error::InvalidOptions`] names the first field that is not valid.
    pub fn to_metadata(&self, default_mtime: u64) -> Result<Metadata> {
        let mtime = self.mtime.unwrap_or(default_mtime);
        if mtime >> (3 * MTIME_DIGITS) != 0 {
            return Err(Error::InvalidOptions {
                field: "mtime",
                value: format!("{mtime}"),
            });
        }
        Ok(Metadata {
            mode: octal("mode", self.mode.as_deref(), ID_DIGITS)? as u32,
            uid: octal("uid", self.uid.as_deref(), ID_DIGITS)?,
            gid: octal("gid", self.gid.as_deref(), ID_DIGITS)?,
            mtime,
            uname: owner_name("uname", self.uname.as_deref())?,
            gname: owner_name("gname", self.gname.as_deref())?,
            dev_major: octal("devmajor", self.devmajor.as_deref(), DEV_DIGITS)?,
            dev_minor: octal("devminor", self.devminor.as_deref(), DEV_DIGITS)?,
        })
    }
}

/// Parses an octal option of at most `max_digits` digits.
fn octal(field: &'static str, value: Option<&str>, max_digits: usize) -> Result<u64> {
    let Some(value) = value else {
        return Ok(0);
    };
    let valid = !value.is_empty()
        && value.len() <= max_digits
        && value.bytes().all(|b| (b'0'..=b'7').contains(&b));
    if !valid {
        return Err(Error::InvalidOptions {
            field,
            value: value.into(),
        });
    }
    u64::from_str_radix(value, 8).map_err(|_| Error::InvalidOptions {
        field,
        value: value.into(),
    })
}

fn owner_name(field: &'static str, value: Option<&str>) -> Result<Vec<u8>> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    if value.len() > OWNER_NAME_LEN || value.contains('\0') {
        return Err(Error::InvalidOptions {
            field,
            value: value.into(),
        });
    }
    Ok(value.as_bytes().to_vec())
}

/// A regular file.
pub struct FileEntry<'a> {
    pub pathname: Pathname,
    /// Exact number of bytes `body` yields.
    pub size: u64,
    /// Use all 12 bytes of the size field for digits, which raises the
    /// maximum size from 8 GiB to 64 GiB.
    pub size_extension: bool,
    pub body: Body<'a>,
    pub options: EntryOptions,
}

impl<'a> FileEntry<'a> {
    /// Creates a file whose content is produced by `body`.
    pub fn new<B, C>(pathname: impl Into<Pathname>, size: u64, body: B) -> Self
    where
        B: IntoIterator<Item = C>,
        B::IntoIter: 'a,
        C: Into<Vec<u8>>,
    {
        Self::with_body(
            pathname,
            size,
            Box::new(body.into_iter().map(|chunk| Ok::<_, Error>(chunk.into()))),
        )
    }

    /// Creates a file from a fallible body.
    pub fn with_body(pathname: impl Into<Pathname>, size: u64, body: Body<'a>) -> Self {
        Self {
            pathname: pathname.into(),
            size,
            size_extension: false,
            body,
            options: EntryOptions::default(),
        }
    }

    /// Creates a file with the given content.
    pub fn from_bytes(pathname: impl Into<Pathname>, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        Self::new(pathname, bytes.len() as u64, core::iter::once(bytes))
    }

    #[must_use]
    pub fn with_options(mut self, options: EntryOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_size_extension(mut self, size_extension: bool) -> Self {
        self.size_extension = size_extension;
        self
    }
}

impl Debug for FileEntry<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FileEntry")
            .field("pathname", &self.pathname)
            .field("size", &self.size)
            .field("size_extension", &self.size_extension)
            .field("body", &"<chunks>")
            .field("options", &self.options)
            .finish()
    }
}

/// A directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub pathname: Pathname,
    pub options: EntryOptions,
}

impl DirEntry {
    pub fn new(pathname: impl Into<Pathname>) -> Self {
        Self {
            pathname: pathname.into(),
            options: EntryOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: EntryOptions) -> Self {
        self.options = options;
        self
    }
}

/// Input of the encoder.
#[derive(Debug)]
pub enum EntryDescriptor<'a> {
    File(FileEntry<'a>),
    Directory(DirEntry),
}

impl EntryDescriptor<'_> {
    pub const fn pathname(&self) -> &Pathname {
        match self {
            Self::File(file) => &file.pathname,
            Self::Directory(dir) => &dir.pathname,
        }
    }

    pub const fn options(&self) -> &EntryOptions {
        match self {
            Self::File(file) => &file.options,
            Self::Directory(dir) => &dir.options,
        }
    }

    pub const fn is_directory(&self) -> bool {
        matches!(self, Self::Directory(_))
    }
}

impl<'a> From<FileEntry<'a>> for EntryDescriptor<'a> {
    fn from(value: FileEntry<'a>) -> Self {
        Self::File(value)
    }
}

impl From<DirEntry> for EntryDescriptor<'_> {
    fn from(value: DirEntry) -> Self {
        Self::Directory(value)
    }
}

/// Checks a pre-split pathname that was built from untrusted parts.
impl TryFrom<(Vec<u8>, Vec<u8>)> for Pathname {
    type Error = PathnameError;

    fn try_from((prefix, name): (Vec<u8>, Vec<u8>)) -> core::result::Result<Self, Self::Error> {
        SplitPathname::new(prefix, name).map(Self::Split)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_default_metadata() {
        let metadata = EntryOptions::default().to_metadata(42).unwrap();
        assert_eq!(
            metadata,
            Metadata {
                mtime: 42,
                ..Metadata::default()
            }
        );
    }

    #[test]
    fn test_metadata_from_options() {
        let options = EntryOptions::default()
            .with_mode_flags(ModeFlags::OwnerRead | ModeFlags::OwnerWrite | ModeFlags::OwnerExec)
            .with_owner("1750", "144")
            .with_owner_names("alice", "staff")
            .with_device("10", "3")
            .with_mtime(1_700_000_000);
        let metadata = options.to_metadata(0).unwrap();
        assert_eq!(metadata.mode, 0o700);
        assert_eq!(metadata.uid, 0o1750);
        assert_eq!(metadata.gid, 0o144);
        assert_eq!(metadata.uname, b"alice");
        assert_eq!(metadata.gname, b"staff");
        assert_eq!(metadata.dev_major, 0o10);
        assert_eq!(metadata.dev_minor, 3);
        assert_eq!(metadata.mtime, 1_700_000_000);
    }

    #[test]
    fn test_invalid_options() {
        let invalid_field = |options: EntryOptions| match options.to_metadata(0) {
            Err(Error::InvalidOptions { field, .. }) => field,
            other => panic!("expected invalid options, got {:?}", other),
        };
        assert_eq!(invalid_field(EntryOptions::default().with_mode("0o644")), "mode");
        assert_eq!(invalid_field(EntryOptions::default().with_mode("")), "mode");
        assert_eq!(invalid_field(EntryOptions::default().with_mode("1234567")), "mode");
        assert_eq!(invalid_field(EntryOptions::default().with_owner("8", "0")), "uid");
        assert_eq!(invalid_field(EntryOptions::default().with_owner("0", "-1")), "gid");
        assert_eq!(invalid_field(EntryOptions::default().with_device("12345678", "0")), "devmajor");
        assert_eq!(
            invalid_field(EntryOptions::default().with_owner_names("u".repeat(33), "g")),
            "uname"
        );
        assert_eq!(invalid_field(EntryOptions::default().with_owner_names("u", "g\0")), "gname");
        assert_eq!(invalid_field(EntryOptions::default().with_mtime(1 << 33)), "mtime");
    }

    #[test]
    fn test_file_entry_constructors() {
        let file = FileEntry::from_bytes("a.txt", *b"hello");
        assert_eq!(file.size, 5);
        let chunks: Vec<_> = file.body.map(|chunk| chunk.unwrap()).collect();
        assert_eq!(chunks, vec![b"hello".to_vec()]);

        let file = FileEntry::new("b.txt", 6, vec![&b"abc"[..], &b"def"[..]]).with_size_extension(true);
        assert!(file.size_extension);
        assert_eq!(file.body.count(), 2);
    }

    #[test]
    fn test_pathname_conversions() {
        let split = Pathname::from("./dir//file").split(false).unwrap();
        assert_eq!(split.full_path(), b"dir/file");
        let split = Pathname::from("dir").split(true).unwrap();
        assert_eq!(split.name(), b"dir/");

        let presplit = Pathname::try_from((b"pre".to_vec(), b"name".to_vec())).unwrap();
        assert_eq!(presplit.split(false).unwrap().full_path(), b"pre/name");
        assert_eq!(
            Pathname::try_from((Vec::new(), Vec::new())),
            Err(PathnameError::Empty)
        );
    }
}
