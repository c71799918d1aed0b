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
//! Module for splitting pathnames into the ustar `prefix` and `name` fields.
//!
//! The name field of a Tar header holds 100 bytes. ustar adds a 155 byte
//! prefix field, so that a pathname of up to 256 bytes can be stored by
//! splitting it at a `/`: the part before the separator goes into `prefix`,
//! the part after it into `name`. The separator itself is not stored.

use crate::{Error, PathnameError, Result};
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt::{Debug, Formatter};

/// Size of the `name` field.
pub const NAME_LEN: usize = 100;
/// Size of the `prefix` field.
pub const PREFIX_LEN: usize = 155;
/// Longest pathname that can be stored: prefix, separator and name.
pub const PATHNAME_MAX: usize = PREFIX_LEN + 1 + NAME_LEN;

/// A pathname split into the bytes of the `prefix` and `name` fields.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SplitPathname {
    prefix: Vec<u8>,
    name: Vec<u8>,
}

impl SplitPathname {
    /// Creates a split pathname from raw field contents, e.g. taken from an
    /// existing header.
    ///
    /// # Errors
    /// Fails if one of the parts exceeds its field or `name` is empty.
    pub fn new(
        prefix: impl Into<Vec<u8>>,
        name: impl Into<Vec<u8>>,
    ) -> core::result::Result<Self, PathnameError> {
        let prefix = prefix.into();
        let name = name.into();
        if name.is_empty() {
            return Err(PathnameError::Empty);
        }
        if name.len() > NAME_LEN {
            return Err(PathnameError::FilenameTooLong(name.len()));
        }
        if prefix.len() > PREFIX_LEN {
            return Err(PathnameError::Unsplittable);
        }
        Ok(Self { prefix, name })
    }

    /// Bytes of the `prefix` field. Empty if the pathname fits into `name`.
    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    /// Bytes of the `name` field.
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// Returns the fully qualified pathname, i.e. `prefix/name` or just
    /// `name` if there is no prefix.
    pub fn full_path(&self) -> Vec<u8> {
        join_pathname(&self.prefix, &self.name)
    }
}

impl Debug for SplitPathname {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SplitPathname")
            .field("prefix", &String::from_utf8_lossy(&self.prefix))
            .field("name", &String::from_utf8_lossy(&self.name))
            .finish()
    }
}

/// Joins the `prefix` and `name` fields of a header to the pathname.
pub(crate) fn join_pathname(prefix: &[u8], name: &[u8]) -> Vec<u8> {
    if prefix.is_empty() {
        return name.to_vec();
    }
    let mut path = Vec::with_capacity(prefix.len() + 1 + name.len());
    path.extend_from_slice(prefix);
    path.push(b'/');
    path.extend_from_slice(name);
    path
}

/// Normalizes a logical pathname: repeated separators and empty segments are
/// collapsed, a leading `./` is stripped and directories get a trailing `/`.
/// A leading `/` is kept.
pub fn normalize_pathname(path: &str, is_directory: bool) -> String {
    let absolute = path.starts_with('/');
    let mut segments = path.split('/').filter(|s| !s.is_empty()).peekable();
    if !absolute && segments.peek() == Some(&".") {
        segments.next();
    }

    let mut normalized = String::with_capacity(path.len() + 1);
    if absolute {
        normalized.push('/');
    }
    for (i, segment) in segments.enumerate() {
        if i > 0 {
            normalized.push('/');
        }
        normalized.push_str(segment);
    }
    if is_directory && !normalized.is_empty() && !normalized.ends_with('/') {
        normalized.push('/');
    }
    normalized
}

/// Normalizes `path` and splits it into the ustar `prefix` and `name`.
/// Callers may use this to check a pathname before handing it to the
/// encoder.
///
/// # Errors
/// Returns [`Error::InvalidPathname`] if the pathname is empty, longer than
/// 256 bytes, or can't be split so that the prefix fits into 155 and the
/// name into 100 bytes.
pub fn split_pathname(path: &str, is_directory: bool) -> Result<SplitPathname> {
    let normalized = normalize_pathname(path, is_directory);
    let bytes = normalized.as_bytes();
    let invalid = |reason| Error::InvalidPathname {
        pathname: path.to_string(),
        reason,
    };
    if bytes.is_empty() {
        return Err(invalid(PathnameError::Empty));
    }
    match split_point(bytes).map_err(invalid)? {
        None => Ok(SplitPathname {
            prefix: Vec::new(),
            name: bytes.to_vec(),
        }),
        Some(i) => Ok(SplitPathname {
            prefix: bytes[..i].to_vec(),
            name: bytes[i + 1..].to_vec(),
        }),
    }
}

/// Finds the index of the `/` at which `path` is split. Returns `None` if
/// the whole path fits into the name field.
///
/// Starting at the last separator, the search walks backwards as long as the
/// name stays within [`NAME_LEN`], so the prefix is as short as possible.
pub fn split_point(path: &[u8]) -> core::result::Result<Option<usize>, PathnameError> {
    if path.len() <= NAME_LEN {
        return Ok(None);
    }
    if path.len() > PATHNAME_MAX {
        return Err(PathnameError::TooLong(path.len()));
    }
    let last = memchr::memrchr(b'/', path).ok_or(PathnameError::FilenameTooLong(path.len()))?;
    let filename_len = path.len() - last - 1;
    if filename_len > NAME_LEN {
        return Err(PathnameError::FilenameTooLong(filename_len));
    }

    let mut split = last;
    for i in memchr::memrchr_iter(b'/', &path[..last]) {
        if path.len() - i - 1 > NAME_LEN {
            break;
        }
        split = i;
    }
    // an empty prefix would turn an absolute path into a relative one
    if split == 0 || split > PREFIX_LEN {
        return Err(PathnameError::Unsplittable);
    }
    Ok(Some(split))
}
