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
//! Fixed-width field types of a Tar header.

use core::fmt::{Debug, Formatter};
use core::str::{from_utf8, Utf8Error};

/// Base type for strings embedded in a Tar header. The length depends on the
/// context. The returned string is likely to be UTF-8/ASCII, which is verified
/// by getters, such as [`TarFormatString::as_str`].
///
/// An optionally null terminated string. The contents are either:
/// 1. A fully populated string with no null termination or
/// 2. A partially populated string where the unused bytes are zero.
#[derive(Copy, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct TarFormatString<const N: usize> {
    bytes: [u8; N],
}

impl<const N: usize> TarFormatString<N> {
    /// Constructor.
    ///
    /// # Panics
    /// Panics of `N` is zero, i.e., the underlying array has no length.
    #[must_use]
    pub const fn new(bytes: [u8; N]) -> Self {
        assert!(N > 0, "array should have at least one element");
        Self { bytes }
    }

    /// True if the is string empty (ignoring NULL bytes).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes[0] == 0
    }

    /// Returns the length of the payload in bytes. This is either the full
    /// capacity `N` or the data until the first NULL byte.
    #[must_use]
    pub fn size(&self) -> usize {
        memchr::memchr(0, &self.bytes).unwrap_or(N)
    }

    /// Returns the payload bytes without terminating NULL bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[0..self.size()]
    }

    /// Returns the raw field including padding.
    #[must_use]
    pub const fn raw(&self) -> &[u8; N] {
        &self.bytes
    }

    /// Returns a str ref without terminating or intermediate NULL bytes. The
    /// string is truncated at the first NULL byte, in case not the full length
    /// was used.
    ///
    /// # Errors
    /// Returns a [`Utf8Error`] error for invalid strings.
    pub fn as_str(&self) -> Result<&str, Utf8Error> {
        from_utf8(self.as_bytes())
    }

    /// Overwrites the field with `bytes` and pads the remainder with NULL
    /// bytes. The field stays untouched and `false` is returned if `bytes`
    /// does not fit.
    pub fn set_bytes(&mut self, bytes: &[u8]) -> bool {
        if bytes.len() > N {
            return false;
        }
        self.bytes[..bytes.len()].copy_from_slice(bytes);
        self.bytes[bytes.len()..].fill(0);
        true
    }

    /// Fills the whole field with `byte`.
    pub fn fill(&mut self, byte: u8) {
        self.bytes.fill(byte);
    }
}

impl<const N: usize> Debug for TarFormatString<N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "str='{:?}',byte_usage={}/{}",
            self.as_str(),
            self.size(),
            N
        )
    }
}

/// An octal number as stored in a Tar header.
///
/// Writers disagree on the exact layout: ustar writes zero padded digits
/// followed by a space and/or NULL byte, GNU tar uses one more digit, and old
/// implementations pad with leading spaces. Parsing therefore skips leading
/// spaces and stops at the first space or NULL byte.
#[derive(Copy, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct TarFormatOctal<const N: usize>(TarFormatString<N>);

impl<const N: usize> TarFormatOctal<N> {
    #[must_use]
    pub const fn new(bytes: [u8; N]) -> Self {
        Self(TarFormatString::new(bytes))
    }

    /// Interprets the underlying value as an octal number of the specified
    /// type. An empty field is zero.
    ///
    /// Returns `None` if the field contains anything but octal digits or the
    /// value overflows `T`.
    pub fn as_number<T>(&self) -> Option<T>
    where
        T: num_traits::Num,
    {
        let digits = self.digits();
        if digits.is_empty() {
            return Some(T::zero());
        }
        if !digits.iter().all(|b| (b'0'..=b'7').contains(b)) {
            return None;
        }
        let digits = from_utf8(digits).ok()?;
        T::from_str_radix(digits, 8).ok()
    }

    /// Writes `value` as exactly `width` zero padded octal digits, followed by
    /// `terminator`. The rest of the field is padded with NULL bytes.
    ///
    /// Returns `false` and leaves the field untouched if the value needs more
    /// than `width` digits or the digits and terminator exceed the field.
    pub fn set(&mut self, value: u64, width: usize, terminator: &[u8]) -> bool {
        if width + terminator.len() > N || (width < 22 && value >> (3 * width) != 0) {
            return false;
        }
        let mut bytes = [0_u8; N];
        let mut rest = value;
        for digit in bytes[..width].iter_mut().rev() {
            *digit = b'0' + (rest & 0o7) as u8;
            rest >>= 3;
        }
        bytes[width..width + terminator.len()].copy_from_slice(terminator);
        self.0 = TarFormatString::new(bytes);
        true
    }

    /// Returns the underlying [`TarFormatString`].
    #[must_use]
    pub const fn as_inner(&self) -> &TarFormatString<N> {
        &self.0
    }

    /// Returns the underlying [`TarFormatString`] for modification.
    pub fn as_inner_mut(&mut self) -> &mut TarFormatString<N> {
        &mut self.0
    }

    fn digits(&self) -> &[u8] {
        let bytes = self.0.as_bytes();
        let start = bytes.iter().position(|&b| b != b' ').unwrap_or(bytes.len());
        let bytes = &bytes[start..];
        let end = memchr::memchr(b' ', bytes).unwrap_or(bytes.len());
        &bytes[..end]
    }
}

impl<const N: usize> Debug for TarFormatOctal<N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self.as_number::<u64>() {
            Some(val) => write!(f, "{:o} [{:?}]", val, self.0.as_str()),
            None => write!(f, "<invalid> [{:?}]", self.0.as_bytes()),
        }
    }
}
