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
//! Error types shared by the encoder and the decoder.
//!
//! Every error is fatal to the archive stream it was raised on: the producing
//! [`crate::ArchiveEncoder`] or [`crate::ArchiveDecoder`] is closed afterwards
//! and only yields end-of-stream.

use alloc::string::String;

/// Result type alias for all fallible codec operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors of the ustar codec.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A metadata field of [`crate::EntryOptions`] does not match its format.
    #[error("invalid option `{field}`: {value:?}")]
    InvalidOptions { field: &'static str, value: String },

    /// The declared size does not fit into the size field.
    #[error("invalid size {size}: must be smaller than {limit}")]
    InvalidSize { size: u64, limit: u64 },

    /// The pathname can't be stored in the name/prefix fields.
    #[error("invalid pathname {pathname:?}: {reason}")]
    InvalidPathname {
        pathname: String,
        reason: PathnameError,
    },

    /// A file body yielded a different number of bytes than declared.
    #[error("size mismatch for {pathname:?}: declared {declared} bytes, body yielded {actual}")]
    SizeMismatch {
        pathname: String,
        declared: u64,
        actual: u64,
    },

    /// The stored header checksum differs from the recomputed one.
    #[error("header checksum mismatch: stored {stored:o}, computed {computed:o}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    /// A header passed the checksum test but one of its numeric fields is
    /// not an octal number.
    #[error("header field `{field}` is not a valid octal number")]
    InvalidHeaderField { field: &'static str },

    /// The archive does not end with exactly two zero blocks.
    #[error("malformed archive terminator: {0}")]
    MalformedTerminator(TerminatorError),

    /// The input ended inside the payload of a file.
    #[error("unexpected end of stream")]
    UnexpectedEndOfStream,

    /// A reader backing a body or the decoder input failed.
    #[cfg(feature = "std")]
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons for [`Error::InvalidPathname`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PathnameError {
    #[error("pathname is empty")]
    Empty,
    #[error("encoded pathname has {0} bytes, at most 256 are possible")]
    TooLong(usize),
    #[error("file name component has {0} bytes, at most 100 are possible")]
    FilenameTooLong(usize),
    #[error("no split point keeps the prefix within 155 and the name within 100 bytes")]
    Unsplittable,
}

/// Reasons for [`Error::MalformedTerminator`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TerminatorError {
    /// The input length is not a multiple of the block size.
    #[error("{0} trailing bytes do not form a complete block")]
    Misaligned(usize),
    /// Fewer than two blocks remained at the end of input.
    #[error("expected two trailing zero blocks, found {0} blocks")]
    MissingBlocks(usize),
    /// A block of the terminator contains non-zero bytes.
    #[error("trailing block is not all zeros")]
    NonZeroBlock,
}

impl From<TerminatorError> for Error {
    fn from(value: TerminatorError) -> Self {
        Self::MalformedTerminator(value)
    }
}

#[cfg(feature = "std")]
impl From<Error> for std::io::Error {
    fn from(value: Error) -> Self {
        use std::io::ErrorKind;
        match value {
            Error::Io(err) => err,
            Error::UnexpectedEndOfStream => Self::new(ErrorKind::UnexpectedEof, value),
            other => Self::new(ErrorKind::InvalidData, other),
        }
    }
}
