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
//! Streaming encoder and decoder for POSIX ustar archives in `no_std` +
//! `alloc` contexts.
//!
//! The [`ArchiveEncoder`] turns a sequence of file and directory descriptors
//! into the bytes of an archive. It is pull-driven: a file body is only read
//! when the consumer asks for more output, so archives of any size can be
//! produced with bounded memory. The [`ArchiveDecoder`] does the reverse. It
//! accepts the archive in chunks of any size and yields one entry at a time,
//! each with a body stream that is limited to the declared size.
//!
//! Pathnames of up to 256 bytes are supported through the ustar `prefix`
//! field. The maximum file size is 8GiB, or 64GiB with the size extension.
//! Extensions such as PAX headers and GNU long names are not interpreted;
//! the decoder reports such entries and skips their payload. Old-style (v7)
//! archives and archives created by GNU tar can be read.
//!
//! # Example
//! ```
//! use ustar_stream::{ArchiveDecoder, ArchiveEncoder, DirEntry, Error, FileEntry};
//!
//! let archive = ArchiveEncoder::new(vec![
//!     DirEntry::new("docs").into(),
//!     FileEntry::from_bytes("docs/readme.txt", *b"hello").into(),
//! ])
//! .encode_all()?;
//!
//! let mut decoder = ArchiveDecoder::new(archive.chunks(100).map(Ok::<_, Error>));
//! while let Some(entry) = decoder.next_entry() {
//!     let mut entry = entry?;
//!     if let Some(mut body) = entry.body() {
//!         assert_eq!(body.read_to_vec()?, b"hello");
//!     }
//! }
//! # Ok::<(), Error>(())
//! ```
//!
//! [This link](https://www.gnu.org/software/tar/manual/html_section/Formats.html) gives a good
//! overview over possible archive formats and their limitations.

#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![deny(rustdoc::all)]
#![allow(rustdoc::missing_doc_code_examples)]
#![deny(clippy::all)]
#![deny(missing_debug_implementations)]

extern crate alloc;

/// Each archive entry (either header or data block) is a block of 512 bytes.
pub const BLOCKSIZE: usize = 512;

/// A single block of an archive.
pub type Block = [u8; BLOCKSIZE];

mod blocks;
mod decoder;
mod encoder;
mod entry;
mod error;
mod header;
#[cfg(feature = "std")]
mod io;
mod pathname;
mod tar_format_types;

pub use blocks::*;
pub use decoder::*;
pub use encoder::*;
pub use entry::*;
pub use error::*;
pub use header::*;
#[cfg(feature = "std")]
pub use io::*;
pub use pathname::*;
pub use tar_format_types::*;
