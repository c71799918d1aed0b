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
//! Module for [`ArchiveEncoder`].

use crate::header::{check_size, encode_header};
use crate::{Body, EntryDescriptor, Error, Result, TypeFlag, BLOCKSIZE};
use alloc::collections::BTreeSet;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt::{Debug, Formatter};
use core::iter::FusedIterator;

/// Length of the end-of-archive marker: two zero blocks.
pub const TRAILER_LEN: usize = 2 * BLOCKSIZE;

enum State<'a> {
    /// Waiting for the next descriptor.
    Emitting,
    /// Streaming the body of the current file.
    Draining {
        pathname: String,
        body: Body<'a>,
        declared: u64,
        written: u64,
    },
    /// All descriptors are consumed, the trailer is next.
    Finalizing,
    Closed,
}

impl State<'_> {
    const fn name(&self) -> &'static str {
        match self {
            Self::Emitting => "Emitting",
            Self::Draining { .. } => "Draining",
            Self::Finalizing => "Finalizing",
            Self::Closed => "Closed",
        }
    }
}

/// Pull-driven producer of a ustar archive.
///
/// The encoder consumes one [`EntryDescriptor`] at a time and produces the
/// header block, the body and the zero padding of that entry before it looks
/// at the next one. After the last descriptor, two zero blocks terminate the
/// archive. Nothing is produced ahead of demand.
///
/// Output can be pulled in two ways that may be mixed freely:
/// - as chunks via [`Iterator::next`]; body chunks are handed through as they
///   come from the body, without copying,
/// - into a caller-supplied buffer via [`ArchiveEncoder::fill`] (or
///   `std::io::Read`), where the part of a chunk that does not fit is kept
///   for the next pull.
///
/// Entries whose pathname was already emitted are skipped without reading
/// their body. Any error closes the encoder.
pub struct ArchiveEncoder<'a, I> {
    entries: I,
    state: State<'a>,
    seen: BTreeSet<Vec<u8>>,
    default_mtime: Option<u64>,
    leftover: Vec<u8>,
    leftover_pos: usize,
    deferred_error: Option<Error>,
}

impl<'a, I> ArchiveEncoder<'a, I>
where
    I: Iterator<Item = EntryDescriptor<'a>>,
{
    /// Creates an encoder for the given entries. Entries without `mtime`
    /// get the time their header is encoded if the `std` feature is
    /// enabled, else `0`.
    pub fn new<E>(entries: E) -> Self
    where
        E: IntoIterator<IntoIter = I>,
    {
        Self {
            entries: entries.into_iter(),
            state: State::Emitting,
            seen: BTreeSet::new(),
            default_mtime: None,
            leftover: Vec::new(),
            leftover_pos: 0,
            deferred_error: None,
        }
    }

    /// Overrides the `mtime` of entries that don't set one.
    #[must_use]
    pub fn with_default_mtime(mut self, mtime: u64) -> Self {
        self.default_mtime = Some(mtime);
        self
    }

    /// Whether the trailer was produced or the encoder failed.
    pub const fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }

    /// Fills `buf` with the next bytes of the archive and returns their
    /// number. `0` means the archive is complete.
    ///
    /// If an error happens after some bytes were already written to `buf`,
    /// these bytes are returned first and the error is reported by the next
    /// pull.
    pub fn fill(&mut self, buf: &mut [u8]) -> Result<usize> {
        if let Some(err) = self.deferred_error.take() {
            return Err(err);
        }
        let mut written = 0;
        while written < buf.len() {
            if self.leftover_pos == self.leftover.len() {
                match self.pull() {
                    Ok(Some(chunk)) => {
                        self.leftover = chunk;
                        self.leftover_pos = 0;
                    }
                    Ok(None) => break,
                    Err(err) if written > 0 => {
                        self.deferred_error = Some(err);
                        break;
                    }
                    Err(err) => return Err(err),
                }
            }
            let available = &self.leftover[self.leftover_pos..];
            let n = available.len().min(buf.len() - written);
            buf[written..written + n].copy_from_slice(&available[..n]);
            written += n;
            self.leftover_pos += n;
        }
        Ok(written)
    }

    /// Produces the whole archive.
    pub fn encode_all(mut self) -> Result<Vec<u8>> {
        let mut archive = Vec::new();
        while let Some(chunk) = self.next() {
            archive.extend_from_slice(&chunk?);
        }
        Ok(archive)
    }

    fn pull(&mut self) -> Result<Option<Vec<u8>>> {
        match self.generate() {
            Ok(chunk) => Ok(chunk),
            Err(err) => {
                log::debug!("closing archive encoder: {}", err);
                self.state = State::Closed;
                Err(err)
            }
        }
    }

    fn generate(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            match &mut self.state {
                State::Emitting => match self.entries.next() {
                    Some(descriptor) => {
                        if let Some(header) = self.begin_entry(descriptor)? {
                            return Ok(Some(header));
                        }
                    }
                    None => self.state = State::Finalizing,
                },
                State::Draining {
                    pathname,
                    body,
                    declared,
                    written,
                } => match body.next() {
                    Some(chunk) => {
                        let chunk = chunk?;
                        *written += chunk.len() as u64;
                        if *written > *declared {
                            return Err(Error::SizeMismatch {
                                pathname: core::mem::take(pathname),
                                declared: *declared,
                                actual: *written,
                            });
                        }
                        if !chunk.is_empty() {
                            return Ok(Some(chunk));
                        }
                    }
                    None => {
                        let (declared, written) = (*declared, *written);
                        if written != declared {
                            return Err(Error::SizeMismatch {
                                pathname: core::mem::take(pathname),
                                declared,
                                actual: written,
                            });
                        }
                        self.state = State::Emitting;
                        let padding = padding_len(declared);
                        if padding > 0 {
                            return Ok(Some(vec![0; padding]));
                        }
                    }
                },
                State::Finalizing => {
                    log::debug!("all entries written, emitting end-of-archive marker");
                    self.state = State::Closed;
                    return Ok(Some(vec![0; TRAILER_LEN]));
                }
                State::Closed => return Ok(None),
            }
        }
    }

    /// Validates a descriptor and returns its header block, or `None` if the
    /// pathname was already emitted.
    fn begin_entry(&mut self, descriptor: EntryDescriptor<'a>) -> Result<Option<Vec<u8>>> {
        let metadata = descriptor
            .options()
            .to_metadata(self.default_mtime.unwrap_or_else(now))?;
        let (typeflag, size, size_extension) = match &descriptor {
            EntryDescriptor::File(file) => (TypeFlag::REGTYPE, file.size, file.size_extension),
            EntryDescriptor::Directory(_) => (TypeFlag::DIRTYPE, 0, false),
        };
        check_size(size, size_extension)?;
        let pathname = descriptor.pathname().split(descriptor.is_directory())?;
        let full_path = pathname.full_path();
        if self.seen.contains(&full_path) {
            log::debug!(
                "skipping duplicate pathname {:?}",
                String::from_utf8_lossy(&full_path)
            );
            return Ok(None);
        }

        let header = encode_header(&pathname, typeflag, size, size_extension, &metadata)?;
        log::trace!(
            "header for {:?}: type={:?}, size={}",
            String::from_utf8_lossy(&full_path),
            typeflag,
            size
        );
        if let EntryDescriptor::File(file) = descriptor {
            self.state = State::Draining {
                pathname: String::from_utf8_lossy(&full_path).into_owned(),
                body: file.body,
                declared: size,
                written: 0,
            };
        }
        self.seen.insert(full_path);
        Ok(Some(header.to_vec()))
    }
}

impl<'a, I> Iterator for ArchiveEncoder<'a, I>
where
    I: Iterator<Item = EntryDescriptor<'a>>,
{
    type Item = Result<Vec<u8>>;

    /// Returns the next chunk of the archive: bytes left over from
    /// [`ArchiveEncoder::fill`], a header block, a body chunk, zero padding or
    /// the trailer.
    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.deferred_error.take() {
            return Some(Err(err));
        }
        if self.leftover_pos < self.leftover.len() {
            let chunk = if self.leftover_pos == 0 {
                core::mem::take(&mut self.leftover)
            } else {
                self.leftover[self.leftover_pos..].to_vec()
            };
            self.leftover.clear();
            self.leftover_pos = 0;
            return Some(Ok(chunk));
        }
        self.pull().transpose()
    }
}

impl<'a, I> FusedIterator for ArchiveEncoder<'a, I> where I: Iterator<Item = EntryDescriptor<'a>> {}

impl<I> Debug for ArchiveEncoder<'_, I> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ArchiveEncoder")
            .field("state", &self.state.name())
            .field("entries_written", &self.seen.len())
            .field("default_mtime", &self.default_mtime)
            .field("leftover", &(self.leftover.len() - self.leftover_pos))
            .finish()
    }
}

/// Number of zero bytes that pad `size` bytes to a multiple of the block size.
pub const fn padding_len(size: u64) -> usize {
    (BLOCKSIZE - (size % BLOCKSIZE as u64) as usize) % BLOCKSIZE
}

#[cfg(feature = "std")]
fn now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

#[cfg(not(feature = "std"))]
const fn now() -> u64 {
    0
}
