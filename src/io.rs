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
//! Adapters between the codec and [`std::io`].

use crate::blocks::ChunkSource;
use crate::{ArchiveDecoder, ArchiveEncoder, EntryBody, EntryDescriptor, FileEntry, Pathname, Result};
use std::io::{self, Read};

/// Default size of the chunks read by [`ReaderChunks`].
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Reads a [`Read`] in chunks of up to a fixed size. Chunks are never empty;
/// the iterator ends when the reader reports end of file or fails.
#[derive(Debug)]
pub struct ReaderChunks<R> {
    reader: R,
    chunk_size: usize,
    done: bool,
}

impl<R: Read> ReaderChunks<R> {
    pub const fn new(reader: R) -> Self {
        Self {
            reader,
            chunk_size: DEFAULT_CHUNK_SIZE,
            done: false,
        }
    }

    /// Sets the maximum chunk size. `0` is treated as `1`.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> Iterator for ReaderChunks<R> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut chunk = vec![0; self.chunk_size];
        loop {
            match self.reader.read(&mut chunk) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(n) => {
                    chunk.truncate(n);
                    return Some(Ok(chunk));
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.done = true;
                    return Some(Err(err.into()));
                }
            }
        }
    }
}

impl<'a> FileEntry<'a> {
    /// Creates a file whose body is read from `reader`. The reader must
    /// yield exactly `size` bytes.
    pub fn from_reader<R>(pathname: impl Into<Pathname>, size: u64, reader: R) -> Self
    where
        R: Read + 'a,
    {
        Self::with_body(pathname, size, Box::new(ReaderChunks::new(reader)))
    }
}

impl<R: Read> ArchiveDecoder<ReaderChunks<R>> {
    /// Creates a decoder that reads the archive from `reader`.
    pub fn from_reader(reader: R) -> Self {
        Self::new(ReaderChunks::new(reader))
    }
}

impl<'a, I> Read for ArchiveEncoder<'a, I>
where
    I: Iterator<Item = EntryDescriptor<'a>>,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.fill(buf)?)
    }
}

impl<S: ChunkSource> Read for EntryBody<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(EntryBody::read(self, buf)?)
    }
}
