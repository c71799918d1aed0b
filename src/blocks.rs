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
//! Reassembles arbitrarily sized input chunks into 512-byte blocks.

use crate::header::is_zero_block;
use crate::{Block, Result, TerminatorError, BLOCKSIZE};
use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::fmt::{Debug, Formatter};

/// Number of blocks held back, so that the end-of-archive marker is never
/// handed out as content.
const LOOKAHEAD: usize = 2;

/// Source of archive bytes, delivered in chunks of any size.
///
/// Implemented for every iterator over `Result<C>` where `C` is a byte
/// container, e.g. `Vec<u8>` or `&[u8]`.
pub trait ChunkSource {
    type Chunk: AsRef<[u8]>;

    /// Returns the next chunk, or `None` at the end of input.
    fn next_chunk(&mut self) -> Option<Result<Self::Chunk>>;
}

impl<I, C> ChunkSource for I
where
    I: Iterator<Item = Result<C>>,
    C: AsRef<[u8]>,
{
    type Chunk = C;

    fn next_chunk(&mut self) -> Option<Result<C>> {
        self.next()
    }
}

/// Turns a [`ChunkSource`] into a sequence of blocks.
///
/// The last two blocks of the input are never returned. Once the input is
/// exhausted, they are checked to be the end-of-archive marker: the input
/// must be block aligned and end with two zero blocks.
pub struct BlockReader<S> {
    source: S,
    /// Bytes of an incomplete block.
    carry: Vec<u8>,
    lookahead: VecDeque<Block>,
    exhausted: bool,
    finished: bool,
    blocks_read: u64,
}

impl<S: ChunkSource> BlockReader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            carry: Vec::with_capacity(BLOCKSIZE),
            lookahead: VecDeque::with_capacity(LOOKAHEAD + 1),
            exhausted: false,
            finished: false,
            blocks_read: 0,
        }
    }

    /// Returns the next block. `Ok(None)` means the input ended with a valid
    /// end-of-archive marker.
    ///
    /// # Errors
    /// Errors of the source are passed through. At the end of input,
    /// [`crate::Error::MalformedTerminator`] reports trailing bytes, missing
    /// blocks, or a non-zero terminator block. The reader is finished after
    /// any error.
    pub fn next_block(&mut self) -> Result<Option<Block>> {
        if self.finished {
            return Ok(None);
        }
        while self.lookahead.len() <= LOOKAHEAD && !self.exhausted {
            match self.source.next_chunk() {
                Some(Ok(chunk)) => self.push(chunk.as_ref()),
                Some(Err(err)) => {
                    self.finished = true;
                    return Err(err);
                }
                None => self.exhausted = true,
            }
        }

        if self.lookahead.len() > LOOKAHEAD {
            self.blocks_read += 1;
            return Ok(self.lookahead.pop_front());
        }
        self.finished = true;
        self.check_terminator()?;
        log::trace!("end-of-archive marker after {} blocks", self.blocks_read);
        Ok(None)
    }

    /// Number of blocks returned so far.
    pub const fn blocks_read(&self) -> u64 {
        self.blocks_read
    }

    fn push(&mut self, mut bytes: &[u8]) {
        if !self.carry.is_empty() {
            let n = (BLOCKSIZE - self.carry.len()).min(bytes.len());
            self.carry.extend_from_slice(&bytes[..n]);
            bytes = &bytes[n..];
            if self.carry.len() < BLOCKSIZE {
                return;
            }
            let mut block = [0; BLOCKSIZE];
            block.copy_from_slice(&self.carry);
            self.lookahead.push_back(block);
            self.carry.clear();
        }

        let mut blocks = bytes.chunks_exact(BLOCKSIZE);
        for bytes in &mut blocks {
            let mut block = [0; BLOCKSIZE];
            block.copy_from_slice(bytes);
            self.lookahead.push_back(block);
        }
        self.carry.extend_from_slice(blocks.remainder());
    }

    fn check_terminator(&self) -> core::result::Result<(), TerminatorError> {
        if !self.carry.is_empty() {
            return Err(TerminatorError::Misaligned(self.carry.len()));
        }
        if self.lookahead.len() < LOOKAHEAD {
            return Err(TerminatorError::MissingBlocks(self.lookahead.len()));
        }
        if self.lookahead.iter().all(is_zero_block) {
            Ok(())
        } else {
            Err(TerminatorError::NonZeroBlock)
        }
    }
}

impl<S> Debug for BlockReader<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BlockReader")
            .field("carry", &self.carry.len())
            .field("lookahead", &self.lookahead.len())
            .field("exhausted", &self.exhausted)
            .field("finished", &self.finished)
            .field("blocks_read", &self.blocks_read)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::vec::Vec;

    fn archive(data_blocks: u8) -> Vec<u8> {
        let mut bytes = Vec::new();
        for i in 1..=data_blocks {
            bytes.extend_from_slice(&[i; BLOCKSIZE]);
        }
        bytes.extend_from_slice(&[0; 2 * BLOCKSIZE]);
        bytes
    }

    fn read_all<S: ChunkSource>(reader: &mut BlockReader<S>) -> Result<Vec<Block>> {
        let mut blocks = Vec::new();
        while let Some(block) = reader.next_block()? {
            blocks.push(block);
        }
        Ok(blocks)
    }

    fn terminator_error<S: ChunkSource>(mut reader: BlockReader<S>) -> TerminatorError {
        match read_all(&mut reader) {
            Err(Error::MalformedTerminator(err)) => err,
            other => panic!("expected a terminator error, got {:?}", other),
        }
    }

    #[test]
    fn test_any_chunk_size() {
        let bytes = archive(3);
        for chunk_size in [1, 7, 511, 512, 513, 1500, bytes.len()] {
            let mut reader = BlockReader::new(bytes.chunks(chunk_size).map(Ok::<_, Error>));
            let blocks = read_all(&mut reader).unwrap();
            assert_eq!(blocks.len(), 3, "chunk size {chunk_size}");
            for (i, block) in blocks.iter().enumerate() {
                assert!(block.iter().all(|&b| usize::from(b) == i + 1));
            }
            assert_eq!(reader.blocks_read(), 3);
            assert!(reader.next_block().unwrap().is_none());
        }
    }

    #[test]
    fn test_empty_chunks_are_ignored() {
        let bytes = archive(1);
        let chunks = vec![Vec::new(), bytes[..100].to_vec(), Vec::new(), bytes[100..].to_vec()];
        let mut reader = BlockReader::new(chunks.into_iter().map(Ok::<_, Error>));
        assert_eq!(read_all(&mut reader).unwrap().len(), 1);
    }

    #[test]
    fn test_only_terminator() {
        let mut reader = BlockReader::new(core::iter::once(Ok::<_, Error>(archive(0))));
        assert!(reader.next_block().unwrap().is_none());
    }

    #[test]
    fn test_misaligned() {
        let mut bytes = archive(1);
        bytes.extend_from_slice(&[0; 5]);
        let mut reader = BlockReader::new(core::iter::once(Ok::<_, Error>(bytes)));
        assert!(reader.next_block().unwrap().is_some());
        assert!(matches!(
            reader.next_block(),
            Err(Error::MalformedTerminator(TerminatorError::Misaligned(5)))
        ));
        assert!(reader.next_block().unwrap().is_none());
    }

    #[test]
    fn test_missing_blocks() {
        let empty = core::iter::empty::<Result<Vec<u8>>>();
        assert_eq!(terminator_error(BlockReader::new(empty)), TerminatorError::MissingBlocks(0));
        let one = core::iter::once(Ok::<_, Error>(vec![0_u8; BLOCKSIZE]));
        assert_eq!(terminator_error(BlockReader::new(one)), TerminatorError::MissingBlocks(1));
    }

    #[test]
    fn test_non_zero_terminator() {
        let mut bytes = vec![1_u8; BLOCKSIZE];
        bytes.extend_from_slice(&[0; BLOCKSIZE]);
        let reader = BlockReader::new(core::iter::once(Ok::<_, Error>(bytes)));
        assert_eq!(terminator_error(reader), TerminatorError::NonZeroBlock);
    }

    #[test]
    fn test_source_error() {
        let chunks = vec![Ok(vec![1_u8; 100]), Err(Error::UnexpectedEndOfStream)];
        let mut reader = BlockReader::new(chunks.into_iter());
        assert!(matches!(reader.next_block(), Err(Error::UnexpectedEndOfStream)));
        assert!(reader.next_block().unwrap().is_none());
    }
}
