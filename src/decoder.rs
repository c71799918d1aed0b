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
//! Module for [`ArchiveDecoder`].

use crate::blocks::{BlockReader, ChunkSource};
use crate::header::is_zero_block;
use crate::{Block, Error, Header, Result, TerminatorError, BLOCKSIZE};
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::{Debug, Formatter};
use core::str::Utf8Error;

/// Streaming reader of a ustar archive.
///
/// The decoder pulls chunks of any size from its [`ChunkSource`] and yields
/// one [`ArchiveEntry`] at a time. An entry mutably borrows the decoder, so
/// the next entry can only be requested once the current one, and its
/// [`EntryBody`], is gone. Payload that wasn't read by then is skipped.
///
/// Zero blocks in place of a header end the archive; all following blocks
/// must be zero too, which accepts the record padding written by GNU tar.
/// Any error closes the decoder.
pub struct ArchiveDecoder<S> {
    blocks: BlockReader<S>,
    /// Payload blocks of the current entry that were not read yet.
    pending_blocks: u64,
    /// Body bytes of the current entry that were not loaded into `block` yet.
    remaining_bytes: u64,
    /// Most recently read payload block, valid in `block_pos..block_len`.
    block: Block,
    block_pos: usize,
    block_len: usize,
    closed: bool,
}

impl<S: ChunkSource> ArchiveDecoder<S> {
    pub fn new(source: S) -> Self {
        Self {
            blocks: BlockReader::new(source),
            pending_blocks: 0,
            remaining_bytes: 0,
            block: [0; BLOCKSIZE],
            block_pos: 0,
            block_len: 0,
            closed: false,
        }
    }

    /// Returns the next entry of the archive, or `None` after the
    /// end-of-archive marker or an error.
    ///
    /// Unread payload of the previous entry is skipped first.
    pub fn next_entry(&mut self) -> Option<Result<ArchiveEntry<'_, S>>> {
        if self.closed {
            return None;
        }
        match self.read_header() {
            Ok(Some(header)) => Some(Ok(ArchiveEntry::new(self, header))),
            Ok(None) => {
                log::debug!("archive complete after {} blocks", self.blocks.blocks_read());
                self.closed = true;
                None
            }
            Err(err) => Some(Err(self.fail(err))),
        }
    }

    /// Whether the end of the archive was reached or an error occurred.
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    fn read_header(&mut self) -> Result<Option<Header>> {
        self.skip_pending()?;
        let Some(block) = self.blocks.next_block()? else {
            return Ok(None);
        };
        if is_zero_block(&block) {
            self.expect_zero_tail()?;
            return Ok(None);
        }

        let header = Header::decode(&block)?;
        let pathname = header.pathname_bytes();
        log::trace!(
            "entry {:?}: type={:?}, size={}",
            String::from_utf8_lossy(&pathname),
            header.typeflag,
            header.size
        );
        if pathname.is_empty() {
            log::warn!("entry without pathname at block {}", self.blocks.blocks_read() - 1);
        }
        if header.has_payload() {
            self.pending_blocks = header.payload_block_count();
            if header.is_regular_file() {
                self.remaining_bytes = header.size;
            } else {
                log::warn!(
                    "skipping {} payload blocks of {:?} entry {:?}",
                    self.pending_blocks,
                    header.typeflag,
                    String::from_utf8_lossy(&pathname)
                );
            }
        }
        Ok(Some(header))
    }

    /// Discards the payload of the current entry that wasn't read yet.
    fn skip_pending(&mut self) -> Result<()> {
        self.block_pos = self.block_len;
        self.remaining_bytes = 0;
        if self.pending_blocks > 0 {
            log::trace!("skipping {} payload blocks", self.pending_blocks);
        }
        while self.pending_blocks > 0 {
            match self.blocks.next_block() {
                Ok(Some(_)) => self.pending_blocks -= 1,
                Ok(None) => return Err(self.fail(Error::UnexpectedEndOfStream)),
                Err(err) => return Err(self.fail(err)),
            }
        }
        Ok(())
    }

    /// Checks that everything after a zero header block is zero as well.
    fn expect_zero_tail(&mut self) -> Result<()> {
        let mut padding = 1;
        while let Some(block) = self.blocks.next_block()? {
            if !is_zero_block(&block) {
                return Err(TerminatorError::NonZeroBlock.into());
            }
            padding += 1;
        }
        log::debug!("{} zero blocks of padding before the end-of-archive marker", padding);
        Ok(())
    }

    /// Reads the next block of the current file body. Returns `false` if the
    /// body is complete.
    fn load_block(&mut self) -> Result<bool> {
        if self.closed || self.remaining_bytes == 0 {
            return Ok(false);
        }
        let block = match self.blocks.next_block() {
            Ok(Some(block)) => block,
            Ok(None) => return Err(self.fail(Error::UnexpectedEndOfStream)),
            Err(err) => return Err(self.fail(err)),
        };
        let len = self.remaining_bytes.min(BLOCKSIZE as u64) as usize;
        self.remaining_bytes -= len as u64;
        self.pending_blocks = self.pending_blocks.saturating_sub(1);
        self.block = block;
        self.block_pos = 0;
        self.block_len = len;
        Ok(true)
    }

    fn fail(&mut self, err: Error) -> Error {
        log::debug!("closing archive decoder: {}", err);
        self.closed = true;
        self.block_pos = self.block_len;
        self.remaining_bytes = 0;
        self.pending_blocks = 0;
        err
    }
}

impl<S> Debug for ArchiveDecoder<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ArchiveDecoder")
            .field("blocks", &self.blocks)
            .field("pending_blocks", &self.pending_blocks)
            .field("remaining_bytes", &self.remaining_bytes)
            .field("buffered", &(self.block_len - self.block_pos))
            .field("closed", &self.closed)
            .finish()
    }
}

/// An entry of an archive: its decoded header and, for regular files, access
/// to the body.
pub struct ArchiveEntry<'a, S> {
    decoder: &'a mut ArchiveDecoder<S>,
    header: Header,
    pathname: Vec<u8>,
}

impl<'a, S: ChunkSource> ArchiveEntry<'a, S> {
    fn new(decoder: &'a mut ArchiveDecoder<S>, header: Header) -> Self {
        let pathname = header.pathname_bytes();
        Self {
            decoder,
            header,
            pathname,
        }
    }

    pub const fn header(&self) -> &Header {
        &self.header
    }

    /// Returns the full pathname, i.e. `prefix/name` for ustar headers with a
    /// prefix.
    pub fn pathname_bytes(&self) -> &[u8] {
        &self.pathname
    }

    /// Returns the full pathname as string.
    ///
    /// # Errors
    /// Returns a [`Utf8Error`] if the pathname is not valid UTF-8.
    pub fn pathname(&self) -> core::result::Result<&str, Utf8Error> {
        core::str::from_utf8(&self.pathname)
    }

    pub const fn size(&self) -> u64 {
        self.header.size
    }

    pub fn is_regular_file(&self) -> bool {
        self.header.is_regular_file()
    }

    pub fn is_directory(&self) -> bool {
        self.header.is_directory()
    }

    /// Returns the body of a regular file, or `None` for all other entry
    /// types. Dropping the body keeps the read position: a body requested
    /// later continues where the previous one stopped.
    pub fn body(&mut self) -> Option<EntryBody<'_, S>> {
        if self.header.is_regular_file() {
            Some(EntryBody {
                decoder: &mut *self.decoder,
            })
        } else {
            None
        }
    }

    /// Like [`ArchiveEntry::body`], but the body keeps the decoder borrowed
    /// instead of the entry.
    pub fn into_body(self) -> Option<EntryBody<'a, S>> {
        if self.header.is_regular_file() {
            Some(EntryBody {
                decoder: self.decoder,
            })
        } else {
            None
        }
    }

    /// Skips the payload of this entry right away instead of on the next
    /// call to [`ArchiveDecoder::next_entry`].
    ///
    /// # Errors
    /// Fails if the input ends or the source fails within the payload.
    pub fn skip(self) -> Result<()> {
        self.decoder.skip_pending()
    }
}

impl<S> Debug for ArchiveEntry<'_, S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ArchiveEntry")
            .field("pathname", &String::from_utf8_lossy(&self.pathname))
            .field("header", &self.header)
            .finish()
    }
}

/// Upper bound for the buffer [`EntryBody::read_to_vec`] reserves up front.
const PREALLOC_LIMIT: usize = 64 * 1024;

/// The body of a regular file, limited to the declared size.
///
/// Bytes are handed out either block-wise through
/// [`EntryBody::next_block`] or into a caller-supplied buffer through
/// [`EntryBody::read`]. Both may be mixed.
pub struct EntryBody<'a, S> {
    decoder: &'a mut ArchiveDecoder<S>,
}

impl<S: ChunkSource> EntryBody<'_, S> {
    /// Returns the next piece of the body: the unread rest of the current
    /// block or the next payload block, cut to the declared size. `None`
    /// marks the end of the body.
    pub fn next_block(&mut self) -> Option<Result<&[u8]>> {
        let decoder = &mut *self.decoder;
        if decoder.block_pos == decoder.block_len {
            match decoder.load_block() {
                Ok(true) => {}
                Ok(false) => return None,
                Err(err) => return Some(Err(err)),
            }
        }
        let start = decoder.block_pos;
        decoder.block_pos = decoder.block_len;
        Some(Ok(&decoder.block[start..decoder.block_len]))
    }

    /// Copies the next bytes of the body into `buf` and returns their number.
    /// `0` marks the end of the body, unless `buf` is empty.
    ///
    /// # Errors
    /// Fails with [`Error::UnexpectedEndOfStream`] if the input ends within
    /// the body, or with the error of the source.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let decoder = &mut *self.decoder;
        if decoder.block_pos == decoder.block_len && !decoder.load_block()? {
            return Ok(0);
        }
        let available = &decoder.block[decoder.block_pos..decoder.block_len];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        decoder.block_pos += n;
        Ok(n)
    }

    /// Reads the rest of the body into memory. The buffer grows with the
    /// data actually read, not with the declared size.
    pub fn read_to_vec(&mut self) -> Result<Vec<u8>> {
        let capacity = self.remaining().min(PREALLOC_LIMIT as u64) as usize;
        let mut content = Vec::with_capacity(capacity);
        while let Some(bytes) = self.next_block() {
            content.extend_from_slice(bytes?);
        }
        Ok(content)
    }

    /// Number of body bytes not handed out yet.
    pub fn remaining(&self) -> u64 {
        let decoder = &*self.decoder;
        decoder.remaining_bytes + (decoder.block_len - decoder.block_pos) as u64
    }

    /// Discards the rest of the body, so that the decoder is positioned at
    /// the next header.
    pub fn cancel(self) -> Result<()> {
        self.decoder.skip_pending()
    }
}

impl<S> Debug for EntryBody<'_, S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EntryBody")
            .field("remaining_bytes", &self.decoder.remaining_bytes)
            .field("buffered", &(self.decoder.block_len - self.decoder.block_pos))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{encode_header, Metadata};
    use crate::{
        split_pathname, ArchiveEncoder, DirEntry, EntryDescriptor, EntryOptions, FileEntry,
        HeaderFormat, TypeFlag,
    };
    use std::string::{String, ToString};
    use std::vec::Vec;

    const MTIME: u64 = 1_700_000_000;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn encode(entries: Vec<EntryDescriptor<'_>>) -> Vec<u8> {
        ArchiveEncoder::new(entries)
            .with_default_mtime(MTIME)
            .encode_all()
            .unwrap()
    }

    fn chunked(bytes: &[u8], size: usize) -> impl Iterator<Item = Result<&[u8]>> {
        bytes.chunks(size).map(Ok)
    }

    /// Decodes all entries into pathname, header and content.
    fn decode_all<S: ChunkSource>(source: S) -> Result<Vec<(String, Header, Vec<u8>)>> {
        let mut decoder = ArchiveDecoder::new(source);
        let mut entries = Vec::new();
        while let Some(entry) = decoder.next_entry() {
            let mut entry = entry?;
            let pathname = entry.pathname().unwrap().to_string();
            let header = entry.header().clone();
            let content = match entry.body() {
                Some(mut body) => body.read_to_vec()?,
                None => Vec::new(),
            };
            entries.push((pathname, header, content));
        }
        assert!(decoder.is_closed());
        assert!(decoder.next_entry().is_none());
        Ok(entries)
    }

    fn sample_archive() -> Vec<u8> {
        let long_path = format!("{}/{}", "p".repeat(150), "n".repeat(90));
        let pattern: Vec<u8> = (0..1300_u32).map(|i| (i % 251) as u8).collect();
        encode(vec![
            DirEntry::new("dir").into(),
            FileEntry::from_bytes("dir/a.txt", *b"hello")
                .with_options(
                    EntryOptions::default()
                        .with_mode("600")
                        .with_owner("1750", "144")
                        .with_owner_names("user", "staff"),
                )
                .into(),
            FileEntry::from_bytes("dir/empty", Vec::new()).into(),
            FileEntry::from_bytes(long_path, pattern).into(),
        ])
    }

    #[test]
    fn test_round_trip() {
        init_logger();
        let archive = sample_archive();
        for chunk_size in [1, 100, 512, 4096] {
            let entries = decode_all(chunked(&archive, chunk_size)).unwrap();
            assert_eq!(entries.len(), 4, "chunk size {chunk_size}");

            let (pathname, header, content) = &entries[0];
            assert_eq!(pathname, "dir/");
            assert!(header.is_directory());
            assert!(content.is_empty());

            let (pathname, header, content) = &entries[1];
            assert_eq!(pathname, "dir/a.txt");
            assert_eq!(content, b"hello");
            assert_eq!(header.mode.value(), Some(0o600));
            assert_eq!((header.uid, header.gid), (0o1750, 0o144));
            assert_eq!(header.mtime, MTIME);
            match &header.format {
                HeaderFormat::Ustar(ustar) => {
                    assert_eq!(ustar.uname.as_str(), Ok("user"));
                    assert_eq!(ustar.gname.as_str(), Ok("staff"));
                }
                HeaderFormat::OldStyle => panic!("expected a ustar header"),
            }

            assert_eq!(entries[2].0, "dir/empty");
            assert!(entries[2].2.is_empty());

            let (pathname, header, content) = &entries[3];
            assert_eq!(pathname.len(), 241);
            assert!(pathname.ends_with(&"n".repeat(90)));
            assert_eq!(header.name.as_bytes(), "n".repeat(90).as_bytes());
            assert_eq!(content.len(), 1300);
            assert_eq!(content[1299], (1299 % 251) as u8);
        }
    }

    #[test]
    fn test_single_file() {
        let archive = encode(vec![FileEntry::from_bytes("a.txt", *b"hello").into()]);
        let entries = decode_all(chunked(&archive, 512)).unwrap();
        assert_eq!(entries.len(), 1);
        let (pathname, header, content) = &entries[0];
        assert_eq!(pathname, "a.txt");
        assert_eq!(header.size, 5);
        assert_eq!(content, &[0x68_u8, 0x65, 0x6c, 0x6c, 0x6f]);
    }

    #[test]
    fn test_duplicates_collapse() {
        let archive = encode(vec![
            FileEntry::from_bytes("a.txt", *b"first").into(),
            FileEntry::from_bytes("b.txt", *b"other").into(),
            FileEntry::from_bytes("./a.txt", *b"second").into(),
        ]);
        let entries = decode_all(chunked(&archive, 512)).unwrap();
        let names: Vec<&str> = entries.iter().map(|(name, ..)| name.as_str()).collect();
        assert_eq!(names, ["a.txt", "b.txt"]);
        assert_eq!(entries[0].2, b"first");
    }

    #[test]
    fn test_body_blocks_are_truncated() {
        let archive = encode(vec![FileEntry::from_bytes("a", vec![7_u8; 600]).into()]);
        let mut decoder = ArchiveDecoder::new(chunked(&archive, 1000));
        let mut entry = decoder.next_entry().unwrap().unwrap();
        let mut body = entry.body().unwrap();
        assert_eq!(body.remaining(), 600);
        assert_eq!(body.next_block().unwrap().unwrap().len(), BLOCKSIZE);
        assert_eq!(body.next_block().unwrap().unwrap(), &[7_u8; 88][..]);
        assert!(body.next_block().is_none());
        assert_eq!(body.remaining(), 0);
    }

    #[test]
    fn test_read_into_buffer() {
        let content: Vec<u8> = (0..1300_u32).map(|i| (i % 13) as u8).collect();
        let archive = encode(vec![FileEntry::from_bytes("a", content.clone()).into()]);
        let mut decoder = ArchiveDecoder::new(chunked(&archive, 333));
        let mut entry = decoder.next_entry().unwrap().unwrap();
        let mut body = entry.body().unwrap();
        let mut read = Vec::new();
        let mut buf = [0; 7];
        loop {
            let n = body.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            read.extend_from_slice(&buf[..n]);
        }
        assert_eq!(read, content);
        assert_eq!(body.read(&mut []).unwrap(), 0);
    }

    #[test]
    fn test_cancel_resyncs() {
        init_logger();
        let archive = encode(vec![
            FileEntry::from_bytes("first", vec![1_u8; 2000]).into(),
            FileEntry::from_bytes("second", *b"second body").into(),
        ]);
        let mut decoder = ArchiveDecoder::new(chunked(&archive, 100));
        let entry = decoder.next_entry().unwrap().unwrap();
        assert_eq!(entry.pathname(), Ok("first"));
        entry.into_body().unwrap().cancel().unwrap();

        let mut entry = decoder.next_entry().unwrap().unwrap();
        assert_eq!(entry.pathname(), Ok("second"));
        assert_eq!(entry.body().unwrap().read_to_vec().unwrap(), b"second body");
        drop(entry);
        assert!(decoder.next_entry().is_none());
    }

    #[test]
    fn test_partially_read_entries_are_skipped() {
        let archive = encode(vec![
            FileEntry::from_bytes("first", vec![1_u8; 2000]).into(),
            FileEntry::from_bytes("second", vec![2_u8; 700]).into(),
            FileEntry::from_bytes("third", *b"3").into(),
        ]);
        let mut decoder = ArchiveDecoder::new(chunked(&archive, 512));

        let mut entry = decoder.next_entry().unwrap().unwrap();
        let mut buf = [0; 100];
        assert_eq!(entry.body().unwrap().read(&mut buf).unwrap(), 100);
        // a new body continues where the previous one stopped
        assert_eq!(entry.body().unwrap().remaining(), 1900);
        drop(entry);

        // never asked for the body
        let entry = decoder.next_entry().unwrap().unwrap();
        assert_eq!(entry.pathname(), Ok("second"));
        drop(entry);

        let mut entry = decoder.next_entry().unwrap().unwrap();
        assert_eq!(entry.pathname(), Ok("third"));
        assert_eq!(entry.body().unwrap().read_to_vec().unwrap(), b"3");
    }

    #[test]
    fn test_end_of_stream_while_skipping() {
        let archive = encode(vec![FileEntry::from_bytes("a", vec![1_u8; 1024]).into()]);
        // header and first data block, then the end-of-archive marker
        let mut truncated = archive[..2 * BLOCKSIZE].to_vec();
        truncated.extend_from_slice(&[0; 2 * BLOCKSIZE]);

        let mut decoder = ArchiveDecoder::new(chunked(&truncated, 512));
        let entry = decoder.next_entry().unwrap().unwrap();
        assert_eq!(entry.size(), 1024);
        drop(entry);
        assert!(matches!(
            decoder.next_entry(),
            Some(Err(Error::UnexpectedEndOfStream))
        ));
        assert!(decoder.next_entry().is_none());
    }

    #[test]
    fn test_huge_declared_size_is_not_preallocated() {
        let pathname = split_pathname("huge", false).unwrap();
        let size = (1_u64 << 36) - 1;
        let header = encode_header(&pathname, TypeFlag::REGTYPE, size, true, &Metadata::default());
        let mut archive = header.unwrap().to_vec();
        archive.extend_from_slice(&[b'x'; BLOCKSIZE]);
        archive.extend_from_slice(&[0; 2 * BLOCKSIZE]);

        let mut decoder = ArchiveDecoder::new(chunked(&archive, 512));
        let mut entry = decoder.next_entry().unwrap().unwrap();
        assert_eq!(entry.size(), size);
        assert!(matches!(
            entry.body().unwrap().read_to_vec(),
            Err(Error::UnexpectedEndOfStream)
        ));
        drop(entry);
        assert!(decoder.next_entry().is_none());
    }

    #[test]
    fn test_end_of_stream_while_cancelling() {
        let archive = encode(vec![FileEntry::from_bytes("a", vec![1_u8; 1024]).into()]);
        let mut truncated = archive[..2 * BLOCKSIZE].to_vec();
        truncated.extend_from_slice(&[0; 2 * BLOCKSIZE]);

        let mut decoder = ArchiveDecoder::new(chunked(&truncated, 512));
        let entry = decoder.next_entry().unwrap().unwrap();
        assert!(matches!(
            entry.into_body().unwrap().cancel(),
            Err(Error::UnexpectedEndOfStream)
        ));
        assert!(decoder.is_closed());
        assert!(decoder.next_entry().is_none());
    }

    #[test]
    fn test_end_of_stream_while_reading() {
        let archive = encode(vec![FileEntry::from_bytes("a", vec![1_u8; 1024]).into()]);
        let mut truncated = archive[..2 * BLOCKSIZE].to_vec();
        truncated.extend_from_slice(&[0; 2 * BLOCKSIZE]);

        let mut decoder = ArchiveDecoder::new(chunked(&truncated, 4096));
        let mut entry = decoder.next_entry().unwrap().unwrap();
        let mut body = entry.body().unwrap();
        assert!(body.next_block().unwrap().is_ok());
        assert!(matches!(
            body.next_block(),
            Some(Err(Error::UnexpectedEndOfStream))
        ));
        assert!(body.next_block().is_none());
        drop(entry);
        assert!(decoder.next_entry().is_none());
    }

    #[test]
    fn test_missing_terminator() {
        let archive = encode(vec![FileEntry::from_bytes("a", *b"hello").into()]);
        let truncated = &archive[..archive.len() - BLOCKSIZE];
        assert!(matches!(
            decode_all(chunked(truncated, 512)),
            Err(Error::MalformedTerminator(_))
        ));

        let mut misaligned = archive.clone();
        misaligned.push(0);
        assert!(matches!(
            decode_all(chunked(&misaligned, 512)),
            Err(Error::MalformedTerminator(TerminatorError::Misaligned(1)))
        ));
    }

    #[test]
    fn test_zero_padding() {
        let mut archive = sample_archive();
        archive.extend_from_slice(&[0; 8 * BLOCKSIZE]);
        assert_eq!(decode_all(chunked(&archive, 1000)).unwrap().len(), 4);

        let mut archive = encode(vec![FileEntry::from_bytes("a", *b"hello").into()]);
        archive.extend_from_slice(&[1; BLOCKSIZE]);
        archive.extend_from_slice(&[0; 2 * BLOCKSIZE]);
        assert!(matches!(
            decode_all(chunked(&archive, 1000)),
            Err(Error::MalformedTerminator(TerminatorError::NonZeroBlock))
        ));
    }

    #[test]
    fn test_checksum_error_closes_decoder() {
        let mut archive = sample_archive();
        // first byte of the second header ("dir/a.txt")
        archive[BLOCKSIZE] ^= 0x01;
        let mut decoder = ArchiveDecoder::new(chunked(&archive, 512));
        assert!(decoder.next_entry().unwrap().is_ok());
        assert!(matches!(
            decoder.next_entry(),
            Some(Err(Error::ChecksumMismatch { .. }))
        ));
        assert!(decoder.is_closed());
        assert!(decoder.next_entry().is_none());
    }

    #[test]
    fn test_payload_of_other_entry_types_is_skipped() {
        let pax = split_pathname("PaxHeaders/a", false).unwrap();
        let header = encode_header(&pax, TypeFlag::XHDTYPE, 100, false, &Metadata::default());
        let mut archive = header.unwrap().to_vec();
        archive.extend_from_slice(&[b'x'; BLOCKSIZE]);
        archive.extend(encode(vec![FileEntry::from_bytes("a", *b"data").into()]));

        let entries = decode_all(chunked(&archive, 512)).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].1.typeflag.try_to_type_flag(), Ok(TypeFlag::XHDTYPE));
        assert!(entries[0].2.is_empty());
        assert_eq!(entries[1].0, "a");
        assert_eq!(entries[1].2, b"data");

        let mut decoder = ArchiveDecoder::new(chunked(&archive, 512));
        let mut entry = decoder.next_entry().unwrap().unwrap();
        assert!(entry.body().is_none());
        entry.skip().unwrap();
        assert_eq!(decoder.next_entry().unwrap().unwrap().pathname(), Ok("a"));
    }

    fn check_gnu_fixture(archive: &[u8]) {
        let entries = decode_all(chunked(archive, 700)).unwrap();
        let names: Vec<&str> = entries.iter().map(|(name, ..)| name.as_str()).collect();
        assert_eq!(
            names,
            ["bye_world_513b.txt", "hello_world_513b.txt", "hello_world.txt"]
        );
        assert_eq!(entries[0].2, include_bytes!("../tests/bye_world_513b.txt"));
        assert_eq!(entries[1].2, include_bytes!("../tests/hello_world_513b.txt"));
        assert_eq!(entries[2].2, b"Hello World\n");
        for (_, header, _) in &entries {
            assert!(header.is_regular_file());
            assert_eq!(header.mtime, MTIME);
            assert_eq!(header.mode.value(), Some(0o644));
        }
    }

    #[test]
    fn test_gnu_tar_archives() {
        init_logger();
        check_gnu_fixture(include_bytes!("../tests/gnu_tar_default.tar"));
        check_gnu_fixture(include_bytes!("../tests/gnu_tar_gnu.tar"));
        check_gnu_fixture(include_bytes!("../tests/gnu_tar_ustar.tar"));
        check_gnu_fixture(include_bytes!("../tests/gnu_tar_v7.tar"));
    }

    #[test]
    fn test_gnu_tar_long_path() {
        let archive = include_bytes!("../tests/gnu_tar_ustar_long_path.tar");
        let entries = decode_all(chunked(archive, 10240)).unwrap();
        let d = "d".repeat(60);
        let e = "e".repeat(60);
        let f = "f".repeat(80);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].0, format!("{d}/"));
        assert!(entries[0].1.is_directory());
        assert_eq!(entries[1].0, format!("{d}/{e}/"));
        assert!(entries[1].1.is_directory());
        assert_eq!(entries[2].0, format!("{d}/{e}/{f}"));
        assert_eq!(entries[2].1.mode.value(), Some(0o755));
        assert_eq!(entries[2].2, b"deep file");
    }
}
