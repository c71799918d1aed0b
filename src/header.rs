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
//! TAR header definition taken from <https://www.gnu.org/software/tar/manual/html_node/Standard.html>.
//! A Tar-archive is a collection of 512-byte sized blocks. Unfortunately there are several
//! TAR-like archive specifications. An Overview can be found here:
//! <https://www.gnu.org/software/tar/manual/html_node/Formats.html#Formats>
//!
//! This library writes the POSIX ustar format and reads ustar as well as
//! old-style (v7) headers.

#![allow(non_upper_case_globals)]

use crate::{
    Block, Error, Result, SplitPathname, TarFormatOctal, TarFormatString, BLOCKSIZE, NAME_LEN,
    PREFIX_LEN,
};
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::{Debug, Display, Formatter};

/// Magic and version of a ustar header, stored at offset 257.
pub const USTAR_MAGIC: &[u8; 8] = b"ustar\x0000";

/// Number of octal digits of the `mode`, `uid` and `gid` fields.
pub const ID_DIGITS: usize = 6;
/// Number of octal digits of the `devmajor` and `devminor` fields.
pub const DEV_DIGITS: usize = 7;
/// Number of octal digits of the `mtime` field.
pub const MTIME_DIGITS: usize = 11;
/// Size of the `uname` and `gname` fields.
pub const OWNER_NAME_LEN: usize = 32;

/// Exclusive upper bound of a file size: `8^11` (8 GiB) or, with the
/// extended size field, `8^12` (64 GiB).
pub const fn size_limit(size_extension: bool) -> u64 {
    if size_extension {
        1 << 36
    } else {
        1 << 33
    }
}

/// Errors that may happen when parsing the [`ModeFlags`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ModeError {
    InvalidOctal,
    IllegalMode,
}

/// Wrapper around the UNIX file permissions given in octal ASCII.
#[derive(Copy, Clone, PartialEq, Eq)]
#[repr(transparent)]
pub struct Mode(TarFormatOctal<8>);

impl Mode {
    /// Parses the [`ModeFlags`] from the mode string.
    pub fn to_flags(self) -> core::result::Result<ModeFlags, ModeError> {
        let bits = self.0.as_number::<u64>().ok_or(ModeError::InvalidOctal)?;
        ModeFlags::from_bits(bits).ok_or(ModeError::IllegalMode)
    }

    /// Returns the numeric mode.
    pub fn value(self) -> Option<u32> {
        self.0.as_number::<u32>()
    }
}

impl Debug for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        Debug::fmt(&self.to_flags(), f)
    }
}

/// Header of the TAR format as specified by POSIX (POSIX 1003.1-1990).
///
/// This is a view on the raw 512 bytes of a header block. Each file is started
/// by such a header, that describes the size and the file name. After that,
/// the file content stands in chunks of 512 bytes. The fields after
/// `linkname` are only meaningful if [`PosixHeader::is_ustar`] is true.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(C, packed)]
pub struct PosixHeader {
    pub name: TarFormatString<NAME_LEN>,
    pub mode: Mode,
    pub uid: TarFormatOctal<8>,
    pub gid: TarFormatOctal<8>,
    pub size: TarFormatOctal<12>,
    pub mtime: TarFormatOctal<12>,
    pub cksum: TarFormatOctal<8>,
    pub typeflag: TypeFlagRaw,
    pub linkname: TarFormatString<NAME_LEN>,
    pub magic: TarFormatString<6>,
    pub version: TarFormatString<2>,
    pub uname: TarFormatString<OWNER_NAME_LEN>,
    pub gname: TarFormatString<OWNER_NAME_LEN>,
    pub dev_major: TarFormatOctal<8>,
    pub dev_minor: TarFormatOctal<8>,
    pub prefix: TarFormatString<PREFIX_LEN>,
    // padding => to BLOCKSIZE bytes
    pub _pad: [u8; 12],
}

impl PosixHeader {
    /// Interprets a block as header.
    pub fn from_block(block: &Block) -> &Self {
        // SAFETY: `PosixHeader` consists of byte arrays only, therefore it has
        // an alignment of 1, a size of `BLOCKSIZE` and every bit pattern is
        // valid.
        unsafe { &*block.as_ptr().cast::<Self>() }
    }

    /// Interprets a block as header for modification.
    pub fn from_block_mut(block: &mut Block) -> &mut Self {
        // SAFETY: see `from_block`.
        unsafe { &mut *block.as_mut_ptr().cast::<Self>() }
    }

    /// Returns the raw bytes of the header.
    pub fn as_block(&self) -> &Block {
        // SAFETY: see `from_block`.
        unsafe { &*(self as *const Self).cast::<Block>() }
    }

    /// Whether magic and version identify a ustar header.
    pub fn is_ustar(&self) -> bool {
        &self.as_block()[257..265] == USTAR_MAGIC
    }


    /// Computes the checksum: the unsigned sum of all header bytes, where the
    /// bytes of the checksum field count as spaces.
    pub fn compute_checksum(&self) -> u32 {
        let block = self.as_block();
        let sum = |bytes: &[u8]| bytes.iter().map(|&b| u32::from(b)).sum::<u32>();
        sum(&block[..148]) + 8 * u32::from(b' ') + sum(&block[156..])
    }

    /// Stores the checksum. Must be called after all other fields are set.
    pub fn finalize(&mut self) {
        self.cksum.as_inner_mut().fill(b' ');
        let checksum = self.compute_checksum();
        // 6 digits hold up to 0o777777, more than 512 * 255
        let _ = self.cksum.set(u64::from(checksum), 6, b"\0 ");
    }

    /// Writes magic and version of the ustar format.
    pub fn set_ustar(&mut self) {
        self.magic = TarFormatString::new(*b"ustar\0");
        self.version = TarFormatString::new(*b"00");
    }

    /// Writes the `name` and `prefix` fields.
    pub fn set_pathname(&mut self, pathname: &SplitPathname) {
        // `SplitPathname` guarantees that both parts fit their fields
        let _ = self.name.set_bytes(pathname.name());
        let _ = self.prefix.set_bytes(pathname.prefix());
    }

    pub fn set_typeflag(&mut self, typeflag: TypeFlag) {
        self.typeflag = typeflag.into();
    }

    pub fn set_mode(&mut self, mode: u32) -> Result<()> {
        set_octal(&mut self.mode.0, "mode", mode.into(), ID_DIGITS, b" \0")
    }

    pub fn set_uid(&mut self, uid: u64) -> Result<()> {
        set_octal(&mut self.uid, "uid", uid, ID_DIGITS, b" \0")
    }

    pub fn set_gid(&mut self, gid: u64) -> Result<()> {
        set_octal(&mut self.gid, "gid", gid, ID_DIGITS, b" \0")
    }

    pub fn set_mtime(&mut self, mtime: u64) -> Result<()> {
        set_octal(&mut self.mtime, "mtime", mtime, MTIME_DIGITS, b" ")
    }

    pub fn set_dev_major(&mut self, major: u64) -> Result<()> {
        set_octal(&mut self.dev_major, "devmajor", major, DEV_DIGITS, b"\0")
    }

    pub fn set_dev_minor(&mut self, minor: u64) -> Result<()> {
        set_octal(&mut self.dev_minor, "devminor", minor, DEV_DIGITS, b"\0")
    }

    /// Writes the size as 11 digits and a space or, with `size_extension`,
    /// as 12 digits without terminator.
    pub fn set_size(&mut self, size: u64, size_extension: bool) -> Result<()> {
        check_size(size, size_extension)?;
        let _ = if size_extension {
            self.size.set(size, 12, b"")
        } else {
            self.size.set(size, 11, b" ")
        };
        Ok(())
    }

    pub fn set_uname(&mut self, uname: &[u8]) -> Result<()> {
        set_owner_name(&mut self.uname, "uname", uname)
    }

    pub fn set_gname(&mut self, gname: &[u8]) -> Result<()> {
        set_owner_name(&mut self.gname, "gname", gname)
    }
}

fn set_octal<const N: usize>(
    field: &mut TarFormatOctal<N>,
    name: &'static str,
    value: u64,
    width: usize,
    terminator: &[u8],
) -> Result<()> {
    if field.set(value, width, terminator) {
        Ok(())
    } else {
        Err(Error::InvalidOptions {
            field: name,
            value: format!("{value:o}"),
        })
    }
}

fn set_owner_name(
    field: &mut TarFormatString<OWNER_NAME_LEN>,
    name: &'static str,
    value: &[u8],
) -> Result<()> {
    if !value.contains(&0) && field.set_bytes(value) {
        Ok(())
    } else {
        Err(Error::InvalidOptions {
            field: name,
            value: String::from_utf8_lossy(value).into_owned(),
        })
    }
}

/// Checks that `size` fits into the size field.
pub fn check_size(size: u64, size_extension: bool) -> Result<()> {
    let limit = size_limit(size_extension);
    if size < limit {
        Ok(())
    } else {
        Err(Error::InvalidSize { size, limit })
    }
}

/// Whether all bytes of the block are zero.
pub fn is_zero_block(block: &Block) -> bool {
    block.iter().all(|&b| b == 0)
}

/// Metadata written into a header, besides pathname, type and size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub mode: u32,
    pub uid: u64,
    pub gid: u64,
    pub mtime: u64,
    pub uname: Vec<u8>,
    pub gname: Vec<u8>,
    pub dev_major: u64,
    pub dev_minor: u64,
}

/// Encodes a ustar header block. The checksum is computed last.
///
/// # Errors
/// Fails with [`Error::InvalidSize`] or [`Error::InvalidOptions`] if a value
/// does not fit its field.
pub fn encode_header(
    pathname: &SplitPathname,
    typeflag: TypeFlag,
    size: u64,
    size_extension: bool,
    metadata: &Metadata,
) -> Result<Block> {
    let mut block = [0; BLOCKSIZE];
    let hdr = PosixHeader::from_block_mut(&mut block);
    hdr.set_pathname(pathname);
    hdr.set_mode(metadata.mode)?;
    hdr.set_uid(metadata.uid)?;
    hdr.set_gid(metadata.gid)?;
    hdr.set_size(size, size_extension)?;
    hdr.set_mtime(metadata.mtime)?;
    hdr.set_typeflag(typeflag);
    hdr.set_ustar();
    hdr.set_uname(&metadata.uname)?;
    hdr.set_gname(&metadata.gname)?;
    hdr.set_dev_major(metadata.dev_major)?;
    hdr.set_dev_minor(metadata.dev_minor)?;
    hdr.finalize();
    Ok(block)
}

/// Fields only present in ustar headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UstarFields {
    pub uname: TarFormatString<OWNER_NAME_LEN>,
    pub gname: TarFormatString<OWNER_NAME_LEN>,
    pub dev_major: u64,
    pub dev_minor: u64,
    pub prefix: TarFormatString<PREFIX_LEN>,
}

/// Format of a decoded header, detected by the magic at offset 257.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderFormat {
    /// Pre-POSIX header: everything after `linkname` is padding.
    OldStyle,
    Ustar(UstarFields),
}

/// A decoded header with verified checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: TarFormatString<NAME_LEN>,
    pub mode: Mode,
    pub uid: u64,
    pub gid: u64,
    pub size: u64,
    pub mtime: u64,
    pub checksum: u32,
    /// Type of the entry. `AREGTYPE` is reported as `REGTYPE`.
    pub typeflag: TypeFlagRaw,
    pub linkname: TarFormatString<NAME_LEN>,
    pub format: HeaderFormat,
}

impl Header {
    /// Decodes a header block.
    ///
    /// # Errors
    /// Fails with [`Error::ChecksumMismatch`] if the stored checksum differs
    /// from the sum of the header bytes, or with
    /// [`Error::InvalidHeaderField`] if a numeric field can't be parsed.
    pub fn decode(block: &Block) -> Result<Self> {
        let hdr = PosixHeader::from_block(block);
        let stored: u32 = number(&hdr.cksum, "checksum")?;
        let computed = hdr.compute_checksum();
        if stored != computed {
            return Err(Error::ChecksumMismatch { stored, computed });
        }

        let format = if hdr.is_ustar() {
            HeaderFormat::Ustar(UstarFields {
                uname: hdr.uname,
                gname: hdr.gname,
                dev_major: number(&hdr.dev_major, "devmajor")?,
                dev_minor: number(&hdr.dev_minor, "devminor")?,
                prefix: hdr.prefix,
            })
        } else {
            HeaderFormat::OldStyle
        };

        Ok(Self {
            name: hdr.name,
            mode: hdr.mode,
            uid: number(&hdr.uid, "uid")?,
            gid: number(&hdr.gid, "gid")?,
            size: number(&hdr.size, "size")?,
            mtime: number(&hdr.mtime, "mtime")?,
            checksum: stored,
            typeflag: hdr.typeflag.normalized(),
            linkname: hdr.linkname,
            format,
        })
    }

    /// Returns `prefix/name` for ustar headers with a prefix, else `name`.
    pub fn pathname_bytes(&self) -> Vec<u8> {
        match &self.format {
            HeaderFormat::Ustar(ustar) => {
                crate::pathname::join_pathname(ustar.prefix.as_bytes(), self.name.as_bytes())
            }
            HeaderFormat::OldStyle => self.name.as_bytes().to_vec(),
        }
    }

    pub fn is_regular_file(&self) -> bool {
        self.typeflag
            .try_to_type_flag()
            .is_ok_and(TypeFlag::is_regular_file)
    }

    pub fn is_directory(&self) -> bool {
        self.typeflag.try_to_type_flag() == Ok(TypeFlag::DIRTYPE)
    }

    /// Number of data blocks following the header.
    pub fn payload_block_count(&self) -> u64 {
        self.size.div_ceil(BLOCKSIZE as u64)
    }

    /// Whether data blocks follow the header. Links, devices, FIFOs and
    /// directories never carry data, whatever their size field says.
    pub fn has_payload(&self) -> bool {
        let no_payload = matches!(
            self.typeflag.try_to_type_flag(),
            Ok(TypeFlag::LINK
                | TypeFlag::SYMTYPE
                | TypeFlag::CHRTYPE
                | TypeFlag::BLKTYPE
                | TypeFlag::DIRTYPE
                | TypeFlag::FIFOTYPE)
        );
        !no_payload && self.size > 0
    }
}

fn number<const N: usize, T: num_traits::Num>(
    field: &TarFormatOctal<N>,
    name: &'static str,
) -> Result<T> {
    field
        .as_number::<T>()
        .ok_or(Error::InvalidHeaderField { field: name })
}

#[derive(Copy, Clone, Debug, PartialOrd, PartialEq, Eq)]
pub struct InvalidTypeFlagError(u8);

impl Display for InvalidTypeFlagError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("{:x} is not a valid TypeFlag", self.0))
    }
}

impl core::error::Error for InvalidTypeFlagError {}

#[derive(Copy, Clone, PartialOrd, PartialEq, Eq)]
pub struct TypeFlagRaw(u8);

impl TypeFlagRaw {
    /// Tries to parse the underlying value as [`TypeFlag`]. This fails if the
    /// Tar file is corrupt or uses an extension.
    pub fn try_to_type_flag(self) -> core::result::Result<TypeFlag, InvalidTypeFlagError> {
        TypeFlag::try_from(self)
    }

    /// Maps the legacy NUL flag to `'0'`; both denote a regular file.
    pub const fn normalized(self) -> Self {
        match self.0 {
            b'\0' => Self(b'0'),
            other => Self(other),
        }
    }
}

impl Debug for TypeFlagRaw {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        Debug::fmt(&self.try_to_type_flag(), f)
    }
}

impl From<TypeFlag> for TypeFlagRaw {
    fn from(value: TypeFlag) -> Self {
        Self(value as u8)
    }
}

/// Describes the kind of payload, that follows after a
/// [`PosixHeader`]. The properties of this payload are
/// described inside the header.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
#[allow(unused)]
pub enum TypeFlag {
    /// Represents a regular file. New archives should be created using
    /// REGTYPE.
    REGTYPE = b'0',
    /// Legacy flag of a regular file, silently recognized as REGTYPE.
    AREGTYPE = b'\0',
    /// This flag represents a file linked to another file, of any type, previously archived. Such
    /// files are identified in Unix by each file having the same device and inode number. The
    /// linked-to name is specified in the linkname field with a trailing null.
    LINK = b'1',
    /// This represents a symbolic link to another file. The linked-to name is specified in the
    /// linkname field with a trailing null.
    SYMTYPE = b'2',
    /// Character special file. The devmajor and devminor fields contain the
    /// device numbers.
    CHRTYPE = b'3',
    /// Block special file. The devmajor and devminor fields contain the
    /// device numbers.
    BLKTYPE = b'4',
    /// This flag specifies a directory or sub-directory. The directory name in the name field
    /// should end with a slash.
    DIRTYPE = b'5',
    /// This specifies a FIFO special file. Note that the archiving of a FIFO file archives the
    /// existence of this file and not its contents.
    FIFOTYPE = b'6',
    /// This specifies a contiguous file, which is the same as a normal file except that, in
    /// operating systems which support it, all its space is allocated contiguously on the disk.
    CONTTYPE = b'7',
    /// Extended header referring to the next file in the archive
    XHDTYPE = b'x',
    /// Global extended header
    XGLTYPE = b'g',
}

impl TypeFlag {
    /// Whether we have a regular file.
    pub fn is_regular_file(self) -> bool {
        // both denote a regular file
        self == Self::AREGTYPE || self == Self::REGTYPE
    }
}

impl TryFrom<TypeFlagRaw> for TypeFlag {
    type Error = InvalidTypeFlagError;

    fn try_from(value: TypeFlagRaw) -> core::result::Result<Self, Self::Error> {
        match value.0 {
            b'0' => Ok(Self::REGTYPE),
            b'\0' => Ok(Self::AREGTYPE),
            b'1' => Ok(Self::LINK),
            b'2' => Ok(Self::SYMTYPE),
            b'3' => Ok(Self::CHRTYPE),
            b'4' => Ok(Self::BLKTYPE),
            b'5' => Ok(Self::DIRTYPE),
            b'6' => Ok(Self::FIFOTYPE),
            b'7' => Ok(Self::CONTTYPE),
            b'x' => Ok(Self::XHDTYPE),
            b'g' => Ok(Self::XGLTYPE),
            e => Err(InvalidTypeFlagError(e)),
        }
    }
}

bitflags::bitflags! {
    /// UNIX file permissions in octal format.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ModeFlags: u64 {
        /// Set UID on execution.
        const SetUID = 0o4000;
        /// Set GID on execution.
        const SetGID = 0o2000;
        /// Reserved.
        const TSVTX = 0o1000;
        /// Owner read.
        const OwnerRead = 0o400;
        /// Owner write.
        const OwnerWrite = 0o200;
        /// Owner execute.
        const OwnerExec = 0o100;
        /// Group read.
        const GroupRead = 0o040;
        /// Group write.
        const GroupWrite = 0o020;
        /// Group execute.
        const GroupExec = 0o010;
        /// Others read.
        const OthersRead = 0o004;
        /// Others write.
        const OthersWrite = 0o002;
        /// Others execute.
        const OthersExec = 0o001;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split_pathname;
    use std::mem::size_of;

    fn file_header(path: &str, size: u64) -> Block {
        let metadata = Metadata {
            mode: 0o644,
            mtime: 1_700_000_000,
            uname: b"root".to_vec(),
            gname: b"root".to_vec(),
            ..Metadata::default()
        };
        let pathname = split_pathname(path, false).unwrap();
        encode_header(&pathname, TypeFlag::REGTYPE, size, false, &metadata).unwrap()
    }

    /// Returns the first header of the archive.
    fn first_block(tar_archive_data: &[u8]) -> &Block {
        tar_archive_data[..BLOCKSIZE].try_into().unwrap()
    }

    #[test]
    fn test_size() {
        assert_eq!(BLOCKSIZE, size_of::<PosixHeader>());
    }

    #[test]
    fn test_encode_layout() {
        let block = file_header("a.txt", 5);
        assert_eq!(&block[0..6], b"a.txt\0");
        assert_eq!(&block[100..108], b"000644 \0");
        assert_eq!(&block[108..116], b"000000 \0");
        assert_eq!(&block[124..136], b"00000000005 ");
        assert_eq!(&block[136..148], b"14524770400 ");
        assert_eq!(block[156], b'0');
        assert_eq!(&block[257..265], USTAR_MAGIC);
        assert_eq!(&block[265..270], b"root\0");
        assert_eq!(&block[329..337], b"0000000\0");
        assert_eq!(block[154], 0);
        assert_eq!(block[155], b' ');

        let hdr = PosixHeader::from_block(&block);
        assert_eq!(hdr.cksum.as_number::<u32>(), Some(hdr.compute_checksum()));
        assert_eq!(hdr.size.as_number::<u64>(), Some(5));
    }

    #[test]
    fn test_encode_decode() {
        let block = file_header("a.txt", 5);
        let header = Header::decode(&block).unwrap();
        assert_eq!(header.name.as_str(), Ok("a.txt"));
        assert_eq!(header.pathname_bytes(), b"a.txt");
        assert_eq!(header.size, 5);
        assert_eq!(header.mtime, 1_700_000_000);
        assert_eq!(header.mode.value(), Some(0o644));
        assert_eq!(
            header.mode.to_flags(),
            Ok(ModeFlags::OwnerRead
                | ModeFlags::OwnerWrite
                | ModeFlags::GroupRead
                | ModeFlags::OthersRead)
        );
        assert!(header.is_regular_file());
        assert!(header.has_payload());
        match &header.format {
            HeaderFormat::Ustar(ustar) => {
                assert_eq!(ustar.uname.as_str(), Ok("root"));
                assert!(ustar.prefix.is_empty());
            }
            HeaderFormat::OldStyle => panic!("expected a ustar header"),
        }
    }

    #[test]
    fn test_decode_prefix() {
        let path = format!("{}/{}", "p".repeat(150), "n".repeat(90));
        let block = file_header(&path, 0);
        let header = Header::decode(&block).unwrap();
        assert_eq!(header.pathname_bytes(), path.as_bytes());
        assert!(!header.has_payload());
    }

    #[test]
    fn test_size_extension() {
        let pathname = split_pathname("big", false).unwrap();
        let metadata = Metadata::default();
        let size = size_limit(false);
        assert!(matches!(
            encode_header(&pathname, TypeFlag::REGTYPE, size, false, &metadata),
            Err(Error::InvalidSize { limit, .. }) if limit == 1 << 33
        ));
        let block = encode_header(&pathname, TypeFlag::REGTYPE, size, true, &metadata).unwrap();
        assert_eq!(&block[124..136], b"100000000000");
        assert_eq!(Header::decode(&block).unwrap().size, 1 << 33);
        assert!(matches!(
            encode_header(&pathname, TypeFlag::REGTYPE, 1 << 36, true, &metadata),
            Err(Error::InvalidSize { .. })
        ));
    }

    #[test]
    fn test_every_flipped_byte_is_detected() {
        let block = file_header("dir/file.txt", 1234);
        for i in (0..BLOCKSIZE).filter(|i| !(148..156).contains(i)) {
            let mut corrupt = block;
            corrupt[i] ^= 0x01;
            assert!(
                matches!(Header::decode(&corrupt), Err(Error::ChecksumMismatch { .. })),
                "flipped byte {i} was not detected"
            );
        }
    }

    #[test]
    fn test_invalid_options() {
        let pathname = split_pathname("f", false).unwrap();
        let metadata = Metadata {
            mode: 0o7777777,
            ..Metadata::default()
        };
        assert!(matches!(
            encode_header(&pathname, TypeFlag::REGTYPE, 0, false, &metadata),
            Err(Error::InvalidOptions { field: "mode", .. })
        ));
        let metadata = Metadata {
            uname: [b'u'; 33].to_vec(),
            ..Metadata::default()
        };
        assert!(matches!(
            encode_header(&pathname, TypeFlag::REGTYPE, 0, false, &metadata),
            Err(Error::InvalidOptions { field: "uname", .. })
        ));
    }

    #[test]
    fn test_decode_gnu_tar_ustar() {
        let header = Header::decode(first_block(include_bytes!("../tests/gnu_tar_ustar.tar"))).unwrap();
        assert_eq!(header.name.as_str(), Ok("bye_world_513b.txt"));
        assert_eq!(header.size, 513);
        assert_eq!(header.payload_block_count(), 2);
        assert_eq!(header.mtime, 1_700_000_000);
        assert_eq!(header.typeflag.try_to_type_flag(), Ok(TypeFlag::REGTYPE));
        assert!(matches!(header.format, HeaderFormat::Ustar(_)));
    }

    #[test]
    fn test_decode_old_style() {
        // v7 headers have no magic and a NUL typeflag
        let block = first_block(include_bytes!("../tests/gnu_tar_v7.tar"));
        assert_eq!(
            PosixHeader::from_block(block).typeflag.try_to_type_flag(),
            Ok(TypeFlag::AREGTYPE)
        );
        let header = Header::decode(block).unwrap();
        assert_eq!(header.format, HeaderFormat::OldStyle);
        assert_eq!(header.typeflag.try_to_type_flag(), Ok(TypeFlag::REGTYPE));
        assert!(header.is_regular_file());
        assert_eq!(header.pathname_bytes(), b"bye_world_513b.txt");

        // GNU headers carry a different magic and are read like old-style ones
        let block = first_block(include_bytes!("../tests/gnu_tar_gnu.tar"));
        let header = Header::decode(block).unwrap();
        assert_eq!(header.format, HeaderFormat::OldStyle);
        assert_eq!(header.size, 513);
    }

    #[test]
    fn test_show_tar_header_magics() {
        let hdr = PosixHeader::from_block(first_block(include_bytes!("../tests/gnu_tar_default.tar")));
        println!("default: magic='{:?}', version='{:?}'", hdr.magic, hdr.version);
        let hdr = PosixHeader::from_block(first_block(include_bytes!("../tests/gnu_tar_ustar.tar")));
        println!("ustar: magic='{:?}', version='{:?}'", hdr.magic, hdr.version);
        assert!(hdr.is_ustar());
    }

    #[test]
    fn test_directory_has_no_payload() {
        let mut block = file_header("dir", 0);
        let hdr = PosixHeader::from_block_mut(&mut block);
        hdr.set_typeflag(TypeFlag::DIRTYPE);
        hdr.set_size(4096, false).unwrap();
        hdr.finalize();
        let header = Header::decode(&block).unwrap();
        assert!(header.is_directory());
        assert!(!header.has_payload());
    }
}
