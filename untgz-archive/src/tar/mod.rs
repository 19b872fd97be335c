//! TAR header support.
//!
//! This module decodes the fixed 512-byte header records of ustar and old-style
//! (v7 / GNU) archives:
//! - [`header`]: field layout, octal parsing, checksum validation, full path
//! - [`longname`]: GNU long-name / long-link continuation records

pub mod header;
pub mod longname;

pub use header::{ArchiveHeader, HeaderBlock, valid_checksum};
pub use longname::{PendingLongName, read_long_name};

/// Regular file.
pub const REGTYPE: u8 = b'0';
/// Regular file, pre-POSIX spelling.
pub const AREGTYPE: u8 = 0;
/// Hard link.
pub const LNKTYPE: u8 = b'1';
/// Symbolic link.
pub const SYMTYPE: u8 = b'2';
/// Character special.
pub const CHRTYPE: u8 = b'3';
/// Block special.
pub const BLKTYPE: u8 = b'4';
/// Directory.
pub const DIRTYPE: u8 = b'5';
/// FIFO.
pub const FIFOTYPE: u8 = b'6';
/// Contiguous file.
pub const CONTTYPE: u8 = b'7';
/// GNU long link name for the next entry.
pub const GNU_LONGLINK: u8 = b'K';
/// GNU long name for the next entry.
pub const GNU_LONGNAME: u8 = b'L';

/// Kind of entry described by a header's typeflag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular or contiguous file.
    Regular,
    /// Directory.
    Directory,
    /// Hard link.
    Link,
    /// Symbolic link.
    Symlink,
    /// Character or block device.
    Device,
    /// Named pipe.
    Fifo,
    /// GNU long-name or long-link record.
    LongName,
    /// Anything else.
    Other(u8),
}

impl EntryKind {
    /// Classify a typeflag byte.
    pub fn from_typeflag(flag: u8) -> Self {
        match flag {
            REGTYPE | AREGTYPE | CONTTYPE => Self::Regular,
            DIRTYPE => Self::Directory,
            LNKTYPE => Self::Link,
            SYMTYPE => Self::Symlink,
            CHRTYPE | BLKTYPE => Self::Device,
            FIFOTYPE => Self::Fifo,
            GNU_LONGNAME | GNU_LONGLINK => Self::LongName,
            other => Self::Other(other),
        }
    }
}

/// Parse an octal field.
///
/// Spaces are skipped, a NUL ends the field and any other non-octal byte stops
/// parsing with the value accumulated so far. Never fails.
pub fn parse_octal(field: &[u8]) -> u64 {
    let mut result = 0u64;
    for &c in field {
        match c {
            b' ' => continue,
            0 => break,
            b'0'..=b'7' => result = result.wrapping_mul(8).wrapping_add(u64::from(c - b'0')),
            _ => return result,
        }
    }
    result
}

/// Whether `c` separates path components in an archive path.
pub fn is_separator(c: u8) -> bool {
    c == b'/' || c == b'\\'
}
