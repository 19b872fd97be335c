//! Header record decoding and validation.
//!
//! Field layout (offsets in bytes):
//!
//! ```text
//! name      0  100    mode    100  8    uid   108  8    gid   116  8
//! size    124   12    mtime   136 12    chksum 148 8    typeflag 156 1
//! linkname 157 100    magic   257  6    version 263 2
//! uname   265   32    gname   297 32    devmajor 329 8  devminor 337 8
//! prefix  345  155
//! ```
//!
//! Text fields are NUL padded but a field that fills its width carries no
//! terminator, so every copy is capped at the field width.

use super::{is_separator, parse_octal};
use untgz_core::BLOCK_SIZE;
use untgz_core::error::{Result, UntgzError};

/// One raw header record.
pub type HeaderBlock = [u8; BLOCK_SIZE];

/// Byte range of each header field.
pub mod field {
    use std::ops::Range;

    /// Entry name.
    pub const NAME: Range<usize> = 0..100;
    /// Permission bits.
    pub const MODE: Range<usize> = 100..108;
    /// Owner id.
    pub const UID: Range<usize> = 108..116;
    /// Group id.
    pub const GID: Range<usize> = 116..124;
    /// Payload size.
    pub const SIZE: Range<usize> = 124..136;
    /// Modification time, seconds since the epoch.
    pub const MTIME: Range<usize> = 136..148;
    /// Header checksum.
    pub const CHKSUM: Range<usize> = 148..156;
    /// Entry type.
    pub const TYPEFLAG: usize = 156;
    /// Link target.
    pub const LINKNAME: Range<usize> = 157..257;
    /// Format magic.
    pub const MAGIC: Range<usize> = 257..263;
    /// Format version.
    pub const VERSION: Range<usize> = 263..265;
    /// Owner name.
    pub const UNAME: Range<usize> = 265..297;
    /// Group name.
    pub const GNAME: Range<usize> = 297..329;
    /// Device major number.
    pub const DEVMAJOR: Range<usize> = 329..337;
    /// Device minor number.
    pub const DEVMINOR: Range<usize> = 337..345;
    /// Path prefix for names longer than the name field.
    pub const PREFIX: Range<usize> = 345..500;
}

/// Bytes of `field` up to its first NUL, or all of it.
fn field_bytes(field: &[u8]) -> &[u8] {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    &field[..end]
}

fn field_string(field: &[u8]) -> String {
    String::from_utf8_lossy(field_bytes(field)).into_owned()
}

/// Decoded header record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveHeader {
    /// Entry name, at most 100 bytes.
    pub name: String,
    /// Permission bits.
    pub mode: u64,
    /// Owner id.
    pub uid: u64,
    /// Group id.
    pub gid: u64,
    /// Payload size in bytes.
    pub size: u64,
    /// Modification time, seconds since the epoch.
    pub mtime: u64,
    /// Stored checksum.
    pub checksum: u64,
    /// Raw typeflag byte.
    pub typeflag: u8,
    /// Link target.
    pub linkname: String,
    /// Magic field, raw.
    pub magic: [u8; 6],
    /// Version field, raw.
    pub version: [u8; 2],
    /// Owner name.
    pub uname: String,
    /// Group name.
    pub gname: String,
    /// Device major number.
    pub devmajor: u64,
    /// Device minor number.
    pub devminor: u64,
    /// Path prefix, at most 155 bytes.
    pub prefix: String,
}

impl ArchiveHeader {
    /// Decode every field of a header record. Never fails: malformed numeric
    /// fields yield whatever prefix of digits they contain.
    pub fn parse(block: &HeaderBlock) -> Self {
        let mut magic = [0u8; 6];
        magic.copy_from_slice(&block[field::MAGIC]);
        let mut version = [0u8; 2];
        version.copy_from_slice(&block[field::VERSION]);

        Self {
            name: field_string(&block[field::NAME]),
            mode: parse_octal(&block[field::MODE]),
            uid: parse_octal(&block[field::UID]),
            gid: parse_octal(&block[field::GID]),
            size: parse_octal(&block[field::SIZE]),
            mtime: parse_octal(&block[field::MTIME]),
            checksum: parse_octal(&block[field::CHKSUM]),
            typeflag: block[field::TYPEFLAG],
            linkname: field_string(&block[field::LINKNAME]),
            magic,
            version,
            uname: field_string(&block[field::UNAME]),
            gname: field_string(&block[field::GNAME]),
            devmajor: parse_octal(&block[field::DEVMAJOR]),
            devminor: parse_octal(&block[field::DEVMINOR]),
            prefix: field_string(&block[field::PREFIX]),
        }
    }
}

/// Whether `block` marks the end of the archive: its name starts with NUL.
pub fn is_end_of_archive(block: &HeaderBlock) -> bool {
    block[0] == 0
}

/// Unsigned and signed byte sums of `block`, the checksum field counted as
/// eight spaces.
pub fn checksum_sums(block: &HeaderBlock) -> (u64, i64) {
    let mut unsigned = 0u64;
    let mut signed = 0i64;
    for (i, &byte) in block.iter().enumerate() {
        let value = if field::CHKSUM.contains(&i) { b' ' } else { byte };
        unsigned += u64::from(value);
        signed += i64::from(value as i8);
    }
    (unsigned, signed)
}

/// Whether the stored checksum matches the unsigned or the signed byte sum.
pub fn valid_checksum(block: &HeaderBlock) -> bool {
    verify_checksum(block).is_ok()
}

/// Like [`valid_checksum`], reporting the sums on failure.
pub fn verify_checksum(block: &HeaderBlock) -> Result<()> {
    let stored = parse_octal(&block[field::CHKSUM]);
    let (unsigned, signed) = checksum_sums(block);
    if stored == unsigned || stored as i64 == signed {
        Ok(())
    } else {
        Err(UntgzError::ChecksumMismatch {
            stored,
            unsigned,
            signed,
        })
    }
}

/// Path of the entry: `prefix/name` when the prefix is present, else `name`.
///
/// A prefix counts as present when its first byte is neither NUL nor a space.
/// A separator is inserted unless the prefix already ends with one.
pub fn full_path(block: &HeaderBlock) -> String {
    let prefix = &block[field::PREFIX];
    let name = field_bytes(&block[field::NAME]);

    let mut path = Vec::with_capacity(field::PREFIX.len() + 1 + name.len());
    if prefix[0] != 0 && prefix[0] != b' ' {
        let prefix = field_bytes(prefix);
        path.extend_from_slice(prefix);
        if !prefix.last().is_some_and(|&c| is_separator(c)) {
            path.push(b'/');
        }
    }
    path.extend_from_slice(name);

    String::from_utf8_lossy(&path).into_owned()
}
