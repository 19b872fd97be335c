//! GNU long-name records.
//!
//! A `L` (long name) or `K` (long link) header is followed by one data block
//! holding a NUL-terminated path. That path replaces the name of the header
//! that comes next. Both typeflags are staged the same way.

use super::header::HeaderBlock;
use crate::block::BlockReader;
use untgz_core::error::{Result, UntgzError};
use untgz_core::{BLOCK_SIZE, Backend};

/// A long name waiting for the header it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLongName(String);

impl PendingLongName {
    /// The staged path.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the staged path.
    pub fn into_string(self) -> String {
        self.0
    }
}

/// Reject a declared payload size that cannot fit in the single block read.
pub fn check_declared_size(size: u64) -> Result<()> {
    if size >= BLOCK_SIZE as u64 {
        return Err(UntgzError::InvalidLongName {
            size,
            name_len: 0,
        });
    }
    Ok(())
}

/// Extract the path from a long-name payload block.
///
/// The path ends at the first NUL, or at the last byte of the block which is
/// always treated as a terminator. A path longer than the declared size is
/// rejected.
pub fn decode_long_name(size: u64, payload: &HeaderBlock) -> Result<PendingLongName> {
    check_declared_size(size)?;

    let text = &payload[..BLOCK_SIZE - 1];
    let len = text.iter().position(|&b| b == 0).unwrap_or(text.len());
    if len as u64 > size {
        return Err(UntgzError::InvalidLongName {
            size,
            name_len: len,
        });
    }

    Ok(PendingLongName(
        String::from_utf8_lossy(&text[..len]).into_owned(),
    ))
}

/// Read the payload block of a long-name record whose header declared `size`.
pub fn read_long_name<B: Backend>(
    reader: &mut BlockReader<B>,
    size: u64,
) -> Result<PendingLongName> {
    check_declared_size(size)?;
    let payload = reader.read_block()?;
    let name = decode_long_name(size, payload)?;
    tracing::debug!(name = name.as_str(), size, "staged GNU long name");
    Ok(name)
}
