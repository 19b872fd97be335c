//! The 13-byte `.lzma` container header.
//!
//! ```text
//! offset  size  field
//! 0       1     properties byte ((pb * 5 + lp) * 9 + lc)
//! 1       4     dictionary size, little-endian
//! 5       8     uncompressed size, little-endian; all ones = unknown
//! ```

use crate::decoder::DICT_SIZE_MIN;
use crate::model::LzmaProperties;
use crate::range_coder::ChunkedInput;
use std::io::Read;
use untgz_core::error::{Result, UntgzError};

/// Size of the container header in bytes.
pub const HEADER_SIZE: usize = 13;

/// Parsed container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LzmaHeader {
    /// Literal/position properties.
    pub props: LzmaProperties,
    /// Dictionary size requested by the encoder.
    pub dict_size: u32,
    /// Declared uncompressed size, `None` when the stream ends with a marker.
    pub uncompressed_size: Option<u64>,
}

impl LzmaHeader {
    /// Parse header bytes.
    pub fn parse(bytes: &[u8; HEADER_SIZE]) -> Result<Self> {
        let props = LzmaProperties::from_byte(bytes[0]).ok_or_else(|| {
            UntgzError::invalid_header(format!("Invalid LZMA properties byte: {}", bytes[0]))
        })?;

        let dict_size = u32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);

        let mut size = [0u8; 8];
        size.copy_from_slice(&bytes[5..HEADER_SIZE]);
        let size = u64::from_le_bytes(size);
        let uncompressed_size = (size != u64::MAX).then_some(size);

        Ok(Self {
            props,
            dict_size,
            uncompressed_size,
        })
    }

    /// Read and parse the header from a stream.
    pub fn read<R: Read>(input: &mut ChunkedInput<R>) -> Result<Self> {
        let mut bytes = [0u8; HEADER_SIZE];
        input.read_exact(&mut bytes)?;
        Self::parse(&bytes)
    }

    /// Bytes to reserve for the history window.
    ///
    /// At least [`DICT_SIZE_MIN`]; never more than the declared output when the
    /// output size is known, since no match can reach further back than that.
    pub fn dictionary_capacity(&self) -> usize {
        let floor = DICT_SIZE_MIN as usize;
        let dict = (self.dict_size as usize).max(floor);
        match self.uncompressed_size {
            Some(size) => dict.min(usize::try_from(size).unwrap_or(usize::MAX).max(floor)),
            None => dict,
        }
    }
}
