//! Range decoder for LZMA decompression.
//!
//! The range coder is an entropy coding method similar to arithmetic coding.
//! LZMA uses a specific variant with:
//! - 32-bit range tracking
//! - Normalization when range drops below 2^24
//! - 11-bit probability model (2048 = 50%)
//!
//! The decoder is byte oriented: it pulls compressed bytes one at a time from
//! a [`ChunkedInput`], which refills itself from the wrapped stream in 32 KB
//! chunks.

use std::io::{ErrorKind, Read};
use untgz_core::error::{Result, UntgzError};

/// Number of bits in probability model.
pub const PROB_BITS: u32 = 11;

/// Probability representing 50%.
pub const PROB_INIT: u16 = 1 << (PROB_BITS - 1);

/// Maximum probability value.
pub const PROB_MAX: u16 = 1 << PROB_BITS;

/// Number of bits to shift for probability update.
pub const MOVE_BITS: u32 = 5;

/// Size of the compressed-input chunk buffer.
pub const INPUT_CHUNK_SIZE: usize = 1 << 15;

/// Top value for range normalization.
const TOP_VALUE: u32 = 1 << 24;

/// Compressed input pulled from a stream through a fixed chunk buffer.
pub struct ChunkedInput<R: Read> {
    reader: R,
    chunk: Box<[u8]>,
    pos: usize,
    len: usize,
}

impl<R: Read> ChunkedInput<R> {
    /// Wrap a stream.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            chunk: vec![0u8; INPUT_CHUNK_SIZE].into_boxed_slice(),
            pos: 0,
            len: 0,
        }
    }

    fn refill(&mut self) -> Result<usize> {
        loop {
            match self.reader.read(&mut self.chunk) {
                Ok(n) => {
                    self.pos = 0;
                    self.len = n;
                    return Ok(n);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Next compressed byte. Running out of input is an error.
    pub fn next_byte(&mut self) -> Result<u8> {
        if self.pos == self.len && self.refill()? == 0 {
            return Err(UntgzError::unexpected_eof(1));
        }
        let byte = self.chunk[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    /// Fill `buf` completely.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let total = buf.len();
        for (i, slot) in buf.iter_mut().enumerate() {
            *slot = self
                .next_byte()
                .map_err(|_| UntgzError::unexpected_eof(total - i))?;
        }
        Ok(())
    }
}

/// Range decoder for LZMA decompression.
pub struct RangeDecoder<R: Read> {
    input: ChunkedInput<R>,
    range: u32,
    code: u32,
}

impl<R: Read> RangeDecoder<R> {
    /// Start decoding: consumes the 5 initialisation bytes.
    pub fn new(mut input: ChunkedInput<R>) -> Result<Self> {
        let mut init = [0u8; 5];
        input.read_exact(&mut init)?;

        if init[0] != 0x00 {
            return Err(UntgzError::corrupted(0, "Invalid LZMA stream start byte"));
        }

        let code = u32::from_be_bytes([init[1], init[2], init[3], init[4]]);

        Ok(Self {
            input,
            range: 0xFFFF_FFFF,
            code,
        })
    }

    /// Normalize the range (refill when range gets small).
    fn normalize(&mut self) -> Result<()> {
        if self.range < TOP_VALUE {
            let byte = self.input.next_byte()?;
            self.range <<= 8;
            self.code = (self.code << 8) | byte as u32;
        }
        Ok(())
    }

    /// Decode a single bit with the given probability.
    pub fn decode_bit(&mut self, prob: &mut u16) -> Result<u32> {
        self.normalize()?;

        let bound = (self.range >> PROB_BITS) * (*prob as u32);

        if self.code < bound {
            self.range = bound;
            *prob += (PROB_MAX - *prob) >> MOVE_BITS;
            Ok(0)
        } else {
            self.range -= bound;
            self.code -= bound;
            *prob -= *prob >> MOVE_BITS;
            Ok(1)
        }
    }

    /// Decode multiple bits with fixed 50% probability, most significant first.
    pub fn decode_direct_bits(&mut self, count: u32) -> Result<u32> {
        let mut result = 0u32;
        for _ in 0..count {
            self.normalize()?;
            self.range >>= 1;
            self.code = self.code.wrapping_sub(self.range);
            let bit = if (self.code as i32) < 0 {
                self.code = self.code.wrapping_add(self.range);
                0
            } else {
                1
            };
            result = (result << 1) | bit;
        }
        Ok(result)
    }

    /// Decode a bit tree (normal order).
    pub fn decode_bit_tree(&mut self, probs: &mut [u16], num_bits: u32) -> Result<u32> {
        let mut index = 1usize;

        for _ in 0..num_bits {
            let bit = self.decode_bit(&mut probs[index])?;
            index = (index << 1) | bit as usize;
        }

        Ok((index as u32) - (1 << num_bits))
    }

    /// Decode a bit tree (reverse order).
    pub fn decode_bit_tree_reverse(&mut self, probs: &mut [u16], num_bits: u32) -> Result<u32> {
        let mut result = 0u32;
        let mut index = 1usize;

        for i in 0..num_bits {
            let bit = self.decode_bit(&mut probs[index])?;
            index = (index << 1) | bit as usize;
            result |= bit << i;
        }

        Ok(result)
    }

    /// Check if decoding finished on a clean boundary.
    pub fn is_finished_ok(&self) -> bool {
        self.code == 0
    }
}
