//! # untgz LZMA
//!
//! Streaming decoder for `.lzma` (LZMA_alone) streams, the container produced
//! by `lzma` and `xz --format=lzma`.
//!
//! ## Usage
//!
//! ```ignore
//! use untgz_lzma::LzmaDecoder;
//!
//! let mut decoder = LzmaDecoder::new(std::fs::File::open("archive.tar.lzma")?)?;
//! let mut block = [0u8; 512];
//! let n = decoder.read(&mut block)?;
//! ```
//!
//! ## LZMA Format
//!
//! An LZMA stream consists of:
//! 1. Properties byte (lc, lp, pb encoded)
//! 2. Dictionary size (4 bytes, little-endian)
//! 3. Uncompressed size (8 bytes, little-endian, 0xFFFFFFFFFFFFFFFF = unknown)
//! 4. Range-coded data, optionally closed by an end-of-stream marker
//!
//! Output is produced incrementally: the decoder never holds more than its
//! history window and a 32 KB chunk of compressed input.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod decoder;
pub mod header;
pub mod model;
pub mod range_coder;

// Re-exports
pub use decoder::LzmaDecoder;
pub use header::{HEADER_SIZE, LzmaHeader};
pub use model::{LzmaModel, LzmaProperties, State};
pub use range_coder::{ChunkedInput, RangeDecoder};
