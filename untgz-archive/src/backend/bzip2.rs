//! Bzip2 backend.

use super::read_full;
use bzip2::read::BzDecoder;
use std::io::Read;
use untgz_core::error::{Result, UntgzError};
use untgz_core::{BLOCK_SIZE, Backend};

/// Backend for bzip2-compressed archives.
pub struct Bzip2Backend<R: Read> {
    decoder: Option<BzDecoder<R>>,
}

impl<R: Read> Bzip2Backend<R> {
    /// Wrap `stream` in a bzip2 decompressor.
    pub fn new(stream: R) -> Result<Self> {
        Ok(Self {
            decoder: Some(BzDecoder::new(stream)),
        })
    }
}

impl<R: Read> Backend for Bzip2Backend<R> {
    fn name(&self) -> &'static str {
        "bzip2"
    }

    fn read_block(&mut self, block: &mut [u8; BLOCK_SIZE]) -> Result<usize> {
        let decoder = self
            .decoder
            .as_mut()
            .ok_or_else(|| UntgzError::decompress("bzip2", "backend already released"))?;
        read_full(decoder, block).map_err(|e| UntgzError::decompress("bzip2", e))
    }

    fn cleanup(&mut self) {
        if let Some(decoder) = self.decoder.take() {
            tracing::trace!(total_out = decoder.total_out(), "bzip2 backend released");
        }
    }

    fn is_released(&self) -> bool {
        self.decoder.is_none()
    }
}

impl<R: Read> Drop for Bzip2Backend<R> {
    fn drop(&mut self) {
        self.cleanup();
    }
}
