//! LZMA adapter backend.
//!
//! Drives the streaming [`LzmaDecoder`] one block at a time. When the
//! container declares its uncompressed size, reads are clamped to what is
//! left and running dry early is an error; when the size is unknown, the
//! decoder's end-of-stream marker ends the archive.

use std::io::Read;
use untgz_core::error::{Result, UntgzError};
use untgz_core::{BLOCK_SIZE, Backend};
use untgz_lzma::LzmaDecoder;

/// Backend for `.lzma` compressed archives.
pub struct LzmaBackend<R: Read> {
    decoder: Option<LzmaDecoder<R>>,
    remaining: u64,
    wait_end_marker: bool,
}

impl<R: Read> LzmaBackend<R> {
    /// Read the container header from `stream` and allocate decoder state.
    pub fn new(stream: R) -> Result<Self> {
        let decoder = LzmaDecoder::new(stream).map_err(|e| match e {
            UntgzError::InvalidHeader { .. } => {
                UntgzError::backend_init("lzma", format!("Incorrect stream properties ({e})"))
            }
            other => UntgzError::backend_init("lzma", other),
        })?;

        let declared = decoder.header().uncompressed_size;
        Ok(Self {
            decoder: Some(decoder),
            remaining: declared.unwrap_or(0),
            wait_end_marker: declared.is_none(),
        })
    }

    /// Bytes still owed by the stream when its size is declared.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Whether the stream is terminated by an end marker instead of a size.
    pub fn waits_for_end_marker(&self) -> bool {
        self.wait_end_marker
    }
}

impl<R: Read> Backend for LzmaBackend<R> {
    fn name(&self) -> &'static str {
        "lzma"
    }

    fn read_block(&mut self, block: &mut [u8; BLOCK_SIZE]) -> Result<usize> {
        let decoder = self
            .decoder
            .as_mut()
            .ok_or_else(|| UntgzError::decompress("lzma", "backend already released"))?;

        let want = if self.wait_end_marker {
            BLOCK_SIZE
        } else {
            self.remaining.min(BLOCK_SIZE as u64) as usize
        };

        let mut produced = 0;
        while produced < want {
            let n = decoder
                .read(&mut block[produced..want])
                .map_err(|e| UntgzError::decompress("lzma", format!("Decoding error ({e})")))?;
            if n == 0 {
                break;
            }
            produced += n;
        }

        if !self.wait_end_marker {
            self.remaining -= produced as u64;
        }

        if produced == 0 && !self.wait_end_marker && self.remaining != 0 {
            return Err(UntgzError::PrematureEnd {
                remaining: self.remaining,
            });
        }

        Ok(produced)
    }

    fn cleanup(&mut self) {
        if let Some(decoder) = self.decoder.take() {
            tracing::trace!(total_out = decoder.total_out(), "lzma backend released");
        }
    }

    fn is_released(&self) -> bool {
        self.decoder.is_none()
    }
}

impl<R: Read> Drop for LzmaBackend<R> {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use xz2::stream::{LzmaOptions, Stream};
    use xz2::write::XzEncoder;

    fn lzma_alone(data: &[u8]) -> Vec<u8> {
        let options = LzmaOptions::new_preset(6).unwrap();
        let stream = Stream::new_lzma_encoder(&options).unwrap();
        let mut encoder = XzEncoder::new_stream(Vec::new(), stream);
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn with_declared_size(mut stream: Vec<u8>, size: u64) -> Vec<u8> {
        stream[5..13].copy_from_slice(&size.to_le_bytes());
        stream
    }

    #[test]
    fn test_unknown_size_ends_cleanly() {
        let data: Vec<u8> = (0..3 * BLOCK_SIZE).map(|i| (i / 3) as u8).collect();
        let mut backend = LzmaBackend::new(Cursor::new(lzma_alone(&data))).unwrap();
        assert!(backend.waits_for_end_marker());

        let mut block = [0u8; BLOCK_SIZE];
        for chunk in data.chunks(BLOCK_SIZE) {
            assert_eq!(backend.read_block(&mut block).unwrap(), BLOCK_SIZE);
            assert_eq!(&block[..], chunk);
        }
        assert_eq!(backend.read_block(&mut block).unwrap(), 0);
        assert_eq!(backend.read_block(&mut block).unwrap(), 0);
    }

    #[test]
    fn test_known_size_clamps_reads() {
        let data = vec![9u8; BLOCK_SIZE + 100];
        let stream = with_declared_size(lzma_alone(&data), data.len() as u64);
        let mut backend = LzmaBackend::new(Cursor::new(stream)).unwrap();
        assert!(!backend.waits_for_end_marker());
        assert_eq!(backend.remaining(), (BLOCK_SIZE + 100) as u64);

        let mut block = [0u8; BLOCK_SIZE];
        assert_eq!(backend.read_block(&mut block).unwrap(), BLOCK_SIZE);
        assert_eq!(backend.read_block(&mut block).unwrap(), 100);
        assert_eq!(backend.remaining(), 0);
        assert_eq!(backend.read_block(&mut block).unwrap(), 0);
    }

    #[test]
    fn test_known_size_premature_end() {
        let data = vec![1u8; 200];
        let stream = with_declared_size(lzma_alone(&data), 1000);
        let mut backend = LzmaBackend::new(Cursor::new(stream)).unwrap();

        let mut block = [0u8; BLOCK_SIZE];
        assert_eq!(backend.read_block(&mut block).unwrap(), 200);
        assert!(matches!(
            backend.read_block(&mut block),
            Err(UntgzError::PrematureEnd { remaining: 800 })
        ));
    }

    #[test]
    fn test_bad_properties() {
        let mut stream = vec![0xFFu8];
        stream.extend_from_slice(&[0u8; 17]);
        assert!(matches!(
            LzmaBackend::new(Cursor::new(stream)),
            Err(UntgzError::BackendInit { backend: "lzma", .. })
        ));
    }
}
