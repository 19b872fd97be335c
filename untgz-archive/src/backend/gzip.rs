//! Passthrough / gzip backend.
//!
//! Looks at the first two bytes of the stream: gzip framing (`1F 8B`) is
//! decoded with [`flate2::read::MultiGzDecoder`], so concatenated members are
//! read as one stream; anything else is passed through untouched. This makes
//! the same backend serve both plain `.tar` and `.tar.gz` input.

use super::{Replay, peek, read_full};
use flate2::read::MultiGzDecoder;
use std::io::Read;
use untgz_core::error::{Result, UntgzError};
use untgz_core::{BLOCK_SIZE, Backend};

const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

enum Source<R: Read> {
    Gzip(Box<MultiGzDecoder<Replay<R>>>),
    Raw(Replay<R>),
}

impl<R: Read> Read for Source<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Self::Gzip(decoder) => decoder.read(buf),
            Self::Raw(reader) => reader.read(buf),
        }
    }
}

/// Backend for uncompressed and gzip-compressed archives.
pub struct GzipBackend<R: Read> {
    source: Option<Source<R>>,
    gzip: bool,
}

impl<R: Read> GzipBackend<R> {
    /// Open `stream`, detecting gzip framing from its first bytes.
    pub fn new(stream: R) -> Result<Self> {
        let (replay, head) = peek(stream, GZIP_MAGIC.len());
        let head = head.map_err(|e| UntgzError::backend_init("gzip", e))?;

        let gzip = head == GZIP_MAGIC;
        let source = if gzip {
            Source::Gzip(Box::new(MultiGzDecoder::new(replay)))
        } else {
            Source::Raw(replay)
        };

        Ok(Self {
            source: Some(source),
            gzip,
        })
    }

    /// Whether the stream carries gzip framing.
    pub fn is_gzip(&self) -> bool {
        self.gzip
    }
}

impl<R: Read> Backend for GzipBackend<R> {
    fn name(&self) -> &'static str {
        "gzip"
    }

    fn read_block(&mut self, block: &mut [u8; BLOCK_SIZE]) -> Result<usize> {
        let source = self
            .source
            .as_mut()
            .ok_or_else(|| UntgzError::decompress("gzip", "backend already released"))?;
        read_full(source, block).map_err(|e| UntgzError::decompress("gzip", e))
    }

    fn cleanup(&mut self) {
        if self.source.take().is_some() {
            tracing::trace!(gzip = self.gzip, "gzip backend released");
        }
    }

    fn is_released(&self) -> bool {
        self.source.is_none()
    }
}

impl<R: Read> Drop for GzipBackend<R> {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::{Cursor, Write};

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_passthrough() {
        let data: Vec<u8> = (0..1024u32).map(|i| (i % 251) as u8).collect();
        let mut backend = GzipBackend::new(Cursor::new(data.clone())).unwrap();
        assert!(!backend.is_gzip());

        let mut block = [0u8; BLOCK_SIZE];
        assert_eq!(backend.read_block(&mut block).unwrap(), BLOCK_SIZE);
        assert_eq!(&block[..], &data[..BLOCK_SIZE]);
        assert_eq!(backend.read_block(&mut block).unwrap(), BLOCK_SIZE);
        assert_eq!(&block[..], &data[BLOCK_SIZE..]);
        assert_eq!(backend.read_block(&mut block).unwrap(), 0);
    }

    #[test]
    fn test_gzip_stream() {
        let data = vec![0x42u8; 3 * BLOCK_SIZE];
        let mut backend = GzipBackend::new(Cursor::new(gzip(&data))).unwrap();
        assert!(backend.is_gzip());

        let mut block = [0u8; BLOCK_SIZE];
        for _ in 0..3 {
            assert_eq!(backend.read_block(&mut block).unwrap(), BLOCK_SIZE);
            assert!(block.iter().all(|&b| b == 0x42));
        }
        assert_eq!(backend.read_block(&mut block).unwrap(), 0);
    }

    #[test]
    fn test_concatenated_members() {
        let mut stream = gzip(&[1u8; BLOCK_SIZE]);
        stream.extend(gzip(&[2u8; BLOCK_SIZE]));
        let mut backend = GzipBackend::new(Cursor::new(stream)).unwrap();

        let mut block = [0u8; BLOCK_SIZE];
        backend.read_block(&mut block).unwrap();
        assert!(block.iter().all(|&b| b == 1));
        backend.read_block(&mut block).unwrap();
        assert!(block.iter().all(|&b| b == 2));
    }

    #[test]
    fn test_short_stream() {
        let mut backend = GzipBackend::new(Cursor::new(vec![7u8; 100])).unwrap();
        let mut block = [0u8; BLOCK_SIZE];
        assert_eq!(backend.read_block(&mut block).unwrap(), 100);
    }

    #[test]
    fn test_corrupt_gzip() {
        let mut stream = gzip(&[0u8; 4 * BLOCK_SIZE]);
        let mid = stream.len() / 2;
        stream[mid..].iter_mut().for_each(|b| *b = 0xFF);
        let mut backend = GzipBackend::new(Cursor::new(stream)).unwrap();

        let mut block = [0u8; BLOCK_SIZE];
        let mut failed = false;
        for _ in 0..5 {
            match backend.read_block(&mut block) {
                Ok(BLOCK_SIZE) => continue,
                Ok(_) => break,
                Err(e) => {
                    assert!(matches!(e, UntgzError::Decompress { .. }));
                    failed = true;
                    break;
                }
            }
        }
        assert!(failed);
    }

    #[test]
    fn test_cleanup_idempotent() {
        let mut backend = GzipBackend::new(Cursor::new(vec![0u8; 10])).unwrap();
        assert!(!backend.is_released());
        backend.cleanup();
        assert!(backend.is_released());
        backend.cleanup();
        assert!(backend.is_released());

        let mut block = [0u8; BLOCK_SIZE];
        assert!(backend.read_block(&mut block).is_err());
    }
}
