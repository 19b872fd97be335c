//! Decoding `.lzma` streams produced by liblzma.

use std::error::Error;
use std::io::{Cursor, Write};
use untgz_core::UntgzError;
use untgz_lzma::{HEADER_SIZE, LzmaDecoder};
use xz2::stream::{LzmaOptions, Stream};
use xz2::write::XzEncoder;

fn encode(data: &[u8]) -> Result<Vec<u8>, Box<dyn Error>> {
    let options = LzmaOptions::new_preset(6)?;
    let stream = Stream::new_lzma_encoder(&options)?;
    let mut encoder = XzEncoder::new_stream(Vec::new(), stream);
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Decode a whole stream, stopping at the declared size when there is one.
fn decompress_bytes(data: &[u8]) -> untgz_core::Result<Vec<u8>> {
    let mut decoder = LzmaDecoder::new(Cursor::new(data))?;
    let declared = decoder.header().uncompressed_size;
    let mut output = Vec::new();
    let mut chunk = vec![0u8; 1 << 16];

    loop {
        let want = match declared {
            Some(size) if size == output.len() as u64 => break,
            Some(size) => (size - output.len() as u64).min(chunk.len() as u64) as usize,
            None => chunk.len(),
        };
        let n = decoder.read(&mut chunk[..want])?;
        if n == 0 {
            if let Some(size) = declared {
                return Err(UntgzError::PrematureEnd {
                    remaining: size - output.len() as u64,
                });
            }
            break;
        }
        output.extend_from_slice(&chunk[..n]);
    }
    Ok(output)
}

/// Text with long-range repeats mixed with noise.
fn sample(len: usize) -> Vec<u8> {
    let phrases: [&[u8]; 4] = [
        b"the quick brown fox jumps over the lazy dog\n",
        b"pack my box with five dozen liquor jugs\n",
        b"0123456789abcdef",
        b"\x00\x00\x00\x00\x00\x00\x00\x00",
    ];
    let mut seed = 0x2545_F491u32;
    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        if seed >> 28 < 3 {
            out.push((seed >> 16) as u8);
        } else {
            out.extend_from_slice(phrases[(seed >> 8) as usize % phrases.len()]);
        }
    }
    out.truncate(len);
    out
}

#[test]
fn test_unknown_size_with_end_marker() -> Result<(), Box<dyn Error>> {
    let original = sample(200_000);
    let compressed = encode(&original)?;
    assert_eq!(&compressed[5..HEADER_SIZE], &[0xFF; 8]);

    let decoded = decompress_bytes(&compressed)?;
    assert_eq!(decoded, original);
    Ok(())
}

#[test]
fn test_known_size_header() -> Result<(), Box<dyn Error>> {
    let original = sample(70_000);
    let mut compressed = encode(&original)?;
    compressed[5..HEADER_SIZE].copy_from_slice(&(original.len() as u64).to_le_bytes());

    let decoded = decompress_bytes(&compressed)?;
    assert_eq!(decoded, original);
    Ok(())
}

#[test]
fn test_block_sized_reads() -> Result<(), Box<dyn Error>> {
    let original = sample(10_000);
    let compressed = encode(&original)?;

    let mut decoder = LzmaDecoder::new(Cursor::new(compressed))?;
    let mut decoded = Vec::new();
    let mut block = [0u8; 512];
    loop {
        let n = decoder.read(&mut block)?;
        if n == 0 {
            break;
        }
        decoded.extend_from_slice(&block[..n]);
    }

    assert!(decoder.saw_end_marker());
    assert_eq!(decoder.total_out(), original.len() as u64);
    assert_eq!(decoded, original);
    Ok(())
}

#[test]
fn test_empty_payload() -> Result<(), Box<dyn Error>> {
    let compressed = encode(b"")?;
    assert!(decompress_bytes(&compressed)?.is_empty());
    Ok(())
}

#[test]
fn test_truncated_stream() -> Result<(), Box<dyn Error>> {
    let original = sample(50_000);
    let compressed = encode(&original)?;
    let truncated = &compressed[..compressed.len() / 2];

    assert!(decompress_bytes(truncated).is_err());
    Ok(())
}

#[test]
fn test_declared_size_longer_than_stream() -> Result<(), Box<dyn Error>> {
    let original = sample(4_000);
    let mut compressed = encode(&original)?;
    compressed[5..HEADER_SIZE].copy_from_slice(&(original.len() as u64 + 100).to_le_bytes());

    assert!(matches!(
        decompress_bytes(&compressed),
        Err(UntgzError::PrematureEnd { remaining: 100 })
    ));
    Ok(())
}

#[test]
fn test_zero_declared_size() -> Result<(), Box<dyn Error>> {
    let mut data = vec![0x5D, 0x00, 0x00, 0x01, 0x00];
    data.extend_from_slice(&0u64.to_le_bytes());
    data.extend_from_slice(&[0u8; 5]);
    assert!(decompress_bytes(&data)?.is_empty());
    Ok(())
}

#[test]
fn test_empty_input() {
    assert!(matches!(
        LzmaDecoder::new(Cursor::new(Vec::new())),
        Err(UntgzError::UnexpectedEof { .. })
    ));
}
