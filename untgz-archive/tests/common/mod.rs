//! Archive builders shared by the integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use untgz_archive::{ExtractOptions, ExtractStats, extract_stream};
use untgz_core::{BLOCK_SIZE, Result};

/// Modification time stamped on entries unless a test says otherwise.
pub const DEFAULT_MTIME: u64 = 1_600_000_000;

/// Builds ustar archives in memory.
#[derive(Default)]
pub struct TarBuilder {
    data: Vec<u8>,
}

impl TarBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(self, name: &str, contents: &[u8]) -> Self {
        self.entry(name, "", b'0', contents, DEFAULT_MTIME)
    }

    pub fn file_with_mtime(self, name: &str, contents: &[u8], mtime: u64) -> Self {
        self.entry(name, "", b'0', contents, mtime)
    }

    pub fn dir(self, name: &str) -> Self {
        self.entry(name, "", b'5', &[], DEFAULT_MTIME)
    }

    /// A GNU `L` record followed by a regular entry carrying a truncated name.
    pub fn long_file(self, name: &str, contents: &[u8]) -> Self {
        let mut payload = name.as_bytes().to_vec();
        payload.push(0);
        let short = &name[..name.len().min(99)];
        self.entry("././@LongLink", "", b'L', &payload, 0)
            .entry(short, "", b'0', contents, DEFAULT_MTIME)
    }

    pub fn entry(
        mut self,
        name: &str,
        prefix: &str,
        typeflag: u8,
        contents: &[u8],
        mtime: u64,
    ) -> Self {
        self.data
            .extend_from_slice(&header(name, prefix, typeflag, contents.len() as u64, mtime));
        self.data.extend_from_slice(contents);
        pad(&mut self.data);
        self
    }

    /// Append bytes verbatim.
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.data.extend_from_slice(bytes);
        self
    }

    /// Archive without the end-of-archive blocks.
    pub fn unterminated(self) -> Vec<u8> {
        self.data
    }

    /// Archive followed by two zero blocks.
    pub fn finish(mut self) -> Vec<u8> {
        self.data.resize(self.data.len() + 2 * BLOCK_SIZE, 0);
        self.data
    }
}

fn pad(data: &mut Vec<u8>) {
    let rem = data.len() % BLOCK_SIZE;
    if rem != 0 {
        data.resize(data.len() + BLOCK_SIZE - rem, 0);
    }
}

fn put(block: &mut [u8], offset: usize, width: usize, value: &[u8]) {
    let len = value.len().min(width);
    block[offset..offset + len].copy_from_slice(&value[..len]);
}

/// One header block with a valid checksum.
pub fn header(name: &str, prefix: &str, typeflag: u8, size: u64, mtime: u64) -> [u8; BLOCK_SIZE] {
    let mut block = [0u8; BLOCK_SIZE];
    put(&mut block, 0, 100, name.as_bytes());
    put(&mut block, 100, 8, b"0000644\0");
    put(&mut block, 108, 8, b"0001750\0");
    put(&mut block, 116, 8, b"0001750\0");
    put(&mut block, 124, 12, format!("{:011o}\0", size).as_bytes());
    put(&mut block, 136, 12, format!("{:011o}\0", mtime).as_bytes());
    block[156] = typeflag;
    put(&mut block, 257, 6, b"ustar\0");
    put(&mut block, 263, 2, b"00");
    put(&mut block, 265, 32, b"builder");
    put(&mut block, 297, 32, b"builder");
    put(&mut block, 345, 155, prefix.as_bytes());

    block[148..156].fill(b' ');
    let sum: u64 = block.iter().map(|&b| u64::from(b)).sum();
    block[148..156].copy_from_slice(format!("{:06o}\0 ", sum).as_bytes());
    block
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn bzip2(data: &[u8]) -> Vec<u8> {
    let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// `.lzma` stream with unknown size and an end marker.
pub fn lzma(data: &[u8]) -> Vec<u8> {
    let options = xz2::stream::LzmaOptions::new_preset(6).unwrap();
    let stream = xz2::stream::Stream::new_lzma_encoder(&options).unwrap();
    let mut encoder = xz2::write::XzEncoder::new_stream(Vec::new(), stream);
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Extract `archive` and collect the status lines.
pub fn run(archive: &[u8], options: &ExtractOptions) -> (Result<ExtractStats>, Vec<String>) {
    let mut lines = Vec::new();
    let result = extract_stream(Cursor::new(archive), options, &mut |line: &str| {
        lines.push(line.to_string())
    });
    (result, lines)
}
