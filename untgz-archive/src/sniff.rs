//! Compression format sniffing.
//!
//! Gzip, bzip2 and legacy compress streams carry magic bytes; plain tar is
//! recognised by a valid header checksum; LZMA has no magic at all, so it is
//! inferred from the file extension or a plausible properties byte. Sniffing
//! never fails: any I/O problem falls back to [`CompressionTag::Gzip`], whose
//! backend also passes raw tar through.

use crate::backend::{Replay, peek};
use crate::tar::header::valid_checksum;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use untgz_core::BLOCK_SIZE;
use untgz_lzma::model::PROPERTIES_MAX;

/// Compression container of an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CompressionTag {
    /// Uncompressed tar.
    None = 0,
    /// gzip (`.tgz`, `.tar.gz`).
    Gzip = 1,
    /// LZMA_alone (`.tlz`, `.tar.lzma`).
    Lzma = 2,
    /// bzip2 (`.tbz`, `.tar.bz2`).
    Bzip2 = 3,
    /// Legacy Unix compress (`.Z`), recognised but not supported.
    Unsupported = 4,
}

impl CompressionTag {
    /// Numeric code of this tag.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Parse a numeric code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::Gzip),
            2 => Some(Self::Lzma),
            3 => Some(Self::Bzip2),
            4 => Some(Self::Unsupported),
            _ => None,
        }
    }

    /// Get the usual file extension.
    pub fn extension(self) -> &'static str {
        match self {
            Self::None => "tar",
            Self::Gzip => "tgz",
            Self::Lzma => "tlz",
            Self::Bzip2 => "tbz",
            Self::Unsupported => "Z",
        }
    }
}

impl fmt::Display for CompressionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::Lzma => "lzma",
            Self::Bzip2 => "bzip2",
            Self::Unsupported => "compress",
        };
        f.write_str(name)
    }
}

/// Error for an unrecognised compression name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCompressionError(String);

impl fmt::Display for ParseCompressionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown compression '{}' (expected auto, none, gz, bz2, lzma or Z)",
            self.0
        )
    }
}

impl std::error::Error for ParseCompressionError {}

impl FromStr for CompressionTag {
    type Err = ParseCompressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Z" | "compress" => return Ok(Self::Unsupported),
            _ => {}
        }
        match s.to_ascii_lowercase().as_str() {
            "none" | "tar" => Ok(Self::None),
            "gz" | "gzip" | "tgz" => Ok(Self::Gzip),
            "lzma" | "tlz" => Ok(Self::Lzma),
            "bz2" | "bzip2" | "tbz" => Ok(Self::Bzip2),
            _ => Err(ParseCompressionError(s.to_string())),
        }
    }
}

/// How the extractor chooses a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionMode {
    /// Sniff the stream.
    #[default]
    Auto,
    /// Use the given container without sniffing.
    Explicit(CompressionTag),
}

impl fmt::Display for CompressionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Explicit(tag) => tag.fmt(f),
        }
    }
}

impl FromStr for CompressionMode {
    type Err = ParseCompressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            Ok(Self::Auto)
        } else {
            s.parse().map(Self::Explicit)
        }
    }
}

impl From<CompressionTag> for CompressionMode {
    fn from(tag: CompressionTag) -> Self {
        Self::Explicit(tag)
    }
}

/// Text after the last `.` of `name`, or an empty string.
fn extension_of(name: &str) -> &str {
    name.rsplit_once('.').map_or("", |(_, ext)| ext)
}

/// Classify the leading bytes of an archive.
///
/// `head` should hold the first block (fewer bytes only if the file is that
/// short). `name` feeds the extension rule.
pub fn classify(head: &[u8], name: Option<&str>) -> CompressionTag {
    if head.first_chunk::<BLOCK_SIZE>().is_some_and(valid_checksum) {
        return CompressionTag::None;
    }

    match head {
        [0x1F, 0x8B, ..] => return CompressionTag::Gzip,
        [0x1F, 0x9D, ..] => return CompressionTag::Unsupported,
        [b'B', b'Z', ..] => return CompressionTag::Bzip2,
        _ => {}
    }

    let ext = extension_of(name.unwrap_or_default());
    if ext.eq_ignore_ascii_case("tgz") || ext.eq_ignore_ascii_case("gz") {
        return CompressionTag::Gzip;
    }
    if ext.eq_ignore_ascii_case("tbz") || ext.eq_ignore_ascii_case("bz2") {
        return CompressionTag::Bzip2;
    }
    if ext.eq_ignore_ascii_case("tlz") || ext.eq_ignore_ascii_case("lzma") {
        return CompressionTag::Lzma;
    }

    match head.first() {
        Some(&props) if props <= PROPERTIES_MAX => CompressionTag::Lzma,
        _ => CompressionTag::Gzip,
    }
}

/// Sniff the archive at `path`. Unreadable files classify as gzip.
pub fn sniff_path(path: impl AsRef<Path>) -> CompressionTag {
    let path = path.as_ref();
    let name = path.to_string_lossy();

    let head = File::open(path).and_then(|file| {
        let mut head = Vec::with_capacity(BLOCK_SIZE);
        file.take(BLOCK_SIZE as u64).read_to_end(&mut head)?;
        Ok(head)
    });

    match head {
        Ok(head) => {
            let tag = classify(&head, Some(&name));
            tracing::debug!(path = %path.display(), %tag, "sniffed archive");
            tag
        }
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "sniffing failed, assuming gzip");
            CompressionTag::Gzip
        }
    }
}

/// Sniff a stream by peeking at its first block.
///
/// Returns the tag and a stream that replays the peeked bytes ahead of the
/// rest. A read error while peeking yields the gzip fallback; the error
/// resurfaces when the backend reads the stream.
pub fn sniff_stream<R: Read>(stream: R, name: Option<&str>) -> (CompressionTag, Replay<R>) {
    let (replay, head) = peek(stream, BLOCK_SIZE);
    let tag = match head {
        Ok(head) => classify(&head, name),
        Err(e) => {
            tracing::debug!(error = %e, "sniffing failed, assuming gzip");
            CompressionTag::Gzip
        }
    };
    (tag, replay)
}
