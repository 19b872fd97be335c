//! Decompression backends.
//!
//! Each backend owns the archive stream it decodes and produces tar blocks
//! through the [`Backend`] trait. [`open_backend`] picks the variant for a
//! [`CompressionTag`]:
//!
//! | Tag           | Backend                                        |
//! |---------------|------------------------------------------------|
//! | `None`/`Gzip` | [`GzipBackend`], gzip framing or raw bytes     |
//! | `Bzip2`       | [`Bzip2Backend`]                               |
//! | `Lzma`        | [`LzmaBackend`], streaming `.lzma` decoder     |
//! | `Unsupported` | rejected                                       |

pub mod bzip2;
pub mod gzip;
pub mod lzma;

pub use self::bzip2::Bzip2Backend;
pub use self::gzip::GzipBackend;
pub use self::lzma::LzmaBackend;

use crate::sniff::CompressionTag;
use std::io::{self, Cursor, ErrorKind, Read};
use untgz_core::Backend;
use untgz_core::error::{Result, UntgzError};

/// A stream with some already-consumed leading bytes put back in front.
pub type Replay<R> = io::Chain<Cursor<Vec<u8>>, R>;

/// Read up to `len` leading bytes of `reader` and return a stream that yields
/// them again followed by the rest of `reader`, together with the bytes.
///
/// Fewer than `len` bytes are returned only when the stream is shorter. On a
/// read error the stream is still handed back, replaying whatever was read.
pub fn peek<R: Read>(mut reader: R, len: usize) -> (Replay<R>, io::Result<Vec<u8>>) {
    let mut head = vec![0u8; len];
    let mut filled = 0;
    let mut error = None;
    while filled < len {
        match reader.read(&mut head[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                error = Some(e);
                break;
            }
        }
    }
    head.truncate(filled);

    let replay = Cursor::new(head.clone()).chain(reader);
    match error {
        Some(e) => (replay, Err(e)),
        None => (replay, Ok(head)),
    }
}

/// Fill `buf` from `reader`, stopping early only at end of stream.
pub fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Construct and initialise the backend for `tag` over `stream`.
///
/// `Unsupported` is rejected before anything is read from the stream.
pub fn open_backend<'a, R: Read + 'a>(
    tag: CompressionTag,
    stream: R,
) -> Result<Box<dyn Backend + 'a>> {
    let backend: Box<dyn Backend + 'a> = match tag {
        CompressionTag::None | CompressionTag::Gzip => Box::new(GzipBackend::new(stream)?),
        CompressionTag::Bzip2 => Box::new(Bzip2Backend::new(stream)?),
        CompressionTag::Lzma => Box::new(LzmaBackend::new(stream)?),
        CompressionTag::Unsupported => {
            return Err(UntgzError::unsupported_method("compress (.Z)"));
        }
    };
    tracing::debug!(backend = backend.name(), %tag, "backend initialised");
    Ok(backend)
}
