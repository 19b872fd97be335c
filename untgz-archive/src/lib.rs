//! # untgz Archive
//!
//! Tar extraction over plain, gzip, bzip2 and LZMA containers.
//!
//! - [`sniff`]: guesses the container from magic bytes, a valid tar
//!   checksum, the file extension or an LZMA properties byte
//! - [`backend`]: one decompressor per container behind the
//!   [`Backend`](untgz_core::Backend) trait
//! - [`block`]: hands out exact 512-byte blocks
//! - [`tar`]: header parsing, checksum validation and GNU long names
//! - [`filter`]: include / exclude patterns
//! - [`extract`]: the state machine that writes entries to disk
//!
//! ## Example
//!
//! ```rust,no_run
//! use untgz_archive::{ExtractOptions, KeepPolicy, extract_path};
//! use untgz_core::ExtractionOutcome;
//!
//! let options = ExtractOptions::new()
//!     .destination("out")
//!     .keep(KeepPolicy::UpdateIfNewer)
//!     .exclude(["*.bak"]);
//!
//! let mut sink = |line: &str| println!("{line}");
//! let outcome = extract_path("release.tar.gz", &options, &mut sink);
//! assert_eq!(outcome, ExtractionOutcome::Success);
//! ```
//!
//! ## Reading from a stream
//!
//! [`extract_stream`] accepts any [`Read`](std::io::Read). With
//! [`CompressionMode::Auto`] the first block is peeked, classified and
//! replayed ahead of the stream, so pipes work as well as files.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod block;
pub mod extract;
pub mod filter;
pub mod fsutil;
pub mod options;
pub mod sniff;
pub mod tar;

// Re-exports
pub use backend::{Bzip2Backend, GzipBackend, LzmaBackend, open_backend};
pub use block::BlockReader;
pub use extract::{ExtractStats, Extractor, extract, extract_path, extract_stream};
pub use filter::{Selection, match_expr, match_name, strip_to_components};
pub use fsutil::{PathGuard, StripUnsafePrefix, TrustingGuard, make_dir_all};
pub use options::{ExtractOptions, KeepPolicy};
pub use sniff::{CompressionMode, CompressionTag, classify, sniff_path, sniff_stream};
pub use tar::{ArchiveHeader, EntryKind};
