//! # untgz Core
//!
//! Shared building blocks for the untgz crates.
//!
//! - [`error`]: the error type every crate returns, and the numeric
//!   [`ExtractionOutcome`] it collapses into
//! - [`traits`]: the decompression [`Backend`] seam and the [`MessageSink`]
//!   through which extraction reports progress
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ L3: Caller                                              │
//! │     untgz CLI (or any embedding application)            │
//! ├─────────────────────────────────────────────────────────┤
//! │ L2: Archive                                             │
//! │     sniffer, block reader, tar headers, filter, driver  │
//! ├─────────────────────────────────────────────────────────┤
//! │ L1: Codec                                               │
//! │     gzip / bzip2 (external), streaming LZMA             │
//! ├─────────────────────────────────────────────────────────┤
//! │ L0: Core (this crate)                                   │
//! │     errors, outcome codes, Backend / MessageSink        │
//! └─────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod traits;

pub use error::{ExtractionOutcome, Result, UntgzError};
pub use traits::{Backend, MessageSink, NullSink};

/// Size of a tar block. Every read performed by the block reader is exactly
/// this long, whatever backend produces the bytes.
pub const BLOCK_SIZE: usize = 512;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::BLOCK_SIZE;
    pub use crate::error::{ExtractionOutcome, Result, UntgzError};
    pub use crate::traits::{Backend, MessageSink};
}
