//! Core traits for the extraction pipeline.
//!
//! [`Backend`] is the seam between the block reader and whatever decodes the
//! compression container. [`MessageSink`] is how extraction reports what it is
//! doing to the embedding application.

use crate::BLOCK_SIZE;
use crate::error::Result;

/// A decompression backend producing tar blocks.
///
/// A backend is constructed (initialised) from the archive stream it owns and
/// is driven by a single extraction call. Construction replaces a separate
/// `init` step: a backend that exists has been initialised successfully.
pub trait Backend {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Fill `block` with the next decoded bytes.
    ///
    /// Returns the number of bytes produced. Fewer than [`BLOCK_SIZE`] bytes
    /// are only returned when the decoded stream has ended; `Ok(0)` means the
    /// stream is exhausted.
    fn read_block(&mut self, block: &mut [u8; BLOCK_SIZE]) -> Result<usize>;

    /// Release decoder state and the underlying stream.
    ///
    /// Idempotent: the first call releases everything, later calls do nothing.
    /// Implementations also call this from `Drop`, so resources are released on
    /// every exit path.
    fn cleanup(&mut self);

    /// Whether [`Backend::cleanup`] has already run.
    fn is_released(&self) -> bool;
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn read_block(&mut self, block: &mut [u8; BLOCK_SIZE]) -> Result<usize> {
        (**self).read_block(block)
    }

    fn cleanup(&mut self) {
        (**self).cleanup()
    }

    fn is_released(&self) -> bool {
        (**self).is_released()
    }
}

/// Receiver of human-readable status lines ("Writing x", "Skipping y", ...).
pub trait MessageSink {
    /// Deliver one status line.
    fn message(&mut self, text: &str);
}

impl<F: FnMut(&str)> MessageSink for F {
    fn message(&mut self, text: &str) {
        self(text)
    }
}

/// Sink that drops every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl MessageSink for NullSink {
    fn message(&mut self, _text: &str) {}
}
