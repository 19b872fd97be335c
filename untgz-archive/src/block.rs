//! Fixed-size block reads.
//!
//! Every tar record is exactly [`BLOCK_SIZE`] bytes. [`BlockReader`] pulls one
//! block at a time from the active backend and treats anything but a full
//! block as fatal.

use untgz_core::error::{Result, UntgzError};
use untgz_core::{BLOCK_SIZE, Backend};

/// Reads whole blocks from a [`Backend`].
pub struct BlockReader<B: Backend> {
    backend: B,
    block: [u8; BLOCK_SIZE],
    blocks_read: u64,
}

impl<B: Backend> BlockReader<B> {
    /// Create a block reader over an initialised backend.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            block: [0u8; BLOCK_SIZE],
            blocks_read: 0,
        }
    }

    /// Read the next block.
    ///
    /// A short read, a zero read and a backend error all fail; the backend is
    /// released before the error is returned.
    pub fn read_block(&mut self) -> Result<&[u8; BLOCK_SIZE]> {
        let result = match self.backend.read_block(&mut self.block) {
            Ok(BLOCK_SIZE) => Ok(()),
            Ok(n) => Err(UntgzError::incomplete_block(n, BLOCK_SIZE)),
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            tracing::debug!(
                backend = self.backend.name(),
                block = self.blocks_read,
                error = %e,
                "block read failed"
            );
            self.backend.cleanup();
            return Err(e);
        }

        tracing::trace!(block = self.blocks_read, "block read");
        self.blocks_read += 1;
        Ok(&self.block)
    }

    /// Number of full blocks read so far.
    pub fn blocks_read(&self) -> u64 {
        self.blocks_read
    }

    /// Name of the backend being read.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Release the backend. Safe to call more than once.
    pub fn release(&mut self) {
        self.backend.cleanup();
    }

    /// Whether the backend has been released.
    pub fn is_released(&self) -> bool {
        self.backend.is_released()
    }
}

impl<B: Backend> Drop for BlockReader<B> {
    fn drop(&mut self) {
        self.backend.cleanup();
    }
}
