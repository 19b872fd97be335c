//! Error types for untgz operations.
//!
//! Every failure in the extraction pipeline is an [`UntgzError`]. Callers that
//! only care about the coarse result collapse it into an [`ExtractionOutcome`]
//! with [`UntgzError::outcome`]: problems reading or decoding the archive map to
//! [`ExtractionOutcome::ReadError`], problems materialising entries on disk map
//! to [`ExtractionOutcome::ExtractError`].

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for untgz operations.
#[derive(Debug, Error)]
pub enum UntgzError {
    /// I/O error from the underlying archive stream.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The compression container is recognised but not supported.
    #[error("Unsupported compression format: {method}")]
    UnsupportedMethod {
        /// Name of the rejected container.
        method: String,
    },

    /// A decompression backend could not be initialised.
    #[error("{backend}: unable to initialize decompression method: {message}")]
    BackendInit {
        /// Backend name.
        backend: &'static str,
        /// Description of the failure.
        message: String,
    },

    /// The decompressor reported a fault while producing a block.
    #[error("{backend}: error decompressing: {message}")]
    Decompress {
        /// Backend name.
        backend: &'static str,
        /// Description of the failure.
        message: String,
    },

    /// Corrupted compressed data.
    #[error("Corrupted data at offset {offset}: {message}")]
    CorruptedData {
        /// Uncompressed position where corruption was detected.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },

    /// Invalid container header (e.g. bad LZMA properties byte).
    #[error("Invalid header: {message}")]
    InvalidHeader {
        /// Description of the header error.
        message: String,
    },

    /// The compressed input ran out while the decoder still needed bytes.
    #[error("Unexpected end of file: expected {expected} more bytes")]
    UnexpectedEof {
        /// Number of bytes that were expected but not available.
        expected: usize,
    },

    /// The decoder stopped producing output before the declared size.
    #[error("Unexpected end of stream: {remaining} bytes still declared")]
    PrematureEnd {
        /// Bytes the container header promised but never delivered.
        remaining: u64,
    },

    /// A block read returned fewer than 512 bytes.
    #[error("incomplete block read ({read} of {expected} bytes)")]
    IncompleteBlock {
        /// Bytes actually produced.
        read: usize,
        /// Bytes requested.
        expected: usize,
    },

    /// Memory for decoder state could not be reserved.
    #[error("Allocation of {bytes} bytes failed")]
    AllocationFailed {
        /// Size of the failed allocation.
        bytes: usize,
    },

    /// Header checksum matched neither the unsigned nor the signed byte sum.
    #[error("bad header checksum: stored {stored:o}, unsigned {unsigned:o}, signed {signed}")]
    ChecksumMismatch {
        /// Value stored in the header.
        stored: u64,
        /// Unsigned byte sum of the block.
        unsigned: u64,
        /// Signed byte sum of the block.
        signed: i64,
    },

    /// A GNU long-name record is larger than a block or shorter than its text.
    #[error("invalid long name (declared size {size}, name length {name_len})")]
    InvalidLongName {
        /// Declared size of the long-name payload.
        size: u64,
        /// Length of the NUL-terminated name found in the payload block.
        name_len: usize,
    },

    /// A directory could not be created.
    #[error("Unable to create directory {}: {source}", path.display())]
    DirectoryCreate {
        /// Directory that failed.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// An output file could not be opened for reasons other than "exists".
    #[error("Could not create file {}: {source}", path.display())]
    FileOpen {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// Writing entry data to an output file failed.
    #[error("write failed for {}: {source}", path.display())]
    FileWrite {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
}

/// Result type alias for untgz operations.
pub type Result<T> = std::result::Result<T, UntgzError>;

impl UntgzError {
    /// Create an unsupported method error.
    pub fn unsupported_method(method: impl Into<String>) -> Self {
        Self::UnsupportedMethod {
            method: method.into(),
        }
    }

    /// Create a backend initialisation error.
    pub fn backend_init(backend: &'static str, message: impl fmt::Display) -> Self {
        Self::BackendInit {
            backend,
            message: message.to_string(),
        }
    }

    /// Create a decompression error.
    pub fn decompress(backend: &'static str, message: impl fmt::Display) -> Self {
        Self::Decompress {
            backend,
            message: message.to_string(),
        }
    }

    /// Create a corrupted data error.
    pub fn corrupted(offset: u64, message: impl Into<String>) -> Self {
        Self::CorruptedData {
            offset,
            message: message.into(),
        }
    }

    /// Create an invalid header error.
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            message: message.into(),
        }
    }

    /// Create an unexpected EOF error.
    pub fn unexpected_eof(expected: usize) -> Self {
        Self::UnexpectedEof { expected }
    }

    /// Create an incomplete block error.
    pub fn incomplete_block(read: usize, expected: usize) -> Self {
        Self::IncompleteBlock { read, expected }
    }

    /// Create a directory creation error.
    pub fn directory_create(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::DirectoryCreate {
            path: path.into(),
            source,
        }
    }

    /// Create a file open error.
    pub fn file_open(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileOpen {
            path: path.into(),
            source,
        }
    }

    /// Create a file write error.
    pub fn file_write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Classify this error into the coarse outcome reported to callers.
    pub fn outcome(&self) -> ExtractionOutcome {
        match self {
            Self::DirectoryCreate { .. } | Self::FileOpen { .. } | Self::FileWrite { .. } => {
                ExtractionOutcome::ExtractError
            }
            _ => ExtractionOutcome::ReadError,
        }
    }
}

/// Coarse result of an extraction call.
///
/// The discriminants are the numeric codes handed back to callers that speak
/// integers rather than `Result`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ExtractionOutcome {
    /// Every selected entry was processed.
    Success = 0,
    /// The archive could not be read, decoded or validated.
    ReadError = -1,
    /// An entry could not be written to the destination.
    ExtractError = -2,
}

impl ExtractionOutcome {
    /// Numeric code of this outcome.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Parse a numeric code.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Success),
            -1 => Some(Self::ReadError),
            -2 => Some(Self::ExtractError),
            _ => None,
        }
    }

    /// Whether this is [`ExtractionOutcome::Success`].
    pub fn is_success(self) -> bool {
        self == Self::Success
    }

    /// Status text shown to the user for this outcome.
    pub fn status_text(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::ReadError => "Error: Failure reading from tarball.",
            Self::ExtractError => "Error: Unable to extract file.",
        }
    }
}

impl<T> From<&Result<T>> for ExtractionOutcome {
    fn from(result: &Result<T>) -> Self {
        match result {
            Ok(_) => Self::Success,
            Err(e) => e.outcome(),
        }
    }
}

impl fmt::Display for ExtractionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.status_text())
    }
}
