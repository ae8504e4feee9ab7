//! Error types for cloud-unzip

use thiserror::Error;

/// Result type for archive operations
pub type Result<T> = std::result::Result<T, ZipError>;

/// Errors raised while opening an archive or extracting its entries
#[derive(Error, Debug)]
pub enum ZipError {
    /// HTTP request could not be completed (connection failure, timeout, ...)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with an unexpected status
    #[error("HTTP request for {url} failed with status {status}")]
    HttpStatus {
        /// Requested resource
        url: String,
        /// Status code returned by the server
        status: u16,
    },

    /// Server answered a range request without any data
    #[error("{url} returned no data for bytes {start}-{end}")]
    EmptyResponse {
        /// Requested resource
        url: String,
        /// First requested byte
        start: u64,
        /// Last requested byte
        end: u64,
    },

    /// Total length of the resource could not be determined
    #[error("{location} did not report a usable content length")]
    SizeUnknown {
        /// URL or path of the archive
        location: String,
    },

    /// Requested range does not lie inside the resource
    #[error("range {start}-{end} lies outside the {size}-byte archive")]
    OutOfBounds {
        /// First requested byte
        start: u64,
        /// Last requested byte
        end: u64,
        /// Total size of the resource
        size: u64,
    },

    /// EOCD, Zip64 record or central directory is missing or malformed
    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    /// Local file header of a single entry is malformed
    #[error("invalid local file header for {name} at offset {offset}")]
    InvalidLocalHeader {
        /// Entry name
        name: String,
        /// Offset the header was expected at
        offset: u64,
    },

    /// Compression method other than stored or deflate
    #[error("unsupported compression method {method} for {name}")]
    UnsupportedCompression {
        /// Entry name
        name: String,
        /// Raw method code from the central directory
        method: u16,
    },

    /// Entry is encrypted and no plaintext stream is available
    #[error("{name} is encrypted; decryption is not supported")]
    Encrypted {
        /// Entry name
        name: String,
    },

    /// Compressed data could not be decoded or decoded to the wrong size
    #[error("corrupt data in {name}: {reason}")]
    CorruptData {
        /// Entry name
        name: String,
        /// What went wrong
        reason: String,
    },

    /// Decoded bytes do not match the recorded CRC-32
    #[error("CRC-32 mismatch for {name}: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Entry name
        name: String,
        /// Checksum from the central directory
        expected: u32,
        /// Checksum of the decoded bytes
        actual: u32,
    },

    /// Requested entries are not in the central directory
    #[error("entries not found in archive: {}", .0.join(", "))]
    MissingEntry(Vec<String>),

    /// Entry name would be written outside the destination directory
    #[error("refusing to extract {name} outside the destination directory")]
    UnsafePath {
        /// Entry name
        name: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Extraction task panicked or was cancelled
    #[error("extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ZipError {
    /// Whether the error came from the transport rather than the archive contents.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::HttpStatus { .. } | Self::EmptyResponse { .. }
        )
    }

    /// Whether the error leaves no usable archive state behind.
    ///
    /// Everything else is scoped to a single entry or request.
    pub fn is_archive_fatal(&self) -> bool {
        matches!(self, Self::SizeUnknown { .. } | Self::InvalidArchive(_))
    }
}
