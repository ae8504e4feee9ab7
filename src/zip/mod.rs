//! ZIP archive parsing and extraction over range reads.
//!
//! This module provides functionality for reading and extracting ZIP archives,
//! supporting both standard ZIP format and ZIP64 extensions for large archives.
//!
//! ## Architecture
//!
//! - [`structures`]: Data structures representing ZIP format elements (EOCD, file headers, etc.)
//! - [`parser`]: EOCD location, Zip64 handling, central directory and local header decoding
//! - [`decoder`]: Stored/deflate decoding of one entry, in one shot or in chunks
//! - [`extractor`]: The opened archive and its single-entry extraction API
//! - [`parallel`]: Concurrent extraction of many entries
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! This implementation reads the EOCD first (from the end of the file),
//! then the Central Directory, which allows listing files without reading
//! the entire archive - perfect for HTTP Range requests.
//!
//! ## Supported Features
//!
//! - Standard ZIP format (PKZIP APPNOTE 6.3.x compatible)
//! - ZIP64 extensions for files > 4GB and more than 65535 entries
//! - STORED (no compression) method
//! - DEFLATE compression method
//! - Entries using data descriptors (sizes come from the central directory)
//!
//! ## Limitations
//!
//! - No encryption support: encrypted entries fail with [`ZipError::Encrypted`](crate::ZipError::Encrypted)
//! - No multi-disk archive support
//! - No BZIP2, LZMA, or other compression methods

pub mod decoder;
mod extractor;
pub mod options;
mod parallel;
pub mod parser;
pub mod structures;

pub use extractor::ZipArchive;
pub use options::{ExtractOptions, Progress, ProgressFn};
pub use parallel::{BatchReport, FailedEntry, destination_path};
pub use parser::ZipParser;
pub use structures::{CompressionMethod, EntryRecord};
