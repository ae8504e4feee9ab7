//! # cloud-unzip
//!
//! Extract entries from ZIP archives that live behind an HTTP server, without
//! downloading the whole archive.
//!
//! The archive is only ever read through byte-range requests: one for its
//! tail, one for the central directory, and then one or a few per extracted
//! entry. Local files and in-memory buffers can be read through the same
//! [`RangeFetcher`] interface.
//!
//! ## Features
//!
//! - Listing of remote archives from the central directory alone
//! - Support for ZIP64 format (archives larger than 4GB, more than 65535 entries)
//! - Support for STORED (uncompressed) and DEFLATE compression methods
//! - Chunked streaming of large entries with bounded memory
//! - Parallel extraction of many entries with a worker limit
//! - CRC-32 verification of extracted data
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use cloud_unzip::{ExtractOptions, HttpRangeFetcher, ZipArchive};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let fetcher = Arc::new(HttpRangeFetcher::new("https://example.com/archive.zip").await?);
//!     let archive = ZipArchive::open(fetcher).await?;
//!
//!     for name in archive.file_names() {
//!         println!("{name}");
//!     }
//!
//!     let report = archive
//!         .extract_parallel(&["x.txt", "y/z.bin"], Path::new("out"), &ExtractOptions::default())
//!         .await?;
//!     println!("{} extracted, {} failed", report.extracted.len(), report.failed.len());
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod io;
pub mod listing;
pub mod zip;

pub use cli::Cli;
pub use error::{Result, ZipError};
pub use io::{HttpRangeFetcher, LocalFileFetcher, MemoryFetcher, RangeFetcher};
pub use zip::{
    BatchReport, CompressionMethod, EntryRecord, ExtractOptions, FailedEntry, Progress,
    ZipArchive,
};
