mod http;
mod local;
mod memory;

pub use http::HttpRangeFetcher;
pub use local::LocalFileFetcher;
pub use memory::MemoryFetcher;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{Result, ZipError};

/// Random access to an immutable byte resource
#[async_trait]
pub trait RangeFetcher: Send + Sync {
    /// Fetch the inclusive byte range `[start, end]`.
    ///
    /// The returned buffer holds exactly `end - start + 1` bytes.
    async fn fetch(&self, start: u64, end: u64) -> Result<Bytes>;

    /// Get the total size of the resource
    fn size(&self) -> u64;

    /// URL or path of the resource, for diagnostics
    fn location(&self) -> &str;
}

/// Reject ranges that are inverted or reach past the end of the resource.
pub(crate) fn check_range(start: u64, end: u64, size: u64) -> Result<()> {
    if start > end || end >= size {
        return Err(ZipError::OutOfBounds { start, end, size });
    }
    Ok(())
}
