use super::{RangeFetcher, check_range};
use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};

/// Archive held in memory
///
/// Counts every fetch, which makes it handy for checking how much of an
/// archive an operation actually touched.
#[derive(Debug)]
pub struct MemoryFetcher {
    data: Bytes,
    fetch_count: AtomicU64,
    transferred_bytes: AtomicU64,
    largest_fetch: AtomicU64,
}

impl MemoryFetcher {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            fetch_count: AtomicU64::new(0),
            transferred_bytes: AtomicU64::new(0),
            largest_fetch: AtomicU64::new(0),
        }
    }

    /// Number of `fetch` calls served so far
    pub fn fetch_count(&self) -> u64 {
        self.fetch_count.load(Ordering::Relaxed)
    }

    /// Total bytes handed out so far
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }

    /// Length of the largest single range served so far
    pub fn largest_fetch(&self) -> u64 {
        self.largest_fetch.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RangeFetcher for MemoryFetcher {
    async fn fetch(&self, start: u64, end: u64) -> Result<Bytes> {
        check_range(start, end, self.data.len() as u64)?;

        let len = end - start + 1;
        self.fetch_count.fetch_add(1, Ordering::Relaxed);
        self.transferred_bytes.fetch_add(len, Ordering::Relaxed);
        self.largest_fetch.fetch_max(len, Ordering::Relaxed);

        Ok(self.data.slice(start as usize..=end as usize))
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn location(&self) -> &str {
        "memory"
    }
}
