use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Entries whose compressed size reaches this are fetched in chunks
pub const DEFAULT_CHUNK_THRESHOLD: u64 = 50 * 1024 * 1024;
/// Size of each range request on the chunked path
pub const DEFAULT_CHUNK_SIZE: u64 = 10 * 1024 * 1024;

/// Snapshot handed to a progress callback
#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
    /// Entry being extracted
    pub name: &'a str,
    /// Uncompressed bytes written so far
    pub bytes_written: u64,
    /// Uncompressed size recorded in the central directory
    pub total_bytes: u64,
}

pub type ProgressFn = Arc<dyn Fn(&Progress<'_>) + Send + Sync>;

/// Tuning knobs for extraction
#[derive(Clone)]
pub struct ExtractOptions {
    /// Compressed size at which an entry is streamed in chunks
    pub chunk_threshold: u64,
    /// Length of each range request on the chunked path
    pub chunk_size: u64,
    /// Maximum number of entries extracted concurrently
    pub workers: usize,
    /// Compare each entry against its recorded CRC-32
    pub verify_crc: bool,
    /// Called whenever decoded bytes are written
    pub progress: Option<ProgressFn>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            chunk_threshold: DEFAULT_CHUNK_THRESHOLD,
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: default_workers(),
            verify_crc: true,
            progress: None,
        }
    }
}

impl ExtractOptions {
    /// Always fetch an entry's compressed bytes with one request
    pub fn single_shot() -> Self {
        Self::default().with_chunk_threshold(u64::MAX)
    }

    /// Stream every entry in chunks, whatever its size
    pub fn always_chunked() -> Self {
        Self::default().with_chunk_threshold(0)
    }

    pub fn with_chunk_threshold(mut self, threshold: u64) -> Self {
        self.chunk_threshold = threshold;
        self
    }

    /// Set the chunk length; zero is treated as one byte
    pub fn with_chunk_size(mut self, size: u64) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Set max concurrent jobs; zero is treated as one
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_crc_verification(mut self, verify: bool) -> Self {
        self.verify_crc = verify;
        self
    }

    pub fn with_progress(mut self, progress: impl Fn(&Progress<'_>) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }

    /// Whether an entry with `compressed_size` bytes takes the chunked path
    pub fn is_chunked(&self, compressed_size: u64) -> bool {
        compressed_size >= self.chunk_threshold
    }
}

impl fmt::Debug for ExtractOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractOptions")
            .field("chunk_threshold", &self.chunk_threshold)
            .field("chunk_size", &self.chunk_size)
            .field("workers", &self.workers)
            .field("verify_crc", &self.verify_crc)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Parallelism reported by the platform, or 4 when it cannot tell
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(4)
}
