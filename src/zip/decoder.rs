//! Range-addressed entry decoding.
//!
//! An entry's compressed bytes are fetched either in one range request or,
//! at or above [`ExtractOptions::chunk_threshold`], as a sequence of
//! `chunk_size` ranges. Both paths feed the same decoder state, so the raw
//! inflate stream simply continues across fetches and memory stays bounded
//! by one chunk plus a fixed output buffer.

use bytes::Bytes;
use flate2::{Decompress, DecompressError, FlushDecompress, Status};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

use crate::error::{Result, ZipError};
use crate::io::RangeFetcher;

use super::options::{ExtractOptions, Progress};
use super::structures::{CompressionMethod, EntryRecord};

const OUTPUT_BUFFER_SIZE: usize = 256 * 1024;

/// Raw deflate decoder that can be fed input in arbitrary pieces
pub struct Inflater {
    inner: Decompress,
    finished: bool,
}

/// Outcome of one [`Inflater::step`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InflateStep {
    pub consumed: usize,
    pub produced: usize,
    pub finished: bool,
}

impl Inflater {
    pub fn new() -> Self {
        Self {
            // No zlib header: ZIP entries carry raw deflate
            inner: Decompress::new(false),
            finished: false,
        }
    }

    /// Decode as much of `input` into `output` as fits.
    pub fn step(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> std::result::Result<InflateStep, DecompressError> {
        if self.finished {
            return Ok(InflateStep {
                consumed: 0,
                produced: 0,
                finished: true,
            });
        }

        let before_in = self.inner.total_in();
        let before_out = self.inner.total_out();
        let status = self.inner.decompress(input, output, FlushDecompress::None)?;
        self.finished = status == Status::StreamEnd;

        Ok(InflateStep {
            consumed: (self.inner.total_in() - before_in) as usize,
            produced: (self.inner.total_out() - before_out) as usize,
            finished: self.finished,
        })
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Default for Inflater {
    fn default() -> Self {
        Self::new()
    }
}

enum Codec {
    Stored,
    Deflate {
        inflater: Inflater,
        output: Vec<u8>,
        /// Input the decoder has not taken yet
        pending: Vec<u8>,
    },
}

/// Writer wrapper that checksums and reports everything passing through it
struct Sink<'a, W> {
    writer: &'a mut W,
    name: &'a str,
    total: u64,
    written: u64,
    hasher: crc32fast::Hasher,
    options: &'a ExtractOptions,
}

impl<W: AsyncWrite + Unpin> Sink<'_, W> {
    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.writer.write_all(bytes).await?;
        self.hasher.update(bytes);
        self.written += bytes.len() as u64;

        if let Some(progress) = &self.options.progress {
            progress(&Progress {
                name: self.name,
                bytes_written: self.written,
                total_bytes: self.total,
            });
        }
        Ok(())
    }

    fn corrupt(&self, reason: impl Into<String>) -> ZipError {
        ZipError::CorruptData {
            name: self.name.to_string(),
            reason: reason.into(),
        }
    }

    fn verify(self, entry: &EntryRecord) -> Result<u64> {
        if self.written != entry.uncompressed_size {
            return Err(self.corrupt(format!(
                "decoded {} bytes, expected {}",
                self.written, entry.uncompressed_size
            )));
        }

        let actual = self.hasher.finalize();
        if self.options.verify_crc && actual != entry.crc32 {
            return Err(ZipError::ChecksumMismatch {
                name: entry.file_name.clone(),
                expected: entry.crc32,
                actual,
            });
        }
        Ok(self.written)
    }
}

/// Decode one entry whose compressed bytes start at `data_offset`.
///
/// Returns the number of uncompressed bytes written to `writer`. The writer
/// is flushed but not shut down.
pub async fn decode_entry<F, W>(
    fetcher: &F,
    entry: &EntryRecord,
    data_offset: u64,
    options: &ExtractOptions,
    writer: &mut W,
) -> Result<u64>
where
    F: RangeFetcher + ?Sized,
    W: AsyncWrite + Unpin,
{
    let mut codec = match entry.compression_method {
        CompressionMethod::Stored => Codec::Stored,
        CompressionMethod::Deflate => Codec::Deflate {
            inflater: Inflater::new(),
            output: vec![0u8; OUTPUT_BUFFER_SIZE],
            pending: Vec::new(),
        },
        CompressionMethod::Unknown(method) => {
            return Err(ZipError::UnsupportedCompression {
                name: entry.file_name.clone(),
                method,
            });
        }
    };

    if entry.has_data_descriptor() {
        // Local header sizes may be zero; the central directory values are used
        trace!(name = %entry.file_name, "entry has a trailing data descriptor");
    }

    let total = entry.compressed_size;
    let chunk_size = if options.is_chunked(total) {
        debug!(
            name = %entry.file_name,
            compressed = total,
            chunk_size = options.chunk_size,
            "streaming entry in chunks"
        );
        options.chunk_size.max(1)
    } else {
        total.max(1)
    };

    let mut sink = Sink {
        writer,
        name: &entry.file_name,
        total: entry.uncompressed_size,
        written: 0,
        hasher: crc32fast::Hasher::new(),
        options,
    };

    let mut pos = 0u64;
    while pos < total {
        let len = chunk_size.min(total - pos);
        let start = data_offset + pos;
        // Chunks must arrive in order: the decoder state depends on it
        let chunk = fetcher.fetch(start, start + len - 1).await?;
        pos += len;
        trace!(name = %entry.file_name, start, len, "fetched compressed range");

        match &mut codec {
            Codec::Stored => sink.write(&chunk).await?,
            Codec::Deflate {
                inflater,
                output,
                pending,
            } => {
                let input = if pending.is_empty() {
                    chunk
                } else {
                    pending.extend_from_slice(&chunk);
                    Bytes::from(std::mem::take(pending))
                };

                let rest = inflate_into(inflater, &input, output, &mut sink).await?;
                if inflater.is_finished() {
                    if pos < total || !rest.is_empty() {
                        trace!(name = %entry.file_name, "ignoring bytes after end of deflate stream");
                    }
                    break;
                }
                pending.extend_from_slice(rest);
            }
        }
    }

    if let Codec::Deflate {
        inflater, output, ..
    } = &mut codec
    {
        if total > 0 && !inflater.is_finished() {
            // Drain anything still buffered inside the decoder
            inflate_into(inflater, &[], output, &mut sink).await?;
            if !inflater.is_finished() {
                return Err(sink.corrupt("unexpected end of deflate stream"));
            }
        }
    }

    sink.writer.flush().await?;
    sink.verify(entry)
}

/// Feed `input` through the decoder until it stalls or needs more input.
///
/// Returns whatever part of `input` the decoder did not consume.
async fn inflate_into<'i, W: AsyncWrite + Unpin>(
    inflater: &mut Inflater,
    mut input: &'i [u8],
    output: &mut [u8],
    sink: &mut Sink<'_, W>,
) -> Result<&'i [u8]> {
    loop {
        let step = inflater
            .step(input, output)
            .map_err(|e| sink.corrupt(e.to_string()))?;
        input = &input[step.consumed..];
        sink.write(&output[..step.produced]).await?;

        if step.finished {
            return Ok(input);
        }
        let stalled = step.consumed == 0 && step.produced == 0;
        if stalled || (input.is_empty() && step.produced < output.len()) {
            return Ok(input);
        }
    }
}
