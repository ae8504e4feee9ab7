use bytes::Bytes;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tokio::io::{AsyncWrite, BufWriter};
use tracing::{debug, warn};

use crate::error::{Result, ZipError};
use crate::io::RangeFetcher;

use super::decoder::decode_entry;
use super::options::ExtractOptions;
use super::parser::ZipParser;
use super::structures::EntryRecord;

/// An opened remote ZIP archive
///
/// Opening fetches the archive's tail and its central directory; after that
/// the entry table never changes. Cloning is cheap and clones share the
/// fetcher and the entry table, which is how parallel jobs see the archive.
pub struct ZipArchive<F: RangeFetcher> {
    parser: ZipParser<F>,
    central_directory: Bytes,
    entries: Arc<HashMap<String, EntryRecord>>,
    zip64: bool,
}

impl<F: RangeFetcher> Clone for ZipArchive<F> {
    fn clone(&self) -> Self {
        Self {
            parser: self.parser.clone(),
            central_directory: self.central_directory.clone(),
            entries: Arc::clone(&self.entries),
            zip64: self.zip64,
        }
    }
}

impl<F: RangeFetcher> ZipArchive<F> {
    /// Locate and decode the central directory of the archive behind `fetcher`.
    ///
    /// # Errors
    ///
    /// Fails with [`ZipError::InvalidArchive`] when the EOCD, Zip64 record or
    /// central directory cannot be decoded; no partial archive is returned.
    pub async fn open(fetcher: Arc<F>) -> Result<Self> {
        let parser = ZipParser::new(fetcher);
        let directory = parser.read_central_directory().await?;

        debug!(
            location = parser.fetcher().location(),
            size = parser.size(),
            entries = directory.entries.len(),
            zip64 = directory.zip64,
            "opened archive"
        );

        Ok(Self {
            parser,
            central_directory: directory.raw,
            entries: Arc::new(directory.entries),
            zip64: directory.zip64,
        })
    }

    /// URL or path of the archive
    pub fn location(&self) -> &str {
        self.parser.fetcher().location()
    }

    /// Total size of the archive in bytes
    pub fn size(&self) -> u64 {
        self.parser.size()
    }

    pub fn is_zip64(&self) -> bool {
        self.zip64
    }

    /// The central directory exactly as fetched
    pub fn central_directory(&self) -> &Bytes {
        &self.central_directory
    }

    pub fn fetcher(&self) -> &Arc<F> {
        self.parser.fetcher()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// All entries, in no particular order
    pub fn entries(&self) -> impl Iterator<Item = &EntryRecord> {
        self.entries.values()
    }

    /// Entry names, sorted
    pub fn file_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Look up one entry by its exact name
    pub fn entry(&self, name: &str) -> Result<&EntryRecord> {
        self.entries
            .get(name)
            .ok_or_else(|| ZipError::MissingEntry(vec![name.to_string()]))
    }

    /// Absolute offset of the first compressed byte of `name`
    pub async fn data_offset(&self, name: &str) -> Result<u64> {
        let entry = self.entry(name)?;
        self.parser.data_offset(entry).await
    }

    /// Decode `name` into `writer`, returning the number of bytes written.
    pub async fn extract_to_writer<W>(
        &self,
        name: &str,
        writer: &mut W,
        options: &ExtractOptions,
    ) -> Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let entry = self.entry(name)?;
        if entry.is_encrypted() {
            return Err(ZipError::Encrypted {
                name: entry.file_name.clone(),
            });
        }
        // Nothing to fetch, so the local header is irrelevant
        let data_offset = if entry.compressed_size == 0 {
            entry.lfh_offset
        } else {
            self.parser.data_offset(entry).await?
        };
        decode_entry(
            self.parser.fetcher().as_ref(),
            entry,
            data_offset,
            options,
            writer,
        )
        .await
    }

    /// Extract file data to memory
    pub async fn extract_to_vec(&self, name: &str, options: &ExtractOptions) -> Result<Vec<u8>> {
        let capacity = self.entry(name)?.uncompressed_size.min(64 * 1024 * 1024) as usize;
        let mut buf = Vec::with_capacity(capacity);
        self.extract_to_writer(name, &mut buf, options).await?;
        Ok(buf)
    }

    /// Extract file to disk
    ///
    /// Parent directories are created as needed. A partially written file is
    /// removed when extraction fails.
    pub async fn extract_to_file(
        &self,
        name: &str,
        output_path: &Path,
        options: &ExtractOptions,
    ) -> Result<u64> {
        // Fail before touching the filesystem
        self.entry(name)?;

        // Create parent directories if needed
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let file = fs::File::create(output_path).await?;
        let mut writer = BufWriter::new(file);

        match self.extract_to_writer(name, &mut writer, options).await {
            Ok(written) => Ok(written),
            Err(err) => {
                drop(writer);
                if let Err(e) = fs::remove_file(output_path).await {
                    warn!(path = %output_path.display(), "could not remove partial file: {e}");
                }
                Err(err)
            }
        }
    }
}
