//! Low-level ZIP archive parser.
//!
//! This module handles the binary parsing of ZIP file structures,
//! reading from any source that implements the [`RangeFetcher`] trait.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Fetch the archive's tail and find the End of Central Directory (EOCD)
//! 2. If a Zip64 locator precedes it, fetch the Zip64 EOCD record
//! 3. Fetch the Central Directory in one range and decode every entry
//! 4. For extraction, fetch each entry's Local File Header to find its data
//!
//! Every step is a handful of range requests, so listing a remote archive
//! costs a few kilobytes regardless of its size.

use byteorder::{LittleEndian, ReadBytesExt};
use bytes::Bytes;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::error::{Result, ZipError};
use crate::io::RangeFetcher;

use super::structures::*;

/// Extra tail fetched beyond the largest possible comment.
const EOCD_PROBE_SIZE: u64 = 1024;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: u64 = 65535;

const SENTINEL_64: u64 = U32_SENTINEL as u64;

/// The located EOCD plus the Zip64 record it points to, if any
#[derive(Debug, Clone)]
pub struct EocdLocation {
    pub eocd: EndOfCentralDirectory,
    /// Absolute offset of the EOCD signature
    pub offset: u64,
    pub zip64: Option<Zip64EOCD>,
}

/// Decoded central directory
#[derive(Debug, Clone)]
pub struct CentralDirectory {
    pub location: CentralDirectoryLocation,
    /// The directory exactly as fetched
    pub raw: Bytes,
    pub entries: HashMap<String, EntryRecord>,
    pub zip64: bool,
}

/// Low-level ZIP file parser.
///
/// Typically used through [`ZipArchive`](super::ZipArchive) rather than
/// directly.
///
/// ## Example
///
/// ```ignore
/// let parser = ZipParser::new(fetcher);
/// let directory = parser.read_central_directory().await?;
/// for entry in directory.entries.values() {
///     let offset = parser.data_offset(entry).await?;
///     // Fetch compressed data from offset...
/// }
/// ```
pub struct ZipParser<F: RangeFetcher> {
    /// The underlying data source
    fetcher: Arc<F>,
    /// Total size of the archive in bytes
    size: u64,
}

impl<F: RangeFetcher> Clone for ZipParser<F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            size: self.size,
        }
    }
}

impl<F: RangeFetcher> ZipParser<F> {
    pub fn new(fetcher: Arc<F>) -> Self {
        let size = fetcher.size();
        Self { fetcher, size }
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// Fetches the trailing `1024 + 65535 + 22` bytes in a single request and
    /// searches them backwards. When a Zip64 locator sits right before the
    /// EOCD, the Zip64 record it points to is fetched as well.
    ///
    /// # Errors
    ///
    /// Returns [`ZipError::InvalidArchive`] if no EOCD signature is found or
    /// the Zip64 structures are malformed.
    pub async fn find_eocd(&self) -> Result<EocdLocation> {
        if self.size < EndOfCentralDirectory::SIZE as u64 {
            return Err(eocd_not_found());
        }

        let window_len = EOCD_PROBE_SIZE + MAX_COMMENT_SIZE + EndOfCentralDirectory::SIZE as u64;
        let window_start = self.size.saturating_sub(window_len);
        let window = self.fetcher.fetch(window_start, self.size - 1).await?;

        let pos = locate_eocd(&window).ok_or_else(eocd_not_found)?;
        let eocd = EndOfCentralDirectory::from_bytes(&window[pos..pos + EndOfCentralDirectory::SIZE])?;
        let offset = window_start + pos as u64;
        trace!(offset, ?eocd, "found EOCD");

        let zip64 = match zip64_locator_before(&window, pos)? {
            Some(locator) => Some(self.read_zip64_eocd(&locator).await?),
            None => None,
        };

        Ok(EocdLocation {
            eocd,
            offset,
            zip64,
        })
    }

    /// Read the ZIP64 End of Central Directory record.
    ///
    /// The fixed 12-byte prefix is fetched first to learn the record's
    /// declared size, then the whole record.
    pub async fn read_zip64_eocd(&self, locator: &Zip64EOCDLocator) -> Result<Zip64EOCD> {
        let offset = locator.eocd64_offset;
        let prefix_len = Zip64EOCD::PREFIX_SIZE as u64;
        if offset.checked_add(prefix_len).is_none_or(|end| end > self.size) {
            return Err(ZipError::InvalidArchive(format!(
                "Zip64 End of Central Directory offset {offset} is outside the archive"
            )));
        }

        let prefix = self.fetcher.fetch(offset, offset + prefix_len - 1).await?;
        if &prefix[0..4] != Zip64EOCD::SIGNATURE {
            return Err(ZipError::InvalidArchive(
                "invalid Zip64 End of Central Directory signature".to_string(),
            ));
        }
        let declared = Cursor::new(&prefix[4..]).read_u64::<LittleEndian>()?;

        let record_len = declared
            .checked_add(prefix_len)
            .filter(|&len| len >= Zip64EOCD::MIN_SIZE as u64)
            .filter(|&len| offset.checked_add(len).is_some_and(|end| end <= self.size))
            .ok_or_else(|| {
                ZipError::InvalidArchive(format!(
                    "Zip64 End of Central Directory declares an invalid size of {declared}"
                ))
            })?;

        let record = self.fetcher.fetch(offset, offset + record_len - 1).await?;
        Zip64EOCD::from_bytes(&record)
    }

    /// Fetch and decode the whole Central Directory.
    ///
    /// The directory is fetched with a single range request.
    pub async fn read_central_directory(&self) -> Result<CentralDirectory> {
        let eocd = self.find_eocd().await?;
        let location = central_directory_location(&eocd.eocd, eocd.zip64.as_ref())?;

        if location
            .offset
            .checked_add(location.size)
            .is_none_or(|end| end > self.size)
        {
            return Err(ZipError::InvalidArchive(format!(
                "central directory ({} bytes at {}) extends beyond the {}-byte archive",
                location.size, location.offset, self.size
            )));
        }

        let raw = if location.size == 0 {
            Bytes::new()
        } else {
            self.fetcher
                .fetch(location.offset, location.offset + location.size - 1)
                .await?
        };

        let entries = parse_central_directory(&raw)?;
        if entries.len() as u64 != location.total_entries {
            debug!(
                declared = location.total_entries,
                unique = entries.len(),
                "central directory entry count differs from EOCD"
            );
        }

        Ok(CentralDirectory {
            location,
            raw,
            entries,
            zip64: eocd.zip64.is_some(),
        })
    }

    /// Get the actual data offset for a file entry.
    ///
    /// The Local File Header (LFH) has variable-length fields (filename,
    /// extra field) that may differ from the Central Directory entry.
    /// This method reads the LFH to calculate where the actual file
    /// data begins.
    ///
    /// # Errors
    ///
    /// Returns [`ZipError::InvalidLocalHeader`] if the LFH is invalid; this
    /// only concerns the one entry.
    pub async fn data_offset(&self, entry: &EntryRecord) -> Result<u64> {
        let invalid = || ZipError::InvalidLocalHeader {
            name: entry.file_name.clone(),
            offset: entry.lfh_offset,
        };

        let end = entry
            .lfh_offset
            .checked_add(LFH_SIZE as u64 - 1)
            .filter(|&end| end < self.size)
            .ok_or_else(invalid)?;
        let lfh = self.fetcher.fetch(entry.lfh_offset, end).await?;

        // Verify LFH signature (PK\x03\x04)
        if lfh.len() < LFH_SIZE || &lfh[0..4] != LFH_SIGNATURE {
            return Err(invalid());
        }

        // Read the variable field lengths from fixed positions in LFH
        let mut cursor = Cursor::new(&lfh[26..]);
        let file_name_length = u64::from(cursor.read_u16::<LittleEndian>()?);
        let extra_field_length = u64::from(cursor.read_u16::<LittleEndian>()?);

        // Data starts after: LFH (30 bytes) + filename + extra field
        Ok(entry.lfh_offset + LFH_SIZE as u64 + file_name_length + extra_field_length)
    }

    /// Get a reference to the underlying fetcher.
    pub fn fetcher(&self) -> &Arc<F> {
        &self.fetcher
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

fn eocd_not_found() -> ZipError {
    ZipError::InvalidArchive("EOCD not found".to_string())
}

/// Position of the EOCD record inside the archive's tail.
///
/// Only positions leaving room for a complete record are candidates. The
/// right-most candidate whose comment length runs exactly to the end of the
/// window wins; if none does, the right-most candidate is used.
pub fn locate_eocd(window: &[u8]) -> Option<usize> {
    let last = window.len().checked_sub(EndOfCentralDirectory::SIZE)?;
    let mut candidates = (0..=last)
        .rev()
        .filter(|&i| &window[i..i + 4] == EndOfCentralDirectory::SIGNATURE);

    let rightmost = candidates.next()?;
    let exact = |i: usize| {
        let comment_len = usize::from(u16::from_le_bytes([window[i + 20], window[i + 21]]));
        i + EndOfCentralDirectory::SIZE + comment_len == window.len()
    };

    if exact(rightmost) {
        return Some(rightmost);
    }
    Some(candidates.find(|&i| exact(i)).unwrap_or(rightmost))
}

/// Parse the Zip64 locator occupying the 20 bytes before `eocd_pos`, if any.
fn zip64_locator_before(window: &[u8], eocd_pos: usize) -> Result<Option<Zip64EOCDLocator>> {
    let Some(start) = eocd_pos.checked_sub(Zip64EOCDLocator::SIZE) else {
        return Ok(None);
    };
    let bytes = &window[start..eocd_pos];
    if &bytes[0..4] != Zip64EOCDLocator::SIGNATURE {
        return Ok(None);
    }
    Zip64EOCDLocator::from_bytes(bytes).map(Some)
}

/// Resolve the central directory's offset, size and entry count.
///
/// Each EOCD field holding its sentinel is replaced by the Zip64 record's
/// value; fields that are not sentinels are taken from the EOCD as-is.
pub fn central_directory_location(
    eocd: &EndOfCentralDirectory,
    zip64: Option<&Zip64EOCD>,
) -> Result<CentralDirectoryLocation> {
    if !eocd.needs_zip64() {
        return Ok(CentralDirectoryLocation {
            offset: u64::from(eocd.cd_offset),
            size: u64::from(eocd.cd_size),
            total_entries: u64::from(eocd.total_entries),
        });
    }

    let zip64 = zip64.ok_or_else(|| {
        ZipError::InvalidArchive(
            "EOCD uses Zip64 sentinels but no Zip64 End of Central Directory record is present"
                .to_string(),
        )
    })?;

    Ok(CentralDirectoryLocation {
        offset: if eocd.cd_offset == U32_SENTINEL {
            zip64.cd_offset
        } else {
            u64::from(eocd.cd_offset)
        },
        size: if eocd.cd_size == U32_SENTINEL {
            zip64.cd_size
        } else {
            u64::from(eocd.cd_size)
        },
        total_entries: if eocd.total_entries == U16_SENTINEL {
            zip64.total_entries
        } else {
            u64::from(eocd.total_entries)
        },
    })
}

/// Decode every Central Directory File Header in `data`.
///
/// Iteration stops at the first record that does not start with the CDFH
/// signature, so trailing padding is tolerated. Later records replace earlier
/// ones with the same name.
pub fn parse_central_directory(data: &[u8]) -> Result<HashMap<String, EntryRecord>> {
    let mut entries = HashMap::new();
    let mut cursor = Cursor::new(data);

    loop {
        let pos = cursor.position() as usize;
        if data.len() - pos < 4 || &data[pos..pos + 4] != CDFH_SIGNATURE {
            if pos < data.len() {
                trace!(pos, trailing = data.len() - pos, "stopping at non-CDFH bytes");
            }
            break;
        }

        let entry = parse_cdfh(&mut cursor)?;
        if let Some(previous) = entries.insert(entry.file_name.clone(), entry) {
            debug!(name = %previous.file_name, "duplicate entry name, keeping the later record");
        }
    }

    Ok(entries)
}

/// Parse a Central Directory File Header from a cursor.
///
/// The cursor is left positioned at the next record.
fn parse_cdfh(cursor: &mut Cursor<&[u8]>) -> Result<EntryRecord> {
    let data: &[u8] = *cursor.get_ref();
    let record_start = cursor.position() as usize;
    if data.len() - record_start < CDFH_MIN_SIZE {
        return Err(ZipError::InvalidArchive(format!(
            "truncated central directory header at offset {record_start}"
        )));
    }

    // Signature already checked by the caller
    cursor.set_position((record_start + 4) as u64);

    // Read fixed-size header fields
    let _version_made_by = cursor.read_u16::<LittleEndian>()?;
    let _version_needed = cursor.read_u16::<LittleEndian>()?;
    let flags = cursor.read_u16::<LittleEndian>()?;
    let compression_method = cursor.read_u16::<LittleEndian>()?;
    let last_mod_time = cursor.read_u16::<LittleEndian>()?;
    let last_mod_date = cursor.read_u16::<LittleEndian>()?;
    let crc32 = cursor.read_u32::<LittleEndian>()?;
    let compressed_size = cursor.read_u32::<LittleEndian>()?;
    let uncompressed_size = cursor.read_u32::<LittleEndian>()?;
    let file_name_length = usize::from(cursor.read_u16::<LittleEndian>()?);
    let extra_field_length = usize::from(cursor.read_u16::<LittleEndian>()?);
    let file_comment_length = usize::from(cursor.read_u16::<LittleEndian>()?);
    let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
    let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
    let _external_attrs = cursor.read_u32::<LittleEndian>()?;
    let lfh_offset = cursor.read_u32::<LittleEndian>()?;

    let name_start = record_start + CDFH_MIN_SIZE;
    let extra_start = name_start + file_name_length;
    let comment_start = extra_start + extra_field_length;
    let record_end = comment_start + file_comment_length;
    if record_end > data.len() {
        return Err(ZipError::InvalidArchive(format!(
            "central directory header at offset {record_start} overruns the directory"
        )));
    }

    // Use lossy conversion to handle non-UTF8 filenames gracefully
    let file_name = String::from_utf8_lossy(&data[name_start..extra_start]).into_owned();

    let mut fields = Zip64Fields {
        uncompressed_size: u64::from(uncompressed_size),
        compressed_size: u64::from(compressed_size),
        lfh_offset: u64::from(lfh_offset),
    };
    if fields.any_sentinel() {
        apply_zip64_extra(&file_name, &data[extra_start..comment_start], &mut fields)?;
    }

    // Skip over the file comment (we don't use it)
    cursor.set_position(record_end as u64);

    Ok(EntryRecord {
        is_directory: file_name.ends_with('/'),
        file_name,
        compression_method: CompressionMethod::from_u16(compression_method),
        compressed_size: fields.compressed_size,
        uncompressed_size: fields.uncompressed_size,
        crc32,
        lfh_offset: fields.lfh_offset,
        flags,
        last_mod_time,
        last_mod_date,
    })
}

/// The three per-entry values a Zip64 extra field can widen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zip64Fields {
    pub uncompressed_size: u64,
    pub compressed_size: u64,
    pub lfh_offset: u64,
}

impl Zip64Fields {
    fn any_sentinel(&self) -> bool {
        self.uncompressed_size == SENTINEL_64
            || self.compressed_size == SENTINEL_64
            || self.lfh_offset == SENTINEL_64
    }
}

/// Replace sentinel fields with values from the Zip64 extended information
/// extra field (header ID 0x0001).
///
/// Values appear in the fixed order uncompressed size, compressed size,
/// local header offset, and only for fields whose 32-bit value was the
/// sentinel. Non-sentinel fields never consume bytes.
pub fn apply_zip64_extra(name: &str, extra: &[u8], fields: &mut Zip64Fields) -> Result<()> {
    let mut cursor = Cursor::new(extra);

    while cursor.position() + 4 <= extra.len() as u64 {
        let header_id = cursor.read_u16::<LittleEndian>()?;
        let field_size = u64::from(cursor.read_u16::<LittleEndian>()?);
        let body_start = cursor.position();

        if header_id == ZIP64_EXTRA_TAG {
            let body_end = (body_start + field_size).min(extra.len() as u64);
            let mut body = Cursor::new(&extra[body_start as usize..body_end as usize]);

            let slots = [
                (&mut fields.uncompressed_size, "uncompressed size"),
                (&mut fields.compressed_size, "compressed size"),
                (&mut fields.lfh_offset, "local header offset"),
            ];
            for (value, label) in slots {
                if *value == SENTINEL_64 {
                    *value = body.read_u64::<LittleEndian>().map_err(|_| {
                        ZipError::InvalidArchive(format!(
                            "Zip64 extra field of {name} is missing the {label}"
                        ))
                    })?;
                }
            }
            return Ok(());
        }

        // Skip unknown extra fields
        cursor.set_position(body_start + field_size);
    }

    Err(ZipError::InvalidArchive(format!(
        "{name} uses Zip64 sentinels but has no Zip64 extended information field"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cdfh(name: &str, method: u16, sizes: (u32, u32), offset: u32, extra: &[u8]) -> Vec<u8> {
        let mut out = Vec::from(CDFH_SIGNATURE);
        out.extend_from_slice(&20u16.to_le_bytes()); // version made by
        out.extend_from_slice(&20u16.to_le_bytes()); // version needed
        out.extend_from_slice(&0u16.to_le_bytes()); // flags
        out.extend_from_slice(&method.to_le_bytes());
        out.extend_from_slice(&[0, 0, 0, 0]); // mod time/date
        out.extend_from_slice(&0u32.to_le_bytes()); // crc
        out.extend_from_slice(&sizes.0.to_le_bytes()); // compressed
        out.extend_from_slice(&sizes.1.to_le_bytes()); // uncompressed
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&(extra.len() as u16).to_le_bytes());
        out.extend_from_slice(&3u16.to_le_bytes()); // comment len
        out.extend_from_slice(&0u16.to_le_bytes()); // disk start
        out.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
        out.extend_from_slice(&0u32.to_le_bytes()); // external attrs
        out.extend_from_slice(&offset.to_le_bytes());
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(extra);
        out.extend_from_slice(b"cmt");
        out
    }

    fn zip64_extra(values: &[u64]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&ZIP64_EXTRA_TAG.to_le_bytes());
        out.extend_from_slice(&((values.len() * 8) as u16).to_le_bytes());
        for v in values {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out
    }

    fn eocd(comment: &[u8]) -> Vec<u8> {
        let mut out = Vec::from(EndOfCentralDirectory::SIGNATURE);
        out.extend_from_slice(&[0u8; 16]);
        out.extend_from_slice(&(comment.len() as u16).to_le_bytes());
        out.extend_from_slice(comment);
        out
    }

    #[test]
    fn test_parse_names_and_fields() {
        let mut data = cdfh("a.txt", 0, (5, 5), 0, &[]);
        data.extend(cdfh("dir/", 0, (0, 0), 40, &[]));
        data.extend(cdfh("dir/b.bin", 8, (7, 100), 80, &[]));

        let entries = parse_central_directory(&data).unwrap();
        assert_eq!(entries.len(), 3);

        let b = &entries["dir/b.bin"];
        assert_eq!(b.compression_method, CompressionMethod::Deflate);
        assert_eq!(b.compressed_size, 7);
        assert_eq!(b.uncompressed_size, 100);
        assert_eq!(b.lfh_offset, 80);
        assert!(!b.is_directory);
        assert!(entries["dir/"].is_directory);
    }

    #[test]
    fn test_trailing_padding_stops_iteration() {
        let mut data = cdfh("a.txt", 0, (5, 5), 0, &[]);
        data.extend_from_slice(&[0u8; 37]);
        data.extend(cdfh("hidden.txt", 0, (5, 5), 0, &[]));

        let entries = parse_central_directory(&data).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key("a.txt"));
    }

    #[test]
    fn test_duplicate_names_last_wins() {
        let mut data = cdfh("same.txt", 0, (1, 1), 0, &[]);
        data.extend(cdfh("same.txt", 0, (2, 2), 99, &[]));

        let entries = parse_central_directory(&data).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries["same.txt"].lfh_offset, 99);
    }

    #[test]
    fn test_invalid_utf8_name_is_replaced() {
        let mut data = cdfh("x", 0, (0, 0), 0, &[]);
        // Patch the single name byte with an invalid UTF-8 lead byte
        data[CDFH_MIN_SIZE] = 0xFF;

        let entries = parse_central_directory(&data).unwrap();
        assert!(entries.contains_key("\u{FFFD}"));
    }

    #[test]
    fn test_overrunning_record_is_rejected() {
        let data = cdfh("a.txt", 0, (5, 5), 0, &[]);
        let truncated = &data[..data.len() - 2];
        assert!(matches!(
            parse_central_directory(truncated),
            Err(ZipError::InvalidArchive(_))
        ));
        assert!(parse_central_directory(&data[..20]).is_err());
    }

    #[test]
    fn test_zip64_widening_order() {
        let extra = zip64_extra(&[1 << 40, 1 << 33, 1 << 35]);
        let data = cdfh("big.bin", 8, (U32_SENTINEL, U32_SENTINEL), U32_SENTINEL, &extra);

        let entries = parse_central_directory(&data).unwrap();
        let big = &entries["big.bin"];
        assert_eq!(big.uncompressed_size, 1 << 40);
        assert_eq!(big.compressed_size, 1 << 33);
        assert_eq!(big.lfh_offset, 1 << 35);
    }

    #[test]
    fn test_zip64_offset_only() {
        // Only the offset is a sentinel, so the first 8 bytes belong to it
        let mut extra = vec![0x0a, 0x00, 0x04, 0x00, 1, 2, 3, 4]; // unrelated field first
        extra.extend(zip64_extra(&[5 << 32]));
        let data = cdfh("far.txt", 0, (10, 10), U32_SENTINEL, &extra);

        let entries = parse_central_directory(&data).unwrap();
        let far = &entries["far.txt"];
        assert_eq!(far.lfh_offset, 5 << 32);
        assert_eq!(far.compressed_size, 10);
        assert_eq!(far.uncompressed_size, 10);
    }

    #[test]
    fn test_zip64_sentinel_without_extra() {
        let data = cdfh("big.bin", 0, (U32_SENTINEL, 10), 0, &[]);
        assert!(matches!(
            parse_central_directory(&data),
            Err(ZipError::InvalidArchive(_))
        ));

        let short = zip64_extra(&[]);
        let data = cdfh("big.bin", 0, (U32_SENTINEL, 10), 0, &short);
        assert!(parse_central_directory(&data).is_err());
    }

    proptest! {
        #[test]
        fn prop_zip64_fields_only_consumed_for_sentinels(
            sentinel in proptest::array::uniform3(any::<bool>()),
            narrow in proptest::array::uniform3(0u32..U32_SENTINEL),
            wide in proptest::array::uniform3(any::<u64>()),
            trailing in proptest::collection::vec(any::<u64>(), 0..3),
        ) {
            let mut fields = Zip64Fields {
                uncompressed_size: if sentinel[0] { SENTINEL_64 } else { u64::from(narrow[0]) },
                compressed_size: if sentinel[1] { SENTINEL_64 } else { u64::from(narrow[1]) },
                lfh_offset: if sentinel[2] { SENTINEL_64 } else { u64::from(narrow[2]) },
            };

            // Present values only for sentinel fields, then unrelated trailing words
            let mut values: Vec<u64> = (0..3).filter(|&i| sentinel[i]).map(|i| wide[i]).collect();
            values.extend(&trailing);

            let mut extra = zip64_extra(&values);
            extra.extend_from_slice(&[0x99, 0x99, 0x00, 0x00]);

            apply_zip64_extra("entry", &extra, &mut fields).unwrap();

            let expect = |i: usize| if sentinel[i] { wide[i] } else { u64::from(narrow[i]) };
            prop_assert_eq!(fields.uncompressed_size, expect(0));
            prop_assert_eq!(fields.compressed_size, expect(1));
            prop_assert_eq!(fields.lfh_offset, expect(2));
        }
    }

    #[test]
    fn test_locate_eocd_without_comment() {
        let mut window = vec![0u8; 100];
        window.extend(eocd(b""));
        assert_eq!(locate_eocd(&window), Some(100));
    }

    #[test]
    fn test_locate_eocd_skips_signature_inside_comment() {
        let mut window = vec![0u8; 10];
        // The comment itself contains a complete-looking EOCD
        let mut comment = vec![b'#'; 4];
        comment.extend(eocd(b""));
        comment.extend_from_slice(b"tail");
        window.extend(eocd(&comment));

        assert_eq!(locate_eocd(&window), Some(10));
    }

    #[test]
    fn test_locate_eocd_rightmost_fallback() {
        // Trailing garbage after the record breaks the comment length check
        let mut window = eocd(b"");
        window.extend_from_slice(&[0u8; 30]);
        assert_eq!(locate_eocd(&window), Some(0));
    }

    #[test]
    fn test_locate_eocd_missing() {
        assert_eq!(locate_eocd(&[0u8; 200]), None);
        assert_eq!(locate_eocd(b"PK\x05\x06"), None);
    }

    #[test]
    fn test_location_uses_zip64_only_for_sentinels() {
        let eocd = EndOfCentralDirectory {
            disk_number: 0,
            disk_with_cd: 0,
            disk_entries: 4,
            total_entries: 4,
            cd_size: 300,
            cd_offset: U32_SENTINEL,
            comment_len: 0,
        };
        let zip64 = Zip64EOCD {
            eocd64_size: 44,
            version_made_by: 45,
            version_needed: 45,
            disk_number: 0,
            disk_with_cd: 0,
            disk_entries: 999,
            total_entries: 999,
            cd_size: 999,
            cd_offset: 1 << 33,
        };

        let location = central_directory_location(&eocd, Some(&zip64)).unwrap();
        assert_eq!(location.offset, 1 << 33);
        assert_eq!(location.size, 300);
        assert_eq!(location.total_entries, 4);

        assert!(matches!(
            central_directory_location(&eocd, None),
            Err(ZipError::InvalidArchive(_))
        ));
    }
}
