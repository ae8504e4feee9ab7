//! Shared helpers for the integration tests: an in-memory ZIP writer.

#![allow(dead_code)]

use flate2::Compression;
use flate2::write::DeflateEncoder;
use std::io::Write;

/// 2024-01-15
pub const MOD_DATE: u16 = (44 << 9) | (1 << 5) | 15;
/// 12:30:00
pub const MOD_TIME: u16 = (12 << 11) | (30 << 5);

const SENTINEL_32: u32 = 0xFFFF_FFFF;
const SENTINEL_16: u16 = 0xFFFF;

struct TestEntry {
    name: String,
    method: u16,
    flags: u16,
    payload: Vec<u8>,
    crc32: u32,
    uncompressed_size: u64,
}

/// Builds ZIP archives byte by byte
#[derive(Default)]
pub struct ZipBuilder {
    entries: Vec<TestEntry>,
    comment: Vec<u8>,
    zip64: bool,
    pad_to: Option<usize>,
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(mut self, name: &str, data: &[u8]) -> Self {
        self.entries.push(TestEntry {
            name: name.to_string(),
            method: 0,
            flags: 0,
            payload: data.to_vec(),
            crc32: crc32fast::hash(data),
            uncompressed_size: data.len() as u64,
        });
        self
    }

    pub fn deflated(mut self, name: &str, data: &[u8]) -> Self {
        self.entries.push(TestEntry {
            name: name.to_string(),
            method: 8,
            flags: 0,
            payload: deflate(data),
            crc32: crc32fast::hash(data),
            uncompressed_size: data.len() as u64,
        });
        self
    }

    pub fn directory(self, name: &str) -> Self {
        self.stored(name, b"")
    }

    /// An entry with arbitrary method, flags and payload
    pub fn raw(mut self, name: &str, method: u16, flags: u16, payload: &[u8], plain: &[u8]) -> Self {
        self.entries.push(TestEntry {
            name: name.to_string(),
            method,
            flags,
            payload: payload.to_vec(),
            crc32: crc32fast::hash(plain),
            uncompressed_size: plain.len() as u64,
        });
        self
    }

    pub fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    /// Write every size and offset through Zip64 structures
    pub fn zip64(mut self) -> Self {
        self.zip64 = true;
        self
    }

    /// Prepend filler so the archive is exactly `len` bytes long
    pub fn pad_to(mut self, len: usize) -> Self {
        self.pad_to = Some(len);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let prefix = match self.pad_to {
            Some(len) => {
                let natural = self.layout(0).len();
                assert!(natural <= len, "archive needs {natural} bytes, more than {len}");
                len - natural
            }
            None => 0,
        };
        self.layout(prefix)
    }

    fn layout(&self, prefix: usize) -> Vec<u8> {
        let mut out = vec![0u8; prefix];
        let version: u16 = if self.zip64 { 45 } else { 20 };

        let mut offsets = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            offsets.push(out.len() as u64);

            let extra = if self.zip64 {
                let mut extra = Vec::new();
                extra.extend_from_slice(&1u16.to_le_bytes());
                extra.extend_from_slice(&16u16.to_le_bytes());
                extra.extend_from_slice(&entry.uncompressed_size.to_le_bytes());
                extra.extend_from_slice(&(entry.payload.len() as u64).to_le_bytes());
                extra
            } else {
                Vec::new()
            };

            out.extend_from_slice(b"PK\x03\x04");
            out.extend_from_slice(&version.to_le_bytes());
            out.extend_from_slice(&entry.flags.to_le_bytes());
            out.extend_from_slice(&entry.method.to_le_bytes());
            out.extend_from_slice(&MOD_TIME.to_le_bytes());
            out.extend_from_slice(&MOD_DATE.to_le_bytes());
            out.extend_from_slice(&entry.crc32.to_le_bytes());
            if self.zip64 {
                out.extend_from_slice(&SENTINEL_32.to_le_bytes());
                out.extend_from_slice(&SENTINEL_32.to_le_bytes());
            } else {
                out.extend_from_slice(&(entry.payload.len() as u32).to_le_bytes());
                out.extend_from_slice(&(entry.uncompressed_size as u32).to_le_bytes());
            }
            out.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
            out.extend_from_slice(&(extra.len() as u16).to_le_bytes());
            out.extend_from_slice(entry.name.as_bytes());
            out.extend_from_slice(&extra);
            out.extend_from_slice(&entry.payload);
        }

        let cd_offset = out.len() as u64;
        for (entry, &offset) in self.entries.iter().zip(&offsets) {
            let extra = if self.zip64 {
                let mut extra = Vec::new();
                extra.extend_from_slice(&1u16.to_le_bytes());
                extra.extend_from_slice(&24u16.to_le_bytes());
                extra.extend_from_slice(&entry.uncompressed_size.to_le_bytes());
                extra.extend_from_slice(&(entry.payload.len() as u64).to_le_bytes());
                extra.extend_from_slice(&offset.to_le_bytes());
                extra
            } else {
                Vec::new()
            };

            out.extend_from_slice(b"PK\x01\x02");
            out.extend_from_slice(&version.to_le_bytes()); // version made by
            out.extend_from_slice(&version.to_le_bytes()); // version needed
            out.extend_from_slice(&entry.flags.to_le_bytes());
            out.extend_from_slice(&entry.method.to_le_bytes());
            out.extend_from_slice(&MOD_TIME.to_le_bytes());
            out.extend_from_slice(&MOD_DATE.to_le_bytes());
            out.extend_from_slice(&entry.crc32.to_le_bytes());
            if self.zip64 {
                out.extend_from_slice(&SENTINEL_32.to_le_bytes());
                out.extend_from_slice(&SENTINEL_32.to_le_bytes());
            } else {
                out.extend_from_slice(&(entry.payload.len() as u32).to_le_bytes());
                out.extend_from_slice(&(entry.uncompressed_size as u32).to_le_bytes());
            }
            out.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
            out.extend_from_slice(&(extra.len() as u16).to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes()); // comment len
            out.extend_from_slice(&0u16.to_le_bytes()); // disk start
            out.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
            out.extend_from_slice(&0u32.to_le_bytes()); // external attrs
            if self.zip64 {
                out.extend_from_slice(&SENTINEL_32.to_le_bytes());
            } else {
                out.extend_from_slice(&(offset as u32).to_le_bytes());
            }
            out.extend_from_slice(entry.name.as_bytes());
            out.extend_from_slice(&extra);
        }
        let cd_size = out.len() as u64 - cd_offset;
        let count = self.entries.len() as u64;

        if self.zip64 {
            let eocd64_offset = out.len() as u64;
            out.extend_from_slice(b"PK\x06\x06");
            out.extend_from_slice(&44u64.to_le_bytes());
            out.extend_from_slice(&45u16.to_le_bytes());
            out.extend_from_slice(&45u16.to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&count.to_le_bytes());
            out.extend_from_slice(&count.to_le_bytes());
            out.extend_from_slice(&cd_size.to_le_bytes());
            out.extend_from_slice(&cd_offset.to_le_bytes());

            out.extend_from_slice(b"PK\x06\x07");
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&eocd64_offset.to_le_bytes());
            out.extend_from_slice(&1u32.to_le_bytes());
        }

        out.extend_from_slice(b"PK\x05\x06");
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        if self.zip64 {
            out.extend_from_slice(&SENTINEL_16.to_le_bytes());
            out.extend_from_slice(&SENTINEL_16.to_le_bytes());
            out.extend_from_slice(&SENTINEL_32.to_le_bytes());
            out.extend_from_slice(&SENTINEL_32.to_le_bytes());
        } else {
            out.extend_from_slice(&(count as u16).to_le_bytes());
            out.extend_from_slice(&(count as u16).to_le_bytes());
            out.extend_from_slice(&(cd_size as u32).to_le_bytes());
            out.extend_from_slice(&(cd_offset as u32).to_le_bytes());
        }
        out.extend_from_slice(&(self.comment.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.comment);

        out
    }
}

pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Deterministic pseudo-random text over a four-letter alphabet
pub fn letters(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            b"ACGT"[((state >> 16) & 3) as usize]
        })
        .collect()
}

/// Archive with `x.txt` (stored) and `y/z.bin` (deflated), padded to 1 MiB
pub fn sample_archive() -> Vec<u8> {
    ZipBuilder::new()
        .stored("x.txt", b"helloworld")
        .deflated("y/z.bin", &letters(2_000_000, 42))
        .pad_to(1_048_576)
        .build()
}
