//! Reconciled page file format
//!
//! Pages are named `page-NNNNNN.nsp` where NNNNNN is the zero-padded
//! generation. Each page has a 32-byte header, the entries in strictly
//! increasing key order, and a CRC32 over everything before it.
//!
//! # File Structure
//!
//! ```text
//! +------------------+ 0
//! | PageHeader       | 32 bytes
//! +------------------+ 32
//! | Entry 1          | key_len u32 | key | version_count u32 |
//! |                  |   (commit_ts u64 | tag u8 | value_len u32 | value) * V
//! +------------------+
//! | ...              |
//! +------------------+
//! | Footer CRC32     | 4 bytes
//! +------------------+
//! ```
//!
//! All integers are little endian. Versions are written newest first.

use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use nearseek_core::{Error, Key, Payload, Result, Timestamp, Version, VersionChain};

/// Magic bytes: "NSPG"
pub const PAGE_MAGIC: [u8; 4] = *b"NSPG";

/// Page format version for forward compatibility
pub const PAGE_FORMAT_VERSION: u32 = 1;

/// Page header size in bytes
pub const PAGE_HEADER_SIZE: usize = 32;

const FOOTER_SIZE: usize = 4;

/// Payload tags
pub mod payload_tags {
    /// Stored value
    pub const VALUE: u8 = 0x01;
    /// Delete marker
    pub const TOMBSTONE: u8 = 0x02;
}

/// Page header (32 bytes, the last 8 reserved and zero)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHeader {
    /// `NSPG`
    pub magic: [u8; 4],
    /// Format the page was written in
    pub format_version: u32,
    /// Page generation, one higher per eviction
    pub generation: u64,
    /// Number of key entries that follow
    pub entry_count: u64,
}

impl PageHeader {
    /// Header for a page of the current format
    pub fn new(generation: u64, entry_count: u64) -> Self {
        PageHeader {
            magic: PAGE_MAGIC,
            format_version: PAGE_FORMAT_VERSION,
            generation,
            entry_count,
        }
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> io::Result<()> {
        buf.extend_from_slice(&self.magic);
        buf.write_u32::<LittleEndian>(self.format_version)?;
        buf.write_u64::<LittleEndian>(self.generation)?;
        buf.write_u64::<LittleEndian>(self.entry_count)?;
        buf.extend_from_slice(&[0u8; 8]);
        Ok(())
    }

    fn read_from(reader: &mut impl Read) -> io::Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        let format_version = reader.read_u32::<LittleEndian>()?;
        let generation = reader.read_u64::<LittleEndian>()?;
        let entry_count = reader.read_u64::<LittleEndian>()?;
        let mut reserved = [0u8; 8];
        reader.read_exact(&mut reserved)?;
        Ok(PageHeader {
            magic,
            format_version,
            generation,
            entry_count,
        })
    }

    /// Reject foreign files and formats newer than this build reads
    pub fn check(&self) -> std::result::Result<(), PageHeaderError> {
        if self.magic != PAGE_MAGIC {
            return Err(PageHeaderError::NotAPage(self.magic));
        }
        if self.format_version > PAGE_FORMAT_VERSION {
            return Err(PageHeaderError::NewerFormat(self.format_version));
        }
        Ok(())
    }
}

/// Why a page header was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageHeaderError {
    /// Magic bytes are not `NSPG`
    #[error("not a page file (magic {0:?})")]
    NotAPage([u8; 4]),
    /// Written by a newer format version
    #[error("page format {0} is newer than this build reads")]
    NewerFormat(u32),
}

// ============================================================================
// Encoding
// ============================================================================

fn len_u32(what: &str, len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        Error::InvalidOperation(format!("{} of {} bytes does not fit in a page entry", what, len))
    })
}

/// Encode entries into a complete page image
///
/// Entries must already be in strictly increasing key order.
///
/// # Errors
///
/// `InvalidOperation` if a key, value or chain length overflows `u32`.
pub fn encode_page(generation: u64, entries: &[(Key, VersionChain)]) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(PAGE_HEADER_SIZE + FOOTER_SIZE + entries.len() * 32);
    PageHeader::new(generation, entries.len() as u64).write_to(&mut buf)?;

    for (key, chain) in entries {
        buf.write_u32::<LittleEndian>(len_u32("key", key.len())?)?;
        buf.extend_from_slice(key.as_bytes());
        buf.write_u32::<LittleEndian>(len_u32("version chain", chain.len())?)?;
        for version in chain.iter() {
            buf.write_u64::<LittleEndian>(version.commit_ts.as_u64())?;
            match &version.payload {
                Payload::Value(value) => {
                    buf.write_u8(payload_tags::VALUE)?;
                    buf.write_u32::<LittleEndian>(len_u32("value", value.len())?)?;
                    buf.extend_from_slice(value);
                }
                Payload::Tombstone => {
                    buf.write_u8(payload_tags::TOMBSTONE)?;
                    buf.write_u32::<LittleEndian>(0)?;
                }
            }
        }
    }

    let crc = crc32fast::hash(&buf);
    buf.write_u32::<LittleEndian>(crc)?;
    Ok(buf)
}

// ============================================================================
// Decoding
// ============================================================================

fn truncated(e: io::Error) -> Error {
    Error::corruption(format!("truncated page entry: {}", e))
}

fn read_bytes(cursor: &mut Cursor<&[u8]>, len: usize) -> Result<Vec<u8>> {
    let remaining = cursor.get_ref().len() as u64 - cursor.position();
    if len as u64 > remaining {
        return Err(Error::corruption(format!(
            "length {} exceeds remaining {} bytes",
            len, remaining
        )));
    }
    let mut bytes = vec![0u8; len];
    cursor.read_exact(&mut bytes).map_err(truncated)?;
    Ok(bytes)
}

fn read_version(cursor: &mut Cursor<&[u8]>) -> Result<Version> {
    let commit_ts = cursor.read_u64::<LittleEndian>().map_err(truncated)?;
    let tag = cursor.read_u8().map_err(truncated)?;
    let value_len = cursor.read_u32::<LittleEndian>().map_err(truncated)? as usize;
    let payload = match tag {
        payload_tags::VALUE => Payload::Value(read_bytes(cursor, value_len)?),
        payload_tags::TOMBSTONE if value_len == 0 => Payload::Tombstone,
        payload_tags::TOMBSTONE => {
            return Err(Error::corruption("tombstone carries a value"));
        }
        other => {
            return Err(Error::corruption(format!("unknown payload tag 0x{:02x}", other)));
        }
    };
    Ok(Version::new(Timestamp::new(commit_ts), payload))
}

/// Decode and verify a complete page image
///
/// # Errors
///
/// Every structural problem is reported as `StorageFault::Corruption`:
/// short image, CRC mismatch, bad header, truncated entries, unknown tags,
/// keys out of order, out-of-order chains or trailing bytes.
pub fn decode_page(bytes: &[u8]) -> Result<(PageHeader, Vec<(Key, VersionChain)>)> {
    if bytes.len() < PAGE_HEADER_SIZE + FOOTER_SIZE {
        return Err(Error::corruption(format!(
            "page image of {} bytes is shorter than header and footer",
            bytes.len()
        )));
    }
    let (body, mut footer) = bytes.split_at(bytes.len() - FOOTER_SIZE);
    let stored_crc = footer.read_u32::<LittleEndian>().map_err(truncated)?;
    let actual_crc = crc32fast::hash(body);
    if stored_crc != actual_crc {
        return Err(Error::corruption(format!(
            "page CRC mismatch: stored {:08x}, computed {:08x}",
            stored_crc, actual_crc
        )));
    }

    let mut cursor = Cursor::new(body);
    let header = PageHeader::read_from(&mut cursor).map_err(truncated)?;
    header
        .check()
        .map_err(|e| Error::corruption(e.to_string()))?;

    let mut entries: Vec<(Key, VersionChain)> =
        Vec::with_capacity(header.entry_count.min(4096) as usize);

    for _ in 0..header.entry_count {
        let key_len = cursor.read_u32::<LittleEndian>().map_err(truncated)? as usize;
        let key = Key::new(read_bytes(&mut cursor, key_len)?);
        if let Some((prev, _)) = entries.last() {
            if *prev >= key {
                return Err(Error::corruption(format!(
                    "page keys out of order: {} then {}",
                    prev, key
                )));
            }
        }

        let version_count = cursor.read_u32::<LittleEndian>().map_err(truncated)?;
        if version_count == 0 {
            return Err(Error::corruption(format!("key {} has no versions", key)));
        }
        let mut versions = Vec::with_capacity(version_count.min(64) as usize);
        for _ in 0..version_count {
            versions.push(read_version(&mut cursor)?);
        }
        let chain = VersionChain::from_newest_first(versions)
            .map_err(|e| Error::corruption(format!("key {}: {}", key, e)))?;
        entries.push((key, chain));
    }

    if cursor.position() != cursor.get_ref().len() as u64 {
        return Err(Error::corruption("trailing bytes after last page entry"));
    }

    Ok((header, entries))
}

// ============================================================================
// File naming
// ============================================================================

const PAGE_PREFIX: &str = "page-";
const PAGE_EXTENSION: &str = "nsp";

/// `dir/page-NNNNNN.nsp`
pub fn page_path(dir: &Path, generation: u64) -> PathBuf {
    dir.join(format!("{}{:06}.{}", PAGE_PREFIX, generation, PAGE_EXTENSION))
}

fn page_generation(path: &Path) -> Option<u64> {
    if path.extension()? != PAGE_EXTENSION {
        return None;
    }
    path.file_stem()?
        .to_str()?
        .strip_prefix(PAGE_PREFIX)?
        .parse()
        .ok()
}

/// Newest page file in `dir`
///
/// Temporary files and anything else that is not named like a page are
/// skipped.
pub fn find_latest_page(dir: &Path) -> io::Result<Option<(u64, PathBuf)>> {
    let mut latest: Option<(u64, PathBuf)> = None;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(generation) = page_generation(&path) else {
            continue;
        };
        if latest.as_ref().map_or(true, |(newest, _)| generation > *newest) {
            latest = Some((generation, path));
        }
    }
    Ok(latest)
}
