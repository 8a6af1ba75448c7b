use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use crate::error::{IngestError, Result};

/// How a feed buffer was classified by signature inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// The buffer carries a ZIP container that must be walked and inflated.
    Container,
    /// The buffer is the document itself (the feed is sometimes published
    /// un-archived).
    RawDocument,
}

/// ZIP compression methods the feed is known to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unsupported(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unsupported(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unsupported(v) => *v,
        }
    }
}

/// End of Central Directory (EOCD) - 22 bytes minimum
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(IngestError::archive("end of central directory truncated"));
        }

        // Verify signature
        if &data[0..4] != Self::SIGNATURE {
            return Err(IngestError::archive(
                "invalid end of central directory signature",
            ));
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            disk_number: cursor.read_u16::<LittleEndian>()?,
            disk_with_cd: cursor.read_u16::<LittleEndian>()?,
            disk_entries: cursor.read_u16::<LittleEndian>()?,
            total_entries: cursor.read_u16::<LittleEndian>()?,
            cd_size: cursor.read_u32::<LittleEndian>()?,
            cd_offset: cursor.read_u32::<LittleEndian>()?,
            comment_len: cursor.read_u16::<LittleEndian>()?,
        })
    }
}

/// Central Directory File Header (CDFH) - 46 bytes minimum
pub const CDFH_SIGNATURE: &[u8] = b"PK\x01\x02";

/// Local File Header (LFH) - 30 bytes
pub const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// Data Descriptor signature, the third marker a ZIP buffer may open with.
pub const DATA_DESCRIPTOR_SIGNATURE: &[u8] = b"PK\x07\x08";

/// One central directory entry, as needed to locate and inflate its payload.
///
/// Produced by [`read_entries`](super::read_entries) in archive order and
/// consumed once; sizes stay `u32` because the feed never ships ZIP64.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub name: String,
    pub method: CompressionMethod,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub local_header_offset: u32,
}

impl ArchiveEntry {
    /// Directory entries end with '/' and carry no payload.
    pub fn is_directory(&self) -> bool {
        self.name.ends_with('/')
    }
}
