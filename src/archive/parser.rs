//! Low-level ZIP container parser.
//!
//! This module handles the binary parsing of the ZIP structures the feed
//! publisher wraps its document in, working over a fully materialized,
//! untrusted byte buffer.
//!
//! ## Parsing Strategy
//!
//! ZIP containers are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) near the buffer's end
//! 2. Read the Central Directory to get metadata for all entries
//! 3. For extraction, validate an entry's Local File Header and slice its
//!    payload
//!
//! The EOCD may be followed by a comment of up to 65535 bytes, so it cannot
//! be computed from the buffer length alone; it is located by a bounded
//! backward scan. Length fields are never trusted without checking them
//! against the buffer's actual size first.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

use crate::error::{IngestError, Result};

use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This bounds the backward search window when looking for the EOCD.
const MAX_COMMENT_SIZE: usize = 65535;

/// Classify a feed buffer by signature inspection.
///
/// A buffer opening with any of the three ZIP markers (local file header,
/// EOCD of an empty archive, data descriptor) is a container; anything else
/// is taken to be the bare document. There is no failure mode: the feed is
/// legitimately published un-archived at times.
pub fn classify(buffer: &[u8]) -> PayloadKind {
    if buffer.len() < 4 {
        return PayloadKind::RawDocument;
    }

    match &buffer[0..4] {
        sig if sig == LFH_SIGNATURE
            || sig == EndOfCentralDirectory::SIGNATURE
            || sig == DATA_DESCRIPTOR_SIGNATURE =>
        {
            PayloadKind::Container
        }
        _ => PayloadKind::RawDocument,
    }
}

/// Find the End of Central Directory record.
///
/// Scans backward from `len - 22` through the maximum comment window,
/// testing each candidate offset's leading four bytes against the EOCD
/// signature. The first (closest-to-end) match wins.
///
/// # Errors
///
/// [`IngestError::ArchiveMalformed`] if the buffer is shorter than a minimal
/// EOCD or no signature is found in the window.
pub fn find_eocd(buffer: &[u8]) -> Result<usize> {
    if buffer.len() < EndOfCentralDirectory::SIZE {
        return Err(IngestError::archive(
            "buffer too small to hold an end of central directory record",
        ));
    }

    let top = buffer.len() - EndOfCentralDirectory::SIZE;
    let bottom = top.saturating_sub(MAX_COMMENT_SIZE);

    for offset in (bottom..=top).rev() {
        if &buffer[offset..offset + 4] == EndOfCentralDirectory::SIGNATURE {
            return Ok(offset);
        }
    }

    Err(IngestError::archive("end of central directory not found"))
}

/// Read all central directory entries declared by the EOCD at `eocd_offset`.
///
/// Entry order is preserved as encountered. Either every declared entry
/// parses or the whole read fails; a partial list is never returned.
///
/// # Errors
///
/// [`IngestError::ArchiveMalformed`] on a signature mismatch or any offset
/// arithmetic that would read past the buffer's end.
pub fn read_entries(buffer: &[u8], eocd_offset: usize) -> Result<Vec<ArchiveEntry>> {
    let eocd_bytes = buffer
        .get(eocd_offset..)
        .ok_or_else(|| IngestError::archive("end of central directory offset past buffer"))?;
    let eocd = EndOfCentralDirectory::from_bytes(eocd_bytes)?;

    let cd_start = eocd.cd_offset as usize;
    let cd_data = buffer.get(cd_start..).ok_or_else(|| {
        IngestError::archive("central directory offset past end of buffer")
    })?;

    let mut entries = Vec::with_capacity(eocd.total_entries as usize);
    let mut cursor = Cursor::new(cd_data);

    for _ in 0..eocd.total_entries {
        let entry = parse_entry(&mut cursor)?;
        entries.push(entry);
    }

    Ok(entries)
}

/// Parse one Central Directory File Header from a cursor.
///
/// Fixed fields are read sequentially from their defined positions; the
/// variable-length name is kept, extra field and comment are skipped after
/// checking their declared lengths stay inside the buffer.
fn parse_entry(cursor: &mut Cursor<&[u8]>) -> Result<ArchiveEntry> {
    // Read and verify the signature (PK\x01\x02)
    let mut sig = [0u8; 4];
    cursor.read_exact(&mut sig)?;
    if sig != CDFH_SIGNATURE {
        return Err(IngestError::archive(
            "invalid central directory entry signature",
        ));
    }

    // Fixed-size header fields, little-endian
    let _version_made_by = cursor.read_u16::<LittleEndian>()?;
    let _version_needed = cursor.read_u16::<LittleEndian>()?;
    let _flags = cursor.read_u16::<LittleEndian>()?;
    let method = cursor.read_u16::<LittleEndian>()?;
    let _last_mod_time = cursor.read_u16::<LittleEndian>()?;
    let _last_mod_date = cursor.read_u16::<LittleEndian>()?;
    let _crc32 = cursor.read_u32::<LittleEndian>()?;
    let compressed_size = cursor.read_u32::<LittleEndian>()?;
    let uncompressed_size = cursor.read_u32::<LittleEndian>()?;
    let name_len = cursor.read_u16::<LittleEndian>()?;
    let extra_len = cursor.read_u16::<LittleEndian>()?;
    let comment_len = cursor.read_u16::<LittleEndian>()?;
    let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
    let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
    let _external_attrs = cursor.read_u32::<LittleEndian>()?;
    let local_header_offset = cursor.read_u32::<LittleEndian>()?;

    // Variable-length entry name; lossy conversion tolerates non-UTF8 names
    let mut name_bytes = vec![0u8; name_len as usize];
    cursor.read_exact(&mut name_bytes)?;
    let name = String::from_utf8_lossy(&name_bytes).to_string();

    // Skip extra field and comment. The declared lengths are untrusted, so
    // the skip is validated against the buffer rather than applied blindly.
    let skip = extra_len as u64 + comment_len as u64;
    let next = cursor.position() + skip;
    if next > cursor.get_ref().len() as u64 {
        return Err(IngestError::archive(
            "central directory entry overruns buffer",
        ));
    }
    cursor.set_position(next);

    Ok(ArchiveEntry {
        name,
        method: CompressionMethod::from_u16(method),
        compressed_size,
        uncompressed_size,
        local_header_offset,
    })
}

/// Locate an entry's raw (still possibly compressed) payload bytes.
///
/// The Local File Header has its own copies of the variable-length fields
/// (filename, extra field), which may differ from the central directory's.
/// The header at `entry.local_header_offset` is validated and its lengths
/// read to find where the payload actually starts.
///
/// # Errors
///
/// [`IngestError::ArchiveMalformed`] if the header or the
/// `compressed_size`-byte payload falls outside the buffer, or the header
/// signature does not match.
pub fn payload_slice<'a>(buffer: &'a [u8], entry: &ArchiveEntry) -> Result<&'a [u8]> {
    let offset = entry.local_header_offset as usize;
    let header_end = offset
        .checked_add(LFH_SIZE)
        .filter(|&end| end <= buffer.len())
        .ok_or_else(|| {
            IngestError::archive(format!(
                "local header for '{}' past end of buffer",
                entry.name
            ))
        })?;
    let header = &buffer[offset..header_end];

    // Verify LFH signature (PK\x03\x04)
    if &header[0..4] != LFH_SIGNATURE {
        return Err(IngestError::archive(format!(
            "invalid local header signature for '{}'",
            entry.name
        )));
    }

    // Read the variable field lengths from fixed positions in the LFH
    let mut cursor = Cursor::new(header);
    cursor.set_position(26); // Offset to filename length field

    let name_len = cursor.read_u16::<LittleEndian>()? as usize;
    let extra_len = cursor.read_u16::<LittleEndian>()? as usize;

    // Payload starts after: LFH (30 bytes) + filename + extra field
    let data_start = header_end
        .checked_add(name_len)
        .and_then(|s| s.checked_add(extra_len))
        .ok_or_else(|| IngestError::archive("local header lengths overflow"))?;
    let data_end = data_start
        .checked_add(entry.compressed_size as usize)
        .filter(|&end| end <= buffer.len())
        .ok_or_else(|| {
            IngestError::archive(format!("payload for '{}' past end of buffer", entry.name))
        })?;

    Ok(&buffer[data_start..data_end])
}
