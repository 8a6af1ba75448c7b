//! Pipeline orchestrator: raw feed bytes in, typed station records out.

use tracing::debug;

use crate::archive::{
    ArchiveEntry, PayloadKind, classify, decompress, find_eocd, payload_slice, read_entries,
};
use crate::error::{IngestError, Result};
use crate::feed::{StationRecord, decode_stations};

/// Run the whole ingestion pipeline on one feed buffer.
///
/// Classifies the buffer first: a ZIP container is walked (EOCD, central
/// directory, local header, inflation) to obtain the document; a bare
/// document is decoded directly. Synchronous and CPU-bound: callers that
/// must stay responsive should dispatch this onto a worker thread and keep
/// only the result.
///
/// # Errors
///
/// The first failure encountered, tagged with the stage that produced it
/// ([`IngestError::stage`]). Success is all-or-nothing: a complete record
/// list or one error, never both.
pub fn ingest(buffer: &[u8]) -> Result<Vec<StationRecord>> {
    match classify(buffer) {
        PayloadKind::Container => {
            let eocd_offset = find_eocd(buffer)?;
            let entries = read_entries(buffer, eocd_offset)?;
            let entry = select_entry(&entries)?;
            debug!(
                entry = %entry.name,
                method = entry.method.as_u16(),
                compressed = entry.compressed_size,
                uncompressed = entry.uncompressed_size,
                "extracting feed document from container"
            );
            let raw = payload_slice(buffer, entry)?;
            let document = decompress(raw, entry.method, entry.uncompressed_size)?;
            decode_stations(&document)
        }
        PayloadKind::RawDocument => decode_stations(buffer),
    }
}

/// Pick the entry holding the feed document.
///
/// Prefers the first entry named `*.xml` (case-insensitive); otherwise the
/// first entry that is not a directory.
fn select_entry(entries: &[ArchiveEntry]) -> Result<&ArchiveEntry> {
    entries
        .iter()
        .find(|e| e.name.to_ascii_lowercase().ends_with(".xml"))
        .or_else(|| entries.iter().find(|e| !e.is_directory()))
        .ok_or_else(|| IngestError::archive("no extractable entry"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::CompressionMethod;

    fn entry(name: &str) -> ArchiveEntry {
        ArchiveEntry {
            name: name.to_string(),
            method: CompressionMethod::Stored,
            compressed_size: 0,
            uncompressed_size: 0,
            local_header_offset: 0,
        }
    }

    #[test]
    fn select_prefers_xml_entry() {
        let entries = vec![entry("lisez-moi.txt"), entry("PrixCarburants.XML")];
        assert_eq!(select_entry(&entries).unwrap().name, "PrixCarburants.XML");
    }

    #[test]
    fn select_falls_back_to_first_file() {
        let entries = vec![entry("data/"), entry("instantane.dat")];
        assert_eq!(select_entry(&entries).unwrap().name, "instantane.dat");
    }

    #[test]
    fn select_fails_on_empty_archive() {
        let err = select_entry(&[]).unwrap_err();
        assert!(matches!(err, IngestError::ArchiveMalformed(_)));
    }
}
