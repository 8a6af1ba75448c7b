//! End-to-end tests for the ingestion pipeline.
//!
//! Archives are built by hand with the same binary layout the parser reads,
//! so container handling is exercised without any archive library on the
//! writing side.

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::Compression;
use flate2::write::DeflateEncoder;
use std::io::Write;

use carbu::{FuelKind, IngestError, ingest};
use carbu::feed::decode_stations;

const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<pdv_liste>
  <pdv id="7500101" latitude="4885660" longitude="235220" cp="75001" pop="R">
    <adresse>1 rue de Rivoli</adresse>
    <ville>Paris</ville>
    <horaires automate-24-24="1"/>
    <services>
      <service>Boutique alimentaire</service>
    </services>
    <prix nom="Gazole" id="1" maj="2024-03-01 08:30:00" valeur="1.789"/>
    <prix nom="E10" id="5" maj="2024-03-01 08:30:00" valeur="1.801"/>
    <prix nom="SP98" id="6" maj="2024-03-01T08:30:00" valeur="1.950"/>
  </pdv>
  <pdv id="1300102" latitude="5069788" longitude="489768" cp="13001">
    <ville>Marseille</ville>
    <prix nom="GPLc" id="4" maj="2024-03-02 07:00:00" valeur="0.959"/>
  </pdv>
</pdv_liste>
"#;

struct Entry<'a> {
    name: &'a str,
    data: &'a [u8],
    deflate: bool,
}

fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Build a single-volume archive: local headers + payloads, central
/// directory, EOCD with optional comment.
fn build_zip(entries: &[Entry], comment: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut centrals = Vec::new();

    for entry in entries {
        let offset = buf.len() as u32;
        let (method, payload) = if entry.deflate {
            (8u16, deflate(entry.data))
        } else {
            (0u16, entry.data.to_vec())
        };

        buf.write_all(b"PK\x03\x04").unwrap();
        buf.write_u16::<LittleEndian>(20).unwrap(); // version needed
        buf.write_u16::<LittleEndian>(0).unwrap(); // flags
        buf.write_u16::<LittleEndian>(method).unwrap();
        buf.write_u16::<LittleEndian>(0).unwrap(); // mod time
        buf.write_u16::<LittleEndian>(0).unwrap(); // mod date
        buf.write_u32::<LittleEndian>(0).unwrap(); // crc32
        buf.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
        buf.write_u32::<LittleEndian>(entry.data.len() as u32).unwrap();
        buf.write_u16::<LittleEndian>(entry.name.len() as u16).unwrap();
        buf.write_u16::<LittleEndian>(0).unwrap(); // extra len
        buf.write_all(entry.name.as_bytes()).unwrap();
        buf.write_all(&payload).unwrap();

        centrals.push((entry.name, method, payload.len() as u32, entry.data.len() as u32, offset));
    }

    let cd_offset = buf.len() as u32;
    for (name, method, compressed, uncompressed, offset) in &centrals {
        buf.write_all(b"PK\x01\x02").unwrap();
        buf.write_u16::<LittleEndian>(20).unwrap(); // version made by
        buf.write_u16::<LittleEndian>(20).unwrap(); // version needed
        buf.write_u16::<LittleEndian>(0).unwrap(); // flags
        buf.write_u16::<LittleEndian>(*method).unwrap();
        buf.write_u16::<LittleEndian>(0).unwrap(); // mod time
        buf.write_u16::<LittleEndian>(0).unwrap(); // mod date
        buf.write_u32::<LittleEndian>(0).unwrap(); // crc32
        buf.write_u32::<LittleEndian>(*compressed).unwrap();
        buf.write_u32::<LittleEndian>(*uncompressed).unwrap();
        buf.write_u16::<LittleEndian>(name.len() as u16).unwrap();
        buf.write_u16::<LittleEndian>(0).unwrap(); // extra len
        buf.write_u16::<LittleEndian>(0).unwrap(); // comment len
        buf.write_u16::<LittleEndian>(0).unwrap(); // disk number start
        buf.write_u16::<LittleEndian>(0).unwrap(); // internal attrs
        buf.write_u32::<LittleEndian>(0).unwrap(); // external attrs
        buf.write_u32::<LittleEndian>(*offset).unwrap();
        buf.write_all(name.as_bytes()).unwrap();
    }

    let cd_size = buf.len() as u32 - cd_offset;
    buf.write_all(b"PK\x05\x06").unwrap();
    buf.write_u16::<LittleEndian>(0).unwrap(); // disk number
    buf.write_u16::<LittleEndian>(0).unwrap(); // disk with cd
    buf.write_u16::<LittleEndian>(entries.len() as u16).unwrap();
    buf.write_u16::<LittleEndian>(entries.len() as u16).unwrap();
    buf.write_u32::<LittleEndian>(cd_size).unwrap();
    buf.write_u32::<LittleEndian>(cd_offset).unwrap();
    buf.write_u16::<LittleEndian>(comment.len() as u16).unwrap();
    buf.write_all(comment).unwrap();
    buf
}

/// Offset of the (single) central directory entry in a no-comment,
/// single-entry archive.
fn single_entry_cd_offset(zip: &[u8], name_len: usize) -> usize {
    zip.len() - 22 - (46 + name_len)
}

#[test]
fn stored_archive_round_trips_known_values() {
    let zip = build_zip(
        &[Entry { name: "PrixCarburants_instantane.xml", data: SAMPLE.as_bytes(), deflate: false }],
        b"",
    );

    let records = ingest(&zip).unwrap();
    assert_eq!(records.len(), 2);

    let paris = &records[0];
    assert_eq!(paris.id, "7500101");
    assert!((paris.latitude - 48.85660).abs() < 1e-5);
    assert!((paris.longitude - 2.35220).abs() < 1e-5);
    assert_eq!(paris.address.as_deref(), Some("1 rue de Rivoli"));
    assert_eq!(paris.postal_code.as_deref(), Some("75001"));
    assert!(paris.open_24h);
    assert_eq!(paris.services, vec!["Boutique alimentaire"]);
    assert_eq!(paris.prices.len(), 3);
    assert_eq!(paris.prices[0].fuel, FuelKind::Gazole);
    assert_eq!(paris.prices[0].amount, 1.789);

    let marseille = &records[1];
    assert!((marseille.latitude - 50.69788).abs() < 1e-5);
    assert_eq!(marseille.prices[0].fuel, FuelKind::Gplc);
}

#[test]
fn stored_and_deflate_agree_with_direct_decode() {
    let direct = decode_stations(SAMPLE.as_bytes()).unwrap();

    let stored = build_zip(
        &[Entry { name: "feed.xml", data: SAMPLE.as_bytes(), deflate: false }],
        b"",
    );
    let deflated = build_zip(
        &[Entry { name: "feed.xml", data: SAMPLE.as_bytes(), deflate: true }],
        b"",
    );

    assert_eq!(ingest(&stored).unwrap(), direct);
    assert_eq!(ingest(&deflated).unwrap(), direct);
}

#[test]
fn bare_document_bypasses_archive_stages() {
    let wrapped = build_zip(
        &[Entry { name: "feed.xml", data: SAMPLE.as_bytes(), deflate: false }],
        b"",
    );
    assert_eq!(ingest(SAMPLE.as_bytes()).unwrap(), ingest(&wrapped).unwrap());
}

#[test]
fn archive_comment_does_not_hide_the_eocd() {
    let zip = build_zip(
        &[Entry { name: "feed.xml", data: SAMPLE.as_bytes(), deflate: true }],
        b"published by the open-data portal",
    );
    assert_eq!(ingest(&zip).unwrap().len(), 2);
}

#[test]
fn xml_entry_is_preferred_over_earlier_entries() {
    let zip = build_zip(
        &[
            Entry { name: "lisez-moi.txt", data: b"not the feed", deflate: false },
            Entry { name: "PrixCarburants.XML", data: SAMPLE.as_bytes(), deflate: true },
        ],
        b"",
    );
    assert_eq!(ingest(&zip).unwrap().len(), 2);
}

#[test]
fn empty_archive_is_malformed() {
    let zip = build_zip(&[], b"");
    let err = ingest(&zip).unwrap_err();
    assert!(matches!(err, IngestError::ArchiveMalformed(_)));
}

#[test]
fn short_zip_prefixed_buffer_is_archive_malformed() {
    let err = ingest(b"PK\x03\x04tiny").unwrap_err();
    assert!(matches!(err, IngestError::ArchiveMalformed(_)));
}

#[test]
fn declared_size_mismatch_is_decompression_failed() {
    let mut zip = build_zip(
        &[Entry { name: "feed.xml", data: SAMPLE.as_bytes(), deflate: true }],
        b"",
    );

    // Corrupt the central directory's uncompressed-size field (offset +24)
    let cd = single_entry_cd_offset(&zip, "feed.xml".len());
    let lied = (SAMPLE.len() as u32) + 7;
    zip[cd + 24..cd + 28].copy_from_slice(&lied.to_le_bytes());

    let err = ingest(&zip).unwrap_err();
    assert!(matches!(err, IngestError::DecompressionFailed(_)));
}

#[test]
fn unsupported_method_is_decompression_failed() {
    let mut zip = build_zip(
        &[Entry { name: "feed.xml", data: SAMPLE.as_bytes(), deflate: false }],
        b"",
    );

    // Rewrite the method field (offset +10) to BZIP2
    let cd = single_entry_cd_offset(&zip, "feed.xml".len());
    zip[cd + 10..cd + 12].copy_from_slice(&12u16.to_le_bytes());

    let err = ingest(&zip).unwrap_err();
    assert!(matches!(err, IngestError::DecompressionFailed(_)));
}

#[test]
fn local_header_offset_past_end_is_archive_malformed() {
    let mut zip = build_zip(
        &[Entry { name: "feed.xml", data: SAMPLE.as_bytes(), deflate: false }],
        b"",
    );

    // Point the entry's local header (offset +42) past the buffer
    let cd = single_entry_cd_offset(&zip, "feed.xml".len());
    let past_end = (zip.len() as u32) + 100;
    zip[cd + 42..cd + 46].copy_from_slice(&past_end.to_le_bytes());

    let err = ingest(&zip).unwrap_err();
    assert!(matches!(err, IngestError::ArchiveMalformed(_)));
}

#[test]
fn one_bad_price_keeps_the_station_and_other_prices() {
    let doc = r#"<pdv_liste>
  <pdv id="33000001" latitude="4483770" longitude="-57730" cp="33000">
    <prix nom="Gazole" maj="2024-03-01 08:30:00" valeur="1.789"/>
    <prix nom="SP95" maj="2024-03-01 08:30:00" valeur="n/a"/>
    <prix nom="E85" maj="2024-03-01 08:30:00" valeur="0.899"/>
  </pdv>
</pdv_liste>"#;
    let zip = build_zip(&[Entry { name: "feed.xml", data: doc.as_bytes(), deflate: true }], b"");

    let records = ingest(&zip).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].prices.len(), 2);
    // Negative raw longitude scales like any other
    assert!((records[0].longitude - (-0.57730)).abs() < 1e-5);
}

#[test]
fn truncated_document_inside_archive_is_document_malformed() {
    let doc = br#"<pdv_liste><pdv id="1"><ville>Paris"#;
    let zip = build_zip(&[Entry { name: "feed.xml", data: doc, deflate: false }], b"");

    let err = ingest(&zip).unwrap_err();
    assert!(matches!(err, IngestError::DocumentMalformed(_)));
}
