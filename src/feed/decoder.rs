//! Streaming decoder from document bytes to station records.
//!
//! The feed document is a flat list of `<pdv>` (point de vente) elements,
//! each carrying identity and coordinates as attributes, free-text address
//! and city children, a services block, opening hours, and zero or more
//! `<prix>` quotes. Decoding is a forward-only pass over the token stream
//! with a single in-flight station accumulator. The document is never
//! materialized as a tree, which keeps memory bounded for feeds with tens of
//! thousands of stations.
//!
//! Failure severity is two-tier and never conflated: a malformed token
//! stream aborts the whole decode, while a field-level anomaly (unknown fuel
//! name, unparseable amount or timestamp, missing optional text) skips the
//! smallest possible unit and keeps everything else.

use chrono::{DateTime, NaiveDateTime};
use quick_xml::Reader;
use quick_xml::encoding::Decoder;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

use crate::error::{IngestError, Result};

use super::model::{COORDINATE_SCALE, FuelKind, PriceRecord, StationRecord};

/// Which free-text element the decoder is currently inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextTarget {
    None,
    Address,
    City,
    Service,
}

/// Accumulator for the one station currently being decoded.
#[derive(Default)]
struct StationBuilder {
    id: Option<String>,
    latitude: f64,
    longitude: f64,
    postal_code: Option<String>,
    address: String,
    city: String,
    service_buf: String,
    services: Vec<String>,
    open_24h: bool,
    prices: Vec<PriceRecord>,
}

/// Decode the uncompressed feed document into station records.
///
/// The document encoding is taken from the XML declaration (the live feed
/// declares ISO-8859-1).
///
/// # Errors
///
/// [`IngestError::DocumentMalformed`] on an unbalanced or undecodable token
/// stream. Field-level anomalies are skipped, never escalated.
pub fn decode_stations(document: &[u8]) -> Result<Vec<StationRecord>> {
    let mut reader = Reader::from_reader(document);

    let mut records = Vec::new();
    let mut station: Option<StationBuilder> = None;
    let mut target = TextTarget::None;

    loop {
        match reader.read_event() {
            Err(e) => return Err(IngestError::document(e.to_string())),
            Ok(Event::Eof) => break,

            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"pdv" => {
                    if station.is_some() {
                        return Err(IngestError::document("nested pdv element"));
                    }
                    station = Some(begin_station(&e, reader.decoder()));
                }
                b"prix" => {
                    if let Some(st) = station.as_mut() {
                        push_price(st, &e, reader.decoder());
                    }
                }
                b"horaires" => {
                    if let Some(st) = station.as_mut() {
                        read_hours(st, &e, reader.decoder());
                    }
                }
                b"adresse" if station.is_some() => target = TextTarget::Address,
                b"ville" if station.is_some() => target = TextTarget::City,
                b"service" if station.is_some() => target = TextTarget::Service,
                _ => {}
            },

            // The feed usually writes prix and horaires as empty elements
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"pdv" => {
                    if station.is_some() {
                        return Err(IngestError::document("nested pdv element"));
                    }
                    finish_station(begin_station(&e, reader.decoder()), &mut records);
                }
                b"prix" => {
                    if let Some(st) = station.as_mut() {
                        push_price(st, &e, reader.decoder());
                    }
                }
                b"horaires" => {
                    if let Some(st) = station.as_mut() {
                        read_hours(st, &e, reader.decoder());
                    }
                }
                _ => {}
            },

            Ok(Event::Text(t)) => {
                if target == TextTarget::None {
                    continue;
                }
                let Some(st) = station.as_mut() else {
                    continue;
                };
                let raw = reader
                    .decoder()
                    .decode(&t)
                    .map_err(|e| IngestError::document(format!("undecodable text: {e}")))?;
                let text = match unescape(&raw) {
                    Ok(unescaped) => unescaped.into_owned(),
                    Err(_) => raw.into_owned(),
                };
                let chunk = text.trim();
                if !chunk.is_empty() {
                    match target {
                        TextTarget::Address => st.address.push_str(chunk),
                        TextTarget::City => st.city.push_str(chunk),
                        TextTarget::Service => st.service_buf.push_str(chunk),
                        TextTarget::None => unreachable!(),
                    }
                }
            }

            Ok(Event::End(e)) => match e.name().as_ref() {
                b"pdv" => {
                    match station.take() {
                        Some(st) => finish_station(st, &mut records),
                        None => return Err(IngestError::document("pdv end tag without start")),
                    }
                    target = TextTarget::None;
                }
                b"adresse" | b"ville" => target = TextTarget::None,
                b"service" => {
                    if let Some(st) = station.as_mut() {
                        if !st.service_buf.is_empty() {
                            st.services.push(std::mem::take(&mut st.service_buf));
                        }
                    }
                    target = TextTarget::None;
                }
                _ => {}
            },

            Ok(_) => {}
        }
    }

    if station.is_some() {
        return Err(IngestError::document(
            "document ended inside a station element",
        ));
    }

    Ok(records)
}

/// Start a fresh accumulator from a `pdv` open tag.
///
/// Raw integer coordinates are divided by the feed's scale factor the moment
/// they are read; a missing or unparseable coordinate becomes 0.0, the
/// feed's own "no location" convention.
fn begin_station(e: &BytesStart, decoder: Decoder) -> StationBuilder {
    StationBuilder {
        id: attr_value(e, b"id", decoder),
        latitude: scaled_coordinate(attr_value(e, b"latitude", decoder)),
        longitude: scaled_coordinate(attr_value(e, b"longitude", decoder)),
        postal_code: attr_value(e, b"cp", decoder),
        ..StationBuilder::default()
    }
}

fn scaled_coordinate(raw: Option<String>) -> f64 {
    raw.and_then(|v| v.trim().parse::<f64>().ok())
        .map(|v| v / COORDINATE_SCALE)
        .unwrap_or(0.0)
}

/// Decode one `prix` element into the accumulator.
///
/// All three attributes must parse; otherwise this one price is skipped and
/// the station kept.
fn push_price(st: &mut StationBuilder, e: &BytesStart, decoder: Decoder) {
    let station_id = st.id.as_deref().unwrap_or("?");

    let name = attr_value(e, b"nom", decoder);
    let Some(fuel) = name.as_deref().and_then(FuelKind::from_feed_name) else {
        debug!(
            station = station_id,
            fuel = name.as_deref().unwrap_or(""),
            "skipping price with unrecognized fuel kind"
        );
        return;
    };

    let Some(amount) = attr_value(e, b"valeur", decoder).and_then(|v| v.trim().parse::<f64>().ok())
    else {
        debug!(station = station_id, %fuel, "skipping price with unparseable amount");
        return;
    };

    let Some(observed_at) =
        attr_value(e, b"maj", decoder).and_then(|v| parse_observed_at(v.trim()))
    else {
        debug!(station = station_id, %fuel, "skipping price with unparseable timestamp");
        return;
    };

    st.prices.push(PriceRecord {
        fuel,
        amount,
        observed_at,
    });
}

fn read_hours(st: &mut StationBuilder, e: &BytesStart, decoder: Decoder) {
    if attr_value(e, b"automate-24-24", decoder).as_deref() == Some("1") {
        st.open_24h = true;
    }
}

/// Finalize the in-flight accumulator and append it to the output.
///
/// A station without an `id` attribute is unidentifiable and dropped whole;
/// empty accumulated text coerces to `None`.
fn finish_station(st: StationBuilder, records: &mut Vec<StationRecord>) {
    let Some(id) = st.id else {
        debug!("dropping station without id attribute");
        return;
    };

    records.push(StationRecord {
        id,
        address: none_if_empty(st.address),
        city: none_if_empty(st.city),
        postal_code: st.postal_code.filter(|s| !s.is_empty()),
        latitude: st.latitude,
        longitude: st.longitude,
        prices: st.prices,
        services: st.services,
        open_24h: st.open_24h,
    });
}

fn none_if_empty(text: String) -> Option<String> {
    if text.is_empty() { None } else { Some(text) }
}

/// Look up one attribute by name and decode it to text.
///
/// Attribute-level decoding problems yield `None` so the caller can apply
/// its skip policy at field granularity.
fn attr_value(e: &BytesStart, name: &[u8], decoder: Decoder) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == name {
            let raw = decoder.decode(&attr.value).ok()?;
            return Some(match unescape(&raw) {
                Ok(unescaped) => unescaped.into_owned(),
                Err(_) => raw.into_owned(),
            });
        }
    }
    None
}

/// Parse a `maj` timestamp in any of the shapes the feed has published:
/// space-separated, `T`-separated, or full RFC 3339 (offset discarded; the
/// feed's clock times are naive local times).
fn parse_observed_at(value: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

    for format in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }

    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.naive_local())
}
