//! # carbu
//!
//! Ingester for the French fuel-price open-data feed (the "instantané"
//! snapshot of every station's current prices).
//!
//! The feed arrives as an opaque byte blob: usually a ZIP container holding
//! one XML document, occasionally the bare document. This crate covers the
//! whole path from that blob to typed records:
//!
//! - Classify the buffer by signature ([`archive::classify`])
//! - Locate the End of Central Directory by bounded backward scan
//! - Walk the central directory without trusting any length field
//! - Validate the local header and inflate the payload (STORED / DEFLATE)
//! - Stream-decode the XML into [`StationRecord`]s with nested
//!   [`PriceRecord`]s, applying the feed's integer-coordinate scaling
//!
//! The one entry point callers need is [`ingest`]; everything below it is
//! exposed for reuse and testing.
//!
//! ## Example
//!
//! ```no_run
//! use carbu::ingest;
//!
//! fn main() -> anyhow::Result<()> {
//!     let buffer = std::fs::read("instantane.zip")?;
//!     let stations = ingest(&buffer)?;
//!     for station in stations.iter().take(3) {
//!         println!("{} {:?}: {} quotes", station.id, station.city, station.prices.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod cli;
pub mod error;
pub mod feed;
pub mod fetch;
pub mod ingest;

pub use cli::Cli;
pub use error::{IngestError, Stage};
pub use feed::{COORDINATE_SCALE, FuelKind, PriceRecord, StationRecord};
pub use ingest::ingest;
