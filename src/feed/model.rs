//! Typed domain records decoded from the feed document.

use chrono::NaiveDateTime;
use serde::Serialize;

/// The feed encodes degrees as signed integers multiplied by 100000.
///
/// Raw coordinates are divided by this factor the moment they are read and
/// never kept or compared as integers past that point.
pub const COORDINATE_SCALE: f64 = 100_000.0;

/// The closed set of fuel kinds the government feed publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FuelKind {
    Gazole,
    #[serde(rename = "SP95")]
    Sp95,
    #[serde(rename = "SP98")]
    Sp98,
    E10,
    E85,
    #[serde(rename = "GPLc")]
    Gplc,
}

impl FuelKind {
    /// Match a `nom` attribute value against the closed set.
    ///
    /// Names are matched exactly as the feed spells them; anything else is
    /// `None` and the caller skips that one price.
    pub fn from_feed_name(name: &str) -> Option<Self> {
        match name {
            "Gazole" => Some(FuelKind::Gazole),
            "SP95" => Some(FuelKind::Sp95),
            "SP98" => Some(FuelKind::Sp98),
            "E10" => Some(FuelKind::E10),
            "E85" => Some(FuelKind::E85),
            "GPLc" => Some(FuelKind::Gplc),
            _ => None,
        }
    }

    /// The feed's spelling of this kind.
    pub fn feed_name(&self) -> &'static str {
        match self {
            FuelKind::Gazole => "Gazole",
            FuelKind::Sp95 => "SP95",
            FuelKind::Sp98 => "SP98",
            FuelKind::E10 => "E10",
            FuelKind::E85 => "E85",
            FuelKind::Gplc => "GPLc",
        }
    }
}

impl std::fmt::Display for FuelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.feed_name())
    }
}

/// One price quote attached to a station.
///
/// Quotes keep feed order; duplicates of the same fuel kind are allowed here
/// and collapsed by downstream consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRecord {
    pub fuel: FuelKind,
    pub amount: f64,
    pub observed_at: NaiveDateTime,
}

/// One decoded fuel station with its nested price quotes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationRecord {
    /// The feed's station identifier, as published.
    pub id: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    /// Degrees, already divided out of the feed's integer convention.
    pub latitude: f64,
    pub longitude: f64,
    pub prices: Vec<PriceRecord>,
    pub services: Vec<String>,
    /// Whether the station advertises a 24/7 automat.
    pub open_24h: bool,
}
