//! Feed document decoding: domain records and the streaming XML decoder.

mod decoder;
mod model;

pub use decoder::decode_stations;
pub use model::{COORDINATE_SCALE, FuelKind, PriceRecord, StationRecord};
