//! ZIP container parsing and payload extraction.
//!
//! The feed endpoint publishes an opaque byte blob: usually a ZIP container
//! holding one XML document, occasionally the bare document. This module
//! covers the container side: classifying the buffer, locating the End of
//! Central Directory, walking the central directory, validating local
//! headers, and inflating payloads.
//!
//! ## Container Format Overview
//!
//! A ZIP buffer consists of:
//! 1. Local file headers and compressed data for each entry
//! 2. A Central Directory with metadata for all entries
//! 3. An End of Central Directory (EOCD) record at the end
//!
//! Parsing starts from the EOCD (found by a bounded backward scan, since a
//! variable-length comment may follow it), then walks the central directory,
//! which is the authoritative index. Local headers are still validated per
//! entry before their payload is sliced out.
//!
//! ## Supported Features
//!
//! - Standard ZIP format, STORED and DEFLATE methods
//!
//! ## Limitations
//!
//! - No ZIP64 extended fields (the feed is a few MB, far below 4GB)
//! - No encryption or multi-volume support

mod inflate;
mod parser;
mod structures;

pub use inflate::decompress;
pub use parser::{classify, find_eocd, payload_slice, read_entries};
pub use structures::*;
