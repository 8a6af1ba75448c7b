//! Payload decompression for archive entries.
//!
//! The feed publisher uses only the two classic ZIP methods: STORED
//! (byte-identical passthrough) and DEFLATE (raw, without zlib or gzip
//! framing). The declared uncompressed size is part of the contract: an
//! inflated result of any other length is rejected outright rather than
//! truncated or padded.

use flate2::read::DeflateDecoder;
use std::io::Read;

use crate::error::{IngestError, Result};

use super::structures::CompressionMethod;

/// Preallocation ceiling; a hostile declared size must not reserve memory
/// the payload never fills.
const MAX_PREALLOC: usize = 64 << 20;

/// Turn a raw payload slice into the declared-size uncompressed document.
///
/// # Errors
///
/// [`IngestError::DecompressionFailed`] for an unsupported method, a corrupt
/// DEFLATE stream, or a produced length differing from `declared_size`.
pub fn decompress(raw: &[u8], method: CompressionMethod, declared_size: u32) -> Result<Vec<u8>> {
    let declared = declared_size as usize;

    match method {
        CompressionMethod::Stored => {
            if raw.len() != declared {
                return Err(IngestError::decompression(format!(
                    "stored entry is {} bytes but declares {}",
                    raw.len(),
                    declared
                )));
            }
            Ok(raw.to_vec())
        }
        CompressionMethod::Deflate => {
            let mut out = Vec::with_capacity(declared.min(MAX_PREALLOC));
            // Reading one byte past the declared size is enough to detect an
            // oversized stream without inflating it to the end.
            let mut decoder = DeflateDecoder::new(raw).take(declared as u64 + 1);
            decoder
                .read_to_end(&mut out)
                .map_err(|e| IngestError::decompression(format!("inflate error: {e}")))?;

            if out.len() != declared {
                return Err(IngestError::decompression(format!(
                    "inflated length {} does not match declared size {}",
                    out.len(),
                    declared
                )));
            }
            Ok(out)
        }
        CompressionMethod::Unsupported(value) => Err(IngestError::decompression(format!(
            "unsupported compression method: {value}"
        ))),
    }
}
