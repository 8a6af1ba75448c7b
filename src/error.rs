//! Error types for the ingestion pipeline.

use thiserror::Error;

/// Pipeline stage that produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Container-level parsing: EOCD, central directory, local headers.
    Archive,
    /// Payload inflation.
    Decompression,
    /// XML token stream decoding.
    Document,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Archive => f.write_str("archive"),
            Stage::Decompression => f.write_str("decompression"),
            Stage::Document => f.write_str("document"),
        }
    }
}

/// Terminal failure of a whole ingestion call.
///
/// Each variant aborts the pipeline; there is no partial output. Field-level
/// anomalies inside a well-formed document (an unparseable price, an unknown
/// fuel name) are skipped during decoding and never surface here.
#[derive(Debug, Error)]
pub enum IngestError {
    /// EOCD not found, signature mismatch, or offset arithmetic past the
    /// end of the buffer.
    #[error("archive malformed: {0}")]
    ArchiveMalformed(String),

    /// Unsupported compression method, or inflated length differing from
    /// the declared uncompressed size.
    #[error("decompression failed: {0}")]
    DecompressionFailed(String),

    /// Unbalanced or unreadable token stream at the top level.
    #[error("document malformed: {0}")]
    DocumentMalformed(String),
}

impl IngestError {
    pub fn archive(msg: impl Into<String>) -> Self {
        IngestError::ArchiveMalformed(msg.into())
    }

    pub fn decompression(msg: impl Into<String>) -> Self {
        IngestError::DecompressionFailed(msg.into())
    }

    pub fn document(msg: impl Into<String>) -> Self {
        IngestError::DocumentMalformed(msg.into())
    }

    /// Which pipeline stage produced this error.
    pub fn stage(&self) -> Stage {
        match self {
            IngestError::ArchiveMalformed(_) => Stage::Archive,
            IngestError::DecompressionFailed(_) => Stage::Decompression,
            IngestError::DocumentMalformed(_) => Stage::Document,
        }
    }
}

// Cursor reads while walking archive structures are the only fallible I/O in
// the library; a short read there means the buffer ended inside a record.
impl From<std::io::Error> for IngestError {
    fn from(_: std::io::Error) -> Self {
        IngestError::archive("unexpected end of archive data")
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, IngestError>;
