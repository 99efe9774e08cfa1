//! Error types for element storage.

use thiserror::Error;

/// Errors raised while reading or writing stored documents.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to read or write a document file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not valid JSON or does not match the envelope.
    #[error("Failed to parse document: {0}")]
    Json(#[from] serde_json::Error),

    /// The document declares a schema this build does not understand.
    #[error("Schema mismatch: expected {expected}, found {found}")]
    SchemaMismatch { expected: String, found: String },

    /// The document format version is newer than supported.
    #[error("Unsupported format version {found} (max {max})")]
    UnsupportedVersion { found: u32, max: u32 },
}
