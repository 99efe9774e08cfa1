//! Build-configuration storage types
//!
//! Defines the ordered key/value element tree that the model is loaded from
//! and serialized into, plus the JSON document envelope used on disk.

pub mod document;
pub mod element;
pub mod error;

pub use document::{Document, DocumentKind};
pub use element::{ElementSink, ElementSource, StorageElement};
pub use error::StorageError;

/// Current on-disk format version.
pub const FORMAT_VERSION: u32 = 1;

/// Schema identifier for extension (manifest) documents.
pub const MANIFEST_SCHEMA_ID: &str = "buildcfg/manifest@1";

/// Schema identifier for project storage documents.
pub const PROJECT_SCHEMA_ID: &str = "buildcfg/project@1";
