//! JSON document envelope.
//!
//! A document wraps one root element together with its schema identifier so
//! that manifest files and project files cannot be confused on load.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::element::StorageElement;
use crate::error::StorageError;
use crate::{FORMAT_VERSION, MANIFEST_SCHEMA_ID, PROJECT_SCHEMA_ID};

/// Which kind of tree a document carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Shared extension definitions (tool chains, tools, options).
    Manifest,
    /// Project-owned configurations.
    Project,
}

impl DocumentKind {
    /// Schema identifier written into the envelope.
    pub fn schema_id(self) -> &'static str {
        match self {
            DocumentKind::Manifest => MANIFEST_SCHEMA_ID,
            DocumentKind::Project => PROJECT_SCHEMA_ID,
        }
    }
}

/// On-disk envelope around a root element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Schema identifier (see [`DocumentKind::schema_id`]).
    pub schema_id: String,

    /// Format version.
    pub format_version: u32,

    /// Root element.
    pub root: StorageElement,
}

impl Document {
    /// Wrap a root element for the given kind.
    pub fn new(kind: DocumentKind, root: StorageElement) -> Self {
        Self {
            schema_id: kind.schema_id().to_string(),
            format_version: FORMAT_VERSION,
            root,
        }
    }

    /// Parse a document and check it carries the expected schema.
    pub fn from_json(json: &str, kind: DocumentKind) -> Result<Self, StorageError> {
        let doc: Document = serde_json::from_str(json)?;
        doc.check(kind)?;
        Ok(doc)
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, StorageError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read and validate a document file.
    pub fn read(path: &Path, kind: DocumentKind) -> Result<Self, StorageError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents, kind)
    }

    /// Write the document to a file, replacing any previous contents.
    pub fn write(&self, path: &Path) -> Result<(), StorageError> {
        let json = self.to_json()?;
        fs::write(path, json)?;
        Ok(())
    }

    fn check(&self, kind: DocumentKind) -> Result<(), StorageError> {
        if self.schema_id != kind.schema_id() {
            return Err(StorageError::SchemaMismatch {
                expected: kind.schema_id().to_string(),
                found: self.schema_id.clone(),
            });
        }
        if self.format_version > FORMAT_VERSION {
            return Err(StorageError::UnsupportedVersion {
                found: self.format_version,
                max: FORMAT_VERSION,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementSource;

    #[test]
    fn test_document_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.json");

        let root = StorageElement::new("project").with_child(
            StorageElement::new("configuration")
                .with_attribute("id", "cfg.debug")
                .with_attribute("name", "Debug"),
        );
        let doc = Document::new(DocumentKind::Project, root);
        doc.write(&path).unwrap();

        let loaded = Document::read(&path, DocumentKind::Project).unwrap();
        assert_eq!(loaded, doc);
        let cfg = loaded.root.first_child("configuration").unwrap();
        assert_eq!(cfg.attribute("name"), Some("Debug"));
    }

    #[test]
    fn test_schema_mismatch_rejected() {
        let doc = Document::new(DocumentKind::Manifest, StorageElement::new("buildDefinitions"));
        let json = doc.to_json().unwrap();

        let err = Document::from_json(&json, DocumentKind::Project).unwrap_err();
        assert!(matches!(err, StorageError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_newer_format_rejected() {
        let json = format!(
            r#"{{"schema_id":"{}","format_version":99,"root":{{"name":"project"}}}}"#,
            PROJECT_SCHEMA_ID
        );
        let err = Document::from_json(&json, DocumentKind::Project).unwrap_err();
        assert!(matches!(err, StorageError::UnsupportedVersion { found: 99, .. }));
    }
}
