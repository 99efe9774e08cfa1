//! Error types for the build model.

use thiserror::Error;

use crate::value::ValueShape;

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Hard failures returned to the caller.
///
/// Data inconsistencies (unresolved ids, failed conversions, property
/// conflicts) are not errors; they are logged and reported as values.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A value of the wrong shape was written to (or read from) an option.
    #[error("Type mismatch on option {option}: expected {expected} value, got {found}")]
    TypeMismatch {
        option: String,
        expected: ValueShape,
        found: ValueShape,
    },

    /// No entity with this id exists in the model.
    #[error("Unknown entity id: {0}")]
    UnknownId(String),

    /// An entity of the same kind already uses this id.
    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    /// The entity is an extension template and cannot be changed in place.
    #[error("Entity {0} is an extension element and cannot be modified")]
    ImmutableExtension(String),

    /// The operation needs a folder but was given a file resource (or the reverse).
    #[error("Resource {id} is not a {expected}")]
    WrongResourceKind { id: String, expected: &'static str },

    /// A stored element is missing a required attribute or has a bad value.
    #[error("Invalid <{element}> element: {reason}")]
    InvalidElement { element: String, reason: String },

    /// Storage layer failure.
    #[error(transparent)]
    Storage(#[from] buildcfg_storage::StorageError),
}

/// Recoverable resolution failures.
///
/// These are recorded on the model and logged; the affected entity behaves as
/// if the relation did not exist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// A stored id could not be turned into a live reference.
    #[error("{kind} '{id}': unresolved {relation} '{target}'")]
    UnresolvedId {
        kind: &'static str,
        id: String,
        relation: &'static str,
        target: String,
    },

    /// Following the stored superclass would make the entity its own ancestor.
    #[error("{kind} '{id}': superClass '{target}' would create an inheritance cycle")]
    Cycle {
        kind: &'static str,
        id: String,
        target: String,
    },

    /// A second extension definition reused an id; it was skipped.
    #[error("{kind} '{id}' is defined more than once; later definition ignored")]
    DuplicateDefinition { kind: &'static str, id: String },

    /// The option cannot be reached from the holder doing the write.
    #[error("Option '{option}' is not reachable from holder '{holder}'")]
    Unreachable { holder: String, option: String },

    /// No extension-level ancestor exists to anchor a new override on.
    #[error("Option '{option}' has no extension-level ancestor")]
    NoExtensionAncestor { option: String },

    /// Neither the option nor any ancestor declares a value type.
    #[error("Option '{option}' has no value type")]
    UntypedOption { option: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_mismatch_message() {
        let err = ModelError::TypeMismatch {
            option: "gnu.c.opt.debug".to_string(),
            expected: ValueShape::Bool,
            found: ValueShape::Text,
        };
        assert_eq!(
            err.to_string(),
            "Type mismatch on option gnu.c.opt.debug: expected boolean value, got string"
        );
    }

    #[test]
    fn test_unresolved_message() {
        let err = ResolveError::UnresolvedId {
            kind: "tool",
            id: "my.tool".to_string(),
            relation: "superClass",
            target: "missing.tool".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "tool 'my.tool': unresolved superClass 'missing.tool'"
        );
    }
}
