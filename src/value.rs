//! Typed option values.
//!
//! Every option has a fixed [`ValueKind`]. Kinds map onto three storage
//! shapes (boolean, single string, string list); writes are checked against
//! the shape and never coerced.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ModelError;

/// Storage shape of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueShape {
    Bool,
    Text,
    List,
}

impl fmt::Display for ValueShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueShape::Bool => write!(f, "boolean"),
            ValueShape::Text => write!(f, "string"),
            ValueShape::List => write!(f, "string list"),
        }
    }
}

/// Declared type of an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Boolean,
    String,
    Enumerated,
    Tree,
    StringList,
    IncludePath,
    PreprocessorSymbols,
    Libraries,
    Objects,
    LibraryPaths,
    LibraryFiles,
    MacroFiles,
    UndefIncludePath,
    UndefPreprocessorSymbols,
    UndefLibraryPaths,
    UndefLibraryFiles,
    UndefMacroFiles,
}

/// (kind, storage name) pairs used by the element format.
const KIND_NAMES: &[(ValueKind, &str)] = &[
    (ValueKind::Boolean, "boolean"),
    (ValueKind::String, "string"),
    (ValueKind::Enumerated, "enumerated"),
    (ValueKind::Tree, "tree"),
    (ValueKind::StringList, "stringList"),
    (ValueKind::IncludePath, "includePath"),
    (ValueKind::PreprocessorSymbols, "definedSymbols"),
    (ValueKind::Libraries, "libs"),
    (ValueKind::Objects, "userObjs"),
    (ValueKind::LibraryPaths, "libPaths"),
    (ValueKind::LibraryFiles, "libFiles"),
    (ValueKind::MacroFiles, "symbolFiles"),
    (ValueKind::UndefIncludePath, "undefIncludePath"),
    (ValueKind::UndefPreprocessorSymbols, "undefDefinedSymbols"),
    (ValueKind::UndefLibraryPaths, "undefLibPaths"),
    (ValueKind::UndefLibraryFiles, "undefLibFiles"),
    (ValueKind::UndefMacroFiles, "undefSymbolFiles"),
];

impl ValueKind {
    /// Storage shape for this kind.
    pub fn shape(self) -> ValueShape {
        match self {
            ValueKind::Boolean => ValueShape::Bool,
            ValueKind::String | ValueKind::Enumerated | ValueKind::Tree => ValueShape::Text,
            _ => ValueShape::List,
        }
    }

    /// Whether this is one of the `Undef*` list kinds.
    pub fn is_undef(self) -> bool {
        matches!(
            self,
            ValueKind::UndefIncludePath
                | ValueKind::UndefPreprocessorSymbols
                | ValueKind::UndefLibraryPaths
                | ValueKind::UndefLibraryFiles
                | ValueKind::UndefMacroFiles
        )
    }

    /// Name used in stored elements.
    pub fn as_str(self) -> &'static str {
        KIND_NAMES
            .iter()
            .find(|(k, _)| *k == self)
            .map(|(_, n)| *n)
            .unwrap_or("string")
    }

    /// Parse a stored kind name.
    pub fn parse(name: &str) -> Option<Self> {
        KIND_NAMES.iter().find(|(_, n)| *n == name).map(|(k, _)| *k)
    }

    /// Value used when neither the option nor its ancestors set one.
    pub fn empty_value(self) -> TypedValue {
        match self.shape() {
            ValueShape::Bool => TypedValue::Bool(false),
            ValueShape::Text => TypedValue::Text(String::new()),
            ValueShape::List => TypedValue::List(Vec::new()),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A concrete option value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypedValue {
    Bool(bool),
    Text(String),
    List(Vec<String>),
}

impl TypedValue {
    /// Shape of this value.
    pub fn shape(&self) -> ValueShape {
        match self {
            TypedValue::Bool(_) => ValueShape::Bool,
            TypedValue::Text(_) => ValueShape::Text,
            TypedValue::List(_) => ValueShape::List,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TypedValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            TypedValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            TypedValue::List(l) => Some(l),
            _ => None,
        }
    }

    /// Check that this value may be stored in an option of `kind`.
    pub fn check(&self, option: &str, kind: ValueKind) -> Result<(), ModelError> {
        if self.shape() == kind.shape() {
            Ok(())
        } else {
            Err(ModelError::TypeMismatch {
                option: option.to_string(),
                expected: kind.shape(),
                found: self.shape(),
            })
        }
    }

    /// Parse a raw stored string into the shape of `kind`.
    ///
    /// List kinds read `;`-separated entries; boolean accepts only
    /// `true` / `false`.
    pub fn parse(raw: &str, kind: ValueKind) -> Option<Self> {
        match kind.shape() {
            ValueShape::Bool => match raw {
                "true" => Some(TypedValue::Bool(true)),
                "false" => Some(TypedValue::Bool(false)),
                _ => None,
            },
            ValueShape::Text => Some(TypedValue::Text(raw.to_string())),
            ValueShape::List => Some(TypedValue::List(buildcfg_storage::element::split_list(raw))),
        }
    }

    /// Flat string form used by enablement checks and storage.
    pub fn to_raw(&self) -> String {
        match self {
            TypedValue::Bool(b) => b.to_string(),
            TypedValue::Text(s) => s.clone(),
            TypedValue::List(l) => l.join(";"),
        }
    }
}

impl From<bool> for TypedValue {
    fn from(b: bool) -> Self {
        TypedValue::Bool(b)
    }
}

impl From<&str> for TypedValue {
    fn from(s: &str) -> Self {
        TypedValue::Text(s.to_string())
    }
}

impl From<String> for TypedValue {
    fn from(s: String) -> Self {
        TypedValue::Text(s)
    }
}

impl From<Vec<String>> for TypedValue {
    fn from(l: Vec<String>) -> Self {
        TypedValue::List(l)
    }
}

/// One selectable entry of an enumerated option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValue {
    pub id: String,
    pub name: String,
    /// Flag emitted when this entry is selected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}
