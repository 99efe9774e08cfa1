//! Ordered element tree.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Separator used for list-valued attributes.
pub const LIST_SEPARATOR: char = ';';

/// Read access to a stored element.
///
/// The model only needs attribute lookup by name and ordered iteration over
/// child elements; any tree that offers both can be loaded.
pub trait ElementSource: Sized {
    /// Element name (e.g. `tool`, `option`).
    fn name(&self) -> &str;

    /// Attribute value by name.
    fn attribute(&self, name: &str) -> Option<&str>;

    /// Child elements in document order.
    fn children(&self) -> &[Self];

    /// Child elements with the given name, in document order.
    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Self> + 'a {
        self.children().iter().filter(move |c| c.name() == name)
    }

    /// Parse a boolean attribute (`true` / `false`).
    fn bool_attribute(&self, name: &str) -> Option<bool> {
        match self.attribute(name)? {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }

    /// Split a `;`-separated attribute into its non-empty entries.
    fn list_attribute(&self, name: &str) -> Option<Vec<String>> {
        self.attribute(name).map(split_list)
    }
}

/// Write access used by the serializer.
pub trait ElementSink {
    /// Set (or replace) an attribute.
    fn set_attribute(&mut self, name: &str, value: impl Into<String>);

    /// Append a new child element and return it for population.
    fn create_child(&mut self, name: &str) -> &mut Self;

    /// Set an attribute only when a value is present.
    fn set_optional(&mut self, name: &str, value: Option<&str>) {
        if let Some(v) = value {
            self.set_attribute(name, v);
        }
    }

    /// Set a `;`-joined list attribute.
    fn set_list(&mut self, name: &str, values: &[String]) {
        self.set_attribute(name, values.join(&LIST_SEPARATOR.to_string()));
    }
}

/// Split a `;`-separated list, dropping empty entries.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// A named element with ordered attributes and ordered children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageElement {
    /// Element name.
    pub name: String,

    /// Attributes in insertion order.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, String>,

    /// Child elements in document order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<StorageElement>,
}

impl StorageElement {
    /// Create an empty element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attribute(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    /// Builder-style child append.
    pub fn with_child(mut self, child: StorageElement) -> Self {
        self.children.push(child);
        self
    }

    /// Remove an attribute, returning its previous value.
    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        self.attributes.shift_remove(name)
    }

    /// First child with the given name.
    pub fn first_child(&self, name: &str) -> Option<&StorageElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Walk the tree depth-first, returning the first element with `id == id`.
    pub fn find_by_id(&self, id: &str) -> Option<&StorageElement> {
        if self.attribute("id") == Some(id) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_by_id(id))
    }
}

impl ElementSource for StorageElement {
    fn name(&self) -> &str {
        &self.name
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    fn children(&self) -> &[Self] {
        &self.children
    }
}

impl ElementSink for StorageElement {
    fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        self.attributes.insert(name.to_string(), value.into());
    }

    fn create_child(&mut self, name: &str) -> &mut Self {
        self.children.push(StorageElement::new(name));
        let last = self.children.len() - 1;
        &mut self.children[last]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_order_preserved() {
        let el = StorageElement::new("tool")
            .with_attribute("id", "gnu.c.compiler")
            .with_attribute("name", "GCC")
            .with_attribute("command", "gcc");

        let keys: Vec<_> = el.attributes.keys().cloned().collect();
        assert_eq!(keys, vec!["id", "name", "command"]);
    }

    #[test]
    fn test_create_child_returns_new_child() {
        let mut root = StorageElement::new("toolChain");
        root.create_child("tool").set_attribute("id", "a");
        root.create_child("tool").set_attribute("id", "b");
        root.create_child("option").set_attribute("id", "c");

        let ids: Vec<_> = root
            .children_named("tool")
            .filter_map(|c| c.attribute("id"))
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_list_attribute_drops_empty_entries() {
        let el = StorageElement::new("inputType").with_attribute("sources", "c;;cpp; cc ;");
        assert_eq!(
            el.list_attribute("sources"),
            Some(vec!["c".to_string(), "cpp".to_string(), "cc".to_string()])
        );
        assert_eq!(el.list_attribute("missing"), None);
    }

    #[test]
    fn test_bool_attribute() {
        let el = StorageElement::new("option")
            .with_attribute("a", "true")
            .with_attribute("b", "false")
            .with_attribute("c", "yes");
        assert_eq!(el.bool_attribute("a"), Some(true));
        assert_eq!(el.bool_attribute("b"), Some(false));
        assert_eq!(el.bool_attribute("c"), None);
    }

    #[test]
    fn test_find_by_id_is_depth_first() {
        let tree = StorageElement::new("root")
            .with_child(
                StorageElement::new("toolChain")
                    .with_attribute("id", "tc")
                    .with_child(StorageElement::new("tool").with_attribute("id", "t1")),
            )
            .with_child(StorageElement::new("tool").with_attribute("id", "t2"));

        assert_eq!(tree.find_by_id("t1").map(|e| e.name.as_str()), Some("tool"));
        assert!(tree.find_by_id("nope").is_none());
    }

    #[test]
    fn test_set_list_joins_with_separator() {
        let mut el = StorageElement::new("toolChain");
        el.set_list("targetTool", &["ld".to_string(), "ar".to_string()]);
        assert_eq!(el.attribute("targetTool"), Some("ld;ar"));
    }
}
