//! Fields shared by every build entity.

use indexmap::IndexMap;
use std::collections::BTreeSet;

use super::keys::{CategoryId, OptionId};
use crate::state::ChangeStamp;

/// Identity, template flag and change state.
#[derive(Debug, Clone)]
pub struct EntityMeta {
    /// Globally unique id (project ids derive from their extension ancestor).
    pub id: String,

    /// Display name; `None` inherits from the superclass.
    pub name: Option<String>,

    /// `true` for shared read-only templates, `false` for project-owned entities.
    pub is_extension: bool,

    pub(crate) stamp: ChangeStamp,

    /// Whether stored ids have been turned into live keys.
    pub(crate) resolved: bool,
}

impl EntityMeta {
    /// Metadata for an entity created in memory with live relations.
    pub fn new(id: impl Into<String>, name: Option<String>, is_extension: bool) -> Self {
        Self {
            id: id.into(),
            name,
            is_extension,
            stamp: ChangeStamp::default(),
            resolved: true,
        }
    }

    /// Metadata for an entity read from storage whose relations are still ids.
    pub(crate) fn unresolved(id: impl Into<String>, name: Option<String>, is_extension: bool) -> Self {
        Self {
            resolved: false,
            ..Self::new(id, name, is_extension)
        }
    }

    pub fn stamp(&self) -> &ChangeStamp {
        &self.stamp
    }
}

/// Options and categories owned locally by a tool or tool chain.
#[derive(Debug, Clone, Default)]
pub struct OptionSet {
    /// Local options keyed by id, in insertion order.
    pub options: IndexMap<String, OptionId>,

    /// Local categories keyed by id, in insertion order.
    pub categories: IndexMap<String, CategoryId>,

    /// Options hidden by applicability rules in this holder's context.
    pub(crate) hidden: BTreeSet<OptionId>,
}

impl OptionSet {
    pub fn local_options(&self) -> impl Iterator<Item = OptionId> + '_ {
        self.options.values().copied()
    }

    pub fn local_categories(&self) -> impl Iterator<Item = CategoryId> + '_ {
        self.categories.values().copied()
    }
}
