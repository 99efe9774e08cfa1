//! Arena keys.
//!
//! Relations between entities are stored as these keys, never as owning
//! pointers. Keys are only minted by [`BuildModel`](super::BuildModel) and
//! stay valid for its lifetime (entities are detached, never freed).

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! arena_key {
    ($(#[$doc:meta])* $name:ident, $label:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub(crate) u32);

        impl $name {
            /// Position in the owning arena.
            pub fn index(self) -> usize {
                self.0 as usize
            }

            pub(crate) fn from_index(index: usize) -> Self {
                Self(index as u32)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", $label, self.0)
            }
        }
    };
}

arena_key!(
    /// Key of an option.
    OptionId,
    "option"
);
arena_key!(
    /// Key of an option category.
    CategoryId,
    "category"
);
arena_key!(
    /// Key of a tool.
    ToolId,
    "tool"
);
arena_key!(
    /// Key of a tool chain.
    ToolChainId,
    "toolChain"
);
arena_key!(
    /// Key of a folder or file resource configuration.
    ResourceId,
    "resource"
);
arena_key!(
    /// Key of a build configuration.
    ConfigId,
    "configuration"
);
arena_key!(
    /// Key of a legacy tool reference.
    ToolRefId,
    "toolReference"
);
arena_key!(
    /// Key of a legacy option reference.
    OptionRefId,
    "optionReference"
);

/// Entities that own options and categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HolderKey {
    Tool(ToolId),
    ToolChain(ToolChainId),
}

impl fmt::Display for HolderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HolderKey::Tool(t) => t.fmt(f),
            HolderKey::ToolChain(tc) => tc.fmt(f),
        }
    }
}

impl From<ToolId> for HolderKey {
    fn from(t: ToolId) -> Self {
        HolderKey::Tool(t)
    }
}

impl From<ToolChainId> for HolderKey {
    fn from(tc: ToolChainId) -> Self {
        HolderKey::ToolChain(tc)
    }
}

/// Any entity carrying id, extension flag and change state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKey {
    Option(OptionId),
    Category(CategoryId),
    Tool(ToolId),
    ToolChain(ToolChainId),
    Resource(ResourceId),
    Configuration(ConfigId),
}

impl From<HolderKey> for EntityKey {
    fn from(h: HolderKey) -> Self {
        match h {
            HolderKey::Tool(t) => EntityKey::Tool(t),
            HolderKey::ToolChain(tc) => EntityKey::ToolChain(tc),
        }
    }
}

impl From<CategoryId> for EntityKey {
    fn from(k: CategoryId) -> Self {
        EntityKey::Category(k)
    }
}

impl From<OptionId> for EntityKey {
    fn from(k: OptionId) -> Self {
        EntityKey::Option(k)
    }
}

impl From<ToolId> for EntityKey {
    fn from(k: ToolId) -> Self {
        EntityKey::Tool(k)
    }
}

impl From<ToolChainId> for EntityKey {
    fn from(k: ToolChainId) -> Self {
        EntityKey::ToolChain(k)
    }
}

impl From<ResourceId> for EntityKey {
    fn from(k: ResourceId) -> Self {
        EntityKey::Resource(k)
    }
}

impl From<ConfigId> for EntityKey {
    fn from(k: ConfigId) -> Self {
        EntityKey::Configuration(k)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Option(k) => k.fmt(f),
            EntityKey::Category(k) => k.fmt(f),
            EntityKey::Tool(k) => k.fmt(f),
            EntityKey::ToolChain(k) => k.fmt(f),
            EntityKey::Resource(k) => k.fmt(f),
            EntityKey::Configuration(k) => k.fmt(f),
        }
    }
}
