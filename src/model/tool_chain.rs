//! Tool chains.

use indexmap::IndexMap;
use std::collections::BTreeSet;

use super::configuration::PropertySupport;
use super::entity::{EntityMeta, OptionSet};
use super::keys::{ResourceId, ToolChainId, ToolId};
use super::BuildModel;

#[derive(Debug, Clone)]
pub struct ToolChain {
    pub meta: EntityMeta,

    /// Folder configuration using this tool chain; `None` for extension
    /// tool chains.
    pub folder: Option<ResourceId>,

    pub super_class: Option<ToolChainId>,
    pub(crate) super_class_ref: Option<String>,

    pub options: OptionSet,

    /// Local tools keyed by id, in insertion order.
    pub tools: IndexMap<String, ToolId>,

    /// Ids of tools producing the final artifact, in preference order.
    pub target_tools: Option<Vec<String>>,

    /// Ids of inherited tools removed from this tool chain.
    pub unused_children: BTreeSet<String>,

    pub properties: Option<PropertySupport>,
    pub supports_managed_build: Option<bool>,
    pub is_abstract: bool,
}

impl ToolChain {
    pub fn new(meta: EntityMeta, folder: Option<ResourceId>) -> Self {
        Self {
            meta,
            folder,
            super_class: None,
            super_class_ref: None,
            options: OptionSet::default(),
            tools: IndexMap::new(),
            target_tools: None,
            unused_children: BTreeSet::new(),
            properties: None,
            supports_managed_build: None,
            is_abstract: false,
        }
    }
}

impl BuildModel {
    /// The tool chain followed by its superclass chain.
    pub fn tool_chain_lineage(&self, id: ToolChainId) -> impl Iterator<Item = ToolChainId> + '_ {
        std::iter::successors(Some(id), move |t| self.tool_chain(*t).super_class)
    }

    pub fn real_tool_chain(&self, id: ToolChainId) -> ToolChainId {
        self.tool_chain_lineage(id).last().unwrap_or(id)
    }

    pub fn extension_tool_chain(&self, id: ToolChainId) -> Option<ToolChainId> {
        self.tool_chain_lineage(id)
            .find(|t| self.tool_chain(*t).meta.is_extension)
    }

    pub fn tool_chain_name(&self, id: ToolChainId) -> Option<&str> {
        self.tool_chain_lineage(id)
            .find_map(|t| self.tool_chain(t).meta.name.as_deref())
    }

    pub fn tool_chain_target_tools(&self, id: ToolChainId) -> &[String] {
        self.tool_chain_lineage(id)
            .find_map(|t| self.tool_chain(t).target_tools.as_deref())
            .unwrap_or(&[])
    }

    pub fn tool_chain_properties(&self, id: ToolChainId) -> Option<&PropertySupport> {
        self.tool_chain_lineage(id)
            .find_map(|t| self.tool_chain(t).properties.as_ref())
    }

    pub fn tool_chain_supports_managed_build(&self, id: ToolChainId) -> bool {
        self.tool_chain_lineage(id)
            .find_map(|t| self.tool_chain(t).supports_managed_build)
            .unwrap_or(true)
    }

    /// Whether `tool` is one of the tool chain's target tools (matched
    /// through the tool's superclass chain).
    pub fn is_target_tool(&self, tc: ToolChainId, tool: ToolId) -> bool {
        let targets = self.tool_chain_target_tools(tc);
        self.tool_lineage(tool)
            .any(|t| targets.iter().any(|id| *id == self.tool(t).meta.id))
    }
}
