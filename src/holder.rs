//! Effective option, category and tool lists of holders.
//!
//! A holder's effective list is its superclass's list with each local
//! override dropped into the slot of the entry it overrides; local entries
//! that override nothing in the base are appended.

use std::collections::BTreeSet;
use tracing::trace;

use crate::model::{
    BuildModel, CategoryId, HolderKey, OptionId, ResourceId, ResourceKind, ToolChainId, ToolId,
};

/// Superclass links of one arena entity kind.
pub trait Lineage<K: Copy> {
    fn id_of(&self, key: K) -> &str;

    fn super_of(&self, key: K) -> Option<K>;

    /// Entity converted from a legacy reference; compared through its
    /// superclass when matched as a base entry.
    fn from_reference(&self, _key: K) -> bool {
        false
    }
}

impl Lineage<OptionId> for BuildModel {
    fn id_of(&self, key: OptionId) -> &str {
        &self.option(key).meta.id
    }

    fn super_of(&self, key: OptionId) -> Option<OptionId> {
        self.option(key).super_class
    }

    fn from_reference(&self, key: OptionId) -> bool {
        self.option(key).from_reference
    }
}

impl Lineage<CategoryId> for BuildModel {
    fn id_of(&self, key: CategoryId) -> &str {
        &self.category(key).meta.id
    }

    fn super_of(&self, key: CategoryId) -> Option<CategoryId> {
        self.category(key).super_class
    }
}

impl Lineage<ToolId> for BuildModel {
    fn id_of(&self, key: ToolId) -> &str {
        &self.tool(key).meta.id
    }

    fn super_of(&self, key: ToolId) -> Option<ToolId> {
        self.tool(key).super_class
    }
}

/// Merge `locals` over `base`.
///
/// For each local entry the base list is scanned in order; a base entry
/// matches when its id (its superclass id if it came from a reference)
/// equals the id of any strict ancestor of the local entry. The first
/// matching base position is replaced. Unmatched locals are appended.
pub fn merge_overrides<K, G>(graph: &G, base: Vec<K>, locals: impl IntoIterator<Item = K>) -> Vec<K>
where
    K: Copy,
    G: Lineage<K>,
{
    let mut merged = base;
    for local in locals {
        let ancestors: Vec<&str> = std::iter::successors(graph.super_of(local), |k| graph.super_of(*k))
            .map(|k| graph.id_of(k))
            .collect();
        let slot = merged.iter().position(|candidate| {
            let compared = if graph.from_reference(*candidate) {
                graph.super_of(*candidate)
            } else {
                Some(*candidate)
            };
            compared
                .map(|c| ancestors.contains(&graph.id_of(c)))
                .unwrap_or(false)
        });
        match slot {
            Some(i) => merged[i] = local,
            None => merged.push(local),
        }
    }
    merged
}

impl BuildModel {
    /// Merged options of `holder` before validity filtering.
    pub fn merged_options(&self, holder: HolderKey) -> Vec<OptionId> {
        let base = self
            .holder_super(holder)
            .map(|s| self.merged_options(s))
            .unwrap_or_default();
        merge_overrides(self, base, self.option_set(holder).local_options())
    }

    /// Options visible through `holder`: merged list minus options without a
    /// value type and options hidden by applicability in this holder.
    pub fn effective_options(&self, holder: HolderKey) -> Vec<OptionId> {
        let hidden = &self.option_set(holder).hidden;
        self.merged_options(holder)
            .into_iter()
            .filter(|o| !hidden.contains(o) && self.option_value_type(*o).is_some())
            .collect()
    }

    pub fn effective_categories(&self, holder: HolderKey) -> Vec<CategoryId> {
        let base = self
            .holder_super(holder)
            .map(|s| self.effective_categories(s))
            .unwrap_or_default();
        merge_overrides(self, base, self.option_set(holder).local_categories())
    }

    /// Effective option of `holder` overriding (or being) `option_id`.
    pub fn option_by_id(&self, holder: HolderKey, option_id: &str) -> Option<OptionId> {
        self.effective_options(holder)
            .into_iter()
            .find(|o| self.option_chain_contains(*o, option_id))
    }

    /// Effective tools of a tool chain: merged over its superclass chain,
    /// minus tools marked unused.
    pub fn tool_chain_tools(&self, tc: ToolChainId) -> Vec<ToolId> {
        let tool_chain = self.tool_chain(tc);
        let base = tool_chain
            .super_class
            .map(|s| self.tool_chain_tools(s))
            .unwrap_or_default();
        let merged = merge_overrides(self, base, tool_chain.tools.values().copied());
        if tool_chain.unused_children.is_empty() {
            return merged;
        }
        merged
            .into_iter()
            .filter(|t| {
                !self
                    .tool_lineage(*t)
                    .any(|a| tool_chain.unused_children.contains(&self.tool(a).meta.id))
            })
            .collect()
    }

    /// Applicability rule of an option, inherited through its chain.
    pub fn option_applicability(&self, option: OptionId) -> Option<&crate::model::Enablement> {
        self.option_chain(option)
            .find_map(|o| self.option(o).applicability.as_ref())
    }

    fn compute_hidden(&self, holder: HolderKey) -> BTreeSet<OptionId> {
        self.merged_options(holder)
            .into_iter()
            .filter(|o| {
                self.option_applicability(*o)
                    .map(|rule| !self.evaluate(rule, holder))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Refresh hidden option sets of every holder under `resource`.
    pub fn recompute_applicability(&mut self, resource: ResourceId) {
        let holders: Vec<HolderKey> = match &self.resource(resource).kind {
            ResourceKind::Folder { tool_chain: Some(tc) } => std::iter::once(HolderKey::ToolChain(*tc))
                .chain(self.tool_chain_tools(*tc).into_iter().map(HolderKey::Tool))
                .collect(),
            ResourceKind::Folder { tool_chain: None } => Vec::new(),
            ResourceKind::File { tools } => tools.iter().map(|t| HolderKey::Tool(*t)).collect(),
        };
        for holder in holders {
            let hidden = self.compute_hidden(holder);
            // Extension holders are shared; their view is not scoped to a resource.
            if !self.meta(holder.into()).is_extension {
                self.option_set_mut(holder).hidden = hidden;
            }
        }
        let r = self.resource_mut(resource);
        r.applicability_epoch += 1;
        trace!(resource = %r.meta.id, epoch = r.applicability_epoch, "recomputed applicability");
    }
}
