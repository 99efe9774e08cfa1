//! Tool-set modification of folder and file resource configurations.
//!
//! Computing a modification is side-effect free: it predicts the resulting
//! tool set and reports conflicts and property problems as data. Applying
//! it is a separate step that mutates the model.

pub mod converter;
mod properties;

pub use converter::{
    copy_settings, Converted, ConverterRegistry, ConverterRule, CopySettingsConverter, ToolConverter,
    COPY_SETTINGS,
};
pub use properties::PropertyReport;

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

use crate::error::{ModelError, Result};
use crate::model::{BuildModel, EntityKey, ResourceId, ResourceKind, ToolChainId, ToolId, ToolParent};

/// A removed tool paired with the added tool it converts into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingConversion {
    pub from: ToolId,
    pub to: ToolId,
    pub rule: ConverterRule,
}

/// Predicted outcome of adding and removing tools on one resource.
#[derive(Debug, Clone)]
pub struct ToolSetModification {
    pub resource: ResourceId,
    /// Tools that will be instantiated as plain project tools.
    pub added_tools: Vec<ToolId>,
    /// Live tools that will be removed (conversion sources excluded).
    pub removed_tools: Vec<ToolId>,
    pub conversions: Vec<PendingConversion>,
    /// Predicted tool set, before applicability filtering.
    pub resulting_tools: Vec<ToolId>,
    /// Groups of two or more applicable tools sharing an input extension.
    pub conflicts: Vec<Vec<ToolId>>,
    pub unsupported_required_properties: BTreeSet<String>,
    /// Selected property values (type to value) no longer satisfiable.
    pub unsupported_selected_properties: BTreeMap<String, String>,
    /// Selected property types with no declaration.
    pub undefined_property_types: BTreeSet<String>,
    pub non_managed_tools: Vec<ToolId>,
}

impl ToolSetModification {
    /// No conflicts and no property problems.
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
            && self.unsupported_required_properties.is_empty()
            && self.unsupported_selected_properties.is_empty()
    }
}

/// What happened to the target tool list when applying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum TargetToolChange {
    Replaced { old: String, new: String },
    /// A target tool was removed and nothing in the new set replaces it.
    Unresolved { removed: String },
}

/// Result of applying a modification.
#[derive(Debug, Clone)]
pub struct AppliedModification {
    /// (removed tool, converted tool) for each successful conversion.
    pub converted: Vec<(ToolId, ToolId)>,
    /// New project tools from plain adds, conversion fallbacks included.
    pub added: Vec<ToolId>,
    pub removed: Vec<ToolId>,
    /// One entry per removed target tool, in removal order.
    pub target_tools: Vec<TargetToolChange>,
}

impl BuildModel {
    /// Tools currently configured on `resource`, before applicability filtering.
    pub fn resource_tools(&self, resource: ResourceId) -> Vec<ToolId> {
        match &self.resource(resource).kind {
            ResourceKind::Folder { tool_chain: Some(tc) } => self.tool_chain_tools(*tc),
            ResourceKind::Folder { tool_chain: None } => Vec::new(),
            ResourceKind::File { tools } => tools.clone(),
        }
    }

    fn tool_parent(&self, resource: ResourceId) -> Result<ToolParent> {
        match self.resource(resource).kind {
            ResourceKind::Folder { tool_chain: Some(tc) } => Ok(ToolParent::ToolChain(tc)),
            ResourceKind::Folder { tool_chain: None } => Err(ModelError::InvalidElement {
                element: "folderInfo".into(),
                reason: format!("{} has no tool chain", self.resource(resource).meta.id),
            }),
            ResourceKind::File { .. } => Ok(ToolParent::Resource(resource)),
        }
    }

    fn owned_by(&self, tool: ToolId, resource: ResourceId) -> bool {
        !self.tool(tool).meta.is_extension && self.owning_resource(tool) == Some(resource)
    }

    /// Compute the effect of removing `removed` and adding `added` on
    /// `resource` without changing the model.
    pub fn modify_tool_set(&self, resource: ResourceId, removed: &[ToolId], added: &[ToolId]) -> Result<ToolSetModification> {
        let live = self.resource_tools(resource);
        let live_reals: BTreeSet<ToolId> = live.iter().map(|t| self.real_tool(*t)).collect();

        let mut removed_by_real: IndexMap<ToolId, ToolId> = IndexMap::new();
        for t in removed {
            removed_by_real.entry(self.real_tool(*t)).or_insert(*t);
        }
        let mut added_by_real: IndexMap<ToolId, ToolId> = IndexMap::new();
        for t in added {
            added_by_real.entry(self.real_tool(*t)).or_insert(*t);
        }

        // Same real tool on both sides: nothing to do for it.
        let both: Vec<ToolId> = removed_by_real
            .keys()
            .filter(|k| added_by_real.contains_key(*k))
            .copied()
            .collect();
        for real in both {
            removed_by_real.shift_remove(&real);
            added_by_real.shift_remove(&real);
        }
        removed_by_real.retain(|real, tool| {
            let keep = live_reals.contains(real);
            if !keep {
                debug!(tool = %self.tool(*tool).meta.id, "dropping stale removal");
            }
            keep
        });
        added_by_real.retain(|real, _| !live_reals.contains(real));

        // Map removals onto the live instances they designate.
        let mut removed_live: IndexMap<ToolId, ToolId> = IndexMap::new();
        for real in removed_by_real.keys() {
            if let Some(t) = live.iter().find(|t| self.real_tool(**t) == *real) {
                removed_live.insert(*real, *t);
            }
        }

        let mut conversions = Vec::new();
        for (real, from) in removed_live.clone() {
            if !self.owned_by(from, resource) || !self.has_tool_converters(from) {
                continue;
            }
            let candidate = added_by_real.iter().find_map(|(added_real, to)| {
                if self.owned_by(*to, resource) {
                    return None;
                }
                self.tool_converter_rule(from, *to)
                    .map(|rule| (*added_real, *to, rule.clone()))
            });
            if let Some((added_real, to, rule)) = candidate {
                added_by_real.shift_remove(&added_real);
                removed_live.shift_remove(&real);
                conversions.push(PendingConversion { from, to, rule });
            }
        }

        let mut resulting_tools: Vec<ToolId> = live.clone();
        for conversion in &conversions {
            let real = self.real_tool(conversion.from);
            if let Some(slot) = resulting_tools.iter().position(|t| self.real_tool(*t) == real) {
                resulting_tools[slot] = conversion.to;
            }
        }
        resulting_tools.retain(|t| !removed_live.contains_key(&self.real_tool(*t)));
        for (real, tool) in &added_by_real {
            if !resulting_tools.iter().any(|t| self.real_tool(*t) == *real) {
                resulting_tools.push(*tool);
            }
        }

        let applicable = self.filter_tools(resource, &resulting_tools);
        let conflicts = self.input_conflicts(&applicable);
        let tool_chain = self.resource(resource).tool_chain();
        let cfg = self.resource(resource).configuration;
        let report = self.property_report(cfg, tool_chain, &resulting_tools);
        let managed = self.configuration(cfg).managed_build
            && tool_chain.map_or(true, |tc| self.tool_chain_supports_managed_build(tc));
        let non_managed_tools = if managed {
            resulting_tools
                .iter()
                .copied()
                .filter(|t| !self.tool_supports_managed_build(*t))
                .collect()
        } else {
            Vec::new()
        };

        Ok(ToolSetModification {
            resource,
            added_tools: added_by_real.values().copied().collect(),
            removed_tools: removed_live.values().copied().collect(),
            conversions,
            resulting_tools,
            conflicts,
            unsupported_required_properties: report.unsupported_required,
            unsupported_selected_properties: report.unsupported_selected,
            undefined_property_types: report.undefined_types,
            non_managed_tools,
        })
    }

    /// Groups of tools claiming the same input extension, each group and
    /// the group list sorted by tool id.
    pub fn input_conflicts(&self, tools: &[ToolId]) -> Vec<Vec<ToolId>> {
        let mut by_ext: BTreeMap<String, BTreeSet<ToolId>> = BTreeMap::new();
        for t in tools {
            for ext in self.all_input_extensions(*t) {
                by_ext.entry(ext).or_default().insert(*t);
            }
        }
        let mut groups: Vec<Vec<ToolId>> = Vec::new();
        for members in by_ext.into_values().filter(|m| m.len() > 1) {
            let mut group: Vec<ToolId> = members.into_iter().collect();
            group.sort_by(|a, b| self.tool(*a).meta.id.cmp(&self.tool(*b).meta.id));
            if !groups.contains(&group) {
                groups.push(group);
            }
        }
        groups.sort_by(|a, b| {
            let ids = |g: &Vec<ToolId>| g.iter().map(|t| self.tool(*t).meta.id.clone()).collect::<Vec<_>>();
            ids(a).cmp(&ids(b))
        });
        groups
    }

    /// Apply a computed modification.
    ///
    /// Conversions run first (falling back to a plain add when the converter
    /// is missing or yields the wrong kind), then plain adds, then removals
    /// with dependents disconnected beforehand. The rebuild and
    /// applicability hooks run once at the end.
    pub fn apply_tool_set_modification(&mut self, modification: &ToolSetModification) -> Result<AppliedModification> {
        let resource = modification.resource;
        let parent = self.tool_parent(resource)?;

        let mut converted = Vec::new();
        let mut added = Vec::new();
        let mut to_remove: Vec<ToolId> = modification.removed_tools.clone();

        for conversion in &modification.conversions {
            let result = self
                .converters
                .converter(&conversion.rule.converter)
                .map(|c| c.convert(self, conversion.from.into(), conversion.to.into(), parent))
                .unwrap_or(Converted::None);
            match result {
                Converted::Tool(new_tool) if result.matches_kind(EntityKey::Tool(conversion.from)) => {
                    self.unmask_tool(parent, new_tool);
                    converted.push((conversion.from, new_tool));
                }
                _ => {
                    warn!(
                        from = %self.tool(conversion.from).meta.id,
                        converter = %conversion.rule.converter,
                        "conversion failed, adding tool instead"
                    );
                    let tool = self.create_project_tool(parent, conversion.to);
                    self.unmask_tool(parent, tool);
                    added.push(tool);
                }
            }
            to_remove.push(conversion.from);
        }

        for tool in &modification.added_tools {
            let new_tool = self.create_project_tool(parent, *tool);
            self.unmask_tool(parent, new_tool);
            added.push(new_tool);
        }

        let mut target_tools = Vec::new();
        let remaining: Vec<ToolId> = {
            let gone: BTreeSet<ToolId> = to_remove.iter().map(|t| self.real_tool(*t)).collect();
            let mut tools: Vec<ToolId> = self
                .resource_tools(resource)
                .into_iter()
                .filter(|t| !gone.contains(&self.real_tool(*t)))
                .collect();
            for (_, new_tool) in &converted {
                if !tools.contains(new_tool) {
                    tools.push(*new_tool);
                }
            }
            tools
        };

        for tool in &to_remove {
            self.disconnect_dependents(*tool);
            if let Some(change) = self.adjust_target_tool(resource, *tool, &remaining) {
                target_tools.push(change);
            }
            self.detach_tool(resource, *tool);
        }

        self.set_rebuild_state(resource.into(), true);
        self.set_dirty(resource.into(), true);
        self.recompute_applicability(resource);
        info!(
            resource = %self.resource(resource).meta.id,
            converted = converted.len(),
            added = added.len(),
            removed = to_remove.len(),
            "applied tool-set modification"
        );

        Ok(AppliedModification {
            converted,
            added,
            removed: to_remove,
            target_tools,
        })
    }

    /// Lift unused-children masks covering `tool` so a tool added back to
    /// a tool chain is live again.
    fn unmask_tool(&mut self, parent: ToolParent, tool: ToolId) {
        let ToolParent::ToolChain(tc) = parent else {
            return;
        };
        let lineage: Vec<String> = self.tool_lineage(tool).map(|t| self.tool(t).meta.id.clone()).collect();
        let unused = &mut self.tool_chain_mut(tc).unused_children;
        for id in &lineage {
            if unused.remove(id) {
                debug!(tool = %id, "unmasked re-added tool");
            }
        }
    }

    /// Copy settings into tools whose superclass is `tool`, then point them
    /// past it.
    fn disconnect_dependents(&mut self, tool: ToolId) {
        let Some(cfg) = self.config_of(tool.into()) else {
            return;
        };
        let dependents: Vec<ToolId> = (0..self.tools.len())
            .map(ToolId::from_index)
            .filter(|t| self.tool(*t).super_class == Some(tool) && self.config_of((*t).into()) == Some(cfg))
            .collect();
        for dependent in dependents {
            copy_settings(self, tool.into(), dependent.into(), false);
            if self.tool(dependent).command.is_none() {
                let command = self
                    .tool_lineage(tool)
                    .take_while(|t| !self.tool(*t).meta.is_extension)
                    .find_map(|t| self.tool(t).command.clone());
                self.tool_mut(dependent).command = command;
            }
            let next = self.tool(tool).super_class;
            self.tool_mut(dependent).super_class = next;
            self.mark_changed(dependent.into());
            debug!(tool = %self.tool(dependent).meta.id, "disconnected dependent tool");
        }
    }

    /// Remove `tool` from the resource's tool list; inherited tools are
    /// masked through the tool chain's unused children.
    fn detach_tool(&mut self, resource: ResourceId, tool: ToolId) {
        match self.resource(resource).kind.clone() {
            ResourceKind::Folder { tool_chain: Some(tc) } => {
                let id = self.tool(tool).meta.id.clone();
                let local = self.tool_chain_mut(tc).tools.shift_remove(&id).is_some();
                let inherited = self
                    .tool_chain(tc)
                    .super_class
                    .map(|s| self.tool_chain_tools(s))
                    .unwrap_or_default()
                    .into_iter()
                    .find(|t| self.tool_lineage(tool).any(|a| a == *t));
                if let Some(base) = inherited {
                    let base_id = self.tool(base).meta.id.clone();
                    self.tool_chain_mut(tc).unused_children.insert(base_id);
                } else if !local {
                    self.tool_chain_mut(tc).unused_children.insert(id);
                }
            }
            ResourceKind::File { .. } => {
                if let ResourceKind::File { tools } = &mut self.resource_mut(resource).kind {
                    tools.retain(|t| *t != tool);
                }
            }
            ResourceKind::Folder { tool_chain: None } => {}
        }
    }

    /// Substitute `removed` in the root tool chain's target tools with the
    /// extension tool of its replacement; other targets stay in place.
    fn adjust_target_tool(&mut self, resource: ResourceId, removed: ToolId, remaining: &[ToolId]) -> Option<TargetToolChange> {
        if !self.resource(resource).is_root() {
            return None;
        }
        let tc = self.resource(resource).tool_chain()?;
        let mut targets = self.tool_chain_target_tools(tc).to_vec();
        let slot = self
            .tool_lineage(removed)
            .find_map(|t| targets.iter().position(|id| *id == self.tool(t).meta.id))?;
        let removed_id = targets[slot].clone();
        let outputs = self.all_output_extensions(removed);
        let variables: Vec<String> = self
            .tool_output_types(removed)
            .iter()
            .filter_map(|o| o.build_variable.clone())
            .collect();
        let replacement = remaining
            .iter()
            .copied()
            .find(|t| self.all_output_extensions(*t).iter().any(|e| outputs.contains(e)))
            .or_else(|| {
                remaining.iter().copied().find(|t| {
                    self.tool_output_types(*t)
                        .iter()
                        .filter_map(|o| o.build_variable.as_ref())
                        .any(|v| variables.contains(v))
                })
            });
        match replacement {
            Some(new_tool) => {
                let ext = self.extension_tool(new_tool).unwrap_or(new_tool);
                let new_id = self.tool(ext).meta.id.clone();
                if targets.contains(&new_id) {
                    targets.remove(slot);
                } else {
                    targets[slot] = new_id.clone();
                }
                self.tool_chain_mut(tc).target_tools = Some(targets);
                Some(TargetToolChange::Replaced {
                    old: removed_id,
                    new: new_id,
                })
            }
            None => {
                warn!(tool = %removed_id, "target tool removed without replacement");
                Some(TargetToolChange::Unresolved { removed: removed_id })
            }
        }
    }

    /// Swap the folder's tool chain for one derived from `new_super`.
    ///
    /// A no-op when both share the same real tool chain. Otherwise local tool
    /// settings move to the best-matching new tool: same real tool, then a
    /// converter rule, then shared input extensions.
    pub fn change_tool_chain(&mut self, folder: ResourceId, new_super: ToolChainId) -> Result<ToolChainId> {
        let current = match self.resource(folder).kind {
            ResourceKind::Folder { tool_chain: Some(tc) } => tc,
            _ => {
                return Err(ModelError::WrongResourceKind {
                    id: self.resource(folder).meta.id.clone(),
                    expected: "folder with a tool chain",
                })
            }
        };
        if self.real_tool_chain(current) == self.real_tool_chain(new_super) {
            return Ok(current);
        }

        let old_tools: Vec<ToolId> = self
            .tool_chain_tools(current)
            .into_iter()
            .filter(|t| !self.tool(*t).meta.is_extension)
            .collect();

        let tc = self.create_project_tool_chain(folder, new_super);
        copy_settings(self, current.into(), tc.into(), true);
        let mut new_tools = Vec::new();
        for tool in self.tool_chain_tools(new_super) {
            new_tools.push(self.create_project_tool(ToolParent::ToolChain(tc), tool));
        }

        for old in old_tools {
            let real = self.real_tool(old);
            let inputs = self.all_input_extensions(old);
            let target = new_tools
                .iter()
                .copied()
                .find(|t| self.real_tool(*t) == real)
                .or_else(|| new_tools.iter().copied().find(|t| self.tool_converter_rule(old, *t).is_some()))
                .or_else(|| {
                    new_tools
                        .iter()
                        .copied()
                        .find(|t| self.all_input_extensions(*t).iter().any(|e| inputs.contains(e)))
                });
            if let Some(target) = target {
                copy_settings(self, old.into(), target.into(), true);
            }
        }

        self.set_rebuild_state(folder.into(), true);
        self.recompute_applicability(folder);
        info!(
            folder = %self.resource(folder).meta.id,
            tool_chain = %self.tool_chain(tc).meta.id,
            "changed tool chain"
        );
        Ok(tc)
    }

    /// Whether `candidate` could replace the folder's tool chain: same real
    /// tool chain, a converter rule, or no property incompatibility.
    pub fn is_tool_chain_compatible(&self, folder: ResourceId, candidate: ToolChainId) -> bool {
        let Some(current) = self.resource(folder).tool_chain() else {
            return false;
        };
        if self.real_tool_chain(current) == self.real_tool_chain(candidate) {
            return true;
        }
        if self
            .converters
            .find_rule(&self.tool_chain_lineage_ids(current), &self.tool_chain_lineage_ids(candidate))
            .is_some()
        {
            return true;
        }
        let cfg = self.resource(folder).configuration;
        let tools = self.tool_chain_tools(candidate);
        let report = self.property_report(cfg, Some(candidate), &tools);
        report.unsupported_required.is_empty() && report.unsupported_selected.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures;
    use crate::model::InputType;
    use crate::value::TypedValue;

    fn setup() -> (BuildModel, fixtures::Gnu, ResourceId) {
        let mut model = BuildModel::new();
        let gnu = fixtures::gnu(&mut model);
        let cfg = model.new_configuration("cfg", None, gnu.tool_chain).unwrap();
        let root = model.root_folder(cfg).unwrap();
        (model, gnu, root)
    }

    #[test]
    fn test_same_real_tool_on_both_sides_is_noop() {
        let (model, gnu, root) = setup();
        let m = model
            .modify_tool_set(root, &[gnu.compiler], &[gnu.compiler])
            .unwrap();
        assert!(m.added_tools.is_empty());
        assert!(m.removed_tools.is_empty());
        assert_eq!(m.resulting_tools.len(), 2);
    }

    #[test]
    fn test_stale_removal_dropped() {
        let (mut model, _gnu, root) = setup();
        let stray = model.define_tool(None, "stray", None);
        let m = model.modify_tool_set(root, &[stray], &[]).unwrap();
        assert!(m.removed_tools.is_empty());
    }

    #[test]
    fn test_conflicts_are_data_only() {
        let (mut model, _gnu, root) = setup();
        let clang = model.define_tool(None, "clang.cc", None);
        model.tool_mut(clang).input_types.push(InputType {
            id: "clang.in".into(),
            extensions: vec!["c".into()],
            ..InputType::default()
        });
        let before = model.resource_tools(root);
        let m = model.modify_tool_set(root, &[], &[clang]).unwrap();
        assert_eq!(m.conflicts.len(), 1);
        assert_eq!(m.conflicts[0].len(), 2);
        assert!(m.conflicts[0].contains(&clang));
        assert!(!m.is_clean());
        assert_eq!(model.resource_tools(root), before);
    }

    #[test]
    fn test_remove_target_tool_unresolved() {
        let (mut model, gnu, root) = setup();
        let m = model.modify_tool_set(root, &[gnu.linker], &[]).unwrap();
        assert_eq!(m.removed_tools.len(), 1);
        let applied = model.apply_tool_set_modification(&m).unwrap();
        assert_eq!(
            applied.target_tools,
            vec![TargetToolChange::Unresolved {
                removed: "gnu.link".into()
            }]
        );
        let tools = model.resource_tools(root);
        assert_eq!(tools.len(), 1);
        assert_eq!(model.real_tool(tools[0]), gnu.compiler);
    }

    #[test]
    fn test_remove_and_add_replaces_target_tool() {
        let (mut model, gnu, root) = setup();
        let linker2 = model.define_tool(None, "gnu.link2", None);
        model.tool_mut(linker2).output_types = model.tool(gnu.linker).output_types.clone();

        let m = model.modify_tool_set(root, &[gnu.linker], &[linker2]).unwrap();
        let applied = model.apply_tool_set_modification(&m).unwrap();
        assert_eq!(
            applied.target_tools,
            vec![TargetToolChange::Replaced {
                old: "gnu.link".into(),
                new: "gnu.link2".into(),
            }]
        );
        assert!(model.needs_rebuild(root.into()));
    }

    #[test]
    fn test_replaced_target_tool_keeps_other_targets() {
        let mut model = BuildModel::new();
        let gnu = fixtures::gnu(&mut model);
        model.tool_chain_mut(gnu.tool_chain).target_tools = Some(vec!["gnu.link".into(), "gnu.cc".into()]);
        let cfg = model.new_configuration("cfg", None, gnu.tool_chain).unwrap();
        let root = model.root_folder(cfg).unwrap();
        let tc = model.resource(root).tool_chain().unwrap();
        let linker = model.tool_chain_tools(tc)[1];
        let linker2 = model.define_tool(None, "gnu.link2", None);
        model.tool_mut(linker2).output_types = model.tool(gnu.linker).output_types.clone();

        let m = model.modify_tool_set(root, &[linker], &[linker2]).unwrap();
        model.apply_tool_set_modification(&m).unwrap();
        assert_eq!(
            model.tool_chain_target_tools(tc),
            ["gnu.link2".to_string(), "gnu.cc".to_string()]
        );
    }

    #[test]
    fn test_removed_tool_can_be_added_back() {
        let (mut model, gnu, root) = setup();
        let m = model.modify_tool_set(root, &[gnu.linker], &[]).unwrap();
        model.apply_tool_set_modification(&m).unwrap();
        assert_eq!(model.resource_tools(root).len(), 1);

        let m = model.modify_tool_set(root, &[], &[gnu.linker]).unwrap();
        assert_eq!(m.added_tools, vec![gnu.linker]);
        assert_eq!(m.resulting_tools.len(), 2);
        let applied = model.apply_tool_set_modification(&m).unwrap();

        let tools = model.resource_tools(root);
        assert_eq!(tools.len(), 2);
        assert!(tools.contains(&applied.added[0]));
        assert_eq!(model.real_tool(applied.added[0]), gnu.linker);
    }

    #[test]
    fn test_removed_tool_disconnects_dependents() {
        let (mut model, gnu, root) = setup();
        let cfg = model.resource(root).configuration;
        let linker = model.resource_tools(root)[1];
        model
            .set_option_list(linker.into(), gnu.libs.into(), vec!["m".to_string()])
            .unwrap();
        let file = model.create_file_info(cfg, "main.o").unwrap();
        let dependent = model.create_project_tool(ToolParent::Resource(file), linker);

        let m = model.modify_tool_set(root, &[linker], &[]).unwrap();
        model.apply_tool_set_modification(&m).unwrap();

        assert_eq!(model.tool(dependent).super_class, Some(gnu.linker));
        let libs = model.option_by_id(dependent.into(), "gnu.link.libs").unwrap();
        assert_eq!(model.option_value(libs), Some(TypedValue::List(vec!["m".to_string()])));
    }

    #[test]
    fn test_missing_converter_falls_back_to_add() {
        let (mut model, gnu, root) = setup();
        let linker = model.resource_tools(root)[1];
        let linker2 = model.define_tool(None, "gnu.link2", None);
        model.tool_mut(linker2).output_types = model.tool(gnu.linker).output_types.clone();
        model.converters_mut().register_rule(ConverterRule {
            id: "link-to-link2".into(),
            from_id: "gnu.link".into(),
            to_id: "gnu.link2".into(),
            converter: "unregistered".into(),
        });

        let m = model.modify_tool_set(root, &[linker], &[linker2]).unwrap();
        assert_eq!(m.conversions.len(), 1);
        let applied = model.apply_tool_set_modification(&m).unwrap();
        assert!(applied.converted.is_empty());
        assert_eq!(applied.added.len(), 1);
        assert_eq!(model.tool(applied.added[0]).super_class, Some(linker2));

        let tools = model.resource_tools(root);
        assert_eq!(tools.len(), 2);
        assert!(tools.contains(&applied.added[0]));
    }

    #[test]
    fn test_non_managed_tools_reported_only_for_managed_builds() {
        let (mut model, gnu, root) = setup();
        model.tool_mut(gnu.linker).supports_managed_build = Some(false);
        let m = model.modify_tool_set(root, &[], &[]).unwrap();
        assert_eq!(m.non_managed_tools.len(), 1);

        let cfg = model.resource(root).configuration;
        model.configuration_mut(cfg).managed_build = false;
        let m = model.modify_tool_set(root, &[], &[]).unwrap();
        assert!(m.non_managed_tools.is_empty());
    }

    #[test]
    fn test_change_tool_chain_same_real_is_noop() {
        let (mut model, gnu, root) = setup();
        let before = model.resource(root).tool_chain().unwrap();
        assert_eq!(model.change_tool_chain(root, gnu.tool_chain).unwrap(), before);
        assert!(model.is_tool_chain_compatible(root, gnu.tool_chain));
    }

    #[test]
    fn test_change_tool_chain_migrates_settings() {
        let (mut model, gnu, root) = setup();
        let tc = model.resource(root).tool_chain().unwrap();
        let cc = model.tool_chain_tools(tc)[0];
        model.set_option_bool(cc.into(), gnu.debug.into(), true).unwrap();

        let other_tc = model.define_tool_chain("other.tc", None);
        let other_cc = model.define_tool(Some(other_tc), "other.cc", None);
        model.tool_mut(other_cc).super_class = Some(gnu.compiler);

        let new_tc = model.change_tool_chain(root, other_tc).unwrap();
        assert_ne!(new_tc, tc);
        assert_eq!(model.resource(root).tool_chain(), Some(new_tc));
        let new_cc = model.tool_chain_tools(new_tc)[0];
        let debug = model.option_by_id(new_cc.into(), "gnu.cc.debug").unwrap();
        assert!(model.option_bool(debug).unwrap());
    }
}
