//! Reference resolution pass.

use tracing::{debug, warn};

use crate::error::ResolveError;
use crate::model::{
    BuildModel, CategoryId, ConfigId, EntityKey, HolderKey, OptionId, ResourceId, ToolChainId, ToolId, ToolRefId,
};
use crate::reference::{OptionHandle, ToolHandle};
use crate::value::{TypedValue, ValueShape};

impl BuildModel {
    fn record(&mut self, err: ResolveError) {
        warn!(%err, "resolution failure");
        self.diagnostics.push(err);
    }

    /// Look up a stored id, recording a diagnostic when nothing matches.
    fn resolve_relation<K: Copy>(
        &mut self,
        kind: &'static str,
        id: &str,
        relation: &'static str,
        target: String,
        scope: Option<ConfigId>,
        pick: impl Fn(&EntityKey) -> Option<K>,
    ) -> Option<K> {
        let found = self.resolve_key(&target, scope, pick);
        if found.is_none() {
            self.record(ResolveError::UnresolvedId {
                kind,
                id: id.to_string(),
                relation,
                target,
            });
        }
        found
    }

    fn cycle(&mut self, kind: &'static str, id: String, target: String) {
        self.record(ResolveError::Cycle { kind, id, target });
    }

    /// Turn stored ids into keys.
    ///
    /// Each unresolved entity is visited once, so calling this again only
    /// touches entities loaded since. Ids that do not resolve are logged and
    /// recorded as diagnostics; the entity then behaves as if the relation
    /// were absent. Returns the number of entities resolved.
    pub fn resolve_references(&mut self) -> usize {
        let mut resolved = 0;

        let configurations: Vec<ConfigId> = (0..self.configurations.len())
            .map(ConfigId::from_index)
            .filter(|c| !self.configuration(*c).meta.resolved)
            .collect();
        for cfg in &configurations {
            let cfg = *cfg;
            if let Some(target) = self.configuration_mut(cfg).parent_ref.take() {
                let id = self.configuration(cfg).meta.id.clone();
                let parent = self.resolve_relation("configuration", &id, "parent", target, None, |k| match k {
                    EntityKey::Configuration(c) if *c != cfg => Some(*c),
                    _ => None,
                });
                self.configuration_mut(cfg).parent = parent;
            }
            self.configuration_mut(cfg).meta.resolved = true;
        }
        resolved += configurations.len();

        let tool_chains: Vec<ToolChainId> = (0..self.tool_chains.len())
            .map(ToolChainId::from_index)
            .filter(|t| !self.tool_chain(*t).meta.resolved)
            .collect();
        for tc in &tool_chains {
            let tc = *tc;
            if let Some(target) = self.tool_chain_mut(tc).super_class_ref.take() {
                let id = self.tool_chain(tc).meta.id.clone();
                let scope = self.config_of(tc.into());
                let found = self.resolve_relation("toolChain", &id, "superClass", target.clone(), scope, |k| match k {
                    EntityKey::ToolChain(t) => Some(*t),
                    _ => None,
                });
                if let Some(s) = found {
                    if self.tool_chain_lineage(s).any(|t| t == tc) {
                        self.cycle("toolChain", id, target);
                    } else {
                        self.tool_chain_mut(tc).super_class = Some(s);
                    }
                }
            }
            self.tool_chain_mut(tc).meta.resolved = true;
        }
        resolved += tool_chains.len();

        let tools: Vec<ToolId> = (0..self.tools.len())
            .map(ToolId::from_index)
            .filter(|t| !self.tool(*t).meta.resolved)
            .collect();
        for tool in &tools {
            let tool = *tool;
            if let Some(target) = self.tool_mut(tool).super_class_ref.take() {
                let id = self.tool(tool).meta.id.clone();
                let scope = self.config_of(tool.into());
                let found = self.resolve_relation("tool", &id, "superClass", target.clone(), scope, |k| match k {
                    EntityKey::Tool(t) => Some(*t),
                    _ => None,
                });
                if let Some(s) = found {
                    if self.tool_lineage(s).any(|t| t == tool) {
                        self.cycle("tool", id, target);
                    } else {
                        self.tool_mut(tool).super_class = Some(s);
                    }
                }
            }
            self.tool_mut(tool).meta.resolved = true;
        }
        resolved += tools.len();

        let categories: Vec<CategoryId> = (0..self.categories.len())
            .map(CategoryId::from_index)
            .filter(|c| !self.category(*c).meta.resolved)
            .collect();
        for category in &categories {
            let category = *category;
            let id = self.category(category).meta.id.clone();
            let scope = self.config_of(category.into());
            let pick = |k: &EntityKey| match k {
                EntityKey::Category(c) => Some(*c),
                _ => None,
            };
            if let Some(target) = self.category_mut(category).super_class_ref.take() {
                if let Some(s) = self.resolve_relation("optionCategory", &id, "superClass", target.clone(), scope, pick) {
                    if self.category_chain(s).any(|c| c == category) {
                        self.cycle("optionCategory", id.clone(), target);
                    } else {
                        self.category_mut(category).super_class = Some(s);
                    }
                }
            }
            if let Some(target) = self.category_mut(category).owner_ref.take() {
                let owner = self
                    .resolve_relation("optionCategory", &id, "owner", target, scope, pick)
                    .filter(|o| *o != category);
                self.category_mut(category).owner = owner;
            }
            self.category_mut(category).meta.resolved = true;
        }
        resolved += categories.len();

        let options: Vec<OptionId> = (0..self.options.len())
            .map(OptionId::from_index)
            .filter(|o| !self.option(*o).meta.resolved)
            .collect();
        for option in &options {
            let option = *option;
            let id = self.option(option).meta.id.clone();
            let scope = self.config_of(option.into());
            if let Some(target) = self.option_mut(option).super_class_ref.take() {
                let found = self.resolve_relation("option", &id, "superClass", target.clone(), scope, |k| match k {
                    EntityKey::Option(o) => Some(*o),
                    _ => None,
                });
                if let Some(s) = found {
                    if self.option_chain(s).any(|o| o == option) {
                        self.cycle("option", id.clone(), target);
                    } else {
                        self.option_mut(option).super_class = Some(s);
                    }
                }
            }
            if let Some(target) = self.option_mut(option).category_ref.take() {
                let category = self.resolve_relation("option", &id, "category", target, scope, |k| match k {
                    EntityKey::Category(c) => Some(*c),
                    _ => None,
                });
                self.option_mut(option).category = category;
            }
        }
        // Kinds come from ancestors, so they are settled once every
        // superclass is linked.
        for option in &options {
            self.settle_option_value(*option);
            self.option_mut(*option).meta.resolved = true;
        }
        resolved += options.len();

        resolved += self.resolve_tool_references();
        self.check_converter_rules();

        if resolved > 0 {
            let resources: Vec<ResourceId> = (0..self.resources.len()).map(ResourceId::from_index).collect();
            for resource in resources {
                self.recompute_applicability(resource);
            }
        }
        debug!(resolved, diagnostics = self.diagnostics.len(), "resolved references");
        resolved
    }

    /// Inherit the kind and parse stored value text against it.
    fn settle_option_value(&mut self, option: OptionId) {
        let id = self.option(option).meta.id.clone();
        let Some(kind) = self.option_value_type(option) else {
            self.record(ResolveError::UntypedOption { option: id });
            return;
        };
        let o = self.option_mut(option);
        o.value_type = Some(kind);
        if let Some(raw) = o.raw_value.take() {
            o.value = TypedValue::parse(&raw, kind);
            if o.value.is_none() {
                warn!(option = %id, value = %raw, kind = %kind, "stored value does not fit the option kind");
            }
        }
        if kind.shape() != ValueShape::Text {
            if let Some(TypedValue::Text(raw)) = o.default_value.take() {
                o.default_value = TypedValue::parse(&raw, kind);
            }
        }
    }

    fn resolve_tool_references(&mut self) -> usize {
        let mut resolved = 0;
        for index in 0..self.tool_refs.len() {
            let reference = ToolRefId::from_index(index);
            let Some(target) = self.tool_reference_mut(reference).target_ref.take() else {
                continue;
            };
            let owner = self.tool_reference(reference).owner;
            let owner_id = self.configuration(owner).meta.id.clone();
            let tool = self.resolve_relation("toolReference", &owner_id, "tool", target, Some(owner), |k| match k {
                EntityKey::Tool(t) => Some(*t),
                _ => None,
            });
            self.tool_reference_mut(reference).target = tool.map(ToolHandle::Direct);
            resolved += 1;

            let option_refs = self.tool_reference(reference).options.clone();
            for option_ref in option_refs {
                let Some(target) = self.option_reference_mut(option_ref).target_ref.take() else {
                    continue;
                };
                let found = tool
                    .and_then(|t| {
                        self.merged_options(HolderKey::Tool(t))
                            .into_iter()
                            .find(|o| self.option_chain_contains(*o, &target))
                    })
                    .or_else(|| self.find_option(&target));
                match found {
                    Some(option) => {
                        let kind = self.option_value_type(option);
                        let r = self.option_reference_mut(option_ref);
                        r.target = Some(OptionHandle::Direct(option));
                        if let (Some(raw), Some(kind)) = (r.raw_value.take(), kind) {
                            r.value = TypedValue::parse(&raw, kind);
                        }
                    }
                    None => self.record(ResolveError::UnresolvedId {
                        kind: "optionReference",
                        id: owner_id.clone(),
                        relation: "option",
                        target,
                    }),
                }
                resolved += 1;
            }
        }
        resolved
    }

    /// Rules naming unknown elements or converters stay registered but never
    /// match a live element; report them once.
    fn check_converter_rules(&mut self) {
        let start = self.converters.checked;
        let rules = self.converters.rules()[start..].to_vec();
        for rule in rules {
            for (relation, target) in [("fromId", &rule.from_id), ("toId", &rule.to_id)] {
                if self.lookup(target).is_empty() {
                    self.record(ResolveError::UnresolvedId {
                        kind: "converter",
                        id: rule.id.clone(),
                        relation,
                        target: target.clone(),
                    });
                }
            }
            if self.converters.converter(&rule.converter).is_none() {
                self.record(ResolveError::UnresolvedId {
                    kind: "converter",
                    id: rule.id.clone(),
                    relation: "converter",
                    target: rule.converter.clone(),
                });
            }
        }
        self.converters.checked = self.converters.rules().len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::fixtures::gnu_manifest;
    use crate::storage::*;
    use buildcfg_storage::StorageElement;

    #[test]
    fn test_resolve_links_manifest() {
        let mut model = BuildModel::new();
        model.load_manifest(&gnu_manifest()).unwrap();
        assert!(model.resolve_references() > 0);
        assert!(model.diagnostics().is_empty());

        let strict = model.find_tool("gnu.cc.strict").unwrap();
        assert_eq!(model.real_tool(strict), model.find_tool("gnu.cc").unwrap());
        let debug = model.find_option("gnu.cc.debug.strict").unwrap();
        assert_eq!(model.option_value(debug), Some(TypedValue::Bool(true)));
        assert_eq!(model.option_category(debug), model.option_category(model.find_option("gnu.cc.debug").unwrap()));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let mut model = BuildModel::new();
        model.load_manifest(&gnu_manifest()).unwrap();
        model.resolve_references();
        let diagnostics = model.diagnostics().len();
        assert_eq!(model.resolve_references(), 0);
        assert_eq!(model.diagnostics().len(), diagnostics);
    }

    #[test]
    fn test_missing_superclass_is_recoverable() {
        let mut model = BuildModel::new();
        let manifest = StorageElement::new(BUILD_DEFINITIONS)
            .with_child(
                StorageElement::new(TOOL)
                    .with_attribute(ID, "orphan")
                    .with_attribute(SUPER_CLASS, "missing.tool"),
            )
            .with_child(
                StorageElement::new(CONVERTER)
                    .with_attribute(ID, "bad")
                    .with_attribute(FROM_ID, "orphan")
                    .with_attribute(TO_ID, "nowhere")
                    .with_attribute(CONVERTER, "noSuchConverter"),
            );
        model.load_manifest(&manifest).unwrap();
        model.resolve_references();

        let orphan = model.find_tool("orphan").unwrap();
        assert_eq!(model.tool(orphan).super_class, None);
        assert_eq!(model.diagnostics().len(), 3);
        assert!(matches!(
            &model.diagnostics()[0],
            ResolveError::UnresolvedId { relation: "superClass", target, .. } if target == "missing.tool"
        ));
    }

    #[test]
    fn test_self_superclass_is_a_cycle() {
        let mut model = BuildModel::new();
        let manifest = StorageElement::new(BUILD_DEFINITIONS).with_child(
            StorageElement::new(TOOL)
                .with_attribute(ID, "loop")
                .with_attribute(SUPER_CLASS, "loop"),
        );
        model.load_manifest(&manifest).unwrap();
        model.resolve_references();
        assert!(matches!(model.diagnostics(), [ResolveError::Cycle { kind: "tool", .. }]));
    }

    #[test]
    fn test_project_resolves_against_own_configuration() {
        let mut model = BuildModel::new();
        model.load_manifest(&gnu_manifest()).unwrap();
        let project = StorageElement::new(PROJECT).with_child(
            StorageElement::new(CONFIGURATION)
                .with_attribute(ID, "cfg")
                .with_child(
                    StorageElement::new(FOLDER_INFO).with_child(
                        StorageElement::new(TOOL_CHAIN)
                            .with_attribute(ID, "gnu.tc.7")
                            .with_attribute(SUPER_CLASS, "gnu.tc")
                            .with_child(
                                StorageElement::new(TOOL)
                                    .with_attribute(ID, "gnu.cc.7")
                                    .with_attribute(SUPER_CLASS, "gnu.cc")
                                    .with_child(
                                        StorageElement::new(OPTION)
                                            .with_attribute(ID, "gnu.cc.debug.7")
                                            .with_attribute(SUPER_CLASS, "gnu.cc.debug")
                                            .with_attribute(VALUE, "true"),
                                    ),
                            ),
                    ),
                )
                .with_child(
                    StorageElement::new(TOOL_REFERENCE)
                        .with_attribute(ID, "gnu.cc")
                        .with_child(
                            StorageElement::new(OPTION_REFERENCE)
                                .with_attribute(ID, "gnu.cc.debug")
                                .with_attribute(VALUE, "true"),
                        ),
                ),
        );
        model.load_project(&project).unwrap();
        model.resolve_references();
        assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());

        let cc = model.find_tool("gnu.cc.7").unwrap();
        let debug = model.option_by_id(cc.into(), "gnu.cc.debug").unwrap();
        assert_eq!(model.option(debug).meta.id, "gnu.cc.debug.7");
        assert!(model.option_bool(debug).unwrap());

        let cfg = model.find_configuration("cfg").unwrap();
        let reference = model.configuration(cfg).tool_references[0];
        let option_ref = model.reference_options(reference)[0];
        assert_eq!(
            model.handle_option_value(OptionHandle::Override(option_ref)),
            Some(TypedValue::Bool(true))
        );
    }
}
