//! Project document loader.

use buildcfg_storage::ElementSource;
use tracing::debug;

use super::manifest::{attr, invalid, required_attr, LoadSummary};
use super::*;
use crate::error::{ModelError, Result};
use crate::model::resource::normalize_path;
use crate::model::{
    BuildModel, BuildProperties, ConfigId, Configuration, EntityMeta, Nature, ProjectNatures, ResourceId,
    ResourceInfo, ResourceKind, ToolParent,
};
use crate::reference::{OptionReference, ToolReference};
use crate::value::TypedValue;

impl BuildModel {
    /// Add the configurations under a `project` element.
    pub fn load_project<E: ElementSource>(&mut self, root: &E) -> Result<LoadSummary> {
        if root.name() != PROJECT {
            return Err(invalid(root, format!("expected <{}> root", PROJECT)));
        }
        let mut summary = LoadSummary::default();
        for el in root.children_named(CONFIGURATION) {
            self.load_configuration(el, &mut summary)?;
        }
        debug!(configurations = summary.configurations, resources = summary.resources, "loaded project");
        Ok(summary)
    }

    fn load_configuration<E: ElementSource>(&mut self, el: &E, summary: &mut LoadSummary) -> Result<ConfigId> {
        let id = required_attr(el, ID)?;
        if self.find_configuration(&id).is_some() {
            return Err(ModelError::DuplicateId(id));
        }
        let mut cfg = Configuration::new(EntityMeta::unresolved(id, attr(el, NAME), false));
        cfg.parent_ref = attr(el, PARENT);
        cfg.artifact_name = attr(el, ARTIFACT_NAME);
        cfg.properties = BuildProperties {
            values: el
                .attribute(BUILD_PROPERTIES)
                .map(BuildProperties::parse_values)
                .unwrap_or_default(),
            required: el
                .list_attribute(REQUIRED_PROPERTIES)
                .unwrap_or_default()
                .into_iter()
                .collect(),
        };
        if let Some(natures) = el.list_attribute(NATURES) {
            let natures = natures
                .iter()
                .map(|n| Nature::parse(n).ok_or_else(|| invalid(el, format!("unknown nature '{}'", n))))
                .collect::<Result<Vec<_>>>()?;
            cfg.natures = ProjectNatures::from_list(&natures);
        }
        cfg.managed_build = el.bool_attribute(MANAGED_BUILD).unwrap_or(true);
        let key = self.insert_configuration(cfg);
        summary.configurations += 1;

        for child in el.children() {
            match child.name() {
                FOLDER_INFO => {
                    self.load_resource(child, key, true, summary)?;
                }
                FILE_INFO => {
                    self.load_resource(child, key, false, summary)?;
                }
                TOOL_REFERENCE => self.load_tool_reference(child, key, summary)?,
                other => debug!(element = other, "skipping unknown configuration element"),
            }
        }
        Ok(key)
    }

    fn load_resource<E: ElementSource>(
        &mut self,
        el: &E,
        cfg: ConfigId,
        is_folder: bool,
        summary: &mut LoadSummary,
    ) -> Result<ResourceId> {
        let path = normalize_path(el.attribute(PATH).unwrap_or_default());
        let cfg_id = self.configuration(cfg).meta.id.clone();
        if self.configuration(cfg).resources.contains_key(&path) {
            return Err(ModelError::DuplicateId(Self::resource_id(&cfg_id, &path)));
        }
        let id = attr(el, ID).unwrap_or_else(|| Self::resource_id(&cfg_id, &path));
        let kind = if is_folder {
            ResourceKind::Folder { tool_chain: None }
        } else {
            ResourceKind::File { tools: Vec::new() }
        };
        let mut info = ResourceInfo::new(EntityMeta::new(id, attr(el, NAME), false), cfg, path, kind);
        info.excluded = el.bool_attribute(EXCLUDED).unwrap_or(false);
        let resource = self.insert_resource(info);
        summary.resources += 1;

        if is_folder {
            if let Some(tc) = el.children_named(TOOL_CHAIN).next() {
                self.load_tool_chain(tc, Some(resource), false, summary)?;
            }
        } else {
            for tool in el.children_named(TOOL) {
                self.load_tool(tool, Some(ToolParent::Resource(resource)), false, summary)?;
            }
        }
        Ok(resource)
    }

    fn load_tool_reference<E: ElementSource>(&mut self, el: &E, cfg: ConfigId, summary: &mut LoadSummary) -> Result<()> {
        let reference = self.insert_tool_reference(ToolReference {
            owner: cfg,
            target: None,
            target_ref: Some(required_attr(el, ID)?),
            command: attr(el, COMMAND),
            options: Vec::new(),
        });
        for option in el.children_named(OPTION_REFERENCE) {
            let list: Vec<String> = option
                .children_named(LIST_VALUE)
                .filter_map(|v| v.attribute(VALUE))
                .map(str::to_string)
                .collect();
            self.insert_option_reference(OptionReference {
                owner: reference,
                target: None,
                target_ref: Some(required_attr(option, ID)?),
                value: (!list.is_empty()).then_some(TypedValue::List(list)),
                raw_value: attr(option, VALUE),
            });
        }
        summary.tool_references += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::fixtures::gnu_manifest;
    use buildcfg_storage::StorageElement;

    fn project() -> StorageElement {
        StorageElement::new(PROJECT).with_child(
            StorageElement::new(CONFIGURATION)
                .with_attribute(ID, "cfg.debug")
                .with_attribute(NAME, "Debug")
                .with_attribute(NATURES, "c;cc")
                .with_attribute(BUILD_PROPERTIES, "buildcfg.buildArtefactType=exe")
                .with_child(
                    StorageElement::new(FOLDER_INFO)
                        .with_attribute(PATH, "/")
                        .with_child(
                            StorageElement::new(TOOL_CHAIN)
                                .with_attribute(ID, "gnu.tc.1")
                                .with_attribute(SUPER_CLASS, "gnu.tc")
                                .with_child(
                                    StorageElement::new(TOOL)
                                        .with_attribute(ID, "gnu.cc.1")
                                        .with_attribute(SUPER_CLASS, "gnu.cc"),
                                ),
                        ),
                )
                .with_child(
                    StorageElement::new(FILE_INFO)
                        .with_attribute(PATH, "src/fast.c")
                        .with_attribute(EXCLUDED, "true"),
                )
                .with_child(
                    StorageElement::new(TOOL_REFERENCE)
                        .with_attribute(ID, "gnu.link")
                        .with_attribute(COMMAND, "gold")
                        .with_child(StorageElement::new(OPTION_REFERENCE).with_attribute(ID, "gnu.link.libs")),
                ),
        )
    }

    #[test]
    fn test_load_project_structure() {
        let mut model = BuildModel::new();
        model.load_manifest(&gnu_manifest()).unwrap();
        let summary = model.load_project(&project()).unwrap();
        assert_eq!(summary.configurations, 1);
        assert_eq!(summary.resources, 2);
        assert_eq!(summary.tool_chains, 1);
        assert_eq!(summary.tools, 1);
        assert_eq!(summary.tool_references, 1);

        let cfg = model.find_configuration("cfg.debug").unwrap();
        let c = model.configuration(cfg);
        assert!(c.natures.cc);
        assert_eq!(c.properties.values.len(), 1);
        let file = c.resources["src/fast.c"];
        assert!(model.resource(file).excluded);
        assert_eq!(model.resource(file).meta.id, "cfg.debug:/src/fast.c");

        let root = model.root_folder(cfg).unwrap();
        assert!(model.resource(root).tool_chain().is_some());
    }

    #[test]
    fn test_duplicate_configuration_is_an_error() {
        let mut model = BuildModel::new();
        model.load_manifest(&gnu_manifest()).unwrap();
        model.load_project(&project()).unwrap();
        assert!(matches!(
            model.load_project(&project()),
            Err(ModelError::DuplicateId(id)) if id == "cfg.debug"
        ));
    }
}
