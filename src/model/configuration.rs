//! Build configurations and build properties.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::enablement::ProjectNatures;
use super::entity::EntityMeta;
use super::keys::{ConfigId, ResourceId, ToolRefId};
use super::BuildModel;

/// Property type naming the kind of artifact a configuration builds.
pub const ARTIFACT_TYPE: &str = "buildcfg.buildArtefactType";

/// A declared build property type and its allowed values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyType {
    pub id: String,
    pub name: Option<String>,
    pub values: Vec<String>,
}

/// Property values selected by a configuration, plus the property types it
/// requires its tools to support.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildProperties {
    pub values: BTreeMap<String, String>,
    pub required: BTreeSet<String>,
}

impl BuildProperties {
    /// Parse `type=value;type2=value2`.
    pub fn parse_values(raw: &str) -> BTreeMap<String, String> {
        buildcfg_storage::element::split_list(raw)
            .into_iter()
            .filter_map(|entry| {
                let (k, v) = entry.split_once('=')?;
                Some((k.trim().to_string(), v.trim().to_string()))
            })
            .collect()
    }

    pub fn format_values(&self) -> String {
        self.values
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// Property types (and values) a tool or tool chain can handle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySupport {
    /// Type id to supported values; an empty set accepts any value.
    pub supported: BTreeMap<String, BTreeSet<String>>,
    /// Property types this element needs the configuration to set.
    pub required: BTreeSet<String>,
}

impl PropertySupport {
    /// Parse `type=v1,v2;type2`.
    pub fn parse_supported(raw: &str) -> BTreeMap<String, BTreeSet<String>> {
        buildcfg_storage::element::split_list(raw)
            .into_iter()
            .map(|entry| match entry.split_once('=') {
                Some((k, vs)) => (
                    k.trim().to_string(),
                    vs.split(',')
                        .map(str::trim)
                        .filter(|v| !v.is_empty())
                        .map(str::to_string)
                        .collect(),
                ),
                None => (entry, BTreeSet::new()),
            })
            .collect()
    }

    pub fn format_supported(&self) -> String {
        self.supported
            .iter()
            .map(|(k, vs)| {
                if vs.is_empty() {
                    k.clone()
                } else {
                    format!("{}={}", k, vs.iter().cloned().collect::<Vec<_>>().join(","))
                }
            })
            .collect::<Vec<_>>()
            .join(";")
    }

    pub fn supports_type(&self, type_id: &str) -> bool {
        self.supported.contains_key(type_id)
    }

    pub fn supports_value(&self, type_id: &str, value: &str) -> bool {
        match self.supported.get(type_id) {
            Some(values) => values.is_empty() || values.contains(value),
            None => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Configuration {
    pub meta: EntityMeta,

    /// Legacy single-level parent configuration.
    pub parent: Option<ConfigId>,
    pub(crate) parent_ref: Option<String>,

    /// Resource configurations keyed by project-relative path; `""` is the
    /// project root.
    pub resources: BTreeMap<String, ResourceId>,

    pub properties: BuildProperties,
    pub natures: ProjectNatures,
    pub managed_build: bool,
    pub tool_references: Vec<ToolRefId>,
    pub artifact_name: Option<String>,
}

impl Configuration {
    pub fn new(meta: EntityMeta) -> Self {
        Self {
            meta,
            parent: None,
            parent_ref: None,
            resources: BTreeMap::new(),
            properties: BuildProperties::default(),
            natures: ProjectNatures::default(),
            managed_build: true,
            tool_references: Vec::new(),
            artifact_name: None,
        }
    }
}

impl BuildModel {
    /// Display name, falling back to the legacy parent.
    pub fn configuration_name(&self, id: ConfigId) -> Option<&str> {
        let cfg = self.configuration(id);
        cfg.meta
            .name
            .as_deref()
            .or_else(|| cfg.parent.and_then(|p| self.configuration(p).meta.name.as_deref()))
    }

    /// Root folder configuration, falling back to the legacy parent.
    pub fn root_folder(&self, id: ConfigId) -> Option<ResourceId> {
        let cfg = self.configuration(id);
        cfg.resources
            .get("")
            .copied()
            .or_else(|| cfg.parent.and_then(|p| self.configuration(p).resources.get("").copied()))
    }

    /// Declared property type by id.
    pub fn property_type(&self, id: &str) -> Option<&PropertyType> {
        self.property_types.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_supported_properties() {
        let supported = PropertySupport::parse_supported("artefact=exe,lib; buildType");
        assert_eq!(supported.len(), 2);
        assert!(supported["buildType"].is_empty());

        let support = PropertySupport {
            supported,
            required: BTreeSet::new(),
        };
        assert!(support.supports_value("artefact", "exe"));
        assert!(!support.supports_value("artefact", "shared"));
        assert!(support.supports_value("buildType", "debug"));
        assert!(!support.supports_type("other"));
        assert_eq!(support.format_supported(), "artefact=exe,lib;buildType");
    }

    #[test]
    fn test_property_values_round_trip() {
        let props = BuildProperties {
            values: BuildProperties::parse_values("b=2;a=1;broken"),
            required: BTreeSet::new(),
        };
        assert_eq!(props.values.len(), 2);
        assert_eq!(props.format_values(), "a=1;b=2");
    }
}
