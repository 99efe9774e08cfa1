//! Build-property compatibility of a tool set.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{BuildModel, ConfigId, PropertySupport, ToolChainId, ToolId};

/// Property problems of a tool chain and tool set under one configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyReport {
    /// Required property types nothing in the set declares, plus types the
    /// set requires that the configuration does not select.
    pub unsupported_required: BTreeSet<String>,
    /// Selected (type, value) pairs some element of the set rejects.
    pub unsupported_selected: BTreeMap<String, String>,
    /// Selected types missing from the declared property types.
    pub undefined_types: BTreeSet<String>,
}

impl BuildModel {
    /// Check the configuration's build properties against a tool chain and
    /// tools.
    ///
    /// An element without a property declaration accepts every value; a
    /// required type is supported only when some element declares it.
    pub fn property_report(&self, cfg: ConfigId, tool_chain: Option<ToolChainId>, tools: &[ToolId]) -> PropertyReport {
        let properties = &self.configuration(cfg).properties;
        let declarations: Vec<&PropertySupport> = tool_chain
            .and_then(|tc| self.tool_chain_properties(tc))
            .into_iter()
            .chain(tools.iter().filter_map(|t| self.tool_properties(*t)))
            .collect();

        let mut report = PropertyReport::default();
        for required in &properties.required {
            if !declarations.iter().any(|d| d.supports_type(required)) {
                report.unsupported_required.insert(required.clone());
            }
        }
        for declared in &declarations {
            for required in &declared.required {
                if !properties.values.contains_key(required) {
                    report.unsupported_required.insert(required.clone());
                }
            }
        }
        for (type_id, value) in &properties.values {
            if declarations
                .iter()
                .any(|d| d.supports_type(type_id) && !d.supports_value(type_id, value))
            {
                report.unsupported_selected.insert(type_id.clone(), value.clone());
            }
            if !self.property_types.is_empty() && !self.property_types.contains_key(type_id) {
                report.undefined_types.insert(type_id.clone());
            }
        }
        report
    }
}
