//! Writing the model back into element trees.

use buildcfg_storage::ElementSink;

use super::*;
use crate::model::{
    BuildModel, ConfigId, Enablement, HolderKey, OptionId, PropertySupport, ResourceKind, ToolChainId, ToolId,
};
use crate::reference::{OptionHandle, ToolHandle};
use crate::value::TypedValue;

fn write_bool<S: ElementSink>(sink: &mut S, name: &str, value: bool) {
    sink.set_attribute(name, value.to_string());
}

fn write_property_support<S: ElementSink>(sink: &mut S, support: Option<&PropertySupport>) {
    let Some(support) = support else {
        return;
    };
    if !support.supported.is_empty() {
        sink.set_attribute(SUPPORTED_PROPERTIES, support.format_supported());
    }
    if !support.required.is_empty() {
        let required: Vec<String> = support.required.iter().cloned().collect();
        sink.set_list(REQUIRED_PROPERTIES, &required);
    }
}

/// Write `rule` as a single expression under an `enablement` child.
fn write_enablement<S: ElementSink>(sink: &mut S, rule: Option<&Enablement>) {
    if let Some(rule) = rule {
        write_expression(sink.create_child(ENABLEMENT), rule);
    }
}

fn write_expression<S: ElementSink>(parent: &mut S, rule: &Enablement) {
    match rule {
        Enablement::CheckOption { option_id, value } => {
            let el = parent.create_child(CHECK_OPTION);
            el.set_attribute(OPTION_ID, option_id.as_str());
            el.set_attribute(VALUE, value.as_str());
        }
        Enablement::CheckNature { nature } => {
            parent.create_child(CHECK_NATURE).set_attribute(NATURE, nature.as_str());
        }
        Enablement::All { terms } => {
            let el = parent.create_child(AND);
            for term in terms {
                write_expression(el, term);
            }
        }
        Enablement::Any { terms } => {
            let el = parent.create_child(OR);
            for term in terms {
                write_expression(el, term);
            }
        }
        Enablement::Not { term } => write_expression(parent.create_child(NOT), term),
    }
}

/// Write a value: scalars as the `value` attribute, lists as one
/// `listOptionValue` child per entry (an empty list as `value=""`).
fn write_value<S: ElementSink>(sink: &mut S, value: &TypedValue) {
    match value {
        TypedValue::List(entries) if entries.is_empty() => sink.set_attribute(VALUE, ""),
        TypedValue::List(entries) => {
            for entry in entries {
                sink.create_child(LIST_VALUE).set_attribute(VALUE, entry.as_str());
            }
        }
        other => sink.set_attribute(VALUE, other.to_raw()),
    }
}

impl BuildModel {
    /// Write extension tool chains, standalone extension tools, converter
    /// rules and property types.
    pub fn serialize_manifest<S: ElementSink>(&self, sink: &mut S) {
        for tc in self.extension_tool_chains() {
            self.serialize_tool_chain(tc, sink.create_child(TOOL_CHAIN));
        }
        for tool in self.extension_tools().filter(|t| self.tool(*t).parent.is_none()) {
            self.serialize_tool(tool, sink.create_child(TOOL));
        }
        for rule in self.converters().rules() {
            let el = sink.create_child(CONVERTER);
            el.set_attribute(ID, rule.id.as_str());
            el.set_attribute(FROM_ID, rule.from_id.as_str());
            el.set_attribute(TO_ID, rule.to_id.as_str());
            el.set_attribute(CONVERTER, rule.converter.as_str());
        }
        for property_type in self.property_types.values() {
            let el = sink.create_child(PROPERTY_TYPE);
            el.set_attribute(ID, property_type.id.as_str());
            el.set_optional(NAME, property_type.name.as_deref());
            el.set_list(VALUES, &property_type.values);
        }
    }

    /// Write every configuration.
    pub fn serialize_project<S: ElementSink>(&self, sink: &mut S) {
        for cfg in self.configurations() {
            self.serialize_configuration(cfg, sink.create_child(CONFIGURATION));
        }
    }

    pub fn serialize_configuration<S: ElementSink>(&self, cfg: ConfigId, sink: &mut S) {
        let c = self.configuration(cfg);
        sink.set_attribute(ID, c.meta.id.as_str());
        sink.set_optional(NAME, c.meta.name.as_deref());
        let parent = c
            .parent
            .map(|p| self.configuration(p).meta.id.clone())
            .or_else(|| c.parent_ref.clone());
        sink.set_optional(PARENT, parent.as_deref());
        sink.set_optional(ARTIFACT_NAME, c.artifact_name.as_deref());
        if !c.properties.values.is_empty() {
            sink.set_attribute(BUILD_PROPERTIES, c.properties.format_values());
        }
        if !c.properties.required.is_empty() {
            let required: Vec<String> = c.properties.required.iter().cloned().collect();
            sink.set_list(REQUIRED_PROPERTIES, &required);
        }
        let natures: Vec<String> = c.natures.to_list().iter().map(|n| n.as_str().to_string()).collect();
        sink.set_list(NATURES, &natures);
        write_bool(sink, MANAGED_BUILD, c.managed_build);

        for (path, resource) in &c.resources {
            let info = self.resource(*resource);
            let name = if info.is_folder() { FOLDER_INFO } else { FILE_INFO };
            let el = sink.create_child(name);
            el.set_attribute(ID, info.meta.id.as_str());
            el.set_optional(NAME, info.meta.name.as_deref());
            el.set_attribute(PATH, path.as_str());
            if info.excluded {
                write_bool(el, EXCLUDED, true);
            }
            match &info.kind {
                ResourceKind::Folder { tool_chain: Some(tc) } => self.serialize_tool_chain(*tc, el.create_child(TOOL_CHAIN)),
                ResourceKind::Folder { tool_chain: None } => {}
                ResourceKind::File { tools } => {
                    for tool in tools {
                        self.serialize_tool(*tool, el.create_child(TOOL));
                    }
                }
            }
        }

        for reference in &c.tool_references {
            self.serialize_tool_reference(*reference, sink.create_child(TOOL_REFERENCE));
        }
    }

    fn serialize_tool_reference<S: ElementSink>(&self, reference: crate::model::ToolRefId, sink: &mut S) {
        let r = self.tool_reference(reference);
        let target = match r.target {
            Some(ToolHandle::Direct(t)) => Some(self.tool(t).meta.id.clone()),
            Some(handle @ ToolHandle::Override(_)) => self.real_tool_of(handle).map(|t| self.tool(t).meta.id.clone()),
            None => r.target_ref.clone(),
        };
        sink.set_optional(ID, target.as_deref());
        sink.set_optional(COMMAND, r.command.as_deref());
        for option in &r.options {
            let o = self.option_reference(*option);
            let target = match o.target {
                Some(OptionHandle::Direct(id)) => Some(self.option(id).meta.id.clone()),
                Some(handle @ OptionHandle::Override(_)) => {
                    self.real_option_of(handle).map(|id| self.option(id).meta.id.clone())
                }
                None => o.target_ref.clone(),
            };
            let el = sink.create_child(OPTION_REFERENCE);
            el.set_optional(ID, target.as_deref());
            match (&o.value, &o.raw_value) {
                (Some(value), _) => write_value(el, value),
                (None, Some(raw)) => el.set_attribute(VALUE, raw.as_str()),
                (None, None) => {}
            }
        }
    }

    fn serialize_tool_chain<S: ElementSink>(&self, tc: ToolChainId, sink: &mut S) {
        let t = self.tool_chain(tc);
        sink.set_attribute(ID, t.meta.id.as_str());
        sink.set_optional(NAME, t.meta.name.as_deref());
        let super_id = t
            .super_class
            .map(|s| self.tool_chain(s).meta.id.clone())
            .or_else(|| t.super_class_ref.clone());
        sink.set_optional(SUPER_CLASS, super_id.as_deref());
        if t.is_abstract {
            write_bool(sink, IS_ABSTRACT, true);
        }
        if let Some(managed) = t.supports_managed_build {
            write_bool(sink, SUPPORTS_MANAGED_BUILD, managed);
        }
        if let Some(targets) = &t.target_tools {
            sink.set_list(TARGET_TOOL, targets);
        }
        if !t.unused_children.is_empty() {
            let unused: Vec<String> = t.unused_children.iter().cloned().collect();
            sink.set_list(UNUSED_CHILDREN, &unused);
        }
        write_property_support(sink, t.properties.as_ref());
        self.serialize_holder_contents(tc.into(), sink);
        for tool in t.tools.values() {
            self.serialize_tool(*tool, sink.create_child(TOOL));
        }
    }

    fn serialize_tool<S: ElementSink>(&self, tool: ToolId, sink: &mut S) {
        let t = self.tool(tool);
        sink.set_attribute(ID, t.meta.id.as_str());
        sink.set_optional(NAME, t.meta.name.as_deref());
        let super_id = t
            .super_class
            .map(|s| self.tool(s).meta.id.clone())
            .or_else(|| t.super_class_ref.clone());
        sink.set_optional(SUPER_CLASS, super_id.as_deref());
        sink.set_optional(COMMAND, t.command.as_deref());
        if let Some(filter) = t.nature_filter {
            sink.set_attribute(NATURE_FILTER, filter.as_str());
        }
        if t.is_abstract {
            write_bool(sink, IS_ABSTRACT, true);
        }
        if let Some(managed) = t.supports_managed_build {
            write_bool(sink, SUPPORTS_MANAGED_BUILD, managed);
        }
        write_property_support(sink, t.properties.as_ref());
        for input in &t.input_types {
            let el = sink.create_child(INPUT_TYPE);
            el.set_attribute(ID, input.id.as_str());
            el.set_optional(NAME, input.name.as_deref());
            el.set_list(SOURCES, &input.extensions);
            if !input.dependency_extensions.is_empty() {
                el.set_list(DEPENDENCY_EXTENSIONS, &input.dependency_extensions);
            }
            if input.multiple_of_type {
                write_bool(el, MULTIPLE_OF_TYPE, true);
            }
            if input.primary_input {
                write_bool(el, PRIMARY_INPUT, true);
            }
            el.set_optional(SUPER_CLASS, input.super_class.as_deref());
        }
        for output in &t.output_types {
            let el = sink.create_child(OUTPUT_TYPE);
            el.set_attribute(ID, output.id.as_str());
            el.set_optional(NAME, output.name.as_deref());
            el.set_list(OUTPUTS, &output.extensions);
            el.set_optional(BUILD_VARIABLE, output.build_variable.as_deref());
            if output.primary_output {
                write_bool(el, PRIMARY_OUTPUT, true);
            }
        }
        write_enablement(sink, t.enablement.as_ref());
        self.serialize_holder_contents(tool.into(), sink);
    }

    fn serialize_holder_contents<S: ElementSink>(&self, holder: HolderKey, sink: &mut S) {
        for category in self.option_set(holder).local_categories() {
            let c = self.category(category);
            let el = sink.create_child(OPTION_CATEGORY);
            el.set_attribute(ID, c.meta.id.as_str());
            el.set_optional(NAME, c.meta.name.as_deref());
            let super_id = c
                .super_class
                .map(|s| self.category(s).meta.id.clone())
                .or_else(|| c.super_class_ref.clone());
            el.set_optional(SUPER_CLASS, super_id.as_deref());
            let owner = c
                .owner
                .map(|o| self.category(o).meta.id.clone())
                .or_else(|| c.owner_ref.clone());
            el.set_optional(OWNER, owner.as_deref());
        }
        for option in self.option_set(holder).local_options() {
            self.serialize_option(option, sink.create_child(OPTION));
        }
    }

    fn serialize_option<S: ElementSink>(&self, option: OptionId, sink: &mut S) {
        let o = self.option(option);
        sink.set_attribute(ID, o.meta.id.as_str());
        sink.set_optional(NAME, o.meta.name.as_deref());
        let super_id = o
            .super_class
            .map(|s| self.option(s).meta.id.clone())
            .or_else(|| o.super_class_ref.clone());
        sink.set_optional(SUPER_CLASS, super_id.as_deref());
        if let Some(kind) = self.option_value_type(option) {
            sink.set_attribute(VALUE_TYPE, kind.as_str());
        }
        let category = o
            .category
            .map(|c| self.category(c).meta.id.clone())
            .or_else(|| o.category_ref.clone());
        sink.set_optional(CATEGORY, category.as_deref());
        sink.set_optional(COMMAND, o.command.as_deref());
        sink.set_optional(COMMAND_FALSE, o.command_false.as_deref());
        if o.from_reference {
            write_bool(sink, FROM_REFERENCE, true);
        }
        if let Some(default) = &o.default_value {
            sink.set_attribute(DEFAULT_VALUE, default.to_raw());
        }
        match (&o.value, &o.raw_value) {
            (Some(value), _) => write_value(sink, value),
            (None, Some(raw)) => sink.set_attribute(VALUE, raw.as_str()),
            (None, None) => {}
        }
        for value in &o.enum_values {
            let el = sink.create_child(ENUM_VALUE);
            el.set_attribute(ID, value.id.as_str());
            el.set_attribute(NAME, value.name.as_str());
            el.set_optional(COMMAND, value.command.as_deref());
            if value.is_default {
                write_bool(el, IS_DEFAULT, true);
            }
        }
        write_enablement(sink, o.applicability.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::fixtures::gnu_manifest;
    use buildcfg_storage::{ElementSource, StorageElement};

    #[test]
    fn test_manifest_round_trip_is_stable() {
        let mut model = BuildModel::new();
        model.load_manifest(&gnu_manifest()).unwrap();
        model.resolve_references();

        let mut first = StorageElement::new(BUILD_DEFINITIONS);
        model.serialize_manifest(&mut first);

        let mut again = BuildModel::new();
        again.load_manifest(&first).unwrap();
        again.resolve_references();
        let mut second = StorageElement::new(BUILD_DEFINITIONS);
        again.serialize_manifest(&mut second);

        assert_eq!(first, second);
        assert!(again.diagnostics().is_empty());
    }

    #[test]
    fn test_list_values_written_as_children() {
        let mut el = StorageElement::new(OPTION);
        write_value(&mut el, &TypedValue::List(vec!["a".into(), "b".into()]));
        let values: Vec<_> = el
            .children_named(LIST_VALUE)
            .filter_map(|c| c.attribute(VALUE))
            .collect();
        assert_eq!(values, vec!["a", "b"]);

        let mut empty = StorageElement::new(OPTION);
        write_value(&mut empty, &TypedValue::List(vec![]));
        assert_eq!(empty.attribute(VALUE), Some(""));
    }

    #[test]
    fn test_enablement_written_as_one_expression() {
        let rule = Enablement::Any {
            terms: vec![
                Enablement::CheckNature {
                    nature: crate::model::Nature::C,
                },
                Enablement::CheckOption {
                    option_id: "x".into(),
                    value: "1".into(),
                },
            ],
        };
        let mut el = StorageElement::new(TOOL);
        write_enablement(&mut el, Some(&rule));
        let read = super::super::manifest::read_enablement(&el).unwrap();
        assert_eq!(read, Some(rule));
    }
}
