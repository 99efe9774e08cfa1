//! Element readers and the manifest loader.
//!
//! Tool chains, tools, options and categories have the same element shape in
//! manifests and project documents; only the extension flag differs.

use buildcfg_storage::ElementSource;
use serde::Serialize;
use std::ops::AddAssign;
use tracing::{debug, warn};

use super::*;
use crate::error::{ModelError, ResolveError, Result};
use crate::model::{
    BuildModel, Category, Enablement, EntityMeta, HolderKey, InputType, Nature, NatureFilter, OptionDef,
    OptionId, OutputType, PropertySupport, PropertyType, ResourceId, Tool, ToolChain, ToolChainId, ToolId,
    ToolParent,
};
use crate::modify::{ConverterRule, COPY_SETTINGS};
use crate::value::{EnumValue, TypedValue, ValueKind, ValueShape};

/// Counts of what a load pass added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub tool_chains: usize,
    pub tools: usize,
    pub options: usize,
    pub categories: usize,
    pub converters: usize,
    pub property_types: usize,
    pub configurations: usize,
    pub resources: usize,
    pub tool_references: usize,
    /// Entities whose stored ids were resolved afterwards.
    pub resolved: usize,
    /// Resolution diagnostics recorded on the model.
    pub diagnostics: usize,
}

impl AddAssign for LoadSummary {
    fn add_assign(&mut self, other: Self) {
        self.tool_chains += other.tool_chains;
        self.tools += other.tools;
        self.options += other.options;
        self.categories += other.categories;
        self.converters += other.converters;
        self.property_types += other.property_types;
        self.configurations += other.configurations;
        self.resources += other.resources;
        self.tool_references += other.tool_references;
        self.resolved += other.resolved;
        self.diagnostics += other.diagnostics;
    }
}

pub(super) fn invalid<E: ElementSource>(el: &E, reason: impl Into<String>) -> ModelError {
    ModelError::InvalidElement {
        element: el.name().to_string(),
        reason: reason.into(),
    }
}

pub(super) fn required_attr<E: ElementSource>(el: &E, name: &str) -> Result<String> {
    el.attribute(name)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| invalid(el, format!("missing '{}' attribute", name)))
}

pub(super) fn attr<E: ElementSource>(el: &E, name: &str) -> Option<String> {
    el.attribute(name).map(str::to_string)
}

fn read_meta<E: ElementSource>(el: &E, is_extension: bool) -> Result<EntityMeta> {
    Ok(EntityMeta::unresolved(required_attr(el, ID)?, attr(el, NAME), is_extension))
}

fn read_property_support<E: ElementSource>(el: &E) -> Option<PropertySupport> {
    let supported = el.attribute(SUPPORTED_PROPERTIES);
    let required = el.list_attribute(REQUIRED_PROPERTIES);
    if supported.is_none() && required.is_none() {
        return None;
    }
    Some(PropertySupport {
        supported: PropertySupport::parse_supported(supported.unwrap_or_default()),
        required: required.unwrap_or_default().into_iter().collect(),
    })
}

/// Rule from an `enablement` child; several expressions are and-ed.
pub(super) fn read_enablement<E: ElementSource>(el: &E) -> Result<Option<Enablement>> {
    let Some(enablement) = el.children_named(ENABLEMENT).next() else {
        return Ok(None);
    };
    let mut terms = enablement
        .children()
        .iter()
        .map(read_expression)
        .collect::<Result<Vec<_>>>()?;
    Ok(match terms.len() {
        0 => None,
        1 => terms.pop(),
        _ => Some(Enablement::All { terms }),
    })
}

fn read_expression<E: ElementSource>(el: &E) -> Result<Enablement> {
    let terms = || el.children().iter().map(read_expression).collect::<Result<Vec<_>>>();
    match el.name() {
        CHECK_OPTION => Ok(Enablement::CheckOption {
            option_id: required_attr(el, OPTION_ID)?,
            value: attr(el, VALUE).unwrap_or_default(),
        }),
        CHECK_NATURE => {
            let raw = required_attr(el, NATURE)?;
            let nature = Nature::parse(&raw).ok_or_else(|| invalid(el, format!("unknown nature '{}'", raw)))?;
            Ok(Enablement::CheckNature { nature })
        }
        AND => Ok(Enablement::All { terms: terms()? }),
        OR => Ok(Enablement::Any { terms: terms()? }),
        NOT => {
            let mut inner = terms()?;
            let term = match inner.len() {
                1 => inner.remove(0),
                _ => Enablement::All { terms: inner },
            };
            Ok(Enablement::Not { term: Box::new(term) })
        }
        other => Err(invalid(el, format!("unknown enablement expression '{}'", other))),
    }
}

fn read_input_type<E: ElementSource>(el: &E) -> Result<InputType> {
    Ok(InputType {
        id: required_attr(el, ID)?,
        name: attr(el, NAME),
        extensions: el.list_attribute(SOURCES).unwrap_or_default(),
        dependency_extensions: el.list_attribute(DEPENDENCY_EXTENSIONS).unwrap_or_default(),
        multiple_of_type: el.bool_attribute(MULTIPLE_OF_TYPE).unwrap_or(false),
        primary_input: el.bool_attribute(PRIMARY_INPUT).unwrap_or(false),
        super_class: attr(el, SUPER_CLASS),
    })
}

fn read_output_type<E: ElementSource>(el: &E) -> Result<OutputType> {
    Ok(OutputType {
        id: required_attr(el, ID)?,
        name: attr(el, NAME),
        extensions: el.list_attribute(OUTPUTS).unwrap_or_default(),
        build_variable: attr(el, BUILD_VARIABLE),
        primary_output: el.bool_attribute(PRIMARY_OUTPUT).unwrap_or(false),
    })
}

fn parse_value<E: ElementSource>(el: &E, raw: &str, kind: ValueKind) -> Result<TypedValue> {
    TypedValue::parse(raw, kind).ok_or_else(|| invalid(el, format!("'{}' is not a {} value", raw, kind)))
}

impl BuildModel {
    /// Add the extension definitions under a `buildDefinitions` element.
    pub fn load_manifest<E: ElementSource>(&mut self, root: &E) -> Result<LoadSummary> {
        if root.name() != BUILD_DEFINITIONS {
            return Err(invalid(root, format!("expected <{}> root", BUILD_DEFINITIONS)));
        }
        let mut summary = LoadSummary::default();
        for el in root.children() {
            match el.name() {
                TOOL_CHAIN => {
                    if !self.skip_duplicate("toolChain", el)? {
                        self.load_tool_chain(el, None, true, &mut summary)?;
                    }
                }
                TOOL => {
                    if !self.skip_duplicate("tool", el)? {
                        self.load_tool(el, None, true, &mut summary)?;
                    }
                }
                CONVERTER => {
                    self.converters_mut().register_rule(ConverterRule {
                        id: required_attr(el, ID)?,
                        from_id: required_attr(el, FROM_ID)?,
                        to_id: required_attr(el, TO_ID)?,
                        converter: attr(el, CONVERTER).unwrap_or_else(|| COPY_SETTINGS.to_string()),
                    });
                    summary.converters += 1;
                }
                PROPERTY_TYPE => {
                    self.define_property_type(PropertyType {
                        id: required_attr(el, ID)?,
                        name: attr(el, NAME),
                        values: el.list_attribute(VALUES).unwrap_or_default(),
                    });
                    summary.property_types += 1;
                }
                other => debug!(element = other, "skipping unknown manifest element"),
            }
        }
        debug!(
            tool_chains = summary.tool_chains,
            tools = summary.tools,
            options = summary.options,
            "loaded manifest"
        );
        Ok(summary)
    }

    fn skip_duplicate<E: ElementSource>(&mut self, kind: &'static str, el: &E) -> Result<bool> {
        let id = required_attr(el, ID)?;
        if !self.lookup(&id).iter().any(|k| self.meta(*k).is_extension) {
            return Ok(false);
        }
        warn!(kind, id = %id, "duplicate extension definition skipped");
        self.diagnostics.push(ResolveError::DuplicateDefinition { kind, id });
        Ok(true)
    }

    pub(super) fn load_tool_chain<E: ElementSource>(
        &mut self,
        el: &E,
        folder: Option<ResourceId>,
        is_extension: bool,
        summary: &mut LoadSummary,
    ) -> Result<ToolChainId> {
        let mut tc = ToolChain::new(read_meta(el, is_extension)?, folder);
        tc.super_class_ref = attr(el, SUPER_CLASS);
        tc.target_tools = el.list_attribute(TARGET_TOOL);
        tc.unused_children = el.list_attribute(UNUSED_CHILDREN).unwrap_or_default().into_iter().collect();
        tc.properties = read_property_support(el);
        tc.supports_managed_build = el.bool_attribute(SUPPORTS_MANAGED_BUILD);
        tc.is_abstract = el.bool_attribute(IS_ABSTRACT).unwrap_or(false);
        let key = self.insert_tool_chain(tc);
        summary.tool_chains += 1;

        self.load_holder_children(el, key.into(), is_extension, summary)?;
        for tool in el.children_named(TOOL) {
            self.load_tool(tool, Some(ToolParent::ToolChain(key)), is_extension, summary)?;
        }
        Ok(key)
    }

    pub(super) fn load_tool<E: ElementSource>(
        &mut self,
        el: &E,
        parent: Option<ToolParent>,
        is_extension: bool,
        summary: &mut LoadSummary,
    ) -> Result<ToolId> {
        let mut tool = Tool::new(read_meta(el, is_extension)?, parent);
        tool.super_class_ref = attr(el, SUPER_CLASS);
        tool.command = attr(el, COMMAND);
        tool.nature_filter = match el.attribute(NATURE_FILTER) {
            Some(raw) => Some(
                NatureFilter::parse(raw).ok_or_else(|| invalid(el, format!("unknown natureFilter '{}'", raw)))?,
            ),
            None => None,
        };
        tool.is_abstract = el.bool_attribute(IS_ABSTRACT).unwrap_or(false);
        tool.supports_managed_build = el.bool_attribute(SUPPORTS_MANAGED_BUILD);
        tool.properties = read_property_support(el);
        tool.enablement = read_enablement(el)?;
        tool.input_types = el
            .children_named(INPUT_TYPE)
            .map(read_input_type)
            .collect::<Result<_>>()?;
        tool.output_types = el
            .children_named(OUTPUT_TYPE)
            .map(read_output_type)
            .collect::<Result<_>>()?;
        let key = self.insert_tool(tool);
        summary.tools += 1;

        self.load_holder_children(el, key.into(), is_extension, summary)?;
        Ok(key)
    }

    fn load_holder_children<E: ElementSource>(
        &mut self,
        el: &E,
        holder: HolderKey,
        is_extension: bool,
        summary: &mut LoadSummary,
    ) -> Result<()> {
        for category in el.children_named(OPTION_CATEGORY) {
            let mut c = Category::new(read_meta(category, is_extension)?, holder);
            c.super_class_ref = attr(category, SUPER_CLASS);
            c.owner_ref = attr(category, OWNER);
            self.insert_category(c);
            summary.categories += 1;
        }
        for option in el.children_named(OPTION) {
            self.load_option(option, holder, is_extension)?;
            summary.options += 1;
        }
        Ok(())
    }

    fn load_option<E: ElementSource>(&mut self, el: &E, holder: HolderKey, is_extension: bool) -> Result<OptionId> {
        let mut option = OptionDef::new(read_meta(el, is_extension)?, holder);
        option.super_class_ref = attr(el, SUPER_CLASS);
        option.value_type = match el.attribute(VALUE_TYPE) {
            Some(raw) => Some(ValueKind::parse(raw).ok_or_else(|| invalid(el, format!("unknown valueType '{}'", raw)))?),
            None => None,
        };
        option.category_ref = attr(el, CATEGORY);
        option.command = attr(el, COMMAND);
        option.command_false = attr(el, COMMAND_FALSE);
        option.from_reference = el.bool_attribute(FROM_REFERENCE).unwrap_or(false);
        option.applicability = read_enablement(el)?;
        option.enum_values = el
            .children_named(ENUM_VALUE)
            .map(|v| {
                let id = required_attr(v, ID)?;
                Ok(EnumValue {
                    name: attr(v, NAME).unwrap_or_else(|| id.clone()),
                    command: attr(v, COMMAND),
                    is_default: v.bool_attribute(IS_DEFAULT).unwrap_or(false),
                    id,
                })
            })
            .collect::<Result<_>>()?;

        let list: Vec<String> = el
            .children_named(LIST_VALUE)
            .filter_map(|v| v.attribute(VALUE))
            .map(str::to_string)
            .collect();
        let raw = el.attribute(VALUE);
        match option.value_type {
            Some(kind) if kind.shape() == ValueShape::List && !list.is_empty() => {
                option.value = Some(TypedValue::List(list));
            }
            Some(kind) => {
                option.value = raw.map(|r| parse_value(el, r, kind)).transpose()?;
            }
            None if !list.is_empty() => option.value = Some(TypedValue::List(list)),
            None => option.raw_value = raw.map(str::to_string),
        }
        // Without a local kind the default stays text until the link pass.
        option.default_value = match (el.attribute(DEFAULT_VALUE), option.value_type) {
            (Some(raw), Some(kind)) => Some(parse_value(el, raw, kind)?),
            (Some(raw), None) => Some(TypedValue::Text(raw.to_string())),
            (None, _) => None,
        };
        Ok(self.insert_option(option))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::fixtures::gnu_manifest;
    use buildcfg_storage::StorageElement;

    #[test]
    fn test_load_manifest_counts() {
        let mut model = BuildModel::new();
        let summary = model.load_manifest(&gnu_manifest()).unwrap();
        assert_eq!(summary.tool_chains, 1);
        assert_eq!(summary.tools, 3);
        assert_eq!(summary.options, 3);
        assert_eq!(summary.categories, 1);
        assert_eq!(summary.converters, 1);
        assert_eq!(model.converters().rules()[0].converter, COPY_SETTINGS);
    }

    #[test]
    fn test_untyped_value_waits_for_link_pass() {
        let mut model = BuildModel::new();
        model.load_manifest(&gnu_manifest()).unwrap();
        let strict = model.find_option("gnu.cc.debug.strict").unwrap();
        assert_eq!(model.option(strict).value, None);
        assert_eq!(model.option(strict).raw_value.as_deref(), Some("true"));
        assert_eq!(model.option(strict).super_class, None);
    }

    #[test]
    fn test_duplicate_definition_skipped() {
        let mut model = BuildModel::new();
        model.load_manifest(&gnu_manifest()).unwrap();
        let again = StorageElement::new(BUILD_DEFINITIONS)
            .with_child(StorageElement::new(TOOL).with_attribute(ID, "gnu.cc"));
        let summary = model.load_manifest(&again).unwrap();
        assert_eq!(summary.tools, 0);
        assert!(matches!(
            model.diagnostics(),
            [ResolveError::DuplicateDefinition { kind: "tool", .. }]
        ));
    }

    #[test]
    fn test_bad_elements_rejected() {
        let mut model = BuildModel::new();
        let missing_id = StorageElement::new(BUILD_DEFINITIONS).with_child(StorageElement::new(TOOL));
        assert!(matches!(
            model.load_manifest(&missing_id),
            Err(ModelError::InvalidElement { .. })
        ));

        let bad_kind = StorageElement::new(BUILD_DEFINITIONS).with_child(
            StorageElement::new(TOOL).with_attribute(ID, "t").with_child(
                StorageElement::new(OPTION)
                    .with_attribute(ID, "t.o")
                    .with_attribute(VALUE_TYPE, "float"),
            ),
        );
        assert!(model.load_manifest(&bad_kind).is_err());
    }

    #[test]
    fn test_read_enablement_expressions() {
        let el = StorageElement::new(TOOL).with_child(
            StorageElement::new(ENABLEMENT)
                .with_child(StorageElement::new(CHECK_NATURE).with_attribute(NATURE, "cc"))
                .with_child(
                    StorageElement::new(NOT).with_child(
                        StorageElement::new(CHECK_OPTION)
                            .with_attribute(OPTION_ID, "gnu.cc.debug")
                            .with_attribute(VALUE, "true"),
                    ),
                ),
        );
        let rule = read_enablement(&el).unwrap().unwrap();
        assert_eq!(
            rule,
            Enablement::All {
                terms: vec![
                    Enablement::CheckNature { nature: Nature::Cc },
                    Enablement::Not {
                        term: Box::new(Enablement::CheckOption {
                            option_id: "gnu.cc.debug".into(),
                            value: "true".into(),
                        }),
                    },
                ],
            }
        );
    }
}
