//! Options and option categories.

use super::enablement::Enablement;
use super::entity::EntityMeta;
use super::keys::{CategoryId, HolderKey, OptionId};
use super::BuildModel;
use crate::value::{EnumValue, TypedValue, ValueKind};

/// A typed, inheritable build option.
#[derive(Debug, Clone)]
pub struct OptionDef {
    pub meta: EntityMeta,

    /// Tool or tool chain that owns this option locally.
    pub holder: HolderKey,

    pub super_class: Option<OptionId>,
    pub(crate) super_class_ref: Option<String>,

    /// Declared kind; project options copy it from the option they override.
    pub value_type: Option<ValueKind>,

    /// Locally set value.
    pub value: Option<TypedValue>,

    /// Stored value text awaiting the kind to be known (manifest options
    /// that inherit their kind).
    pub(crate) raw_value: Option<String>,

    pub default_value: Option<TypedValue>,

    pub category: Option<CategoryId>,
    pub(crate) category_ref: Option<String>,

    /// Flag emitted when set (booleans: when `true`).
    pub command: Option<String>,

    /// Flag emitted for a boolean set to `false`.
    pub command_false: Option<String>,

    pub enum_values: Vec<EnumValue>,

    /// Rule deciding whether the option applies in its holder's context.
    pub applicability: Option<Enablement>,

    /// Extension option minted by an extension-adjust write.
    pub adjusted: bool,

    /// Created while converting a legacy option reference.
    pub from_reference: bool,
}

impl OptionDef {
    pub fn new(meta: EntityMeta, holder: HolderKey) -> Self {
        Self {
            meta,
            holder,
            super_class: None,
            super_class_ref: None,
            value_type: None,
            value: None,
            raw_value: None,
            default_value: None,
            category: None,
            category_ref: None,
            command: None,
            command_false: None,
            enum_values: Vec::new(),
            applicability: None,
            adjusted: false,
            from_reference: false,
        }
    }
}

/// Groups options for presentation; inherits like options do.
#[derive(Debug, Clone)]
pub struct Category {
    pub meta: EntityMeta,
    pub holder: HolderKey,
    pub super_class: Option<CategoryId>,
    pub(crate) super_class_ref: Option<String>,
    /// Enclosing category, if nested.
    pub owner: Option<CategoryId>,
    pub(crate) owner_ref: Option<String>,
}

impl Category {
    pub fn new(meta: EntityMeta, holder: HolderKey) -> Self {
        Self {
            meta,
            holder,
            super_class: None,
            super_class_ref: None,
            owner: None,
            owner_ref: None,
        }
    }
}

impl BuildModel {
    /// The option followed by its superclass chain.
    pub fn option_chain(&self, id: OptionId) -> impl Iterator<Item = OptionId> + '_ {
        std::iter::successors(Some(id), move |o| self.option(*o).super_class)
    }

    /// Whether `id` or one of its ancestors carries `ancestor_id`.
    pub fn option_chain_contains(&self, id: OptionId, ancestor_id: &str) -> bool {
        self.option_chain(id)
            .any(|o| self.option(o).meta.id == ancestor_id)
    }

    /// Declared kind, inherited from the nearest ancestor that has one.
    pub fn option_value_type(&self, id: OptionId) -> Option<ValueKind> {
        self.option_chain(id).find_map(|o| self.option(o).value_type)
    }

    pub fn option_name(&self, id: OptionId) -> Option<&str> {
        self.option_chain(id)
            .find_map(|o| self.option(o).meta.name.as_deref())
    }

    pub fn option_command(&self, id: OptionId) -> Option<&str> {
        self.option_chain(id)
            .find_map(|o| self.option(o).command.as_deref())
    }

    pub fn option_command_false(&self, id: OptionId) -> Option<&str> {
        self.option_chain(id)
            .find_map(|o| self.option(o).command_false.as_deref())
    }

    pub fn option_enum_values(&self, id: OptionId) -> &[EnumValue] {
        self.option_chain(id)
            .map(|o| self.option(o).enum_values.as_slice())
            .find(|v| !v.is_empty())
            .unwrap_or(&[])
    }

    pub fn option_category(&self, id: OptionId) -> Option<CategoryId> {
        self.option_chain(id).find_map(|o| self.option(o).category)
    }

    /// Effective value.
    ///
    /// Walks the chain for a local value, then for a default value, then
    /// falls back to the default enum entry or the kind's empty value.
    pub fn option_value(&self, id: OptionId) -> Option<TypedValue> {
        if let Some(v) = self.option_chain(id).find_map(|o| self.option(o).value.clone()) {
            return Some(v);
        }
        if let Some(v) = self
            .option_chain(id)
            .find_map(|o| self.option(o).default_value.clone())
        {
            return Some(v);
        }
        let kind = self.option_value_type(id)?;
        if kind == ValueKind::Enumerated {
            let values = self.option_enum_values(id);
            if let Some(default) = values.iter().find(|v| v.is_default).or(values.first()) {
                return Some(TypedValue::Text(default.id.clone()));
            }
        }
        Some(kind.empty_value())
    }

    /// Effective value read with an expected shape.
    pub fn option_bool(&self, id: OptionId) -> crate::Result<bool> {
        self.typed_read(id, ValueKind::Boolean)
            .map(|v| v.as_bool().unwrap_or(false))
    }

    pub fn option_string(&self, id: OptionId) -> crate::Result<String> {
        self.typed_read(id, ValueKind::String)
            .map(|v| v.as_text().unwrap_or_default().to_string())
    }

    pub fn option_list(&self, id: OptionId) -> crate::Result<Vec<String>> {
        self.typed_read(id, ValueKind::StringList)
            .map(|v| v.as_list().map(<[String]>::to_vec).unwrap_or_default())
    }

    fn typed_read(&self, id: OptionId, assumed: ValueKind) -> crate::Result<TypedValue> {
        let option_id = &self.option(id).meta.id;
        let kind = self
            .option_value_type(id)
            .ok_or_else(|| crate::ModelError::UnknownId(option_id.clone()))?;
        if kind.shape() != assumed.shape() {
            return Err(crate::ModelError::TypeMismatch {
                option: option_id.clone(),
                expected: assumed.shape(),
                found: kind.shape(),
            });
        }
        Ok(self.option_value(id).unwrap_or_else(|| kind.empty_value()))
    }

    /// Command-line text of the selected enum entry.
    pub fn option_enum_command(&self, id: OptionId) -> Option<&str> {
        let selected = self.option_value(id)?;
        let selected = selected.as_text()?.to_string();
        self.option_enum_values(id)
            .iter()
            .find(|v| v.id == selected)
            .and_then(|v| v.command.as_deref())
    }

    /// Category followed by its superclass chain.
    pub fn category_chain(&self, id: CategoryId) -> impl Iterator<Item = CategoryId> + '_ {
        std::iter::successors(Some(id), move |c| self.category(*c).super_class)
    }

    pub fn category_name(&self, id: CategoryId) -> Option<&str> {
        self.category_chain(id)
            .find_map(|c| self.category(c).meta.name.as_deref())
    }
}
