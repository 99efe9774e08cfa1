//! Build entity arena.
//!
//! All entities (extension templates and project-owned overrides) live in
//! one [`BuildModel`]. Relations are stored as keys; entities are never
//! freed, only detached from their parents.

pub mod configuration;
pub mod enablement;
pub mod entity;
pub mod keys;
pub mod option;
pub mod resource;
pub mod tool;
pub mod tool_chain;

pub use configuration::{BuildProperties, Configuration, PropertySupport, PropertyType, ARTIFACT_TYPE};
pub use enablement::{Enablement, Nature, NatureFilter, ProjectNatures};
pub use entity::{EntityMeta, OptionSet};
pub use keys::{
    CategoryId, ConfigId, EntityKey, HolderKey, OptionId, OptionRefId, ResourceId, ToolChainId,
    ToolId, ToolRefId,
};
pub use option::{Category, OptionDef};
pub use resource::{ResourceInfo, ResourceKind};
pub use tool::{InputType, OutputType, Tool, ToolParent};
pub use tool_chain::ToolChain;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::debug;

use crate::error::{ModelError, ResolveError, Result};
use crate::ids::{self, CounterIdGenerator, IdGenerator};
use crate::modify::converter::ConverterRegistry;
use crate::reference::{OptionReference, ToolReference};
use crate::value::ValueKind;

/// Arena of every build entity known to one workspace.
pub struct BuildModel {
    pub(crate) options: Vec<OptionDef>,
    pub(crate) categories: Vec<Category>,
    pub(crate) tools: Vec<Tool>,
    pub(crate) tool_chains: Vec<ToolChain>,
    pub(crate) resources: Vec<ResourceInfo>,
    pub(crate) configurations: Vec<Configuration>,
    pub(crate) tool_refs: Vec<ToolReference>,
    pub(crate) option_refs: Vec<OptionReference>,

    /// Id to every entity carrying it. Project ids may repeat across
    /// configurations cloned with their ids.
    pub(crate) index: HashMap<String, Vec<EntityKey>>,

    pub(crate) converters: ConverterRegistry,
    pub(crate) property_types: BTreeMap<String, PropertyType>,

    /// Recoverable resolution failures, in the order they were hit.
    pub(crate) diagnostics: Vec<ResolveError>,

    id_generator: Box<dyn IdGenerator>,

    /// Logical time for change stamps.
    pub(crate) clock: u64,
}

impl fmt::Debug for BuildModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildModel")
            .field("options", &self.options.len())
            .field("tools", &self.tools.len())
            .field("tool_chains", &self.tool_chains.len())
            .field("configurations", &self.configurations.len())
            .field("diagnostics", &self.diagnostics.len())
            .finish()
    }
}

impl Default for BuildModel {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildModel {
    /// Empty model using a counter for adjusted-id tokens.
    pub fn new() -> Self {
        Self::with_id_generator(Box::new(CounterIdGenerator::default()))
    }

    pub fn with_id_generator(id_generator: Box<dyn IdGenerator>) -> Self {
        Self {
            options: Vec::new(),
            categories: Vec::new(),
            tools: Vec::new(),
            tool_chains: Vec::new(),
            resources: Vec::new(),
            configurations: Vec::new(),
            tool_refs: Vec::new(),
            option_refs: Vec::new(),
            index: HashMap::new(),
            converters: ConverterRegistry::default(),
            property_types: BTreeMap::new(),
            diagnostics: Vec::new(),
            id_generator,
            clock: 0,
        }
    }

    // Accessors. Keys are only minted by this arena, so indexing cannot miss.

    pub fn option(&self, id: OptionId) -> &OptionDef {
        &self.options[id.index()]
    }

    pub fn option_mut(&mut self, id: OptionId) -> &mut OptionDef {
        &mut self.options[id.index()]
    }

    pub fn category(&self, id: CategoryId) -> &Category {
        &self.categories[id.index()]
    }

    pub fn category_mut(&mut self, id: CategoryId) -> &mut Category {
        &mut self.categories[id.index()]
    }

    pub fn tool(&self, id: ToolId) -> &Tool {
        &self.tools[id.index()]
    }

    pub fn tool_mut(&mut self, id: ToolId) -> &mut Tool {
        &mut self.tools[id.index()]
    }

    pub fn tool_chain(&self, id: ToolChainId) -> &ToolChain {
        &self.tool_chains[id.index()]
    }

    pub fn tool_chain_mut(&mut self, id: ToolChainId) -> &mut ToolChain {
        &mut self.tool_chains[id.index()]
    }

    pub fn resource(&self, id: ResourceId) -> &ResourceInfo {
        &self.resources[id.index()]
    }

    pub fn resource_mut(&mut self, id: ResourceId) -> &mut ResourceInfo {
        &mut self.resources[id.index()]
    }

    pub fn configuration(&self, id: ConfigId) -> &Configuration {
        &self.configurations[id.index()]
    }

    pub fn configuration_mut(&mut self, id: ConfigId) -> &mut Configuration {
        &mut self.configurations[id.index()]
    }

    pub fn tool_reference(&self, id: ToolRefId) -> &ToolReference {
        &self.tool_refs[id.index()]
    }

    pub fn option_reference(&self, id: OptionRefId) -> &OptionReference {
        &self.option_refs[id.index()]
    }

    pub fn converters(&self) -> &ConverterRegistry {
        &self.converters
    }

    pub fn converters_mut(&mut self) -> &mut ConverterRegistry {
        &mut self.converters
    }

    pub fn diagnostics(&self) -> &[ResolveError] {
        &self.diagnostics
    }

    pub fn configurations(&self) -> impl Iterator<Item = ConfigId> + '_ {
        (0..self.configurations.len()).map(ConfigId::from_index)
    }

    pub fn extension_tool_chains(&self) -> impl Iterator<Item = ToolChainId> + '_ {
        (0..self.tool_chains.len())
            .map(ToolChainId::from_index)
            .filter(|tc| self.tool_chain(*tc).meta.is_extension)
    }

    pub fn extension_tools(&self) -> impl Iterator<Item = ToolId> + '_ {
        (0..self.tools.len())
            .map(ToolId::from_index)
            .filter(|t| self.tool(*t).meta.is_extension)
    }

    pub fn meta(&self, key: EntityKey) -> &EntityMeta {
        match key {
            EntityKey::Option(k) => &self.option(k).meta,
            EntityKey::Category(k) => &self.category(k).meta,
            EntityKey::Tool(k) => &self.tool(k).meta,
            EntityKey::ToolChain(k) => &self.tool_chain(k).meta,
            EntityKey::Resource(k) => &self.resource(k).meta,
            EntityKey::Configuration(k) => &self.configuration(k).meta,
        }
    }

    pub(crate) fn meta_mut(&mut self, key: EntityKey) -> &mut EntityMeta {
        match key {
            EntityKey::Option(k) => &mut self.option_mut(k).meta,
            EntityKey::Category(k) => &mut self.category_mut(k).meta,
            EntityKey::Tool(k) => &mut self.tool_mut(k).meta,
            EntityKey::ToolChain(k) => &mut self.tool_chain_mut(k).meta,
            EntityKey::Resource(k) => &mut self.resource_mut(k).meta,
            EntityKey::Configuration(k) => &mut self.configuration_mut(k).meta,
        }
    }

    pub fn option_set(&self, holder: HolderKey) -> &OptionSet {
        match holder {
            HolderKey::Tool(t) => &self.tool(t).options,
            HolderKey::ToolChain(tc) => &self.tool_chain(tc).options,
        }
    }

    pub(crate) fn option_set_mut(&mut self, holder: HolderKey) -> &mut OptionSet {
        match holder {
            HolderKey::Tool(t) => &mut self.tool_mut(t).options,
            HolderKey::ToolChain(tc) => &mut self.tool_chain_mut(tc).options,
        }
    }

    /// Superclass of a holder, of the same kind.
    pub fn holder_super(&self, holder: HolderKey) -> Option<HolderKey> {
        match holder {
            HolderKey::Tool(t) => self.tool(t).super_class.map(HolderKey::Tool),
            HolderKey::ToolChain(tc) => self.tool_chain(tc).super_class.map(HolderKey::ToolChain),
        }
    }

    /// Configuration an entity belongs to; `None` for extension entities.
    pub fn config_of(&self, key: EntityKey) -> Option<ConfigId> {
        match key {
            EntityKey::Option(k) => self.config_of(self.option(k).holder.into()),
            EntityKey::Category(k) => self.config_of(self.category(k).holder.into()),
            EntityKey::Tool(k) => self
                .owning_resource(k)
                .map(|r| self.resource(r).configuration),
            EntityKey::ToolChain(k) => self
                .tool_chain(k)
                .folder
                .map(|r| self.resource(r).configuration),
            EntityKey::Resource(k) => Some(self.resource(k).configuration),
            EntityKey::Configuration(k) => Some(k),
        }
    }

    // Id index.

    /// Every entity carrying `id`.
    pub fn lookup(&self, id: &str) -> &[EntityKey] {
        self.index.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn find_option(&self, id: &str) -> Option<OptionId> {
        self.lookup(id).iter().find_map(|k| match k {
            EntityKey::Option(o) => Some(*o),
            _ => None,
        })
    }

    pub fn find_tool(&self, id: &str) -> Option<ToolId> {
        self.lookup(id).iter().find_map(|k| match k {
            EntityKey::Tool(t) => Some(*t),
            _ => None,
        })
    }

    pub fn find_tool_chain(&self, id: &str) -> Option<ToolChainId> {
        self.lookup(id).iter().find_map(|k| match k {
            EntityKey::ToolChain(t) => Some(*t),
            _ => None,
        })
    }

    pub fn find_configuration(&self, id: &str) -> Option<ConfigId> {
        self.lookup(id).iter().find_map(|k| match k {
            EntityKey::Configuration(c) => Some(*c),
            _ => None,
        })
    }

    /// Resolve a stored id, preferring an entity from `scope`, then an
    /// extension entity, then any match.
    pub(crate) fn resolve_key<K: Copy>(
        &self,
        id: &str,
        scope: Option<ConfigId>,
        pick: impl Fn(&EntityKey) -> Option<K>,
    ) -> Option<K> {
        let candidates: Vec<(EntityKey, K)> = self
            .lookup(id)
            .iter()
            .filter_map(|k| pick(k).map(|p| (*k, p)))
            .collect();
        candidates
            .iter()
            .find(|(k, _)| scope.is_some() && self.config_of(*k) == scope)
            .or_else(|| candidates.iter().find(|(k, _)| self.meta(*k).is_extension))
            .or(candidates.first())
            .map(|(_, p)| *p)
    }

    fn register(&mut self, id: &str, key: EntityKey) {
        self.index.entry(id.to_string()).or_default().push(key);
    }

    /// Deterministic unused id for a project child of `ancestor_id` owned by
    /// `owner_id`.
    pub(crate) fn unique_child_id(&self, ancestor_id: &str, owner_id: &str) -> String {
        (0u32..)
            .map(|attempt| ids::child_id(ancestor_id, owner_id, attempt))
            .find(|candidate| !self.index.contains_key(candidate))
            .unwrap_or_else(|| format!("{}.{}", ancestor_id, self.index.len()))
    }

    /// Fresh unused id for an adjusted extension element derived from `base_id`.
    pub(crate) fn next_adjusted_id(&mut self, base_id: &str) -> String {
        loop {
            let token = self.id_generator.next_token(base_id);
            let candidate = ids::adjusted_id(base_id, token);
            if !self.index.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    // Insertion. Each insert registers the id and links the entity into its
    // parent's local collection.

    pub(crate) fn insert_option(&mut self, option: OptionDef) -> OptionId {
        let key = OptionId::from_index(self.options.len());
        let id = option.meta.id.clone();
        let holder = option.holder;
        self.options.push(option);
        self.register(&id, key.into());
        self.option_set_mut(holder).options.insert(id, key);
        key
    }

    pub(crate) fn insert_category(&mut self, category: Category) -> CategoryId {
        let key = CategoryId::from_index(self.categories.len());
        let id = category.meta.id.clone();
        let holder = category.holder;
        self.categories.push(category);
        self.register(&id, EntityKey::Category(key));
        self.option_set_mut(holder).categories.insert(id, key);
        key
    }

    pub(crate) fn insert_tool(&mut self, tool: Tool) -> ToolId {
        let key = ToolId::from_index(self.tools.len());
        let id = tool.meta.id.clone();
        let parent = tool.parent;
        self.tools.push(tool);
        self.register(&id, key.into());
        self.attach_tool(key, parent);
        key
    }

    /// Link a tool into its parent's tool list.
    pub(crate) fn attach_tool(&mut self, key: ToolId, parent: Option<ToolParent>) {
        let id = self.tool(key).meta.id.clone();
        match parent {
            Some(ToolParent::ToolChain(tc)) => {
                self.tool_chain_mut(tc).tools.insert(id, key);
            }
            Some(ToolParent::Resource(r)) => {
                if let ResourceKind::File { tools } = &mut self.resource_mut(r).kind {
                    tools.push(key);
                }
            }
            None => {}
        }
    }

    pub(crate) fn insert_tool_chain(&mut self, tool_chain: ToolChain) -> ToolChainId {
        let key = ToolChainId::from_index(self.tool_chains.len());
        let id = tool_chain.meta.id.clone();
        let folder = tool_chain.folder;
        self.tool_chains.push(tool_chain);
        self.register(&id, key.into());
        if let Some(r) = folder {
            if let ResourceKind::Folder { tool_chain } = &mut self.resource_mut(r).kind {
                *tool_chain = Some(key);
            }
        }
        key
    }

    pub(crate) fn insert_resource(&mut self, resource: ResourceInfo) -> ResourceId {
        let key = ResourceId::from_index(self.resources.len());
        let id = resource.meta.id.clone();
        let cfg = resource.configuration;
        let path = resource.path.clone();
        self.resources.push(resource);
        self.register(&id, key.into());
        self.configuration_mut(cfg).resources.insert(path, key);
        key
    }

    pub(crate) fn insert_configuration(&mut self, configuration: Configuration) -> ConfigId {
        let key = ConfigId::from_index(self.configurations.len());
        let id = configuration.meta.id.clone();
        self.configurations.push(configuration);
        self.register(&id, key.into());
        key
    }

    pub(crate) fn insert_tool_reference(&mut self, reference: ToolReference) -> ToolRefId {
        let key = ToolRefId::from_index(self.tool_refs.len());
        let owner = reference.owner;
        self.tool_refs.push(reference);
        self.configuration_mut(owner).tool_references.push(key);
        key
    }

    pub(crate) fn insert_option_reference(&mut self, reference: OptionReference) -> OptionRefId {
        let key = OptionRefId::from_index(self.option_refs.len());
        let owner = reference.owner;
        self.option_refs.push(reference);
        self.tool_refs[owner.index()].options.push(key);
        key
    }

    pub(crate) fn option_reference_mut(&mut self, id: OptionRefId) -> &mut OptionReference {
        &mut self.option_refs[id.index()]
    }

    pub(crate) fn tool_reference_mut(&mut self, id: ToolRefId) -> &mut ToolReference {
        &mut self.tool_refs[id.index()]
    }

    // Extension definitions.

    /// Add an extension tool chain.
    pub fn define_tool_chain(&mut self, id: &str, name: Option<&str>) -> ToolChainId {
        let meta = EntityMeta::new(id, name.map(str::to_string), true);
        self.insert_tool_chain(ToolChain::new(meta, None))
    }

    /// Add an extension tool, standalone or inside an extension tool chain.
    pub fn define_tool(&mut self, tool_chain: Option<ToolChainId>, id: &str, name: Option<&str>) -> ToolId {
        let meta = EntityMeta::new(id, name.map(str::to_string), true);
        self.insert_tool(Tool::new(meta, tool_chain.map(ToolParent::ToolChain)))
    }

    /// Add an option to a holder; the option is an extension element when
    /// the holder is.
    pub fn define_option(
        &mut self,
        holder: HolderKey,
        id: &str,
        name: Option<&str>,
        kind: ValueKind,
    ) -> OptionId {
        let is_extension = self.meta(holder.into()).is_extension;
        let mut option = OptionDef::new(EntityMeta::new(id, name.map(str::to_string), is_extension), holder);
        option.value_type = Some(kind);
        self.insert_option(option)
    }

    pub fn define_category(&mut self, holder: HolderKey, id: &str, name: Option<&str>) -> CategoryId {
        let is_extension = self.meta(holder.into()).is_extension;
        let meta = EntityMeta::new(id, name.map(str::to_string), is_extension);
        self.insert_category(Category::new(meta, holder))
    }

    pub fn define_property_type(&mut self, property_type: PropertyType) {
        self.property_types
            .insert(property_type.id.clone(), property_type);
    }

    // Project-level creation.

    /// New project option under `holder` overriding `super_class`.
    pub fn create_project_option(&mut self, holder: HolderKey, super_class: OptionId) -> OptionId {
        let owner_id = self.meta(holder.into()).id.clone();
        let id = self.unique_child_id(&self.option(super_class).meta.id, &owner_id);
        let mut option = OptionDef::new(EntityMeta::new(id, None, false), holder);
        option.super_class = Some(super_class);
        option.value_type = self.option_value_type(super_class);
        let key = self.insert_option(option);
        self.mark_changed(key.into());
        debug!(option = %self.option(key).meta.id, holder = %owner_id, "created project option");
        key
    }

    /// New adjusted extension option under `holder` overriding `super_class`.
    pub(crate) fn create_adjusted_option(&mut self, holder: HolderKey, super_class: OptionId) -> OptionId {
        let base = self.option(super_class).meta.id.clone();
        let id = self.next_adjusted_id(&base);
        let mut option = OptionDef::new(EntityMeta::new(id, None, true), holder);
        option.super_class = Some(super_class);
        option.value_type = self.option_value_type(super_class);
        option.adjusted = true;
        let key = self.insert_option(option);
        debug!(option = %self.option(key).meta.id, base = %base, "created adjusted extension option");
        key
    }

    /// New project tool under `parent` overriding `super_class`.
    pub fn create_project_tool(&mut self, parent: ToolParent, super_class: ToolId) -> ToolId {
        let owner_id = match parent {
            ToolParent::ToolChain(tc) => self.tool_chain(tc).meta.id.clone(),
            ToolParent::Resource(r) => self.resource(r).meta.id.clone(),
        };
        let id = self.unique_child_id(&self.tool(super_class).meta.id, &owner_id);
        let mut tool = Tool::new(EntityMeta::new(id, None, false), Some(parent));
        tool.super_class = Some(super_class);
        let key = self.insert_tool(tool);
        self.mark_changed(key.into());
        key
    }

    /// New project tool chain for `folder` overriding `super_class`.
    pub fn create_project_tool_chain(&mut self, folder: ResourceId, super_class: ToolChainId) -> ToolChainId {
        let owner_id = self.resource(folder).meta.id.clone();
        let id = self.unique_child_id(&self.tool_chain(super_class).meta.id, &owner_id);
        let mut tool_chain = ToolChain::new(EntityMeta::new(id, None, false), Some(folder));
        tool_chain.super_class = Some(super_class);
        let key = self.insert_tool_chain(tool_chain);
        self.mark_changed(key.into());
        key
    }

    /// Resource id derived from its configuration and path.
    pub(crate) fn resource_id(cfg_id: &str, path: &str) -> String {
        format!("{}:/{}", cfg_id, path)
    }

    /// Create a project configuration from an extension tool chain.
    ///
    /// The root folder gets a project tool chain overriding `template` and
    /// one project tool per tool the template offers.
    pub fn new_configuration(&mut self, id: &str, name: Option<&str>, template: ToolChainId) -> Result<ConfigId> {
        if self.find_configuration(id).is_some() {
            return Err(ModelError::DuplicateId(id.to_string()));
        }
        let cfg = self.insert_configuration(Configuration::new(EntityMeta::new(
            id,
            name.map(str::to_string),
            false,
        )));
        let root_meta = EntityMeta::new(Self::resource_id(id, ""), None, false);
        let root = self.insert_resource(ResourceInfo::new(
            root_meta,
            cfg,
            "",
            ResourceKind::Folder { tool_chain: None },
        ));
        let tc = self.create_project_tool_chain(root, template);
        for tool in self.tool_chain_tools(template) {
            self.create_project_tool(ToolParent::ToolChain(tc), tool);
        }
        self.mark_changed(cfg.into());
        self.recompute_applicability(root);
        debug!(configuration = %id, template = %self.tool_chain(template).meta.id, "created configuration");
        Ok(cfg)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Small extension graphs shared by unit tests.

    use super::*;
    use crate::value::TypedValue;

    /// Handles into the gnu-like fixture.
    pub struct Gnu {
        pub tool_chain: ToolChainId,
        pub compiler: ToolId,
        pub linker: ToolId,
        pub debug: OptionId,
        pub level: OptionId,
        pub includes: OptionId,
        pub libs: OptionId,
    }

    /// Extension tool chain with a C compiler and a linker.
    pub fn gnu(model: &mut BuildModel) -> Gnu {
        let tool_chain = model.define_tool_chain("gnu.tc", Some("GNU"));
        model.tool_chain_mut(tool_chain).target_tools = Some(vec!["gnu.link".to_string()]);

        let compiler = model.define_tool(Some(tool_chain), "gnu.cc", Some("C compiler"));
        {
            let t = model.tool_mut(compiler);
            t.command = Some("gcc".into());
            t.input_types.push(InputType {
                id: "gnu.cc.in".into(),
                extensions: vec!["c".into()],
                dependency_extensions: vec!["h".into()],
                primary_input: true,
                ..InputType::default()
            });
            t.output_types.push(OutputType {
                id: "gnu.cc.out".into(),
                extensions: vec!["o".into()],
                build_variable: Some("OBJS".into()),
                primary_output: true,
                ..OutputType::default()
            });
        }
        let debug = model.define_option(compiler.into(), "gnu.cc.debug", Some("Debug"), ValueKind::Boolean);
        {
            let o = model.option_mut(debug);
            o.default_value = Some(TypedValue::Bool(false));
            o.command = Some("-g".into());
        }
        let level = model.define_option(compiler.into(), "gnu.cc.level", Some("Level"), ValueKind::String);
        model.option_mut(level).command = Some("-O".into());
        let includes = model.define_option(compiler.into(), "gnu.cc.includes", Some("Includes"), ValueKind::IncludePath);
        model.option_mut(includes).command = Some("-I".into());

        let linker = model.define_tool(Some(tool_chain), "gnu.link", Some("Linker"));
        {
            let t = model.tool_mut(linker);
            t.command = Some("ld".into());
            t.input_types.push(InputType {
                id: "gnu.link.in".into(),
                extensions: vec!["o".into()],
                multiple_of_type: true,
                primary_input: true,
                ..InputType::default()
            });
            t.output_types.push(OutputType {
                id: "gnu.link.out".into(),
                extensions: vec!["elf".into()],
                build_variable: Some("EXECUTABLES".into()),
                primary_output: true,
                ..OutputType::default()
            });
        }
        let libs = model.define_option(linker.into(), "gnu.link.libs", Some("Libraries"), ValueKind::Libraries);
        model.option_mut(libs).command = Some("-l".into());

        Gnu {
            tool_chain,
            compiler,
            linker,
            debug,
            level,
            includes,
            libs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_configuration_creates_project_overrides() {
        let mut model = BuildModel::new();
        let gnu = fixtures::gnu(&mut model);
        let cfg = model.new_configuration("cfg.debug", Some("Debug"), gnu.tool_chain).unwrap();

        let root = model.root_folder(cfg).unwrap();
        let tc = model.resource(root).tool_chain().unwrap();
        assert!(!model.tool_chain(tc).meta.is_extension);
        assert_eq!(model.tool_chain(tc).super_class, Some(gnu.tool_chain));

        let tools: Vec<ToolId> = model.tool_chain(tc).tools.values().copied().collect();
        assert_eq!(tools.len(), 2);
        assert_eq!(model.real_tool(tools[0]), gnu.compiler);
        assert!(model.tool(tools[0]).meta.id.starts_with("gnu.cc."));
        assert_eq!(model.config_of(tools[1].into()), Some(cfg));
    }

    #[test]
    fn test_duplicate_configuration_rejected() {
        let mut model = BuildModel::new();
        let gnu = fixtures::gnu(&mut model);
        model.new_configuration("cfg", None, gnu.tool_chain).unwrap();
        let err = model.new_configuration("cfg", None, gnu.tool_chain).unwrap_err();
        assert!(matches!(err, ModelError::DuplicateId(id) if id == "cfg"));
    }

    #[test]
    fn test_child_ids_are_stable() {
        let build = || {
            let mut model = BuildModel::new();
            let gnu = fixtures::gnu(&mut model);
            let cfg = model.new_configuration("cfg", None, gnu.tool_chain).unwrap();
            let tc = model.resource(model.root_folder(cfg).unwrap()).tool_chain().unwrap();
            model
                .tool_chain(tc)
                .tools
                .keys()
                .cloned()
                .collect::<Vec<_>>()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_resolve_key_prefers_scope() {
        let mut model = BuildModel::new();
        let gnu = fixtures::gnu(&mut model);
        let a = model.new_configuration("a", None, gnu.tool_chain).unwrap();
        let found = model.resolve_key("gnu.cc", Some(a), |k| match k {
            EntityKey::Tool(t) => Some(*t),
            _ => None,
        });
        assert_eq!(found, Some(gnu.compiler));
    }
}
