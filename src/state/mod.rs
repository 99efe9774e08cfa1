//! Dirty and rebuild tracking
//!
//! Every entity carries a [`ChangeStamp`] of logical times taken from the
//! model clock. An entity is dirty while its last modification is newer than
//! its last persistence, and needs a rebuild while its last rebuild request is
//! newer than its last rebuild. Composite entities aggregate over their
//! children on every query, so clearing a parent never has to reach into
//! children to stay correct.
//!
//! Extension entities never carry state: they always report clean and
//! ignore writes.

use tracing::trace;

use crate::model::{BuildModel, EntityKey, ResourceKind};

/// Logical change times of one entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeStamp {
    modified: u64,
    persisted: u64,
    rebuild_requested: u64,
    rebuilt: u64,
}

impl ChangeStamp {
    /// Local changes not yet persisted.
    pub fn is_dirty(&self) -> bool {
        self.modified > self.persisted
    }

    /// Local changes not yet built.
    pub fn needs_rebuild(&self) -> bool {
        self.rebuild_requested > self.rebuilt
    }

    pub(crate) fn mark_dirty(&mut self, at: u64) {
        self.modified = at;
    }

    pub(crate) fn mark_persisted(&mut self, at: u64) {
        self.persisted = at;
    }

    pub(crate) fn request_rebuild(&mut self, at: u64) {
        self.rebuild_requested = at;
    }

    pub(crate) fn mark_rebuilt(&mut self, at: u64) {
        self.rebuilt = at;
    }

    pub(crate) fn mark_changed(&mut self, at: u64) {
        self.mark_dirty(at);
        self.request_rebuild(at);
    }
}

impl BuildModel {
    pub(crate) fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Entities whose state rolls up into `key`.
    fn state_children(&self, key: EntityKey) -> Vec<EntityKey> {
        match key {
            EntityKey::Configuration(c) => self
                .configuration(c)
                .resources
                .values()
                .map(|r| EntityKey::Resource(*r))
                .collect(),
            EntityKey::Resource(r) => match &self.resource(r).kind {
                ResourceKind::Folder { tool_chain } => {
                    tool_chain.iter().map(|tc| EntityKey::ToolChain(*tc)).collect()
                }
                ResourceKind::File { tools } => tools.iter().map(|t| EntityKey::Tool(*t)).collect(),
            },
            EntityKey::ToolChain(tc) => {
                let tool_chain = self.tool_chain(tc);
                let mut out: Vec<EntityKey> = tool_chain.tools.values().map(|t| EntityKey::Tool(*t)).collect();
                out.extend(tool_chain.options.local_options().map(EntityKey::Option));
                out.extend(tool_chain.options.local_categories().map(EntityKey::Category));
                out
            }
            EntityKey::Tool(t) => {
                let options = &self.tool(t).options;
                options
                    .local_options()
                    .map(EntityKey::Option)
                    .chain(options.local_categories().map(EntityKey::Category))
                    .collect()
            }
            EntityKey::Option(_) | EntityKey::Category(_) => Vec::new(),
        }
    }

    /// Superclass whose pending rebuild is inherited.
    fn state_super(&self, key: EntityKey) -> Option<EntityKey> {
        match key {
            EntityKey::Option(o) => self.option(o).super_class.map(EntityKey::Option),
            EntityKey::Category(c) => self.category(c).super_class.map(EntityKey::Category),
            EntityKey::Tool(t) => self.tool(t).super_class.map(EntityKey::Tool),
            EntityKey::ToolChain(tc) => self.tool_chain(tc).super_class.map(EntityKey::ToolChain),
            EntityKey::Resource(_) | EntityKey::Configuration(_) => None,
        }
    }

    /// Whether `key` or any project-owned descendant has unpersisted changes.
    pub fn is_dirty(&self, key: EntityKey) -> bool {
        let meta = self.meta(key);
        if meta.is_extension {
            return false;
        }
        meta.stamp.is_dirty() || self.state_children(key).into_iter().any(|c| self.is_dirty(c))
    }

    /// Whether `key`, a descendant or (for options) a superclass needs a rebuild.
    pub fn needs_rebuild(&self, key: EntityKey) -> bool {
        let meta = self.meta(key);
        if meta.is_extension {
            return false;
        }
        if meta.stamp.needs_rebuild() {
            return true;
        }
        if let EntityKey::Option(o) = key {
            if let Some(sup) = self.option(o).super_class {
                if self.needs_rebuild(sup.into()) {
                    return true;
                }
            }
        }
        self.state_children(key).into_iter().any(|c| self.needs_rebuild(c))
    }

    /// Mark `key` dirty, or clear it and every project-owned descendant.
    pub fn set_dirty(&mut self, key: EntityKey, dirty: bool) {
        if self.meta(key).is_extension {
            return;
        }
        let at = self.tick();
        if dirty {
            self.meta_mut(key).stamp.mark_dirty(at);
        } else {
            self.clear_dirty(key, at);
        }
    }

    fn clear_dirty(&mut self, key: EntityKey, at: u64) {
        if self.meta(key).is_extension {
            return;
        }
        self.meta_mut(key).stamp.mark_persisted(at);
        for child in self.state_children(key) {
            self.clear_dirty(child, at);
        }
    }

    /// Request a rebuild of `key`, or clear the request on it and its
    /// project-owned descendants.
    ///
    /// Clearing leaves a node pending while its superclass still needs a
    /// rebuild.
    pub fn set_rebuild_state(&mut self, key: EntityKey, rebuild: bool) {
        if self.meta(key).is_extension {
            return;
        }
        let at = self.tick();
        if rebuild {
            self.meta_mut(key).stamp.request_rebuild(at);
        } else {
            self.clear_rebuild(key, at);
        }
    }

    fn clear_rebuild(&mut self, key: EntityKey, at: u64) {
        if self.meta(key).is_extension {
            return;
        }
        let blocked = self
            .state_super(key)
            .map(|s| self.needs_rebuild(s))
            .unwrap_or(false);
        if blocked {
            trace!(entity = %self.meta(key).id, "superclass still needs rebuild");
        } else {
            self.meta_mut(key).stamp.mark_rebuilt(at);
        }
        for child in self.state_children(key) {
            self.clear_rebuild(child, at);
        }
    }

    /// Record a value change on a project-owned entity.
    pub(crate) fn mark_changed(&mut self, key: EntityKey) {
        if self.meta(key).is_extension {
            return;
        }
        let at = self.tick();
        self.meta_mut(key).stamp.mark_changed(at);
    }
}
