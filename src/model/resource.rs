//! Per-folder and per-file resource configurations.

use super::entity::EntityMeta;
use super::keys::{ConfigId, ToolChainId, ToolId};

/// What a resource configuration overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    /// A folder with its own tool chain.
    Folder { tool_chain: Option<ToolChainId> },
    /// A single file with an ordered tool list.
    File { tools: Vec<ToolId> },
}

#[derive(Debug, Clone)]
pub struct ResourceInfo {
    pub meta: EntityMeta,
    pub configuration: ConfigId,
    /// Project-relative path without leading or trailing `/`; `""` is the root.
    pub path: String,
    pub kind: ResourceKind,
    pub excluded: bool,
    /// Bumped each time option applicability is recomputed for this resource.
    pub applicability_epoch: u64,
}

impl ResourceInfo {
    pub fn new(meta: EntityMeta, configuration: ConfigId, path: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            meta,
            configuration,
            path: normalize_path(&path.into()),
            kind,
            excluded: false,
            applicability_epoch: 0,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.kind, ResourceKind::Folder { .. })
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    pub fn tool_chain(&self) -> Option<ToolChainId> {
        match self.kind {
            ResourceKind::Folder { tool_chain } => tool_chain,
            ResourceKind::File { .. } => None,
        }
    }

    /// Path as shown to users (`/` for the root).
    pub fn display_path(&self) -> String {
        format!("/{}", self.path)
    }
}

/// Strip leading/trailing separators and `.` segments.
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Ancestor paths from the nearest to the root, `path` itself excluded.
pub fn parent_paths(path: &str) -> impl Iterator<Item = &str> {
    let path = path.trim_matches('/');
    let mut end = Some(path.len());
    std::iter::from_fn(move || {
        let current = end?;
        let head = &path[..current];
        match head.rfind('/') {
            Some(i) => {
                end = Some(i);
                Some(&path[..i])
            }
            None if current > 0 => {
                end = None;
                Some("")
            }
            None => {
                end = None;
                None
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/src/./util/"), "src/util");
        assert_eq!(normalize_path("/"), "");
    }

    #[test]
    fn test_parent_paths() {
        let parents: Vec<&str> = parent_paths("src/util/a.c").collect();
        assert_eq!(parents, vec!["src/util", "src", ""]);
        assert_eq!(parent_paths("a.c").collect::<Vec<_>>(), vec![""]);
        assert!(parent_paths("").next().is_none());
    }
}
