//! Plugin sources: module types discovered outside the static dependency
//! graph.

use crate::contracts::ModuleKey;

/// Collaborator yielding additional module types at discovery time. A key
/// already present from static discovery is not re-added by the loader.
pub trait PluginSource: Send + Sync {
    fn modules(&self) -> Vec<ModuleKey>;
}

/// Plugin source over an explicit list of keys; the in-process counterpart of
/// scanning a plugin folder.
pub struct StaticPluginSource {
    modules: Vec<ModuleKey>,
}

impl StaticPluginSource {
    #[must_use]
    pub fn new(modules: Vec<ModuleKey>) -> Self {
        Self { modules }
    }
}

impl PluginSource for StaticPluginSource {
    fn modules(&self) -> Vec<ModuleKey> {
        self.modules.clone()
    }
}
