//! Runtime record for one loaded module.

use std::fmt;
use std::sync::Arc;

use crate::contracts::{Module, ModuleKey};

/// Pairs a module's type identity with its singleton instance, plugin-origin
/// flag, and resolved dependency keys.
///
/// Created during the single discovery pass; `dependencies` is populated
/// exactly once right after creation (the wiring step) and is ordered,
/// deduplicated, and never contains the module's own key. Every key in it
/// resolves to another descriptor in the same loaded set. Descriptors live as
/// long as the composition root.
pub struct ModuleDescriptor {
    key: ModuleKey,
    instance: Arc<dyn Module>,
    is_plugin: bool,
    dependencies: Vec<ModuleKey>,
}

impl ModuleDescriptor {
    pub(crate) fn new(key: ModuleKey, instance: Arc<dyn Module>, is_plugin: bool) -> Self {
        Self {
            key,
            instance,
            is_plugin,
            dependencies: Vec::new(),
        }
    }

    /// Wiring step; called exactly once per descriptor.
    pub(crate) fn set_dependencies(&mut self, dependencies: Vec<ModuleKey>) {
        debug_assert!(self.dependencies.is_empty(), "dependencies wired twice");
        self.dependencies = dependencies;
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> ModuleKey {
        self.key
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.key.name()
    }

    #[inline]
    #[must_use]
    pub fn instance(&self) -> &Arc<dyn Module> {
        &self.instance
    }

    /// Whether the module came from a plugin source rather than the static
    /// dependency graph.
    #[inline]
    #[must_use]
    pub fn is_plugin(&self) -> bool {
        self.is_plugin
    }

    /// Resolved dependency keys, in declaration order.
    #[inline]
    #[must_use]
    pub fn dependencies(&self) -> &[ModuleKey] {
        &self.dependencies
    }
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("name", &self.name())
            .field("is_plugin", &self.is_plugin)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}
