//! Phase-scoped contexts handed to module lifecycle hooks.
//!
//! Each hook receives a context carrying exactly what its phase may touch:
//! the configuration group gets the still-mutable service hub plus the merged
//! configuration snapshot; the initialization group and shutdown get a
//! resolution scope over the built resolver. The property bag travels through
//! all of them. Contexts are per-module views (the module name scopes config
//! lookups and log lines) over shared state; building one is a handful of
//! `Arc` clones.

use std::sync::Arc;

use crate::config::{module_config_or_default, ConfigError, ConfigProvider};
use crate::properties::PropertyBag;
use crate::resolver::ServiceScope;
use crate::service_hub::ServiceHub;

/// Context for the configuration group (`pre_configure`, `configure`,
/// `post_configure`): composition time, registry still mutable.
#[derive(Clone)]
pub struct ConfigureCtx {
    module_name: &'static str,
    services: Arc<ServiceHub>,
    config_provider: Arc<dyn ConfigProvider>,
    properties: Arc<PropertyBag>,
}

impl ConfigureCtx {
    #[must_use]
    pub fn new(
        module_name: &'static str,
        services: Arc<ServiceHub>,
        config_provider: Arc<dyn ConfigProvider>,
        properties: Arc<PropertyBag>,
    ) -> Self {
        Self {
            module_name,
            services,
            config_provider,
            properties,
        }
    }

    #[inline]
    #[must_use]
    pub fn module_name(&self) -> &'static str {
        self.module_name
    }

    /// The mutable registry. Register the module's own services here so other
    /// modules and the post-build resolver can find them.
    #[inline]
    #[must_use]
    pub fn services(&self) -> &ServiceHub {
        &self.services
    }

    #[inline]
    #[must_use]
    pub fn config_provider(&self) -> &dyn ConfigProvider {
        &*self.config_provider
    }

    #[inline]
    #[must_use]
    pub fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    /// Deserialize this module's config section into `T`, falling back to
    /// `T::default()` when the section is absent.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidConfig`] when the section exists but
    /// does not deserialize.
    pub fn config<T: serde::de::DeserializeOwned + Default>(&self) -> Result<T, ConfigError> {
        module_config_or_default(self.config_provider.as_ref(), self.module_name)
    }

    /// The raw JSON config section of this module, if any.
    #[must_use]
    pub fn raw_config(&self) -> Option<&serde_json::Value> {
        self.config_provider.get_module_config(self.module_name)
    }
}

/// Ordered, freely-typed initialization parameters supplied by the caller of
/// `initialize`.
#[derive(Default)]
pub struct InitParams {
    values: Vec<Box<dyn std::any::Any + Send + Sync>>,
}

impl InitParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style push.
    #[must_use]
    pub fn with<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.values.push(Box::new(value));
        self
    }

    pub fn push<T: Send + Sync + 'static>(&mut self, value: T) {
        self.values.push(Box::new(value));
    }

    /// The first parameter of type `T`, if any.
    #[must_use]
    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.values.iter().find_map(|v| v.downcast_ref::<T>())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Context for the initialization group (`pre_init`, `init`, `post_init`):
/// post-build runtime.
#[derive(Clone)]
pub struct InitCtx {
    module_name: &'static str,
    scope: ServiceScope,
    properties: Arc<PropertyBag>,
    params: Arc<InitParams>,
}

impl InitCtx {
    #[must_use]
    pub fn new(
        module_name: &'static str,
        scope: ServiceScope,
        properties: Arc<PropertyBag>,
        params: Arc<InitParams>,
    ) -> Self {
        Self {
            module_name,
            scope,
            properties,
            params,
        }
    }

    #[inline]
    #[must_use]
    pub fn module_name(&self) -> &'static str {
        self.module_name
    }

    /// The resolution scope over the built resolver.
    #[inline]
    #[must_use]
    pub fn scope(&self) -> &ServiceScope {
        &self.scope
    }

    #[inline]
    #[must_use]
    pub fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    /// Caller-supplied initialization parameters.
    #[inline]
    #[must_use]
    pub fn params(&self) -> &InitParams {
        &self.params
    }
}

/// Context for reverse-order teardown.
#[derive(Clone)]
pub struct ShutdownCtx {
    module_name: &'static str,
    scope: ServiceScope,
    properties: Arc<PropertyBag>,
}

impl ShutdownCtx {
    #[must_use]
    pub fn new(module_name: &'static str, scope: ServiceScope, properties: Arc<PropertyBag>) -> Self {
        Self {
            module_name,
            scope,
            properties,
        }
    }

    #[inline]
    #[must_use]
    pub fn module_name(&self) -> &'static str {
        self.module_name
    }

    /// Dependencies are still resolvable here: teardown runs in reverse load
    /// order.
    #[inline]
    #[must_use]
    pub fn scope(&self) -> &ServiceScope {
        &self.scope
    }

    #[inline]
    #[must_use]
    pub fn properties(&self) -> &PropertyBag {
        &self.properties
    }
}
