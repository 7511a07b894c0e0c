//! Read-side service resolution and short-lived resolution scopes.
//!
//! After the configuration group completes, the composition root hands the
//! populated [`ServiceHub`] to a [`ResolverFactory`] and keeps the returned
//! [`ServiceResolver`] for the rest of the process lifetime. The factory is
//! the pluggable seam for embedding a different container; the default simply
//! wraps the hub.

use std::fmt;
use std::sync::Arc;

use crate::service_hub::{ServiceHub, ServiceHubError};

/// Builds the final resolver from the populated registry. Pluggable so hosts
/// can layer validation or an alternative container behind the same surface.
pub trait ResolverFactory: Send + Sync {
    /// # Errors
    /// A factory may fail when the populated registry violates its own
    /// requirements; the error aborts bootstrap.
    fn build(&self, services: Arc<ServiceHub>) -> anyhow::Result<Arc<ServiceResolver>>;
}

/// Default factory: the resolver is a read view over the hub itself.
#[derive(Debug, Default)]
pub struct LocalResolverFactory;

impl ResolverFactory for LocalResolverFactory {
    fn build(&self, services: Arc<ServiceHub>) -> anyhow::Result<Arc<ServiceResolver>> {
        Ok(Arc::new(ServiceResolver::new(services)))
    }
}

/// Read surface over the composed services. The hub behind it is mutated only
/// during the configuration group; afterwards every consumer goes through
/// this type or a scope opened from it.
pub struct ServiceResolver {
    services: Arc<ServiceHub>,
}

impl ServiceResolver {
    #[must_use]
    pub fn new(services: Arc<ServiceHub>) -> Self {
        Self { services }
    }

    /// Resolve a global singleton by interface type.
    ///
    /// # Errors
    /// Returns [`ServiceHubError::NotFound`] when nothing is registered under
    /// `T`.
    pub fn get<T>(&self) -> Result<Arc<T>, ServiceHubError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.services.get::<T>()
    }

    /// Open a short-lived resolution scope. Registrations made through the
    /// scope shadow global ones for scoped lookups and are dropped when the
    /// last handle to the scope goes away.
    #[must_use]
    pub fn open_scope(&self, name: &str) -> ServiceScope {
        tracing::debug!(scope = name, "Opening resolution scope");
        ServiceScope {
            inner: Arc::new(ScopeInner {
                services: Arc::clone(&self.services),
                name: Arc::from(name),
            }),
        }
    }
}

impl fmt::Debug for ServiceResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceResolver").finish_non_exhaustive()
    }
}

struct ScopeInner {
    services: Arc<ServiceHub>,
    name: Arc<str>,
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        tracing::debug!(scope = %self.name, "Closing resolution scope");
        self.services.clear_scope(&self.name);
    }
}

/// Handle to a short-lived resolution scope. Cheap to clone; the scope's
/// registrations are cleared when the last clone drops.
#[derive(Clone)]
pub struct ServiceScope {
    inner: Arc<ScopeInner>,
}

impl ServiceScope {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Register a service visible only within this scope.
    pub fn register<T>(&self, service: Arc<T>)
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.inner
            .services
            .register_scoped::<T>(Arc::clone(&self.inner.name), service);
    }

    /// Resolve by interface type: scoped registrations first, then the global
    /// singletons.
    ///
    /// # Errors
    /// Returns [`ServiceHubError::NotFound`] when `T` is registered in
    /// neither the scope nor the global scope.
    pub fn get<T>(&self) -> Result<Arc<T>, ServiceHubError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        match self
            .inner
            .services
            .get_scoped::<T>(Arc::clone(&self.inner.name))
        {
            Ok(service) => Ok(service),
            Err(ServiceHubError::NotFound { .. }) => self.inner.services.get::<T>(),
            Err(other) => Err(other),
        }
    }
}

impl fmt::Debug for ServiceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceScope")
            .field("name", &self.inner.name)
            .finish_non_exhaustive()
    }
}
