//! Composition root: owns configuration merge, registry construction, module
//! loading, and the `initialize`/`shutdown` entry points.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::{ConfigProvider, ConfigSnapshot, ConfigSources};
use crate::context::InitParams;
use crate::contracts::{ConventionalRegistrar, ModuleDef, ModuleKey};
use crate::descriptor::ModuleDescriptor;
use crate::error::BootstrapError;
use crate::loader;
use crate::manager::ModuleManager;
use crate::plugins::PluginSource;
use crate::properties::PropertyBag;
use crate::resolver::{LocalResolverFactory, ResolverFactory, ServiceResolver};
use crate::service_hub::ServiceHub;

/// Everything `Bootstrapper::create` needs besides the startup module type.
/// Plain data; defaults are an empty config, no plugins, the local resolver
/// factory, and no conventional registrar.
#[derive(Default)]
pub struct BootstrapOptions {
    pub config: ConfigSources,
    pub plugin_sources: Vec<Arc<dyn PluginSource>>,
    pub resolver_factory: Option<Arc<dyn ResolverFactory>>,
    pub registrar: Option<Arc<dyn ConventionalRegistrar>>,
}

/// Handle over a composed application.
///
/// `create` merges configuration, loads and wires the module graph, drives
/// the configuration lifecycle group, and builds the final resolver — so a
/// returned `Bootstrapper` is fully composed and ready for `initialize`.
///
/// ```no_run
/// use modlink::{Bootstrapper, BootstrapOptions, InitParams, Module, ModuleDef};
///
/// #[derive(Default)]
/// struct AppModule;
/// impl Module for AppModule {}
/// impl ModuleDef for AppModule {
///     const NAME: &'static str = "app";
/// }
///
/// # fn main() -> Result<(), modlink::BootstrapError> {
/// let app = Bootstrapper::create::<AppModule>(BootstrapOptions::default())?;
/// app.initialize(InitParams::new())?;
/// app.shutdown();
/// # Ok(())
/// # }
/// ```
pub struct Bootstrapper {
    modules: Vec<ModuleDescriptor>,
    services: Arc<ServiceHub>,
    resolver: Arc<ServiceResolver>,
    config: Arc<ConfigSnapshot>,
    properties: Arc<PropertyBag>,
    manager: Arc<ModuleManager>,
    shut_down: AtomicBool,
}

impl Bootstrapper {
    /// Compose an application rooted at startup module `M`.
    ///
    /// # Errors
    /// Fails on configuration-source merge errors, on a malformed module set,
    /// on an unsatisfiable dependency graph, on the first failing
    /// configuration hook, or when the resolver factory rejects the populated
    /// registry. No initialization hook has run when this returns an error.
    pub fn create<M: ModuleDef>(options: BootstrapOptions) -> Result<Self, BootstrapError> {
        let BootstrapOptions {
            config,
            plugin_sources,
            resolver_factory,
            registrar,
        } = options;

        let config = Arc::new(
            config
                .merge()
                .map_err(|source| BootstrapError::ConfigMerge { source })?,
        );

        let services = Arc::new(ServiceHub::new());
        let properties = Arc::new(PropertyBag::new());
        let manager = Arc::new(match registrar {
            Some(registrar) => ModuleManager::with_registrar(registrar),
            None => ModuleManager::new(),
        });

        // Composition plumbing is itself resolvable, like any module service.
        services.register::<ConfigSnapshot>(Arc::clone(&config));
        services.register::<PropertyBag>(Arc::clone(&properties));
        services.register::<ModuleManager>(Arc::clone(&manager));

        tracing::info!(startup = M::NAME, "Loading modules");
        let modules = loader::load_modules(&services, ModuleKey::of::<M>(), &plugin_sources)?;

        let config_provider: Arc<dyn ConfigProvider> = config.clone();
        manager.configure_modules(&modules, &services, &config_provider, &properties)?;

        let factory = resolver_factory.unwrap_or_else(|| Arc::new(LocalResolverFactory));
        let resolver = factory
            .build(Arc::clone(&services))
            .map_err(|source| BootstrapError::ResolverBuild { source })?;

        tracing::info!(modules = modules.len(), "Application composed");
        Ok(Self {
            modules,
            services,
            resolver,
            config,
            properties,
            manager,
            shut_down: AtomicBool::new(false),
        })
    }

    /// Run the initialization group over the finalized order, with
    /// caller-supplied parameters, inside a short-lived resolution scope.
    ///
    /// # Errors
    /// The first failing hook aborts the remainder of that pass and all later
    /// passes.
    pub fn initialize(&self, params: InitParams) -> Result<(), BootstrapError> {
        let scope = self.resolver.open_scope("initialize");
        self.manager
            .init_modules(&self.modules, &scope, &self.properties, &Arc::new(params))?;
        tracing::info!("Application initialized");
        Ok(())
    }

    /// Tear modules down in reverse order. Idempotent: the second and later
    /// calls (including the one from `Drop`) are no-ops.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        let scope = self.resolver.open_scope("shutdown");
        self.manager
            .shutdown_modules(&self.modules, &scope, &self.properties);
        tracing::info!("Application shut down");
    }

    /// Finalized module order: kernel first, startup last, dependencies
    /// before dependents in between.
    #[must_use]
    pub fn modules(&self) -> &[ModuleDescriptor] {
        &self.modules
    }

    #[must_use]
    pub fn resolver(&self) -> &Arc<ServiceResolver> {
        &self.resolver
    }

    /// The registry the modules populated. Read-only by convention after
    /// composition.
    #[must_use]
    pub fn services(&self) -> &Arc<ServiceHub> {
        &self.services
    }

    #[must_use]
    pub fn config(&self) -> &Arc<ConfigSnapshot> {
        &self.config
    }

    #[must_use]
    pub fn properties(&self) -> &Arc<PropertyBag> {
        &self.properties
    }
}

impl std::fmt::Debug for Bootstrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bootstrapper")
            .field("modules", &self.modules.len())
            .field("shut_down", &self.shut_down.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl Drop for Bootstrapper {
    fn drop(&mut self) {
        self.shutdown();
    }
}
