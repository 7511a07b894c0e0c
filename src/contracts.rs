//! Module contracts: the lifecycle trait, static module metadata, and the
//! collaborator traits the orchestrator calls out to.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::context::{ConfigureCtx, InitCtx, ShutdownCtx};
use crate::descriptor::ModuleDescriptor;
use crate::service_hub::ServiceHub;

/// A composition unit: seven lifecycle hooks, all defaulted to no-ops.
///
/// Hooks run in two barrier-synchronized groups plus teardown:
///
/// - **Configuration group** (`pre_configure` → `configure` →
///   `post_configure`): composition time. The hub is still mutable; register
///   the module's own services here. Every module finishes a sub-phase before
///   any module enters the next, so `configure` may rely on side effects of
///   *every* module's `pre_configure`, not only its dependencies'.
/// - **Initialization group** (`pre_init` → `init` → `post_init`): post-build
///   runtime. Hooks resolve services through the built resolver scope and may
///   read caller-supplied initialization parameters.
/// - `shutdown`: single pass in reverse load order, so a module may still call
///   services of the modules it depends on while tearing itself down.
///
/// Hooks are synchronous and run once per process lifetime on the calling
/// thread. A hook that blocks, blocks startup or shutdown.
pub trait Module: Send + Sync + 'static {
    /// # Errors
    /// Any error aborts the remainder of the pass and all later passes.
    fn pre_configure(&self, _ctx: &ConfigureCtx) -> anyhow::Result<()> {
        Ok(())
    }

    /// # Errors
    /// Any error aborts the remainder of the pass and all later passes.
    fn configure(&self, _ctx: &ConfigureCtx) -> anyhow::Result<()> {
        Ok(())
    }

    /// # Errors
    /// Any error aborts the remainder of the pass and all later passes.
    fn post_configure(&self, _ctx: &ConfigureCtx) -> anyhow::Result<()> {
        Ok(())
    }

    /// # Errors
    /// Any error aborts the remainder of the pass and all later passes.
    fn pre_init(&self, _ctx: &InitCtx) -> anyhow::Result<()> {
        Ok(())
    }

    /// # Errors
    /// Any error aborts the remainder of the pass and all later passes.
    fn init(&self, _ctx: &InitCtx) -> anyhow::Result<()> {
        Ok(())
    }

    /// # Errors
    /// Any error aborts the remainder of the pass and all later passes.
    fn post_init(&self, _ctx: &InitCtx) -> anyhow::Result<()> {
        Ok(())
    }

    /// # Errors
    /// Shutdown errors are logged and teardown continues with the remaining
    /// modules.
    fn shutdown(&self, _ctx: &ShutdownCtx) -> anyhow::Result<()> {
        Ok(())
    }

    /// Whether the conventional component registrar (if one is installed)
    /// should run for this module after its `configure` hook.
    fn auto_register_components(&self) -> bool {
        true
    }
}

/// Static metadata for a module type: a unique name, an explicit dependency
/// list, and `Default` construction. This is what makes a type addressable as
/// a [`ModuleKey`].
///
/// ```
/// use modlink::{Module, ModuleDef, ModuleKey};
///
/// #[derive(Default)]
/// struct CacheModule;
///
/// impl Module for CacheModule {}
///
/// impl ModuleDef for CacheModule {
///     const NAME: &'static str = "cache";
/// }
///
/// #[derive(Default)]
/// struct AppModule;
///
/// impl Module for AppModule {}
///
/// impl ModuleDef for AppModule {
///     const NAME: &'static str = "app";
///
///     fn depends_on() -> Vec<ModuleKey> {
///         vec![ModuleKey::of::<CacheModule>()]
///     }
/// }
/// ```
pub trait ModuleDef: Module + Default {
    /// Short unique name used in logs and error messages.
    const NAME: &'static str;

    /// Declared dependencies, in order. Declaring none means an implicit
    /// dependency on the kernel module.
    #[must_use]
    fn depends_on() -> Vec<ModuleKey> {
        Vec::new()
    }
}

/// Identity of a module type.
///
/// A small `Copy` record carrying the `TypeId` (the identity), the declared
/// name, and two monomorphized function pointers: one yielding the declared
/// dependency list, one constructing the singleton instance and registering
/// it in the service hub keyed by the concrete type. Equality and hashing use
/// only the `TypeId`.
#[derive(Clone, Copy)]
pub struct ModuleKey {
    type_id: TypeId,
    name: &'static str,
    deps: fn() -> Vec<ModuleKey>,
    factory: fn(&ServiceHub) -> Arc<dyn Module>,
}

impl ModuleKey {
    /// The key of module type `M`.
    #[must_use]
    pub fn of<M: ModuleDef>() -> Self {
        Self {
            type_id: TypeId::of::<M>(),
            name: M::NAME,
            deps: M::depends_on,
            factory: |hub| {
                let module = Arc::new(M::default());
                hub.register::<M>(Arc::clone(&module));
                module
            },
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The dependency list exactly as the module type declares it.
    #[must_use]
    pub fn declared_dependencies(&self) -> Vec<ModuleKey> {
        (self.deps)()
    }

    /// Construct the one instance of this module type and register it in
    /// `hub` as a singleton keyed by the concrete type.
    pub(crate) fn instantiate(&self, hub: &ServiceHub) -> Arc<dyn Module> {
        (self.factory)(hub)
    }
}

impl PartialEq for ModuleKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ModuleKey {}

impl Hash for ModuleKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Collaborator performing convention-based registration of a module's own
/// component types. Invoked between `configure` calls for each module that
/// has not opted out via [`Module::auto_register_components`].
pub trait ConventionalRegistrar: Send + Sync {
    /// # Errors
    /// An error aborts composition the same way a failing `configure` hook
    /// does.
    fn register_components(
        &self,
        module: &ModuleDescriptor,
        services: &ServiceHub,
    ) -> anyhow::Result<()>;
}
