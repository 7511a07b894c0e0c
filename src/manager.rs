//! Lifecycle driver: walks the finalized module order through the two
//! three-pass groups and the single-pass reverse shutdown.

use std::sync::Arc;

use crate::config::ConfigProvider;
use crate::context::{ConfigureCtx, InitCtx, InitParams, ShutdownCtx};
use crate::contracts::{ConventionalRegistrar, Module};
use crate::descriptor::ModuleDescriptor;
use crate::error::{LifecycleError, Phase};
use crate::properties::PropertyBag;
use crate::resolver::ServiceScope;
use crate::service_hub::ServiceHub;

/// Drives modules through their lifecycle hooks.
///
/// Every sub-phase is a **global barrier**: all modules run a pass, in
/// finalized order, before any module enters the next pass. This lets a
/// later-pass hook observe side effects from the earlier pass of *every*
/// module, not only its declared dependencies. Shutdown is one pass over the
/// reverse order.
pub struct ModuleManager {
    registrar: Option<Arc<dyn ConventionalRegistrar>>,
}

impl ModuleManager {
    #[must_use]
    pub fn new() -> Self {
        Self { registrar: None }
    }

    /// With a conventional component registrar, invoked after each module's
    /// `configure` hook unless the module opts out.
    #[must_use]
    pub fn with_registrar(registrar: Arc<dyn ConventionalRegistrar>) -> Self {
        Self {
            registrar: Some(registrar),
        }
    }

    /// Run the configuration group: `pre_configure`, `configure`,
    /// `post_configure`, each as a full pass over `modules`.
    ///
    /// # Errors
    /// The first hook (or registrar) failure aborts the remainder of that
    /// pass and all later passes.
    pub fn configure_modules(
        &self,
        modules: &[ModuleDescriptor],
        services: &Arc<ServiceHub>,
        config_provider: &Arc<dyn ConfigProvider>,
        properties: &Arc<PropertyBag>,
    ) -> Result<(), LifecycleError> {
        let ctx_for = |name: &'static str| {
            ConfigureCtx::new(
                name,
                Arc::clone(services),
                Arc::clone(config_provider),
                Arc::clone(properties),
            )
        };

        self.configure_pass(modules, Phase::PreConfigure, &ctx_for, Module::pre_configure)?;
        self.configure_pass(modules, Phase::Configure, &ctx_for, Module::configure)?;
        self.configure_pass(modules, Phase::PostConfigure, &ctx_for, Module::post_configure)?;
        Ok(())
    }

    fn configure_pass(
        &self,
        modules: &[ModuleDescriptor],
        phase: Phase,
        ctx_for: &dyn Fn(&'static str) -> ConfigureCtx,
        hook: fn(&dyn Module, &ConfigureCtx) -> anyhow::Result<()>,
    ) -> Result<(), LifecycleError> {
        tracing::info!("Phase: {phase}");
        for descriptor in modules {
            tracing::debug!(module = descriptor.name(), phase = %phase, "Running lifecycle hook");
            let ctx = ctx_for(descriptor.name());
            hook(descriptor.instance().as_ref(), &ctx).map_err(|source| LifecycleError {
                module: descriptor.name(),
                phase,
                source,
            })?;

            if phase == Phase::Configure {
                self.register_components(descriptor, &ctx)?;
            }
        }
        Ok(())
    }

    fn register_components(
        &self,
        descriptor: &ModuleDescriptor,
        ctx: &ConfigureCtx,
    ) -> Result<(), LifecycleError> {
        let Some(registrar) = &self.registrar else {
            return Ok(());
        };
        if !descriptor.instance().auto_register_components() {
            tracing::debug!(
                module = descriptor.name(),
                "Module opted out of conventional registration"
            );
            return Ok(());
        }

        tracing::debug!(module = descriptor.name(), "Running conventional registration");
        registrar
            .register_components(descriptor, ctx.services())
            .map_err(|source| LifecycleError {
                module: descriptor.name(),
                phase: Phase::Configure,
                source,
            })
    }

    /// Run the initialization group: `pre_init`, `init`, `post_init`, each as
    /// a full pass over `modules`.
    ///
    /// # Errors
    /// The first hook failure aborts the remainder of that pass and all later
    /// passes.
    pub fn init_modules(
        &self,
        modules: &[ModuleDescriptor],
        scope: &ServiceScope,
        properties: &Arc<PropertyBag>,
        params: &Arc<InitParams>,
    ) -> Result<(), LifecycleError> {
        let ctx_for = |name: &'static str| {
            InitCtx::new(
                name,
                scope.clone(),
                Arc::clone(properties),
                Arc::clone(params),
            )
        };

        Self::init_pass(modules, Phase::PreInit, &ctx_for, Module::pre_init)?;
        Self::init_pass(modules, Phase::Init, &ctx_for, Module::init)?;
        Self::init_pass(modules, Phase::PostInit, &ctx_for, Module::post_init)?;
        Ok(())
    }

    fn init_pass(
        modules: &[ModuleDescriptor],
        phase: Phase,
        ctx_for: &dyn Fn(&'static str) -> InitCtx,
        hook: fn(&dyn Module, &InitCtx) -> anyhow::Result<()>,
    ) -> Result<(), LifecycleError> {
        tracing::info!("Phase: {phase}");
        for descriptor in modules {
            tracing::debug!(module = descriptor.name(), phase = %phase, "Running lifecycle hook");
            let ctx = ctx_for(descriptor.name());
            hook(descriptor.instance().as_ref(), &ctx).map_err(|source| LifecycleError {
                module: descriptor.name(),
                phase,
                source,
            })?;
        }
        Ok(())
    }

    /// Tear modules down in **reverse** finalized order, so a module may
    /// still call services of the modules it depends on while shutting down.
    ///
    /// Teardown is best-effort: a failing `shutdown` hook is logged and the
    /// remaining modules still run.
    pub fn shutdown_modules(
        &self,
        modules: &[ModuleDescriptor],
        scope: &ServiceScope,
        properties: &Arc<PropertyBag>,
    ) {
        tracing::info!("Phase: shutdown");
        for descriptor in modules.iter().rev() {
            tracing::debug!(module = descriptor.name(), "Shutting down module");
            let ctx = ShutdownCtx::new(descriptor.name(), scope.clone(), Arc::clone(properties));
            if let Err(err) = descriptor.instance().shutdown(&ctx) {
                tracing::warn!(
                    module = descriptor.name(),
                    error = %err,
                    "Module shutdown failed; continuing teardown"
                );
            }
        }
    }
}

impl Default for ModuleManager {
    fn default() -> Self {
        Self::new()
    }
}
