//! Module loading: discovery, instantiation, wiring, sorting, pinning.

use std::collections::HashMap;
use std::sync::Arc;

use crate::contracts::ModuleKey;
use crate::descriptor::ModuleDescriptor;
use crate::discovery;
use crate::error::{ConfigurationError, GraphError, LoadError};
use crate::graph;
use crate::kernel::KernelModule;
use crate::plugins::PluginSource;
use crate::service_hub::ServiceHub;

/// Discover, instantiate, wire and order every module of an application.
///
/// 1. Walk the declared dependency graph from `startup`.
/// 2. Append plugin-sourced types not already discovered.
/// 3. Instantiate each type once and register the singleton in `services`
///    keyed by its concrete type.
/// 4. Wire each descriptor's dependency list against the loaded set.
/// 5. Sort dependencies-first, then pin the kernel module to index 0 and the
///    startup module to the last index.
///
/// Diamond dependencies mean topological order alone does not guarantee the
/// kernel/startup positions; the pinning step makes that contract explicit
/// and independent of sort internals.
///
/// # Errors
/// Fails fast, before any lifecycle hook runs: a duplicate module name is a
/// [`ConfigurationError`]; an undiscovered dependency or a dependency cycle
/// is a [`GraphError`].
pub fn load_modules(
    services: &ServiceHub,
    startup: ModuleKey,
    plugin_sources: &[Arc<dyn PluginSource>],
) -> Result<Vec<ModuleDescriptor>, LoadError> {
    let static_keys = discovery::find_all_module_types(startup);
    let static_count = static_keys.len();

    let mut keys = static_keys;
    for source in plugin_sources {
        for key in source.modules() {
            if keys.contains(&key) {
                tracing::debug!(module = key.name(), "Plugin module already discovered");
            } else {
                tracing::debug!(module = key.name(), "Adding plugin module");
                keys.push(key);
            }
        }
    }

    validate_unique_names(&keys)?;

    // One instance per type, registered as a singleton keyed by the type.
    let mut descriptors: Vec<ModuleDescriptor> = keys
        .iter()
        .enumerate()
        .map(|(i, key)| {
            let instance = key.instantiate(services);
            ModuleDescriptor::new(*key, instance, i >= static_count)
        })
        .collect();

    // Dense id table: module key -> index into the descriptor set.
    let index: HashMap<ModuleKey, usize> =
        keys.iter().enumerate().map(|(i, k)| (*k, i)).collect();

    // Wiring. A miss here means a plugin-sourced module declared a dependency
    // nothing discovered; static discovery cannot produce one.
    for descriptor in &mut descriptors {
        let deps = discovery::find_depended_module_types(descriptor.key());
        for dep in &deps {
            if !index.contains_key(dep) {
                return Err(GraphError::MissingDependency {
                    dependent: descriptor.name(),
                    missing: dep.name(),
                }
                .into());
            }
        }
        descriptor.set_dependencies(deps);
    }

    let sorted_keys = graph::sort(&keys, |key| {
        descriptors[index[key]].dependencies().to_vec()
    })
    .map_err(|cycle| GraphError::Cycle {
        module: cycle.0.name(),
    })?;

    // Reorder descriptors to match the sorted keys.
    let mut slots: Vec<Option<ModuleDescriptor>> = descriptors.into_iter().map(Some).collect();
    let mut ordered: Vec<ModuleDescriptor> = sorted_keys
        .iter()
        .filter_map(|key| slots[index[key]].take())
        .collect();
    debug_assert_eq!(ordered.len(), keys.len());

    pin_ends(&mut ordered, ModuleKey::of::<KernelModule>(), startup);

    tracing::info!(
        modules = ordered.len(),
        plugins = ordered.iter().filter(|d| d.is_plugin()).count(),
        "Loaded modules"
    );
    for descriptor in &ordered {
        tracing::debug!(
            module = descriptor.name(),
            is_plugin = descriptor.is_plugin(),
            "Module load order"
        );
    }

    Ok(ordered)
}

fn validate_unique_names(keys: &[ModuleKey]) -> Result<(), ConfigurationError> {
    let mut seen: HashMap<&'static str, ModuleKey> = HashMap::with_capacity(keys.len());
    for key in keys {
        if let Some(existing) = seen.insert(key.name(), *key) {
            if existing != *key {
                return Err(ConfigurationError::DuplicateModuleName { name: key.name() });
            }
        }
    }
    Ok(())
}

/// Kernel first, startup last; no-op for positions already satisfied or when
/// the startup module *is* the kernel.
fn pin_ends(ordered: &mut Vec<ModuleDescriptor>, kernel: ModuleKey, startup: ModuleKey) {
    if let Some(pos) = ordered.iter().position(|d| d.key() == kernel) {
        let descriptor = ordered.remove(pos);
        ordered.insert(0, descriptor);
    }
    if startup != kernel {
        if let Some(pos) = ordered.iter().position(|d| d.key() == startup) {
            let descriptor = ordered.remove(pos);
            ordered.push(descriptor);
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::load_modules;
    use crate::contracts::{Module, ModuleDef, ModuleKey};
    use crate::error::{ConfigurationError, GraphError, LoadError};
    use crate::kernel::KernelModule;
    use crate::plugins::{PluginSource, StaticPluginSource};
    use crate::service_hub::ServiceHub;
    use std::sync::Arc;

    #[derive(Default)]
    struct Core;
    impl Module for Core {}
    impl ModuleDef for Core {
        const NAME: &'static str = "core";
    }

    #[derive(Default)]
    struct Storage;
    impl Module for Storage {}
    impl ModuleDef for Storage {
        const NAME: &'static str = "storage";
        fn depends_on() -> Vec<ModuleKey> {
            vec![ModuleKey::of::<Core>()]
        }
    }

    #[derive(Default)]
    struct Api;
    impl Module for Api {}
    impl ModuleDef for Api {
        const NAME: &'static str = "api";
        fn depends_on() -> Vec<ModuleKey> {
            vec![ModuleKey::of::<Core>()]
        }
    }

    #[derive(Default)]
    struct App;
    impl Module for App {}
    impl ModuleDef for App {
        const NAME: &'static str = "app";
        fn depends_on() -> Vec<ModuleKey> {
            vec![ModuleKey::of::<Storage>(), ModuleKey::of::<Api>()]
        }
    }

    #[derive(Default)]
    struct Orphan;
    impl Module for Orphan {}
    impl ModuleDef for Orphan {
        const NAME: &'static str = "orphan_plugin";
        fn depends_on() -> Vec<ModuleKey> {
            vec![ModuleKey::of::<Unreferenced>()]
        }
    }

    #[derive(Default)]
    struct Unreferenced;
    impl Module for Unreferenced {}
    impl ModuleDef for Unreferenced {
        const NAME: &'static str = "unreferenced";
    }

    #[derive(Default)]
    struct CoreImpostor;
    impl Module for CoreImpostor {}
    impl ModuleDef for CoreImpostor {
        const NAME: &'static str = "core";
    }

    #[derive(Default)]
    struct CycleA;
    impl Module for CycleA {}
    impl ModuleDef for CycleA {
        const NAME: &'static str = "cycle_a";
        fn depends_on() -> Vec<ModuleKey> {
            vec![ModuleKey::of::<CycleB>()]
        }
    }

    #[derive(Default)]
    struct CycleB;
    impl Module for CycleB {}
    impl ModuleDef for CycleB {
        const NAME: &'static str = "cycle_b";
        fn depends_on() -> Vec<ModuleKey> {
            vec![ModuleKey::of::<CycleA>()]
        }
    }

    fn names(descriptors: &[crate::descriptor::ModuleDescriptor]) -> Vec<&'static str> {
        descriptors.iter().map(|d| d.name()).collect()
    }

    fn no_plugins() -> Vec<Arc<dyn PluginSource>> {
        Vec::new()
    }

    #[test]
    fn kernel_pinned_first_startup_pinned_last() {
        let hub = ServiceHub::new();
        let loaded = load_modules(&hub, ModuleKey::of::<App>(), &no_plugins()).unwrap();

        let order = names(&loaded);
        assert_eq!(order.first(), Some(&"kernel"));
        assert_eq!(order.last(), Some(&"app"));
        assert_eq!(order.len(), 5);

        // Dependencies still come before dependents in between.
        let pos = |name: &str| order.iter().position(|n| *n == name).unwrap();
        assert!(pos("core") < pos("storage"));
        assert!(pos("core") < pos("api"));
    }

    #[test]
    fn startup_equal_to_kernel_loads_alone() {
        let hub = ServiceHub::new();
        let loaded = load_modules(&hub, ModuleKey::of::<KernelModule>(), &no_plugins()).unwrap();
        assert_eq!(names(&loaded), vec!["kernel"]);
    }

    #[test]
    fn instances_are_registered_as_singletons() {
        let hub = ServiceHub::new();
        let loaded = load_modules(&hub, ModuleKey::of::<App>(), &no_plugins()).unwrap();

        let registered = hub.get::<App>().unwrap();
        let descriptor = loaded.iter().find(|d| d.name() == "app").unwrap();
        assert!(std::ptr::addr_eq(
            Arc::as_ptr(&registered),
            Arc::as_ptr(descriptor.instance())
        ));
    }

    #[test]
    fn plugin_module_joins_the_set_with_flag() {
        let hub = ServiceHub::new();
        let plugins: Vec<Arc<dyn PluginSource>> = vec![Arc::new(StaticPluginSource::new(vec![
            ModuleKey::of::<Unreferenced>(),
        ]))];
        let loaded = load_modules(&hub, ModuleKey::of::<App>(), &plugins).unwrap();

        let plugin = loaded.iter().find(|d| d.name() == "unreferenced").unwrap();
        assert!(plugin.is_plugin());
        assert!(loaded.iter().filter(|d| d.name() == "unreferenced").count() == 1);
        // Startup stays pinned last even with plugins appended.
        assert_eq!(loaded.last().unwrap().name(), "app");
    }

    #[test]
    fn plugin_duplicate_of_static_module_is_ignored() {
        let hub = ServiceHub::new();
        let plugins: Vec<Arc<dyn PluginSource>> = vec![Arc::new(StaticPluginSource::new(vec![
            ModuleKey::of::<Core>(),
        ]))];
        let loaded = load_modules(&hub, ModuleKey::of::<App>(), &plugins).unwrap();

        let core_entries: Vec<_> = loaded.iter().filter(|d| d.name() == "core").collect();
        assert_eq!(core_entries.len(), 1);
        assert!(!core_entries[0].is_plugin());
    }

    #[test]
    fn plugin_with_undiscovered_dependency_is_a_wiring_error() {
        let hub = ServiceHub::new();
        let plugins: Vec<Arc<dyn PluginSource>> = vec![Arc::new(StaticPluginSource::new(vec![
            ModuleKey::of::<Orphan>(),
        ]))];
        let err = load_modules(&hub, ModuleKey::of::<App>(), &plugins).unwrap_err();

        match err {
            LoadError::Graph(GraphError::MissingDependency { dependent, missing }) => {
                assert_eq!(dependent, "orphan_plugin");
                assert_eq!(missing, "unreferenced");
            }
            other => panic!("expected missing dependency, got {other}"),
        }
    }

    #[test]
    fn duplicate_module_name_is_a_configuration_error() {
        let hub = ServiceHub::new();
        let plugins: Vec<Arc<dyn PluginSource>> = vec![Arc::new(StaticPluginSource::new(vec![
            ModuleKey::of::<CoreImpostor>(),
        ]))];
        let err = load_modules(&hub, ModuleKey::of::<App>(), &plugins).unwrap_err();

        assert!(matches!(
            err,
            LoadError::Configuration(ConfigurationError::DuplicateModuleName { name: "core" })
        ));
    }

    #[test]
    fn dependency_cycle_is_reported_with_a_participant() {
        let hub = ServiceHub::new();
        let err = load_modules(&hub, ModuleKey::of::<CycleA>(), &no_plugins()).unwrap_err();

        match err {
            LoadError::Graph(GraphError::Cycle { module }) => {
                assert!(module == "cycle_a" || module == "cycle_b");
            }
            other => panic!("expected cycle, got {other}"),
        }
    }
}
