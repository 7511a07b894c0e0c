//! Module discovery: walking the declared dependency graph from a root.

use crate::contracts::ModuleKey;
use crate::kernel::KernelModule;

/// Every module type reachable from `root` through declared dependencies,
/// root first, each type exactly once.
///
/// Recursive depth-first walk; the "already collected" check keeps diamond
/// dependencies from appearing twice. It deliberately does not detect cycles:
/// the check would silently stop recursing into an already-present cycle
/// member, so cycle detection is left to the sort, which errors loudly.
#[must_use]
pub fn find_all_module_types(root: ModuleKey) -> Vec<ModuleKey> {
    let mut found = Vec::new();
    collect(root, &mut found);
    found
}

fn collect(key: ModuleKey, found: &mut Vec<ModuleKey>) {
    if found.contains(&key) {
        return;
    }
    found.push(key);
    for dep in find_depended_module_types(key) {
        collect(dep, found);
    }
}

/// The effective dependency list of one module type: declared order
/// preserved, duplicates collapsed to first occurrence, self-references
/// dropped. A module that ends up with no dependencies and is not the kernel
/// module gets an implicit dependency on the kernel module.
#[must_use]
pub fn find_depended_module_types(key: ModuleKey) -> Vec<ModuleKey> {
    let mut deps: Vec<ModuleKey> = Vec::new();
    for dep in key.declared_dependencies() {
        if dep != key && !deps.contains(&dep) {
            deps.push(dep);
        }
    }

    let kernel = ModuleKey::of::<KernelModule>();
    if deps.is_empty() && key != kernel {
        deps.push(kernel);
    }
    deps
}
