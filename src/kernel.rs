//! The kernel module: implicit root of every module graph.

use crate::contracts::{Module, ModuleDef};

/// Every module that declares no dependencies receives an implicit dependency
/// on this module, which anchors the graph and is always loaded first. It has
/// no behavior of its own; applications depend on it transitively, never
/// directly.
#[derive(Debug, Default)]
pub struct KernelModule;

impl Module for KernelModule {}

impl ModuleDef for KernelModule {
    const NAME: &'static str = "kernel";
}
