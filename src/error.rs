//! Error surface of the composition pipeline.
//!
//! Three families, mirroring where in the pipeline a failure can occur, plus
//! an umbrella for the composition root:
//!
//! - [`ConfigurationError`]: the module set itself is malformed. Raised
//!   during discovery/validation, before any lifecycle code runs.
//! - [`GraphError`]: the dependency relation is unsatisfiable (dangling
//!   reference or cycle). Also raised before any lifecycle code runs, so
//!   application code never observes a partially wired graph.
//! - [`LifecycleError`]: a module's own hook failed. Propagates immediately;
//!   the remaining steps of that pass and all later passes are skipped.
//!
//! There is no retry policy and no partial-failure channel: a human fixes the
//! module graph or the hook and restarts the process.

use std::fmt;

/// Malformed module set found during discovery/validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("module name '{name}' is declared by more than one module type")]
    DuplicateModuleName { name: &'static str },
}

/// Unsatisfiable dependency relation.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("module '{dependent}' depends on '{missing}', which was not discovered")]
    MissingDependency {
        dependent: &'static str,
        missing: &'static str,
    },

    #[error("dependency cycle detected involving module '{module}'")]
    Cycle { module: &'static str },
}

/// Loader failure: either the module set or its graph is bad.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// One sub-phase of the lifecycle, for logs and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    PreConfigure,
    Configure,
    PostConfigure,
    PreInit,
    Init,
    PostInit,
    Shutdown,
}

impl Phase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::PreConfigure => "pre_configure",
            Phase::Configure => "configure",
            Phase::PostConfigure => "post_configure",
            Phase::PreInit => "pre_init",
            Phase::Init => "init",
            Phase::PostInit => "post_init",
            Phase::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A module hook failed.
#[derive(Debug, thiserror::Error)]
#[error("module '{module}' failed in {phase}")]
pub struct LifecycleError {
    pub module: &'static str,
    pub phase: Phase,
    #[source]
    pub source: anyhow::Error,
}

/// Everything the composition root can fail with.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("failed to merge configuration sources")]
    ConfigMerge {
        #[source]
        source: figment::Error,
    },

    #[error("container factory failed to build the service resolver")]
    ResolverBuild {
        #[source]
        source: anyhow::Error,
    },
}

impl From<LoadError> for BootstrapError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Configuration(e) => BootstrapError::Configuration(e),
            LoadError::Graph(e) => BootstrapError::Graph(e),
        }
    }
}
