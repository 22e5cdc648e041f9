//! Shared collaborator handles threaded through every checker.

use std::sync::Arc;

use asperity_base::SharedNogoods;
use asperity_ground::SharedRegistry;
use asperity_plugin::PluginRegistry;

use crate::config::UfsConfig;

/// Everything a checker needs from the outside: the atom registry, the
/// plugin table, the shared learning container, and the configuration.
///
/// All handles are reference-counted, so contexts are cheap to clone and
/// several checkers (or several solver instances) can coexist without any
/// process-wide state.
#[derive(Clone)]
pub struct UfsContext {
    /// Atom registry, read-locked during checks.
    pub registry: SharedRegistry,
    /// Plugin atoms by name.
    pub plugins: Arc<PluginRegistry>,
    /// Learned-nogood exchange with the main search.
    pub nogoods: SharedNogoods,
    /// Subsystem configuration.
    pub config: UfsConfig,
}

impl UfsContext {
    /// Bundles the collaborators into a context.
    #[must_use]
    pub fn new(
        registry: SharedRegistry,
        plugins: Arc<PluginRegistry>,
        nogoods: SharedNogoods,
        config: UfsConfig,
    ) -> Self {
        Self {
            registry,
            plugins,
            nogoods,
            config,
        }
    }
}
