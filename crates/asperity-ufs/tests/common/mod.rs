//! Shared fixtures for the unfounded-set integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use asperity_base::{shared_container, Result};
use asperity_ground::{shared_registry, AtomInfo, Registry};
use asperity_plugin::{PluginAtom, PluginRegistry, Query, SupportSet, Tuple};
use asperity_ufs::{UfsConfig, UfsContext};

/// Bundles registry, plugins, and a fresh nogood container into a
/// context, installing a test tracing subscriber on the way.
pub fn context_with(registry: Registry, plugins: PluginRegistry, config: UfsConfig) -> UfsContext {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    UfsContext::new(
        shared_registry(registry),
        Arc::new(plugins),
        shared_container(),
        config,
    )
}

/// A deterministic external source registered as `id`: outputs the
/// argument tuple of every true atom in its projected input. Counts its
/// evaluations so tests can observe caching and support-set shortcuts.
pub struct EchoPlugin {
    pub calls: AtomicU64,
    support: Option<Vec<SupportSet>>,
}

impl EchoPlugin {
    pub fn new() -> Self {
        Self {
            calls: AtomicU64::new(0),
            support: None,
        }
    }

    /// Declares a complete support-set family instead of relying on
    /// evaluation.
    pub fn with_support(support: Vec<SupportSet>) -> Self {
        Self {
            calls: AtomicU64::new(0),
            support: Some(support),
        }
    }
}

impl PluginAtom for EchoPlugin {
    fn name(&self) -> &str {
        "id"
    }

    fn monotonic(&self) -> bool {
        true
    }

    fn support_sets(&self) -> Option<&[SupportSet]> {
        self.support.as_deref()
    }

    fn retrieve(&self, query: &Query<'_>) -> Result<Vec<Tuple>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut out = Vec::new();
        for atom in query.projected.iter() {
            if let AtomInfo::Ordinary { args, .. } = query.registry.info(atom) {
                out.push(args.clone());
            }
        }
        Ok(out)
    }
}
