//! # asperity-plugin
//!
//! The external-atom evaluation protocol: how the solver talks to
//! plugin-computed predicates.
//!
//! Evaluation is a pull-based event stream per external atom: one `Atom`
//! event, one `Input` event per concrete input tuple, one `Output` event
//! per returned tuple. Two standard consumers integrate outputs into an
//! interpretation or verify them against a prior guess. Results are
//! cached per (atom, projected input); cache hits replay the identical
//! event sequence.

pub mod atom;
pub mod eval;
pub mod events;

pub use atom::{PluginAtom, PluginRegistry, Query, SupportSet, Tuple};
pub use eval::{evaluate_external, EvalCache, EvalConfig};
pub use events::{EvalEvent, EvalSink, GuessVerifier, OutputIntegrator};
