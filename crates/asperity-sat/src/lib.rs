//! # asperity-sat
//!
//! The embedded satisfiability engine behind the unfounded-set checkers.
//!
//! Works directly on nogoods (sets of signed literals that must never be
//! jointly satisfied) instead of clauses. Implements:
//!
//! - incremental nogood addition, permanent and session-scoped
//! - unit propagation over nogoods
//! - DPLL search with chronological backtracking
//! - solve-under-assumptions with restart instead of re-parse
//! - on-demand model enumeration with a projection scope

pub mod propagate;
pub mod solver;
pub mod store;

pub use solver::{Model, NogoodSolver, SolverConfig, SolverStats};
pub use store::NogoodStore;
