//! # asperity-base
//!
//! Core types and utilities for the Asperity HEX solver.
//!
//! This crate provides the foundational building blocks used across all other
//! Asperity crates, including:
//!
//! - **Addresses**: dense ground-atom addresses and signed literals
//! - **Interpretations**: bitset-backed truth assignments
//! - **Nogoods**: sets of signed literals that must never be jointly satisfied
//! - **Error Types**: unified error handling across the solver
//! - **Traits**: common interfaces for solver components

pub mod error;
pub mod nogood;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use nogood::{shared_container, Nogood, NogoodContainer, SharedNogoods};
pub use types::{AtomId, Interpretation, Literal};
