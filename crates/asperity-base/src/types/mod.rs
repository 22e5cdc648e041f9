//! Address and assignment types for ground atoms.
//!
//! Ground atoms are identified by dense integer addresses handed out by the
//! registry. Everything downstream (interpretations, nogoods, the embedded
//! solver's variable space) is keyed by these addresses.

mod interpretation;
mod literal;

pub use interpretation::Interpretation;
pub use literal::Literal;

/// Dense address of a variable-free atom, allocated by the registry.
pub type AtomId = u32;
