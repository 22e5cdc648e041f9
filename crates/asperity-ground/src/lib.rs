//! # asperity-ground
//!
//! Ground-program representation for the Asperity HEX solver:
//!
//! - **Registry**: arena of dense-address atoms (ordinary and
//!   external-auxiliary) with an interned symbol table
//! - **Rules**: ground rules with disjunctive heads, ordinary and
//!   external body literals, and weight bodies
//! - **Programs**: rule lists plus EDB, with a JSON document form
//! - **Annotations**: SCC decomposition, head-cycle and e-cycle flags,
//!   auxiliary-to-external index, input/output masks

pub mod annotated;
pub mod program;
pub mod registry;
pub mod rule;

pub use annotated::{AnnotatedGroundProgram, Component};
pub use program::{ExternalAtom, GroundProgram, InputSpec};
pub use registry::{shared_registry, AtomInfo, ExternalAtomId, Registry, SharedRegistry, Symbol};
pub use rule::{ExtLiteral, GroundRule, RuleId, RuleKind};
