//! # asperity-ufs
//!
//! Unfounded-set verification and learning for HEX compatible sets.
//!
//! The main search proposes a compatible set; this crate decides whether
//! it is actually founded and, if not, produces a conflict nogood that
//! prunes the search. It provides:
//!
//! - the shared [`UnfoundedSetChecker`] contract with external-atom
//!   verification and two nogood constructions
//! - the rebuild-every-call encoding-based checker
//! - the build-once assumption-based checker, reused via solver
//!   assumptions
//! - the per-component [`UnfoundedSetCheckerManager`] with
//!   short-circuiting

mod assumption;
mod checker;
mod config;
mod context;
mod encoding;
mod manager;
mod nogoods;
mod status;
mod verify;

pub use assumption::AssumptionBasedUnfoundedSetChecker;
pub use checker::{CheckScope, CheckerStats, UnfoundedSetChecker};
pub use config::{NogoodStrategy, UfsConfig, UfsStrategy};
pub use context::UfsContext;
pub use encoding::EncodingBasedUnfoundedSetChecker;
pub use manager::{UfsStats, UnfoundedSetCheckerManager};
pub use status::VerificationStatus;
