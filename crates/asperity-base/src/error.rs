//! Unified error types for Asperity.

use thiserror::Error;

/// The main error type for Asperity operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Program structure the unfounded-set subsystem cannot handle.
    #[error("Unsupported program structure: {0}")]
    UnsupportedStructure(String),

    /// An external source threw during evaluation.
    #[error("External source evaluation failed for &{plugin}: {message}")]
    ExternalEvaluation { plugin: String, message: String },

    /// An external source returned a tuple that does not match its
    /// declared output pattern.
    #[error("Malformed output tuple from &{plugin}: {detail}")]
    MalformedOutput { plugin: String, detail: String },

    /// No plugin is registered under the requested name.
    #[error("Unknown external source: &{0}")]
    UnknownPlugin(String),

    /// Atom address outside the registry.
    #[error("Unknown atom address: {0}")]
    UnknownAtom(u32),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal solver error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
