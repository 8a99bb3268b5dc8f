//! Error types for command compilation and serialization

use gadgetforge_core::Verb;
use thiserror::Error;

/// Result type for codegen operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while compiling or serializing
#[derive(Error, Debug)]
pub enum Error {
    /// No verb matches the command
    #[error("Command [{0}] not supported")]
    UnsupportedCommand(String),

    /// Compound argument with the wrong number of `|` segments
    #[error("{verb}: expected {expected} '|'-separated segments, found {found}")]
    MalformedArgument {
        /// Verb being compiled
        verb: Verb,
        /// Required segment count
        expected: usize,
        /// Actual segment count
        found: usize,
    },

    /// Compound argument with an empty segment
    #[error("{verb}: segment {index} is empty")]
    EmptySegment {
        /// Verb being compiled
        verb: Verb,
        /// Zero-based segment index
        index: usize,
    },

    /// Argument present but unusable
    #[error("{verb}: invalid argument: {message}")]
    InvalidArgument {
        /// Verb being compiled
        verb: Verb,
        /// Error description
        message: String,
    },

    /// Base64 payload failed to decode
    #[error("{verb}: invalid base64: {source}")]
    InvalidBase64 {
        /// Verb being compiled
        verb: Verb,
        /// Decoder error
        #[source]
        source: base64::DecodeError,
    },

    /// None of the candidate class names is available
    #[error("none of the candidate classes is available: {}", candidates.join(", "))]
    UnresolvedClass {
        /// Names that were tried, in order
        candidates: Vec<String>,
    },

    /// File referenced by the command could not be read
    #[error("cannot read {path}: {source}")]
    ReadFile {
        /// Path from the command
        path: String,
        /// Underlying IO failure
        #[source]
        source: std::io::Error,
    },

    /// Chain does not have a well-formed shape
    #[error("malformed operation chain: {0}")]
    MalformedChain(String),

    /// Object graph cannot be encoded
    #[error("serialization failed: {0}")]
    Serialize(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
