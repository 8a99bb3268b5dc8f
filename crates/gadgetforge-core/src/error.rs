//! Error types for gadgetforge-core

use thiserror::Error;

/// Result type alias for gadgetforge-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in gadgetforge-core
#[derive(Error, Debug)]
pub enum Error {
    /// Classification config exists but could not be read
    #[error("cannot read gadget config {path}: {source}")]
    ConfigUnreadable {
        /// Path that was read
        path: String,
        /// Underlying IO failure
        #[source]
        source: std::io::Error,
    },

    /// Verb outside the supported set
    #[error("unknown command verb '{0}'")]
    UnknownVerb(String),

    /// Gadget name outside the catalog
    #[error("unknown gadget '{0}'")]
    UnknownGadget(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
