//! Runtime error types

use thiserror::Error;

/// Result type for runtime operations
pub type Result<T> = anyhow::Result<T>;

/// Runtime error (re-export anyhow for application-level errors)
pub type Error = anyhow::Error;

/// Why a single generation job failed.
///
/// Job failures are recorded in the run report; they never abort the run.
#[derive(Error, Debug)]
pub enum TaskError {
    /// The payload library could not build the gadget
    #[error(transparent)]
    Construction(#[from] crate::library::GadgetConstructionError),

    /// The command did not compile to a valid chain
    #[error("compile failed: {0}")]
    Compile(#[from] gadgetforge_codegen::Error),

    /// The object graph could not be encoded
    #[error("serialize failed: {0}")]
    Serialize(String),

    /// The artifact could not be written
    #[error("write failed: {0}")]
    Write(#[source] std::io::Error),

    /// The job exceeded its time budget
    #[error("timed out after {0:?}")]
    TimedOut(std::time::Duration),

    /// The job panicked
    #[error("panicked: {0}")]
    Panicked(String),
}
