//! gadgetforge Runtime
//!
//! This crate runs a generation batch: it plans one job per artifact,
//! hands each to a payload library on a bounded worker pool, serializes
//! the result and writes it to the output directory.
//!
//! # Features
//!
//! - Deterministic job planning from the registry and classification
//! - Bounded concurrency with a per-job timeout
//! - Per-job failure isolation and an end-of-run report
//!
//! # Usage
//!
//! ```rust,ignore
//! use gadgetforge_runtime::{Orchestrator, RunOptions, TransformerChainLibrary};
//!
//! let orchestrator = Orchestrator::new(registry, Arc::new(TransformerChainLibrary::default()), RunOptions::default());
//! let report = orchestrator.run(&classification).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod engine;
pub mod error;
pub mod jobs;
pub mod library;
pub mod output;
pub mod report;

pub use engine::{Orchestrator, RunOptions};
pub use error::{Error, Result, TaskError};
pub use jobs::{GenerationJob, JobKind};
pub use library::{GadgetConstructionError, Payload, PayloadLibrary, TransformerChainLibrary};
pub use output::OutputWriter;
pub use report::{JobOutcome, JobStatus, RunReport};
