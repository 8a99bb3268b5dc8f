//! gadgetforge Core Library
//!
//! This crate holds the startup-time model shared by the compiler and the
//! orchestrator:
//! - The closed set of command verbs
//! - Gadget descriptors and categories
//! - Config-driven gadget classification
//! - The gadget catalog and its exclusion rules
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Config    │────▶│  Registry   │────▶│  Partition  │
//! │  (classify) │     │ (catalog)   │     │  (buckets)  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use gadgetforge_core::{Classification, GadgetRegistry};
//!
//! let (classification, _warning) = Classification::load_or_default("config.yaml");
//! let registry = GadgetRegistry::builtin();
//! let partition = registry.partition(&classification);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod gadget;
pub mod registry;
pub mod verb;

pub use config::{Classification, ClassificationSource, ConfigWarning};
pub use error::{Error, Result};
pub use gadget::{Category, GadgetDescriptor};
pub use registry::{ExclusionRule, GadgetRegistry, Partition};
pub use verb::Verb;
