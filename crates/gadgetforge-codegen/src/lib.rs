//! Gadgetforge Code Generation
//!
//! This crate handles the command → chain → object stream pipeline.
//!
//! # Pipeline Overview
//!
//! ```text
//! ┌─────────┐     ┌─────────┐     ┌─────────┐     ┌─────────┐
//! │ Command │────▶│  Chain  │────▶│  Graph  │────▶│ Stream  │
//! │ (Parse) │     │  (IR)   │     │ (Lower) │     │ (Write) │
//! └─────────┘     └─────────┘     └─────────┘     └─────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use gadgetforge_codegen::{ClassTable, CommandCompiler, TransformerSchema, lower_chain, serialize};
//!
//! let chain = CommandCompiler::default().compile("raw_cmd:id")?;
//! let graph = lower_chain(&chain, &TransformerSchema::default(), &ClassTable::jdk())?;
//! let bytes = serialize(&graph)?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bcel;
pub mod classpath;
pub mod compiler;
pub mod error;
pub mod ir;
pub mod lowering;
pub mod parser;
pub mod stream;
pub mod vm;

pub use classpath::ClassPath;
pub use compiler::CommandCompiler;
pub use error::{Error, Result};
pub use ir::{Operation, OperationChain, TypeRef, Value};
pub use lowering::{ClassTable, TransformerSchema, lower_chain};
pub use parser::CommandSpec;
pub use stream::{JavaValue, serialize};
pub use vm::{Trace, Vm};
