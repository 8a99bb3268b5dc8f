//! Gadget descriptors
//!
//! A descriptor is the immutable, startup-time view of one gadget: its name
//! and how the orchestrator has to drive it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a gadget is constructed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Self-contained payload (embedded bytecode), generated once with a
    /// placeholder argument
    Template,
    /// Accepts the standard `verb:argument` command convention
    Transform,
    /// Needs a bespoke single-shot construction call
    RefFun,
}

impl Category {
    /// Prefix used in artifact file names
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Template => "template",
            Category::Transform => "transform",
            Category::RefFun => "ref-fun",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One gadget and its construction category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GadgetDescriptor {
    /// Gadget name (identity)
    pub name: String,

    /// Construction category
    pub category: Category,

    /// Tag for ref-fun gadgets (`jndi`, `dnslog`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_fun_kind: Option<String>,
}

impl GadgetDescriptor {
    /// Create a template or transform descriptor
    pub fn new(name: impl Into<String>, category: Category) -> Self {
        Self {
            name: name.into(),
            category,
            ref_fun_kind: None,
        }
    }

    /// Create a ref-fun descriptor with its tag
    pub fn ref_fun(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: Category::RefFun,
            ref_fun_kind: Some(kind.into()),
        }
    }
}
