//! Gadget classification config
//!
//! The config file is line-oriented YAML, but only a tiny subset matters
//! here: a top-level `Gadgets:` section whose two-space-indented keys name
//! gadgets, and two sub-keys per gadget:
//!
//! ```yaml
//! Gadgets:
//!   CommonsBeanutils1:
//!     template: true
//!   URLDNS:
//!     ref-fun: dnslog
//! ```
//!
//! Everything else is ignored. No other YAML semantics are implemented.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::gadget::{Category, GadgetDescriptor};

static GADGET_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^  ([A-Za-z0-9_]+):.*$").expect("valid gadget key regex"));
static TEMPLATE_FLAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s+template:\s*true\s*$").expect("valid template regex"));
static REF_FUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s+ref-fun:\s*(\S+)\s*$").expect("valid ref-fun regex"));

const SECTION_HEADER: &str = "Gadgets:";

/// Gadgets classified as template when no config file is available
pub const DEFAULT_TEMPLATE_GADGETS: [&str; 25] = [
    "Vaadin1",
    "Spring2",
    "Spring1",
    "ROME",
    "MozillaRhino2",
    "MozillaRhino1",
    "JSON1",
    "Jdk8u20",
    "Jdk7u21",
    "JavassistWeld1",
    "JBossInterceptors1",
    "Hibernate1",
    "Click1",
    "CommonsBeanutils1",
    "CommonsBeanutils1_183",
    "CommonsBeanutils2",
    "CommonsBeanutils2_183",
    "CommonsCollections2",
    "CommonsCollections3",
    "CommonsCollections4",
    "CommonsCollections8",
    "CommonsCollections10",
    "CommonsCollections11",
    "CommonsCollectionsK1",
    "CommonsCollectionsK2",
];

/// Ref-fun gadgets and their tags when no config file is available
pub const DEFAULT_REF_FUN_GADGETS: [(&str, &str); 5] = [
    ("CommonsBeanutils3", "jndi"),
    ("FindClassByBomb", "class"),
    ("FindClassByDNS", "class-dnslog"),
    ("FindAllClassesByDNS", "dnslog"),
    ("URLDNS", "dnslog"),
];

/// Where a classification came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    /// Parsed from a config file
    File(PathBuf),
    /// Built-in defaults
    BuiltinDefault,
}

/// Result of classifying gadgets from config
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// Gadgets flagged `template: true`
    pub templates: BTreeSet<String>,

    /// Gadgets with a `ref-fun` tag, by name
    pub ref_funs: BTreeMap<String, String>,

    /// Origin of this classification
    pub source: ClassificationSource,
}

impl Classification {
    /// An empty classification attributed to `source`
    pub fn empty(source: ClassificationSource) -> Self {
        Self {
            templates: BTreeSet::new(),
            ref_funs: BTreeMap::new(),
            source,
        }
    }

    /// The hardcoded classification used when the config file is missing
    pub fn builtin_default() -> Self {
        Self {
            templates: DEFAULT_TEMPLATE_GADGETS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ref_funs: DEFAULT_REF_FUN_GADGETS
                .iter()
                .map(|(name, kind)| (name.to_string(), kind.to_string()))
                .collect(),
            source: ClassificationSource::BuiltinDefault,
        }
    }

    /// Parse classification from config text
    pub fn parse(text: &str, source: ClassificationSource) -> Self {
        let mut classifier = ConfigClassifier::new(source);
        for line in text.lines() {
            classifier.feed_line(line);
        }
        classifier.finish()
    }

    /// Read and parse a config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::ConfigUnreadable {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::parse(
            &text,
            ClassificationSource::File(path.to_path_buf()),
        ))
    }

    /// Read a config file, falling back to the built-in defaults.
    ///
    /// A missing or unreadable file is not fatal; the returned warning
    /// describes why the defaults were used.
    pub fn load_or_default(path: impl AsRef<Path>) -> (Self, Option<ConfigWarning>) {
        let path = path.as_ref();
        match Self::from_file(path) {
            Ok(classification) => (classification, None),
            Err(err) => {
                let warning = ConfigWarning {
                    path: path.to_path_buf(),
                    reason: err.to_string(),
                };
                tracing::warn!(
                    path = %path.display(),
                    "gadget config unavailable, using built-in classification: {}",
                    warning.reason
                );
                (Self::builtin_default(), Some(warning))
            }
        }
    }

    /// Category for a catalog gadget under this classification
    pub fn category_of(&self, name: &str) -> Category {
        if self.ref_funs.contains_key(name) {
            Category::RefFun
        } else if self.templates.contains(name) {
            Category::Template
        } else {
            Category::Transform
        }
    }

    /// Descriptor for a gadget under this classification
    pub fn describe(&self, name: &str) -> GadgetDescriptor {
        match self.ref_funs.get(name) {
            Some(kind) => GadgetDescriptor::ref_fun(name, kind.as_str()),
            None => GadgetDescriptor::new(name, self.category_of(name)),
        }
    }
}

/// Non-fatal config problem that triggered the default classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    /// Config path that was tried
    pub path: PathBuf,
    /// Why it could not be used
    pub reason: String,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.reason)
    }
}

/// Line-by-line state machine over the config text
#[derive(Debug)]
pub struct ConfigClassifier {
    in_gadgets_section: bool,
    current_gadget: Option<String>,
    out: Classification,
}

impl ConfigClassifier {
    /// Start classifying; results are attributed to `source`
    pub fn new(source: ClassificationSource) -> Self {
        Self {
            in_gadgets_section: false,
            current_gadget: None,
            out: Classification::empty(source),
        }
    }

    /// Consume one line
    pub fn feed_line(&mut self, line: &str) {
        if line == SECTION_HEADER {
            self.in_gadgets_section = true;
            return;
        }

        // Any other top-level key closes the section
        if self.in_gadgets_section
            && !line.starts_with(' ')
            && !line.is_empty()
            && !line.starts_with('#')
        {
            self.in_gadgets_section = false;
            self.current_gadget = None;
        }

        if !self.in_gadgets_section {
            return;
        }

        if let Some(caps) = GADGET_KEY.captures(line) {
            self.current_gadget = Some(caps[1].to_string());
            return;
        }

        let Some(current) = &self.current_gadget else {
            return;
        };

        if TEMPLATE_FLAG.is_match(line) {
            self.out.templates.insert(current.clone());
        }

        if let Some(caps) = REF_FUN.captures(line) {
            self.out
                .ref_funs
                .insert(current.clone(), caps[1].to_string());
        }
    }

    /// Finish and return the classification
    pub fn finish(self) -> Classification {
        self.out
    }
}
