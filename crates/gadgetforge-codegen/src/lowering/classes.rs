//! Class descriptor table
//!
//! Serializable JDK classes that can appear in a lowered chain, with the
//! serialVersionUID and field layout the target JVM expects. Anything not
//! listed is treated as non-serializable, which is what every class used
//! only as a literal (`Runtime`, `Thread`, class loaders) is.

use std::collections::HashMap;
use std::sync::Arc;

use crate::ir::{Primitive, TypeRef};
use crate::stream::{ClassDesc, FieldDesc, array_suid};

/// Known class descriptors
#[derive(Debug, Clone, Default)]
pub struct ClassTable {
    known: HashMap<String, Arc<ClassDesc>>,
}

impl ClassTable {
    /// Table with the JDK classes used by built-in chains
    pub fn jdk() -> Self {
        let int = || TypeRef::Primitive(Primitive::Int);
        let mut table = Self::default();

        let number = table.register(ClassDesc::serializable(
            "java.lang.Number",
            -8742448824652078965,
            vec![],
        ));
        table.register(
            ClassDesc::serializable(
                "java.lang.Integer",
                1360826667806852920,
                vec![FieldDesc::new("value", int())],
            )
            .with_super(Arc::clone(&number)),
        );
        table.register(
            ClassDesc::serializable(
                "java.lang.Long",
                4290774380558885855,
                vec![FieldDesc::new("value", TypeRef::Primitive(Primitive::Long))],
            )
            .with_super(number),
        );
        table.register(ClassDesc::serializable(
            "java.lang.String",
            -6849794470754667710,
            vec![],
        ));
        table.register(ClassDesc::serializable(
            "java.lang.Class",
            3206093459760846163,
            vec![],
        ));
        table.register(
            ClassDesc::serializable(
                "java.net.URL",
                -7627629688361524110,
                vec![
                    FieldDesc::new("hashCode", int()),
                    FieldDesc::new("port", int()),
                    FieldDesc::new("authority", TypeRef::string()),
                    FieldDesc::new("file", TypeRef::string()),
                    FieldDesc::new("host", TypeRef::string()),
                    FieldDesc::new("protocol", TypeRef::string()),
                    FieldDesc::new("ref", TypeRef::string()),
                ],
            )
            .with_write_method(),
        );
        table.register(
            ClassDesc::serializable(
                "java.net.InetAddress",
                3286316764910316507,
                vec![
                    FieldDesc::new("address", int()),
                    FieldDesc::new("family", int()),
                    FieldDesc::new("hostName", TypeRef::string()),
                ],
            )
            .with_write_method(),
        );
        table
    }

    /// Add or replace a descriptor
    pub fn register(&mut self, desc: ClassDesc) -> Arc<ClassDesc> {
        let desc = Arc::new(desc);
        self.known.insert(desc.name.clone(), Arc::clone(&desc));
        desc
    }

    /// Registered descriptor by binary name
    pub fn get(&self, name: &str) -> Option<Arc<ClassDesc>> {
        self.known.get(name).cloned()
    }

    /// Descriptor for any type. Arrays get their computed default
    /// serialVersionUID; unknown classes are opaque.
    pub fn desc_for(&self, ty: &TypeRef) -> Arc<ClassDesc> {
        let name = ty.java_name();
        if let Some(desc) = self.get(&name) {
            return desc;
        }
        match ty {
            TypeRef::Array(_) => Arc::new(ClassDesc::serializable(
                name.clone(),
                array_suid(&name),
                vec![],
            )),
            _ => Arc::new(ClassDesc::opaque(name)),
        }
    }
}
