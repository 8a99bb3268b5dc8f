//! Object graph model
//!
//! Values here mirror what a Java `ObjectOutputStream` sees: class
//! descriptors with their serialVersionUID and declared fields, objects
//! holding per-field values, arrays, strings, and class literals.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::ir::TypeRef;

/// Class declares `writeObject`
pub const SC_WRITE_METHOD: u8 = 0x01;
/// Class implements `java.io.Serializable`
pub const SC_SERIALIZABLE: u8 = 0x02;

/// A serializable field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDesc {
    /// Field name
    pub name: String,
    /// Declared type
    pub ty: TypeRef,
}

impl FieldDesc {
    /// Create a field descriptor
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    /// Type code written before the field name
    pub fn type_code(&self) -> u8 {
        match &self.ty {
            TypeRef::Primitive(p) => p.descriptor() as u8,
            TypeRef::Class(_) => b'L',
            TypeRef::Array(_) => b'[',
        }
    }
}

/// A class descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDesc {
    /// Binary name (`java.lang.Integer`, `[Ljava.lang.Object;`)
    pub name: String,
    /// serialVersionUID
    pub suid: i64,
    /// `SC_*` flags
    pub flags: u8,
    /// Fields in stream order
    fields: Vec<FieldDesc>,
    /// Nearest serializable superclass
    pub super_desc: Option<Arc<ClassDesc>>,
}

impl ClassDesc {
    /// Descriptor for a serializable class. Fields are put in stream
    /// order: primitives first, then by name.
    pub fn serializable(name: impl Into<String>, suid: i64, fields: Vec<FieldDesc>) -> Self {
        let mut desc = Self {
            name: name.into(),
            suid,
            flags: SC_SERIALIZABLE,
            fields,
            super_desc: None,
        };
        desc.fields
            .sort_by(|a, b| (!a.ty.is_primitive(), &a.name).cmp(&(!b.ty.is_primitive(), &b.name)));
        desc
    }

    /// Descriptor for a class that is not serializable (or a primitive):
    /// only usable as a class literal
    pub fn opaque(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            suid: 0,
            flags: 0,
            fields: Vec::new(),
            super_desc: None,
        }
    }

    /// Mark the class as declaring `writeObject`
    pub fn with_write_method(mut self) -> Self {
        self.flags |= SC_WRITE_METHOD;
        self
    }

    /// Attach the serializable superclass descriptor
    pub fn with_super(mut self, super_desc: Arc<ClassDesc>) -> Self {
        self.super_desc = Some(super_desc);
        self
    }

    /// Fields in stream order
    pub fn fields(&self) -> &[FieldDesc] {
        &self.fields
    }

    /// Whether the class declares `writeObject`
    pub fn has_write_method(&self) -> bool {
        self.flags & SC_WRITE_METHOD != 0
    }

    /// This class and its serializable ancestors, topmost first
    pub fn hierarchy(self: &Arc<Self>) -> Vec<Arc<ClassDesc>> {
        let mut chain = vec![Arc::clone(self)];
        let mut cursor = self.super_desc.clone();
        while let Some(desc) = cursor {
            cursor = desc.super_desc.clone();
            chain.push(desc);
        }
        chain.reverse();
        chain
    }
}

/// A primitive field value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JavaPrimitive {
    /// `boolean`
    Boolean(bool),
    /// `byte`
    Byte(i8),
    /// `char`
    Char(u16),
    /// `short`
    Short(i16),
    /// `int`
    Int(i32),
    /// `long`
    Long(i64),
    /// `float`
    Float(f32),
    /// `double`
    Double(f64),
}

/// Elements of an array
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayElements {
    /// `byte[]`
    Bytes(Vec<u8>),
    /// `int[]`
    Ints(Vec<i32>),
    /// `long[]`
    Longs(Vec<i64>),
    /// Any reference array
    Objects(Vec<JavaValue>),
}

impl ArrayElements {
    /// Number of elements
    pub fn len(&self) -> usize {
        match self {
            ArrayElements::Bytes(v) => v.len(),
            ArrayElements::Ints(v) => v.len(),
            ArrayElements::Longs(v) => v.len(),
            ArrayElements::Objects(v) => v.len(),
        }
    }

    /// Whether the array has no elements
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An array instance
#[derive(Debug, Clone, PartialEq)]
pub struct JavaArray {
    /// Array class descriptor
    pub desc: Arc<ClassDesc>,
    /// Elements
    pub elements: ArrayElements,
}

/// An object instance
#[derive(Debug, Clone, PartialEq)]
pub struct JavaObject {
    /// Runtime class descriptor
    pub desc: Arc<ClassDesc>,
    /// Field values by name; missing fields are written as their default
    pub fields: BTreeMap<String, JavaValue>,
}

impl JavaObject {
    /// An instance with every field at its default
    pub fn new(desc: Arc<ClassDesc>) -> Self {
        Self {
            desc,
            fields: BTreeMap::new(),
        }
    }

    /// Set a field
    pub fn with(mut self, name: impl Into<String>, value: JavaValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }
}

/// A value in the object graph
#[derive(Debug, Clone, PartialEq)]
pub enum JavaValue {
    /// `null`
    Null,
    /// A primitive; only valid as a field value
    Primitive(JavaPrimitive),
    /// A string
    Str(String),
    /// A class literal
    Class(Arc<ClassDesc>),
    /// An array
    Array(JavaArray),
    /// An object
    Object(JavaObject),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Primitive;

    #[test]
    fn test_fields_sorted_primitives_first() {
        let desc = ClassDesc::serializable(
            "java.net.URL",
            -7627629688361524110,
            vec![
                FieldDesc::new("protocol", TypeRef::string()),
                FieldDesc::new("port", TypeRef::Primitive(Primitive::Int)),
                FieldDesc::new("authority", TypeRef::string()),
                FieldDesc::new("hashCode", TypeRef::Primitive(Primitive::Int)),
            ],
        );
        let names: Vec<&str> = desc.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["hashCode", "port", "authority", "protocol"]);
    }

    #[test]
    fn test_hierarchy_topmost_first() {
        let number = Arc::new(ClassDesc::serializable("java.lang.Number", 1, vec![]));
        let integer = Arc::new(
            ClassDesc::serializable("java.lang.Integer", 2, vec![]).with_super(number),
        );
        let names: Vec<String> = integer.hierarchy().iter().map(|d| d.name.clone()).collect();
        assert_eq!(names, vec!["java.lang.Number", "java.lang.Integer"]);
    }

    #[test]
    fn test_type_codes() {
        assert_eq!(FieldDesc::new("v", TypeRef::Primitive(Primitive::Long)).type_code(), b'J');
        assert_eq!(FieldDesc::new("s", TypeRef::string()).type_code(), b'L');
        assert_eq!(
            FieldDesc::new("a", TypeRef::object().array_of()).type_code(),
            b'['
        );
    }

    #[test]
    fn test_opaque_desc() {
        let desc = ClassDesc::opaque("java.lang.Runtime");
        assert_eq!(desc.suid, 0);
        assert_eq!(desc.flags, 0);
        assert!(desc.fields().is_empty());
    }
}
