//! Object stream writer
//!
//! Encodes a [`JavaValue`] graph in the Java Object Serialization Stream
//! Protocol, version 5.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::ir::TypeRef;
use crate::stream::model::{
    ArrayElements, ClassDesc, FieldDesc, JavaArray, JavaObject, JavaPrimitive, JavaValue,
};

/// Stream magic
pub const STREAM_MAGIC: u16 = 0xACED;
/// Stream version
pub const STREAM_VERSION: u16 = 5;

const TC_NULL: u8 = 0x70;
const TC_REFERENCE: u8 = 0x71;
const TC_CLASSDESC: u8 = 0x72;
const TC_OBJECT: u8 = 0x73;
const TC_STRING: u8 = 0x74;
const TC_ARRAY: u8 = 0x75;
const TC_CLASS: u8 = 0x76;
const TC_ENDBLOCKDATA: u8 = 0x78;
const TC_LONGSTRING: u8 = 0x7C;

/// First handle assigned in a stream
pub const BASE_WIRE_HANDLE: u32 = 0x7E_0000;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Shared {
    Desc(String),
    Class(String),
    Str(String),
}

/// Serialize a single top-level value
pub fn serialize(value: &JavaValue) -> Result<Vec<u8>> {
    let mut writer = ObjectStreamWriter::new();
    writer.write_object(value)?;
    Ok(writer.into_bytes())
}

/// Stateful stream writer; handles persist across top-level objects
#[derive(Debug)]
pub struct ObjectStreamWriter {
    out: Vec<u8>,
    next_handle: u32,
    handles: HashMap<Shared, u32>,
}

impl Default for ObjectStreamWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStreamWriter {
    /// Start a stream; the header is written immediately
    pub fn new() -> Self {
        let mut out = Vec::with_capacity(1024);
        out.extend_from_slice(&STREAM_MAGIC.to_be_bytes());
        out.extend_from_slice(&STREAM_VERSION.to_be_bytes());
        Self {
            out,
            next_handle: BASE_WIRE_HANDLE,
            handles: HashMap::new(),
        }
    }

    /// Finished stream bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.out
    }

    /// Write one value as a top-level object
    pub fn write_object(&mut self, value: &JavaValue) -> Result<()> {
        match value {
            JavaValue::Null => {
                self.out.push(TC_NULL);
                Ok(())
            }
            JavaValue::Primitive(p) => Err(Error::Serialize(format!(
                "primitive {p:?} cannot be written as an object"
            ))),
            JavaValue::Str(s) => self.write_string(s),
            JavaValue::Class(desc) => self.write_class(desc),
            JavaValue::Array(array) => self.write_array(array),
            JavaValue::Object(object) => self.write_ordinary_object(object),
        }
    }

    fn assign(&mut self, key: Option<Shared>) {
        let handle = self.next_handle;
        self.next_handle += 1;
        if let Some(key) = key {
            self.handles.insert(key, handle);
        }
    }

    /// Emit a back-reference if `key` was written before
    fn write_reference(&mut self, key: &Shared) -> bool {
        match self.handles.get(key) {
            Some(&handle) => {
                self.out.push(TC_REFERENCE);
                self.out.extend_from_slice(&handle.to_be_bytes());
                true
            }
            None => false,
        }
    }

    fn write_string(&mut self, s: &str) -> Result<()> {
        let key = Shared::Str(s.to_string());
        if self.write_reference(&key) {
            return Ok(());
        }
        let encoded = modified_utf8(s);
        self.assign(Some(key));
        if encoded.len() <= usize::from(u16::MAX) {
            self.out.push(TC_STRING);
            self.out
                .extend_from_slice(&(encoded.len() as u16).to_be_bytes());
        } else {
            self.out.push(TC_LONGSTRING);
            self.out
                .extend_from_slice(&(encoded.len() as u64).to_be_bytes());
        }
        self.out.extend_from_slice(&encoded);
        Ok(())
    }

    fn write_utf(&mut self, s: &str) -> Result<()> {
        let encoded = modified_utf8(s);
        let len = u16::try_from(encoded.len())
            .map_err(|_| Error::Serialize(format!("name too long: {} bytes", encoded.len())))?;
        self.out.extend_from_slice(&len.to_be_bytes());
        self.out.extend_from_slice(&encoded);
        Ok(())
    }

    fn write_class_desc(&mut self, desc: Option<&Arc<ClassDesc>>) -> Result<()> {
        let Some(desc) = desc else {
            self.out.push(TC_NULL);
            return Ok(());
        };
        let key = Shared::Desc(desc.name.clone());
        if self.write_reference(&key) {
            return Ok(());
        }

        self.out.push(TC_CLASSDESC);
        self.assign(Some(key));
        self.write_utf(&desc.name)?;
        self.out.extend_from_slice(&desc.suid.to_be_bytes());
        self.out.push(desc.flags);

        let fields = desc.fields();
        let count = u16::try_from(fields.len())
            .map_err(|_| Error::Serialize(format!("{} has too many fields", desc.name)))?;
        self.out.extend_from_slice(&count.to_be_bytes());
        for field in fields {
            self.out.push(field.type_code());
            self.write_utf(&field.name)?;
            if !field.ty.is_primitive() {
                self.write_string(&field.ty.descriptor())?;
            }
        }

        // no class annotations
        self.out.push(TC_ENDBLOCKDATA);
        self.write_class_desc(desc.super_desc.as_ref())
    }

    fn write_class(&mut self, desc: &Arc<ClassDesc>) -> Result<()> {
        let key = Shared::Class(desc.name.clone());
        if self.write_reference(&key) {
            return Ok(());
        }
        self.out.push(TC_CLASS);
        self.write_class_desc(Some(desc))?;
        self.assign(Some(key));
        Ok(())
    }

    fn write_array(&mut self, array: &JavaArray) -> Result<()> {
        self.out.push(TC_ARRAY);
        self.write_class_desc(Some(&array.desc))?;
        self.assign(None);

        let len = i32::try_from(array.elements.len())
            .map_err(|_| Error::Serialize("array too long".to_string()))?;
        self.out.extend_from_slice(&len.to_be_bytes());
        match &array.elements {
            ArrayElements::Bytes(bytes) => self.out.extend_from_slice(bytes),
            ArrayElements::Ints(ints) => {
                for i in ints {
                    self.out.extend_from_slice(&i.to_be_bytes());
                }
            }
            ArrayElements::Longs(longs) => {
                for l in longs {
                    self.out.extend_from_slice(&l.to_be_bytes());
                }
            }
            ArrayElements::Objects(items) => {
                for item in items {
                    self.write_object(item)?;
                }
            }
        }
        Ok(())
    }

    fn write_ordinary_object(&mut self, object: &JavaObject) -> Result<()> {
        self.out.push(TC_OBJECT);
        self.write_class_desc(Some(&object.desc))?;
        self.assign(None);

        for desc in object.desc.hierarchy() {
            for field in desc.fields() {
                match object.fields.get(&field.name) {
                    Some(value) => self.write_field(field, value)?,
                    None => self.write_default(field)?,
                }
            }
            if desc.has_write_method() {
                self.out.push(TC_ENDBLOCKDATA);
            }
        }
        Ok(())
    }

    fn write_field(&mut self, field: &FieldDesc, value: &JavaValue) -> Result<()> {
        match (&field.ty, value) {
            (TypeRef::Primitive(_), JavaValue::Primitive(p)) => {
                self.write_primitive(*p);
                Ok(())
            }
            (TypeRef::Primitive(_), other) => Err(Error::Serialize(format!(
                "field {} is primitive but holds {other:?}",
                field.name
            ))),
            (_, JavaValue::Primitive(p)) => Err(Error::Serialize(format!(
                "field {} is a reference but holds {p:?}",
                field.name
            ))),
            (_, value) => self.write_object(value),
        }
    }

    fn write_default(&mut self, field: &FieldDesc) -> Result<()> {
        match &field.ty {
            TypeRef::Primitive(p) => {
                let width = match p.descriptor() {
                    'Z' | 'B' => 1,
                    'C' | 'S' => 2,
                    'I' | 'F' => 4,
                    _ => 8,
                };
                self.out.extend(std::iter::repeat_n(0u8, width));
            }
            _ => self.out.push(TC_NULL),
        }
        Ok(())
    }

    fn write_primitive(&mut self, p: JavaPrimitive) {
        match p {
            JavaPrimitive::Boolean(b) => self.out.push(u8::from(b)),
            JavaPrimitive::Byte(b) => self.out.extend_from_slice(&b.to_be_bytes()),
            JavaPrimitive::Char(c) => self.out.extend_from_slice(&c.to_be_bytes()),
            JavaPrimitive::Short(s) => self.out.extend_from_slice(&s.to_be_bytes()),
            JavaPrimitive::Int(i) => self.out.extend_from_slice(&i.to_be_bytes()),
            JavaPrimitive::Long(l) => self.out.extend_from_slice(&l.to_be_bytes()),
            JavaPrimitive::Float(f) => self.out.extend_from_slice(&f.to_be_bytes()),
            JavaPrimitive::Double(d) => self.out.extend_from_slice(&d.to_be_bytes()),
        }
    }
}

/// Java modified UTF-8: NUL as two bytes, supplementary characters as
/// surrogate pairs of three bytes each
pub fn modified_utf8(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for unit in s.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | ((unit >> 6) & 0x1F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | ((unit >> 12) & 0x0F) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}
