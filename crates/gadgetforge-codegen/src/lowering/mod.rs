//! Lowering of operation chains into transformer object graphs
//!
//! Each [`Operation`] becomes one transformer object: constants become
//! constant transformers, member lookups and invocations become invoker
//! transformers. The chain becomes a single chained transformer.

pub mod classes;
pub mod schema;
pub mod url;

pub use classes::ClassTable;
pub use schema::TransformerSchema;
pub use url::UrlParts;

use crate::error::{Error, Result};
use crate::ir::{Operation, OperationChain, Primitive, TypeRef, Value};
use crate::stream::{ArrayElements, JavaArray, JavaObject, JavaPrimitive, JavaValue};

/// Lower a chain into a chained-transformer object
pub fn lower_chain(
    chain: &OperationChain,
    schema: &TransformerSchema,
    table: &ClassTable,
) -> Result<JavaValue> {
    let transformers = chain
        .iter()
        .map(|op| lower_operation(op, schema, table))
        .collect::<Result<Vec<_>>>()?;
    Ok(schema.chained(table, transformers))
}

/// Lower one operation into a transformer object
pub fn lower_operation(
    op: &Operation,
    schema: &TransformerSchema,
    table: &ClassTable,
) -> Result<JavaValue> {
    match op {
        Operation::Constant(value) => Ok(schema.constant(lower_value(value, table)?)),
        Operation::ResolveMember { .. } | Operation::Invoke(_) => {
            let call = op
                .invocation()
                .ok_or_else(|| Error::MalformedChain(format!("{op:?} has no invocation")))?;
            let param_types = lower_value(&Value::class_array(&call.param_types), table)?;
            let args = lower_value(&Value::object_array(call.args), table)?;
            Ok(schema.invoker(&call.method, param_types, args))
        }
    }
}

/// Lower a constant into its serialized form
pub fn lower_value(value: &Value, table: &ClassTable) -> Result<JavaValue> {
    match value {
        Value::Null => Ok(JavaValue::Null),
        Value::Int(i) => boxed(table, "java.lang.Integer", JavaPrimitive::Int(*i)),
        Value::Long(l) => boxed(table, "java.lang.Long", JavaPrimitive::Long(*l)),
        Value::Str(s) => Ok(JavaValue::Str(s.clone())),
        Value::Bytes(bytes) => Ok(JavaValue::Array(JavaArray {
            desc: table.desc_for(&TypeRef::Primitive(Primitive::Byte).array_of()),
            elements: ArrayElements::Bytes(bytes.clone()),
        })),
        Value::Class(ty) => Ok(JavaValue::Class(table.desc_for(ty))),
        Value::Url(spec) => url_object(spec, table),
        Value::Array { component, items } => {
            let desc = table.desc_for(&component.clone().array_of());
            let elements = match component {
                TypeRef::Primitive(Primitive::Int) => ArrayElements::Ints(
                    items
                        .iter()
                        .map(|item| match item {
                            Value::Int(i) => Ok(*i),
                            other => Err(element_mismatch("int", other)),
                        })
                        .collect::<Result<_>>()?,
                ),
                TypeRef::Primitive(Primitive::Long) => ArrayElements::Longs(
                    items
                        .iter()
                        .map(|item| match item {
                            Value::Long(l) => Ok(*l),
                            other => Err(element_mismatch("long", other)),
                        })
                        .collect::<Result<_>>()?,
                ),
                TypeRef::Primitive(p) => {
                    return Err(Error::Serialize(format!(
                        "{}[] constants are not supported",
                        p.keyword()
                    )));
                }
                _ => ArrayElements::Objects(
                    items
                        .iter()
                        .map(|item| lower_value(item, table))
                        .collect::<Result<_>>()?,
                ),
            };
            Ok(JavaValue::Array(JavaArray { desc, elements }))
        }
    }
}

fn boxed(table: &ClassTable, class: &str, value: JavaPrimitive) -> Result<JavaValue> {
    let desc = table
        .get(class)
        .ok_or_else(|| Error::Serialize(format!("no descriptor for {class}")))?;
    Ok(JavaValue::Object(
        JavaObject::new(desc).with("value", JavaValue::Primitive(value)),
    ))
}

fn url_object(spec: &str, table: &ClassTable) -> Result<JavaValue> {
    let desc = table
        .get("java.net.URL")
        .ok_or_else(|| Error::Serialize("no descriptor for java.net.URL".to_string()))?;
    let parts = UrlParts::parse(spec)?;
    let opt = |s: Option<String>| s.map_or(JavaValue::Null, JavaValue::Str);

    Ok(JavaValue::Object(
        JavaObject::new(desc)
            .with("hashCode", JavaValue::Primitive(JavaPrimitive::Int(-1)))
            .with("port", JavaValue::Primitive(JavaPrimitive::Int(parts.port)))
            .with("authority", opt(parts.authority))
            .with("file", JavaValue::Str(parts.file))
            .with("host", JavaValue::Str(parts.host))
            .with("protocol", JavaValue::Str(parts.protocol))
            .with("ref", opt(parts.reference)),
    ))
}

fn element_mismatch(expected: &str, found: &Value) -> Error {
    Error::Serialize(format!("{expected}[] element is {found:?}"))
}
