//! Transformer class layouts
//!
//! Each supported commons-collections generation names its transformer
//! classes differently; the stream layout is otherwise the same.

use std::sync::Arc;

use crate::ir::TypeRef;
use crate::lowering::classes::ClassTable;
use crate::stream::{ArrayElements, ClassDesc, FieldDesc, JavaArray, JavaObject, JavaValue};

/// Which transformer class family to emit
#[derive(Debug, Clone)]
pub struct TransformerSchema {
    name: &'static str,
    transformer: TypeRef,
    chained: Arc<ClassDesc>,
    constant: Arc<ClassDesc>,
    invoker: Arc<ClassDesc>,
}

impl TransformerSchema {
    /// `org.apache.commons.collections.functors` (3.1 to 3.2.1)
    pub fn commons_collections3() -> Self {
        Self::for_package(
            "commons-collections",
            "org.apache.commons.collections",
        )
    }

    /// `org.apache.commons.collections4.functors` (4.0)
    pub fn commons_collections4() -> Self {
        Self::for_package(
            "commons-collections4",
            "org.apache.commons.collections4",
        )
    }

    fn for_package(name: &'static str, package: &str) -> Self {
        let transformer = TypeRef::class(format!("{package}.Transformer"));
        let functor = |simple: &str| format!("{package}.functors.{simple}");

        let chained = ClassDesc::serializable(
            functor("ChainedTransformer"),
            3514945074733160196,
            vec![FieldDesc::new("iTransformers", transformer.clone().array_of())],
        );
        let constant = ClassDesc::serializable(
            functor("ConstantTransformer"),
            6374440726369055124,
            vec![FieldDesc::new("iConstant", TypeRef::object())],
        );
        let invoker = ClassDesc::serializable(
            functor("InvokerTransformer"),
            -8653385846894047688,
            vec![
                FieldDesc::new("iArgs", TypeRef::object().array_of()),
                FieldDesc::new("iMethodName", TypeRef::string()),
                FieldDesc::new("iParamTypes", TypeRef::class_type().array_of()),
            ],
        );

        Self {
            name,
            transformer,
            chained: Arc::new(chained),
            constant: Arc::new(constant),
            invoker: Arc::new(invoker),
        }
    }

    /// Library name, for logs
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// `new ConstantTransformer(value)`
    pub fn constant(&self, value: JavaValue) -> JavaValue {
        JavaValue::Object(JavaObject::new(Arc::clone(&self.constant)).with("iConstant", value))
    }

    /// `new InvokerTransformer(method, paramTypes, args)`
    pub fn invoker(&self, method: &str, param_types: JavaValue, args: JavaValue) -> JavaValue {
        JavaValue::Object(
            JavaObject::new(Arc::clone(&self.invoker))
                .with("iMethodName", JavaValue::Str(method.to_string()))
                .with("iParamTypes", param_types)
                .with("iArgs", args),
        )
    }

    /// `new ChainedTransformer(transformers)`
    pub fn chained(&self, table: &ClassTable, transformers: Vec<JavaValue>) -> JavaValue {
        let array = JavaArray {
            desc: table.desc_for(&self.transformer.clone().array_of()),
            elements: ArrayElements::Objects(transformers),
        };
        JavaValue::Object(
            JavaObject::new(Arc::clone(&self.chained))
                .with("iTransformers", JavaValue::Array(array)),
        )
    }
}

impl Default for TransformerSchema {
    fn default() -> Self {
        Self::commons_collections3()
    }
}
