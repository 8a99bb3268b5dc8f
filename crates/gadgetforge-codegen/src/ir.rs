//! Intermediate Representation for operation chains
//!
//! An [`OperationChain`] is the explicit form of a reflective invocation
//! sequence. Every step consumes the "current value" left by the previous
//! step and replaces it with its own result. There is no branching.

use std::fmt;

/// Java primitive types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// `boolean`
    Boolean,
    /// `byte`
    Byte,
    /// `char`
    Char,
    /// `short`
    Short,
    /// `int`
    Int,
    /// `long`
    Long,
    /// `float`
    Float,
    /// `double`
    Double,
}

impl Primitive {
    /// Source-level keyword, also the `Class.getName()` of the primitive
    pub fn keyword(&self) -> &'static str {
        match self {
            Primitive::Boolean => "boolean",
            Primitive::Byte => "byte",
            Primitive::Char => "char",
            Primitive::Short => "short",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
        }
    }

    /// Field descriptor character
    pub fn descriptor(&self) -> char {
        match self {
            Primitive::Boolean => 'Z',
            Primitive::Byte => 'B',
            Primitive::Char => 'C',
            Primitive::Short => 'S',
            Primitive::Int => 'I',
            Primitive::Long => 'J',
            Primitive::Float => 'F',
            Primitive::Double => 'D',
        }
    }
}

/// A reference to a Java type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// A primitive type
    Primitive(Primitive),
    /// A class or interface, by binary name (`java.lang.String`)
    Class(String),
    /// An array of the inner type
    Array(Box<TypeRef>),
}

impl TypeRef {
    /// A class type
    pub fn class(name: impl Into<String>) -> Self {
        TypeRef::Class(name.into())
    }

    /// `java.lang.String`
    pub fn string() -> Self {
        TypeRef::class("java.lang.String")
    }

    /// `java.lang.Object`
    pub fn object() -> Self {
        TypeRef::class("java.lang.Object")
    }

    /// `java.lang.Class`
    pub fn class_type() -> Self {
        TypeRef::class("java.lang.Class")
    }

    /// An array whose component is `self`
    pub fn array_of(self) -> Self {
        TypeRef::Array(Box::new(self))
    }

    /// Whether this is a primitive type
    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeRef::Primitive(_))
    }

    /// `Class.getName()` form: `java.lang.String`, `long`, `[Ljava.lang.String;`
    pub fn java_name(&self) -> String {
        match self {
            TypeRef::Primitive(p) => p.keyword().to_string(),
            TypeRef::Class(name) => name.clone(),
            TypeRef::Array(_) => self.descriptor().replace('/', "."),
        }
    }

    /// JVM field descriptor: `Ljava/lang/String;`, `J`, `[B`
    pub fn descriptor(&self) -> String {
        match self {
            TypeRef::Primitive(p) => p.descriptor().to_string(),
            TypeRef::Class(name) => format!("L{};", name.replace('.', "/")),
            TypeRef::Array(inner) => format!("[{}", inner.descriptor()),
        }
    }

    /// Source-level spelling: `java.lang.String[]`
    pub fn source_name(&self) -> String {
        match self {
            TypeRef::Primitive(p) => p.keyword().to_string(),
            TypeRef::Class(name) => name.clone(),
            TypeRef::Array(inner) => format!("{}[]", inner.source_name()),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source_name())
    }
}

/// A constant carried by an operation
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `null`
    Null,
    /// Boxed `int`
    Int(i32),
    /// Boxed `long`
    Long(i64),
    /// A string
    Str(String),
    /// A `byte[]`
    Bytes(Vec<u8>),
    /// A class literal
    Class(TypeRef),
    /// A `java.net.URL` built from its spec string
    Url(String),
    /// An array with an explicit component type
    Array {
        /// Component type
        component: TypeRef,
        /// Elements
        items: Vec<Value>,
    },
}

impl Value {
    /// A string value
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    /// A class literal
    pub fn class(name: impl Into<String>) -> Self {
        Value::Class(TypeRef::class(name))
    }

    /// `new Object[]{...}`
    pub fn object_array(items: Vec<Value>) -> Self {
        Value::Array {
            component: TypeRef::object(),
            items,
        }
    }

    /// `new String[]{...}`
    pub fn string_array<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::Array {
            component: TypeRef::string(),
            items: items.into_iter().map(|s| Value::Str(s.into())).collect(),
        }
    }

    /// `new Class[]{...}`
    pub fn class_array(types: &[TypeRef]) -> Self {
        Value::Array {
            component: TypeRef::class_type(),
            items: types.iter().cloned().map(Value::Class).collect(),
        }
    }
}

/// How a member is looked up on a class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberLookup {
    /// `Class.getMethod(name, types)`
    Method,
    /// `Class.getConstructor(types)`
    Constructor,
    /// `Class.getDeclaredConstructor(types)`
    DeclaredConstructor,
}

impl MemberLookup {
    /// Reflective method performing the lookup
    pub fn method_name(&self) -> &'static str {
        match self {
            MemberLookup::Method => "getMethod",
            MemberLookup::Constructor => "getConstructor",
            MemberLookup::DeclaredConstructor => "getDeclaredConstructor",
        }
    }
}

/// A single reflective call performed on the current value
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// Method invoked on the current value
    pub method: String,
    /// Declared parameter types of that method
    pub param_types: Vec<TypeRef>,
    /// Arguments
    pub args: Vec<Value>,
}

/// One step of an operation chain
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Replace the current value with a constant
    Constant(Value),

    /// Look up a method or constructor on the current (class) value
    ResolveMember {
        /// Kind of lookup
        lookup: MemberLookup,
        /// Method name; `None` for constructors
        name: Option<String>,
        /// Parameter types of the member
        param_types: Vec<TypeRef>,
    },

    /// Invoke a method on the current value
    Invoke(Invocation),
}

impl Operation {
    /// Terminal marker appended to every chain
    pub const SENTINEL: Operation = Operation::Constant(Value::Int(1));

    /// Whether this is the terminal marker
    pub fn is_sentinel(&self) -> bool {
        *self == Self::SENTINEL
    }

    /// `getMethod(name, types)`
    pub fn get_method(name: impl Into<String>, param_types: Vec<TypeRef>) -> Self {
        Operation::ResolveMember {
            lookup: MemberLookup::Method,
            name: Some(name.into()),
            param_types,
        }
    }

    /// `getConstructor(types)`
    pub fn get_constructor(param_types: Vec<TypeRef>) -> Self {
        Operation::ResolveMember {
            lookup: MemberLookup::Constructor,
            name: None,
            param_types,
        }
    }

    /// `getDeclaredConstructor(types)`
    pub fn get_declared_constructor(param_types: Vec<TypeRef>) -> Self {
        Operation::ResolveMember {
            lookup: MemberLookup::DeclaredConstructor,
            name: None,
            param_types,
        }
    }

    /// Arbitrary method call on the current value
    pub fn call(method: impl Into<String>, param_types: Vec<TypeRef>, args: Vec<Value>) -> Self {
        Operation::Invoke(Invocation {
            method: method.into(),
            param_types,
            args,
        })
    }

    /// `Method.invoke(null, args)` on a resolved static method
    pub fn invoke_static(args: Vec<Value>) -> Self {
        Self::call(
            "invoke",
            vec![TypeRef::object(), TypeRef::object().array_of()],
            vec![Value::Null, Value::object_array(args)],
        )
    }

    /// `Constructor.newInstance(args)` with an explicit argument array
    pub fn construct(arguments: Value) -> Self {
        Self::call(
            "newInstance",
            vec![TypeRef::object().array_of()],
            vec![arguments],
        )
    }

    /// `Class.newInstance()`
    pub fn instantiate() -> Self {
        Self::call("newInstance", vec![], vec![])
    }

    /// The reflective call this step performs, for steps that call anything
    pub fn invocation(&self) -> Option<Invocation> {
        match self {
            Operation::Constant(_) => None,
            Operation::ResolveMember {
                lookup,
                name,
                param_types,
            } => {
                let types = Value::class_array(param_types);
                let (param_types, args) = match (lookup, name) {
                    (MemberLookup::Method, Some(name)) => (
                        vec![TypeRef::string(), TypeRef::class_type().array_of()],
                        vec![Value::str(name.as_str()), types],
                    ),
                    _ => (vec![TypeRef::class_type().array_of()], vec![types]),
                };
                Some(Invocation {
                    method: lookup.method_name().to_string(),
                    param_types,
                    args,
                })
            }
            Operation::Invoke(invocation) => Some(invocation.clone()),
        }
    }
}

/// An ordered, sentinel-terminated sequence of operations
#[derive(Debug, Clone, PartialEq)]
pub struct OperationChain {
    ops: Vec<Operation>,
}

impl OperationChain {
    /// Start a chain from a constant seed value
    pub fn seeded(seed: Value) -> ChainBuilder {
        ChainBuilder {
            ops: vec![Operation::Constant(seed)],
        }
    }

    /// Build a chain from steps; a trailing sentinel is added if absent
    pub fn from_steps(mut steps: Vec<Operation>) -> Self {
        if steps.last().is_some_and(Operation::is_sentinel) {
            steps.pop();
        }
        steps.push(Operation::SENTINEL);
        Self { ops: steps }
    }

    /// Join chains end to end, keeping a single trailing sentinel
    pub fn splice(chains: impl IntoIterator<Item = OperationChain>) -> Self {
        let steps = chains
            .into_iter()
            .flat_map(|chain| {
                let mut ops = chain.ops;
                ops.pop();
                ops
            })
            .collect();
        Self::from_steps(steps)
    }

    /// All operations including the sentinel
    pub fn operations(&self) -> &[Operation] {
        &self.ops
    }

    /// Operations before the sentinel
    pub fn steps(&self) -> &[Operation] {
        &self.ops[..self.ops.len() - 1]
    }

    /// Number of operations including the sentinel
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Always `false`: every chain holds at least the sentinel. Pairs with
    /// [`len`](Self::len) for `clippy::len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether the last operation is the sentinel
    pub fn is_terminated(&self) -> bool {
        self.ops.last().is_some_and(Operation::is_sentinel)
    }

    /// Iterate over all operations
    pub fn iter(&self) -> std::slice::Iter<'_, Operation> {
        self.ops.iter()
    }
}

impl<'a> IntoIterator for &'a OperationChain {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Incremental chain construction
#[derive(Debug)]
pub struct ChainBuilder {
    ops: Vec<Operation>,
}

impl ChainBuilder {
    /// Append a step
    pub fn then(mut self, op: Operation) -> Self {
        self.ops.push(op);
        self
    }

    /// Terminate the chain with the sentinel
    pub fn finish(self) -> OperationChain {
        OperationChain::from_steps(self.ops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_chain(cmd: &str) -> OperationChain {
        OperationChain::seeded(Value::class("java.lang.Runtime"))
            .then(Operation::get_method("getRuntime", vec![]))
            .then(Operation::invoke_static(vec![]))
            .then(Operation::call(
                "exec",
                vec![TypeRef::string()],
                vec![Value::str(cmd)],
            ))
            .finish()
    }

    #[test]
    fn test_type_names() {
        let t = TypeRef::string().array_of();
        assert_eq!(t.java_name(), "[Ljava.lang.String;");
        assert_eq!(t.descriptor(), "[Ljava/lang/String;");
        assert_eq!(t.source_name(), "java.lang.String[]");

        let b = TypeRef::Primitive(Primitive::Byte).array_of();
        assert_eq!(b.java_name(), "[B");
        assert_eq!(TypeRef::Primitive(Primitive::Long).java_name(), "long");
    }

    #[test]
    fn test_builder_appends_sentinel() {
        let chain = raw_chain("id");
        assert_eq!(chain.len(), 5);
        assert!(chain.is_terminated());
        assert_eq!(chain.steps().len(), 4);
        assert!(chain.operations()[4].is_sentinel());
    }

    #[test]
    fn test_from_steps_does_not_double_sentinel() {
        let chain = OperationChain::from_steps(vec![
            Operation::Constant(Value::class("java.lang.Thread")),
            Operation::SENTINEL,
        ]);
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_sentinel_only_chain_is_not_empty() {
        let chain = OperationChain::from_steps(vec![]);
        assert_eq!(chain.len(), 1);
        assert!(!chain.is_empty());
    }

    #[test]
    fn test_splice_keeps_one_sentinel() {
        let spliced = OperationChain::splice([raw_chain("a"), raw_chain("b")]);
        assert_eq!(spliced.len(), 9);
        assert!(spliced.is_terminated());
        assert_eq!(spliced.iter().filter(|op| op.is_sentinel()).count(), 1);
    }

    #[test]
    fn test_get_method_invocation() {
        let op = Operation::get_method("sleep", vec![TypeRef::Primitive(Primitive::Long)]);
        let inv = op.invocation().unwrap();
        assert_eq!(inv.method, "getMethod");
        assert_eq!(
            inv.param_types,
            vec![TypeRef::string(), TypeRef::class_type().array_of()]
        );
        assert_eq!(inv.args[0], Value::str("sleep"));
        assert_eq!(
            inv.args[1],
            Value::class_array(&[TypeRef::Primitive(Primitive::Long)])
        );
    }

    #[test]
    fn test_constructor_invocation() {
        let inv = Operation::get_declared_constructor(vec![]).invocation().unwrap();
        assert_eq!(inv.method, "getDeclaredConstructor");
        assert_eq!(inv.args, vec![Value::class_array(&[])]);
    }

    #[test]
    fn test_constant_has_no_invocation() {
        assert!(Operation::SENTINEL.invocation().is_none());
    }
}
