//! Delegation contract for natively compiled script functions.
//!
//! A `cfunction` declares typed parameters:
//!
//! ```text
//! cfunction add(number a, number b) { return a + b; }
//! ```
//!
//! Its body is handed to the registered [`CompilerBackend`] once, at
//! definition time. Each call sorts the evaluated arguments into homogeneous
//! [`ArgBuckets`] by declared kind so the compiled callee never inspects a
//! dynamic value.

use std::fmt;
use std::sync::Arc;

use crate::cursor::{split_top_level, Script};
use crate::error::{Result, ScriptError};
use crate::handler::Handler;
use crate::interpreter::Interpreter;
use crate::value::{Data, Value};

/// Declared kind of a compiled-function parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgKind {
    /// `string`
    String,
    /// `number` (f64)
    Number,
    /// `int` (i64)
    Int,
    /// `strings` (array of strings)
    Strings,
    /// `numbers` (array of f64)
    Numbers,
}

impl ArgKind {
    /// Parse a declared type name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "string" => Some(ArgKind::String),
            "number" | "double" => Some(ArgKind::Number),
            "int" => Some(ArgKind::Int),
            "strings" => Some(ArgKind::Strings),
            "numbers" => Some(ArgKind::Numbers),
            _ => None,
        }
    }
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArgKind::String => "string",
            ArgKind::Number => "number",
            ArgKind::Int => "int",
            ArgKind::Strings => "strings",
            ArgKind::Numbers => "numbers",
        };
        write!(f, "{}", name)
    }
}

/// A declared parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedParam {
    /// Parameter name
    pub name: String,
    /// Declared kind
    pub kind: ArgKind,
}

/// Call arguments pre-sorted by kind, each bucket in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgBuckets {
    /// `string` arguments
    pub strings: Vec<String>,
    /// `number` arguments
    pub numbers: Vec<f64>,
    /// `int` arguments
    pub ints: Vec<i64>,
    /// `strings` arguments
    pub string_arrays: Vec<Vec<String>>,
    /// `numbers` arguments
    pub number_arrays: Vec<Vec<f64>>,
}

impl ArgBuckets {
    /// Sort `args` into buckets following `params`.
    ///
    /// # Errors
    ///
    /// `ArgumentMismatch` when the counts differ, `TypeMismatch` when an
    /// argument cannot be read as its declared kind.
    pub fn sort(function: &str, params: &[TypedParam], args: &[Value]) -> Result<Self> {
        if params.len() != args.len() {
            return Err(ScriptError::arguments(
                function,
                format!("expected {} arguments, got {}", params.len(), args.len()),
            ));
        }
        let mut buckets = ArgBuckets::default();
        for (param, arg) in params.iter().zip(args) {
            match param.kind {
                ArgKind::String => buckets.strings.push(arg.as_string()),
                ArgKind::Number => buckets.numbers.push(number(param, arg)?),
                ArgKind::Int => buckets.ints.push(number(param, arg)? as i64),
                ArgKind::Strings => buckets
                    .string_arrays
                    .push(elements(param, arg)?.iter().map(Value::as_string).collect()),
                ArgKind::Numbers => buckets.number_arrays.push(
                    elements(param, arg)?
                        .iter()
                        .map(|v| number(param, v))
                        .collect::<Result<_>>()?,
                ),
            }
        }
        Ok(buckets)
    }
}

fn number(param: &TypedParam, arg: &Value) -> Result<f64> {
    arg.try_number()
        .ok_or_else(|| ScriptError::type_mismatch(format!("{} {}", param.kind, param.name), arg.type_name()))
}

fn elements<'a>(param: &TypedParam, arg: &'a Value) -> Result<&'a [Value]> {
    match arg.data() {
        Data::Array(a) => Ok(a.items()),
        _ => Err(ScriptError::type_mismatch(
            format!("{} {}", param.kind, param.name),
            arg.type_name(),
        )),
    }
}

/// Opaque token naming a compiled callable inside its backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompiledHandle(pub u64);

/// The native-compilation backend.
pub trait CompilerBackend: Send + Sync {
    /// Compile `body` as a callable taking `params`.
    ///
    /// Returns the backend's diagnostics on failure.
    fn compile(
        &self,
        function: &str,
        params: &[TypedParam],
        body: &str,
    ) -> std::result::Result<CompiledHandle, String>;

    /// Invoke a compiled callable.
    fn invoke(&self, handle: CompiledHandle, args: &ArgBuckets) -> Result<Value>;
}

/// A script function whose body lives in the backend.
#[derive(Debug, Clone)]
pub struct CompiledFunction {
    /// Function name
    pub name: String,
    /// Declared parameters
    pub params: Vec<TypedParam>,
    /// Backend token
    pub handle: CompiledHandle,
}

/// Parse a `cfunction` parameter list such as `number a, strings names`.
pub fn parse_params(function: &str, parts: &[String]) -> Result<Vec<TypedParam>> {
    parts
        .iter()
        .map(|part| {
            let (kind, name) = part.split_once(' ').ok_or_else(|| {
                ScriptError::syntax(format!("parameter '{}' of {} needs a type", part, function), 0)
            })?;
            let kind = ArgKind::from_name(kind.trim()).ok_or_else(|| {
                ScriptError::syntax(format!("unknown parameter type '{}' in {}", kind, function), 0)
            })?;
            Ok(TypedParam {
                name: name.trim().to_string(),
                kind,
            })
        })
        .collect()
}

fn backend(interp: &Interpreter, function: &str) -> Result<Arc<dyn CompilerBackend>> {
    interp
        .shared
        .compiler
        .read()
        .clone()
        .ok_or_else(|| ScriptError::CompileFailure {
            function: function.to_string(),
            message: "no compiler backend is registered".to_string(),
        })
}

/// Read a `cfunction` declaration after its keyword, compile it and bind
/// the result.
pub(crate) fn define(interp: &mut Interpreter, script: &mut Script) -> Result<()> {
    script.skip_spaces();
    let name = script.read_token();
    if name.is_empty() {
        return Err(script.syntax_error("cfunction needs a name"));
    }
    script.skip_spaces();
    let header = script.read_balanced('(', ')')?;
    let params = parse_params(&name, &split_top_level(&header, ','))?;
    script.skip_spaces();
    let body = script.read_balanced('{', '}')?;

    let handle = backend(interp, &name)?
        .compile(&name, &params, &body)
        .map_err(|message| ScriptError::CompileFailure {
            function: name.clone(),
            message,
        })?;
    tracing::debug!(function = name.as_str(), ?handle, "compiled function");
    let function = CompiledFunction { name: name.clone(), params, handle };
    interp.define_declaration(&name, Handler::Compiled(Arc::new(function)));
    Ok(())
}

/// Call a compiled function with evaluated arguments.
pub(crate) fn invoke(interp: &Interpreter, function: &CompiledFunction, args: &[Value]) -> Result<Value> {
    let backend = backend(interp, &function.name)?;
    let buckets = ArgBuckets::sort(&function.name, &function.params, args)?;
    backend
        .invoke(function.handle, &buckets)
        .map_err(|e| e.in_frame(&function.name))
}
