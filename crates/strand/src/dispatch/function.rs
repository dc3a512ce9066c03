//! Script-defined functions

use std::sync::Arc;

use indexmap::IndexMap;

use crate::cursor::{split_top_level, Script};
use crate::error::{Result, ScriptError};
use crate::eval::{block, expr};
use crate::handler::Handler;
use crate::interpreter::Interpreter;
use crate::scope::FrameKind;
use crate::stack::ensure_sufficient_stack;
use crate::value::{Data, Value};

use super::call::{self, Arg};

/// A declared parameter with an optional default expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Parameter name
    pub name: String,

    /// Default-value expression, evaluated in the callee frame
    pub default: Option<String>,
}

impl Param {
    /// Create a parameter.
    pub fn new(name: impl Into<String>, default: Option<&str>) -> Self {
        Self {
            name: name.into(),
            default: default.map(str::to_string),
        }
    }
}

/// A user-defined function.
///
/// The body is kept as canonical text and re-read on every call through a
/// cursor derived from the definition site.
#[derive(Debug, Clone)]
pub struct CustomFunction {
    /// Function name
    pub name: String,

    /// Declared parameters
    pub params: Vec<Param>,

    /// Body text, without the enclosing braces
    pub body: String,

    /// Cursor at the definition site (file and line context)
    pub origin: Script,

    /// Namespace the function was defined in
    pub namespace: Option<String>,

    /// Owning class, for methods and constructors
    pub class: Option<String>,
}

impl CustomFunction {
    /// Number of parameters without a default.
    pub fn required(&self) -> usize {
        self.params.iter().filter(|p| p.default.is_none()).count()
    }
}

/// Parse `name(params) { body }` following the `function` keyword.
pub(crate) fn parse(interp: &Interpreter, script: &mut Script) -> Result<CustomFunction> {
    let name = script.read_token();
    if name.is_empty() {
        return Err(script.syntax_error("expected a function name"));
    }
    let header = script.read_balanced('(', ')')?;
    let params = parse_params(&name, &header, script)?;
    script.skip_spaces();
    let origin = script.clone();
    let body = script.read_balanced('{', '}')?;

    Ok(CustomFunction {
        name,
        params,
        body,
        origin,
        namespace: active_namespace(interp),
        class: None,
    })
}

fn parse_params(function: &str, header: &str, script: &Script) -> Result<Vec<Param>> {
    let mut params: Vec<Param> = Vec::new();
    for part in split_top_level(header, ',') {
        let (name, default) = match part.split_once('=') {
            Some((name, default)) => (name.trim(), Some(default.trim())),
            None => (part.as_str(), None),
        };
        if !call::is_identifier(name) {
            return Err(script.syntax_error(format!(
                "invalid parameter '{}' in {}",
                part, function
            )));
        }
        if params.iter().any(|p| p.name == name) {
            return Err(script.syntax_error(format!(
                "duplicate parameter '{}' in {}",
                name, function
            )));
        }
        params.push(Param::new(name, default));
    }
    Ok(params)
}

/// Namespace definitions made now belong to.
fn active_namespace(interp: &Interpreter) -> Option<String> {
    match interp.stack().active()?.kind() {
        FrameKind::Namespace(ns) => Some(ns.clone()),
        FrameKind::Call { namespace, .. } => namespace.clone(),
        FrameKind::Thread => None,
    }
}

/// Handle a `function` statement.
pub(crate) fn define(interp: &mut Interpreter, script: &mut Script) -> Result<Value> {
    let function = parse(interp, script)?;
    let name = function.name.clone();
    interp.define_declaration(&name, Handler::Custom(Arc::new(function)));
    Ok(Value::none())
}

/// Call `function` with `args`, as a method of `this` when given.
///
/// Pushes a call frame, binds the arguments (defaults are evaluated in the
/// callee frame, so they may refer to earlier parameters), runs the body
/// and pops the frame by identifier on every exit path. For methods, the
/// instance's fields are visible as locals and changed locals are written
/// back to the instance.
pub fn call(
    interp: &mut Interpreter,
    function: &CustomFunction,
    args: Vec<Arg>,
    this: Option<&Value>,
) -> Result<Value> {
    let bound = call::bind(&function.name, &function.params, args)?;

    interp.enter_call(&function.name)?;
    let frame = interp.stack.push(FrameKind::Call {
        function: function.name.clone(),
        namespace: function.namespace.clone(),
    });
    tracing::debug!(function = function.name.as_str(), depth = interp.call_depth(), "call");

    let seeded = this.map(|this| seed_method(interp, this));
    let result = ensure_sufficient_stack(|| run(interp, function, bound));
    if let (Some(this), Some(seeded)) = (this, seeded) {
        write_back(interp, this, &seeded, &function.params);
    }

    interp.stack.pop(frame);
    interp.exit_call();

    match result {
        Ok(value) => Ok(match value.data() {
            Data::Return(_) => value.into_returned(),
            Data::Break | Data::Continue => Value::none(),
            _ => value,
        }),
        Err(e) => Err(e.in_frame(&function.name)),
    }
}

fn run(interp: &mut Interpreter, function: &CustomFunction, bound: call::Bound) -> Result<Value> {
    let file = function.origin.filename().to_string();
    for (param, slot) in function.params.iter().zip(bound.slots) {
        let value = match (slot, &param.default) {
            (Some(value), _) => value,
            (None, Some(default)) => expr::evaluate_text(interp, &function.origin, default)?,
            (None, None) => {
                return Err(ScriptError::arguments(
                    &function.name,
                    format!("missing argument '{}'", param.name),
                ))
            }
        };
        interp.define_local(&param.name, Handler::Variable(value), &file);
    }
    for (name, value) in bound.extras {
        interp.define_local(&name, Handler::Variable(value), &file);
    }

    let mut body = function.origin.child(&function.body);
    block::run(interp, &mut body)
}

/// Make `this`, the instance fields and the class methods visible in the
/// new frame. Returns the seeded field values.
fn seed_method(interp: &mut Interpreter, this: &Value) -> IndexMap<String, Value> {
    let Some(instance) = this.as_object().and_then(|o| o.as_instance()).cloned() else {
        return IndexMap::new();
    };
    let (fields, class) = {
        let guard = instance.lock();
        (guard.fields.clone(), guard.class.clone())
    };
    let Some(frame) = interp.stack.active_mut() else {
        return IndexMap::new();
    };
    for (name, method) in &class.methods {
        frame.define(name.as_str(), Handler::Custom(method.clone()));
    }
    for (name, value) in &fields {
        frame.define(name.as_str(), Handler::Variable(value.clone()));
    }
    frame.define("this", Handler::Variable(this.clone()));
    fields
}

/// Copy fields changed as locals back into the instance. Parameters
/// shadowing a field are not fields.
fn write_back(interp: &Interpreter, this: &Value, seeded: &IndexMap<String, Value>, params: &[Param]) {
    let Some(instance) = this.as_object().and_then(|o| o.as_instance()) else {
        return;
    };
    let Some(frame) = interp.stack.active() else {
        return;
    };
    let mut guard = instance.lock();
    for (name, before) in seeded {
        if params.iter().any(|p| &p.name == name) {
            continue;
        }
        if let Some(Handler::Variable(now)) = frame.get(name) {
            if now != before {
                guard.fields.insert(name.clone(), now.clone());
            }
        }
    }
}
