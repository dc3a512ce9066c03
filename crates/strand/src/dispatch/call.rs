//! Call arguments and parameter binding

use crate::cursor::{split_top_level, Script};
use crate::error::{Result, ScriptError};
use crate::eval::expr;
use crate::handler::BuiltinFn;
use crate::interpreter::Interpreter;
use crate::normalizer::is_ident_char;
use crate::value::Value;

use super::function::Param;

/// One evaluated call argument.
#[derive(Debug, Clone)]
pub struct Arg {
    /// Explicit `name=` tag, for named arguments
    pub name: Option<String>,

    /// The argument expression as written
    pub source: String,

    /// Its value
    pub value: Value,
}

impl Arg {
    /// A positional argument with no source text.
    pub fn positional(value: Value) -> Self {
        Self {
            name: None,
            source: String::new(),
            value,
        }
    }
}

/// Check if `text` is a plain identifier.
pub(crate) fn is_identifier(text: &str) -> bool {
    text.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_')
        && text.chars().all(is_ident_char)
}

/// Split a `name=expr` argument into its tag and expression.
fn split_named(part: &str) -> (Option<String>, &str) {
    let end = part.find(|c: char| !is_ident_char(c)).unwrap_or(part.len());
    let (name, rest) = part.split_at(end);
    if is_identifier(name) && rest.starts_with('=') && !rest.starts_with("==") {
        (Some(name.to_string()), &rest[1..])
    } else {
        (None, part)
    }
}

/// Read and evaluate the `( ... )` argument list under the cursor.
///
/// A call written without parentheses has no arguments.
pub fn read_args(interp: &mut Interpreter, script: &mut Script) -> Result<Vec<Arg>> {
    script.skip_spaces();
    if script.current() != Some('(') {
        return Ok(Vec::new());
    }
    let text = script.read_balanced('(', ')')?;
    let mut args = Vec::new();
    for part in split_top_level(&text, ',') {
        let (name, source) = split_named(&part);
        let value = expr::evaluate_text(interp, script, source)?;
        args.push(Arg {
            name,
            source: source.to_string(),
            value,
        });
    }
    Ok(args)
}

/// Read the argument list and keep only the values.
pub fn read_values(interp: &mut Interpreter, script: &mut Script) -> Result<Vec<Value>> {
    Ok(read_args(interp, script)?
        .into_iter()
        .map(|arg| arg.value)
        .collect())
}

/// Invoke a native after checking its arity.
pub fn call_native(
    interp: &mut Interpreter,
    script: &Script,
    native: &BuiltinFn,
    args: &[Value],
) -> Result<Value> {
    if native.arity >= 0 && args.len() != native.arity as usize {
        return Err(ScriptError::arguments(
            &native.name,
            format!("expected {} arguments, got {}", native.arity, args.len()),
        ));
    }
    (native.func)(interp, script, args)
}

/// Arguments matched to a callee's parameters.
#[derive(Debug, Default)]
pub(crate) struct Bound {
    /// One slot per declared parameter; `None` falls back to the default
    pub slots: Vec<Option<Value>>,

    /// Surplus and unmatched named arguments, bound as extra locals
    pub extras: Vec<(String, Value)>,
}

/// Match `args` to `params`.
///
/// Positional arguments fill parameters in order; once a `name=` argument
/// appears, every later argument must be named too. Surplus positionals are
/// kept under their own identifier (or `_argN`), named arguments matching
/// no parameter under their tag. An undefined value leaves its slot to the
/// default.
///
/// # Errors
///
/// `ArgumentMismatch` for a positional argument after a named one, a
/// parameter bound twice, or a parameter with neither value nor default.
pub(crate) fn bind(function: &str, params: &[Param], args: Vec<Arg>) -> Result<Bound> {
    let mut bound = Bound {
        slots: vec![None; params.len()],
        extras: Vec::new(),
    };
    let mut named = false;

    for (i, arg) in args.into_iter().enumerate() {
        let value = (!arg.value.is_undefined()).then_some(arg.value);
        match arg.name {
            Some(name) => {
                named = true;
                match params.iter().position(|p| p.name == name) {
                    Some(p) if bound.slots[p].is_some() => {
                        return Err(ScriptError::arguments(
                            function,
                            format!("parameter '{}' is bound twice", name),
                        ));
                    }
                    Some(p) => bound.slots[p] = value,
                    None => bound.extras.push((name, value.unwrap_or_default())),
                }
            }
            None if named => {
                return Err(ScriptError::arguments(
                    function,
                    format!("positional argument {} follows named arguments", i + 1),
                ));
            }
            None if i < params.len() => bound.slots[i] = value,
            None => {
                let key = if is_identifier(&arg.source) {
                    arg.source
                } else {
                    format!("_arg{}", i)
                };
                bound.extras.push((key, value.unwrap_or_default()));
            }
        }
    }

    for (param, slot) in params.iter().zip(&bound.slots) {
        if slot.is_none() && param.default.is_none() {
            return Err(ScriptError::arguments(
                function,
                format!("missing argument '{}'", param.name),
            ));
        }
    }
    Ok(bound)
}
