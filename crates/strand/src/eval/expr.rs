//! Expression evaluation by precedence climbing
//!
//! Operators by increasing precedence:
//!
//! | Level | Operators |
//! |---|---|
//! | 0 | `\|\|` |
//! | 1 | `&&` |
//! | 2 | `==` `!=` |
//! | 3 | `<` `<=` `>` `>=` |
//! | 4 | `+` `-` |
//! | 5 | `*` `/` `%` |
//!
//! followed by unary `!` and `-`, then postfix `[i]`, `.prop` and
//! `.method(args)`. The right operand of a short-circuited `&&` or `||` is
//! skipped, not evaluated.

use std::cmp::Ordering;

use crate::cursor::Script;
use crate::dispatch::{call, function, Arg};
use crate::error::{ErrorKind, Result, ScriptError};
use crate::handler::Handler;
use crate::interpreter::Interpreter;
use crate::scope::FrameKind;
use crate::stack::ensure_sufficient_stack;
use crate::value::{Accessor, Data, Value};

use super::assign::{self, Place, Segment};
use super::literal;
use super::Evaluate;

const LEVELS: &[&[&str]] = &[
    &["||"],
    &["&&"],
    &["==", "!="],
    &["<=", ">=", "<", ">"],
    &["+", "-"],
    &["*", "/", "%"],
];

/// Evaluate one expression at the cursor, stopping at the first token that
/// cannot continue it (`;`, `,`, `:` or a closing bracket).
pub fn evaluate(interp: &mut Interpreter, script: &mut Script) -> Result<Value> {
    parse_level(interp, script, 0)
}

/// Evaluate the whole cursor as one expression.
pub fn evaluate_all(interp: &mut Interpreter, script: &mut Script) -> Result<Value> {
    let value = evaluate(interp, script)?;
    script.skip_spaces();
    match script.current() {
        None => Ok(value),
        Some(c) => Err(script.syntax_error(format!("unexpected '{}' in expression", c))),
    }
}

/// Evaluate `text` through a cursor derived from `origin`.
pub fn evaluate_text(interp: &mut Interpreter, origin: &Script, text: &str) -> Result<Value> {
    let mut child = origin.child(text);
    evaluate_all(interp, &mut child)
}

// ═══════════════════════════════════════════════════════════════════════
// Operators
// ═══════════════════════════════════════════════════════════════════════

fn match_operator(script: &Script, operators: &[&'static str]) -> Option<&'static str> {
    let op = operators.iter().copied().find(|op| script.starts_with(op))?;
    let after = script.peek(op.len());
    let compound = match op {
        "+" | "-" => after == Some('=') || after == op.chars().next(),
        "*" | "/" | "%" => after == Some('='),
        _ => false,
    };
    (!compound).then_some(op)
}

fn parse_level(interp: &mut Interpreter, script: &mut Script, level: usize) -> Result<Value> {
    if level == LEVELS.len() {
        return parse_unary(interp, script);
    }
    let mut left = parse_level(interp, script, level + 1)?;
    loop {
        script.skip_spaces();
        let Some(op) = match_operator(script, LEVELS[level]) else {
            return Ok(left);
        };
        script.advance_by(op.len());
        left = match op {
            "||" if left.as_bool() => {
                script.skip_operand(&["||"]);
                Value::boolean(true)
            }
            "&&" if !left.as_bool() => {
                script.skip_operand(&["&&", "||"]);
                Value::boolean(false)
            }
            "||" | "&&" => Value::boolean(parse_level(interp, script, level + 1)?.as_bool()),
            _ => {
                let right = parse_level(interp, script, level + 1)?;
                binary(op, &left, &right)?
            }
        };
    }
}

/// Apply a binary operator.
///
/// `+` concatenates when either side is a string; the other arithmetic
/// operators require numbers. Comparisons follow [`Value::compare`].
pub fn binary(op: &str, left: &Value, right: &Value) -> Result<Value> {
    let value = match op {
        "==" => Value::boolean(left == right),
        "!=" => Value::boolean(left != right),
        "<" => Value::boolean(left.compare(right) == Ordering::Less),
        "<=" => Value::boolean(left.compare(right) != Ordering::Greater),
        ">" => Value::boolean(left.compare(right) == Ordering::Greater),
        ">=" => Value::boolean(left.compare(right) != Ordering::Less),
        "+" if left.is_string() || right.is_string() => {
            Value::string(format!("{}{}", left.as_string(), right.as_string()))
        }
        _ => {
            let (Data::Number(a), Data::Number(b)) = (left.data(), right.data()) else {
                return Err(ScriptError::type_mismatch(
                    format!("numbers for '{}'", op),
                    format!("{} and {}", left.type_name(), right.type_name()),
                ));
            };
            let n = match op {
                "+" => a + b,
                "-" => a - b,
                "*" => a * b,
                "/" => a / b,
                "%" => a % b,
                other => return Err(ScriptError::syntax(format!("unknown operator '{}'", other), 0)),
            };
            Value::number(n)
        }
    };
    Ok(value)
}

fn parse_unary(interp: &mut Interpreter, script: &mut Script) -> Result<Value> {
    ensure_sufficient_stack(|| unary_inner(interp, script))
}

fn unary_inner(interp: &mut Interpreter, script: &mut Script) -> Result<Value> {
    script.skip_spaces();
    match (script.current(), script.peek(1)) {
        (Some('!'), next) if next != Some('=') => {
            script.advance();
            let value = parse_unary(interp, script)?;
            Ok(Value::boolean(!value.as_bool()))
        }
        (Some('-'), next) if !matches!(next, Some('-' | '=')) => {
            script.advance();
            let value = parse_unary(interp, script)?;
            match value.data() {
                Data::Number(n) => Ok(Value::number(-n)),
                _ => Err(ScriptError::type_mismatch("a number to negate", value.type_name())),
            }
        }
        _ => parse_postfix(interp, script),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Operands
// ═══════════════════════════════════════════════════════════════════════

fn starts_ident(c: Option<char>) -> bool {
    c.is_some_and(|c| c.is_alphabetic() || c == '_')
}

fn parse_postfix(interp: &mut Interpreter, script: &mut Script) -> Result<Value> {
    let (mut value, mut place) = parse_primary(interp, script)?;
    loop {
        match script.current() {
            Some('[') => {
                let text = script.read_balanced('[', ']')?;
                let index = evaluate_text(interp, script, &text)?;
                value = index_value(&value, &index)?;
                if let Some(place) = place.as_mut() {
                    place.segments.push(Segment::Index(index));
                }
            }
            Some('.') if starts_ident(script.peek(1)) => {
                script.advance();
                let name = script.read_token();
                if script.current() == Some('(') {
                    let args = call::read_args(interp, script)?;
                    value = call_method(interp, script, value, place.take(), &name, args)?;
                } else {
                    value = get_property(interp, script, &value, &name)?;
                    if let Some(place) = place.as_mut() {
                        place.segments.push(Segment::Property(name));
                    }
                }
            }
            _ => return Ok(value),
        }
    }
}

fn parse_primary(interp: &mut Interpreter, script: &mut Script) -> Result<(Value, Option<Place>)> {
    script.skip_spaces();
    let Some(c) = script.current() else {
        return Err(script.syntax_error("expected an expression"));
    };
    let value = match c {
        '(' => {
            let text = script.read_balanced('(', ')')?;
            evaluate_text(interp, script, &text)?
        }
        '"' => Value::string(literal::read_string(script)?),
        '[' => literal::array(interp, script)?,
        '{' => literal::map(interp, script)?,
        c if c.is_ascii_digit() => Value::number(literal::read_number(script)?),
        '.' if script.peek(1).is_some_and(|c| c.is_ascii_digit()) => {
            Value::number(literal::read_number(script)?)
        }
        c if starts_ident(Some(c)) => return name(interp, script),
        other => return Err(script.syntax_error(format!("unexpected '{}'", other))),
    };
    Ok((value, None))
}

fn name(interp: &mut Interpreter, script: &mut Script) -> Result<(Value, Option<Place>)> {
    let mut name = script.read_token();
    match name.as_str() {
        "true" => return Ok((Value::boolean(true), None)),
        "false" => return Ok((Value::boolean(false), None)),
        "null" => return Ok((Value::none(), None)),
        _ => {}
    }
    while script.current() == Some('.') && interp.is_namespace(&name) {
        script.advance();
        name = format!("{}.{}", name, script.read_token());
    }

    match interp.resolve(&name, script.filename()) {
        Some(Handler::Variable(value)) => Ok((value, Some(Place::new(name)))),
        Some(handler) => Ok((handler.eval(interp, script)?, None)),
        None => Err(ScriptError::unknown(name)),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Indexing, Properties and Methods
// ═══════════════════════════════════════════════════════════════════════

/// Read `value[index]`.
///
/// Arrays take a position or, with a string, a key; reading past the end
/// yields `None` without growing the array. Strings yield a character and
/// enums map a number back to its entry name.
pub fn index_value(value: &Value, index: &Value) -> Result<Value> {
    match value.data() {
        Data::Array(array) => Ok(match index.data() {
            Data::Str(key) => array.get_key(key).cloned().unwrap_or_else(Value::none),
            _ => array.get(index.as_index()?).cloned().unwrap_or_else(Value::none),
        }),
        Data::Str(s) => Ok(s
            .chars()
            .nth(index.as_index()?)
            .map(Value::from)
            .unwrap_or_else(Value::none)),
        Data::Enum(e) => match index.data() {
            Data::Str(key) => e
                .value_of(key)
                .map(|n| Value::number(n as f64))
                .ok_or_else(|| ScriptError::unknown(format!("{}.{}", e.name, key))),
            _ => {
                let n = index.as_number() as i64;
                e.name_of(n)
                    .map(Value::string)
                    .ok_or_else(|| ScriptError::unknown(format!("{}[{}]", e.name, n)))
            }
        },
        _ => Err(ScriptError::type_mismatch("an indexable value", value.type_name())),
    }
}

/// Read property `name` of `value`.
///
/// Lookup order: computed getter, ad-hoc field, instance field or host
/// property, enum entry, map key, then the universal pseudo-properties.
pub fn get_property(interp: &mut Interpreter, script: &Script, value: &Value, name: &str) -> Result<Value> {
    if let Some(accessor) = value.getter(name).cloned() {
        return run_accessor(interp, script, value, &accessor, None);
    }
    if let Some(field) = value.field(name) {
        return Ok(field.clone());
    }
    match value.data() {
        Data::Object(handle) => match handle.as_instance() {
            Some(instance) => {
                if let Some(field) = instance.lock().fields.get(name) {
                    return Ok(field.clone());
                }
            }
            None => {
                let getter = interp.shared.objects.read().getter(handle.type_tag(), name);
                if let Some(get) = getter {
                    return get(handle);
                }
            }
        },
        Data::Enum(e) => {
            if let Some(n) = e.value_of(name) {
                return Ok(Value::number(n as f64));
            }
        }
        Data::Array(array) if array.is_map() => {
            if let Some(item) = array.get_key(name) {
                return Ok(item.clone());
            }
        }
        _ => {}
    }
    value
        .builtin_property(name)
        .ok_or_else(|| ScriptError::unknown(format!("{}.{}", value.type_name(), name)))
}

/// Run a computed-property accessor on `receiver`.
///
/// A function accessor is called with the receiver (and the assigned value,
/// for setters). An expression accessor runs in a fresh frame where `this`
/// is the receiver and `value` the assigned value.
pub fn run_accessor(
    interp: &mut Interpreter,
    script: &Script,
    receiver: &Value,
    accessor: &Accessor,
    assigned: Option<Value>,
) -> Result<Value> {
    match accessor {
        Accessor::Function(name) => {
            let mut args = vec![receiver.clone()];
            args.extend(assigned);
            match interp.resolve(name, script.filename()) {
                Some(Handler::Custom(custom)) => {
                    let args = args.into_iter().map(Arg::positional).collect();
                    function::call(interp, &custom, args, None)
                }
                Some(Handler::Native(native)) => call::call_native(interp, script, &native, &args),
                _ => Err(ScriptError::unknown(name.clone())),
            }
        }
        Accessor::Expression(text) => {
            let frame = interp.stack.push(FrameKind::Call {
                function: "property".to_string(),
                namespace: None,
            });
            if let Some(active) = interp.stack.active_mut() {
                active.define("this", Handler::Variable(receiver.clone()));
                active.define("value", Handler::Variable(assigned.unwrap_or_default()));
            }
            let result = evaluate_text(interp, script, text);
            interp.stack.pop(frame);
            result
        }
    }
}

/// Call method `name` on `receiver`.
///
/// Class methods run with `this` bound; host methods come from the object
/// registry; mutating built-ins write the updated receiver back to `place`.
pub fn call_method(
    interp: &mut Interpreter,
    script: &Script,
    receiver: Value,
    place: Option<Place>,
    name: &str,
    args: Vec<Arg>,
) -> Result<Value> {
    if let Data::Object(handle) = receiver.data() {
        match handle.as_instance() {
            Some(instance) => {
                let method = instance.lock().class.methods.get(name).cloned();
                if let Some(method) = method {
                    return function::call(interp, &method, args, Some(&receiver));
                }
            }
            None => {
                let values: Vec<Value> = args.iter().map(|a| a.value.clone()).collect();
                let method = interp
                    .shared
                    .objects
                    .read()
                    .method(handle.type_tag(), name, values.len());
                if let Some(method) = method {
                    return method(handle, &values);
                }
            }
        }
    }

    let values: Vec<Value> = args.into_iter().map(|a| a.value).collect();
    if Value::is_mutating_method(name) {
        let mut target = receiver;
        if let Some(result) = target.mutating_method(name, &values)? {
            if let Some(place) = place {
                assign::store(interp, script, &place, target)?;
            }
            return Ok(result);
        }
        return Err(ScriptError::type_mismatch(
            format!("a receiver supporting {}", name),
            target.type_name(),
        ));
    }
    match receiver.builtin_method(name, &values)? {
        Some(result) => Ok(result),
        None => Err(ScriptError::unknown(format!("{}.{}", receiver.type_name(), name))),
    }
}

/// Check if an error only says a property is missing.
pub(crate) fn is_missing(error: &ScriptError) -> bool {
    error.kind() == ErrorKind::UnknownSymbol
}
