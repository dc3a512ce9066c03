//! Assignment targets and actions
//!
//! A target is a variable followed by any number of `[index]` and `.field`
//! segments:
//!
//! ```text
//! a = 1;  a[3] = 1;  m["k"].x += 2;  p.count++;
//! ```
//!
//! Writing through an index past the end of an array grows it, filling the
//! gap with `None`. Writing into `None` creates the array (or map, for a
//! string key) on the fly.

use crate::cursor::Script;
use crate::error::{Result, ScriptError};
use crate::handler::{Action, Handler};
use crate::interpreter::Interpreter;
use crate::value::{ArrayData, Data, Value};

use super::expr;

/// One evaluated step below a variable.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// `[index]`
    Index(Value),
    /// `.name`
    Property(String),
}

/// An assignable location.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    /// Root variable (possibly `NS.name`)
    pub name: String,
    /// Steps below the root
    pub segments: Vec<Segment>,
}

impl Place {
    /// A plain variable.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            segments: Vec::new(),
        }
    }
}

enum RawSegment {
    Index(String),
    Property(String),
}

/// A target as written, before its index expressions are evaluated.
pub(crate) struct RawPlace {
    name: String,
    segments: Vec<RawSegment>,
}

impl RawPlace {
    /// Evaluate the index expressions.
    pub(crate) fn evaluate(self, interp: &mut Interpreter, script: &Script) -> Result<Place> {
        let mut segments = Vec::with_capacity(self.segments.len());
        for segment in self.segments {
            segments.push(match segment {
                RawSegment::Index(text) => Segment::Index(expr::evaluate_text(interp, script, &text)?),
                RawSegment::Property(name) => Segment::Property(name),
            });
        }
        Ok(Place {
            name: self.name,
            segments,
        })
    }
}

/// Read an assignment target at the cursor without evaluating anything.
///
/// Returns `None` when the text is not a target (for instance a method
/// call such as `a.add(1)`).
pub(crate) fn read_place(interp: &Interpreter, script: &mut Script) -> Result<Option<RawPlace>> {
    script.skip_spaces();
    if !script.current().is_some_and(|c| c.is_alphabetic() || c == '_') {
        return Ok(None);
    }
    let mut name = script.read_token();
    while script.current() == Some('.') && interp.is_namespace(&name) {
        script.advance();
        name = format!("{}.{}", name, script.read_token());
    }

    let mut segments = Vec::new();
    loop {
        match script.current() {
            Some('[') => segments.push(RawSegment::Index(script.read_balanced('[', ']')?)),
            Some('.') if script.peek(1).is_some_and(|c| c.is_alphabetic() || c == '_') => {
                script.advance();
                let field = script.read_token();
                if script.current() == Some('(') {
                    return Ok(None);
                }
                segments.push(RawSegment::Property(field));
            }
            _ => return Ok(Some(RawPlace { name, segments })),
        }
    }
}

/// Read the current value at `place`.
pub fn load(interp: &mut Interpreter, script: &Script, place: &Place) -> Result<Value> {
    let mut value = interp.lookup(&place.name, script.filename())?;
    for segment in &place.segments {
        value = match segment {
            Segment::Index(index) => expr::index_value(&value, index)?,
            Segment::Property(name) => expr::get_property(interp, script, &value, name)?,
        };
    }
    Ok(value)
}

/// Write `value` to `place`.
///
/// An index-only path (`a[1]["k"] = v`) is checked first and then updated
/// in place under the symbol lock. Paths through properties may run
/// accessors, so they are applied to a copy of the root that is stored back
/// once every step succeeded. A failed write leaves the variable unchanged.
///
/// # Errors
///
/// `TypeMismatch` when `value` is a control signal, or when a segment
/// indexes something that is not an array.
pub fn store(interp: &mut Interpreter, script: &Script, place: &Place, value: Value) -> Result<()> {
    if value.is_signal() {
        return Err(ScriptError::type_mismatch("a storable value", value.type_name()));
    }
    let file = script.filename().to_string();
    if place.segments.is_empty() {
        interp.assign(&place.name, Handler::Variable(value), &file);
        return Ok(());
    }

    let resolved = interp.resolve(&place.name, &file);
    if let Some(other) = resolved.as_ref().filter(|h| h.as_value().is_none()) {
        return Err(ScriptError::type_mismatch(
            "a variable",
            format!("{:?}", other.capability()),
        ));
    }

    if place.segments.iter().all(|s| matches!(s, Segment::Index(_))) {
        return interp.update_variable(&place.name, &file, |root| {
            check_indexed(root, &place.segments)?;
            set_indexed(root, &place.segments, value)
        });
    }

    let mut root = resolved
        .and_then(|h| h.as_value().cloned())
        .unwrap_or_else(Value::none);
    set_in(interp, script, &mut root, &place.segments, value)?;
    interp.assign(&place.name, Handler::Variable(root), &file);
    Ok(())
}

/// The element `index` selects in `target`, creating the array (or map, for
/// a string key) when `target` is empty and growing it as needed.
fn index_slot<'a>(target: &'a mut Value, index: &Value) -> Result<&'a mut Value> {
    if target.is_nothing() {
        *target = match index.data() {
            Data::Str(_) => Value::map(),
            _ => Value::array(Vec::new()),
        };
    }
    let type_name = target.type_name();
    let array = target
        .array_mut()
        .ok_or_else(|| ScriptError::type_mismatch("an array to index", type_name))?;
    match index.data() {
        Data::Str(key) => Ok(array.key_slot_mut(key.as_str())),
        _ => array.slot_mut(index.as_index()?),
    }
}

/// Verify that an index-only path can be written without touching it.
fn check_indexed(target: &Value, segments: &[Segment]) -> Result<()> {
    let Some((Segment::Index(index), rest)) = segments.split_first() else {
        return Ok(());
    };
    let array = match target.data() {
        Data::None | Data::Undefined => None,
        Data::Array(array) => Some(array),
        _ => return Err(ScriptError::type_mismatch("an array to index", target.type_name())),
    };
    let next = match index.data() {
        Data::Str(key) => array.and_then(|a| a.get_key(key)),
        _ => {
            let position = index.as_index()?;
            if array.map_or(true, |a| position >= a.len()) {
                ArrayData::check_growth(position)?;
            }
            array.and_then(|a| a.get(position))
        }
    };
    match next {
        Some(inner) => check_indexed(inner, rest),
        None => check_indexed(&Value::none(), rest),
    }
}

fn set_indexed(target: &mut Value, segments: &[Segment], value: Value) -> Result<()> {
    match segments.split_first() {
        Some((Segment::Index(index), rest)) => set_indexed(index_slot(target, index)?, rest, value),
        _ => {
            *target = value;
            Ok(())
        }
    }
}

fn set_in(
    interp: &mut Interpreter,
    script: &Script,
    target: &mut Value,
    segments: &[Segment],
    value: Value,
) -> Result<()> {
    let Some((first, rest)) = segments.split_first() else {
        *target = value;
        return Ok(());
    };
    match first {
        Segment::Index(index) => set_in(interp, script, index_slot(target, index)?, rest, value),
        Segment::Property(name) => set_property(interp, script, target, name, rest, value),
    }
}

fn set_property(
    interp: &mut Interpreter,
    script: &Script,
    target: &mut Value,
    name: &str,
    rest: &[Segment],
    value: Value,
) -> Result<()> {
    if !rest.is_empty() {
        let mut inner = match expr::get_property(interp, script, target, name) {
            Ok(inner) => inner,
            Err(e) if expr::is_missing(&e) => Value::none(),
            Err(e) => return Err(e),
        };
        set_in(interp, script, &mut inner, rest, value)?;
        return set_property(interp, script, target, name, &[], inner);
    }

    if let Some(accessor) = target.setter(name).cloned() {
        expr::run_accessor(interp, script, target, &accessor, Some(value))?;
        return Ok(());
    }

    let mut map_key = false;
    match target.data() {
        Data::Object(handle) => match handle.as_instance() {
            Some(instance) => {
                instance.lock().fields.insert(name.to_string(), value);
                return Ok(());
            }
            None => {
                let setter = interp.shared.objects.read().setter(handle.type_tag(), name)?;
                if let Some(set) = setter {
                    return set(handle, value);
                }
            }
        },
        Data::Array(array) => map_key = array.is_map() && array.contains_key(name),
        _ => {}
    }

    if map_key {
        if let Some(array) = target.array_mut() {
            *array.key_slot_mut(name) = value;
            return Ok(());
        }
    }
    target.set_field(name, value);
    Ok(())
}

/// Apply `action` to `place`, reading its operand at the cursor.
///
/// The action token must already be consumed.
pub fn apply(interp: &mut Interpreter, script: &mut Script, place: &Place, action: &Action) -> Result<Value> {
    let operand = if action.takes_operand {
        expr::evaluate(interp, script)?
    } else {
        Value::none()
    };
    let current = if action.reads_target {
        load(interp, script, place)?
    } else {
        Value::none()
    };
    let value = (action.apply)(&current, &operand)?;
    store(interp, script, place, value.clone())?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script() -> Script {
        Script::from_source("", "t").unwrap()
    }

    #[test]
    fn test_index_write_grows_with_none_gaps() {
        let mut interp = Interpreter::new();
        let s = script();
        interp.set_variable("a", Value::array(vec![Value::number(1.0)]), "t", false);

        let mut place = Place::new("a");
        place.segments.push(Segment::Index(Value::number(3.0)));
        store(&mut interp, &s, &place, Value::number(9.0)).unwrap();

        let a = interp.get_variable("a", "t").unwrap();
        assert_eq!(a.size(), Some(4));
        assert_eq!(a.to_string(), "[1, null, null, 9]");
    }

    #[test]
    fn test_string_key_on_none_creates_map() {
        let mut interp = Interpreter::new();
        let s = script();
        let mut place = Place::new("m");
        place.segments.push(Segment::Index(Value::string("k")));
        store(&mut interp, &s, &place, Value::number(1.0)).unwrap();

        let m = interp.get_variable("m", "t").unwrap();
        assert!(m.as_array().is_some_and(|a| a.is_map()));
        assert_eq!(load(&mut interp, &s, &place).unwrap(), Value::number(1.0));
    }

    #[test]
    fn test_signals_are_not_stored() {
        let mut interp = Interpreter::new();
        let err = store(&mut interp, &script(), &Place::new("x"), Value::break_signal());
        assert!(err.is_err());
        assert!(interp.get_variable("x", "t").is_none());
    }
}
