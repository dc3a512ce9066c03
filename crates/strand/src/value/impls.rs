//! Value trait implementations: constructors, predicates, coercions, From traits, PartialEq

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::NaiveDateTime;

use super::*;
use crate::error::{Result, ScriptError};

// ═══════════════════════════════════════════════════════════════════
// Convenience Constructors
// ═══════════════════════════════════════════════════════════════════

impl Value {
    /// Create a number value
    pub fn number(n: f64) -> Self {
        Value::new(Data::Number(n))
    }

    /// Create a boolean, stored as the number 1 or 0
    pub fn boolean(b: bool) -> Self {
        Value::number(if b { 1.0 } else { 0.0 })
    }

    /// Create a string value
    pub fn string(s: impl Into<String>) -> Self {
        Value::new(Data::Str(Arc::new(s.into())))
    }

    /// Create a byte string value
    pub fn bytes(b: impl Into<Vec<u8>>) -> Self {
        Value::new(Data::Bytes(Arc::new(b.into())))
    }

    /// Create a date-time value
    pub fn datetime(dt: NaiveDateTime) -> Self {
        Value::new(Data::DateTime(dt))
    }

    /// Create an array value
    pub fn array(items: Vec<Value>) -> Self {
        Value::new(Data::Array(Arc::new(ArrayData::new(items))))
    }

    /// Create an empty map value
    pub fn map() -> Self {
        Value::new(Data::Array(Arc::new(ArrayData::map())))
    }

    /// Create a map value from key/value pairs, keeping their order
    pub fn map_from<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        let mut data = ArrayData::map();
        for (key, value) in entries {
            data.insert_key(key, value);
        }
        Value::new(Data::Array(Arc::new(data)))
    }

    /// Create an enum value
    pub fn enumeration(e: EnumValue) -> Self {
        Value::new(Data::Enum(Arc::new(e)))
    }

    /// Create an object value
    pub fn object(handle: ObjectHandle) -> Self {
        Value::new(Data::Object(handle))
    }

    /// Create None
    pub fn none() -> Self {
        Value::new(Data::None)
    }

    /// Create Undefined
    pub fn undefined() -> Self {
        Value::new(Data::Undefined)
    }

    /// Create the `break` signal
    pub fn break_signal() -> Self {
        Value::new(Data::Break)
    }

    /// Create the `continue` signal
    pub fn continue_signal() -> Self {
        Value::new(Data::Continue)
    }

    /// Wrap a value in the `return` signal
    pub fn return_signal(value: Value) -> Self {
        Value::new(Data::Return(Box::new(value)))
    }

    /// Create the `quit` signal
    pub fn quit(code: i32) -> Self {
        Value::new(Data::Quit(code))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Type Predicates
    // ═══════════════════════════════════════════════════════════════════

    /// Check if value is None
    pub fn is_none(&self) -> bool {
        matches!(self.data(), Data::None)
    }

    /// Check if value is Undefined
    pub fn is_undefined(&self) -> bool {
        matches!(self.data(), Data::Undefined)
    }

    /// Check if value is None or Undefined
    pub fn is_nothing(&self) -> bool {
        matches!(self.data(), Data::None | Data::Undefined)
    }

    /// Check if value is a number
    pub fn is_number(&self) -> bool {
        matches!(self.data(), Data::Number(_))
    }

    /// Check if value is a string
    pub fn is_string(&self) -> bool {
        matches!(self.data(), Data::Str(_))
    }

    /// Check if value is an array or map
    pub fn is_array(&self) -> bool {
        matches!(self.data(), Data::Array(_))
    }

    /// Check if value is any control signal
    pub fn is_signal(&self) -> bool {
        matches!(
            self.data(),
            Data::Break | Data::Continue | Data::Return(_) | Data::Quit(_)
        )
    }

    /// Check if value is the `break` signal
    pub fn is_break(&self) -> bool {
        matches!(self.data(), Data::Break)
    }

    /// Check if value is the `continue` signal
    pub fn is_continue(&self) -> bool {
        matches!(self.data(), Data::Continue)
    }

    /// Check if value is the `return` signal
    pub fn is_return(&self) -> bool {
        matches!(self.data(), Data::Return(_))
    }

    /// Check if value is the `quit` signal
    pub fn is_quit(&self) -> bool {
        matches!(self.data(), Data::Quit(_))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Extractors
    // ═══════════════════════════════════════════════════════════════════

    /// Borrow the text of a string value
    pub fn as_str(&self) -> Option<&str> {
        match self.data() {
            Data::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Borrow the backing store of an array or map
    pub fn as_array(&self) -> Option<&ArrayData> {
        match self.data() {
            Data::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Borrow an enum
    pub fn as_enum(&self) -> Option<&EnumValue> {
        match self.data() {
            Data::Enum(e) => Some(e),
            _ => None,
        }
    }

    /// Borrow an object handle
    pub fn as_object(&self) -> Option<&ObjectHandle> {
        match self.data() {
            Data::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Exit code carried by a `quit` signal
    pub fn quit_code(&self) -> Option<i32> {
        match self.data() {
            Data::Quit(code) => Some(*code),
            _ => None,
        }
    }

    /// Clear the `return` flag, yielding the wrapped value
    pub fn into_returned(self) -> Value {
        match self.data {
            Data::Return(inner) => *inner,
            _ => self,
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Coercions
    // ═══════════════════════════════════════════════════════════════════

    /// The number this value denotes, if it denotes one
    pub fn try_number(&self) -> Option<f64> {
        match self.data() {
            Data::Number(n) => Some(*n),
            Data::Str(s) => parse_number(s),
            Data::Enum(_) | Data::Array(_) | Data::Object(_) => None,
            Data::Return(inner) => inner.try_number(),
            _ => None,
        }
    }

    /// Numeric coercion; values with no numeric reading yield 0
    pub fn as_number(&self) -> f64 {
        self.try_number().unwrap_or(0.0)
    }

    /// Textual coercion, locale-invariant
    pub fn as_string(&self) -> String {
        match self.data() {
            Data::Str(s) => s.as_ref().clone(),
            _ => self.to_string(),
        }
    }

    /// Truthiness: a non-zero number, or the string `"true"` in any case
    pub fn as_bool(&self) -> bool {
        match self.data() {
            Data::Number(n) => *n != 0.0,
            Data::Str(s) => s.eq_ignore_ascii_case("true"),
            Data::Return(inner) => inner.as_bool(),
            _ => false,
        }
    }

    /// Non-negative integer position
    pub fn as_index(&self) -> Result<usize> {
        match self.try_number() {
            Some(n) if n >= 0.0 && n.fract() == 0.0 => Ok(n as usize),
            _ => Err(ScriptError::type_mismatch(
                "a non-negative integer index",
                self.type_name(),
            )),
        }
    }

    /// Ordering used by comparison operators and `sort`.
    ///
    /// Two numbers compare numerically; anything else compares by string form.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self.data(), other.data()) {
            (Data::Number(a), Data::Number(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Data::DateTime(a), Data::DateTime(b)) => a.cmp(b),
            _ => self.as_string().cmp(&other.as_string()),
        }
    }

    /// Recursively duplicate nested collections and property maps.
    pub fn deep_clone(&self) -> Value {
        let data = match self.data() {
            Data::Array(a) => {
                let mut copy = ArrayData::clone(a);
                for item in copy.items_mut() {
                    *item = item.deep_clone();
                }
                Data::Array(Arc::new(copy))
            }
            Data::Return(inner) => Data::Return(Box::new(inner.deep_clone())),
            other => other.clone(),
        };
        let mut value = Value::new(data);
        if let Some(props) = self.properties() {
            *value.properties_mut() = props.deep_clone();
        }
        value
    }
}

/// Parse the numeric text of a string, rejecting words like `inf`.
pub(crate) fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    let first = text.chars().next()?;
    if !(first.is_ascii_digit() || matches!(first, '-' | '+' | '.')) {
        return None;
    }
    text.parse::<f64>().ok().filter(|n| n.is_finite())
}

// ═══════════════════════════════════════════════════════════════════
// PartialEq Implementation
// ═══════════════════════════════════════════════════════════════════

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self.data(), other.data()) {
            (Data::Undefined, Data::Undefined) => true,
            (Data::None, Data::None) => true,
            (Data::Number(a), Data::Number(b)) => a == b,
            (Data::Str(a), Data::Str(b)) => a == b,
            (Data::Bytes(a), Data::Bytes(b)) => a == b,
            (Data::DateTime(a), Data::DateTime(b)) => a == b,
            (Data::Array(a), Data::Array(b)) => {
                a.is_map() == b.is_map() && self.to_string() == other.to_string()
            }
            (Data::Enum(a), Data::Enum(b)) => a == b,
            (Data::Object(a), Data::Object(b)) => a.same_object(b),
            (Data::Break, Data::Break) => true,
            (Data::Continue, Data::Continue) => true,
            (Data::Return(a), Data::Return(b)) => a == b,
            (Data::Quit(a), Data::Quit(b)) => a == b,
            _ => false,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// From Implementations
// ═══════════════════════════════════════════════════════════════════

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::boolean(b)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::string(c.to_string())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::string(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}

impl From<Data> for Value {
    fn from(data: Data) -> Self {
        Value::new(data)
    }
}
