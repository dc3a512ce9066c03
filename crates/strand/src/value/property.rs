//! Ad-hoc fields, computed properties and the universal pseudo-properties

use indexmap::IndexMap;

use super::{ArrayData, Data, Value};
use crate::error::{Result, ScriptError};

/// How a computed property produces or consumes its value.
#[derive(Debug, Clone, PartialEq)]
pub enum Accessor {
    /// Call the named script function (the setter receives the new value)
    Function(String),

    /// Evaluate a raw expression (the setter sees the new value as `value`)
    Expression(String),
}

/// Getter/setter pair bound to one property name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Computed {
    /// Produces the property's value
    pub getter: Option<Accessor>,

    /// Receives assignments to the property
    pub setter: Option<Accessor>,
}

/// Per-value property storage.
#[derive(Clone, Default)]
pub struct Properties {
    fields: IndexMap<String, Value>,
    computed: IndexMap<String, Computed>,
}

impl Properties {
    /// Field stored under `name`.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Store a field.
    pub fn set_field(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    /// Field names in insertion order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Fields in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Computed binding for `name`.
    pub fn computed(&self, name: &str) -> Option<&Computed> {
        self.computed.get(name)
    }

    /// Bind a computed property.
    pub fn bind(&mut self, name: impl Into<String>, computed: Computed) {
        self.computed.insert(name.into(), computed);
    }

    pub(crate) fn deep_clone(&self) -> Self {
        Self {
            fields: self
                .fields
                .iter()
                .map(|(k, v)| (k.clone(), v.deep_clone()))
                .collect(),
            computed: self.computed.clone(),
        }
    }
}

/// Methods that change their receiver and must be written back.
const MUTATING_METHODS: &[&str] = &["add", "insert", "remove", "removeat", "clear"];

impl Value {
    // ═══════════════════════════════════════════════════════════════════
    // Property Map
    // ═══════════════════════════════════════════════════════════════════

    /// The computed getter bound to `name`.
    pub fn getter(&self, name: &str) -> Option<&Accessor> {
        self.properties()?.computed(name)?.getter.as_ref()
    }

    /// The computed setter bound to `name`.
    pub fn setter(&self, name: &str) -> Option<&Accessor> {
        self.properties()?.computed(name)?.setter.as_ref()
    }

    /// Ad-hoc field `name`.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.properties()?.field(name)
    }

    /// Store an ad-hoc field.
    pub fn set_field(&mut self, name: impl Into<String>, value: Value) {
        self.properties_mut().set_field(name, value);
    }

    /// Bind a computed property (builder pattern).
    pub fn with_computed(mut self, name: impl Into<String>, computed: Computed) -> Self {
        self.properties_mut().bind(name, computed);
        self
    }

    // ═══════════════════════════════════════════════════════════════════
    // Universal Pseudo-Properties
    // ═══════════════════════════════════════════════════════════════════

    /// Evaluate a built-in pseudo-property (case-insensitive).
    ///
    /// Returns `None` when `name` is not a pseudo-property of this value.
    pub fn builtin_property(&self, name: &str) -> Option<Value> {
        let name = name.to_ascii_lowercase();
        let value = match (name.as_str(), self.data()) {
            ("type", _) => Value::string(self.type_name()),
            ("string", _) => Value::string(self.as_string()),
            ("properties", _) => Value::array(
                self.properties()
                    .map(|p| p.field_names().map(Value::string).collect())
                    .unwrap_or_default(),
            ),
            ("size" | "length", _) => Value::number(self.size()? as f64),
            ("empty", _) => Value::boolean(self.size()? == 0),

            ("keys", Data::Array(a)) if a.is_map() => {
                Value::array(a.keys().map(Value::string).collect())
            }
            ("keys", Data::Array(a)) => {
                Value::array((0..a.len()).map(|i| Value::number(i as f64)).collect())
            }
            ("keys", Data::Enum(e)) => {
                Value::array(e.entries.keys().map(Value::string).collect())
            }
            ("values", Data::Array(a)) => Value::array(a.items().to_vec()),
            ("values", Data::Enum(e)) => Value::array(
                e.entries.values().map(|v| Value::number(*v as f64)).collect(),
            ),

            ("first", Data::Array(a)) => a.items().first().cloned().unwrap_or_default(),
            ("last", Data::Array(a)) => a.items().last().cloned().unwrap_or_default(),
            ("first", Data::Str(s)) => s.chars().next().map(Value::from).unwrap_or_default(),
            ("last", Data::Str(s)) => s.chars().last().map(Value::from).unwrap_or_default(),

            ("upper", Data::Str(s)) => Value::string(s.to_uppercase()),
            ("lower", Data::Str(s)) => Value::string(s.to_lowercase()),
            ("trim", Data::Str(s)) => Value::string(s.trim()),

            ("reverse", Data::Str(s)) => Value::string(s.chars().rev().collect::<String>()),
            ("reverse", Data::Array(a)) => {
                Value::array(a.items().iter().rev().cloned().collect())
            }
            ("sort", Data::Array(a)) => {
                let mut items = a.items().to_vec();
                items.sort_by(Value::compare);
                Value::array(items)
            }
            _ => return None,
        };
        Some(value)
    }

    /// Element count, char count or entry count, where meaningful.
    pub fn size(&self) -> Option<usize> {
        match self.data() {
            Data::Array(a) => Some(a.len()),
            Data::Str(s) => Some(s.chars().count()),
            Data::Bytes(b) => Some(b.len()),
            Data::Enum(e) => Some(e.entries.len()),
            Data::None | Data::Undefined => Some(0),
            _ => None,
        }
    }

    /// Check if `name` is a built-in method that modifies its receiver.
    pub fn is_mutating_method(name: &str) -> bool {
        MUTATING_METHODS.contains(&name.to_ascii_lowercase().as_str())
    }

    /// Call a built-in method that leaves the receiver unchanged.
    ///
    /// Returns `Ok(None)` when `name` is not such a method for this value.
    pub fn builtin_method(&self, name: &str, args: &[Value]) -> Result<Option<Value>> {
        let name = name.to_ascii_lowercase();
        let arg = |i: usize| args.get(i).cloned().unwrap_or_default();

        let value = match (name.as_str(), self.data()) {
            ("contains", Data::Str(s)) => Value::boolean(s.contains(arg(0).as_string().as_str())),
            ("contains", Data::Array(a)) => {
                let needle = arg(0);
                let by_key = a.is_map() && a.contains_key(&needle.as_string());
                Value::boolean(by_key || a.items().iter().any(|v| *v == needle))
            }
            ("replace", Data::Str(s)) => {
                Value::string(s.replace(arg(0).as_string().as_str(), arg(1).as_string().as_str()))
            }
            ("indexof", Data::Str(s)) => {
                let needle = arg(0).as_string();
                let index = s
                    .find(needle.as_str())
                    .map(|byte| s[..byte].chars().count() as f64)
                    .unwrap_or(-1.0);
                Value::number(index)
            }
            ("indexof", Data::Array(a)) => {
                let needle = arg(0);
                let index = a.items().iter().position(|v| *v == needle);
                Value::number(index.map_or(-1.0, |i| i as f64))
            }
            ("substring", Data::Str(s)) => {
                let from = arg(0).as_number().max(0.0) as usize;
                let chars = s.chars().skip(from);
                let text: String = match args.get(1) {
                    Some(len) => chars.take(len.as_number().max(0.0) as usize).collect(),
                    None => chars.collect(),
                };
                Value::string(text)
            }
            ("split", Data::Str(s)) => {
                let sep = args.get(0).map(Value::as_string).unwrap_or_else(|| " ".to_string());
                let parts: Vec<Value> = if sep.is_empty() {
                    s.chars().map(Value::from).collect()
                } else {
                    s.split(sep.as_str()).map(Value::string).collect()
                };
                Value::array(parts)
            }
            ("join", Data::Array(a)) => {
                let sep = args.get(0).map(Value::as_string).unwrap_or_default();
                Value::string(
                    a.items()
                        .iter()
                        .map(Value::as_string)
                        .collect::<Vec<_>>()
                        .join(&sep),
                )
            }
            ("at", Data::Array(a)) => {
                let index = arg(0);
                match index.data() {
                    Data::Str(key) => a.get_key(key).cloned().unwrap_or_default(),
                    _ => a.get(index.as_index()?).cloned().unwrap_or_default(),
                }
            }
            ("at", Data::Str(s)) => s
                .chars()
                .nth(arg(0).as_index()?)
                .map(Value::from)
                .unwrap_or_default(),
            _ => return Ok(None),
        };
        Ok(Some(value))
    }

    /// Call a built-in method that modifies this value in place.
    ///
    /// Returns `Ok(None)` when `name` is not such a method for this value.
    pub fn mutating_method(&mut self, name: &str, args: &[Value]) -> Result<Option<Value>> {
        let name = name.to_ascii_lowercase();
        if matches!(self.data(), Data::None | Data::Undefined) && name == "add" {
            *self = Value::array(Vec::new());
        }
        let type_name = self.type_name();
        let Some(array) = self.array_mut() else {
            return Ok(None);
        };
        let arg = |i: usize| args.get(i).cloned().unwrap_or_default();

        let result = match name.as_str() {
            "add" => {
                for value in args {
                    array.push(value.deep_clone());
                }
                Value::number(array.len() as f64)
            }
            "insert" => {
                array.insert_at(arg(0).as_index()?, arg(1).deep_clone());
                Value::number(array.len() as f64)
            }
            "remove" => {
                let target = arg(0);
                let removed = match target.data() {
                    Data::Str(key) if array.contains_key(key) => array.remove_key(key),
                    _ => {
                        let position = array.items().iter().position(|v| *v == target);
                        position.and_then(|p| array.remove_at(p))
                    }
                };
                Value::boolean(removed.is_some())
            }
            "removeat" => {
                let removed = array.remove_at(arg(0).as_index()?);
                removed.unwrap_or_default()
            }
            "clear" => {
                array.clear();
                Value::none()
            }
            _ => {
                return Err(ScriptError::type_mismatch(
                    format!("a receiver supporting {}", name),
                    type_name,
                ))
            }
        };
        Ok(Some(result))
    }

    /// Mutable access to the backing array, if this value has one.
    pub fn array_mut(&mut self) -> Option<&mut ArrayData> {
        match self.data_mut() {
            Data::Array(a) => Some(std::sync::Arc::make_mut(a)),
            _ => None,
        }
    }
}
