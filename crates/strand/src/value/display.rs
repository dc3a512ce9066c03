//! Display and Debug implementations for Value

use std::fmt;

use super::*;

/// Render a number the way scripts see it: whole numbers without a fraction.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Date-time text form, also used by the marshal format.
pub(crate) const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.data() {
            Data::Undefined => write!(f, "undefined"),
            Data::None => write!(f, "null"),
            Data::Number(n) => write!(f, "{}", format_number(*n)),
            Data::Str(s) => write!(f, "{}", s),
            Data::Bytes(b) => {
                for byte in b.iter() {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            Data::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),

            Data::Array(a) if a.is_map() => {
                write!(f, "{{")?;
                for (i, key) in a.keys().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    let value = a.get_key(key).cloned().unwrap_or_default();
                    write!(f, "{}: ", key)?;
                    write_nested(f, &value)?;
                }
                write!(f, "}}")
            }
            Data::Array(a) => {
                write!(f, "[")?;
                for (i, item) in a.items().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write_nested(f, item)?;
                }
                write!(f, "]")
            }

            Data::Enum(e) => {
                write!(f, "{}{{", e.name)?;
                for (i, (name, value)) in e.entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                write!(f, "}}")
            }
            Data::Object(o) => write!(f, "<{}>", o.type_tag()),

            Data::Break => write!(f, "break"),
            Data::Continue => write!(f, "continue"),
            Data::Return(inner) => write!(f, "{}", inner),
            Data::Quit(code) => write!(f, "quit({})", code),
        }
    }
}

/// Elements inside a collection quote their strings.
fn write_nested(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value.data() {
        Data::Str(s) => write!(f, "{:?}", s.as_str()),
        _ => write!(f, "{}", value),
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.data() {
            Data::Str(s) => write!(f, "{:?}", s.as_str())?,
            Data::Bytes(b) => write!(f, "b{:?}", b.as_slice())?,
            Data::Return(inner) => write!(f, "return {:?}", inner)?,
            _ => write!(f, "{}", self)?,
        }
        if let Some(props) = self.properties() {
            let names: Vec<&str> = props.field_names().collect();
            if !names.is_empty() {
                write!(f, " +{:?}", names)?;
            }
        }
        Ok(())
    }
}
