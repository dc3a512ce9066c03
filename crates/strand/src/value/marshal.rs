//! Self-describing text serialization of values.
//!
//! Every element is written as `<name:TAG:payload>`. Scalars carry their text
//! in the payload; arrays and maps carry their elements as nested elements
//! (map elements are named by their key); enums and objects carry their name
//! followed by nested elements. `<`, `>`, `:` and `\` inside names and text
//! are escaped with a backslash.
//!
//! | Tag | Payload |
//! |-----|---------|
//! | `NUM` | number text |
//! | `STR` | string text |
//! | `BYT` | lowercase hex |
//! | `DAT` | `YYYY-MM-DD HH:MM:SS[.fff]` |
//! | `ARR` | elements |
//! | `MAP` | keyed elements |
//! | `ENU` | enum name, then one `NUM` element per entry |
//! | `OBJ` | type tag, then one element per field |
//! | `NON` | empty (`null` and `undefined`) |
//!
//! Elements without a name (array items, unkeyed positions of a map) leave
//! the name empty. A map entry whose key is the empty string is named by the
//! raw sequence `\0`, which escaping never produces.
//!
//! Objects cannot be rebuilt from text: they unmarshal to a map of their
//! fields with the type tag stored under `__type`.

use chrono::NaiveDateTime;

use super::display::{format_number, DATETIME_FORMAT};
use super::{ArrayData, Data, EnumValue, ObjectRef, Value};
use crate::error::{Result, ScriptError};

/// Key under which an unmarshalled object keeps its type tag.
pub const TYPE_KEY: &str = "__type";

/// Raw name of an element keyed by the empty string.
const EMPTY_KEY: &str = "\\0";

/// Serialize `value` as an unnamed element.
pub fn marshal(value: &Value) -> String {
    let mut out = String::new();
    write_element(&mut out, None, value);
    out
}

/// Rebuild a value from marshalled text.
pub fn unmarshal(text: &str) -> Result<Value> {
    let mut parser = Parser {
        chars: text.trim().chars().collect(),
        pos: 0,
    };
    let (_, value) = parser.element()?;
    if parser.pos < parser.chars.len() {
        return Err(parser.error("trailing text after element"));
    }
    Ok(value)
}

// ═══════════════════════════════════════════════════════════════════════
// Writing
// ═══════════════════════════════════════════════════════════════════════

fn write_element(out: &mut String, name: Option<&str>, value: &Value) {
    if let Data::Return(inner) = value.data() {
        return write_element(out, name, inner);
    }
    out.push('<');
    match name {
        Some("") => out.push_str(EMPTY_KEY),
        Some(name) => escape_into(out, name),
        None => {}
    }
    out.push(':');
    match value.data() {
        Data::Number(n) => {
            out.push_str("NUM:");
            escape_into(out, &format_number(*n));
        }
        Data::Str(s) => {
            out.push_str("STR:");
            escape_into(out, s);
        }
        Data::Bytes(b) => {
            out.push_str("BYT:");
            for byte in b.iter() {
                out.push_str(&format!("{:02x}", byte));
            }
        }
        Data::DateTime(dt) => {
            out.push_str("DAT:");
            escape_into(out, &dt.format(DATETIME_FORMAT).to_string());
        }
        Data::Array(a) if a.is_map() => {
            out.push_str("MAP:");
            for (position, item) in a.items().iter().enumerate() {
                write_element(out, a.key_of(position), item);
            }
        }
        Data::Array(a) => {
            out.push_str("ARR:");
            for item in a.items() {
                write_element(out, None, item);
            }
        }
        Data::Enum(e) => {
            out.push_str("ENU:");
            escape_into(out, &e.name);
            for (entry, number) in &e.entries {
                write_element(out, Some(entry.as_str()), &Value::number(*number as f64));
            }
        }
        Data::Object(o) => {
            out.push_str("OBJ:");
            escape_into(out, o.type_tag());
            if let ObjectRef::Instance(instance) = o.target() {
                let fields: Vec<(String, Value)> = instance
                    .lock()
                    .fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                for (field, item) in &fields {
                    write_element(out, Some(field.as_str()), item);
                }
            }
        }
        Data::Undefined
        | Data::None
        | Data::Return(_)
        | Data::Break
        | Data::Continue
        | Data::Quit(_) => {
            out.push_str("NON:");
        }
    }
    out.push('>');
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        if matches!(c, '<' | '>' | ':' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Reading
// ═══════════════════════════════════════════════════════════════════════

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn error(&self, message: &str) -> ScriptError {
        ScriptError::syntax(format!("malformed marshal text at {}: {}", self.pos, message), 0)
    }

    fn expect(&mut self, c: char) -> Result<()> {
        if self.chars.get(self.pos) == Some(&c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", c)))
        }
    }

    /// Read unescaped text up to (not including) one of `stops`.
    fn text(&mut self, stops: &[char]) -> Result<String> {
        let mut out = String::new();
        while let Some(&c) = self.chars.get(self.pos) {
            if c == '\\' {
                let escaped = self
                    .chars
                    .get(self.pos + 1)
                    .copied()
                    .ok_or_else(|| self.error("dangling escape"))?;
                out.push(escaped);
                self.pos += 2;
                continue;
            }
            if stops.contains(&c) {
                return Ok(out);
            }
            out.push(c);
            self.pos += 1;
        }
        Err(self.error("unterminated element"))
    }

    fn children(&mut self) -> Result<Vec<(Option<String>, Value)>> {
        let mut children = Vec::new();
        while self.chars.get(self.pos) == Some(&'<') {
            children.push(self.element()?);
        }
        Ok(children)
    }

    /// Read one element; an empty name reads as `None`.
    fn element(&mut self) -> Result<(Option<String>, Value)> {
        self.expect('<')?;
        let name = if self.chars[self.pos..].starts_with(&['\\', '0', ':']) {
            self.pos += 2;
            Some(String::new())
        } else {
            Some(self.text(&[':'])?).filter(|name| !name.is_empty())
        };
        self.expect(':')?;
        let tag: String = self.chars.iter().skip(self.pos).take(3).collect();
        self.pos += 3;
        self.expect(':')?;

        let value = match tag.as_str() {
            "NUM" => {
                let text = self.text(&['>'])?;
                let n = text
                    .parse::<f64>()
                    .map_err(|_| self.error(&format!("bad number '{}'", text)))?;
                Value::number(n)
            }
            "STR" => Value::string(self.text(&['>'])?),
            "BYT" => Value::bytes(self.hex()?),
            "DAT" => {
                let text = self.text(&['>'])?;
                let dt = NaiveDateTime::parse_from_str(&text, DATETIME_FORMAT)
                    .map_err(|_| self.error(&format!("bad date '{}'", text)))?;
                Value::datetime(dt)
            }
            "ARR" => Value::array(self.children()?.into_iter().map(|(_, v)| v).collect()),
            "MAP" => {
                let mut map = ArrayData::map();
                for (key, item) in self.children()? {
                    match key {
                        Some(key) => map.insert_key(key, item),
                        None => map.push(item),
                    }
                }
                Value::new(Data::Array(map.into()))
            }
            "ENU" => {
                let mut e = EnumValue::new(self.text(&['<', '>'])?);
                for (entry, number) in self.children()? {
                    e.entries.insert(entry.unwrap_or_default(), number.as_number() as i64);
                }
                Value::enumeration(e)
            }
            "OBJ" => {
                let type_tag = self.text(&['<', '>'])?;
                let mut map = ArrayData::map();
                map.insert_key(TYPE_KEY, Value::string(type_tag));
                for (field, item) in self.children()? {
                    map.insert_key(field.unwrap_or_default(), item);
                }
                Value::new(Data::Array(map.into()))
            }
            "NON" => Value::none(),
            other => return Err(self.error(&format!("unknown tag '{}'", other))),
        };
        self.expect('>')?;
        Ok((name, value))
    }

    fn hex(&mut self) -> Result<Vec<u8>> {
        let text = self.text(&['>'])?;
        if !text.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(self.error(&format!("bad hex '{}'", text)));
        }
        if text.len() % 2 != 0 {
            return Err(self.error("odd-length hex payload"));
        }
        (0..text.len())
            .step_by(2)
            .map(|i| {
                u8::from_str_radix(&text[i..i + 2], 16)
                    .map_err(|_| self.error(&format!("bad hex '{}'", text)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_layout() {
        assert_eq!(marshal(&Value::number(42.0)), "<:NUM:42>");
        assert_eq!(marshal(&Value::string("a:b<c>")), r"<:STR:a\:b\<c\>>");
        assert_eq!(marshal(&Value::none()), "<:NON:>");
    }

    #[test]
    fn test_map_children_are_named_by_key() {
        let m = Value::map_from([("x", Value::number(1.0)), ("y", Value::string("z"))]);
        assert_eq!(marshal(&m), "<:MAP:<x:NUM:1><y:STR:z>>");
    }

    #[test]
    fn test_nested_round_trip() {
        let v = Value::array(vec![
            Value::number(1.5),
            Value::map_from([
                ("k", Value::array(vec![Value::string("a"), Value::none()])),
                ("e", Value::string("")),
            ]),
            Value::bytes(vec![1, 2, 255]),
        ]);
        let back = unmarshal(&marshal(&v)).unwrap();
        assert_eq!(back, v);
        assert_eq!(back.type_name(), "ARRAY");
    }

    #[test]
    fn test_enum_round_trip() {
        let e = EnumValue::new("Color").with_entry("RED", 0).with_entry("BLUE", 10);
        let back = unmarshal(&marshal(&Value::enumeration(e.clone()))).unwrap();
        assert_eq!(back.as_enum(), Some(&e));
    }

    #[test]
    fn test_datetime_round_trip() {
        let dt = NaiveDateTime::parse_from_str("2024-03-01 12:30:05", "%Y-%m-%d %H:%M:%S")
            .unwrap();
        let v = Value::datetime(dt);
        assert_eq!(unmarshal(&marshal(&v)).unwrap(), v);
    }

    #[test]
    fn test_malformed_text_is_rejected() {
        assert!(unmarshal("<:NUM:1").is_err());
        assert!(unmarshal("<:XYZ:1>").is_err());
        assert!(unmarshal("<:NUM:1>junk").is_err());
    }
}
