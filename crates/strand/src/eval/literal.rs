//! Literal evaluation: strings, numbers, arrays and maps

use crate::cursor::{split_top_level, Script};
use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::value::Value;

use super::expr;

/// Read the string literal under the cursor, resolving escapes.
pub fn read_string(script: &mut Script) -> Result<String> {
    script.expect('"')?;
    let mut text = String::new();
    loop {
        let Some(c) = script.current() else {
            return Err(script.syntax_error("unterminated string"));
        };
        script.advance();
        match c {
            '"' => return Ok(text),
            '\\' => {
                let Some(escaped) = script.current() else {
                    return Err(script.syntax_error("unterminated string"));
                };
                script.advance();
                match escaped {
                    'n' => text.push('\n'),
                    't' => text.push('\t'),
                    'r' => text.push('\r'),
                    '"' | '\\' | '\'' => text.push(escaped),
                    other => {
                        text.push('\\');
                        text.push(other);
                    }
                }
            }
            other => text.push(other),
        }
    }
}

/// Read a decimal number (optional fraction and exponent).
pub fn read_number(script: &mut Script) -> Result<f64> {
    let start = script.pos();
    let digits = |script: &mut Script| {
        while script.current().is_some_and(|c| c.is_ascii_digit()) {
            script.advance();
        }
    };

    digits(script);
    if script.current() == Some('.') && script.peek(1).is_some_and(|c| c.is_ascii_digit()) {
        script.advance();
        digits(script);
    }
    if matches!(script.current(), Some('e' | 'E')) {
        let sign = usize::from(matches!(script.peek(1), Some('+' | '-')));
        if script.peek(1 + sign).is_some_and(|c| c.is_ascii_digit()) {
            script.advance_by(1 + sign);
            digits(script);
        }
    }

    let text = script.slice(start, script.pos());
    text.parse::<f64>()
        .map_err(|_| script.syntax_error(format!("invalid number '{}'", text)))
}

/// Evaluate the `[a, b, ...]` literal under the cursor.
pub fn array(interp: &mut Interpreter, script: &mut Script) -> Result<Value> {
    let text = script.read_balanced('[', ']')?;
    let mut items = Vec::new();
    for part in split_top_level(&text, ',') {
        items.push(expr::evaluate_text(interp, script, &part)?);
    }
    Ok(Value::array(items))
}

/// Evaluate the `{key: value, "key": value}` literal under the cursor.
pub fn map(interp: &mut Interpreter, script: &mut Script) -> Result<Value> {
    let text = script.read_balanced('{', '}')?;
    let mut entries = Vec::new();
    for part in split_top_level(&text, ',') {
        let pair = split_top_level(&part, ':');
        let [key, value] = pair.as_slice() else {
            return Err(script.syntax_error(format!("expected 'key: value', found '{}'", part)));
        };
        let key = if key.starts_with('"') {
            read_string(&mut script.child(key))?
        } else {
            key.clone()
        };
        entries.push((key, expr::evaluate_text(interp, script, value)?));
    }
    Ok(Value::map_from(entries))
}
