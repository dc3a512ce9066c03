//! Keyword statements
//!
//! Every keyword resolves to [`Handler::Keyword`] and lands here with the
//! cursor just past the keyword itself. Statements return `None`, a control
//! signal, or (for `new`, `thread` and `spawn`, which also appear inside
//! expressions) the value they produce.

use parking_lot::ReentrantMutex;

use crate::compiled;
use crate::cursor::{split_top_level, Script};
use crate::dispatch::{call, class, function};
use crate::error::{Result, ScriptError};
use crate::handler::{Handler, Keyword};
use crate::interpreter::Interpreter;
use crate::scope::FrameKind;
use crate::value::{EnumValue, Value};

use super::{block, expr, if_stmt, loops, switch, try_catch};

/// The process-wide region serializing `lock { ... }` bodies.
static REGION: ReentrantMutex<()> = parking_lot::const_reentrant_mutex(());

/// Execute the keyword statement whose keyword was just read.
pub fn keyword(interp: &mut Interpreter, script: &mut Script, keyword: Keyword) -> Result<Value> {
    match keyword {
        Keyword::If => if_stmt::run(interp, script),
        Keyword::While => loops::run_while(interp, script),
        Keyword::Do => loops::run_do(interp, script),
        Keyword::For => loops::run_for(interp, script),
        Keyword::Switch => switch::run(interp, script),
        Keyword::Try => try_catch::run(interp, script),
        Keyword::Elif | Keyword::Else | Keyword::Case | Keyword::Default | Keyword::Catch => {
            Err(script.syntax_error(format!("'{:?}' without its statement", keyword).to_lowercase()))
        }

        Keyword::Throw => {
            let value = expr::evaluate(interp, script)?;
            block::end_statement(script)?;
            Err(ScriptError::UserThrown {
                message: value.as_string(),
            })
        }
        Keyword::Return => {
            let value = if ends_statement(script) {
                Value::none()
            } else {
                expr::evaluate(interp, script)?
            };
            block::end_statement(script)?;
            Ok(Value::return_signal(value))
        }
        Keyword::Break => {
            block::end_statement(script)?;
            Ok(Value::break_signal())
        }
        Keyword::Continue => {
            block::end_statement(script)?;
            Ok(Value::continue_signal())
        }
        Keyword::Quit => quit(interp, script),

        Keyword::Function => function::define(interp, script),
        Keyword::CFunction => {
            compiled::define(interp, script)?;
            Ok(Value::none())
        }
        Keyword::Class => class::define(interp, script),
        Keyword::Namespace => namespace(interp, script),
        Keyword::Var => var(interp, script),
        Keyword::Enum => enumeration(interp, script),
        Keyword::New => class::construct(interp, script),

        Keyword::Lock => lock(interp, script),
        Keyword::Thread => worker(interp, script, false),
        Keyword::Spawn => worker(interp, script, true),
    }
}

fn ends_statement(script: &mut Script) -> bool {
    script.skip_spaces();
    matches!(script.current(), None | Some(';') | Some('}'))
}

/// `quit;`, `quit(code);`
fn quit(interp: &mut Interpreter, script: &mut Script) -> Result<Value> {
    script.skip_spaces();
    let code = if script.current() == Some('(') {
        let text = script.read_balanced('(', ')')?;
        if text.trim().is_empty() {
            0
        } else {
            expr::evaluate_text(interp, script, &text)?.as_number() as i32
        }
    } else {
        0
    };
    block::end_statement(script)?;
    tracing::debug!(code, "quit requested");
    Ok(Value::quit(code))
}

/// `var a = 1, b, c = [];`
fn var(interp: &mut Interpreter, script: &mut Script) -> Result<Value> {
    let list = script.read_until(&[';']);
    let file = script.filename().to_string();
    for declaration in split_top_level(&list, ',') {
        let (name, init) = match declaration.split_once('=') {
            Some((name, init)) => (name.trim(), Some(init.trim())),
            None => (declaration.as_str(), None),
        };
        if !call::is_identifier(name) {
            return Err(script.syntax_error(format!("invalid variable name '{}'", name)));
        }
        let value = match init {
            Some(text) => expr::evaluate_text(interp, script, text)?,
            None => Value::none(),
        };
        interp.define_local(name, Handler::Variable(value), &file);
    }
    block::end_statement(script)?;
    Ok(Value::none())
}

/// `enum Color { RED, GREEN = 5, BLUE }`
///
/// Entries without a value continue from the previous one.
fn enumeration(interp: &mut Interpreter, script: &mut Script) -> Result<Value> {
    let name = script.read_token();
    if name.is_empty() {
        return Err(script.syntax_error("expected an enum name"));
    }
    let body = script.read_balanced('{', '}')?;

    let mut value = EnumValue::new(&name);
    let mut next = 0i64;
    for entry in split_top_level(&body, ',') {
        let (entry, number) = match entry.split_once('=') {
            Some((entry, text)) => {
                let number = expr::evaluate_text(interp, script, text.trim())?;
                let Some(n) = number.try_number() else {
                    return Err(ScriptError::type_mismatch("a number", number.type_name()));
                };
                (entry.trim().to_string(), n as i64)
            }
            None => (entry, next),
        };
        if !call::is_identifier(&entry) {
            return Err(script.syntax_error(format!("invalid enum entry '{}'", entry)));
        }
        value = value.with_entry(entry, number);
        next = number + 1;
    }

    tracing::debug!(name = name.as_str(), "enum defined");
    interp.define_declaration(&name, Handler::Variable(Value::enumeration(value)));
    Ok(Value::none())
}

/// `namespace Name { ... }`
fn namespace(interp: &mut Interpreter, script: &mut Script) -> Result<Value> {
    let name = script.read_token();
    if name.is_empty() {
        return Err(script.syntax_error("expected a namespace name"));
    }
    let body = script.read_balanced('{', '}')?;
    interp.shared.symbols.lock().ensure_namespace(&name);
    tracing::debug!(namespace = name.as_str(), "entering namespace");

    let frame = interp.stack.push(FrameKind::Namespace(name));
    let result = block::run_text(interp, script, &body);
    interp.stack.pop(frame);
    let value = result?;
    Ok(if value.is_signal() { value } else { Value::none() })
}

/// `lock { ... }` and `lock(name) { ... }`
fn lock(interp: &mut Interpreter, script: &mut Script) -> Result<Value> {
    script.skip_spaces();
    if script.current() == Some('(') {
        script.read_balanced('(', ')')?;
    }
    let body = block::read_body(script)?;
    let _guard = REGION.lock();
    let value = block::run_text(interp, script, &body)?;
    Ok(if value.is_signal() { value } else { Value::none() })
}

/// `thread(expr)` and `spawn(expr)`
fn worker(interp: &mut Interpreter, script: &mut Script, detached: bool) -> Result<Value> {
    let text = script.read_balanced('(', ')')?;
    if text.trim().is_empty() {
        return Err(script.syntax_error("a worker needs an expression"));
    }
    let id = interp.launch_worker(script.child(&text), detached)?;
    Ok(Value::number(id as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(interp: &mut Interpreter, src: &str) -> Result<Value> {
        interp.process(src, "t", true)
    }

    #[test]
    fn test_var_list() {
        let mut interp = Interpreter::new();
        run(&mut interp, "var a = 1, b, c = a + 2;").unwrap();
        assert_eq!(interp.get_variable("a", "t"), Some(Value::number(1.0)));
        assert_eq!(interp.get_variable("b", "t"), Some(Value::none()));
        assert_eq!(interp.get_variable("c", "t"), Some(Value::number(3.0)));
        assert_eq!(interp.get_variable("a", "other"), None);
    }

    #[test]
    fn test_enum_values_continue_from_previous() {
        let mut interp = Interpreter::new();
        run(&mut interp, "enum Color { RED, GREEN = 5, BLUE } x = Color.BLUE; n = Color[5];").unwrap();
        assert_eq!(interp.get_variable("x", "t"), Some(Value::number(6.0)));
        assert_eq!(interp.get_variable("n", "t"), Some(Value::string("GREEN")));
    }

    #[test]
    fn test_quit_code() {
        let mut interp = Interpreter::new();
        let out = run(&mut interp, "a = 1; quit(3); a = 2;").unwrap();
        assert_eq!(out.quit_code(), Some(3));
        assert_eq!(interp.get_variable("a", "t"), Some(Value::number(1.0)));
    }

    #[test]
    fn test_throw_message() {
        let mut interp = Interpreter::new();
        let err = run(&mut interp, "throw \"bad \" + 1;").unwrap_err();
        assert_eq!(err.message(), "bad 1");
    }

    #[test]
    fn test_lock_runs_body() {
        let mut interp = Interpreter::new();
        run(&mut interp, "n = 0; lock { n += 1; lock { n += 1; } }").unwrap();
        assert_eq!(interp.get_variable("n", "t"), Some(Value::number(2.0)));
    }

    #[test]
    fn test_orphaned_else() {
        let mut interp = Interpreter::new();
        assert!(run(&mut interp, "else { x = 1; }").is_err());
    }
}
