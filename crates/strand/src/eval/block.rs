//! Statement and block execution

use crate::cursor::Script;
use crate::error::Result;
use crate::handler::{Handler, Keyword};
use crate::interpreter::Interpreter;
use crate::stack::ensure_sufficient_stack;
use crate::value::Value;

use super::{assign, control, expr};

/// Run statements until the end of `script`.
///
/// Stops at the first control signal and returns it unchanged; otherwise
/// returns the value of the last statement.
pub fn run(interp: &mut Interpreter, script: &mut Script) -> Result<Value> {
    let mut last = Value::none();
    loop {
        script.skip_spaces();
        match script.current() {
            None => return Ok(last),
            Some('}') => return Err(script.syntax_error("unexpected '}'")),
            _ => {}
        }
        let value = statement(interp, script)?;
        if value.is_signal() {
            return Ok(value);
        }
        last = value;
    }
}

/// Run `text` as a block through a cursor derived from `origin`.
pub fn run_text(interp: &mut Interpreter, origin: &Script, text: &str) -> Result<Value> {
    let mut child = origin.child(text);
    run(interp, &mut child)
}

/// Read a statement body: a `{ ... }` block (without its braces) or a
/// single statement.
pub fn read_body(script: &mut Script) -> Result<String> {
    script.skip_spaces();
    if script.current() == Some('{') {
        return script.read_balanced('{', '}');
    }
    let start = script.pos();
    script.skip_statement()?;
    Ok(script.slice(start, script.pos()))
}

/// Consume the `;` ending a statement.
///
/// The end of the text or a closing `}` also ends a statement.
pub fn end_statement(script: &mut Script) -> Result<()> {
    script.skip_spaces();
    match script.current() {
        Some(';') => {
            script.advance();
            Ok(())
        }
        None | Some('}') => Ok(()),
        Some(c) => Err(script.syntax_error(format!("expected ';', found '{}'", c))),
    }
}

/// Keywords that start an expression rather than a statement.
fn is_expression_keyword(keyword: Keyword) -> bool {
    matches!(keyword, Keyword::New | Keyword::Thread | Keyword::Spawn)
}

/// Execute one statement.
pub fn statement(interp: &mut Interpreter, script: &mut Script) -> Result<Value> {
    ensure_sufficient_stack(|| statement_inner(interp, script))
}

fn statement_inner(interp: &mut Interpreter, script: &mut Script) -> Result<Value> {
    interp.check_cancelled()?;
    script.skip_spaces();
    match script.current() {
        None => return Ok(Value::none()),
        Some(';') => {
            script.advance();
            return Ok(Value::none());
        }
        Some('{') => {
            let body = script.read_balanced('{', '}')?;
            return run_text(interp, script, &body);
        }
        _ => {}
    }
    if interp.config().trace {
        tracing::trace!(file = script.filename(), line = script.current_line(), "statement");
    }

    if script.starts_with("++") || script.starts_with("--") {
        return prefix_action(interp, script);
    }

    let start = script.pos();
    let token = script.peek_token();
    if token.starts_with(|c: char| c.is_alphabetic() || c == '_') {
        if let Some(Handler::Keyword(keyword)) = interp.resolve(&token, script.filename()) {
            if !is_expression_keyword(keyword) {
                script.read_token();
                return control::keyword(interp, script, keyword);
            }
        }

        if let Some(raw) = assign::read_place(interp, script)? {
            script.skip_spaces();
            if let Some(action) = interp.match_action(&script.slice(script.pos(), script.pos() + 8)) {
                script.advance_by(action.token.chars().count());
                let place = raw.evaluate(interp, script)?;
                let value = assign::apply(interp, script, &place, &action)?;
                end_statement(script)?;
                return Ok(value);
            }
        }
        script.set_pos(start);
    }

    let value = expr::evaluate(interp, script)?;
    end_statement(script)?;
    Ok(value)
}

/// `++x;` and `--x;`
fn prefix_action(interp: &mut Interpreter, script: &mut Script) -> Result<Value> {
    let Some(action) = interp.match_action(&script.slice(script.pos(), script.pos() + 2)) else {
        return Err(script.syntax_error("unknown prefix operator"));
    };
    script.advance_by(action.token.chars().count());
    let Some(raw) = assign::read_place(interp, script)? else {
        return Err(script.syntax_error(format!("'{}' needs a target", action.token)));
    };
    let place = raw.evaluate(interp, script)?;
    let value = assign::apply(interp, script, &place, &action)?;
    end_statement(script)?;
    Ok(value)
}
