//! `try` / `catch`

use crate::cursor::{split_top_level, Script};
use crate::dispatch::call;
use crate::error::{ErrorKind, Result};
use crate::handler::Handler;
use crate::interpreter::Interpreter;
use crate::value::Value;

use super::block;

/// Run `try body catch(e[, trace]) handler`; the cursor is just past `try`.
///
/// A failure in the body unwinds the scope stack and call record to their
/// depth at entry, binds the message to `e` (with the frame trace as its
/// `stack` property) and runs the handler. Cancellation is never caught.
pub fn run(interp: &mut Interpreter, script: &mut Script) -> Result<Value> {
    let body = block::read_body(script)?;
    if script.read_token() != "catch" {
        return Err(script.syntax_error("expected 'catch' after 'try' body"));
    }
    let header = script.read_balanced('(', ')')?;
    let names = split_top_level(&header, ',');
    if let Some(bad) = names.iter().find(|n| !call::is_identifier(n)) {
        return Err(script.syntax_error(format!("invalid catch variable '{}'", bad)));
    }
    let handler = block::read_body(script)?;

    let depth = interp.depth();
    let calls = interp.call_depth();
    let error = match block::run_text(interp, script, &body) {
        Ok(value) => return Ok(value),
        Err(e) if e.kind() == ErrorKind::Interrupted => return Err(e),
        Err(e) => e,
    };

    interp.unwind_to(depth, calls);
    tracing::debug!(error = %error, frames = error.trace().len(), "caught script failure");

    let file = script.filename().to_string();
    let trace = error.trace_text();
    let mut caught = Value::string(error.message());
    caught.set_field("stack", Value::string(trace.clone()));
    if let Some(name) = names.first() {
        interp.define_local(name, Handler::Variable(caught), &file);
    }
    if let Some(name) = names.get(1) {
        interp.define_local(name, Handler::Variable(Value::string(trace)), &file);
    }
    block::run_text(interp, script, &handler)
}
