//! `switch` / `case` / `default`

use crate::cursor::Script;
use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::value::Value;

use super::{block, expr};

/// Run a `switch`; the cursor is just past `switch`.
///
/// The subject is evaluated once and compared to each `case` by type and
/// value. The first match starts execution, which then falls through later
/// labels until `break` or the end of the body. `default` starts execution
/// only when no earlier case matched.
pub fn run(interp: &mut Interpreter, script: &mut Script) -> Result<Value> {
    let subject_text = script.read_balanced('(', ')')?;
    let subject = expr::evaluate_text(interp, script, &subject_text)?;
    let text = script.read_balanced('{', '}')?;
    let mut body = script.child(&text);

    let mut running = false;
    loop {
        body.skip_spaces();
        if body.at_end() {
            return Ok(Value::none());
        }
        match body.peek_token().as_str() {
            "case" => {
                body.read_token();
                let candidate = expr::evaluate(interp, &mut body)?;
                body.expect(':')?;
                if !running && candidate == subject {
                    running = true;
                }
            }
            "default" => {
                body.read_token();
                body.expect(':')?;
                running = true;
            }
            _ if running => {
                let value = block::statement(interp, &mut body)?;
                if value.is_break() {
                    return Ok(Value::none());
                }
                if value.is_signal() {
                    return Ok(value);
                }
            }
            _ => body.skip_statement()?,
        }
    }
}
