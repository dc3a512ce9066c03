//! `if` / `elif` / `else if` / `else`

use crate::cursor::Script;
use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::value::Value;

use super::{block, expr};

/// Run an `if` chain; the cursor is just past `if`.
///
/// After a taken branch the rest of the chain is skipped without being
/// evaluated. Only control signals leave the statement; any other branch
/// result collapses to `None`.
pub fn run(interp: &mut Interpreter, script: &mut Script) -> Result<Value> {
    loop {
        let condition = script.read_balanced('(', ')')?;
        if expr::evaluate_text(interp, script, &condition)?.as_bool() {
            let body = block::read_body(script)?;
            let value = block::run_text(interp, script, &body)?;
            script.skip_else_chain()?;
            return Ok(collapse(value));
        }
        script.skip_statement()?;

        match script.peek_token().as_str() {
            "elif" => {
                script.read_token();
            }
            "else" => {
                script.read_token();
                if script.peek_token() == "if" {
                    script.read_token();
                    continue;
                }
                let body = block::read_body(script)?;
                let value = block::run_text(interp, script, &body)?;
                return Ok(collapse(value));
            }
            _ => return Ok(Value::none()),
        }
    }
}

fn collapse(value: Value) -> Value {
    if value.is_signal() {
        value
    } else {
        Value::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch(x: i32) -> Value {
        let mut interp = Interpreter::new();
        let src = format!(
            "x = {}; if (x == 1) {{ r = \"one\"; }} elif (x == 2) {{ r = \"two\"; }} \
             else if (x == 3) r = \"three\"; else {{ r = \"many\"; }}",
            x
        );
        interp.process(&src, "t", true).unwrap();
        interp.get_variable("r", "t").unwrap()
    }

    #[test]
    fn test_chain_takes_one_branch() {
        assert_eq!(branch(1), Value::string("one"));
        assert_eq!(branch(2), Value::string("two"));
        assert_eq!(branch(3), Value::string("three"));
        assert_eq!(branch(4), Value::string("many"));
    }

    #[test]
    fn test_untaken_branch_is_not_evaluated() {
        let mut interp = Interpreter::new();
        interp
            .process("if (false) { undefined_call(); } y = 1;", "t", true)
            .unwrap();
        assert_eq!(interp.get_variable("y", "t"), Some(Value::number(1.0)));
    }

    #[test]
    fn test_result_collapses() {
        let mut interp = Interpreter::new();
        let out = interp.process("if (true) { 5; }", "t", true).unwrap();
        assert_eq!(out, Value::none());
    }
}
