//! Loop statements: `while`, `do ... while`, `for` and for-each
//!
//! Every iteration checks the cancellation flag and counts against
//! `max_loop_iterations`; running past it fails with `InfiniteLoop`.

use crate::cursor::{split_top_level, Script};
use crate::error::{Result, ScriptError};
use crate::handler::Handler;
use crate::interpreter::Interpreter;
use crate::value::{Data, Value};

use super::{block, expr};

/// What the loop does after one pass of its body.
enum Flow {
    Next,
    Stop,
    Exit(Value),
}

struct Counter {
    count: usize,
    limit: usize,
}

impl Counter {
    fn new(interp: &Interpreter) -> Self {
        Self {
            count: 0,
            limit: interp.config().max_loop_iterations,
        }
    }

    fn tick(&mut self, interp: &Interpreter) -> Result<()> {
        interp.check_cancelled()?;
        self.count += 1;
        if self.count > self.limit {
            return Err(ScriptError::InfiniteLoop { limit: self.limit });
        }
        Ok(())
    }
}

fn pass(interp: &mut Interpreter, origin: &Script, body: &str) -> Result<Flow> {
    let value = block::run_text(interp, origin, body)?;
    Ok(match value.data() {
        Data::Break => Flow::Stop,
        Data::Return(_) | Data::Quit(_) => Flow::Exit(value),
        _ => Flow::Next,
    })
}

fn condition(interp: &mut Interpreter, origin: &Script, text: &str) -> Result<bool> {
    if text.trim().is_empty() {
        return Ok(true);
    }
    Ok(expr::evaluate_text(interp, origin, text)?.as_bool())
}

// ═══════════════════════════════════════════════════════════════════════
// while / do-while
// ═══════════════════════════════════════════════════════════════════════

/// `while (cond) body`
pub fn run_while(interp: &mut Interpreter, script: &mut Script) -> Result<Value> {
    let cond = script.read_balanced('(', ')')?;
    let body = block::read_body(script)?;
    let mut counter = Counter::new(interp);
    while condition(interp, script, &cond)? {
        counter.tick(interp)?;
        match pass(interp, script, &body)? {
            Flow::Next => {}
            Flow::Stop => break,
            Flow::Exit(value) => return Ok(value),
        }
    }
    Ok(Value::none())
}

/// `do body while (cond);`
pub fn run_do(interp: &mut Interpreter, script: &mut Script) -> Result<Value> {
    let body = block::read_body(script)?;
    if script.read_token() != "while" {
        return Err(script.syntax_error("expected 'while' after 'do' body"));
    }
    let cond = script.read_balanced('(', ')')?;
    block::end_statement(script)?;

    let mut counter = Counter::new(interp);
    loop {
        counter.tick(interp)?;
        match pass(interp, script, &body)? {
            Flow::Next => {}
            Flow::Stop => break,
            Flow::Exit(value) => return Ok(value),
        }
        if !condition(interp, script, &cond)? {
            break;
        }
    }
    Ok(Value::none())
}

// ═══════════════════════════════════════════════════════════════════════
// for / for-each
// ═══════════════════════════════════════════════════════════════════════

/// `for (init; cond; step) body`, or a for-each with `:`, `in` or `of`.
pub fn run_for(interp: &mut Interpreter, script: &mut Script) -> Result<Value> {
    let header = script.read_balanced('(', ')')?;
    let body = block::read_body(script)?;
    let parts = split_top_level(&header, ';');
    match parts.as_slice() {
        [init, cond, step] => counted(interp, script, init, cond, step, &body),
        [single] => for_each(interp, script, single, &body),
        _ => Err(script.syntax_error("malformed for header")),
    }
}

fn counted(
    interp: &mut Interpreter,
    script: &Script,
    init: &str,
    cond: &str,
    step: &str,
    body: &str,
) -> Result<Value> {
    if !init.is_empty() {
        block::run_text(interp, script, init)?;
    }
    let mut counter = Counter::new(interp);
    while condition(interp, script, cond)? {
        counter.tick(interp)?;
        match pass(interp, script, body)? {
            Flow::Next => {}
            Flow::Stop => break,
            Flow::Exit(value) => return Ok(value),
        }
        if !step.is_empty() {
            block::run_text(interp, script, step)?;
        }
    }
    Ok(Value::none())
}

/// Split `item : expr`, `item in expr` or `item of expr`.
fn for_each_header(header: &str) -> Option<(String, String)> {
    let header = header.strip_prefix("var ").unwrap_or(header);
    let parts = split_top_level(header, ':');
    if let [name, source] = parts.as_slice() {
        return Some((name.clone(), source.clone()));
    }
    [" in ", " of "].iter().find_map(|sep| {
        header
            .split_once(sep)
            .map(|(name, source)| (name.trim().to_string(), source.trim().to_string()))
    })
}

fn for_each(interp: &mut Interpreter, script: &Script, header: &str, body: &str) -> Result<Value> {
    let Some((name, source)) = for_each_header(header) else {
        return Err(script.syntax_error(format!("malformed for-each header '{}'", header)));
    };
    let collection = expr::evaluate_text(interp, script, &source)?;
    let items = elements(interp, &collection)?;
    let file = script.filename().to_string();

    let mut counter = Counter::new(interp);
    for item in items {
        counter.tick(interp)?;
        interp.define_local(&name, Handler::Variable(item), &file);
        match pass(interp, script, body)? {
            Flow::Next => {}
            Flow::Stop => break,
            Flow::Exit(value) => return Ok(value),
        }
    }
    Ok(Value::none())
}

/// The values a for-each visits.
fn elements(interp: &Interpreter, collection: &Value) -> Result<Vec<Value>> {
    match collection.data() {
        Data::Array(array) => Ok(array.items().to_vec()),
        Data::Str(s) => Ok(s.chars().map(|c| Value::string(c.to_string())).collect()),
        Data::Enum(e) => Ok(e.entries.keys().map(|k| Value::string(k.as_str())).collect()),
        Data::Object(handle) => {
            let enumerator = interp.shared.objects.read().enumerator(handle.type_tag());
            match enumerator {
                Some(enumerate) => enumerate(handle),
                None => Err(ScriptError::type_mismatch(
                    "an enumerable object",
                    handle.type_tag().to_string(),
                )),
            }
        }
        Data::None | Data::Undefined => Ok(Vec::new()),
        _ => Err(ScriptError::type_mismatch("an iterable", collection.type_name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InterpreterConfig;

    fn run(src: &str) -> Interpreter {
        let mut interp = Interpreter::new();
        interp.process(src, "t", true).unwrap();
        interp
    }

    fn var(interp: &Interpreter, name: &str) -> Value {
        interp.get_variable(name, "t").unwrap()
    }

    #[test]
    fn test_while_and_do() {
        let interp = run("i = 0; while (i < 5) i++; j = 10; do { j++; } while (j < 5);");
        assert_eq!(var(&interp, "i"), Value::number(5.0));
        assert_eq!(var(&interp, "j"), Value::number(11.0));
    }

    #[test]
    fn test_counted_for_with_break_and_continue() {
        let interp = run(
            "s = 0; for (i = 0; i < 10; i++) { if (i == 1) continue; if (i == 4) break; s += i; }",
        );
        assert_eq!(var(&interp, "s"), Value::number(5.0));
    }

    #[test]
    fn test_for_each_forms() {
        let interp = run(
            "a = 0; for (x : [1, 2, 3]) a += x; \
             s = \"\"; for (c in \"abc\") s = c + s; \
             n = 0; for (var y of null) n++;",
        );
        assert_eq!(var(&interp, "a"), Value::number(6.0));
        assert_eq!(var(&interp, "s"), Value::string("cba"));
        assert_eq!(var(&interp, "n"), Value::number(0.0));
    }

    #[test]
    fn test_iteration_ceiling() {
        let config = InterpreterConfig::new().with_max_loop_iterations(100);
        let mut interp = Interpreter::with_config(config);
        let err = interp.process("while (true) { }", "t", true).unwrap_err();
        assert!(matches!(err, ScriptError::InfiniteLoop { limit: 100 }));
    }

    #[test]
    fn test_for_each_header_forms() {
        assert_eq!(for_each_header("x:arr"), Some(("x".into(), "arr".into())));
        assert_eq!(for_each_header("var x in arr"), Some(("x".into(), "arr".into())));
        assert_eq!(for_each_header("x"), None);
    }
}
