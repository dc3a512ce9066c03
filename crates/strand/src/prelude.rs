//! Default actions and the minimal native set every interpreter starts with

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cursor::Script;
use crate::error::{Result, ScriptError};
use crate::eval::expr;
use crate::handler::{Action, BuiltinFn, Handler};
use crate::interpreter::Interpreter;
use crate::value::marshal;
use crate::value::Value;

/// Install the default actions and natives into `interp`.
pub(crate) fn load(interp: &mut Interpreter) {
    load_actions(interp);

    // Output
    define(interp, "print", -1, builtin_print);
    define(interp, "write", -1, builtin_write);

    // Conversion and inspection
    define(interp, "type", 1, builtin_type);
    define(interp, "str", 1, builtin_str);
    define(interp, "num", 1, builtin_num);
    define(interp, "isdefined", 1, builtin_isdefined);
    define(interp, "marshal", 1, builtin_marshal);
    define(interp, "unmarshal", 1, builtin_unmarshal);

    // Files
    define(interp, "include", 1, builtin_include);

    // Workers and cancellation
    define(interp, "join", 1, builtin_join);
    define(interp, "sleep", 1, builtin_sleep);
    define(interp, "cancel", 0, builtin_cancel);
}

fn define(
    interp: &mut Interpreter,
    name: &str,
    arity: i32,
    func: fn(&mut Interpreter, &Script, &[Value]) -> Result<Value>,
) {
    let native = BuiltinFn {
        name: name.to_string(),
        arity,
        func: Arc::new(func),
    };
    interp
        .shared
        .symbols
        .lock()
        .register_native(name, Handler::Native(Arc::new(native)));
}

fn load_actions(interp: &mut Interpreter) {
    interp.register_action(Action::assign());
    for (token, op) in [("+=", "+"), ("-=", "-"), ("*=", "*"), ("/=", "/"), ("%=", "%")] {
        interp.register_action(Action::binary(token, move |current, operand| {
            expr::binary(op, current, operand)
        }));
    }
    interp.register_action(Action::unary("++", |current| step(current, 1.0)));
    interp.register_action(Action::unary("--", |current| step(current, -1.0)));
}

fn step(current: &Value, delta: f64) -> Result<Value> {
    match current.try_number() {
        Some(n) if current.is_number() => Ok(Value::number(n + delta)),
        _ => Err(ScriptError::type_mismatch("number", current.type_name())),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Output
// ═══════════════════════════════════════════════════════════════════════

fn joined(args: &[Value], separator: &str) -> String {
    args.iter()
        .map(Value::as_string)
        .collect::<Vec<_>>()
        .join(separator)
}

fn builtin_print(interp: &mut Interpreter, _: &Script, args: &[Value]) -> Result<Value> {
    interp.shared.output.read().write_line(&joined(args, " "));
    Ok(Value::none())
}

fn builtin_write(interp: &mut Interpreter, _: &Script, args: &[Value]) -> Result<Value> {
    interp.write(&joined(args, ""));
    Ok(Value::none())
}

// ═══════════════════════════════════════════════════════════════════════
// Conversion and inspection
// ═══════════════════════════════════════════════════════════════════════

fn builtin_type(_: &mut Interpreter, _: &Script, args: &[Value]) -> Result<Value> {
    Ok(Value::string(args[0].type_name()))
}

fn builtin_str(_: &mut Interpreter, _: &Script, args: &[Value]) -> Result<Value> {
    Ok(Value::string(args[0].as_string()))
}

fn builtin_num(_: &mut Interpreter, _: &Script, args: &[Value]) -> Result<Value> {
    args[0]
        .try_number()
        .map(Value::number)
        .ok_or_else(|| ScriptError::type_mismatch("a numeric value", args[0].type_name()))
}

fn builtin_isdefined(interp: &mut Interpreter, script: &Script, args: &[Value]) -> Result<Value> {
    let name = args[0].as_string();
    Ok(Value::boolean(interp.resolve(&name, script.filename()).is_some()))
}

fn builtin_marshal(_: &mut Interpreter, _: &Script, args: &[Value]) -> Result<Value> {
    Ok(Value::string(marshal::marshal(&args[0])))
}

fn builtin_unmarshal(_: &mut Interpreter, _: &Script, args: &[Value]) -> Result<Value> {
    marshal::unmarshal(&args[0].as_string())
}

// ═══════════════════════════════════════════════════════════════════════
// Files, workers and cancellation
// ═══════════════════════════════════════════════════════════════════════

fn builtin_include(interp: &mut Interpreter, script: &Script, args: &[Value]) -> Result<Value> {
    interp.include(&args[0].as_string(), script)
}

fn builtin_join(interp: &mut Interpreter, _: &Script, args: &[Value]) -> Result<Value> {
    let id = args[0].as_index()? as u64;
    interp.join_worker(id)
}

/// Sleep for `ms` milliseconds, waking early with `Interrupted` on cancel.
fn builtin_sleep(interp: &mut Interpreter, _: &Script, args: &[Value]) -> Result<Value> {
    let slice = Duration::from_millis(10);
    let total = Duration::from_millis(args[0].as_number().max(0.0) as u64);
    let deadline = Instant::now() + total;
    loop {
        interp.check_cancelled()?;
        let now = Instant::now();
        if now >= deadline {
            return Ok(Value::none());
        }
        std::thread::sleep(slice.min(deadline - now));
    }
}

fn builtin_cancel(interp: &mut Interpreter, _: &Script, _: &[Value]) -> Result<Value> {
    interp.cancel();
    Ok(Value::none())
}
