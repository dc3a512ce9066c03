//! Tests for script functions: binding, defaults, recursion and natives

use pretty_assertions::assert_eq;
use strand::*;

const BINDING: &str = "function f(a, b = 2, c = 3) { return [a, b, c]; }";

fn eval(interp: &mut Interpreter, src: &str) -> Result<Value> {
    interp.process(src, "main.str", true)
}

fn with_binding(call: &str) -> Result<Value> {
    let mut interp = Interpreter::new();
    eval(&mut interp, BINDING)?;
    eval(&mut interp, call)
}

// ═══════════════════════════════════════════════════════════════════════
// Argument Binding
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_defaults_fill_missing_arguments() {
    assert_eq!(with_binding("f(1);").unwrap().to_string(), "[1, 2, 3]");
}

#[test]
fn test_named_argument_after_positional() {
    assert_eq!(with_binding("f(1, c=10);").unwrap().to_string(), "[1, 2, 10]");
}

#[test]
fn test_named_arguments_in_any_order() {
    assert_eq!(
        with_binding("f(c=7, a=5, b=6);").unwrap().to_string(),
        "[5, 6, 7]"
    );
}

#[test]
fn test_missing_required_argument() {
    let err = with_binding("f(b=5);").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ArgumentMismatch);
    assert!(err.message().contains("'a'"));
}

#[test]
fn test_positional_after_named_is_rejected() {
    let err = with_binding("f(a=1, 2);").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ArgumentMismatch);
}

#[test]
fn test_parameter_bound_twice() {
    let err = with_binding("f(1, a=2);").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ArgumentMismatch);
}

#[test]
fn test_surplus_arguments_become_locals() {
    let mut interp = Interpreter::new();
    let out = eval(
        &mut interp,
        "function g(a) { return a + extra + _arg2; } extra = 100; g(1, extra, 5);",
    )
    .unwrap();
    assert_eq!(out, Value::number(106.0));
}

// ═══════════════════════════════════════════════════════════════════════
// Call Semantics
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_recursion() {
    let mut interp = Interpreter::new();
    let out = eval(
        &mut interp,
        "function fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } fib(10);",
    )
    .unwrap();
    assert_eq!(out, Value::number(55.0));
    assert_eq!(interp.depth(), 0);
}

#[test]
fn test_function_without_return_yields_last_value() {
    let mut interp = Interpreter::new();
    let out = eval(&mut interp, "function h(x) { y = x * 2; y + 1; } h(4);").unwrap();
    assert_eq!(out, Value::number(9.0));
}

#[test]
fn test_locals_do_not_leak() {
    let mut interp = Interpreter::new();
    eval(&mut interp, "function k() { var inner = 1; local = 2; } k();").unwrap();
    assert_eq!(interp.get_variable("inner", "main.str"), None);
    assert_eq!(interp.get_variable("local", "main.str"), None);
}

#[test]
fn test_assignment_updates_existing_global() {
    let mut interp = Interpreter::new();
    eval(&mut interp, "counter = 0; function bump() { counter += 1; } bump(); bump();").unwrap();
    assert_eq!(
        interp.get_variable("counter", "main.str"),
        Some(Value::number(2.0))
    );
}

#[test]
fn test_call_depth_limit() {
    let mut interp = Interpreter::with_config(InterpreterConfig::new().with_max_call_depth(16));
    let err = eval(&mut interp, "function down(n) { return down(n + 1); } down(0);").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StackOverflow);
    assert_eq!(err.trace().len(), 16);
    assert_eq!(interp.depth(), 0);
    assert_eq!(interp.call_depth(), 0);
}

const COUNTDOWN: &str = "function d(n) { if (n == 0) { return 0; } return 1 + d(n - 1); }";

#[test]
fn test_default_depth_limit_fails_cleanly() {
    let mut interp = Interpreter::new();
    eval(&mut interp, COUNTDOWN).unwrap();
    let err = eval(&mut interp, "x = d(1000);").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StackOverflow);
    assert_eq!(interp.depth(), 0);
    assert_eq!(interp.get_variable("x", "main.str"), None);
}

#[test]
fn test_deep_recursion_under_raised_limit() {
    let mut interp = Interpreter::with_config(InterpreterConfig::new().with_max_call_depth(4000));
    eval(&mut interp, COUNTDOWN).unwrap();
    assert_eq!(eval(&mut interp, "d(2500);").unwrap(), Value::number(2500.0));
    assert_eq!(interp.call_depth(), 0);
}

#[test]
fn test_arrays_are_passed_by_value() {
    let mut interp = Interpreter::new();
    eval(
        &mut interp,
        "function grow(list) { list.add(9); return list.size; } a = [1]; n = grow(a);",
    )
    .unwrap();
    assert_eq!(interp.get_variable("n", "main.str"), Some(Value::number(2.0)));
    assert_eq!(
        interp.get_variable("a", "main.str").map(|a| a.to_string()),
        Some("[1]".to_string())
    );
}

// ═══════════════════════════════════════════════════════════════════════
// Host Natives
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_native_arity_is_checked() {
    let mut interp = Interpreter::new();
    interp.register_native("pair", 2, |_, _, args| {
        Ok(Value::array(args.to_vec()))
    });
    assert_eq!(
        eval(&mut interp, "pair(1, \"x\");").unwrap().to_string(),
        "[1, \"x\"]"
    );
    let err = eval(&mut interp, "pair(1);").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ArgumentMismatch);
}

#[test]
fn test_native_sees_calling_file() {
    let mut interp = Interpreter::new();
    interp.register_native("whereami", 0, |_, script, _| Ok(Value::string(script.filename())));
    assert_eq!(
        interp.process("whereami();", "lib/util.str", false).unwrap(),
        Value::string("lib/util.str")
    );
}
