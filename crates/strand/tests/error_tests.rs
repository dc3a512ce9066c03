//! Tests for error kinds, frame traces and script-level catching

use pretty_assertions::assert_eq;
use strand::*;

fn fail(src: &str) -> ScriptError {
    let mut interp = Interpreter::new();
    interp
        .process(src, "main.str", true)
        .expect_err("script should fail")
}

// ═══════════════════════════════════════════════════════════════════════
// Error Kinds
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_unbalanced_source_names_file_and_line() {
    let err = fail("x = 1;\ny = (2 + 3;");
    assert_eq!(err.kind(), ErrorKind::SyntaxImbalance);
    assert_eq!(err.to_string(), "Unbalanced brackets in main.str at line 2");
}

#[test]
fn test_unterminated_string() {
    let err = fail("s = \"open;");
    assert_eq!(err.kind(), ErrorKind::SyntaxImbalance);
    assert!(err.to_string().contains("quotes"));
}

#[test]
fn test_kinds_by_cause() {
    assert_eq!(fail("x = nope;").kind(), ErrorKind::UnknownSymbol);
    assert_eq!(fail("x = [1] - 1;").kind(), ErrorKind::TypeMismatch);
    assert_eq!(
        fail("function f(a) { return a; } f(1, a=2);").kind(),
        ErrorKind::ArgumentMismatch
    );
    assert_eq!(fail("throw \"stop\";").kind(), ErrorKind::UserThrown);
    assert_eq!(fail("x = 1 +;").kind(), ErrorKind::SyntaxImbalance);
    assert_eq!(fail("include(\"no/such/file.str\");").kind(), ErrorKind::Io);
}

#[test]
fn test_uncaught_error_carries_frame_trace() {
    let err = fail(
        "function outer() { return inner(); }
         function inner() { return [1] * 2; }
         outer();",
    );
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    assert_eq!(err.trace(), ["inner".to_string(), "outer".to_string()]);
    assert_eq!(err.trace_text(), "at inner()\nat outer()");
}

// ═══════════════════════════════════════════════════════════════════════
// Catching
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_catch_three_frames_deep() {
    let mut interp = Interpreter::new();
    interp
        .process(
            "function c() { throw \"deep \" + 3; }
             function b() { return c(); }
             function a() { return b(); }
             try { a(); } catch (e, trace) { m = e; t = trace; s = e.stack; }",
            "main.str",
            true,
        )
        .unwrap();

    assert_eq!(interp.get_variable("m", "main.str"), Some(Value::string("deep 3")));
    assert_eq!(
        interp.get_variable("t", "main.str"),
        Some(Value::string("at c()\nat b()\nat a()"))
    );
    assert_eq!(interp.get_variable("s", "main.str"), interp.get_variable("t", "main.str"));
    assert_eq!(interp.depth(), 0);
    assert_eq!(interp.call_depth(), 0);
}

#[test]
fn test_runtime_failures_are_catchable() {
    let mut interp = Interpreter::new();
    interp
        .process("try { y = nope; } catch (e) { m = e; }", "main.str", true)
        .unwrap();
    assert_eq!(
        interp.get_variable("m", "main.str"),
        Some(Value::string("Unknown symbol: nope"))
    );
}

#[test]
fn test_rethrow_from_handler() {
    let err = fail("try { throw \"a\"; } catch (e) { throw \"b:\" + e; }");
    assert_eq!(err.kind(), ErrorKind::UserThrown);
    assert_eq!(err.message(), "b:a");
}

#[test]
fn test_catch_inside_function_recovers() {
    let mut interp = Interpreter::new();
    interp
        .process(
            "function risky() { throw \"x\"; }
             function safe() { try { return risky(); } catch (e) { return \"recovered \" + e; } }
             r = safe();",
            "main.str",
            true,
        )
        .unwrap();
    assert_eq!(
        interp.get_variable("r", "main.str"),
        Some(Value::string("recovered x"))
    );
    assert_eq!(interp.depth(), 0);
    assert_eq!(interp.call_depth(), 0);
}

#[test]
fn test_interpreter_usable_after_failure() {
    let mut interp = Interpreter::new();
    let err = interp
        .process("function f() { return g(); } f();", "main.str", true)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownSymbol);

    let out = interp.process("function g() { return 5; } f();", "main.str", true).unwrap();
    assert_eq!(out, Value::number(5.0));
    assert_eq!(interp.depth(), 0);
}
