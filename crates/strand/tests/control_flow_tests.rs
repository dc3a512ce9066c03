//! Tests for statements, loops, switch and control signals

use pretty_assertions::assert_eq;
use strand::*;

fn run(src: &str) -> Interpreter {
    let mut interp = Interpreter::new();
    interp.process(src, "main.str", true).expect("script failed");
    interp
}

fn var(interp: &Interpreter, name: &str) -> Value {
    interp
        .get_variable(name, "main.str")
        .unwrap_or_else(|| panic!("{} is not defined", name))
}

fn num(n: f64) -> Value {
    Value::number(n)
}

// ═══════════════════════════════════════════════════════════════════════
// Loop Signals
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_for_break_runs_two_iterations() {
    let interp = run("n = 0; for(i=0;i<5;i=i+1){ if(i==2) break; n = n + 1; }");
    assert_eq!(var(&interp, "n"), num(2.0));
    assert_eq!(var(&interp, "i"), num(2.0));
}

#[test]
fn test_continue_skips_rest_of_body() {
    let interp = run("odd = 0; for (i = 0; i < 6; i++) { if (i % 2 == 0) continue; odd += i; }");
    assert_eq!(var(&interp, "odd"), num(9.0));
}

#[test]
fn test_break_leaves_only_inner_loop() {
    let interp = run(
        "count = 0;
         for (i = 0; i < 3; i++) {
             for (j = 0; j < 10; j++) {
                 if (j == 2) { break; }
                 count++;
             }
         }",
    );
    assert_eq!(var(&interp, "count"), num(6.0));
}

#[test]
fn test_return_leaves_loop_and_function() {
    let interp = run(
        "function find(items, wanted) {
             for (x : items) { if (x == wanted) return \"found\"; }
             return \"missing\";
         }
         a = find([1, 2, 3], 2);
         b = find([1, 2, 3], 7);",
    );
    assert_eq!(var(&interp, "a"), Value::string("found"));
    assert_eq!(var(&interp, "b"), Value::string("missing"));
}

#[test]
fn test_quit_stops_script_with_code() {
    let mut interp = Interpreter::new();
    let out = interp
        .process("x = 1; while (true) { exit(4); } x = 2;", "main.str", true)
        .unwrap();
    assert_eq!(out.quit_code(), Some(4));
    assert_eq!(interp.get_variable("x", "main.str"), Some(num(1.0)));
}

#[test]
fn test_quit_inside_function_reaches_host() {
    let mut interp = Interpreter::new();
    let out = interp
        .process("function stop() { quit; } stop(); never = 1;", "main.str", true)
        .unwrap();
    assert_eq!(out.quit_code(), Some(0));
    assert_eq!(interp.get_variable("never", "main.str"), None);
}

// ═══════════════════════════════════════════════════════════════════════
// Conditionals
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_nested_if_with_single_statement_bodies() {
    let interp = run(
        "r = 0;
         if (1 < 2)
             if (2 > 3) r = 1;
             else r = 2;
         else
             r = 3;",
    );
    assert_eq!(var(&interp, "r"), num(2.0));
}

#[test]
fn test_short_circuit_skips_right_operand() {
    let interp = run("a = false && missing(); b = true || missing(); c = 1 && 2;");
    assert_eq!(var(&interp, "a"), Value::boolean(false));
    assert_eq!(var(&interp, "b"), Value::boolean(true));
    assert_eq!(var(&interp, "c"), Value::boolean(true));
}

#[test]
fn test_switch_on_strings() {
    let interp = run(
        "function kind(x) {
             switch (x) {
                 case \"a\": case \"e\": return \"vowel\";
                 default: return \"other\";
             }
         }
         v = kind(\"e\"); o = kind(\"z\");",
    );
    assert_eq!(var(&interp, "v"), Value::string("vowel"));
    assert_eq!(var(&interp, "o"), Value::string("other"));
}

#[test]
fn test_break_inside_switch_inside_loop() {
    let interp = run(
        "hits = 0;
         for (i = 0; i < 4; i++) {
             switch (i) { case 1: hits += 10; break; default: hits++; }
         }",
    );
    assert_eq!(var(&interp, "hits"), num(13.0));
}

// ═══════════════════════════════════════════════════════════════════════
// Iteration
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_for_each_over_map_and_enum() {
    let interp = run(
        "total = 0; for (v in {a: 1, b: 2}) total += v;
         enum Level { LOW, HIGH }
         names = \"\"; for (n of Level) names = names + n;",
    );
    assert_eq!(var(&interp, "total"), num(3.0));
    assert_eq!(var(&interp, "names"), Value::string("LOWHIGH"));
}

#[test]
fn test_loop_ceiling_is_configurable() {
    let config = InterpreterConfig::from_json(r#"{ "max_loop_iterations": 50 }"#).unwrap();
    let mut interp = Interpreter::with_config(config);
    let err = interp.process("i = 0; while (i < 100) i++;", "main.str", true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InfiniteLoopSuspected);

    let ok = interp.process("j = 0; while (j < 50) j++;", "main.str", true);
    assert!(ok.is_ok());
}

#[test]
fn test_comments_are_ignored() {
    let interp = run(
        "// leading comment
         x = 1; /* inline */ y = x + 1; // trailing",
    );
    assert_eq!(var(&interp, "y"), num(2.0));
}
