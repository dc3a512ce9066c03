//! Tests for classes, instances and copy-inheritance

use pretty_assertions::assert_eq;
use strand::*;

const SHAPES: &str = "
class Shape {
    name = \"shape\";
    sides = 0;
    function describe() { return name + \"/\" + sides; }
    function grow() { sides += 1; }
}

class Point {
    x = 0;
    var y = 0;
    function Point(x, y = 0) { this.x = x; this.y = y; }
    function norm() { return x * x + y * y; }
    function shift(dx) { x += dx; return this; }
}

class Square : Shape {
    function Square() { name = \"square\"; sides = 4; }
    function area(s) { return s * s; }
}
";

fn run(src: &str) -> Interpreter {
    let mut interp = Interpreter::new();
    interp
        .process(&format!("{}\n{}", SHAPES, src), "main.str", true)
        .expect("script failed");
    interp
}

fn var(interp: &Interpreter, name: &str) -> Value {
    interp
        .get_variable(name, "main.str")
        .unwrap_or_else(|| panic!("{} is not defined", name))
}

#[test]
fn test_constructor_with_default_argument() {
    let interp = run("p = new Point(3); q = new Point(3, 4); a = p.x + p.y; b = q.norm();");
    assert_eq!(var(&interp, "a"), Value::number(3.0));
    assert_eq!(var(&interp, "b"), Value::number(25.0));
}

#[test]
fn test_class_name_call_instantiates() {
    let interp = run("p = Point(1, 1); n = p.norm();");
    assert_eq!(var(&interp, "n"), Value::number(2.0));
}

#[test]
fn test_methods_write_fields_back() {
    let interp = run("s = new Shape(); s.grow(); s.grow(); d = s.describe();");
    assert_eq!(var(&interp, "d"), Value::string("shape/2"));
}

#[test]
fn test_instances_have_separate_fields() {
    let interp = run("a = new Shape(); b = new Shape(); a.grow(); na = a.sides; nb = b.sides;");
    assert_eq!(var(&interp, "na"), Value::number(1.0));
    assert_eq!(var(&interp, "nb"), Value::number(0.0));
}

#[test]
fn test_field_assignment_from_outside() {
    let interp = run("p = new Point(1, 2); p.x = 10; n = p.norm();");
    assert_eq!(var(&interp, "n"), Value::number(104.0));
}

#[test]
fn test_method_returning_this_chains() {
    let interp = run("p = new Point(1, 0); n = p.shift(2).shift(3).x;");
    assert_eq!(var(&interp, "n"), Value::number(6.0));
}

#[test]
fn test_inheritance_copies_base_members() {
    let interp = run("sq = new Square(); d = sq.describe(); a = sq.area(3); sq.grow(); s = sq.sides;");
    assert_eq!(var(&interp, "d"), Value::string("square/4"));
    assert_eq!(var(&interp, "a"), Value::number(9.0));
    assert_eq!(var(&interp, "s"), Value::number(5.0));
}

#[test]
fn test_instance_directory_names() {
    let interp = run("a = new Shape(); b = new Square();");
    let first = interp.instance("Shape#1").expect("Shape#1 is live");
    assert_eq!(first.type_name(), "Shape");
    assert!(interp.instance("Square#2").is_some());
    assert!(interp.instance("Point#3").is_none());
}

#[test]
fn test_wrong_constructor_arity() {
    let mut interp = Interpreter::new();
    interp.process(SHAPES, "main.str", true).unwrap();
    let err = interp.process("p = new Point(1, 2, 3);", "main.str", true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ArgumentMismatch);
}

#[test]
fn test_unknown_base_class() {
    let mut interp = Interpreter::new();
    let err = interp.process("class C : Missing { }", "main.str", true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownSymbol);
}

#[test]
fn test_host_constructor_fallback() {
    let mut interp = Interpreter::new();
    interp.register_objects(|objects| {
        objects.register_constructor("Counter", Some(1), |args: &[Value]| {
            Ok(Value::object(ObjectHandle::foreign("Counter", args[0].as_number())))
        });
        objects.register_property("Counter", "start", |handle: &ObjectHandle| {
            Ok(Value::number(handle.downcast::<f64>().copied().unwrap_or_default()))
        });
    });
    let out = interp.process("c = new Counter(7); c.start;", "main.str", true).unwrap();
    assert_eq!(out, Value::number(7.0));
}
