//! Tests for the `<name:TYPE:payload>` text format

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

#[test]
fn test_nested_collections_survive_a_round_trip() {
    let interp = run(
        "data = {name: \"a<b>\", list: [1, [2, \"x:y\"]], gap: null};
         text = marshal(data);
         back = unmarshal(text);
         same = back == data;
         inner = back.list[1][1];",
    );
    assert_eq!(var(&interp, "same"), Value::boolean(true));
    assert_eq!(var(&interp, "inner"), Value::string("x:y"));
    assert_eq!(
        var(&interp, "text"),
        Value::string(
            r"<:MAP:<name:STR:a\<b\>><list:ARR:<:NUM:1><:ARR:<:NUM:2><:STR:x\:y>>><gap:NON:>>"
        )
    );
}

#[test]
fn test_scalars() {
    let interp = run("a = marshal(2.5); b = marshal(\"\"); c = unmarshal(\"<v:NUM:-3>\");");
    assert_eq!(var(&interp, "a"), Value::string("<:NUM:2.5>"));
    assert_eq!(var(&interp, "b"), Value::string("<:STR:>"));
    assert_eq!(var(&interp, "c"), Value::number(-3.0));
}

#[test]
fn test_enum_round_trip() {
    let interp = run(
        "enum Color { RED, GREEN = 5 }
         back = unmarshal(marshal(Color));
         g = back.GREEN; t = back.type;",
    );
    assert_eq!(var(&interp, "g"), Value::number(5.0));
    assert_eq!(var(&interp, "t"), Value::string("ENUM"));
}

#[test]
fn test_instance_becomes_tagged_map() {
    let interp = run(
        "class Pair { left = 1; right = \"r\"; }
         p = new Pair();
         m = unmarshal(marshal(p));
         tag = m.__type; l = m.left; t = m.type;",
    );
    assert_eq!(var(&interp, "tag"), Value::string("Pair"));
    assert_eq!(var(&interp, "l"), Value::number(1.0));
    assert_eq!(var(&interp, "t"), Value::string("MAP"));
}

#[test]
fn test_host_values_round_trip() {
    let value = Value::map_from(vec![
        ("bytes", Value::bytes(vec![0, 127, 255])),
        ("list", Value::array(vec![Value::string("one"), Value::none()])),
    ]);
    let text = marshal(&value);
    assert_eq!(text, "<:MAP:<bytes:BYT:007fff><list:ARR:<:STR:one><:NON:>>>");
    assert_eq!(unmarshal(&text).unwrap(), value);
}

#[test]
fn test_malformed_text_is_a_syntax_error() {
    let mut interp = Interpreter::new();
    let err = interp
        .process("x = unmarshal(\"<:NUM:1\");", "main.str", true)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SyntaxImbalance);
}

#[test]
fn test_unkeyed_map_positions_survive_a_round_trip() {
    let interp = run(
        "a = [1, 2]; a[\"k\"] = 3; a[\"\"] = 4;
         text = marshal(a);
         b = unmarshal(text);
         sa = a.size; sb = b.size; same = b == a;
         second = b[1]; k = b.k; blank = b[\"\"];",
    );
    assert_eq!(
        var(&interp, "text"),
        Value::string(r"<:MAP:<:NUM:1><:NUM:2><k:NUM:3><\0:NUM:4>>")
    );
    assert_eq!(var(&interp, "sa"), Value::number(4.0));
    assert_eq!(var(&interp, "sb"), Value::number(4.0));
    assert_eq!(var(&interp, "same"), Value::boolean(true));
    assert_eq!(var(&interp, "second"), Value::number(2.0));
    assert_eq!(var(&interp, "k"), Value::number(3.0));
    assert_eq!(var(&interp, "blank"), Value::number(4.0));
}

#[test]
fn test_non_hex_byte_payload_is_rejected() {
    assert!(unmarshal("<:BYT:a\u{e9}1>").is_err());
    assert!(unmarshal("<:BYT:zz>").is_err());

    let mut interp = Interpreter::new();
    let err = interp
        .process("x = unmarshal(\"<:BYT:a\u{e9}1>\");", "main.str", true)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SyntaxImbalance);
}
