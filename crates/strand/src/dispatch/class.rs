//! Script-defined classes and their instances
//!
//! ```text
//! class Point : Shape {
//!     x = 0;
//!     var y = 0;
//!     function Point(x, y = 0) { this.x = x; this.y = y; }
//!     function norm() { return x * x + y * y; }
//! }
//! ```
//!
//! Inheritance copies: a class starts from the method, field-default and
//! constructor tables of each base in declaration order (a later base wins),
//! then its own members override.

use std::collections::BTreeMap;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::cursor::{split_top_level, Script};
use crate::error::{Result, ScriptError};
use crate::eval::{block, expr};
use crate::handler::Handler;
use crate::interpreter::Interpreter;
use crate::value::{ObjectHandle, Value};

use super::call::{self, Arg};
use super::function::{self, CustomFunction};

/// A class definition.
#[derive(Debug, Clone, Default)]
pub struct ClassDef {
    /// Class name
    pub name: String,

    /// Declared bases, in order
    pub bases: Vec<String>,

    /// Methods by name
    pub methods: IndexMap<String, Arc<CustomFunction>>,

    /// Field defaults, evaluated when the class is defined
    pub defaults: IndexMap<String, Value>,

    /// Constructors by accepted argument count
    pub constructors: BTreeMap<usize, Arc<CustomFunction>>,
}

impl ClassDef {
    /// Create an empty class.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Copy the tables of `base` into this class.
    fn inherit(&mut self, base: &ClassDef) {
        for (name, method) in &base.methods {
            self.methods.insert(name.clone(), method.clone());
        }
        for (name, value) in &base.defaults {
            self.defaults.insert(name.clone(), value.deep_clone());
        }
        for (arity, ctor) in &base.constructors {
            self.constructors.insert(*arity, ctor.clone());
        }
    }

    /// Register `ctor` for every argument count it accepts.
    fn add_constructor(&mut self, ctor: Arc<CustomFunction>) {
        for arity in ctor.required()..=ctor.params.len() {
            self.constructors.insert(arity, ctor.clone());
        }
    }
}

/// A live instance of a script class.
#[derive(Debug)]
pub struct Instance {
    /// The instantiated class
    pub class: Arc<ClassDef>,

    /// Directory name (`Class#N`)
    pub name: String,

    /// Field values
    pub fields: IndexMap<String, Value>,
}

/// Handle a `class` statement.
pub(crate) fn define(interp: &mut Interpreter, script: &mut Script) -> Result<Value> {
    let name = script.read_token();
    if name.is_empty() {
        return Err(script.syntax_error("expected a class name"));
    }
    let mut class = ClassDef::new(&name);

    script.skip_spaces();
    if script.consume(":") {
        let list = script.read_until(&['{']);
        for base_name in split_top_level(&list, ',') {
            match interp.resolve(&base_name, script.filename()) {
                Some(Handler::Class(base)) => class.inherit(&base),
                _ => return Err(ScriptError::unknown(base_name)),
            }
            class.bases.push(base_name);
        }
    }

    let text = script.read_balanced('{', '}')?;
    let mut body = script.child(&text);
    read_members(interp, &mut class, &mut body)?;

    tracing::debug!(
        class = name.as_str(),
        methods = class.methods.len(),
        fields = class.defaults.len(),
        "class defined"
    );
    interp.define_declaration(&name, Handler::Class(Arc::new(class)));
    Ok(Value::none())
}

fn read_members(interp: &mut Interpreter, class: &mut ClassDef, body: &mut Script) -> Result<()> {
    loop {
        body.skip_spaces();
        if body.at_end() {
            return Ok(());
        }
        if body.consume(";") {
            continue;
        }

        let mut token = body.read_token();
        if token == "function" {
            let mut method = function::parse(interp, body)?;
            method.class = Some(class.name.clone());
            let method = Arc::new(method);
            if method.name == class.name {
                class.add_constructor(method);
            } else {
                class.methods.insert(method.name.clone(), method);
            }
            continue;
        }
        if token == "var" {
            token = body.read_token();
        }
        if !call::is_identifier(&token) {
            return Err(body.syntax_error(format!("unexpected member in class {}", class.name)));
        }

        body.skip_spaces();
        let value = if body.consume("=") {
            expr::evaluate(interp, body)?
        } else {
            Value::none()
        };
        block::end_statement(body)?;
        class.defaults.insert(token, value);
    }
}

/// Create an instance of `class`, running the constructor matching the
/// argument count.
///
/// # Errors
///
/// `ArgumentMismatch` when arguments are given and no constructor accepts
/// that many.
pub fn instantiate(interp: &mut Interpreter, class: &Arc<ClassDef>, args: Vec<Arg>) -> Result<Value> {
    let fields = class
        .defaults
        .iter()
        .map(|(name, value)| (name.clone(), value.deep_clone()))
        .collect();
    let instance = Arc::new(Mutex::new(Instance {
        class: class.clone(),
        name: String::new(),
        fields,
    }));
    let name = interp
        .shared
        .symbols
        .lock()
        .register_instance(&class.name, &instance);
    instance.lock().name = name;

    let value = Value::object(ObjectHandle::instance(&class.name, instance));
    match class.constructors.get(&args.len()) {
        Some(ctor) => {
            function::call(interp, ctor, args, Some(&value))?;
        }
        None if args.is_empty() => {}
        None => {
            return Err(ScriptError::arguments(
                &class.name,
                format!("no constructor takes {} arguments", args.len()),
            ));
        }
    }
    Ok(value)
}

/// Handle `new Name(args)` following the `new` keyword.
///
/// Script classes take precedence over host-registered constructors.
pub(crate) fn construct(interp: &mut Interpreter, script: &mut Script) -> Result<Value> {
    let mut name = script.read_token();
    while script.current() == Some('.') && interp.is_namespace(&name) {
        script.advance();
        name = format!("{}.{}", name, script.read_token());
    }
    if name.is_empty() {
        return Err(script.syntax_error("expected a class name after 'new'"));
    }
    let args = call::read_args(interp, script)?;

    if let Some(Handler::Class(class)) = interp.resolve(&name, script.filename()) {
        return instantiate(interp, &class, args);
    }
    let values: Vec<Value> = args.into_iter().map(|arg| arg.value).collect();
    let ctor = interp.shared.objects.read().constructor(&name, values.len());
    match ctor {
        Some(ctor) => ctor(&values),
        None => Err(ScriptError::unknown(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::Param;

    fn ctor(params: Vec<Param>) -> Arc<CustomFunction> {
        Arc::new(CustomFunction {
            name: "P".to_string(),
            params,
            body: String::new(),
            origin: Script::from_source("", "t").unwrap(),
            namespace: None,
            class: Some("P".to_string()),
        })
    }

    #[test]
    fn test_default_arguments_collapse_constructor_arities() {
        let mut class = ClassDef::new("P");
        class.add_constructor(ctor(vec![
            Param::new("x", None),
            Param::new("y", Some("0")),
            Param::new("z", Some("0")),
        ]));
        let arities: Vec<usize> = class.constructors.keys().copied().collect();
        assert_eq!(arities, vec![1, 2, 3]);
    }

    #[test]
    fn test_inherit_later_base_wins() {
        let mut a = ClassDef::new("A");
        a.defaults.insert("x".into(), Value::number(1.0));
        a.defaults.insert("y".into(), Value::number(1.0));
        let mut b = ClassDef::new("B");
        b.defaults.insert("x".into(), Value::number(2.0));

        let mut c = ClassDef::new("C");
        c.inherit(&a);
        c.inherit(&b);
        assert_eq!(c.defaults["x"], Value::number(2.0));
        assert_eq!(c.defaults["y"], Value::number(1.0));
    }

    #[test]
    fn test_instances_are_registered() {
        let mut interp = Interpreter::new();
        let class = Arc::new(ClassDef::new("Empty"));
        let value = instantiate(&mut interp, &class, Vec::new()).unwrap();
        let name = value
            .as_object()
            .and_then(|o| o.as_instance())
            .map(|i| i.lock().name.clone())
            .unwrap();
        assert_eq!(name, "Empty#1");
        assert!(interp.instance("Empty#1").is_some());
    }

    #[test]
    fn test_arguments_without_constructor_fail() {
        let mut interp = Interpreter::new();
        let class = Arc::new(ClassDef::new("Empty"));
        let err = instantiate(&mut interp, &class, vec![Arg::positional(Value::number(1.0))]);
        assert!(err.is_err());
    }
}
