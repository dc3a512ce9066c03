//! Symbol handlers: the units of behavior a name can resolve to

use std::fmt;
use std::sync::Arc;

use crate::compiled::CompiledFunction;
use crate::cursor::Script;
use crate::dispatch::{ClassDef, CustomFunction};
use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::value::{Data, Value};

/// Type alias for native function pointers.
///
/// Natives receive the interpreter, the calling script (for file context)
/// and their evaluated arguments.
pub type NativeFnPtr =
    Arc<dyn Fn(&mut Interpreter, &Script, &[Value]) -> Result<Value> + Send + Sync>;

/// Type alias for action functions: `(current target, operand) -> new target`.
pub type ActionFnPtr = Arc<dyn Fn(&Value, &Value) -> Result<Value> + Send + Sync>;

/// A built-in native function.
#[derive(Clone)]
pub struct BuiltinFn {
    /// Function name (for display/debugging)
    pub name: String,

    /// Arity (-1 for variadic)
    pub arity: i32,

    /// The implementation
    pub func: NativeFnPtr,
}

impl BuiltinFn {
    /// Create a native function.
    pub fn new(
        name: impl Into<String>,
        arity: i32,
        func: impl Fn(&mut Interpreter, &Script, &[Value]) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            arity,
            func: Arc::new(func),
        }
    }
}

impl fmt::Debug for BuiltinFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BuiltinFn({})", self.name)
    }
}

/// An assignment-style operator applied to a target (`=`, `+=`, `++`, ...).
#[derive(Clone)]
pub struct Action {
    /// Token as written in scripts
    pub token: String,

    /// Whether an operand expression follows the token
    pub takes_operand: bool,

    /// Whether the target's current value is read (false only for `=`)
    pub reads_target: bool,

    /// Computes the new target value
    pub apply: ActionFnPtr,
}

impl Action {
    /// An action with an operand that combines it with the current value.
    pub fn binary(
        token: impl Into<String>,
        apply: impl Fn(&Value, &Value) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            token: token.into(),
            takes_operand: true,
            reads_target: true,
            apply: Arc::new(apply),
        }
    }

    /// An action without operand (`++`, `--`).
    pub fn unary(
        token: impl Into<String>,
        apply: impl Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            token: token.into(),
            takes_operand: false,
            reads_target: true,
            apply: Arc::new(move |current: &Value, _: &Value| apply(current)),
        }
    }

    /// Plain assignment.
    pub fn assign() -> Self {
        Self {
            token: "=".to_string(),
            takes_operand: true,
            reads_target: false,
            apply: Arc::new(|_: &Value, operand: &Value| Ok(operand.clone())),
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Action({})", self.token)
    }
}

/// Language keywords, one variant per spelling (`exit` shares [`Keyword::Quit`]).
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    If,
    Elif,
    Else,
    While,
    Do,
    For,
    Switch,
    Case,
    Default,
    Try,
    Catch,
    Throw,
    Return,
    Break,
    Continue,
    Quit,
    Function,
    CFunction,
    Class,
    Namespace,
    Var,
    Enum,
    New,
    Lock,
    Thread,
    Spawn,
}

impl Keyword {
    /// Look up the keyword spelled `name`.
    pub fn from_name(name: &str) -> Option<Self> {
        let kw = match name {
            "if" => Keyword::If,
            "elif" => Keyword::Elif,
            "else" => Keyword::Else,
            "while" => Keyword::While,
            "do" => Keyword::Do,
            "for" => Keyword::For,
            "switch" => Keyword::Switch,
            "case" => Keyword::Case,
            "default" => Keyword::Default,
            "try" => Keyword::Try,
            "catch" => Keyword::Catch,
            "throw" => Keyword::Throw,
            "return" => Keyword::Return,
            "break" => Keyword::Break,
            "continue" => Keyword::Continue,
            "quit" | "exit" => Keyword::Quit,
            "function" => Keyword::Function,
            "cfunction" => Keyword::CFunction,
            "class" => Keyword::Class,
            "namespace" => Keyword::Namespace,
            "var" => Keyword::Var,
            "enum" => Keyword::Enum,
            "new" => Keyword::New,
            "lock" => Keyword::Lock,
            "thread" => Keyword::Thread,
            "spawn" => Keyword::Spawn,
            _ => return None,
        };
        Some(kw)
    }
}

/// What a handler can do, for callers that branch on behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Runs as a statement (keywords)
    Statement,
    /// Applies to an assignment target
    Action,
    /// Callable with `( ... )`
    Function,
    /// Yields a stored value
    Variable,
    /// Instantiable class
    Class,
    /// Holds a class instance
    Instance,
}

/// A name-bound unit of behavior.
#[derive(Clone)]
pub enum Handler {
    /// Keyword statement
    Keyword(Keyword),
    /// Assignment-style operator
    Action(Arc<Action>),
    /// Host-provided function
    Native(Arc<BuiltinFn>),
    /// Script-defined function
    Custom(Arc<CustomFunction>),
    /// Function delegated to the compilation backend
    Compiled(Arc<CompiledFunction>),
    /// Stored value
    Variable(Value),
    /// Script-defined class
    Class(Arc<ClassDef>),
}

impl Handler {
    /// The handler's capability tag.
    pub fn capability(&self) -> Capability {
        match self {
            Handler::Keyword(_) => Capability::Statement,
            Handler::Action(_) => Capability::Action,
            Handler::Native(_) | Handler::Custom(_) | Handler::Compiled(_) => {
                Capability::Function
            }
            Handler::Variable(v) if matches!(v.data(), Data::Object(o) if o.as_instance().is_some()) => {
                Capability::Instance
            }
            Handler::Variable(_) => Capability::Variable,
            Handler::Class(_) => Capability::Class,
        }
    }

    /// Wrap a native closure.
    pub fn native(
        name: impl Into<String>,
        arity: i32,
        func: impl Fn(&mut Interpreter, &Script, &[Value]) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Handler::Native(Arc::new(BuiltinFn::new(name, arity, func)))
    }

    /// The stored value, for variable handlers.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Handler::Variable(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Keyword(k) => write!(f, "Keyword({:?})", k),
            Handler::Action(a) => write!(f, "{:?}", a),
            Handler::Native(n) => write!(f, "{:?}", n),
            Handler::Custom(c) => write!(f, "Custom({})", c.name),
            Handler::Compiled(c) => write!(f, "Compiled({})", c.name),
            Handler::Variable(v) => write!(f, "Variable({:?})", v),
            Handler::Class(c) => write!(f, "Class({})", c.name),
        }
    }
}

impl From<Value> for Handler {
    fn from(value: Value) -> Self {
        Handler::Variable(value)
    }
}
