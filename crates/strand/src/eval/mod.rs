//! The control-flow engine
//!
//! Scripts run straight off the cursor: every statement is read, resolved
//! and executed in one pass, and untaken branches are skipped by bracket
//! scanning. The [`Engine`] trait is the seam where another execution
//! strategy could replace this one without touching values or scopes.

pub mod assign;
pub mod block;
pub mod control;
pub mod expr;
pub mod if_stmt;
pub mod literal;
pub mod loops;
pub mod switch;
pub mod try_catch;

use crate::cursor::Script;
use crate::dispatch::{call, class, function};
use crate::error::Result;
use crate::handler::Handler;
use crate::interpreter::Interpreter;
use crate::value::Value;

/// Trait for things that run at the cursor once their name has been read.
pub trait Evaluate {
    /// Evaluate against the interpreter, consuming any call syntax that
    /// follows at the cursor.
    fn eval(&self, interp: &mut Interpreter, script: &mut Script) -> Result<Value>;
}

impl Evaluate for Handler {
    fn eval(&self, interp: &mut Interpreter, script: &mut Script) -> Result<Value> {
        match self {
            Handler::Keyword(keyword) => control::keyword(interp, script, *keyword),
            Handler::Variable(value) => Ok(value.clone()),
            Handler::Native(native) => {
                let args = call::read_values(interp, script)?;
                call::call_native(interp, script, native, &args)
            }
            Handler::Custom(custom) => {
                let args = call::read_args(interp, script)?;
                let this = match custom.class {
                    Some(_) => interp.lookup("this", script.filename()).ok(),
                    None => None,
                };
                function::call(interp, custom, args, this.as_ref())
            }
            Handler::Compiled(compiled) => {
                let args = call::read_values(interp, script)?;
                crate::compiled::invoke(interp, compiled, &args)
            }
            Handler::Class(def) => {
                let args = call::read_args(interp, script)?;
                class::instantiate(interp, def, args)
            }
            Handler::Action(action) => {
                Err(script.syntax_error(format!("unexpected '{}'", action.token)))
            }
        }
    }
}

/// An execution strategy for scripts.
pub trait Engine: Send + Sync {
    /// Run every statement of `script`, returning the last value or a signal.
    fn run(&self, interp: &mut Interpreter, script: &mut Script) -> Result<Value>;

    /// Evaluate `script` as one expression.
    fn evaluate(&self, interp: &mut Interpreter, script: &mut Script) -> Result<Value>;
}

/// The cursor-driven engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct CursorEngine;

impl Engine for CursorEngine {
    fn run(&self, interp: &mut Interpreter, script: &mut Script) -> Result<Value> {
        block::run(interp, script)
    }

    fn evaluate(&self, interp: &mut Interpreter, script: &mut Script) -> Result<Value> {
        expr::evaluate_all(interp, script)
    }
}
