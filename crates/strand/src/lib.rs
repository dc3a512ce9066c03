//! # Strand
//!
//! An embeddable interpreter for a small dynamically-typed scripting
//! language.
//!
//! Strand executes scripts straight off their normalized text: there is no
//! AST and no bytecode. A cursor walks the text, names resolve to handlers
//! through a scope stack, and untaken branches are skipped by bracket
//! scanning.
//!
//! ## Architecture
//!
//! - **Normalizer**: strips comments and insignificant whitespace
//! - **Cursor**: bracket- and quote-aware navigation over the canonical text
//! - **Values**: one tagged union for scalars, arrays, maps, enums and objects
//! - **Scopes**: globals, call frames, file-local scopes and namespaces
//! - **Engine**: statements, control flow and the break/continue/return/quit signals
//! - **Dispatch**: functions with defaults and named arguments, classes
//!
//! ## Example
//!
//! ```
//! use strand::{Interpreter, OutputSink, Value};
//!
//! let mut interp = Interpreter::new();
//! let (sink, buffer) = OutputSink::buffer();
//! interp.set_output(sink);
//!
//! let result = interp
//!     .process("function sq(x) { return x * x; } print(sq(4)); sq(5);", "demo", true)
//!     .unwrap();
//! assert_eq!(result, Value::number(25.0));
//! assert_eq!(buffer.contents(), "16\n");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compiled;
pub mod config;
pub mod cursor;
pub mod dispatch;
pub mod error;
pub mod eval;
pub mod handler;
mod interpreter;
pub mod normalizer;
pub mod objects;
pub mod output;
mod prelude;
pub mod scope;
mod stack;
pub mod value;

// Re-export main types
pub use compiled::{ArgBuckets, ArgKind, CompiledHandle, CompilerBackend, TypedParam};
pub use config::{CancelFlag, InterpreterConfig};
pub use cursor::Script;
pub use error::{ErrorKind, Result, ScriptError};
pub use eval::{CursorEngine, Engine, Evaluate};
pub use handler::{Action, BuiltinFn, Capability, Handler, Keyword};
pub use interpreter::Interpreter;
pub use normalizer::normalize;
pub use objects::ObjectRegistry;
pub use output::{BufferSink, OutputSink};
pub use value::marshal::{marshal, unmarshal};
pub use value::{Data, EnumValue, ObjectHandle, Value};

/// Strand version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
