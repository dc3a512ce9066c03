//! Error types for script evaluation

use std::fmt;

use thiserror::Error;

/// What kind of delimiter was left unbalanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Imbalance {
    /// `(`, `[` or `{` without its partner (or a stray closer)
    Brackets,
    /// A string literal that never terminates
    Quotes,
}

impl fmt::Display for Imbalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Imbalance::Brackets => write!(f, "brackets"),
            Imbalance::Quotes => write!(f, "quotes"),
        }
    }
}

/// Coarse classification of a [`ScriptError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unmatched bracket or quote, or otherwise malformed source
    SyntaxImbalance,
    /// Wrong arity or an illegal named/positional mix
    ArgumentMismatch,
    /// Name not resolvable as variable, function or class
    UnknownSymbol,
    /// Operation applied to a value of the wrong type
    TypeMismatch,
    /// Loop iteration ceiling exceeded
    InfiniteLoopSuspected,
    /// The native-compilation backend rejected a function
    CompileFailure,
    /// Raised by a script `throw`
    UserThrown,
    /// Call depth limit exceeded
    StackOverflow,
    /// Cancellation flag observed
    Interrupted,
    /// File access failed
    Io,
}

/// Main error type for script evaluation.
#[derive(Error, Debug, Clone)]
pub enum ScriptError {
    /// Unbalanced brackets or quotes found while normalizing
    #[error("Unbalanced {what} in {file} at line {line}")]
    SyntaxImbalance {
        /// Which delimiter family
        what: Imbalance,
        /// Source file name
        file: String,
        /// 1-based source line
        line: usize,
    },

    /// Malformed statement or expression
    #[error("Syntax error at line {line}: {message}")]
    Syntax {
        /// What was wrong
        message: String,
        /// 1-based source line (0 when unknown)
        line: usize,
    },

    /// Arguments could not be bound to parameters
    #[error("Argument mismatch in {function}: {message}")]
    ArgumentMismatch {
        /// Callee name
        function: String,
        /// Details
        message: String,
    },

    /// Unresolvable name
    #[error("Unknown symbol: {name}")]
    UnknownSymbol {
        /// The name that failed to resolve
        name: String,
    },

    /// Type mismatch
    #[error("Type error: expected {expected}, got {got}")]
    TypeMismatch {
        /// Expected type
        expected: String,
        /// Actual type received
        got: String,
    },

    /// Loop ran past the configured ceiling
    #[error("Infinite loop suspected: more than {limit} iterations")]
    InfiniteLoop {
        /// The ceiling that was exceeded
        limit: usize,
    },

    /// Compiled-function backend failure
    #[error("Failed to compile {function}: {message}")]
    CompileFailure {
        /// Function being compiled
        function: String,
        /// Backend diagnostics
        message: String,
    },

    /// Script-level `throw`
    #[error("{message}")]
    UserThrown {
        /// Thrown text
        message: String,
    },

    /// Too many nested calls
    #[error("Stack overflow: depth {depth} exceeds maximum {max}")]
    StackOverflow {
        /// Depth reached
        depth: usize,
        /// Configured maximum
        max: usize,
    },

    /// Evaluation was cancelled
    #[error("Evaluation interrupted")]
    Interrupted,

    /// File could not be read
    #[error("Cannot read {path}: {message}")]
    Io {
        /// Path that failed
        path: String,
        /// Underlying error text
        message: String,
    },

    /// An error annotated with the call frames it unwound through
    #[error("{source}")]
    Traced {
        /// The original failure
        source: Box<ScriptError>,
        /// Frame names, innermost first
        trace: Vec<String>,
    },
}

impl ScriptError {
    /// Create a syntax error.
    pub fn syntax(message: impl Into<String>, line: usize) -> Self {
        ScriptError::Syntax {
            message: message.into(),
            line,
        }
    }

    /// Create a type mismatch.
    pub fn type_mismatch(expected: impl Into<String>, got: impl Into<String>) -> Self {
        ScriptError::TypeMismatch {
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// Create an argument mismatch for `function`.
    pub fn arguments(function: impl Into<String>, message: impl Into<String>) -> Self {
        ScriptError::ArgumentMismatch {
            function: function.into(),
            message: message.into(),
        }
    }

    /// Create an unknown-symbol error.
    pub fn unknown(name: impl Into<String>) -> Self {
        ScriptError::UnknownSymbol { name: name.into() }
    }

    /// Record that this error unwound through the frame `name`.
    pub fn in_frame(self, name: &str) -> Self {
        match self {
            ScriptError::Traced { source, mut trace } => {
                trace.push(name.to_string());
                ScriptError::Traced { source, trace }
            }
            other => ScriptError::Traced {
                source: Box::new(other),
                trace: vec![name.to_string()],
            },
        }
    }

    /// The error with any trace annotation removed.
    pub fn root(&self) -> &ScriptError {
        match self {
            ScriptError::Traced { source, .. } => source.root(),
            other => other,
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            ScriptError::SyntaxImbalance { .. } | ScriptError::Syntax { .. } => {
                ErrorKind::SyntaxImbalance
            }
            ScriptError::ArgumentMismatch { .. } => ErrorKind::ArgumentMismatch,
            ScriptError::UnknownSymbol { .. } => ErrorKind::UnknownSymbol,
            ScriptError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            ScriptError::InfiniteLoop { .. } => ErrorKind::InfiniteLoopSuspected,
            ScriptError::CompileFailure { .. } => ErrorKind::CompileFailure,
            ScriptError::UserThrown { .. } => ErrorKind::UserThrown,
            ScriptError::StackOverflow { .. } => ErrorKind::StackOverflow,
            ScriptError::Interrupted => ErrorKind::Interrupted,
            ScriptError::Io { .. } => ErrorKind::Io,
            ScriptError::Traced { .. } => ErrorKind::UserThrown,
        }
    }

    /// The message a script `catch` sees.
    pub fn message(&self) -> String {
        self.root().to_string()
    }

    /// Frame names the error unwound through, innermost first.
    pub fn trace(&self) -> &[String] {
        match self {
            ScriptError::Traced { trace, .. } => trace,
            _ => &[],
        }
    }

    /// The trace rendered one frame per line.
    pub fn trace_text(&self) -> String {
        self.trace()
            .iter()
            .map(|name| format!("at {}()", name))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Result type alias for script evaluation
pub type Result<T> = std::result::Result<T, ScriptError>;
