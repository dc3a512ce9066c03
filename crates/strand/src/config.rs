//! Interpreter configuration and cooperative cancellation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Deserialize;

/// Tunables for an interpreter and every worker it launches.
///
/// Deserializable so hosts can keep it next to their own settings:
///
/// ```
/// use strand::InterpreterConfig;
///
/// let config = InterpreterConfig::from_json(r#"{ "max_call_depth": 64 }"#).unwrap();
/// assert_eq!(config.max_call_depth, 64);
/// assert_eq!(config.max_loop_iterations, 262_144);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Iterations any single loop may run before `InfiniteLoop` is raised
    pub max_loop_iterations: usize,

    /// Maximum nesting of script function calls
    pub max_call_depth: usize,

    /// Emit a `trace!` event for every executed statement
    pub trace: bool,

    /// Stack size for worker threads, in bytes
    pub worker_stack_size: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_loop_iterations: 256 * 1024,
            max_call_depth: 256,
            trace: false,
            worker_stack_size: 8 * 1024 * 1024,
        }
    }
}

impl InterpreterConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON; missing fields keep their defaults.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Builder-style override of the loop ceiling.
    pub fn with_max_loop_iterations(mut self, limit: usize) -> Self {
        self.max_loop_iterations = limit;
        self
    }

    /// Builder-style override of the call depth limit.
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }
}

/// Cancellation flag shared by an interpreter and its workers.
///
/// Long-running operations poll it; nothing is preempted. The flag is
/// process-wide only from the point of view of one interpreter: each
/// [`Interpreter`](crate::Interpreter) owns its own, so cancelling one never
/// stops another. Hosts wanting a single switch for several interpreters
/// call `cancel` on each of their [`cancel_flag`](crate::Interpreter::cancel_flag)
/// handles.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create a flag in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Clear the flag.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}
