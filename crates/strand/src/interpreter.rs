//! The interpreter: shared state, name resolution and the host surface

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::Context;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};

use crate::compiled::CompilerBackend;
use crate::config::{CancelFlag, InterpreterConfig};
use crate::cursor::Script;
use crate::error::{Result, ScriptError};
use crate::eval::{CursorEngine, Engine};
use crate::handler::{Action, Handler, Keyword};
use crate::objects::ObjectRegistry;
use crate::output::OutputSink;
use crate::scope::{FrameKind, ScopeStack, SymbolTable};
use crate::value::{Data, Value};

/// State shared by an interpreter and every worker it launches.
pub(crate) struct Shared {
    pub(crate) symbols: Mutex<SymbolTable>,
    pub(crate) objects: RwLock<ObjectRegistry>,
    pub(crate) output: RwLock<OutputSink>,
    pub(crate) compiler: RwLock<Option<Arc<dyn CompilerBackend>>>,
    pub(crate) config: InterpreterConfig,
    pub(crate) cancel: CancelFlag,
    engine: Arc<dyn Engine>,
    workers: DashMap<u64, JoinHandle<Result<Value>>>,
    next_worker: AtomicU64,
    main_file: Mutex<Option<String>>,
}

/// The scope an assignment writes to.
enum Binding {
    Frame,
    Namespace(String, String),
    FileLocal,
    Global,
}

/// An embeddable script interpreter.
///
/// Each `Interpreter` owns its scope stack; globals, file-local scopes,
/// namespaces and host registrations are shared with the workers it
/// launches and guarded by one coarse lock. Independent interpreters share
/// nothing.
///
/// # Example
///
/// ```
/// use strand::{Interpreter, Value};
///
/// let mut interp = Interpreter::new();
/// interp.process("x = 6 * 7;", "main.str", true).unwrap();
/// assert_eq!(interp.get_variable("x", "main.str"), Some(Value::number(42.0)));
/// ```
pub struct Interpreter {
    pub(crate) shared: Arc<Shared>,
    pub(crate) stack: ScopeStack,
    calls: Vec<String>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Create an interpreter with default settings and the prelude loaded.
    pub fn new() -> Self {
        Self::with_config(InterpreterConfig::default())
    }

    /// Create an interpreter with a custom configuration.
    pub fn with_config(config: InterpreterConfig) -> Self {
        Self::with_engine(config, Arc::new(CursorEngine))
    }

    /// Create an interpreter driving scripts through `engine`.
    pub fn with_engine(config: InterpreterConfig, engine: Arc<dyn Engine>) -> Self {
        let shared = Shared {
            symbols: Mutex::new(SymbolTable::new()),
            objects: RwLock::new(ObjectRegistry::new()),
            output: RwLock::new(OutputSink::default()),
            compiler: RwLock::new(None),
            config,
            cancel: CancelFlag::new(),
            engine,
            workers: DashMap::new(),
            next_worker: AtomicU64::new(0),
            main_file: Mutex::new(None),
        };
        let mut interp = Self {
            shared: Arc::new(shared),
            stack: ScopeStack::new(),
            calls: Vec::new(),
        };
        crate::prelude::load(&mut interp);
        interp
    }

    /// The configuration in effect.
    pub fn config(&self) -> &InterpreterConfig {
        &self.shared.config
    }

    /// The scope stack of this thread.
    pub fn stack(&self) -> &ScopeStack {
        &self.stack
    }

    /// Current scope stack depth.
    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    /// File passed to the last `process` call with `is_main` set.
    pub fn main_file(&self) -> Option<String> {
        self.shared.main_file.lock().clone()
    }

    // ═══════════════════════════════════════════════════════════════════
    // Host Registration
    // ═══════════════════════════════════════════════════════════════════

    /// Install `handler` under `name`, as a native or as a global.
    ///
    /// Re-registration overwrites the previous handler and emits a
    /// diagnostic.
    pub fn register_function(&mut self, name: &str, handler: Handler, is_native: bool) {
        let replaced = {
            let mut symbols = self.shared.symbols.lock();
            if is_native {
                symbols.register_native(name, handler)
            } else {
                symbols.register_global(name, handler)
            }
        };
        if replaced.is_some() {
            tracing::warn!(name, "symbol re-registered");
            self.diagnostic(&format!("warning: '{}' was already registered and is replaced", name));
        }
    }

    /// Install a native closure under `name`.
    pub fn register_native(
        &mut self,
        name: &str,
        arity: i32,
        func: impl Fn(&mut Interpreter, &Script, &[Value]) -> Result<Value> + Send + Sync + 'static,
    ) {
        self.register_function(name, Handler::native(name, arity, func), true);
    }

    /// Install an assignment-style operator.
    pub fn register_action(&mut self, action: Action) {
        let token = action.token.clone();
        if self.shared.symbols.lock().register_action(action).is_some() {
            tracing::warn!(token = token.as_str(), "action re-registered");
        }
    }

    /// Install the native-compilation backend used by `cfunction`.
    pub fn set_compiler(&mut self, backend: impl CompilerBackend + 'static) {
        *self.shared.compiler.write() = Some(Arc::new(backend));
    }

    /// Register foreign-object capabilities.
    pub fn register_objects(&mut self, register: impl FnOnce(&mut ObjectRegistry)) {
        register(&mut self.shared.objects.write());
    }

    // ═══════════════════════════════════════════════════════════════════
    // Output
    // ═══════════════════════════════════════════════════════════════════

    /// Route script output and diagnostics to `sink`.
    pub fn set_output(&mut self, sink: OutputSink) {
        *self.shared.output.write() = sink;
    }

    /// Append script output.
    pub fn write(&self, text: &str) {
        self.shared.output.read().write(text);
    }

    /// Report a diagnostic through the output sink.
    pub fn diagnostic(&self, text: &str) {
        self.shared.output.read().diagnostic(text);
    }

    // ═══════════════════════════════════════════════════════════════════
    // Cancellation
    // ═══════════════════════════════════════════════════════════════════

    /// Request cooperative cancellation of this interpreter and its workers.
    pub fn cancel(&self) {
        self.shared.cancel.cancel();
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    /// Clear the cancellation flag.
    pub fn reset_cancel(&self) {
        self.shared.cancel.reset();
    }

    /// A handle to the cancellation flag, for other threads.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.shared.cancel.clone()
    }

    pub(crate) fn check_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(ScriptError::Interrupted)
        } else {
            Ok(())
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Running Scripts
    // ═══════════════════════════════════════════════════════════════════

    /// Normalize and run a complete script.
    ///
    /// Returns the value of the last statement, or a `quit` signal. A main
    /// script clears any earlier cancellation request.
    ///
    /// # Errors
    ///
    /// Any uncaught script failure, annotated with the frames it unwound
    /// through.
    pub fn process(&mut self, source: &str, filename: &str, is_main: bool) -> Result<Value> {
        if is_main {
            self.reset_cancel();
            *self.shared.main_file.lock() = Some(filename.to_string());
        }
        tracing::debug!(filename, is_main, "processing script");

        let mut script = Script::from_source(source, filename)?;
        let engine = self.shared.engine.clone();
        let value = engine.run(self, &mut script)?;
        Ok(match value.data() {
            Data::Return(_) => value.into_returned(),
            Data::Break | Data::Continue => Value::none(),
            _ => value,
        })
    }

    /// Read and run a main script from disk.
    pub fn process_file(&mut self, path: impl AsRef<Path>) -> anyhow::Result<Value> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?;
        let value = self
            .process(&source, &path.to_string_lossy(), true)
            .with_context(|| format!("script {} failed", path.display()))?;
        Ok(value)
    }

    /// Run another file, resolving `path` against the including script's
    /// directory.
    pub(crate) fn include(&mut self, path: &str, from: &Script) -> Result<Value> {
        let requested = Path::new(path);
        let resolved = match Path::new(from.filename()).parent() {
            Some(dir) if requested.is_relative() && !dir.as_os_str().is_empty() => {
                dir.join(requested)
            }
            _ => requested.to_path_buf(),
        };
        let name = resolved.to_string_lossy().to_string();
        let source = std::fs::read_to_string(&resolved).map_err(|e| ScriptError::Io {
            path: name.clone(),
            message: e.to_string(),
        })?;
        self.process(&source, &name, false)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Name Resolution
    // ═══════════════════════════════════════════════════════════════════

    /// Resolve `name` as seen from a script in `file`.
    ///
    /// Order: qualified `NS.name`, the active frame (and the namespace of the
    /// active block or call), the file-local scope, globals, natives,
    /// keywords.
    pub fn resolve(&self, name: &str, file: &str) -> Option<Handler> {
        let symbols = self.shared.symbols.lock();
        if name.contains('.') {
            return symbols.qualified(name).cloned();
        }
        if let Some(frame) = self.stack.active() {
            let found = match frame.kind() {
                FrameKind::Namespace(ns) => symbols.namespaced(ns, name),
                FrameKind::Call {
                    namespace: Some(ns),
                    ..
                } => frame.get(name).or_else(|| symbols.namespaced(ns, name)),
                _ => frame.get(name),
            };
            if let Some(handler) = found {
                return Some(handler.clone());
            }
        }
        symbols
            .file_local(file, name)
            .or_else(|| symbols.global(name))
            .or_else(|| symbols.native(name))
            .cloned()
            .or_else(|| Keyword::from_name(name).map(Handler::Keyword))
    }

    /// The action whose token starts `text`, if any.
    pub(crate) fn match_action(&self, text: &str) -> Option<Arc<Action>> {
        self.shared.symbols.lock().match_action(text)
    }

    /// Check if `name` names a namespace.
    pub fn is_namespace(&self, name: &str) -> bool {
        self.shared.symbols.lock().has_namespace(name)
    }

    /// The value of variable `name`, failing for unknown names and for
    /// names bound to something other than a value.
    pub(crate) fn lookup(&self, name: &str, file: &str) -> Result<Value> {
        match self.resolve(name, file) {
            Some(Handler::Variable(value)) => Ok(value),
            _ => Err(ScriptError::unknown(name)),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Definitions
    // ═══════════════════════════════════════════════════════════════════

    /// Bind `name` in the active frame, or in the file-local scope of
    /// `file` at top level (`var` semantics).
    pub(crate) fn define_local(&mut self, name: &str, handler: Handler, file: &str) {
        let shared = &self.shared;
        match self.stack.active_mut() {
            Some(frame) => match frame.kind().clone() {
                FrameKind::Namespace(ns) => shared.symbols.lock().register_namespace(&ns, name, handler),
                _ => frame.define(name, handler),
            },
            None => shared.symbols.lock().register_file_local(file, name, handler),
        }
    }

    /// Bind a function, class or enum declared by a script.
    pub(crate) fn define_declaration(&mut self, name: &str, handler: Handler) {
        tracing::debug!(name, kind = ?handler.capability(), "definition");
        let shared = &self.shared;
        match self.stack.active_mut() {
            Some(frame) => match frame.kind().clone() {
                FrameKind::Namespace(ns) => shared.symbols.lock().register_namespace(&ns, name, handler),
                _ => frame.define(name, handler),
            },
            None => {
                shared.symbols.lock().register_global(name, handler);
            }
        }
    }

    /// Where an assignment to `name` lands: the nearest existing binding,
    /// otherwise the active frame (or its namespace), or a global at top
    /// level.
    fn write_binding(&self, symbols: &SymbolTable, name: &str, file: &str) -> Binding {
        if let Some((ns, member)) = name.split_once('.') {
            return Binding::Namespace(ns.to_string(), member.to_string());
        }

        if let Some(frame) = self.stack.active() {
            match frame.kind() {
                FrameKind::Namespace(ns) => {
                    if symbols.namespaced(ns, name).is_some() {
                        return Binding::Namespace(ns.clone(), name.to_string());
                    }
                }
                FrameKind::Call { namespace, .. } => {
                    if frame.contains(name) {
                        return Binding::Frame;
                    }
                    if let Some(ns) = namespace {
                        if symbols.namespaced(ns, name).is_some() {
                            return Binding::Namespace(ns.clone(), name.to_string());
                        }
                    }
                }
                FrameKind::Thread => {
                    if frame.contains(name) {
                        return Binding::Frame;
                    }
                }
            }
        }

        if symbols.file_local(file, name).is_some() {
            return Binding::FileLocal;
        }
        if symbols.global(name).is_some() {
            return Binding::Global;
        }
        match self.stack.active().map(|frame| frame.kind()) {
            Some(FrameKind::Namespace(ns)) => Binding::Namespace(ns.clone(), name.to_string()),
            Some(_) => Binding::Frame,
            None => Binding::Global,
        }
    }

    /// Assign `name`: update the nearest existing binding, otherwise create
    /// one in the active frame, or a global at top level.
    pub(crate) fn assign(&mut self, name: &str, handler: Handler, file: &str) {
        let mut symbols = self.shared.symbols.lock();
        match self.write_binding(&symbols, name, file) {
            Binding::Frame => {
                if let Some(frame) = self.stack.active_mut() {
                    frame.define(name, handler);
                }
            }
            Binding::Namespace(ns, member) => symbols.register_namespace(&ns, member, handler),
            Binding::FileLocal => symbols.register_file_local(file, name, handler),
            Binding::Global => {
                symbols.register_global(name, handler);
            }
        }
    }

    /// Modify variable `name` in place while holding the symbol lock, so
    /// no other thread observes an intermediate state.
    ///
    /// The binding is chosen as for [`Interpreter::assign`]. A binding that
    /// does not exist yet starts as `None` and is only created when
    /// `update` succeeds. `update` must not reenter the interpreter.
    ///
    /// # Errors
    ///
    /// `TypeMismatch` when `name` is bound to something other than a value,
    /// or whatever `update` returns.
    pub(crate) fn update_variable(
        &mut self,
        name: &str,
        file: &str,
        update: impl FnOnce(&mut Value) -> Result<()>,
    ) -> Result<()> {
        let mut symbols = self.shared.symbols.lock();
        let binding = self.write_binding(&symbols, name, file);
        let existing = match &binding {
            Binding::Frame => self.stack.active_mut().and_then(|frame| frame.get_mut(name)),
            Binding::Namespace(ns, member) => symbols.namespaced_mut(ns, member),
            Binding::FileLocal => symbols.file_local_mut(file, name),
            Binding::Global => symbols.global_mut(name),
        };
        if let Some(handler) = existing {
            return match handler {
                Handler::Variable(value) => update(value),
                other => Err(ScriptError::type_mismatch(
                    "a variable",
                    format!("{:?}", other.capability()),
                )),
            };
        }

        let mut value = Value::none();
        update(&mut value)?;
        let handler = Handler::Variable(value);
        match binding {
            Binding::Frame => {
                if let Some(frame) = self.stack.active_mut() {
                    frame.define(name, handler);
                }
            }
            Binding::Namespace(ns, member) => symbols.register_namespace(&ns, member, handler),
            Binding::FileLocal => symbols.register_file_local(file, name, handler),
            Binding::Global => {
                symbols.register_global(name, handler);
            }
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Host Variable Access
    // ═══════════════════════════════════════════════════════════════════

    /// Read variable `name` as a script in `file` would see it.
    pub fn get_variable(&self, name: &str, file: &str) -> Option<Value> {
        match self.resolve(name, file)? {
            Handler::Variable(value) => Some(value),
            _ => None,
        }
    }

    /// Write variable `name` as a script in `file` would.
    ///
    /// With `prefer_local`, the value is defined in the active frame (or the
    /// file-local scope of `file`); otherwise it follows assignment rules.
    pub fn set_variable(&mut self, name: &str, value: Value, file: &str, prefer_local: bool) {
        if prefer_local {
            self.define_local(name, Handler::Variable(value), file);
        } else {
            self.assign(name, Handler::Variable(value), file);
        }
    }

    /// A live class instance by its directory name (`Class#N`).
    pub fn instance(&self, name: &str) -> Option<Value> {
        let symbols = self.shared.symbols.lock();
        let instance = symbols.instance(name)?;
        let class = instance.lock().class.name.clone();
        Some(Value::object(crate::value::ObjectHandle::instance(&class, instance)))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Call Depth
    // ═══════════════════════════════════════════════════════════════════

    /// Record entry into `function`, failing past the depth limit.
    pub(crate) fn enter_call(&mut self, function: &str) -> Result<()> {
        let max = self.shared.config.max_call_depth;
        if self.calls.len() >= max {
            return Err(ScriptError::StackOverflow {
                depth: self.calls.len(),
                max,
            });
        }
        self.calls.push(function.to_string());
        Ok(())
    }

    /// Record exit from the innermost call.
    pub(crate) fn exit_call(&mut self) {
        self.calls.pop();
    }

    /// Number of active calls.
    pub fn call_depth(&self) -> usize {
        self.calls.len()
    }

    /// Discard frames and calls above the given depths.
    pub(crate) fn unwind_to(&mut self, depth: usize, calls: usize) {
        self.stack.truncate(depth);
        self.calls.truncate(calls);
    }

    // ═══════════════════════════════════════════════════════════════════
    // Workers
    // ═══════════════════════════════════════════════════════════════════

    /// Evaluate `script` on a new thread.
    ///
    /// The worker gets its own scope stack seeded with a copy of the active
    /// frame, over the shared symbol table. Detached workers cannot be
    /// joined; their failures are reported as diagnostics.
    pub(crate) fn launch_worker(&self, script: Script, detached: bool) -> Result<u64> {
        let id = self.shared.next_worker.fetch_add(1, Ordering::Relaxed) + 1;
        let mut worker = Interpreter {
            shared: self.shared.clone(),
            stack: self.stack.fork(),
            calls: Vec::new(),
        };
        tracing::debug!(id, detached, "launching worker");

        let handle = std::thread::Builder::new()
            .name(format!("strand-worker-{}", id))
            .stack_size(self.shared.config.worker_stack_size)
            .spawn(move || {
                let mut script = script;
                let engine = worker.shared.engine.clone();
                let result = engine.evaluate(&mut worker, &mut script).map(Value::into_returned);
                if detached {
                    if let Err(e) = &result {
                        tracing::warn!(id, error = %e, "detached worker failed");
                        worker.diagnostic(&format!("thread {} failed: {}", id, e));
                    }
                }
                result
            })
            .map_err(|e| ScriptError::Io {
                path: format!("<thread {}>", id),
                message: e.to_string(),
            })?;

        if !detached {
            self.shared.workers.insert(id, handle);
        }
        Ok(id)
    }

    /// Block until worker `id` finishes and return its value.
    pub fn join_worker(&self, id: u64) -> Result<Value> {
        let (_, handle) = self
            .shared
            .workers
            .remove(&id)
            .ok_or_else(|| ScriptError::unknown(format!("thread {}", id)))?;
        handle.join().map_err(|_| ScriptError::UserThrown {
            message: format!("thread {} panicked", id),
        })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_prefers_frame_then_file_then_global() {
        let mut interp = Interpreter::new();
        interp.set_variable("x", Value::number(1.0), "a", false);
        assert_eq!(interp.get_variable("x", "a"), Some(Value::number(1.0)));

        interp.set_variable("x", Value::number(2.0), "a", true);
        assert_eq!(interp.get_variable("x", "a"), Some(Value::number(2.0)));
        assert_eq!(interp.get_variable("x", "b"), Some(Value::number(1.0)));

        let id = interp.stack.push(FrameKind::Call {
            function: "f".into(),
            namespace: None,
        });
        interp.set_variable("x", Value::number(3.0), "a", true);
        assert_eq!(interp.get_variable("x", "a"), Some(Value::number(3.0)));
        interp.stack.pop(id);
        assert_eq!(interp.get_variable("x", "a"), Some(Value::number(2.0)));
    }

    #[test]
    fn test_update_variable_creates_only_on_success() {
        let mut interp = Interpreter::new();
        let err = interp.update_variable("x", "a", |_| Err(ScriptError::unknown("nope")));
        assert!(err.is_err());
        assert_eq!(interp.get_variable("x", "a"), None);

        interp
            .update_variable("x", "a", |v| {
                *v = Value::number(1.0);
                Ok(())
            })
            .unwrap();
        interp
            .update_variable("x", "a", |v| {
                *v = Value::number(v.as_number() + 1.0);
                Ok(())
            })
            .unwrap();
        assert_eq!(interp.get_variable("x", "b"), Some(Value::number(2.0)));
    }

    #[test]
    fn test_update_variable_rejects_functions() {
        let mut interp = Interpreter::new();
        interp.process("function f() { return 1; }", "a", true).unwrap();
        let err = interp.update_variable("f", "a", |_| Ok(())).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_keywords_resolve_last() {
        let interp = Interpreter::new();
        assert!(matches!(
            interp.resolve("while", "f"),
            Some(Handler::Keyword(Keyword::While))
        ));
        assert!(interp.resolve("nothing_here", "f").is_none());
    }

    #[test]
    fn test_call_depth_limit() {
        let mut interp = Interpreter::with_config(InterpreterConfig::new().with_max_call_depth(2));
        interp.enter_call("a").unwrap();
        interp.enter_call("b").unwrap();
        let err = interp.enter_call("c").unwrap_err();
        assert!(matches!(err, ScriptError::StackOverflow { depth: 2, max: 2 }));
        interp.exit_call();
        assert_eq!(interp.call_depth(), 1);
    }

    #[test]
    fn test_reregistration_emits_diagnostic() {
        let mut interp = Interpreter::new();
        let (sink, buffer) = OutputSink::buffer();
        interp.set_output(sink);
        interp.register_native("twice", 1, |_, _, args| Ok(Value::number(args[0].as_number() * 2.0)));
        assert_eq!(buffer.contents(), "");
        interp.register_native("twice", 1, |_, _, args| Ok(args[0].clone()));
        assert!(buffer.contents().contains("twice"));
    }
}
