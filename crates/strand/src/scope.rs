//! Scope stack and symbol tables
//!
//! Names resolve against, in order:
//!
//! 1. the top call-local frame (when the stack is above its threshold)
//! 2. the file-local scope of the executing script
//! 3. the global table
//! 4. host natives, then keywords
//!
//! The [`ScopeStack`] is per thread. The [`SymbolTable`] holding globals,
//! file-local scopes, namespaces and the instance directory is shared by an
//! interpreter and its workers behind one coarse lock.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::dispatch::Instance;
use crate::handler::{Action, Handler};

/// Identifier of a pushed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(u64);

/// Why a frame was pushed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameKind {
    /// A function or method call
    Call {
        /// Callee name
        function: String,
        /// Namespace the callee was defined in
        namespace: Option<String>,
    },
    /// A `namespace NAME { ... }` block; its definitions go to the namespace
    Namespace(String),
    /// The base frame of a worker thread
    Thread,
}

/// A call-local scope.
#[derive(Debug, Clone)]
pub struct Frame {
    id: FrameId,
    kind: FrameKind,
    vars: IndexMap<String, Handler>,
}

impl Frame {
    /// This frame's identifier.
    pub fn id(&self) -> FrameId {
        self.id
    }

    /// Why this frame exists.
    pub fn kind(&self) -> &FrameKind {
        &self.kind
    }

    /// Handler bound to `name` in this frame.
    pub fn get(&self, name: &str) -> Option<&Handler> {
        self.vars.get(name)
    }

    /// Check if `name` is bound in this frame.
    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Bind `name`, replacing any previous binding.
    pub fn define(&mut self, name: impl Into<String>, handler: Handler) {
        self.vars.insert(name.into(), handler);
    }

    /// Mutable handler bound to `name` in this frame.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Handler> {
        self.vars.get_mut(name)
    }

    /// Frame name used in error traces.
    pub fn name(&self) -> &str {
        match &self.kind {
            FrameKind::Call { function, .. } => function,
            FrameKind::Namespace(name) => name,
            FrameKind::Thread => "thread",
        }
    }
}

/// Stack of call-local frames.
///
/// Frames pop by identifier rather than strictly last-in-first-out: when a
/// frame is popped out of order, the frames above it keep their relative
/// order.
///
/// # Example
///
/// ```
/// use strand::scope::{FrameKind, ScopeStack};
///
/// let mut stack = ScopeStack::new();
/// let f1 = stack.push(FrameKind::Thread);
/// let f2 = stack.push(FrameKind::Thread);
/// let f3 = stack.push(FrameKind::Thread);
///
/// assert!(stack.pop(f2).is_some());
/// let ids: Vec<_> = stack.frames().map(|f| f.id()).collect();
/// assert_eq!(ids, vec![f1, f3]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScopeStack {
    frames: Vec<Frame>,
    next_id: u64,
    threshold: usize,
}

impl ScopeStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    // ═══════════════════════════════════════════════════════════════════
    // Frame Management
    // ═══════════════════════════════════════════════════════════════════

    /// Push a frame and return its identifier.
    pub fn push(&mut self, kind: FrameKind) -> FrameId {
        self.next_id += 1;
        let id = FrameId(self.next_id);
        self.frames.push(Frame {
            id,
            kind,
            vars: IndexMap::new(),
        });
        id
    }

    /// Remove the frame `id`, wherever it sits in the stack.
    pub fn pop(&mut self, id: FrameId) -> Option<Frame> {
        let index = self.frames.iter().rposition(|f| f.id == id)?;
        Some(self.frames.remove(index))
    }

    /// Drop every frame above `depth`.
    pub fn truncate(&mut self, depth: usize) {
        self.frames.truncate(depth);
    }

    /// Number of frames.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Check if the top frame takes part in name resolution.
    pub fn is_active(&self) -> bool {
        self.frames.len() > self.threshold
    }

    /// Frames at or below this depth are not consulted by resolution.
    pub fn set_threshold(&mut self, threshold: usize) {
        self.threshold = threshold;
    }

    /// The top frame, if it takes part in resolution.
    pub fn active(&self) -> Option<&Frame> {
        if self.is_active() {
            self.frames.last()
        } else {
            None
        }
    }

    /// Mutable access to the active top frame.
    pub fn active_mut(&mut self) -> Option<&mut Frame> {
        if self.is_active() {
            self.frames.last_mut()
        } else {
            None
        }
    }

    /// The frame with identifier `id`.
    pub fn find(&self, id: FrameId) -> Option<&Frame> {
        self.frames.iter().find(|f| f.id == id)
    }

    /// Frames from bottom to top.
    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }

    /// A stack for a worker thread: one base frame holding a copy of the
    /// active frame's bindings.
    pub fn fork(&self) -> ScopeStack {
        let mut stack = ScopeStack {
            frames: Vec::new(),
            next_id: self.next_id,
            threshold: 0,
        };
        stack.push(FrameKind::Thread);
        if let (Some(source), Some(base)) = (self.active(), stack.frames.last_mut()) {
            base.vars = source.vars.clone();
        }
        stack
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Shared Symbol Table
// ═══════════════════════════════════════════════════════════════════════

/// Process-visible symbols shared by an interpreter and its workers.
#[derive(Default)]
pub struct SymbolTable {
    globals: IndexMap<String, Handler>,
    natives: IndexMap<String, Handler>,
    file_locals: HashMap<String, IndexMap<String, Handler>>,
    namespaces: IndexMap<String, IndexMap<String, Handler>>,
    actions: IndexMap<String, Arc<Action>>,
    instances: IndexMap<String, Weak<Mutex<Instance>>>,
    instance_counter: u64,
}

impl SymbolTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    // ═══════════════════════════════════════════════════════════════════
    // Globals and Natives
    // ═══════════════════════════════════════════════════════════════════

    /// Global binding for `name`.
    pub fn global(&self, name: &str) -> Option<&Handler> {
        self.globals.get(name)
    }

    /// Bind a global, returning the handler it replaced.
    pub fn register_global(&mut self, name: impl Into<String>, handler: Handler) -> Option<Handler> {
        self.globals.insert(name.into(), handler)
    }

    /// Mutable global binding for `name`.
    pub fn global_mut(&mut self, name: &str) -> Option<&mut Handler> {
        self.globals.get_mut(name)
    }

    /// Native binding for `name`.
    pub fn native(&self, name: &str) -> Option<&Handler> {
        self.natives.get(name)
    }

    /// Bind a native, returning the handler it replaced.
    pub fn register_native(&mut self, name: impl Into<String>, handler: Handler) -> Option<Handler> {
        self.natives.insert(name.into(), handler)
    }

    // ═══════════════════════════════════════════════════════════════════
    // File-Local Scopes
    // ═══════════════════════════════════════════════════════════════════

    /// Binding for `name` in the file-local scope of `file`.
    pub fn file_local(&self, file: &str, name: &str) -> Option<&Handler> {
        self.file_locals.get(file)?.get(name)
    }

    /// Mutable binding for `name` in the file-local scope of `file`.
    pub fn file_local_mut(&mut self, file: &str, name: &str) -> Option<&mut Handler> {
        self.file_locals.get_mut(file)?.get_mut(name)
    }

    /// Bind `name` in the file-local scope of `file`.
    pub fn register_file_local(&mut self, file: &str, name: impl Into<String>, handler: Handler) {
        self.file_locals
            .entry(file.to_string())
            .or_default()
            .insert(name.into(), handler);
    }

    // ═══════════════════════════════════════════════════════════════════
    // Namespaces
    // ═══════════════════════════════════════════════════════════════════

    /// Check if a namespace named `name` exists.
    pub fn has_namespace(&self, name: &str) -> bool {
        self.namespaces.contains_key(name)
    }

    /// Create the namespace `name` if it does not exist yet.
    pub fn ensure_namespace(&mut self, name: &str) {
        self.namespaces.entry(name.to_string()).or_default();
    }

    /// Binding for `name` inside namespace `ns`.
    pub fn namespaced(&self, ns: &str, name: &str) -> Option<&Handler> {
        self.namespaces.get(ns)?.get(name)
    }

    /// Mutable binding for `name` inside namespace `ns`.
    pub fn namespaced_mut(&mut self, ns: &str, name: &str) -> Option<&mut Handler> {
        self.namespaces.get_mut(ns)?.get_mut(name)
    }

    /// Bind `name` inside namespace `ns`, creating the namespace.
    pub fn register_namespace(&mut self, ns: &str, name: impl Into<String>, handler: Handler) {
        self.namespaces
            .entry(ns.to_string())
            .or_default()
            .insert(name.into(), handler);
    }

    /// Resolve a qualified `NS.name`.
    pub fn qualified(&self, name: &str) -> Option<&Handler> {
        let (ns, member) = name.split_once('.')?;
        self.namespaced(ns, member)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Actions
    // ═══════════════════════════════════════════════════════════════════

    /// Install an action, returning the one it replaced.
    pub fn register_action(&mut self, action: Action) -> Option<Arc<Action>> {
        self.actions.insert(action.token.clone(), Arc::new(action))
    }

    /// The longest action token that `text` starts with.
    ///
    /// `=` never matches the first half of `==`.
    pub fn match_action(&self, text: &str) -> Option<Arc<Action>> {
        self.actions
            .values()
            .filter(|a| text.starts_with(a.token.as_str()))
            .filter(|a| !(a.token == "=" && text.starts_with("==")))
            .max_by_key(|a| a.token.len())
            .cloned()
    }

    // ═══════════════════════════════════════════════════════════════════
    // Instance Directory
    // ═══════════════════════════════════════════════════════════════════

    /// Record a new instance of `class`, returning its directory name.
    pub fn register_instance(&mut self, class: &str, instance: &Arc<Mutex<Instance>>) -> String {
        self.instances.retain(|_, weak| weak.strong_count() > 0);
        self.instance_counter += 1;
        let name = format!("{}#{}", class, self.instance_counter);
        self.instances.insert(name.clone(), Arc::downgrade(instance));
        name
    }

    /// Look up a live instance by directory name.
    pub fn instance(&self, name: &str) -> Option<Arc<Mutex<Instance>>> {
        self.instances.get(name)?.upgrade()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn var(n: f64) -> Handler {
        Handler::Variable(Value::number(n))
    }

    #[test]
    fn test_non_lifo_pop_keeps_relative_order() {
        let mut stack = ScopeStack::new();
        let f1 = stack.push(FrameKind::Thread);
        let f2 = stack.push(FrameKind::Namespace("ns".into()));
        let f3 = stack.push(FrameKind::Thread);

        let popped = stack.pop(f2).unwrap();
        assert_eq!(popped.kind(), &FrameKind::Namespace("ns".into()));
        let ids: Vec<_> = stack.frames().map(Frame::id).collect();
        assert_eq!(ids, vec![f1, f3]);
        assert!(stack.pop(f2).is_none());
    }

    #[test]
    fn test_threshold_hides_frames() {
        let mut stack = ScopeStack::new();
        assert!(stack.active().is_none());
        stack.push(FrameKind::Thread);
        assert!(stack.active().is_some());
        stack.set_threshold(1);
        assert!(stack.active().is_none());
    }

    #[test]
    fn test_fork_copies_active_bindings() {
        let mut stack = ScopeStack::new();
        stack.push(FrameKind::Call {
            function: "f".into(),
            namespace: None,
        });
        stack.active_mut().unwrap().define("x", var(1.0));

        let forked = stack.fork();
        assert_eq!(forked.depth(), 1);
        assert_eq!(forked.active().unwrap().kind(), &FrameKind::Thread);
        assert!(forked.active().unwrap().contains("x"));
    }

    #[test]
    fn test_namespace_and_qualified_lookup() {
        let mut table = SymbolTable::new();
        table.register_namespace("Geo", "pi", var(3.0));
        assert!(table.has_namespace("Geo"));
        assert!(table.qualified("Geo.pi").is_some());
        assert!(table.qualified("Geo.tau").is_none());
        assert!(table.qualified("pi").is_none());
    }

    #[test]
    fn test_file_locals_are_per_file() {
        let mut table = SymbolTable::new();
        table.register_file_local("a.scr", "x", var(1.0));
        assert!(table.file_local("a.scr", "x").is_some());
        assert!(table.file_local("b.scr", "x").is_none());
        assert!(table.file_local_mut("b.scr", "x").is_none());

        if let Some(Handler::Variable(x)) = table.file_local_mut("a.scr", "x") {
            *x = Value::number(2.0);
        }
        assert_eq!(
            table.file_local("a.scr", "x").and_then(Handler::as_value),
            Some(&Value::number(2.0))
        );
    }

    #[test]
    fn test_longest_action_wins() {
        let mut table = SymbolTable::new();
        table.register_action(Action::assign());
        table.register_action(Action::binary("+=", |a, _| Ok(a.clone())));
        table.register_action(Action::unary("++", |a| Ok(a.clone())));

        assert_eq!(table.match_action("+=1;").unwrap().token, "+=");
        assert_eq!(table.match_action("++;").unwrap().token, "++");
        assert_eq!(table.match_action("=5;").unwrap().token, "=");
        assert!(table.match_action("==5").is_none());
        assert!(table.match_action("+1").is_none());
    }
}
