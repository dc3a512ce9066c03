//! Compound value types: enums and object handles

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::dispatch::Instance;

/// A named set of integer constants with reverse lookup.
///
/// Uses IndexMap so entries enumerate in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    /// The enum's name (e.g. `Color`)
    pub name: String,

    /// Entry name → value
    pub entries: IndexMap<String, i64>,
}

impl EnumValue {
    /// Create an enum with no entries.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: IndexMap::new(),
        }
    }

    /// Add an entry (builder pattern).
    pub fn with_entry(mut self, name: impl Into<String>, value: i64) -> Self {
        self.entries.insert(name.into(), value);
        self
    }

    /// Value of the entry `name`.
    pub fn value_of(&self, name: &str) -> Option<i64> {
        self.entries.get(name).copied()
    }

    /// Name of the first entry whose value is `value`.
    pub fn name_of(&self, value: i64) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, v)| **v == value)
            .map(|(k, _)| k.as_str())
    }
}

/// What an object handle points at.
#[derive(Clone)]
pub enum ObjectRef {
    /// An instance of a script-defined class
    Instance(Arc<Mutex<Instance>>),

    /// An opaque host object
    Foreign(Arc<dyn Any + Send + Sync>),
}

/// A reference to an object plus the type tag used for dispatch.
///
/// Handles compare by identity: two handles are equal only when they
/// point at the same object.
#[derive(Clone)]
pub struct ObjectHandle {
    type_tag: Arc<str>,
    target: ObjectRef,
}

impl ObjectHandle {
    /// Wrap a script class instance.
    pub fn instance(type_tag: &str, instance: Arc<Mutex<Instance>>) -> Self {
        Self {
            type_tag: type_tag.into(),
            target: ObjectRef::Instance(instance),
        }
    }

    /// Wrap a host object under `type_tag`.
    pub fn foreign<T: Any + Send + Sync>(type_tag: &str, object: T) -> Self {
        Self {
            type_tag: type_tag.into(),
            target: ObjectRef::Foreign(Arc::new(object)),
        }
    }

    /// The type tag (class or host type name).
    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    /// What the handle points at.
    pub fn target(&self) -> &ObjectRef {
        &self.target
    }

    /// The script instance behind this handle, if it is one.
    pub fn as_instance(&self) -> Option<&Arc<Mutex<Instance>>> {
        match &self.target {
            ObjectRef::Instance(i) => Some(i),
            ObjectRef::Foreign(_) => None,
        }
    }

    /// Downcast a host object.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<&T> {
        match &self.target {
            ObjectRef::Foreign(object) => object.downcast_ref::<T>(),
            ObjectRef::Instance(_) => None,
        }
    }

    /// Identity comparison.
    pub fn same_object(&self, other: &ObjectHandle) -> bool {
        match (&self.target, &other.target) {
            (ObjectRef::Instance(a), ObjectRef::Instance(b)) => Arc::ptr_eq(a, b),
            (ObjectRef::Foreign(a), ObjectRef::Foreign(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.type_tag)
    }
}
