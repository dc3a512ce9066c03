//! Host capability table for foreign objects
//!
//! Hosts register, per type tag, the constructors, methods, properties and
//! enumerator scripts may use. Overloads are chosen by exact arity first,
//! then by registration order.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Result, ScriptError};
use crate::value::{ObjectHandle, Value};

/// Builds a foreign object from call arguments.
pub type ObjectCtor = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// Calls a method on a foreign object.
pub type ObjectMethod = Arc<dyn Fn(&ObjectHandle, &[Value]) -> Result<Value> + Send + Sync>;

/// Reads a property of a foreign object.
pub type ObjectGetter = Arc<dyn Fn(&ObjectHandle) -> Result<Value> + Send + Sync>;

/// Writes a property of a foreign object.
pub type ObjectSetter = Arc<dyn Fn(&ObjectHandle, Value) -> Result<()> + Send + Sync>;

/// Lists the elements `for-each` visits.
pub type ObjectEnumerator = Arc<dyn Fn(&ObjectHandle) -> Result<Vec<Value>> + Send + Sync>;

/// Arity of an overload; `None` accepts any count.
type Overloads<F> = Vec<(Option<usize>, F)>;

#[derive(Clone)]
struct PropertyAccess {
    get: ObjectGetter,
    set: Option<ObjectSetter>,
}

/// Registered capabilities of every foreign type.
#[derive(Default, Clone)]
pub struct ObjectRegistry {
    constructors: HashMap<String, Overloads<ObjectCtor>>,
    methods: HashMap<(String, String), Overloads<ObjectMethod>>,
    properties: HashMap<(String, String), PropertyAccess>,
    enumerators: HashMap<String, ObjectEnumerator>,
}

fn select<F: Clone>(overloads: Option<&Overloads<F>>, argc: usize) -> Option<F> {
    let overloads = overloads?;
    overloads
        .iter()
        .find(|(arity, _)| *arity == Some(argc))
        .or_else(|| overloads.first())
        .map(|(_, f)| f.clone())
}

impl ObjectRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // ═══════════════════════════════════════════════════════════════════
    // Registration
    // ═══════════════════════════════════════════════════════════════════

    /// Register a constructor for `type_name`.
    pub fn register_constructor(
        &mut self,
        type_name: &str,
        arity: Option<usize>,
        ctor: impl Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    ) {
        self.constructors
            .entry(type_name.to_string())
            .or_default()
            .push((arity, Arc::new(ctor)));
    }

    /// Register a method on objects tagged `type_tag`.
    pub fn register_method(
        &mut self,
        type_tag: &str,
        name: &str,
        arity: Option<usize>,
        method: impl Fn(&ObjectHandle, &[Value]) -> Result<Value> + Send + Sync + 'static,
    ) {
        self.methods
            .entry((type_tag.to_string(), name.to_string()))
            .or_default()
            .push((arity, Arc::new(method)));
    }

    /// Register a read-only property.
    pub fn register_property(
        &mut self,
        type_tag: &str,
        name: &str,
        get: impl Fn(&ObjectHandle) -> Result<Value> + Send + Sync + 'static,
    ) {
        self.properties.insert(
            (type_tag.to_string(), name.to_string()),
            PropertyAccess {
                get: Arc::new(get),
                set: None,
            },
        );
    }

    /// Register a read-write property.
    pub fn register_property_rw(
        &mut self,
        type_tag: &str,
        name: &str,
        get: impl Fn(&ObjectHandle) -> Result<Value> + Send + Sync + 'static,
        set: impl Fn(&ObjectHandle, Value) -> Result<()> + Send + Sync + 'static,
    ) {
        self.properties.insert(
            (type_tag.to_string(), name.to_string()),
            PropertyAccess {
                get: Arc::new(get),
                set: Some(Arc::new(set)),
            },
        );
    }

    /// Register the enumerator for `type_tag`.
    pub fn register_enumerator(
        &mut self,
        type_tag: &str,
        enumerate: impl Fn(&ObjectHandle) -> Result<Vec<Value>> + Send + Sync + 'static,
    ) {
        self.enumerators
            .insert(type_tag.to_string(), Arc::new(enumerate));
    }

    // ═══════════════════════════════════════════════════════════════════
    // Lookup
    // ═══════════════════════════════════════════════════════════════════

    /// Constructor for `type_name` taking `argc` arguments.
    pub fn constructor(&self, type_name: &str, argc: usize) -> Option<ObjectCtor> {
        select(self.constructors.get(type_name), argc)
    }

    /// Method `name` of `type_tag` taking `argc` arguments.
    pub fn method(&self, type_tag: &str, name: &str, argc: usize) -> Option<ObjectMethod> {
        let key = (type_tag.to_string(), name.to_string());
        select(self.methods.get(&key), argc)
    }

    /// Getter of property `name` of `type_tag`.
    pub fn getter(&self, type_tag: &str, name: &str) -> Option<ObjectGetter> {
        let key = (type_tag.to_string(), name.to_string());
        self.properties.get(&key).map(|p| p.get.clone())
    }

    /// Setter of property `name` of `type_tag`.
    ///
    /// # Errors
    ///
    /// `TypeMismatch` if the property exists but is read-only.
    pub fn setter(&self, type_tag: &str, name: &str) -> Result<Option<ObjectSetter>> {
        let key = (type_tag.to_string(), name.to_string());
        match self.properties.get(&key) {
            Some(PropertyAccess { set: Some(set), .. }) => Ok(Some(set.clone())),
            Some(_) => Err(ScriptError::type_mismatch(
                format!("a writable property {}.{}", type_tag, name),
                "read-only property",
            )),
            None => Ok(None),
        }
    }

    /// Enumerator of `type_tag`.
    pub fn enumerator(&self, type_tag: &str) -> Option<ObjectEnumerator> {
        self.enumerators.get(type_tag).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_arity_then_first_registered() {
        let mut registry = ObjectRegistry::new();
        registry.register_method("Box", "f", Some(1), |_, _| Ok(Value::number(1.0)));
        registry.register_method("Box", "f", Some(2), |_, _| Ok(Value::number(2.0)));
        let handle = ObjectHandle::foreign("Box", ());

        let two = registry.method("Box", "f", 2).unwrap();
        assert_eq!(two(&handle, &[]).unwrap(), Value::number(2.0));
        let fallback = registry.method("Box", "f", 5).unwrap();
        assert_eq!(fallback(&handle, &[]).unwrap(), Value::number(1.0));
        assert!(registry.method("Box", "g", 0).is_none());
    }

    #[test]
    fn test_read_only_property_rejects_writes() {
        let mut registry = ObjectRegistry::new();
        registry.register_property("Box", "size", |_| Ok(Value::number(3.0)));
        assert!(registry.getter("Box", "size").is_some());
        assert!(registry.setter("Box", "size").is_err());
        assert!(registry.setter("Box", "other").unwrap().is_none());
    }
}
