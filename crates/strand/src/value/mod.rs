//! Value representation for runtime values

mod array;
mod compound;
mod display;
mod impls;
pub mod marshal;
mod property;

pub use array::ArrayData;
pub use compound::{EnumValue, ObjectHandle, ObjectRef};
pub use property::{Accessor, Computed, Properties};

use std::sync::Arc;

use chrono::NaiveDateTime;

/// Runtime value of the scripting language.
///
/// Every scalar, collection, object and control signal the engine handles is
/// a `Value`. Besides its [`Data`] payload, any value may carry a property
/// map of ad-hoc fields and computed-property bindings.
///
/// Clones are shallow: collections and property maps are shared and copied
/// on write. [`Value::deep_clone`] duplicates them eagerly.
#[derive(Clone, Default)]
pub struct Value {
    data: Data,
    props: Option<Arc<Properties>>,
}

/// The tagged payload of a [`Value`].
///
/// Values are organized into three tiers:
/// - Scalars (inline or a single shared buffer)
/// - Collections and objects (Arc-wrapped, copy-on-write)
/// - Control signals (transient, never stored in a variable)
#[derive(Clone, Default)]
pub enum Data {
    // ═══════════════════════════════════════════════════════════════════
    // Scalars
    // ═══════════════════════════════════════════════════════════════════
    /// A name that was never assigned
    #[default]
    Undefined,

    /// The explicit empty value (`null`, array gaps)
    None,

    /// All numbers are doubles
    Number(f64),

    /// Text
    Str(Arc<String>),

    /// Raw bytes
    Bytes(Arc<Vec<u8>>),

    /// Calendar date and time
    DateTime(NaiveDateTime),

    // ═══════════════════════════════════════════════════════════════════
    // Collections and Objects
    // ═══════════════════════════════════════════════════════════════════
    /// Indexed sequence, optionally with an associative key index (a map)
    Array(Arc<ArrayData>),

    /// Named integer constants
    Enum(Arc<EnumValue>),

    /// Script class instance or host object
    Object(ObjectHandle),

    // ═══════════════════════════════════════════════════════════════════
    // Control Signals
    // ═══════════════════════════════════════════════════════════════════
    /// Leave the innermost loop or switch
    Break,

    /// Start the next iteration of the innermost loop
    Continue,

    /// Leave the current function with a value
    Return(Box<Value>),

    /// Stop the script with an exit code
    Quit(i32),
}

impl Value {
    /// Wrap a payload with no properties.
    pub fn new(data: Data) -> Self {
        Self { data, props: None }
    }

    /// The payload.
    pub fn data(&self) -> &Data {
        &self.data
    }

    /// Mutable access to the payload.
    pub fn data_mut(&mut self) -> &mut Data {
        &mut self.data
    }

    /// Take the payload, dropping any properties.
    pub fn into_data(self) -> Data {
        self.data
    }

    /// The attached property map, if any.
    pub fn properties(&self) -> Option<&Properties> {
        self.props.as_deref()
    }

    /// Mutable access to the property map, creating it on first use.
    pub fn properties_mut(&mut self) -> &mut Properties {
        Arc::make_mut(self.props.get_or_insert_with(Default::default))
    }

    /// Canonical upper-case type name (`NUMBER`, `STRING`, `MAP`, ...).
    pub fn type_name(&self) -> String {
        let name = match &self.data {
            Data::Undefined => "UNDEFINED",
            Data::None => "NONE",
            Data::Number(_) => "NUMBER",
            Data::Str(_) => "STRING",
            Data::Bytes(_) => "BYTES",
            Data::DateTime(_) => "DATETIME",
            Data::Array(a) if a.is_map() => "MAP",
            Data::Array(_) => "ARRAY",
            Data::Enum(_) => "ENUM",
            Data::Object(o) => return o.type_tag().to_string(),
            Data::Break => "BREAK",
            Data::Continue => "CONTINUE",
            Data::Return(_) => "RETURN",
            Data::Quit(_) => "QUIT",
        };
        name.to_string()
    }
}
