//! Function and class dispatch
//!
//! - [`call`]: reading call arguments and binding them to parameters
//! - [`function`]: script-defined functions and the call-frame lifecycle
//! - [`class`]: class definition, copy-inheritance and instantiation

pub mod call;
pub mod class;
pub mod function;

pub use call::Arg;
pub use class::{ClassDef, Instance};
pub use function::{CustomFunction, Param};
