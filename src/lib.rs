//! Immutable, structurally comparable record types declared from a function
//! signature.
//!
//! ```
//! use records::record;
//!
//! /// A point in 3D space.
//! #[record]
//! pub fn Point3D(x: f64, y: f64, z: f64) {}
//!
//! let point = Point3D::new(1.0, 2.0, 3.0);
//! assert_eq!(*point.y(), 2.0);
//! assert_eq!(point.to_string(), "Point3D(x=1.0, y=2.0, z=3.0)");
//! assert_eq!(point, Point3D::new(1.0, 2.0, 3.0));
//! ```
//!
//! Record types can also be forged at runtime from a [`Declaration`], with
//! [`RecordType::forge`], and instantiated with [`RecordType::instantiate`].

extern crate self as records;

pub mod error;
pub mod field;
pub mod record;
pub mod record_type;
pub mod signature;
pub mod structural;
pub mod value;

pub use error::RecordError;
pub use field::FieldValue;
pub use indexmap::IndexMap;
pub use record::{DynRecord, Record};
pub use record_type::{Arguments, RecordType};
pub use signature::{Declaration, Parameter, ParameterKind, Signature, TypeExpr, Unpack};
pub use structural::{Comparison, Structural};
pub use value::Value;

/// Declare a record type from a function signature.
///
/// Parameters are positional-or-keyword unless marked `#[positional]`
/// (positional-only), `#[keyword]` (keyword-only), `#[args]` (collects excess
/// positional arguments into a `Box<[T]>`) or `#[kwargs]` (collects excess
/// keyword arguments into an `IndexMap<String, T>`, or holds `S` itself when
/// declared as `Unpack<S>`). `#[default(expr)]` gives a default.
pub use records_macros::record;
