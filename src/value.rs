use std::{
    any::Any,
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use indexmap::IndexMap;
use ordered_float::OrderedFloat;

use crate::{
    field::{self, FieldValue},
    record::DynRecord,
    structural::{self, Structural},
};

/// A dynamically typed field value, as bound by [`RecordType::instantiate`].
///
/// [`RecordType::instantiate`]: crate::record_type::RecordType::instantiate
#[derive(Clone, derive_more::From)]
pub enum Value {
    #[from(ignore)]
    None,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    #[from(ignore)]
    Str(Arc<str>),
    Tuple(Box<[Value]>),
    Dict(IndexMap<String, Value>),
    Record(DynRecord),
    #[from(ignore)]
    Opaque(Arc<dyn FieldValue>),
}

impl Value {
    /// Converts any field value into a [`Value`], using the native variants for
    /// the primitive types they cover and [`Value::Opaque`] otherwise.
    pub fn erase<T: FieldValue>(value: T) -> Self {
        let any: &dyn Any = &value;
        if let Some(value) = any.downcast_ref::<Value>() {
            return value.clone();
        }
        if let Some(b) = any.downcast_ref::<bool>() {
            return Self::Bool(*b);
        }
        if let Some(i) = any.downcast_ref::<i64>() {
            return Self::Int(*i);
        }
        if let Some(i) = any.downcast_ref::<i32>() {
            return Self::Int(i64::from(*i));
        }
        if let Some(x) = any.downcast_ref::<f64>() {
            return Self::from(*x);
        }
        if let Some(s) = any.downcast_ref::<String>() {
            return Self::from(s.as_str());
        }
        if let Some(s) = any.downcast_ref::<&'static str>() {
            return Self::from(*s);
        }
        if let Some(record) = any.downcast_ref::<DynRecord>() {
            return Self::Record(record.clone());
        }
        Self::Opaque(Arc::new(value))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(x) => Some(x.0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[Value]> {
        match self {
            Self::Tuple(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Self::Dict(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&DynRecord> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            Self::None => "None",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Tuple(_) => "tuple",
            Self::Dict(_) => "dict",
            Self::Record(record) => record.type_name(),
            Self::Opaque(_) => "opaque",
        }
    }

    /// A field-value view of whatever this value holds.
    fn inner(&self) -> &dyn FieldValue {
        match self {
            Self::Record(record) => record,
            Self::Opaque(value) => value.as_ref(),
            value => value,
        }
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(OrderedFloat(x))
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(Arc::from(s))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Tuple(items.into_boxed_slice())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::None, Into::into)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            // Plain float equality, so NaN is unequal to itself.
            (Self::Float(a), Self::Float(b)) => a.0 == b.0,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Tuple(a), Self::Tuple(b)) => a == b,
            (Self::Dict(a), Self::Dict(b)) => {
                a.len() == b.len() && a.iter().all(|(key, value)| b.get(key) == Some(value))
            }
            (Self::Record(a), Self::Record(b)) => structural::eq(a, b),
            (Self::Opaque(a), b) | (b, Self::Opaque(a)) => a.eq_field(b.inner()),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash_field(state)
    }
}

impl FieldValue for Value {
    fn as_any(&self) -> &dyn Any {
        self
    }

    /// Compares against another [`Value`], or against a native value of the
    /// type the variant stands for: `bool`, `i64` or `i32`, `f64`, `String`
    /// or `&'static str`, a sequence, a mapping or a record.
    fn eq_field(&self, other: &dyn FieldValue) -> bool {
        let any = other.as_any();
        if let Some(other) = any.downcast_ref::<Value>() {
            return self == other;
        }
        match self {
            Self::None => false,
            Self::Bool(b) => any.downcast_ref::<bool>() == Some(b),
            Self::Int(i) => {
                let native = any
                    .downcast_ref::<i64>()
                    .copied()
                    .or_else(|| any.downcast_ref::<i32>().map(|i| i64::from(*i)));
                native == Some(*i)
            }
            Self::Float(x) => any.downcast_ref::<f64>().is_some_and(|y| x.0 == *y),
            Self::Str(s) => {
                let native = any
                    .downcast_ref::<String>()
                    .map(String::as_str)
                    .or_else(|| any.downcast_ref::<&'static str>().copied());
                native == Some(&**s)
            }
            Self::Tuple(items) => other.items().is_some_and(|others| {
                items.len() == others.len()
                    && items.iter().zip(others).all(|(item, other)| item.eq_field(other))
            }),
            Self::Dict(entries) => other.entries().is_some_and(|others| {
                entries.len() == others.len()
                    && others
                        .iter()
                        .all(|(key, other)| entries.get(*key).is_some_and(|value| value.eq_field(*other)))
            }),
            Self::Record(record) => record.eq_field(other),
            Self::Opaque(value) => value.eq_field(other),
        }
    }

    /// Hashes exactly as the native value each variant stands for.
    fn hash_field(&self, mut state: &mut dyn Hasher) {
        match self {
            Self::None => state.write_u8(0),
            Self::Bool(b) => b.hash_field(state),
            Self::Int(i) => i.hash_field(state),
            Self::Float(x) => x.0.hash_field(state),
            Self::Str(s) => s.hash(&mut state),
            Self::Tuple(items) => field::slice_hash(items, state),
            Self::Dict(entries) => field::hash_entries(
                entries
                    .iter()
                    .map(|(key, value)| (key.as_str(), value as &dyn FieldValue)),
                state,
            ),
            Self::Record(record) => structural::hash_fields(record, state),
            Self::Opaque(value) => value.hash_field(state),
        }
    }

    fn fmt_repr(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bool(b) => b.fmt_repr(f),
            Self::Int(i) => i.fmt_repr(f),
            Self::Float(x) => field::fmt_float(x.0, f),
            Self::Str(s) => field::fmt_str(s, f),
            Self::Tuple(items) => field::fmt_tuple(items.iter().map(|item| item as &dyn FieldValue), f),
            Self::Dict(entries) => field::fmt_dict(
                entries
                    .iter()
                    .map(|(key, value)| (key.as_str(), value as &dyn FieldValue)),
                f,
            ),
            Self::Record(record) => record.fmt_repr(f),
            Self::Opaque(value) => value.fmt_repr(f),
        }
    }

    fn as_structural(&self) -> Option<&dyn Structural> {
        match self {
            Self::Record(record) => Some(record),
            Self::Opaque(value) => value.as_structural(),
            _ => None,
        }
    }

    fn items(&self) -> Option<Vec<&dyn FieldValue>> {
        match self {
            Self::Tuple(items) => Some(items.iter().map(|item| item as &dyn FieldValue).collect()),
            Self::Opaque(value) => value.items(),
            _ => None,
        }
    }

    fn entries(&self) -> Option<Vec<(&str, &dyn FieldValue)>> {
        match self {
            Self::Dict(entries) => Some(
                entries
                    .iter()
                    .map(|(key, value)| (key.as_str(), value as &dyn FieldValue))
                    .collect(),
            ),
            Self::Opaque(value) => value.entries(),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_repr(f)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_repr(f)
    }
}
