//! Type-erased field values.
//!
//! Records of different types compare and hash field by field without knowing
//! each other's concrete field types, so every value stored in a record is
//! reached through [`FieldValue`].

use std::{
    any::Any,
    fmt,
    hash::{DefaultHasher, Hash, Hasher},
    sync::Arc,
};

use indexmap::IndexMap;
use ordered_float::OrderedFloat;

use crate::{structural::Structural, value::Value};

/// A value that can be stored in a record field.
pub trait FieldValue: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    /// Equality against a value of unknown type. Values of different types
    /// are unequal, except that records compare structurally and a [`Value`]
    /// compares against the native types it stands for.
    ///
    /// Values that compare equal must feed the same data to `hash_field`.
    fn eq_field(&self, other: &dyn FieldValue) -> bool;

    fn hash_field(&self, state: &mut dyn Hasher);

    /// Writes the human readable representation used inside record reprs.
    fn fmt_repr(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;

    /// Records expose their fields so they can be compared structurally.
    fn as_structural(&self) -> Option<&dyn Structural> {
        None
    }

    /// The elements of a fixed-size sequence.
    fn items(&self) -> Option<Vec<&dyn FieldValue>> {
        None
    }

    /// The entries of a string-keyed mapping.
    fn entries(&self) -> Option<Vec<(&str, &dyn FieldValue)>> {
        None
    }
}

/// Displays a field value through [`FieldValue::fmt_repr`].
pub struct Repr<'a>(pub &'a dyn FieldValue);

impl fmt::Display for Repr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt_repr(f)
    }
}

/// The representation of `value` as a string.
pub fn repr(value: &dyn FieldValue) -> String {
    Repr(value).to_string()
}

/// Writes a string literal, quoting with `'` unless the text contains `'` and
/// no `"`.
pub(crate) fn fmt_str(s: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    write!(f, "{quote}")?;
    for c in s.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c == quote => write!(f, "\\{c}")?,
            c if c.is_control() => write!(f, "\\x{:02x}", c as u32)?,
            c => write!(f, "{c}")?,
        }
    }
    write!(f, "{quote}")
}

pub(crate) fn fmt_float(x: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if x.is_nan() {
        f.write_str("nan")
    } else if x.is_infinite() {
        f.write_str(if x > 0.0 { "inf" } else { "-inf" })
    } else {
        write!(f, "{x:?}")
    }
}

/// Writes a sequence as a tuple literal: `()`, `(a,)`, `(a, b)`.
pub(crate) fn fmt_tuple<'a>(
    items: impl ExactSizeIterator<Item = &'a dyn FieldValue>,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    let len = items.len();
    f.write_str("(")?;
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        item.fmt_repr(f)?;
    }
    if len == 1 {
        f.write_str(",")?;
    }
    f.write_str(")")
}

pub(crate) fn fmt_dict<'a>(
    entries: impl Iterator<Item = (&'a str, &'a dyn FieldValue)>,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    f.write_str("{")?;
    for (i, (key, value)) in entries.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        fmt_str(key, f)?;
        f.write_str(": ")?;
        value.fmt_repr(f)?;
    }
    f.write_str("}")
}

/// Hashes map entries so that maps holding the same entries in a different
/// order hash alike.
pub(crate) fn hash_entries<'a>(
    entries: impl ExactSizeIterator<Item = (&'a str, &'a dyn FieldValue)>,
    state: &mut dyn Hasher,
) {
    state.write_usize(entries.len());
    let combined = entries.fold(0u64, |acc, (key, value)| {
        let mut entry = DefaultHasher::new();
        key.hash(&mut entry);
        value.hash_field(&mut entry);
        acc.wrapping_add(entry.finish())
    });
    state.write_u64(combined);
}

fn downcast<T: 'static>(other: &dyn FieldValue) -> Option<&T> {
    other.as_any().downcast_ref::<T>()
}

/// Equality of `this` against `other` when `other` is a [`Value`], which
/// knows how to compare itself against native field types.
fn eq_value(this: &dyn FieldValue, other: &dyn FieldValue) -> bool {
    downcast::<Value>(other).is_some_and(|value| value.eq_field(this))
}

macro_rules! impl_field_value {
    ( $( $ty:ty ),* $(,)? ) => {
        $(
            impl FieldValue for $ty {
                fn as_any(&self) -> &dyn Any {
                    self
                }

                fn eq_field(&self, other: &dyn FieldValue) -> bool {
                    match downcast::<Self>(other) {
                        Some(other) => self == other,
                        None => eq_value(self, other),
                    }
                }

                /// Every integer type hashes as an `i128`.
                fn hash_field(&self, state: &mut dyn Hasher) {
                    state.write_i128(*self as i128)
                }

                fn fmt_repr(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{self}")
                }
            }
        )*
    };
}

impl_field_value!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl FieldValue for bool {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_field(&self, other: &dyn FieldValue) -> bool {
        match downcast::<Self>(other) {
            Some(other) => self == other,
            None => eq_value(self, other),
        }
    }

    fn hash_field(&self, mut state: &mut dyn Hasher) {
        self.hash(&mut state)
    }

    fn fmt_repr(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if *self { "True" } else { "False" })
    }
}

impl FieldValue for char {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_field(&self, other: &dyn FieldValue) -> bool {
        downcast::<Self>(other).is_some_and(|other| self == other)
    }

    fn hash_field(&self, mut state: &mut dyn Hasher) {
        self.hash(&mut state)
    }

    fn fmt_repr(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_str(self.encode_utf8(&mut [0; 4]), f)
    }
}

impl FieldValue for () {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_field(&self, other: &dyn FieldValue) -> bool {
        downcast::<Self>(other).is_some()
    }

    fn hash_field(&self, _state: &mut dyn Hasher) {}

    fn fmt_repr(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("()")
    }
}

impl FieldValue for f64 {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_field(&self, other: &dyn FieldValue) -> bool {
        match downcast::<Self>(other) {
            Some(other) => self == other,
            None => eq_value(self, other),
        }
    }

    fn hash_field(&self, mut state: &mut dyn Hasher) {
        OrderedFloat(*self).hash(&mut state)
    }

    fn fmt_repr(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_float(*self, f)
    }
}

impl FieldValue for f32 {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_field(&self, other: &dyn FieldValue) -> bool {
        downcast::<Self>(other).is_some_and(|other| self == other)
    }

    fn hash_field(&self, mut state: &mut dyn Hasher) {
        OrderedFloat(*self).hash(&mut state)
    }

    fn fmt_repr(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_float(f64::from(*self), f)
    }
}

impl FieldValue for String {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_field(&self, other: &dyn FieldValue) -> bool {
        match (downcast::<String>(other), downcast::<&'static str>(other)) {
            (Some(other), _) => self == other,
            (None, Some(other)) => self == other,
            (None, None) => eq_value(self, other),
        }
    }

    fn hash_field(&self, mut state: &mut dyn Hasher) {
        self.as_str().hash(&mut state)
    }

    fn fmt_repr(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_str(self, f)
    }
}

impl FieldValue for &'static str {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_field(&self, other: &dyn FieldValue) -> bool {
        match (downcast::<&'static str>(other), downcast::<String>(other)) {
            (Some(other), _) => self == other,
            (None, Some(other)) => self == other,
            (None, None) => eq_value(self, other),
        }
    }

    fn hash_field(&self, mut state: &mut dyn Hasher) {
        self.hash(&mut state)
    }

    fn fmt_repr(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_str(self, f)
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_field(&self, other: &dyn FieldValue) -> bool {
        match (self, downcast::<Self>(other)) {
            (Some(lhs), Some(Some(rhs))) => lhs.eq_field(rhs),
            (None, Some(None)) => true,
            _ => false,
        }
    }

    fn hash_field(&self, mut state: &mut dyn Hasher) {
        match self {
            Some(value) => {
                1u8.hash(&mut state);
                value.hash_field(state);
            }
            None => 0u8.hash(&mut state),
        }
    }

    fn fmt_repr(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Some(value) => value.fmt_repr(f),
            None => f.write_str("None"),
        }
    }
}

fn slice_eq<T: FieldValue>(lhs: &[T], rhs: &[T]) -> bool {
    lhs.len() == rhs.len() && lhs.iter().zip(rhs).all(|(lhs, rhs)| lhs.eq_field(rhs))
}

pub(crate) fn slice_hash<T: FieldValue>(items: &[T], mut state: &mut dyn Hasher) {
    items.len().hash(&mut state);
    for item in items {
        item.hash_field(state);
    }
}

impl<T: FieldValue> FieldValue for Box<[T]> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_field(&self, other: &dyn FieldValue) -> bool {
        match downcast::<Self>(other) {
            Some(other) => slice_eq(self, other),
            None => eq_value(self, other),
        }
    }

    fn hash_field(&self, state: &mut dyn Hasher) {
        slice_hash(self, state)
    }

    fn fmt_repr(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_tuple(self.iter().map(|item| item as &dyn FieldValue), f)
    }

    fn items(&self) -> Option<Vec<&dyn FieldValue>> {
        Some(self.iter().map(|item| item as &dyn FieldValue).collect())
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_field(&self, other: &dyn FieldValue) -> bool {
        downcast::<Self>(other).is_some_and(|other| slice_eq(self, other))
    }

    fn hash_field(&self, state: &mut dyn Hasher) {
        slice_hash(self, state)
    }

    fn fmt_repr(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, item) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            item.fmt_repr(f)?;
        }
        f.write_str("]")
    }
}

impl<T: FieldValue> FieldValue for IndexMap<String, T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    /// Mappings compare without regard to insertion order.
    fn eq_field(&self, other: &dyn FieldValue) -> bool {
        match downcast::<Self>(other) {
            Some(other) => {
                self.len() == other.len()
                    && self
                        .iter()
                        .all(|(key, lhs)| other.get(key).is_some_and(|rhs| lhs.eq_field(rhs)))
            }
            None => eq_value(self, other),
        }
    }

    fn hash_field(&self, state: &mut dyn Hasher) {
        hash_entries(
            self.iter()
                .map(|(key, value)| (key.as_str(), value as &dyn FieldValue)),
            state,
        )
    }

    fn fmt_repr(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_dict(
            self.iter()
                .map(|(key, value)| (key.as_str(), value as &dyn FieldValue)),
            f,
        )
    }

    fn entries(&self) -> Option<Vec<(&str, &dyn FieldValue)>> {
        Some(
            self.iter()
                .map(|(key, value)| (key.as_str(), value as &dyn FieldValue))
                .collect(),
        )
    }
}

impl<T: FieldValue> FieldValue for Arc<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_field(&self, other: &dyn FieldValue) -> bool {
        match downcast::<Self>(other) {
            Some(other) => self.as_ref().eq_field(other.as_ref()),
            None => self.as_ref().eq_field(other),
        }
    }

    fn hash_field(&self, state: &mut dyn Hasher) {
        self.as_ref().hash_field(state)
    }

    fn fmt_repr(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_ref().fmt_repr(f)
    }

    fn as_structural(&self) -> Option<&dyn Structural> {
        self.as_ref().as_structural()
    }

    fn items(&self) -> Option<Vec<&dyn FieldValue>> {
        self.as_ref().items()
    }

    fn entries(&self) -> Option<Vec<(&str, &dyn FieldValue)>> {
        self.as_ref().entries()
    }
}
