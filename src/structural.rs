//! Structural equality and hashing.
//!
//! Two values are structurally equal when they expose the same set of field
//! names and every field compares equal. Neither side's nominal type is
//! consulted, so instances of unrelated record types, or a record and a hand
//! written [`Structural`] carrier, can be equal.

use std::{collections::HashSet, hash::Hasher};

use crate::field::FieldValue;

/// Field-wise access to a value.
pub trait Structural {
    fn type_name(&self) -> &str;

    /// The names of the fields, in declared order. `None` when the value has
    /// no field list at all, which makes it incomparable with every record.
    fn field_names(&self) -> Option<Vec<&str>>;

    fn field(&self, name: &str) -> Option<&dyn FieldValue>;
}

/// The outcome of a structural comparison.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Comparison {
    Equal,
    NotEqual,
    /// The two sides do not expose the same fields. Equality operators treat
    /// this as unequal.
    Incomparable,
}

impl Comparison {
    pub fn is_equal(self) -> bool {
        matches!(self, Self::Equal)
    }
}

/// Compares `lhs` against `rhs` field by field.
pub fn compare(lhs: &dyn Structural, rhs: &dyn Structural) -> Comparison {
    let (Some(lhs_names), Some(rhs_names)) = (lhs.field_names(), rhs.field_names()) else {
        return Comparison::Incomparable;
    };
    if lhs_names.iter().collect::<HashSet<_>>() != rhs_names.iter().collect::<HashSet<_>>() {
        return Comparison::Incomparable;
    }

    for name in lhs_names {
        let (Some(lhs_value), Some(rhs_value)) = (lhs.field(name), rhs.field(name)) else {
            return Comparison::Incomparable;
        };
        if !field_eq(lhs_value, rhs_value) {
            return Comparison::NotEqual;
        }
    }

    Comparison::Equal
}

/// Field values are equal when either side recognises the other, so the
/// result does not depend on argument order.
fn field_eq(lhs: &dyn FieldValue, rhs: &dyn FieldValue) -> bool {
    lhs.eq_field(rhs) || rhs.eq_field(lhs)
}

/// `compare(lhs, rhs)` collapsed to a boolean.
pub fn eq(lhs: &dyn Structural, rhs: &dyn Structural) -> bool {
    compare(lhs, rhs).is_equal()
}

/// Feeds every field of `value` to `state`, in declared field order.
pub fn hash_fields(value: &dyn Structural, state: &mut dyn Hasher) {
    for name in value.field_names().unwrap_or_default() {
        if let Some(field) = value.field(name) {
            field.hash_field(state);
        }
    }
}
