//! Record instances and the behaviour every record type shares.

use std::{
    any::Any,
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use crate::{
    error::RecordError,
    field::FieldValue,
    record_type::RecordType,
    signature::ParameterKind,
    structural::{self, Structural},
    value::Value,
};

/// Implemented by every record type, whether generated by `#[record]` or
/// forged at runtime.
pub trait Record: Structural {
    fn record_type(&self) -> &RecordType;

    /// Records are immutable: assignment always fails.
    fn set_field(&self, _name: &str, _value: Value) -> Result<(), RecordError> {
        Err(RecordError::Assignment {
            type_name: self.record_type().name().to_string(),
        })
    }

    /// Records are immutable: deletion always fails.
    fn delete_field(&self, _name: &str) -> Result<(), RecordError> {
        Err(RecordError::Deletion {
            type_name: self.record_type().name().to_string(),
        })
    }
}

/// Writes `record` as a call to its initializer, e.g.
/// `Example(1.0, pos_kw=2, *(3, 4), kw='5', **{'extra': 6})`.
pub fn fmt_record<R: Record + ?Sized>(record: &R, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let record_type = record.record_type();
    write!(f, "{}(", record_type.name())?;
    for (i, param) in record_type.parameters().iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        let Some(value) = record.field(param.name()) else {
            return Err(fmt::Error);
        };
        match param.kind() {
            ParameterKind::PositionalOnly => (),
            ParameterKind::PositionalOrKeyword | ParameterKind::KeywordOnly => {
                write!(f, "{}=", param.name())?
            }
            ParameterKind::VarPositional => f.write_str("*")?,
            ParameterKind::VarKeyword => f.write_str("**")?,
        }
        value.fmt_repr(f)?;
    }
    f.write_str(")")
}

/// A record instance created through [`RecordType::instantiate`].
#[derive(Clone)]
pub struct DynRecord {
    record_type: Arc<RecordType>,
    values: Arc<[Value]>,
}

impl DynRecord {
    pub(crate) fn new(record_type: Arc<RecordType>, values: Vec<Value>) -> Self {
        Self {
            record_type,
            values: Arc::from(values),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.record_type
            .field_index(name)
            .map(|index| &self.values[index])
    }

    /// Field values in declared order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn record_type_handle(&self) -> &Arc<RecordType> {
        &self.record_type
    }

    pub fn is_instance_of(&self, record_type: &Arc<RecordType>) -> bool {
        self.record_type.same_type(record_type)
    }
}

impl Structural for DynRecord {
    fn type_name(&self) -> &str {
        self.record_type.name()
    }

    fn field_names(&self) -> Option<Vec<&str>> {
        Some(self.record_type.fields().iter().map(String::as_str).collect())
    }

    fn field(&self, name: &str) -> Option<&dyn FieldValue> {
        self.get(name).map(|value| value as &dyn FieldValue)
    }
}

impl Record for DynRecord {
    fn record_type(&self) -> &RecordType {
        &self.record_type
    }
}

impl FieldValue for DynRecord {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_field(&self, other: &dyn FieldValue) -> bool {
        other
            .as_structural()
            .is_some_and(|other| structural::eq(self, other))
    }

    fn hash_field(&self, state: &mut dyn Hasher) {
        structural::hash_fields(self, state)
    }

    fn fmt_repr(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_record(self, f)
    }

    fn as_structural(&self) -> Option<&dyn Structural> {
        Some(self)
    }
}

impl<R: Structural> PartialEq<R> for DynRecord {
    fn eq(&self, other: &R) -> bool {
        structural::eq(self, other)
    }
}

impl Eq for DynRecord {}

impl Hash for DynRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        structural::hash_fields(self, state)
    }
}

impl fmt::Debug for DynRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_record(self, f)
    }
}

impl fmt::Display for DynRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_record(self, f)
    }
}
