use crate::signature::ParameterKind;

/// Everything that can go wrong while declaring, constructing or touching a
/// record.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("return type annotation can only be `()` or unset, found `{annotation}`")]
    ReturnAnnotation { annotation: String },
    #[error("malformed parameter list for `{record}`: {reason}")]
    MalformedParameters { record: String, reason: String },
    #[error("{type_name} object does not support attribute assignment")]
    Assignment { type_name: String },
    #[error("{type_name} object does not support attribute deletion")]
    Deletion { type_name: String },
    #[error("{type_name}() missing required argument: `{name}`")]
    MissingArgument { type_name: String, name: String },
    #[error("{type_name}() takes {expected} positional arguments but {provided} were given")]
    TooManyPositional {
        type_name: String,
        expected: usize,
        provided: usize,
    },
    #[error("{type_name}() got an unexpected keyword argument `{name}`")]
    UnexpectedKeyword { type_name: String, name: String },
    #[error("{type_name}() got multiple values for argument `{name}`")]
    MultipleValues { type_name: String, name: String },
    #[error("{type_name}() got positional-only argument `{name}` passed as keyword")]
    PositionalOnlyAsKeyword { type_name: String, name: String },
}

impl RecordError {
    /// True for errors raised while a record type is being defined, as
    /// opposed to while one of its instances is built or touched.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ReturnAnnotation { .. } | Self::MalformedParameters { .. }
        )
    }

    pub(crate) fn malformed(record: &str, reason: impl Into<String>) -> Self {
        Self::MalformedParameters {
            record: record.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn out_of_order(record: &str, name: &str, kind: ParameterKind, previous: ParameterKind) -> Self {
        Self::malformed(
            record,
            format!("{kind} parameter `{name}` cannot follow a {previous} parameter"),
        )
    }
}
