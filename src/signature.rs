//! Analysis of record declarations.
//!
//! A [`Declaration`] is the parameter list a record is declared with. Running
//! it through [`Signature::analyze`] validates it and derives everything a
//! record type needs: its fields, the annotations exposed for those fields and
//! the leading fields usable for positional matching.

use std::{any::type_name, borrow::Cow, collections::HashSet, fmt, marker::PhantomData};

use indexmap::IndexMap;

use crate::{error::RecordError, value::Value};

/// How an argument is bound to a parameter. Variants are listed in the order
/// they must appear in a parameter list.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParameterKind {
    PositionalOnly,
    PositionalOrKeyword,
    /// Collects excess positional arguments.
    VarPositional,
    KeywordOnly,
    /// Collects excess keyword arguments.
    VarKeyword,
}

impl ParameterKind {
    pub fn is_variadic(self) -> bool {
        matches!(self, Self::VarPositional | Self::VarKeyword)
    }

    /// Whether an argument for this parameter may be passed by position.
    pub fn is_positional(self) -> bool {
        matches!(self, Self::PositionalOnly | Self::PositionalOrKeyword)
    }

    /// Whether an argument for this parameter may be passed by name.
    pub fn is_keyword(self) -> bool {
        matches!(self, Self::PositionalOrKeyword | Self::KeywordOnly)
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PositionalOnly => "positional-only",
            Self::PositionalOrKeyword => "positional-or-keyword",
            Self::VarPositional => "variadic positional",
            Self::KeywordOnly => "keyword-only",
            Self::VarKeyword => "variadic keyword",
        })
    }
}

/// Type annotation attached to a parameter or a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    Named(Cow<'static, str>),
    /// A fixed-size sequence of the inner type.
    Sequence(Box<TypeExpr>),
    Mapping {
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
    },
    /// Keyword arguments unpacked from a structured type rather than collected
    /// into a mapping.
    Unpack(Box<TypeExpr>),
    /// The "no value" type.
    Unit,
}

impl TypeExpr {
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self::Named(name.into())
    }

    /// The annotation for the Rust type `T`.
    pub fn of<T: ?Sized>() -> Self {
        Self::Named(Cow::Borrowed(type_name::<T>()))
    }

    pub fn sequence(inner: TypeExpr) -> Self {
        Self::Sequence(Box::new(inner))
    }

    pub fn mapping(key: TypeExpr, value: TypeExpr) -> Self {
        Self::Mapping {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn unpack(inner: TypeExpr) -> Self {
        Self::Unpack(Box::new(inner))
    }

    /// Annotation of the field collecting a variadic positional parameter
    /// annotated with `self`.
    fn for_var_positional(self) -> Self {
        Self::sequence(self)
    }

    /// Annotation of the field collecting a variadic keyword parameter
    /// annotated with `self`.
    fn for_var_keyword(self) -> Self {
        match self {
            Self::Unpack(shape) => *shape,
            value => Self::mapping(TypeExpr::of::<String>(), value),
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::Sequence(inner) => write!(f, "Box<[{inner}]>"),
            Self::Mapping { key, value } => write!(f, "IndexMap<{key}, {value}>"),
            Self::Unpack(inner) => write!(f, "Unpack<{inner}>"),
            Self::Unit => f.write_str("()"),
        }
    }
}

/// Marks a `#[kwargs]` parameter of a `#[record]` declaration as unpacked from
/// the structured type `T`: the field then holds a `T` instead of a mapping.
///
/// Only ever written in declarations; never instantiated.
pub struct Unpack<T: ?Sized>(PhantomData<T>);

/// One declared parameter, which becomes one field of the record.
#[derive(Debug, Clone)]
pub struct Parameter {
    name: String,
    kind: ParameterKind,
    default: Option<Value>,
    annotation: Option<TypeExpr>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
            annotation: None,
        }
    }

    pub fn positional_only(name: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::PositionalOnly)
    }

    pub fn positional_or_keyword(name: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::PositionalOrKeyword)
    }

    pub fn var_positional(name: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::VarPositional)
    }

    pub fn keyword_only(name: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::KeywordOnly)
    }

    pub fn var_keyword(name: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::VarKeyword)
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_annotation(mut self, annotation: TypeExpr) -> Self {
        self.annotation = Some(annotation);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ParameterKind {
        self.kind
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn annotation(&self) -> Option<&TypeExpr> {
        self.annotation.as_ref()
    }
}

/// A record declaration: a name, a parameter list and the metadata copied
/// onto the resulting type.
#[derive(Debug, Clone)]
pub struct Declaration {
    name: String,
    qualname: Option<String>,
    module: Option<String>,
    doc: Option<String>,
    parameters: Vec<Parameter>,
    returns: Option<TypeExpr>,
}

impl Declaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qualname: None,
            module: None,
            doc: None,
            parameters: Vec::new(),
            returns: None,
        }
    }

    pub fn qualname(mut self, qualname: impl Into<String>) -> Self {
        self.qualname = Some(qualname.into());
        self
    }

    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn parameters(mut self, parameters: impl IntoIterator<Item = Parameter>) -> Self {
        self.parameters.extend(parameters);
        self
    }

    pub fn returns(mut self, annotation: TypeExpr) -> Self {
        self.returns = Some(annotation);
        self
    }
}

/// The analyzed form of a [`Declaration`].
#[derive(Debug, Clone)]
pub struct Signature {
    pub(crate) name: String,
    pub(crate) qualname: String,
    pub(crate) module: String,
    pub(crate) doc: Option<String>,
    pub(crate) parameters: Vec<Parameter>,
    pub(crate) annotations: IndexMap<String, TypeExpr>,
    pub(crate) init_annotations: IndexMap<String, TypeExpr>,
    pub(crate) match_args: Vec<String>,
}

impl Signature {
    pub fn analyze(decl: Declaration) -> Result<Self, RecordError> {
        let Declaration {
            name,
            qualname,
            module,
            doc,
            parameters,
            returns,
        } = decl;

        match returns {
            None | Some(TypeExpr::Unit) => (),
            Some(annotation) => {
                return Err(RecordError::ReturnAnnotation {
                    annotation: annotation.to_string(),
                });
            }
        }

        check_shape(&name, &parameters)?;

        let mut annotations = IndexMap::new();
        let mut init_annotations = IndexMap::new();
        for param in &parameters {
            let Some(annotation) = param.annotation.clone() else {
                continue;
            };
            init_annotations.insert(param.name.clone(), annotation.clone());
            let annotation = match param.kind {
                ParameterKind::VarPositional => annotation.for_var_positional(),
                ParameterKind::VarKeyword => annotation.for_var_keyword(),
                _ => annotation,
            };
            annotations.insert(param.name.clone(), annotation);
        }
        init_annotations.insert("return".to_string(), TypeExpr::Unit);

        let match_args = parameters
            .iter()
            .take_while(|param| param.kind.is_positional())
            .map(|param| param.name.clone())
            .collect();

        tracing::trace!(record = %name, parameters = parameters.len(), "analyzed record declaration");

        Ok(Self {
            qualname: qualname.unwrap_or_else(|| name.clone()),
            module: module.unwrap_or_default(),
            name,
            doc,
            parameters,
            annotations,
            init_annotations,
            match_args,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn annotations(&self) -> &IndexMap<String, TypeExpr> {
        &self.annotations
    }

    pub fn match_args(&self) -> &[String] {
        &self.match_args
    }
}

/// Rejects parameter lists that could not have been written as a function
/// signature in the first place.
fn check_shape(record: &str, parameters: &[Parameter]) -> Result<(), RecordError> {
    let mut seen = HashSet::new();
    let mut previous: Option<ParameterKind> = None;
    let mut defaulted: Option<&str> = None;

    for param in parameters {
        if !seen.insert(param.name.as_str()) {
            return Err(RecordError::malformed(
                record,
                format!("duplicate parameter `{}`", param.name),
            ));
        }

        if let Some(previous) = previous {
            if param.kind < previous || (param.kind == previous && param.kind.is_variadic()) {
                return Err(RecordError::out_of_order(record, &param.name, param.kind, previous));
            }
        }
        previous = Some(param.kind);

        if param.kind.is_variadic() && param.default.is_some() {
            return Err(RecordError::malformed(
                record,
                format!("{} parameter `{}` cannot have a default", param.kind, param.name),
            ));
        }

        if param.kind.is_positional() {
            match (param.default.is_some(), defaulted) {
                (true, _) => defaulted = Some(param.name.as_str()),
                (false, Some(after)) => {
                    return Err(RecordError::malformed(
                        record,
                        format!(
                            "parameter `{}` without a default follows defaulted parameter `{after}`",
                            param.name
                        ),
                    ));
                }
                (false, None) => (),
            }
        }
    }

    Ok(())
}
