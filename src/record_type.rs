//! Record types.
//!
//! A [`RecordType`] is forged from an analyzed declaration and describes one
//! record type: its fields, the initializer they are bound through and the
//! metadata copied from the declaration. Every forge produces a new type; two
//! identical declarations give two distinct types whose instances still
//! compare structurally.

use std::{fmt, sync::Arc};

use indexmap::IndexMap;

use crate::{
    error::RecordError,
    record::DynRecord,
    signature::{Declaration, Parameter, ParameterKind, Signature, TypeExpr},
    value::Value,
};

/// Type declaration for a record.
#[derive(derive_more::Debug)]
pub struct RecordType {
    name: String,
    qualname: String,
    module: String,
    doc: Option<String>,
    /// The initializer's parameter list, as declared.
    #[debug(skip)]
    parameters: Vec<Parameter>,
    fields: Vec<String>,
    #[debug(skip)]
    annotations: IndexMap<String, TypeExpr>,
    #[debug(skip)]
    init_annotations: IndexMap<String, TypeExpr>,
    match_args: Vec<String>,
}

impl RecordType {
    /// Analyzes `decl` and creates a new record type from it.
    pub fn forge(decl: Declaration) -> Result<Arc<Self>, RecordError> {
        Signature::analyze(decl).map(Self::from_signature)
    }

    pub fn from_signature(sig: Signature) -> Arc<Self> {
        let Signature {
            name,
            qualname,
            module,
            doc,
            parameters,
            annotations,
            init_annotations,
            match_args,
        } = sig;
        let fields: Vec<_> = parameters.iter().map(|param| param.name().to_string()).collect();

        tracing::debug!(record = %qualname, ?fields, "forged record type");

        Arc::new(Self {
            name,
            qualname,
            module,
            doc,
            parameters,
            fields,
            annotations,
            init_annotations,
            match_args,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn qualname(&self) -> &str {
        &self.qualname
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Field names in declared order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Annotations of the annotated fields, in declared order. Variadic fields
    /// carry the annotation of the collection they hold.
    pub fn annotations(&self) -> &IndexMap<String, TypeExpr> {
        &self.annotations
    }

    /// The initializer's annotations: the declared ones plus `return: ()`.
    pub fn init_annotations(&self) -> &IndexMap<String, TypeExpr> {
        &self.init_annotations
    }

    /// Leading fields that can be bound by position when destructuring.
    pub fn match_args(&self) -> &[String] {
        &self.match_args
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field == name)
    }

    /// Whether `self` and `other` are the same type, not merely equal looking
    /// ones.
    pub fn same_type(self: &Arc<Self>, other: &Arc<Self>) -> bool {
        Arc::ptr_eq(self, other)
    }

    /// Calls the initializer: binds `args` to the parameters and builds an
    /// instance.
    pub fn instantiate(self: &Arc<Self>, args: Arguments) -> Result<DynRecord, RecordError> {
        let values = Binder::new(self).bind(args)?;
        Ok(DynRecord::new(self.clone(), values))
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<record {}>", self.qualname)
    }
}

/// Arguments for a call to a record initializer.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    positional: Vec<Value>,
    keywords: IndexMap<String, Value>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    pub fn args<V: Into<Value>>(mut self, values: impl IntoIterator<Item = V>) -> Self {
        self.positional.extend(values.into_iter().map(Into::into));
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keywords.insert(name.into(), value.into());
        self
    }
}

struct Binder<'a> {
    record_type: &'a RecordType,
    slots: Vec<Option<Value>>,
}

impl<'a> Binder<'a> {
    fn new(record_type: &'a RecordType) -> Self {
        Self {
            record_type,
            slots: vec![None; record_type.parameters.len()],
        }
    }

    fn type_name(&self) -> String {
        self.record_type.name.clone()
    }

    fn position_of(&self, kind: ParameterKind) -> Option<usize> {
        self.record_type
            .parameters
            .iter()
            .position(|param| param.kind() == kind)
    }

    fn bind(mut self, args: Arguments) -> Result<Vec<Value>, RecordError> {
        let Arguments {
            positional,
            keywords,
        } = args;
        let record_type = self.record_type;
        let params = &record_type.parameters;

        let positional_params: Vec<usize> = params
            .iter()
            .enumerate()
            .filter(|(_, param)| param.kind().is_positional())
            .map(|(i, _)| i)
            .collect();
        let mut positional = positional.into_iter();
        for &i in &positional_params {
            match positional.next() {
                Some(value) => self.slots[i] = Some(value),
                None => break,
            }
        }
        let excess: Vec<Value> = positional.collect();
        match self.position_of(ParameterKind::VarPositional) {
            Some(i) => self.slots[i] = Some(Value::from(excess)),
            None if !excess.is_empty() => {
                return Err(RecordError::TooManyPositional {
                    type_name: self.type_name(),
                    expected: positional_params.len(),
                    provided: positional_params.len() + excess.len(),
                });
            }
            None => (),
        }

        let var_keyword = self.position_of(ParameterKind::VarKeyword);
        let mut extra = IndexMap::new();
        for (name, value) in keywords {
            match params.iter().position(|param| param.name() == name) {
                Some(i) if params[i].kind().is_keyword() => {
                    if self.slots[i].is_some() {
                        return Err(RecordError::MultipleValues {
                            type_name: self.type_name(),
                            name,
                        });
                    }
                    self.slots[i] = Some(value);
                }
                Some(i)
                    if params[i].kind() == ParameterKind::PositionalOnly && var_keyword.is_none() =>
                {
                    return Err(RecordError::PositionalOnlyAsKeyword {
                        type_name: self.type_name(),
                        name,
                    });
                }
                _ if var_keyword.is_some() => {
                    extra.insert(name, value);
                }
                _ => {
                    return Err(RecordError::UnexpectedKeyword {
                        type_name: self.type_name(),
                        name,
                    });
                }
            }
        }
        if let Some(i) = var_keyword {
            self.slots[i] = Some(Value::Dict(extra));
        }

        self.slots
            .into_iter()
            .zip(params)
            .map(|(slot, param)| {
                slot.or_else(|| param.default().cloned())
                    .ok_or_else(|| RecordError::MissingArgument {
                        type_name: record_type.name.clone(),
                        name: param.name().to_string(),
                    })
            })
            .collect()
    }
}
