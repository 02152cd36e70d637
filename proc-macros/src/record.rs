//! Expansion of `#[record]`.

use std::collections::HashSet;

use proc_macro2::{Span, TokenStream};
use quote::{format_ident, quote};
use syn::{
    spanned::Spanned, Attribute, Error, Expr, ExprLit, FnArg, Ident, ItemFn, Lit, Meta, Pat,
    PatType, ReturnType, Type,
};

use crate::{is_unit, unpacked};

/// Mirrors `records::ParameterKind`, in declaration order.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
enum Kind {
    PositionalOnly,
    PositionalOrKeyword,
    VarPositional,
    KeywordOnly,
    VarKeyword,
}

impl Kind {
    fn from_attr(attr: &Attribute) -> Option<Self> {
        let path = attr.path();
        if path.is_ident("positional") {
            Some(Self::PositionalOnly)
        } else if path.is_ident("keyword") {
            Some(Self::KeywordOnly)
        } else if path.is_ident("args") {
            Some(Self::VarPositional)
        } else if path.is_ident("kwargs") {
            Some(Self::VarKeyword)
        } else {
            None
        }
    }

    fn is_variadic(self) -> bool {
        matches!(self, Self::VarPositional | Self::VarKeyword)
    }

    fn is_positional(self) -> bool {
        matches!(self, Self::PositionalOnly | Self::PositionalOrKeyword)
    }

    fn variant(self) -> Ident {
        let name = match self {
            Self::PositionalOnly => "PositionalOnly",
            Self::PositionalOrKeyword => "PositionalOrKeyword",
            Self::VarPositional => "VarPositional",
            Self::KeywordOnly => "KeywordOnly",
            Self::VarKeyword => "VarKeyword",
        };
        Ident::new(name, Span::call_site())
    }
}

/// Names that would collide with the generated inherent items.
const RESERVED: &[&str] = &["new", "descriptor", "match_args"];

struct Field {
    ident: Ident,
    kind: Kind,
    /// The type written in the declaration.
    ty: Type,
    default: Option<Expr>,
}

impl Field {
    fn parse(arg: &FnArg) -> syn::Result<Self> {
        let FnArg::Typed(PatType { attrs, pat, ty, .. }) = arg else {
            return Err(Error::new_spanned(arg, "records cannot take `self`"));
        };
        let Pat::Ident(pat_ident) = pat.as_ref() else {
            return Err(Error::new_spanned(pat, "record fields must be plain identifiers"));
        };
        if pat_ident.by_ref.is_some() || pat_ident.mutability.is_some() || pat_ident.subpat.is_some() {
            return Err(Error::new_spanned(pat, "record fields must be plain identifiers"));
        }

        let mut kind = None;
        let mut default = None;
        for attr in attrs {
            if let Some(attr_kind) = Kind::from_attr(attr) {
                if kind.replace(attr_kind).is_some() {
                    return Err(Error::new_spanned(attr, "a parameter can only have one kind"));
                }
            } else if attr.path().is_ident("default") {
                let expr = match &attr.meta {
                    Meta::List(_) => attr.parse_args::<Expr>()?,
                    Meta::NameValue(nv) => nv.value.clone(),
                    Meta::Path(_) => {
                        return Err(Error::new_spanned(attr, "expected `#[default(value)]`"));
                    }
                };
                if default.replace(expr).is_some() {
                    return Err(Error::new_spanned(attr, "duplicate default"));
                }
            } else {
                return Err(Error::new_spanned(attr, "unsupported parameter attribute"));
            }
        }

        let ident = pat_ident.ident.clone();
        if RESERVED.iter().any(|reserved| ident == reserved) {
            return Err(Error::new_spanned(
                &ident,
                format!("`{ident}` is reserved and cannot name a record field"),
            ));
        }

        Ok(Self {
            ident,
            kind: kind.unwrap_or(Kind::PositionalOrKeyword),
            ty: ty.as_ref().clone(),
            default,
        })
    }

    fn name(&self) -> String {
        self.ident.to_string()
    }

    /// `S` when declared as `#[kwargs] name: Unpack<S>`.
    fn unpacked(&self) -> Option<&Type> {
        match self.kind {
            Kind::VarKeyword => unpacked(&self.ty),
            _ => None,
        }
    }

    /// The type the field is stored as.
    fn storage(&self) -> TokenStream {
        let ty = &self.ty;
        match self.kind {
            Kind::VarPositional => quote! { ::std::boxed::Box<[#ty]> },
            Kind::VarKeyword => match self.unpacked() {
                Some(shape) => quote! { #shape },
                None => quote! { ::records::IndexMap<::std::string::String, #ty> },
            },
            _ => quote! { #ty },
        }
    }

    /// The constructor parameter, if the field takes one, and the expression
    /// storing it. Defaulted fields are initialized from their default.
    fn constructor(&self) -> (Option<TokenStream>, TokenStream) {
        let ident = &self.ident;
        let ty = &self.ty;
        if let Some(expr) = &self.default {
            return (None, quote! { #expr });
        }
        let (param, init) = match self.kind {
            Kind::VarPositional => (
                quote! { #ident: impl ::std::iter::IntoIterator<Item = #ty> },
                quote! { ::std::iter::Iterator::collect(::std::iter::IntoIterator::into_iter(#ident)) },
            ),
            Kind::VarKeyword if self.unpacked().is_none() => (
                quote! { #ident: impl ::std::iter::IntoIterator<Item = (__K, #ty)> },
                quote! {
                    ::std::iter::IntoIterator::into_iter(#ident)
                        .map(|(key, value)| (::std::convert::Into::into(key), value))
                        .collect()
                },
            ),
            _ => {
                let storage = self.storage();
                (quote! { #ident: #storage }, quote! { #ident })
            }
        };
        (Some(param), init)
    }

    /// Name of the method replacing a defaulted field.
    fn setter(&self) -> Ident {
        format_ident!("with_{}", self.ident)
    }

    fn annotation(&self) -> TokenStream {
        match self.unpacked() {
            Some(shape) => quote! {
                ::records::TypeExpr::unpack(::records::TypeExpr::of::<#shape>())
            },
            None => {
                let ty = &self.ty;
                quote! { ::records::TypeExpr::of::<#ty>() }
            }
        }
    }

    fn parameter(&self) -> TokenStream {
        let name = self.name();
        let kind = self.kind.variant();
        let annotation = self.annotation();
        let default = self.default.as_ref().map(|expr| {
            let ty = &self.ty;
            quote! { .with_default(::records::Value::erase::<#ty>(#expr)) }
        });
        quote! {
            ::records::Parameter::new(#name, ::records::ParameterKind::#kind)
                .with_annotation(#annotation)
                #default
        }
    }

    /// Initial value when the record is built from nothing, if there is one.
    fn default_value(&self) -> Option<TokenStream> {
        match (&self.default, self.kind) {
            (Some(expr), _) => Some(quote! { #expr }),
            (None, Kind::VarKeyword) if self.unpacked().is_some() => None,
            (None, kind) if kind.is_variadic() => Some(quote! { ::std::default::Default::default() }),
            (None, _) => None,
        }
    }
}

/// Rejects parameter lists whose kinds, defaults or names could not form a
/// callable signature.
fn check_shape(fields: &[Field]) -> syn::Result<()> {
    let mut seen = HashSet::new();
    let mut previous: Option<Kind> = None;
    let mut defaulted = false;

    let setters: HashSet<String> = fields
        .iter()
        .filter(|field| field.default.is_some())
        .map(|field| field.setter().to_string())
        .collect();

    for field in fields {
        if setters.contains(&field.name()) {
            return Err(Error::new_spanned(
                &field.ident,
                "field name collides with the setter of a defaulted field",
            ));
        }
        if !seen.insert(field.name()) {
            return Err(Error::new_spanned(&field.ident, "duplicate record field"));
        }
        if let Some(previous) = previous {
            if field.kind < previous || (field.kind == previous && field.kind.is_variadic()) {
                return Err(Error::new_spanned(
                    &field.ident,
                    format!("{:?} parameter cannot follow a {previous:?} parameter", field.kind),
                ));
            }
        }
        previous = Some(field.kind);

        if field.kind.is_variadic() && field.default.is_some() {
            return Err(Error::new_spanned(
                &field.ident,
                "variadic parameters cannot have a default",
            ));
        }
        if field.kind.is_positional() {
            if field.default.is_some() {
                defaulted = true;
            } else if defaulted {
                return Err(Error::new_spanned(
                    &field.ident,
                    "parameter without a default follows a defaulted parameter",
                ));
            }
        }
    }

    Ok(())
}

/// The declaration's doc comment, one line per `#[doc]` attribute.
fn doc_string(attrs: &[Attribute]) -> Option<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            Meta::NameValue(nv) => match &nv.value {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(s), ..
                }) => Some(s.value()),
                _ => None,
            },
            _ => None,
        })
        .map(|line| line.strip_prefix(' ').map(str::to_string).unwrap_or(line))
        .collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}

pub(crate) fn expand(args: TokenStream, decl: ItemFn) -> syn::Result<TokenStream> {
    if !args.is_empty() {
        return Err(Error::new_spanned(args, "`#[record]` takes no arguments"));
    }

    let sig = &decl.sig;
    if let Some(token) = sig.constness {
        return Err(Error::new(token.span(), "records cannot be `const`"));
    }
    if let Some(token) = sig.asyncness {
        return Err(Error::new(token.span(), "records cannot be `async`"));
    }
    if let Some(token) = sig.unsafety {
        return Err(Error::new(token.span(), "records cannot be `unsafe`"));
    }
    if let Some(abi) = &sig.abi {
        return Err(Error::new_spanned(abi, "records cannot declare an ABI"));
    }
    if !sig.generics.params.is_empty() || sig.generics.where_clause.is_some() {
        return Err(Error::new_spanned(&sig.generics, "records cannot be generic"));
    }
    if let Some(variadic) = &sig.variadic {
        return Err(Error::new_spanned(variadic, "use `#[args]` for variadic parameters"));
    }

    let returns_unit = match &sig.output {
        ReturnType::Default => false,
        ReturnType::Type(_, ty) if is_unit(ty) => true,
        ReturnType::Type(_, ty) => {
            return Err(Error::new_spanned(
                ty,
                "return type annotation can only be `()` or unset",
            ));
        }
    };

    if !decl.block.stmts.is_empty() {
        return Err(Error::new_spanned(
            &decl.block,
            "record declarations must have an empty body",
        ));
    }

    let fields = sig
        .inputs
        .iter()
        .map(Field::parse)
        .collect::<syn::Result<Vec<_>>>()?;
    check_shape(&fields)?;

    let vis = &decl.vis;
    let name = &sig.ident;
    let name_str = name.to_string();
    let attrs = &decl.attrs;

    let idents: Vec<_> = fields.iter().map(|field| &field.ident).collect();
    let names: Vec<_> = fields.iter().map(Field::name).collect();
    let storage: Vec<_> = fields.iter().map(Field::storage).collect();
    let (params, inits): (Vec<_>, Vec<_>) = fields.iter().map(Field::constructor).unzip();
    let params: Vec<_> = params.into_iter().flatten().collect();
    let setters = fields.iter().filter(|field| field.default.is_some()).map(|field| {
        let ident = &field.ident;
        let ty = &field.ty;
        let setter = field.setter();
        quote! {
            #vis fn #setter(self, #ident: #ty) -> Self {
                Self { #ident, ..self }
            }
        }
    });
    let parameters: Vec<_> = fields.iter().map(Field::parameter).collect();

    let match_fields: Vec<_> = fields
        .iter()
        .take_while(|field| field.kind.is_positional())
        .collect();
    let match_names: Vec<_> = match_fields.iter().map(|field| field.name()).collect();
    let match_idents: Vec<_> = match_fields.iter().map(|field| &field.ident).collect();
    let match_tys: Vec<_> = match_fields.iter().map(|field| &field.ty).collect();

    let key_generic = fields
        .iter()
        .any(|field| field.kind == Kind::VarKeyword && field.unpacked().is_none())
        .then(|| quote! { <__K: ::std::convert::Into<::std::string::String>> });

    let doc = doc_string(attrs).map(|doc| quote! { .doc(#doc) });
    let returns = returns_unit.then(|| quote! { .returns(::records::TypeExpr::Unit) });

    let default_impl = fields
        .iter()
        .map(Field::default_value)
        .collect::<Option<Vec<_>>>()
        .map(|defaults| {
            quote! {
                impl ::std::default::Default for #name {
                    fn default() -> Self {
                        Self {
                            #( #idents: #defaults, )*
                        }
                    }
                }
            }
        });

    Ok(quote! {
        #( #attrs )*
        #[derive(Clone)]
        #vis struct #name {
            #( #idents: #storage, )*
        }

        impl #name {
            /// Field names, in declared order.
            pub const FIELDS: &'static [&'static str] = &[#( #names ),*];

            /// Leading fields usable for positional destructuring.
            pub const MATCH_ARGS: &'static [&'static str] = &[#( #match_names ),*];

            /// Builds a record from every field without a default. Defaulted
            /// fields start at their default and are replaced with the
            /// `with_` methods.
            #vis fn new #key_generic ( #( #params ),* ) -> Self {
                Self {
                    #( #idents: #inits, )*
                }
            }

            #( #setters )*

            /// The record type this struct was declared as. Its qualname is the
            /// declaring module path followed by the name.
            pub fn descriptor() -> &'static ::records::RecordType {
                static DESCRIPTOR: ::std::sync::LazyLock<::std::sync::Arc<::records::RecordType>> =
                    ::std::sync::LazyLock::new(|| {
                        let decl = ::records::Declaration::new(#name_str)
                            .qualname(::std::concat!(module_path!(), "::", #name_str))
                            .module(::std::module_path!())
                            #doc
                            #( .parameter(#parameters) )*
                            #returns;
                        match ::records::RecordType::forge(decl) {
                            ::std::result::Result::Ok(record_type) => record_type,
                            ::std::result::Result::Err(err) => ::std::unreachable!(
                                "`#[record]` checked this declaration during expansion: {err}"
                            ),
                        }
                    });
                &DESCRIPTOR
            }

            #(
                #vis fn #idents(&self) -> &#storage {
                    &self.#idents
                }
            )*

            /// The leading positional fields, for destructuring.
            #vis fn match_args(&self) -> ( #( &#match_tys, )* ) {
                ( #( &self.#match_idents, )* )
            }
        }

        #default_impl

        impl ::records::Structural for #name {
            fn type_name(&self) -> &str {
                #name_str
            }

            fn field_names(&self) -> ::std::option::Option<::std::vec::Vec<&str>> {
                ::std::option::Option::Some(Self::FIELDS.to_vec())
            }

            fn field(&self, name: &str) -> ::std::option::Option<&dyn ::records::FieldValue> {
                match name {
                    #( #names => ::std::option::Option::Some(&self.#idents as &dyn ::records::FieldValue), )*
                    _ => ::std::option::Option::None,
                }
            }
        }

        impl ::records::Record for #name {
            fn record_type(&self) -> &::records::RecordType {
                Self::descriptor()
            }
        }

        impl ::records::FieldValue for #name {
            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn eq_field(&self, other: &dyn ::records::FieldValue) -> bool {
                match other.as_structural() {
                    ::std::option::Option::Some(other) => ::records::structural::eq(self, other),
                    ::std::option::Option::None => false,
                }
            }

            fn hash_field(&self, state: &mut dyn ::std::hash::Hasher) {
                ::records::structural::hash_fields(self, state)
            }

            fn fmt_repr(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::records::record::fmt_record(self, f)
            }

            fn as_structural(&self) -> ::std::option::Option<&dyn ::records::Structural> {
                ::std::option::Option::Some(self)
            }
        }

        impl<__R: ::records::Structural> ::std::cmp::PartialEq<__R> for #name {
            fn eq(&self, other: &__R) -> bool {
                ::records::structural::eq(self, other)
            }
        }

        impl ::std::cmp::Eq for #name {}

        impl ::std::hash::Hash for #name {
            fn hash<__H: ::std::hash::Hasher>(&self, state: &mut __H) {
                ::records::structural::hash_fields(self, state)
            }
        }

        impl ::std::fmt::Debug for #name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::records::record::fmt_record(self, f)
            }
        }

        impl ::std::fmt::Display for #name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::records::record::fmt_record(self, f)
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn expand_err(decl: ItemFn) -> String {
        expand(TokenStream::new(), decl).unwrap_err().to_string()
    }

    #[test]
    fn rejects_return_annotations() {
        let err = expand_err(parse_quote! { fn Bad() -> i64 {} });
        assert_eq!(err, "return type annotation can only be `()` or unset");
        assert!(expand(TokenStream::new(), parse_quote! { fn Fine() -> () {} }).is_ok());
        assert!(expand(TokenStream::new(), parse_quote! { fn Fine() {} }).is_ok());
    }

    #[test]
    fn rejects_arguments_and_bodies() {
        let err = expand(quote! { x }, parse_quote! { fn Example() {} }).unwrap_err();
        assert_eq!(err.to_string(), "`#[record]` takes no arguments");
        let err = expand_err(parse_quote! { fn Example(x: i64) { let _ = x; } });
        assert_eq!(err, "record declarations must have an empty body");
    }

    #[test]
    fn rejects_out_of_order_kinds() {
        let err = expand_err(parse_quote! {
            fn Example(#[keyword] kw: i64, #[positional] pos: i64) {}
        });
        assert!(err.contains("cannot follow"), "{err}");
        let err = expand_err(parse_quote! {
            fn Example(#[args] a: i64, #[args] b: i64) {}
        });
        assert!(err.contains("cannot follow"), "{err}");
    }

    #[test]
    fn rejects_bad_defaults() {
        let err = expand_err(parse_quote! {
            fn Example(#[default(1)] a: i64, b: i64) {}
        });
        assert_eq!(err, "parameter without a default follows a defaulted parameter");
        let err = expand_err(parse_quote! {
            fn Example(#[args] #[default(1)] a: i64) {}
        });
        assert_eq!(err, "variadic parameters cannot have a default");
    }

    #[test]
    fn rejects_unknown_attributes_and_reserved_names() {
        let err = expand_err(parse_quote! { fn Example(#[frobnicate] x: i64) {} });
        assert_eq!(err, "unsupported parameter attribute");
        let err = expand_err(parse_quote! { fn Example(new: i64) {} });
        assert_eq!(err, "`new` is reserved and cannot name a record field");
        let err = expand_err(parse_quote! { fn Example(x: i64, x: i64) {} });
        assert_eq!(err, "duplicate record field");
    }

    #[test]
    fn keyword_defaults_in_any_order() {
        let decl: ItemFn = parse_quote! {
            fn Example(#[keyword] #[default(1)] a: i64, #[keyword] b: i64) {}
        };
        assert!(expand(TokenStream::new(), decl).is_ok());
    }

    #[test]
    fn variadic_storage() {
        let args = Field::parse(&parse_quote! { #[args] args: i64 }).unwrap();
        assert_eq!(args.storage().to_string(), quote! { ::std::boxed::Box<[i64]> }.to_string());

        let kwargs = Field::parse(&parse_quote! { #[kwargs] kwargs: i64 }).unwrap();
        assert_eq!(
            kwargs.storage().to_string(),
            quote! { ::records::IndexMap<::std::string::String, i64> }.to_string()
        );

        let unpacked = Field::parse(&parse_quote! { #[kwargs] kwargs: Unpack<Options> }).unwrap();
        assert_eq!(unpacked.storage().to_string(), quote! { Options }.to_string());

        let plain = Field::parse(&parse_quote! { options: Unpack<Options> }).unwrap();
        assert!(plain.unpacked().is_none());
    }

    #[test]
    fn defaulted_fields_leave_the_constructor() {
        let decl: ItemFn = parse_quote! { fn Partial(x: i64, #[default(2)] y: i64) {} };
        let expanded = expand(TokenStream::new(), decl).unwrap().to_string();
        assert!(expanded.contains(&quote! { fn new(x: i64) -> Self }.to_string()), "{expanded}");
        assert!(expanded.contains(&quote! { fn with_y(self, y: i64) -> Self }.to_string()), "{expanded}");
        assert!(expanded.contains("Eq for Partial"));

        let err = expand_err(parse_quote! { fn Clash(#[default(1)] y: i64, with_y: i64) {} });
        assert!(err.contains("collides"), "{err}");
    }

    #[test]
    fn doc_comments_are_joined() {
        let decl: ItemFn = parse_quote! {
            /// First line.
            /// Second line.
            fn Documented() {}
        };
        assert_eq!(
            doc_string(&decl.attrs).as_deref(),
            Some("First line.\nSecond line.")
        );
    }

    #[test]
    fn default_impl_only_when_every_field_has_a_value() {
        let all: ItemFn = parse_quote! {
            fn Defaults(#[positional] #[default(1)] a: i64, #[default(2)] b: i64, #[args] rest: i64) {}
        };
        let expanded = expand(TokenStream::new(), all).unwrap().to_string();
        assert!(expanded.contains("Default for Defaults"));

        let some: ItemFn = parse_quote! { fn Partial(a: i64, #[default(2)] b: i64) {} };
        let expanded = expand(TokenStream::new(), some).unwrap().to_string();
        assert!(!expanded.contains("Default for Partial"));
    }
}
