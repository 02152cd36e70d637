use proc_macro::TokenStream;
use syn::{parse_macro_input, GenericArgument, ItemFn, PathArguments, Type};

mod record;

/// Turns a function declaration into an immutable record type with one field
/// per parameter. See the `records` crate for the parameter attributes.
///
/// The qualified name of the generated type is its `module_path!()` joined
/// with the declared name, so it repeats the module.
#[proc_macro_attribute]
pub fn record(args: TokenStream, item: TokenStream) -> TokenStream {
    let decl = parse_macro_input!(item as ItemFn);
    record::expand(args.into(), decl)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// The `S` of an `Unpack<S>` type, if `ty` is one.
fn unpacked(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let last = path.path.segments.last()?;
    if last.ident != "Unpack" {
        return None;
    }
    let PathArguments::AngleBracketed(ref args) = last.arguments else {
        return None;
    };
    match args.args.first() {
        Some(GenericArgument::Type(inner)) if args.args.len() == 1 => Some(inner),
        _ => None,
    }
}

/// Whether `ty` is the unit type `()`.
fn is_unit(ty: &Type) -> bool {
    matches!(ty, Type::Tuple(tuple) if tuple.elems.is_empty())
}
