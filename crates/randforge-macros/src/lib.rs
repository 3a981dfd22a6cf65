//! Derive macros for RandForge aggregates and packed structs.

use proc_macro::TokenStream;
use syn::parse::Parser;
use syn::{parse_macro_input, Attribute, DeriveInput, Expr, Lit, Meta};

mod fields;
mod packed_struct;

/// Derives `Field` and `Fields` for a struct with named fields, plus
/// `AsObject` when one field is marked `#[randforge(object)]`.
///
/// Field attributes:
/// - `#[randforge(object)]`: the embedded `Object`.
/// - `#[randforge(skip)]`: not traversed, rendered or compared; copies get
///   `Default::default()`.
/// - `#[randforge(format = "hex")]`: default display format (`dec`, `hex`
///   or `bin`); `Object` field attributes take precedence.
/// - `#[randforge(compare = false)]`: ignored by comparisons.
#[proc_macro_derive(Fields, attributes(randforge))]
pub fn derive_fields(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    fields::expand_derive(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derives a fixed-layout structure: everything `#[derive(Fields)]`
/// generates plus `Packed` and `Struct`. Fields pack MSB-first in
/// declaration order.
#[proc_macro_derive(Struct, attributes(randforge))]
pub fn derive_struct(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    packed_struct::expand_derive(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

fn get_attribute<'a>(attrs: &'a [Attribute], name: &str) -> Option<&'a Attribute> {
    attrs.iter().find(|attr| attr.path().is_ident(name))
}

fn nested_metas(attr: &Attribute) -> Vec<Meta> {
    if let Meta::List(meta_list) = &attr.meta {
        let parser = syn::punctuated::Punctuated::<syn::Meta, syn::Token![,]>::parse_terminated;
        if let Ok(nested) = parser.parse2(meta_list.tokens.clone()) {
            return nested.into_iter().collect();
        }
    }
    Vec::new()
}

/// True for a bare flag such as `#[randforge(skip)]`.
fn has_flag(attrs: &[Attribute], flag: &str) -> bool {
    get_attribute(attrs, "randforge").is_some_and(|attr| {
        nested_metas(attr)
            .iter()
            .any(|meta| matches!(meta, Meta::Path(path) if path.is_ident(flag)))
    })
}

fn parse_attribute_bool(attr: &Attribute, key: &str) -> Option<bool> {
    for meta in nested_metas(attr) {
        if let Meta::NameValue(nv) = meta {
            if nv.path.is_ident(key) {
                if let Expr::Lit(expr_lit) = &nv.value {
                    if let Lit::Bool(lit_bool) = &expr_lit.lit {
                        return Some(lit_bool.value());
                    }
                }
            }
        }
    }
    None
}

fn parse_attribute_string(attr: &Attribute, key: &str) -> Option<syn::LitStr> {
    for meta in nested_metas(attr) {
        if let Meta::NameValue(nv) = meta {
            if nv.path.is_ident(key) {
                if let Expr::Lit(expr_lit) = &nv.value {
                    if let Lit::Str(lit_str) = &expr_lit.lit {
                        return Some(lit_str.clone());
                    }
                }
            }
        }
    }
    None
}
