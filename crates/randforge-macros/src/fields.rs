// #[derive(Fields)] implementation

use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Error, Fields, Ident, LitStr};

use crate::{get_attribute, has_flag, parse_attribute_bool, parse_attribute_string};

/// One named field and its `#[randforge(...)]` settings.
pub(crate) struct FieldSpec {
    pub ident: Ident,
    pub name: String,
    pub skip: bool,
    pub object: bool,
    pub compare: bool,
    pub format: Option<TokenStream>,
}

impl FieldSpec {
    /// Fields that carry data (neither skipped nor the embedded object).
    pub fn is_data(&self) -> bool {
        !self.skip && !self.object
    }
}

pub(crate) fn field_specs(input: &DeriveInput, derive: &str) -> Result<Vec<FieldSpec>, Error> {
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(Error::new_spanned(
                    input,
                    format!("#[derive({derive})] requires named fields"),
                ))
            }
        },
        _ => {
            return Err(Error::new_spanned(
                input,
                format!("#[derive({derive})] only works on structs"),
            ))
        }
    };

    let mut specs = Vec::with_capacity(fields.len());
    for field in fields {
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        let attr = get_attribute(&field.attrs, "randforge");
        let format = match attr.and_then(|a| parse_attribute_string(a, "format")) {
            Some(lit) => Some(format_tokens(&lit)?),
            None => None,
        };
        specs.push(FieldSpec {
            name: ident.unraw().to_string(),
            skip: has_flag(&field.attrs, "skip"),
            object: has_flag(&field.attrs, "object"),
            compare: attr
                .and_then(|a| parse_attribute_bool(a, "compare"))
                .unwrap_or(true),
            format,
            ident,
        });
    }

    let objects: Vec<&FieldSpec> = specs.iter().filter(|s| s.object).collect();
    if objects.len() > 1 {
        return Err(Error::new_spanned(
            &objects[1].ident,
            "only one field may be marked #[randforge(object)]",
        ));
    }
    Ok(specs)
}

fn format_tokens(lit: &LitStr) -> Result<TokenStream, Error> {
    let variant = match lit.value().as_str() {
        "dec" => quote! { Dec },
        "hex" => quote! { Hex },
        "bin" => quote! { Bin },
        other => {
            return Err(Error::new_spanned(
                lit,
                format!("unknown format `{other}`, expected dec, hex or bin"),
            ))
        }
    };
    Ok(quote! { ::randforge::__internal::Format::#variant })
}

pub fn expand_derive(input: DeriveInput) -> Result<TokenStream, Error> {
    let specs = field_specs(&input, "Fields")?;
    field_impls(&input, &specs)
}

/// `Field`, `Fields` and (with an object field) `AsObject` impls.
pub(crate) fn field_impls(input: &DeriveInput, specs: &[FieldSpec]) -> Result<TokenStream, Error> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let data: Vec<&FieldSpec> = specs.iter().filter(|s| s.is_data()).collect();
    let data_idents: Vec<&Ident> = data.iter().map(|s| &s.ident).collect();
    let data_names: Vec<&str> = data.iter().map(|s| s.name.as_str()).collect();

    let copies = specs.iter().map(|s| {
        let ident = &s.ident;
        if s.skip {
            quote! { #ident: ::core::default::Default::default() }
        } else {
            quote! { #ident: ::randforge::__internal::Field::copy_field(&self.#ident, cx) }
        }
    });

    let renders = data.iter().map(|s| {
        let ident = &s.ident;
        let field_name = &s.name;
        let lookup = match &s.format {
            Some(default) => quote! { format_of(#field_name).or(Some(#default)) },
            None => quote! { format_of(#field_name) },
        };
        quote! {
            (#field_name, ::randforge::__internal::Field::render(&self.#ident, #lookup))
        }
    });

    let comparisons = data.iter().filter(|s| s.compare).map(|s| {
        let ident = &s.ident;
        let field_name = &s.name;
        quote! {
            if !::randforge::__internal::Field::same_value(&self.#ident, &other.#ident) {
                differing.push(#field_name);
            }
        }
    });

    let object = specs.iter().find(|s| s.object).map(|s| &s.ident);

    let render_body = match object {
        Some(object) => quote! {
            format!(
                "<{}>",
                ::randforge::__internal::Named::full_name(&self.#object)
            )
        },
        None => quote! {
            let parts: Vec<String> = ::randforge::__internal::Fields::describe(self, &|_| format)
                .into_iter()
                .map(|(field, value)| format!("{field}: {value}"))
                .collect();
            format!("{{{}}}", parts.join(", "))
        },
    };

    let visit_own_object = object.map(|object| {
        quote! { ::randforge::__internal::Field::visit_objects(&mut self.#object, f); }
    });

    let as_object = object.map(|object| {
        quote! {
            impl #impl_generics ::randforge::__internal::AsObject for #name #ty_generics #where_clause {
                fn object(&self) -> &::randforge::__internal::Object {
                    &self.#object
                }

                fn object_mut(&mut self) -> &mut ::randforge::__internal::Object {
                    &mut self.#object
                }
            }
        }
    });

    Ok(quote! {
        impl #impl_generics ::randforge::__internal::Field for #name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn visit_vars<'__a>(&'__a mut self, sink: &mut ::randforge::__internal::VarSink<'__a>) {
                #(::randforge::__internal::Field::visit_vars(&mut self.#data_idents, sink);)*
            }

            #[allow(unused_variables)]
            fn visit_objects(
                &mut self,
                f: &mut dyn ::core::ops::FnMut(&mut ::randforge::__internal::Object),
            ) {
                #visit_own_object
                #(::randforge::__internal::Field::visit_objects(&mut self.#data_idents, f);)*
            }

            fn copy_field(&self, cx: &mut ::randforge::__internal::CopyContext) -> Self {
                Self {
                    #(#copies,)*
                }
            }

            #[allow(unused_variables)]
            fn render(&self, format: ::core::option::Option<::randforge::__internal::Format>) -> String {
                #render_body
            }

            fn same_value(&self, other: &Self) -> bool {
                ::randforge::__internal::Fields::differing_fields(self, other).is_empty()
            }
        }

        impl #impl_generics ::randforge::__internal::Fields for #name #ty_generics #where_clause {
            fn field_names(&self) -> &'static [&'static str] {
                &[#(#data_names),*]
            }

            fn describe(
                &self,
                format_of: &dyn Fn(&str) -> ::core::option::Option<::randforge::__internal::Format>,
            ) -> Vec<(&'static str, String)> {
                vec![#(#renders),*]
            }

            #[allow(unused_mut)]
            fn differing_fields(&self, other: &Self) -> Vec<&'static str> {
                let mut differing = Vec::new();
                #(#comparisons)*
                differing
            }
        }

        #as_object
    })
}
