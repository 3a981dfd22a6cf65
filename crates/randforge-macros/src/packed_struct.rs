// #[derive(Struct)] implementation

use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Error, Ident};

use crate::fields::{field_impls, field_specs};

pub fn expand_derive(input: DeriveInput) -> Result<TokenStream, Error> {
    let specs = field_specs(&input, "Struct")?;
    let fields = field_impls(&input, &specs)?;

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let packed: Vec<&Ident> = specs
        .iter()
        .filter(|s| s.is_data())
        .map(|s| &s.ident)
        .collect();
    if packed.is_empty() {
        return Err(Error::new_spanned(
            &input,
            "#[derive(Struct)] requires at least one packed field",
        ));
    }

    Ok(quote! {
        #fields

        impl #impl_generics ::randforge::__internal::Packed for #name #ty_generics #where_clause {
            fn packed_width(&self) -> u32 {
                0 #(+ ::randforge::__internal::Packed::packed_width(&self.#packed))*
            }

            fn pack(&self) -> u128 {
                ::randforge::__internal::pack_fields(&[
                    #(&self.#packed as &dyn ::randforge::__internal::Packed),*
                ])
            }

            fn unpack(&mut self, raw: u128) {
                ::randforge::__internal::unpack_fields(
                    &mut [#(&mut self.#packed as &mut dyn ::randforge::__internal::Packed),*],
                    raw,
                )
            }
        }

        impl #impl_generics ::randforge::__internal::Struct for #name #ty_generics #where_clause {}
    })
}
