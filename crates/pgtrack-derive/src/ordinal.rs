//! OrdinalEnum derive macro implementation.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Result};

pub(crate) fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;

    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input,
            "OrdinalEnum can only be derived for enums",
        ));
    };

    let mut variants = Vec::new();
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "OrdinalEnum requires unit variants",
            ));
        }
        variants.push(&variant.ident);
    }

    if variants.is_empty() {
        return Err(syn::Error::new_spanned(
            &input,
            "OrdinalEnum requires at least one variant",
        ));
    }

    let to_arms = variants.iter().map(|v| {
        quote! { #name::#v => #name::#v as i32 }
    });
    let from_arms = variants.iter().map(|v| {
        quote! {
            if ordinal == #name::#v as i32 {
                return ::std::result::Result::Ok(#name::#v);
            }
        }
    });
    let name_str = name.to_string();

    Ok(quote! {
        impl pgtrack::Ordinal for #name {
            fn ordinal(&self) -> i32 {
                match self {
                    #(#to_arms),*
                }
            }

            fn from_ordinal(ordinal: i32) -> pgtrack::OrmResult<Self> {
                #(#from_arms)*
                ::std::result::Result::Err(pgtrack::OrmError::decode(
                    #name_str,
                    format!("no variant with ordinal {ordinal}"),
                ))
            }
        }
    })
}
