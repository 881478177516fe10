//! Attribute parsing for the Entity derive macro.
//!
//! Handles struct-level and field-level `#[orm(...)]` attributes.

use syn::{DeriveInput, Result};

/// Parsed field-level `#[orm(...)]` attribute content.
#[derive(Default)]
pub(crate) struct FieldAttr {
    pub is_id: bool,
    pub auto: bool,
    pub unique: bool,
    pub nullable: bool,
    pub enumeration: bool,
    pub skip: bool,
    pub column: Option<String>,
    pub length: Option<u32>,
    pub default: Option<syn::Lit>,
    pub references: Option<String>,
    pub references_column: Option<String>,
}

impl syn::parse::Parse for FieldAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attr = FieldAttr::default();

        // Comma-separated flags and key = value pairs.
        loop {
            if input.is_empty() {
                break;
            }

            let ident: syn::Ident = input.parse()?;

            if input.peek(syn::Token![=]) {
                let _: syn::Token![=] = input.parse()?;
                match ident.to_string().as_str() {
                    "column" => {
                        let value: syn::LitStr = input.parse()?;
                        attr.column = Some(value.value());
                    }
                    "length" => {
                        let value: syn::LitInt = input.parse()?;
                        attr.length = Some(value.base10_parse()?);
                    }
                    "default" => {
                        attr.default = Some(input.parse()?);
                    }
                    "references" => {
                        let value: syn::LitStr = input.parse()?;
                        attr.references = Some(value.value());
                    }
                    "references_column" => {
                        let value: syn::LitStr = input.parse()?;
                        attr.references_column = Some(value.value());
                    }
                    other => {
                        return Err(syn::Error::new_spanned(
                            &ident,
                            format!("unknown orm attribute `{other}`"),
                        ));
                    }
                }
            } else {
                match ident.to_string().as_str() {
                    "id" => attr.is_id = true,
                    "auto" => attr.auto = true,
                    "unique" => attr.unique = true,
                    "nullable" => attr.nullable = true,
                    "enumeration" => attr.enumeration = true,
                    "skip" => attr.skip = true,
                    other => {
                        return Err(syn::Error::new_spanned(
                            &ident,
                            format!("unknown orm flag `{other}`"),
                        ));
                    }
                }
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        Ok(attr)
    }
}

/// Merge every `#[orm(...)]` attribute on a field.
pub(crate) fn field_attr(field: &syn::Field) -> Result<FieldAttr> {
    let mut merged = FieldAttr::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        let syn::Meta::List(meta_list) = &attr.meta else {
            return Err(syn::Error::new_spanned(
                attr,
                "expected #[orm(...)] attribute list",
            ));
        };
        let parsed = syn::parse2::<FieldAttr>(meta_list.tokens.clone())?;
        merged.is_id |= parsed.is_id;
        merged.auto |= parsed.auto;
        merged.unique |= parsed.unique;
        merged.nullable |= parsed.nullable;
        merged.enumeration |= parsed.enumeration;
        merged.skip |= parsed.skip;
        merged.column = parsed.column.or(merged.column);
        merged.length = parsed.length.or(merged.length);
        merged.default = parsed.default.or(merged.default);
        merged.references = parsed.references.or(merged.references);
        merged.references_column = parsed.references_column.or(merged.references_column);
    }
    Ok(merged)
}

/// Extract the table name from a struct-level `#[orm(table = "...")]`
/// attribute; defaults to the type name with an `s` appended.
pub(crate) fn table_name(input: &DeriveInput) -> Result<String> {
    for attr in &input.attrs {
        if attr.path().is_ident("orm") {
            if let Ok(nested) = attr.parse_args::<syn::MetaNameValue>() {
                if nested.path.is_ident("table") {
                    if let syn::Expr::Lit(syn::ExprLit {
                        lit: syn::Lit::Str(lit),
                        ..
                    }) = &nested.value
                    {
                        return Ok(lit.value());
                    }
                }
                return Err(syn::Error::new_spanned(
                    attr,
                    "expected #[orm(table = \"table_name\")]",
                ));
            }
        }
    }
    Ok(format!("{}s", input.ident))
}
