//! Field shape classification.
//!
//! Mapped columns are the scalar-typed fields (plus `#[orm(enumeration)]`
//! ones). Container-shaped fields and fields typed as other entity structs
//! are navigations and never become columns; `String` and `Vec<u8>` stay
//! columns. Anything unrecognized is an error rather than a silent skip.

use syn::Type;

/// How one struct field participates in the mapping.
pub(crate) enum FieldKind<'a> {
    /// A mapped column; `nullable` reflects `Option<_>` wrapping.
    Scalar { nullable: bool },
    /// A mapped column stored as an INTEGER ordinal.
    Enumeration { nullable: bool },
    /// `Vec<Related>`: collection navigation.
    CollectionNav { related: &'a Type },
    /// `Option<Related>`: single-entity navigation.
    SingleNav { related: &'a Type },
    /// `#[orm(skip)]`.
    Skipped,
}

/// The inner type of `Option<T>`, if this is one.
pub(crate) fn option_inner(ty: &Type) -> Option<&Type> {
    generic_inner(ty, "Option")
}

/// The inner type of `Vec<T>`, if this is one.
pub(crate) fn vec_inner(ty: &Type) -> Option<&Type> {
    generic_inner(ty, "Vec")
}

fn generic_inner<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else { return None };
    let segment = path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        syn::GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

fn is_u8(ty: &Type) -> bool {
    matches!(ty, Type::Path(p) if p.path.is_ident("u8"))
}

/// Whether a type maps to a SQL scalar via `pgtrack::ColumnType`.
///
/// Matches on the last path segment so `chrono::NaiveDateTime` and
/// `NaiveDateTime` both qualify.
fn is_scalar(ty: &Type) -> bool {
    if vec_inner(ty).map(is_u8) == Some(true) {
        return true;
    }
    let Type::Path(path) = ty else { return false };
    let Some(segment) = path.path.segments.last() else {
        return false;
    };
    matches!(
        segment.ident.to_string().as_str(),
        "i16" | "i32" | "i64" | "f32" | "f64" | "bool" | "String" | "NaiveDateTime" | "DateTime"
            | "Uuid"
    )
}

/// Classify a field by its declared type and attributes.
pub(crate) fn classify<'a>(
    field: &'a syn::Field,
    attr: &crate::attrs::FieldAttr,
) -> syn::Result<FieldKind<'a>> {
    let ty = &field.ty;

    if attr.skip {
        return Ok(FieldKind::Skipped);
    }
    if attr.enumeration {
        return Ok(FieldKind::Enumeration {
            nullable: option_inner(ty).is_some(),
        });
    }
    if let Some(inner) = vec_inner(ty) {
        if is_u8(inner) {
            return Ok(FieldKind::Scalar { nullable: false });
        }
        return Ok(FieldKind::CollectionNav { related: inner });
    }
    if let Some(inner) = option_inner(ty) {
        if is_scalar(inner) {
            return Ok(FieldKind::Scalar { nullable: true });
        }
        if vec_inner(inner).is_some() {
            return Err(syn::Error::new_spanned(
                ty,
                "Option<Vec<..>> fields are not supported",
            ));
        }
        return Ok(FieldKind::SingleNav { related: inner });
    }
    if is_scalar(ty) {
        return Ok(FieldKind::Scalar { nullable: false });
    }

    Err(syn::Error::new_spanned(
        ty,
        "unsupported field shape: expected a scalar column type, \
         #[orm(enumeration)], #[orm(skip)], Vec<Entity> or Option<Entity>",
    ))
}

/// `medical_histories` → `MEDICAL_HISTORIES`.
pub(crate) fn shout_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for ch in name.chars() {
        if ch.is_ascii_uppercase() && prev_lower {
            out.push('_');
        }
        prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
        out.push(ch.to_ascii_uppercase());
    }
    out
}

/// Identifier comparison ignoring case and underscores, matching the
/// library's foreign-key convention lookup.
pub(crate) fn eq_conventional(a: &str, b: &str) -> bool {
    let mut ai = a.chars().filter(|c| *c != '_');
    let mut bi = b.chars().filter(|c| *c != '_');
    loop {
        match (ai.next(), bi.next()) {
            (None, None) => return true,
            (Some(x), Some(y)) if x.eq_ignore_ascii_case(&y) => {}
            _ => return false,
        }
    }
}
