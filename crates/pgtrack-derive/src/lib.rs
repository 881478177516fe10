//! Derive macros for pgtrack
//!
//! Provides `#[derive(Entity)]` and `#[derive(OrdinalEnum)]`.

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod attrs;
mod entity;
mod fields;
mod ordinal;

/// Derive entity metadata, row mapping and navigation loaders for a struct.
///
/// # Example
///
/// ```ignore
/// use pgtrack::Entity;
///
/// #[derive(Debug, Default, Entity)]
/// #[orm(table = "Patients")]
/// struct Patient {
///     #[orm(id, auto, column = "Id")]
///     id: i32,
///     #[orm(column = "FirstName")]
///     first_name: String,
///     #[orm(column = "OIB", unique, length = 11)]
///     oib: String,
///     medical_histories: Vec<MedicalHistory>,
/// }
/// ```
///
/// # Generated
///
/// - `impl pgtrack::FromRow` — row materialization; columns missing from the
///   result set leave the field at its default, NULL maps to `None`
/// - `impl pgtrack::Entity` — a static `EntityDescriptor` plus parameter
///   extraction and generated-key write-back
/// - One `pgtrack::Navigation` constant per navigation field
///   (`Patient::MEDICAL_HISTORIES` for `medical_histories`)
///
/// # Attributes
///
/// Struct-level:
///
/// - `#[orm(table = "name")]` - Table name (default: type name + `s`)
///
/// Field-level:
///
/// - `#[orm(id)]` - Mark the primary key (exactly one per entity)
/// - `#[orm(auto)]` - Database-generated key (`SERIAL`); read back on insert
/// - `#[orm(column = "name")]` - Column name (default: field name)
/// - `#[orm(unique)]` - UNIQUE column
/// - `#[orm(nullable)]` - Force nullability (otherwise `Option<_>` decides)
/// - `#[orm(length = N)]` - `VARCHAR(N)` instead of `TEXT`
/// - `#[orm(default = <literal>)]` - `DEFAULT` literal in DDL
/// - `#[orm(references = "Table")]` / `#[orm(references_column = "Col")]` -
///   Foreign key metadata (informational)
/// - `#[orm(enumeration)]` - Store an `OrdinalEnum` field as INTEGER
/// - `#[orm(skip)]` - Never map this field
///
/// Fields typed `Vec<Related>` become collection navigations, fields typed
/// `Option<Related>` (for non-scalar `Related`) become single-entity
/// navigations; neither is mapped to a column. `String` and `Vec<u8>` are
/// ordinary columns.
#[proc_macro_derive(Entity, attributes(orm))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derive `pgtrack::Ordinal` for a unit-variant enum.
///
/// The stored value is the variant's discriminant (`as i32`), so explicit
/// discriminants are respected.
///
/// # Example
///
/// ```ignore
/// use pgtrack::OrdinalEnum;
///
/// #[derive(Debug, Clone, Copy, Default, OrdinalEnum)]
/// enum Status {
///     #[default]
///     Active,
///     Discharged,
/// }
/// ```
#[proc_macro_derive(OrdinalEnum)]
pub fn derive_ordinal_enum(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    ordinal::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
