//! Entity derive macro implementation.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields, Result};

use crate::attrs::{self, FieldAttr};
use crate::fields::{classify, eq_conventional, option_inner, shout_snake, FieldKind};

struct MappedColumn<'a> {
    ident: &'a syn::Ident,
    ty: &'a syn::Type,
    column: String,
    attr: FieldAttr,
    enumeration: bool,
    /// Nullability known from the field shape (enumeration fields only;
    /// scalar fields read it from `ColumnType`).
    shape_nullable: bool,
}

struct CollectionNav<'a> {
    ident: &'a syn::Ident,
    related: &'a syn::Type,
}

struct SingleNav<'a> {
    ident: &'a syn::Ident,
    related: &'a syn::Type,
}

pub(crate) fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let entity_name = name.to_string();

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Entity cannot be derived for generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Entity can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Entity can only be derived for structs",
            ))
        }
    };

    let table = attrs::table_name(&input)?;

    let mut columns: Vec<MappedColumn> = Vec::new();
    let mut collection_navs: Vec<CollectionNav> = Vec::new();
    let mut single_navs: Vec<SingleNav> = Vec::new();
    let mut skipped: Vec<&syn::Ident> = Vec::new();

    for field in fields {
        let ident = field.ident.as_ref().unwrap();
        let attr = attrs::field_attr(field)?;
        let kind = classify(field, &attr)?;

        if attr.is_id && !matches!(kind, FieldKind::Scalar { .. } | FieldKind::Enumeration { .. })
        {
            return Err(syn::Error::new_spanned(
                field,
                "#[orm(id)] must mark a mapped column",
            ));
        }

        match kind {
            FieldKind::Scalar { nullable } => columns.push(MappedColumn {
                ident,
                ty: &field.ty,
                column: attr.column.clone().unwrap_or_else(|| ident.to_string()),
                attr,
                enumeration: false,
                shape_nullable: nullable,
            }),
            FieldKind::Enumeration { nullable } => columns.push(MappedColumn {
                ident,
                ty: &field.ty,
                column: attr.column.clone().unwrap_or_else(|| ident.to_string()),
                attr,
                enumeration: true,
                shape_nullable: nullable,
            }),
            FieldKind::CollectionNav { related } => {
                collection_navs.push(CollectionNav { ident, related })
            }
            FieldKind::SingleNav { related } => single_navs.push(SingleNav { ident, related }),
            FieldKind::Skipped => skipped.push(ident),
        }
    }

    let pk_count = columns.iter().filter(|c| c.attr.is_id).count();
    if pk_count != 1 {
        return Err(syn::Error::new_spanned(
            &input,
            format!("Entity requires exactly one #[orm(id)] column, found {pk_count}"),
        ));
    }
    let pk = columns.iter().find(|c| c.attr.is_id).unwrap();
    let pk_ident = pk.ident;
    let pk_column = pk.column.clone();
    let pk_auto = pk.attr.auto;

    let descriptor_columns = columns.iter().map(column_descriptor_tokens);
    let from_row_fields = from_row_tokens(&columns, &collection_navs, &single_navs, &skipped);
    let value_pushes = columns.iter().map(column_value_tokens);

    let set_generated_pk = if pk_auto {
        quote! {
            self.#pk_ident = row
                .try_get(0)
                .map_err(|e| pgtrack::OrmError::decode(#pk_column, e.to_string()))?;
            ::std::result::Result::Ok(())
        }
    } else {
        quote! {
            let _ = row;
            ::std::result::Result::Ok(())
        }
    };

    let navigation_consts = navigation_tokens(
        name,
        &entity_name,
        pk_ident,
        &columns,
        &collection_navs,
        &single_navs,
    )?;

    Ok(quote! {
        impl pgtrack::FromRow for #name {
            fn from_row(row: &pgtrack::postgres::Row) -> pgtrack::OrmResult<Self> {
                ::std::result::Result::Ok(Self {
                    #(#from_row_fields),*
                })
            }
        }

        impl pgtrack::Entity for #name {
            const ENTITY_NAME: &'static str = #entity_name;

            fn descriptor() -> &'static pgtrack::EntityDescriptor {
                static DESCRIPTOR: ::std::sync::LazyLock<pgtrack::EntityDescriptor> =
                    ::std::sync::LazyLock::new(|| {
                        pgtrack::EntityDescriptor::new(
                            #entity_name,
                            #table,
                            ::std::vec![#(#descriptor_columns),*],
                        )
                        .expect("entity declares exactly one primary key")
                    });
                &DESCRIPTOR
            }

            fn column_values(&self) -> ::std::vec::Vec<pgtrack::SqlParam> {
                let mut params: ::std::vec::Vec<pgtrack::SqlParam> =
                    ::std::vec::Vec::with_capacity(
                        <#name as pgtrack::Entity>::descriptor().columns.len(),
                    );
                #(#value_pushes)*
                params
            }

            fn pk_value(&self) -> pgtrack::SqlParam {
                ::std::boxed::Box::new(self.#pk_ident.clone())
            }

            fn set_generated_pk(&mut self, row: &pgtrack::postgres::Row) -> pgtrack::OrmResult<()> {
                #set_generated_pk
            }
        }

        #navigation_consts
    })
}

fn column_descriptor_tokens(column: &MappedColumn) -> TokenStream {
    let name = &column.column;
    let ty = column.ty;

    let sql_type = if column.enumeration {
        quote! { pgtrack::SqlType::Integer }
    } else {
        quote! { <#ty as pgtrack::ColumnType>::SQL_TYPE }
    };

    let explicit_nullable = column.attr.nullable;
    let nullable = if column.enumeration {
        let shape = column.shape_nullable;
        quote! { #explicit_nullable || #shape }
    } else {
        quote! { #explicit_nullable || <#ty as pgtrack::ColumnType>::NULLABLE }
    };

    let length = match column.attr.length {
        Some(n) => quote! { ::std::option::Option::Some(#n) },
        None => quote! { ::std::option::Option::None },
    };

    let primary_key = column.attr.is_id;
    let auto_increment = column.attr.auto;
    let unique = column.attr.unique;

    let default_value = match &column.attr.default {
        Some(syn::Lit::Str(s)) => {
            quote! { ::std::option::Option::Some(pgtrack::DefaultValue::Text(#s.to_string())) }
        }
        Some(syn::Lit::Int(i)) => {
            quote! { ::std::option::Option::Some(pgtrack::DefaultValue::Int(#i)) }
        }
        Some(syn::Lit::Float(f)) => {
            quote! { ::std::option::Option::Some(pgtrack::DefaultValue::Float(#f)) }
        }
        Some(syn::Lit::Bool(b)) => {
            quote! { ::std::option::Option::Some(pgtrack::DefaultValue::Bool(#b)) }
        }
        Some(other) => {
            let msg = syn::Error::new_spanned(other, "unsupported default literal")
                .to_compile_error();
            quote! { #msg }
        }
        None => quote! { ::std::option::Option::None },
    };

    let foreign_key = match &column.attr.references {
        Some(table) => {
            let column = column
                .attr
                .references_column
                .clone()
                .unwrap_or_else(|| "Id".to_string());
            quote! {
                ::std::option::Option::Some(pgtrack::ForeignKey {
                    references_table: #table.to_string(),
                    references_column: #column.to_string(),
                })
            }
        }
        None => quote! { ::std::option::Option::None },
    };

    quote! {
        pgtrack::ColumnDescriptor {
            name: #name.to_string(),
            sql_type: #sql_type,
            length: #length,
            nullable: #nullable,
            primary_key: #primary_key,
            auto_increment: #auto_increment,
            unique: #unique,
            default_value: #default_value,
            foreign_key: #foreign_key,
        }
    }
}

fn column_value_tokens(column: &MappedColumn) -> TokenStream {
    let ident = column.ident;
    if column.enumeration {
        if column.shape_nullable {
            quote! {
                params.push(::std::boxed::Box::new(
                    self.#ident.as_ref().map(pgtrack::Ordinal::ordinal),
                ));
            }
        } else {
            quote! {
                params.push(::std::boxed::Box::new(pgtrack::Ordinal::ordinal(&self.#ident)));
            }
        }
    } else {
        quote! {
            params.push(::std::boxed::Box::new(self.#ident.clone()));
        }
    }
}

fn from_row_tokens<'a>(
    columns: &'a [MappedColumn],
    collection_navs: &'a [CollectionNav],
    single_navs: &'a [SingleNav],
    skipped: &'a [&'a syn::Ident],
) -> Vec<TokenStream> {
    let mut out = Vec::new();

    for column in columns {
        let ident = column.ident;
        let name = &column.column;
        if column.enumeration {
            if column.shape_nullable {
                out.push(quote! {
                    #ident: match pgtrack::row::get_or_default::<::std::option::Option<i32>>(row, #name)? {
                        ::std::option::Option::Some(v) => {
                            ::std::option::Option::Some(pgtrack::Ordinal::from_ordinal(v)?)
                        }
                        ::std::option::Option::None => ::std::option::Option::None,
                    }
                });
            } else {
                out.push(quote! {
                    #ident: match pgtrack::row::get_or_default::<::std::option::Option<i32>>(row, #name)? {
                        ::std::option::Option::Some(v) => pgtrack::Ordinal::from_ordinal(v)?,
                        ::std::option::Option::None => ::core::default::Default::default(),
                    }
                });
            }
        } else {
            out.push(quote! {
                #ident: pgtrack::row::get_or_default(row, #name)?
            });
        }
    }

    for nav in collection_navs {
        let ident = nav.ident;
        out.push(quote! { #ident: ::std::vec::Vec::new() });
    }
    for nav in single_navs {
        let ident = nav.ident;
        out.push(quote! { #ident: ::std::option::Option::None });
    }
    for ident in skipped {
        out.push(quote! { #ident: ::core::default::Default::default() });
    }

    out
}

fn navigation_tokens(
    name: &syn::Ident,
    entity_name: &str,
    pk_ident: &syn::Ident,
    columns: &[MappedColumn],
    collection_navs: &[CollectionNav],
    single_navs: &[SingleNav],
) -> Result<TokenStream> {
    if collection_navs.is_empty() && single_navs.is_empty() {
        return Ok(TokenStream::new());
    }

    let mut consts = Vec::new();

    for nav in collection_navs {
        let ident = nav.ident;
        let related = nav.related;
        let nav_name = ident.to_string();
        let const_ident = format_ident!("{}", shout_snake(&nav_name));
        // The related table's FK column follows the `<OwnerType>Id` convention.
        let fk_conventional = format!("{entity_name}Id");
        let doc = format!(
            "Eager-load the `{nav_name}` collection \
             (rows of the related table whose `{fk_conventional}` matches this entity's key)."
        );

        consts.push(quote! {
            #[doc = #doc]
            pub const #const_ident: pgtrack::Navigation<#name> = pgtrack::Navigation::new(
                #nav_name,
                |root: &mut #name, exec: &mut dyn pgtrack::SqlExecutor| -> pgtrack::OrmResult<()> {
                    let related = <#related as pgtrack::Entity>::descriptor();
                    let fk = match related.column_conventional(#fk_conventional) {
                        ::std::option::Option::Some(col) => col.name.clone(),
                        ::std::option::Option::None => return ::std::result::Result::Ok(()),
                    };
                    let sql = pgtrack::qb::to_native_sql(
                        &pgtrack::qb::select_by_column(related, &fk),
                        1,
                    )?;
                    let rows = pgtrack::SqlExecutor::query(exec, &sql, &[&root.#pk_ident])?;
                    let mut items = ::std::vec::Vec::with_capacity(rows.len());
                    for row in &rows {
                        items.push(<#related as pgtrack::FromRow>::from_row(row)?);
                    }
                    root.#ident = items;
                    ::std::result::Result::Ok(())
                },
            );
        });
    }

    for nav in single_navs {
        let ident = nav.ident;
        let related = nav.related;
        let nav_name = ident.to_string();
        let const_ident = format_ident!("{}", shout_snake(&nav_name));
        // Local FK field follows the `<navName>Id` convention; without one the
        // navigation loads nothing.
        let fk_conventional = format!("{nav_name}Id");
        let fk_field = columns
            .iter()
            .find(|c| eq_conventional(&c.ident.to_string(), &fk_conventional));

        let body = match fk_field {
            None => quote! {
                let _ = (root, exec);
                ::std::result::Result::Ok(())
            },
            Some(fk) => {
                let fk_ident = fk.ident;
                let fk_read = if option_inner(fk.ty).is_some() {
                    quote! {
                        let fk = match self_fk {
                            ::std::option::Option::Some(v) => v,
                            ::std::option::Option::None => {
                                return ::std::result::Result::Ok(());
                            }
                        };
                    }
                } else {
                    quote! { let fk = self_fk; }
                };
                quote! {
                    let self_fk = root.#fk_ident.clone();
                    #fk_read
                    let related = <#related as pgtrack::Entity>::descriptor();
                    let sql = pgtrack::qb::to_native_sql(
                        &pgtrack::qb::select_by_id(related),
                        1,
                    )?;
                    let rows = pgtrack::SqlExecutor::query(exec, &sql, &[&fk])?;
                    root.#ident = match rows.first() {
                        ::std::option::Option::Some(row) => ::std::option::Option::Some(
                            <#related as pgtrack::FromRow>::from_row(row)?,
                        ),
                        ::std::option::Option::None => ::std::option::Option::None,
                    };
                    ::std::result::Result::Ok(())
                }
            }
        };

        let doc = format!("Eager-load the `{nav_name}` reference via its `{fk_conventional}` key.");
        consts.push(quote! {
            #[doc = #doc]
            pub const #const_ident: pgtrack::Navigation<#name> = pgtrack::Navigation::new(
                #nav_name,
                |root: &mut #name, exec: &mut dyn pgtrack::SqlExecutor| -> pgtrack::OrmResult<()> {
                    #body
                },
            );
        });
    }

    Ok(quote! {
        impl #name {
            #(#consts)*
        }
    })
}
