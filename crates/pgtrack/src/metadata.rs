//! Entity metadata.
//!
//! `#[derive(Entity)]` expands each annotated struct into a static
//! [`EntityDescriptor`]: table name, mapped columns in declaration order, and
//! the primary key. Navigation fields (collections of entities, optional
//! entity references) never appear in the column list — the derive filters
//! them at expansion time, so every name lookup that reflection would do at
//! runtime is resolved against this table instead.

use postgres::Row;

use crate::error::{OrmError, OrmResult};
use crate::ident;
use crate::qb::SqlParam;
use crate::row::FromRow;
use crate::types::SqlType;

/// A literal used in `DEFAULT` clauses.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    /// String and timestamp literals; both render single-quoted.
    Text(String),
}

impl DefaultValue {
    /// Render as a SQL literal: strings single-quoted (embedded `'` doubled),
    /// booleans `TRUE`/`FALSE`, numerics as decimal.
    pub fn to_sql_literal(&self) -> String {
        match self {
            Self::Int(v) => v.to_string(),
            Self::Float(v) => {
                if v.fract() == 0.0 && v.is_finite() {
                    format!("{v:.1}")
                } else {
                    v.to_string()
                }
            }
            Self::Bool(true) => "TRUE".to_string(),
            Self::Bool(false) => "FALSE".to_string(),
            Self::Text(s) => format!("'{}'", s.replace('\'', "''")),
        }
    }
}

/// Foreign key metadata. Informational only: CREATE TABLE does not emit
/// REFERENCES clauses and the differ does not manage constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub references_table: String,
    pub references_column: String,
}

/// One mapped column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub sql_type: SqlType,
    pub length: Option<u32>,
    pub nullable: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub unique: bool,
    pub default_value: Option<DefaultValue>,
    pub foreign_key: Option<ForeignKey>,
}

impl ColumnDescriptor {
    /// The resolved SQL type string (`VARCHAR(50)`, `INTEGER`, …).
    pub fn type_string(&self) -> String {
        self.sql_type.ddl(self.length)
    }

    /// DDL fragment for CREATE TABLE.
    ///
    /// An auto-increment primary key collapses to `"Id" SERIAL PRIMARY KEY`
    /// with no further modifiers. Everything else renders the type followed by
    /// `PRIMARY KEY`, `NOT NULL`, `UNIQUE` and `DEFAULT` in that order.
    pub fn definition(&self) -> String {
        let name = ident::quoted(&self.name);
        if self.primary_key && self.auto_increment {
            return format!("{name} SERIAL PRIMARY KEY");
        }

        let mut def = format!("{name} {}", self.type_string());
        if self.primary_key {
            def.push_str(" PRIMARY KEY");
        }
        if !self.nullable {
            def.push_str(" NOT NULL");
        }
        if self.unique {
            def.push_str(" UNIQUE");
        }
        if let Some(default) = &self.default_value {
            def.push_str(" DEFAULT ");
            def.push_str(&default.to_sql_literal());
        }
        def
    }
}

/// Static metadata for one entity type.
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    /// The Rust type name; used by foreign-key conventions and migration names.
    pub entity_name: &'static str,
    pub table_name: String,
    /// Mapped columns in declaration order.
    pub columns: Vec<ColumnDescriptor>,
    pk: usize,
}

impl EntityDescriptor {
    /// Build a descriptor, validating identifiers and locating the primary
    /// key.
    ///
    /// Errors when the column list declares no primary key or more than one —
    /// every entity has exactly one.
    pub fn new(
        entity_name: &'static str,
        table_name: impl Into<String>,
        columns: Vec<ColumnDescriptor>,
    ) -> OrmResult<Self> {
        let table_name = table_name.into();
        crate::ident::Ident::new(&table_name)?;
        for col in &columns {
            crate::ident::Ident::new(&col.name)?;
        }

        let mut pk = None;
        for (i, col) in columns.iter().enumerate() {
            if col.primary_key {
                if pk.is_some() {
                    return Err(OrmError::metadata(format!(
                        "entity {entity_name} declares more than one primary key column"
                    )));
                }
                pk = Some(i);
            }
        }
        let pk = pk.ok_or_else(|| {
            OrmError::metadata(format!(
                "entity {entity_name} declares no primary key column"
            ))
        })?;
        Ok(Self {
            entity_name,
            table_name,
            columns,
            pk,
        })
    }

    /// The primary key column.
    pub fn primary_key(&self) -> &ColumnDescriptor {
        &self.columns[self.pk]
    }

    /// Index of the primary key within [`columns`](Self::columns).
    pub fn primary_key_index(&self) -> usize {
        self.pk
    }

    /// Look up a column by name (case-insensitive).
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns
            .iter()
            .find(|c| ident::eq_ignore_case(&c.name, name))
    }

    /// Look up a column by conventional name (case- and underscore-insensitive),
    /// used when matching foreign-key naming conventions like `PatientId`.
    pub fn column_conventional(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns
            .iter()
            .find(|c| ident::eq_conventional(&c.name, name))
    }
}

/// A persistable entity type, implemented by `#[derive(Entity)]`.
pub trait Entity: FromRow + 'static {
    /// The Rust type name.
    const ENTITY_NAME: &'static str;

    /// Static table/column metadata.
    fn descriptor() -> &'static EntityDescriptor;

    /// Owned parameter values for every mapped column, declaration order.
    fn column_values(&self) -> Vec<SqlParam>;

    /// The current primary key value as a bindable parameter.
    fn pk_value(&self) -> SqlParam;

    /// Assign a database-generated key from an `INSERT … RETURNING` row.
    ///
    /// No-op for entities without an auto-increment primary key.
    fn set_generated_pk(&mut self, row: &Row) -> OrmResult<()>;
}

/// The set of entities a database schema is built from.
///
/// Declaration order matters: migrations emit changes in this order, and
/// [`reset`](crate::MigrationEngine::reset) drops tables in reverse order.
/// Cross-table foreign keys are the caller's responsibility to order.
pub trait Schema {
    fn entities() -> Vec<&'static EntityDescriptor>;
}
