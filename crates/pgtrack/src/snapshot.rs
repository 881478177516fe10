//! Typed schema snapshots.
//!
//! A [`Snapshot`] is a serializable description of the database schema at one
//! point in time, built from entity descriptors and persisted as JSON inside
//! migration history rows. The JSON shape is stable:
//!
//! ```json
//! { "version": 1,
//!   "createdAt": "2024-05-01T10:00:00",
//!   "tables": [
//!     { "tableName": "Patients",
//!       "columns": [
//!         { "name": "Id", "type": "INTEGER", "nullable": false,
//!           "primaryKey": true, "autoIncrement": true,
//!           "unique": false, "defaultValue": null } ] } ] }
//! ```

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::OrmResult;
use crate::ident;
use crate::metadata::{ColumnDescriptor, EntityDescriptor};

/// One column as captured by a snapshot.
///
/// Column identity is the name, compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSnapshot {
    pub name: String,
    /// Resolved SQL type string (`VARCHAR(50)`, `INTEGER`, …).
    #[serde(rename = "type")]
    pub column_type: String,
    pub nullable: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub unique: bool,
    /// Rendered SQL literal (`'x'`, `0`, `TRUE`), if any.
    pub default_value: Option<String>,
}

impl ColumnSnapshot {
    pub fn from_descriptor(column: &ColumnDescriptor) -> Self {
        Self {
            name: column.name.clone(),
            column_type: column.type_string(),
            nullable: column.nullable,
            primary_key: column.primary_key,
            auto_increment: column.auto_increment,
            unique: column.unique,
            default_value: column.default_value.as_ref().map(|d| d.to_sql_literal()),
        }
    }

    /// Definition equality for diffing: type (case-sensitive string compare),
    /// nullability, uniqueness and default. Primary key and auto-increment are
    /// excluded — they cannot be altered.
    pub fn definition_eq(&self, other: &Self) -> bool {
        self.column_type == other.column_type
            && self.nullable == other.nullable
            && self.unique == other.unique
            && self.default_value == other.default_value
    }

    /// DDL fragment, mirroring
    /// [`ColumnDescriptor::definition`](crate::metadata::ColumnDescriptor::definition)
    /// but sourced from snapshot data (reverse scripts recreate dropped tables
    /// from the old snapshot alone).
    pub fn definition(&self) -> String {
        let name = ident::quoted(&self.name);
        if self.primary_key && self.auto_increment {
            return format!("{name} SERIAL PRIMARY KEY");
        }

        let mut def = format!("{name} {}", self.column_type);
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
            def.push_str(default);
        }
        def
    }
}

/// One table as captured by a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSnapshot {
    pub table_name: String,
    pub columns: Vec<ColumnSnapshot>,
}

impl TableSnapshot {
    pub fn from_descriptor(descriptor: &EntityDescriptor) -> Self {
        Self {
            table_name: descriptor.table_name.clone(),
            columns: descriptor
                .columns
                .iter()
                .map(ColumnSnapshot::from_descriptor)
                .collect(),
        }
    }

    /// Look up a column by name (case-insensitive).
    pub fn column(&self, name: &str) -> Option<&ColumnSnapshot> {
        self.columns
            .iter()
            .find(|c| ident::eq_ignore_case(&c.name, name))
    }
}

/// A serializable description of the whole schema at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: i32,
    pub created_at: NaiveDateTime,
    pub tables: Vec<TableSnapshot>,
}

impl Snapshot {
    /// Build a snapshot from entity descriptors, in declaration order.
    pub fn from_entities(
        entities: &[&EntityDescriptor],
        version: i32,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            version,
            created_at,
            tables: entities
                .iter()
                .map(|d| TableSnapshot::from_descriptor(d))
                .collect(),
        }
    }

    /// Look up a table by name (case-insensitive).
    pub fn table(&self, name: &str) -> Option<&TableSnapshot> {
        self.tables
            .iter()
            .find(|t| ident::eq_ignore_case(&t.table_name, name))
    }

    pub fn to_json(&self) -> OrmResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> OrmResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
