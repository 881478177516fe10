//! Schema diffing and per-change DDL generation.
//!
//! [`compare`] turns two snapshots into an ordered change list; every
//! [`SchemaChange`] emits its own forward and reverse SQL. Reverse scripts
//! are replayed line by line at rollback time, so each generated statement
//! stays on a single line.
//!
//! Changes follow entity declaration order. Cross-table dependencies (foreign
//! keys) are not topologically sorted — declaration order is the caller's
//! responsibility.

use crate::ident;
use crate::snapshot::{ColumnSnapshot, Snapshot, TableSnapshot};
use crate::types::type_default;

/// One schema edit.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaChange {
    CreateTable(TableSnapshot),
    DropTable(TableSnapshot),
    AddColumn {
        table: String,
        column: ColumnSnapshot,
    },
    DropColumn {
        table: String,
        column: ColumnSnapshot,
    },
    AlterColumn {
        table: String,
        old: ColumnSnapshot,
        new: ColumnSnapshot,
    },
}

/// Diff two snapshots into an ordered change list.
///
/// With no previous snapshot every table in `new` becomes a CreateTable.
/// Otherwise tables and columns are walked in `new`'s order (additions and
/// alterations), then `old`'s leftovers become drops. Table and column names
/// compare case-insensitively.
pub fn compare(old: Option<&Snapshot>, new: &Snapshot) -> Vec<SchemaChange> {
    let mut changes = Vec::new();

    let Some(old) = old else {
        for table in &new.tables {
            changes.push(SchemaChange::CreateTable(table.clone()));
        }
        return changes;
    };

    for new_table in &new.tables {
        match old.table(&new_table.table_name) {
            None => changes.push(SchemaChange::CreateTable(new_table.clone())),
            Some(old_table) => compare_columns(old_table, new_table, &mut changes),
        }
    }

    for old_table in &old.tables {
        if new.table(&old_table.table_name).is_none() {
            changes.push(SchemaChange::DropTable(old_table.clone()));
        }
    }

    changes
}

fn compare_columns(old: &TableSnapshot, new: &TableSnapshot, changes: &mut Vec<SchemaChange>) {
    for new_col in &new.columns {
        match old.column(&new_col.name) {
            None => changes.push(SchemaChange::AddColumn {
                table: new.table_name.clone(),
                column: new_col.clone(),
            }),
            Some(old_col) if !old_col.definition_eq(new_col) => {
                changes.push(SchemaChange::AlterColumn {
                    table: new.table_name.clone(),
                    old: old_col.clone(),
                    new: new_col.clone(),
                });
            }
            Some(_) => {}
        }
    }

    for old_col in &old.columns {
        if new.column(&old_col.name).is_none() {
            changes.push(SchemaChange::DropColumn {
                table: old.table_name.clone(),
                column: old_col.clone(),
            });
        }
    }
}

fn create_table_sql(table: &TableSnapshot) -> String {
    let defs = table
        .columns
        .iter()
        .map(|c| c.definition())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({defs});",
        ident::quoted(&table.table_name)
    )
}

fn drop_table_sql(table: &TableSnapshot) -> String {
    format!(
        "DROP TABLE IF EXISTS {} CASCADE;",
        ident::quoted(&table.table_name)
    )
}

/// `ALTER TABLE … ADD COLUMN` for a live table.
///
/// A non-nullable column added to existing rows needs a value, so a type
/// default (`0`, `0.0`, `FALSE`, `NOW()`, `''`) is injected when the column
/// does not declare one.
fn add_column_sql(table: &str, column: &ColumnSnapshot) -> String {
    let mut sql = format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        ident::quoted(table),
        ident::quoted(&column.name),
        column.column_type
    );
    if let Some(default) = &column.default_value {
        sql.push_str(" DEFAULT ");
        sql.push_str(default);
    } else if !column.nullable {
        sql.push_str(" DEFAULT ");
        sql.push_str(type_default(&column.column_type));
    }
    if column.unique {
        sql.push_str(" UNIQUE");
    }
    sql.push(';');
    sql
}

fn drop_column_sql(table: &str, column: &ColumnSnapshot) -> String {
    format!(
        "ALTER TABLE {} DROP COLUMN {};",
        ident::quoted(table),
        ident::quoted(&column.name)
    )
}

/// Zero or more single-line statements, newline-separated.
fn alter_column_sql(table: &str, old: &ColumnSnapshot, new: &ColumnSnapshot) -> String {
    let table_ident = ident::quoted(table);
    let column_ident = ident::quoted(&new.name);
    let mut statements = Vec::new();

    if old.column_type != new.column_type {
        statements.push(format!(
            "ALTER TABLE {table_ident} ALTER COLUMN {column_ident} TYPE {};",
            new.column_type
        ));
    }
    if old.nullable != new.nullable {
        let action = if new.nullable { "DROP NOT NULL" } else { "SET NOT NULL" };
        statements.push(format!(
            "ALTER TABLE {table_ident} ALTER COLUMN {column_ident} {action};"
        ));
    }
    if old.unique != new.unique {
        let constraint = ident::quoted(&format!("{table}_{}_unique", new.name));
        if new.unique {
            statements.push(format!(
                "ALTER TABLE {table_ident} ADD CONSTRAINT {constraint} UNIQUE ({column_ident});"
            ));
        } else {
            statements.push(format!(
                "ALTER TABLE {table_ident} DROP CONSTRAINT {constraint};"
            ));
        }
    }

    statements.join("\n")
}

impl SchemaChange {
    /// Forward DDL for this change.
    pub fn up_sql(&self) -> String {
        match self {
            Self::CreateTable(table) => create_table_sql(table),
            Self::DropTable(table) => drop_table_sql(table),
            Self::AddColumn { table, column } => add_column_sql(table, column),
            Self::DropColumn { table, column } => drop_column_sql(table, column),
            Self::AlterColumn { table, old, new } => alter_column_sql(table, old, new),
        }
    }

    /// Reverse DDL: applying [`up_sql`](Self::up_sql) then this leaves the
    /// schema where it started.
    pub fn down_sql(&self) -> String {
        match self {
            Self::CreateTable(table) => drop_table_sql(table),
            Self::DropTable(table) => create_table_sql(table),
            Self::AddColumn { table, column } => drop_column_sql(table, column),
            Self::DropColumn { table, column } => add_column_sql(table, column),
            Self::AlterColumn { table, old, new } => alter_column_sql(table, new, old),
        }
    }

    /// Short human-readable form for plans and logs.
    pub fn describe(&self) -> String {
        match self {
            Self::CreateTable(table) => format!("CreateTable {}", table.table_name),
            Self::DropTable(table) => format!("DropTable {}", table.table_name),
            Self::AddColumn { table, column } => {
                format!("AddColumn {table}.{}", column.name)
            }
            Self::DropColumn { table, column } => {
                format!("DropColumn {table}.{}", column.name)
            }
            Self::AlterColumn { table, new, .. } => {
                format!("AlterColumn {table}.{}", new.name)
            }
        }
    }
}
