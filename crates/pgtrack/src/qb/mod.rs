//! Parameterized SQL generation from entity metadata.
//!
//! Every statement is SQL text plus an owned parameter list; values never
//! appear inline. Builder output uses the library's `@p0, @p1, …` placeholder
//! convention (`@pId` is reserved for the primary key in an UPDATE's WHERE
//! clause); [`to_native_sql`] adapts placeholders to the driver's `$1, $2, …`
//! form immediately before execution and asserts that every placeholder has a
//! bound parameter.

mod param;

pub use param::to_native_sql;

use postgres::types::ToSql;

use crate::error::OrmResult;
use crate::ident;
use crate::metadata::EntityDescriptor;

/// An owned, bindable statement parameter.
pub type SqlParam = Box<dyn ToSql + Sync + Send>;

/// A statement ready for execution: SQL with `@pN` placeholders plus its
/// parameters in placeholder order.
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<SqlParam>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// The SQL with placeholders translated to the driver's `$n` form.
    pub fn native_sql(&self) -> OrmResult<String> {
        to_native_sql(&self.sql, self.params.len())
    }

    /// Parameter refs compatible with the driver.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect()
    }
}

impl std::fmt::Debug for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.sql)
            .field("params", &self.params.len())
            .finish()
    }
}

fn select_list(descriptor: &EntityDescriptor) -> String {
    descriptor
        .columns
        .iter()
        .map(|c| ident::quoted(&c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `CREATE TABLE IF NOT EXISTS "T" (…);` with columns in declaration order.
///
/// Emitted on a single line: migration reverse scripts are replayed by
/// splitting on newlines, and this statement appears inside them.
pub fn create_table(descriptor: &EntityDescriptor) -> String {
    let defs = descriptor
        .columns
        .iter()
        .map(|c| c.definition())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({defs});",
        ident::quoted(&descriptor.table_name)
    )
}

/// `DROP TABLE IF EXISTS "T" CASCADE;`
pub fn drop_table(descriptor: &EntityDescriptor) -> String {
    drop_table_named(&descriptor.table_name)
}

pub fn drop_table_named(table_name: &str) -> String {
    format!(
        "DROP TABLE IF EXISTS {} CASCADE;",
        ident::quoted(table_name)
    )
}

/// INSERT, omitting an auto-increment primary key from the column and value
/// lists. Appends `RETURNING "pk"` when the key is generated so the caller
/// can read it back.
///
/// `values` are the entity's column values in declaration order.
pub fn insert(descriptor: &EntityDescriptor, values: Vec<SqlParam>) -> OrmResult<Statement> {
    expect_value_count(descriptor, &values)?;
    let pk = descriptor.primary_key();
    let skip_pk = pk.auto_increment;
    let pk_index = descriptor.primary_key_index();

    let mut columns = Vec::new();
    let mut placeholders = Vec::new();
    let mut params = Vec::new();
    for (i, value) in values.into_iter().enumerate() {
        if skip_pk && i == pk_index {
            continue;
        }
        columns.push(ident::quoted(&descriptor.columns[i].name));
        placeholders.push(format!("@p{}", params.len()));
        params.push(value);
    }

    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        ident::quoted(&descriptor.table_name),
        columns.join(", "),
        placeholders.join(", ")
    );
    if skip_pk {
        sql.push_str(&format!(" RETURNING {}", ident::quoted(&pk.name)));
    } else {
        sql.push(';');
    }
    Ok(Statement::new(sql, params))
}

/// `UPDATE "T" SET "c"=@p0, … WHERE "pk" = @pId;` — the primary key is
/// excluded from the SET list and bound as the final parameter.
pub fn update(
    descriptor: &EntityDescriptor,
    values: Vec<SqlParam>,
    pk_value: SqlParam,
) -> OrmResult<Statement> {
    expect_value_count(descriptor, &values)?;
    let pk_index = descriptor.primary_key_index();

    let mut sets = Vec::new();
    let mut params = Vec::new();
    for (i, value) in values.into_iter().enumerate() {
        if i == pk_index {
            continue;
        }
        sets.push(format!(
            "{}=@p{}",
            ident::quoted(&descriptor.columns[i].name),
            params.len()
        ));
        params.push(value);
    }
    params.push(pk_value);

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = @pId;",
        ident::quoted(&descriptor.table_name),
        sets.join(", "),
        ident::quoted(&descriptor.primary_key().name)
    );
    Ok(Statement::new(sql, params))
}

/// `DELETE FROM "T" WHERE "pk" = @p0;`
pub fn delete(descriptor: &EntityDescriptor) -> String {
    format!(
        "DELETE FROM {} WHERE {} = @p0;",
        ident::quoted(&descriptor.table_name),
        ident::quoted(&descriptor.primary_key().name)
    )
}

/// `SELECT "c1", … FROM "T";` with columns in declaration order.
pub fn select_all(descriptor: &EntityDescriptor) -> String {
    format!(
        "SELECT {} FROM {};",
        select_list(descriptor),
        ident::quoted(&descriptor.table_name)
    )
}

/// `SELECT … FROM "T" WHERE "pk" = @p0;`
pub fn select_by_id(descriptor: &EntityDescriptor) -> String {
    select_by_column(descriptor, &descriptor.primary_key().name)
}

/// `SELECT … FROM "T" WHERE "col" = @p0;`
pub fn select_by_column(descriptor: &EntityDescriptor, column: &str) -> String {
    format!(
        "SELECT {} FROM {} WHERE {} = @p0;",
        select_list(descriptor),
        ident::quoted(&descriptor.table_name),
        ident::quoted(column)
    )
}

/// SELECT with an optional raw WHERE fragment (the caller numbers its own
/// `@pN` placeholders) and optional `ORDER BY "col" ASC|DESC`.
pub fn select_where(
    descriptor: &EntityDescriptor,
    fragment: Option<&str>,
    order_by: Option<(&str, bool)>,
) -> String {
    let mut sql = format!(
        "SELECT {} FROM {}",
        select_list(descriptor),
        ident::quoted(&descriptor.table_name)
    );
    if let Some(fragment) = fragment {
        sql.push_str(" WHERE ");
        sql.push_str(fragment);
    }
    if let Some((column, ascending)) = order_by {
        sql.push_str(" ORDER BY ");
        sql.push_str(&ident::quoted(column));
        sql.push_str(if ascending { " ASC" } else { " DESC" });
    }
    sql.push(';');
    sql
}

/// `SELECT COUNT(*) FROM "T" [WHERE …];`
pub fn count(descriptor: &EntityDescriptor, fragment: Option<&str>) -> String {
    let mut sql = format!("SELECT COUNT(*) FROM {}", ident::quoted(&descriptor.table_name));
    if let Some(fragment) = fragment {
        sql.push_str(" WHERE ");
        sql.push_str(fragment);
    }
    sql.push(';');
    sql
}

fn expect_value_count(descriptor: &EntityDescriptor, values: &[SqlParam]) -> OrmResult<()> {
    if values.len() != descriptor.columns.len() {
        return Err(crate::error::OrmError::validation(format!(
            "{}: expected {} column values, got {}",
            descriptor.entity_name,
            descriptor.columns.len(),
            values.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests;
