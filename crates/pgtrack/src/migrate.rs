//! Migration engine and versioned history.
//!
//! The engine compares the latest snapshot stored in `__MigrationHistory`
//! against the schema the entity descriptors describe, applies the diff, and
//! records a history row carrying the new snapshot plus the aggregated
//! forward and reverse SQL. That row is the sole source of truth for
//! rollback: the database can be rolled back on a machine that no longer has
//! the old entity definitions.
//!
//! DDL statements are applied individually, without a wrapping transaction.
//! A failing change aborts the run before the history row is written, so the
//! operator can fix the cause and rerun; schema changes already applied are
//! not automatically reverted. The history table carries no advisory-lock
//! guard either — running migrations is one operator's job at a time.

use chrono::{NaiveDateTime, Utc};

use crate::client::SqlExecutor;
use crate::diff::{compare, SchemaChange};
use crate::error::{OrmError, OrmResult};
use crate::metadata::Schema;
use crate::qb;
use crate::snapshot::Snapshot;

/// Name of the history table.
pub const HISTORY_TABLE: &str = "__MigrationHistory";

const ENSURE_HISTORY_SQL: &str = concat!(
    "CREATE TABLE IF NOT EXISTS \"__MigrationHistory\" (",
    "\"Id\" SERIAL PRIMARY KEY, ",
    "\"Version\" INTEGER NOT NULL, ",
    "\"Name\" VARCHAR(255) NOT NULL, ",
    "\"AppliedAt\" TIMESTAMP NOT NULL DEFAULT NOW(), ",
    "\"SnapshotJson\" TEXT NOT NULL, ",
    "\"SqlUp\" TEXT NOT NULL, ",
    "\"SqlDown\" TEXT NOT NULL);"
);

const CURRENT_VERSION_SQL: &str =
    "SELECT COALESCE(MAX(\"Version\"), 0)::bigint FROM \"__MigrationHistory\";";

const SNAPSHOT_BY_VERSION_SQL: &str =
    "SELECT \"SnapshotJson\" FROM \"__MigrationHistory\" WHERE \"Version\" = $1;";

const DOWN_BY_VERSION_SQL: &str =
    "SELECT \"SqlDown\" FROM \"__MigrationHistory\" WHERE \"Version\" = $1;";

const INSERT_HISTORY_SQL: &str = concat!(
    "INSERT INTO \"__MigrationHistory\" ",
    "(\"Version\", \"Name\", \"SnapshotJson\", \"SqlUp\", \"SqlDown\") ",
    "VALUES ($1, $2, $3, $4, $5);"
);

const DELETE_VERSION_SQL: &str = "DELETE FROM \"__MigrationHistory\" WHERE \"Version\" = $1;";

const SELECT_HISTORY_SQL: &str = concat!(
    "SELECT \"Id\", \"Version\", \"Name\", \"AppliedAt\", \"SnapshotJson\", \"SqlUp\", \"SqlDown\" ",
    "FROM \"__MigrationHistory\" ORDER BY \"Version\";"
);

const CLEAR_HISTORY_SQL: &str = "DELETE FROM \"__MigrationHistory\";";

/// One applied migration, as persisted in `__MigrationHistory`.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationRecord {
    pub id: i32,
    pub version: i32,
    pub name: String,
    pub applied_at: NaiveDateTime,
    pub snapshot_json: String,
    pub sql_up: String,
    pub sql_down: String,
}

/// Drives schema migrations against one database.
pub struct MigrationEngine {
    conn_str: String,
}

impl MigrationEngine {
    pub fn new(conn_str: impl Into<String>) -> Self {
        Self {
            conn_str: conn_str.into(),
        }
    }

    fn open(&self) -> OrmResult<postgres::Client> {
        postgres::Client::connect(&self.conn_str, postgres::NoTls)
            .map_err(|e| OrmError::Connection(e.to_string()))
    }

    /// Diff the stored schema against `S` and apply the changes.
    ///
    /// Returns the new version, or `None` when the schema is already current.
    pub fn migrate_all<S: Schema>(&self) -> OrmResult<Option<i32>> {
        migrate_all_with::<S>(&mut self.open()?)
    }

    /// Roll back the most recent migration. No-op at version 0.
    pub fn rollback(&self) -> OrmResult<()> {
        rollback_with(&mut self.open()?)
    }

    /// Roll back until `target_version` is the latest applied version.
    pub fn rollback_to(&self, target_version: i32) -> OrmResult<()> {
        rollback_to_with(&mut self.open()?, target_version)
    }

    /// Drop every entity table (reverse declaration order), clear the
    /// history, and migrate from scratch.
    pub fn reset<S: Schema>(&self) -> OrmResult<Option<i32>> {
        reset_with::<S>(&mut self.open()?)
    }

    /// The latest applied version (0 when none).
    pub fn current_version(&self) -> OrmResult<i32> {
        current_version_with(&mut self.open()?)
    }

    /// All applied migrations, oldest first.
    pub fn history(&self) -> OrmResult<Vec<MigrationRecord>> {
        history_with(&mut self.open()?)
    }

    /// The changes [`migrate_all`](Self::migrate_all) would apply, without
    /// executing anything.
    pub fn migration_plan<S: Schema>(&self) -> OrmResult<Vec<SchemaChange>> {
        migration_plan_with::<S>(&mut self.open()?)
    }
}

fn ensure_history(exec: &mut impl SqlExecutor) -> OrmResult<()> {
    exec.execute(ENSURE_HISTORY_SQL, &[])?;
    Ok(())
}

/// [`MigrationEngine::current_version`] against a caller-supplied executor.
pub fn current_version_with(exec: &mut impl SqlExecutor) -> OrmResult<i32> {
    ensure_history(exec)?;
    Ok(exec.scalar_i64(CURRENT_VERSION_SQL, &[])? as i32)
}

fn stored_snapshot(exec: &mut impl SqlExecutor, version: i32) -> OrmResult<Option<Snapshot>> {
    if version == 0 {
        return Ok(None);
    }
    let json = exec
        .scalar_text(SNAPSHOT_BY_VERSION_SQL, &[&version])?
        .ok_or_else(|| {
            OrmError::migration_conflict(format!("history row for version {version} is missing"))
        })?;
    Ok(Some(Snapshot::from_json(&json)?))
}

fn execute_statements(exec: &mut impl SqlExecutor, sql: &str) -> OrmResult<()> {
    for statement in sql.lines().map(str::trim).filter(|s| !s.is_empty()) {
        exec.execute(statement, &[])?;
    }
    Ok(())
}

/// [`MigrationEngine::migrate_all`] against a caller-supplied executor.
pub fn migrate_all_with<S: Schema>(exec: &mut impl SqlExecutor) -> OrmResult<Option<i32>> {
    ensure_history(exec)?;
    let current = exec.scalar_i64(CURRENT_VERSION_SQL, &[])? as i32;
    let old = stored_snapshot(exec, current)?;

    let version = current + 1;
    let new = Snapshot::from_entities(&S::entities(), version, Utc::now().naive_utc());
    let changes = compare(old.as_ref(), &new);
    if changes.is_empty() {
        tracing::info!("schema is up to date at version {current}");
        return Ok(None);
    }

    for change in &changes {
        match execute_statements(exec, &change.up_sql()) {
            Ok(()) => tracing::info!(change = %change.describe(), "applied"),
            Err(err) => {
                tracing::error!(change = %change.describe(), error = %err, "failed");
                return Err(err);
            }
        }
    }

    let name = migration_name(&changes);
    let up = aggregate_up(&changes);
    let down = aggregate_down(&changes);
    let snapshot_json = new.to_json()?;
    exec.execute(
        INSERT_HISTORY_SQL,
        &[&version, &name, &snapshot_json, &up, &down],
    )?;
    tracing::info!(version, name = %name, "migration recorded");
    Ok(Some(version))
}

/// [`MigrationEngine::rollback`] against a caller-supplied executor.
pub fn rollback_with(exec: &mut impl SqlExecutor) -> OrmResult<()> {
    let current = current_version_with(exec)?;
    if current == 0 {
        tracing::info!("nothing to roll back");
        return Ok(());
    }
    rollback_to_with(exec, current - 1)
}

/// [`MigrationEngine::rollback_to`] against a caller-supplied executor.
pub fn rollback_to_with(exec: &mut impl SqlExecutor, target_version: i32) -> OrmResult<()> {
    let current = current_version_with(exec)?;
    if target_version < 0 {
        return Err(OrmError::migration_conflict(format!(
            "target version {target_version} is negative"
        )));
    }
    if target_version >= current {
        return Err(OrmError::migration_conflict(format!(
            "target version {target_version} is not below current version {current}"
        )));
    }

    for version in (target_version + 1..=current).rev() {
        let down = exec
            .scalar_text(DOWN_BY_VERSION_SQL, &[&version])?
            .ok_or_else(|| {
                OrmError::migration_conflict(format!(
                    "history row for version {version} is missing"
                ))
            })?;
        execute_statements(exec, &down)?;
        exec.execute(DELETE_VERSION_SQL, &[&version])?;
        tracing::info!(version, "rolled back");
    }
    Ok(())
}

/// [`MigrationEngine::reset`] against a caller-supplied executor.
pub fn reset_with<S: Schema>(exec: &mut impl SqlExecutor) -> OrmResult<Option<i32>> {
    ensure_history(exec)?;
    for descriptor in S::entities().iter().rev() {
        exec.execute(&qb::drop_table(descriptor), &[])?;
        tracing::info!(table = %descriptor.table_name, "dropped");
    }
    exec.execute(CLEAR_HISTORY_SQL, &[])?;
    migrate_all_with::<S>(exec)
}

/// [`MigrationEngine::history`] against a caller-supplied executor.
pub fn history_with(exec: &mut impl SqlExecutor) -> OrmResult<Vec<MigrationRecord>> {
    ensure_history(exec)?;
    let rows = exec.query(SELECT_HISTORY_SQL, &[])?;
    rows.iter()
        .map(|row| {
            Ok(MigrationRecord {
                id: row.try_get(0).map_err(|e| OrmError::decode("Id", e.to_string()))?,
                version: row
                    .try_get(1)
                    .map_err(|e| OrmError::decode("Version", e.to_string()))?,
                name: row
                    .try_get(2)
                    .map_err(|e| OrmError::decode("Name", e.to_string()))?,
                applied_at: row
                    .try_get(3)
                    .map_err(|e| OrmError::decode("AppliedAt", e.to_string()))?,
                snapshot_json: row
                    .try_get(4)
                    .map_err(|e| OrmError::decode("SnapshotJson", e.to_string()))?,
                sql_up: row
                    .try_get(5)
                    .map_err(|e| OrmError::decode("SqlUp", e.to_string()))?,
                sql_down: row
                    .try_get(6)
                    .map_err(|e| OrmError::decode("SqlDown", e.to_string()))?,
            })
        })
        .collect()
}

/// [`MigrationEngine::migration_plan`] against a caller-supplied executor.
pub fn migration_plan_with<S: Schema>(exec: &mut impl SqlExecutor) -> OrmResult<Vec<SchemaChange>> {
    ensure_history(exec)?;
    let current = exec.scalar_i64(CURRENT_VERSION_SQL, &[])? as i32;
    let old = stored_snapshot(exec, current)?;
    let new = Snapshot::from_entities(&S::entities(), current + 1, Utc::now().naive_utc());
    Ok(compare(old.as_ref(), &new))
}

fn aggregate_up(changes: &[SchemaChange]) -> String {
    changes
        .iter()
        .map(|c| c.up_sql())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Reverse SQL is aggregated in reverse change order so that replaying it
/// top to bottom undoes the migration.
fn aggregate_down(changes: &[SchemaChange]) -> String {
    changes
        .iter()
        .rev()
        .map(|c| c.down_sql())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Derive a migration name from its changes.
fn migration_name(changes: &[SchemaChange]) -> String {
    if !changes.is_empty()
        && changes
            .iter()
            .all(|c| matches!(c, SchemaChange::CreateTable(_)))
    {
        return "InitialCreate".to_string();
    }

    match changes.first() {
        Some(SchemaChange::CreateTable(table)) => format!("Create{}", table.table_name),
        Some(SchemaChange::AddColumn { table, column }) => {
            format!("Add{}To{}", column.name, table)
        }
        Some(SchemaChange::DropColumn { table, column }) => {
            format!("Remove{}From{}", column.name, table)
        }
        Some(SchemaChange::AlterColumn { table, new, .. }) => {
            format!("Alter{}In{}", new.name, table)
        }
        Some(SchemaChange::DropTable(table)) => format!("Drop{}", table.table_name),
        None => format!("Migration_{}", Utc::now().format("%Y%m%d%H%M%S")),
    }
}
