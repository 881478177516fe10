//! Session (unit-of-work scope).
//!
//! A [`Session`] owns the change tracker and hands out [`EntitySet`] facades.
//! Staging is in-memory; reads execute immediately; [`save_changes`]
//! translates the tracked intents into statements and executes them inside a
//! single transaction.
//!
//! Every operation opens its own connection and releases it on all exit
//! paths. A session is single-writer: it is not meant to be shared across
//! threads, and the entity handles it returns are `Rc`-based.

use std::cell::RefCell;
use std::rc::Rc;

use postgres::types::ToSql;
use postgres::Row;

use crate::client::SqlExecutor;
use crate::error::{OrmError, OrmResult};
use crate::metadata::Entity;
use crate::qb::{self, SqlParam};
use crate::set::EntitySet;
use crate::tracker::{ChangeTracker, EntityState};

pub(crate) struct SessionCore {
    conn_str: String,
    pub(crate) tracker: RefCell<ChangeTracker>,
}

impl SessionCore {
    /// Open a fresh connection; the client closes when dropped.
    pub(crate) fn open(&self) -> OrmResult<postgres::Client> {
        postgres::Client::connect(&self.conn_str, postgres::NoTls)
            .map_err(|e| OrmError::Connection(e.to_string()))
    }
}

/// One unit-of-work scope over a PostgreSQL database.
pub struct Session {
    core: Rc<SessionCore>,
}

impl Session {
    /// Create a session for the given connection string.
    ///
    /// No connection is opened until the first operation needs one.
    pub fn connect(conn_str: impl Into<String>) -> Self {
        Self {
            core: Rc::new(SessionCore {
                conn_str: conn_str.into(),
                tracker: RefCell::new(ChangeTracker::new()),
            }),
        }
    }

    /// The [`EntitySet`] facade for one mapped entity.
    ///
    /// Sets are cheap handles onto this session; a typical application
    /// context struct holds one per entity.
    pub fn set<T: Entity>(&self) -> EntitySet<T> {
        EntitySet::new(Rc::clone(&self.core))
    }

    /// True iff any tracked entity is Added, Modified or Deleted.
    pub fn has_changes(&self) -> bool {
        self.core.tracker.borrow().has_changes()
    }

    /// Flush all tracked changes inside a single transaction.
    ///
    /// Entries execute in state order Added → Modified → Deleted; within a
    /// state, staging order. Auto-increment keys are read back from
    /// `RETURNING` and assigned onto the staged entities. On success the
    /// tracker accepts all changes; on any failure the transaction rolls
    /// back, the error propagates, and the tracker is left untouched so the
    /// caller may fix the cause and retry.
    ///
    /// Returns the total affected-row count.
    pub fn save_changes(&self) -> OrmResult<u64> {
        if !self.has_changes() {
            return Ok(0);
        }

        let mut client = self.core.open()?;
        let mut tx = client.transaction().map_err(OrmError::from_db_error)?;
        let result = flush(&self.core.tracker.borrow(), &mut tx);
        match result {
            Ok(affected) => {
                tx.commit().map_err(OrmError::from_db_error)?;
                self.core.tracker.borrow_mut().accept_all_changes();
                Ok(affected)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    return Err(OrmError::Other(format!(
                        "{err} (rollback failed: {rollback_err})"
                    )));
                }
                Err(err)
            }
        }
    }

    /// [`save_changes`](Self::save_changes) against a caller-supplied
    /// executor (an open transaction, typically). The caller owns commit and
    /// rollback; the tracker accepts changes only when every statement
    /// succeeded.
    pub fn save_changes_with(&self, exec: &mut impl SqlExecutor) -> OrmResult<u64> {
        let affected = flush(&self.core.tracker.borrow(), exec)?;
        self.core.tracker.borrow_mut().accept_all_changes();
        Ok(affected)
    }

    /// Execute raw SQL with `@pN` placeholders; returns the affected-row count.
    pub fn execute_sql(&self, sql: &str, params: Vec<SqlParam>) -> OrmResult<u64> {
        let native = qb::to_native_sql(sql, params.len())?;
        let refs: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p.as_ref() as &(dyn ToSql + Sync)).collect();
        let mut client = self.core.open()?;
        tracing::debug!(sql = %native, "execute_sql");
        SqlExecutor::execute(&mut client, &native, &refs)
    }

    /// Query raw SQL with `@pN` placeholders; returns the raw rows.
    pub fn query_sql(&self, sql: &str, params: Vec<SqlParam>) -> OrmResult<Vec<Row>> {
        let native = qb::to_native_sql(sql, params.len())?;
        let refs: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p.as_ref() as &(dyn ToSql + Sync)).collect();
        let mut client = self.core.open()?;
        tracing::debug!(sql = %native, "query_sql");
        SqlExecutor::query(&mut client, &native, &refs)
    }

    /// True when a table with the given name exists (information_schema).
    pub fn table_exists(&self, name: &str) -> OrmResult<bool> {
        let mut client = self.core.open()?;
        table_exists_with(&mut client, name)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.core.tracker.borrow_mut().clear();
    }
}

/// [`Session::table_exists`] against a caller-supplied executor.
pub fn table_exists_with(exec: &mut impl SqlExecutor, name: &str) -> OrmResult<bool> {
    let sql = qb::to_native_sql(
        "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = @p0;",
        1,
    )?;
    Ok(exec.scalar_i64(&sql, &[&name])? > 0)
}

/// Execute every tracked intent against `exec`, in state order
/// Added → Modified → Deleted; staging order within a state.
pub(crate) fn flush(tracker: &ChangeTracker, exec: &mut impl SqlExecutor) -> OrmResult<u64> {
    let mut affected = 0u64;

    for entry in tracker.entries().iter().filter(|e| e.state == EntityState::Added) {
        let stmt = entry.pending.build_insert()?;
        let native = stmt.native_sql()?;
        tracing::debug!(table = entry.pending.table(), sql = %native, "insert");
        if entry.pending.has_generated_pk() {
            let rows = exec.query(&native, &stmt.params_ref())?;
            let row = rows.first().ok_or_else(|| {
                OrmError::Other(format!(
                    "INSERT into {} returned no generated key",
                    entry.pending.table()
                ))
            })?;
            entry.pending.assign_generated_pk(row)?;
            affected += 1;
        } else {
            affected += exec.execute(&native, &stmt.params_ref())?;
        }
    }

    for entry in tracker.entries().iter().filter(|e| e.state == EntityState::Modified) {
        let stmt = entry.pending.build_update()?;
        let native = stmt.native_sql()?;
        tracing::debug!(table = entry.pending.table(), sql = %native, "update");
        affected += exec.execute(&native, &stmt.params_ref())?;
    }

    for entry in tracker.entries().iter().filter(|e| e.state == EntityState::Deleted) {
        let stmt = entry.pending.build_delete();
        let native = stmt.native_sql()?;
        tracing::debug!(table = entry.pending.table(), sql = %native, "delete");
        affected += exec.execute(&native, &stmt.params_ref())?;
    }

    Ok(affected)
}
