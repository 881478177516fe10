//! Minimal SQL executor seam for unified database access
//!
//! [`SqlExecutor`] unifies `postgres::Client` and `postgres::Transaction` so
//! that every read, flush and migration step can run against either a direct
//! connection or an open transaction. Tests substitute a scripted executor.

use postgres::types::ToSql;
use postgres::Row;

use crate::error::{OrmError, OrmResult};

/// Parameterized execute / query / scalar over one connection or transaction.
///
/// SQL handed to an executor is already in the driver's native `$1, $2, …`
/// placeholder form (see [`crate::qb::to_native_sql`]).
pub trait SqlExecutor {
    /// Execute a statement and return the number of affected rows
    fn execute(&mut self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<u64>;

    /// Execute a query and return all rows
    fn query(&mut self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<Vec<Row>>;

    /// Execute a query and return at most one row
    fn query_opt(&mut self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<Option<Row>> {
        let rows = self.query(sql, params)?;
        Ok(rows.into_iter().next())
    }

    /// Execute a query and return the first column of the first row as i64.
    ///
    /// The SQL is expected to cast to `bigint` (`COUNT(*)` already is one).
    fn scalar_i64(&mut self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<i64>;

    /// Execute a query and return the first column of the first row as text,
    /// or `None` when no row matched.
    fn scalar_text(&mut self, sql: &str, params: &[&(dyn ToSql + Sync)])
        -> OrmResult<Option<String>>;
}

impl SqlExecutor for postgres::Client {
    fn execute(&mut self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<u64> {
        postgres::Client::execute(self, sql, params).map_err(OrmError::from_db_error)
    }

    fn query(&mut self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<Vec<Row>> {
        postgres::Client::query(self, sql, params).map_err(OrmError::from_db_error)
    }

    fn scalar_i64(&mut self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<i64> {
        let row = postgres::Client::query_one(self, sql, params).map_err(OrmError::from_db_error)?;
        row.try_get(0)
            .map_err(|e| OrmError::decode("0", e.to_string()))
    }

    fn scalar_text(
        &mut self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> OrmResult<Option<String>> {
        let row = postgres::Client::query_opt(self, sql, params).map_err(OrmError::from_db_error)?;
        match row {
            Some(row) => {
                let text = row
                    .try_get(0)
                    .map_err(|e| OrmError::decode("0", e.to_string()))?;
                Ok(Some(text))
            }
            None => Ok(None),
        }
    }
}

impl SqlExecutor for postgres::Transaction<'_> {
    fn execute(&mut self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<u64> {
        postgres::Transaction::execute(self, sql, params).map_err(OrmError::from_db_error)
    }

    fn query(&mut self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<Vec<Row>> {
        postgres::Transaction::query(self, sql, params).map_err(OrmError::from_db_error)
    }

    fn scalar_i64(&mut self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<i64> {
        let row =
            postgres::Transaction::query_one(self, sql, params).map_err(OrmError::from_db_error)?;
        row.try_get(0)
            .map_err(|e| OrmError::decode("0", e.to_string()))
    }

    fn scalar_text(
        &mut self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> OrmResult<Option<String>> {
        let row =
            postgres::Transaction::query_opt(self, sql, params).map_err(OrmError::from_db_error)?;
        match row {
            Some(row) => {
                let text = row
                    .try_get(0)
                    .map_err(|e| OrmError::decode("0", e.to_string()))?;
                Ok(Some(text))
            }
            None => Ok(None),
        }
    }
}
