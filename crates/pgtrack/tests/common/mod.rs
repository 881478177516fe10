//! Scripted executor shared by the integration tests.
//!
//! Records every statement it sees; query results are scripted at the scalar
//! level (the library routes version and snapshot loads through scalars, so
//! migration flows are fully drivable without a database).

use std::collections::VecDeque;

use pgtrack::postgres::types::ToSql;
use pgtrack::postgres::Row;
use pgtrack::{OrmError, OrmResult, SqlExecutor};

#[derive(Default)]
pub struct MockExecutor {
    /// Statements passed to `execute`, with parameter counts.
    pub executed: Vec<(String, usize)>,
    /// Statements passed to `query`/`query_opt`, with parameter counts.
    pub queried: Vec<(String, usize)>,
    /// Scripted `scalar_i64` results, consumed front to back.
    pub scalar_i64_results: VecDeque<i64>,
    /// Scripted `scalar_text` results, consumed front to back.
    pub scalar_text_results: VecDeque<Option<String>>,
    /// Fail the Nth `execute` call (0-based) with a unique violation.
    pub fail_execute_at: Option<usize>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every statement seen, in order.
    pub fn all_statements(&self) -> Vec<&str> {
        self.executed.iter().map(|(sql, _)| sql.as_str()).collect()
    }
}

impl SqlExecutor for MockExecutor {
    fn execute(&mut self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<u64> {
        let call = self.executed.len();
        self.executed.push((sql.to_string(), params.len()));
        if self.fail_execute_at == Some(call) {
            return Err(OrmError::UniqueViolation("scripted failure".into()));
        }
        Ok(1)
    }

    fn query(&mut self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<Vec<Row>> {
        self.queried.push((sql.to_string(), params.len()));
        Ok(Vec::new())
    }

    fn scalar_i64(&mut self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<i64> {
        self.queried.push((sql.to_string(), params.len()));
        self.scalar_i64_results
            .pop_front()
            .ok_or_else(|| OrmError::Other("no scripted scalar_i64 result".into()))
    }

    fn scalar_text(
        &mut self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> OrmResult<Option<String>> {
        self.queried.push((sql.to_string(), params.len()));
        self.scalar_text_results
            .pop_front()
            .ok_or_else(|| OrmError::Other("no scripted scalar_text result".into()))
    }
}
