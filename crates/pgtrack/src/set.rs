//! Collection façade over one table.
//!
//! Staging methods (`add`, `update`, `remove`, …) record intent with the
//! session's change tracker and perform no I/O. Read methods execute
//! immediately, each on its own connection; materialized entities are *not*
//! registered with the tracker (no identity map).

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

use postgres::types::ToSql;
use postgres::Row;

use crate::client::SqlExecutor;
use crate::error::OrmResult;
use crate::include::{IncludeQuery, Navigation};
use crate::metadata::Entity;
use crate::qb::{self, SqlParam, Statement};
use crate::session::SessionCore;
use crate::tracker::{EntityState, PendingEntity, TrackEvent};

/// A shared, mutable entity handle.
///
/// Staged entities are held behind `Rc<RefCell<_>>` so the tracker and the
/// caller observe the same value — in particular, a generated primary key
/// assigned during [`save_changes`](crate::Session::save_changes) is visible
/// through the handle the caller kept. The session is single-writer, so the
/// non-atomic sharing is sound.
pub type Tracked<T> = Rc<RefCell<T>>;

/// Conversion into a [`Tracked`] handle.
///
/// Plain values are wrapped (becoming a fresh identity); existing handles
/// pass through so re-staging the same handle hits the same tracker entry.
pub trait IntoTracked<T> {
    fn into_tracked(self) -> Tracked<T>;
}

impl<T: Entity> IntoTracked<T> for T {
    fn into_tracked(self) -> Tracked<T> {
        Rc::new(RefCell::new(self))
    }
}

impl<T: Entity> IntoTracked<T> for Tracked<T> {
    fn into_tracked(self) -> Tracked<T> {
        self
    }
}

impl<T: Entity> IntoTracked<T> for &Tracked<T> {
    fn into_tracked(self) -> Tracked<T> {
        Rc::clone(self)
    }
}

/// Tracker-side view of one staged entity.
pub(crate) struct TrackedEntity<T: Entity> {
    cell: Tracked<T>,
}

impl<T: Entity> PendingEntity for TrackedEntity<T> {
    fn table(&self) -> &str {
        &T::descriptor().table_name
    }

    fn build_insert(&self) -> OrmResult<Statement> {
        qb::insert(T::descriptor(), self.cell.borrow().column_values())
    }

    fn build_update(&self) -> OrmResult<Statement> {
        let entity = self.cell.borrow();
        qb::update(T::descriptor(), entity.column_values(), entity.pk_value())
    }

    fn build_delete(&self) -> Statement {
        Statement::new(qb::delete(T::descriptor()), vec![self.cell.borrow().pk_value()])
    }

    fn has_generated_pk(&self) -> bool {
        T::descriptor().primary_key().auto_increment
    }

    fn assign_generated_pk(&self, row: &Row) -> OrmResult<()> {
        self.cell.borrow_mut().set_generated_pk(row)
    }
}

/// Collection façade over one mapped entity's table.
pub struct EntitySet<T: Entity> {
    core: Rc<SessionCore>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for EntitySet<T> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
            _marker: PhantomData,
        }
    }
}

impl<T: Entity> EntitySet<T> {
    pub(crate) fn new(core: Rc<SessionCore>) -> Self {
        Self {
            core,
            _marker: PhantomData,
        }
    }

    fn stage(&self, entity: impl IntoTracked<T>, event: TrackEvent) -> Tracked<T> {
        let cell = entity.into_tracked();
        let identity = Rc::as_ptr(&cell) as usize;
        let pending = Rc::clone(&cell);
        self.core
            .tracker
            .borrow_mut()
            .apply(identity, event, move || {
                Box::new(TrackedEntity { cell: pending })
            });
        cell
    }

    // ── Staging (no I/O) ────────────────────────────────────────────────────

    /// Stage an entity for INSERT at the next save.
    pub fn add(&self, entity: impl IntoTracked<T>) -> Tracked<T> {
        self.stage(entity, TrackEvent::Add)
    }

    /// Stage several entities for INSERT.
    pub fn add_range(&self, entities: impl IntoIterator<Item = T>) -> Vec<Tracked<T>> {
        entities.into_iter().map(|e| self.add(e)).collect()
    }

    /// Stage an entity for UPDATE at the next save.
    pub fn update(&self, entity: impl IntoTracked<T>) -> Tracked<T> {
        self.stage(entity, TrackEvent::Modify)
    }

    /// Stage an entity for DELETE at the next save.
    ///
    /// Removing a handle that was added in this session and never saved
    /// collapses to absence — no statement is issued for it.
    pub fn remove(&self, entity: impl IntoTracked<T>) -> Tracked<T> {
        self.stage(entity, TrackEvent::Delete)
    }

    /// Stage several entities for DELETE.
    pub fn remove_range(&self, entities: impl IntoIterator<Item = Tracked<T>>) {
        for entity in entities {
            self.remove(entity);
        }
    }

    /// Track an existing row as Unchanged.
    pub fn attach(&self, entity: impl IntoTracked<T>) -> Tracked<T> {
        self.stage(entity, TrackEvent::Unchanged)
    }

    /// The tracked state of a handle, if it is tracked.
    pub fn state_of(&self, entity: &Tracked<T>) -> Option<EntityState> {
        self.core
            .tracker
            .borrow()
            .state_by_identity(Rc::as_ptr(entity) as usize)
    }

    // ── Reads (execute immediately) ─────────────────────────────────────────

    /// SELECT every row.
    pub fn to_list(&self) -> OrmResult<Vec<T>> {
        self.to_list_with(&mut self.core.open()?)
    }

    pub fn to_list_with(&self, exec: &mut impl SqlExecutor) -> OrmResult<Vec<T>> {
        let sql = qb::to_native_sql(&qb::select_all(T::descriptor()), 0)?;
        tracing::debug!(sql = %sql, "select");
        let rows = exec.query(&sql, &[])?;
        rows.iter().map(T::from_row).collect()
    }

    /// SELECT by primary key; `None` when the row does not exist.
    pub fn find(&self, id: impl ToSql + Sync) -> OrmResult<Option<T>> {
        self.find_with(&mut self.core.open()?, id)
    }

    pub fn find_with(
        &self,
        exec: &mut impl SqlExecutor,
        id: impl ToSql + Sync,
    ) -> OrmResult<Option<T>> {
        let sql = qb::to_native_sql(&qb::select_by_id(T::descriptor()), 1)?;
        tracing::debug!(sql = %sql, "select");
        let row = exec.query_opt(&sql, &[&id])?;
        row.as_ref().map(T::from_row).transpose()
    }

    /// SELECT with a raw WHERE fragment using `@pN` placeholders bound from
    /// `params` (fragment numbering starts at `@p0`).
    pub fn filter(&self, fragment: &str, params: Vec<SqlParam>) -> OrmResult<Vec<T>> {
        self.filter_with(&mut self.core.open()?, fragment, params)
    }

    pub fn filter_with(
        &self,
        exec: &mut impl SqlExecutor,
        fragment: &str,
        params: Vec<SqlParam>,
    ) -> OrmResult<Vec<T>> {
        self.select_fragment(exec, Some(fragment), params, None)
    }

    /// [`filter`](Self::filter) with `ORDER BY "column" ASC|DESC`.
    pub fn filter_ordered(
        &self,
        fragment: &str,
        params: Vec<SqlParam>,
        order_by: &str,
        ascending: bool,
    ) -> OrmResult<Vec<T>> {
        self.select_fragment(
            &mut self.core.open()?,
            Some(fragment),
            params,
            Some((order_by, ascending)),
        )
    }

    pub fn filter_ordered_with(
        &self,
        exec: &mut impl SqlExecutor,
        fragment: &str,
        params: Vec<SqlParam>,
        order_by: &str,
        ascending: bool,
    ) -> OrmResult<Vec<T>> {
        self.select_fragment(exec, Some(fragment), params, Some((order_by, ascending)))
    }

    /// First row matching the fragment, or `None`.
    pub fn first_or_default(&self, fragment: &str, params: Vec<SqlParam>) -> OrmResult<Option<T>> {
        Ok(self.filter(fragment, params)?.into_iter().next())
    }

    pub fn first_or_default_with(
        &self,
        exec: &mut impl SqlExecutor,
        fragment: &str,
        params: Vec<SqlParam>,
    ) -> OrmResult<Option<T>> {
        Ok(self.filter_with(exec, fragment, params)?.into_iter().next())
    }

    /// `SELECT COUNT(*)`, optionally filtered.
    pub fn count(&self, fragment: Option<&str>, params: Vec<SqlParam>) -> OrmResult<i64> {
        self.count_with(&mut self.core.open()?, fragment, params)
    }

    pub fn count_with(
        &self,
        exec: &mut impl SqlExecutor,
        fragment: Option<&str>,
        params: Vec<SqlParam>,
    ) -> OrmResult<i64> {
        let sql = qb::to_native_sql(&qb::count(T::descriptor(), fragment), params.len())?;
        let refs: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p.as_ref() as &(dyn ToSql + Sync)).collect();
        tracing::debug!(sql = %sql, "count");
        exec.scalar_i64(&sql, &refs)
    }

    /// True when at least one row matches.
    pub fn any(&self, fragment: Option<&str>, params: Vec<SqlParam>) -> OrmResult<bool> {
        Ok(self.count(fragment, params)? > 0)
    }

    pub fn any_with(
        &self,
        exec: &mut impl SqlExecutor,
        fragment: Option<&str>,
        params: Vec<SqlParam>,
    ) -> OrmResult<bool> {
        Ok(self.count_with(exec, fragment, params)? > 0)
    }

    /// Begin an eager-loading query for a navigation.
    pub fn include(&self, navigation: Navigation<T>) -> IncludeQuery<T> {
        IncludeQuery::new(self.clone(), navigation)
    }

    pub(crate) fn open(&self) -> OrmResult<postgres::Client> {
        self.core.open()
    }

    fn select_fragment(
        &self,
        exec: &mut impl SqlExecutor,
        fragment: Option<&str>,
        params: Vec<SqlParam>,
        order_by: Option<(&str, bool)>,
    ) -> OrmResult<Vec<T>> {
        let sql = qb::to_native_sql(
            &qb::select_where(T::descriptor(), fragment, order_by),
            params.len(),
        )?;
        let refs: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p.as_ref() as &(dyn ToSql + Sync)).collect();
        tracing::debug!(sql = %sql, "select");
        let rows = exec.query(&sql, &refs)?;
        rows.iter().map(T::from_row).collect()
    }
}
