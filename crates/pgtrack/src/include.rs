//! Eager loading of related entities.
//!
//! A [`Navigation`] names one relation and knows how to populate it on a
//! materialized root; `#[derive(Entity)]` generates one per navigation field
//! as an associated constant (`Patient::MEDICAL_HISTORIES`). Accumulate them
//! with [`include`](crate::EntitySet::include) and the terminal operation
//! loads roots first, then runs one query per (root, navigation) —
//! deliberately naive, no JOINs or batching.

use postgres::types::ToSql;

use crate::client::SqlExecutor;
use crate::error::OrmResult;
use crate::metadata::Entity;
use crate::qb::SqlParam;
use crate::set::EntitySet;

/// One loadable relation on an entity type.
pub struct Navigation<T> {
    name: &'static str,
    load: fn(&mut T, &mut dyn SqlExecutor) -> OrmResult<()>,
}

impl<T> Navigation<T> {
    /// Used by the `Entity` derive.
    pub const fn new(
        name: &'static str,
        load: fn(&mut T, &mut dyn SqlExecutor) -> OrmResult<()>,
    ) -> Self {
        Self { name, load }
    }

    /// The navigation field's name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Populate this relation on one materialized root.
    ///
    /// Collection navigations select related rows by the `<OwnerType>Id`
    /// foreign-key convention; single navigations follow the local
    /// `<navName>Id` field. A missing counterpart or a NULL key loads
    /// nothing.
    pub fn load(&self, root: &mut T, exec: &mut dyn SqlExecutor) -> OrmResult<()> {
        (self.load)(root, exec)
    }
}

impl<T> Clone for Navigation<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Navigation<T> {}

/// A root query carrying an ordered list of navigations to populate.
pub struct IncludeQuery<T: Entity> {
    set: EntitySet<T>,
    navigations: Vec<Navigation<T>>,
}

impl<T: Entity> IncludeQuery<T> {
    pub(crate) fn new(set: EntitySet<T>, navigation: Navigation<T>) -> Self {
        Self {
            set,
            navigations: vec![navigation],
        }
    }

    /// Add another navigation to populate.
    pub fn include(mut self, navigation: Navigation<T>) -> Self {
        self.navigations.push(navigation);
        self
    }

    fn load_navigations(
        &self,
        roots: &mut [T],
        exec: &mut dyn SqlExecutor,
    ) -> OrmResult<()> {
        for root in roots.iter_mut() {
            for navigation in &self.navigations {
                tracing::debug!(navigation = navigation.name(), "eager load");
                navigation.load(root, exec)?;
            }
        }
        Ok(())
    }

    /// Root by primary key with navigations populated.
    pub fn find(&self, id: impl ToSql + Sync) -> OrmResult<Option<T>> {
        self.find_with(&mut self.set.open()?, id)
    }

    pub fn find_with(
        &self,
        exec: &mut impl SqlExecutor,
        id: impl ToSql + Sync,
    ) -> OrmResult<Option<T>> {
        let Some(root) = self.set.find_with(exec, id)? else {
            return Ok(None);
        };
        let mut roots = [root];
        self.load_navigations(&mut roots, exec)?;
        let [root] = roots;
        Ok(Some(root))
    }

    /// All roots with navigations populated.
    pub fn to_list(&self) -> OrmResult<Vec<T>> {
        self.to_list_with(&mut self.set.open()?)
    }

    pub fn to_list_with(&self, exec: &mut impl SqlExecutor) -> OrmResult<Vec<T>> {
        let mut roots = self.set.to_list_with(exec)?;
        self.load_navigations(&mut roots, exec)?;
        Ok(roots)
    }

    /// Filtered roots with navigations populated.
    pub fn filter(&self, fragment: &str, params: Vec<SqlParam>) -> OrmResult<Vec<T>> {
        self.filter_with(&mut self.set.open()?, fragment, params)
    }

    pub fn filter_with(
        &self,
        exec: &mut impl SqlExecutor,
        fragment: &str,
        params: Vec<SqlParam>,
    ) -> OrmResult<Vec<T>> {
        let mut roots = self.set.filter_with(exec, fragment, params)?;
        self.load_navigations(&mut roots, exec)?;
        Ok(roots)
    }

    /// First filtered root with navigations populated, or `None`.
    pub fn first_or_default(&self, fragment: &str, params: Vec<SqlParam>) -> OrmResult<Option<T>> {
        self.first_or_default_with(&mut self.set.open()?, fragment, params)
    }

    pub fn first_or_default_with(
        &self,
        exec: &mut impl SqlExecutor,
        fragment: &str,
        params: Vec<SqlParam>,
    ) -> OrmResult<Option<T>> {
        let Some(root) = self.set.first_or_default_with(exec, fragment, params)? else {
            return Ok(None);
        };
        let mut roots = [root];
        self.load_navigations(&mut roots, exec)?;
        let [root] = roots;
        Ok(Some(root))
    }
}
