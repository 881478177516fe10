//! Unit-of-work change tracking.
//!
//! The tracker records *intent*: each staged entity owns one [`EntityEntry`]
//! holding its state and a type-erased [`PendingEntity`] that can build the
//! statement for that intent at flush time. Entries are keyed by an opaque
//! [`EntityKey`] assigned on first staging; the staging facades map shared
//! entity handles onto keys, so one handle is one identity.

use postgres::Row;

use crate::error::OrmResult;
use crate::qb::Statement;

/// Tracked entity state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    Unchanged,
    Added,
    Modified,
    Deleted,
}

/// Opaque tracking handle, assigned when an entity is first staged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityKey(u64);

/// Staging event applied to the tracker.
#[derive(Debug, Clone, Copy)]
pub(crate) enum TrackEvent {
    Add,
    Modify,
    Delete,
    Unchanged,
}

/// Type-erased view of a staged entity: builds its own INSERT / UPDATE /
/// DELETE and writes a generated key back through its shared handle.
pub(crate) trait PendingEntity {
    fn table(&self) -> &str;
    fn build_insert(&self) -> OrmResult<Statement>;
    fn build_update(&self) -> OrmResult<Statement>;
    fn build_delete(&self) -> Statement;
    fn has_generated_pk(&self) -> bool;
    fn assign_generated_pk(&self, row: &Row) -> OrmResult<()>;
}

pub(crate) struct EntityEntry {
    pub key: EntityKey,
    /// Pointer identity of the shared entity handle.
    pub identity: usize,
    pub state: EntityState,
    pub pending: Box<dyn PendingEntity>,
}

/// Per-session change tracker.
///
/// Holds at most one entry per entity identity; insertion order is preserved
/// and is the flush order within each state phase.
#[derive(Default)]
pub struct ChangeTracker {
    entries: Vec<EntityEntry>,
    next_key: u64,
}

/// State transition for an already-tracked entry.
///
/// `None` means the entry leaves the tracker: an Added entity that is deleted
/// before a flush never existed as far as the database is concerned.
/// An Added entry otherwise stays Added — it has no database row to update.
fn transition(current: EntityState, event: TrackEvent) -> Option<EntityState> {
    use EntityState::*;
    match (current, event) {
        (Added, TrackEvent::Delete) => None,
        (Added, _) => Some(Added),
        (_, TrackEvent::Add) => Some(Added),
        (Unchanged, TrackEvent::Modify) => Some(Modified),
        (Unchanged, TrackEvent::Delete) => Some(Deleted),
        (Unchanged, TrackEvent::Unchanged) => Some(Unchanged),
        (Modified, TrackEvent::Delete) => Some(Deleted),
        (Modified, _) => Some(Modified),
        (Deleted, _) => Some(Deleted),
    }
}

fn initial_state(event: TrackEvent) -> EntityState {
    match event {
        TrackEvent::Add => EntityState::Added,
        TrackEvent::Modify => EntityState::Modified,
        TrackEvent::Delete => EntityState::Deleted,
        TrackEvent::Unchanged => EntityState::Unchanged,
    }
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a staging event for the given identity.
    ///
    /// Returns the entry's key, or `None` when the event removed the entry
    /// (Added then Deleted collapses to absence).
    pub(crate) fn apply(
        &mut self,
        identity: usize,
        event: TrackEvent,
        pending: impl FnOnce() -> Box<dyn PendingEntity>,
    ) -> Option<EntityKey> {
        if let Some(pos) = self.entries.iter().position(|e| e.identity == identity) {
            return match transition(self.entries[pos].state, event) {
                Some(state) => {
                    self.entries[pos].state = state;
                    Some(self.entries[pos].key)
                }
                None => {
                    self.entries.remove(pos);
                    None
                }
            };
        }

        let key = EntityKey(self.next_key);
        self.next_key += 1;
        self.entries.push(EntityEntry {
            key,
            identity,
            state: initial_state(event),
            pending: pending(),
        });
        Some(key)
    }

    /// True iff any entry is Added, Modified or Deleted.
    pub fn has_changes(&self) -> bool {
        self.entries
            .iter()
            .any(|e| e.state != EntityState::Unchanged)
    }

    /// Drop Deleted entries and reset the remainder to Unchanged.
    pub fn accept_all_changes(&mut self) {
        self.entries.retain(|e| e.state != EntityState::Deleted);
        for entry in &mut self.entries {
            entry.state = EntityState::Unchanged;
        }
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of tracked entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn entries(&self) -> &[EntityEntry] {
        &self.entries
    }

    pub(crate) fn state_by_identity(&self, identity: usize) -> Option<EntityState> {
        self.entries
            .iter()
            .find(|e| e.identity == identity)
            .map(|e| e.state)
    }
}
