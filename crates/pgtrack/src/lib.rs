//! # pgtrack
//!
//! A lightweight Postgres-only ORM with unit-of-work change tracking and
//! snapshot-diff migrations.
//!
//! ## Features
//!
//! - **Declarative entities**: `#[derive(Entity)]` over plain data structs
//!   yields a static metadata table; no runtime reflection
//! - **Unit of work**: stage adds, updates and removes on [`EntitySet`]s,
//!   flush them atomically with [`Session::save_changes`]
//! - **Parameter-safe SQL**: every statement is built from metadata with
//!   bound parameters; identifiers are validated and quoted
//! - **Schema migrations**: the [`MigrationEngine`] diffs the declared schema
//!   against a stored snapshot, applies forward DDL and keeps a reverse
//!   script per version for rollback
//! - **Eager loading**: `.include(Patient::MEDICAL_HISTORIES)` populates
//!   relations with one explicit query per root and navigation
//!
//! ## Example
//!
//! ```ignore
//! use pgtrack::{Entity, Session};
//!
//! #[derive(Debug, Default, Entity)]
//! struct Patient {
//!     #[orm(id, auto)]
//!     id: i32,
//!     first_name: String,
//!     last_name: String,
//!     #[orm(unique, length = 11)]
//!     oib: String,
//! }
//!
//! let db = Session::connect("host=localhost user=postgres dbname=clinic");
//! let patients = db.set::<Patient>();
//!
//! let ana = patients.add(Patient {
//!     first_name: "Ana".into(),
//!     last_name: "Kovač".into(),
//!     oib: "12345678901".into(),
//!     ..Default::default()
//! });
//! db.save_changes()?;
//! assert!(ana.borrow().id > 0);
//! # Ok::<(), pgtrack::OrmError>(())
//! ```

mod client;
mod diff;
mod error;
mod ident;
mod include;
mod metadata;
mod migrate;
pub mod qb;
pub mod row;
mod session;
mod set;
mod snapshot;
mod tracker;
pub mod types;

pub use client::SqlExecutor;
pub use diff::{compare, SchemaChange};
pub use error::{OrmError, OrmResult};
pub use ident::Ident;
pub use include::{IncludeQuery, Navigation};
pub use metadata::{
    ColumnDescriptor, DefaultValue, Entity, EntityDescriptor, ForeignKey, Schema,
};
pub use migrate::{
    current_version_with, history_with, migrate_all_with, migration_plan_with, reset_with,
    rollback_to_with, rollback_with, MigrationEngine, MigrationRecord, HISTORY_TABLE,
};
pub use qb::{SqlParam, Statement};
pub use row::{FieldDefault, FromRow, RowExt};
pub use session::{table_exists_with, Session};
pub use set::{EntitySet, IntoTracked, Tracked};
pub use snapshot::{ColumnSnapshot, Snapshot, TableSnapshot};
pub use tracker::{ChangeTracker, EntityKey, EntityState};
pub use types::{ColumnType, Ordinal, SqlType};

#[cfg(feature = "derive")]
pub use pgtrack_derive::{Entity, OrdinalEnum};

// Re-export the driver for use by derive-generated code.
#[doc(hidden)]
pub use postgres;
