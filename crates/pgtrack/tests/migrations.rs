//! Migration lifecycle at the statement level: initial create, column
//! addition, rollback, reset, plan and conflict handling — all driven
//! through a scripted executor.

mod common;

use common::MockExecutor;
use pgtrack::{
    current_version_with, migrate_all_with, migration_plan_with, reset_with, rollback_to_with,
    rollback_with, Entity, EntityDescriptor, OrmError, Schema, Snapshot,
};

#[derive(Debug, Default, Entity)]
#[orm(table = "Doctors")]
struct Doctor {
    #[orm(id, auto, column = "Id")]
    id: i32,
    #[orm(column = "FullName")]
    full_name: String,
}

#[derive(Debug, Default, Entity)]
#[orm(table = "Patients")]
struct PatientV1 {
    #[orm(id, auto, column = "Id")]
    id: i32,
    #[orm(column = "FirstName")]
    first_name: String,
    #[orm(column = "OIB", unique, length = 11)]
    oib: String,
}

#[derive(Debug, Default, Entity)]
#[orm(table = "Patients")]
struct PatientV2 {
    #[orm(id, auto, column = "Id")]
    id: i32,
    #[orm(column = "FirstName")]
    first_name: String,
    #[orm(column = "OIB", unique, length = 11)]
    oib: String,
    #[orm(column = "MiddleName", length = 50)]
    middle_name: Option<String>,
}

struct ClinicV1;

impl Schema for ClinicV1 {
    fn entities() -> Vec<&'static EntityDescriptor> {
        vec![Doctor::descriptor(), PatientV1::descriptor()]
    }
}

struct ClinicV2;

impl Schema for ClinicV2 {
    fn entities() -> Vec<&'static EntityDescriptor> {
        vec![Doctor::descriptor(), PatientV2::descriptor()]
    }
}

fn snapshot_json_of(entities: Vec<&'static EntityDescriptor>, version: i32) -> String {
    let created_at = chrono::DateTime::from_timestamp(1_714_000_000, 0)
        .unwrap()
        .naive_utc();
    Snapshot::from_entities(&entities, version, created_at)
        .to_json()
        .unwrap()
}

#[test]
fn initial_migration_creates_every_table_and_records_v1() {
    let mut exec = MockExecutor::new();
    exec.scalar_i64_results.push_back(0);

    let version = migrate_all_with::<ClinicV1>(&mut exec).unwrap();
    assert_eq!(version, Some(1));

    let statements = exec.all_statements();
    assert_eq!(statements.len(), 4);
    assert!(statements[0].starts_with(r#"CREATE TABLE IF NOT EXISTS "__MigrationHistory""#));
    assert_eq!(
        statements[1],
        r#"CREATE TABLE IF NOT EXISTS "Doctors" ("Id" SERIAL PRIMARY KEY, "FullName" TEXT NOT NULL);"#
    );
    assert_eq!(
        statements[2],
        r#"CREATE TABLE IF NOT EXISTS "Patients" ("Id" SERIAL PRIMARY KEY, "FirstName" TEXT NOT NULL, "OIB" VARCHAR(11) NOT NULL UNIQUE);"#
    );
    assert!(statements[3].starts_with(r#"INSERT INTO "__MigrationHistory""#));
    assert_eq!(exec.executed[3].1, 5);
}

#[test]
fn unchanged_schema_migrates_to_nothing() {
    let mut exec = MockExecutor::new();
    exec.scalar_i64_results.push_back(1);
    exec.scalar_text_results
        .push_back(Some(snapshot_json_of(ClinicV1::entities(), 1)));

    let version = migrate_all_with::<ClinicV1>(&mut exec).unwrap();
    assert_eq!(version, None);

    // Only the idempotent history DDL ran.
    assert_eq!(exec.executed.len(), 1);
}

#[test]
fn added_column_migrates_with_alter_table() {
    let mut exec = MockExecutor::new();
    exec.scalar_i64_results.push_back(1);
    exec.scalar_text_results
        .push_back(Some(snapshot_json_of(ClinicV1::entities(), 1)));

    let version = migrate_all_with::<ClinicV2>(&mut exec).unwrap();
    assert_eq!(version, Some(2));

    let statements = exec.all_statements();
    assert_eq!(
        statements[1],
        r#"ALTER TABLE "Patients" ADD COLUMN "MiddleName" VARCHAR(50);"#
    );
    assert!(statements[2].starts_with(r#"INSERT INTO "__MigrationHistory""#));
}

#[test]
fn version_grows_by_one_per_applied_migration() {
    let mut exec = MockExecutor::new();
    exec.scalar_i64_results.push_back(0);
    assert_eq!(migrate_all_with::<ClinicV1>(&mut exec).unwrap(), Some(1));

    let mut exec = MockExecutor::new();
    exec.scalar_i64_results.push_back(1);
    exec.scalar_text_results
        .push_back(Some(snapshot_json_of(ClinicV1::entities(), 1)));
    assert_eq!(migrate_all_with::<ClinicV2>(&mut exec).unwrap(), Some(2));
}

#[test]
fn rollback_replays_down_sql_and_deletes_the_row() {
    let mut exec = MockExecutor::new();
    // current_version is read once by rollback and once by rollback_to.
    exec.scalar_i64_results.push_back(2);
    exec.scalar_i64_results.push_back(2);
    exec.scalar_text_results
        .push_back(Some(r#"ALTER TABLE "Patients" DROP COLUMN "MiddleName";"#.to_string()));

    rollback_with(&mut exec).unwrap();

    let statements = exec.all_statements();
    assert_eq!(
        statements[2],
        r#"ALTER TABLE "Patients" DROP COLUMN "MiddleName";"#
    );
    assert_eq!(
        statements[3],
        r#"DELETE FROM "__MigrationHistory" WHERE "Version" = $1;"#
    );
}

#[test]
fn rollback_at_version_zero_is_a_noop() {
    let mut exec = MockExecutor::new();
    exec.scalar_i64_results.push_back(0);

    rollback_with(&mut exec).unwrap();
    // History DDL only; nothing was replayed or deleted.
    assert_eq!(exec.executed.len(), 1);
}

#[test]
fn rollback_to_walks_versions_newest_first() {
    let mut exec = MockExecutor::new();
    exec.scalar_i64_results.push_back(3);
    exec.scalar_text_results
        .push_back(Some("DROP TABLE IF EXISTS \"C\" CASCADE;".to_string()));
    exec.scalar_text_results
        .push_back(Some("DROP TABLE IF EXISTS \"B\" CASCADE;".to_string()));

    rollback_to_with(&mut exec, 1).unwrap();

    let statements = exec.all_statements();
    assert_eq!(statements[1], r#"DROP TABLE IF EXISTS "C" CASCADE;"#);
    assert_eq!(statements[2], r#"DELETE FROM "__MigrationHistory" WHERE "Version" = $1;"#);
    assert_eq!(statements[3], r#"DROP TABLE IF EXISTS "B" CASCADE;"#);
    assert_eq!(statements[4], r#"DELETE FROM "__MigrationHistory" WHERE "Version" = $1;"#);
}

#[test]
fn rollback_to_rejects_bad_targets() {
    let mut exec = MockExecutor::new();
    exec.scalar_i64_results.push_back(1);
    let err = rollback_to_with(&mut exec, 1).unwrap_err();
    assert!(matches!(err, OrmError::MigrationConflict(_)));

    let mut exec = MockExecutor::new();
    exec.scalar_i64_results.push_back(1);
    let err = rollback_to_with(&mut exec, -1).unwrap_err();
    assert!(matches!(err, OrmError::MigrationConflict(_)));
}

#[test]
fn rollback_aborts_on_missing_history_row() {
    let mut exec = MockExecutor::new();
    exec.scalar_i64_results.push_back(1);
    exec.scalar_text_results.push_back(None);

    let err = rollback_to_with(&mut exec, 0).unwrap_err();
    assert!(matches!(err, OrmError::MigrationConflict(_)));
    // No history row was deleted.
    assert!(exec
        .all_statements()
        .iter()
        .all(|s| !s.starts_with("DELETE FROM")));
}

#[test]
fn multiline_down_scripts_execute_statement_by_statement() {
    let mut exec = MockExecutor::new();
    exec.scalar_i64_results.push_back(1);
    exec.scalar_text_results.push_back(Some(
        "ALTER TABLE \"Patients\" ALTER COLUMN \"OIB\" DROP NOT NULL;\n\
         ALTER TABLE \"Patients\" DROP CONSTRAINT \"Patients_OIB_unique\";"
            .to_string(),
    ));

    rollback_to_with(&mut exec, 0).unwrap();
    let statements = exec.all_statements();
    assert_eq!(statements[1], r#"ALTER TABLE "Patients" ALTER COLUMN "OIB" DROP NOT NULL;"#);
    assert_eq!(
        statements[2],
        r#"ALTER TABLE "Patients" DROP CONSTRAINT "Patients_OIB_unique";"#
    );
}

#[test]
fn reset_drops_tables_in_reverse_declaration_order() {
    let mut exec = MockExecutor::new();
    exec.scalar_i64_results.push_back(0);

    reset_with::<ClinicV1>(&mut exec).unwrap();

    let statements = exec.all_statements();
    assert_eq!(statements[1], r#"DROP TABLE IF EXISTS "Patients" CASCADE;"#);
    assert_eq!(statements[2], r#"DROP TABLE IF EXISTS "Doctors" CASCADE;"#);
    assert_eq!(statements[3], r#"DELETE FROM "__MigrationHistory";"#);
    // Migration restarts from scratch afterwards.
    assert!(statements[5].starts_with(r#"CREATE TABLE IF NOT EXISTS "Doctors""#));
}

#[test]
fn migration_plan_computes_changes_without_executing() {
    let mut exec = MockExecutor::new();
    exec.scalar_i64_results.push_back(0);

    let plan = migration_plan_with::<ClinicV1>(&mut exec).unwrap();
    assert_eq!(plan.len(), 2);
    assert_eq!(plan[0].describe(), "CreateTable Doctors");
    assert_eq!(plan[1].describe(), "CreateTable Patients");

    // Only the idempotent history DDL ran.
    assert_eq!(exec.executed.len(), 1);
}

#[test]
fn current_version_defaults_to_zero() {
    let mut exec = MockExecutor::new();
    exec.scalar_i64_results.push_back(0);
    assert_eq!(current_version_with(&mut exec).unwrap(), 0);
    assert_eq!(
        exec.queried[0].0,
        r#"SELECT COALESCE(MAX("Version"), 0)::bigint FROM "__MigrationHistory";"#
    );
}

#[test]
fn failed_change_aborts_before_history_is_written() {
    let mut exec = MockExecutor::new();
    exec.scalar_i64_results.push_back(0);
    // Call 0 is the history DDL; call 1 is the first CREATE TABLE.
    exec.fail_execute_at = Some(2);

    let err = migrate_all_with::<ClinicV1>(&mut exec).unwrap_err();
    assert!(err.is_unique_violation());
    assert!(exec
        .all_statements()
        .iter()
        .all(|s| !s.starts_with(r#"INSERT INTO "__MigrationHistory""#)));
}
