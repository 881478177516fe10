use super::*;
use crate::metadata::{ColumnDescriptor, EntityDescriptor};
use crate::types::SqlType;

fn column(name: &str, sql_type: SqlType) -> ColumnDescriptor {
    ColumnDescriptor {
        name: name.to_string(),
        sql_type,
        length: None,
        nullable: false,
        primary_key: false,
        auto_increment: false,
        unique: false,
        default_value: None,
        foreign_key: None,
    }
}

fn patients() -> EntityDescriptor {
    let mut id = column("Id", SqlType::Integer);
    id.primary_key = true;
    id.auto_increment = true;
    let first = column("FirstName", SqlType::VarChar);
    let last = column("LastName", SqlType::VarChar);
    let mut oib = column("OIB", SqlType::VarChar);
    oib.length = Some(11);
    oib.unique = true;
    EntityDescriptor::new("Patient", "Patients", vec![id, first, last, oib]).unwrap()
}

fn patient_values() -> Vec<SqlParam> {
    vec![
        Box::new(0_i32),
        Box::new("Ana".to_string()),
        Box::new("Kovač".to_string()),
        Box::new("12345678901".to_string()),
    ]
}

#[test]
fn test_create_table() {
    assert_eq!(
        create_table(&patients()),
        r#"CREATE TABLE IF NOT EXISTS "Patients" ("Id" SERIAL PRIMARY KEY, "FirstName" TEXT NOT NULL, "LastName" TEXT NOT NULL, "OIB" VARCHAR(11) NOT NULL UNIQUE);"#
    );
}

#[test]
fn test_create_table_is_single_line() {
    assert!(!create_table(&patients()).contains('\n'));
}

#[test]
fn test_drop_table() {
    assert_eq!(
        drop_table(&patients()),
        r#"DROP TABLE IF EXISTS "Patients" CASCADE;"#
    );
}

#[test]
fn test_insert_omits_auto_pk_and_returns_it() {
    let stmt = insert(&patients(), patient_values()).unwrap();
    assert_eq!(
        stmt.sql,
        r#"INSERT INTO "Patients" ("FirstName", "LastName", "OIB") VALUES (@p0, @p1, @p2) RETURNING "Id""#
    );
    assert_eq!(stmt.params.len(), 3);
    assert_eq!(
        stmt.native_sql().unwrap(),
        r#"INSERT INTO "Patients" ("FirstName", "LastName", "OIB") VALUES ($1, $2, $3) RETURNING "Id""#
    );
}

#[test]
fn test_insert_keeps_assigned_pk() {
    let mut d = patients();
    d.columns[0].auto_increment = false;
    let d = EntityDescriptor::new("Patient", "Patients", d.columns).unwrap();
    let stmt = insert(&d, patient_values()).unwrap();
    assert_eq!(
        stmt.sql,
        r#"INSERT INTO "Patients" ("Id", "FirstName", "LastName", "OIB") VALUES (@p0, @p1, @p2, @p3);"#
    );
    assert_eq!(stmt.params.len(), 4);
}

#[test]
fn test_insert_rejects_wrong_value_count() {
    assert!(insert(&patients(), vec![Box::new(1_i32)]).is_err());
}

#[test]
fn test_update_excludes_pk_from_set() {
    let stmt = update(&patients(), patient_values(), Box::new(1_i32)).unwrap();
    assert_eq!(
        stmt.sql,
        r#"UPDATE "Patients" SET "FirstName"=@p0, "LastName"=@p1, "OIB"=@p2 WHERE "Id" = @pId;"#
    );
    assert_eq!(stmt.params.len(), 4);
    assert_eq!(
        stmt.native_sql().unwrap(),
        r#"UPDATE "Patients" SET "FirstName"=$1, "LastName"=$2, "OIB"=$3 WHERE "Id" = $4;"#
    );
}

#[test]
fn test_delete_by_pk() {
    assert_eq!(
        delete(&patients()),
        r#"DELETE FROM "Patients" WHERE "Id" = @p0;"#
    );
}

#[test]
fn test_select_all_in_declaration_order() {
    assert_eq!(
        select_all(&patients()),
        r#"SELECT "Id", "FirstName", "LastName", "OIB" FROM "Patients";"#
    );
}

#[test]
fn test_select_by_id() {
    assert_eq!(
        select_by_id(&patients()),
        r#"SELECT "Id", "FirstName", "LastName", "OIB" FROM "Patients" WHERE "Id" = @p0;"#
    );
}

#[test]
fn test_select_where_with_order() {
    let sql = select_where(&patients(), Some(r#""LastName" = @p0"#), Some(("FirstName", true)));
    assert_eq!(
        sql,
        r#"SELECT "Id", "FirstName", "LastName", "OIB" FROM "Patients" WHERE "LastName" = @p0 ORDER BY "FirstName" ASC;"#
    );
}

#[test]
fn test_select_where_descending_without_fragment() {
    let sql = select_where(&patients(), None, Some(("LastName", false)));
    assert_eq!(
        sql,
        r#"SELECT "Id", "FirstName", "LastName", "OIB" FROM "Patients" ORDER BY "LastName" DESC;"#
    );
}

#[test]
fn test_count() {
    assert_eq!(count(&patients(), None), r#"SELECT COUNT(*) FROM "Patients";"#);
    assert_eq!(
        count(&patients(), Some(r#""LastName" = @p0"#)),
        r#"SELECT COUNT(*) FROM "Patients" WHERE "LastName" = @p0;"#
    );
}

#[test]
fn test_no_values_are_inlined() {
    // Entity field values must only ever appear as bound parameters.
    let stmt = insert(&patients(), patient_values()).unwrap();
    assert!(!stmt.sql.contains("Ana"));
    assert!(!stmt.sql.contains("12345678901"));

    let stmt = update(&patients(), patient_values(), Box::new(1_i32)).unwrap();
    assert!(!stmt.sql.contains("Ana"));
    assert!(!stmt.sql.contains("Kovač"));
}
