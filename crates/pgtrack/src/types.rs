//! Application-type ↔ SQL-type mapping.
//!
//! [`SqlType`] is the column type vocabulary used by descriptors, snapshots
//! and DDL generation. [`ColumnType`] maps Rust field types onto it; the
//! `Entity` derive consults it per field. Value conversion to and from the
//! driver rides on `postgres`' own `ToSql`/`FromSql` impls — the only
//! conversion this library adds is [`Ordinal`] for enumerations stored as
//! INTEGER ordinals.

use chrono::{DateTime, NaiveDateTime, Utc};
use uuid::Uuid;

use crate::error::OrmResult;

/// SQL column type for the PostgreSQL dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Integer,
    BigInt,
    SmallInt,
    Decimal,
    Real,
    Double,
    /// Resolved to `VARCHAR(N)` when the column declares a length, `TEXT` otherwise.
    VarChar,
    Char,
    Boolean,
    Timestamp,
    TimestampTz,
    Uuid,
    Bytea,
    /// Fallback type.
    Text,
}

impl SqlType {
    /// Resolve to the DDL / snapshot type string.
    pub fn ddl(&self, length: Option<u32>) -> String {
        match self {
            Self::Integer => "INTEGER".to_string(),
            Self::BigInt => "BIGINT".to_string(),
            Self::SmallInt => "SMALLINT".to_string(),
            Self::Decimal => "DECIMAL".to_string(),
            Self::Real => "REAL".to_string(),
            Self::Double => "DOUBLE PRECISION".to_string(),
            Self::VarChar => match length {
                Some(n) => format!("VARCHAR({n})"),
                None => "TEXT".to_string(),
            },
            Self::Char => "CHAR(1)".to_string(),
            Self::Boolean => "BOOLEAN".to_string(),
            Self::Timestamp => "TIMESTAMP".to_string(),
            Self::TimestampTz => "TIMESTAMPTZ".to_string(),
            Self::Uuid => "UUID".to_string(),
            Self::Bytea => "BYTEA".to_string(),
            Self::Text => "TEXT".to_string(),
        }
    }
}

/// Default literal injected when a non-nullable column is added to an
/// existing table, keyed by the resolved type string.
///
/// Numerics get `0` / `0.0`, booleans `FALSE`, timestamps `NOW()`,
/// everything else an empty string literal.
pub fn type_default(type_string: &str) -> &'static str {
    match type_string {
        "INTEGER" | "BIGINT" | "SMALLINT" => "0",
        "DECIMAL" | "REAL" | "DOUBLE PRECISION" => "0.0",
        "BOOLEAN" => "FALSE",
        "TIMESTAMP" | "TIMESTAMPTZ" => "NOW()",
        _ => "''",
    }
}

/// Maps a Rust field type to its [`SqlType`] and nullability.
///
/// `Option<T>` unwraps to `T`'s SQL type and marks the column nullable.
pub trait ColumnType {
    const SQL_TYPE: SqlType;
    const NULLABLE: bool = false;
}

impl ColumnType for i32 {
    const SQL_TYPE: SqlType = SqlType::Integer;
}

impl ColumnType for i64 {
    const SQL_TYPE: SqlType = SqlType::BigInt;
}

impl ColumnType for i16 {
    const SQL_TYPE: SqlType = SqlType::SmallInt;
}

impl ColumnType for f32 {
    const SQL_TYPE: SqlType = SqlType::Real;
}

impl ColumnType for f64 {
    const SQL_TYPE: SqlType = SqlType::Double;
}

impl ColumnType for String {
    const SQL_TYPE: SqlType = SqlType::VarChar;
}

impl ColumnType for bool {
    const SQL_TYPE: SqlType = SqlType::Boolean;
}

impl ColumnType for NaiveDateTime {
    const SQL_TYPE: SqlType = SqlType::Timestamp;
}

impl ColumnType for DateTime<Utc> {
    const SQL_TYPE: SqlType = SqlType::TimestampTz;
}

impl ColumnType for Uuid {
    const SQL_TYPE: SqlType = SqlType::Uuid;
}

impl ColumnType for Vec<u8> {
    const SQL_TYPE: SqlType = SqlType::Bytea;
}

impl<T: ColumnType> ColumnType for Option<T> {
    const SQL_TYPE: SqlType = T::SQL_TYPE;
    const NULLABLE: bool = true;
}

/// Enumerations stored as their INTEGER ordinal.
///
/// Implemented via `#[derive(OrdinalEnum)]` for unit-variant enums; explicit
/// discriminants are respected.
pub trait Ordinal: Sized {
    /// The integer value stored in the database.
    fn ordinal(&self) -> i32;

    /// Reconstruct the enum from a stored ordinal.
    ///
    /// Returns [`OrmError::Decode`](crate::OrmError::Decode) for values that
    /// match no variant.
    fn from_ordinal(ordinal: i32) -> OrmResult<Self>;
}
