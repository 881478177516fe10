//! Row mapping traits and utilities

use postgres::types::FromSql;
use postgres::Row;

use crate::error::{OrmError, OrmResult};

/// Trait for converting a database row into a Rust struct.
///
/// This trait is generated by `#[derive(Entity)]`.
pub trait FromRow: Sized {
    /// Convert a database row into Self
    fn from_row(row: &Row) -> OrmResult<Self>;
}

/// Extension trait for Row to provide typed access
pub trait RowExt {
    /// Try to get a column value, returning OrmError::Decode on failure
    fn try_get_column<'a, T>(&'a self, column: &str) -> OrmResult<T>
    where
        T: FromSql<'a>;
}

impl RowExt for Row {
    fn try_get_column<'a, T>(&'a self, column: &str) -> OrmResult<T>
    where
        T: FromSql<'a>,
    {
        self.try_get(column)
            .map_err(|e| OrmError::decode(column, e.to_string()))
    }
}

/// Read a column by name, falling back to the field default when the result
/// set does not contain that column at all.
///
/// Decode failures on a *present* column (NULL into a non-optional field,
/// type mismatch) still error; only a missing ordinal falls back.
pub fn get_or_default<'a, T>(row: &'a Row, column: &str) -> OrmResult<T>
where
    T: FromSql<'a> + FieldDefault,
{
    match row
        .columns()
        .iter()
        .position(|c| c.name().eq_ignore_ascii_case(column))
    {
        Some(idx) => row
            .try_get(idx)
            .map_err(|e| OrmError::decode(column, e.to_string())),
        None => Ok(T::field_default()),
    }
}

/// The value a mapped field takes when a SELECT omits its column.
///
/// This is `Default` widened to cover column types without a `Default` impl
/// (chrono timestamps).
pub trait FieldDefault {
    fn field_default() -> Self;
}

macro_rules! field_default_via_default {
    ($($ty:ty),* $(,)?) => {
        $(impl FieldDefault for $ty {
            fn field_default() -> Self {
                <$ty as Default>::default()
            }
        })*
    };
}

field_default_via_default!(i16, i32, i64, f32, f64, bool, String, Vec<u8>, uuid::Uuid);

impl FieldDefault for chrono::NaiveDateTime {
    fn field_default() -> Self {
        chrono::DateTime::<chrono::Utc>::UNIX_EPOCH.naive_utc()
    }
}

impl FieldDefault for chrono::DateTime<chrono::Utc> {
    fn field_default() -> Self {
        chrono::DateTime::<chrono::Utc>::UNIX_EPOCH
    }
}

impl<T> FieldDefault for Option<T> {
    fn field_default() -> Self {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_defaults_to_none() {
        assert_eq!(<Option<i32> as FieldDefault>::field_default(), None);
    }

    #[test]
    fn timestamp_defaults_to_epoch() {
        let ts = <chrono::NaiveDateTime as FieldDefault>::field_default();
        assert_eq!(ts.and_utc().timestamp(), 0);
    }
}
