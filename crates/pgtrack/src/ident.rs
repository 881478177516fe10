//! Safe SQL identifier handling.
//!
//! Every identifier this library emits (table, column, constraint) is rendered
//! in the quoted form `"Name"`, with embedded `"` escaped as `""`. [`Ident`]
//! validates the raw name once; rendering cannot fail afterwards.

use crate::error::{OrmError, OrmResult};

/// A validated SQL identifier (column, table, or constraint name).
///
/// Rendered quoted: `Ident::new("Patients")?.to_sql() == r#""Patients""#`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    name: String,
}

impl Ident {
    /// Validate a raw name as an identifier.
    pub fn new(name: impl Into<String>) -> OrmResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(OrmError::validation("Identifier cannot be empty"));
        }
        if name.contains('\0') {
            return Err(OrmError::validation(
                "Identifier cannot contain NUL character",
            ));
        }
        Ok(Self { name })
    }

    /// The raw (unquoted) name.
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Render the identifier as quoted SQL.
    pub fn to_sql(&self) -> String {
        let mut out = String::with_capacity(self.name.len() + 2);
        self.write_sql(&mut out);
        out
    }

    pub(crate) fn write_sql(&self, out: &mut String) {
        out.push('"');
        for ch in self.name.chars() {
            if ch == '"' {
                out.push('"');
                out.push('"');
            } else {
                out.push(ch);
            }
        }
        out.push('"');
    }
}

/// Quote a name that is already known to be a valid identifier
/// (metadata-sourced names; validated when the descriptor was built).
pub(crate) fn quoted(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push('"');
    for ch in name.chars() {
        if ch == '"' {
            out.push('"');
            out.push('"');
        } else {
            out.push(ch);
        }
    }
    out.push('"');
    out
}

/// Compare two identifiers case-insensitively (ASCII).
///
/// Column and table identity in snapshots and descriptors is name-based and
/// case-insensitive.
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Compare two identifiers ignoring case and underscores.
///
/// Used for navigation foreign-key conventions so that the conventional
/// `PatientId` matches a column declared as `patient_id`.
pub fn eq_conventional(a: &str, b: &str) -> bool {
    let mut ai = a.chars().filter(|c| *c != '_');
    let mut bi = b.chars().filter(|c| *c != '_');
    loop {
        match (ai.next(), bi.next()) {
            (None, None) => return true,
            (Some(x), Some(y)) if x.eq_ignore_ascii_case(&y) => {}
            _ => return false,
        }
    }
}
