//! Placeholder adaptation.
//!
//! Builder SQL carries `@p0, @p1, …` placeholders (`@pId` for the UPDATE
//! primary-key slot, always bound last). The driver wants `$1, $2, …`.

use crate::error::{OrmError, OrmResult};

/// Translate `@pN` placeholders to the driver's `$n` syntax.
///
/// Asserts that every placeholder refers to a supplied parameter: a fragment
/// mentioning `@p3` with only two bound parameters is rejected before it
/// reaches the database. `@pId` resolves to the final parameter.
pub fn to_native_sql(sql: &str, param_count: usize) -> OrmResult<String> {
    let mut out = String::with_capacity(sql.len());
    let bytes = sql.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'@' && i + 1 < bytes.len() && bytes[i + 1] == b'p' {
            let start = i + 2;
            let mut end = start;
            while end < bytes.len() && bytes[end].is_ascii_alphanumeric() {
                end += 1;
            }
            let token = &sql[start..end];
            let index = if token == "Id" {
                if param_count == 0 {
                    return Err(OrmError::validation(
                        "placeholder @pId used with no bound parameters",
                    ));
                }
                param_count - 1
            } else if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
                token
                    .parse::<usize>()
                    .map_err(|_| OrmError::validation(format!("invalid placeholder @p{token}")))?
            } else {
                return Err(OrmError::validation(format!(
                    "invalid placeholder @p{token}"
                )));
            };

            if index >= param_count {
                return Err(OrmError::validation(format!(
                    "placeholder @p{token} has no bound parameter ({param_count} supplied)"
                )));
            }

            out.push('$');
            out.push_str(&(index + 1).to_string());
            i = end;
        } else {
            // Copy one UTF-8 sequence; its length is in the leading byte.
            let len = match bytes[i] {
                0x00..=0x7F => 1,
                0xC0..=0xDF => 2,
                0xE0..=0xEF => 3,
                _ => 4,
            };
            out.push_str(&sql[i..i + len]);
            i += len;
        }
    }

    Ok(out)
}
