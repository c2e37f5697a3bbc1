//! SQL scalar functions registered on every archive connection.
//!
//! # Invariants
//! - `lifevault_fold(text)` lowercases with full Unicode case mapping; SQLite's
//!   built-in `lower()`, `LIKE` and `NOCASE` only fold ASCII.
//! - `NULL` folds to `NULL`.

use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

/// Name of the Unicode case-folding scalar function.
const FOLD_FUNCTION: &str = "lifevault_fold";

/// Folds text the same way `lifevault_fold` does inside SQL.
pub fn fold_text(value: &str) -> String {
    value.to_lowercase()
}

pub(crate) fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        FOLD_FUNCTION,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|text| fold_text(&text)))
        },
    )
}

#[cfg(test)]
mod tests {
    use super::{fold_text, register_functions};
    use rusqlite::Connection;

    #[test]
    fn fold_lowercases_non_ascii_letters() {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        register_functions(&conn).expect("register functions");

        let folded: String = conn
            .query_row("SELECT lifevault_fold(?1);", ["ÉPICERIE Ünterlagen"], |row| {
                row.get(0)
            })
            .expect("fold text");
        assert_eq!(folded, "épicerie ünterlagen");
        assert_eq!(fold_text("Добрый"), "добрый");

        let null: Option<String> = conn
            .query_row("SELECT lifevault_fold(NULL);", [], |row| row.get(0))
            .expect("fold null");
        assert_eq!(null, None);
    }
}
