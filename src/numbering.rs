//! Sequential document numbers: `FAC-2026-0001`, `DEV-2026-0002`, ...
//!
//! Counters restart each calendar year and are advanced inside the caller's
//! transaction, so a document that fails to commit gives its number back.

use chrono::{Datelike, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::model::DocumentKind;

pub fn next_number(conn: &Connection, kind: DocumentKind, date: NaiveDate) -> Result<String> {
  let year = date.year();
  let value: i64 = conn.query_row(
    "INSERT INTO document_sequences (kind, year, last_value) VALUES (?1, ?2, 1)
     ON CONFLICT(kind, year) DO UPDATE SET last_value = last_value + 1
     RETURNING last_value",
    params![kind, year],
    |row| row.get(0),
  )?;
  Ok(format_number(kind, year, value))
}

/// Number the next document of `kind` would receive, without consuming it.
pub fn peek_number(conn: &Connection, kind: DocumentKind, date: NaiveDate) -> Result<String> {
  let year = date.year();
  let last: Option<i64> = conn
    .query_row(
      "SELECT last_value FROM document_sequences WHERE kind = ?1 AND year = ?2",
      params![kind, year],
      |row| row.get(0),
    )
    .optional()?;
  Ok(format_number(kind, year, last.unwrap_or(0) + 1))
}

fn format_number(kind: DocumentKind, year: i32, value: i64) -> String {
  format!("{}-{year}-{value:04}", kind.prefix())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::Database;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[test]
  fn numbers_are_sequential_per_kind_and_year() {
    let db = Database::open_in_memory().unwrap();
    let numbers = db
      .write(|conn| {
        Ok(vec![
          next_number(conn, DocumentKind::Invoice, date(2026, 1, 3))?,
          next_number(conn, DocumentKind::Invoice, date(2026, 5, 9))?,
          next_number(conn, DocumentKind::Quote, date(2026, 5, 9))?,
          next_number(conn, DocumentKind::Invoice, date(2027, 1, 1))?,
        ])
      })
      .unwrap();
    assert_eq!(
      numbers,
      vec!["FAC-2026-0001", "FAC-2026-0002", "DEV-2026-0001", "FAC-2027-0001"]
    );
  }

  #[test]
  fn rolled_back_number_is_reused() {
    let db = Database::open_in_memory().unwrap();
    let _ = db.write(|conn| -> Result<()> {
      next_number(conn, DocumentKind::Sale, date(2026, 2, 1))?;
      Err(crate::error::Error::invalid("test", "rollback"))
    });
    let peeked = db
      .read(|conn| peek_number(conn, DocumentKind::Sale, date(2026, 2, 1)))
      .unwrap();
    assert_eq!(peeked, "VTE-2026-0001");
    let number = db
      .write(|conn| next_number(conn, DocumentKind::Sale, date(2026, 2, 1)))
      .unwrap();
    assert_eq!(number, "VTE-2026-0001");
  }
}
