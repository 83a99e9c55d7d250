use rusqlite::Connection;

use super::parties::{self, Party, PartyInput, PartyTable};
use crate::error::Result;
use crate::money::Money;

pub fn create(conn: &Connection, input: &PartyInput) -> Result<Party> {
  parties::create(conn, PartyTable::Clients, input)
}

pub fn update(conn: &Connection, id: i64, input: &PartyInput) -> Result<Party> {
  parties::update(conn, PartyTable::Clients, id, input)
}

pub fn get(conn: &Connection, id: i64) -> Result<Party> {
  parties::get(conn, PartyTable::Clients, id)
}

pub fn list(conn: &Connection, search: Option<&str>) -> Result<Vec<Party>> {
  parties::list(conn, PartyTable::Clients, search)
}

/// Refused with an `in_use` error while quotes, sales or invoices point at
/// the client.
pub fn delete(conn: &Connection, id: i64) -> Result<()> {
  parties::delete(conn, PartyTable::Clients, id)
}

/// What the client still owes across non-cancelled invoices.
pub fn balance(conn: &Connection, id: i64) -> Result<Money> {
  get(conn, id)?;
  let owed: Money = conn.query_row(
    "SELECT COALESCE(SUM(total_ttc - amount_paid), 0) FROM invoices
     WHERE client_id = ?1 AND status != 'cancelled'",
    [id],
    |row| row.get(0),
  )?;
  Ok(owed)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::Database;

  #[test]
  fn crud_round() {
    let db = Database::open_in_memory().unwrap();
    let created = db
      .write(|conn| {
        create(
          conn,
          &PartyInput {
            email: "contact@sfax-meubles.tn".to_string(),
            ..PartyInput::named("  Sfax Meubles ")
          },
        )
      })
      .unwrap();
    assert_eq!(created.name, "Sfax Meubles");

    let renamed = db
      .write(|conn| update(conn, created.id, &PartyInput::named("Sfax Meubles SARL")))
      .unwrap();
    assert_eq!(renamed.name, "Sfax Meubles SARL");
    assert_eq!(renamed.email, "");

    let found = db.read(|conn| list(conn, Some("sarl"))).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(db.read(|conn| balance(conn, created.id)).unwrap(), Money::ZERO);

    db.write(|conn| delete(conn, created.id)).unwrap();
    let err = db.read(|conn| get(conn, created.id)).unwrap_err();
    assert_eq!(err.code(), "not_found");
  }

  #[test]
  fn name_is_required() {
    let db = Database::open_in_memory().unwrap();
    let err = db
      .write(|conn| create(conn, &PartyInput::named("   ")))
      .unwrap_err();
    assert_eq!(err.code(), "invalid_input");
  }
}
