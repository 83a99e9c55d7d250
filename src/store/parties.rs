//! Clients and suppliers share one record shape and the same SQL; only the
//! table differs.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Entity, Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
  pub id: i64,
  pub name: String,
  pub email: String,
  pub phone: String,
  pub address: String,
  pub tax_id: String,
  pub notes: String,
  pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartyInput {
  pub name: String,
  pub email: String,
  pub phone: String,
  pub address: String,
  pub tax_id: String,
  pub notes: String,
}

impl PartyInput {
  pub fn named(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Self::default()
    }
  }

  fn validate(&self) -> Result<()> {
    if self.name.trim().is_empty() {
      return Err(Error::invalid("nom", "obligatoire"));
    }
    let email = self.email.trim();
    if !email.is_empty() && !email.contains('@') {
      return Err(Error::invalid("email", format!("« {email} » n'est pas une adresse")));
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum PartyTable {
  Clients,
  Suppliers,
}

impl PartyTable {
  fn table(self) -> &'static str {
    match self {
      PartyTable::Clients => "clients",
      PartyTable::Suppliers => "suppliers",
    }
  }

  fn entity(self) -> Entity {
    match self {
      PartyTable::Clients => Entity::Client,
      PartyTable::Suppliers => Entity::Supplier,
    }
  }
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<Party> {
  Ok(Party {
    id: row.get("id")?,
    name: row.get("name")?,
    email: row.get("email")?,
    phone: row.get("phone")?,
    address: row.get("address")?,
    tax_id: row.get("tax_id")?,
    notes: row.get("notes")?,
    created_at: row.get("created_at")?,
  })
}

pub(crate) fn create(conn: &Connection, table: PartyTable, input: &PartyInput) -> Result<Party> {
  input.validate()?;
  let sql = format!(
    "INSERT INTO {} (name, email, phone, address, tax_id, notes) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    table.table()
  );
  conn.execute(
    &sql,
    params![
      input.name.trim(),
      input.email.trim(),
      input.phone.trim(),
      input.address.trim(),
      input.tax_id.trim(),
      input.notes.trim(),
    ],
  )?;
  let id = conn.last_insert_rowid();
  info!(table = table.table(), id, "party created");
  get(conn, table, id)
}

pub(crate) fn update(conn: &Connection, table: PartyTable, id: i64, input: &PartyInput) -> Result<Party> {
  input.validate()?;
  let sql = format!(
    "UPDATE {} SET name = ?1, email = ?2, phone = ?3, address = ?4, tax_id = ?5, notes = ?6
     WHERE id = ?7",
    table.table()
  );
  let changed = conn.execute(
    &sql,
    params![
      input.name.trim(),
      input.email.trim(),
      input.phone.trim(),
      input.address.trim(),
      input.tax_id.trim(),
      input.notes.trim(),
      id,
    ],
  )?;
  if changed == 0 {
    return Err(Error::not_found(table.entity(), id));
  }
  get(conn, table, id)
}

pub(crate) fn find(conn: &Connection, table: PartyTable, id: i64) -> Result<Option<Party>> {
  let sql = format!(
    "SELECT id, name, email, phone, address, tax_id, notes, created_at FROM {} WHERE id = ?1",
    table.table()
  );
  Ok(conn.query_row(&sql, [id], from_row).optional()?)
}

pub(crate) fn get(conn: &Connection, table: PartyTable, id: i64) -> Result<Party> {
  find(conn, table, id)?.ok_or_else(|| Error::not_found(table.entity(), id))
}

/// Case-insensitive match on name, email, phone or tax id.
pub(crate) fn list(conn: &Connection, table: PartyTable, search: Option<&str>) -> Result<Vec<Party>> {
  let pattern = format!("%{}%", search.unwrap_or("").trim());
  let sql = format!(
    "SELECT id, name, email, phone, address, tax_id, notes, created_at FROM {}
     WHERE name LIKE ?1 OR email LIKE ?1 OR phone LIKE ?1 OR tax_id LIKE ?1
     ORDER BY name COLLATE NOCASE, id",
    table.table()
  );
  let mut stmt = conn.prepare_cached(&sql)?;
  let rows = stmt.query_map([pattern], from_row)?;
  Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub(crate) fn delete(conn: &Connection, table: PartyTable, id: i64) -> Result<()> {
  let sql = format!("DELETE FROM {} WHERE id = ?1", table.table());
  let changed = conn.execute(&sql, [id])?;
  if changed == 0 {
    return Err(Error::not_found(table.entity(), id));
  }
  info!(table = table.table(), id, "party deleted");
  Ok(())
}
