use rusqlite::Connection;

use super::parties::{self, Party, PartyInput, PartyTable};
use crate::error::Result;

pub fn create(conn: &Connection, input: &PartyInput) -> Result<Party> {
  parties::create(conn, PartyTable::Suppliers, input)
}

pub fn update(conn: &Connection, id: i64, input: &PartyInput) -> Result<Party> {
  parties::update(conn, PartyTable::Suppliers, id, input)
}

pub fn get(conn: &Connection, id: i64) -> Result<Party> {
  parties::get(conn, PartyTable::Suppliers, id)
}

pub fn list(conn: &Connection, search: Option<&str>) -> Result<Vec<Party>> {
  parties::list(conn, PartyTable::Suppliers, search)
}

pub fn delete(conn: &Connection, id: i64) -> Result<()> {
  parties::delete(conn, PartyTable::Suppliers, id)
}
