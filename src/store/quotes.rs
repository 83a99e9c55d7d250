use chrono::{Datelike, Days, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::lines::{self, Line, LineInput, LineTable};
use super::{clients, settings};
use crate::error::{Entity, Error, Result};
use crate::model::{DocumentKind, QuoteStatus};
use crate::money::{DocumentTotals, Money};
use crate::numbering;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewQuote {
  pub client_id: i64,
  pub date: NaiveDate,
  /// Defaults to `date` plus the company's quote validity.
  #[serde(default)]
  pub valid_until: Option<NaiveDate>,
  #[serde(default)]
  pub notes: String,
  pub items: Vec<LineInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
  pub id: i64,
  pub number: String,
  pub client_id: i64,
  pub client_name: String,
  pub date: NaiveDate,
  pub valid_until: NaiveDate,
  pub status: QuoteStatus,
  pub totals: DocumentTotals,
  pub invoice_id: Option<i64>,
  pub notes: String,
  pub created_at: String,
  pub items: Vec<Line>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSummary {
  pub id: i64,
  pub number: String,
  pub client_id: i64,
  pub client_name: String,
  pub date: NaiveDate,
  pub valid_until: NaiveDate,
  pub status: QuoteStatus,
  pub total_ttc: Money,
  pub invoice_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteFilter {
  pub status: Option<QuoteStatus>,
  pub client_id: Option<i64>,
}

fn valid_until(input: &NewQuote, validity_days: u32) -> Result<NaiveDate> {
  let until = match input.valid_until {
    Some(date) => date,
    None => input
      .date
      .checked_add_days(Days::new(u64::from(validity_days)))
      .ok_or_else(|| Error::invalid("date", "date hors limites"))?,
  };
  if until < input.date {
    return Err(Error::invalid(
      "validité",
      "la date de validité précède la date du devis",
    ));
  }
  Ok(until)
}

pub fn create(conn: &Connection, input: &NewQuote) -> Result<Quote> {
  let settings = settings::get(conn)?;
  clients::get(conn, input.client_id)?;
  let valid_until = valid_until(input, settings.quote_validity_days)?;
  let items = lines::resolve(conn, &input.items, &settings)?;
  let totals = lines::totals(&items, Money::ZERO)?;
  let number = numbering::next_number(conn, DocumentKind::Quote, input.date)?;

  conn.execute(
    "INSERT INTO quotes (number, client_id, date, valid_until, status, total_ht, total_discount,
                         total_fodec, total_tva, total_ttc, notes)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    params![
      number,
      input.client_id,
      input.date,
      valid_until,
      QuoteStatus::Draft,
      totals.total_ht,
      totals.total_discount,
      totals.total_fodec,
      totals.total_tva,
      totals.total_ttc,
      input.notes.trim(),
    ],
  )?;
  let id = conn.last_insert_rowid();
  lines::insert(conn, LineTable::Quote, id, &items)?;
  info!(id, %number, total = %totals.total_ttc, "quote created");
  get(conn, id)
}

pub fn update(conn: &Connection, id: i64, input: &NewQuote) -> Result<Quote> {
  let current = get(conn, id)?;
  if !current.status.is_editable() {
    warn!(id, status = %current.status, "quote is locked");
    return Err(Error::InvalidTransition {
      entity: Entity::Quote,
      from: current.status.to_string(),
      to: "modifié".to_string(),
    });
  }
  // The number carries the year of the original date.
  if input.date.year() != current.date.year() {
    return Err(Error::invalid(
      "date",
      format!(
        "le devis {} est numéroté sur {} ; établissez un nouveau devis",
        current.number,
        current.date.year()
      ),
    ));
  }
  let settings = settings::get(conn)?;
  clients::get(conn, input.client_id)?;
  let valid_until = valid_until(input, settings.quote_validity_days)?;
  let items = lines::resolve(conn, &input.items, &settings)?;
  let totals = lines::totals(&items, Money::ZERO)?;

  conn.execute(
    "UPDATE quotes SET client_id = ?1, date = ?2, valid_until = ?3, total_ht = ?4,
       total_discount = ?5, total_fodec = ?6, total_tva = ?7, total_ttc = ?8, notes = ?9
     WHERE id = ?10",
    params![
      input.client_id,
      input.date,
      valid_until,
      totals.total_ht,
      totals.total_discount,
      totals.total_fodec,
      totals.total_tva,
      totals.total_ttc,
      input.notes.trim(),
      id,
    ],
  )?;
  lines::replace(conn, LineTable::Quote, id, &items)?;
  info!(id, number = %current.number, "quote updated");
  get(conn, id)
}

pub fn set_status(conn: &Connection, id: i64, status: QuoteStatus) -> Result<Quote> {
  let current = get(conn, id)?;
  if current.status == status {
    return Ok(current);
  }
  if !current.status.can_become(status) {
    warn!(id, from = %current.status, to = %status, "quote transition refused");
    return Err(Error::InvalidTransition {
      entity: Entity::Quote,
      from: current.status.to_string(),
      to: status.to_string(),
    });
  }
  conn.execute(
    "UPDATE quotes SET status = ?1 WHERE id = ?2",
    params![status, id],
  )?;
  info!(id, from = %current.status, to = %status, "quote status changed");
  get(conn, id)
}

pub(crate) fn mark_invoiced(conn: &Connection, id: i64, invoice_id: i64) -> Result<()> {
  conn.execute(
    "UPDATE quotes SET status = ?1, invoice_id = ?2 WHERE id = ?3",
    params![QuoteStatus::Invoiced, invoice_id, id],
  )?;
  Ok(())
}

const HEADER: &str = "SELECT q.id, q.number, q.client_id, c.name AS client_name, q.date,
  q.valid_until, q.status, q.total_ht, q.total_discount, q.total_fodec, q.total_tva,
  q.total_ttc, q.invoice_id, q.notes, q.created_at
  FROM quotes q JOIN clients c ON c.id = q.client_id";

fn header_from_row(row: &Row<'_>) -> rusqlite::Result<Quote> {
  Ok(Quote {
    id: row.get("id")?,
    number: row.get("number")?,
    client_id: row.get("client_id")?,
    client_name: row.get("client_name")?,
    date: row.get("date")?,
    valid_until: row.get("valid_until")?,
    status: row.get("status")?,
    totals: DocumentTotals {
      total_ht: row.get("total_ht")?,
      total_discount: row.get("total_discount")?,
      total_fodec: row.get("total_fodec")?,
      total_tva: row.get("total_tva")?,
      stamp: Money::ZERO,
      total_ttc: row.get("total_ttc")?,
      tva_breakdown: Vec::new(),
    },
    invoice_id: row.get("invoice_id")?,
    notes: row.get("notes")?,
    created_at: row.get("created_at")?,
    items: Vec::new(),
  })
}

pub fn find(conn: &Connection, id: i64) -> Result<Option<Quote>> {
  let sql = format!("{HEADER} WHERE q.id = ?1");
  let Some(mut quote) = conn.query_row(&sql, [id], header_from_row).optional()? else {
    return Ok(None);
  };
  quote.items = lines::load(conn, LineTable::Quote, id)?;
  quote.totals.tva_breakdown = lines::totals(&quote.items, Money::ZERO)?.tva_breakdown;
  Ok(Some(quote))
}

pub fn get(conn: &Connection, id: i64) -> Result<Quote> {
  find(conn, id)?.ok_or_else(|| Error::not_found(Entity::Quote, id))
}

pub fn list(conn: &Connection, filter: &QuoteFilter) -> Result<Vec<QuoteSummary>> {
  let mut stmt = conn.prepare_cached(
    "SELECT q.id, q.number, q.client_id, c.name, q.date, q.valid_until, q.status, q.total_ttc,
            q.invoice_id
     FROM quotes q JOIN clients c ON c.id = q.client_id
     WHERE (?1 IS NULL OR q.status = ?1) AND (?2 IS NULL OR q.client_id = ?2)
     ORDER BY q.date DESC, q.id DESC",
  )?;
  let rows = stmt.query_map(params![filter.status, filter.client_id], |row| {
    Ok(QuoteSummary {
      id: row.get(0)?,
      number: row.get(1)?,
      client_id: row.get(2)?,
      client_name: row.get(3)?,
      date: row.get(4)?,
      valid_until: row.get(5)?,
      status: row.get(6)?,
      total_ttc: row.get(7)?,
      invoice_id: row.get(8)?,
    })
  })?;
  Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn delete(conn: &Connection, id: i64) -> Result<()> {
  let current = get(conn, id)?;
  if current.status == QuoteStatus::Invoiced {
    return Err(Error::AlreadyInvoiced {
      number: current.number,
    });
  }
  conn.execute("DELETE FROM quotes WHERE id = ?1", [id])?;
  info!(id, number = %current.number, "quote deleted");
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::Database;
  use crate::store::parties::PartyInput;
  use pretty_assertions::assert_eq;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  fn seeded() -> (Database, i64) {
    let db = Database::open_in_memory().unwrap();
    let client = db
      .write(|conn| clients::create(conn, &PartyInput::named("Hôtel El Mouradi")))
      .unwrap();
    (db, client.id)
  }

  fn sample(client_id: i64) -> NewQuote {
    NewQuote {
      client_id,
      date: date(2026, 4, 2),
      valid_until: None,
      notes: String::new(),
      items: vec![LineInput::free("Rideaux", 4.0, Money::from_dinars(60))],
    }
  }

  #[test]
  fn create_numbers_and_prices_the_quote() {
    let (db, client_id) = seeded();
    let quote = db.write(|conn| create(conn, &sample(client_id))).unwrap();
    assert_eq!(quote.number, "DEV-2026-0001");
    assert_eq!(quote.status, QuoteStatus::Draft);
    assert_eq!(quote.valid_until, date(2026, 5, 2));
    assert_eq!(quote.client_name, "Hôtel El Mouradi");
    assert_eq!(quote.totals.total_ht, Money::from_dinars(240));
    assert_eq!(quote.totals.total_tva, Money::from_millimes(45_600));
    assert_eq!(quote.totals.stamp, Money::ZERO);
    assert_eq!(quote.totals.tva_breakdown.len(), 1);
  }

  #[test]
  fn update_replaces_lines_until_locked() {
    let (db, client_id) = seeded();
    let quote = db.write(|conn| create(conn, &sample(client_id))).unwrap();
    let mut changed = sample(client_id);
    changed.items.push(LineInput::free("Tringles", 4.0, Money::from_dinars(15)));
    let updated = db.write(|conn| update(conn, quote.id, &changed)).unwrap();
    assert_eq!(updated.items.len(), 2);
    assert_eq!(updated.number, quote.number);
    assert_eq!(updated.totals.total_ht, Money::from_dinars(300));

    db.write(|conn| set_status(conn, quote.id, QuoteStatus::Rejected))
      .unwrap();
    let err = db
      .write(|conn| update(conn, quote.id, &changed))
      .unwrap_err();
    assert_eq!(err.code(), "invalid_transition");
  }

  #[test]
  fn status_cannot_be_forced_to_invoiced() {
    let (db, client_id) = seeded();
    let quote = db.write(|conn| create(conn, &sample(client_id))).unwrap();
    let err = db
      .write(|conn| set_status(conn, quote.id, QuoteStatus::Invoiced))
      .unwrap_err();
    assert_eq!(err.code(), "invalid_transition");
  }

  #[test]
  fn list_filters_by_status() {
    let (db, client_id) = seeded();
    let first = db.write(|conn| create(conn, &sample(client_id))).unwrap();
    db.write(|conn| create(conn, &sample(client_id))).unwrap();
    db.write(|conn| set_status(conn, first.id, QuoteStatus::Sent))
      .unwrap();
    let sent = db
      .read(|conn| {
        list(
          conn,
          &QuoteFilter {
            status: Some(QuoteStatus::Sent),
            client_id: None,
          },
        )
      })
      .unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].id, first.id);
    let all = db.read(|conn| list(conn, &QuoteFilter::default())).unwrap();
    assert_eq!(all.len(), 2);
  }

  #[test]
  fn delete_removes_draft_quotes() {
    let (db, client_id) = seeded();
    let quote = db.write(|conn| create(conn, &sample(client_id))).unwrap();
    db.write(|conn| delete(conn, quote.id)).unwrap();
    assert!(db.read(|conn| find(conn, quote.id)).unwrap().is_none());
  }
}
