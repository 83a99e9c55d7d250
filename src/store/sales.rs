use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::lines::{self, Line, LineInput, LineTable};
use super::settings::{self, CompanySettings};
use super::{clients, invoices, stock};
use crate::error::{Entity, Error, Result};
use crate::model::{DocumentKind, InvoiceStatus, MovementReason, SaleStatus};
use crate::money::{DocumentTotals, Money};
use crate::numbering;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSale {
  /// Walk-in sales carry no client but cannot be invoiced.
  #[serde(default)]
  pub client_id: Option<i64>,
  pub date: NaiveDate,
  #[serde(default)]
  pub notes: String,
  pub items: Vec<LineInput>,
  #[serde(default)]
  pub issue_invoice: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
  pub id: i64,
  pub number: String,
  pub client_id: Option<i64>,
  pub client_name: Option<String>,
  pub quote_id: Option<i64>,
  pub date: NaiveDate,
  pub status: SaleStatus,
  pub totals: DocumentTotals,
  pub invoice_id: Option<i64>,
  pub notes: String,
  pub created_at: String,
  pub items: Vec<Line>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleSummary {
  pub id: i64,
  pub number: String,
  pub client_id: Option<i64>,
  pub client_name: Option<String>,
  pub date: NaiveDate,
  pub status: SaleStatus,
  pub total_ttc: Money,
  pub invoice_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaleFilter {
  pub status: Option<SaleStatus>,
  pub client_id: Option<i64>,
  pub from: Option<NaiveDate>,
  pub to: Option<NaiveDate>,
}

/// Identifiers of a freshly recorded sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordedSale {
  pub id: i64,
  pub number: String,
}

/// Inserts a completed sale with already priced lines and takes the sold
/// quantities out of stock.
pub(crate) fn record(
  conn: &Connection,
  client_id: Option<i64>,
  quote_id: Option<i64>,
  date: NaiveDate,
  notes: &str,
  items: &[Line],
  settings: &CompanySettings,
) -> Result<RecordedSale> {
  let totals = lines::totals(items, Money::ZERO)?;
  let number = numbering::next_number(conn, DocumentKind::Sale, date)?;
  conn.execute(
    "INSERT INTO sales (number, client_id, quote_id, date, status, total_ht, total_discount,
                        total_fodec, total_tva, total_ttc, notes)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    params![
      number,
      client_id,
      quote_id,
      date,
      SaleStatus::Completed,
      totals.total_ht,
      totals.total_discount,
      totals.total_fodec,
      totals.total_tva,
      totals.total_ttc,
      notes.trim(),
    ],
  )?;
  let id = conn.last_insert_rowid();
  lines::insert(conn, LineTable::Sale, id, items)?;
  for line in items {
    if let Some(product_id) = line.product_id {
      stock::apply(
        conn,
        product_id,
        -line.quantity,
        MovementReason::Sale,
        &number,
        date,
        settings.allow_negative_stock,
      )?;
    }
  }
  info!(id, %number, total = %totals.total_ttc, "sale recorded");
  Ok(RecordedSale { id, number })
}

pub fn create(conn: &Connection, input: &NewSale) -> Result<Sale> {
  let settings = settings::get(conn)?;
  match input.client_id {
    Some(client_id) => {
      clients::get(conn, client_id)?;
    }
    None if input.issue_invoice => {
      return Err(Error::invalid("client", "obligatoire pour établir une facture"));
    }
    None => {}
  }
  let items = lines::resolve(conn, &input.items, &settings)?;
  let sale = record(
    conn,
    input.client_id,
    None,
    input.date,
    &input.notes,
    &items,
    &settings,
  )?;
  if input.issue_invoice {
    invoices::issue_for_sale(conn, sale.id, None, &settings)?;
  }
  get(conn, sale.id)
}

/// Puts back what the sale took out of stock and cancels the linked invoice.
/// Refused once that invoice has received payments.
pub fn cancel(conn: &Connection, id: i64, date: NaiveDate) -> Result<Sale> {
  let sale = get(conn, id)?;
  if sale.status == SaleStatus::Cancelled {
    return Err(Error::InvalidTransition {
      entity: Entity::Sale,
      from: sale.status.to_string(),
      to: SaleStatus::Cancelled.to_string(),
    });
  }
  if let Some(invoice_id) = sale.invoice_id {
    let invoice = invoices::get(conn, invoice_id)?;
    if invoice.status != InvoiceStatus::Cancelled {
      invoices::cancel(conn, invoice_id)?;
    }
  }
  stock::reverse(
    conn,
    &sale.number,
    MovementReason::Sale,
    MovementReason::SaleCancelled,
    date,
  )?;
  conn.execute(
    "UPDATE sales SET status = ?1 WHERE id = ?2",
    params![SaleStatus::Cancelled, id],
  )?;
  warn!(id, number = %sale.number, "sale cancelled");
  get(conn, id)
}

pub(crate) fn attach_invoice(conn: &Connection, id: i64, invoice_id: i64) -> Result<()> {
  conn.execute(
    "UPDATE sales SET invoice_id = ?1 WHERE id = ?2",
    params![invoice_id, id],
  )?;
  Ok(())
}

const HEADER: &str = "SELECT s.id, s.number, s.client_id, c.name AS client_name, s.quote_id,
  s.date, s.status, s.total_ht, s.total_discount, s.total_fodec, s.total_tva, s.total_ttc,
  s.invoice_id, s.notes, s.created_at
  FROM sales s LEFT JOIN clients c ON c.id = s.client_id";

fn header_from_row(row: &Row<'_>) -> rusqlite::Result<Sale> {
  Ok(Sale {
    id: row.get("id")?,
    number: row.get("number")?,
    client_id: row.get("client_id")?,
    client_name: row.get("client_name")?,
    quote_id: row.get("quote_id")?,
    date: row.get("date")?,
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

pub fn find(conn: &Connection, id: i64) -> Result<Option<Sale>> {
  let sql = format!("{HEADER} WHERE s.id = ?1");
  let Some(mut sale) = conn.query_row(&sql, [id], header_from_row).optional()? else {
    return Ok(None);
  };
  sale.items = lines::load(conn, LineTable::Sale, id)?;
  sale.totals.tva_breakdown = lines::totals(&sale.items, Money::ZERO)?.tva_breakdown;
  Ok(Some(sale))
}

pub fn get(conn: &Connection, id: i64) -> Result<Sale> {
  find(conn, id)?.ok_or_else(|| Error::not_found(Entity::Sale, id))
}

pub fn list(conn: &Connection, filter: &SaleFilter) -> Result<Vec<SaleSummary>> {
  let mut stmt = conn.prepare_cached(
    "SELECT s.id, s.number, s.client_id, c.name, s.date, s.status, s.total_ttc, s.invoice_id
     FROM sales s LEFT JOIN clients c ON c.id = s.client_id
     WHERE (?1 IS NULL OR s.status = ?1)
       AND (?2 IS NULL OR s.client_id = ?2)
       AND (?3 IS NULL OR s.date >= ?3)
       AND (?4 IS NULL OR s.date <= ?4)
     ORDER BY s.date DESC, s.id DESC",
  )?;
  let rows = stmt.query_map(
    params![filter.status, filter.client_id, filter.from, filter.to],
    |row| {
      Ok(SaleSummary {
        id: row.get(0)?,
        number: row.get(1)?,
        client_id: row.get(2)?,
        client_name: row.get(3)?,
        date: row.get(4)?,
        status: row.get(5)?,
        total_ttc: row.get(6)?,
        invoice_id: row.get(7)?,
      })
    },
  )?;
  Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}
