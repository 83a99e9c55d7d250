use chrono::{Days, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::lines::{self, Line, LineTable};
use super::sales;
use super::settings::{self, CompanySettings};
use crate::error::{Entity, Error, Result};
use crate::model::{DocumentKind, InvoiceStatus, SaleStatus};
use crate::money::{DocumentTotals, Money};
use crate::numbering;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
  pub id: i64,
  pub number: String,
  pub client_id: Option<i64>,
  pub client_name: Option<String>,
  pub sale_id: Option<i64>,
  pub quote_id: Option<i64>,
  pub date: NaiveDate,
  pub due_date: NaiveDate,
  pub status: InvoiceStatus,
  pub totals: DocumentTotals,
  pub amount_paid: Money,
  pub notes: String,
  pub created_at: String,
  pub items: Vec<Line>,
}

impl Invoice {
  pub fn balance(&self) -> Money {
    self.totals.total_ttc - self.amount_paid
  }

  pub fn is_overdue(&self, today: NaiveDate) -> bool {
    matches!(
      self.status,
      InvoiceStatus::Unpaid | InvoiceStatus::PartiallyPaid
    ) && self.due_date < today
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceSummary {
  pub id: i64,
  pub number: String,
  pub client_id: Option<i64>,
  pub client_name: Option<String>,
  pub date: NaiveDate,
  pub due_date: NaiveDate,
  pub status: InvoiceStatus,
  pub total_ttc: Money,
  pub amount_paid: Money,
  pub balance: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoiceFilter {
  pub status: Option<InvoiceStatus>,
  pub client_id: Option<i64>,
  /// Only unpaid or partially paid invoices due before this date.
  pub overdue_on: Option<NaiveDate>,
}

/// Invoices a completed sale: copies its lines, adds the stamp duty and
/// sets the due date from the payment terms.
pub(crate) fn issue_for_sale(
  conn: &Connection,
  sale_id: i64,
  quote_id: Option<i64>,
  settings: &CompanySettings,
) -> Result<Invoice> {
  let sale = sales::get(conn, sale_id)?;
  if sale.status != SaleStatus::Completed {
    return Err(Error::invalid("vente", format!("la vente {} est annulée", sale.number)));
  }
  let Some(client_id) = sale.client_id else {
    return Err(Error::invalid("client", "obligatoire pour établir une facture"));
  };
  if let Some(existing) = sale.invoice_id {
    let existing = get(conn, existing)?;
    if existing.status != InvoiceStatus::Cancelled {
      return Err(Error::invalid(
        "vente",
        format!("la vente {} est déjà facturée ({})", sale.number, existing.number),
      ));
    }
  }

  let totals = lines::totals(&sale.items, settings.stamp_duty)?;
  let due_date = sale
    .date
    .checked_add_days(Days::new(u64::from(settings.payment_terms_days)))
    .ok_or_else(|| Error::invalid("date", "date hors limites"))?;
  let number = numbering::next_number(conn, DocumentKind::Invoice, sale.date)?;
  conn.execute(
    "INSERT INTO invoices (number, client_id, sale_id, quote_id, date, due_date, status, total_ht,
                           total_discount, total_fodec, total_tva, stamp, total_ttc, notes)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
    params![
      number,
      client_id,
      sale_id,
      quote_id,
      sale.date,
      due_date,
      InvoiceStatus::Unpaid,
      totals.total_ht,
      totals.total_discount,
      totals.total_fodec,
      totals.total_tva,
      totals.stamp,
      totals.total_ttc,
      sale.notes,
    ],
  )?;
  let id = conn.last_insert_rowid();
  lines::insert(conn, LineTable::Invoice, id, &sale.items)?;
  sales::attach_invoice(conn, sale_id, id)?;
  info!(id, %number, sale = %sale.number, total = %totals.total_ttc, "invoice issued");
  get(conn, id)
}

/// Invoices an earlier sale that was recorded without one.
pub fn invoice_sale(conn: &Connection, sale_id: i64) -> Result<Invoice> {
  let settings = settings::get(conn)?;
  issue_for_sale(conn, sale_id, None, &settings)
}

/// Refused once payments exist; delete them first.
pub fn cancel(conn: &Connection, id: i64) -> Result<Invoice> {
  let invoice = get(conn, id)?;
  if invoice.status == InvoiceStatus::Cancelled {
    return Err(Error::InvalidTransition {
      entity: Entity::Invoice,
      from: invoice.status.to_string(),
      to: InvoiceStatus::Cancelled.to_string(),
    });
  }
  if !invoice.amount_paid.is_zero() {
    warn!(id, number = %invoice.number, "cancel refused, invoice has payments");
    return Err(Error::HasPayments {
      number: invoice.number,
    });
  }
  conn.execute(
    "UPDATE invoices SET status = ?1 WHERE id = ?2",
    params![InvoiceStatus::Cancelled, id],
  )?;
  warn!(id, number = %invoice.number, "invoice cancelled");
  get(conn, id)
}

/// Recomputes `amount_paid` from the payments table and derives the status.
pub(crate) fn refresh_status(conn: &Connection, id: i64) -> Result<InvoiceStatus> {
  let invoice = get(conn, id)?;
  let paid: Money = conn.query_row(
    "SELECT COALESCE(SUM(amount), 0) FROM payments WHERE invoice_id = ?1",
    [id],
    |row| row.get(0),
  )?;
  let status = if invoice.status == InvoiceStatus::Cancelled {
    InvoiceStatus::Cancelled
  } else if paid.is_zero() {
    InvoiceStatus::Unpaid
  } else if paid >= invoice.totals.total_ttc {
    InvoiceStatus::Paid
  } else {
    InvoiceStatus::PartiallyPaid
  };
  conn.execute(
    "UPDATE invoices SET amount_paid = ?1, status = ?2 WHERE id = ?3",
    params![paid, status, id],
  )?;
  Ok(status)
}

const HEADER: &str = "SELECT i.id, i.number, i.client_id, c.name AS client_name, i.sale_id,
  i.quote_id, i.date, i.due_date, i.status, i.total_ht, i.total_discount, i.total_fodec,
  i.total_tva, i.stamp, i.total_ttc, i.amount_paid, i.notes, i.created_at
  FROM invoices i LEFT JOIN clients c ON c.id = i.client_id";

fn header_from_row(row: &Row<'_>) -> rusqlite::Result<Invoice> {
  Ok(Invoice {
    id: row.get("id")?,
    number: row.get("number")?,
    client_id: row.get("client_id")?,
    client_name: row.get("client_name")?,
    sale_id: row.get("sale_id")?,
    quote_id: row.get("quote_id")?,
    date: row.get("date")?,
    due_date: row.get("due_date")?,
    status: row.get("status")?,
    totals: DocumentTotals {
      total_ht: row.get("total_ht")?,
      total_discount: row.get("total_discount")?,
      total_fodec: row.get("total_fodec")?,
      total_tva: row.get("total_tva")?,
      stamp: row.get("stamp")?,
      total_ttc: row.get("total_ttc")?,
      tva_breakdown: Vec::new(),
    },
    amount_paid: row.get("amount_paid")?,
    notes: row.get("notes")?,
    created_at: row.get("created_at")?,
    items: Vec::new(),
  })
}

pub fn find(conn: &Connection, id: i64) -> Result<Option<Invoice>> {
  let sql = format!("{HEADER} WHERE i.id = ?1");
  let Some(mut invoice) = conn.query_row(&sql, [id], header_from_row).optional()? else {
    return Ok(None);
  };
  invoice.items = lines::load(conn, LineTable::Invoice, id)?;
  invoice.totals.tva_breakdown = lines::totals(&invoice.items, invoice.totals.stamp)?.tva_breakdown;
  Ok(Some(invoice))
}

pub fn get(conn: &Connection, id: i64) -> Result<Invoice> {
  find(conn, id)?.ok_or_else(|| Error::not_found(Entity::Invoice, id))
}

pub fn find_by_number(conn: &Connection, number: &str) -> Result<Option<Invoice>> {
  let id: Option<i64> = conn
    .query_row(
      "SELECT id FROM invoices WHERE number = ?1",
      [number.trim()],
      |row| row.get(0),
    )
    .optional()?;
  match id {
    Some(id) => find(conn, id),
    None => Ok(None),
  }
}

pub fn list(conn: &Connection, filter: &InvoiceFilter) -> Result<Vec<InvoiceSummary>> {
  let mut stmt = conn.prepare_cached(
    "SELECT i.id, i.number, i.client_id, c.name, i.date, i.due_date, i.status, i.total_ttc,
            i.amount_paid
     FROM invoices i LEFT JOIN clients c ON c.id = i.client_id
     WHERE (?1 IS NULL OR i.status = ?1)
       AND (?2 IS NULL OR i.client_id = ?2)
       AND (?3 IS NULL OR (i.status IN ('unpaid', 'partially_paid') AND i.due_date < ?3))
     ORDER BY i.date DESC, i.id DESC",
  )?;
  let rows = stmt.query_map(
    params![filter.status, filter.client_id, filter.overdue_on],
    |row| {
      let total_ttc: Money = row.get(7)?;
      let amount_paid: Money = row.get(8)?;
      Ok(InvoiceSummary {
        id: row.get(0)?,
        number: row.get(1)?,
        client_id: row.get(2)?,
        client_name: row.get(3)?,
        date: row.get(4)?,
        due_date: row.get(5)?,
        status: row.get(6)?,
        total_ttc,
        amount_paid,
        balance: total_ttc - amount_paid,
      })
    },
  )?;
  Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}
