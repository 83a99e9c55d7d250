use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::invoices;
use crate::error::{Entity, Error, Result};
use crate::model::{DocumentKind, InvoiceStatus, PaymentMethod};
use crate::money::Money;
use crate::numbering;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPayment {
  pub invoice_id: i64,
  pub date: NaiveDate,
  pub amount: Money,
  pub method: PaymentMethod,
  /// Cheque or transfer number.
  #[serde(default)]
  pub reference: String,
  #[serde(default)]
  pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
  pub id: i64,
  pub number: String,
  pub invoice_id: i64,
  pub invoice_number: String,
  pub date: NaiveDate,
  pub amount: Money,
  pub method: PaymentMethod,
  pub reference: String,
  pub notes: String,
  pub created_at: String,
}

const SELECT: &str = "SELECT p.id, p.number, p.invoice_id, i.number AS invoice_number, p.date,
  p.amount, p.method, p.reference, p.notes, p.created_at
  FROM payments p JOIN invoices i ON i.id = p.invoice_id";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Payment> {
  Ok(Payment {
    id: row.get("id")?,
    number: row.get("number")?,
    invoice_id: row.get("invoice_id")?,
    invoice_number: row.get("invoice_number")?,
    date: row.get("date")?,
    amount: row.get("amount")?,
    method: row.get("method")?,
    reference: row.get("reference")?,
    notes: row.get("notes")?,
    created_at: row.get("created_at")?,
  })
}

pub fn record(conn: &Connection, input: &NewPayment) -> Result<Payment> {
  if input.amount <= Money::ZERO {
    return Err(Error::invalid("montant", "le montant doit être positif"));
  }
  let invoice = invoices::get(conn, input.invoice_id)?;
  if invoice.status == InvoiceStatus::Cancelled {
    return Err(Error::invalid(
      "facture",
      format!("la facture {} est annulée", invoice.number),
    ));
  }
  let remaining = invoice.balance();
  if input.amount > remaining {
    warn!(
      invoice = %invoice.number,
      remaining = %remaining,
      attempted = %input.amount,
      "overpayment refused"
    );
    return Err(Error::Overpayment {
      remaining,
      attempted: input.amount,
    });
  }

  let number = numbering::next_number(conn, DocumentKind::Payment, input.date)?;
  conn.execute(
    "INSERT INTO payments (number, invoice_id, date, amount, method, reference, notes)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    params![
      number,
      input.invoice_id,
      input.date,
      input.amount,
      input.method,
      input.reference.trim(),
      input.notes.trim(),
    ],
  )?;
  let id = conn.last_insert_rowid();
  let status = invoices::refresh_status(conn, input.invoice_id)?;
  info!(id, %number, invoice = %invoice.number, amount = %input.amount, %status, "payment recorded");
  get(conn, id)
}

pub fn delete(conn: &Connection, id: i64) -> Result<()> {
  let payment = get(conn, id)?;
  conn.execute("DELETE FROM payments WHERE id = ?1", [id])?;
  let status = invoices::refresh_status(conn, payment.invoice_id)?;
  warn!(id, number = %payment.number, invoice = %payment.invoice_number, %status, "payment deleted");
  Ok(())
}

pub fn find(conn: &Connection, id: i64) -> Result<Option<Payment>> {
  let sql = format!("{SELECT} WHERE p.id = ?1");
  Ok(conn.query_row(&sql, [id], from_row).optional()?)
}

pub fn get(conn: &Connection, id: i64) -> Result<Payment> {
  find(conn, id)?.ok_or_else(|| Error::not_found(Entity::Payment, id))
}

pub fn list_for_invoice(conn: &Connection, invoice_id: i64) -> Result<Vec<Payment>> {
  invoices::get(conn, invoice_id)?;
  let sql = format!("{SELECT} WHERE p.invoice_id = ?1 ORDER BY p.date, p.id");
  let mut stmt = conn.prepare_cached(&sql)?;
  let rows = stmt.query_map([invoice_id], from_row)?;
  Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}
