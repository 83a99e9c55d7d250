use chrono::NaiveDate;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::money::Money;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
  pub from: NaiveDate,
  pub to: NaiveDate,
  /// TTC of non-cancelled invoices dated within the period.
  pub invoiced: Money,
  /// Payments received within the period.
  pub collected: Money,
  pub sales_count: i64,
  /// Unpaid balance of every open invoice, whatever its date.
  pub outstanding: Money,
  pub overdue_invoices: i64,
  pub open_quotes: i64,
  pub low_stock_products: i64,
}

pub fn summary(conn: &Connection, from: NaiveDate, to: NaiveDate, today: NaiveDate) -> Result<Summary> {
  if to < from {
    return Err(Error::invalid("période", "la date de fin précède la date de début"));
  }
  let invoiced: Money = conn.query_row(
    "SELECT COALESCE(SUM(total_ttc), 0) FROM invoices
     WHERE status != 'cancelled' AND date BETWEEN ?1 AND ?2",
    params![from, to],
    |row| row.get(0),
  )?;
  let collected: Money = conn.query_row(
    "SELECT COALESCE(SUM(amount), 0) FROM payments WHERE date BETWEEN ?1 AND ?2",
    params![from, to],
    |row| row.get(0),
  )?;
  let sales_count: i64 = conn.query_row(
    "SELECT COUNT(*) FROM sales WHERE status = 'completed' AND date BETWEEN ?1 AND ?2",
    params![from, to],
    |row| row.get(0),
  )?;
  let (outstanding, overdue_invoices): (Money, i64) = conn.query_row(
    "SELECT COALESCE(SUM(total_ttc - amount_paid), 0),
            COALESCE(SUM(CASE WHEN due_date < ?1 THEN 1 ELSE 0 END), 0)
     FROM invoices WHERE status IN ('unpaid', 'partially_paid')",
    params![today],
    |row| Ok((row.get(0)?, row.get(1)?)),
  )?;
  let open_quotes: i64 = conn.query_row(
    "SELECT COUNT(*) FROM quotes WHERE status IN ('draft', 'sent', 'accepted')",
    [],
    |row| row.get(0),
  )?;
  let low_stock_products: i64 = conn.query_row(
    "SELECT COUNT(*) FROM products WHERE track_stock = 1 AND stock_quantity <= alert_threshold",
    [],
    |row| row.get(0),
  )?;
  Ok(Summary {
    from,
    to,
    invoiced,
    collected,
    sales_count,
    outstanding,
    overdue_invoices,
    open_quotes,
    low_stock_products,
  })
}
