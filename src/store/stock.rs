//! Stock levels and the movement journal.
//!
//! Every change to `products.stock_quantity` goes through [`apply`], which
//! writes the matching `stock_movements` row in the same transaction.

use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::products;
use crate::error::{Error, Result};
use crate::model::MovementReason;

/// Quantities closer than this to zero count as zero.
const QUANTITY_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMovement {
  pub id: i64,
  pub product_id: i64,
  pub delta: f64,
  pub reason: MovementReason,
  pub reference: String,
  pub date: NaiveDate,
  pub created_at: String,
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<StockMovement> {
  Ok(StockMovement {
    id: row.get("id")?,
    product_id: row.get("product_id")?,
    delta: row.get("delta")?,
    reason: row.get("reason")?,
    reference: row.get("reference")?,
    date: row.get("date")?,
    created_at: row.get("created_at")?,
  })
}

/// Moves stock by `delta`. Products that do not track stock are left alone.
/// A decrement below zero fails with `InsufficientStock` unless
/// `allow_negative` is set.
pub(crate) fn apply(
  conn: &Connection,
  product_id: i64,
  delta: f64,
  reason: MovementReason,
  reference: &str,
  date: NaiveDate,
  allow_negative: bool,
) -> Result<()> {
  let product = products::get(conn, product_id)?;
  if !product.track_stock {
    debug!(product_id, "stock not tracked, movement skipped");
    return Ok(());
  }
  let next = product.stock_quantity + delta;
  if delta < 0.0 && next < -QUANTITY_EPSILON && !allow_negative {
    warn!(
      product_id,
      available = product.stock_quantity,
      requested = -delta,
      "insufficient stock"
    );
    return Err(Error::InsufficientStock {
      product: product.name,
      available: product.stock_quantity,
      requested: -delta,
    });
  }
  journal(conn, product_id, next, delta, reason, reference, date)
}

/// Undoes what was journaled under `reference` with `reason`, product by
/// product, writing the opposite deltas as `compensation`. Works from the
/// journal rather than the products' current `track_stock` flag.
pub(crate) fn reverse(
  conn: &Connection,
  reference: &str,
  reason: MovementReason,
  compensation: MovementReason,
  date: NaiveDate,
) -> Result<()> {
  let mut stmt = conn.prepare_cached(
    "SELECT m.product_id, SUM(m.delta), p.stock_quantity
     FROM stock_movements m JOIN products p ON p.id = m.product_id
     WHERE m.reference = ?1 AND m.reason = ?2
     GROUP BY m.product_id ORDER BY m.product_id",
  )?;
  let moved = stmt
    .query_map(params![reference, reason], |row| {
      Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?, row.get::<_, f64>(2)?))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  drop(stmt);
  for (product_id, moved, current) in moved {
    if moved.abs() < QUANTITY_EPSILON {
      continue;
    }
    journal(conn, product_id, current - moved, -moved, compensation, reference, date)?;
  }
  Ok(())
}

fn journal(
  conn: &Connection,
  product_id: i64,
  next: f64,
  delta: f64,
  reason: MovementReason,
  reference: &str,
  date: NaiveDate,
) -> Result<()> {
  conn.execute(
    "UPDATE products SET stock_quantity = ?1, updated_at = datetime('now') WHERE id = ?2",
    params![next, product_id],
  )?;
  conn.execute(
    "INSERT INTO stock_movements (product_id, delta, reason, reference, date)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    params![product_id, delta, reason, reference, date],
  )?;
  debug!(product_id, delta, %reason, reference, "stock moved");
  Ok(())
}

pub fn movements(conn: &Connection, product_id: i64) -> Result<Vec<StockMovement>> {
  products::get(conn, product_id)?;
  let mut stmt = conn.prepare_cached(
    "SELECT id, product_id, delta, reason, reference, date, created_at
     FROM stock_movements WHERE product_id = ?1 ORDER BY id",
  )?;
  let rows = stmt.query_map([product_id], from_row)?;
  Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}
