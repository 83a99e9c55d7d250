use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{settings, stock};
use crate::error::{Entity, Error, Result};
use crate::model::MovementReason;
use crate::money::{Money, Rate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
  pub id: i64,
  pub reference: String,
  pub name: String,
  pub description: String,
  pub unit_price: Money,
  pub purchase_price: Money,
  pub tva_rate: Rate,
  pub fodec: bool,
  pub track_stock: bool,
  pub stock_quantity: f64,
  pub alert_threshold: f64,
  pub created_at: String,
  pub updated_at: String,
}

impl Product {
  pub fn is_low_on_stock(&self) -> bool {
    self.track_stock && self.stock_quantity <= self.alert_threshold
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInput {
  pub reference: String,
  pub name: String,
  #[serde(default)]
  pub description: String,
  pub unit_price: Money,
  #[serde(default)]
  pub purchase_price: Money,
  /// Falls back to the company's default TVA rate.
  #[serde(default)]
  pub tva_rate: Option<Rate>,
  #[serde(default)]
  pub fodec: bool,
  #[serde(default = "default_track_stock")]
  pub track_stock: bool,
  /// Only read on creation; later changes go through `adjust_stock`.
  #[serde(default)]
  pub initial_stock: f64,
  #[serde(default)]
  pub alert_threshold: f64,
}

fn default_track_stock() -> bool {
  true
}

impl ProductInput {
  pub fn new(reference: impl Into<String>, name: impl Into<String>, unit_price: Money) -> Self {
    Self {
      reference: reference.into(),
      name: name.into(),
      description: String::new(),
      unit_price,
      purchase_price: Money::ZERO,
      tva_rate: None,
      fodec: false,
      track_stock: true,
      initial_stock: 0.0,
      alert_threshold: 0.0,
    }
  }

  fn validate(&self) -> Result<()> {
    if self.reference.trim().is_empty() {
      return Err(Error::invalid("référence", "obligatoire"));
    }
    if self.name.trim().is_empty() {
      return Err(Error::invalid("désignation", "obligatoire"));
    }
    if self.unit_price.is_negative() || self.purchase_price.is_negative() {
      return Err(Error::invalid("prix", "le prix ne peut pas être négatif"));
    }
    if let Some(rate) = self.tva_rate {
      rate.validate("taux de TVA")?;
    }
    if !self.initial_stock.is_finite() || !self.alert_threshold.is_finite() || self.alert_threshold < 0.0 {
      return Err(Error::invalid("stock", "quantité invalide"));
    }
    Ok(())
  }
}

const COLUMNS: &str = "id, reference, name, description, unit_price, purchase_price, tva_rate, fodec,
  track_stock, stock_quantity, alert_threshold, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
  Ok(Product {
    id: row.get("id")?,
    reference: row.get("reference")?,
    name: row.get("name")?,
    description: row.get("description")?,
    unit_price: row.get("unit_price")?,
    purchase_price: row.get("purchase_price")?,
    tva_rate: row.get("tva_rate")?,
    fodec: row.get("fodec")?,
    track_stock: row.get("track_stock")?,
    stock_quantity: row.get("stock_quantity")?,
    alert_threshold: row.get("alert_threshold")?,
    created_at: row.get("created_at")?,
    updated_at: row.get("updated_at")?,
  })
}

pub fn create(conn: &Connection, input: &ProductInput, today: NaiveDate) -> Result<Product> {
  input.validate()?;
  let tva_rate = match input.tva_rate {
    Some(rate) => rate,
    None => settings::get(conn)?.default_tva_rate,
  };
  conn.execute(
    "INSERT INTO products (reference, name, description, unit_price, purchase_price, tva_rate,
                           fodec, track_stock, alert_threshold)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    params![
      input.reference.trim(),
      input.name.trim(),
      input.description.trim(),
      input.unit_price,
      input.purchase_price,
      tva_rate,
      input.fodec,
      input.track_stock,
      input.alert_threshold,
    ],
  )?;
  let id = conn.last_insert_rowid();
  if input.initial_stock != 0.0 {
    stock::apply(conn, id, input.initial_stock, MovementReason::Initial, "", today, true)?;
  }
  info!(id, reference = input.reference.trim(), "product created");
  get(conn, id)
}

pub fn update(conn: &Connection, id: i64, input: &ProductInput) -> Result<Product> {
  input.validate()?;
  let current = get(conn, id)?;
  let tva_rate = input.tva_rate.unwrap_or(current.tva_rate);
  conn.execute(
    "UPDATE products SET reference = ?1, name = ?2, description = ?3, unit_price = ?4,
       purchase_price = ?5, tva_rate = ?6, fodec = ?7, track_stock = ?8, alert_threshold = ?9,
       updated_at = datetime('now')
     WHERE id = ?10",
    params![
      input.reference.trim(),
      input.name.trim(),
      input.description.trim(),
      input.unit_price,
      input.purchase_price,
      tva_rate,
      input.fodec,
      input.track_stock,
      input.alert_threshold,
      id,
    ],
  )?;
  get(conn, id)
}

pub fn find(conn: &Connection, id: i64) -> Result<Option<Product>> {
  let sql = format!("SELECT {COLUMNS} FROM products WHERE id = ?1");
  Ok(conn.query_row(&sql, [id], from_row).optional()?)
}

pub fn get(conn: &Connection, id: i64) -> Result<Product> {
  find(conn, id)?.ok_or_else(|| Error::not_found(Entity::Product, id))
}

pub fn list(conn: &Connection, search: Option<&str>) -> Result<Vec<Product>> {
  let pattern = format!("%{}%", search.unwrap_or("").trim());
  let sql = format!(
    "SELECT {COLUMNS} FROM products
     WHERE reference LIKE ?1 OR name LIKE ?1 OR description LIKE ?1
     ORDER BY name COLLATE NOCASE, id"
  );
  let mut stmt = conn.prepare_cached(&sql)?;
  let rows = stmt.query_map([pattern], from_row)?;
  Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Tracked products at or below their alert threshold, emptiest first.
pub fn low_stock(conn: &Connection) -> Result<Vec<Product>> {
  let sql = format!(
    "SELECT {COLUMNS} FROM products
     WHERE track_stock = 1 AND stock_quantity <= alert_threshold
     ORDER BY stock_quantity, name COLLATE NOCASE"
  );
  let mut stmt = conn.prepare_cached(&sql)?;
  let rows = stmt.query_map([], from_row)?;
  Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Manual correction after an inventory count. Allowed to go negative only
/// when the company settings allow it.
pub fn adjust_stock(
  conn: &Connection,
  id: i64,
  delta: f64,
  note: &str,
  date: NaiveDate,
) -> Result<Product> {
  if !delta.is_finite() || delta == 0.0 {
    return Err(Error::invalid("quantité", "la correction doit être non nulle"));
  }
  let product = get(conn, id)?;
  if !product.track_stock {
    return Err(Error::invalid("stock", "ce produit ne gère pas de stock"));
  }
  let allow_negative = settings::get(conn)?.allow_negative_stock;
  stock::apply(conn, id, delta, MovementReason::Adjustment, note.trim(), date, allow_negative)?;
  info!(id, delta, "stock adjusted");
  get(conn, id)
}

/// Refused with `in_use` once the product appears on a document.
pub fn delete(conn: &Connection, id: i64) -> Result<()> {
  let changed = conn.execute("DELETE FROM products WHERE id = ?1", [id])?;
  if changed == 0 {
    return Err(Error::not_found(Entity::Product, id));
  }
  info!(id, "product deleted");
  Ok(())
}
