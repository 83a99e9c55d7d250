//! Document lines shared by quotes, sales and invoices.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use super::products;
use super::settings::CompanySettings;
use crate::error::{Error, Result};
use crate::money::{DocumentTotals, LineAmounts, Money, Rate};

/// Upper bound for one line's quantity.
pub(crate) const MAX_QUANTITY: f64 = 1_000_000.0;
/// Upper bound for a unit price or cost: one hundred million dinars.
pub(crate) const MAX_UNIT_PRICE: Money = Money::from_dinars(100_000_000);

pub(crate) fn check_quantity(position: i64, quantity: f64) -> Result<()> {
  if !quantity.is_finite() || quantity <= 0.0 {
    return Err(Error::invalid(
      "quantité",
      format!("ligne {position} : la quantité doit être positive"),
    ));
  }
  if quantity > MAX_QUANTITY {
    return Err(Error::invalid(
      "quantité",
      format!("ligne {position} : la quantité dépasse {MAX_QUANTITY}"),
    ));
  }
  Ok(())
}

pub(crate) fn check_unit_price(field: &'static str, position: i64, price: Money) -> Result<()> {
  if price.is_negative() {
    return Err(Error::invalid(
      field,
      format!("ligne {position} : le prix ne peut pas être négatif"),
    ));
  }
  if price > MAX_UNIT_PRICE {
    return Err(Error::invalid(
      field,
      format!("ligne {position} : le prix dépasse {}", MAX_UNIT_PRICE.format_fr()),
    ));
  }
  Ok(())
}

/// A line as typed by the user. Fields left empty are taken from the
/// referenced product, then from the company defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineInput {
  #[serde(default)]
  pub product_id: Option<i64>,
  #[serde(default)]
  pub description: Option<String>,
  pub quantity: f64,
  #[serde(default)]
  pub unit_price: Option<Money>,
  #[serde(default)]
  pub discount_rate: Rate,
  #[serde(default)]
  pub tva_rate: Option<Rate>,
  #[serde(default)]
  pub fodec: Option<bool>,
}

impl LineInput {
  pub fn product(product_id: i64, quantity: f64) -> Self {
    Self {
      product_id: Some(product_id),
      quantity,
      ..Self::default()
    }
  }

  /// A line without catalogue product, such as a service or transport fee.
  pub fn free(description: impl Into<String>, quantity: f64, unit_price: Money) -> Self {
    Self {
      description: Some(description.into()),
      quantity,
      unit_price: Some(unit_price),
      ..Self::default()
    }
  }

  pub fn with_discount(mut self, discount_rate: Rate) -> Self {
    self.discount_rate = discount_rate;
    self
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
  pub position: i64,
  pub product_id: Option<i64>,
  pub description: String,
  pub quantity: f64,
  pub unit_price: Money,
  pub discount_rate: Rate,
  pub tva_rate: Rate,
  pub fodec: bool,
  pub amounts: LineAmounts,
}

impl Line {
  /// Same line priced with another FODEC rate.
  pub fn repriced(&self, fodec_rate: Rate) -> Result<Line> {
    Ok(Line {
      amounts: LineAmounts::compute(
        self.quantity,
        self.unit_price,
        self.discount_rate,
        self.tva_rate,
        self.fodec,
        fodec_rate,
      )?,
      ..self.clone()
    })
  }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum LineTable {
  Quote,
  Sale,
  Invoice,
}

impl LineTable {
  fn table(self) -> &'static str {
    match self {
      LineTable::Quote => "quote_items",
      LineTable::Sale => "sale_items",
      LineTable::Invoice => "invoice_items",
    }
  }

  fn parent_column(self) -> &'static str {
    match self {
      LineTable::Quote => "quote_id",
      LineTable::Sale => "sale_id",
      LineTable::Invoice => "invoice_id",
    }
  }
}

pub(crate) fn resolve(
  conn: &Connection,
  inputs: &[LineInput],
  settings: &CompanySettings,
) -> Result<Vec<Line>> {
  if inputs.is_empty() {
    return Err(Error::invalid("lignes", "le document doit contenir au moins une ligne"));
  }
  inputs
    .iter()
    .enumerate()
    .map(|(index, input)| resolve_one(conn, index as i64 + 1, input, settings))
    .collect()
}

fn resolve_one(
  conn: &Connection,
  position: i64,
  input: &LineInput,
  settings: &CompanySettings,
) -> Result<Line> {
  check_quantity(position, input.quantity)?;
  let discount_rate = input.discount_rate.validate("remise")?;
  let product = match input.product_id {
    Some(id) => Some(products::get(conn, id)?),
    None => None,
  };

  let description = input
    .description
    .as_deref()
    .map(str::trim)
    .filter(|text| !text.is_empty())
    .map(str::to_string)
    .or_else(|| product.as_ref().map(|p| p.name.clone()))
    .ok_or_else(|| Error::invalid("désignation", format!("ligne {position} : obligatoire")))?;

  let unit_price = input
    .unit_price
    .or_else(|| product.as_ref().map(|p| p.unit_price))
    .ok_or_else(|| {
      Error::invalid(
        "prix unitaire",
        format!("ligne {position} : obligatoire pour une ligne sans produit"),
      )
    })?;
  check_unit_price("prix unitaire", position, unit_price)?;

  let tva_rate = input
    .tva_rate
    .or_else(|| product.as_ref().map(|p| p.tva_rate))
    .unwrap_or(settings.default_tva_rate)
    .validate("taux de TVA")?;
  let fodec = input
    .fodec
    .or_else(|| product.as_ref().map(|p| p.fodec))
    .unwrap_or(false);

  Ok(Line {
    position,
    product_id: input.product_id,
    description,
    quantity: input.quantity,
    unit_price,
    discount_rate,
    tva_rate,
    fodec,
    amounts: LineAmounts::compute(
      input.quantity,
      unit_price,
      discount_rate,
      tva_rate,
      fodec,
      settings.fodec_rate,
    )?,
  })
}

pub(crate) fn totals(lines: &[Line], stamp: Money) -> Result<DocumentTotals> {
  DocumentTotals::from_lines(lines.iter().map(|line| (line.tva_rate, &line.amounts)), stamp)
}

pub(crate) fn insert(conn: &Connection, table: LineTable, parent_id: i64, lines: &[Line]) -> Result<()> {
  let sql = format!(
    "INSERT INTO {} ({}, position, product_id, description, quantity, unit_price, discount_rate,
                     tva_rate, fodec, gross, discount_amount, total_ht, fodec_amount, tva_amount,
                     total_ttc)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
    table.table(),
    table.parent_column()
  );
  let mut stmt = conn.prepare_cached(&sql)?;
  for line in lines {
    stmt.execute(params![
      parent_id,
      line.position,
      line.product_id,
      line.description,
      line.quantity,
      line.unit_price,
      line.discount_rate,
      line.tva_rate,
      line.fodec,
      line.amounts.gross,
      line.amounts.discount,
      line.amounts.total_ht,
      line.amounts.fodec,
      line.amounts.tva,
      line.amounts.total_ttc,
    ])?;
  }
  Ok(())
}

pub(crate) fn replace(conn: &Connection, table: LineTable, parent_id: i64, lines: &[Line]) -> Result<()> {
  let sql = format!("DELETE FROM {} WHERE {} = ?1", table.table(), table.parent_column());
  conn.execute(&sql, [parent_id])?;
  insert(conn, table, parent_id, lines)
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<Line> {
  Ok(Line {
    position: row.get("position")?,
    product_id: row.get("product_id")?,
    description: row.get("description")?,
    quantity: row.get("quantity")?,
    unit_price: row.get("unit_price")?,
    discount_rate: row.get("discount_rate")?,
    tva_rate: row.get("tva_rate")?,
    fodec: row.get("fodec")?,
    amounts: LineAmounts {
      gross: row.get("gross")?,
      discount: row.get("discount_amount")?,
      total_ht: row.get("total_ht")?,
      fodec: row.get("fodec_amount")?,
      tva: row.get("tva_amount")?,
      total_ttc: row.get("total_ttc")?,
    },
  })
}

pub(crate) fn load(conn: &Connection, table: LineTable, parent_id: i64) -> Result<Vec<Line>> {
  let sql = format!(
    "SELECT position, product_id, description, quantity, unit_price, discount_rate, tva_rate,
            fodec, gross, discount_amount, total_ht, fodec_amount, tva_amount, total_ttc
     FROM {} WHERE {} = ?1 ORDER BY position",
    table.table(),
    table.parent_column()
  );
  let mut stmt = conn.prepare_cached(&sql)?;
  let rows = stmt.query_map([parent_id], from_row)?;
  Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}
