use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{lines, products, stock, suppliers};
use crate::error::{Entity, Error, Result};
use crate::model::{DocumentKind, MovementReason, SupplierOrderStatus};
use crate::money::Money;
use crate::numbering;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLineInput {
  pub product_id: i64,
  pub quantity: f64,
  /// Defaults to the product's last purchase price.
  #[serde(default)]
  pub unit_cost: Option<Money>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSupplierOrder {
  pub supplier_id: i64,
  pub date: NaiveDate,
  #[serde(default)]
  pub expected_date: Option<NaiveDate>,
  #[serde(default)]
  pub notes: String,
  pub items: Vec<OrderLineInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
  pub position: i64,
  pub product_id: i64,
  pub product_reference: String,
  pub product_name: String,
  pub quantity: f64,
  pub unit_cost: Money,
  pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierOrder {
  pub id: i64,
  pub number: String,
  pub supplier_id: i64,
  pub supplier_name: String,
  pub date: NaiveDate,
  pub expected_date: Option<NaiveDate>,
  pub status: SupplierOrderStatus,
  pub total: Money,
  pub received_on: Option<NaiveDate>,
  pub notes: String,
  pub created_at: String,
  pub items: Vec<OrderLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupplierOrderFilter {
  pub status: Option<SupplierOrderStatus>,
  pub supplier_id: Option<i64>,
}

pub fn create(conn: &Connection, input: &NewSupplierOrder) -> Result<SupplierOrder> {
  suppliers::get(conn, input.supplier_id)?;
  if input.items.is_empty() {
    return Err(Error::invalid("lignes", "la commande doit contenir au moins une ligne"));
  }
  if matches!(input.expected_date, Some(expected) if expected < input.date) {
    return Err(Error::invalid("date de livraison", "précède la date de commande"));
  }

  let mut priced = Vec::with_capacity(input.items.len());
  let mut total = Money::ZERO;
  for (index, item) in input.items.iter().enumerate() {
    let position = index as i64 + 1;
    lines::check_quantity(position, item.quantity)?;
    let product = products::get(conn, item.product_id)?;
    let unit_cost = item.unit_cost.unwrap_or(product.purchase_price);
    lines::check_unit_price("coût unitaire", position, unit_cost)?;
    let line_total = unit_cost
      .checked_times(item.quantity)
      .and_then(|line_total| total.checked_add(line_total).map(|sum| (line_total, sum)));
    let Some((line_total, sum)) = line_total else {
      return Err(Error::invalid("montant", "le montant dépasse la capacité de calcul"));
    };
    total = sum;
    priced.push((position, item, unit_cost, line_total));
  }

  let number = numbering::next_number(conn, DocumentKind::SupplierOrder, input.date)?;
  conn.execute(
    "INSERT INTO supplier_orders (number, supplier_id, date, expected_date, status, total, notes)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    params![
      number,
      input.supplier_id,
      input.date,
      input.expected_date,
      SupplierOrderStatus::Pending,
      total,
      input.notes.trim(),
    ],
  )?;
  let id = conn.last_insert_rowid();
  let mut stmt = conn.prepare_cached(
    "INSERT INTO supplier_order_items (order_id, position, product_id, quantity, unit_cost, total)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
  )?;
  for (position, item, unit_cost, line_total) in &priced {
    stmt.execute(params![
      id,
      position,
      item.product_id,
      item.quantity,
      unit_cost,
      line_total
    ])?;
  }
  drop(stmt);
  info!(id, %number, total = %total, "supplier order created");
  get(conn, id)
}

/// Books the delivery: stock goes up and each product's purchase price
/// follows the cost on the order.
pub fn receive(conn: &Connection, id: i64, date: NaiveDate) -> Result<SupplierOrder> {
  let order = get(conn, id)?;
  if order.status != SupplierOrderStatus::Pending {
    return Err(Error::InvalidTransition {
      entity: Entity::SupplierOrder,
      from: order.status.to_string(),
      to: SupplierOrderStatus::Received.to_string(),
    });
  }
  for line in &order.items {
    stock::apply(
      conn,
      line.product_id,
      line.quantity,
      MovementReason::Purchase,
      &order.number,
      date,
      true,
    )?;
    conn.execute(
      "UPDATE products SET purchase_price = ?1, updated_at = datetime('now') WHERE id = ?2",
      params![line.unit_cost, line.product_id],
    )?;
  }
  conn.execute(
    "UPDATE supplier_orders SET status = ?1, received_on = ?2 WHERE id = ?3",
    params![SupplierOrderStatus::Received, date, id],
  )?;
  info!(id, number = %order.number, "supplier order received");
  get(conn, id)
}

pub fn cancel(conn: &Connection, id: i64) -> Result<SupplierOrder> {
  let order = get(conn, id)?;
  if order.status != SupplierOrderStatus::Pending {
    return Err(Error::InvalidTransition {
      entity: Entity::SupplierOrder,
      from: order.status.to_string(),
      to: SupplierOrderStatus::Cancelled.to_string(),
    });
  }
  conn.execute(
    "UPDATE supplier_orders SET status = ?1 WHERE id = ?2",
    params![SupplierOrderStatus::Cancelled, id],
  )?;
  info!(id, number = %order.number, "supplier order cancelled");
  get(conn, id)
}

const HEADER: &str = "SELECT o.id, o.number, o.supplier_id, s.name AS supplier_name, o.date,
  o.expected_date, o.status, o.total, o.received_on, o.notes, o.created_at
  FROM supplier_orders o JOIN suppliers s ON s.id = o.supplier_id";

fn header_from_row(row: &Row<'_>) -> rusqlite::Result<SupplierOrder> {
  Ok(SupplierOrder {
    id: row.get("id")?,
    number: row.get("number")?,
    supplier_id: row.get("supplier_id")?,
    supplier_name: row.get("supplier_name")?,
    date: row.get("date")?,
    expected_date: row.get("expected_date")?,
    status: row.get("status")?,
    total: row.get("total")?,
    received_on: row.get("received_on")?,
    notes: row.get("notes")?,
    created_at: row.get("created_at")?,
    items: Vec::new(),
  })
}

fn load_lines(conn: &Connection, order_id: i64) -> Result<Vec<OrderLine>> {
  let mut stmt = conn.prepare_cached(
    "SELECT l.position, l.product_id, p.reference, p.name, l.quantity, l.unit_cost, l.total
     FROM supplier_order_items l JOIN products p ON p.id = l.product_id
     WHERE l.order_id = ?1 ORDER BY l.position",
  )?;
  let rows = stmt.query_map([order_id], |row| {
    Ok(OrderLine {
      position: row.get(0)?,
      product_id: row.get(1)?,
      product_reference: row.get(2)?,
      product_name: row.get(3)?,
      quantity: row.get(4)?,
      unit_cost: row.get(5)?,
      total: row.get(6)?,
    })
  })?;
  Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn find(conn: &Connection, id: i64) -> Result<Option<SupplierOrder>> {
  let sql = format!("{HEADER} WHERE o.id = ?1");
  let Some(mut order) = conn.query_row(&sql, [id], header_from_row).optional()? else {
    return Ok(None);
  };
  order.items = load_lines(conn, id)?;
  Ok(Some(order))
}

pub fn get(conn: &Connection, id: i64) -> Result<SupplierOrder> {
  find(conn, id)?.ok_or_else(|| Error::not_found(Entity::SupplierOrder, id))
}

pub fn list(conn: &Connection, filter: &SupplierOrderFilter) -> Result<Vec<SupplierOrder>> {
  let sql = format!(
    "{HEADER} WHERE (?1 IS NULL OR o.status = ?1) AND (?2 IS NULL OR o.supplier_id = ?2)
     ORDER BY o.date DESC, o.id DESC"
  );
  let mut stmt = conn.prepare_cached(&sql)?;
  let rows = stmt.query_map(params![filter.status, filter.supplier_id], header_from_row)?;
  Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::Database;
  use crate::store::parties::PartyInput;
  use crate::store::products::ProductInput;

  fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, d).unwrap()
  }

  #[test]
  fn receiving_restocks_and_updates_costs() {
    let db = Database::open_in_memory().unwrap();
    let (supplier, product) = db
      .write(|conn| {
        let supplier = suppliers::create(conn, &PartyInput::named("Bois du Nord"))?;
        let product = products::create(
          conn,
          &ProductInput {
            purchase_price: Money::from_dinars(30),
            initial_stock: 1.0,
            ..ProductInput::new("PL-18", "Panneau 18 mm", Money::from_dinars(55))
          },
          date(1),
        )?;
        Ok((supplier, product))
      })
      .unwrap();

    let order = db
      .write(|conn| {
        create(
          conn,
          &NewSupplierOrder {
            supplier_id: supplier.id,
            date: date(2),
            expected_date: Some(date(9)),
            notes: String::new(),
            items: vec![OrderLineInput {
              product_id: product.id,
              quantity: 10.0,
              unit_cost: Some(Money::from_dinars(28)),
            }],
          },
        )
      })
      .unwrap();
    assert_eq!(order.number, "BC-2026-0001");
    assert_eq!(order.total, Money::from_dinars(280));
    assert_eq!(order.items[0].product_name, "Panneau 18 mm");

    let received = db.write(|conn| receive(conn, order.id, date(8))).unwrap();
    assert_eq!(received.status, SupplierOrderStatus::Received);
    assert_eq!(received.received_on, Some(date(8)));

    let product = db.read(|conn| products::get(conn, product.id)).unwrap();
    assert_eq!(product.stock_quantity, 11.0);
    assert_eq!(product.purchase_price, Money::from_dinars(28));

    let err = db.write(|conn| cancel(conn, order.id)).unwrap_err();
    assert_eq!(err.code(), "invalid_transition");
  }
}
