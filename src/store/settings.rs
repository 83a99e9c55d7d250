use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::money::{Money, Rate};

/// Company identity and the business rules applied to new documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanySettings {
  pub name: String,
  pub address: String,
  pub phone: String,
  pub email: String,
  /// Matricule fiscal printed on every document.
  pub tax_id: String,
  pub currency: String,
  pub default_tva_rate: Rate,
  pub fodec_rate: Rate,
  /// Timbre fiscal added to each invoice.
  pub stamp_duty: Money,
  pub payment_terms_days: u32,
  pub quote_validity_days: u32,
  pub allow_negative_stock: bool,
}

impl Default for CompanySettings {
  fn default() -> Self {
    Self {
      name: String::new(),
      address: String::new(),
      phone: String::new(),
      email: String::new(),
      tax_id: String::new(),
      currency: "TND".to_string(),
      default_tva_rate: Rate::from_percent(19),
      fodec_rate: Rate::from_percent(1),
      stamp_duty: Money::from_millimes(1_000),
      payment_terms_days: 30,
      quote_validity_days: 30,
      allow_negative_stock: false,
    }
  }
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<CompanySettings> {
  Ok(CompanySettings {
    name: row.get("name")?,
    address: row.get("address")?,
    phone: row.get("phone")?,
    email: row.get("email")?,
    tax_id: row.get("tax_id")?,
    currency: row.get("currency")?,
    default_tva_rate: row.get("default_tva_rate")?,
    fodec_rate: row.get("fodec_rate")?,
    stamp_duty: row.get("stamp_duty")?,
    payment_terms_days: row.get("payment_terms_days")?,
    quote_validity_days: row.get("quote_validity_days")?,
    allow_negative_stock: row.get("allow_negative_stock")?,
  })
}

pub fn get(conn: &Connection) -> Result<CompanySettings> {
  let settings = conn.query_row(
    "SELECT name, address, phone, email, tax_id, currency, default_tva_rate, fodec_rate,
            stamp_duty, payment_terms_days, quote_validity_days, allow_negative_stock
     FROM company_settings WHERE id = 1",
    [],
    from_row,
  )?;
  Ok(settings)
}

pub fn update(conn: &Connection, settings: &CompanySettings) -> Result<CompanySettings> {
  settings.default_tva_rate.validate("taux de TVA par défaut")?;
  settings.fodec_rate.validate("taux FODEC")?;
  if settings.stamp_duty.is_negative() {
    return Err(Error::invalid("timbre fiscal", "le montant ne peut pas être négatif"));
  }
  if settings.currency.trim().is_empty() {
    return Err(Error::invalid("devise", "obligatoire"));
  }
  conn.execute(
    "UPDATE company_settings SET
       name = ?1, address = ?2, phone = ?3, email = ?4, tax_id = ?5, currency = ?6,
       default_tva_rate = ?7, fodec_rate = ?8, stamp_duty = ?9, payment_terms_days = ?10,
       quote_validity_days = ?11, allow_negative_stock = ?12, updated_at = datetime('now')
     WHERE id = 1",
    params![
      settings.name.trim(),
      settings.address.trim(),
      settings.phone.trim(),
      settings.email.trim(),
      settings.tax_id.trim(),
      settings.currency.trim(),
      settings.default_tva_rate,
      settings.fodec_rate,
      settings.stamp_duty,
      settings.payment_terms_days,
      settings.quote_validity_days,
      settings.allow_negative_stock,
    ],
  )?;
  info!(fodec = %settings.fodec_rate, stamp = %settings.stamp_duty, "company settings updated");
  get(conn)
}
