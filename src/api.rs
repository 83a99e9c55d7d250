//! The surface the renderer calls, one method per IPC command.
//!
//! Each method picks a read or a write transaction, runs the store
//! function and turns any error into an [`ApiError`] carrying a stable code
//! and a French message. Raw SQL errors never cross this boundary.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::{error, warn};

use crate::backup;
use crate::convert::{self, Conversion};
use crate::db::Database;
use crate::documents::{self, PrintableDocument};
use crate::error::Error;
use crate::model::{DocumentKind, QuoteStatus};
use crate::money::Money;
use crate::numbering;
use crate::store::dashboard::{self, Summary};
use crate::store::invoices::{self, Invoice, InvoiceFilter, InvoiceSummary};
use crate::store::parties::{Party, PartyInput};
use crate::store::payments::{self, NewPayment, Payment};
use crate::store::products::{self, Product, ProductInput};
use crate::store::quotes::{self, NewQuote, Quote, QuoteFilter, QuoteSummary};
use crate::store::sales::{self, NewSale, Sale, SaleFilter, SaleSummary};
use crate::store::settings::{self, CompanySettings};
use crate::store::stock::{self, StockMovement};
use crate::store::supplier_orders::{self, NewSupplierOrder, SupplierOrder, SupplierOrderFilter};
use crate::store::{clients, suppliers};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
  pub code: &'static str,
  pub message: String,
}

impl fmt::Display for ApiError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} ({})", self.message, self.code)
  }
}

impl std::error::Error for ApiError {}

impl From<Error> for ApiError {
  fn from(err: Error) -> Self {
    if err.is_internal() {
      error!(code = err.code(), error = %err, "command failed");
    } else {
      warn!(code = err.code(), error = %err, "command refused");
    }
    ApiError {
      code: err.code(),
      message: err.user_message(),
    }
  }
}

pub type ApiResult<T> = Result<T, ApiError>;

pub struct Api {
  db: Database,
  backup_dir: PathBuf,
}

impl Api {
  pub fn new(db: Database, backup_dir: impl Into<PathBuf>) -> Self {
    Self {
      db,
      backup_dir: backup_dir.into(),
    }
  }

  pub fn database(&self) -> &Database {
    &self.db
  }

  fn today() -> NaiveDate {
    Local::now().date_naive()
  }

  // Settings

  pub fn get_settings(&self) -> ApiResult<CompanySettings> {
    Ok(self.db.read(settings::get)?)
  }

  pub fn update_settings(&self, input: &CompanySettings) -> ApiResult<CompanySettings> {
    Ok(self.db.write(|conn| settings::update(conn, input))?)
  }

  // Clients

  pub fn create_client(&self, input: &PartyInput) -> ApiResult<Party> {
    Ok(self.db.write(|conn| clients::create(conn, input))?)
  }

  pub fn update_client(&self, id: i64, input: &PartyInput) -> ApiResult<Party> {
    Ok(self.db.write(|conn| clients::update(conn, id, input))?)
  }

  pub fn get_client(&self, id: i64) -> ApiResult<Party> {
    Ok(self.db.read(|conn| clients::get(conn, id))?)
  }

  pub fn list_clients(&self, search: Option<&str>) -> ApiResult<Vec<Party>> {
    Ok(self.db.read(|conn| clients::list(conn, search))?)
  }

  pub fn delete_client(&self, id: i64) -> ApiResult<()> {
    Ok(self.db.write(|conn| clients::delete(conn, id))?)
  }

  pub fn client_balance(&self, id: i64) -> ApiResult<Money> {
    Ok(self.db.read(|conn| clients::balance(conn, id))?)
  }

  // Suppliers

  pub fn create_supplier(&self, input: &PartyInput) -> ApiResult<Party> {
    Ok(self.db.write(|conn| suppliers::create(conn, input))?)
  }

  pub fn update_supplier(&self, id: i64, input: &PartyInput) -> ApiResult<Party> {
    Ok(self.db.write(|conn| suppliers::update(conn, id, input))?)
  }

  pub fn get_supplier(&self, id: i64) -> ApiResult<Party> {
    Ok(self.db.read(|conn| suppliers::get(conn, id))?)
  }

  pub fn list_suppliers(&self, search: Option<&str>) -> ApiResult<Vec<Party>> {
    Ok(self.db.read(|conn| suppliers::list(conn, search))?)
  }

  pub fn delete_supplier(&self, id: i64) -> ApiResult<()> {
    Ok(self.db.write(|conn| suppliers::delete(conn, id))?)
  }

  // Products and stock

  pub fn create_product(&self, input: &ProductInput) -> ApiResult<Product> {
    let today = Self::today();
    Ok(self.db.write(|conn| products::create(conn, input, today))?)
  }

  pub fn update_product(&self, id: i64, input: &ProductInput) -> ApiResult<Product> {
    Ok(self.db.write(|conn| products::update(conn, id, input))?)
  }

  pub fn get_product(&self, id: i64) -> ApiResult<Product> {
    Ok(self.db.read(|conn| products::get(conn, id))?)
  }

  pub fn list_products(&self, search: Option<&str>) -> ApiResult<Vec<Product>> {
    Ok(self.db.read(|conn| products::list(conn, search))?)
  }

  pub fn delete_product(&self, id: i64) -> ApiResult<()> {
    Ok(self.db.write(|conn| products::delete(conn, id))?)
  }

  pub fn low_stock_products(&self) -> ApiResult<Vec<Product>> {
    Ok(self.db.read(products::low_stock)?)
  }

  pub fn adjust_stock(&self, id: i64, delta: f64, note: &str) -> ApiResult<Product> {
    let today = Self::today();
    Ok(self.db.write(|conn| products::adjust_stock(conn, id, delta, note, today))?)
  }

  pub fn stock_movements(&self, product_id: i64) -> ApiResult<Vec<StockMovement>> {
    Ok(self.db.read(|conn| stock::movements(conn, product_id))?)
  }

  // Quotes

  pub fn create_quote(&self, input: &NewQuote) -> ApiResult<Quote> {
    Ok(self.db.write(|conn| quotes::create(conn, input))?)
  }

  pub fn update_quote(&self, id: i64, input: &NewQuote) -> ApiResult<Quote> {
    Ok(self.db.write(|conn| quotes::update(conn, id, input))?)
  }

  pub fn set_quote_status(&self, id: i64, status: QuoteStatus) -> ApiResult<Quote> {
    Ok(self.db.write(|conn| quotes::set_status(conn, id, status))?)
  }

  pub fn get_quote(&self, id: i64) -> ApiResult<Quote> {
    Ok(self.db.read(|conn| quotes::get(conn, id))?)
  }

  pub fn list_quotes(&self, filter: &QuoteFilter) -> ApiResult<Vec<QuoteSummary>> {
    Ok(self.db.read(|conn| quotes::list(conn, filter))?)
  }

  pub fn delete_quote(&self, id: i64) -> ApiResult<()> {
    Ok(self.db.write(|conn| quotes::delete(conn, id))?)
  }

  /// Invoices the quote on `date`, today when not given.
  pub fn convert_quote(&self, id: i64, date: Option<NaiveDate>) -> ApiResult<Conversion> {
    let date = date.unwrap_or_else(Self::today);
    Ok(self.db.write(|conn| convert::convert_quote(conn, id, date))?)
  }

  // Sales

  pub fn create_sale(&self, input: &NewSale) -> ApiResult<Sale> {
    Ok(self.db.write(|conn| sales::create(conn, input))?)
  }

  pub fn cancel_sale(&self, id: i64) -> ApiResult<Sale> {
    let today = Self::today();
    Ok(self.db.write(|conn| sales::cancel(conn, id, today))?)
  }

  pub fn get_sale(&self, id: i64) -> ApiResult<Sale> {
    Ok(self.db.read(|conn| sales::get(conn, id))?)
  }

  pub fn list_sales(&self, filter: &SaleFilter) -> ApiResult<Vec<SaleSummary>> {
    Ok(self.db.read(|conn| sales::list(conn, filter))?)
  }

  pub fn invoice_sale(&self, sale_id: i64) -> ApiResult<Invoice> {
    Ok(self.db.write(|conn| invoices::invoice_sale(conn, sale_id))?)
  }

  // Invoices and payments

  pub fn get_invoice(&self, id: i64) -> ApiResult<Invoice> {
    Ok(self.db.read(|conn| invoices::get(conn, id))?)
  }

  pub fn find_invoice_by_number(&self, number: &str) -> ApiResult<Option<Invoice>> {
    Ok(self.db.read(|conn| invoices::find_by_number(conn, number))?)
  }

  pub fn list_invoices(&self, filter: &InvoiceFilter) -> ApiResult<Vec<InvoiceSummary>> {
    Ok(self.db.read(|conn| invoices::list(conn, filter))?)
  }

  pub fn cancel_invoice(&self, id: i64) -> ApiResult<Invoice> {
    Ok(self.db.write(|conn| invoices::cancel(conn, id))?)
  }

  pub fn record_payment(&self, input: &NewPayment) -> ApiResult<Payment> {
    Ok(self.db.write(|conn| payments::record(conn, input))?)
  }

  pub fn delete_payment(&self, id: i64) -> ApiResult<()> {
    Ok(self.db.write(|conn| payments::delete(conn, id))?)
  }

  pub fn list_payments(&self, invoice_id: i64) -> ApiResult<Vec<Payment>> {
    Ok(self.db.read(|conn| payments::list_for_invoice(conn, invoice_id))?)
  }

  // Supplier orders

  pub fn create_supplier_order(&self, input: &NewSupplierOrder) -> ApiResult<SupplierOrder> {
    Ok(self.db.write(|conn| supplier_orders::create(conn, input))?)
  }

  pub fn receive_supplier_order(&self, id: i64, date: Option<NaiveDate>) -> ApiResult<SupplierOrder> {
    let date = date.unwrap_or_else(Self::today);
    Ok(self.db.write(|conn| supplier_orders::receive(conn, id, date))?)
  }

  pub fn cancel_supplier_order(&self, id: i64) -> ApiResult<SupplierOrder> {
    Ok(self.db.write(|conn| supplier_orders::cancel(conn, id))?)
  }

  pub fn get_supplier_order(&self, id: i64) -> ApiResult<SupplierOrder> {
    Ok(self.db.read(|conn| supplier_orders::get(conn, id))?)
  }

  pub fn list_supplier_orders(&self, filter: &SupplierOrderFilter) -> ApiResult<Vec<SupplierOrder>> {
    Ok(self.db.read(|conn| supplier_orders::list(conn, filter))?)
  }

  // Reporting and documents

  pub fn summary(&self, from: NaiveDate, to: NaiveDate) -> ApiResult<Summary> {
    let today = Self::today();
    Ok(self.db.read(|conn| dashboard::summary(conn, from, to, today))?)
  }

  pub fn next_number(&self, kind: DocumentKind) -> ApiResult<String> {
    let today = Self::today();
    Ok(self.db.read(|conn| numbering::peek_number(conn, kind, today))?)
  }

  pub fn printable(&self, kind: DocumentKind, id: i64) -> ApiResult<PrintableDocument> {
    Ok(self.db.read(|conn| match kind {
      DocumentKind::Invoice => documents::invoice(conn, id),
      DocumentKind::Quote => documents::quote(conn, id),
      DocumentKind::Sale => documents::sale_receipt(conn, id),
      DocumentKind::Payment => documents::payment_receipt(conn, id),
      DocumentKind::SupplierOrder => documents::supplier_order(conn, id),
    })?)
  }

  // Backup

  pub fn export_database(&self, dest: &Path) -> ApiResult<()> {
    Ok(backup::export(&self.db, dest)?)
  }

  /// Returns where the pre-import safety copy was written.
  pub fn import_database(&self, src: &Path) -> ApiResult<PathBuf> {
    Ok(backup::import(&self.db, src, &self.backup_dir)?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::Entity;

  #[test]
  fn internal_errors_hide_their_details() {
    let err: ApiError = Error::Io(std::io::Error::new(
      std::io::ErrorKind::PermissionDenied,
      "/var/lib/comptoir/comptoir.sqlite",
    ))
    .into();
    assert_eq!(err.code, "io");
    assert_eq!(err.message, "Erreur d'accès au fichier.");
  }

  #[test]
  fn lookups_go_through_the_store() {
    let api = Api::new(Database::open_in_memory().unwrap(), "backups");
    assert_eq!(api.get_settings().unwrap().currency, "TND");
    let err = api.get_quote(7).unwrap_err();
    assert_eq!(err, ApiError::from(Error::not_found(Entity::Quote, 7)));
  }
}
