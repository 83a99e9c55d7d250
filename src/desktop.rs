//! Tauri shell: one command per [`Api`] method.
//!
//! Commands are synchronous; the database is a local file behind a single
//! mutex and every call finishes in milliseconds.

use std::path::PathBuf;

use chrono::NaiveDate;
use tauri::{Manager, State};
use tracing::info;

use crate::api::{Api, ApiResult};
use crate::config::Config;
use crate::convert::Conversion;
use crate::db::Database;
use crate::documents::PrintableDocument;
use crate::logging;
use crate::model::{DocumentKind, QuoteStatus};
use crate::money::Money;
use crate::store::dashboard::Summary;
use crate::store::invoices::{Invoice, InvoiceFilter, InvoiceSummary};
use crate::store::parties::{Party, PartyInput};
use crate::store::payments::{NewPayment, Payment};
use crate::store::products::{Product, ProductInput};
use crate::store::quotes::{NewQuote, Quote, QuoteFilter, QuoteSummary};
use crate::store::sales::{NewSale, Sale, SaleFilter, SaleSummary};
use crate::store::settings::CompanySettings;
use crate::store::stock::StockMovement;
use crate::store::supplier_orders::{NewSupplierOrder, SupplierOrder, SupplierOrderFilter};

#[tauri::command]
fn get_settings(api: State<'_, Api>) -> ApiResult<CompanySettings> {
  api.get_settings()
}

#[tauri::command]
fn update_settings(api: State<'_, Api>, settings: CompanySettings) -> ApiResult<CompanySettings> {
  api.update_settings(&settings)
}

#[tauri::command]
fn create_client(api: State<'_, Api>, input: PartyInput) -> ApiResult<Party> {
  api.create_client(&input)
}

#[tauri::command]
fn update_client(api: State<'_, Api>, id: i64, input: PartyInput) -> ApiResult<Party> {
  api.update_client(id, &input)
}

#[tauri::command]
fn get_client(api: State<'_, Api>, id: i64) -> ApiResult<Party> {
  api.get_client(id)
}

#[tauri::command]
fn list_clients(api: State<'_, Api>, search: Option<String>) -> ApiResult<Vec<Party>> {
  api.list_clients(search.as_deref())
}

#[tauri::command]
fn delete_client(api: State<'_, Api>, id: i64) -> ApiResult<()> {
  api.delete_client(id)
}

#[tauri::command]
fn client_balance(api: State<'_, Api>, id: i64) -> ApiResult<Money> {
  api.client_balance(id)
}

#[tauri::command]
fn create_supplier(api: State<'_, Api>, input: PartyInput) -> ApiResult<Party> {
  api.create_supplier(&input)
}

#[tauri::command]
fn update_supplier(api: State<'_, Api>, id: i64, input: PartyInput) -> ApiResult<Party> {
  api.update_supplier(id, &input)
}

#[tauri::command]
fn get_supplier(api: State<'_, Api>, id: i64) -> ApiResult<Party> {
  api.get_supplier(id)
}

#[tauri::command]
fn list_suppliers(api: State<'_, Api>, search: Option<String>) -> ApiResult<Vec<Party>> {
  api.list_suppliers(search.as_deref())
}

#[tauri::command]
fn delete_supplier(api: State<'_, Api>, id: i64) -> ApiResult<()> {
  api.delete_supplier(id)
}

#[tauri::command]
fn create_product(api: State<'_, Api>, input: ProductInput) -> ApiResult<Product> {
  api.create_product(&input)
}

#[tauri::command]
fn update_product(api: State<'_, Api>, id: i64, input: ProductInput) -> ApiResult<Product> {
  api.update_product(id, &input)
}

#[tauri::command]
fn get_product(api: State<'_, Api>, id: i64) -> ApiResult<Product> {
  api.get_product(id)
}

#[tauri::command]
fn list_products(api: State<'_, Api>, search: Option<String>) -> ApiResult<Vec<Product>> {
  api.list_products(search.as_deref())
}

#[tauri::command]
fn delete_product(api: State<'_, Api>, id: i64) -> ApiResult<()> {
  api.delete_product(id)
}

#[tauri::command]
fn low_stock_products(api: State<'_, Api>) -> ApiResult<Vec<Product>> {
  api.low_stock_products()
}

#[tauri::command]
fn adjust_stock(api: State<'_, Api>, id: i64, delta: f64, note: String) -> ApiResult<Product> {
  api.adjust_stock(id, delta, &note)
}

#[tauri::command]
fn stock_movements(api: State<'_, Api>, product_id: i64) -> ApiResult<Vec<StockMovement>> {
  api.stock_movements(product_id)
}

#[tauri::command]
fn create_quote(api: State<'_, Api>, input: NewQuote) -> ApiResult<Quote> {
  api.create_quote(&input)
}

#[tauri::command]
fn update_quote(api: State<'_, Api>, id: i64, input: NewQuote) -> ApiResult<Quote> {
  api.update_quote(id, &input)
}

#[tauri::command]
fn set_quote_status(api: State<'_, Api>, id: i64, status: QuoteStatus) -> ApiResult<Quote> {
  api.set_quote_status(id, status)
}

#[tauri::command]
fn get_quote(api: State<'_, Api>, id: i64) -> ApiResult<Quote> {
  api.get_quote(id)
}

#[tauri::command]
fn list_quotes(api: State<'_, Api>, filter: Option<QuoteFilter>) -> ApiResult<Vec<QuoteSummary>> {
  api.list_quotes(&filter.unwrap_or_default())
}

#[tauri::command]
fn delete_quote(api: State<'_, Api>, id: i64) -> ApiResult<()> {
  api.delete_quote(id)
}

#[tauri::command]
fn convert_quote(api: State<'_, Api>, id: i64, date: Option<NaiveDate>) -> ApiResult<Conversion> {
  api.convert_quote(id, date)
}

#[tauri::command]
fn create_sale(api: State<'_, Api>, input: NewSale) -> ApiResult<Sale> {
  api.create_sale(&input)
}

#[tauri::command]
fn cancel_sale(api: State<'_, Api>, id: i64) -> ApiResult<Sale> {
  api.cancel_sale(id)
}

#[tauri::command]
fn get_sale(api: State<'_, Api>, id: i64) -> ApiResult<Sale> {
  api.get_sale(id)
}

#[tauri::command]
fn list_sales(api: State<'_, Api>, filter: Option<SaleFilter>) -> ApiResult<Vec<SaleSummary>> {
  api.list_sales(&filter.unwrap_or_default())
}

#[tauri::command]
fn invoice_sale(api: State<'_, Api>, sale_id: i64) -> ApiResult<Invoice> {
  api.invoice_sale(sale_id)
}

#[tauri::command]
fn get_invoice(api: State<'_, Api>, id: i64) -> ApiResult<Invoice> {
  api.get_invoice(id)
}

#[tauri::command]
fn find_invoice_by_number(api: State<'_, Api>, number: String) -> ApiResult<Option<Invoice>> {
  api.find_invoice_by_number(&number)
}

#[tauri::command]
fn list_invoices(api: State<'_, Api>, filter: Option<InvoiceFilter>) -> ApiResult<Vec<InvoiceSummary>> {
  api.list_invoices(&filter.unwrap_or_default())
}

#[tauri::command]
fn cancel_invoice(api: State<'_, Api>, id: i64) -> ApiResult<Invoice> {
  api.cancel_invoice(id)
}

#[tauri::command]
fn record_payment(api: State<'_, Api>, input: NewPayment) -> ApiResult<Payment> {
  api.record_payment(&input)
}

#[tauri::command]
fn delete_payment(api: State<'_, Api>, id: i64) -> ApiResult<()> {
  api.delete_payment(id)
}

#[tauri::command]
fn list_payments(api: State<'_, Api>, invoice_id: i64) -> ApiResult<Vec<Payment>> {
  api.list_payments(invoice_id)
}

#[tauri::command]
fn create_supplier_order(api: State<'_, Api>, input: NewSupplierOrder) -> ApiResult<SupplierOrder> {
  api.create_supplier_order(&input)
}

#[tauri::command]
fn receive_supplier_order(
  api: State<'_, Api>,
  id: i64,
  date: Option<NaiveDate>,
) -> ApiResult<SupplierOrder> {
  api.receive_supplier_order(id, date)
}

#[tauri::command]
fn cancel_supplier_order(api: State<'_, Api>, id: i64) -> ApiResult<SupplierOrder> {
  api.cancel_supplier_order(id)
}

#[tauri::command]
fn get_supplier_order(api: State<'_, Api>, id: i64) -> ApiResult<SupplierOrder> {
  api.get_supplier_order(id)
}

#[tauri::command]
fn list_supplier_orders(
  api: State<'_, Api>,
  filter: Option<SupplierOrderFilter>,
) -> ApiResult<Vec<SupplierOrder>> {
  api.list_supplier_orders(&filter.unwrap_or_default())
}

#[tauri::command]
fn dashboard_summary(api: State<'_, Api>, from: NaiveDate, to: NaiveDate) -> ApiResult<Summary> {
  api.summary(from, to)
}

#[tauri::command]
fn next_number(api: State<'_, Api>, kind: DocumentKind) -> ApiResult<String> {
  api.next_number(kind)
}

#[tauri::command]
fn printable_document(api: State<'_, Api>, kind: DocumentKind, id: i64) -> ApiResult<PrintableDocument> {
  api.printable(kind, id)
}

#[tauri::command]
fn export_database(api: State<'_, Api>, path: PathBuf) -> ApiResult<()> {
  api.export_database(&path)
}

#[tauri::command]
fn import_database(api: State<'_, Api>, path: PathBuf) -> ApiResult<PathBuf> {
  api.import_database(&path)
}

/// Opens the database under the platform data directory (or the configured
/// path) and starts the window.
pub fn run() {
  tauri::Builder::default()
    .setup(|app| {
      let config = Config::load()?;
      logging::init(&config.log);
      let data_dir = app.path_resolver().app_data_dir();
      let db_path = config.database_path_or(data_dir.as_deref());
      let backup_dir = match (&data_dir, config.backup_dir.is_relative()) {
        (Some(dir), true) => dir.join(&config.backup_dir),
        _ => config.backup_dir.clone(),
      };
      let db = Database::open(&db_path)?;
      info!(db = %db_path.display(), backups = %backup_dir.display(), "desktop shell ready");
      app.manage(Api::new(db, backup_dir));
      Ok(())
    })
    .invoke_handler(tauri::generate_handler![
      get_settings,
      update_settings,
      create_client,
      update_client,
      get_client,
      list_clients,
      delete_client,
      client_balance,
      create_supplier,
      update_supplier,
      get_supplier,
      list_suppliers,
      delete_supplier,
      create_product,
      update_product,
      get_product,
      list_products,
      delete_product,
      low_stock_products,
      adjust_stock,
      stock_movements,
      create_quote,
      update_quote,
      set_quote_status,
      get_quote,
      list_quotes,
      delete_quote,
      convert_quote,
      create_sale,
      cancel_sale,
      get_sale,
      list_sales,
      invoice_sale,
      get_invoice,
      find_invoice_by_number,
      list_invoices,
      cancel_invoice,
      record_payment,
      delete_payment,
      list_payments,
      create_supplier_order,
      receive_supplier_order,
      cancel_supplier_order,
      get_supplier_order,
      list_supplier_orders,
      dashboard_summary,
      next_number,
      printable_document,
      export_database,
      import_database,
    ])
    .run(tauri::generate_context!())
    .expect("error while running tauri application");
}
