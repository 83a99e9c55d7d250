//! One module per table family. Functions take a `&Connection` so they
//! compose inside the caller's transaction.

pub mod clients;
pub mod dashboard;
pub mod invoices;
pub mod lines;
pub mod parties;
pub mod payments;
pub mod products;
pub mod quotes;
pub mod sales;
pub mod settings;
pub mod stock;
pub mod supplier_orders;
pub mod suppliers;
