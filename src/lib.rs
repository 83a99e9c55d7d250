//! Comptoir: local commercial management for a small Tunisian business.
//!
//! Clients, suppliers, products and stock, quotes, sales, invoices and
//! payments live in one SQLite file. [`api::Api`] is the surface the desktop
//! shell and the `comptoir` CLI call into.

pub mod api;
pub mod backup;
pub mod config;
pub mod convert;
pub mod db;
#[cfg(feature = "desktop")]
pub mod desktop;
pub mod documents;
pub mod error;
pub mod logging;
pub mod model;
pub mod money;
pub mod numbering;
pub mod store;
pub mod words;

pub use api::{Api, ApiError, ApiResult};
pub use config::Config;
pub use db::Database;
pub use error::{Entity, Error, Result};
pub use money::{DocumentTotals, LineAmounts, Money, Rate};
