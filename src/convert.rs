//! Quote to invoice conversion.
//!
//! A single transaction records the sale (taking goods out of stock),
//! invoices it and locks the quote. Any refusal along the way, such as
//! missing stock, rolls back every write including the allocated numbers.

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn};

use crate::error::{Entity, Error, Result};
use crate::model::QuoteStatus;
use crate::store::lines::Line;
use crate::store::{invoices, quotes, sales, settings};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversion {
  pub quote_id: i64,
  pub quote_number: String,
  pub sale_id: i64,
  pub sale_number: String,
  pub invoice_id: i64,
  pub invoice_number: String,
}

/// Must run inside a write transaction; see [`crate::db::Database::write`].
pub fn convert_quote(conn: &Connection, quote_id: i64, date: NaiveDate) -> Result<Conversion> {
  let span = info_span!("convert_quote", quote_id);
  let _guard = span.enter();

  let quote = quotes::get(conn, quote_id)?;
  match quote.status {
    QuoteStatus::Invoiced => {
      warn!(number = %quote.number, "quote already invoiced");
      return Err(Error::AlreadyInvoiced {
        number: quote.number,
      });
    }
    status if !status.is_convertible() => {
      warn!(number = %quote.number, %status, "quote cannot be invoiced");
      return Err(Error::InvalidTransition {
        entity: Entity::Quote,
        from: status.to_string(),
        to: QuoteStatus::Invoiced.to_string(),
      });
    }
    _ => {}
  }
  if date < quote.date {
    return Err(Error::invalid("date", "la facture ne peut pas précéder le devis"));
  }

  let settings = settings::get(conn)?;
  let items: Vec<Line> = quote
    .items
    .iter()
    .map(|line| line.repriced(settings.fodec_rate))
    .collect::<Result<_>>()?;
  let notes = format!("Selon devis {}", quote.number);

  let sale = sales::record(
    conn,
    Some(quote.client_id),
    Some(quote.id),
    date,
    &notes,
    &items,
    &settings,
  )?;
  let invoice = invoices::issue_for_sale(conn, sale.id, Some(quote.id), &settings)?;
  quotes::mark_invoiced(conn, quote.id, invoice.id)?;

  info!(
    quote = %quote.number,
    sale = %sale.number,
    invoice = %invoice.number,
    total = %invoice.totals.total_ttc,
    "quote converted"
  );
  Ok(Conversion {
    quote_id: quote.id,
    quote_number: quote.number,
    sale_id: sale.id,
    sale_number: sale.number,
    invoice_id: invoice.id,
    invoice_number: invoice.number,
  })
}
