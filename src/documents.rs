//! Print model for invoices, quotes, receipts and purchase orders.
//!
//! Renderers (PDF or HTML) receive a [`PrintableDocument`] and only handle
//! layout; every figure and sentence on the page is decided here.

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::DocumentKind;
use crate::money::{DocumentTotals, Money, Rate};
use crate::store::lines::Line;
use crate::store::parties::Party;
use crate::store::settings::{self, CompanySettings};
use crate::store::{clients, invoices, payments, products, quotes, sales, supplier_orders, suppliers};
use crate::words::amount_in_words;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyBlock {
  pub name: String,
  pub address: String,
  pub phone: String,
  pub email: String,
  pub tax_id: String,
}

impl From<&CompanySettings> for PartyBlock {
  fn from(settings: &CompanySettings) -> Self {
    Self {
      name: settings.name.clone(),
      address: settings.address.clone(),
      phone: settings.phone.clone(),
      email: settings.email.clone(),
      tax_id: settings.tax_id.clone(),
    }
  }
}

impl From<Party> for PartyBlock {
  fn from(party: Party) -> Self {
    Self {
      name: party.name,
      address: party.address,
      phone: party.phone,
      email: party.email,
      tax_id: party.tax_id,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentLine {
  pub position: i64,
  pub reference: String,
  pub description: String,
  pub quantity: f64,
  pub unit_price: Money,
  pub discount_rate: Rate,
  pub tva_rate: Rate,
  pub total_ht: Money,
  pub total_ttc: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintableDocument {
  pub kind: DocumentKind,
  pub title: String,
  pub number: String,
  pub date: NaiveDate,
  pub due_date: Option<NaiveDate>,
  pub valid_until: Option<NaiveDate>,
  pub currency: String,
  pub company: PartyBlock,
  pub party: Option<PartyBlock>,
  pub lines: Vec<DocumentLine>,
  pub totals: DocumentTotals,
  pub amount_paid: Option<Money>,
  pub amount_in_words: String,
  /// "Arrêtée la présente facture à la somme de ..."
  pub closing: Option<String>,
  pub notes: String,
}

fn document_lines(conn: &Connection, lines: &[Line]) -> Result<Vec<DocumentLine>> {
  lines
    .iter()
    .map(|line| {
      let reference = match line.product_id {
        Some(id) => products::find(conn, id)?
          .map(|product| product.reference)
          .unwrap_or_default(),
        None => String::new(),
      };
      Ok(DocumentLine {
        position: line.position,
        reference,
        description: line.description.clone(),
        quantity: line.quantity,
        unit_price: line.unit_price,
        discount_rate: line.discount_rate,
        tva_rate: line.tva_rate,
        total_ht: line.amounts.total_ht,
        total_ttc: line.amounts.total_ttc,
      })
    })
    .collect()
}

fn client_block(conn: &Connection, client_id: Option<i64>) -> Result<Option<PartyBlock>> {
  match client_id {
    Some(id) => Ok(Some(clients::get(conn, id)?.into())),
    None => Ok(None),
  }
}

pub fn invoice(conn: &Connection, id: i64) -> Result<PrintableDocument> {
  let settings = settings::get(conn)?;
  let invoice = invoices::get(conn, id)?;
  let words = amount_in_words(invoice.totals.total_ttc);
  Ok(PrintableDocument {
    kind: DocumentKind::Invoice,
    title: DocumentKind::Invoice.title_fr().to_string(),
    number: invoice.number,
    date: invoice.date,
    due_date: Some(invoice.due_date),
    valid_until: None,
    currency: settings.currency.clone(),
    company: PartyBlock::from(&settings),
    party: client_block(conn, invoice.client_id)?,
    lines: document_lines(conn, &invoice.items)?,
    closing: Some(format!("Arrêtée la présente facture à la somme de {words}.")),
    amount_in_words: words,
    totals: invoice.totals,
    amount_paid: Some(invoice.amount_paid),
    notes: invoice.notes,
  })
}

pub fn quote(conn: &Connection, id: i64) -> Result<PrintableDocument> {
  let settings = settings::get(conn)?;
  let quote = quotes::get(conn, id)?;
  let words = amount_in_words(quote.totals.total_ttc);
  Ok(PrintableDocument {
    kind: DocumentKind::Quote,
    title: DocumentKind::Quote.title_fr().to_string(),
    number: quote.number,
    date: quote.date,
    due_date: None,
    valid_until: Some(quote.valid_until),
    currency: settings.currency.clone(),
    company: PartyBlock::from(&settings),
    party: client_block(conn, Some(quote.client_id))?,
    lines: document_lines(conn, &quote.items)?,
    closing: Some(format!("Arrêté le présent devis à la somme de {words}.")),
    amount_in_words: words,
    totals: quote.totals,
    amount_paid: None,
    notes: quote.notes,
  })
}

pub fn sale_receipt(conn: &Connection, id: i64) -> Result<PrintableDocument> {
  let settings = settings::get(conn)?;
  let sale = sales::get(conn, id)?;
  Ok(PrintableDocument {
    kind: DocumentKind::Sale,
    title: DocumentKind::Sale.title_fr().to_string(),
    number: sale.number,
    date: sale.date,
    due_date: None,
    valid_until: None,
    currency: settings.currency.clone(),
    company: PartyBlock::from(&settings),
    party: client_block(conn, sale.client_id)?,
    lines: document_lines(conn, &sale.items)?,
    amount_in_words: amount_in_words(sale.totals.total_ttc),
    closing: None,
    totals: sale.totals,
    amount_paid: None,
    notes: sale.notes,
  })
}

pub fn payment_receipt(conn: &Connection, id: i64) -> Result<PrintableDocument> {
  let settings = settings::get(conn)?;
  let payment = payments::get(conn, id)?;
  let invoice = invoices::get(conn, payment.invoice_id)?;
  let mut notes = format!(
    "Règlement de la facture {} par {}",
    invoice.number,
    payment.method.label_fr().to_lowercase()
  );
  if !payment.reference.is_empty() {
    notes.push_str(&format!(" (réf. {})", payment.reference));
  }
  let words = amount_in_words(payment.amount);
  Ok(PrintableDocument {
    kind: DocumentKind::Payment,
    title: DocumentKind::Payment.title_fr().to_string(),
    number: payment.number,
    date: payment.date,
    due_date: None,
    valid_until: None,
    currency: settings.currency.clone(),
    company: PartyBlock::from(&settings),
    party: client_block(conn, invoice.client_id)?,
    lines: Vec::new(),
    totals: DocumentTotals {
      total_ttc: payment.amount,
      ..DocumentTotals::default()
    },
    amount_paid: Some(invoice.amount_paid),
    closing: Some(format!("Reçu la somme de {words}.")),
    amount_in_words: words,
    notes,
  })
}

pub fn supplier_order(conn: &Connection, id: i64) -> Result<PrintableDocument> {
  let settings = settings::get(conn)?;
  let order = supplier_orders::get(conn, id)?;
  let supplier = suppliers::get(conn, order.supplier_id)?;
  let lines = order
    .items
    .iter()
    .map(|line| DocumentLine {
      position: line.position,
      reference: line.product_reference.clone(),
      description: line.product_name.clone(),
      quantity: line.quantity,
      unit_price: line.unit_cost,
      discount_rate: Rate::ZERO,
      tva_rate: Rate::ZERO,
      total_ht: line.total,
      total_ttc: line.total,
    })
    .collect();
  Ok(PrintableDocument {
    kind: DocumentKind::SupplierOrder,
    title: DocumentKind::SupplierOrder.title_fr().to_string(),
    number: order.number,
    date: order.date,
    due_date: order.expected_date,
    valid_until: None,
    currency: settings.currency.clone(),
    company: PartyBlock::from(&settings),
    party: Some(supplier.into()),
    lines,
    totals: DocumentTotals {
      total_ht: order.total,
      total_ttc: order.total,
      ..DocumentTotals::default()
    },
    amount_paid: None,
    amount_in_words: amount_in_words(order.total),
    closing: None,
    notes: order.notes,
  })
}
