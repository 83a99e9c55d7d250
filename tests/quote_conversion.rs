mod common;

use common::{date, Fixture};
use comptoir::model::{InvoiceStatus, MovementReason, QuoteStatus, SaleStatus};
use comptoir::money::TvaBreakdown;
use comptoir::store::invoices::InvoiceFilter;
use comptoir::store::lines::LineInput;
use comptoir::store::sales::SaleFilter;
use comptoir::{Money, Rate};
use pretty_assertions::assert_eq;

#[test]
fn conversion_issues_sale_and_invoice_and_takes_stock() {
  let fx = Fixture::new();
  let quote = fx
    .api
    .create_quote(&fx.quote(
      date(2024, 3, 1),
      vec![
        LineInput::product(fx.press, 2.0),
        LineInput::free("Transport", 1.0, Money::from_dinars(15)),
      ],
    ))
    .unwrap();
  assert_eq!(quote.number, "DEV-2024-0001");
  assert_eq!(quote.totals.total_ttc, Money::from_millimes(41_888));
  assert_eq!(fx.stock_of(fx.press), 5.0);

  let conversion = fx.api.convert_quote(quote.id, Some(date(2024, 3, 5))).unwrap();
  assert_eq!(conversion.quote_number, "DEV-2024-0001");
  assert_eq!(conversion.sale_number, "VTE-2024-0001");
  assert_eq!(conversion.invoice_number, "FAC-2024-0001");

  let invoice = fx.api.get_invoice(conversion.invoice_id).unwrap();
  assert_eq!(invoice.status, InvoiceStatus::Unpaid);
  assert_eq!(invoice.client_id, Some(fx.client));
  assert_eq!(invoice.quote_id, Some(quote.id));
  assert_eq!(invoice.sale_id, Some(conversion.sale_id));
  assert_eq!(invoice.date, date(2024, 3, 5));
  assert_eq!(invoice.due_date, date(2024, 4, 4));
  assert_eq!(invoice.notes, "Selon devis DEV-2024-0001");
  assert_eq!(invoice.items.len(), 2);
  assert_eq!(invoice.totals.total_ht, Money::from_millimes(35_000));
  assert_eq!(invoice.totals.total_fodec, Money::from_millimes(200));
  assert_eq!(invoice.totals.total_tva, Money::from_millimes(6_688));
  assert_eq!(invoice.totals.stamp, Money::from_millimes(1_000));
  assert_eq!(invoice.totals.total_ttc, Money::from_millimes(42_888));
  assert_eq!(
    invoice.totals.tva_breakdown,
    vec![TvaBreakdown {
      rate: Rate::from_percent(19),
      base: Money::from_millimes(35_200),
      amount: Money::from_millimes(6_688),
    }]
  );

  let sale = fx.api.get_sale(conversion.sale_id).unwrap();
  assert_eq!(sale.status, SaleStatus::Completed);
  assert_eq!(sale.quote_id, Some(quote.id));
  assert_eq!(sale.invoice_id, Some(invoice.id));
  assert_eq!(sale.totals.total_ttc, Money::from_millimes(41_888));

  let quote = fx.api.get_quote(quote.id).unwrap();
  assert_eq!(quote.status, QuoteStatus::Invoiced);
  assert_eq!(quote.invoice_id, Some(invoice.id));

  assert_eq!(fx.stock_of(fx.press), 3.0);
  let sold: Vec<_> = fx
    .api
    .stock_movements(fx.press)
    .unwrap()
    .into_iter()
    .filter(|movement| movement.reason == MovementReason::Sale)
    .map(|movement| (movement.delta, movement.reference))
    .collect();
  assert_eq!(sold, vec![(-2.0, "VTE-2024-0001".to_string())]);
}

#[test]
fn second_conversion_is_refused() {
  let fx = Fixture::new();
  let quote = fx
    .api
    .create_quote(&fx.quote(date(2024, 3, 1), vec![LineInput::product(fx.press, 1.0)]))
    .unwrap();
  fx.api.convert_quote(quote.id, Some(date(2024, 3, 2))).unwrap();

  let err = fx.api.convert_quote(quote.id, Some(date(2024, 3, 3))).unwrap_err();
  assert_eq!(err.code, "already_invoiced");
  assert_eq!(err.message, "Le devis DEV-2024-0001 a déjà été facturé.");
  assert_eq!(fx.stock_of(fx.press), 4.0);
  assert_eq!(fx.api.list_invoices(&InvoiceFilter::default()).unwrap().len(), 1);
}

#[test]
fn missing_stock_rolls_back_everything() {
  let fx = Fixture::new();
  let quote = fx
    .api
    .create_quote(&fx.quote(
      date(2024, 6, 10),
      vec![
        LineInput::product(fx.service, 1.0),
        LineInput::product(fx.press, 7.0),
      ],
    ))
    .unwrap();

  let err = fx.api.convert_quote(quote.id, Some(date(2024, 6, 12))).unwrap_err();
  assert_eq!(err.code, "insufficient_stock");
  assert!(err.message.contains("Presse hydraulique"), "{}", err.message);

  assert_eq!(fx.api.get_quote(quote.id).unwrap().status, QuoteStatus::Draft);
  assert_eq!(fx.stock_of(fx.press), 5.0);
  assert!(fx.api.list_sales(&SaleFilter::default()).unwrap().is_empty());
  assert!(fx.api.list_invoices(&InvoiceFilter::default()).unwrap().is_empty());

  fx.api.adjust_stock(fx.press, 5.0, "réception hors commande").unwrap();
  let conversion = fx.api.convert_quote(quote.id, Some(date(2024, 6, 12))).unwrap();
  assert_eq!(conversion.sale_number, "VTE-2024-0001");
  assert_eq!(conversion.invoice_number, "FAC-2024-0001");
  assert_eq!(fx.stock_of(fx.press), 3.0);
}

#[test]
fn conversion_applies_current_fodec_rate() {
  let fx = Fixture::new();
  let quote = fx
    .api
    .create_quote(&fx.quote(date(2024, 1, 15), vec![LineInput::product(fx.press, 2.0)]))
    .unwrap();
  assert_eq!(quote.totals.total_fodec, Money::from_millimes(200));

  let mut settings = fx.api.get_settings().unwrap();
  settings.fodec_rate = Rate::from_percent(2);
  fx.api.update_settings(&settings).unwrap();

  let conversion = fx.api.convert_quote(quote.id, Some(date(2024, 1, 20))).unwrap();
  let invoice = fx.api.get_invoice(conversion.invoice_id).unwrap();
  assert_eq!(invoice.totals.total_fodec, Money::from_millimes(400));
  assert_eq!(invoice.totals.total_tva, Money::from_millimes(3_876));
  assert_eq!(invoice.totals.total_ttc, Money::from_millimes(25_276));
}

#[test]
fn rejected_quote_cannot_be_converted() {
  let fx = Fixture::new();
  let quote = fx
    .api
    .create_quote(&fx.quote(date(2024, 2, 1), vec![LineInput::product(fx.press, 1.0)]))
    .unwrap();
  fx.api.set_quote_status(quote.id, QuoteStatus::Rejected).unwrap();

  let err = fx.api.convert_quote(quote.id, Some(date(2024, 2, 2))).unwrap_err();
  assert_eq!(err.code, "invalid_transition");
  assert_eq!(fx.stock_of(fx.press), 5.0);
}

#[test]
fn invoice_cannot_predate_its_quote() {
  let fx = Fixture::new();
  let quote = fx
    .api
    .create_quote(&fx.quote(date(2024, 2, 10), vec![LineInput::product(fx.press, 1.0)]))
    .unwrap();
  let err = fx.api.convert_quote(quote.id, Some(date(2024, 2, 9))).unwrap_err();
  assert_eq!(err.code, "invalid_input");
}

#[test]
fn invoiced_quote_is_locked() {
  let fx = Fixture::new();
  let input = fx.quote(date(2024, 4, 1), vec![LineInput::product(fx.press, 1.0)]);
  let quote = fx.api.create_quote(&input).unwrap();
  fx.api.set_quote_status(quote.id, QuoteStatus::Accepted).unwrap();
  fx.api.convert_quote(quote.id, Some(date(2024, 4, 2))).unwrap();

  assert_eq!(fx.api.update_quote(quote.id, &input).unwrap_err().code, "invalid_transition");
  assert_eq!(fx.api.delete_quote(quote.id).unwrap_err().code, "already_invoiced");
  assert_eq!(
    fx.api
      .set_quote_status(quote.id, QuoteStatus::Draft)
      .unwrap_err()
      .code,
    "invalid_transition"
  );
}

#[test]
fn quote_date_stays_in_its_numbering_year() {
  let fx = Fixture::new();
  let mut input = fx.quote(date(2024, 12, 20), vec![LineInput::product(fx.press, 1.0)]);
  let quote = fx.api.create_quote(&input).unwrap();
  assert_eq!(quote.number, "DEV-2024-0001");

  input.date = date(2024, 12, 27);
  let moved = fx.api.update_quote(quote.id, &input).unwrap();
  assert_eq!(moved.date, date(2024, 12, 27));

  input.date = date(2025, 1, 3);
  let err = fx.api.update_quote(quote.id, &input).unwrap_err();
  assert_eq!(err.code, "invalid_input");
  assert_eq!(fx.api.get_quote(quote.id).unwrap().date, date(2024, 12, 27));
}
