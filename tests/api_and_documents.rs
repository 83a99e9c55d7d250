mod common;

use common::{date, Fixture};
use comptoir::model::{DocumentKind, PaymentMethod};
use comptoir::store::lines::LineInput;
use comptoir::store::parties::PartyInput;
use comptoir::store::payments::NewPayment;
use comptoir::store::products::ProductInput;
use comptoir::store::supplier_orders::{NewSupplierOrder, OrderLineInput};
use comptoir::{Api, Database, Money};
use pretty_assertions::assert_eq;

#[test]
fn errors_cross_the_boundary_as_code_and_french_message() {
  let fx = Fixture::new();
  let err = fx.api.get_invoice(999).unwrap_err();
  assert_eq!(err.code, "not_found");
  assert_eq!(err.message, "La facture demandé(e) est introuvable.");
  assert_eq!(
    serde_json::to_value(&err).unwrap(),
    serde_json::json!({
      "code": "not_found",
      "message": "La facture demandé(e) est introuvable.",
    })
  );
}

#[test]
fn constraint_violations_are_classified() {
  let fx = Fixture::new();
  let duplicate = fx
    .api
    .create_product(&ProductInput::new("PRE-01", "Autre presse", Money::from_dinars(12)))
    .unwrap_err();
  assert_eq!(duplicate.code, "duplicate");
  assert_eq!(duplicate.message, "Cet enregistrement existe déjà.");

  fx.api
    .create_quote(&fx.quote(date(2024, 1, 5), vec![LineInput::product(fx.press, 1.0)]))
    .unwrap();
  let in_use = fx.api.delete_client(fx.client).unwrap_err();
  assert_eq!(in_use.code, "in_use");
  assert_eq!(fx.api.list_clients(None).unwrap().len(), 1);

  let spare = fx.api.create_client(&PartyInput::named("Client de passage")).unwrap();
  fx.api.delete_client(spare.id).unwrap();
  assert_eq!(fx.api.get_client(spare.id).unwrap_err().code, "not_found");
}

#[test]
fn oversized_lines_are_rejected_as_invalid_input() {
  let fx = Fixture::new();
  let err = fx
    .api
    .create_quote(&fx.quote(
      date(2024, 2, 1),
      vec![LineInput::free("Vrac", 1e18, Money::from_dinars(10))],
    ))
    .unwrap_err();
  assert_eq!(err.code, "invalid_input");
  let err = fx
    .api
    .create_quote(&fx.quote(
      date(2024, 2, 1),
      vec![LineInput::free("Lingot", 1.0, Money::from_millimes(i64::MAX))],
    ))
    .unwrap_err();
  assert_eq!(err.code, "invalid_input");
  assert!(fx.api.list_quotes(&Default::default()).unwrap().is_empty());

  let supplier = fx.api.create_supplier(&PartyInput::named("Grossiste")).unwrap();
  let err = fx
    .api
    .create_supplier_order(&NewSupplierOrder {
      supplier_id: supplier.id,
      date: date(2024, 2, 1),
      expected_date: None,
      notes: String::new(),
      items: vec![OrderLineInput {
        product_id: fx.press,
        quantity: 1e300,
        unit_cost: Some(Money::from_dinars(1)),
      }],
    })
    .unwrap_err();
  assert_eq!(err.code, "invalid_input");
  assert!(fx.api.list_supplier_orders(&Default::default()).unwrap().is_empty());
}

#[test]
fn printed_invoice_spells_out_the_total() {
  let fx = Fixture::new();
  let mut settings = fx.api.get_settings().unwrap();
  settings.name = "Comptoir du Sahel".to_string();
  settings.tax_id = "7654321/B/A/000".to_string();
  fx.api.update_settings(&settings).unwrap();

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
  let conversion = fx.api.convert_quote(quote.id, Some(date(2024, 3, 5))).unwrap();

  let document = fx
    .api
    .printable(DocumentKind::Invoice, conversion.invoice_id)
    .unwrap();
  assert_eq!(document.title, DocumentKind::Invoice.title_fr());
  assert_eq!(document.number, "FAC-2024-0001");
  assert_eq!(document.company.name, "Comptoir du Sahel");
  assert_eq!(document.company.tax_id, "7654321/B/A/000");
  assert_eq!(document.party.as_ref().unwrap().name, "Atlas Industrie");
  assert_eq!(document.due_date, Some(date(2024, 4, 4)));
  let references: Vec<&str> = document
    .lines
    .iter()
    .map(|line| line.reference.as_str())
    .collect();
  assert_eq!(references, vec!["PRE-01", ""]);
  assert_eq!(
    document.amount_in_words,
    "quarante-deux dinars et huit cent quatre-vingt-huit millimes"
  );
  assert_eq!(
    document.closing.as_deref(),
    Some(
      "Arrêtée la présente facture à la somme de quarante-deux dinars et huit cent \
       quatre-vingt-huit millimes."
    )
  );
  assert_eq!(document.amount_paid, Some(Money::ZERO));

  let receipt_id = fx
    .api
    .record_payment(&NewPayment {
      invoice_id: conversion.invoice_id,
      date: date(2024, 3, 20),
      amount: Money::from_dinars(20),
      method: PaymentMethod::Cheque,
      reference: "CHQ 1187".to_string(),
      notes: String::new(),
    })
    .unwrap()
    .id;
  let receipt = fx.api.printable(DocumentKind::Payment, receipt_id).unwrap();
  assert_eq!(receipt.number, "REC-2024-0001");
  assert_eq!(receipt.totals.total_ttc, Money::from_dinars(20));
  assert_eq!(
    receipt.notes,
    "Règlement de la facture FAC-2024-0001 par chèque (réf. CHQ 1187)"
  );
  assert_eq!(receipt.closing.as_deref(), Some("Reçu la somme de vingt dinars."));
}

#[test]
fn supplier_order_restocks_on_receipt() {
  let fx = Fixture::new();
  let supplier = fx
    .api
    .create_supplier(&PartyInput::named("Hydraulique du Nord"))
    .unwrap();
  let order = fx
    .api
    .create_supplier_order(&NewSupplierOrder {
      supplier_id: supplier.id,
      date: date(2024, 7, 1),
      expected_date: Some(date(2024, 7, 15)),
      notes: String::new(),
      items: vec![OrderLineInput {
        product_id: fx.press,
        quantity: 4.0,
        unit_cost: Some(Money::from_millimes(6_500)),
      }],
    })
    .unwrap();
  assert_eq!(order.number, "BC-2024-0001");
  assert_eq!(order.total, Money::from_dinars(26));
  assert_eq!(fx.stock_of(fx.press), 5.0);

  fx.api
    .receive_supplier_order(order.id, Some(date(2024, 7, 12)))
    .unwrap();
  let press = fx.api.get_product(fx.press).unwrap();
  assert_eq!(press.stock_quantity, 9.0);
  assert_eq!(press.purchase_price, Money::from_millimes(6_500));
  assert_eq!(
    fx.api.cancel_supplier_order(order.id).unwrap_err().code,
    "invalid_transition"
  );

  let document = fx.api.printable(DocumentKind::SupplierOrder, order.id).unwrap();
  assert_eq!(document.party.unwrap().name, "Hydraulique du Nord");
  assert_eq!(document.totals.total_ttc, Money::from_dinars(26));
  assert_eq!(document.amount_in_words, "vingt-six dinars");
}

#[test]
fn exported_file_restores_into_another_install() {
  let fx = Fixture::new();
  let copy = fx.dir.path().join("export").join("sauvegarde.sqlite");
  fx.api.export_database(&copy).unwrap();

  let other_dir = tempfile::TempDir::new().unwrap();
  let other = Api::new(
    Database::open(other_dir.path().join("vide.sqlite")).unwrap(),
    other_dir.path().join("backups"),
  );
  assert!(other.list_clients(None).unwrap().is_empty());

  let safety = other.import_database(&copy).unwrap();
  assert!(safety.starts_with(other_dir.path().join("backups")));
  let names: Vec<String> = other
    .list_clients(None)
    .unwrap()
    .into_iter()
    .map(|client| client.name)
    .collect();
  assert_eq!(names, vec!["Atlas Industrie".to_string()]);
  assert_eq!(other.get_product(fx.press).unwrap().reference, "PRE-01");
}
