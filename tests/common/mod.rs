#![allow(dead_code)]

use chrono::NaiveDate;
use tempfile::TempDir;

use comptoir::store::lines::LineInput;
use comptoir::store::parties::PartyInput;
use comptoir::store::products::ProductInput;
use comptoir::store::quotes::NewQuote;
use comptoir::{Api, Database, Money};

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// A database file in a temporary directory with one client and two
/// products: a FODEC-liable press (5 in stock) and a service that does not
/// track stock.
pub struct Fixture {
  pub dir: TempDir,
  pub api: Api,
  pub client: i64,
  pub press: i64,
  pub service: i64,
}

impl Fixture {
  pub fn new() -> Self {
    let dir = TempDir::new().unwrap();
    let db = Database::open(dir.path().join("comptoir.sqlite")).unwrap();
    let api = Api::new(db, dir.path().join("backups"));

    let client = api
      .create_client(&PartyInput {
        email: "achats@atlas.tn".to_string(),
        tax_id: "1234567/A/M/000".to_string(),
        ..PartyInput::named("Atlas Industrie")
      })
      .unwrap()
      .id;

    let mut press = ProductInput::new("PRE-01", "Presse hydraulique", Money::from_dinars(10));
    press.fodec = true;
    press.initial_stock = 5.0;
    press.alert_threshold = 2.0;
    let press = api.create_product(&press).unwrap().id;

    let mut service = ProductInput::new("SRV-01", "Installation", Money::from_dinars(50));
    service.track_stock = false;
    let service = api.create_product(&service).unwrap().id;

    Self {
      dir,
      api,
      client,
      press,
      service,
    }
  }

  pub fn quote(&self, date: NaiveDate, items: Vec<LineInput>) -> NewQuote {
    NewQuote {
      client_id: self.client,
      date,
      valid_until: None,
      notes: String::new(),
      items,
    }
  }

  pub fn stock_of(&self, product_id: i64) -> f64 {
    self.api.get_product(product_id).unwrap().stock_quantity
  }
}
