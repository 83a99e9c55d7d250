#![forbid(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand};

use comptoir::api::Api;
use comptoir::config::Config;
use comptoir::db::{self, Database};
use comptoir::logging;
use comptoir::model::DocumentKind;

#[derive(Parser, Debug)]
#[command(name = "comptoir", version)]
#[command(about = "Gestion commerciale : maintenance et consultation de la base")]
struct Cli {
  /// Database file, overriding `comptoir.toml` and `$COMPTOIR_DB`.
  #[arg(long, global = true)]
  db: Option<PathBuf>,
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Create or migrate the database.
  Init,
  /// Print the company settings.
  Settings,
  #[command(subcommand)]
  Clients(ClientsCommand),
  #[command(subcommand)]
  Products(ProductsCommand),
  #[command(subcommand)]
  Quotes(QuotesCommand),
  #[command(subcommand)]
  Invoices(InvoicesCommand),
  /// Copy the database to `path`.
  Export { path: PathBuf },
  /// Replace the database with the file at `path`.
  Import { path: PathBuf },
  /// Activity over a period, the current month by default.
  Summary {
    #[arg(long)]
    from: Option<NaiveDate>,
    #[arg(long)]
    to: Option<NaiveDate>,
  },
}

#[derive(Subcommand, Debug)]
enum ClientsCommand {
  List {
    #[arg(long)]
    search: Option<String>,
  },
}

#[derive(Subcommand, Debug)]
enum ProductsCommand {
  LowStock,
}

#[derive(Subcommand, Debug)]
enum QuotesCommand {
  /// Turn a quote into a sale and its invoice.
  Convert {
    id: i64,
    #[arg(long)]
    date: Option<NaiveDate>,
  },
}

#[derive(Subcommand, Debug)]
enum InvoicesCommand {
  /// `invoice` is either the numeric id or the number (`FAC-2024-0012`).
  Show {
    invoice: String,
    #[arg(long)]
    json: bool,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  let mut config = Config::load().context("reading comptoir.toml")?;
  if let Some(path) = cli.db {
    config.database_path = Some(path);
  }
  logging::init(&config.log);

  let db_path = config.database_path_or(None);
  let db = Database::open(&db_path)
    .with_context(|| format!("opening {}", db_path.display()))?;
  let api = Api::new(db, config.backup_dir.clone());

  match cli.command {
    Command::Init => {
      let version = api.database().read(db::schema_version)?;
      println!("{} (schéma v{version})", db_path.display());
    }
    Command::Settings => {
      let settings = api.get_settings()?;
      println!("{}", serde_json::to_string_pretty(&settings)?);
    }
    Command::Clients(ClientsCommand::List { search }) => {
      for client in api.list_clients(search.as_deref())? {
        println!("{:>5}  {:<30}  {}", client.id, client.name, client.phone);
      }
    }
    Command::Products(ProductsCommand::LowStock) => {
      for product in api.low_stock_products()? {
        println!(
          "{:<12}  {:<30}  {:>8} / {}",
          product.reference, product.name, product.stock_quantity, product.alert_threshold
        );
      }
    }
    Command::Quotes(QuotesCommand::Convert { id, date }) => {
      let conversion = api.convert_quote(id, date)?;
      println!(
        "{} -> vente {}, facture {}",
        conversion.quote_number, conversion.sale_number, conversion.invoice_number
      );
    }
    Command::Invoices(InvoicesCommand::Show { invoice, json }) => {
      let invoice = match invoice.trim().parse::<i64>() {
        Ok(id) => api.get_invoice(id)?,
        Err(_) => api
          .find_invoice_by_number(&invoice)?
          .with_context(|| format!("aucune facture {invoice}"))?,
      };
      if json {
        let document = api.printable(DocumentKind::Invoice, invoice.id)?;
        println!("{}", serde_json::to_string_pretty(&document)?);
      } else {
        println!("{}  {}  {}", invoice.number, invoice.date, invoice.status);
        if let Some(client) = &invoice.client_name {
          println!("Client     : {client}");
        }
        println!("Échéance   : {}", invoice.due_date);
        println!("Total HT   : {}", invoice.totals.total_ht.format_fr());
        println!("FODEC      : {}", invoice.totals.total_fodec.format_fr());
        for tva in &invoice.totals.tva_breakdown {
          println!("TVA {:<7}: {}", tva.rate.to_string(), tva.amount.format_fr());
        }
        println!("Timbre     : {}", invoice.totals.stamp.format_fr());
        println!("Total TTC  : {}", invoice.totals.total_ttc.format_fr());
        println!("Payé       : {}", invoice.amount_paid.format_fr());
        println!("Reste dû   : {}", invoice.balance().format_fr());
      }
    }
    Command::Export { path } => {
      api.export_database(&path)?;
      println!("exporté vers {}", path.display());
    }
    Command::Import { path } => {
      let safety = api.import_database(&path)?;
      println!("importé ; copie de sécurité : {}", safety.display());
    }
    Command::Summary { from, to } => {
      let today = Local::now().date_naive();
      let to = to.unwrap_or(today);
      let from = from.unwrap_or_else(|| to.with_day(1).unwrap_or(to));
      let summary = api.summary(from, to)?;
      println!("{}", serde_json::to_string_pretty(&summary)?);
    }
  }
  Ok(())
}
