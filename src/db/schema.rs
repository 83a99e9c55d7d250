//! Schema migrations, applied in order. `PRAGMA user_version` holds the
//! number of entries already applied; never edit a shipped entry, append.

pub(crate) const MIGRATIONS: &[&str] = &[BASE_SCHEMA, INDEXES];

const BASE_SCHEMA: &str = r"
CREATE TABLE company_settings (
  id                   INTEGER PRIMARY KEY CHECK (id = 1),
  name                 TEXT NOT NULL DEFAULT '',
  address              TEXT NOT NULL DEFAULT '',
  phone                TEXT NOT NULL DEFAULT '',
  email                TEXT NOT NULL DEFAULT '',
  tax_id               TEXT NOT NULL DEFAULT '',
  currency             TEXT NOT NULL DEFAULT 'TND',
  default_tva_rate     INTEGER NOT NULL DEFAULT 1900,
  fodec_rate           INTEGER NOT NULL DEFAULT 100,
  stamp_duty           INTEGER NOT NULL DEFAULT 1000,
  payment_terms_days   INTEGER NOT NULL DEFAULT 30,
  quote_validity_days  INTEGER NOT NULL DEFAULT 30,
  allow_negative_stock INTEGER NOT NULL DEFAULT 0,
  updated_at           TEXT NOT NULL DEFAULT (datetime('now'))
);
INSERT INTO company_settings (id) VALUES (1);

CREATE TABLE clients (
  id         INTEGER PRIMARY KEY AUTOINCREMENT,
  name       TEXT NOT NULL,
  email      TEXT NOT NULL DEFAULT '',
  phone      TEXT NOT NULL DEFAULT '',
  address    TEXT NOT NULL DEFAULT '',
  tax_id     TEXT NOT NULL DEFAULT '',
  notes      TEXT NOT NULL DEFAULT '',
  created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE suppliers (
  id         INTEGER PRIMARY KEY AUTOINCREMENT,
  name       TEXT NOT NULL,
  email      TEXT NOT NULL DEFAULT '',
  phone      TEXT NOT NULL DEFAULT '',
  address    TEXT NOT NULL DEFAULT '',
  tax_id     TEXT NOT NULL DEFAULT '',
  notes      TEXT NOT NULL DEFAULT '',
  created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE products (
  id              INTEGER PRIMARY KEY AUTOINCREMENT,
  reference       TEXT NOT NULL UNIQUE,
  name            TEXT NOT NULL,
  description     TEXT NOT NULL DEFAULT '',
  unit_price      INTEGER NOT NULL DEFAULT 0,
  purchase_price  INTEGER NOT NULL DEFAULT 0,
  tva_rate        INTEGER NOT NULL DEFAULT 1900,
  fodec           INTEGER NOT NULL DEFAULT 0,
  track_stock     INTEGER NOT NULL DEFAULT 1,
  stock_quantity  REAL NOT NULL DEFAULT 0,
  alert_threshold REAL NOT NULL DEFAULT 0,
  created_at      TEXT NOT NULL DEFAULT (datetime('now')),
  updated_at      TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE document_sequences (
  kind       TEXT NOT NULL,
  year       INTEGER NOT NULL,
  last_value INTEGER NOT NULL,
  PRIMARY KEY (kind, year)
);

CREATE TABLE quotes (
  id             INTEGER PRIMARY KEY AUTOINCREMENT,
  number         TEXT NOT NULL UNIQUE,
  client_id      INTEGER NOT NULL REFERENCES clients(id),
  date           TEXT NOT NULL,
  valid_until    TEXT NOT NULL,
  status         TEXT NOT NULL DEFAULT 'draft',
  total_ht       INTEGER NOT NULL DEFAULT 0,
  total_discount INTEGER NOT NULL DEFAULT 0,
  total_fodec    INTEGER NOT NULL DEFAULT 0,
  total_tva      INTEGER NOT NULL DEFAULT 0,
  total_ttc      INTEGER NOT NULL DEFAULT 0,
  invoice_id     INTEGER REFERENCES invoices(id),
  notes          TEXT NOT NULL DEFAULT '',
  created_at     TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE quote_items (
  id              INTEGER PRIMARY KEY AUTOINCREMENT,
  quote_id        INTEGER NOT NULL REFERENCES quotes(id) ON DELETE CASCADE,
  position        INTEGER NOT NULL,
  product_id      INTEGER REFERENCES products(id),
  description     TEXT NOT NULL,
  quantity        REAL NOT NULL,
  unit_price      INTEGER NOT NULL,
  discount_rate   INTEGER NOT NULL DEFAULT 0,
  tva_rate        INTEGER NOT NULL,
  fodec           INTEGER NOT NULL DEFAULT 0,
  gross           INTEGER NOT NULL,
  discount_amount INTEGER NOT NULL,
  total_ht        INTEGER NOT NULL,
  fodec_amount    INTEGER NOT NULL,
  tva_amount      INTEGER NOT NULL,
  total_ttc       INTEGER NOT NULL
);

CREATE TABLE sales (
  id             INTEGER PRIMARY KEY AUTOINCREMENT,
  number         TEXT NOT NULL UNIQUE,
  client_id      INTEGER REFERENCES clients(id),
  quote_id       INTEGER REFERENCES quotes(id),
  date           TEXT NOT NULL,
  status         TEXT NOT NULL DEFAULT 'completed',
  total_ht       INTEGER NOT NULL DEFAULT 0,
  total_discount INTEGER NOT NULL DEFAULT 0,
  total_fodec    INTEGER NOT NULL DEFAULT 0,
  total_tva      INTEGER NOT NULL DEFAULT 0,
  total_ttc      INTEGER NOT NULL DEFAULT 0,
  invoice_id     INTEGER REFERENCES invoices(id),
  notes          TEXT NOT NULL DEFAULT '',
  created_at     TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE sale_items (
  id              INTEGER PRIMARY KEY AUTOINCREMENT,
  sale_id         INTEGER NOT NULL REFERENCES sales(id) ON DELETE CASCADE,
  position        INTEGER NOT NULL,
  product_id      INTEGER REFERENCES products(id),
  description     TEXT NOT NULL,
  quantity        REAL NOT NULL,
  unit_price      INTEGER NOT NULL,
  discount_rate   INTEGER NOT NULL DEFAULT 0,
  tva_rate        INTEGER NOT NULL,
  fodec           INTEGER NOT NULL DEFAULT 0,
  gross           INTEGER NOT NULL,
  discount_amount INTEGER NOT NULL,
  total_ht        INTEGER NOT NULL,
  fodec_amount    INTEGER NOT NULL,
  tva_amount      INTEGER NOT NULL,
  total_ttc       INTEGER NOT NULL
);

CREATE TABLE invoices (
  id             INTEGER PRIMARY KEY AUTOINCREMENT,
  number         TEXT NOT NULL UNIQUE,
  client_id      INTEGER REFERENCES clients(id),
  sale_id        INTEGER REFERENCES sales(id),
  quote_id       INTEGER REFERENCES quotes(id),
  date           TEXT NOT NULL,
  due_date       TEXT NOT NULL,
  status         TEXT NOT NULL DEFAULT 'unpaid',
  total_ht       INTEGER NOT NULL DEFAULT 0,
  total_discount INTEGER NOT NULL DEFAULT 0,
  total_fodec    INTEGER NOT NULL DEFAULT 0,
  total_tva      INTEGER NOT NULL DEFAULT 0,
  stamp          INTEGER NOT NULL DEFAULT 0,
  total_ttc      INTEGER NOT NULL DEFAULT 0,
  amount_paid    INTEGER NOT NULL DEFAULT 0,
  notes          TEXT NOT NULL DEFAULT '',
  created_at     TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE invoice_items (
  id              INTEGER PRIMARY KEY AUTOINCREMENT,
  invoice_id      INTEGER NOT NULL REFERENCES invoices(id) ON DELETE CASCADE,
  position        INTEGER NOT NULL,
  product_id      INTEGER REFERENCES products(id),
  description     TEXT NOT NULL,
  quantity        REAL NOT NULL,
  unit_price      INTEGER NOT NULL,
  discount_rate   INTEGER NOT NULL DEFAULT 0,
  tva_rate        INTEGER NOT NULL,
  fodec           INTEGER NOT NULL DEFAULT 0,
  gross           INTEGER NOT NULL,
  discount_amount INTEGER NOT NULL,
  total_ht        INTEGER NOT NULL,
  fodec_amount    INTEGER NOT NULL,
  tva_amount      INTEGER NOT NULL,
  total_ttc       INTEGER NOT NULL
);

CREATE TABLE payments (
  id         INTEGER PRIMARY KEY AUTOINCREMENT,
  number     TEXT NOT NULL UNIQUE,
  invoice_id INTEGER NOT NULL REFERENCES invoices(id),
  date       TEXT NOT NULL,
  amount     INTEGER NOT NULL CHECK (amount > 0),
  method     TEXT NOT NULL,
  reference  TEXT NOT NULL DEFAULT '',
  notes      TEXT NOT NULL DEFAULT '',
  created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE supplier_orders (
  id            INTEGER PRIMARY KEY AUTOINCREMENT,
  number        TEXT NOT NULL UNIQUE,
  supplier_id   INTEGER NOT NULL REFERENCES suppliers(id),
  date          TEXT NOT NULL,
  expected_date TEXT,
  status        TEXT NOT NULL DEFAULT 'pending',
  total         INTEGER NOT NULL DEFAULT 0,
  received_on   TEXT,
  notes         TEXT NOT NULL DEFAULT '',
  created_at    TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE supplier_order_items (
  id         INTEGER PRIMARY KEY AUTOINCREMENT,
  order_id   INTEGER NOT NULL REFERENCES supplier_orders(id) ON DELETE CASCADE,
  position   INTEGER NOT NULL,
  product_id INTEGER NOT NULL REFERENCES products(id),
  quantity   REAL NOT NULL,
  unit_cost  INTEGER NOT NULL,
  total      INTEGER NOT NULL
);

CREATE TABLE stock_movements (
  id         INTEGER PRIMARY KEY AUTOINCREMENT,
  product_id INTEGER NOT NULL REFERENCES products(id) ON DELETE CASCADE,
  delta      REAL NOT NULL,
  reason     TEXT NOT NULL,
  reference  TEXT NOT NULL DEFAULT '',
  date       TEXT NOT NULL,
  created_at TEXT NOT NULL DEFAULT (datetime('now'))
);
";

const INDEXES: &str = r"
CREATE INDEX idx_quotes_client ON quotes(client_id);
CREATE INDEX idx_quotes_status ON quotes(status);
CREATE INDEX idx_quote_items_quote ON quote_items(quote_id);
CREATE INDEX idx_sales_client ON sales(client_id);
CREATE INDEX idx_sale_items_sale ON sale_items(sale_id);
CREATE INDEX idx_invoices_client ON invoices(client_id);
CREATE INDEX idx_invoices_status ON invoices(status);
CREATE INDEX idx_invoice_items_invoice ON invoice_items(invoice_id);
CREATE INDEX idx_payments_invoice ON payments(invoice_id);
CREATE INDEX idx_supplier_order_items_order ON supplier_order_items(order_id);
CREATE INDEX idx_stock_movements_product ON stock_movements(product_id);
";

/// Tables every Comptoir database must contain; used to vet backups.
pub(crate) const REQUIRED_TABLES: &[&str] = &[
  "company_settings",
  "clients",
  "suppliers",
  "products",
  "quotes",
  "sales",
  "invoices",
  "payments",
  "supplier_orders",
];
