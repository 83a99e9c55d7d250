//! Error type shared by every store module.
//!
//! Variants carry enough structure for the IPC layer to render a French
//! message with [`Error::user_message`] and a stable [`Error::code`].

use std::fmt;

use rusqlite::ffi;

use crate::money::Money;

/// Result alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Entity kinds, used to phrase not-found and in-use messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
  Client,
  Supplier,
  Product,
  Quote,
  Sale,
  Invoice,
  Payment,
  SupplierOrder,
}

impl Entity {
  /// French noun with its definite article, as used in messages.
  pub fn label_fr(self) -> &'static str {
    match self {
      Self::Client => "le client",
      Self::Supplier => "le fournisseur",
      Self::Product => "le produit",
      Self::Quote => "le devis",
      Self::Sale => "la vente",
      Self::Invoice => "la facture",
      Self::Payment => "le paiement",
      Self::SupplierOrder => "la commande fournisseur",
    }
  }
}

impl fmt::Display for Entity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::Client => "client",
      Self::Supplier => "supplier",
      Self::Product => "product",
      Self::Quote => "quote",
      Self::Sale => "sale",
      Self::Invoice => "invoice",
      Self::Payment => "payment",
      Self::SupplierOrder => "supplier order",
    };
    f.write_str(name)
  }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("invalid configuration: {0}")]
  Config(#[from] toml::de::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("{entity} {id} not found")]
  NotFound { entity: Entity, id: i64 },

  #[error("invalid {field}: {reason}")]
  Invalid { field: &'static str, reason: String },

  #[error("insufficient stock for {product}: {available} available, {requested} requested")]
  InsufficientStock {
    product: String,
    available: f64,
    requested: f64,
  },

  #[error("{entity} cannot go from {from} to {to}")]
  InvalidTransition {
    entity: Entity,
    from: String,
    to: String,
  },

  #[error("quote {number} is already invoiced")]
  AlreadyInvoiced { number: String },

  #[error("payment of {attempted} exceeds remaining balance {remaining}")]
  Overpayment { remaining: Money, attempted: Money },

  #[error("invoice {number} has payments")]
  HasPayments { number: String },

  #[error("invalid backup: {0}")]
  InvalidBackup(String),

  #[error("database schema version {found} is newer than supported version {supported}")]
  SchemaTooNew { found: i64, supported: i64 },
}

impl Error {
  pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
    Self::Invalid {
      field,
      reason: reason.into(),
    }
  }

  pub fn not_found(entity: Entity, id: i64) -> Self {
    Self::NotFound { entity, id }
  }

  /// Stable machine-readable code for the renderer.
  pub fn code(&self) -> &'static str {
    match self {
      Self::Sqlite(err) => match constraint_kind(err) {
        Some(Constraint::Unique) => "duplicate",
        Some(Constraint::ForeignKey) => "in_use",
        None => "storage",
      },
      Self::Io(_) => "io",
      Self::Config(_) => "config",
      Self::Json(_) => "serialization",
      Self::NotFound { .. } => "not_found",
      Self::Invalid { .. } => "invalid_input",
      Self::InsufficientStock { .. } => "insufficient_stock",
      Self::InvalidTransition { .. } => "invalid_transition",
      Self::AlreadyInvoiced { .. } => "already_invoiced",
      Self::Overpayment { .. } => "overpayment",
      Self::HasPayments { .. } => "has_payments",
      Self::InvalidBackup(_) | Self::SchemaTooNew { .. } => "invalid_backup",
    }
  }

  /// True for failures of the storage layer rather than refused operations.
  pub fn is_internal(&self) -> bool {
    matches!(self.code(), "storage" | "io" | "config" | "serialization")
  }

  /// French message shown to the user.
  pub fn user_message(&self) -> String {
    match self {
      Self::Sqlite(err) => match constraint_kind(err) {
        Some(Constraint::Unique) => "Cet enregistrement existe déjà.".to_string(),
        Some(Constraint::ForeignKey) => {
          "Impossible de supprimer cet élément : il est lié à d'autres documents.".to_string()
        }
        None => "Erreur de base de données. Veuillez réessayer.".to_string(),
      },
      Self::Io(_) => "Erreur d'accès au fichier.".to_string(),
      Self::Config(_) => "Le fichier de configuration est invalide.".to_string(),
      Self::Json(_) => "Données illisibles.".to_string(),
      Self::NotFound { entity, .. } => {
        let label = entity.label_fr();
        let mut chars = label.chars();
        let capitalized = match chars.next() {
          Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
          None => String::new(),
        };
        format!("{capitalized} demandé(e) est introuvable.")
      }
      Self::Invalid { field, reason } => format!("Champ « {field} » invalide : {reason}."),
      Self::InsufficientStock {
        product,
        available,
        requested,
      } => format!(
        "Stock insuffisant pour « {product} » : {available} disponible(s), {requested} demandé(s)."
      ),
      Self::InvalidTransition { entity, from, to } => format!(
        "Impossible de passer {} du statut « {from} » au statut « {to} ».",
        entity.label_fr()
      ),
      Self::AlreadyInvoiced { number } => format!("Le devis {number} a déjà été facturé."),
      Self::Overpayment {
        remaining,
        attempted,
      } => format!(
        "Le montant saisi ({}) dépasse le reste à payer ({}).",
        attempted.format_fr(),
        remaining.format_fr()
      ),
      Self::HasPayments { number } => {
        format!("La facture {number} a des paiements enregistrés et ne peut pas être annulée.")
      }
      Self::InvalidBackup(_) => "Le fichier sélectionné n'est pas une sauvegarde valide.".to_string(),
      Self::SchemaTooNew { .. } => {
        "Cette base de données provient d'une version plus récente de l'application.".to_string()
      }
    }
  }
}

enum Constraint {
  Unique,
  ForeignKey,
}

fn constraint_kind(err: &rusqlite::Error) -> Option<Constraint> {
  match err {
    rusqlite::Error::SqliteFailure(failure, _) => match failure.extended_code {
      ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => Some(Constraint::Unique),
      ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Some(Constraint::ForeignKey),
      _ => None,
    },
    _ => None,
  }
}
