//! Status and kind enums stored as text columns.

use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

macro_rules! text_enum {
  (
    $(#[$meta:meta])*
    $name:ident, $field:literal {
      $($variant:ident => $text:literal),+ $(,)?
    }
  ) => {
    $(#[$meta])*
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum $name {
      $($variant),+
    }

    impl $name {
      pub const ALL: &'static [$name] = &[$($name::$variant),+];

      pub fn as_str(self) -> &'static str {
        match self {
          $($name::$variant => $text),+
        }
      }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
      }
    }

    impl FromStr for $name {
      type Err = Error;

      fn from_str(value: &str) -> Result<Self> {
        match value {
          $($text => Ok($name::$variant),)+
          other => Err(Error::invalid($field, format!("valeur inconnue « {other} »"))),
        }
      }
    }

    impl ToSql for $name {
      fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
      }
    }

    impl FromSql for $name {
      fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        text
          .parse()
          .map_err(|_| FromSqlError::Other(format!("unknown {} `{text}`", $field).into()))
      }
    }
  };
}

text_enum! {
  QuoteStatus, "statut" {
    Draft => "draft",
    Sent => "sent",
    Accepted => "accepted",
    Rejected => "rejected",
    Invoiced => "invoiced",
  }
}

impl QuoteStatus {
  /// Transitions reachable through `set_status`. `Invoiced` is only ever
  /// set by the conversion workflow.
  pub fn can_become(self, next: QuoteStatus) -> bool {
    use QuoteStatus::*;
    matches!(
      (self, next),
      (Draft, Sent | Accepted | Rejected) | (Sent, Draft | Accepted | Rejected)
    )
  }

  /// Lines and header may still be edited.
  pub fn is_editable(self) -> bool {
    matches!(self, QuoteStatus::Draft | QuoteStatus::Sent)
  }

  pub fn is_convertible(self) -> bool {
    matches!(
      self,
      QuoteStatus::Draft | QuoteStatus::Sent | QuoteStatus::Accepted
    )
  }
}

text_enum! {
  SaleStatus, "statut" {
    Completed => "completed",
    Cancelled => "cancelled",
  }
}

text_enum! {
  InvoiceStatus, "statut" {
    Unpaid => "unpaid",
    PartiallyPaid => "partially_paid",
    Paid => "paid",
    Cancelled => "cancelled",
  }
}

text_enum! {
  SupplierOrderStatus, "statut" {
    Pending => "pending",
    Received => "received",
    Cancelled => "cancelled",
  }
}

text_enum! {
  PaymentMethod, "mode de paiement" {
    Cash => "cash",
    Cheque => "cheque",
    Transfer => "transfer",
    Card => "card",
    Other => "other",
  }
}

impl PaymentMethod {
  pub fn label_fr(self) -> &'static str {
    match self {
      PaymentMethod::Cash => "Espèces",
      PaymentMethod::Cheque => "Chèque",
      PaymentMethod::Transfer => "Virement",
      PaymentMethod::Card => "Carte bancaire",
      PaymentMethod::Other => "Autre",
    }
  }
}

text_enum! {
  /// Why a product's stock moved.
  MovementReason, "motif" {
    Initial => "initial",
    Adjustment => "adjustment",
    Sale => "sale",
    SaleCancelled => "sale_cancelled",
    Purchase => "purchase",
  }
}

text_enum! {
  /// Numbered document families.
  DocumentKind, "type de document" {
    Quote => "quote",
    Invoice => "invoice",
    Sale => "sale",
    SupplierOrder => "supplier_order",
    Payment => "payment",
  }
}

impl DocumentKind {
  pub fn prefix(self) -> &'static str {
    match self {
      DocumentKind::Quote => "DEV",
      DocumentKind::Invoice => "FAC",
      DocumentKind::Sale => "VTE",
      DocumentKind::SupplierOrder => "BC",
      DocumentKind::Payment => "REC",
    }
  }

  pub fn title_fr(self) -> &'static str {
    match self {
      DocumentKind::Quote => "Devis",
      DocumentKind::Invoice => "Facture",
      DocumentKind::Sale => "Ticket de vente",
      DocumentKind::SupplierOrder => "Bon de commande",
      DocumentKind::Payment => "Reçu de paiement",
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn text_round_trip_matches_serde_names() {
    for status in InvoiceStatus::ALL {
      let json = serde_json::to_string(status).unwrap();
      assert_eq!(json, format!("\"{}\"", status.as_str()));
      assert_eq!(status.as_str().parse::<InvoiceStatus>().unwrap(), *status);
    }
    assert!("archived".parse::<QuoteStatus>().is_err());
  }

  #[test]
  fn quote_transitions() {
    assert!(QuoteStatus::Draft.can_become(QuoteStatus::Sent));
    assert!(QuoteStatus::Sent.can_become(QuoteStatus::Accepted));
    assert!(!QuoteStatus::Rejected.can_become(QuoteStatus::Accepted));
    assert!(!QuoteStatus::Accepted.can_become(QuoteStatus::Invoiced));
    assert!(!QuoteStatus::Invoiced.can_become(QuoteStatus::Draft));
    assert!(QuoteStatus::Accepted.is_convertible());
    assert!(!QuoteStatus::Rejected.is_convertible());
  }

  #[test]
  fn sent_quote_reopens_but_accepted_stays() {
    assert!(QuoteStatus::Sent.can_become(QuoteStatus::Draft));
    for next in QuoteStatus::ALL {
      assert!(!QuoteStatus::Accepted.can_become(*next), "accepted -> {next}");
      assert!(!QuoteStatus::Rejected.can_become(*next), "rejected -> {next}");
    }
    assert!(!QuoteStatus::Accepted.is_editable());
  }
}
