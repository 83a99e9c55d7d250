//! Amounts, rates and line arithmetic.
//!
//! Amounts are integral millimes (1 TND = 1000 millimes). Rates are basis
//! points so that 19 % is `Rate(1900)` and 0.5 % is `Rate(50)`. Every
//! percentage application rounds half away from zero, once, per line.

use std::collections::BTreeMap;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const MILLIMES_PER_DINAR: i64 = 1000;
const BASIS_POINTS_PER_UNIT: i128 = 10_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
  pub const ZERO: Money = Money(0);

  pub const fn from_millimes(millimes: i64) -> Self {
    Self(millimes)
  }

  pub const fn from_dinars(dinars: i64) -> Self {
    Self(dinars * MILLIMES_PER_DINAR)
  }

  pub const fn millimes(self) -> i64 {
    self.0
  }

  pub const fn is_negative(self) -> bool {
    self.0 < 0
  }

  pub const fn is_zero(self) -> bool {
    self.0 == 0
  }

  /// Dinars and millimes parts of the absolute value.
  pub const fn split(self) -> (u64, u64) {
    let abs = self.0.unsigned_abs();
    (abs / MILLIMES_PER_DINAR as u64, abs % MILLIMES_PER_DINAR as u64)
  }

  /// Price times quantity, rounded to the nearest millime. `None` when the
  /// result does not fit.
  pub fn checked_times(self, quantity: f64) -> Option<Money> {
    let value = (self.0 as f64 * quantity).round();
    (value.is_finite() && value.abs() < i64::MAX as f64).then(|| Money(value as i64))
  }

  pub fn checked_add(self, rhs: Money) -> Option<Money> {
    self.0.checked_add(rhs.0).map(Money)
  }

  pub fn checked_sub(self, rhs: Money) -> Option<Money> {
    self.0.checked_sub(rhs.0).map(Money)
  }

  /// Parses `"12"`, `"12.5"`, `"1234,500"` or `"-3.250"`.
  pub fn parse(input: &str) -> Result<Money> {
    let text = input.trim();
    let (negative, digits) = match text.strip_prefix('-') {
      Some(rest) => (true, rest),
      None => (false, text),
    };
    let (whole, fraction) = match digits.split_once(['.', ',']) {
      Some((whole, fraction)) => (whole, fraction),
      None => (digits, ""),
    };
    let well_formed = !whole.is_empty()
      && whole.bytes().all(|b| b.is_ascii_digit())
      && fraction.len() <= 3
      && fraction.bytes().all(|b| b.is_ascii_digit());
    if !well_formed {
      return Err(Error::invalid("montant", format!("« {input} » n'est pas un montant")));
    }
    let whole: i64 = whole
      .parse()
      .map_err(|_| Error::invalid("montant", format!("« {input} » est trop grand")))?;
    let mut millimes = 0_i64;
    for (position, digit) in fraction.bytes().enumerate() {
      millimes += i64::from(digit - b'0') * 10_i64.pow(2 - position as u32);
    }
    let total = whole
      .checked_mul(MILLIMES_PER_DINAR)
      .and_then(|value| value.checked_add(millimes))
      .ok_or_else(|| Error::invalid("montant", format!("« {input} » est trop grand")))?;
    Ok(Money(if negative { -total } else { total }))
  }

  /// `1 234,500 TND`
  pub fn format_fr(self) -> String {
    let (dinars, millimes) = self.split();
    let digits = dinars.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
      if index > 0 && (digits.len() - index) % 3 == 0 {
        grouped.push(' ');
      }
      grouped.push(ch);
    }
    let sign = if self.is_negative() { "-" } else { "" };
    format!("{sign}{grouped},{millimes:03} TND")
  }
}

impl fmt::Display for Money {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let (dinars, millimes) = self.split();
    let sign = if self.is_negative() { "-" } else { "" };
    write!(f, "{sign}{dinars}.{millimes:03}")
  }
}

impl Add for Money {
  type Output = Money;

  fn add(self, rhs: Money) -> Money {
    Money(self.0 + rhs.0)
  }
}

impl AddAssign for Money {
  fn add_assign(&mut self, rhs: Money) {
    self.0 += rhs.0;
  }
}

impl Sub for Money {
  type Output = Money;

  fn sub(self, rhs: Money) -> Money {
    Money(self.0 - rhs.0)
  }
}

impl SubAssign for Money {
  fn sub_assign(&mut self, rhs: Money) {
    self.0 -= rhs.0;
  }
}

impl Neg for Money {
  type Output = Money;

  fn neg(self) -> Money {
    Money(-self.0)
  }
}

impl Sum for Money {
  fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
    iter.fold(Money::ZERO, Add::add)
  }
}

impl ToSql for Money {
  fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
    Ok(ToSqlOutput::from(self.0))
  }
}

impl FromSql for Money {
  fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
    i64::column_result(value).map(Money)
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rate(u32);

impl Rate {
  pub const ZERO: Rate = Rate(0);
  pub const FULL: Rate = Rate(10_000);

  pub const fn from_basis_points(basis_points: u32) -> Self {
    Self(basis_points)
  }

  pub const fn from_percent(percent: u32) -> Self {
    Self(percent * 100)
  }

  pub const fn basis_points(self) -> u32 {
    self.0
  }

  pub const fn is_zero(self) -> bool {
    self.0 == 0
  }

  /// Rates above 100 % make no sense for taxes or discounts.
  pub fn validate(self, field: &'static str) -> Result<Rate> {
    if self > Rate::FULL {
      return Err(Error::invalid(field, "le taux doit être compris entre 0 et 100 %"));
    }
    Ok(self)
  }

  /// Saturates at the `Money` bounds; see [`Rate::checked_apply`].
  pub fn apply(self, amount: Money) -> Money {
    let scaled = i128::from(amount.millimes()) * i128::from(self.0);
    let value = div_round_half_away(scaled, BASIS_POINTS_PER_UNIT);
    Money(value.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64)
  }

  pub fn checked_apply(self, amount: Money) -> Option<Money> {
    let scaled = i128::from(amount.millimes()) * i128::from(self.0);
    i64::try_from(div_round_half_away(scaled, BASIS_POINTS_PER_UNIT))
      .ok()
      .map(Money)
  }

  /// Parses `"19"`, `"7,5"` or `"0.25"` as a percentage.
  pub fn parse_percent(input: &str) -> Result<Rate> {
    let text = input.trim().trim_end_matches('%').trim();
    let (whole, fraction) = match text.split_once(['.', ',']) {
      Some(parts) => parts,
      None => (text, ""),
    };
    let well_formed = !whole.is_empty()
      && whole.len() <= 3
      && whole.bytes().all(|b| b.is_ascii_digit())
      && fraction.len() <= 2
      && fraction.bytes().all(|b| b.is_ascii_digit());
    if !well_formed {
      return Err(Error::invalid("taux", format!("« {input} » n'est pas un pourcentage")));
    }
    let whole: u32 = whole
      .parse()
      .map_err(|_| Error::invalid("taux", format!("« {input} » n'est pas un pourcentage")))?;
    let fraction = match fraction.len() {
      0 => 0,
      1 => u32::from(fraction.as_bytes()[0] - b'0') * 10,
      _ => fraction
        .parse::<u32>()
        .map_err(|_| Error::invalid("taux", format!("« {input} » n'est pas un pourcentage")))?,
    };
    Rate(whole * 100 + fraction).validate("taux")
  }
}

impl fmt::Display for Rate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let whole = self.0 / 100;
    let fraction = self.0 % 100;
    if fraction == 0 {
      write!(f, "{whole} %")
    } else if fraction % 10 == 0 {
      write!(f, "{whole},{} %", fraction / 10)
    } else {
      write!(f, "{whole},{fraction:02} %")
    }
  }
}

impl ToSql for Rate {
  fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
    Ok(ToSqlOutput::from(i64::from(self.0)))
  }
}

impl FromSql for Rate {
  fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
    let raw = i64::column_result(value)?;
    u32::try_from(raw)
      .map(Rate)
      .map_err(|_| rusqlite::types::FromSqlError::OutOfRange(raw))
  }
}

fn too_large() -> Error {
  Error::invalid("montant", "le montant dépasse la capacité de calcul")
}

fn div_round_half_away(numerator: i128, denominator: i128) -> i128 {
  let quotient = numerator / denominator;
  let remainder = numerator % denominator;
  if remainder.abs() * 2 >= denominator {
    quotient + numerator.signum()
  } else {
    quotient
  }
}

/// Amounts of one document line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAmounts {
  pub gross: Money,
  pub discount: Money,
  pub total_ht: Money,
  pub fodec: Money,
  pub tva: Money,
  pub total_ttc: Money,
}

impl LineAmounts {
  /// FODEC is computed on the discounted pre-tax total and is itself part
  /// of the TVA base. Amounts that overflow are rejected as invalid input.
  pub fn compute(
    quantity: f64,
    unit_price: Money,
    discount_rate: Rate,
    tva_rate: Rate,
    fodec_applies: bool,
    fodec_rate: Rate,
  ) -> Result<Self> {
    let gross = unit_price.checked_times(quantity).ok_or_else(too_large)?;
    let discount = discount_rate.checked_apply(gross).ok_or_else(too_large)?;
    let total_ht = gross.checked_sub(discount).ok_or_else(too_large)?;
    let fodec = if fodec_applies {
      fodec_rate.checked_apply(total_ht).ok_or_else(too_large)?
    } else {
      Money::ZERO
    };
    let taxable = total_ht.checked_add(fodec).ok_or_else(too_large)?;
    let tva = tva_rate.checked_apply(taxable).ok_or_else(too_large)?;
    Ok(Self {
      gross,
      discount,
      total_ht,
      fodec,
      tva,
      total_ttc: taxable.checked_add(tva).ok_or_else(too_large)?,
    })
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TvaBreakdown {
  pub rate: Rate,
  pub base: Money,
  pub amount: Money,
}

/// Header totals of a quote, sale or invoice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTotals {
  pub total_ht: Money,
  pub total_discount: Money,
  pub total_fodec: Money,
  pub total_tva: Money,
  pub stamp: Money,
  pub total_ttc: Money,
  pub tva_breakdown: Vec<TvaBreakdown>,
}

impl DocumentTotals {
  pub fn from_lines<'a, I>(lines: I, stamp: Money) -> Result<Self>
  where
    I: IntoIterator<Item = (Rate, &'a LineAmounts)>,
  {
    let sum = |a: Money, b: Money| a.checked_add(b).ok_or_else(too_large);
    let mut totals = DocumentTotals {
      stamp,
      ..DocumentTotals::default()
    };
    let mut by_rate: BTreeMap<Rate, (Money, Money)> = BTreeMap::new();
    for (rate, line) in lines {
      totals.total_ht = sum(totals.total_ht, line.total_ht)?;
      totals.total_discount = sum(totals.total_discount, line.discount)?;
      totals.total_fodec = sum(totals.total_fodec, line.fodec)?;
      totals.total_tva = sum(totals.total_tva, line.tva)?;
      let entry = by_rate.entry(rate).or_default();
      entry.0 = sum(entry.0, sum(line.total_ht, line.fodec)?)?;
      entry.1 = sum(entry.1, line.tva)?;
    }
    totals.total_ttc = sum(
      sum(totals.total_ht, totals.total_fodec)?,
      sum(totals.total_tva, stamp)?,
    )?;
    totals.tva_breakdown = by_rate
      .into_iter()
      .map(|(rate, (base, amount))| TvaBreakdown { rate, base, amount })
      .collect();
    Ok(totals)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn rate_rounds_half_away_from_zero() {
    let rate = Rate::from_percent(19);
    // 150 * 0.19 = 28.5 rounds to 29
    assert_eq!(rate.apply(Money::from_millimes(150)), Money::from_millimes(29));
    assert_eq!(rate.apply(Money::from_millimes(-150)), Money::from_millimes(-29));
    assert_eq!(rate.apply(Money::from_millimes(100)), Money::from_millimes(19));
    assert_eq!(Rate::ZERO.apply(Money::from_dinars(10)), Money::ZERO);
  }

  #[test]
  fn line_with_fodec_taxes_the_surcharge() {
    // 3 x 100.000 with 10 % discount, FODEC 1 %, TVA 19 %
    let line = LineAmounts::compute(
      3.0,
      Money::from_dinars(100),
      Rate::from_percent(10),
      Rate::from_percent(19),
      true,
      Rate::from_percent(1),
    )
    .unwrap();
    assert_eq!(line.gross, Money::from_dinars(300));
    assert_eq!(line.discount, Money::from_dinars(30));
    assert_eq!(line.total_ht, Money::from_dinars(270));
    assert_eq!(line.fodec, Money::from_millimes(2_700));
    assert_eq!(line.tva, Money::from_millimes(51_813));
    assert_eq!(line.total_ttc, Money::from_millimes(324_513));
  }

  #[test]
  fn line_without_fodec() {
    let line = LineAmounts::compute(
      1.5,
      Money::from_millimes(2_333),
      Rate::ZERO,
      Rate::from_percent(7),
      false,
      Rate::from_percent(1),
    )
    .unwrap();
    assert_eq!(line.total_ht, Money::from_millimes(3_500));
    assert_eq!(line.fodec, Money::ZERO);
    assert_eq!(line.tva, Money::from_millimes(245));
  }

  #[test]
  fn totals_group_tva_by_rate_and_add_stamp() {
    let a = LineAmounts::compute(1.0, Money::from_dinars(100), Rate::ZERO, Rate::from_percent(19), false, Rate::ZERO).unwrap();
    let b = LineAmounts::compute(2.0, Money::from_dinars(50), Rate::ZERO, Rate::from_percent(7), false, Rate::ZERO).unwrap();
    let c = LineAmounts::compute(1.0, Money::from_dinars(10), Rate::ZERO, Rate::from_percent(19), false, Rate::ZERO).unwrap();
    let totals = DocumentTotals::from_lines(
      [
        (Rate::from_percent(19), &a),
        (Rate::from_percent(7), &b),
        (Rate::from_percent(19), &c),
      ],
      Money::from_millimes(1_000),
    )
    .unwrap();
    assert_eq!(totals.total_ht, Money::from_dinars(210));
    assert_eq!(totals.total_tva, Money::from_millimes(19_000 + 7_000 + 1_900));
    assert_eq!(totals.total_ttc, Money::from_millimes(210_000 + 27_900 + 1_000));
    assert_eq!(
      totals.tva_breakdown,
      vec![
        TvaBreakdown {
          rate: Rate::from_percent(7),
          base: Money::from_dinars(100),
          amount: Money::from_dinars(7),
        },
        TvaBreakdown {
          rate: Rate::from_percent(19),
          base: Money::from_dinars(110),
          amount: Money::from_millimes(20_900),
        },
      ]
    );
  }

  #[test]
  fn oversized_amounts_are_refused_instead_of_wrapping() {
    let huge = LineAmounts::compute(
      1e300,
      Money::from_dinars(1),
      Rate::ZERO,
      Rate::from_percent(19),
      true,
      Rate::from_percent(1),
    )
    .unwrap_err();
    assert_eq!(huge.code(), "invalid_input");

    let near_max = Money::from_millimes(i64::MAX - 10);
    let err = LineAmounts::compute(1.0, near_max, Rate::ZERO, Rate::from_percent(19), false, Rate::ZERO)
      .unwrap_err();
    assert_eq!(err.code(), "invalid_input");

    let big = LineAmounts::compute(1.0, Money::from_millimes(i64::MAX / 2), Rate::ZERO, Rate::ZERO, false, Rate::ZERO)
      .unwrap();
    let err = DocumentTotals::from_lines([(Rate::ZERO, &big), (Rate::ZERO, &big)], Money::from_millimes(1_000))
      .unwrap_err();
    assert_eq!(err.code(), "invalid_input");
    assert_eq!(Rate::FULL.apply(Money::from_millimes(i64::MAX)), Money::from_millimes(i64::MAX));
  }

  #[test]
  fn parses_and_formats_amounts() {
    assert_eq!(Money::parse("12").unwrap(), Money::from_dinars(12));
    assert_eq!(Money::parse("12,5").unwrap(), Money::from_millimes(12_500));
    assert_eq!(Money::parse("-0.075").unwrap(), Money::from_millimes(-75));
    assert!(Money::parse("1.2345").is_err());
    assert!(Money::parse("abc").is_err());
    assert_eq!(Money::from_millimes(1_234_500).format_fr(), "1 234,500 TND");
    assert_eq!(Money::from_millimes(-999).format_fr(), "-0,999 TND");
    assert_eq!(Money::from_millimes(1_234_500).to_string(), "1234.500");
  }

  #[test]
  fn parses_and_formats_rates() {
    assert_eq!(Rate::parse_percent("19").unwrap(), Rate::from_percent(19));
    assert_eq!(Rate::parse_percent("7,5 %").unwrap(), Rate::from_basis_points(750));
    assert_eq!(Rate::parse_percent("0.25").unwrap(), Rate::from_basis_points(25));
    assert!(Rate::parse_percent("101").is_err());
    assert_eq!(Rate::from_basis_points(750).to_string(), "7,5 %");
    assert_eq!(Rate::from_basis_points(25).to_string(), "0,25 %");
    assert_eq!(Rate::from_percent(19).to_string(), "19 %");
  }
}
