//! Amounts spelled out in French, for the closing line of printed invoices
//! ("Arrêtée la présente facture à la somme de ...").

use crate::money::Money;

const UNITS: [&str; 17] = [
  "zéro", "un", "deux", "trois", "quatre", "cinq", "six", "sept", "huit", "neuf", "dix", "onze",
  "douze", "treize", "quatorze", "quinze", "seize",
];

const TENS: [&str; 7] = ["", "", "vingt", "trente", "quarante", "cinquante", "soixante"];

/// `plural` is false when the group multiplies `mille`, where `cents` and
/// `quatre-vingts` lose their final s.
fn below_hundred(n: u64, plural: bool) -> String {
  match n {
    0..=16 => UNITS[n as usize].to_string(),
    17..=19 => format!("dix-{}", UNITS[(n - 10) as usize]),
    20..=69 => {
      let tens = TENS[(n / 10) as usize];
      match n % 10 {
        0 => tens.to_string(),
        1 => format!("{tens} et un"),
        unit => format!("{tens}-{}", UNITS[unit as usize]),
      }
    }
    70..=79 => {
      if n == 71 {
        "soixante et onze".to_string()
      } else {
        format!("soixante-{}", below_hundred(n - 60, plural))
      }
    }
    80 if plural => "quatre-vingts".to_string(),
    80 => "quatre-vingt".to_string(),
    _ => format!("quatre-vingt-{}", below_hundred(n - 80, plural)),
  }
}

fn below_thousand(n: u64, plural: bool) -> String {
  let hundreds = n / 100;
  let rest = n % 100;
  let mut words = match hundreds {
    0 => String::new(),
    1 => "cent".to_string(),
    h if rest == 0 && plural => format!("{} cents", UNITS[h as usize]),
    h => format!("{} cent", UNITS[h as usize]),
  };
  if rest > 0 {
    if !words.is_empty() {
      words.push(' ');
    }
    words.push_str(&below_hundred(rest, plural));
  }
  words
}

pub fn number_in_words(n: u64) -> String {
  if n == 0 {
    return UNITS[0].to_string();
  }
  let billions = n / 1_000_000_000;
  let millions = (n / 1_000_000) % 1000;
  let thousands = (n / 1000) % 1000;
  let units = n % 1000;

  let mut parts = Vec::new();
  if billions > 0 {
    let s = if billions > 1 { "s" } else { "" };
    parts.push(format!("{} milliard{s}", number_in_words(billions)));
  }
  if millions > 0 {
    let s = if millions > 1 { "s" } else { "" };
    parts.push(format!("{} million{s}", below_thousand(millions, true)));
  }
  match thousands {
    0 => {}
    1 => parts.push("mille".to_string()),
    _ => parts.push(format!("{} mille", below_thousand(thousands, false))),
  }
  if units > 0 {
    parts.push(below_thousand(units, true));
  }
  parts.join(" ")
}

/// `1 250,500` → "mille deux cent cinquante dinars et cinq cents millimes".
pub fn amount_in_words(amount: Money) -> String {
  let (dinars, millimes) = amount.split();
  let mut words = String::new();
  if amount.is_negative() {
    words.push_str("moins ");
  }
  if dinars > 0 || millimes == 0 {
    words.push_str(&number_in_words(dinars));
    // "un million de dinars", "deux milliards de dinars"
    if dinars > 0 && dinars % 1_000_000 == 0 {
      words.push_str(" de");
    }
    words.push_str(if dinars > 1 { " dinars" } else { " dinar" });
  }
  if millimes > 0 {
    if dinars > 0 {
      words.push_str(" et ");
    }
    words.push_str(&number_in_words(millimes));
    words.push_str(if millimes > 1 { " millimes" } else { " millime" });
  }
  words
}
