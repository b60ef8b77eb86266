//! English amount-in-words for document totals.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::round_money;

const LESS_THAN_TWENTY: [&str; 20] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen",
    "nineteen",
];

const TENS: [&str; 10] = [
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

const SCALES: [(u64, &str); 5] = [
    (1_000_000_000_000_000, "quadrillion"),
    (1_000_000_000_000, "trillion"),
    (1_000_000_000, "billion"),
    (1_000_000, "million"),
    (1_000, "thousand"),
];

/// Major and minor currency unit names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencyWords {
    pub major: String,
    pub minor: String,
}

impl Default for CurrencyWords {
    fn default() -> Self {
        Self {
            major: "dirhams".to_string(),
            minor: "fils".to_string(),
        }
    }
}

/// `1234` -> `one thousand, two hundred thirty-four`
pub fn number_to_words(number: u64) -> String {
    if number == 0 {
        return LESS_THAN_TWENTY[0].to_string();
    }
    let mut parts = Vec::new();
    push_words(number, &mut parts);
    parts.join(" ")
}

fn push_words(number: u64, parts: &mut Vec<String>) {
    if number == 0 {
        return;
    }
    if number < 20 {
        parts.push(LESS_THAN_TWENTY[number as usize].to_string());
        return;
    }
    if number < 100 {
        let tens = TENS[(number / 10) as usize];
        let ones = number % 10;
        if ones == 0 {
            parts.push(tens.to_string());
        } else {
            parts.push(format!("{}-{}", tens, LESS_THAN_TWENTY[ones as usize]));
        }
        return;
    }
    if number < 1_000 {
        push_words(number / 100, parts);
        parts.push("hundred".to_string());
        push_words(number % 100, parts);
        return;
    }

    for (scale, name) in SCALES {
        if number >= scale {
            push_words(number / scale, parts);
            let remainder = number % scale;
            if remainder == 0 {
                parts.push(name.to_string());
            } else {
                parts.push(format!("{},", name));
                push_words(remainder, parts);
            }
            return;
        }
    }
}

/// Spells out a money amount, e.g. `Twenty-six dirhams and twenty-five fils`.
///
/// The amount is rounded to two places first. Fractions of zero are omitted.
pub fn amount_in_words(amount: Decimal, currency: &CurrencyWords) -> String {
    let rounded = round_money(amount.abs());
    let whole = rounded.trunc();
    let fraction = ((rounded - whole) * Decimal::ONE_HUNDRED)
        .to_u64()
        .unwrap_or(0);

    let mut text = format!(
        "{} {}",
        number_to_words(whole.to_u64().unwrap_or(u64::MAX)),
        currency.major
    );
    if fraction > 0 {
        text.push_str(&format!(
            " and {} {}",
            number_to_words(fraction),
            currency.minor
        ));
    }
    if amount.is_sign_negative() && !rounded.is_zero() {
        text = format!("minus {}", text);
    }
    capitalize_first(&text)
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
