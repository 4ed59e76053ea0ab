// =============================================================================
// parser.rs — TURNING "$1,234.56 @ 0.000412 Eth (+2.51%)" INTO NUMBERS
// =============================================================================
//
// The explorers publish numbers for humans: thousands separators, currency
// symbols, a percentage change wrapped in parentheses. This module is the only
// place that knows the positional layout of that text. When an explorer
// reshuffles its markup, this is the file you edit.
//
// The layouts, as scraped:
//
//   price line      "$0.0832 @ 0.000041 Eth (+4.21%)"
//                    ^tok 0                   ^tok 4
//   button labels   [.., .., "$ 2,345,678"]  third label, first two chars
//                                            are the symbol and its padding
//   holders line    "1,234,567 addresses"    first token
//
// Every function here is pure. No I/O, no logging, no defaults: text that
// does not fit the layout is an error, never a zero.
// =============================================================================

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::{Field, FragmentError};

const PRICE_TOKEN: usize = 0;
const DELTA_TOKEN: usize = 4;
const MARKET_CAP_LABEL: usize = 2;
const MARKET_CAP_PREFIX_CHARS: usize = 2;

/// Read the USD price and the published percentage change from a price line.
///
/// The price is the first whitespace token minus its leading currency symbol.
/// The delta is the fifth token with its wrapper characters (first and last)
/// removed. Both have thousands separators stripped.
pub fn parse_price_and_delta(fragment: &str) -> Result<(Decimal, String), FragmentError> {
    let tokens: Vec<&str> = fragment.split_whitespace().collect();
    if tokens.len() <= DELTA_TOKEN {
        return Err(FragmentError::new(Field::PriceUsd, fragment));
    }

    let price_usd = parse_amount(strip_chars(tokens[PRICE_TOKEN], 1, 0))
        .ok_or_else(|| FragmentError::new(Field::PriceUsd, fragment))?;

    // Opaque label: a bare "()" or "-" passes through as "".
    let delta = strip_chars(tokens[DELTA_TOKEN], 1, 1).replace(',', "");

    Ok((price_usd, delta))
}

/// Read the raw USD market capitalization out of the page's button labels.
///
/// The value lives in the third label. Its first two characters are dropped
/// outright, then separators are removed. Only two characters, whatever they
/// are: `"$9,999,000"` reads as `999000`.
pub fn parse_market_cap<S: AsRef<str>>(labels: &[S]) -> Result<Decimal, FragmentError> {
    let label = labels
        .get(MARKET_CAP_LABEL)
        .map(|l| l.as_ref())
        .ok_or_else(|| FragmentError::new(Field::MarketCap, join_labels(labels)))?;

    parse_amount(strip_chars(label, MARKET_CAP_PREFIX_CHARS, 0))
        .ok_or_else(|| FragmentError::new(Field::MarketCap, label))
}

/// Read the holder count: first whitespace token, separators removed.
pub fn parse_holder_count(fragment: &str) -> Result<u64, FragmentError> {
    fragment
        .split_whitespace()
        .next()
        .map(|tok| tok.replace(',', ""))
        .and_then(|digits| digits.parse::<u64>().ok())
        .ok_or_else(|| FragmentError::new(Field::Holders, fragment))
}

/// Drop `front` chars from the start and `back` chars from the end.
/// Too short to lose that many leaves nothing.
fn strip_chars(s: &str, front: usize, back: usize) -> &str {
    let count = s.chars().count();
    if count <= front + back {
        return "";
    }
    let start = s.char_indices().nth(front).map(|(i, _)| i).unwrap_or(s.len());
    let end = s
        .char_indices()
        .nth(count - back)
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    &s[start..end]
}

/// Non-negative decimal with thousands separators removed.
fn parse_amount(text: &str) -> Option<Decimal> {
    let cleaned = text.trim().replace(',', "");
    Decimal::from_str(&cleaned)
        .ok()
        .filter(|d| !d.is_sign_negative())
}

fn join_labels<S: AsRef<str>>(labels: &[S]) -> String {
    labels
        .iter()
        .map(|l| l.as_ref())
        .collect::<Vec<_>>()
        .join(" | ")
}
