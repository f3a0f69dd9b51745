use super::classifier::{is_date_or_number, is_noise};
use once_cell::sync::Lazy;
use regex::Regex;

pub const UNKNOWN_MERCHANT: &str = "Unknown Merchant";

/// Merchant names sit at the top of the receipt.
const HEADER_LINES: usize = 5;
const FALLBACK_LINES: usize = 3;
const MIN_NAME_LEN: usize = 3;
const MAX_NAME_LEN: usize = 50;

/// Shape patterns, tried in order. Case-sensitive.
static MERCHANT_SHAPES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // STARBUCKS COFFEE, H&M
        r"^[A-Z][A-Z\s&]+$",
        // Joe's Pizza Inc., Smith-Jones Co
        r"^[A-Z][a-zA-Z\s&\-']+(?:\s(?:Inc|LLC|Corp|Co|Ltd)\.?)?$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Pick the most merchant-like line near the top of the receipt.
///
/// Falls back to the first non-numeric line of the first three when no line
/// has a recognizable name shape. The fallback deliberately ignores the
/// boilerplate filter, so a lone "Thank You" header can still be returned.
pub fn extract_merchant<S: AsRef<str>>(lines: &[S]) -> String {
    let shaped = lines
        .iter()
        .take(HEADER_LINES)
        .map(|l| l.as_ref().trim())
        .filter(|l| (MIN_NAME_LEN..=MAX_NAME_LEN).contains(&l.chars().count()))
        .filter(|l| !is_noise(l))
        .find(|l| MERCHANT_SHAPES.iter().any(|re| re.is_match(l)));

    if let Some(line) = shaped {
        return line.to_string();
    }

    lines
        .iter()
        .take(FALLBACK_LINES)
        .map(|l| l.as_ref().trim())
        .find(|l| l.chars().count() >= MIN_NAME_LEN && !is_date_or_number(l))
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_MERCHANT.to_string())
}
