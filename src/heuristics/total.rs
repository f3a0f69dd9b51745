use once_cell::sync::Lazy;
use regex::Regex;

/// Plausible receipt totals. Anything outside is a phone number, SKU or OCR junk.
pub const MIN_AMOUNT: f64 = 0.01;
pub const MAX_AMOUNT: f64 = 9999.99;

static TOTAL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"total[:\s]*\$?(\d+\.?\d*)",
        r"amount[:\s]*\$?(\d+\.?\d*)",
        r"due[:\s]*\$?(\d+\.?\d*)",
        r"balance[:\s]*\$?(\d+\.?\d*)",
        // trailing dollar amount
        r"\$(\d+\.\d{2})\s*$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// One Unicode decimal digit (general category Nd).
static DECIMAL_DIGIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d$").unwrap());

/// Best guess at the receipt total: the largest plausible amount found next to
/// a total-like keyword or at the end of a line. Returns `0.0` when nothing fits.
pub fn extract_total<S: AsRef<str>>(lines: &[S]) -> f64 {
    lines
        .iter()
        .map(|l| l.as_ref().trim().to_lowercase())
        .flat_map(|line| amount_candidates(&line))
        .filter(|v| (MIN_AMOUNT..=MAX_AMOUNT).contains(v))
        .fold(0.0, f64::max)
}

/// Every amount any pattern captures on one (lower-cased) line.
fn amount_candidates(line: &str) -> Vec<f64> {
    TOTAL_PATTERNS
        .iter()
        .flat_map(|re| re.captures_iter(line))
        .filter_map(|cap| ascii_digits(&cap[1])?.parse::<f64>().ok())
        .collect()
}

/// Rewrite any Unicode decimal digits as ASCII so `٤٢.٥٠` parses like `42.50`.
fn ascii_digits(numeral: &str) -> Option<String> {
    numeral
        .chars()
        .map(|c| {
            if c.is_ascii() {
                Some(c)
            } else {
                digit_value(c).and_then(|d| char::from_digit(d, 10))
            }
        })
        .collect()
}

/// Value of a non-ASCII decimal digit. Nd digits come in contiguous runs
/// starting at zero, so the value is the distance to the run start, mod 10.
fn digit_value(c: char) -> Option<u32> {
    if !is_decimal_digit(c) {
        return None;
    }
    let mut offset = 0;
    let mut code = c as u32;
    while let Some(prev) = code.checked_sub(1).and_then(char::from_u32) {
        if !is_decimal_digit(prev) {
            break;
        }
        offset += 1;
        code -= 1;
    }
    Some(offset % 10)
}

fn is_decimal_digit(c: char) -> bool {
    let mut buf = [0u8; 4];
    DECIMAL_DIGIT_RE.is_match(c.encode_utf8(&mut buf))
}
