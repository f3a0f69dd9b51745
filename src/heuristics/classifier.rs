use once_cell::sync::Lazy;
use regex::Regex;

/// Boilerplate a merchant name never contains. Matched anywhere in the line.
static NOISE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)receipt|invoice|bill|order|ticket",
        r"^\d+$",
        r"^[\d\-/\s:]+$",
        r"(?i)thank\s*you|thanks",
        r"(?i)customer\s*copy",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Dates, times and bare numbers.
static DATE_OR_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\d\-/\s:]+$").unwrap());

/// True if the line is header/footer boilerplate, a date or a bare number.
pub fn is_noise(line: &str) -> bool {
    NOISE_PATTERNS.iter().any(|re| re.is_match(line))
}

/// True if the line is made only of digits, dashes, slashes, colons and whitespace.
pub fn is_date_or_number(line: &str) -> bool {
    DATE_OR_NUMBER_RE.is_match(line)
}
