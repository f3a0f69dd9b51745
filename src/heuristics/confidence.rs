use super::TextObservation;

/// OCR is never reported as fully certain.
const MAX_CONFIDENCE_PCT: f64 = 99.0;

/// Mean recognition confidence as a percentage, capped and rounded to one decimal.
pub fn aggregate_confidence(observations: &[TextObservation]) -> f64 {
    if observations.is_empty() {
        return 0.0;
    }

    let mean = observations.iter().map(|o| o.confidence).sum::<f64>() / observations.len() as f64;
    let pct = (mean * 100.0).min(MAX_CONFIDENCE_PCT);
    round_one_decimal(pct)
}

/// Round the exact binary value to one decimal, ties to even.
fn round_one_decimal(value: f64) -> f64 {
    format!("{value:.1}").parse().unwrap_or(value)
}
