// src/heuristics/mod.rs

mod classifier;
mod confidence;
mod merchant;
mod total;

pub use classifier::{is_date_or_number, is_noise};
pub use confidence::aggregate_confidence;
pub use merchant::{UNKNOWN_MERCHANT, extract_merchant};
pub use total::{MAX_AMOUNT, MIN_AMOUNT, extract_total};

use serde::Deserialize;
use serde::Serialize;

/// Observations at or below this confidence never reach the extractors.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.3;

/// One recognized text region as reported by the OCR engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextObservation {
    pub text: String,
    pub confidence: f64,
}

impl TextObservation {
    pub fn new(text: impl Into<String>, confidence: f64) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// Everything we report back for a single receipt image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub merchant: String,
    pub total: f64,
    pub confidence: f64,
    pub raw_text: String,
    pub success: bool,
}

/// Interpret a full observation list using the default confidence threshold.
pub fn interpret(observations: &[TextObservation]) -> ExtractionResult {
    interpret_with_threshold(observations, DEFAULT_MIN_CONFIDENCE)
}

/// Interpret a full observation list.
///
/// Lines with `confidence <= min_confidence` are dropped before merchant/total
/// extraction and from `raw_text`, but still count towards the aggregate score.
pub fn interpret_with_threshold(
    observations: &[TextObservation],
    min_confidence: f64,
) -> ExtractionResult {
    let lines: Vec<&str> = observations
        .iter()
        .filter(|o| o.confidence > min_confidence)
        .map(|o| o.text.as_str())
        .collect();

    ExtractionResult {
        merchant: extract_merchant(&lines),
        total: extract_total(&lines),
        confidence: aggregate_confidence(observations),
        raw_text: lines.join("\n"),
        success: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(items: &[(&str, f64)]) -> Vec<TextObservation> {
        items
            .iter()
            .map(|(t, c)| TextObservation::new(*t, *c))
            .collect()
    }

    #[test]
    fn test_low_confidence_lines_skip_extraction_but_count_in_score() {
        let observations = obs(&[
            ("CORNER MARKET", 0.9),
            ("Total: $42.10", 0.95),
            ("Total: $999.00", 0.2),
        ]);

        let result = interpret(&observations);
        assert_eq!(result.merchant, "CORNER MARKET");
        assert_eq!(result.total, 42.10);
        assert_eq!(result.confidence, 68.3);
        assert_eq!(result.raw_text, "CORNER MARKET\nTotal: $42.10");
        assert!(result.success);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let observations = obs(&[("EDGE CASE DELI", 0.3), ("Total: $3.00", 0.31)]);

        let result = interpret(&observations);
        assert_eq!(result.raw_text, "Total: $3.00");
        assert_eq!(result.merchant, "Total: $3.00");
        assert_eq!(result.total, 3.0);
    }

    #[test]
    fn test_empty_observations() {
        let result = interpret(&[]);
        assert_eq!(result.merchant, UNKNOWN_MERCHANT);
        assert_eq!(result.total, 0.0);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.raw_text, "");
    }

    #[test]
    fn test_custom_threshold() {
        let observations = obs(&[("GREEN GROCER", 0.5), ("Amount $7.25", 0.9)]);

        let strict = interpret_with_threshold(&observations, 0.6);
        assert_eq!(strict.raw_text, "Amount $7.25");

        let loose = interpret_with_threshold(&observations, 0.1);
        assert_eq!(loose.merchant, "GREEN GROCER");
        assert_eq!(loose.total, 7.25);
    }

    #[test]
    fn test_result_serializes_with_wire_field_names() {
        let result = interpret(&obs(&[("TACO TRUCK", 0.8), ("Total $9.99", 0.8)]));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["merchant"], "TACO TRUCK");
        assert_eq!(json["total"], 9.99);
        assert_eq!(json["confidence"], 80.0);
        assert_eq!(json["raw_text"], "TACO TRUCK\nTotal $9.99");
        assert_eq!(json["success"], true);
    }
}
