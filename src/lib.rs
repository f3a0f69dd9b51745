pub mod config;
pub mod error;
pub mod heuristics;
pub mod ocr_client;
pub mod receipt_db;
pub mod receipt_processor;

pub use error::ProcessError;
pub use heuristics::{
    ExtractionResult, TextObservation, aggregate_confidence, extract_merchant, extract_total,
    interpret, is_noise,
};
