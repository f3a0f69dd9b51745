// src/receipt_processor.rs

use crate::config::{OcrConfig, RewardsConfig};
use crate::error::ProcessError;
use crate::heuristics::{self, ExtractionResult};
use crate::ocr_client::OcrEngine;
use crate::receipt_db::{ReceiptStore, RecordOutcome, StoredReceipt};
use std::path::Path;
use std::sync::Arc;
use tracing::{Instrument, info, info_span, warn};

/// Content type for an image file, from its extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "tif" | "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}

/// Wires an upload through the OCR engine and the text heuristics.
pub struct ReceiptProcessor {
    engine: Arc<dyn OcrEngine>,
    ocr: OcrConfig,
    rewards: RewardsConfig,
}

impl ReceiptProcessor {
    pub fn new(engine: Arc<dyn OcrEngine>, ocr: OcrConfig, rewards: RewardsConfig) -> Self {
        Self {
            engine,
            ocr,
            rewards,
        }
    }

    /// Reject anything that is not a non-empty image within the size limit.
    pub fn validate_upload(&self, image: &[u8], content_type: &str) -> Result<(), ProcessError> {
        if !content_type.starts_with("image/") {
            return Err(ProcessError::InvalidInput(format!(
                "File must be an image, got {content_type}"
            )));
        }
        if image.is_empty() {
            return Err(ProcessError::InvalidInput("Empty upload".to_string()));
        }
        if image.len() > self.ocr.max_upload_bytes {
            return Err(ProcessError::InvalidInput(format!(
                "File too large: {} bytes, limit is {}",
                image.len(),
                self.ocr.max_upload_bytes
            )));
        }
        Ok(())
    }

    /// Run one image through OCR and extract merchant, total and confidence.
    pub async fn process(
        &self,
        image: &[u8],
        content_type: &str,
    ) -> Result<ExtractionResult, ProcessError> {
        self.validate_upload(image, content_type)?;

        let span = info_span!("receipt", bytes = image.len(), content_type = %content_type);
        async {
            info!("Starting OCR processing");
            let observations = self.engine.recognize(image, content_type).await?;

            let result =
                heuristics::interpret_with_threshold(&observations, self.ocr.min_confidence);
            info!(
                observations = observations.len(),
                lines = result.raw_text.lines().count(),
                merchant = %result.merchant,
                total = result.total,
                confidence = result.confidence,
                "Extraction result"
            );
            Ok::<_, ProcessError>(result)
        }
        .instrument(span)
        .await
    }

    /// Process an image, reject recent duplicates, store it and award points.
    pub async fn submit(
        &self,
        store: &ReceiptStore,
        image: &[u8],
        content_type: &str,
    ) -> Result<StoredReceipt, ProcessError> {
        let result = self.process(image, content_type).await?;

        let points = self.rewards.points_per_receipt;
        let mut receipt = StoredReceipt {
            id: None,
            fingerprint: ReceiptStore::fingerprint(&result.merchant, result.total),
            merchant: result.merchant,
            total_amount: result.total,
            points_awarded: points,
            raw_ocr_text: result.raw_text,
            confidence: result.confidence,
            processed_at: None,
        };

        match store.record_receipt(&receipt, self.rewards.duplicate_window_minutes)? {
            RecordOutcome::Duplicate => {
                warn!(merchant = %receipt.merchant, total = receipt.total_amount, "Duplicate receipt rejected");
                Err(ProcessError::Duplicate {
                    merchant: receipt.merchant,
                    total: receipt.total_amount,
                })
            }
            RecordOutcome::Recorded { receipt_id } => {
                info!(receipt_id, points, "Receipt processed");
                receipt.id = Some(receipt_id);
                Ok(receipt)
            }
        }
    }
}
