// src/ocr_client.rs

use crate::config::OcrConfig;
use crate::error::ProcessError;
use crate::heuristics::TextObservation;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

/// The external preprocessing + recognition service.
///
/// Built once at startup and shared by every request.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(
        &self,
        image: &[u8],
        content_type: &str,
    ) -> Result<Vec<TextObservation>, ProcessError>;
}

#[derive(Debug, Deserialize)]
struct RecognizeResponse {
    observations: Vec<TextObservation>,
}

/// Talks to a recognition service over HTTP.
///
/// The service takes the raw image body and answers with
/// `{"observations": [{"text": "...", "confidence": 0.93}, ...]}`.
pub struct HttpOcrEngine {
    client: Client,
    endpoint: String,
}

impl HttpOcrEngine {
    pub fn new(config: &OcrConfig) -> Result<Self, ProcessError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProcessError::RecognitionFailure(format!("HTTP client setup: {e}")))?;

        info!(endpoint = %config.endpoint, timeout = config.timeout_secs, "OCR engine ready");
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl OcrEngine for HttpOcrEngine {
    async fn recognize(
        &self,
        image: &[u8],
        content_type: &str,
    ) -> Result<Vec<TextObservation>, ProcessError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", content_type)
            .body(image.to_vec())
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "OCR service unreachable");
                ProcessError::RecognitionFailure(e.to_string())
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProcessError::RecognitionFailure(e.to_string()))?;

        if !status.is_success() {
            return Err(classify_failure(status, &body));
        }

        let observations = parse_observations(&body)?;
        info!(observations = observations.len(), "OCR response received");
        Ok(observations)
    }
}

/// Map a non-success status to our error kinds. The service rejects images it
/// cannot decode with a 4xx; everything else is on the recognition side.
fn classify_failure(status: StatusCode, body: &str) -> ProcessError {
    let detail = if body.is_empty() {
        status.to_string()
    } else {
        format!("{status}: {body}")
    };
    match status {
        StatusCode::BAD_REQUEST
        | StatusCode::UNSUPPORTED_MEDIA_TYPE
        | StatusCode::UNPROCESSABLE_ENTITY => ProcessError::PreprocessingFailure(detail),
        _ => ProcessError::RecognitionFailure(detail),
    }
}

fn parse_observations(body: &str) -> Result<Vec<TextObservation>, ProcessError> {
    let parsed: RecognizeResponse = serde_json::from_str(body).map_err(|e| {
        ProcessError::RecognitionFailure(format!("Malformed OCR response: {e}"))
    })?;
    Ok(parsed.observations)
}
