use thiserror::Error;

/// Ways a receipt submission can fail. The text heuristics themselves never fail.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Not an image, empty, or over the upload limit.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The OCR collaborator could not decode or enhance the image.
    #[error("image preprocessing failed: {0}")]
    PreprocessingFailure(String),

    /// The OCR engine errored or sent something we could not read.
    #[error("text recognition failed: {0}")]
    RecognitionFailure(String),

    #[error("duplicate receipt: {merchant} / {total:.2} was already processed recently")]
    Duplicate { merchant: String, total: f64 },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl ProcessError {
    /// True for errors the caller caused (bad upload, resubmission).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ProcessError::InvalidInput(_)
                | ProcessError::PreprocessingFailure(_)
                | ProcessError::Duplicate { .. }
        )
    }
}
