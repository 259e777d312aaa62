use thiserror::Error;

/// Reply used when nothing more specific applies.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "❌ An error occurred while analyzing the chart. Please try again.";

/// Terminal failures of a single chart invocation. None of them are retried.
///
/// Parse failures of the model output are not represented here; the
/// interpreter always produces a record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// The caller-declared content type is missing or not `image/*`.
    #[error("attachment is not an image (content_type={})", declared(.content_type))]
    InvalidAttachment { content_type: Option<String> },

    /// Transport or status failure while downloading the attachment.
    #[error("failed to fetch attachment {url}: {detail}")]
    FetchFailed { url: String, detail: String },

    /// The completion endpoint could not be reached or answered non-2xx.
    #[error("completion provider {}: {body}", outcome(.status))]
    ProviderError { status: Option<u16>, body: String },

    /// The completion endpoint answered 2xx without usable text.
    #[error("completion provider returned no text")]
    EmptyCompletion,
}

impl AnalysisError {
    /// Fixed plain-text reply shown to the user for this failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            AnalysisError::InvalidAttachment { .. } => {
                "❌ Please upload an image file (PNG, JPG, WEBP)"
            }
            AnalysisError::FetchFailed { .. } => GENERIC_FAILURE_MESSAGE,
            AnalysisError::ProviderError { .. } => "❌ Failed to analyze chart. Please try again.",
            AnalysisError::EmptyCompletion => "❌ No response from AI. Please try again.",
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::InvalidAttachment { .. } => "invalid_attachment",
            AnalysisError::FetchFailed { .. } => "fetch_failed",
            AnalysisError::ProviderError { .. } => "provider_error",
            AnalysisError::EmptyCompletion => "empty_completion",
        }
    }
}

fn declared(content_type: &Option<String>) -> &str {
    content_type.as_deref().unwrap_or("<none>")
}

fn outcome(status: &Option<u16>) -> String {
    match status {
        Some(status) => format!("returned status={status}"),
        None => "request failed".to_string(),
    }
}
