use crate::domain::{Attachment, ChartImage};
use crate::error::AnalysisError;
use anyhow::Context;
use std::path::PathBuf;

const IMAGE_MEDIA_TYPE_PREFIX: &str = "image/";

/// Checks the caller-declared content type. The downloaded bytes are never
/// sniffed.
pub fn validate_attachment(attachment: &Attachment) -> Result<&str, AnalysisError> {
    match attachment.content_type.as_deref() {
        Some(ct) if ct.starts_with(IMAGE_MEDIA_TYPE_PREFIX) => Ok(ct),
        other => Err(AnalysisError::InvalidAttachment {
            content_type: other.map(str::to_string),
        }),
    }
}

#[async_trait::async_trait]
pub trait AttachmentSource: Send + Sync {
    /// Retrieves the attachment bytes. Callers validate the attachment first.
    async fn fetch(&self, attachment: &Attachment) -> Result<ChartImage, AnalysisError>;
}

#[derive(Debug, Clone)]
pub struct HttpAttachmentSource {
    http: reqwest::Client,
}

impl HttpAttachmentSource {
    pub fn new() -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("failed to build attachment http client")?;
        Ok(Self { http })
    }
}

#[async_trait::async_trait]
impl AttachmentSource for HttpAttachmentSource {
    async fn fetch(&self, attachment: &Attachment) -> Result<ChartImage, AnalysisError> {
        let media_type = validate_attachment(attachment)?.to_string();
        let fetch_failed = |detail: String| AnalysisError::FetchFailed {
            url: attachment.url.clone(),
            detail,
        };

        let res = self
            .http
            .get(&attachment.url)
            .send()
            .await
            .map_err(|e| fetch_failed(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            return Err(fetch_failed(format!("status={status}")));
        }

        let bytes = res
            .bytes()
            .await
            .map_err(|e| fetch_failed(format!("failed to read body: {e}")))?;

        tracing::debug!(url = %attachment.url, len = bytes.len(), %media_type, "attachment fetched");

        Ok(ChartImage {
            bytes: bytes.to_vec(),
            media_type,
        })
    }
}

/// Reads attachments whose `url` is a local filesystem path.
#[derive(Debug, Clone, Default)]
pub struct FileAttachmentSource;

#[async_trait::async_trait]
impl AttachmentSource for FileAttachmentSource {
    async fn fetch(&self, attachment: &Attachment) -> Result<ChartImage, AnalysisError> {
        let media_type = validate_attachment(attachment)?.to_string();
        let path = PathBuf::from(&attachment.url);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| AnalysisError::FetchFailed {
                url: attachment.url.clone(),
                detail: e.to_string(),
            })?;

        Ok(ChartImage { bytes, media_type })
    }
}
