pub mod openrouter;
pub mod prompt;

use crate::error::AnalysisError;

pub use prompt::CompletionPrompt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenRouter,
}

#[async_trait::async_trait]
pub trait CompletionClient: Send + Sync {
    fn provider(&self) -> Provider;

    /// Sends one multimodal completion request and returns the raw text of the
    /// first choice.
    async fn complete(&self, prompt: &CompletionPrompt) -> Result<String, AnalysisError>;
}
