use crate::config::Settings;
use crate::error::AnalysisError;
use crate::llm::{CompletionClient, CompletionPrompt, Provider};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_MODEL: &str = "nvidia/nemotron-nano-12b-v2-vl:free";
const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 1500;

#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenRouterClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_openrouter_api_key()?.to_string();
        let base_url = settings
            .openrouter_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = settings
            .openrouter_model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = settings.openrouter_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self::new(http, api_key, base_url, model))
    }

    pub fn new(http: reqwest::Client, api_key: String, base_url: String, model: String) -> Self {
        Self {
            http,
            api_key,
            base_url,
            model,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body<'a>(&'a self, prompt: &'a CompletionPrompt) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: vec![
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: &prompt.image_data_uri,
                        },
                    },
                    ContentPart::Text {
                        text: &prompt.instruction_text,
                    },
                ],
            }],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        }
    }

    fn first_choice_text(res: ChatCompletionResponse) -> Option<String> {
        res.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .filter(|content| !content.is_empty())
    }
}

#[async_trait::async_trait]
impl CompletionClient for OpenRouterClient {
    fn provider(&self) -> Provider {
        Provider::OpenRouter
    }

    async fn complete(&self, prompt: &CompletionPrompt) -> Result<String, AnalysisError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        tracing::info!(model = %self.model, image_uri_len = prompt.image_data_uri.len(), "sending completion request");

        let res = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| AnalysisError::ProviderError {
                status: None,
                body: e.to_string(),
            })?;

        let status = res.status();
        let text = res.text().await.map_err(|e| AnalysisError::ProviderError {
            status: Some(status.as_u16()),
            body: format!("failed to read response body: {e}"),
        })?;

        if !status.is_success() {
            tracing::error!(%status, body = %text, "completion provider error");
            return Err(AnalysisError::ProviderError {
                status: Some(status.as_u16()),
                body: text,
            });
        }

        let parsed = match serde_json::from_str::<ChatCompletionResponse>(&text) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, body = %text, "completion response is not the expected JSON");
                return Err(AnalysisError::EmptyCompletion);
            }
        };

        let content = Self::first_choice_text(parsed).ok_or(AnalysisError::EmptyCompletion)?;
        tracing::info!(len = content.len(), "completion received");
        Ok(content)
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Clone, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
enum ContentPart<'a> {
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl<'a> },

    #[serde(rename = "text")]
    Text { text: &'a str },
}

#[derive(Debug, Clone, Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
