use anyhow::{bail, Context};
use perpbot_core::command::{Reply, ReplySink, COMMAND_NAME};
use perpbot_core::domain::{Attachment, ChartRequest, Timeframe};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

pub const DEFAULT_API_BASE_URL: &str = "https://discord.com/api/v10";

pub const INTERACTION_PING: u8 = 1;
pub const INTERACTION_APPLICATION_COMMAND: u8 = 2;

pub const RESPONSE_PONG: u8 = 1;
pub const RESPONSE_CHANNEL_MESSAGE: u8 = 4;
pub const RESPONSE_DEFERRED_CHANNEL_MESSAGE: u8 = 5;

const OPTION_TIMEFRAME: &str = "timeframe";
const OPTION_CHART: &str = "chart";

#[derive(Debug, Clone, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub application_id: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub data: Option<CommandData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandData {
    pub name: String,
    #[serde(default)]
    pub options: Vec<CommandOption>,
    #[serde(default)]
    pub resolved: Option<Resolved>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandOption {
    pub name: String,
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Resolved {
    #[serde(default)]
    pub attachments: HashMap<String, ResolvedAttachment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResolvedAttachment {
    pub url: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

impl CommandData {
    pub fn is_chart_command(&self) -> bool {
        self.name == COMMAND_NAME
    }

    fn option_str(&self, name: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.name == name)
            .and_then(|o| o.value.as_ref())
            .and_then(Value::as_str)
    }

    /// Resolves the `timeframe` and `chart` options into a request.
    pub fn chart_request(&self) -> anyhow::Result<ChartRequest> {
        let timeframe = self
            .option_str(OPTION_TIMEFRAME)
            .context("missing timeframe option")?
            .parse::<Timeframe>()?;

        let attachment_id = self
            .option_str(OPTION_CHART)
            .context("missing chart option")?;
        let resolved = self
            .resolved
            .as_ref()
            .and_then(|r| r.attachments.get(attachment_id))
            .with_context(|| format!("attachment {attachment_id} not resolved"))?;

        Ok(ChartRequest {
            timeframe,
            attachment: Attachment {
                url: resolved.url.clone(),
                content_type: resolved.content_type.clone(),
                filename: resolved.filename.clone(),
            },
        })
    }
}

pub fn pong() -> Value {
    json!({ "type": RESPONSE_PONG })
}

pub fn deferred() -> Value {
    json!({ "type": RESPONSE_DEFERRED_CHANNEL_MESSAGE })
}

pub fn immediate_message(content: &str) -> Value {
    json!({
        "type": RESPONSE_CHANNEL_MESSAGE,
        "data": { "content": content },
    })
}

/// Edits the deferred original response of one interaction.
#[derive(Debug, Clone)]
pub struct DiscordWebhookSink {
    http: reqwest::Client,
    api_base_url: String,
    application_id: String,
    token: String,
}

impl DiscordWebhookSink {
    pub fn new(
        http: reqwest::Client,
        api_base_url: &str,
        application_id: &str,
        token: &str,
    ) -> Self {
        Self {
            http,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            application_id: application_id.to_string(),
            token: token.to_string(),
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/webhooks/{}/{}/messages/@original",
            self.api_base_url, self.application_id, self.token
        )
    }

    pub fn body(reply: &Reply) -> Value {
        match reply {
            Reply::Embed(presentation) => json!({ "content": "", "embeds": [presentation] }),
            Reply::Text(text) => json!({ "content": text, "embeds": [] }),
        }
    }

    async fn patch_original(&self, reply: &Reply) -> anyhow::Result<()> {
        let res = self
            .http
            .patch(self.url())
            .json(&Self::body(reply))
            .send()
            .await
            .context("interaction reply request failed")?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            bail!("interaction reply rejected: status={status} body={body}");
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ReplySink for DiscordWebhookSink {
    async fn send(&self, reply: Reply) -> anyhow::Result<()> {
        self.patch_original(&reply).await.inspect_err(|e| {
            sentry_anyhow::capture_anyhow(e);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Path, State},
        routing::patch,
        Json, Router,
    };
    use perpbot_core::present::{Footer, Presentation, Thumbnail};
    use tokio::sync::mpsc;

    fn command(value: Value) -> CommandData {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn resolves_timeframe_and_attachment() {
        let data = command(json!({
            "name": "perp",
            "options": [
                {"name": "timeframe", "type": 3, "value": "1h"},
                {"name": "chart", "type": 11, "value": "999"}
            ],
            "resolved": {"attachments": {"999": {
                "id": "999",
                "url": "https://cdn.discordapp.com/attachments/1/999/chart.png",
                "content_type": "image/png",
                "filename": "chart.png",
                "size": 1234
            }}}
        }));

        assert!(data.is_chart_command());
        let req = data.chart_request().unwrap();
        assert_eq!(req.timeframe, Timeframe::OneHour);
        assert_eq!(
            req.attachment.url,
            "https://cdn.discordapp.com/attachments/1/999/chart.png"
        );
        assert_eq!(req.attachment.content_type.as_deref(), Some("image/png"));
        assert_eq!(req.attachment.filename.as_deref(), Some("chart.png"));
    }

    #[test]
    fn rejects_unknown_timeframe_and_unresolved_attachment() {
        let bad_tf = command(json!({
            "name": "perp",
            "options": [
                {"name": "timeframe", "value": "3h"},
                {"name": "chart", "value": "1"}
            ],
            "resolved": {"attachments": {"1": {"url": "u", "content_type": "image/png"}}}
        }));
        assert!(bad_tf.chart_request().is_err());

        let missing = command(json!({
            "name": "perp",
            "options": [
                {"name": "timeframe", "value": "4h"},
                {"name": "chart", "value": "2"}
            ],
            "resolved": {"attachments": {"1": {"url": "u"}}}
        }));
        assert!(missing.chart_request().is_err());

        let no_options = command(json!({"name": "perp"}));
        assert!(no_options.chart_request().is_err());
    }

    #[test]
    fn text_reply_clears_embeds() {
        let body = DiscordWebhookSink::body(&Reply::Text("❌ nope".to_string()));
        assert_eq!(body, json!({"content": "❌ nope", "embeds": []}));
    }

    #[tokio::test]
    async fn sink_patches_original_response() {
        let (tx, mut rx) = mpsc::unbounded_channel::<(String, String, Value)>();
        let app = Router::new()
            .route(
                "/webhooks/:app_id/:token/messages/@original",
                patch(
                    |State(tx): State<mpsc::UnboundedSender<(String, String, Value)>>,
                     Path((app_id, token)): Path<(String, String)>,
                     Json(body): Json<Value>| async move {
                        let _ = tx.send((app_id, token, body));
                        Json(json!({"id": "1"}))
                    },
                ),
            )
            .with_state(tx);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let sink = DiscordWebhookSink::new(
            reqwest::Client::new(),
            &format!("http://{addr}/"),
            "app123",
            "tok456",
        );
        let presentation = Presentation {
            title: "t".to_string(),
            color: 0x00ff00,
            fields: vec![],
            thumbnail: Thumbnail {
                url: "u".to_string(),
            },
            footer: Footer {
                text: "f".to_string(),
            },
            timestamp: "2026-01-01T00:00:00.000Z".to_string(),
        };
        sink.send(Reply::Embed(presentation)).await.unwrap();

        let (app_id, token, body) = rx.recv().await.unwrap();
        assert_eq!(app_id, "app123");
        assert_eq!(token, "tok456");
        assert_eq!(body["embeds"][0]["title"], "t");
        assert_eq!(body["embeds"][0]["color"], 0x00ff00);
    }

    #[tokio::test]
    async fn rejected_patch_is_an_error_with_status_and_body() {
        let app = Router::new().route(
            "/webhooks/:app_id/:token/messages/@original",
            patch(|| async {
                (
                    axum::http::StatusCode::BAD_REQUEST,
                    "Invalid Form Body (embeds.0.fields.6.value)",
                )
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let sink = DiscordWebhookSink::new(
            reqwest::Client::new(),
            &format!("http://{addr}"),
            "app",
            "tok",
        );
        let err = sink
            .send(Reply::Text("❌ nope".to_string()))
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("status=400"));
        assert!(err.contains("embeds.0.fields.6.value"));
    }
}
