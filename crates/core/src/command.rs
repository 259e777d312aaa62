use crate::domain::ChartRequest;
use crate::error::{AnalysisError, GENERIC_FAILURE_MESSAGE};
use crate::fetch::{validate_attachment, AttachmentSource};
use crate::interpret::interpret;
use crate::llm::{CompletionClient, CompletionPrompt};
use crate::present::{present, Presentation};
use chrono::{DateTime, Utc};

pub const COMMAND_NAME: &str = "perp";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Embed(Presentation),
    Text(String),
}

/// Where the single reply of an invocation goes.
#[async_trait::async_trait]
pub trait ReplySink: Send + Sync {
    async fn send(&self, reply: Reply) -> anyhow::Result<()>;
}

pub async fn analyze_chart(
    source: &dyn AttachmentSource,
    llm: &dyn CompletionClient,
    request: &ChartRequest,
    now: DateTime<Utc>,
) -> Result<Presentation, AnalysisError> {
    validate_attachment(&request.attachment)?;

    let image = source.fetch(&request.attachment).await?;
    let prompt = CompletionPrompt::new(request.timeframe, &image);
    let raw = llm.complete(&prompt).await?;

    let record = interpret(&raw);
    tracing::info!(
        provider = ?llm.provider(),
        timeframe = %request.timeframe,
        recommendation = %record.recommendation,
        certainty = record.certainty,
        "chart analyzed"
    );

    Ok(present(
        &record,
        request.timeframe,
        &request.attachment.url,
        now,
    ))
}

/// Runs one invocation and makes sure the user ends up with a reply. Returns
/// the last reply that was attempted.
///
/// A rejected embed (for example a field over the platform's size limit) is
/// replaced once by the generic failure text. Text replies are not retried.
pub async fn handle_invocation(
    source: &dyn AttachmentSource,
    llm: &dyn CompletionClient,
    sink: &dyn ReplySink,
    request: &ChartRequest,
) -> Reply {
    let reply = match analyze_chart(source, llm, request, Utc::now()).await {
        Ok(presentation) => Reply::Embed(presentation),
        Err(err) => {
            tracing::error!(
                timeframe = %request.timeframe,
                kind = err.kind(),
                error = %err,
                "chart analysis failed"
            );
            Reply::Text(err.user_message().to_string())
        }
    };

    let err = match sink.send(reply.clone()).await {
        Ok(()) => return reply,
        Err(e) => e,
    };

    match reply {
        Reply::Embed(_) => {
            tracing::error!(error = %err, "embed reply rejected; sending failure text");
            let fallback = Reply::Text(GENERIC_FAILURE_MESSAGE.to_string());
            if let Err(e) = sink.send(fallback.clone()).await {
                tracing::error!(error = %e, "failed to deliver reply");
            }
            fallback
        }
        Reply::Text(_) => {
            tracing::error!(error = %err, "failed to deliver reply");
            reply
        }
    }
}
