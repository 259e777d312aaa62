use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use perpbot_core::command::handle_invocation;
use perpbot_core::fetch::{AttachmentSource, HttpAttachmentSource};
use perpbot_core::llm::openrouter::OpenRouterClient;
use perpbot_core::llm::CompletionClient;
use serde_json::Value;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod discord;
mod tasks;

use discord::{DiscordWebhookSink, Interaction};
use tasks::InvocationTasks;

const INVALID_OPTIONS_MESSAGE: &str = "❌ Invalid command options.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = perpbot_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let llm = OpenRouterClient::from_settings(&settings).inspect_err(|e| {
        sentry_anyhow::capture_anyhow(e);
    })?;
    tracing::info!(model = %llm.model(), "completion client ready");

    let state = AppState {
        source: Arc::new(HttpAttachmentSource::new()?),
        llm: Arc::new(llm),
        http: reqwest::Client::new(),
        tasks: InvocationTasks::default(),
        discord_api_base_url: settings
            .discord_api_base_url
            .clone()
            .unwrap_or_else(|| discord::DEFAULT_API_BASE_URL.to_string()),
    };

    let tasks = state.tasks.clone();
    let app = router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!(in_flight = tasks.in_flight().await, "waiting for in-flight invocations");
    let drained = tasks.drain().await;
    tracing::info!(drained, "shutdown complete");

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/interactions", post(interactions))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    source: Arc<dyn AttachmentSource>,
    llm: Arc<dyn CompletionClient>,
    http: reqwest::Client,
    tasks: InvocationTasks,
    discord_api_base_url: String,
}

async fn interactions(
    State(state): State<AppState>,
    Json(interaction): Json<Interaction>,
) -> Result<Json<Value>, StatusCode> {
    match interaction.kind {
        discord::INTERACTION_PING => Ok(Json(discord::pong())),
        discord::INTERACTION_APPLICATION_COMMAND => {
            let data = interaction.data.as_ref().ok_or(StatusCode::BAD_REQUEST)?;
            if !data.is_chart_command() {
                tracing::warn!(command = %data.name, "unknown command");
                return Err(StatusCode::BAD_REQUEST);
            }

            let request = match data.chart_request() {
                Ok(request) => request,
                Err(e) => {
                    tracing::warn!(interaction_id = %interaction.id, error = %e, "invalid command options");
                    return Ok(Json(discord::immediate_message(INVALID_OPTIONS_MESSAGE)));
                }
            };

            let sink = DiscordWebhookSink::new(
                state.http.clone(),
                &state.discord_api_base_url,
                &interaction.application_id,
                &interaction.token,
            );
            tracing::info!(
                interaction_id = %interaction.id,
                timeframe = %request.timeframe,
                filename = request.attachment.filename.as_deref().unwrap_or("<unnamed>"),
                "chart command accepted"
            );
            let (source, llm) = (state.source.clone(), state.llm.clone());
            state
                .tasks
                .spawn(async move {
                    handle_invocation(&*source, &*llm, &sink, &request).await;
                })
                .await;

            Ok(Json(discord::deferred()))
        }
        other => {
            tracing::warn!(kind = other, "unsupported interaction type");
            Err(StatusCode::BAD_REQUEST)
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &perpbot_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
