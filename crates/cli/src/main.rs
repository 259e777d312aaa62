use clap::Parser;
use perpbot_core::command::{handle_invocation, Reply, ReplySink};
use perpbot_core::domain::{Attachment, ChartRequest, Timeframe};
use perpbot_core::fetch::{AttachmentSource, FileAttachmentSource, HttpAttachmentSource};
use perpbot_core::llm::openrouter::OpenRouterClient;
use perpbot_core::present::Presentation;
use std::path::Path;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "perpbot_cli", about = "Analyze a crypto chart image once and print the reply")]
struct Args {
    /// Chart timeframe (1m, 5m, 15m, 30m, 1h, 4h, 1d, 1w).
    #[arg(long)]
    timeframe: Timeframe,

    /// Local image path or http(s) URL.
    #[arg(long)]
    chart: String,

    /// Declared content type. Guessed from the file extension when omitted.
    #[arg(long)]
    content_type: Option<String>,

    /// Print the reply as JSON instead of text.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = perpbot_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let llm = OpenRouterClient::from_settings(&settings).inspect_err(|e| {
        sentry_anyhow::capture_anyhow(e);
    })?;

    let request = chart_request(&args);
    tracing::info!(
        timeframe = %request.timeframe,
        chart = %request.attachment.url,
        filename = request.attachment.filename.as_deref().unwrap_or("<unnamed>"),
        content_type = request.attachment.content_type.as_deref().unwrap_or("<none>"),
        "analyzing chart"
    );

    let source: Box<dyn AttachmentSource> = if is_remote(&args.chart) {
        Box::new(HttpAttachmentSource::new()?)
    } else {
        Box::new(FileAttachmentSource)
    };

    let sink = StdoutSink { json: args.json };
    match handle_invocation(source.as_ref(), &llm, &sink, &request).await {
        Reply::Embed(_) => tracing::info!("analysis delivered"),
        Reply::Text(text) => tracing::error!(reply = %text, "analysis failed"),
    }
    Ok(())
}

fn chart_request(args: &Args) -> ChartRequest {
    let content_type = args
        .content_type
        .clone()
        .or_else(|| guess_content_type(&args.chart).map(str::to_string));
    let path = args.chart.split(['?', '#']).next().unwrap_or(&args.chart);
    ChartRequest {
        timeframe: args.timeframe,
        attachment: Attachment {
            url: args.chart.clone(),
            content_type,
            filename: Path::new(path)
                .file_name()
                .map(|s| s.to_string_lossy().into_owned()),
        },
    }
}

struct StdoutSink {
    json: bool,
}

#[async_trait::async_trait]
impl ReplySink for StdoutSink {
    async fn send(&self, reply: Reply) -> anyhow::Result<()> {
        let out = if self.json {
            match &reply {
                Reply::Embed(p) => serde_json::to_string_pretty(&serde_json::json!({ "embeds": [p] }))?,
                Reply::Text(t) => serde_json::to_string_pretty(&serde_json::json!({ "content": t }))?,
            }
        } else {
            match &reply {
                Reply::Embed(p) => render_text(p),
                Reply::Text(t) => t.clone(),
            }
        };
        println!("{out}");
        Ok(())
    }
}

fn render_text(p: &Presentation) -> String {
    let mut lines = vec![p.title.clone(), String::new()];
    for field in &p.fields {
        if field.inline {
            lines.push(format!("{}: {}", field.name, field.value));
        } else {
            lines.push(String::new());
            lines.push(field.name.clone());
            lines.push(field.value.clone());
        }
    }
    lines.push(String::new());
    lines.push(p.footer.text.clone());
    lines.join("\n")
}

fn is_remote(chart: &str) -> bool {
    chart.starts_with("http://") || chart.starts_with("https://")
}

fn guess_content_type(chart: &str) -> Option<&'static str> {
    let path = chart.split(['?', '#']).next().unwrap_or(chart);
    let ext = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
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
