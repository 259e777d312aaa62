pub mod command;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod interpret;
pub mod llm;
pub mod present;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub openrouter_api_key: Option<String>,
        pub openrouter_base_url: Option<String>,
        pub openrouter_model: Option<String>,
        pub openrouter_timeout_secs: Option<u64>,
        pub discord_api_base_url: Option<String>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let openrouter_timeout_secs = match non_empty_var("OPENROUTER_TIMEOUT_SECS") {
                Some(s) => Some(
                    s.parse::<u64>()
                        .with_context(|| format!("OPENROUTER_TIMEOUT_SECS is not a number: {s}"))?,
                ),
                None => None,
            };

            Ok(Self {
                openrouter_api_key: non_empty_var("OPENROUTER_API_KEY"),
                openrouter_base_url: non_empty_var("OPENROUTER_BASE_URL"),
                openrouter_model: non_empty_var("OPENROUTER_MODEL"),
                openrouter_timeout_secs,
                discord_api_base_url: non_empty_var("DISCORD_API_BASE_URL"),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
            })
        }

        pub fn require_openrouter_api_key(&self) -> anyhow::Result<&str> {
            self.openrouter_api_key
                .as_deref()
                .context("OPENROUTER_API_KEY is required")
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|s| !s.trim().is_empty())
    }
}
