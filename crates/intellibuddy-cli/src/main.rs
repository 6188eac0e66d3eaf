use anyhow::Result;
use clap::Parser;

mod app;

#[derive(Parser)]
#[command(name = "intellibuddy")]
#[command(about = "IntelliBuddy - conversational AI assistant")]
#[command(version)]
struct Cli {
    /// Backend relay base URL
    #[arg(long)]
    relay_url: Option<String>,

    /// Conversation language (ISO 639-1 code)
    #[arg(short, long)]
    language: Option<String>,

    /// Keep all state in memory (skip durable counters and preferences)
    #[arg(long)]
    ephemeral: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let mut settings = intellibuddy_core::Settings::load();
    if let Some(ref url) = cli.relay_url {
        settings.relay.base_url = url.clone();
    }

    app::run(settings, cli.language, cli.ephemeral).await
}
