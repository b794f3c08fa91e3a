//! AI Chat API Server
//!
//! Runs the chat proxy as a standalone HTTP server in front of the
//! configured LLM provider.

use ai_chat_api::config::Settings;
use ai_chat_api::provider::ProviderClient;
use ai_chat_api::server;
use ai_chat_api::service::ChatService;
use anyhow::Result;
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "chat-server")]
#[command(about = "AI Chat API - HTTP proxy in front of configurable LLM providers")]
struct Args {
    /// Server port
    #[arg(short, long, default_value = "8000", env = "PORT")]
    port: u16,

    /// Server host
    #[arg(long, default_value = "0.0.0.0", env = "HOST")]
    host: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ai_chat_api=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    // Configuration problems are fatal: refuse to come up rather than serve
    // requests that can only fail.
    let settings = Settings::from_env()?;
    let provider = ProviderClient::from_settings(&settings)?;

    info!("Starting {}", settings.project_name);
    info!(
        "  provider: {} (model {})",
        settings.provider.as_str(),
        provider.model()
    );

    let service = ChatService::new(provider);
    server::run_server(settings, service, &args.host, args.port).await
}
