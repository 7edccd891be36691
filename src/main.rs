use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use llm_gateway::{
    config::{AppConfig, Environment},
    routers,
    server::AppState,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "llm-gateway",
    version,
    about = "HTTP gateway for text and vision model inference"
)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "LLM_GATEWAY_CONFIG", default_value = "config.yaml")]
    config: PathBuf,

    /// Override the API key from the configuration file
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    if let Some(api_key) = cli.api_key {
        config.api_key = api_key;
        config.validate()?;
    }

    init_tracing(&config);
    debug!("Starting up...");

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    let state = Arc::new(AppState::new(config));
    let app = routers::app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "gateway listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    debug!("Shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.environment {
        Environment::Production => builder.json().init(),
        Environment::Development => builder.init(),
    }
}
