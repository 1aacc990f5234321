use std::sync::Arc;

use pairspace_bot::config::Config;
use pairspace_bot::dispatch::Dispatcher;
use pairspace_bot::line::LineClient;
use pairspace_bot::llm::{CerebrasProvider, ChatProvider};
use pairspace_bot::server::{self, AppState};
use pairspace_bot::store::{LibSqlStore, StateStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env()?;

    eprintln!("🏠 PairSpace Bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.cerebras_model);
    eprintln!("   Webhook: http://0.0.0.0:{}/webhook", config.port);
    eprintln!("   Health:  http://0.0.0.0:{}/health", config.port);
    eprintln!("   Database: {}\n", config.db_path.display());

    let store: Arc<dyn StateStore> = Arc::new(LibSqlStore::new_local(&config.db_path).await?);
    let provider: Arc<dyn ChatProvider> = Arc::new(CerebrasProvider::new(
        config.cerebras_api_key.clone(),
        config.cerebras_model.clone(),
    ));
    let line = Arc::new(LineClient::new(config.channel_access_token.clone()));

    let dispatcher = Arc::new(Dispatcher::new(store, provider));

    let app = server::routes(AppState {
        dispatcher,
        line,
        channel_secret: config.channel_secret.clone(),
    });

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, "webhook server started");
    axum::serve(listener, app).await?;

    Ok(())
}
