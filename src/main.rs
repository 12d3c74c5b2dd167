use specter::config::Config;
use specter::services::{Scanner, Scorer};
use specter::sources::KuCoinClient;
use specter::{api, AppState};
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "specter=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load and validate configuration; the scanner must not run with a
    // broken configuration.
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            anyhow::bail!("invalid configuration: {e}");
        }
    };
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        anyhow::bail!("invalid configuration: {e}");
    }
    let config = Arc::new(config);
    info!("Starting Specter server on {}:{}", config.host, config.port);

    // Wire the pipeline
    let market = KuCoinClient::new(config.kucoin_api_key.clone(), config.request_timeout());
    let scorer = Scorer::new(&config);
    let scanner = Arc::new(Scanner::new((*config).clone(), market, scorer));

    // Run scan cycles until shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut server_shutdown = shutdown_rx.clone();
    {
        let scanner = scanner.clone();
        tokio::spawn(async move {
            scanner.run(shutdown_rx).await;
        });
    }

    // Propagate ctrl-c to the scanner
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            let _ = shutdown_tx.send(true);
        }
    });

    let state = AppState {
        config: config.clone(),
        scanner,
    };

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the router
    let app = api::router()
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Status API listening on {}", addr);
    // The same shutdown signal stops the HTTP server, so ctrl-c
    // actually exits the process instead of leaving it serving.
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = server_shutdown.changed().await;
        })
        .await?;

    Ok(())
}
