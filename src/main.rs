mod assistant;
mod chart;
mod chat;
mod config;
mod dataset;
mod error;
mod model;
mod server;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use derive_more::{Display, Error};
use error_stack::{Report, ResultExt};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use assistant::Assistant;
use assistant::gemini::GeminiAssistant;
use config::AppConfig;
use server::AppState;

#[derive(Debug, Display, Error)]
pub enum AppError {
    #[display("configuration error")]
    Config,
    #[display("dataset error")]
    Dataset,
    #[display("runtime error")]
    Runtime,
}

#[derive(Parser)]
#[command(
    name = "stock-dashboard",
    about = "Candlestick dashboard with signal overlays and an assistant chat"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() {
    if let Err(report) = run().await {
        eprintln!("{report:?}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Report<AppError>> {
    let cli = Cli::parse();
    let config = config::load(Path::new(&cli.config)).change_context(AppError::Config)?;

    init_tracing(&config);

    // Fail fast on an unreadable dataset; after startup every chart
    // request re-reads it, so edits show up without a restart.
    let bars =
        dataset::load(Path::new(&config.dataset.path)).change_context(AppError::Dataset)?;
    info!(
        rows = bars.len(),
        symbol = %config.dataset.symbol,
        path = %config.dataset.path,
        "dataset loaded"
    );

    let assistant: Arc<dyn Assistant> = Arc::new(GeminiAssistant::from_env(
        &config.assistant,
        &config.dataset.symbol,
    ));

    let state = Arc::new(AppState::new(&config, assistant));
    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .change_context(AppError::Runtime)
        .attach_with(|| format!("bind: {}", config.server.bind))?;

    info!(addr = %config.server.bind, "dashboard listening");

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl+c received, shutting down");
            shutdown.cancel();
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .change_context(AppError::Runtime)?;

    info!("shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::new(&config.general.log_level);
    match config.general.log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .init();
        }
        _ => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}
