//! Block Translator Web - upload a PDF, download it translated.

mod helpers;
mod routes;
mod state;
mod templates;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use blocktrans_core::{AppConfig, Backend};
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter, prelude::*};

use state::AppState;

#[derive(Debug, Clone, ValueEnum)]
enum BackendOption {
    Google,
    Openai,
}

impl From<BackendOption> for Backend {
    fn from(opt: BackendOption) -> Self {
        match opt {
            BackendOption::Google => Self::Google,
            BackendOption::Openai => Self::OpenAi,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "blocktrans-web")]
#[command(author, version, about = "PDF block translator web server", long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind to
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Translation backend
    #[arg(long, value_enum, env = "BLOCKTRANS_BACKEND")]
    backend: Option<BackendOption>,

    /// API base URL of the backend
    #[arg(long, env = "BLOCKTRANS_API_BASE")]
    api_base: Option<String>,

    /// API key (OpenAI-compatible backend)
    #[arg(long, env = "BLOCKTRANS_API_KEY")]
    api_key: Option<String>,

    /// Model name (OpenAI-compatible backend)
    #[arg(long, env = "BLOCKTRANS_MODEL")]
    model: Option<String>,

    /// Largest accepted upload in megabytes
    #[arg(long, default_value = "50")]
    max_upload_mb: usize,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn load_config(&self) -> Result<AppConfig> {
        let mut config = match self.config {
            Some(ref path) => AppConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => AppConfig::load(),
        };

        if let Some(ref backend) = self.backend {
            config.translator.backend = backend.clone().into();
        }
        if let Some(ref api_base) = self.api_base {
            config.translator.api_base = Some(api_base.clone());
        }
        if let Some(ref api_key) = self.api_key {
            config.translator.api_key = Some(api_key.clone());
        }
        if let Some(ref model) = self.model {
            config.translator.model.clone_from(model);
        }

        Ok(config)
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let config = args.load_config()?;
    let max_upload_bytes = args.max_upload_mb * 1024 * 1024;

    let state = Arc::new(
        AppState::new(config, max_upload_bytes)
            .context("Failed to initialize application state")?,
    );
    info!(
        "Using {:?} backend ({} -> {})",
        state.config.translator.backend, state.config.source_lang, state.config.target_lang
    );

    let app = Router::new()
        .route("/", get(routes::index))
        .route("/api/translate", post(routes::translate_pdf))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
