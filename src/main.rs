//! refblame - refactoring-aware blame server
//!
//! # Usage
//! ```bash
//! refblame /path/to/repository                    # Start server on port 3001
//! refblame /path/to/repository --timeout-secs 30  # Bound each query
//! refblame . --tie-break line-delta,similarity    # Custom tie-break order
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use refblame::config::TrackerConfig;
use refblame::git::GitRepository;
use refblame::routes::{self, AppState};
use refblame::structure::{BraceModel, ModelConfig};
use refblame::tracker::{TieBreakPolicy, Tracker};

/// refblame - blame that follows renames, moves and extractions
#[derive(Parser)]
#[command(name = "refblame")]
#[command(about = "Refactoring-aware blame server for git repositories", long_about = None)]
struct Cli {
    /// Path to the git repository to serve
    #[arg(value_name = "REPO_PATH")]
    repo_path: String,

    /// Port to run the server on
    #[arg(short, long, default_value = "3001")]
    port: u16,

    /// Abort queries that run longer than this
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// Tie-break order for equally plausible matches
    #[arg(long, default_value_t = TieBreakPolicy::default())]
    tie_break: TieBreakPolicy,

    /// Minimum body similarity for renamed or moved declarations
    #[arg(long, default_value_t = ModelConfig::default().similarity_threshold)]
    similarity_threshold: f64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing (quieter for production)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let repo = match GitRepository::open(&cli.repo_path) {
        Ok(r) => Arc::new(r),
        Err(e) => {
            eprintln!("✗ Failed to open repository: {}", e);
            eprintln!("  Path: {}", cli.repo_path);
            std::process::exit(1);
        }
    };

    let canonical_path = std::fs::canonicalize(&cli.repo_path)
        .unwrap_or_else(|_| PathBuf::from(&cli.repo_path))
        .to_string_lossy()
        .to_string();

    let config = TrackerConfig {
        query_timeout: cli.timeout_secs.map(Duration::from_secs),
        tie_break: cli.tie_break,
        model: ModelConfig {
            similarity_threshold: cli.similarity_threshold,
            ..ModelConfig::default()
        },
    };
    let model = BraceModel::new(config.model.clone());
    let tracker = Arc::new(Tracker::new(repo.clone(), Arc::new(model), config));

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(routes::create_router(AppState { tracker, repo }))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Bind to the port
    let addr = format!("127.0.0.1:{}", cli.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("✗ Failed to bind to port {}: {}", cli.port, e);
            eprintln!("  Try a different port with --port <PORT>");
            std::process::exit(1);
        }
    };

    println!();
    println!("  refblame");
    println!();
    println!("  Repository: {}", canonical_path);
    println!("  Server:     http://{}", addr);
    println!();
    println!("  Press Ctrl+C to stop");
    println!();

    // Set up graceful shutdown
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
        println!("\n  Shutting down...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
