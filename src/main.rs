//! Ringpot server binary.
//!
//! Serves the ring engine over HTTP/WebSocket with an auto-approving
//! payment gate. Plug a real gate in here when wiring up an actual payment
//! backend.

use clap::Parser;
use ringpot::api::{create_router, AppState};
use ringpot::config::RingpotConfig;
use ringpot::events::EventNotifier;
use ringpot::lifecycle::RingEngine;
use ringpot::payment::AutoApproveGate;
use ringpot::store::MemoryRingStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ringpot")]
#[command(about = "Pooled-wager ring engine server", long_about = None)]
struct Args {
    /// Config file (TOML); CLI flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Server host
    #[arg(long)]
    host: Option<String>,

    /// Server port
    #[arg(long)]
    port: Option<u16>,

    /// Enable the synthetic participant driver for demo rings
    #[arg(long)]
    demo: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ringpot=info,tower_http=info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => RingpotConfig::load_from_file(path)?,
        None => RingpotConfig::default(),
    };
    if let Some(host) = args.host {
        config.api.host = host;
    }
    if let Some(port) = args.port {
        config.api.port = port;
    }
    if args.demo {
        config.demo.enabled = true;
    }
    config.validate()?;

    let store = Arc::new(MemoryRingStore::new());
    let gate = Arc::new(AutoApproveGate::new());
    let engine = Arc::new(RingEngine::new(
        store.clone(),
        gate,
        config.engine.clone(),
    ));
    let notifier = EventNotifier::new(store);

    let state = Arc::new(AppState {
        engine,
        notifier,
        demo: config.demo.clone(),
    });
    let app = create_router(state, &config.api.cors_origins);

    let addr = format!("{}:{}", config.api.host, config.api.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, demo = config.demo.enabled, "🎡 ringpot listening");

    axum::serve(listener, app).await?;
    Ok(())
}
