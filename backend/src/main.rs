use backend::api;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};
use uci_engine::EngineHandle;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    dotenv::dotenv().ok();

    // Engine Startup
    let engine_path = std::env::var("STOCKFISH_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_engine_path());

    let engine = Arc::new(EngineHandle::new());
    match engine.initialize(&engine_path).await {
        Ok(()) => info!("Stockfish running from {}", engine_path.display()),
        // Degraded mode: every /get-move answers 503 until a restart.
        Err(e) => error!("Could not start Stockfish ({e}), serving without an engine"),
    }

    // HTTP Server
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(8000);

    let app = api::router(engine.clone());
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("API listening on {}", addr);
    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind API port");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("API server failed");

    engine.shutdown().await;
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
    }
}

fn default_engine_path() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from("stockfish/stockfish-windows-x86-64-avx2.exe")
    } else {
        PathBuf::from("stockfish/stockfish-linux")
    }
}
