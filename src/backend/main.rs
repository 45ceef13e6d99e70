/**
 * logitrack-store Entry Point
 *
 * Runs the reference record store: an axum server with SQLite persistence
 * and an SSE change feed.
 */

#[cfg(feature = "ssr")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug".to_string());

    eprintln!("[STARTUP] Setting RUST_LOG={}", env_filter);

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();

    tracing::info!("[STARTUP] Record store initialization started");

    let app = logitrack::backend::server::init::create_app().await?;

    let port = logitrack::backend::server::config::server_port();
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    eprintln!("[STARTUP] Listening on {}", addr);
    eprintln!("[STARTUP] Clients should set LOGITRACK_STORE_URL=http://127.0.0.1:{}", port);
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(not(feature = "ssr"))]
fn main() {
    eprintln!("The record store requires the 'ssr' feature to be enabled.");
    eprintln!("Run with: cargo run --bin logitrack-store --features ssr");
    std::process::exit(1);
}
