use market_server::utils::logger::init_logger;
use market_server::{Config, Server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // 1. Configuration (.env, then environment)
    let config = Config::from_env()?;

    // 2. Logging
    init_logger(config.log_json, config.log_dir.as_deref())?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Market server starting...");

    // 3. Serve
    if let Err(e) = Server::new(config).run().await {
        tracing::error!("Server error: {}", e);
        return Err(e);
    }

    Ok(())
}
