//! MemeScan - Main Entry Point

use api::{init_logging, run_server, AppConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    info!("=== MemeScan v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Starting meme classification service...");

    let config = AppConfig::load()?;
    run_server(config).await?;

    Ok(())
}
