use anyhow::Result;
use leadscope::core::ConfigManager;
use leadscope::web::start_web_server;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration using unified ConfigManager
    let config = ConfigManager::load()?;
    start_web_server(config).await
}
