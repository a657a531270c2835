use anyhow::Result;
use clap::Parser;
use leadscope::admin_cli::{handle_admin_command, AdminCli};
use leadscope::core::ConfigManager;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("leadscope=info")),
        )
        .with_target(false)
        .init();

    let cli = AdminCli::parse();
    let config = ConfigManager::load()?;
    handle_admin_command(cli, config).await
}
