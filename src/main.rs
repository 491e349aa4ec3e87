mod app_config;

use anyhow::Result;
use app_config::AppConfig;
use fundamental_screener::logging;
use fundamental_screener::screener::{config, ScreenerCommands};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = logging::init_logging() {
        eprintln!("Logging disabled: {:#}", e);
    }

    let app_config = AppConfig::from_env();
    app_config.validate()?;
    app_config.log_ci_config();
    info!(mode = %app_config.mode, port = app_config.port, "starting");

    match app_config.mode.as_str() {
        "server" => {
            if ScreenerCommands::handle_ci_mode_override(&app_config.mode) {
                ScreenerCommands::run_scan().await?;
            } else {
                ScreenerCommands::run_server(app_config.port).await?;
            }
        }
        "scan" => ScreenerCommands::run_scan().await?,
        _ if config::is_ci_environment() => {
            warn!(mode = %app_config.mode, "unknown mode in CI, running scan");
            ScreenerCommands::run_scan().await?;
        }
        _ => {
            warn!(mode = %app_config.mode, "unknown mode");
            ScreenerCommands::print_usage();
        }
    }

    Ok(())
}
