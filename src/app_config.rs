use anyhow::{bail, Result};
use colored::Colorize;
use fundamental_screener::screener::config;

/// Application configuration handler
pub struct AppConfig {
    pub mode: String,
    pub port: u16,
}

impl AppConfig {
    /// Create new configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            mode: config::get_execution_mode().trim().to_lowercase(),
            port: config::get_port(),
        }
    }

    /// Log configuration details for CI environments
    pub fn log_ci_config(&self) {
        if config::is_ci_environment() {
            println!("{}", "Running in CI environment (GitHub Actions)".blue().bold());
            println!("{} Mode: {}", "→".cyan(), self.mode.yellow());

            if self.mode == "server" {
                println!("{} Server mode not supported in CI - switching to scan", "⚠".yellow());
            }
            println!();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            bail!("SCREENER_PORT must be a non-zero port number");
        }
        Ok(())
    }
}
