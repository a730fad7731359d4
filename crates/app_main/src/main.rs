//! OmniFiler - browse local folders, ZIP archives and FTP servers
//!
//! Console front-end over the browsing engine.

mod app;
mod command;
mod console;

use anyhow::Result;

fn main() -> Result<()> {
    // Logging needs the configured level, so read config before anything else
    let (config, config_error) = match app_core::AppConfig::load() {
        Ok(config) => (config, None),
        Err(e) => (app_core::AppConfig::default(), Some(e)),
    };

    let _log_guard = app_log::init(&config.general.log_level)?;

    if let Some(e) = config_error {
        tracing::warn!("Using default configuration: {:#}", e);
    }

    // Clean up old logs (7 days)
    if let Err(e) = app_log::cleanup_old_logs(7) {
        tracing::warn!("Failed to cleanup old logs: {}", e);
    }

    tracing::info!("OmniFiler starting...");

    app::run(config)
}
