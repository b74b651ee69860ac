/// Tumble Terminal - a random convex polyhedron rolling across the ground
///
/// Usage: tumble-terminal [config.json]
///
/// Controls:
///   - Space: Pause
///   - +/-: Speed up / slow down
///   - R: New shape from the next seed
///   - Q/ESC: Quit

use anyhow::{Context, Result};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{info, Level};
use tumble_terminal::config::DEFAULT_CONFIG_PATH;
use tumble_terminal::{ConfigSource, TerminalApp, TumbleConfig};

fn init_logging(config: &TumbleConfig) -> Result<()> {
    let level: Level = config
        .display
        .log_level
        .parse()
        .with_context(|| format!("Unknown log level `{}`", config.display.log_level))?;

    let file = File::create(&config.display.log_file)
        .with_context(|| format!("Failed to create log file {}", config.display.log_file.display()))?;

    // The terminal belongs to the renderer, so logs go to a file
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(level)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let (config, source) = TumbleConfig::load(&config_path)?;
    init_logging(&config)?;

    match source {
        ConfigSource::Loaded => info!("loaded configuration from {}", config_path.display()),
        ConfigSource::CreatedDefault => {
            info!("no config file found, wrote defaults to {}", config_path.display())
        }
    }

    let mut app = TerminalApp::new(config)?;
    app.run()?;

    info!("shutting down");
    Ok(())
}
