use std::fs::{self, OpenOptions};
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::Settings;

/// Logs go to a file because the game owns the terminal.
pub fn init(settings: &Settings) -> Result<(), String>
{
    if let Some(parent) = settings.log_file.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| format!("failed to create log dir '{}': {err}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&settings.log_file)
        .map_err(|err| format!("failed to open log file '{}': {err}", settings.log_file.display()))?;

    let filter = EnvFilter::try_new(&settings.log_filter)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|err| err.to_string())
}
