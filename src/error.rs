use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::games::simon::engine::GameState;

#[derive(Debug, Error)]
pub enum GameError
{
    #[error("terminal error: {0}")]
    Terminal(#[from] io::Error),

    #[error("failed to read config '{path}': {source}")]
    ConfigRead
    {
        path: PathBuf,
        source: io::Error,
    },

    #[error("failed to parse config '{path}': {source}")]
    ConfigParse
    {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("score file '{path}': {source}")]
    ScoreIo
    {
        path: PathBuf,
        source: io::Error,
    },

    #[error("score file '{path}' is not valid JSON: {source}")]
    ScoreFormat
    {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("settings can only change while idle (current state: {0})")]
    SettingsLocked(GameState),

    #[error("a game is already running (current state: {0})")]
    GameInProgress(GameState),

    #[error("unknown game '{0}'. Run with --help.")]
    UnknownGame(String),

    #[error("invalid selection")]
    InvalidSelection,

    #[error("unable to resolve a data directory; pass --data-dir")]
    NoDataDir,
}

pub type Result<T> = std::result::Result<T, GameError>;
