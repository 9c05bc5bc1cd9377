use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::error::{GameError, Result};
use crate::games::simon::engine::{Difficulty, Timings};

const APP_DIR: &str = "simon-kb";
const CONFIG_FILE: &str = "config.toml";
const LOG_FILE: &str = "simon-kb.log";
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone)]
pub struct Settings
{
    pub data_dir: PathBuf,
    pub log_file: PathBuf,
    pub log_filter: String,
    pub difficulty: Difficulty,
    pub strict: bool,
    pub bell: bool,
    pub timings: Timings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig
{
    data_dir: Option<PathBuf>,
    log_file: Option<PathBuf>,
    log_filter: Option<String>,
    difficulty: Option<Difficulty>,
    strict: Option<bool>,
    bell: Option<bool>,
    timings: FileTimings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileTimings
{
    highlight_ms: Option<u64>,
    step_ms: Option<u64>,
    press_ms: Option<u64>,
    playback_settle_ms: Option<u64>,
    round_settle_ms: Option<u64>,
    failure_settle_ms: Option<u64>,
    reset_grace_ms: Option<u64>,
}

impl FileTimings
{
    fn apply(&self, base: Timings) -> Timings
    {
        let ms = |value: Option<u64>, fallback: Duration| {
            value.map(Duration::from_millis).unwrap_or(fallback)
        };
        let timings = Timings {
            highlight: ms(self.highlight_ms, base.highlight),
            step: ms(self.step_ms, base.step),
            press: ms(self.press_ms, base.press),
            playback_settle: ms(self.playback_settle_ms, base.playback_settle),
            round_settle: ms(self.round_settle_ms, base.round_settle),
            failure_settle: ms(self.failure_settle_ms, base.failure_settle),
            reset_grace: ms(self.reset_grace_ms, base.reset_grace),
        };
        if timings.is_consistent() {
            timings
        } else {
            warn!(?timings, "timings need press < highlight < step, using defaults");
            base
        }
    }
}

pub fn default_config_path() -> Option<PathBuf>
{
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

/// Defaults, then the config file, then `SIMON_*` environment overrides,
/// then the `--data-dir` flag.
pub fn load_settings(config_path: Option<&Path>, data_dir_flag: Option<&Path>) -> Result<Settings>
{
    let file = match config_path {
        Some(path) => read_config(path, true)?,
        None => match default_config_path() {
            Some(path) => read_config(&path, false)?,
            None => FileConfig::default(),
        },
    };

    let data_dir = data_dir_flag
        .map(Path::to_path_buf)
        .or_else(|| env::var_os("SIMON_DATA_DIR").map(PathBuf::from))
        .or_else(|| file.data_dir.clone())
        .or_else(|| dirs::data_local_dir().map(|dir| dir.join(APP_DIR)))
        .ok_or(GameError::NoDataDir)?;

    let log_file = env::var_os("SIMON_LOG_FILE")
        .map(PathBuf::from)
        .or_else(|| file.log_file.clone())
        .unwrap_or_else(|| data_dir.join(LOG_FILE));

    let log_filter = env::var("SIMON_LOG")
        .ok()
        .or_else(|| file.log_filter.clone())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

    Ok(Settings {
        data_dir,
        log_file,
        log_filter,
        difficulty: file.difficulty.unwrap_or_default(),
        strict: file.strict.unwrap_or(false),
        bell: file.bell.unwrap_or(true),
        timings: file.timings.apply(Timings::default()),
    })
}

fn read_config(path: &Path, required: bool) -> Result<FileConfig>
{
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if !required && err.kind() == io::ErrorKind::NotFound => {
            return Ok(FileConfig::default());
        }
        Err(source) => {
            return Err(GameError::ConfigRead {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    parse_config(&raw).map_err(|source| GameError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_config(raw: &str) -> std::result::Result<FileConfig, toml::de::Error>
{
    toml::from_str(raw)
}

#[cfg(test)]
mod tests
{
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;

    #[test]
    fn parses_full_config()
    {
        let file = parse_config(
            r#"
data_dir = "/tmp/simon"
difficulty = "hard"
strict = true
bell = false

[timings]
highlight_ms = 300
step_ms = 450
press_ms = 120
"#,
        )
        .expect("parse");

        assert_eq!(file.data_dir, Some(PathBuf::from("/tmp/simon")));
        assert_eq!(file.difficulty, Some(Difficulty::Hard));
        assert_eq!(file.strict, Some(true));
        assert_eq!(file.bell, Some(false));

        let timings = file.timings.apply(Timings::default());
        assert_eq!(timings.highlight, Duration::from_millis(300));
        assert_eq!(timings.step, Duration::from_millis(450));
        assert_eq!(timings.press, Duration::from_millis(120));
        assert_eq!(timings.round_settle, Timings::default().round_settle);
    }

    #[test]
    fn inconsistent_timings_fall_back_to_defaults()
    {
        let file = parse_config("[timings]\nhighlight_ms = 900\nstep_ms = 400\n").expect("parse");
        assert_eq!(file.timings.apply(Timings::default()), Timings::default());
    }

    #[test]
    fn rejects_unknown_keys()
    {
        assert!(parse_config("colour = \"red\"\n").is_err());
        assert!(parse_config("difficulty = \"extreme\"\n").is_err());
    }

    #[test]
    fn explicit_config_must_exist()
    {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let missing = env::temp_dir().join(format!("simon_kb_missing_{suffix}.toml"));
        let err = load_settings(Some(missing.as_path()), Some(Path::new("/tmp"))).expect_err("missing file");
        assert!(matches!(err, GameError::ConfigRead { .. }));
    }

    #[test]
    fn data_dir_flag_wins()
    {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let config = env::temp_dir().join(format!("simon_kb_config_{suffix}.toml"));
        fs::write(&config, "data_dir = \"/nowhere\"\nstrict = true\n").expect("write config");

        let flag = env::temp_dir().join("simon_kb_flag_dir");
        let settings = load_settings(Some(config.as_path()), Some(flag.as_path())).expect("load");
        assert_eq!(settings.data_dir, flag);
        assert!(settings.strict);

        fs::remove_file(config).expect("cleanup");
    }
}
