use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::engine::Difficulty;
use crate::error::{GameError, Result};

const SCORE_FILE: &str = "simon-scores.json";

/// Best-score persistence keyed by difficulty.
pub trait ScoreStore
{
    fn best_score(&self, difficulty: Difficulty) -> u32;
    fn set_best_score(&mut self, difficulty: Difficulty, score: u32) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryScoreStore
{
    scores: HashMap<Difficulty, u32>,
}

impl ScoreStore for MemoryScoreStore
{
    fn best_score(&self, difficulty: Difficulty) -> u32
    {
        self.scores.get(&difficulty).copied().unwrap_or(0)
    }

    fn set_best_score(&mut self, difficulty: Difficulty, score: u32) -> Result<()>
    {
        self.scores.insert(difficulty, score);
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ScoreFile
{
    #[serde(default)]
    best: BTreeMap<String, u32>,
}

/// Scores kept as JSON in the data directory, rewritten on every update.
#[derive(Debug)]
pub struct JsonScoreStore
{
    path: PathBuf,
    file: ScoreFile,
}

impl JsonScoreStore
{
    pub fn open(data_dir: &Path) -> Result<Self>
    {
        let path = data_dir.join(SCORE_FILE);
        let file = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<ScoreFile>(&raw) {
                Ok(file) => file,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "score file unreadable, starting fresh");
                    ScoreFile::default()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => ScoreFile::default(),
            Err(source) => return Err(GameError::ScoreIo { path, source }),
        };
        debug!(path = %path.display(), entries = file.best.len(), "score file loaded");
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path
    {
        &self.path
    }

    pub fn clear(&mut self) -> Result<()>
    {
        self.file.best.clear();
        self.save()
    }

    fn save(&self) -> Result<()>
    {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| GameError::ScoreIo {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let raw = serde_json::to_string_pretty(&self.file).map_err(|source| GameError::ScoreFormat {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, raw).map_err(|source| GameError::ScoreIo {
            path: self.path.clone(),
            source,
        })
    }
}

impl ScoreStore for JsonScoreStore
{
    fn best_score(&self, difficulty: Difficulty) -> u32
    {
        self.file.best.get(difficulty.name()).copied().unwrap_or(0)
    }

    fn set_best_score(&mut self, difficulty: Difficulty, score: u32) -> Result<()>
    {
        self.file.best.insert(difficulty.name().to_string(), score);
        self.save()
    }
}

#[cfg(test)]
mod tests
{
    use std::env;
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;

    fn temp_dir(label: &str) -> PathBuf
    {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        env::temp_dir().join(format!("simon_kb_{label}_{suffix}"))
    }

    #[test]
    fn memory_store_defaults_to_zero()
    {
        let mut store = MemoryScoreStore::default();
        assert_eq!(store.best_score(Difficulty::Hard), 0);
        store.set_best_score(Difficulty::Hard, 6).expect("set");
        assert_eq!(store.best_score(Difficulty::Hard), 6);
        assert_eq!(store.best_score(Difficulty::Easy), 0);
    }

    #[test]
    fn json_store_survives_reopen()
    {
        let dir = temp_dir("reopen");
        {
            let mut store = JsonScoreStore::open(&dir).expect("open");
            assert_eq!(store.best_score(Difficulty::Medium), 0);
            store.set_best_score(Difficulty::Medium, 9).expect("set");
            store.set_best_score(Difficulty::Easy, 3).expect("set");
        }

        let store = JsonScoreStore::open(&dir).expect("reopen");
        assert_eq!(store.best_score(Difficulty::Medium), 9);
        assert_eq!(store.best_score(Difficulty::Easy), 3);
        assert_eq!(store.best_score(Difficulty::Hard), 0);

        let raw = fs::read_to_string(store.path()).expect("read");
        assert!(raw.contains("\"medium\": 9"));

        fs::remove_dir_all(dir).expect("cleanup");
    }

    #[test]
    fn json_store_recovers_from_corrupt_file()
    {
        let dir = temp_dir("corrupt");
        fs::create_dir_all(&dir).expect("mkdir");
        fs::write(dir.join(SCORE_FILE), "not json").expect("write");

        let mut store = JsonScoreStore::open(&dir).expect("open");
        assert_eq!(store.best_score(Difficulty::Easy), 0);
        store.set_best_score(Difficulty::Easy, 2).expect("set");
        store.clear().expect("clear");
        assert_eq!(store.best_score(Difficulty::Easy), 0);

        fs::remove_dir_all(dir).expect("cleanup");
    }
}
