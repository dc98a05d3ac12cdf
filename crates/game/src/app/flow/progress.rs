use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use engine::{expected_actual, parse_json_document, write_text_atomic, JsonDocumentError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use tracing::{info, warn};

pub const SAVE_VERSION: u32 = 1;
pub const SPECIAL_ITEM_SLOTS: usize = 4;

/// Identifies a level as `"<world>-<level>"`, both zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LevelKey {
    pub world: usize,
    pub level: usize,
}

impl LevelKey {
    pub fn new(world: usize, level: usize) -> Self {
        Self { world, level }
    }
}

impl fmt::Display for LevelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.world, self.level)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid level key '{0}' (expected <world>-<level>)")]
pub struct LevelKeyParseError(String);

impl FromStr for LevelKey {
    type Err = LevelKeyParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || LevelKeyParseError(raw.to_string());
        let (world, level) = raw.split_once('-').ok_or_else(invalid)?;
        let parse_index = |text: &str| {
            if text.is_empty() || !text.bytes().all(|byte| byte.is_ascii_digit()) {
                return None;
            }
            text.parse::<usize>().ok()
        };
        match (parse_index(world), parse_index(level)) {
            (Some(world), Some(level)) => Ok(Self { world, level }),
            _ => Err(invalid()),
        }
    }
}

impl Serialize for LevelKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LevelKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelResult {
    pub feathers_collected: u32,
    pub items_found: [bool; SPECIAL_ITEM_SLOTS],
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerProgress {
    pub current_world_index: usize,
    pub current_node_index: usize,
    pub finished_levels: BTreeMap<LevelKey, LevelResult>,
}

impl PlayerProgress {
    /// Stores `result` for `key`, replacing any earlier completion.
    pub fn record_level(&mut self, key: LevelKey, result: LevelResult) -> Option<LevelResult> {
        self.finished_levels.insert(key, result)
    }

    pub fn is_level_finished(&self, key: LevelKey) -> bool {
        self.finished_levels.contains_key(&key)
    }

    pub fn level_result(&self, key: LevelKey) -> Option<&LevelResult> {
        self.finished_levels.get(&key)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct SavedProgress {
    save_version: u32,
    current_world_index: usize,
    current_node_index: usize,
    finished_levels: BTreeMap<LevelKey, LevelResult>,
}

impl SavedProgress {
    fn from_progress(progress: &PlayerProgress) -> Self {
        Self {
            save_version: SAVE_VERSION,
            current_world_index: progress.current_world_index,
            current_node_index: progress.current_node_index,
            finished_levels: progress.finished_levels.clone(),
        }
    }

    fn into_progress(self) -> PlayerProgress {
        PlayerProgress {
            current_world_index: self.current_world_index,
            current_node_index: self.current_node_index,
            finished_levels: self.finished_levels,
        }
    }
}

#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("failed to read save '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse save '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: JsonDocumentError,
    },
    #[error("save '{path}' is not usable: {message}")]
    Invalid { path: PathBuf, message: String },
    #[error("failed to encode save json: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to write save '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One save slot on disk.
#[derive(Debug, Clone)]
pub struct ProgressStore {
    path: PathBuf,
}

impl ProgressStore {
    pub fn for_slot(save_dir: &Path, slot: u32) -> Self {
        Self {
            path: save_dir.join(format!("slot_{slot}.save.json")),
        }
    }

    pub fn at_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the saved progress, or a fresh record when there is no usable
    /// save. Never fails.
    pub fn load(&self) -> PlayerProgress {
        match self.read() {
            Ok(Some(progress)) => {
                info!(
                    path = %self.path.display(),
                    finished_levels = progress.finished_levels.len(),
                    "progress_loaded"
                );
                progress
            }
            Ok(None) => {
                info!(path = %self.path.display(), "progress_new_game");
                PlayerProgress::default()
            }
            Err(error) => {
                warn!(error = %error, "progress_save_unusable_starting_fresh");
                PlayerProgress::default()
            }
        }
    }

    pub fn read(&self) -> Result<Option<PlayerProgress>, ProgressError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ProgressError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let saved = parse_json_document::<SavedProgress>(&raw).map_err(|source| {
            ProgressError::Parse {
                path: self.path.clone(),
                source,
            }
        })?;
        if saved.save_version != SAVE_VERSION {
            return Err(ProgressError::Invalid {
                path: self.path.clone(),
                message: expected_actual("save_version", SAVE_VERSION, saved.save_version),
            });
        }
        Ok(Some(saved.into_progress()))
    }

    pub fn save(&self, progress: &PlayerProgress) -> Result<(), ProgressError> {
        let json = encode_progress(progress)?;
        write_text_atomic(&self.path, &json).map_err(|source| ProgressError::Write {
            path: self.path.clone(),
            source,
        })?;
        info!(
            path = %self.path.display(),
            finished_levels = progress.finished_levels.len(),
            "progress_saved"
        );
        Ok(())
    }
}

fn encode_progress(progress: &PlayerProgress) -> Result<String, ProgressError> {
    let mut json = serde_json::to_string_pretty(&SavedProgress::from_progress(progress))
        .map_err(ProgressError::Encode)?;
    json.push('\n');
    Ok(json)
}
