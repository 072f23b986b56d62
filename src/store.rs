//! Per-guild session state and its persistence.
//!
//! The [`SessionStore`] is the only process-wide state: a map from guild
//! id to that guild's characters and active encounter. Guild entries are
//! created on first access, every mutation is flushed to the data file
//! before the operation returns, and the whole store is reloaded at
//! process start. The in-memory state stays authoritative even when a
//! flush fails; failures are logged, never propagated into a rollback.
//!
//! Flushing works from a snapshot map of each guild's last flushed
//! state. The caller passes the state it already holds locked, so a
//! flush never takes any guild mutex and cannot contend with the
//! operation that triggered it.

use crate::character::Character;
use crate::encounter::Encounter;
use crate::error::GameError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, warn};

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Opaque guild identifier (a chat server id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuildId(pub String);

impl GuildId {
    pub fn new(id: impl Into<String>) -> Self {
        GuildId(id.into())
    }
}

impl fmt::Display for GuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for GuildId {
    fn from(id: &str) -> Self {
        GuildId(id.to_string())
    }
}

/// One guild's mutable state. Characters are keyed by lowercase name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GuildState {
    pub characters: HashMap<String, Character>,
    pub encounter: Option<Encounter>,
}

impl GuildState {
    pub fn character(&self, name: &str) -> Result<&Character, GameError> {
        self.characters
            .get(&name.trim().to_lowercase())
            .ok_or_else(|| GameError::not_found("character", name.trim()))
    }

    pub fn character_mut(&mut self, name: &str) -> Result<&mut Character, GameError> {
        self.characters
            .get_mut(&name.trim().to_lowercase())
            .ok_or_else(|| GameError::not_found("character", name.trim()))
    }

    /// Insert or replace a character under its lowercase name.
    pub fn insert_character(&mut self, character: Character) {
        self.characters
            .insert(character.name.to_lowercase(), character);
    }

    /// Remove a character (death-save terminal state).
    pub fn remove_character(&mut self, name: &str) -> Option<Character> {
        self.characters.remove(&name.trim().to_lowercase())
    }

    /// The active encounter, or StateConflict when none exists.
    pub fn encounter(&self) -> Result<&Encounter, GameError> {
        self.encounter
            .as_ref()
            .ok_or_else(|| GameError::StateConflict("no active encounter".to_string()))
    }

    pub fn encounter_mut(&mut self) -> Result<&mut Encounter, GameError> {
        self.encounter
            .as_mut()
            .ok_or_else(|| GameError::StateConflict("no active encounter".to_string()))
    }
}

/// On-disk layout: characters and combats as two top-level maps keyed by
/// guild id.
#[derive(Debug, Default, Serialize, Deserialize)]
struct DataFile {
    #[serde(default)]
    characters: HashMap<GuildId, HashMap<String, Character>>,
    #[serde(default)]
    combats: HashMap<GuildId, Encounter>,
}

impl DataFile {
    fn into_states(self) -> HashMap<GuildId, GuildState> {
        let mut states: HashMap<GuildId, GuildState> = HashMap::new();
        for (guild_id, characters) in self.characters {
            states.entry(guild_id).or_default().characters = characters;
        }
        for (guild_id, encounter) in self.combats {
            states.entry(guild_id).or_default().encounter = Some(encounter);
        }
        states
    }

    fn add_state(&mut self, guild_id: &GuildId, state: &GuildState) {
        if !state.characters.is_empty() {
            self.characters
                .insert(guild_id.clone(), state.characters.clone());
        }
        if let Some(encounter) = &state.encounter {
            self.combats.insert(guild_id.clone(), encounter.clone());
        }
    }
}

/// Process-wide repository of guild state.
pub struct SessionStore {
    path: PathBuf,
    guilds: RwLock<HashMap<GuildId, Arc<Mutex<GuildState>>>>,
    /// Last flushed state per guild; the data file is rebuilt from this
    /// map on every flush.
    snapshots: Mutex<HashMap<GuildId, GuildState>>,
}

impl SessionStore {
    /// Open a store backed by the given data file.
    ///
    /// A missing file starts an empty store. An unreadable or corrupt
    /// file is logged and also starts empty rather than refusing to boot.
    pub async fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let data = match fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str::<DataFile>(&content) {
                Ok(data) => data,
                Err(err) => {
                    warn!(path = %path.display(), %err, "data file is corrupt, starting empty");
                    DataFile::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => DataFile::default(),
            Err(err) => {
                warn!(path = %path.display(), %err, "data file unreadable, starting empty");
                DataFile::default()
            }
        };

        let states = data.into_states();
        let snapshots = states.clone();
        let guilds = states
            .into_iter()
            .map(|(id, state)| (id, Arc::new(Mutex::new(state))))
            .collect();

        Self {
            path,
            guilds: RwLock::new(guilds),
            snapshots: Mutex::new(snapshots),
        }
    }

    /// Fetch a guild's state handle, creating an empty entry on first
    /// access. Locking the returned mutex serializes all operations for
    /// that guild; other guilds proceed independently.
    pub async fn guild(&self, id: &GuildId) -> Arc<Mutex<GuildState>> {
        if let Some(state) = self.guilds.read().await.get(id) {
            return Arc::clone(state);
        }
        let mut guilds = self.guilds.write().await;
        Arc::clone(guilds.entry(id.clone()).or_default())
    }

    /// Record a guild's current state and write the whole store to the
    /// data file.
    ///
    /// The caller supplies the state it already holds locked; other
    /// guilds contribute their last flushed snapshot. No guild mutex is
    /// taken here. The snapshot map's own lock is held across the write
    /// so flushes land on disk in the order they were recorded.
    pub async fn persist(&self, guild: &GuildId, state: &GuildState) -> Result<(), PersistError> {
        let mut snapshots = self.snapshots.lock().await;
        snapshots.insert(guild.clone(), state.clone());

        let mut data = DataFile::default();
        for (guild_id, state) in snapshots.iter() {
            data.add_state(guild_id, state);
        }
        let content = serde_json::to_string_pretty(&data)?;
        fs::write(&self.path, content).await?;
        Ok(())
    }

    /// Flush after a mutation. Failures are logged; the in-memory state
    /// remains the source of truth for the rest of the process lifetime.
    pub async fn flush(&self, guild: &GuildId, state: &GuildState) {
        if let Err(err) = self.persist(guild, state).await {
            error!(path = %self.path.display(), %err, "failed to persist session store");
        }
    }
}
