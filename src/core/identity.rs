//! Persisted local identifiers
//!
//! The player id is generated once per device and survives restarts, as do
//! the last active game id and the display name. They are re-used after a
//! reconnect or restart so the server resumes the same session.
//!
//! Storage is abstracted behind [`IdentityStore`], a plain get/set store.
//! [`FileIdentityStore`] keeps the values in a JSON file and rewrites it on
//! every change. [`MemoryIdentityStore`] is used by tests and ephemeral runs.

use crate::core::error::CoreResult;
use directories::ProjectDirs;
use rand::distr::Alphanumeric;
use rand::Rng;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Identity filename
const IDENTITY_FILENAME: &str = "identity.json";

/// Length of generated player ids
const PLAYER_ID_LEN: usize = 6;

/// Keys the client persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdentityKey {
    PlayerId,
    GameId,
    DisplayName,
}

impl IdentityKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityKey::PlayerId => "playerId",
            IdentityKey::GameId => "gameId",
            IdentityKey::DisplayName => "userName",
        }
    }
}

/// Durable key-value store for session identifiers.
pub trait IdentityStore: Send {
    fn get(&self, key: IdentityKey) -> Option<String>;
    fn set(&mut self, key: IdentityKey, value: &str) -> CoreResult<()>;
    fn remove(&mut self, key: IdentityKey) -> CoreResult<()>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryIdentityStore {
    values: HashMap<IdentityKey, String>,
}

impl IdentityStore for MemoryIdentityStore {
    fn get(&self, key: IdentityKey) -> Option<String> {
        self.values.get(&key).cloned()
    }

    fn set(&mut self, key: IdentityKey, value: &str) -> CoreResult<()> {
        self.values.insert(key, value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: IdentityKey) -> CoreResult<()> {
        self.values.remove(&key);
        Ok(())
    }
}

/// JSON file backed store.
#[derive(Debug)]
pub struct FileIdentityStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileIdentityStore {
    /// Open the store at `path`. A missing file is an empty store; a corrupt
    /// one is logged and treated as empty, and is overwritten on the next set.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(values) => {
                    info!("[IDENTITY] Loaded identity from {:?}", path);
                    values
                }
                Err(e) => {
                    warn!("[IDENTITY] Failed to parse {:?}: {}. Starting empty.", path, e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!("[IDENTITY] Failed to read {:?}: {}. Starting empty.", path, e);
                BTreeMap::new()
            }
        };
        Self { path, values }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(&self.values)?)?;
        Ok(())
    }
}

impl IdentityStore for FileIdentityStore {
    fn get(&self, key: IdentityKey) -> Option<String> {
        self.values.get(key.as_str()).cloned()
    }

    fn set(&mut self, key: IdentityKey, value: &str) -> CoreResult<()> {
        self.values.insert(key.as_str().to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: IdentityKey) -> CoreResult<()> {
        if self.values.remove(key.as_str()).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

/// Snapshot of the persisted identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalIdentity {
    pub player_id: String,
    pub game_id: Option<String>,
    pub display_name: Option<String>,
}

impl LocalIdentity {
    /// Read the identity, generating and persisting a player id on first use.
    pub fn load_or_create(store: &mut dyn IdentityStore) -> CoreResult<Self> {
        let player_id = match store.get(IdentityKey::PlayerId) {
            Some(id) if !id.is_empty() => id,
            _ => {
                let id = generate_player_id();
                store.set(IdentityKey::PlayerId, &id)?;
                info!("[IDENTITY] Generated new player id {}", id);
                id
            }
        };

        Ok(Self {
            player_id,
            game_id: store.get(IdentityKey::GameId),
            display_name: store.get(IdentityKey::DisplayName),
        })
    }
}

/// Random alphanumeric player id.
pub fn generate_player_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(PLAYER_ID_LEN)
        .map(char::from)
        .collect()
}

/// Helper to resolve the identity file path
pub fn default_identity_path() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("com", "trilltino", "xfchess-sync") {
        proj_dirs.data_dir().join(IDENTITY_FILENAME)
    } else {
        PathBuf::from(IDENTITY_FILENAME)
    }
}
