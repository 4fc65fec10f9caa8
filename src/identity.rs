//! Durable storage for the local display name
//!
//! A single key (`chatUsername`) holds the last identity used. The file
//! store keeps it in a small JSON object so other keys can live beside it.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::debug;

use crate::error::AppError;

/// Key under which the identity is stored
pub const IDENTITY_KEY: &str = "chatUsername";

/// Key-value store holding the last-used identity
pub trait IdentityStore: Send {
    fn get(&self) -> Option<String>;

    fn set(&mut self, identity: &str) -> Result<(), AppError>;
}

/// In-process store, lost on exit
#[derive(Debug, Default, Clone)]
pub struct MemoryIdentityStore {
    value: Option<String>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(identity: impl Into<String>) -> Self {
        Self {
            value: Some(identity.into()),
        }
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn get(&self) -> Option<String> {
        self.value.clone()
    }

    fn set(&mut self, identity: &str) -> Result<(), AppError> {
        self.value = Some(identity.to_string());
        Ok(())
    }
}

/// JSON file store
#[derive(Debug, Clone)]
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, AppError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl IdentityStore for FileIdentityStore {
    fn get(&self) -> Option<String> {
        match self.read_all() {
            Ok(mut entries) => entries.remove(IDENTITY_KEY),
            Err(e) => {
                debug!("Ignoring unreadable identity file {:?}: {}", self.path, e);
                None
            }
        }
    }

    fn set(&mut self, identity: &str) -> Result<(), AppError> {
        let mut entries = self.read_all().unwrap_or_default();
        entries.insert(IDENTITY_KEY.to_string(), identity.to_string());
        std::fs::write(&self.path, serde_json::to_string_pretty(&entries)?)?;
        Ok(())
    }
}
