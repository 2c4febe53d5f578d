//! Sensor-limit profiles
//!
//! A profile is a named snapshot of every sensor's threshold/hysteresis pair.
//! The controller keeps the ordered list and the current selection; storage
//! backends only read and write the whole list.

use super::model::{PadState, SensorLimits};
use super::topology::{PANEL_COUNT, SENSORS_PER_PANEL};
use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Name given to the profile created on first start
pub const DEFAULT_PROFILE_NAME: &str = "Default";

/// Profile operation failures
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Profile not found: {0}")]
    NotFound(String),

    #[error("Profile already exists: {0}")]
    AlreadyExists(String),

    #[error("Cannot remove the last profile")]
    LastProfile,

    #[error("No profile selected")]
    NoSelection,

    #[error("Profile storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

/// Persisted limits for every sensor on the pad
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub name: String,
    pub panels: [[SensorLimits; SENSORS_PER_PANEL]; PANEL_COUNT],
}

impl ProfileRecord {
    /// Snapshot the pad's current limits under `name`
    pub fn from_pad(name: impl Into<String>, pad: &PadState) -> Self {
        Self {
            name: name.into(),
            panels: pad.limits(),
        }
    }
}

/// Whole-list persistence for profiles
pub trait ProfileStorage: Send {
    fn load(&self) -> anyhow::Result<Vec<ProfileRecord>>;
    fn store(&mut self, profiles: &[ProfileRecord]) -> anyhow::Result<()>;
}

/// Storage that lives only as long as the process
#[derive(Debug, Default)]
pub struct MemoryStorage {
    profiles: Vec<ProfileRecord>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileStorage for MemoryStorage {
    fn load(&self) -> anyhow::Result<Vec<ProfileRecord>> {
        Ok(self.profiles.clone())
    }

    fn store(&mut self, profiles: &[ProfileRecord]) -> anyhow::Result<()> {
        self.profiles = profiles.to_vec();
        Ok(())
    }
}

/// Profiles kept as a single JSON document
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Storage under the given directory, or the user data dir when `None`
    pub fn in_dir(directory: Option<&Path>) -> anyhow::Result<Self> {
        let directory = match directory {
            Some(directory) => directory.to_path_buf(),
            None => ProjectDirs::from("com", "reflex", "ReflexPad")
                .context("Failed to determine data directory")?
                .data_dir()
                .to_path_buf(),
        };
        Ok(Self::new(directory.join("profiles.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProfileStorage for JsonFileStorage {
    fn load(&self) -> anyhow::Result<Vec<ProfileRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read profiles file: {:?}", self.path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse profiles file: {:?}", self.path))
    }

    fn store(&mut self, profiles: &[ProfileRecord]) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create profiles directory: {:?}", parent))?;
        }
        let content =
            serde_json::to_string_pretty(profiles).context("Failed to serialize profiles")?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write profiles file: {:?}", self.path))
    }
}

/// Ordered profile list with a current selection
pub struct ProfileController {
    storage: Box<dyn ProfileStorage>,
    profiles: Vec<ProfileRecord>,
    current: Option<usize>,
}

impl ProfileController {
    pub fn new(storage: Box<dyn ProfileStorage>) -> Self {
        Self {
            storage,
            profiles: Vec::new(),
            current: None,
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.profiles.iter().map(|p| p.name.clone()).collect()
    }

    pub fn current(&self) -> Option<&ProfileRecord> {
        self.current.and_then(|i| self.profiles.get(i))
    }

    pub fn get(&self, name: &str) -> Option<&ProfileRecord> {
        self.position(name).and_then(|i| self.profiles.get(i))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.profiles.iter().position(|p| p.name == name)
    }

    /// Store `profiles`, replacing the in-memory list only once the write
    /// has succeeded
    fn commit(&mut self, profiles: Vec<ProfileRecord>) -> Result<(), ProfileError> {
        self.storage.store(&profiles)?;
        self.profiles = profiles;
        Ok(())
    }

    /// Load stored profiles, creating the default one if none exist, and
    /// apply the first profile to the pad
    pub fn initialise(&mut self, pad: &mut PadState) -> Result<Vec<String>, ProfileError> {
        let stored = self.storage.load()?;
        if stored.is_empty() {
            info!("No stored profiles, creating {:?}", DEFAULT_PROFILE_NAME);
            self.commit(vec![ProfileRecord::from_pad(DEFAULT_PROFILE_NAME, pad)])?;
        } else {
            self.profiles = stored;
        }
        if let Some(first) = self.profiles.first() {
            pad.apply_limits(&first.panels);
            self.current = Some(0);
        }
        Ok(self.names())
    }

    /// Snapshot the pad as a new profile and select it
    ///
    /// The name is made unique by appending a counter.
    pub fn create(&mut self, name: &str, pad: &PadState) -> Result<String, ProfileError> {
        let base = if name.trim().is_empty() {
            DEFAULT_PROFILE_NAME
        } else {
            name.trim()
        };
        let mut unique = base.to_string();
        let mut suffix = 1;
        while self.position(&unique).is_some() {
            suffix += 1;
            unique = format!("{base} {suffix}");
        }

        let mut profiles = self.profiles.clone();
        profiles.push(ProfileRecord::from_pad(unique.clone(), pad));
        let index = profiles.len() - 1;
        self.commit(profiles)?;
        self.current = Some(index);
        info!("Created profile {:?}", unique);
        Ok(unique)
    }

    /// Write the pad's limits into the current profile
    pub fn save(&mut self, pad: &mut PadState) -> Result<String, ProfileError> {
        let index = self.current.ok_or(ProfileError::NoSelection)?;
        let mut profiles = self.profiles.clone();
        let record = profiles.get_mut(index).ok_or(ProfileError::NoSelection)?;
        record.panels = pad.limits();
        let name = record.name.clone();
        self.commit(profiles)?;
        pad.mark_saved();
        debug!("Saved profile {:?}", name);
        Ok(name)
    }

    /// Select a profile and apply it to the pad
    pub fn load(&mut self, name: &str, pad: &mut PadState) -> Result<String, ProfileError> {
        let index = self
            .position(name)
            .ok_or_else(|| ProfileError::NotFound(name.to_string()))?;
        if let Some(record) = self.profiles.get(index) {
            pad.apply_limits(&record.panels);
        }
        self.current = Some(index);
        info!("Loaded profile {:?}", name);
        Ok(name.to_string())
    }

    pub fn rename(&mut self, from: &str, to: &str) -> Result<(String, String), ProfileError> {
        let index = self
            .position(from)
            .ok_or_else(|| ProfileError::NotFound(from.to_string()))?;
        if from != to && self.position(to).is_some() {
            return Err(ProfileError::AlreadyExists(to.to_string()));
        }
        let mut profiles = self.profiles.clone();
        if let Some(record) = profiles.get_mut(index) {
            record.name = to.to_string();
        }
        self.commit(profiles)?;
        info!("Renamed profile {:?} to {:?}", from, to);
        Ok((from.to_string(), to.to_string()))
    }

    /// Delete a profile; the last remaining profile cannot be removed
    pub fn remove(&mut self, name: &str) -> Result<(), ProfileError> {
        let index = self
            .position(name)
            .ok_or_else(|| ProfileError::NotFound(name.to_string()))?;
        if self.profiles.len() <= 1 {
            return Err(ProfileError::LastProfile);
        }
        let mut profiles = self.profiles.clone();
        profiles.remove(index);
        self.commit(profiles)?;
        self.current = match self.current {
            Some(current) if current == index => Some(0),
            Some(current) if current > index => Some(current - 1),
            other => other,
        };
        info!("Removed profile {:?}", name);
        Ok(())
    }
}
