//! Application state: saved locations and the selection cursor.
//!
//! One explicit struct with explicit update functions, persisted as a
//! single last-write-wins JSON blob. The persisted form strips per-location
//! weather; forecasts are refetched, not restored.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};

use crate::model::{Location, Weather};
use crate::settings::project_dirs;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppState {
    pub locations: Vec<Location>,
    pub current_location_index: usize,
    pub last_refresh: Option<DateTime<Utc>>,
}

impl AppState {
    pub fn add_location(&mut self, location: Location) {
        self.locations.push(location);
    }

    /// Remove a location by id. The selection cursor is clamped so it keeps
    /// pointing at a valid entry.
    pub fn remove_location(&mut self, id: &str) {
        self.locations.retain(|l| l.id != id);
        self.current_location_index = self
            .current_location_index
            .min(self.locations.len().saturating_sub(1));
    }

    /// Store a freshly fetched forecast and stamp the refresh time.
    pub fn update_location_weather(&mut self, id: &str, weather: Weather) {
        if let Some(location) = self.locations.iter_mut().find(|l| l.id == id) {
            location.weather = Some(weather);
            self.last_refresh = Some(Utc::now());
        }
    }

    pub fn reorder_locations(&mut self, from: usize, to: usize) {
        if from >= self.locations.len() || to >= self.locations.len() {
            return;
        }
        let moved = self.locations.remove(from);
        self.locations.insert(to, moved);
    }

    /// Point the selection cursor at `index`, ignoring out-of-range values.
    pub fn set_current_index(&mut self, index: usize) {
        if index < self.locations.len() {
            self.current_location_index = index;
        }
    }

    pub fn current_location(&self) -> Option<&Location> {
        self.locations.get(self.current_location_index)
    }

    /// Load state from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::state_file_path()?;
        Self::load_from(&path)
    }

    /// Save state to disk. Last write wins; there is no merging.
    pub fn save(&self) -> Result<()> {
        let path = Self::state_file_path()?;
        self.save_to(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let state: AppState = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        Ok(state)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create state directory: {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(&self.persistable())
            .context("Failed to serialize state to JSON")?;

        fs::write(path, json)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the state blob.
    pub fn state_file_path() -> Result<PathBuf> {
        let dirs = project_dirs()?;
        Ok(dirs.data_dir().join("state.json"))
    }

    /// Copy of the state with per-location weather stripped.
    fn persistable(&self) -> AppState {
        let locations = self
            .locations
            .iter()
            .map(|l| Location {
                weather: None,
                ..l.clone()
            })
            .collect();

        AppState {
            locations,
            current_location_index: self.current_location_index,
            last_refresh: self.last_refresh,
        }
    }
}
