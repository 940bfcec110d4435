//! Persistence of the last map view (center + zoom) across sessions.
//!
//! The file store mimics browser key-value storage: a JSON object of string
//! keys, of which this crate owns [`VIEW_STATE_KEY`]. Other keys in the file
//! are preserved on save.

use log::warn;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use super::repository::{ErrorContext, RepositoryError, RepositoryResult};
use crate::models::ViewState;

/// Key under which the view is stored.
pub const VIEW_STATE_KEY: &str = "hotspot_map.view_state";

/// Load/save of the last map view.
pub trait ViewStateStore: Send + Sync {
    fn load(&self) -> RepositoryResult<Option<ViewState>>;
    fn save(&self, state: &ViewState) -> RepositoryResult<()>;
}

/// Process-local store, used when no file is configured.
#[derive(Default)]
pub struct MemoryViewStateStore {
    state: Mutex<Option<ViewState>>,
}

impl MemoryViewStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ViewStateStore for MemoryViewStateStore {
    fn load(&self) -> RepositoryResult<Option<ViewState>> {
        Ok(*self.state.lock())
    }

    fn save(&self, state: &ViewState) -> RepositoryResult<()> {
        *self.state.lock() = Some(*state);
        Ok(())
    }
}

/// JSON key-value file store.
pub struct FileViewStateStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileViewStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the key-value map. Missing files are empty; corrupt files are
    /// reported as `None` so callers can start fresh.
    fn read_entries(&self) -> RepositoryResult<Option<Map<String, Value>>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Some(Map::new())),
            Err(e) => {
                return Err(RepositoryError::storage_with_context(
                    e.to_string(),
                    ErrorContext::new("load_view_state")
                        .with_entity("view_state")
                        .with_details(self.path.display().to_string()),
                ))
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            Ok(_) | Err(_) => {
                warn!(
                    "View state file {} is not a JSON object; ignoring it",
                    self.path.display()
                );
                Ok(None)
            }
        }
    }
}

impl ViewStateStore for FileViewStateStore {
    fn load(&self) -> RepositoryResult<Option<ViewState>> {
        let Some(entries) = self.read_entries()? else {
            return Ok(None);
        };
        let Some(value) = entries.get(VIEW_STATE_KEY) else {
            return Ok(None);
        };
        match serde_json::from_value::<ViewState>(value.clone()) {
            Ok(state) if state.center.is_valid() && state.zoom.is_finite() => Ok(Some(state)),
            Ok(_) => {
                warn!("Stored view state has invalid coordinates; ignoring it");
                Ok(None)
            }
            Err(e) => {
                warn!("Stored view state could not be decoded: {}", e);
                Ok(None)
            }
        }
    }

    fn save(&self, state: &ViewState) -> RepositoryResult<()> {
        let _guard = self.write_lock.lock();
        let context = || {
            ErrorContext::new("save_view_state")
                .with_entity("view_state")
                .with_details(self.path.display().to_string())
        };

        let mut entries = self.read_entries()?.unwrap_or_default();
        let value = serde_json::to_value(state)
            .map_err(|e| RepositoryError::internal_with_context(e.to_string(), context()))?;
        entries.insert(VIEW_STATE_KEY.to_string(), value);

        let content = serde_json::to_string_pretty(&Value::Object(entries))
            .map_err(|e| RepositoryError::internal_with_context(e.to_string(), context()))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| RepositoryError::storage_with_context(e.to_string(), context()))?;
        }
        fs::write(&self.path, content)
            .map_err(|e| RepositoryError::storage_with_context(e.to_string(), context()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LatLng, ViewportBounds};

    fn sample_state() -> ViewState {
        ViewState::from_bounds(ViewportBounds::new(40.43, 40.40, -3.68, -3.72), 14.0)
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryViewStateStore::new();
        assert_eq!(store.load().unwrap(), None);
        store.save(&sample_state()).unwrap();
        assert_eq!(store.load().unwrap(), Some(sample_state()));
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileViewStateStore::new(dir.path().join("view.json"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_file_store_preserves_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("view.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"theme": "dark"}"#).unwrap();

        let store = FileViewStateStore::new(&path);
        store.save(&sample_state()).unwrap();

        let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["theme"], "dark");
        assert_eq!(store.load().unwrap(), Some(sample_state()));
    }

    #[test]
    fn test_file_store_corrupt_file_loads_none_and_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("view.json");
        fs::write(&path, "not json").unwrap();

        let store = FileViewStateStore::new(&path);
        assert_eq!(store.load().unwrap(), None);

        let state = ViewState {
            center: LatLng::new(1.0, 2.0),
            zoom: 9.0,
            bounds: None,
        };
        store.save(&state).unwrap();
        assert_eq!(store.load().unwrap(), Some(state));
    }
}
