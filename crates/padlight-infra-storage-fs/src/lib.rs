use padlight_ports::storage::{SettingsDto, StorageError, StoragePort};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "Padlight";
const SETTINGS_FILE: &str = "settings.json";

fn io_error(err: std::io::Error) -> StorageError {
    StorageError::Io(err.to_string())
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(io_error(err)),
    };
    serde_json::from_slice(&data)
        .map(Some)
        .map_err(|e| StorageError::Serde(e.to_string()))
}

/// Written to a sibling `.tmp` file first, then renamed over the target.
fn store_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let dir = path
        .parent()
        .ok_or_else(|| StorageError::Io(format!("no parent dir for {}", path.display())))?;
    fs::create_dir_all(dir).map_err(io_error)?;

    let data = serde_json::to_vec_pretty(value).map_err(|e| StorageError::Serde(e.to_string()))?;
    let staging = path.with_extension("json.tmp");
    fs::write(&staging, data).map_err(io_error)?;
    fs::rename(&staging, path).map_err(io_error)
}

/// Settings kept as pretty JSON under the user's config directory.
pub struct FsStorage {
    base_dir: PathBuf,
}

impl FsStorage {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn default_base_dir() -> Result<PathBuf, StorageError> {
        dirs_next::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| StorageError::Io("config dir not found".to_string()))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn settings_path(&self) -> PathBuf {
        self.base_dir.join(SETTINGS_FILE)
    }
}

impl Default for FsStorage {
    fn default() -> Self {
        Self::new(Self::default_base_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }
}

impl StoragePort for FsStorage {
    fn load_settings(&self) -> Result<SettingsDto, StorageError> {
        Ok(load_json(&self.settings_path())?.unwrap_or_default())
    }

    fn save_settings(&self, s: &SettingsDto) -> Result<(), StorageError> {
        let path = self.settings_path();
        store_json(&path, s)?;
        tracing::debug!(path = %path.display(), "settings saved");
        Ok(())
    }
}
