use std::path::{Path, PathBuf};

use {async_trait::async_trait, serde_json::Value, tracing::debug};

use crate::{
    error::{Context, Result},
    schema::Settings,
    store::SettingsStore,
};

/// Standard settings file name.
const SETTINGS_FILENAME: &str = "avc.json";

/// Find the settings file in standard locations.
///
/// Search order:
/// 1. `./avc.json` (project-local)
/// 2. `~/.config/avc/avc.json` (user-global)
fn find_settings_file() -> Option<PathBuf> {
    let local = PathBuf::from(SETTINGS_FILENAME);
    if local.exists() {
        return Some(local);
    }

    let global = config_dir()?.join(SETTINGS_FILENAME);
    global.exists().then_some(global)
}

/// Returns the user-global config directory (`~/.config/avc/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "avc").map(|d| d.config_dir().to_path_buf())
}

/// Returns the path of an existing settings file, or the default user-global path.
pub fn find_or_default_settings_path() -> PathBuf {
    if let Some(path) = find_settings_file() {
        return path;
    }
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(SETTINGS_FILENAME)
}

/// JSON-file settings storage.
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the discovered (or default) settings path.
    pub fn discover() -> Self {
        Self::new(find_or_default_settings_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn load_raw(&self) -> Result<Value> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no settings file, using defaults");
                return Ok(Value::Null);
            },
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&raw).with_context(|| format!("parse {}", self.path.display()))
    }

    async fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(&settings.to_value()?)?;
        tokio::fs::write(&self.path, json).await?;
        debug!(path = %self.path.display(), "saved settings");
        Ok(())
    }
}
