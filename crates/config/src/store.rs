//! Settings storage backends.

use std::sync::Mutex;

use {async_trait::async_trait, serde_json::Value};

use crate::{Result, schema::Settings};

/// Durable settings storage, owned by the options form.
///
/// The content engine and the background coordinator only read.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Raw storage object. Missing storage yields `Value::Null`.
    async fn load_raw(&self) -> Result<Value>;

    async fn save(&self, settings: &Settings) -> Result<()>;

    /// Read settings, defaulting any missing or unreadable key.
    async fn load(&self) -> Result<Settings> {
        Ok(Settings::from_value(&self.load_raw().await?))
    }
}

/// In-memory store. No persistence; used by tests and simulations.
pub struct MemorySettingsStore {
    raw: Mutex<Value>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self {
            raw: Mutex::new(Value::Null),
        }
    }

    /// Store seeded with an arbitrary raw object, including malformed ones.
    pub fn with_raw(raw: Value) -> Self {
        Self {
            raw: Mutex::new(raw),
        }
    }

    pub fn with_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::with_raw(settings.to_value()?))
    }
}

impl Default for MemorySettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load_raw(&self) -> Result<Value> {
        let raw = self.raw.lock().unwrap_or_else(|e| e.into_inner());
        Ok(raw.clone())
    }

    async fn save(&self, settings: &Settings) -> Result<()> {
        let value = settings.to_value()?;
        let mut raw = self.raw.lock().unwrap_or_else(|e| e.into_inner());
        *raw = value;
        Ok(())
    }
}
