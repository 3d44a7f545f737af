//! Extension settings: schema, tolerant parsing, diagnostics, and storage.
//!
//! Settings live in a single JSON object using the extension's storage keys
//! (`alwaysMute`, `setVolume`, `initialVolume`, `blacklist`, `whitelistMode`).
//! File-backed settings are searched in `./avc.json` then `~/.config/avc/`.

pub mod error;
pub mod loader;
pub mod schema;
pub mod store;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{FileSettingsStore, config_dir, find_or_default_settings_path},
    schema::{Settings, parse_blacklist},
    store::{MemorySettingsStore, SettingsStore},
    validate::{Diagnostic, Severity},
};
