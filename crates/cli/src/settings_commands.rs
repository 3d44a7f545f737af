use {anyhow::Result, clap::Subcommand};

use avc_config::{FileSettingsStore, Settings, SettingsStore, Severity};

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Print the effective settings as stored JSON.
    Show,
    /// Print the settings file path.
    Path,
    /// Report keys that were ignored or defaulted.
    Check {
        /// Show informational diagnostics in addition to warnings.
        #[arg(long)]
        verbose: bool,
    },
    /// Set one key, e.g. `alwaysMute false` or `blacklist "*.example.com/*"`.
    Set { key: String, value: String },
}

pub async fn handle_settings(action: SettingsAction, store: &FileSettingsStore) -> Result<()> {
    match action {
        SettingsAction::Show => {
            let settings = store.load().await?;
            println!("{}", serde_json::to_string_pretty(&settings.to_value()?)?);
            Ok(())
        },
        SettingsAction::Path => {
            println!("{}", store.path().display());
            Ok(())
        },
        SettingsAction::Check { verbose } => check(store, verbose).await,
        SettingsAction::Set { key, value } => {
            let settings = set(store, &key, &value).await?;
            eprintln!("Saved {} to {}", key, store.path().display());
            println!("{}", serde_json::to_string_pretty(&settings.to_value()?)?);
            Ok(())
        },
    }
}

/// ANSI color codes.
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

async fn check(store: &FileSettingsStore, verbose: bool) -> Result<()> {
    eprintln!("Checking {}\n", store.path().display());
    let raw = store.load_raw().await?;
    let (_, diagnostics) = Settings::from_value_with_diagnostics(&raw);

    let mut shown = 0;
    for d in &diagnostics {
        if d.severity == Severity::Info && !verbose {
            continue;
        }

        let color = match d.severity {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
            Severity::Info => CYAN,
        };

        if d.path.is_empty() {
            eprintln!("  {BOLD}{color}{}{RESET} {}", d.severity, d.message);
        } else {
            eprintln!("  {BOLD}{color}{}{RESET} {}: {}", d.severity, d.path, d.message);
        }
        shown += 1;
    }

    let warnings = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .count();

    if shown > 0 {
        eprintln!();
    }
    if warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{warnings} warning(s); affected keys use their defaults");
    }
    Ok(())
}

/// Update one key and save the normalized settings. Unknown keys are
/// dropped and a legacy `initalVolume` is rewritten as `initialVolume`.
async fn set(store: &FileSettingsStore, key: &str, value: &str) -> Result<Settings> {
    let mut settings = store.load().await?;
    settings.set_field(key, value)?;
    store.save(&settings).await?;
    Ok(settings)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_updates_one_key_and_keeps_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSettingsStore::new(dir.path().join("avc.json"));

        set(&store, "blacklist", "*.example.com/*\n\n  *ads*  ")
            .await
            .unwrap();
        let settings = set(&store, "alwaysMute", "false").await.unwrap();

        assert!(!settings.always_mute);
        assert_eq!(settings.blacklist, vec!["*.example.com/*", "*ads*"]);
        assert_eq!(store.load().await.unwrap(), settings);
    }

    #[tokio::test]
    async fn set_normalizes_the_stored_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("avc.json");
        std::fs::write(&path, r#"{ "initalVolume": 40, "theme": "dark" }"#).unwrap();
        let store = FileSettingsStore::new(&path);

        set(&store, "alwaysMute", "false").await.unwrap();

        let raw = store.load_raw().await.unwrap();
        assert_eq!(raw["initialVolume"].as_f64(), Some(40.0));
        assert_eq!(raw["alwaysMute"], serde_json::json!(false));
        assert!(raw.get("initalVolume").is_none());
        assert!(raw.get("theme").is_none());
    }

    #[tokio::test]
    async fn unknown_key_is_rejected_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("avc.json");
        let store = FileSettingsStore::new(&path);

        assert!(set(&store, "autoplay", "true").await.is_err());
        assert!(!path.exists());
    }
}
