//! Settings schema shared by the content engine, the background coordinator,
//! and the options form.

use {
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
    tracing::warn,
};

use crate::{
    error::{Error, Result},
    validate::{Diagnostic, Severity},
};

pub const KEY_ALWAYS_MUTE: &str = "alwaysMute";
pub const KEY_SET_VOLUME: &str = "setVolume";
pub const KEY_INITIAL_VOLUME: &str = "initialVolume";
pub const KEY_BLACKLIST: &str = "blacklist";
pub const KEY_WHITELIST_MODE: &str = "whitelistMode";

/// Misspelled key written by early releases of the options form.
pub const LEGACY_KEY_INITIAL_VOLUME: &str = "initalVolume";

/// Every key the extension reads from storage.
pub const KNOWN_KEYS: &[&str] = &[
    KEY_ALWAYS_MUTE,
    KEY_SET_VOLUME,
    KEY_INITIAL_VOLUME,
    KEY_BLACKLIST,
    KEY_WHITELIST_MODE,
];

/// User preferences, stored under the extension's local storage keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Start every new page muted unless its origin was toggled loud.
    pub always_mute: bool,
    /// Apply `initial_volume` to each video when its controls are installed.
    pub set_volume: bool,
    /// Initial volume in percent (0-100). Only used when `set_volume` is on.
    #[serde(alias = "initalVolume")]
    pub initial_volume: f64,
    /// URL glob patterns. Excluded pages in blacklist mode, the only
    /// included pages in whitelist mode.
    pub blacklist: Vec<String>,
    /// Treat `blacklist` as an allow-list.
    pub whitelist_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            always_mute: true,
            set_volume: false,
            initial_volume: 50.0,
            blacklist: Vec::new(),
            whitelist_mode: false,
        }
    }
}

impl Settings {
    /// Read settings from a raw storage object.
    ///
    /// Each key is read on its own: a missing or mistyped key falls back to
    /// its default and the other keys are still honoured. Values of the right
    /// type are taken as-is, without range checks.
    pub fn from_value(raw: &Value) -> Self {
        let (settings, diagnostics) = Self::from_value_with_diagnostics(raw);
        for d in diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
        {
            warn!(key = %d.path, "{}", d.message);
        }
        settings
    }

    /// Like [`Settings::from_value`], also returning what was ignored or
    /// defaulted.
    pub fn from_value_with_diagnostics(raw: &Value) -> (Self, Vec<Diagnostic>) {
        let mut settings = Self::default();
        let mut diagnostics = Vec::new();

        let Some(map) = raw.as_object() else {
            if !raw.is_null() {
                diagnostics.push(Diagnostic::warning(
                    "type-error",
                    "",
                    "settings root is not an object, using defaults",
                ));
            }
            return (settings, diagnostics);
        };

        read_key(map, KEY_ALWAYS_MUTE, &mut settings.always_mute, &mut diagnostics);
        read_key(map, KEY_SET_VOLUME, &mut settings.set_volume, &mut diagnostics);
        read_key(map, KEY_BLACKLIST, &mut settings.blacklist, &mut diagnostics);
        read_key(map, KEY_WHITELIST_MODE, &mut settings.whitelist_mode, &mut diagnostics);

        if map.contains_key(KEY_INITIAL_VOLUME) {
            read_key(map, KEY_INITIAL_VOLUME, &mut settings.initial_volume, &mut diagnostics);
        } else if map.contains_key(LEGACY_KEY_INITIAL_VOLUME) {
            read_key(
                map,
                LEGACY_KEY_INITIAL_VOLUME,
                &mut settings.initial_volume,
                &mut diagnostics,
            );
            diagnostics.push(Diagnostic::info(
                "legacy-key",
                LEGACY_KEY_INITIAL_VOLUME,
                format!("read as {KEY_INITIAL_VOLUME}; it is rewritten on next save"),
            ));
        }

        if !(0.0..=100.0).contains(&settings.initial_volume) {
            diagnostics.push(Diagnostic::info(
                "range",
                KEY_INITIAL_VOLUME,
                format!(
                    "{} is outside 0-100; playback will clamp it",
                    settings.initial_volume
                ),
            ));
        }

        for key in map.keys() {
            if !KNOWN_KEYS.contains(&key.as_str()) && key != LEGACY_KEY_INITIAL_VOLUME {
                diagnostics.push(Diagnostic::info(
                    "unknown-field",
                    key.clone(),
                    "ignored",
                ));
            }
        }

        (settings, diagnostics)
    }

    /// Serialize to the storage object layout.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Initial volume as a playback fraction, when a fixed volume is configured.
    #[must_use]
    pub fn initial_volume_fraction(&self) -> Option<f64> {
        self.set_volume.then(|| self.initial_volume / 100.0)
    }

    /// Set one key from its textual form, as typed on a command line or in
    /// the options form.
    pub fn set_field(&mut self, key: &str, raw: &str) -> Result<()> {
        match key {
            KEY_ALWAYS_MUTE => self.always_mute = parse_bool(key, raw)?,
            KEY_SET_VOLUME => self.set_volume = parse_bool(key, raw)?,
            KEY_WHITELIST_MODE => self.whitelist_mode = parse_bool(key, raw)?,
            KEY_INITIAL_VOLUME => {
                self.initial_volume = raw
                    .trim()
                    .parse()
                    .map_err(|e| Error::invalid_value(key, format!("{e}")))?;
            },
            KEY_BLACKLIST => self.blacklist = parse_blacklist(raw),
            _ => {
                return Err(Error::UnknownKey {
                    key: key.to_string(),
                });
            },
        }
        Ok(())
    }
}

/// Normalise the blacklist textarea: one pattern per line, trimmed, blank
/// lines dropped.
#[must_use]
pub fn parse_blacklist(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|pattern| !pattern.is_empty())
        .map(String::from)
        .collect()
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        other => Err(Error::invalid_value(key, format!("expected a boolean, got {other:?}"))),
    }
}

fn read_key<T>(map: &Map<String, Value>, key: &str, slot: &mut T, diagnostics: &mut Vec<Diagnostic>)
where
    T: serde::de::DeserializeOwned,
{
    let Some(value) = map.get(key) else {
        return;
    };
    match serde_json::from_value::<T>(value.clone()) {
        Ok(parsed) => *slot = parsed,
        Err(e) => diagnostics.push(Diagnostic::warning(
            "type-error",
            key,
            format!("unreadable value ({e}), using default"),
        )),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest, serde_json::json};

    #[test]
    fn defaults_match_storage_defaults() {
        let s = Settings::default();
        assert!(s.always_mute);
        assert!(!s.set_volume);
        assert_eq!(s.initial_volume, 50.0);
        assert!(s.blacklist.is_empty());
        assert!(!s.whitelist_mode);
    }

    #[test]
    fn empty_object_yields_defaults() {
        assert_eq!(Settings::from_value(&json!({})), Settings::default());
        assert_eq!(Settings::from_value(&Value::Null), Settings::default());
    }

    #[test]
    fn reads_every_key() {
        let s = Settings::from_value(&json!({
            "alwaysMute": false,
            "setVolume": true,
            "initialVolume": 30,
            "blacklist": ["*.example.com/*"],
            "whitelistMode": true,
        }));
        assert!(!s.always_mute);
        assert!(s.set_volume);
        assert_eq!(s.initial_volume, 30.0);
        assert_eq!(s.blacklist, vec!["*.example.com/*".to_string()]);
        assert!(s.whitelist_mode);
        assert_eq!(s.initial_volume_fraction(), Some(0.3));
    }

    #[test]
    fn mistyped_key_falls_back_without_losing_others() {
        let (s, diagnostics) = Settings::from_value_with_diagnostics(&json!({
            "alwaysMute": "yes please",
            "whitelistMode": true,
        }));
        assert!(s.always_mute);
        assert!(s.whitelist_mode);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].path, "alwaysMute");
        assert_eq!(diagnostics[0].severity, Severity::Warning);
    }

    #[test]
    fn negative_volume_is_kept_as_is() {
        let (s, diagnostics) = Settings::from_value_with_diagnostics(&json!({
            "setVolume": true,
            "initialVolume": -20,
        }));
        assert_eq!(s.initial_volume, -20.0);
        assert!(diagnostics.iter().any(|d| d.category == "range"));
    }

    #[test]
    fn legacy_volume_key_is_read_when_canonical_missing() {
        let s = Settings::from_value(&json!({ "initalVolume": 80 }));
        assert_eq!(s.initial_volume, 80.0);

        let s = Settings::from_value(&json!({ "initalVolume": 80, "initialVolume": 20 }));
        assert_eq!(s.initial_volume, 20.0);
    }

    #[test]
    fn serializes_with_storage_key_names() {
        let value = Settings::default().to_value().unwrap();
        assert_eq!(value["alwaysMute"], json!(true));
        assert_eq!(value["initialVolume"], json!(50.0));
        assert!(value.get("initalVolume").is_none());
    }

    #[test]
    fn blacklist_text_is_trimmed_and_compacted() {
        let patterns = parse_blacklist("  *.example.com/*\n\n\t\nhttps://video.test/*  \n");
        assert_eq!(patterns, vec!["*.example.com/*", "https://video.test/*"]);
    }

    #[rstest]
    #[case("alwaysMute", "false")]
    #[case("setVolume", "on")]
    #[case("whitelistMode", "1")]
    #[case("initialVolume", "75")]
    #[case("blacklist", "a\nb")]
    fn set_field_accepts_known_keys(#[case] key: &str, #[case] raw: &str) {
        let mut s = Settings::default();
        s.set_field(key, raw).unwrap();
    }

    #[test]
    fn set_field_rejects_unknown_or_malformed() {
        let mut s = Settings::default();
        assert!(matches!(
            s.set_field("volume", "1"),
            Err(Error::UnknownKey { .. })
        ));
        assert!(matches!(
            s.set_field("alwaysMute", "maybe"),
            Err(Error::InvalidValue { .. })
        ));
        assert!(s.set_field("initialVolume", "loud").is_err());
    }
}
