//! Overlay markup template and its class-name contract.

use std::{collections::HashSet, sync::Arc};

use {async_trait::async_trait, tracing::debug};

use crate::error::{EngineError, Result};

/// Class names the overlay relies on. Markup structure is otherwise free.
pub mod classes {
    pub const PLAY_PAUSE: &str = "avc-play-pause";
    pub const MUTE: &str = "avc-mute";
    pub const FULLSCREEN: &str = "avc-fullscreen";
    pub const PROGRESS_BAR: &str = "avc-progress-bar";
    pub const VOLUME_BAR: &str = "avc-volume-bar";
    pub const TIMECODE_CURRENT: &str = "avc-timecode-current";
    pub const TIMECODE_DURATION: &str = "avc-timecode-duration";

    pub const REQUIRED: &[&str] = &[
        PLAY_PAUSE,
        MUTE,
        FULLSCREEN,
        PROGRESS_BAR,
        VOLUME_BAR,
        TIMECODE_CURRENT,
        TIMECODE_DURATION,
    ];

    // State classes toggled on the overlay root.
    pub const PAUSED: &str = "avc-paused";
    pub const PLAYING: &str = "avc-playing";
    pub const MUTED: &str = "avc-muted";
    pub const NO_AUDIO: &str = "avc-no-audio";
    pub const MOUSE_IN: &str = "avc-mouse-in";
}

/// Progress range input maximum.
pub const PROGRESS_MAX: f64 = 1000.0;
/// Volume range input maximum.
pub const VOLUME_MAX: f64 = 100.0;
/// Control bar height when the template does not declare one.
pub const DEFAULT_BAR_HEIGHT: f64 = 40.0;

const BAR_HEIGHT_ATTR: &str = "data-bar-height=\"";

/// Markup shipped with the extension.
pub const BUNDLED_MARKUP: &str = include_str!("../assets/controls.html");

/// A validated overlay template.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayTemplate {
    markup: Arc<str>,
    bar_height: f64,
}

impl OverlayTemplate {
    /// Validate markup against the class-name contract.
    pub fn parse(markup: &str) -> Result<Self> {
        let found = class_names(markup);
        if let Some(class) = classes::REQUIRED
            .iter()
            .copied()
            .find(|class| !found.contains(class))
        {
            return Err(EngineError::TemplateMissingClass { class });
        }

        Ok(Self {
            markup: Arc::from(markup),
            bar_height: bar_height(markup).unwrap_or(DEFAULT_BAR_HEIGHT),
        })
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// Fixed height of the control bar in CSS pixels.
    pub fn bar_height(&self) -> f64 {
        self.bar_height
    }
}

/// All class names used in `class="…"` attributes.
fn class_names(markup: &str) -> HashSet<&str> {
    let mut found = HashSet::new();
    let mut rest = markup;
    while let Some(start) = rest.find("class=") {
        rest = &rest[start + "class=".len()..];
        let Some(quote) = rest.chars().next().filter(|c| *c == '"' || *c == '\'') else {
            continue;
        };
        rest = &rest[1..];
        let Some(end) = rest.find(quote) else {
            break;
        };
        found.extend(rest[..end].split_whitespace());
        rest = &rest[end + 1..];
    }
    found
}

fn bar_height(markup: &str) -> Option<f64> {
    let start = markup.find(BAR_HEIGHT_ATTR)? + BAR_HEIGHT_ATTR.len();
    let len = markup[start..].find('"')?;
    markup[start..start + len]
        .trim()
        .parse()
        .ok()
        .filter(|h: &f64| h.is_finite() && *h >= 0.0)
}

/// Where overlay markup comes from.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    async fn fetch(&self) -> Result<String>;
}

/// The markup bundled into the extension package.
#[derive(Debug, Default, Clone, Copy)]
pub struct BundledTemplate;

#[async_trait]
impl TemplateSource for BundledTemplate {
    async fn fetch(&self) -> Result<String> {
        debug!("using bundled overlay template");
        Ok(BUNDLED_MARKUP.to_string())
    }
}

/// Fixed markup, for hosts that inline their own.
#[derive(Debug, Clone)]
pub struct StaticTemplate {
    markup: String,
}

impl StaticTemplate {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
        }
    }
}

#[async_trait]
impl TemplateSource for StaticTemplate {
    async fn fetch(&self) -> Result<String> {
        Ok(self.markup.clone())
    }
}

/// Fetch and validate a template.
pub async fn load_template(source: &dyn TemplateSource) -> Result<OverlayTemplate> {
    let markup = source.fetch().await?;
    OverlayTemplate::parse(&markup)
}
