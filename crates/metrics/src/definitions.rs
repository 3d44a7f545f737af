//! Metric name and label definitions.

/// Per-page overlay lifecycle metrics
pub mod overlays {
    /// Overlays attached to a video
    pub const INSTALLED_TOTAL: &str = "avc_overlays_installed_total";
    /// Overlays removed after their video left the page
    pub const DESTROYED_TOTAL: &str = "avc_overlays_destroyed_total";
    /// Overlays swept because their video was detached unnoticed
    pub const PRUNED_TOTAL: &str = "avc_overlays_pruned_total";
    /// Videos left without an overlay (template or host failure)
    pub const INSTALL_ERRORS_TOTAL: &str = "avc_overlay_install_errors_total";
}

/// Background coordinator metrics
pub mod coordinator {
    /// Toolbar clicks that flipped an origin (labels: origin, loud)
    pub const TOGGLES_TOTAL: &str = "avc_toggles_total";
    /// Toolbar clicks on tabs that did not answer
    pub const TOGGLES_SKIPPED_TOTAL: &str = "avc_toggles_skipped_total";
    /// Origins currently switched to loud
    pub const LOUD_ORIGINS: &str = "avc_loud_origins";
}

/// Common label keys
pub mod labels {
    pub const ORIGIN: &str = "origin";
    pub const LOUD: &str = "loud";
}
