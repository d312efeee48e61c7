//! Application-wide constants.

/// Unified log facility that reports wallpaper image-cache activity.
pub mod wallpaper_log {
    /// Subsystem of the wallpaper agent.
    pub const SUBSYSTEM: &str = "com.apple.wallpaper";

    /// Category used for image-cache lookups.
    pub const CATEGORY: &str = "image-cache";

    /// Prefix of the message emitted when the agent resolves a wallpaper image.
    pub const LOOKUP_MARKER: &str = "BEGIN - Image cache lookup - url";

    /// Pattern extracting the wallpaper file URL from a lookup message.
    pub const URL_PATTERN: &str = r"url: (file://[^,]+)";

    /// Absolute path of the `log` tool.
    pub const LOG_BINARY: &str = "/usr/bin/log";
}

/// Distributed notification names.
pub mod notifications {
    /// Posted by the login window when the screen is unlocked.
    pub const SCREEN_UNLOCKED: &str = "com.apple.screenIsUnlocked";

    /// Posted when the system light/dark appearance changes.
    pub const THEME_CHANGED: &str = "AppleInterfaceThemeChangedNotification";

    /// Posted by clearbar after a new wallpaper strip is applied.
    pub const WALLPAPER_CHANGED: &str = "com.clearbar.wallpaper-changed";
}

/// Defaults for the visual effect.
pub mod effect {
    /// Cross-fade duration, in seconds, used when swapping wallpaper strips.
    pub const TRANSITION_DURATION_SECS: f64 = 2.0;

    /// Exposure (EV) reasserted on the wallpaper layer after appearance changes.
    pub const EXPOSURE_BASELINE_EV: f64 = -1.0;

    /// Lookback used when resolving the last known wallpaper from the log store.
    pub const LAST_KNOWN_RECENCY_SECS: u64 = 120;

    /// Lookback used when resolving the currently active wallpaper.
    pub const CURRENT_RECENCY_SECS: u64 = 2;
}
