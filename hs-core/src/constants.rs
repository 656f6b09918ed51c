//! Constants and configuration defaults for Huestatus
//!
//! Centralizes magic numbers and defaults. Add new ones here first.

/// Lamp colour and brightness ranges (Hue API units)
pub mod lamp {
    /// Maximum brightness/saturation accepted by the bridge
    pub const MAX_LEVEL: u8 = 254;

    /// Minimum brightness/saturation accepted by the bridge
    pub const MIN_LEVEL: u8 = 1;

    pub const ALERT_HUE: u16 = 0;
    pub const WARNING_HUE: u16 = 12750;
    pub const OK_HUE: u16 = 25500;
    pub const WORKING_HUE: u16 = 46920;

    /// Alert attribute values understood by the bridge
    pub mod alert {
        /// Flash for ~15 seconds
        pub const LONG_SELECT: &str = "lselect";
        pub const NONE: &str = "none";
    }
}

/// Hue bridge connection defaults
pub mod bridge {
    pub const DEFAULT_PORT: u16 = 80;
    pub const DEFAULT_TIMEOUT_MS: u64 = 15000;
}

/// Scheduling and queueing
pub mod timing {
    /// Interval between forced resyncs of every lamp
    pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 10;

    /// Bounded command queue per lamp
    pub const DEFAULT_QUEUE_CAPACITY: usize = 32;
}

/// Configuration file locations
pub mod paths {
    use std::path::PathBuf;

    pub const APP_DIR: &str = "huestatus";
    pub const CONFIG_FILE: &str = "config.json";

    /// Environment variable overriding the configuration file path
    pub const CONFIG_ENV: &str = "HUESTATUS_CONFIG";

    /// Default configuration file: `<config_dir>/huestatus/config.json`
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }
}
