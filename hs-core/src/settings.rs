//! Application Settings
//!
//! Configuration stored as JSON, by default in ~/.config/huestatus/config.json.
//! Every field is optional; a missing file yields the defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use hs_error::{HueStatusError, Result};

use crate::constants::{bridge, lamp, paths, timing};
use crate::reporter::LogLevel;
use crate::state::{LampState, StatusStateTable};

/// Top-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Verbose console reports
    #[serde(default)]
    pub debug: bool,

    /// Seconds between forced resyncs of every lamp
    #[serde(default = "default_resync_interval")]
    pub resync_interval_secs: u64,

    /// Bounded command queue length per lamp
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default)]
    pub hue: HueSettings,

    #[serde(default)]
    pub modules: Vec<ModuleConfig>,

    #[serde(default)]
    pub reporters: Vec<ReporterConfig>,
}

/// Bridge connection and status colours
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HueSettings {
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub username: Option<String>,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub statuses: StatusStateTable,
}

/// A configured module instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Module name, also the prefix of generated instance names
    pub name: String,

    /// Explicit instance name; generated from `name` when absent
    #[serde(default)]
    pub instance_name: Option<String>,

    /// Name of the lamp this module drives
    pub light: String,

    #[serde(flatten)]
    pub kind: ModuleKind,
}

/// Built-in module kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModuleKind {
    /// Report a fixed status on a timer
    Interval {
        status: String,
        #[serde(default)]
        message: String,
        interval_secs: u64,
    },
    /// Run a program; exit code 0 is `ok`, anything else `alert`
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
        interval_secs: u64,
    },
    /// GET a URL; 2xx is `ok`, anything else `alert`
    Http {
        url: String,
        interval_secs: u64,
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
    },
}

impl ModuleKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            ModuleKind::Interval { .. } => "interval",
            ModuleKind::Command { .. } => "command",
            ModuleKind::Http { .. } => "http",
        }
    }

    pub fn interval_secs(&self) -> u64 {
        match self {
            ModuleKind::Interval { interval_secs, .. }
            | ModuleKind::Command { interval_secs, .. }
            | ModuleKind::Http { interval_secs, .. } => *interval_secs,
        }
    }
}

/// A configured reporter sink
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReporterConfig {
    #[serde(default)]
    pub log_level: LogLevel,

    #[serde(flatten)]
    pub kind: ReporterKind,
}

/// Built-in reporter sinks (the console sink is always present)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReporterKind {
    /// Append one JSON object per report
    JsonFile { path: PathBuf },
}

fn default_resync_interval() -> u64 {
    timing::DEFAULT_RESYNC_INTERVAL_SECS
}

fn default_queue_capacity() -> usize {
    timing::DEFAULT_QUEUE_CAPACITY
}

fn default_port() -> u16 {
    bridge::DEFAULT_PORT
}

fn default_timeout_ms() -> u64 {
    bridge::DEFAULT_TIMEOUT_MS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            resync_interval_secs: default_resync_interval(),
            queue_capacity: default_queue_capacity(),
            hue: HueSettings::default(),
            modules: Vec::new(),
            reporters: Vec::new(),
        }
    }
}

impl Default for HueSettings {
    fn default() -> Self {
        Self {
            host: None,
            port: default_port(),
            username: None,
            timeout_ms: default_timeout_ms(),
            statuses: StatusStateTable::default(),
        }
    }
}

impl Settings {
    /// Console sink threshold
    pub fn console_level(&self) -> LogLevel {
        if self.debug {
            LogLevel::Debug
        } else {
            LogLevel::Info
        }
    }

    /// Lamp names referenced by modules, deduplicated in configuration order
    pub fn module_lights(&self) -> Vec<String> {
        let mut lights: Vec<String> = Vec::new();
        for module in &self.modules {
            if !lights.contains(&module.light) {
                lights.push(module.light.clone());
            }
        }
        lights
    }
}

/// Pick the configuration file: explicit path, then `HUESTATUS_CONFIG`, then the default location
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Ok(env_path) = std::env::var(paths::CONFIG_ENV) {
        if !env_path.trim().is_empty() {
            return Some(PathBuf::from(env_path));
        }
    }
    paths::default_config_path()
}

/// Load settings from a file, falling back to defaults when it does not exist
pub fn load_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        info!("No configuration at {:?}, using defaults", path);
        return Ok(Settings::default());
    }

    let content = fs::read_to_string(path).map_err(|source| HueStatusError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let settings: Settings = serde_json::from_str(&content)?;
    debug!(
        modules = settings.modules.len(),
        reporters = settings.reporters.len(),
        "Loaded configuration from {:?}",
        path
    );
    Ok(settings)
}

fn validate_state(field: &str, state: &LampState) -> Result<()> {
    let range = lamp::MIN_LEVEL..=lamp::MAX_LEVEL;
    if !range.contains(&state.brightness) {
        return Err(HueStatusError::invalid_config(
            format!("{}.brightness", field),
            format!("{} is outside {:?}", state.brightness, range),
        ));
    }
    if !range.contains(&state.saturation) {
        return Err(HueStatusError::invalid_config(
            format!("{}.saturation", field),
            format!("{} is outside {:?}", state.saturation, range),
        ));
    }
    Ok(())
}

/// Reject settings the daemon cannot run with.
///
/// Bridge host and username are checked separately, since a dry run does
/// not need them.
pub fn validate_settings(settings: &Settings) -> Result<()> {
    if settings.resync_interval_secs == 0 {
        return Err(HueStatusError::invalid_config(
            "resync_interval_secs",
            "must be greater than zero",
        ));
    }
    if settings.queue_capacity == 0 {
        return Err(HueStatusError::invalid_config(
            "queue_capacity",
            "must be greater than zero",
        ));
    }

    for (status, state) in settings.hue.statuses.iter() {
        validate_state(&format!("hue.statuses.{}", status), &state)?;
    }

    for (idx, module) in settings.modules.iter().enumerate() {
        if module.name.trim().is_empty() {
            return Err(HueStatusError::invalid_config(
                format!("modules[{}].name", idx),
                "must not be empty",
            ));
        }
        if module.light.trim().is_empty() {
            return Err(HueStatusError::invalid_config(
                format!("modules[{}].light", idx),
                "must name a lamp",
            ));
        }
        if module.kind.interval_secs() == 0 {
            return Err(HueStatusError::invalid_config(
                format!("modules[{}].interval_secs", idx),
                "must be greater than zero",
            ));
        }
    }
    Ok(())
}

/// Bridge host and username, required for talking to a real bridge
pub fn bridge_credentials(settings: &Settings) -> Result<(String, String)> {
    let host = settings
        .hue
        .host
        .clone()
        .filter(|h| !h.trim().is_empty())
        .ok_or_else(|| HueStatusError::MissingConfig("hue.host".to_string()))?;
    let username = settings
        .hue
        .username
        .clone()
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| HueStatusError::MissingConfig("hue.username".to_string()))?;
    Ok((host, username))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn sample_json() -> &'static str {
        r#"{
            "debug": true,
            "hue": {
                "host": "10.0.0.2",
                "username": "abc",
                "statuses": { "ok": { "hue": 30000, "brightness": 200, "saturation": 100 } }
            },
            "modules": [
                { "type": "interval", "name": "heartbeat", "light": "Desk",
                  "status": "ok", "message": "alive", "interval_secs": 30 },
                { "type": "command", "name": "tests", "instance_name": "unit-tests",
                  "light": "Hall", "program": "cargo", "args": ["test"], "interval_secs": 300 }
            ],
            "reporters": [
                { "type": "json_file", "path": "/tmp/hs.json", "log_level": "debug" }
            ]
        }"#
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.resync_interval_secs, 10);
        assert_eq!(settings.hue.port, 80);
        assert_eq!(settings.hue.timeout_ms, 15000);
        assert_eq!(settings.console_level(), LogLevel::Info);
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let settings: Settings = serde_json::from_str(sample_json()).unwrap();

        assert!(settings.debug);
        assert_eq!(settings.console_level(), LogLevel::Debug);
        assert_eq!(settings.hue.statuses.ok, LampState::new(30000, 200, 100, false));
        assert_eq!(settings.hue.statuses.alert, StatusStateTable::default().alert);

        assert_eq!(settings.modules.len(), 2);
        assert_eq!(
            settings.modules[0].kind,
            ModuleKind::Interval {
                status: "ok".into(),
                message: "alive".into(),
                interval_secs: 30
            }
        );
        assert_eq!(settings.modules[1].instance_name.as_deref(), Some("unit-tests"));
        assert_eq!(settings.modules[1].kind.type_name(), "command");

        assert_eq!(settings.reporters[0].log_level, LogLevel::Debug);
        assert_eq!(settings.module_lights(), vec!["Desk".to_string(), "Hall".to_string()]);
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_unknown_module_type_is_rejected() {
        let json = r#"{ "modules": [ { "type": "jenkins", "name": "x", "light": "Desk" } ] }"#;
        assert!(serde_json::from_str::<Settings>(json).is_err());
    }

    #[test]
    fn test_validation_errors() {
        let mut settings = Settings::default();
        settings.resync_interval_secs = 0;
        assert!(matches!(
            validate_settings(&settings),
            Err(HueStatusError::InvalidConfig { ref field, .. }) if field == "resync_interval_secs"
        ));

        let mut settings: Settings = serde_json::from_str(sample_json()).unwrap();
        settings.modules[0].light = " ".into();
        assert!(matches!(
            validate_settings(&settings),
            Err(HueStatusError::InvalidConfig { ref field, .. }) if field == "modules[0].light"
        ));

        let mut settings = Settings::default();
        settings.hue.statuses.warning.brightness = 255;
        assert!(matches!(
            validate_settings(&settings),
            Err(HueStatusError::InvalidConfig { ref field, .. }) if field == "hue.statuses.warning.brightness"
        ));
    }

    #[test]
    fn test_bridge_credentials() {
        let settings = Settings::default();
        assert!(matches!(
            bridge_credentials(&settings),
            Err(HueStatusError::MissingConfig(ref f)) if f == "hue.host"
        ));

        let settings: Settings = serde_json::from_str(sample_json()).unwrap();
        assert_eq!(
            bridge_credentials(&settings).unwrap(),
            ("10.0.0.2".to_string(), "abc".to_string())
        );
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = load_settings(&dir.path().join("nope.json")).unwrap();
        assert!(settings.modules.is_empty());
    }

    #[test]
    fn test_serialized_settings_load_back() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(sample_json().as_bytes()).unwrap();

        let settings = load_settings(file.path()).unwrap();
        assert_eq!(settings.modules.len(), 2);

        let dir = TempDir::new().unwrap();
        let out = dir.path().join("config.json");
        fs::write(&out, serde_json::to_string_pretty(&settings).unwrap()).unwrap();
        let reloaded = load_settings(&out).unwrap();
        assert_eq!(reloaded.modules[1].kind, settings.modules[1].kind);
    }

    #[test]
    fn test_load_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        assert!(matches!(load_settings(file.path()), Err(HueStatusError::JsonParse(_))));
    }

    #[test]
    #[serial]
    fn test_resolve_config_path_precedence() {
        std::env::set_var(paths::CONFIG_ENV, "/tmp/from-env.json");
        assert_eq!(
            resolve_config_path(Some(Path::new("/tmp/explicit.json"))),
            Some(PathBuf::from("/tmp/explicit.json"))
        );
        assert_eq!(resolve_config_path(None), Some(PathBuf::from("/tmp/from-env.json")));

        std::env::remove_var(paths::CONFIG_ENV);
        let default = resolve_config_path(None);
        if let Some(path) = default {
            assert!(path.ends_with("huestatus/config.json"));
        }
    }
}
