//! Reporter sinks and the fanout that feeds them
//!
//! Lamps describe what they do as `(level, status, message)` reports. The
//! [`ReporterFanout`] forwards each report to every sink whose threshold
//! admits its level. The console sink is always present.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use hs_error::{HueStatusError, Result};

/// Report verbosity. `Error < Info < Debug`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Info,
    Debug,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }

    /// Whether a sink with this threshold receives a report at `level`
    pub fn admits(&self, level: LogLevel) -> bool {
        level <= *self
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = HueStatusError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "error" => Ok(LogLevel::Error),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            other => Err(HueStatusError::invalid_config(
                "log_level",
                format!("unknown level '{}'", other),
            )),
        }
    }
}

/// A report consumer
#[async_trait]
pub trait Reporter: Send + Sync {
    fn name(&self) -> &str;

    /// Called once before any report is delivered
    async fn start(&self) -> Result<()>;

    fn log(&self, level: LogLevel, status: &str, message: &str);
}

/// Re-emits reports through `tracing`
#[derive(Debug, Default)]
pub struct ConsoleReporter;

#[async_trait]
impl Reporter for ConsoleReporter {
    fn name(&self) -> &str {
        "console"
    }

    async fn start(&self) -> Result<()> {
        Ok(())
    }

    fn log(&self, level: LogLevel, status: &str, message: &str) {
        match level {
            LogLevel::Error => error!(status, "{}", message),
            LogLevel::Info => info!(status, "{}", message),
            LogLevel::Debug => debug!(status, "{}", message),
        }
    }
}

struct Sink {
    reporter: Arc<dyn Reporter>,
    threshold: LogLevel,
}

/// Sink to threshold mapping
pub struct ReporterFanout {
    sinks: Vec<Sink>,
}

/// `"<instance> - <message>"`, or the bare message without an instance
pub fn format_message(instance: Option<&str>, message: &str) -> String {
    match instance {
        Some(instance) => format!("{} - {}", instance, message),
        None => message.to_string(),
    }
}

impl ReporterFanout {
    /// Fanout holding only the console sink
    pub fn new(console_threshold: LogLevel) -> Self {
        let mut fanout = Self { sinks: Vec::new() };
        fanout.register(Arc::new(ConsoleReporter), console_threshold);
        fanout
    }

    pub fn register(&mut self, reporter: Arc<dyn Reporter>, threshold: LogLevel) {
        debug!(reporter = reporter.name(), %threshold, "Registered reporter");
        self.sinks.push(Sink { reporter, threshold });
    }

    pub fn names(&self) -> Vec<String> {
        self.sinks
            .iter()
            .map(|sink| sink.reporter.name().to_string())
            .collect()
    }

    /// Start every sink, stopping at the first failure
    pub async fn start_all(&self) -> Result<()> {
        for sink in &self.sinks {
            sink.reporter
                .start()
                .await
                .map_err(|e| HueStatusError::Reporter {
                    name: sink.reporter.name().to_string(),
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }

    pub fn dispatch(&self, level: LogLevel, status: &str, message: &str, instance: Option<&str>) {
        let formatted = format_message(instance, message);
        for sink in self.sinks.iter().filter(|sink| sink.threshold.admits(level)) {
            sink.reporter.log(level, status, &formatted);
        }
    }
}

impl Default for ReporterFanout {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}

/// Sink that keeps every report in memory
#[derive(Default)]
pub struct RecordingReporter {
    name: String,
    records: parking_lot::Mutex<Vec<(LogLevel, String, String)>>,
}

impl RecordingReporter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn records(&self) -> Vec<(LogLevel, String, String)> {
        self.records.lock().clone()
    }

    pub fn count(&self, level: LogLevel) -> usize {
        self.records.lock().iter().filter(|(l, _, _)| *l == level).count()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

#[async_trait]
impl Reporter for RecordingReporter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self) -> Result<()> {
        Ok(())
    }

    fn log(&self, level: LogLevel, status: &str, message: &str) {
        self.records
            .lock()
            .push((level, status.to_string(), message.to_string()));
    }
}
