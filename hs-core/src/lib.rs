//! Huestatus Core Library
//!
//! Turns status reports from many independent monitoring modules into the
//! colour of a Philips Hue lamp.
//!
//! # Features
//!
//! - **Status Aggregation**: Per-lamp registry of module statuses, resolved by fixed precedence
//! - **Lamp Control**: Writes the resolved status' colour and restores the original state on exit
//! - **Reconciliation**: Periodic forced resync so lamps touched by hand drift back
//! - **Reporting**: Level-filtered fanout to console and pluggable sinks
//! - **Configuration**: JSON settings with per-field defaults
//!
//! # Module Structure
//!
//! - `status` / `registry` - Status values and per-lamp resolution
//! - `state` - Lamp colour states and the status to state table
//! - `link` - The bridge seam ([`DeviceLink`]) and an in-memory bridge
//! - `lamp` / `lamp_task` - The lamp controller and its serialized command queue
//! - `scheduler` - Forced resync ticking
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use hs_core::{spawn_lamp, LampController, LampState, MemoryLink, ReporterFanout, StatusStateTable};
//!
//! # async fn demo() -> hs_core::Result<()> {
//! let link = Arc::new(MemoryLink::new().with_lamp("Desk", LampState::new(1000, 254, 254, false)));
//! let controller = LampController::connect(
//!     "Desk",
//!     "Desk",
//!     StatusStateTable::default(),
//!     link,
//!     Arc::new(ReporterFanout::default()),
//! )
//! .await?;
//! let (lamp, _task) = spawn_lamp(controller, 32);
//! lamp.register("ci").await?;
//! lamp.report("ci", "ok", "all green").await?;
//! # Ok(())
//! # }
//! ```

pub mod constants;
pub mod lamp;
pub mod lamp_task;
pub mod link;
pub mod registry;
pub mod reporter;
pub mod scheduler;
pub mod settings;
pub mod state;
pub mod status;

// Re-export error types
pub use hs_error::{HueStatusError, Result};

// Status and resolution
pub use registry::{resolve, ModuleStatusEntry, StatusRegistry};
pub use status::{status_label, ReportedStatus, Status, PRECEDENCE};

// Lamp states
pub use state::{LampState, StateWrite, StatusStateTable};

// Device seam
pub use link::{BridgeInfo, DeviceLink, LampInfo, MemoryLink};

// Lamp control
pub use lamp::{LampController, LampSnapshot, ResyncOutcome, StatusChange};
pub use lamp_task::{spawn_lamp, LampHandle};
pub use scheduler::{ReconciliationScheduler, SchedulerStats};

// Reporting
pub use reporter::{
    format_message, ConsoleReporter, LogLevel, RecordingReporter, Reporter, ReporterFanout,
};

// Settings
pub use settings::{
    bridge_credentials, load_settings, resolve_config_path, validate_settings,
    HueSettings, ModuleConfig, ModuleKind, ReporterConfig, ReporterKind, Settings,
};
