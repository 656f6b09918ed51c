//! Lamp controller
//!
//! Owns one lamp's module registry, the state captured at startup and the
//! last status pushed to the device. Decides when a physical write is
//! warranted:
//!
//! - **Module reports** write only when the resolved status changes.
//! - **Forced resyncs** always write, but never touch the alert attribute
//!   so an in-progress flash cycle is not interrupted.
//! - **Reset** restores the captured state, and only if the lamp was touched.
//!
//! Local state (`current_status`, `is_dirty`) is committed only after the
//! device link confirms a write.

use std::sync::Arc;

use tracing::{debug, info, warn};

use hs_error::{HueStatusError, Result};

use crate::link::DeviceLink;
use crate::registry::StatusRegistry;
use crate::reporter::{LogLevel, ReporterFanout};
use crate::state::{LampState, StateWrite, StatusStateTable};
use crate::status::{status_label, ReportedStatus, Status};

/// Outcome of a module report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// Resolved status unchanged, nothing written
    Unchanged(Option<Status>),
    /// Resolved status changed and the lamp was written
    Changed {
        from: Option<Status>,
        to: Option<Status>,
    },
}

/// Outcome of a forced resync
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncOutcome {
    /// No module registered or none has reported a recognized status
    Skipped,
    Resynced(Status),
}

/// Read-only view of a controller, for status queries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LampSnapshot {
    pub name: String,
    pub lamp_id: String,
    pub current_status: Option<Status>,
    pub is_dirty: bool,
    pub initial_state: LampState,
    pub modules: Vec<(String, Option<ReportedStatus>, String)>,
}

pub struct LampController {
    name: String,
    lamp_id: String,
    registry: StatusRegistry,
    current_status: Option<Status>,
    is_dirty: bool,
    initial_state: LampState,
    states: StatusStateTable,
    link: Arc<dyn DeviceLink>,
    reporters: Arc<ReporterFanout>,
}

impl LampController {
    pub fn new(
        name: impl Into<String>,
        lamp_id: impl Into<String>,
        initial_state: LampState,
        states: StatusStateTable,
        link: Arc<dyn DeviceLink>,
        reporters: Arc<ReporterFanout>,
    ) -> Self {
        let name = name.into();
        Self {
            registry: StatusRegistry::new(name.clone()),
            name,
            lamp_id: lamp_id.into(),
            current_status: None,
            is_dirty: false,
            initial_state,
            states,
            link,
            reporters,
        }
    }

    /// Read the lamp's current state and build a controller around it
    pub async fn connect(
        name: impl Into<String>,
        lamp_id: impl Into<String>,
        states: StatusStateTable,
        link: Arc<dyn DeviceLink>,
        reporters: Arc<ReporterFanout>,
    ) -> Result<Self> {
        let lamp_id = lamp_id.into();
        let initial_state = link.read_state(&lamp_id).await?;
        let controller = Self::new(name, lamp_id, initial_state, states, link, reporters);
        debug!(
            lamp = %controller.name,
            hue = initial_state.hue,
            brightness = initial_state.brightness,
            saturation = initial_state.saturation,
            flashing = initial_state.flashing,
            "Captured initial lamp state"
        );
        Ok(controller)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lamp_id(&self) -> &str {
        &self.lamp_id
    }

    pub fn current_status(&self) -> Option<Status> {
        self.current_status
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    pub fn initial_state(&self) -> LampState {
        self.initial_state
    }

    pub fn registry(&self) -> &StatusRegistry {
        &self.registry
    }

    pub fn snapshot(&self) -> LampSnapshot {
        let mut modules: Vec<(String, Option<ReportedStatus>, String)> = self
            .registry
            .entries()
            .map(|(instance, entry)| {
                (instance.clone(), entry.status.clone(), entry.last_message.clone())
            })
            .collect();
        modules.sort_by(|a, b| a.0.cmp(&b.0));

        LampSnapshot {
            name: self.name.clone(),
            lamp_id: self.lamp_id.clone(),
            current_status: self.current_status,
            is_dirty: self.is_dirty,
            initial_state: self.initial_state,
            modules,
        }
    }

    pub fn register(&mut self, instance: &str) -> Result<()> {
        self.registry.register(instance)?;
        info!(lamp = %self.name, instance, "Module registered");
        Ok(())
    }

    /// Record a module report and write the lamp if the resolved status changed
    pub async fn apply_module_status(
        &mut self,
        instance: &str,
        status: &str,
        message: &str,
    ) -> Result<StatusChange> {
        self.registry.update(instance, status, message)?;

        let resolved = self.registry.resolve();
        if resolved == self.current_status {
            self.reporters
                .dispatch(LogLevel::Debug, status, message, Some(instance));
            return Ok(StatusChange::Unchanged(resolved));
        }

        // An all-unrecognized lamp falls back to how it looked before we touched it
        let write = match resolved {
            Some(status) => self.states.state_for(status).to_write(),
            None => self.initial_state.to_write(),
        };

        if let Err(e) = self.push(&write).await {
            self.reporters.dispatch(
                LogLevel::Error,
                status,
                &format!("{} (lamp {}: {})", message, self.name, e),
                Some(instance),
            );
            return Err(e);
        }

        let from = self.current_status;
        self.current_status = resolved;
        self.is_dirty = true;
        info!(
            lamp = %self.name,
            from = status_label(from),
            to = status_label(resolved),
            "Lamp status changed"
        );
        self.reporters
            .dispatch(LogLevel::Info, status, message, Some(instance));

        Ok(StatusChange::Changed { from, to: resolved })
    }

    /// Re-push the resolved status regardless of what was last written
    pub async fn force_resync(&mut self) -> Result<ResyncOutcome> {
        if self.registry.is_empty() {
            return Ok(ResyncOutcome::Skipped);
        }
        let Some(resolved) = self.registry.resolve() else {
            debug!(lamp = %self.name, "No module has reported yet, skipping resync");
            return Ok(ResyncOutcome::Skipped);
        };

        let write = self.states.state_for(resolved).to_write_preserving_alert();
        if let Err(e) = self.push(&write).await {
            self.reporters.dispatch(
                LogLevel::Error,
                resolved.as_str(),
                &format!("Forced resync of {} failed: {}", self.name, e),
                None,
            );
            return Err(e);
        }

        self.current_status = Some(resolved);
        self.is_dirty = true;
        self.reporters.dispatch(
            LogLevel::Debug,
            resolved.as_str(),
            &format!("Resynced {} to {}", self.name, resolved),
            None,
        );
        Ok(ResyncOutcome::Resynced(resolved))
    }

    /// Restore the state captured at startup if the lamp was ever written.
    ///
    /// Returns whether a write happened.
    pub async fn reset_to_initial(&mut self) -> Result<bool> {
        if !self.is_dirty {
            debug!(lamp = %self.name, "Lamp untouched, nothing to restore");
            return Ok(false);
        }

        let write = self.initial_state.to_write();
        if let Err(e) = self.push(&write).await {
            warn!(lamp = %self.name, error = %e, "Failed to restore initial state");
            self.reporters.dispatch(
                LogLevel::Error,
                status_label(self.current_status),
                &format!("Failed to restore {}: {}", self.name, e),
                None,
            );
            return Err(e);
        }

        self.is_dirty = false;
        self.current_status = None;
        self.reporters.dispatch(
            LogLevel::Info,
            "unset",
            &format!("Restored {} to its initial state", self.name),
            None,
        );
        Ok(true)
    }

    async fn push(&self, write: &StateWrite) -> Result<()> {
        self.link
            .write_state(&self.lamp_id, write)
            .await
            .map_err(|e| match e {
                HueStatusError::DeviceWrite { .. } => e,
                other => HueStatusError::device_write(&self.name, other.to_string()),
            })
    }
}
