//! Module status registry and precedence resolution
//!
//! Each lamp keeps one [`StatusRegistry`]. Modules must register their
//! instance name before reporting; the registry only ever holds the latest
//! report per instance.

use std::collections::HashMap;

use hs_error::{HueStatusError, Result};

use crate::status::{ReportedStatus, Status, PRECEDENCE};

/// Latest report of a single module instance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleStatusEntry {
    /// `None` until the module reports for the first time
    pub status: Option<ReportedStatus>,
    pub last_message: String,
}

/// Per-lamp map of module instance name to its latest report
#[derive(Debug, Clone, Default)]
pub struct StatusRegistry {
    lamp: String,
    entries: HashMap<String, ModuleStatusEntry>,
}

impl StatusRegistry {
    pub fn new(lamp: impl Into<String>) -> Self {
        Self {
            lamp: lamp.into(),
            entries: HashMap::new(),
        }
    }

    /// Register a module instance with an unset status
    pub fn register(&mut self, instance: &str) -> Result<()> {
        if self.entries.contains_key(instance) {
            return Err(HueStatusError::DuplicateInstance {
                lamp: self.lamp.clone(),
                instance: instance.to_string(),
            });
        }
        self.entries
            .insert(instance.to_string(), ModuleStatusEntry::default());
        Ok(())
    }

    /// Overwrite the entry of a registered instance.
    ///
    /// The status is stored verbatim even when it is not a recognized value.
    pub fn update(&mut self, instance: &str, status: &str, message: &str) -> Result<()> {
        let entry = self
            .entries
            .get_mut(instance)
            .ok_or_else(|| HueStatusError::UnknownInstance {
                lamp: self.lamp.clone(),
                instance: instance.to_string(),
            })?;
        entry.status = Some(ReportedStatus::parse(status));
        entry.last_message = message.to_string();
        Ok(())
    }

    pub fn get(&self, instance: &str) -> Option<&ModuleStatusEntry> {
        self.entries.get(instance)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &ModuleStatusEntry)> {
        self.entries.iter()
    }

    /// Worst-case status over every registered instance
    pub fn resolve(&self) -> Option<Status> {
        resolve(self.entries.values())
    }
}

/// Resolve the most urgent recognized status.
///
/// Unset and unrecognized entries are skipped. The reduction runs over
/// precedence ranks, so the result does not depend on iteration order.
pub fn resolve<'a, I>(entries: I) -> Option<Status>
where
    I: IntoIterator<Item = &'a ModuleStatusEntry>,
{
    entries
        .into_iter()
        .filter_map(|entry| entry.status.as_ref().and_then(ReportedStatus::known))
        .map(|status| status.rank())
        .min()
        .and_then(|rank| PRECEDENCE.get(rank).copied())
}
