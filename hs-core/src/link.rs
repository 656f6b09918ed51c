//! Device link abstraction
//!
//! The core never talks to hardware directly. Everything goes through a
//! [`DeviceLink`]: the Hue bridge client in production, [`MemoryLink`] for
//! dry runs and tests. Retry and timeout policy belong to the implementation.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use hs_error::{HueStatusError, Result};

use crate::state::{LampState, StateWrite};

/// Bridge identification, logged at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeInfo {
    pub name: String,
    pub id: String,
    pub model_id: String,
}

/// A lamp as seen by the device link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LampInfo {
    pub id: String,
    pub name: String,
    pub reachable: bool,
    pub state: LampState,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceLink: Send + Sync {
    async fn bridge_info(&self) -> Result<BridgeInfo>;

    async fn list_lamps(&self) -> Result<Vec<LampInfo>>;

    async fn read_state(&self, lamp_id: &str) -> Result<LampState>;

    async fn write_state(&self, lamp_id: &str, write: &StateWrite) -> Result<()>;
}

struct MemoryLamp {
    info: LampInfo,
}

/// In-memory lamps with a write log
pub struct MemoryLink {
    lamps: Mutex<HashMap<String, MemoryLamp>>,
    writes: Mutex<Vec<(String, StateWrite)>>,
    failing: Mutex<HashSet<String>>,
    write_delay: Option<Duration>,
}

impl MemoryLink {
    pub fn new() -> Self {
        Self {
            lamps: Mutex::new(HashMap::new()),
            writes: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            write_delay: None,
        }
    }

    /// Make every write sleep first, to exercise interleavings
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    /// Add a reachable lamp; its id is its name
    pub fn with_lamp(self, name: &str, state: LampState) -> Self {
        self.add_lamp(name, state);
        self
    }

    pub fn add_lamp(&self, name: &str, state: LampState) {
        let info = LampInfo {
            id: name.to_string(),
            name: name.to_string(),
            reachable: true,
            state,
        };
        self.lamps
            .lock()
            .insert(name.to_string(), MemoryLamp { info });
    }

    /// Make reads and writes of a lamp fail (or succeed again)
    pub fn set_failing(&self, lamp_id: &str, failing: bool) {
        let mut guard = self.failing.lock();
        if failing {
            guard.insert(lamp_id.to_string());
        } else {
            guard.remove(lamp_id);
        }
    }

    /// Current state of a lamp as the device would report it
    pub fn state_of(&self, lamp_id: &str) -> Option<LampState> {
        self.lamps.lock().get(lamp_id).map(|lamp| lamp.info.state)
    }

    /// Every successful write, in order
    pub fn writes(&self) -> Vec<(String, StateWrite)> {
        self.writes.lock().clone()
    }

    pub fn writes_for(&self, lamp_id: &str) -> Vec<StateWrite> {
        self.writes
            .lock()
            .iter()
            .filter(|(id, _)| id == lamp_id)
            .map(|(_, write)| *write)
            .collect()
    }

    fn check_failing(&self, lamp_id: &str) -> Result<()> {
        if self.failing.lock().contains(lamp_id) {
            return Err(HueStatusError::device_write(lamp_id, "lamp unreachable"));
        }
        Ok(())
    }
}

impl Default for MemoryLink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceLink for MemoryLink {
    async fn bridge_info(&self) -> Result<BridgeInfo> {
        Ok(BridgeInfo {
            name: "memory".to_string(),
            id: "memory".to_string(),
            model_id: "in-memory".to_string(),
        })
    }

    async fn list_lamps(&self) -> Result<Vec<LampInfo>> {
        let mut lamps: Vec<LampInfo> = self
            .lamps
            .lock()
            .values()
            .map(|lamp| lamp.info.clone())
            .collect();
        lamps.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(lamps)
    }

    async fn read_state(&self, lamp_id: &str) -> Result<LampState> {
        if self.failing.lock().contains(lamp_id) {
            return Err(HueStatusError::device_read(lamp_id, "lamp unreachable"));
        }
        self.state_of(lamp_id)
            .ok_or_else(|| HueStatusError::UnknownLamp(lamp_id.to_string()))
    }

    async fn write_state(&self, lamp_id: &str, write: &StateWrite) -> Result<()> {
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
        self.check_failing(lamp_id)?;

        {
            let mut lamps = self.lamps.lock();
            let lamp = lamps
                .get_mut(lamp_id)
                .ok_or_else(|| HueStatusError::UnknownLamp(lamp_id.to_string()))?;
            lamp.info.state = write.apply_to(&lamp.info.state);
        }
        self.writes.lock().push((lamp_id.to_string(), *write));

        debug!(lamp = lamp_id, ?write, "memory link write");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_link_roundtrip() {
        let link = MemoryLink::new().with_lamp("Desk", LampState::new(1000, 254, 254, false));

        let state = link.read_state("Desk").await.unwrap();
        assert_eq!(state.hue, 1000);

        let write = LampState::new(0, 254, 254, true).to_write();
        link.write_state("Desk", &write).await.unwrap();

        assert_eq!(link.state_of("Desk"), Some(LampState::new(0, 254, 254, true)));
        assert_eq!(link.writes_for("Desk"), vec![write]);
    }

    #[tokio::test]
    async fn test_memory_link_unknown_lamp() {
        let link = MemoryLink::new();
        let err = link.read_state("Nope").await.unwrap_err();
        assert!(matches!(err, HueStatusError::UnknownLamp(_)));
    }

    #[tokio::test]
    async fn test_memory_link_failing_lamp_records_nothing() {
        let link = MemoryLink::new().with_lamp("Desk", LampState::new(1, 1, 1, false));
        link.set_failing("Desk", true);

        let write = LampState::new(0, 254, 254, true).to_write();
        assert!(link.write_state("Desk", &write).await.is_err());
        assert!(link.writes().is_empty());

        link.set_failing("Desk", false);
        assert!(link.write_state("Desk", &write).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_lamps_sorted_by_name() {
        let link = MemoryLink::new()
            .with_lamp("b", LampState::new(1, 1, 1, false))
            .with_lamp("a", LampState::new(1, 1, 1, false));
        let names: Vec<String> = link
            .list_lamps()
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
