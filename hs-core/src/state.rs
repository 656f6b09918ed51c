//! Physical lamp settings and the status to state table

use serde::{Deserialize, Serialize};

use crate::constants::lamp;
use crate::status::Status;

/// The physical setting of a lamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LampState {
    pub hue: u16,
    pub brightness: u8,
    pub saturation: u8,
    /// Long flash (`lselect`) when true, steady colour otherwise
    #[serde(default)]
    pub flashing: bool,
}

impl LampState {
    pub const fn new(hue: u16, brightness: u8, saturation: u8, flashing: bool) -> Self {
        Self {
            hue,
            brightness,
            saturation,
            flashing,
        }
    }

    /// Full write including the alert attribute
    pub fn to_write(&self) -> StateWrite {
        StateWrite {
            hue: self.hue,
            brightness: self.brightness,
            saturation: self.saturation,
            flashing: Some(self.flashing),
        }
    }

    /// Colour-only write that leaves the alert attribute as the device has it
    pub fn to_write_preserving_alert(&self) -> StateWrite {
        StateWrite {
            flashing: None,
            ..self.to_write()
        }
    }

    /// Interpret a bridge alert attribute; only the long flash counts as flashing
    pub fn flashing_from_alert(alert: &str) -> bool {
        alert == lamp::alert::LONG_SELECT
    }
}

/// A write pushed to the device link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateWrite {
    pub hue: u16,
    pub brightness: u8,
    pub saturation: u8,
    /// `None` leaves the alert attribute untouched
    pub flashing: Option<bool>,
}

impl StateWrite {
    /// Bridge alert attribute for this write, if it sets one
    pub fn alert_attribute(&self) -> Option<&'static str> {
        self.flashing.map(|flashing| {
            if flashing {
                lamp::alert::LONG_SELECT
            } else {
                lamp::alert::NONE
            }
        })
    }

    /// Apply onto a known state, as the device would
    pub fn apply_to(&self, state: &LampState) -> LampState {
        LampState {
            hue: self.hue,
            brightness: self.brightness,
            saturation: self.saturation,
            flashing: self.flashing.unwrap_or(state.flashing),
        }
    }
}

fn default_alert() -> LampState {
    LampState::new(lamp::ALERT_HUE, lamp::MAX_LEVEL, lamp::MAX_LEVEL, true)
}

fn default_warning() -> LampState {
    LampState::new(lamp::WARNING_HUE, lamp::MAX_LEVEL, lamp::MAX_LEVEL, false)
}

fn default_working() -> LampState {
    LampState::new(lamp::WORKING_HUE, lamp::MAX_LEVEL, lamp::MAX_LEVEL, false)
}

fn default_ok() -> LampState {
    LampState::new(lamp::OK_HUE, lamp::MAX_LEVEL, lamp::MAX_LEVEL, false)
}

/// Status to lamp state mapping, overridable per status from configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusStateTable {
    #[serde(default = "default_alert")]
    pub alert: LampState,
    #[serde(default = "default_warning")]
    pub warning: LampState,
    #[serde(default = "default_working")]
    pub working: LampState,
    #[serde(default = "default_ok")]
    pub ok: LampState,
}

impl Default for StatusStateTable {
    fn default() -> Self {
        Self {
            alert: default_alert(),
            warning: default_warning(),
            working: default_working(),
            ok: default_ok(),
        }
    }
}

impl StatusStateTable {
    pub fn state_for(&self, status: Status) -> LampState {
        match status {
            Status::Alert => self.alert,
            Status::Warning => self.warning,
            Status::Working => self.working,
            Status::Ok => self.ok,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Status, LampState)> + '_ {
        crate::status::PRECEDENCE
            .iter()
            .map(move |status| (*status, self.state_for(*status)))
    }
}
