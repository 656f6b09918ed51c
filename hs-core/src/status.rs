//! Lamp statuses and their precedence
//!
//! A module reports one of four statuses. When several modules share a lamp
//! the most urgent one wins, in the fixed order of [`PRECEDENCE`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A recognized module status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Alert,
    Warning,
    Working,
    Ok,
}

/// Most urgent first. The index into this table is the status' urgency rank.
pub const PRECEDENCE: [Status; 4] = [Status::Alert, Status::Warning, Status::Working, Status::Ok];

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Alert => "alert",
            Status::Warning => "warning",
            Status::Working => "working",
            Status::Ok => "ok",
        }
    }

    /// Position in [`PRECEDENCE`]; lower is more urgent
    pub fn rank(&self) -> usize {
        PRECEDENCE
            .iter()
            .position(|s| s == self)
            .unwrap_or(PRECEDENCE.len())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alert" => Ok(Status::Alert),
            "warning" => Ok(Status::Warning),
            "working" => Ok(Status::Working),
            "ok" => Ok(Status::Ok),
            other => Err(format!("unrecognized status '{}'", other)),
        }
    }
}

/// What a module actually sent, kept verbatim when it is not a known status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportedStatus {
    Known(Status),
    Unrecognized(String),
}

impl ReportedStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<Status>() {
            Ok(status) => ReportedStatus::Known(status),
            Err(_) => ReportedStatus::Unrecognized(raw.to_string()),
        }
    }

    /// The recognized status, if any
    pub fn known(&self) -> Option<Status> {
        match self {
            ReportedStatus::Known(status) => Some(*status),
            ReportedStatus::Unrecognized(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ReportedStatus::Known(status) => status.as_str(),
            ReportedStatus::Unrecognized(raw) => raw,
        }
    }
}

impl From<Status> for ReportedStatus {
    fn from(status: Status) -> Self {
        ReportedStatus::Known(status)
    }
}

impl fmt::Display for ReportedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label for an optional resolved status, `unset` when nothing has been reported
pub fn status_label(status: Option<Status>) -> &'static str {
    status.map(|s| s.as_str()).unwrap_or("unset")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_ranks() {
        assert_eq!(Status::Alert.rank(), 0);
        assert_eq!(Status::Warning.rank(), 1);
        assert_eq!(Status::Working.rank(), 2);
        assert_eq!(Status::Ok.rank(), 3);
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert_eq!("ok".parse::<Status>(), Ok(Status::Ok));
        assert!("OK".parse::<Status>().is_err());
        assert!("".parse::<Status>().is_err());
    }

    #[test]
    fn test_reported_status_keeps_raw_value() {
        let reported = ReportedStatus::parse("bogus");
        assert_eq!(reported.known(), None);
        assert_eq!(reported.as_str(), "bogus");

        let reported = ReportedStatus::parse("warning");
        assert_eq!(reported.known(), Some(Status::Warning));
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        let json = serde_json::to_string(&Status::Working).unwrap();
        assert_eq!(json, "\"working\"");
        let status: Status = serde_json::from_str("\"alert\"").unwrap();
        assert_eq!(status, Status::Alert);
    }

    #[test]
    fn test_status_label() {
        assert_eq!(status_label(None), "unset");
        assert_eq!(status_label(Some(Status::Ok)), "ok");
    }
}
