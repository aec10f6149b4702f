// Check verdicts
//
// Output follows the monitoring plugin convention: one status line with an
// optional performance data section after a pipe, and an exit code of
// 0 (OK), 1 (WARNING), 2 (CRITICAL) or 3 (UNKNOWN).

use crate::CheckError;
use lastseen_core::Timestamp;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Check outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl Status {
    /// Process exit code for this status
    pub fn exit_code(self) -> i32 {
        match self {
            Status::Ok => 0,
            Status::Warning => 1,
            Status::Critical => 2,
            Status::Unknown => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Warning => "WARNING",
            Status::Critical => "CRITICAL",
            Status::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Age performance data, whole seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PerfData {
    pub age: u64,
    pub warning: u64,
    pub critical: u64,
}

impl PerfData {
    pub fn new(age: Duration, warning: Duration, critical: Duration) -> Self {
        Self {
            age: age.as_secs(),
            warning: warning.as_secs(),
            critical: critical.as_secs(),
        }
    }
}

impl fmt::Display for PerfData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "age={}s;{};{}", self.age, self.warning, self.critical)
    }
}

/// The freshest name among all matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Freshest {
    pub name: String,
    pub last_seen: Timestamp,
}

/// Final result of one check run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub status: Status,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freshest: Option<Freshest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perfdata: Option<PerfData>,
}

impl Verdict {
    pub fn unknown(message: impl Into<String>) -> Self {
        Self {
            status: Status::Unknown,
            message: message.into(),
            freshest: None,
            perfdata: None,
        }
    }

    /// Verdict for a successfully resolved freshest name
    pub fn from_age(status: Status, freshest: Freshest, perfdata: PerfData) -> Self {
        let message = format!(
            "Last sensor update: {} ({})",
            freshest.last_seen.to_rfc3339(),
            freshest.name
        );
        Self {
            status,
            message,
            freshest: Some(freshest),
            perfdata: Some(perfdata),
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.status.exit_code()
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.status, self.message)?;
        if let Some(perf) = &self.perfdata {
            write!(f, "|{}", perf)?;
        }
        Ok(())
    }
}

impl From<CheckError> for Verdict {
    fn from(err: CheckError) -> Self {
        Verdict::unknown(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(Status::Ok.exit_code(), 0);
        assert_eq!(Status::Warning.exit_code(), 1);
        assert_eq!(Status::Critical.exit_code(), 2);
        assert_eq!(Status::Unknown.exit_code(), 3);
    }

    #[test]
    fn test_status_line_with_perfdata() {
        let verdict = Verdict::from_age(
            Status::Ok,
            Freshest {
                name: "sensor/1".into(),
                last_seen: Timestamp::from_secs(1_700_000_000),
            },
            PerfData::new(
                Duration::from_millis(100_900),
                Duration::from_secs(3000),
                Duration::from_secs(6000),
            ),
        );
        assert_eq!(
            verdict.to_string(),
            "OK - Last sensor update: 2023-11-14T22:13:20Z (sensor/1)|age=100s;3000;6000"
        );
    }

    #[test]
    fn test_unknown_has_no_perfdata() {
        let verdict = Verdict::unknown("File /tmp/x.db does not exist");
        assert_eq!(verdict.to_string(), "UNKNOWN - File /tmp/x.db does not exist");
        assert_eq!(verdict.exit_code(), 3);
    }

    #[test]
    fn test_json_shape() {
        let verdict = Verdict::unknown("nothing");
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["status"], "UNKNOWN");
        assert_eq!(json["message"], "nothing");
        assert!(json.get("perfdata").is_none());
    }
}
