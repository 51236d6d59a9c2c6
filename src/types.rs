use std::fmt;

use serde::{Serialize, Serializer};

/// Normalized check status, following the OK/WARNING/CRITICAL/UNKNOWN plugin
/// convention used by host monitoring agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Ok = 0,
    Warning = 1,
    Critical = 2,
    Unknown = 3,
}

impl CheckStatus {
    /// Map a process exit code onto the status domain.
    ///
    /// `None` means the process did not exit normally (killed by a signal,
    /// including the timeout kill). Anything outside 0..=3 is clamped to
    /// CRITICAL so the agent never sees an undefined severity.
    pub fn from_exit_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => CheckStatus::Ok,
            Some(1) => CheckStatus::Warning,
            Some(2) => CheckStatus::Critical,
            Some(3) => CheckStatus::Unknown,
            _ => CheckStatus::Critical,
        }
    }

    pub fn code(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CheckStatus::Ok => "OK",
            CheckStatus::Warning => "WARNING",
            CheckStatus::Critical => "CRITICAL",
            CheckStatus::Unknown => "UNKNOWN",
        };
        f.write_str(label)
    }
}

impl Serialize for CheckStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.code())
    }
}

/// One check result as the monitoring agent expects it.
///
/// Optional fields are left out of the JSON entirely when they hold their
/// default value.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub command: String,
    pub status: CheckStatus,
    pub output: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub ttl: u64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub source: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub handlers: Vec<String>,
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result() -> CheckResult {
        CheckResult {
            name: "disk-check".to_string(),
            command: "check_disk -w 80".to_string(),
            status: CheckStatus::Ok,
            output: "DISK OK\n".to_string(),
            ttl: 0,
            source: String::new(),
            handlers: Vec::new(),
        }
    }

    #[test]
    fn test_exit_codes_in_domain_pass_through() {
        assert_eq!(CheckStatus::from_exit_code(Some(0)), CheckStatus::Ok);
        assert_eq!(CheckStatus::from_exit_code(Some(1)), CheckStatus::Warning);
        assert_eq!(CheckStatus::from_exit_code(Some(2)), CheckStatus::Critical);
        assert_eq!(CheckStatus::from_exit_code(Some(3)), CheckStatus::Unknown);
    }

    #[test]
    fn test_exit_codes_outside_domain_are_critical() {
        for code in [4, 127, 255, -1] {
            assert_eq!(
                CheckStatus::from_exit_code(Some(code)),
                CheckStatus::Critical,
                "exit code {code}"
            );
        }
    }

    #[test]
    fn test_signal_termination_is_critical() {
        assert_eq!(CheckStatus::from_exit_code(None), CheckStatus::Critical);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(CheckStatus::Warning.to_string(), "WARNING");
        assert_eq!(CheckStatus::Unknown.code(), 3);
    }

    #[test]
    fn test_default_optionals_are_omitted() {
        let value = serde_json::to_value(result()).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "disk-check",
                "command": "check_disk -w 80",
                "status": 0,
                "output": "DISK OK\n",
            })
        );
    }

    #[test]
    fn test_set_optionals_are_included() {
        let mut r = result();
        r.status = CheckStatus::Warning;
        r.ttl = 60;
        r.source = "db01".to_string();
        r.handlers = vec!["pagerduty".to_string(), "slack".to_string()];

        let value = serde_json::to_value(r).unwrap();
        assert_eq!(value["status"], 1);
        assert_eq!(value["ttl"], 60);
        assert_eq!(value["source"], "db01");
        assert_eq!(value["handlers"], json!(["pagerduty", "slack"]));
    }
}
