//! Wire contracts shared by every workflow the console drives.
//!
//! All identifiers and timestamps are opaque strings as the backend emits
//! them; timestamps are ISO-8601 and therefore order lexicographically.
//! Field names serialize as-is (snake_case), enum variants as their
//! capitalized names.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompileRequest {
    pub code: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompileResponse {
    pub success: bool,
    #[serde(default)]
    pub ast: Option<serde_json::Value>,
    #[serde(default)]
    pub bytecode: Option<String>,
    pub policy_validation: PolicyValidation,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
}

/// Static policy verdict attached to every compile. `passed == true`
/// implies `violations` is empty.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PolicyValidation {
    pub passed: bool,
    pub violations: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SandboxRunRequest {
    #[serde(default)]
    pub binary_path: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub memory_limit: Option<String>,
    #[serde(default)]
    pub timeout: Option<String>,
    #[serde(default)]
    pub network_enabled: Option<bool>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SandboxRun {
    pub id: String,
    pub status: RunStatus,
    pub stdout: String,
    pub stderr: String,
    #[serde(default)]
    pub exit_code: Option<i32>,
    pub syscall_log: Vec<SyscallEntry>,
    pub resource_usage: ResourceUsage,
    pub created_at: String,
    #[serde(default)]
    pub completed_at: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Timeout,
}

impl RunStatus {
    /// A run is immutable once it leaves the Pending/Running states.
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunStatus::Pending | RunStatus::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Pending => "Pending",
            RunStatus::Running => "Running",
            RunStatus::Completed => "Completed",
            RunStatus::Failed => "Failed",
            RunStatus::Timeout => "Timeout",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyscallEntry {
    pub syscall: String,
    pub args: String,
    pub result: String,
    pub timestamp: String,
    pub allowed: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub memory_mb: f64,
    pub cpu_percent: f64,
    pub execution_time_ms: i64,
    pub syscalls_count: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SandboxLogs {
    pub stdout: String,
    pub stderr: String,
    pub syscall_log: Vec<SyscallEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FuzzStartRequest {
    pub target_binary: String,
    pub corpus_dir: String,
    pub crash_dir: String,
    #[serde(default)]
    pub timeout: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FuzzCampaign {
    pub id: String,
    pub name: String,
    pub status: FuzzStatus,
    pub target_binary: String,
    pub stats: FuzzStats,
    pub started_at: String,
    #[serde(default)]
    pub stopped_at: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FuzzStatus {
    Idle,
    Running,
    Stopped,
    Error,
}

impl FuzzStatus {
    pub fn is_running(self) -> bool {
        matches!(self, FuzzStatus::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FuzzStatus::Idle => "Idle",
            FuzzStatus::Running => "Running",
            FuzzStatus::Stopped => "Stopped",
            FuzzStatus::Error => "Error",
        }
    }
}

/// Campaign counters. Monotonically non-decreasing while the campaign is
/// running, except `execs_per_second` which is an instantaneous rate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FuzzStats {
    pub executions: u64,
    pub crashes: u64,
    pub corpus_size: u64,
    pub coverage_percent: f64,
    pub execs_per_second: f64,
    pub mutations_applied: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FuzzStopResponse {
    pub success: bool,
    pub campaign_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CrashInfo {
    pub id: String,
    pub campaign_id: String,
    pub input: String,
    #[serde(default)]
    pub signal: Option<i32>,
    pub output: String,
    pub discovered_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub level: LogLevel,
    pub source: LogSource,
    pub message: String,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
    pub timestamp: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "Debug",
            LogLevel::Info => "Info",
            LogLevel::Warning => "Warning",
            LogLevel::Error => "Error",
            LogLevel::Critical => "Critical",
        }
    }

    /// Case-insensitive parse of a level name.
    pub fn parse(raw: &str) -> Option<LogLevel> {
        match raw.to_ascii_lowercase().as_str() {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warning" => Some(LogLevel::Warning),
            "error" => Some(LogLevel::Error),
            "critical" => Some(LogLevel::Critical),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogSource {
    Compiler,
    Sandbox,
    Fuzzer,
    System,
}

impl LogSource {
    pub fn as_str(self) -> &'static str {
        match self {
            LogSource::Compiler => "Compiler",
            LogSource::Sandbox => "Sandbox",
            LogSource::Fuzzer => "Fuzzer",
            LogSource::System => "System",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimelineResponse {
    pub entries: Vec<LogEntry>,
    pub total_count: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub service: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn campaign_decodes_wire_shape() {
        let raw = r#"{
            "id": "c-1",
            "name": "campaign-1",
            "status": "Running",
            "target_binary": "test_target",
            "stats": {
                "executions": 120000,
                "crashes": 3,
                "corpus_size": 412,
                "coverage_percent": 78.5,
                "execs_per_second": 2100.0,
                "mutations_applied": 98000
            },
            "started_at": "2026-08-23T10:00:00Z"
        }"#;
        let campaign: FuzzCampaign = serde_json::from_str(raw).expect("campaign should decode");
        assert!(campaign.status.is_running());
        assert_eq!(campaign.stats.crashes, 3);
        assert!(campaign.stopped_at.is_none());
    }

    #[test]
    fn log_entry_decodes_without_details() {
        let raw = r#"{
            "id": "l-1",
            "level": "Warning",
            "source": "Sandbox",
            "message": "syscall denied",
            "timestamp": "2026-08-23T10:00:01Z"
        }"#;
        let entry: LogEntry = serde_json::from_str(raw).expect("entry should decode");
        assert_eq!(entry.level, LogLevel::Warning);
        assert_eq!(entry.source, LogSource::Sandbox);
        assert!(entry.details.is_none());
    }

    #[test]
    fn run_request_serializes_snake_case() {
        let request = SandboxRunRequest {
            code: Some("fn main() {}".to_string()),
            memory_limit: Some("100M".to_string()),
            timeout: Some("5s".to_string()),
            network_enabled: Some(false),
            ..SandboxRunRequest::default()
        };
        let json = serde_json::to_value(&request).expect("request should encode");
        assert_eq!(json["memory_limit"], "100M");
        assert_eq!(json["network_enabled"], false);
    }

    #[test]
    fn levels_order_by_severity() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Error < LogLevel::Critical);
    }

    #[test]
    fn level_parse_is_case_insensitive() {
        assert_eq!(LogLevel::parse("ERROR"), Some(LogLevel::Error));
        assert_eq!(LogLevel::parse("critical"), Some(LogLevel::Critical));
        assert_eq!(LogLevel::parse("fatal"), None);
    }

    #[test]
    fn terminal_run_statuses() {
        assert!(!RunStatus::Pending.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(RunStatus::Timeout.is_terminal());
    }
}
