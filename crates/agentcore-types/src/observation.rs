use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::slot::SlotMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Success,
    Failure,
    Timeout,
    RateLimited,
    CircuitOpen,
    Duplicate,
}

/// Canonical tool-execution outcome (§3). Append-only within a turn; never
/// mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolObservation {
    pub tool: String,
    pub args: SlotMap,
    pub status: ToolStatus,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub status_code: Option<u16>,
    pub execution_time_ms: u64,
    pub attempt: u32,
    #[serde(default)]
    pub from_cache: bool,
    #[serde(default)]
    pub circuit_breaker_tripped: bool,
    pub timestamp: DateTime<Utc>,
}

impl ToolObservation {
    pub fn is_success(&self) -> bool {
        matches!(self.status, ToolStatus::Success)
    }
}
