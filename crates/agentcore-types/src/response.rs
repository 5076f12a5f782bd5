use serde::{Deserialize, Serialize};

use crate::plan::PlanAction;
use crate::slot::SlotMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NextAction {
    Greet,
    SlotFill,
    RetrieveContext,
    ExecuteAction,
    Answer,
    AskHuman,
}

/// The orchestrator's single exposed call result (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecideResponse {
    pub assistant: String,
    pub next_action: NextAction,
    /// Tools actually executed this turn, sanitized (PII redacted).
    pub tool_calls: Vec<PlanAction>,
    pub slots: SlotMap,
    pub end: bool,
}
