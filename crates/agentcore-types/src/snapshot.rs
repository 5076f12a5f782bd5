use serde::{Deserialize, Serialize};

use crate::ids::{ConversationId, WorkspaceId};
use crate::slot::SlotMap;
use crate::workspace::Vertical;

/// Input per turn (§3). Discarded after the turn; state persistence is an
/// external collaborator's job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    pub conversation_id: ConversationId,
    pub workspace_id: WorkspaceId,
    pub vertical: Vertical,
    pub user_input: String,
    #[serde(default)]
    pub greeted: bool,
    #[serde(default)]
    pub slots: SlotMap,
    #[serde(default)]
    pub objective: Option<String>,
    #[serde(default)]
    pub last_action: Option<String>,
    #[serde(default)]
    pub attempts_count: u32,
    #[serde(default)]
    pub called_tools: Vec<String>,
}

impl ConversationSnapshot {
    pub fn is_empty_input(&self) -> bool {
        self.user_input.trim().is_empty()
    }
}
