use serde::{Deserialize, Serialize};

use crate::observation::ToolObservation;
use crate::slot::SlotMap;

/// Immutable-style output of reducing a batch of observations (§3, §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationStatePatch {
    #[serde(default)]
    pub slots_patch: SlotMap,
    #[serde(default)]
    pub slots_to_remove: Vec<String>,
    #[serde(default)]
    pub cache_invalidation_keys: Vec<String>,
    #[serde(default)]
    pub change_reasons: Vec<String>,
    pub confidence_score: f64,
    /// Last K=5 observations, across turns, tool-facing only (§9: this is
    /// not user/assistant message history).
    #[serde(default)]
    pub last_observations: Vec<ToolObservation>,
}

impl ConversationStatePatch {
    pub fn empty() -> Self {
        Self {
            slots_patch: SlotMap::new(),
            slots_to_remove: Vec::new(),
            cache_invalidation_keys: Vec::new(),
            change_reasons: Vec::new(),
            confidence_score: 1.0,
            last_observations: Vec::new(),
        }
    }

    /// Merge this patch atomically into a slot mapping. Pure: `state` is
    /// consumed and a new map returned, never mutated in place by the
    /// caller's original reference.
    pub fn apply(&self, state: &SlotMap) -> SlotMap {
        let mut next = state.clone();
        for key in &self.slots_to_remove {
            next.remove(key);
        }
        for (k, v) in &self.slots_patch {
            next.insert(k.clone(), v.clone());
        }
        next
    }
}
