use serde::{Deserialize, Serialize};

use crate::slot::SlotMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyDecision {
    Allow,
    Deny,
    AskClarification,
}

/// Outcome of validating one `PlanAction` against tenant policy (§3, §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyResult {
    pub decision: PolicyDecision,
    pub reason: String,
    #[serde(default)]
    pub missing_slots: Vec<String>,
    #[serde(default)]
    pub validation_errors: Vec<String>,
    /// What would unblock the action (tier upgrade id, slot names, "wait", ...).
    #[serde(default)]
    pub needs: Vec<String>,
    /// Long-form explanation suitable for feeding back to the Planner oracle.
    #[serde(default)]
    pub why: String,
    #[serde(default)]
    pub normalized_args: SlotMap,
    pub manifest_version: String,
}

impl PolicyResult {
    pub fn is_allowed(&self) -> bool {
        self.decision == PolicyDecision::Allow
    }

    pub fn allow(reason: impl Into<String>, manifest_version: impl Into<String>) -> Self {
        Self {
            decision: PolicyDecision::Allow,
            reason: reason.into(),
            missing_slots: Vec::new(),
            validation_errors: Vec::new(),
            needs: Vec::new(),
            why: String::new(),
            normalized_args: SlotMap::new(),
            manifest_version: manifest_version.into(),
        }
    }

    pub fn deny(reason: impl Into<String>, why: impl Into<String>, manifest_version: impl Into<String>) -> Self {
        Self {
            decision: PolicyDecision::Deny,
            reason: reason.into(),
            missing_slots: Vec::new(),
            validation_errors: Vec::new(),
            needs: Vec::new(),
            why: why.into(),
            normalized_args: SlotMap::new(),
            manifest_version: manifest_version.into(),
        }
    }

    pub fn ask_clarification(
        reason: impl Into<String>,
        why: impl Into<String>,
        missing_slots: Vec<String>,
        manifest_version: impl Into<String>,
    ) -> Self {
        Self {
            decision: PolicyDecision::AskClarification,
            reason: reason.into(),
            missing_slots: missing_slots.clone(),
            validation_errors: Vec::new(),
            needs: missing_slots,
            why: why.into(),
            normalized_args: SlotMap::new(),
            manifest_version: manifest_version.into(),
        }
    }
}
