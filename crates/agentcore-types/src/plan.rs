use serde::{Deserialize, Serialize};

use crate::slot::SlotMap;

/// One planned tool invocation (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanAction {
    pub tool: String,
    #[serde(default)]
    pub args: SlotMap,
}

impl PlanAction {
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            args: SlotMap::new(),
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<crate::slot::SlotValue>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }
}

/// The Planner's structured decision (§3, §4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanOutput {
    #[serde(default = "default_plan_version")]
    pub plan_version: String,
    pub actions: Vec<PlanAction>,
    #[serde(default)]
    pub needs_confirmation: bool,
    #[serde(default)]
    pub missing_slots: Vec<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

fn default_plan_version() -> String {
    "v1".to_string()
}

impl PlanOutput {
    pub fn empty(needs_confirmation: bool) -> Self {
        Self {
            plan_version: default_plan_version(),
            actions: Vec::new(),
            needs_confirmation,
            missing_slots: Vec::new(),
            confidence: None,
        }
    }
}
