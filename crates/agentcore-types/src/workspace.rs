use serde::{Deserialize, Serialize};

use crate::ids::WorkspaceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vertical {
    Services,
    Gastronomy,
    RealEstate,
}

impl Vertical {
    pub fn manifest_key(&self) -> &'static str {
        match self {
            Vertical::Services => "services",
            Vertical::Gastronomy => "gastronomy",
            Vertical::RealEstate => "real_estate",
        }
    }
}

/// Subscription level. Ordering is significant: `basic < pro < max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierLevel {
    Basic,
    Pro,
    Max,
}

impl TierLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TierLevel::Basic => "basic",
            TierLevel::Pro => "pro",
            TierLevel::Max => "max",
        }
    }
}

impl Default for TierLevel {
    fn default() -> Self {
        TierLevel::Basic
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceStatus {
    Active,
    Suspended,
}

/// Tenant-configurable runtime constraints on planning (§4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspacePolicy {
    pub max_tool_calls: usize,
    pub one_slot_per_turn: bool,
    pub tools_first: Vec<String>,
    pub forbid_patterns: Vec<String>,
    pub min_confidence: f64,
    pub allow_offers_without_stock: bool,
    pub require_confirmation: bool,
}

impl Default for WorkspacePolicy {
    fn default() -> Self {
        Self {
            max_tool_calls: 3,
            one_slot_per_turn: true,
            tools_first: Vec::new(),
            forbid_patterns: Vec::new(),
            min_confidence: 0.55,
            allow_offers_without_stock: false,
            require_confirmation: true,
        }
    }
}

/// Immutable-per-turn tenant context (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub vertical: Vertical,
    pub tier: TierLevel,
    pub status: WorkspaceStatus,
    pub policy: WorkspacePolicy,
    /// Tenant timezone, IANA name (e.g. "America/Argentina/Buenos_Aires").
    /// §9 open question: the source hardcodes server wall-clock; this field
    /// is threaded through the Extractor normalizer instead of a hardcoded
    /// zone. `None` falls back to UTC, matching the source's behavior.
    pub timezone: Option<String>,
}

impl Workspace {
    pub fn is_active(&self) -> bool {
        matches!(self.status, WorkspaceStatus::Active)
    }
}
