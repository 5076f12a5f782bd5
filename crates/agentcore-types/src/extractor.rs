use serde::{Deserialize, Serialize};

use crate::slot::SlotMap;

/// Closed intent vocabulary (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    InfoServices,
    InfoPrices,
    InfoHours,
    Book,
    Cancel,
    Reschedule,
    Chitchat,
    Other,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Greeting => "greeting",
            Intent::InfoServices => "info_services",
            Intent::InfoPrices => "info_prices",
            Intent::InfoHours => "info_hours",
            Intent::Book => "book",
            Intent::Cancel => "cancel",
            Intent::Reschedule => "reschedule",
            Intent::Chitchat => "chitchat",
            Intent::Other => "other",
        }
    }
}

/// Output of the Extractor (§4.1), validated against `extractor_v1.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorOutput {
    pub intent: Intent,
    #[serde(default)]
    pub slots: SlotMap,
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: Option<String>,
}

impl ExtractorOutput {
    /// The fixed answer for empty/whitespace input (§4.1), never routed
    /// through the oracle.
    pub fn empty_input() -> Self {
        Self {
            intent: Intent::Other,
            slots: SlotMap::new(),
            confidence: 1.0,
            reasoning: Some("Empty input".to_string()),
        }
    }
}
