use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Semantic type of a canonical slot (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotType {
    String,
    Date,
    Time,
    Email,
    Phone,
    Number,
}

/// Declarative definition of one entry in the closed canonical slot
/// vocabulary, grounded on `original_source/services/canonical_slots.py`'s
/// `SlotDefinition`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub slot_type: SlotType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub is_pii: bool,
}

/// The typed value a slot may hold once normalized. Replaces the untyped
/// mapping the source passes around (§9 "Dynamic shapes → typed variants").
/// Canonical conversation slots (service_type, preferred_date, ...) only
/// ever take the scalar variants; `Json` exists for the system-computed
/// `_`-prefixed state the reducer writes (service lists, price tables)
/// that has no fixed shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Null,
    Json(serde_json::Value),
}

impl SlotValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SlotValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_present(&self) -> bool {
        match self {
            SlotValue::Null => false,
            SlotValue::Text(s) => !s.trim().is_empty(),
            SlotValue::Json(v) => !v.is_null(),
            _ => true,
        }
    }
}

impl From<&str> for SlotValue {
    fn from(s: &str) -> Self {
        SlotValue::Text(s.to_string())
    }
}

impl From<String> for SlotValue {
    fn from(s: String) -> Self {
        SlotValue::Text(s)
    }
}

impl From<serde_json::Value> for SlotValue {
    fn from(v: serde_json::Value) -> Self {
        SlotValue::Json(v)
    }
}

/// `slots` mapping shared by `ConversationSnapshot`, `ExtractorOutput`, and
/// `ConversationStatePatch`. Insertion order is irrelevant per §3, hence
/// `BTreeMap` for deterministic iteration (log output, tests) over a
/// `HashMap`.
pub type SlotMap = BTreeMap<String, SlotValue>;

/// Slot names carrying personally-identifying data; redacted to `***` in
/// any structured log or metric (§3 invariant, §4.4 PII redaction).
pub const PII_SLOTS: &[&str] = &["client_name", "client_email", "client_phone"];

pub fn is_pii_slot(name: &str) -> bool {
    PII_SLOTS.contains(&name)
}

/// Replace PII-flagged slot values with `***`, leaving non-PII values and
/// unknown keys untouched. Mirrors `canonical_slots.redact_pii`.
pub fn redact_pii(args: &SlotMap) -> SlotMap {
    args.iter()
        .map(|(k, v)| {
            if is_pii_slot(k) && v.is_present() {
                (k.clone(), SlotValue::Text("***".to_string()))
            } else {
                (k.clone(), v.clone())
            }
        })
        .collect()
}
