pub mod fallback;
pub mod prompt;

use std::sync::Arc;

use agentcore_oracle::LlmOracle;
use agentcore_slots::{normalize_date, normalize_email, normalize_time, title_case};
use agentcore_types::{ExtractorOutput, Intent, SlotMap, SlotValue};
use chrono::Utc;
use serde_json::Value;

const SCHEMA_STR: &str = include_str!("../../../config/schemas/extractor_v1.json");
const ORACLE_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Default, Clone)]
pub struct ExtractContext {
    pub available_services: Option<Vec<String>>,
}

/// Maps raw utterance + lightweight tenant context to a validated
/// `ExtractorOutput` (§4.1).
pub struct Extractor {
    oracle: Arc<dyn LlmOracle>,
    schema: Value,
    confidence_threshold: f64,
}

impl Extractor {
    pub fn new(oracle: Arc<dyn LlmOracle>) -> Self {
        let schema: Value = serde_json::from_str(SCHEMA_STR).expect("bundled extractor schema is valid JSON");
        Self {
            oracle,
            schema,
            confidence_threshold: 0.7,
        }
    }

    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub async fn extract(&self, user_input: &str, context: Option<ExtractContext>) -> ExtractorOutput {
        if user_input.trim().is_empty() {
            return ExtractorOutput::empty_input();
        }

        let today = Utc::now().date_naive();
        let available = context.as_ref().and_then(|c| c.available_services.as_deref());
        let system_prompt = prompt::build_extraction_prompt(user_input, available, today);

        let call = self
            .oracle
            .generate_json(&system_prompt, "", &self.schema, 0.1, 300);

        let raw = match tokio::time::timeout(std::time::Duration::from_millis(ORACLE_TIMEOUT_MS), call).await {
            Ok(Ok(value)) => value,
            Ok(Err(err)) => {
                tracing::warn!(event = "extractor_oracle_error", error = %err, "oracle call failed");
                return fallback::fallback_extraction(user_input);
            }
            Err(_) => {
                tracing::warn!(event = "extractor_oracle_timeout", "oracle call timed out");
                return fallback::fallback_extraction(user_input);
            }
        };

        let validator = match jsonschema::validator_for(&self.schema) {
            Ok(v) => v,
            Err(err) => {
                tracing::error!(event = "extractor_schema_compile_error", error = %err, "bundled schema failed to compile");
                return fallback::fallback_extraction(user_input);
            }
        };

        if let Err(errors) = validator.validate(&raw) {
            tracing::warn!(event = "extractor_schema_validation_failed", error = %errors, "oracle output failed schema validation");
            return fallback::fallback_extraction(user_input);
        }

        match self.build_output(raw, today) {
            Some(output) => {
                if output.confidence < self.confidence_threshold {
                    tracing::warn!(
                        event = "extractor_low_confidence",
                        confidence = output.confidence,
                        "low confidence extraction, downstream clarification may be required"
                    );
                }
                tracing::info!(
                    event = "intent_detected",
                    intent = output.intent.as_str(),
                    confidence = output.confidence,
                    slot_count = output.slots.len(),
                );
                output
            }
            None => fallback::fallback_extraction(user_input),
        }
    }

    fn build_output(&self, raw: Value, today: chrono::NaiveDate) -> Option<ExtractorOutput> {
        let intent_str = raw.get("intent")?.as_str()?;
        let intent = parse_intent(intent_str)?;
        let confidence = raw.get("confidence")?.as_f64()?;
        let reasoning = raw.get("reasoning").and_then(|v| v.as_str()).map(str::to_string);

        let mut slots = SlotMap::new();
        if let Some(raw_slots) = raw.get("slots").and_then(|v| v.as_object()) {
            for (key, value) in raw_slots {
                if value.is_null() {
                    slots.insert(key.clone(), SlotValue::Null);
                    continue;
                }
                let Some(text) = value.as_str() else {
                    continue;
                };
                let normalized = match key.as_str() {
                    "preferred_date" => normalize_date(text, today),
                    "preferred_time" => normalize_time(text),
                    "client_name" | "staff_name" => title_case(text.trim()),
                    "client_email" => normalize_email(text),
                    _ => text.to_string(),
                };
                slots.insert(key.clone(), SlotValue::Text(normalized));
            }
        }

        Some(ExtractorOutput {
            intent,
            slots,
            confidence,
            reasoning,
        })
    }
}

fn parse_intent(s: &str) -> Option<Intent> {
    Some(match s {
        "greeting" => Intent::Greeting,
        "info_services" => Intent::InfoServices,
        "info_prices" => Intent::InfoPrices,
        "info_hours" => Intent::InfoHours,
        "book" => Intent::Book,
        "cancel" => Intent::Cancel,
        "reschedule" => Intent::Reschedule,
        "chitchat" => Intent::Chitchat,
        "other" => Intent::Other,
        _ => return None,
    })
}
