use std::collections::VecDeque;

use agentcore_types::{ConversationStatePatch, SlotMap, SlotValue, ToolObservation, ToolStatus};
use chrono::Utc;
use dashmap::DashMap;

const DEFAULT_MAX_OBSERVATIONS: usize = 5;
const SLOW_CALL_MS: u64 = 10_000;
const CRITICAL_TOOLS: &[&str] = &["book_appointment", "cancel_appointment"];

/// Folds `ToolObservation`s into `ConversationStatePatch`es, one per-tool
/// extraction rule at a time, and keeps a bounded per-conversation
/// observation history for LLM context compression. Grounded on
/// `state_reducer.py::StateReducer` and `tests/test_state_reducer.py`.
pub struct StateReducer {
    max_observations: usize,
    history: DashMap<String, VecDeque<ToolObservation>>,
}

impl Default for StateReducer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_OBSERVATIONS)
    }
}

impl StateReducer {
    pub fn new(max_observations: usize) -> Self {
        Self {
            max_observations,
            history: DashMap::new(),
        }
    }

    pub fn apply_observation(&self, observation: &ToolObservation, _current_slots: &SlotMap, conversation_id: &str) -> ConversationStatePatch {
        let mut patch = ConversationStatePatch::empty();

        match observation.status {
            ToolStatus::Success => self.apply_success(observation, &mut patch),
            ToolStatus::Failure | ToolStatus::Timeout | ToolStatus::RateLimited => self.apply_failure(observation, &mut patch),
            ToolStatus::CircuitOpen => self.apply_circuit_open(observation, &mut patch),
            ToolStatus::Duplicate => {
                patch.change_reasons.push(format!("Duplicate call to {} served from cache", observation.tool));
                return patch;
            }
        }

        if observation.execution_time_ms > SLOW_CALL_MS {
            patch.confidence_score *= 0.9;
        }

        self.record_history(conversation_id, observation.clone());
        patch.last_observations = self.recent(conversation_id);

        patch
    }

    pub fn apply_multiple_observations(&self, observations: &[ToolObservation], current_slots: &SlotMap, conversation_id: &str) -> ConversationStatePatch {
        let mut combined = ConversationStatePatch::empty();
        let mut min_confidence = 1.0_f64;

        for observation in observations {
            let patch = self.apply_observation(observation, current_slots, conversation_id);
            for (key, value) in patch.slots_patch {
                combined.slots_patch.insert(key, value);
            }
            for key in patch.slots_to_remove {
                if !combined.slots_to_remove.contains(&key) {
                    combined.slots_to_remove.push(key);
                }
            }
            for key in patch.cache_invalidation_keys {
                if !combined.cache_invalidation_keys.contains(&key) {
                    combined.cache_invalidation_keys.push(key);
                }
            }
            combined.change_reasons.extend(patch.change_reasons);
            min_confidence = min_confidence.min(patch.confidence_score);
        }

        combined.confidence_score = min_confidence;
        combined.last_observations = self.recent(conversation_id);
        combined
    }

    fn apply_success(&self, observation: &ToolObservation, patch: &mut ConversationStatePatch) {
        let tool = observation.tool.as_str();
        patch.slots_patch.insert(flag_key(tool, "success"), SlotValue::Bool(true));
        patch.slots_patch.insert(flag_key(tool, "last_run"), SlotValue::Text(Utc::now().to_rfc3339()));
        patch.change_reasons.push(format!("{tool} executed successfully"));

        let Some(result) = observation.result.as_ref() else {
            return;
        };

        match tool {
            "get_available_services" => {
                if let Some(services) = result.get("services").and_then(|v| v.as_array()) {
                    let names: Vec<String> = services
                        .iter()
                        .filter_map(|s| s.get("name").and_then(|n| n.as_str()).map(str::to_string))
                        .collect();
                    let prices: serde_json::Map<String, serde_json::Value> = services
                        .iter()
                        .filter_map(|s| {
                            let name = s.get("name")?.as_str()?.to_string();
                            let price = s.get("price")?.clone();
                            Some((name, price))
                        })
                        .collect();
                    patch.slots_patch.insert(
                        "_available_services".to_string(),
                        SlotValue::Json(serde_json::Value::Array(names.into_iter().map(serde_json::Value::String).collect())),
                    );
                    patch.slots_patch.insert("_service_prices".to_string(), SlotValue::Json(serde_json::Value::Object(prices)));
                }
                patch.cache_invalidation_keys.push("services_cache".to_string());
            }
            "get_business_hours" => {
                patch.slots_patch.insert("_business_hours".to_string(), SlotValue::Json(result.clone()));
            }
            "check_service_availability" => {
                if let Some(slots) = result.get("available_slots").cloned() {
                    patch.slots_patch.insert("_available_times".to_string(), SlotValue::Json(slots));
                }
                if let Some(next) = result.get("next_available").and_then(|v| v.as_str()) {
                    patch.slots_patch.insert("_next_available".to_string(), SlotValue::Text(next.to_string()));
                }
                patch.cache_invalidation_keys.push("availability_cache".to_string());
            }
            "book_appointment" => {
                for (result_key, slot_key) in [
                    ("booking_id", "booking_id"),
                    ("confirmation_code", "confirmation_code"),
                    ("appointment_date", "confirmed_date"),
                    ("appointment_time", "confirmed_time"),
                ] {
                    if let Some(value) = result.get(result_key).and_then(|v| v.as_str()) {
                        patch.slots_patch.insert(slot_key.to_string(), SlotValue::Text(value.to_string()));
                    }
                }
                patch.slots_patch.insert("_booking_confirmed".to_string(), SlotValue::Bool(true));
            }
            "cancel_appointment" => {
                patch.slots_patch.insert("_cancelled".to_string(), SlotValue::Bool(true));
            }
            "find_appointment_by_phone" => {
                if let Some(value) = result.get("booking_id").and_then(|v| v.as_str()) {
                    patch.slots_patch.insert("booking_id".to_string(), SlotValue::Text(value.to_string()));
                }
            }
            _ => {
                patch.slots_patch.insert(format!("_{tool}_result"), SlotValue::Json(result.clone()));
            }
        }
    }

    fn apply_failure(&self, observation: &ToolObservation, patch: &mut ConversationStatePatch) {
        let tool = observation.tool.as_str();
        let error = observation.error.clone().unwrap_or_else(|| "unknown error".to_string());

        patch.slots_patch.insert(flag_key(tool, "success"), SlotValue::Bool(false));
        patch.slots_patch.insert(flag_key(tool, "error"), SlotValue::Text(error.clone()));
        patch.change_reasons.push(format!("{tool} failed: {error}"));
        patch.confidence_score *= 0.7;

        if CRITICAL_TOOLS.contains(&tool) {
            patch
                .slots_patch
                .insert("_validation_errors".to_string(), SlotValue::Json(serde_json::json!([format!("Error ejecutando {tool}: {error}")])));
        }
    }

    fn apply_circuit_open(&self, observation: &ToolObservation, patch: &mut ConversationStatePatch) {
        let tool = observation.tool.as_str();
        patch.slots_patch.insert(flag_key(tool, "circuit_open"), SlotValue::Bool(true));
        patch.slots_patch.insert(
            "_validation_errors".to_string(),
            SlotValue::Json(serde_json::json!([format!("Servicio {tool} temporalmente no disponible")])),
        );
        patch.change_reasons.push(format!("{tool} circuit breaker open"));
        patch.confidence_score *= 0.7;
    }

    fn record_history(&self, conversation_id: &str, observation: ToolObservation) {
        let mut history = self.history.entry(conversation_id.to_string()).or_default();
        history.push_back(observation);
        while history.len() > self.max_observations {
            history.pop_front();
        }
    }

    fn recent(&self, conversation_id: &str) -> Vec<ToolObservation> {
        self.history.get(conversation_id).map(|h| h.iter().cloned().collect()).unwrap_or_default()
    }

    /// Condensed, token-budgeted summary of recent tool activity for
    /// feeding back into the Planner/Extractor oracle prompts.
    pub fn observation_context(&self, conversation_id: &str, max_chars: usize) -> String {
        let history = self.recent(conversation_id);
        if history.is_empty() {
            return String::new();
        }

        let mut lines = vec!["HERRAMIENTAS EJECUTADAS RECIENTEMENTE:".to_string()];
        for obs in &history {
            let icon = match obs.status {
                ToolStatus::Success => "✅",
                ToolStatus::Failure | ToolStatus::Timeout => "❌",
                ToolStatus::RateLimited => "⏳",
                ToolStatus::CircuitOpen => "🔌",
                ToolStatus::Duplicate => "♻️",
            };
            let detail = obs.error.clone().unwrap_or_else(|| "ok".to_string());
            lines.push(format!("{icon} {}: {detail}", obs.tool));
        }

        let mut context = lines.join("\n");
        if context.chars().count() > max_chars {
            context = context.chars().take(max_chars).collect();
        }
        context
    }
}

fn flag_key(tool: &str, suffix: &str) -> String {
    format!("_tool_{tool}_{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentcore_types::ToolStatus;
    use serde_json::json;

    fn observation(tool: &str, status: ToolStatus, result: Option<serde_json::Value>, error: Option<&str>) -> ToolObservation {
        ToolObservation {
            tool: tool.to_string(),
            args: SlotMap::new(),
            status,
            result,
            error: error.map(str::to_string),
            status_code: None,
            execution_time_ms: 100,
            attempt: 1,
            from_cache: false,
            circuit_breaker_tripped: false,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn success_book_appointment_extracts_slots() {
        let reducer = StateReducer::default();
        let obs = observation(
            "book_appointment",
            ToolStatus::Success,
            Some(json!({
                "booking_id": "B123",
                "confirmation_code": "CONF456",
                "appointment_date": "2025-10-10",
                "appointment_time": "15:00"
            })),
            None,
        );
        let patch = reducer.apply_observation(&obs, &SlotMap::new(), "conv1");
        assert_eq!(patch.slots_patch["booking_id"], SlotValue::Text("B123".to_string()));
        assert_eq!(patch.slots_patch["confirmed_date"], SlotValue::Text("2025-10-10".to_string()));
        assert_eq!(patch.slots_patch["_tool_book_appointment_success"], SlotValue::Bool(true));
        assert_eq!(patch.confidence_score, 1.0);
        assert_eq!(patch.last_observations.len(), 1);
    }

    #[test]
    fn success_get_available_services_extracts_names_and_prices() {
        let reducer = StateReducer::default();
        let obs = observation(
            "get_available_services",
            ToolStatus::Success,
            Some(json!({"services": [
                {"name": "Corte de Cabello", "price": 25},
                {"name": "Color", "price": 50}
            ]})),
            None,
        );
        let patch = reducer.apply_observation(&obs, &SlotMap::new(), "conv1");
        assert_eq!(
            patch.slots_patch["_available_services"],
            SlotValue::Json(json!(["Corte de Cabello", "Color"]))
        );
        assert!(patch.cache_invalidation_keys.contains(&"services_cache".to_string()));
    }

    #[test]
    fn failure_propagates_validation_error_for_critical_tool() {
        let reducer = StateReducer::default();
        let obs = observation("book_appointment", ToolStatus::Failure, None, Some("Missing required field: service_type"));
        let patch = reducer.apply_observation(&obs, &SlotMap::new(), "conv1");
        assert_eq!(patch.slots_patch["_tool_book_appointment_success"], SlotValue::Bool(false));
        assert_eq!(
            patch.slots_patch["_validation_errors"],
            SlotValue::Json(json!(["Error ejecutando book_appointment: Missing required field: service_type"]))
        );
        assert!(patch.confidence_score < 1.0);
    }

    #[test]
    fn circuit_open_adds_informative_message() {
        let reducer = StateReducer::default();
        let obs = observation("get_available_services", ToolStatus::CircuitOpen, None, Some("Circuit breaker OPEN"));
        let patch = reducer.apply_observation(&obs, &SlotMap::new(), "conv1");
        assert_eq!(patch.slots_patch["_tool_get_available_services_circuit_open"], SlotValue::Bool(true));
        assert_eq!(
            patch.slots_patch["_validation_errors"],
            SlotValue::Json(json!(["Servicio get_available_services temporalmente no disponible"]))
        );
    }

    #[test]
    fn duplicate_makes_no_slot_changes() {
        let reducer = StateReducer::default();
        let obs = observation("get_available_services", ToolStatus::Duplicate, None, None);
        let patch = reducer.apply_observation(&obs, &SlotMap::new(), "conv1");
        assert!(patch.slots_patch.is_empty());
        assert!(patch.change_reasons.iter().any(|r| r.contains("Duplicate call")));
    }

    #[test]
    fn history_is_bounded_to_max_observations() {
        let reducer = StateReducer::new(3);
        for i in 0..5 {
            let obs = observation(&format!("tool_{i}"), ToolStatus::Success, Some(json!({"data": i})), None);
            reducer.apply_observation(&obs, &SlotMap::new(), "conv1");
        }
        let history = reducer.recent("conv1");
        assert_eq!(history.len(), 3);
        let tools: Vec<&str> = history.iter().map(|o| o.tool.as_str()).collect();
        assert_eq!(tools, vec!["tool_2", "tool_3", "tool_4"]);
    }

    #[test]
    fn slow_call_reduces_confidence() {
        let reducer = StateReducer::default();
        let mut obs = observation("get_available_services", ToolStatus::Success, Some(json!({"services": []})), None);
        obs.execution_time_ms = 15_000;
        let patch = reducer.apply_observation(&obs, &SlotMap::new(), "conv1");
        assert!(patch.confidence_score < 1.0);
    }

    #[test]
    fn multiple_observations_batch_merges_patches() {
        let reducer = StateReducer::default();
        let obs1 = observation(
            "get_available_services",
            ToolStatus::Success,
            Some(json!({"services": [{"name": "Corte", "price": 25}]})),
            None,
        );
        let obs2 = observation(
            "check_service_availability",
            ToolStatus::Success,
            Some(json!({"available_slots": ["10:00", "11:00"]})),
            None,
        );
        let patch = reducer.apply_multiple_observations(&[obs1, obs2], &SlotMap::new(), "conv1");
        assert_eq!(patch.slots_patch["_available_services"], SlotValue::Json(json!(["Corte"])));
        assert_eq!(patch.slots_patch["_available_times"], SlotValue::Json(json!(["10:00", "11:00"])));
        assert_eq!(patch.last_observations.len(), 2);
    }
}
