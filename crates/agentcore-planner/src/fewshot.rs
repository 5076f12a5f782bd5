use serde_json::{json, Value};

/// Few-shot examples keyed by intent, grounded on
/// `planner.py::PLANNER_FEWSHOT`. `__WS__` is substituted for the real
/// `workspace_id` before the payload is sent to the oracle, matching the
/// source's string-templating step.
pub fn fewshot_examples(workspace_id: &str) -> Vec<Value> {
    let raw = vec![
        json!({
            "input": {"intent": "info_services", "slots": {}, "confidence": 0.9},
            "plan": {
                "plan_version": "v1",
                "actions": [{"tool": "get_available_services", "args": {"workspace_id": "__WS__"}}],
                "needs_confirmation": false
            }
        }),
        json!({
            "input": {"intent": "info_prices", "slots": {"service_type": "Corte de Cabello"}, "confidence": 0.92},
            "plan": {
                "plan_version": "v1",
                "actions": [{"tool": "get_available_services", "args": {"workspace_id": "__WS__", "q": "Corte de Cabello"}}],
                "needs_confirmation": false
            }
        }),
        json!({
            "input": {"intent": "info_hours", "slots": {}, "confidence": 0.93},
            "plan": {
                "plan_version": "v1",
                "actions": [{"tool": "get_business_hours", "args": {"workspace_id": "__WS__"}}],
                "needs_confirmation": false
            }
        }),
        json!({
            "input": {
                "intent": "book",
                "slots": {"service_type": "Corte de Cabello", "preferred_date": "2025-10-16", "preferred_time": null},
                "confidence": 0.88
            },
            "plan": {
                "plan_version": "v1",
                "actions": [{"tool": "check_service_availability", "args": {
                    "workspace_id": "__WS__", "service_type": "Corte de Cabello", "date_str": "2025-10-16"
                }}],
                "needs_confirmation": true,
                "missing_slots": ["preferred_time"]
            }
        }),
        json!({
            "input": {
                "intent": "book",
                "slots": {
                    "service_type": "Corte de Cabello", "preferred_date": "2025-10-16", "preferred_time": "15:00",
                    "client_name": "Juan Perez", "client_email": "juan@example.com"
                },
                "confidence": 0.95
            },
            "plan": {
                "plan_version": "v1",
                "actions": [
                    {"tool": "check_service_availability", "args": {
                        "workspace_id": "__WS__", "service_type": "Corte de Cabello", "date_str": "2025-10-16"
                    }},
                    {"tool": "book_appointment", "args": {
                        "workspace_id": "__WS__", "service_type": "Corte de Cabello",
                        "preferred_date": "2025-10-16", "preferred_time": "15:00",
                        "client_name": "Juan Perez", "client_email": "juan@example.com"
                    }}
                ],
                "needs_confirmation": false
            }
        }),
        json!({
            "input": {"intent": "cancel", "slots": {"booking_id": "BOOK-123"}, "confidence": 0.90},
            "plan": {
                "plan_version": "v1",
                "actions": [{"tool": "cancel_appointment", "args": {"workspace_id": "__WS__", "booking_id": "BOOK-123"}}],
                "needs_confirmation": false
            }
        }),
    ];

    raw.into_iter().map(|v| substitute_workspace(v, workspace_id)).collect()
}

fn substitute_workspace(value: Value, workspace_id: &str) -> Value {
    match value {
        Value::String(s) if s == "__WS__" => Value::String(workspace_id.to_string()),
        Value::Array(items) => Value::Array(items.into_iter().map(|v| substitute_workspace(v, workspace_id)).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, substitute_workspace(v, workspace_id)))
                .collect(),
        ),
        other => other,
    }
}
