use agentcore_types::{PlanAction, PlanOutput, SlotValue};

const MAX_ACTIONS: usize = 3;
const MAX_REASONING_CHARS: usize = 150;

/// Coerces a raw oracle plan into one safe to hand to the broker: drops
/// actions outside `allowed_tools`, dedups identical invocations, caps
/// length, injects `workspace_id`, truncates reasoning, and enforces the
/// read-before-write ordering constraint (§4.2). Grounded on
/// `planner.py::_coerce_and_sanitize`.
pub fn coerce_and_sanitize(mut plan: PlanOutput, allowed_tools: &[String], workspace_id: &str) -> PlanOutput {
    if plan.plan_version.trim().is_empty() {
        plan.plan_version = "v1".to_string();
    }

    plan.actions.retain(|action| allowed_tools.iter().any(|t| t == &action.tool));

    dedup_actions(&mut plan.actions);

    for action in &mut plan.actions {
        action
            .args
            .entry("workspace_id".to_string())
            .or_insert_with(|| SlotValue::Text(workspace_id.to_string()));
    }

    enforce_ordering(&mut plan.actions, allowed_tools);

    plan.actions.truncate(MAX_ACTIONS);

    plan
}

fn dedup_actions(actions: &mut Vec<PlanAction>) {
    let mut seen = Vec::new();
    actions.retain(|action| {
        let key = (action.tool.clone(), action.args.clone());
        if seen.contains(&key) {
            false
        } else {
            seen.push(key);
            true
        }
    });
}

/// book_appointment must be preceded by check_service_availability, and
/// cancel_appointment by find_appointment_by_phone, whenever the read tool
/// is itself allowed for this workspace. If the oracle omitted the read
/// step, it is inserted immediately before the write step rather than
/// dropping the write outright.
fn enforce_ordering(actions: &mut Vec<PlanAction>, allowed_tools: &[String]) {
    const PAIRS: &[(&str, &str)] = &[
        ("book_appointment", "check_service_availability"),
        ("cancel_appointment", "find_appointment_by_phone"),
    ];

    for (write_tool, read_tool) in PAIRS {
        if !allowed_tools.iter().any(|t| t == read_tool) {
            continue;
        }
        let Some(write_idx) = actions.iter().position(|a| a.tool == *write_tool) else {
            continue;
        };
        let already_precedes = actions[..write_idx].iter().any(|a| a.tool == *read_tool);
        if already_precedes {
            continue;
        }
        if let Some(read_idx) = actions.iter().position(|a| a.tool == *read_tool) {
            // present but after the write step: move it in front.
            let read_action = actions.remove(read_idx);
            let write_idx = actions.iter().position(|a| a.tool == *write_tool).unwrap_or(0);
            actions.insert(write_idx, read_action);
        } else {
            let write_args = actions[write_idx].args.clone();
            let mut inserted = PlanAction::new(*read_tool);
            for key in ["workspace_id", "service_type", "date_str", "phone"] {
                if let Some(value) = write_args.get(key) {
                    inserted = inserted.with_arg(key, value.clone());
                }
            }
            actions.insert(write_idx, inserted);
        }
    }
}

pub fn truncate_reasoning(reasoning: Option<String>) -> Option<String> {
    reasoning.map(|text| {
        if text.chars().count() > MAX_REASONING_CHARS {
            text.chars().take(MAX_REASONING_CHARS).collect()
        } else {
            text
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentcore_types::SlotMap;

    fn tools(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn drops_actions_outside_allowed_tools() {
        let plan = PlanOutput {
            plan_version: "v1".to_string(),
            actions: vec![PlanAction::new("delete_everything"), PlanAction::new("get_business_hours")],
            needs_confirmation: false,
            missing_slots: vec![],
            confidence: Some(0.9),
        };
        let out = coerce_and_sanitize(plan, &tools(&["get_business_hours"]), "ws_1");
        assert_eq!(out.actions.len(), 1);
        assert_eq!(out.actions[0].tool, "get_business_hours");
    }

    #[test]
    fn dedups_identical_actions() {
        let action = PlanAction::new("get_business_hours").with_arg("workspace_id", "ws_1");
        let plan = PlanOutput {
            plan_version: "v1".to_string(),
            actions: vec![action.clone(), action],
            needs_confirmation: false,
            missing_slots: vec![],
            confidence: Some(0.9),
        };
        let out = coerce_and_sanitize(plan, &tools(&["get_business_hours"]), "ws_1");
        assert_eq!(out.actions.len(), 1);
    }

    #[test]
    fn injects_workspace_id() {
        let plan = PlanOutput {
            plan_version: "v1".to_string(),
            actions: vec![PlanAction::new("get_business_hours")],
            needs_confirmation: false,
            missing_slots: vec![],
            confidence: Some(0.9),
        };
        let out = coerce_and_sanitize(plan, &tools(&["get_business_hours"]), "ws_42");
        assert_eq!(out.actions[0].args.get("workspace_id"), Some(&SlotValue::Text("ws_42".to_string())));
    }

    #[test]
    fn inserts_missing_read_before_write() {
        let mut args = SlotMap::new();
        args.insert("workspace_id".to_string(), SlotValue::Text("ws_1".to_string()));
        args.insert("service_type".to_string(), SlotValue::Text("Corte".to_string()));
        let plan = PlanOutput {
            plan_version: "v1".to_string(),
            actions: vec![PlanAction { tool: "book_appointment".to_string(), args }],
            needs_confirmation: false,
            missing_slots: vec![],
            confidence: Some(0.9),
        };
        let out = coerce_and_sanitize(
            plan,
            &tools(&["book_appointment", "check_service_availability"]),
            "ws_1",
        );
        assert_eq!(out.actions.len(), 2);
        assert_eq!(out.actions[0].tool, "check_service_availability");
        assert_eq!(out.actions[1].tool, "book_appointment");
    }

    #[test]
    fn truncates_over_length_reasoning() {
        let long = "a".repeat(200);
        let truncated = truncate_reasoning(Some(long)).unwrap();
        assert_eq!(truncated.chars().count(), MAX_REASONING_CHARS);
    }

    #[test]
    fn caps_action_count_at_three() {
        let plan = PlanOutput {
            plan_version: "v1".to_string(),
            actions: vec![
                PlanAction::new("get_business_hours"),
                PlanAction::new("get_available_services"),
                PlanAction::new("get_active_promotions"),
                PlanAction::new("get_service_packages"),
            ],
            needs_confirmation: false,
            missing_slots: vec![],
            confidence: Some(0.9),
        };
        let out = coerce_and_sanitize(
            plan,
            &tools(&[
                "get_business_hours",
                "get_available_services",
                "get_active_promotions",
                "get_service_packages",
            ]),
            "ws_1",
        );
        assert_eq!(out.actions.len(), MAX_ACTIONS);
    }
}
