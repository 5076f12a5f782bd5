use agentcore_types::{ExtractorOutput, Intent, PlanAction, PlanOutput, SlotValue};

/// Deterministic fallback table (§4.2), used when the oracle fails schema
/// validation or errors out. Grounded verbatim on `planner.py::_fallback_plan`.
pub fn fallback_plan(extractor_out: &ExtractorOutput, workspace_id: &str) -> PlanOutput {
    tracing::warn!(event = "planner_fallback", "using deterministic fallback plan");

    let slot = |name: &str| -> Option<String> {
        extractor_out.slots.get(name).and_then(|v| match v {
            SlotValue::Text(s) if !s.trim().is_empty() => Some(s.clone()),
            _ => None,
        })
    };

    let service_type = slot("service_type");
    let preferred_date = slot("preferred_date");
    let preferred_time = slot("preferred_time");
    let client_name = slot("client_name");
    let client_email = slot("client_email");
    let booking_id = slot("booking_id");

    let mut actions = Vec::new();
    let mut needs_confirmation = false;
    let mut missing_slots = Vec::new();

    match extractor_out.intent {
        Intent::InfoServices => {
            actions.push(PlanAction::new("get_available_services").with_arg("workspace_id", workspace_id));
        }
        Intent::InfoPrices => {
            let mut action = PlanAction::new("get_available_services").with_arg("workspace_id", workspace_id);
            if let Some(ref st) = service_type {
                action = action.with_arg("q", st.as_str());
            }
            actions.push(action);
        }
        Intent::InfoHours => {
            actions.push(PlanAction::new("get_business_hours").with_arg("workspace_id", workspace_id));
        }
        Intent::Book => {
            if let (Some(st), Some(date)) = (service_type.as_ref(), preferred_date.as_ref()) {
                actions.push(
                    PlanAction::new("check_service_availability")
                        .with_arg("workspace_id", workspace_id)
                        .with_arg("service_type", st.as_str())
                        .with_arg("date_str", date.as_str()),
                );

                if let (Some(time), Some(name), Some(email)) =
                    (preferred_time.as_ref(), client_name.as_ref(), client_email.as_ref())
                {
                    actions.push(
                        PlanAction::new("book_appointment")
                            .with_arg("workspace_id", workspace_id)
                            .with_arg("service_type", st.as_str())
                            .with_arg("preferred_date", date.as_str())
                            .with_arg("preferred_time", time.as_str())
                            .with_arg("client_name", name.as_str())
                            .with_arg("client_email", email.as_str()),
                    );
                } else {
                    needs_confirmation = true;
                    if preferred_time.is_none() {
                        missing_slots.push("preferred_time".to_string());
                    }
                    if client_name.is_none() {
                        missing_slots.push("client_name".to_string());
                    }
                    if client_email.is_none() {
                        missing_slots.push("client_email".to_string());
                    }
                }
            } else {
                needs_confirmation = true;
                if service_type.is_none() {
                    missing_slots.push("service_type".to_string());
                }
                if preferred_date.is_none() {
                    missing_slots.push("preferred_date".to_string());
                }
            }
        }
        Intent::Cancel => {
            if let Some(id) = booking_id {
                actions.push(
                    PlanAction::new("cancel_appointment")
                        .with_arg("workspace_id", workspace_id)
                        .with_arg("booking_id", id.as_str()),
                );
            } else {
                needs_confirmation = true;
                missing_slots.push("booking_id".to_string());
            }
        }
        Intent::Reschedule => {
            // Symmetric to cancel, plus re-availability check (§4.2).
            if let Some(id) = booking_id {
                let mut a = vec![PlanAction::new("cancel_appointment")
                    .with_arg("workspace_id", workspace_id)
                    .with_arg("booking_id", id.as_str())];
                if let (Some(st), Some(date)) = (service_type.as_ref(), preferred_date.as_ref()) {
                    a.push(
                        PlanAction::new("check_service_availability")
                            .with_arg("workspace_id", workspace_id)
                            .with_arg("service_type", st.as_str())
                            .with_arg("date_str", date.as_str()),
                    );
                } else {
                    needs_confirmation = true;
                    missing_slots.push("preferred_date".to_string());
                }
                actions = a;
            } else {
                needs_confirmation = true;
                missing_slots.push("booking_id".to_string());
            }
        }
        Intent::Greeting | Intent::Chitchat | Intent::Other => {
            needs_confirmation = true;
        }
    }

    actions.truncate(3);

    PlanOutput {
        plan_version: "v1".to_string(),
        actions,
        needs_confirmation,
        missing_slots,
        confidence: Some(0.5),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentcore_types::SlotMap;

    fn extractor(intent: Intent, slots: &[(&str, &str)]) -> ExtractorOutput {
        let mut map = SlotMap::new();
        for (k, v) in slots {
            map.insert(k.to_string(), SlotValue::Text(v.to_string()));
        }
        ExtractorOutput {
            intent,
            slots: map,
            confidence: 0.9,
            reasoning: None,
        }
    }

    #[test]
    fn book_with_all_slots_checks_then_books() {
        let ext = extractor(
            Intent::Book,
            &[
                ("service_type", "Corte"),
                ("preferred_date", "2025-10-16"),
                ("preferred_time", "15:00"),
                ("client_name", "Juan Perez"),
                ("client_email", "juan@example.com"),
            ],
        );
        let plan = fallback_plan(&ext, "ws_1");
        assert_eq!(plan.actions.len(), 2);
        assert_eq!(plan.actions[0].tool, "check_service_availability");
        assert_eq!(plan.actions[1].tool, "book_appointment");
        assert!(!plan.needs_confirmation);
    }

    #[test]
    fn book_missing_time_asks_for_it() {
        let ext = extractor(Intent::Book, &[("service_type", "Corte"), ("preferred_date", "2025-10-16")]);
        let plan = fallback_plan(&ext, "ws_1");
        assert_eq!(plan.actions.len(), 1);
        assert_eq!(plan.actions[0].tool, "check_service_availability");
        assert!(plan.needs_confirmation);
        assert!(plan.missing_slots.contains(&"preferred_time".to_string()));
    }

    #[test]
    fn cancel_without_booking_id_asks_for_it() {
        let ext = extractor(Intent::Cancel, &[]);
        let plan = fallback_plan(&ext, "ws_1");
        assert!(plan.actions.is_empty());
        assert!(plan.needs_confirmation);
        assert_eq!(plan.missing_slots, vec!["booking_id".to_string()]);
    }

    #[test]
    fn greeting_yields_empty_plan() {
        let ext = extractor(Intent::Greeting, &[]);
        let plan = fallback_plan(&ext, "ws_1");
        assert!(plan.actions.is_empty());
        assert!(plan.needs_confirmation);
    }
}
