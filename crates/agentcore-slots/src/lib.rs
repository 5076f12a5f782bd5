pub mod normalize;
pub mod registry;

pub use normalize::{
    is_valid_email, is_valid_iso_date, is_valid_phone, is_valid_time, normalize_date, normalize_email,
    normalize_slots, normalize_time, title_case,
};
pub use registry::lookup as lookup_slot;

#[cfg(test)]
mod tests {
    use super::*;
    use agentcore_types::{SlotMap, SlotValue};
    use chrono::NaiveDate;

    #[test]
    fn normalize_date_relative_terms() {
        let today = NaiveDate::from_ymd_opt(2025, 10, 15).unwrap();
        assert_eq!(normalize_date("hoy", today), "2025-10-15");
        assert_eq!(normalize_date("mañana", today), "2025-10-16");
        assert_eq!(normalize_date("pasado mañana", today), "2025-10-17");
        assert_eq!(normalize_date("2025-12-01", today), "2025-12-01");
    }

    #[test]
    fn normalize_date_is_idempotent() {
        let today = NaiveDate::from_ymd_opt(2025, 10, 15).unwrap();
        let once = normalize_date("mañana", today);
        let twice = normalize_date(&once, today);
        assert_eq!(once, twice);
    }

    #[test]
    fn normalize_time_handles_am_pm_and_24h() {
        assert_eq!(normalize_time("3pm"), "15:00");
        assert_eq!(normalize_time("10am"), "10:00");
        assert_eq!(normalize_time("12am"), "00:00");
        assert_eq!(normalize_time("12pm"), "12:00");
        assert_eq!(normalize_time("15:00"), "15:00");
        assert_eq!(normalize_time("9:5"), "09:05");
    }

    #[test]
    fn normalize_time_is_idempotent() {
        let once = normalize_time("3pm");
        let twice = normalize_time(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn normalize_slots_rejects_malformed_email_and_keeps_valid_fields() {
        let mut args = SlotMap::new();
        args.insert(
            "client_email".to_string(),
            SlotValue::Text("Not-An-Email".to_string()),
        );
        args.insert("service_type".to_string(), SlotValue::Text("corte".to_string()));
        let (normalized, errors) = normalize_slots(&args);
        assert!(!errors.is_empty());
        assert_eq!(normalized["service_type"], SlotValue::Text("corte".to_string()));
    }

    #[test]
    fn normalize_slots_title_cases_names_and_lowercases_email() {
        let mut args = SlotMap::new();
        args.insert("client_name".to_string(), SlotValue::Text("juan pEREZ".to_string()));
        args.insert(
            "client_email".to_string(),
            SlotValue::Text("Juan@Example.COM".to_string()),
        );
        let (normalized, errors) = normalize_slots(&args);
        assert!(errors.is_empty());
        assert_eq!(normalized["client_name"], SlotValue::Text("Juan Perez".to_string()));
        assert_eq!(
            normalized["client_email"],
            SlotValue::Text("juan@example.com".to_string())
        );
    }

    #[test]
    fn unknown_slot_keys_pass_through_untouched() {
        let mut args = SlotMap::new();
        args.insert("workspace_id".to_string(), SlotValue::Text("ws_1".to_string()));
        let (normalized, errors) = normalize_slots(&args);
        assert!(errors.is_empty());
        assert_eq!(normalized["workspace_id"], SlotValue::Text("ws_1".to_string()));
    }
}
