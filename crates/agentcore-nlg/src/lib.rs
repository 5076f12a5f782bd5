//! Deterministic, template-driven reply composer (§4.6). Never calls the
//! oracle; renders short Spanish-language replies from the already-computed
//! intent, extractor slots, plan, and state patch. Grounded on
//! `original_source/services/response/simple_nlg.py::build_user_message`.

use agentcore_types::{ConversationStatePatch, ExtractorOutput, Intent, PlanOutput, SlotValue, ToolObservation};
use serde_json::Value;

const HARD_CAP_CHARS: usize = 300;

/// Compose the user-facing reply for one turn. `observations` is kept for
/// parity with the grounding source's signature; none of the per-intent
/// rules currently branch on it directly, since success/failure already
/// surfaces through what the patch does or does not contain.
pub fn build_reply(extract: &ExtractorOutput, plan: &PlanOutput, patch: &ConversationStatePatch, _observations: &[ToolObservation]) -> String {
    let reply = match extract.intent {
        Intent::InfoHours => info_hours_reply(patch),
        Intent::InfoServices | Intent::InfoPrices => info_services_reply(extract, patch),
        Intent::Book => book_reply(extract, plan, patch),
        Intent::Cancel => cancel_reply(patch),
        Intent::Reschedule => reschedule_reply(extract, plan, patch),
        Intent::Greeting => "¡Hola! Te ayudo con turnos, precios y horarios. ¿Qué necesitás?".to_string(),
        Intent::Chitchat => "Te ayudo con reservas de turnos. ¿Querés agendar?".to_string(),
        Intent::Other => fallback_line(),
    };

    cap(reply)
}

fn fallback_line() -> String {
    "Te ayudo con turnos, precios y horarios. ¿Qué necesitás?".to_string()
}

fn cap(reply: String) -> String {
    if reply.chars().count() <= HARD_CAP_CHARS {
        return reply;
    }
    let mut truncated: String = reply.chars().take(HARD_CAP_CHARS - 1).collect();
    truncated.push('…');
    truncated
}

fn info_hours_reply(patch: &ConversationStatePatch) -> String {
    match patch_json(patch, "_business_hours").and_then(fmt_hours) {
        Some(text) => text,
        None => "Consulté los horarios pero no pude leerlos. ¿Probamos de nuevo?".to_string(),
    }
}

fn fmt_hours(hours: &Value) -> Option<String> {
    let obj = hours.as_object()?;

    if let (Some(open), Some(close)) = (obj.get("open").and_then(Value::as_str), obj.get("close").and_then(Value::as_str)) {
        let label = obj.get("days").and_then(Value::as_str).unwrap_or("Todos los días");
        return Some(format!("Horarios:\n• {label}: {open}-{close}"));
    }

    let mut days: Vec<(&String, &Value)> = obj.iter().collect();
    days.sort_by(|a, b| a.0.cmp(b.0));
    if days.is_empty() {
        return None;
    }

    let mut lines = vec!["Horarios:".to_string()];
    for (day, range) in days.iter().take(4) {
        lines.push(format!("• {day}: {}", fmt_range(range)));
    }
    if days.len() > 4 {
        lines.push("…".to_string());
    }
    Some(lines.join("\n"))
}

fn fmt_range(v: &Value) -> String {
    if let Some(s) = v.as_str() {
        return s.to_string();
    }
    if let Some(obj) = v.as_object() {
        let open = obj.get("open").and_then(Value::as_str).unwrap_or("");
        let close = obj.get("close").and_then(Value::as_str).unwrap_or("");
        return format!("{open}-{close}");
    }
    v.to_string()
}

fn info_services_reply(extract: &ExtractorOutput, patch: &ConversationStatePatch) -> String {
    let filter_q = extract.slots.get("service_type").and_then(SlotValue::as_str);
    let entries = services_entries(patch, filter_q);
    if entries.is_empty() {
        return "Consulté los servicios pero no encontré resultados. ¿Te ayudo con algo más?".to_string();
    }
    fmt_prices(&entries, filter_q)
}

fn services_entries(patch: &ConversationStatePatch, filter_q: Option<&str>) -> Vec<(String, Value)> {
    let names = patch_json(patch, "_available_services").and_then(Value::as_array);
    let prices = patch_json(patch, "_service_prices").and_then(Value::as_object);

    let Some(names) = names else {
        return Vec::new();
    };

    names
        .iter()
        .filter_map(Value::as_str)
        .filter(|name| match filter_q {
            Some(q) if !q.trim().is_empty() => name.to_lowercase().contains(&q.to_lowercase()),
            _ => true,
        })
        .map(|name| {
            let price = prices.and_then(|p| p.get(name)).cloned().unwrap_or(Value::Null);
            (name.to_string(), price)
        })
        .collect()
}

fn fmt_prices(entries: &[(String, Value)], filter_q: Option<&str>) -> String {
    let header = match filter_q {
        Some(q) if !q.trim().is_empty() => format!("Precios de {q}:"),
        _ => "Servicios disponibles:".to_string(),
    };

    let mut lines = vec![header];
    for (name, price) in entries.iter().take(3) {
        lines.push(format!("• {name}: {}", fmt_price(price)));
    }
    if entries.len() > 3 {
        lines.push("…".to_string());
    }
    lines.join("\n")
}

fn fmt_price(v: &Value) -> String {
    if let Some(obj) = v.as_object() {
        let min = obj.get("min").and_then(Value::as_f64);
        let max = obj.get("max").and_then(Value::as_f64);
        if let (Some(min), Some(max)) = (min, max) {
            return if min == max { format!("${}", fmt_num(min)) } else { format!("${}-${}", fmt_num(min), fmt_num(max)) };
        }
    }
    if let Some(arr) = v.as_array() {
        if arr.len() == 2 {
            if let (Some(min), Some(max)) = (arr[0].as_f64(), arr[1].as_f64()) {
                return if min == max { format!("${}", fmt_num(min)) } else { format!("${}-${}", fmt_num(min), fmt_num(max)) };
            }
        }
    }
    if let Some(n) = v.as_f64() {
        return format!("${}", fmt_num(n));
    }
    if let Some(s) = v.as_str() {
        return format!("${s}");
    }
    "$?".to_string()
}

fn fmt_num(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn book_reply(extract: &ExtractorOutput, plan: &PlanOutput, patch: &ConversationStatePatch) -> String {
    if plan.needs_confirmation {
        if plan.missing_slots.iter().any(|s| s == "preferred_time") {
            return "Tengo la fecha. ¿A qué hora te viene bien? (ej: 15:00)".to_string();
        }
        if plan.missing_slots.iter().any(|s| s == "preferred_date") {
            return "¿Para qué día querés el turno? (ej: mañana, 16/10)".to_string();
        }
        if plan.missing_slots.iter().any(|s| s == "client_name" || s == "client_email") {
            return "Para confirmar necesito tu nombre y email.".to_string();
        }
        return "¿Me confirmás los datos para la reserva?".to_string();
    }

    if patch_str(patch, "booking_id").is_some() {
        let svc_name = extract.slots.get("service_type").and_then(SlotValue::as_str).unwrap_or("turno");
        let date = patch_str(patch, "confirmed_date").unwrap_or("");
        let time = patch_str(patch, "confirmed_time").unwrap_or("");
        return format!("¡Listo! {svc_name} reservado para {date} a las {time}.");
    }

    let has_date = extract.slots.get("preferred_date").map(SlotValue::is_present).unwrap_or(false);
    let has_time = extract.slots.get("preferred_time").map(SlotValue::is_present).unwrap_or(false);
    if has_date && has_time {
        return "Hay disponibilidad. ¿Confirmás nombre y email para reservar?".to_string();
    }

    "Verifiqué disponibilidad. ¿Querés que te reserve?".to_string()
}

fn cancel_reply(patch: &ConversationStatePatch) -> String {
    if patch_bool(patch, "_cancelled") {
        "Turno cancelado. ¿Querés reagendar?".to_string()
    } else {
        "Para cancelar necesito el ID de tu turno o tu teléfono.".to_string()
    }
}

/// `reschedule` has no explicit template in the grounding source (it falls
/// through to the generic branch there). SPEC_FULL gives it the same shape
/// as `cancel` plus an availability check, so the reply chain mirrors
/// `book_reply`'s clarification ladder with reschedule-specific wording.
fn reschedule_reply(extract: &ExtractorOutput, plan: &PlanOutput, patch: &ConversationStatePatch) -> String {
    if plan.needs_confirmation {
        if plan.missing_slots.iter().any(|s| s == "booking_id") {
            return "Para reprogramar necesito el ID de tu turno o tu teléfono.".to_string();
        }
        if plan.missing_slots.iter().any(|s| s == "preferred_date") {
            return "¿Para qué nuevo día querés el turno?".to_string();
        }
        if plan.missing_slots.iter().any(|s| s == "preferred_time") {
            return "¿A qué hora te viene bien el nuevo turno?".to_string();
        }
        return "¿Me confirmás el cambio de turno?".to_string();
    }

    let has_date = extract.slots.get("preferred_date").map(SlotValue::is_present).unwrap_or(false);
    let has_time = extract.slots.get("preferred_time").map(SlotValue::is_present).unwrap_or(false);
    if has_date && has_time {
        "Hay disponibilidad para el nuevo horario. ¿Confirmás el cambio?".to_string()
    } else {
        "Verifiqué disponibilidad para tu turno. ¿Confirmás el cambio?".to_string()
    }
}

fn patch_json<'a>(patch: &'a ConversationStatePatch, key: &str) -> Option<&'a Value> {
    match patch.slots_patch.get(key)? {
        SlotValue::Json(v) => Some(v),
        _ => None,
    }
}

fn patch_str<'a>(patch: &'a ConversationStatePatch, key: &str) -> Option<&'a str> {
    patch.slots_patch.get(key).and_then(SlotValue::as_str)
}

fn patch_bool(patch: &ConversationStatePatch, key: &str) -> bool {
    matches!(patch.slots_patch.get(key), Some(SlotValue::Bool(true)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentcore_types::{PlanAction, SlotMap};
    use serde_json::json;

    fn extractor(intent: Intent, slots: SlotMap) -> ExtractorOutput {
        ExtractorOutput { intent, slots, confidence: 0.9, reasoning: None }
    }

    fn patch_with(pairs: &[(&str, SlotValue)]) -> ConversationStatePatch {
        let mut patch = ConversationStatePatch::empty();
        for (k, v) in pairs {
            patch.slots_patch.insert(k.to_string(), v.clone());
        }
        patch
    }

    #[test]
    fn info_hours_renders_day_ranges() {
        let extract = extractor(Intent::InfoHours, SlotMap::new());
        let plan = PlanOutput::empty(false);
        let patch = patch_with(&[("_business_hours", SlotValue::Json(json!({"lunes": "09:00-18:00", "martes": "09:00-18:00"})))]);
        let reply = build_reply(&extract, &plan, &patch, &[]);
        assert!(reply.starts_with("Horarios:"));
        assert!(reply.contains("lunes: 09:00-18:00"));
    }

    #[test]
    fn info_hours_missing_data_apologizes() {
        let extract = extractor(Intent::InfoHours, SlotMap::new());
        let plan = PlanOutput::empty(false);
        let patch = ConversationStatePatch::empty();
        let reply = build_reply(&extract, &plan, &patch, &[]);
        assert_eq!(reply, "Consulté los horarios pero no pude leerlos. ¿Probamos de nuevo?");
    }

    #[test]
    fn info_services_filters_by_requested_service() {
        let mut slots = SlotMap::new();
        slots.insert("service_type".to_string(), SlotValue::Text("corte".to_string()));
        let extract = extractor(Intent::InfoPrices, slots);
        let plan = PlanOutput::empty(false);
        let patch = patch_with(&[
            ("_available_services", SlotValue::Json(json!(["Corte de Cabello", "Color"]))),
            ("_service_prices", SlotValue::Json(json!({"Corte de Cabello": 25, "Color": 50}))),
        ]);
        let reply = build_reply(&extract, &plan, &patch, &[]);
        assert!(reply.starts_with("Precios de corte:"));
        assert!(reply.contains("Corte de Cabello: $25"));
        assert!(!reply.contains("Color"));
    }

    #[test]
    fn book_needs_confirmation_asks_for_time_first() {
        let extract = extractor(Intent::Book, SlotMap::new());
        let mut plan = PlanOutput::empty(true);
        plan.missing_slots = vec!["preferred_time".to_string()];
        let patch = ConversationStatePatch::empty();
        let reply = build_reply(&extract, &plan, &patch, &[]);
        assert_eq!(reply, "Tengo la fecha. ¿A qué hora te viene bien? (ej: 15:00)");
    }

    #[test]
    fn book_success_announces_confirmation() {
        let mut slots = SlotMap::new();
        slots.insert("service_type".to_string(), SlotValue::Text("Corte".to_string()));
        let extract = extractor(Intent::Book, slots);
        let mut plan = PlanOutput::empty(false);
        plan.actions = vec![PlanAction::new("book_appointment")];
        let patch = patch_with(&[
            ("booking_id", SlotValue::Text("B1".to_string())),
            ("confirmed_date", SlotValue::Text("2025-10-10".to_string())),
            ("confirmed_time", SlotValue::Text("15:00".to_string())),
        ]);
        let reply = build_reply(&extract, &plan, &patch, &[]);
        assert_eq!(reply, "¡Listo! Corte reservado para 2025-10-10 a las 15:00.");
    }

    #[test]
    fn book_availability_only_prompts_for_contact_details() {
        let mut slots = SlotMap::new();
        slots.insert("preferred_date".to_string(), SlotValue::Text("mañana".to_string()));
        slots.insert("preferred_time".to_string(), SlotValue::Text("15:00".to_string()));
        let extract = extractor(Intent::Book, slots);
        let plan = PlanOutput::empty(false);
        let patch = ConversationStatePatch::empty();
        let reply = build_reply(&extract, &plan, &patch, &[]);
        assert_eq!(reply, "Hay disponibilidad. ¿Confirmás nombre y email para reservar?");
    }

    #[test]
    fn cancel_success_offers_reschedule() {
        let extract = extractor(Intent::Cancel, SlotMap::new());
        let plan = PlanOutput::empty(false);
        let patch = patch_with(&[("_cancelled", SlotValue::Bool(true))]);
        let reply = build_reply(&extract, &plan, &patch, &[]);
        assert_eq!(reply, "Turno cancelado. ¿Querés reagendar?");
    }

    #[test]
    fn cancel_without_id_asks_for_it() {
        let extract = extractor(Intent::Cancel, SlotMap::new());
        let plan = PlanOutput::empty(true);
        let patch = ConversationStatePatch::empty();
        let reply = build_reply(&extract, &plan, &patch, &[]);
        assert_eq!(reply, "Para cancelar necesito el ID de tu turno o tu teléfono.");
    }

    #[test]
    fn greeting_and_chitchat_and_fallback_lines() {
        let plan = PlanOutput::empty(false);
        let patch = ConversationStatePatch::empty();
        assert!(build_reply(&extractor(Intent::Greeting, SlotMap::new()), &plan, &patch, &[]).starts_with("¡Hola!"));
        assert!(build_reply(&extractor(Intent::Chitchat, SlotMap::new()), &plan, &patch, &[]).contains("reservas"));
        assert!(build_reply(&extractor(Intent::Other, SlotMap::new()), &plan, &patch, &[]).contains("turnos"));
    }

    #[test]
    fn reply_never_exceeds_hard_cap() {
        let extract = extractor(Intent::InfoHours, SlotMap::new());
        let plan = PlanOutput::empty(false);
        let mut days = serde_json::Map::new();
        for i in 0..10 {
            days.insert(format!("day_{i:02}"), json!("09:00-18:00"));
        }
        let patch = patch_with(&[("_business_hours", SlotValue::Json(Value::Object(days)))]);
        let reply = build_reply(&extract, &plan, &patch, &[]);
        assert!(reply.chars().count() <= HARD_CAP_CHARS);
    }
}
