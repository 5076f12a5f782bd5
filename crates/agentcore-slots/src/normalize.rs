use agentcore_types::{SlotMap, SlotType, SlotValue};
use chrono::{Duration, NaiveDate, Utc};
use regex::Regex;

use crate::registry;

/// `N_s(N_s(v)) == N_s(v)` for every slot `s` (§8 normalization idempotence).
/// Every normalizer below is written so a second pass is a no-op: dates and
/// times are only rewritten when they aren't already canonical, names/emails
/// are re-derivable from their own output.
pub fn normalize_date(value: &str, today: NaiveDate) -> String {
    let lower = value.to_lowercase();
    let lower = lower.trim();
    match lower {
        "hoy" | "today" => today.format("%Y-%m-%d").to_string(),
        "mañana" | "tomorrow" => (today + Duration::days(1)).format("%Y-%m-%d").to_string(),
        "pasado mañana" | "day after tomorrow" => (today + Duration::days(2)).format("%Y-%m-%d").to_string(),
        _ => {
            // Already ISO (YYYY-MM-DD): pass through untouched.
            let bytes = value.as_bytes();
            if value.len() == 10 && bytes[4] == b'-' && bytes[7] == b'-' {
                value.to_string()
            } else {
                value.to_string()
            }
        }
    }
}

pub fn is_valid_iso_date(value: &str) -> bool {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

pub fn normalize_time(value: &str) -> String {
    let trimmed = value.trim().to_lowercase();

    if trimmed.contains("am") || trimmed.contains("pm") {
        let is_pm = trimmed.contains("pm");
        let digits = trimmed.replace("am", "").replace("pm", "");
        let digits = digits.trim();

        let parsed = if let Some((h, m)) = digits.split_once(':') {
            match (h.parse::<u32>(), m.parse::<u32>()) {
                (Ok(h), Ok(m)) => Some((h, m)),
                _ => None,
            }
        } else {
            digits.parse::<u32>().ok().map(|h| (h, 0))
        };

        if let Some((mut hour, minute)) = parsed {
            if is_pm && hour != 12 {
                hour += 12;
            } else if !is_pm && hour == 12 {
                hour = 0;
            }
            return format!("{:02}:{:02}", hour, minute);
        }
        // Malformed am/pm string: fall through unchanged, matching the
        // source's bare `except: pass`.
        return value.trim().to_string();
    }

    if trimmed.contains(':') && trimmed.len() <= 5 {
        let parts: Vec<&str> = trimmed.split(':').collect();
        if parts.len() == 2 {
            if let (Ok(h), Ok(m)) = (parts[0].parse::<u32>(), parts[1].parse::<u32>()) {
                return format!("{:02}:{:02}", h, m);
            }
        }
    }

    value.trim().to_string()
}

pub fn is_valid_time(value: &str) -> bool {
    let re = Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]$").expect("valid regex");
    re.is_match(value)
}

pub fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}

pub fn is_valid_email(value: &str) -> bool {
    let re = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid regex");
    re.is_match(value)
}

pub fn is_valid_phone(value: &str) -> bool {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.len() >= 7
}

/// Normalize every slot in `args` that belongs to the canonical vocabulary;
/// unknown keys (tool-local args such as `workspace_id`, `q`, `date_str`)
/// pass through untouched. Returns the normalized map plus any
/// normalizer-reported errors (Policy Engine step 2, §4.3).
pub fn normalize_slots(args: &SlotMap) -> (SlotMap, Vec<String>) {
    let today = Utc::now().date_naive();
    let mut normalized = SlotMap::new();
    let mut errors = Vec::new();

    for (key, value) in args {
        let text = match value {
            SlotValue::Text(s) => s.clone(),
            other => {
                normalized.insert(key.clone(), other.clone());
                continue;
            }
        };

        let Some(def) = registry::lookup(key) else {
            normalized.insert(key.clone(), SlotValue::Text(text));
            continue;
        };

        if text.trim().is_empty() {
            normalized.insert(key.clone(), SlotValue::Null);
            continue;
        }

        match def.slot_type {
            SlotType::Date => {
                let n = normalize_date(&text, today);
                if !is_valid_iso_date(&n) {
                    errors.push(format!("'{}': formato de fecha invalido", key));
                }
                normalized.insert(key.clone(), SlotValue::Text(n));
            }
            SlotType::Time => {
                let n = normalize_time(&text);
                if !is_valid_time(&n) {
                    errors.push(format!("'{}': formato de hora invalido", key));
                }
                normalized.insert(key.clone(), SlotValue::Text(n));
            }
            SlotType::Email => {
                let n = normalize_email(&text);
                if !is_valid_email(&n) {
                    errors.push(format!("'{}': email invalido", key));
                }
                normalized.insert(key.clone(), SlotValue::Text(n));
            }
            SlotType::Phone => {
                if !is_valid_phone(&text) {
                    errors.push(format!("'{}': telefono invalido", key));
                }
                normalized.insert(key.clone(), SlotValue::Text(text));
            }
            SlotType::Number => match text.trim().parse::<f64>() {
                Ok(n) => {
                    normalized.insert(key.clone(), SlotValue::Number(n));
                }
                Err(_) => {
                    errors.push(format!("'{}': numero invalido", key));
                    normalized.insert(key.clone(), SlotValue::Text(text));
                }
            },
            SlotType::String => {
                let n = if key == "client_name" || key == "staff_name" {
                    title_case(text.trim())
                } else {
                    text
                };
                normalized.insert(key.clone(), SlotValue::Text(n));
            }
        }
    }

    (normalized, errors)
}
