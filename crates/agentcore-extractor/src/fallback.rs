use agentcore_types::{ExtractorOutput, Intent, SlotMap};

/// Heuristic intent classifier used when the oracle errors or its output
/// fails schema validation (§4.1). Keyword lexicon carried over verbatim
/// from `extractor.py::_fallback_extraction`; slots are always empty and
/// confidence is fixed at 0.5 to mark the turn as a degraded extraction.
pub fn fallback_extraction(user_input: &str) -> ExtractorOutput {
    tracing::warn!(event = "extractor_fallback", "using heuristic fallback extraction");

    let lower = user_input.to_lowercase();

    let intent = if contains_any(&lower, &["hola", "buenos", "buenas", "hi", "hello"]) {
        Intent::Greeting
    } else if contains_any(&lower, &["servicios", "services", "qué hacen", "que tienen"]) {
        Intent::InfoServices
    } else if contains_any(&lower, &["precio", "cuanto", "cuesta", "vale"]) {
        Intent::InfoPrices
    } else if contains_any(&lower, &["horario", "abre", "cierra", "hours"]) {
        Intent::InfoHours
    } else if contains_any(&lower, &["quiero", "necesito", "turno", "cita", "reserva"]) {
        Intent::Book
    } else if contains_any(&lower, &["cancelar", "anular", "cancel"]) {
        Intent::Cancel
    } else {
        Intent::Other
    };

    ExtractorOutput {
        intent,
        slots: SlotMap::new(),
        confidence: 0.5,
        reasoning: Some("Fallback heuristic".to_string()),
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_greeting() {
        let out = fallback_extraction("Hola, buenos dias");
        assert_eq!(out.intent, Intent::Greeting);
        assert_eq!(out.confidence, 0.5);
        assert!(out.slots.is_empty());
    }

    #[test]
    fn classifies_booking_keywords() {
        assert_eq!(fallback_extraction("quiero un turno").intent, Intent::Book);
        // "cancelar mi turno" has no booking keyword before "cancelar" is reached.
        assert_eq!(fallback_extraction("quiero cancelar mi turno anterior").intent, Intent::Book);
        assert_eq!(fallback_extraction("anular por favor").intent, Intent::Cancel);
    }

    #[test]
    fn unknown_text_is_other() {
        assert_eq!(fallback_extraction("asdkjasjd").intent, Intent::Other);
    }
}
