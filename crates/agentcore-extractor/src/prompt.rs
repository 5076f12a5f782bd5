use chrono::NaiveDate;

/// Builds the extraction system prompt: intent enumeration, canonical slot
/// list, relative-date/12h-time normalization rules, few-shot examples, and
/// tenant hints — grounded on `extractor.py::_build_extraction_prompt`.
pub fn build_extraction_prompt(user_input: &str, available_services: Option<&[String]>, today: NaiveDate) -> String {
    let tomorrow = today.succ_opt().unwrap_or(today);

    let tenant_context = match available_services {
        Some(services) if !services.is_empty() => format!("\nServicios disponibles: {}", services.join(", ")),
        _ => String::new(),
    };

    format!(
        r#"Eres un extractor de informacion especializado en servicios y reservas de turnos.

TAREA: Extrae el intent y los slots del mensaje del usuario.

INTENTS VALIDOS:
- greeting: saludos iniciales
- info_services: pregunta por servicios disponibles
- info_prices: pregunta por precios
- info_hours: pregunta por horarios de atencion
- book: quiere reservar un turno
- cancel: quiere cancelar un turno
- reschedule: quiere cambiar un turno
- chitchat: conversacion general
- other: otro tipo de mensaje

SLOTS A EXTRAER:
- service_type, preferred_date (YYYY-MM-DD), preferred_time (HH:MM 24h),
  staff_name, client_name, client_email, client_phone, booking_id

NORMALIZACION DE FECHAS:
- "hoy" -> "{today}"
- "mañana" -> "{tomorrow}"
- "10am" -> "10:00"
- "3pm" -> "15:00"
{tenant_context}

REGLAS:
1. Solo extrae informacion EXPLICITA del mensaje
2. NO inventes informacion que no esta
3. Normaliza fechas y horas al formato correcto
4. Confidence alto (>0.9) si es obvio, medio (0.7-0.9) si razonable, bajo (<0.7) si ambiguo
5. Devuelve SOLO JSON valido, sin texto adicional

MENSAJE DEL USUARIO: "{user_input}"

Extrae el intent y slots:"#,
        today = today.format("%Y-%m-%d"),
        tomorrow = tomorrow.format("%Y-%m-%d"),
        tenant_context = tenant_context,
        user_input = user_input,
    )
}
