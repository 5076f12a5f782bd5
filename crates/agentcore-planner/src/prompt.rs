use agentcore_types::ExtractorOutput;
use serde_json::json;

use crate::fewshot::fewshot_examples;

pub const PLANNER_SYSTEM: &str = "Eres un planificador de acciones para un agente de reservas de servicios.

TU SALIDA DEBE SER SOLO JSON VALIDO que cumpla el schema pulpo.planner.v1.

REGLAS CRITICAS:
1. NO generes texto para el usuario
2. NO expliques nada en prosa
3. SOLO decide que tools ejecutar
4. Maximo 3 tools por plan
5. Usa nombres EXACTOS de tools
6. Si faltan datos obligatorios -> needs_confirmation=true

Responde SOLO con el JSON del plan.";

/// Builds the structured planner payload: context (workspace id, allowed
/// tools, fixed rules), few-shot examples, and the current extractor
/// output — grounded on `planner.py::_build_user_prompt`.
pub fn build_user_prompt(extractor_out: &ExtractorOutput, allowed_tools: &[String], workspace_id: &str) -> String {
    let payload = json!({
        "context": {
            "workspace_id": workspace_id,
            "allowed_tools": allowed_tools,
            "rules": [
                "Maximo 3 acciones por plan",
                "Usa get_available_services para consultas de servicios/precios",
                "Usa get_business_hours para consultas de horarios",
                "ANTES de book_appointment SIEMPRE usa check_service_availability",
                "Si faltan slots obligatorios para book_appointment, marca needs_confirmation=true",
                "Solo usa tools que estan en allowed_tools"
            ]
        },
        "fewshot_examples": fewshot_examples(workspace_id),
        "current_input": extractor_out,
    });

    serde_json::to_string_pretty(&payload).unwrap_or_default()
}
