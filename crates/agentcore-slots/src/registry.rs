use agentcore_types::{SlotDefinition, SlotType};

/// Declarative entry in the closed canonical slot vocabulary (§3), grounded
/// on the static-registry pattern used for LLM provider catalogs elsewhere
/// in this codebase: a flat table plus a `lookup` helper rather than a
/// runtime-built map.
struct KnownSlot {
    name: &'static str,
    description: &'static str,
    slot_type: SlotType,
    required: bool,
    is_pii: bool,
}

const CANONICAL_SLOTS: &[KnownSlot] = &[
    KnownSlot {
        name: "service_type",
        description: "Tipo de servicio solicitado (ej. Corte de Cabello, Coloracion)",
        slot_type: SlotType::String,
        required: false,
        is_pii: false,
    },
    KnownSlot {
        name: "preferred_date",
        description: "Fecha preferida, formato YYYY-MM-DD",
        slot_type: SlotType::Date,
        required: false,
        is_pii: false,
    },
    KnownSlot {
        name: "preferred_time",
        description: "Hora preferida, formato HH:MM 24h",
        slot_type: SlotType::Time,
        required: false,
        is_pii: false,
    },
    KnownSlot {
        name: "staff_name",
        description: "Nombre del profesional solicitado",
        slot_type: SlotType::String,
        required: false,
        is_pii: false,
    },
    KnownSlot {
        name: "client_name",
        description: "Nombre del cliente",
        slot_type: SlotType::String,
        required: false,
        is_pii: true,
    },
    KnownSlot {
        name: "client_email",
        description: "Email del cliente",
        slot_type: SlotType::Email,
        required: false,
        is_pii: true,
    },
    KnownSlot {
        name: "client_phone",
        description: "Telefono del cliente",
        slot_type: SlotType::Phone,
        required: false,
        is_pii: true,
    },
    KnownSlot {
        name: "booking_id",
        description: "Identificador de una reserva existente",
        slot_type: SlotType::String,
        required: false,
        is_pii: false,
    },
];

/// Look up a slot's canonical definition by name. Unknown names (tool-local
/// args like `workspace_id`, `q`, `date_str`) are not part of the
/// vocabulary and normalize/redact as opaque strings.
pub fn lookup(name: &str) -> Option<SlotDefinition> {
    CANONICAL_SLOTS.iter().find(|s| s.name == name).map(|s| SlotDefinition {
        name: s.name.to_string(),
        description: s.description.to_string(),
        slot_type: s.slot_type,
        required: s.required,
        is_pii: s.is_pii,
    })
}

pub fn all() -> Vec<SlotDefinition> {
    CANONICAL_SLOTS
        .iter()
        .map(|s| SlotDefinition {
            name: s.name.to_string(),
            description: s.description.to_string(),
            slot_type: s.slot_type,
            required: s.required,
            is_pii: s.is_pii,
        })
        .collect()
}
