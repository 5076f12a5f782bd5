pub mod rate_limit;

use agentcore_slots::normalize_slots;
use agentcore_types::{PlanAction, PolicyResult, SlotMap, ToolManifest, ToolScope, ToolSpec, Workspace, WorkspaceStatus};
use rate_limit::RateLimiter;

/// Turn-local facts the engine needs beyond the manifest and workspace: the
/// slots accumulated so far this conversation, and the tools already
/// executed earlier in the same plan (for the `tools_first` ordering gate).
pub struct TurnContext<'a> {
    pub slots: &'a SlotMap,
    pub called_tools: &'a [String],
}

/// Validates planned tool calls against tenant tier, scope, rate limit and
/// ordering policy (§4.3). Grounded on `policy_engine.py::PolicyEngine`.
#[derive(Default)]
pub struct PolicyEngine {
    rate_limiter: RateLimiter,
}

impl PolicyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self, action: &PlanAction, turn: &TurnContext, workspace: &Workspace, manifest: &ToolManifest) -> PolicyResult {
        let redacted = agentcore_types::redact_pii(&action.args);
        tracing::info!(
            event = "policy_validate",
            tool = %action.tool,
            workspace_id = %workspace.id,
            tier = workspace.tier.as_str(),
            args = ?redacted,
        );

        // 1. tool exists
        let Some(tool_spec) = manifest.get_tool(&action.tool) else {
            return PolicyResult::deny(
                format!("Tool '{}' no existe en manifest", action.tool),
                format!("El tool '{}' no está disponible en el catálogo", action.tool),
                manifest.version.clone(),
            );
        };

        // 2. normalize args
        let (normalized_args, norm_errors) = normalize_slots(&action.args);
        if !norm_errors.is_empty() {
            let mut result = PolicyResult::deny(
                format!("Errores de normalización: {}", norm_errors.join("; ")),
                format!("Los argumentos tienen formato incorrecto: {}", norm_errors.join(", ")),
                manifest.version.clone(),
            );
            result.validation_errors = norm_errors;
            return result;
        }

        // 3. tier gate
        if let Some(result) = self.check_tier(tool_spec, workspace, &manifest.version) {
            return result;
        }

        // 4. forbid patterns
        if let Some(result) = self.check_forbid_patterns(&action.tool, workspace, &manifest.version) {
            return result;
        }

        // 5. scope gate
        if let Some(result) = self.check_scopes(tool_spec, workspace, &manifest.version) {
            return result;
        }

        // 6. required slots
        if let Some(result) = self.check_required_slots(tool_spec, turn.slots, &manifest.version) {
            return result;
        }

        // 7. args against JSON schema
        if let Some(result) = self.check_args_schema(&normalized_args, tool_spec, &manifest.version) {
            return result;
        }

        // 8. rate limit
        if let Some(result) = self.check_rate_limit(tool_spec, &workspace.id.to_string(), &manifest.version) {
            return result;
        }

        // 9. tools_first ordering
        if let Some(result) = self.check_tools_first(&action.tool, workspace, turn.called_tools, &manifest.version) {
            return result;
        }

        let mut result = PolicyResult::allow(
            format!("Tool '{}' permitido para tier {}", action.tool, workspace.tier.as_str()),
            manifest.version.clone(),
        );
        result.why = "Todas las validaciones pasaron".to_string();
        result.normalized_args = normalized_args;
        result
    }

    /// Plan-level entry point: denies the whole plan in one shared reason
    /// when it exceeds `max_tool_calls`, otherwise validates each action
    /// independently. `called_tools` accumulates across actions already
    /// accepted earlier in the same plan, in caller-supplied order.
    pub fn validate_plan(&self, actions: &[PlanAction], slots: &SlotMap, workspace: &Workspace, manifest: &ToolManifest) -> Vec<PolicyResult> {
        let max_calls = workspace.policy.max_tool_calls;
        if actions.len() > max_calls {
            let reason = format!("Excede max_tool_calls: {} > {}", actions.len(), max_calls);
            let why = format!("Solo puedo ejecutar {max_calls} acciones por vez");
            return actions
                .iter()
                .map(|_| PolicyResult::deny(reason.clone(), why.clone(), manifest.version.clone()))
                .collect();
        }

        let mut called_tools = Vec::new();
        actions
            .iter()
            .map(|action| {
                let turn = TurnContext {
                    slots,
                    called_tools: &called_tools,
                };
                let result = self.validate(action, &turn, workspace, manifest);
                if result.is_allowed() {
                    called_tools.push(action.tool.clone());
                }
                result
            })
            .collect()
    }

    fn check_tier(&self, tool_spec: &ToolSpec, workspace: &Workspace, manifest_version: &str) -> Option<PolicyResult> {
        if workspace.tier >= tool_spec.tier_required {
            return None;
        }
        let mut result = PolicyResult::deny(
            format!(
                "Tool '{}' requiere tier {}, workspace tiene {}",
                tool_spec.name,
                tool_spec.tier_required.as_str(),
                workspace.tier.as_str()
            ),
            format!(
                "Tu plan actual ({}) no incluye esta funcionalidad. Necesitas tier {}",
                workspace.tier.as_str(),
                tool_spec.tier_required.as_str()
            ),
            manifest_version,
        );
        result.needs = vec![format!("upgrade_tier_{}", tool_spec.tier_required.as_str())];
        Some(result)
    }

    fn check_forbid_patterns(&self, tool_name: &str, workspace: &Workspace, manifest_version: &str) -> Option<PolicyResult> {
        for pattern in &workspace.policy.forbid_patterns {
            let Ok(re) = regex::Regex::new(&format!("^(?:{pattern})")) else {
                continue;
            };
            if re.is_match(tool_name) {
                return Some(PolicyResult::deny(
                    format!("Tool '{tool_name}' prohibido por pattern '{pattern}'"),
                    "Esta acción está prohibida por políticas de seguridad",
                    manifest_version,
                ));
            }
        }
        None
    }

    fn check_scopes(&self, tool_spec: &ToolSpec, workspace: &Workspace, manifest_version: &str) -> Option<PolicyResult> {
        let requires_active = tool_spec.scopes.iter().any(|s| matches!(s, ToolScope::Write | ToolScope::Admin));
        if requires_active && !matches!(workspace.status, WorkspaceStatus::Active) {
            let mut result = PolicyResult::deny(
                format!("Tool '{}' requiere workspace activo", tool_spec.name),
                "Tu cuenta no está activa. Contactá soporte",
                manifest_version,
            );
            result.needs = vec!["activate_workspace".to_string()];
            return Some(result);
        }
        None
    }

    fn check_required_slots(&self, tool_spec: &ToolSpec, slots: &SlotMap, manifest_version: &str) -> Option<PolicyResult> {
        let missing: Vec<String> = tool_spec
            .requires_slots
            .iter()
            .filter(|name| !slots.get(*name).is_some_and(|v| v.is_present()))
            .cloned()
            .collect();

        if missing.is_empty() {
            return None;
        }

        let slot_names_es = missing.iter().map(|s| format!("'{s}'")).collect::<Vec<_>>().join(", ");
        Some(PolicyResult::ask_clarification(
            format!("Faltan slots requeridos: {}", missing.join(", ")),
            format!("Necesito que me proporciones: {slot_names_es}"),
            missing,
            manifest_version,
        ))
    }

    fn check_args_schema(&self, args: &SlotMap, tool_spec: &ToolSpec, manifest_version: &str) -> Option<PolicyResult> {
        let Ok(validator) = jsonschema::validator_for(&tool_spec.args_schema) else {
            tracing::error!(event = "policy_schema_compile_error", tool = %tool_spec.name, "args_schema failed to compile");
            return None;
        };
        let instance = serde_json::to_value(args).unwrap_or(serde_json::Value::Null);
        if let Err(error) = validator.validate(&instance) {
            let message = error.to_string();
            let mut result = PolicyResult::deny(
                format!("Args inválidos: {message}"),
                format!("El argumento proporcionado tiene formato incorrecto: {message}"),
                manifest_version,
            );
            result.validation_errors = vec![message];
            return Some(result);
        }
        None
    }

    fn check_rate_limit(&self, tool_spec: &ToolSpec, workspace_id: &str, manifest_version: &str) -> Option<PolicyResult> {
        let Some(limit) = tool_spec.rate_limit_per_min else {
            return None;
        };
        let (recent, allowed) = self.rate_limiter.check_and_record(workspace_id, &tool_spec.name, limit);
        if !allowed {
            let mut result = PolicyResult::deny(
                format!("Rate limit excedido: {recent}/{limit} calls/min"),
                "Demasiadas consultas en poco tiempo. Esperá un momento e intentá de nuevo",
                manifest_version,
            );
            result.needs = vec!["wait".to_string()];
            return Some(result);
        }
        None
    }

    fn check_tools_first(&self, tool_name: &str, workspace: &Workspace, called_tools: &[String], manifest_version: &str) -> Option<PolicyResult> {
        let tools_first = &workspace.policy.tools_first;
        if tools_first.is_empty() || tools_first.iter().any(|t| t == tool_name) {
            return None;
        }

        let missing: Vec<String> = tools_first.iter().filter(|t| !called_tools.contains(t)).cloned().collect();
        if missing.is_empty() {
            return None;
        }

        let tools_names = missing.iter().map(|t| format!("'{t}'")).collect::<Vec<_>>().join(", ");
        let mut result = PolicyResult::deny(
            format!("Debe llamar {missing:?} antes de '{tool_name}'"),
            format!("Primero necesito consultar {tools_names} antes de proceder"),
            manifest_version,
        );
        result.needs = missing;
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentcore_types::{HttpMethod, SlotValue, TierLevel, ToolAuth, ToolTransport, Vertical, WorkspaceId, WorkspacePolicy};
    use serde_json::json;

    fn tool(name: &str, scopes: Vec<ToolScope>, tier: TierLevel, requires_slots: Vec<&str>) -> ToolSpec {
        ToolSpec {
            name: name.to_string(),
            description: "desc".to_string(),
            args_schema: json!({"type": "object"}),
            requires_slots: requires_slots.into_iter().map(String::from).collect(),
            scopes,
            tier_required: tier,
            rate_limit_per_min: None,
            cost_tokens: 0,
            timeout_ms: 5_000,
            transport: ToolTransport::Http {
                url: "http://example.test".to_string(),
                method: HttpMethod::Get,
                auth: ToolAuth::None,
                cache_ttl_seconds: None,
                retry_safe: true,
            },
        }
    }

    fn workspace(policy: WorkspacePolicy, status: WorkspaceStatus, tier: TierLevel) -> Workspace {
        Workspace {
            id: WorkspaceId::from("ws_1"),
            vertical: Vertical::Services,
            tier,
            status,
            policy,
            timezone: None,
        }
    }

    fn manifest(tools: Vec<ToolSpec>) -> ToolManifest {
        ToolManifest {
            workspace_id: None,
            vertical: "services".to_string(),
            version: "v1".to_string(),
            tools,
        }
    }

    #[test]
    fn unknown_tool_is_denied() {
        let engine = PolicyEngine::new();
        let action = PlanAction::new("does_not_exist");
        let turn = TurnContext {
            slots: &SlotMap::new(),
            called_tools: &[],
        };
        let ws = workspace(WorkspacePolicy::default(), WorkspaceStatus::Active, TierLevel::Basic);
        let result = engine.validate(&action, &turn, &ws, &manifest(vec![]));
        assert!(!result.is_allowed());
    }

    #[test]
    fn write_tool_denied_on_inactive_workspace() {
        let engine = PolicyEngine::new();
        let spec = tool("book_appointment", vec![ToolScope::Write], TierLevel::Basic, vec![]);
        let action = PlanAction::new("book_appointment");
        let turn = TurnContext {
            slots: &SlotMap::new(),
            called_tools: &[],
        };
        let ws = workspace(WorkspacePolicy::default(), WorkspaceStatus::Suspended, TierLevel::Basic);
        let result = engine.validate(&action, &turn, &ws, &manifest(vec![spec]));
        assert!(!result.is_allowed());
        assert_eq!(result.needs, vec!["activate_workspace".to_string()]);
    }

    #[test]
    fn missing_required_slot_asks_for_clarification() {
        let engine = PolicyEngine::new();
        let spec = tool("book_appointment", vec![ToolScope::Write], TierLevel::Basic, vec!["client_email"]);
        let action = PlanAction::new("book_appointment");
        let turn = TurnContext {
            slots: &SlotMap::new(),
            called_tools: &[],
        };
        let ws = workspace(WorkspacePolicy::default(), WorkspaceStatus::Active, TierLevel::Basic);
        let result = engine.validate(&action, &turn, &ws, &manifest(vec![spec]));
        assert_eq!(result.decision, agentcore_types::PolicyDecision::AskClarification);
        assert_eq!(result.missing_slots, vec!["client_email".to_string()]);
    }

    #[test]
    fn tier_gate_denies_below_required_tier() {
        let engine = PolicyEngine::new();
        let spec = tool("premium_tool", vec![ToolScope::Read], TierLevel::Pro, vec![]);
        let action = PlanAction::new("premium_tool");
        let turn = TurnContext {
            slots: &SlotMap::new(),
            called_tools: &[],
        };
        let ws = workspace(WorkspacePolicy::default(), WorkspaceStatus::Active, TierLevel::Basic);
        let result = engine.validate(&action, &turn, &ws, &manifest(vec![spec]));
        assert!(!result.is_allowed());
    }

    #[test]
    fn forbid_pattern_denies_matching_tool() {
        let engine = PolicyEngine::new();
        let spec = tool("dangerous_tool", vec![ToolScope::Read], TierLevel::Basic, vec![]);
        let action = PlanAction::new("dangerous_tool");
        let turn = TurnContext {
            slots: &SlotMap::new(),
            called_tools: &[],
        };
        let mut policy = WorkspacePolicy::default();
        policy.forbid_patterns = vec!["dangerous_.*".to_string()];
        let ws = workspace(policy, WorkspaceStatus::Active, TierLevel::Basic);
        let result = engine.validate(&action, &turn, &ws, &manifest(vec![spec]));
        assert!(!result.is_allowed());
    }

    #[test]
    fn tools_first_blocks_write_until_read_called() {
        let engine = PolicyEngine::new();
        let read = tool("get_available_services", vec![ToolScope::Read], TierLevel::Basic, vec![]);
        let write = tool("book_appointment", vec![ToolScope::Write], TierLevel::Basic, vec![]);
        let mut policy = WorkspacePolicy::default();
        policy.tools_first = vec!["get_available_services".to_string()];
        let ws = workspace(policy, WorkspaceStatus::Active, TierLevel::Basic);
        let m = manifest(vec![read, write]);

        let action = PlanAction::new("book_appointment");
        let turn = TurnContext {
            slots: &SlotMap::new(),
            called_tools: &[],
        };
        let result = engine.validate(&action, &turn, &ws, &m);
        assert!(!result.is_allowed());

        let called = vec!["get_available_services".to_string()];
        let turn2 = TurnContext {
            slots: &SlotMap::new(),
            called_tools: &called,
        };
        let result2 = engine.validate(&action, &turn2, &ws, &m);
        assert!(result2.is_allowed());
    }

    #[test]
    fn validate_plan_denies_whole_plan_over_max_tool_calls() {
        let engine = PolicyEngine::new();
        let spec = tool("get_business_hours", vec![ToolScope::Read], TierLevel::Basic, vec![]);
        let mut policy = WorkspacePolicy::default();
        policy.max_tool_calls = 1;
        let ws = workspace(policy, WorkspaceStatus::Active, TierLevel::Basic);
        let actions = vec![PlanAction::new("get_business_hours"), PlanAction::new("get_business_hours")];
        let results = engine.validate_plan(&actions, &SlotMap::new(), &ws, &manifest(vec![spec]));
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| !r.is_allowed()));
    }

    #[test]
    fn args_normalization_error_denies() {
        let engine = PolicyEngine::new();
        let spec = tool("get_business_hours", vec![ToolScope::Read], TierLevel::Basic, vec![]);
        let action = PlanAction::new("get_business_hours").with_arg("client_email", SlotValue::Text("not-an-email".to_string()));
        let turn = TurnContext {
            slots: &SlotMap::new(),
            called_tools: &[],
        };
        let ws = workspace(WorkspacePolicy::default(), WorkspaceStatus::Active, TierLevel::Basic);
        let result = engine.validate(&action, &turn, &ws, &manifest(vec![spec]));
        assert!(!result.is_allowed());
    }
}
