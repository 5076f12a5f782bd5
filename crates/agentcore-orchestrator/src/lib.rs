//! Facade composing the per-turn pipeline described in §2/§5/§6: extractor
//! → planner → per-action [policy → broker] in plan order → reducer → NLG.
//! Grounded on `services/orchestrator_service.py::OrchestratorService` and
//! `tests/test_orchestrator_loop.py`'s `decide_with_agent_loop` flow — this
//! collapses the source's legacy/SLM dual path to the single SLM pipeline
//! per SPEC_FULL's explicit redesign flag.

use std::sync::Arc;
use std::time::{Duration, Instant};

use agentcore_broker::ToolBroker;
use agentcore_extractor::{ExtractContext, Extractor};
use agentcore_manifest::ToolManifestLoader;
use agentcore_planner::Planner;
use agentcore_policy::{PolicyEngine, TurnContext};
use agentcore_reducer::StateReducer;
use agentcore_types::{
    ConversationSnapshot, ConversationStatePatch, DecideResponse, Intent, NextAction, PlanAction, PlanOutput,
    PolicyDecision, SlotMap, SlotValue, ToolObservation, ToolStatus, Workspace,
};
use chrono::Utc;

/// Wall-clock budget for the whole turn's tool-execution phase, shared
/// across every action in the plan. Individual transports still enforce
/// their own `timeout_ms`; this bounds the turn as a whole (§5
/// "Cancellation & timeouts").
const TURN_TIMEOUT_MS: u64 = 15_000;

pub struct Orchestrator {
    extractor: Extractor,
    planner: Planner,
    policy: PolicyEngine,
    broker: ToolBroker,
    reducer: StateReducer,
    manifests: ToolManifestLoader,
}

impl Orchestrator {
    pub fn new(extractor: Extractor, planner: Planner, policy: PolicyEngine, broker: ToolBroker, reducer: StateReducer, manifests: ToolManifestLoader) -> Self {
        Self { extractor, planner, policy, broker, reducer, manifests }
    }

    /// The single exposed entry point (§6). Never raises to its caller on a
    /// tool/oracle failure; degraded paths always resolve to a
    /// human-safe `assistant` string.
    pub async fn decide(&self, snapshot: &ConversationSnapshot, workspace: &Workspace) -> DecideResponse {
        let context = extract_context(snapshot);
        let extract_out = self.extractor.extract(&snapshot.user_input, context).await;

        let manifest = match self.manifests.load(workspace.id.as_str(), workspace.vertical.manifest_key()) {
            Ok(manifest) => manifest,
            Err(err) => {
                tracing::error!(event = "manifest_load_failed", workspace_id = %workspace.id, error = %err, "falling back to empty manifest");
                Arc::new(agentcore_types::ToolManifest::empty(workspace.vertical.manifest_key()))
            }
        };

        let allowed_tools: Vec<String> = manifest.filter_by_tier(workspace.tier).iter().map(|t| t.name.clone()).collect();

        let plan = self.planner.plan(&extract_out, &allowed_tools, workspace.id.as_str()).await;
        tracing::info!(
            event = "plan_generated",
            conversation_id = %snapshot.conversation_id,
            workspace_id = %workspace.id,
            action_count = plan.actions.len(),
        );

        let merged_slots = merge_slots(&snapshot.slots, &extract_out.slots);

        let execution = self.run_plan(&plan, &merged_slots, workspace, &manifest, snapshot).await;

        let patch = self
            .reducer
            .apply_multiple_observations(&execution.observations, &merged_slots, snapshot.conversation_id.as_str());

        let final_slots = patch.apply(&merged_slots);
        let final_plan = merge_clarifications(&plan, &execution);

        let assistant = if let Some(why) = execution.denial_reason() {
            why
        } else {
            agentcore_nlg::build_reply(&extract_out, &final_plan, &patch, &execution.observations)
        };

        tracing::info!(
            event = "response_emitted",
            conversation_id = %snapshot.conversation_id,
            workspace_id = %workspace.id,
        );

        DecideResponse {
            assistant,
            next_action: next_action(&extract_out, snapshot, &final_plan, &execution),
            tool_calls: execution.executed_actions,
            slots: final_slots,
            end: turn_ended(&patch),
        }
    }

    async fn run_plan(&self, plan: &PlanOutput, slots: &SlotMap, workspace: &Workspace, manifest: &agentcore_types::ToolManifest, snapshot: &ConversationSnapshot) -> PlanExecution {
        let mut execution = PlanExecution::default();

        if plan.actions.len() > workspace.policy.max_tool_calls {
            tracing::warn!(event = "policy_decision", decision = "deny", reason = "max_tool_calls_exceeded");
            return execution;
        }

        let turn_started = Instant::now();
        let mut called_tools: Vec<String> = snapshot.called_tools.clone();

        for action in &plan.actions {
            let turn = TurnContext { slots, called_tools: &called_tools };
            let result = self.policy.validate(action, &turn, workspace, manifest);
            tracing::info!(
                event = "policy_decision",
                tool = %action.tool,
                decision = ?result.decision,
            );

            match result.decision {
                PolicyDecision::Deny => {
                    execution.policy_denials.push(result);
                    continue;
                }
                PolicyDecision::AskClarification => {
                    execution.policy_asks.push(result);
                    continue;
                }
                PolicyDecision::Allow => {}
            }

            let Some(tool_spec) = manifest.get_tool(&action.tool) else {
                continue;
            };

            let remaining_ms = TURN_TIMEOUT_MS.saturating_sub(turn_started.elapsed().as_millis() as u64);
            if remaining_ms == 0 {
                execution.observations.push(timeout_observation(&action.tool, &result.normalized_args));
                continue;
            }

            let request_id = agentcore_types::RequestId::generate();
            let call = self.broker.execute(
                &action.tool,
                &result.normalized_args,
                workspace.id.as_str(),
                snapshot.conversation_id.as_str(),
                request_id.as_str(),
                tool_spec,
            );

            let observation = match tokio::time::timeout(Duration::from_millis(remaining_ms), call).await {
                Ok(observation) => observation,
                Err(_) => timeout_observation(&action.tool, &result.normalized_args),
            };

            called_tools.push(action.tool.clone());
            execution
                .executed_actions
                .push(PlanAction { tool: action.tool.clone(), args: agentcore_types::redact_pii(&result.normalized_args) });
            execution.observations.push(observation);
        }

        execution
    }
}

#[derive(Default)]
struct PlanExecution {
    executed_actions: Vec<PlanAction>,
    observations: Vec<ToolObservation>,
    policy_denials: Vec<agentcore_types::PolicyResult>,
    policy_asks: Vec<agentcore_types::PolicyResult>,
}

impl PlanExecution {
    /// First denial's tenant-safe explanation, per §7 "gentle refusals with
    /// the policy `why`" — denials preempt the usual intent-based template.
    fn denial_reason(&self) -> Option<String> {
        self.policy_denials.first().map(|r| r.why.clone())
    }
}

fn merge_clarifications(plan: &PlanOutput, execution: &PlanExecution) -> PlanOutput {
    if execution.policy_asks.is_empty() {
        return plan.clone();
    }
    let mut merged = plan.clone();
    merged.needs_confirmation = true;
    for ask in &execution.policy_asks {
        for slot in &ask.missing_slots {
            if !merged.missing_slots.contains(slot) {
                merged.missing_slots.push(slot.clone());
            }
        }
    }
    merged
}

fn merge_slots(base: &SlotMap, overlay: &SlotMap) -> SlotMap {
    let mut merged = base.clone();
    for (key, value) in overlay {
        if value.is_present() {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

fn extract_context(snapshot: &ConversationSnapshot) -> Option<ExtractContext> {
    let available_services = match snapshot.slots.get("_available_services") {
        Some(SlotValue::Json(serde_json::Value::Array(items))) => {
            Some(items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        }
        _ => None,
    };
    available_services.map(|available_services| ExtractContext { available_services: Some(available_services) })
}

fn timeout_observation(tool: &str, args: &SlotMap) -> ToolObservation {
    ToolObservation {
        tool: tool.to_string(),
        args: args.clone(),
        status: ToolStatus::Timeout,
        result: None,
        error: Some("turn_timeout".to_string()),
        status_code: None,
        execution_time_ms: TURN_TIMEOUT_MS,
        attempt: 1,
        from_cache: false,
        circuit_breaker_tripped: false,
        timestamp: Utc::now(),
    }
}

fn next_action(extract_out: &agentcore_types::ExtractorOutput, snapshot: &ConversationSnapshot, plan: &PlanOutput, execution: &PlanExecution) -> NextAction {
    if !execution.policy_denials.is_empty() {
        return NextAction::AskHuman;
    }
    if plan.needs_confirmation {
        return NextAction::SlotFill;
    }
    if extract_out.intent == Intent::Greeting && !snapshot.greeted {
        return NextAction::Greet;
    }
    if matches!(extract_out.intent, Intent::InfoServices | Intent::InfoPrices | Intent::InfoHours) {
        return NextAction::RetrieveContext;
    }
    if matches!(extract_out.intent, Intent::Book | Intent::Cancel | Intent::Reschedule) && !execution.executed_actions.is_empty() {
        return NextAction::ExecuteAction;
    }
    NextAction::Answer
}

fn turn_ended(patch: &ConversationStatePatch) -> bool {
    let booked = matches!(patch.slots_patch.get("booking_id"), Some(SlotValue::Text(id)) if !id.is_empty());
    let cancelled = matches!(patch.slots_patch.get("_cancelled"), Some(SlotValue::Bool(true)));
    booked || cancelled
}
