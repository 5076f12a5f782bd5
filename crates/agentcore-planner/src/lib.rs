pub mod fallback;
pub mod fewshot;
pub mod prompt;
pub mod sanitize;

use std::sync::Arc;

use agentcore_oracle::LlmOracle;
use agentcore_types::{ExtractorOutput, PlanOutput};
use serde_json::Value;

const SCHEMA_STR: &str = include_str!("../../../config/schemas/planner_v1.json");
const ORACLE_TIMEOUT_MS: u64 = 8_000;

/// Turns an `ExtractorOutput` into a validated `PlanOutput` (§4.2), either
/// from the oracle or, on any failure, the deterministic fallback table.
pub struct Planner {
    oracle: Arc<dyn LlmOracle>,
    schema: Value,
}

impl Planner {
    pub fn new(oracle: Arc<dyn LlmOracle>) -> Self {
        let schema: Value = serde_json::from_str(SCHEMA_STR).expect("bundled planner schema is valid JSON");
        Self { oracle, schema }
    }

    pub async fn plan(&self, extractor_out: &ExtractorOutput, allowed_tools: &[String], workspace_id: &str) -> PlanOutput {
        let system_prompt = prompt::PLANNER_SYSTEM;
        let user_prompt = prompt::build_user_prompt(extractor_out, allowed_tools, workspace_id);

        let call = self.oracle.generate_json(system_prompt, &user_prompt, &self.schema, 0.2, 400);

        let raw = match tokio::time::timeout(std::time::Duration::from_millis(ORACLE_TIMEOUT_MS), call).await {
            Ok(Ok(value)) => value,
            Ok(Err(err)) => {
                tracing::warn!(event = "planner_oracle_error", error = %err, "oracle call failed");
                return fallback::fallback_plan(extractor_out, workspace_id);
            }
            Err(_) => {
                tracing::warn!(event = "planner_oracle_timeout", "oracle call timed out");
                return fallback::fallback_plan(extractor_out, workspace_id);
            }
        };

        let validator = match jsonschema::validator_for(&self.schema) {
            Ok(v) => v,
            Err(err) => {
                tracing::error!(event = "planner_schema_compile_error", error = %err, "bundled schema failed to compile");
                return fallback::fallback_plan(extractor_out, workspace_id);
            }
        };

        if let Err(errors) = validator.validate(&raw) {
            tracing::warn!(event = "planner_schema_validation_failed", error = %errors, "oracle plan failed schema validation");
            return fallback::fallback_plan(extractor_out, workspace_id);
        }

        let plan: PlanOutput = match serde_json::from_value(raw) {
            Ok(p) => p,
            Err(err) => {
                tracing::warn!(event = "planner_deserialize_error", error = %err, "oracle plan could not be deserialized");
                return fallback::fallback_plan(extractor_out, workspace_id);
            }
        };

        let sanitized = sanitize::coerce_and_sanitize(plan, allowed_tools, workspace_id);
        tracing::info!(
            event = "plan_built",
            action_count = sanitized.actions.len(),
            needs_confirmation = sanitized.needs_confirmation,
        );
        sanitized
    }
}
