use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Failures consumed strictly internally by the Extractor/Planner, which
/// degrade every one of them to a heuristic/deterministic fallback (§7
/// bullet 5) rather than propagate. No oracle-specific type leaks past
/// those two components (§9 "Oracle as pluggable capability").
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle call timed out")]
    Timeout,
    #[error("oracle transport error: {0}")]
    Transport(String),
    #[error("oracle returned invalid JSON: {0}")]
    InvalidJson(String),
}

/// `generate_json(system_prompt, user_prompt, schema, temperature, max_tokens) -> JSON`
/// (§6). Stateless; called once per Extractor invocation and once per
/// Planner invocation. Production wires this to whatever LLM backend the
/// platform runs; tests substitute a scripted oracle.
#[async_trait]
pub trait LlmOracle: Send + Sync {
    async fn generate_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        schema: &Value,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Value, OracleError>;
}

/// Deterministic test double: returns scripted responses in FIFO order,
/// ignoring the prompt/schema arguments. Grounded on the `AlwaysFail`/
/// `AlwaysOk` mock providers used to test provider failover elsewhere in
/// this codebase.
pub struct ScriptedOracle {
    responses: Mutex<Vec<Result<Value, OracleError>>>,
}

impl ScriptedOracle {
    pub fn new(mut responses: Vec<Result<Value, OracleError>>) -> Self {
        responses.reverse();
        Self {
            responses: Mutex::new(responses),
        }
    }

    pub fn ok(value: Value) -> Self {
        Self::new(vec![Ok(value)])
    }

    pub fn erroring() -> Self {
        Self::new(vec![Err(OracleError::Transport("scripted failure".to_string()))])
    }
}

#[async_trait]
impl LlmOracle for ScriptedOracle {
    async fn generate_json(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
        _schema: &Value,
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<Value, OracleError> {
        let mut responses = self.responses.lock().expect("scripted oracle mutex poisoned");
        responses.pop().unwrap_or(Err(OracleError::Transport(
            "scripted oracle exhausted".to_string(),
        )))
    }
}
