use agentcore_types::SlotMap;
use async_trait::async_trait;

/// In-process tool implementation, invoked for `ToolTransport::Internal`
/// specs instead of going over HTTP. Production registers real handlers
/// (vertical service lookups, bookings store); tests register scripted
/// ones.
#[async_trait]
pub trait InternalHandler: Send + Sync {
    async fn call(&self, args: &SlotMap) -> Result<serde_json::Value, String>;
}

/// Deterministic test double returning a fixed result or error.
pub struct ScriptedHandler {
    result: Result<serde_json::Value, String>,
}

impl ScriptedHandler {
    pub fn ok(value: serde_json::Value) -> Self {
        Self { result: Ok(value) }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            result: Err(message.into()),
        }
    }
}

#[async_trait]
impl InternalHandler for ScriptedHandler {
    async fn call(&self, _args: &SlotMap) -> Result<serde_json::Value, String> {
        self.result.clone()
    }
}
