use serde::{Deserialize, Serialize};

use crate::workspace::TierLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolScope {
    Read,
    Write,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolAuth {
    None,
    Bearer { token: String },
    ApiKey { header: String, value: String },
}

impl Default for ToolAuth {
    fn default() -> Self {
        ToolAuth::None
    }
}

/// Transport binding for a `ToolSpec` (§4.4). `Internal` invokes a
/// registered in-process handler by name instead of going over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolTransport {
    Http {
        url: String,
        method: HttpMethod,
        #[serde(default)]
        auth: ToolAuth,
        #[serde(default)]
        cache_ttl_seconds: Option<u64>,
        #[serde(default = "default_retry_safe")]
        retry_safe: bool,
    },
    Internal {
        handler: String,
    },
}

fn default_retry_safe() -> bool {
    true
}

/// Declarative description of one tool (§3), loaded from a vertical
/// manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub args_schema: serde_json::Value,
    #[serde(default)]
    pub requires_slots: Vec<String>,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<ToolScope>,
    #[serde(default)]
    pub tier_required: TierLevel,
    #[serde(default)]
    pub rate_limit_per_min: Option<u32>,
    #[serde(default)]
    pub cost_tokens: u32,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    pub transport: ToolTransport,
}

fn default_scopes() -> Vec<ToolScope> {
    vec![ToolScope::Read]
}

fn default_timeout_ms() -> u64 {
    5_000
}

impl ToolSpec {
    pub fn retry_safe(&self) -> bool {
        match &self.transport {
            ToolTransport::Http { retry_safe, .. } => *retry_safe,
            ToolTransport::Internal { .. } => false,
        }
    }

    pub fn cache_ttl_seconds(&self) -> u64 {
        match &self.transport {
            ToolTransport::Http {
                cache_ttl_seconds, ..
            } => cache_ttl_seconds.unwrap_or(60),
            ToolTransport::Internal { .. } => 60,
        }
    }

    /// Function-calling format for the Planner oracle.
    pub fn to_llm_format(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "parameters": self.args_schema,
        })
    }
}

/// Ordered set of `ToolSpec` for a (vertical, optionally workspace-override)
/// tuple (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolManifest {
    #[serde(default)]
    pub workspace_id: Option<String>,
    pub vertical: String,
    #[serde(default = "default_version")]
    pub version: String,
    pub tools: Vec<ToolSpec>,
}

fn default_version() -> String {
    "v1".to_string()
}

impl ToolManifest {
    pub fn empty(vertical: &str) -> Self {
        Self {
            workspace_id: None,
            vertical: vertical.to_string(),
            version: default_version(),
            tools: Vec::new(),
        }
    }

    pub fn get_tool(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.iter().find(|t| t.name == name)
    }

    fn tier_order(tier: TierLevel) -> u8 {
        match tier {
            TierLevel::Basic => 0,
            TierLevel::Pro => 1,
            TierLevel::Max => 2,
        }
    }

    pub fn filter_by_tier(&self, tier: TierLevel) -> Vec<&ToolSpec> {
        let level = Self::tier_order(tier);
        self.tools
            .iter()
            .filter(|t| Self::tier_order(t.tier_required) <= level)
            .collect()
    }

    pub fn to_llm_tools(&self, tier: TierLevel) -> Vec<serde_json::Value> {
        self.filter_by_tier(tier)
            .into_iter()
            .map(|t| t.to_llm_format())
            .collect()
    }
}
