//! Terminal demo for the orchestrator core: loads a vertical's tool
//! manifest, wires the pipeline with an always-failing oracle (the LLM
//! runtime is an external collaborator, out of scope here — see spec
//! §"Out of scope"), and runs `decide()` turn by turn against stdin lines.
//! Not the HTTP API surface; that is a separate, unbuilt collaborator.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use agentcore_broker::handler::ScriptedHandler;
use agentcore_broker::{ToolBroker, ToolBrokerConfig};
use agentcore_extractor::Extractor;
use agentcore_manifest::ToolManifestLoader;
use agentcore_oracle::ScriptedOracle;
use agentcore_orchestrator::Orchestrator;
use agentcore_planner::Planner;
use agentcore_policy::PolicyEngine;
use agentcore_reducer::StateReducer;
use agentcore_types::{ConversationId, ConversationSnapshot, SlotMap, TierLevel, Vertical, Workspace, WorkspacePolicy, WorkspaceStatus, WorkspaceId};
use clap::Parser;
use serde_json::json;

#[derive(Parser, Debug)]
#[command(name = "pulpo-core-demo", about = "REPL smoke test for the conversational agent orchestrator core")]
struct Args {
    /// Vertical to load a tool manifest for.
    #[arg(long, default_value = "services")]
    vertical: String,

    /// Subscription tier gating which tools are allowed.
    #[arg(long, default_value = "basic")]
    tier: String,

    /// Directory holding `<vertical>.yml` manifest files.
    #[arg(long, default_value = "config/tools")]
    config_dir: String,

    /// Workspace id to tag the demo session with.
    #[arg(long, default_value = "demo-workspace")]
    workspace_id: String,
}

fn parse_tier(raw: &str) -> TierLevel {
    match raw {
        "pro" => TierLevel::Pro,
        "max" => TierLevel::Max,
        _ => TierLevel::Basic,
    }
}

fn parse_vertical(raw: &str) -> Vertical {
    match raw {
        "gastronomy" => Vertical::Gastronomy,
        "real_estate" => Vertical::RealEstate,
        _ => Vertical::Services,
    }
}

/// Registers in-process stand-ins for the internal tools a tenant catalog
/// would normally back (§"Out of scope": per-tenant catalog persistence is
/// an external collaborator). Just enough canned data to exercise the
/// pipeline end to end.
fn register_demo_handlers(broker: &ToolBroker) {
    broker.register_handler(
        "get_available_services",
        Arc::new(ScriptedHandler::ok(json!({
            "services": [
                {"name": "Corte de Cabello", "price": 2500},
                {"name": "Coloracion", "price": {"min": 5000, "max": 9000}},
                {"name": "Manicura", "price": 1800},
            ]
        }))),
    );
    broker.register_handler(
        "get_business_hours",
        Arc::new(ScriptedHandler::ok(json!({
            "open": "09:00",
            "close": "19:00",
            "days": "Lunes a Sabado",
        }))),
    );
    broker.register_handler(
        "check_service_availability",
        Arc::new(ScriptedHandler::ok(json!({
            "available_times": ["10:00", "14:30", "16:00"],
        }))),
    );
    broker.register_handler(
        "book_appointment",
        Arc::new(ScriptedHandler::ok(json!({
            "booking_id": "bk-demo-001",
            "confirmation_code": "AB12CD",
        }))),
    );
    broker.register_handler(
        "cancel_appointment",
        Arc::new(ScriptedHandler::ok(json!({
            "cancelled": true,
        }))),
    );
    broker.register_handler(
        "find_appointment_by_phone",
        Arc::new(ScriptedHandler::ok(json!({
            "booking_id": "bk-demo-001",
        }))),
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "pulpo_core=info".into()),
        )
        .init();

    let args = Args::parse();

    let workspace = Workspace {
        id: WorkspaceId::from(args.workspace_id.as_str()),
        vertical: parse_vertical(&args.vertical),
        tier: parse_tier(&args.tier),
        status: WorkspaceStatus::Active,
        policy: WorkspacePolicy::default(),
        timezone: None,
    };

    // The oracle is an opaque, out-of-scope collaborator; this demo always
    // degrades to the Extractor/Planner's deterministic fallback tables
    // rather than fabricate a real LLM backend.
    let oracle: Arc<dyn agentcore_oracle::LlmOracle> = Arc::new(ScriptedOracle::erroring());

    let broker = ToolBroker::new(ToolBrokerConfig::default());
    register_demo_handlers(&broker);

    let orchestrator = Orchestrator::new(
        Extractor::new(oracle.clone()),
        Planner::new(oracle),
        PolicyEngine::new(),
        broker,
        StateReducer::new(50),
        ToolManifestLoader::new(args.config_dir),
    );

    println!("pulpo-core-demo ({} / {}) — type a message, Ctrl-D to quit", args.vertical, args.tier);

    let conversation_id = ConversationId::from(uuid::Uuid::now_v7().to_string());
    let mut slots: SlotMap = SlotMap::new();
    let mut greeted = false;
    let mut called_tools: Vec<String> = Vec::new();

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let user_input = line.trim_end_matches(['\n', '\r']).to_string();

        let snapshot = ConversationSnapshot {
            conversation_id: conversation_id.clone(),
            workspace_id: workspace.id.clone(),
            vertical: workspace.vertical,
            user_input,
            greeted,
            slots: slots.clone(),
            objective: None,
            last_action: None,
            attempts_count: 0,
            called_tools: called_tools.clone(),
        };

        let response = orchestrator.decide(&snapshot, &workspace).await;

        println!("{}", response.assistant);
        println!(
            "  [next_action={:?} end={} tools={}]",
            response.next_action,
            response.end,
            response
                .tool_calls
                .iter()
                .map(|a| a.tool.as_str())
                .collect::<Vec<_>>()
                .join(",")
        );

        slots = response.slots;
        called_tools.extend(response.tool_calls.iter().map(|a| a.tool.clone()));
        if matches!(response.next_action, agentcore_types::NextAction::Greet) {
            greeted = true;
        }
        if response.end {
            println!("(conversation ended)");
            break;
        }
    }

    Ok(())
}
