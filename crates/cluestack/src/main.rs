//! cluestack: Incident Investigation Assistant
//!
//! Main entry point. Runs one investigation and prints the answer.
//!
//! Usage:
//!   cluestack             - Investigate the demonstration query
//!   cluestack "QUERY"     - Investigate QUERY
//!   cluestack --help      - Show help

use std::sync::Arc;

use cluestack::{DEMO_QUERY, build_supervisor};
use cs_core::{Config, LanguageModel, LlmClient, OutcomeStatus, RunResult, ToolManager};
use cs_logs::{LokiClient, log_tools};
use cs_mcp::initialize_mcp_tools;
use tracing_subscriber::EnvFilter;

/// Run mode
#[derive(Debug, PartialEq, Eq)]
enum RunMode {
    /// Investigate a query, the demonstration query when `None`
    Investigate(Option<String>),
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let query = match parse_args(std::env::args().skip(1)) {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("cluestack {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        RunMode::Investigate(query) => query.unwrap_or_else(|| DEMO_QUERY.to_string()),
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load().map_err(|e| anyhow::anyhow!("Config error: {}", e))?;
    if config.llm.api_key.is_empty() {
        anyhow::bail!("Config error: no LLM API key configured (LLM_API_KEY or [llm].api_key)");
    }

    tracing::info!(model = %config.llm.model, "Starting cluestack");

    let model: Arc<dyn LanguageModel> = Arc::new(
        LlmClient::new(&config.llm)
            .map_err(|e| anyhow::anyhow!("Failed to create LLM client: {}", e))?,
    );
    let loki = Arc::new(
        LokiClient::new(&config.logs)
            .map_err(|e| anyhow::anyhow!("Failed to create log backend client: {}", e))?,
    );

    let logs_toolset = log_tools(Arc::clone(&model), loki, config.agents.schema_corrections);
    tracing::info!(tools = ?logs_toolset.tool_names(), "Registered log tools");

    // Code-index tools are discovered at start-up
    let mut code_toolset = ToolManager::new();
    let mcp_registry = match initialize_mcp_tools(&config.mcp, &mut code_toolset).await {
        Ok(registry) => registry,
        Err(e) => {
            tracing::warn!(error = %e, "Code-index initialization failed");
            None
        }
    };
    if code_toolset.is_empty() {
        tracing::warn!("No code-index tools available; the codebase specialist answers from context only");
    } else {
        tracing::info!(tools = ?code_toolset.tool_names(), "Registered code-index tools");
    }

    let supervisor = build_supervisor(model, logs_toolset, code_toolset, &config.agents)
        .map_err(|e| anyhow::anyhow!("Failed to build agents: {}", e))?;

    let result = supervisor.run(&query).await;
    print_report(&query, &result)?;

    // Adapters hold the MCP clients
    drop(supervisor);
    if let Some(registry) = mcp_registry {
        if let Err(e) = registry.shutdown().await {
            tracing::warn!(error = %e, "MCP shutdown failed");
        }
    }

    Ok(())
}

/// Parse command line arguments
fn parse_args(args: impl IntoIterator<Item = String>) -> RunMode {
    let mut query = None;

    for arg in args {
        match arg.as_str() {
            "--help" | "-h" => return RunMode::Help,
            "--version" | "-v" => return RunMode::Version,
            _ if query.is_none() && !arg.trim().is_empty() => query = Some(arg),
            _ => {}
        }
    }

    RunMode::Investigate(query)
}

/// Print help message
fn print_help() {
    println!("cluestack - Incident Investigation Assistant");
    println!();
    println!("Usage:");
    println!("  cluestack             Investigate the demonstration query");
    println!("  cluestack \"QUERY\"     Investigate QUERY");
    println!("  cluestack --help      Show this help message");
    println!("  cluestack --version   Show version");
    println!();
    println!("Configuration is read from ./cluestack.toml when present, then the environment.");
    println!();
    println!("Environment Variables:");
    println!("  LLM_API_KEY          API key (required, or CLAUDE_API_KEY)");
    println!("  LLM_MODEL            Model name (default: claude-sonnet-4-20250514)");
    println!("  LLM_PROVIDER         Provider: claude or openai (default: claude)");
    println!("  LLM_BASE_URL         Custom API endpoint");
    println!("  LOGS_ENDPOINT        Loki query_range URL (default: http://localhost:3100/loki/api/v1/query_range)");
    println!("  LOGS_LOOKBACK_DAYS   Lookback without a time range (default: 7)");
    println!("  LOGS_LIMIT           Records per fetch (default: 500)");
    println!("  GRAFANA_USERNAME     Log backend user (required for log fetches)");
    println!("  GRAFANA_PWD          Log backend password (required for log fetches)");
    println!("  MCP_ENABLED          Enable code-index tools (default: true)");
    println!("  MCP_CONFIG_PATH      Path to an MCP server list (JSON)");
    println!("  CODE_INDEX_URL       Code-index MCP server (default: https://mcp.deepwiki.com/mcp)");
    println!("  AGENT_MAX_ITERATIONS Reasoning steps per specialist (default: 10)");
}

fn print_report(query: &str, result: &RunResult) -> anyhow::Result<()> {
    println!("Query: {}", query);
    println!();
    match result.outcome.status {
        OutcomeStatus::Resolved => println!("Answer:"),
        OutcomeStatus::Unresolved => println!("Answer (unresolved):"),
    }
    println!("{}", result.outcome.answer);
    println!();
    println!(
        "Evidence: {} log records, {} code snippets, {} handoffs",
        result.state.logs().len(),
        result.state.codebase_snippets().len(),
        result.state.handoffs().len()
    );
    println!("{}", serde_json::to_string_pretty(&result.summary)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_no_arguments_runs_demo() {
        assert_eq!(parse_args(args(&[])), RunMode::Investigate(None));
    }

    #[test]
    fn test_positional_query() {
        assert_eq!(
            parse_args(args(&["why is the feed stale?"])),
            RunMode::Investigate(Some("why is the feed stale?".into()))
        );
    }

    #[test]
    fn test_flags_win_over_query() {
        assert_eq!(parse_args(args(&["query", "--help"])), RunMode::Help);
        assert_eq!(parse_args(args(&["-v"])), RunMode::Version);
    }

    #[test]
    fn test_blank_query_ignored() {
        assert_eq!(parse_args(args(&["  "])), RunMode::Investigate(None));
    }
}
