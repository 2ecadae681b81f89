//! End-to-end investigations with a scripted model
//!
//! One scripted model serves the supervisor, both specialists and the LogQL
//! generator, so each script lists their turns in execution order.

use std::sync::Arc;

use async_trait::async_trait;
use cluestack::{CODEBASE_AGENT, LOGS_AGENT, build_supervisor};
use cs_core::config::{AgentsConfig, BasicCredentials, LogsConfig};
use cs_core::state::HandoffStatus;
use cs_core::testing::ScriptedModel;
use cs_core::{
    LanguageModel, LogLevel, MessageContent, OutcomeStatus, Result, Tool, ToolManager, ToolResult,
};
use cs_logs::{LokiClient, log_tools};
use serde_json::{Value as JsonValue, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const QUERY: &str = "Market data was reported stale at 15:35:47 in the application: \
     marketdata-publisher for repo: abhimanyu891998/cluestackmvpserver";

const SNIPPET: &str = "def publish_snapshot(self):\n    if self.lag() > STALE_AFTER:\n        log.error(\"Market data stale\")";

/// Code-index tool answering every question with the same snippet
struct StubCodeIndex;

#[async_trait]
impl Tool for StubCodeIndex {
    fn name(&self) -> &str {
        "ask_question"
    }

    fn description(&self) -> &str {
        "Ask a question about a GitHub repository."
    }

    fn input_schema(&self) -> JsonValue {
        json!({
            "type": "object",
            "properties": {
                "repoName": {"type": "string"},
                "question": {"type": "string"}
            },
            "required": ["repoName", "question"]
        })
    }

    async fn execute(&self, _input: JsonValue) -> Result<ToolResult> {
        Ok(ToolResult::success(format!("publisher/feed.py lines 110-114:\n{}", SNIPPET)))
    }
}

fn record() -> JsonValue {
    json!({
        "asctime": "2025-07-21 15:35:47 UTC",
        "name": "publisher.feed",
        "levelname": "ERROR",
        "filename": "feed.py",
        "lineno": 112,
        "funcName": "publish_snapshot",
        "message": "Market data stale"
    })
}

fn logs_config(server: &MockServer, with_credentials: bool) -> LogsConfig {
    LogsConfig {
        endpoint: format!("{}/loki/api/v1/query_range", server.uri()),
        lookback_days: 7,
        limit: 500,
        timeout_secs: 5,
        credentials: if with_credentials {
            BasicCredentials::from_parts(Some("grafana".into()), Some("secret".into()))
        } else {
            None
        },
    }
}

fn toolsets(
    model: Arc<dyn LanguageModel>,
    config: &LogsConfig,
) -> (ToolManager, ToolManager) {
    let loki = Arc::new(LokiClient::new(config).unwrap());
    let logs = log_tools(model, loki, 1);
    let code = ToolManager::new().with(Arc::new(StubCodeIndex));
    (logs, code)
}

#[tokio::test]
async fn staleness_query_consults_logs_then_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/loki/api/v1/query_range"))
        .and(query_param("start", "1753111800"))
        .and(query_param("end", "1753112400"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": {
                "resultType": "streams",
                "result": [{
                    "stream": {"application": "marketdata-publisher"},
                    "values": [["1753112147000000000", record().to_string()]]
                }]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let scripted = Arc::new(
        ScriptedModel::new()
            // supervisor
            .with_tool_call(
                "transfer_to_logs_agent",
                json!({"query": "Stale market data around 15:35:47 in marketdata-publisher"}),
            )
            // logs specialist, then the LogQL generator it calls
            .with_tool_call(
                "get_logql_from_nl_query",
                json!({"query": "stale data around 15:35:47", "user_application": "marketdata-publisher"}),
            )
            .with_tool_call(
                "LogQLQuery",
                json!({
                    "logql_query": "{application=\"marketdata-publisher\"} | json | message=~\"(?i).*stale.*\"",
                    "from_time": "2025-07-21 15:30:00",
                    "to_time": "2025-07-21 15:40:00"
                }),
            )
            .with_tool_call(
                "get_logs",
                json!({
                    "logql_query": "{application=\"marketdata-publisher\"} | json | message=~\"(?i).*stale.*\"",
                    "from_time": "2025-07-21 15:30:00",
                    "to_time": "2025-07-21 15:40:00"
                }),
            )
            .with_tool_call("LogAgentOutput", json!({"logs": [record()]}))
            // supervisor
            .with_tool_call(
                "transfer_to_codebase_agent",
                json!({"query": "publish_snapshot around line 112 in abhimanyu891998/cluestackmvpserver"}),
            )
            // codebase specialist
            .with_tool_call(
                "ask_question",
                json!({"repoName": "abhimanyu891998/cluestackmvpserver", "question": "Show publish_snapshot"}),
            )
            .with_tool_call(
                "CodeExtraction",
                json!({
                    "source_code": SNIPPET,
                    "start_line_number": 110,
                    "end_line_number": 114,
                    "function_name": "publish_snapshot",
                    "file_path": "publisher/feed.py"
                }),
            )
            // supervisor
            .with_text("publish_snapshot logged 'Market data stale' at 15:35:47 once the feed lag exceeded STALE_AFTER."),
    );

    let model: Arc<dyn LanguageModel> = scripted.clone();
    let (logs, code) = toolsets(Arc::clone(&model), &logs_config(&server, true));
    let supervisor = build_supervisor(model, logs, code, &AgentsConfig::default()).unwrap();

    let result = supervisor.run(QUERY).await;

    assert_eq!(result.outcome.status, OutcomeStatus::Resolved);
    assert_eq!(result.outcome.turns, 3);
    assert!(result.outcome.answer.contains("publish_snapshot"));
    assert_eq!(scripted.remaining(), 0);

    let handoffs = result.state.handoffs();
    assert_eq!(handoffs.len(), 2);
    assert_eq!(handoffs[0].specialist, LOGS_AGENT);
    assert_eq!(handoffs[1].specialist, CODEBASE_AGENT);
    assert!(handoffs.iter().all(|h| h.status == HandoffStatus::Completed));

    let logs = result.state.logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].levelname, LogLevel::Error);
    assert_eq!(logs[0].func_name, "publish_snapshot");

    let snippets = result.state.codebase_snippets();
    assert_eq!(snippets.len(), 1);
    assert_eq!(snippets[0].start_line_number, 110);

    // the codebase specialist starts from the log evidence
    let requests = scripted.requests();
    let opening = requests[6].messages[0].text_content();
    assert!(opening.contains("Context from the investigation so far"));
    assert!(opening.contains("Market data stale"));

    // eight agent turns; the LogQL generator's call is not an agent turn
    assert_eq!(requests.len(), 9);
    assert_eq!(result.summary.model_calls, 8);
    assert_eq!(result.summary.handoffs, 2);
    assert_eq!(result.summary.tool_calls, 3);
    assert_eq!(result.summary.tool_errors, 0);
    assert!(result.summary.resolved);
}

#[tokio::test]
async fn failed_specialist_is_reported_to_the_supervisor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let scripted = Arc::new(
        ScriptedModel::new()
            .with_tool_call("transfer_to_logs_agent", json!({"query": "stale data in marketdata-publisher"}))
            .with_tool_call(
                "get_logs",
                json!({"logql_query": "{application=\"marketdata-publisher\"}"}),
            )
            .with_text("Logs could not be fetched: the log backend credentials are missing."),
    );

    let model: Arc<dyn LanguageModel> = scripted.clone();
    let (logs, code) = toolsets(Arc::clone(&model), &logs_config(&server, false));
    let supervisor = build_supervisor(model, logs, code, &AgentsConfig::default()).unwrap();

    let result = supervisor.run(QUERY).await;

    assert_eq!(result.outcome.status, OutcomeStatus::Resolved);
    assert_eq!(result.state.handoffs()[0].status, HandoffStatus::Failed);
    assert!(result.state.logs().is_empty());

    // the failed handoff comes back as an error observation
    let observation = &result.state.messages()[2].content[0];
    assert!(matches!(observation, MessageContent::ToolResult { is_error: true, .. }));

    assert_eq!(result.summary.failures, 1);
    assert_eq!(result.summary.tool_errors, 1);
}

#[tokio::test]
async fn exhausted_model_still_yields_an_answer() {
    let server = MockServer::start().await;
    let scripted = Arc::new(ScriptedModel::new());

    let model: Arc<dyn LanguageModel> = scripted.clone();
    let (logs, code) = toolsets(Arc::clone(&model), &logs_config(&server, true));
    let supervisor = build_supervisor(model, logs, code, &AgentsConfig::default()).unwrap();

    let result = supervisor.run(QUERY).await;

    assert_eq!(result.outcome.status, OutcomeStatus::Unresolved);
    assert!(result.outcome.answer.contains("No evidence collected yet."));
    assert!(!result.summary.resolved);
}
