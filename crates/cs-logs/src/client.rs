//! Loki `query_range` HTTP client

use std::time::Duration;

use cs_core::config::{BasicCredentials, LogsConfig};
use cs_core::state::LogItem;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use crate::error::{LogsError, Result};
use crate::window::QueryWindow;

/// Characters of an error body kept in [`LogsError::Status`]
const ERROR_BODY_LIMIT: usize = 512;

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default)]
    error: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(default)]
    result: Vec<StreamResult>,
}

#[derive(Debug, Deserialize)]
struct StreamResult {
    #[serde(default)]
    values: Vec<Vec<JsonValue>>,
}

/// Parse a `query_range` response body into log records.
///
/// The last element of every `data.result[].values[]` entry is a JSON log
/// line. Records keep the order of the response.
pub fn parse_query_response(body: &str) -> Result<Vec<LogItem>> {
    let response: QueryResponse =
        serde_json::from_str(body).map_err(|e| LogsError::InvalidResponse(e.to_string()))?;

    let streams = response.data.map(|d| d.result).unwrap_or_default();

    if streams.is_empty() {
        if let Some(error) = response.error {
            let message = match error {
                JsonValue::String(s) => s,
                other => other.to_string(),
            };
            return Err(LogsError::Backend(message));
        }
    }

    let mut logs = Vec::new();
    for stream in streams {
        for value in stream.values {
            let line = value
                .last()
                .and_then(JsonValue::as_str)
                .ok_or_else(|| LogsError::MalformedRecord {
                    line: JsonValue::Array(value.clone()).to_string(),
                    reason: "entry has no log line".to_string(),
                })?;
            let item = LogItem::from_json_line(line).map_err(|e| LogsError::MalformedRecord {
                line: line.to_string(),
                reason: e.to_string(),
            })?;
            logs.push(item);
        }
    }

    Ok(logs)
}

/// Client for a Loki-compatible log backend
#[derive(Clone)]
pub struct LokiClient {
    http: Client,
    endpoint: String,
    credentials: Option<BasicCredentials>,
    limit: u32,
    lookback_days: u32,
    timeout_secs: u64,
}

impl LokiClient {
    /// Create a new client
    pub fn new(config: &LogsConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            credentials: config.credentials.clone(),
            limit: config.limit,
            lookback_days: config.lookback_days,
            timeout_secs: config.timeout_secs,
        })
    }

    /// Resolve optional bounds using this client's lookback
    pub fn window(&self, from: Option<&str>, to: Option<&str>) -> QueryWindow {
        QueryWindow::resolve(from, to, self.lookback_days)
    }

    /// Run a LogQL query.
    ///
    /// Fails with [`LogsError::MissingCredentials`] before any request is
    /// made when no credentials are configured.
    pub async fn fetch(&self, logql_query: &str, window: &QueryWindow) -> Result<Vec<LogItem>> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(LogsError::MissingCredentials)?;

        let mut params: Vec<(&str, String)> = vec![
            ("query", logql_query.to_string()),
            ("limit", self.limit.to_string()),
        ];
        params.extend(window.query_params());

        debug!(endpoint = %self.endpoint, query = logql_query, ?window, "Fetching logs");

        let response = self
            .http
            .get(&self.endpoint)
            .query(&params)
            .basic_auth(credentials.username.as_str(), Some(credentials.password.as_str()))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            warn!(%status, "Log backend error response");
            return Err(LogsError::Status {
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        let logs = parse_query_response(&body)?;
        info!(count = logs.len(), "Retrieved log records");
        Ok(logs)
    }

    fn map_send_error(&self, err: reqwest::Error) -> LogsError {
        if err.is_timeout() {
            LogsError::Timeout(self.timeout_secs)
        } else if err.is_connect() {
            LogsError::Connection(err.to_string())
        } else {
            LogsError::Http(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE_A: &str = r#"{\"asctime\": \"2025-07-21 15:35:40 UTC\", \"name\": \"feed\", \"levelname\": \"INFO\", \"filename\": \"feed.py\", \"lineno\": 10, \"funcName\": \"tick\", \"message\": \"tick\"}"#;
    const LINE_B: &str = r#"{\"asctime\": \"2025-07-21 15:35:47 UTC\", \"name\": \"feed\", \"levelname\": \"ERROR\", \"filename\": \"feed.py\", \"lineno\": 42, \"funcName\": \"publish\", \"message\": \"stale\"}"#;

    #[test]
    fn test_parse_values_in_order() {
        let body = format!(
            r#"{{"status":"success","data":{{"resultType":"streams","result":[{{"stream":{{"application":"marketdata-publisher"}},"values":[["1753112140000000000","{}"],["1753112147000000000","{}"]]}}]}}}}"#,
            LINE_A, LINE_B
        );
        let logs = parse_query_response(&body).unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].func_name, "tick");
        assert_eq!(logs[1].to_string(), "[publish - 42] - [ERROR] - stale");
    }

    #[test]
    fn test_empty_result() {
        let body = r#"{"status":"success","data":{"resultType":"streams","result":[]}}"#;
        assert!(parse_query_response(body).unwrap().is_empty());
    }

    #[test]
    fn test_in_band_error() {
        let body = r#"{"status":"error","error":"parse error at line 1, col 12"}"#;
        let err = parse_query_response(body).unwrap_err();
        assert!(matches!(err, LogsError::Backend(ref m) if m == "parse error at line 1, col 12"));
    }

    #[test]
    fn test_malformed_record() {
        let body = r#"{"data":{"result":[{"values":[["1","not json"]]}]}}"#;
        let err = parse_query_response(body).unwrap_err();
        assert!(matches!(err, LogsError::MalformedRecord { ref line, .. } if line == "not json"));
    }

    #[test]
    fn test_non_json_body() {
        assert!(matches!(
            parse_query_response("<html>"),
            Err(LogsError::InvalidResponse(_))
        ));
    }
}
