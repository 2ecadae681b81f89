//! Loki client behaviour against a mock HTTP backend

use std::time::Duration;

use cs_core::config::{BasicCredentials, LogsConfig};
use cs_logs::{LogsError, LokiClient, QueryWindow};
use serde_json::json;
use wiremock::matchers::{header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn line(func: &str, lineno: u32, level: &str, message: &str) -> String {
    json!({
        "asctime": "2025-07-21 15:35:47 UTC",
        "name": "publisher.feed",
        "levelname": level,
        "filename": "feed.py",
        "lineno": lineno,
        "funcName": func,
        "message": message
    })
    .to_string()
}

fn config(server: &MockServer, with_credentials: bool) -> LogsConfig {
    LogsConfig {
        endpoint: format!("{}/loki/api/v1/query_range", server.uri()),
        lookback_days: 7,
        limit: 500,
        timeout_secs: 1,
        credentials: if with_credentials {
            BasicCredentials::from_parts(Some("grafana".into()), Some("secret".into()))
        } else {
            None
        },
    }
}

#[tokio::test]
async fn two_values_become_two_records_in_order() {
    let server = MockServer::start().await;
    let body = json!({
        "status": "success",
        "data": {
            "resultType": "streams",
            "result": [{
                "stream": {"application": "marketdata-publisher"},
                "values": [
                    ["1753112140000000000", line("check_lag", 91, "WARNING", "lag 2.4s")],
                    ["1753112147000000000", line("publish_snapshot", 112, "ERROR", "Market data stale")]
                ]
            }]
        }
    });

    Mock::given(method("GET"))
        .and(path("/loki/api/v1/query_range"))
        .and(query_param("limit", "500"))
        .and(query_param("start", "1753056000"))
        .and(query_param("end", "1753142399"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&server)
        .await;

    let client = LokiClient::new(&config(&server, true)).unwrap();
    let window = client.window(Some("2025-07-21 00:00:00"), Some("2025-07-21 23:59:59"));
    let logs = client.fetch("{application=\"marketdata-publisher\"}", &window).await.unwrap();

    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].to_string(), "[check_lag - 91] - [WARNING] - lag 2.4s");
    assert_eq!(logs[1].to_string(), "[publish_snapshot - 112] - [ERROR] - Market data stale");
}

#[tokio::test]
async fn invalid_window_uses_lookback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("since", "7d"))
        .and(query_param("direction", "backward"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "success", "data": {"result": []}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = LokiClient::new(&config(&server, true)).unwrap();
    let window = client.window(Some("2025-07-21"), None);
    assert_eq!(window, QueryWindow::Lookback { days: 7 });

    let logs = client.fetch("{application=\"x\"}", &window).await.unwrap();
    assert!(logs.is_empty());
}

#[tokio::test]
async fn missing_credentials_make_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = LokiClient::new(&config(&server, false)).unwrap();
    let window = client.window(None, None);
    let err = client.fetch("{application=\"x\"}", &window).await.unwrap_err();

    assert!(matches!(err, LogsError::MissingCredentials));
}

#[tokio::test]
async fn non_success_status_is_transport_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .mount(&server)
        .await;

    let client = LokiClient::new(&config(&server, true)).unwrap();
    let err = client
        .fetch("{application=\"x\"}", &client.window(None, None))
        .await
        .unwrap_err();

    assert!(matches!(err, LogsError::Status { status: 401, ref body } if body == "unauthorized"));
}

#[tokio::test]
async fn in_band_error_is_backend_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "error", "error": "parse error : unexpected IDENTIFIER"})),
        )
        .mount(&server)
        .await;

    let client = LokiClient::new(&config(&server, true)).unwrap();
    let err = client
        .fetch("{application=", &client.window(None, None))
        .await
        .unwrap_err();

    assert!(matches!(err, LogsError::Backend(ref m) if m.contains("unexpected IDENTIFIER")));
}

#[tokio::test]
async fn slow_backend_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": {"result": []}}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client = LokiClient::new(&config(&server, true)).unwrap();
    let err = client
        .fetch("{application=\"x\"}", &client.window(None, None))
        .await
        .unwrap_err();

    assert!(matches!(err, LogsError::Timeout(1)));
}

#[tokio::test]
async fn refused_connection_is_connection_failure() {
    // a port that was just released has no listener
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let cfg = LogsConfig {
        endpoint: format!("http://127.0.0.1:{}/loki/api/v1/query_range", port),
        lookback_days: 7,
        limit: 500,
        timeout_secs: 1,
        credentials: BasicCredentials::from_parts(Some("grafana".into()), Some("secret".into())),
    };

    let client = LokiClient::new(&cfg).unwrap();
    let err = client
        .fetch("{application=\"x\"}", &client.window(None, None))
        .await
        .unwrap_err();

    assert!(matches!(err, LogsError::Connection(_)));
}
