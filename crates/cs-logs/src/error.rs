//! Error types for cs-logs

use thiserror::Error;

/// Failures of a log backend fetch
#[derive(Error, Debug)]
pub enum LogsError {
    #[error("Log backend timed out after {0}s")]
    Timeout(u64),

    #[error("Failed to connect to log backend: {0}")]
    Connection(String),

    #[error("Log backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// `error` field inside an otherwise successful response
    #[error("Log backend error: {0}")]
    Backend(String),

    #[error("Malformed log record ({reason}): {line}")]
    MalformedRecord { line: String, reason: String },

    #[error("Unreadable log backend response: {0}")]
    InvalidResponse(String),

    #[error("GRAFANA_USERNAME and GRAFANA_PWD must be set to fetch logs")]
    MissingCredentials,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<LogsError> for cs_core::Error {
    fn from(err: LogsError) -> Self {
        match err {
            LogsError::Timeout(secs) => cs_core::Error::Timeout(secs),
            LogsError::Connection(_) | LogsError::Status { .. } => {
                cs_core::Error::Transport(err.to_string())
            }
            LogsError::Backend(_) | LogsError::MalformedRecord { .. } | LogsError::InvalidResponse(_) => {
                cs_core::Error::Backend(err.to_string())
            }
            LogsError::MissingCredentials => cs_core::Error::MissingCredentials(err.to_string()),
            LogsError::Http(e) => cs_core::Error::Http(e),
        }
    }
}

/// Result type alias for cs-logs
pub type Result<T> = std::result::Result<T, LogsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_keeps_categories() {
        let transport: cs_core::Error = LogsError::Status {
            status: 502,
            body: "bad gateway".into(),
        }
        .into();
        assert!(matches!(transport, cs_core::Error::Transport(ref m) if m.contains("502")));

        let backend: cs_core::Error = LogsError::Backend("parse error at line 1".into()).into();
        assert!(matches!(backend, cs_core::Error::Backend(_)));

        let creds: cs_core::Error = LogsError::MissingCredentials.into();
        assert!(creds.is_fatal_for_tool());

        let timeout: cs_core::Error = LogsError::Timeout(30).into();
        assert!(matches!(timeout, cs_core::Error::Timeout(30)));
        assert!(!timeout.is_fatal_for_tool());
    }
}
