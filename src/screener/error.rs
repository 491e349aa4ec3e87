use std::fmt;

#[derive(Debug)]
pub enum ScreenerError {
    Request(String),
    Rejected { status: u16, body: String },
    /// HTTP 200 whose body carries an `error` field
    Upstream(String),
    RateLimited { status: u16 },
    NonJsonResponse(String),
    Parse(String),
    InvalidQuery(String),
}

impl ScreenerError {
    /// Only throttling and upstream failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, ScreenerError::RateLimited { .. } | ScreenerError::Request(_))
    }
}

impl fmt::Display for ScreenerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScreenerError::Request(msg) => write!(f, "Request error: {}", msg),
            ScreenerError::Rejected { status, body } => {
                write!(f, "Rejected with HTTP {}: {}", status, body)
            }
            ScreenerError::Upstream(msg) => write!(f, "Scanner reported an error: {}", msg),
            ScreenerError::RateLimited { status } => write!(f, "Retryable error: HTTP {}", status),
            ScreenerError::NonJsonResponse(preview) => write!(f, "Non-JSON response: {}", preview),
            ScreenerError::Parse(msg) => write!(f, "Parse error: {}", msg),
            ScreenerError::InvalidQuery(msg) => write!(f, "Invalid query: {}", msg),
        }
    }
}

impl std::error::Error for ScreenerError {}

impl From<reqwest::Error> for ScreenerError {
    fn from(err: reqwest::Error) -> Self {
        ScreenerError::Request(err.to_string())
    }
}

impl From<serde_json::Error> for ScreenerError {
    fn from(err: serde_json::Error) -> Self {
        ScreenerError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ScreenerError::RateLimited { status: 429 }.is_retryable());
        assert!(ScreenerError::Request("connection reset".into()).is_retryable());
        assert!(!ScreenerError::Rejected { status: 400, body: String::new() }.is_retryable());
        assert!(!ScreenerError::Parse("eof".into()).is_retryable());
        assert!(!ScreenerError::Upstream("Unknown field".into()).is_retryable());
    }
}
