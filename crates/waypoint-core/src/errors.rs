/// Typed error for calls to the remote services (geocoder, completion, image search).
#[derive(Clone, Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("rate limited")]
    RateLimited,
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("missing field: {0}")]
    MissingField(&'static str),
}

impl ServiceError {
    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Status { .. } => "status",
            Self::RateLimited => "rate_limited",
            Self::Malformed(_) => "malformed",
            Self::MissingField(_) => "missing_field",
        }
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            429 => Self::RateLimited,
            _ => Self::Status { status, body },
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}

/// Errors raised by a simulator telemetry bridge.
#[derive(Clone, Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("bridge not connected")]
    NotConnected,
    #[error("bridge unreachable: {0}")]
    Unreachable(String),
    #[error("field not reported: {0}")]
    MissingField(String),
    #[error("malformed bridge response: {0}")]
    Malformed(String),
}
