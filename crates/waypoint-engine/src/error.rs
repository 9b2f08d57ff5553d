use waypoint_core::{ServiceError, TelemetryError};

use crate::parse::ParseError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("service error: {0}")]
    Service(#[from] ServiceError),

    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    #[error("completion parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("location has no city")]
    Unresolved,

    #[error("viewer channel closed")]
    ChannelClosed,
}
