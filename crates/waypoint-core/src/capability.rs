//! Boundaries to the external collaborators of the refresh pipeline.
//!
//! Each remote service sits behind a trait so the pipeline can run against
//! real HTTP clients in production and scripted doubles in tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::{ServiceError, TelemetryError};
use crate::place::{Address, Position};

/// Telemetry field carrying the aircraft latitude in radians.
pub const LATITUDE_FIELD: &str = "PLANE_LATITUDE";
/// Telemetry field carrying the aircraft longitude in radians.
pub const LONGITUDE_FIELD: &str = "PLANE_LONGITUDE";

/// A connection to the simulator that can read named numeric fields.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Establish the connection. A single attempt; retry policy belongs to the caller.
    async fn connect(&self) -> Result<(), TelemetryError>;

    /// Read the given fields. Every requested field is present in a successful result.
    async fn get(&self, fields: &[&str]) -> Result<HashMap<String, f64>, TelemetryError>;
}

/// Hands out one fresh telemetry handle per session.
pub trait TelemetryFactory: Send + Sync {
    fn create(&self) -> Arc<dyn TelemetrySource>;
}

/// Reverse geocoding: degrees to an administrative address.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn reverse(&self, position: Position) -> Result<Address, ServiceError>;
}

/// Single-prompt chat completion.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &str;
    fn model(&self) -> &str;

    /// Send one user prompt and return the text of the first choice.
    async fn complete(&self, prompt: &str) -> Result<String, ServiceError>;
}

/// Image lookup by free-text title.
#[async_trait]
pub trait ImageSearch: Send + Sync {
    /// Return at most `limit` image URLs for `title`.
    async fn search(&self, title: &str, limit: usize) -> Result<Vec<String>, ServiceError>;
}
