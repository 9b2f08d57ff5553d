//! HTTP client for the simulator bridge.
//!
//! The bridge exposes `GET /status` for connectivity and
//! `GET /get?fields=A,B` returning `{"A": n, "B": n}`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};
use waypoint_core::{TelemetryError, TelemetryFactory, TelemetrySource};
use waypoint_settings::BridgeSettings;

pub struct SimBridgeTelemetry {
    client: Client,
    base_url: String,
    connected: AtomicBool,
}

impl SimBridgeTelemetry {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            connected: AtomicBool::new(false),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    async fn fetch(&self, fields: &[&str]) -> Result<HashMap<String, f64>, TelemetryError> {
        let response = self
            .client
            .get(format!("{}/get", self.base_url))
            .query(&[("fields", fields.join(","))])
            .send()
            .await
            .map_err(|e| TelemetryError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TelemetryError::Unreachable(format!(
                "bridge returned HTTP {}",
                response.status()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TelemetryError::Malformed(e.to_string()))?;

        pick_fields(&body, fields)
    }
}

/// Extract the requested numeric fields from a bridge response body.
fn pick_fields(
    body: &serde_json::Value,
    fields: &[&str],
) -> Result<HashMap<String, f64>, TelemetryError> {
    fields
        .iter()
        .map(|field| {
            body.get(*field)
                .and_then(serde_json::Value::as_f64)
                .map(|v| ((*field).to_string(), v))
                .ok_or_else(|| TelemetryError::MissingField((*field).to_string()))
        })
        .collect()
}

#[async_trait]
impl TelemetrySource for SimBridgeTelemetry {
    async fn connect(&self) -> Result<(), TelemetryError> {
        let response = self
            .client
            .get(format!("{}/status", self.base_url))
            .send()
            .await
            .map_err(|e| TelemetryError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TelemetryError::Unreachable(format!(
                "bridge status HTTP {}",
                response.status()
            )));
        }

        self.connected.store(true, Ordering::Relaxed);
        debug!(url = %self.base_url, "connected to simulator bridge");
        Ok(())
    }

    async fn get(&self, fields: &[&str]) -> Result<HashMap<String, f64>, TelemetryError> {
        // Auto-reconnect: one connect attempt per read while disconnected.
        if !self.is_connected() {
            self.connect().await?;
        }

        let result = self.fetch(fields).await;
        if let Err(TelemetryError::Unreachable(reason)) = &result {
            warn!(url = %self.base_url, reason = %reason, "simulator bridge dropped");
            self.connected.store(false, Ordering::Relaxed);
        }
        result
    }
}

/// Creates one bridge handle per session.
pub struct SimBridgeFactory {
    settings: BridgeSettings,
}

impl SimBridgeFactory {
    pub fn new(settings: BridgeSettings) -> Self {
        Self { settings }
    }
}

impl TelemetryFactory for SimBridgeFactory {
    fn create(&self) -> Arc<dyn TelemetrySource> {
        Arc::new(SimBridgeTelemetry::new(
            self.settings.url.clone(),
            Duration::from_secs(self.settings.timeout_secs),
        ))
    }
}

/// How a session retries its initial bridge connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// `None` retries forever.
    pub max_retries: Option<u32>,
    pub retry_interval: Duration,
}

impl ReconnectPolicy {
    pub fn unlimited(retry_interval: Duration) -> Self {
        Self {
            max_retries: None,
            retry_interval,
        }
    }

    pub fn from_settings(settings: &BridgeSettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            retry_interval: Duration::from_millis(settings.retry_interval_ms),
        }
    }
}

/// Connect `source`, retrying at a fixed interval per `policy`.
///
/// Returns the last error once a bounded policy runs out of retries.
pub async fn connect_with_retry(
    source: &dyn TelemetrySource,
    policy: &ReconnectPolicy,
) -> Result<(), TelemetryError> {
    let mut attempt: u32 = 0;
    loop {
        match source.connect().await {
            Ok(()) => return Ok(()),
            Err(e) => {
                if policy.max_retries.is_some_and(|max| attempt >= max) {
                    return Err(e);
                }
                attempt = attempt.saturating_add(1);
                if attempt == 1 || attempt % 100 == 0 {
                    warn!(attempt, error = %e, "simulator bridge connect failed, retrying");
                }
                tokio::time::sleep(policy.retry_interval).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTelemetry;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn reads_requested_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/get"))
            .and(query_param("fields", "PLANE_LATITUDE,PLANE_LONGITUDE"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "PLANE_LATITUDE": 0.698,
                "PLANE_LONGITUDE": -1.309
            })))
            .mount(&server)
            .await;

        let bridge = SimBridgeTelemetry::new(server.uri(), Duration::from_secs(5));
        let values = bridge
            .get(&["PLANE_LATITUDE", "PLANE_LONGITUDE"])
            .await
            .unwrap();
        assert!(bridge.is_connected());
        assert!((values["PLANE_LATITUDE"] - 0.698).abs() < f64::EPSILON);
        assert!((values["PLANE_LONGITUDE"] + 1.309).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn missing_field_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/get"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"PLANE_LATITUDE": 0.5})),
            )
            .mount(&server)
            .await;

        let bridge = SimBridgeTelemetry::new(server.uri(), Duration::from_secs(5));
        let err = bridge
            .get(&["PLANE_LATITUDE", "PLANE_LONGITUDE"])
            .await
            .unwrap_err();
        assert!(matches!(err, TelemetryError::MissingField(f) if f == "PLANE_LONGITUDE"));
    }

    #[tokio::test]
    async fn unreachable_bridge_fails_connect() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let bridge = SimBridgeTelemetry::new(server.uri(), Duration::from_secs(5));
        assert!(bridge.connect().await.is_err());
        assert!(!bridge.is_connected());
    }

    #[test]
    fn pick_fields_rejects_non_numeric() {
        let body = serde_json::json!({"A": "north"});
        assert!(pick_fields(&body, &["A"]).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn connect_retries_until_success() {
        let telemetry = MockTelemetry::new(0.0, 0.0).failing_connects(3);
        let policy = ReconnectPolicy::unlimited(Duration::from_millis(10));

        connect_with_retry(&telemetry, &policy).await.unwrap();
        assert_eq!(telemetry.connect_calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_policy_gives_up() {
        let telemetry = MockTelemetry::new(0.0, 0.0).failing_connects(10);
        let policy = ReconnectPolicy {
            max_retries: Some(2),
            retry_interval: Duration::from_millis(10),
        };

        assert!(connect_with_retry(&telemetry, &policy).await.is_err());
        assert_eq!(telemetry.connect_calls(), 3);
    }

    #[test]
    fn policy_from_settings() {
        let policy = ReconnectPolicy::from_settings(&BridgeSettings::default());
        assert_eq!(policy.max_retries, None);
        assert_eq!(policy.retry_interval, Duration::from_millis(10));
    }
}
