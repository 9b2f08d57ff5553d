use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use waypoint_core::{
    Geocoder, Place, Position, TelemetryError, TelemetrySource, LATITUDE_FIELD, LONGITUDE_FIELD,
};

use crate::error::EngineError;

/// Samples the simulator position and reverse-geocodes it into a [`Place`].
pub struct PositionResolver {
    geocoder: Arc<dyn Geocoder>,
    retry_interval: Duration,
}

impl PositionResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>, retry_interval: Duration) -> Self {
        Self {
            geocoder,
            retry_interval,
        }
    }

    /// Resolve the current place, retrying every `retry_interval` until it succeeds.
    ///
    /// Never gives up on its own; drop the future to stop it.
    pub async fn resolve(&self, telemetry: &dyn TelemetrySource) -> Place {
        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            match self.try_resolve(telemetry).await {
                Ok(place) => {
                    info!(attempt, place = %place, "resolved location");
                    return place;
                }
                Err(e) => {
                    warn!(
                        attempt,
                        error = %e,
                        retry_in_secs = self.retry_interval.as_secs(),
                        "location lookup failed"
                    );
                    tokio::time::sleep(self.retry_interval).await;
                }
            }
        }
    }

    /// One resolution attempt.
    pub async fn try_resolve(&self, telemetry: &dyn TelemetrySource) -> Result<Place, EngineError> {
        let values = telemetry.get(&[LATITUDE_FIELD, LONGITUDE_FIELD]).await?;
        let field = |name: &str| {
            values
                .get(name)
                .copied()
                .ok_or_else(|| TelemetryError::MissingField(name.to_string()))
        };
        let position = Position::from_radians(field(LATITUDE_FIELD)?, field(LONGITUDE_FIELD)?);
        debug!(lat = position.latitude, lon = position.longitude, "sampled position");

        let address = self.geocoder.reverse(position).await?;
        Place::from_address(&address).ok_or(EngineError::Unresolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_core::ServiceError;
    use waypoint_services::mock::{address, MockGeocoder, MockTelemetry};

    const RETRY: Duration = Duration::from_secs(15);

    #[tokio::test]
    async fn joins_city_state_country() {
        let geocoder = Arc::new(MockGeocoder::fixed("Philadelphia", "Pennsylvania", "USA"));
        let resolver = PositionResolver::new(geocoder.clone(), RETRY);
        let telemetry = MockTelemetry::new(0.698, -1.309);

        let place = resolver.resolve(&telemetry).await;
        assert_eq!(place.as_str(), "Philadelphia, Pennsylvania, USA");

        let positions = geocoder.positions();
        assert_eq!(positions.len(), 1);
        assert!((positions[0].latitude - 40.0).abs() < 0.05);
        assert!((positions[0].longitude + 75.0).abs() < 0.05);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_every_interval_until_success() {
        let geocoder = Arc::new(MockGeocoder::new(vec![
            Err(ServiceError::Network("connection refused".into())),
            Ok(waypoint_core::Address {
                city: None,
                state: Some("Nevada".into()),
                country: Some("USA".into()),
            }),
            Err(ServiceError::Malformed("truncated".into())),
            Ok(address("Reno", "Nevada", "USA")),
        ]));
        let resolver = PositionResolver::new(geocoder.clone(), RETRY);
        let telemetry = MockTelemetry::new(0.69, -2.08);

        let start = tokio::time::Instant::now();
        let place = resolver.resolve(&telemetry).await;
        let elapsed = start.elapsed();

        assert_eq!(place.as_str(), "Reno, Nevada, USA");
        assert_eq!(geocoder.calls(), 4);
        assert!(elapsed >= RETRY * 3, "elapsed {elapsed:?}");
        assert!(elapsed < RETRY * 3 + Duration::from_secs(1), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn telemetry_failures_are_retried() {
        let geocoder = Arc::new(MockGeocoder::fixed("Reno", "Nevada", "USA"));
        let resolver = PositionResolver::new(geocoder.clone(), RETRY);
        let telemetry = MockTelemetry::new(0.69, -2.08).failing_reads(2);

        let place = resolver.resolve(&telemetry).await;
        assert_eq!(place.as_str(), "Reno, Nevada, USA");
        assert_eq!(telemetry.get_calls(), 3);
        assert_eq!(geocoder.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_waiting_while_unresolvable() {
        let geocoder = Arc::new(MockGeocoder::new(vec![Err(ServiceError::Status {
            status: 404,
            body: "Unable to geocode".into(),
        })]));
        let resolver = PositionResolver::new(geocoder.clone(), RETRY);
        let telemetry = MockTelemetry::new(0.0, -0.5);

        let outcome =
            tokio::time::timeout(Duration::from_secs(600), resolver.resolve(&telemetry)).await;
        assert!(outcome.is_err(), "resolver must not give up");
        assert!(geocoder.calls() >= 40);
    }

    #[tokio::test]
    async fn missing_city_is_unresolved() {
        let geocoder = Arc::new(MockGeocoder::new(vec![Ok(waypoint_core::Address::default())]));
        let resolver = PositionResolver::new(geocoder, RETRY);
        let telemetry = MockTelemetry::new(0.0, 0.0);

        let err = resolver.try_resolve(&telemetry).await.unwrap_err();
        assert!(matches!(err, EngineError::Unresolved));
    }
}
