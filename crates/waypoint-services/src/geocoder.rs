use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;
use waypoint_core::{Address, Geocoder, Position, ServiceError};
use waypoint_settings::GeocoderSettings;

/// LocationIQ reverse geocoder.
pub struct LocationIqGeocoder {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

impl LocationIqGeocoder {
    pub fn new(base_url: impl Into<String>, api_key: SecretString, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("Waypoint/1.0")
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn from_settings(settings: &GeocoderSettings) -> Self {
        let key = settings
            .api_key
            .clone()
            .unwrap_or_else(|| SecretString::from(""));
        Self::new(
            settings.base_url.clone(),
            key,
            Duration::from_secs(settings.timeout_secs),
        )
    }
}

#[async_trait]
impl Geocoder for LocationIqGeocoder {
    #[instrument(skip(self), fields(lat = position.latitude, lon = position.longitude))]
    async fn reverse(&self, position: Position) -> Result<Address, ServiceError> {
        let response = self
            .client
            .get(format!("{}/reverse", self.base_url))
            .query(&[
                ("key", self.api_key.expose_secret().to_string()),
                ("lat", position.latitude.to_string()),
                ("lon", position.longitude.to_string()),
                ("format", "json".to_string()),
            ])
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::from_status(status.as_u16(), body));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ServiceError::Malformed(e.to_string()))?;
        parse_address(body)
    }
}

fn parse_address(mut body: serde_json::Value) -> Result<Address, ServiceError> {
    let address = body
        .get_mut("address")
        .map(serde_json::Value::take)
        .ok_or(ServiceError::MissingField("address"))?;
    Ok(serde_json::from_value(address)?)
}
