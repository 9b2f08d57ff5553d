//! Settings sections. Every field has a compiled default so a partial
//! settings file only needs to name what it changes.

use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WaypointSettings {
    pub server: ServerSettings,
    pub refresh: RefreshSettings,
    pub bridge: BridgeSettings,
    pub geocoder: GeocoderSettings,
    pub completion: CompletionSettings,
    pub images: ImageSettings,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Outbound frames buffered per viewer. A full queue makes the refresh
    /// loop wait for the writer.
    pub max_send_queue: usize,
    pub heartbeat_interval_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            max_send_queue: 64,
            heartbeat_interval_secs: 30,
        }
    }
}

/// Timing of the per-session refresh loop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RefreshSettings {
    /// Pause between the end of one cycle and the next.
    pub idle_interval_secs: u64,
    /// How often a paused (reading) session re-checks its flag.
    pub reading_recheck_secs: u64,
    /// Backoff between failed position resolutions.
    pub resolve_retry_secs: u64,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            idle_interval_secs: 30,
            reading_recheck_secs: 5,
            resolve_retry_secs: 15,
        }
    }
}

/// Floor for every refresh timing; zero would spin the loop.
const MIN_REFRESH_SECS: u64 = 1;

impl RefreshSettings {
    pub fn idle_interval(&self) -> Duration {
        Duration::from_secs(self.idle_interval_secs.max(MIN_REFRESH_SECS))
    }

    pub fn reading_recheck(&self) -> Duration {
        Duration::from_secs(self.reading_recheck_secs.max(MIN_REFRESH_SECS))
    }

    pub fn resolve_retry(&self) -> Duration {
        Duration::from_secs(self.resolve_retry_secs.max(MIN_REFRESH_SECS))
    }
}

/// Simulator bridge connection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BridgeSettings {
    pub url: String,
    pub retry_interval_ms: u64,
    /// `None` retries forever.
    pub max_retries: Option<u32>,
    pub timeout_secs: u64,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8500".into(),
            retry_interval_ms: 10,
            max_retries: None,
            timeout_secs: 5,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeocoderSettings {
    pub base_url: String,
    /// Never written back out; only read from the file or environment.
    #[serde(skip_serializing)]
    pub api_key: Option<SecretString>,
    pub timeout_secs: u64,
}

impl Default for GeocoderSettings {
    fn default() -> Self {
        Self {
            base_url: "https://us1.locationiq.com/v1".into(),
            api_key: None,
            timeout_secs: 15,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompletionSettings {
    pub base_url: String,
    pub provider: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:1337/v1".into(),
            provider: "OpenaiChat".into(),
            model: "gpt-3.5-turbo".into(),
            timeout_secs: 120,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImageSettings {
    pub base_url: String,
    /// Maximum images per title (capped at 5).
    pub limit: usize,
    pub timeout_secs: u64,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            base_url: "https://commons.wikimedia.org/w/api.php".into(),
            limit: 5,
            timeout_secs: 15,
        }
    }
}
