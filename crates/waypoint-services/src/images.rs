use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::instrument;
use waypoint_core::{ImageSearch, ServiceError};
use waypoint_settings::ImageSettings;

/// Hard cap on images returned for one title.
pub const MAX_IMAGES: usize = 5;

/// Image lookup against the MediaWiki API of Wikimedia Commons.
pub struct CommonsImageSearch {
    client: Client,
    base_url: String,
}

impl CommonsImageSearch {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("Waypoint/1.0")
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn from_settings(settings: &ImageSettings) -> Self {
        Self::new(settings.base_url.clone(), Duration::from_secs(settings.timeout_secs))
    }
}

#[async_trait]
impl ImageSearch for CommonsImageSearch {
    #[instrument(skip(self))]
    async fn search(&self, title: &str, limit: usize) -> Result<Vec<String>, ServiceError> {
        let limit = limit.min(MAX_IMAGES);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("action", "query".to_string()),
                ("format", "json".to_string()),
                ("generator", "search".to_string()),
                ("gsrnamespace", "6".to_string()),
                ("gsrsearch", format!("{title} filetype:image")),
                ("gsrlimit", limit.to_string()),
                ("prop", "imageinfo".to_string()),
                ("iiprop", "url".to_string()),
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
        Ok(extract_image_urls(&body, limit))
    }
}

/// Collect `imageinfo[0].url` from every page, in search-rank order.
///
/// A body without `query.pages` means no hits.
fn extract_image_urls(body: &serde_json::Value, limit: usize) -> Vec<String> {
    let Some(pages) = body.pointer("/query/pages").and_then(serde_json::Value::as_object) else {
        return Vec::new();
    };

    let mut ranked: Vec<(u64, String)> = pages
        .values()
        .filter_map(|page| {
            let url = page.pointer("/imageinfo/0/url")?.as_str()?.to_string();
            let index = page["index"].as_u64().unwrap_or(u64::MAX);
            Some((index, url))
        })
        .collect();
    ranked.sort_by_key(|(index, _)| *index);
    ranked.into_iter().take(limit).map(|(_, url)| url).collect()
}
