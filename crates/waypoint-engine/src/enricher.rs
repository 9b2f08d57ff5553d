use std::sync::Arc;

use waypoint_core::ImageSearch;

use crate::settle::settle_all;

/// Looks up images for content titles, one concurrent search per title.
pub struct ImageEnricher {
    search: Arc<dyn ImageSearch>,
    limit: usize,
}

impl ImageEnricher {
    pub fn new(search: Arc<dyn ImageSearch>, limit: usize) -> Self {
        Self { search, limit }
    }

    /// One image list per title, same order. A failed lookup yields `[]`.
    pub async fn enrich(&self, titles: &[String]) -> Vec<Vec<String>> {
        settle_all(titles.iter().map(|title| self.search.search(title, self.limit)))
            .await
            .or_default("enrich")
    }
}
