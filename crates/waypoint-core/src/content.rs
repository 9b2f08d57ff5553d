use serde::{Deserialize, Serialize};

/// A titled piece of generated content about a place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub title: String,
    pub description: String,
}

impl ContentItem {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

/// A content item joined with the images found for its title.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedFact {
    pub title: String,
    pub description: String,
    pub images: Vec<String>,
}

impl EnrichedFact {
    /// Join items with image batches by index. A missing batch becomes an empty list.
    pub fn join(items: Vec<ContentItem>, images: Vec<Vec<String>>) -> Vec<Self> {
        let mut images = images.into_iter();
        items
            .into_iter()
            .map(|item| Self {
                title: item.title,
                description: item.description,
                images: images.next().unwrap_or_default(),
            })
            .collect()
    }
}
