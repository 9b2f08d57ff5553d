use std::sync::Arc;

use tracing::{debug, instrument};
use waypoint_core::{CompletionProvider, ContentItem, Place};

use crate::error::EngineError;
use crate::parse::parse_completion;
use crate::prompts::{build_prompt_set, Prompt};
use crate::settle::settle_all;

/// Fans the prompt set for a place out to the completion service.
pub struct ContentGenerator {
    provider: Arc<dyn CompletionProvider>,
}

impl ContentGenerator {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    /// Generate content for `place`. Failed prompts are dropped; the result
    /// may be empty.
    #[instrument(skip(self), fields(provider = self.provider.name(), model = self.provider.model()))]
    pub async fn generate(&self, place: &Place) -> Vec<ContentItem> {
        self.generate_from(&build_prompt_set(place)).await
    }

    /// Run an explicit prompt list. Items keep prompt order; list answers are
    /// flattened in place.
    pub async fn generate_from(&self, prompts: &[Prompt]) -> Vec<ContentItem> {
        let settled = settle_all(prompts.iter().map(|prompt| self.run_prompt(prompt))).await;
        debug!(
            prompts = settled.len(),
            failed = settled.failures(),
            "content prompts settled"
        );
        settled.successes("generate").into_iter().flatten().collect()
    }

    async fn run_prompt(&self, prompt: &Prompt) -> Result<Vec<ContentItem>, EngineError> {
        let raw = self.provider.complete(&prompt.text).await?;
        let items = parse_completion(&raw, &prompt.contract)?;
        debug!(prompt = %prompt.label(), items = items.len(), "prompt answered");
        Ok(items)
    }
}
