use std::fmt;

use crate::error::VisionError;
use crate::http::require_key;
use crate::openai::OpenAiProvider;
use crate::provider::{Document, VisionProvider};

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const APP_TITLE: &str = "ledgerlens";

/// OpenRouter speaks the OpenAI chat-completions dialect; only the endpoint, the
/// attribution header and the reported name differ.
pub struct OpenRouterProvider {
    inner: OpenAiProvider,
    api_key: String,
}

impl OpenRouterProvider {
    #[must_use]
    pub fn new(api_key: String, base_url: String, model: String, max_tokens: u32) -> Self {
        let inner = OpenAiProvider::new(api_key.clone(), base_url, model, max_tokens)
            .with_label("openrouter");
        Self { inner, api_key }
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.inner = self.inner.with_client(client);
        self
    }
}

impl fmt::Debug for OpenRouterProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenRouterProvider")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl Clone for OpenRouterProvider {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            api_key: self.api_key.clone(),
        }
    }
}

impl VisionProvider for OpenRouterProvider {
    async fn extract(&self, document: &Document, prompt: &str) -> Result<String, VisionError> {
        require_key(self.name(), &self.api_key)?;
        let request = self
            .inner
            .request(document, prompt)
            .header("X-Title", APP_TITLE);
        self.inner.send(request).await
    }

    fn name(&self) -> &'static str {
        "openrouter"
    }
}
