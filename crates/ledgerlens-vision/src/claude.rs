use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::VisionError;
use crate::http::{default_client, read_body, require_key, trim_base_url};
use crate::provider::{Document, DocumentKind, VisionProvider};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct ClaudeProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl fmt::Debug for ClaudeProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaudeProvider")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl Clone for ClaudeProvider {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
        }
    }
}

impl ClaudeProvider {
    #[must_use]
    pub fn new(api_key: String, base_url: String, model: String, max_tokens: u32) -> Self {
        Self {
            client: default_client(None),
            api_key,
            base_url: trim_base_url(base_url),
            model,
            max_tokens,
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn build_request(&self, document: &Document, prompt: &str) -> reqwest::RequestBuilder {
        // Document block goes first, instruction second.
        let body = RequestBody {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![ApiMessage {
                role: "user",
                content: vec![
                    content_block(document),
                    ContentBlock::Text {
                        text: prompt.to_owned(),
                    },
                ],
            }],
        };

        self.client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
    }
}

impl VisionProvider for ClaudeProvider {
    async fn extract(&self, document: &Document, prompt: &str) -> Result<String, VisionError> {
        require_key("claude", &self.api_key)?;
        tracing::debug!(
            model = %self.model,
            kind = %document.kind(),
            bytes = document.data().len(),
            "submitting document to Claude"
        );

        let response = self.build_request(document, prompt).send().await?;
        let text = read_body("claude", response).await?;

        parse_message_text(&text).ok_or(VisionError::UnexpectedFormat { provider: "claude" })
    }

    fn name(&self) -> &'static str {
        "claude"
    }
}

fn content_block(document: &Document) -> ContentBlock {
    let source = Base64Source {
        source_type: "base64",
        media_type: document.mime_type().to_owned(),
        data: document.to_base64(),
    };
    match document.kind() {
        DocumentKind::Image => ContentBlock::Image { source },
        DocumentKind::Pdf => ContentBlock::Document { source },
    }
}

/// First `text` block of a Messages API response.
fn parse_message_text(body: &str) -> Option<String> {
    let resp: ApiResponse = serde_json::from_str(body).ok()?;
    resp.content
        .into_iter()
        .find(|block| block.block_type == "text")
        .and_then(|block| block.text)
}

#[derive(Serialize)]
struct RequestBody<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ApiMessage>,
}

#[derive(Serialize)]
struct ApiMessage {
    role: &'static str,
    content: Vec<ContentBlock>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    Image { source: Base64Source },
    Document { source: Base64Source },
}

#[derive(Serialize)]
struct Base64Source {
    #[serde(rename = "type")]
    source_type: &'static str,
    media_type: String,
    data: String,
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}
