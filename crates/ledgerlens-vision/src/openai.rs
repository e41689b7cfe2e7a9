use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::VisionError;
use crate::http::{default_client, read_body, require_key, trim_base_url};
use crate::provider::{Document, DocumentKind, VisionProvider};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    label: &'static str,
}

impl fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("label", &self.label)
            .finish()
    }
}

impl Clone for OpenAiProvider {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            label: self.label,
        }
    }
}

impl OpenAiProvider {
    #[must_use]
    pub fn new(api_key: String, base_url: String, model: String, max_tokens: u32) -> Self {
        Self {
            client: default_client(None),
            api_key,
            base_url: trim_base_url(base_url),
            model,
            max_tokens,
            label: "openai",
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Name reported in errors and logs; OpenAI-compatible gateways reuse this adapter.
    #[must_use]
    pub(crate) fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    pub(crate) fn request(&self, document: &Document, prompt: &str) -> reqwest::RequestBuilder {
        let body = VisionChatRequest {
            model: &self.model,
            messages: vec![VisionApiMessage {
                role: "user",
                content: vec![
                    OpenAiContentPart::Text {
                        text: prompt.to_owned(),
                    },
                    document_part(document),
                ],
            }],
            max_tokens: self.max_tokens,
        };

        self.client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
    }

    pub(crate) async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<String, VisionError> {
        let response = request.send().await?;
        let text = read_body(self.label, response).await?;
        parse_chat_text(&text).ok_or(VisionError::UnexpectedFormat {
            provider: self.label,
        })
    }
}

impl VisionProvider for OpenAiProvider {
    async fn extract(&self, document: &Document, prompt: &str) -> Result<String, VisionError> {
        require_key(self.label, &self.api_key)?;
        tracing::debug!(
            provider = self.label,
            model = %self.model,
            kind = %document.kind(),
            bytes = document.data().len(),
            "submitting document"
        );
        self.send(self.request(document, prompt)).await
    }

    fn name(&self) -> &'static str {
        self.label
    }
}

fn document_part(document: &Document) -> OpenAiContentPart {
    match document.kind() {
        DocumentKind::Image => OpenAiContentPart::ImageUrl {
            image_url: ImageUrlDetail {
                url: document.to_data_uri(),
            },
        },
        DocumentKind::Pdf => OpenAiContentPart::File {
            file: FileDetail {
                filename: document.filename().to_owned(),
                file_data: document.to_data_uri(),
            },
        },
    }
}

/// Pull `choices[0].message.content` out of a chat-completion envelope.
pub(crate) fn parse_chat_text(body: &str) -> Option<String> {
    let resp: OpenAiChatResponse = serde_json::from_str(body).ok()?;
    resp.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OpenAiContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrlDetail },
    File { file: FileDetail },
}

#[derive(Serialize)]
struct ImageUrlDetail {
    url: String,
}

#[derive(Serialize)]
struct FileDetail {
    filename: String,
    file_data: String,
}

#[derive(Serialize)]
struct VisionApiMessage {
    role: &'static str,
    content: Vec<OpenAiContentPart>,
}

#[derive(Serialize)]
struct VisionChatRequest<'a> {
    model: &'a str,
    messages: Vec<VisionApiMessage>,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_provider(base_url: &str) -> OpenAiProvider {
        OpenAiProvider::new("sk-test-key".into(), base_url.into(), "gpt-4o".into(), 1024)
    }

    fn jpeg() -> Document {
        Document::new(vec![0xff, 0xd8, 0xff], "image/jpeg")
    }

    #[test]
    fn new_stores_fields() {
        let p = test_provider("https://api.openai.com/v1/");
        assert_eq!(p.api_key, "sk-test-key");
        assert_eq!(p.base_url, "https://api.openai.com/v1");
        assert_eq!(p.model, "gpt-4o");
        assert_eq!(p.max_tokens, 1024);
        assert_eq!(p.name(), "openai");
    }

    #[test]
    fn debug_redacts_api_key() {
        let debug = format!("{:?}", test_provider(DEFAULT_BASE_URL));
        assert!(!debug.contains("sk-test-key"));
        assert!(debug.contains("<redacted>"));
        assert!(debug.contains("gpt-4o"));
    }

    #[test]
    fn image_part_serializes_as_data_uri() {
        let part = document_part(&Document::new(b"abc".to_vec(), "image/png"));
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["type"], "image_url");
        assert_eq!(json["image_url"]["url"], "data:image/png;base64,YWJj");
    }

    #[test]
    fn pdf_part_serializes_as_file() {
        let doc = Document::new(b"%PDF".to_vec(), "application/pdf").with_filename("r.pdf");
        let json = serde_json::to_value(document_part(&doc)).unwrap();
        assert_eq!(json["type"], "file");
        assert_eq!(json["file"]["filename"], "r.pdf");
        assert!(
            json["file"]["file_data"]
                .as_str()
                .unwrap()
                .starts_with("data:application/pdf;base64,")
        );
    }

    #[test]
    fn parse_chat_text_reads_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"hello"}}]}"#;
        assert_eq!(parse_chat_text(body).as_deref(), Some("hello"));
    }

    #[test]
    fn parse_chat_text_empty_choices() {
        assert!(parse_chat_text(r#"{"choices":[]}"#).is_none());
        assert!(parse_chat_text(r#"{"choices":[{"message":{"content":null}}]}"#).is_none());
        assert!(parse_chat_text("not json").is_none());
    }

    #[tokio::test]
    async fn extract_returns_message_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "{\"cost\": 12.5}"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = test_provider(&server.uri())
            .extract(&jpeg(), "read this")
            .await
            .unwrap();
        assert_eq!(text, "{\"cost\": 12.5}");
    }

    #[tokio::test]
    async fn extract_embeds_error_body_on_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(401).set_body_string(r#"{"error":"invalid api key"}"#),
            )
            .mount(&server)
            .await;

        let err = test_provider(&server.uri())
            .extract(&jpeg(), "read this")
            .await
            .unwrap_err();
        match err {
            VisionError::Api {
                provider,
                status,
                body,
            } => {
                assert_eq!(provider, "openai");
                assert_eq!(status, 401);
                assert!(body.contains("invalid api key"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn extract_rejects_unexpected_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "x"})))
            .mount(&server)
            .await;

        let err = test_provider(&server.uri())
            .extract(&jpeg(), "read this")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VisionError::UnexpectedFormat { provider: "openai" }
        ));
        assert_eq!(err.to_string(), "unexpected response format from openai");
    }

    #[tokio::test]
    async fn extract_without_key_fails_before_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let p = OpenAiProvider::new(String::new(), server.uri(), "gpt-4o".into(), 64);
        let err = p.extract(&jpeg(), "read this").await.unwrap_err();
        assert!(matches!(err, VisionError::MissingCredential { .. }));
    }

    #[tokio::test]
    async fn extract_unreachable_endpoint_errors() {
        let p = test_provider("http://127.0.0.1:1");
        let err = p.extract(&jpeg(), "read this").await.unwrap_err();
        assert!(matches!(err, VisionError::Http(_)));
    }
}
