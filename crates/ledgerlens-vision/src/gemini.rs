use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::VisionError;
use crate::http::{default_client, read_body, require_key, trim_base_url};
use crate::provider::{Document, VisionProvider};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl Clone for GeminiProvider {
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

impl GeminiProvider {
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

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn build_request(&self, document: &Document, prompt: &str) -> reqwest::RequestBuilder {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::Text {
                        text: prompt.to_owned(),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: document.mime_type().to_owned(),
                            data: document.to_base64(),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: self.max_tokens,
            },
        };

        self.client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
    }
}

impl VisionProvider for GeminiProvider {
    async fn extract(&self, document: &Document, prompt: &str) -> Result<String, VisionError> {
        require_key("gemini", &self.api_key)?;
        tracing::debug!(
            model = %self.model,
            kind = %document.kind(),
            bytes = document.data().len(),
            "submitting document to Gemini"
        );

        let response = self.build_request(document, prompt).send().await?;
        let text = read_body("gemini", response).await?;

        parse_candidate_text(&text).ok_or(VisionError::UnexpectedFormat { provider: "gemini" })
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

/// `candidates[0].content.parts[0].text`
fn parse_candidate_text(body: &str) -> Option<String> {
    let resp: GenerateContentResponse = serde_json::from_str(body).ok()?;
    resp.candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .next()?
        .text
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_provider(base_url: &str) -> GeminiProvider {
        GeminiProvider::new(
            "AIza-test".into(),
            base_url.into(),
            "gemini-2.0-flash".into(),
            1024,
        )
    }

    #[test]
    fn endpoint_includes_model() {
        assert_eq!(
            test_provider("https://example.com/v1beta/").endpoint(),
            "https://example.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn debug_redacts_api_key() {
        let debug = format!("{:?}", test_provider(DEFAULT_BASE_URL));
        assert!(!debug.contains("AIza-test"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn request_serializes_inline_data_in_camel_case() {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::Text { text: "p".into() },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: "application/pdf".into(),
                            data: "AAA=".into(),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: 64,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "p");
        assert_eq!(
            json["contents"][0]["parts"][1]["inlineData"]["mimeType"],
            "application/pdf"
        );
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 64);
    }

    #[test]
    fn parse_candidate_text_reads_first_part() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"first"},{"text":"second"}]}}]}"#;
        assert_eq!(parse_candidate_text(body).as_deref(), Some("first"));
    }

    #[test]
    fn parse_candidate_text_handles_blocked_response() {
        let body = r#"{"candidates":[{"finishReason":"SAFETY"}]}"#;
        assert!(parse_candidate_text(body).is_none());
        assert!(parse_candidate_text(r#"{"promptFeedback":{}}"#).is_none());
    }

    #[tokio::test]
    async fn extract_posts_generate_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.0-flash:generateContent"))
            .and(header("x-goog-api-key", "AIza-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": "gemini says hi"}]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let doc = Document::new(b"%PDF".to_vec(), "application/pdf");
        let text = test_provider(&server.uri())
            .extract(&doc, "read")
            .await
            .unwrap();
        assert_eq!(text, "gemini says hi");
    }

    #[tokio::test]
    async fn extract_reports_unexpected_format() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": []
            })))
            .mount(&server)
            .await;

        let doc = Document::new(vec![1], "image/jpeg");
        let err = test_provider(&server.uri())
            .extract(&doc, "read")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VisionError::UnexpectedFormat { provider: "gemini" }
        ));
    }
}
