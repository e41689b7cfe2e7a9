//! Single-document extraction: select, prompt, call, parse.

use std::collections::HashMap;

use serde::Serialize;

use ledgerlens_vision::claude::ClaudeProvider;
use ledgerlens_vision::gemini::GeminiProvider;
use ledgerlens_vision::openai::OpenAiProvider;
use ledgerlens_vision::openrouter::OpenRouterProvider;
use ledgerlens_vision::{AnyProvider, Document, DocumentKind, VisionProvider};

use crate::config::{BackendKind, Config};
use crate::error::PipelineError;
use crate::extract::{ExtractedFields, Strategy, try_extract};
use crate::odometer::{OdometerResult, normalize_reading};
use crate::prompt::{Template, build_prompt};
use crate::selector::{BackendCapabilities, Selection, SelectionError, select_backend};

/// One document to read.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub document: Document,
    pub template: Template,
    /// Backend name as given by the caller; empty means the configured default.
    pub requested_backend: String,
}

impl ExtractionRequest {
    #[must_use]
    pub fn new(document: Document, template: Template) -> Self {
        Self {
            document,
            template,
            requested_backend: String::new(),
        }
    }

    #[must_use]
    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.requested_backend = backend.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<ExtractedFields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendKind>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl ExtractionResult {
    fn failure(error: &PipelineError) -> Self {
        Self {
            success: false,
            raw_text: None,
            fields: None,
            error: Some(error.to_string()),
            backend: error.backend_kind(),
            notes: Vec::new(),
        }
    }
}

/// Backends, credentials and defaults, fixed at construction.
#[derive(Debug, Clone)]
pub struct ExtractionPipeline {
    providers: HashMap<BackendKind, AnyProvider>,
    capabilities: BackendCapabilities,
    default_backend: BackendKind,
    default_template: Template,
}

impl ExtractionPipeline {
    /// Build one provider per credentialed backend, all sharing a single HTTP client.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let client = ledgerlens_vision::http::default_client(config.timeout());
        let mut providers = HashMap::new();

        for kind in config.configured_backends() {
            let Some(api_key) = config.api_key(kind).map(str::to_owned) else {
                continue;
            };
            let settings = config.provider(kind).clone();
            let provider = match kind {
                BackendKind::OpenAi => AnyProvider::OpenAi(
                    OpenAiProvider::new(
                        api_key,
                        settings.base_url,
                        settings.model,
                        settings.max_tokens,
                    )
                    .with_client(client.clone()),
                ),
                BackendKind::Gemini => AnyProvider::Gemini(
                    GeminiProvider::new(
                        api_key,
                        settings.base_url,
                        settings.model,
                        settings.max_tokens,
                    )
                    .with_client(client.clone()),
                ),
                BackendKind::Claude => AnyProvider::Claude(
                    ClaudeProvider::new(
                        api_key,
                        settings.base_url,
                        settings.model,
                        settings.max_tokens,
                    )
                    .with_client(client.clone()),
                ),
                BackendKind::OpenRouter => AnyProvider::OpenRouter(
                    OpenRouterProvider::new(
                        api_key,
                        settings.base_url,
                        settings.model,
                        settings.max_tokens,
                    )
                    .with_client(client.clone()),
                ),
            };
            providers.insert(kind, provider);
        }

        let mut capabilities = BackendCapabilities::from_config(config);
        for (kind, provider) in &providers {
            capabilities.record_support(*kind, provider);
        }

        tracing::debug!(backends = providers.len(), "extraction pipeline ready");

        Self {
            providers,
            capabilities,
            default_backend: config.extraction.default_backend,
            default_template: config.extraction.default_template,
        }
    }

    /// Replace the provider serving `kind`. Credentials still come from the config;
    /// document support comes from the new provider.
    #[must_use]
    pub fn with_provider(mut self, kind: BackendKind, provider: AnyProvider) -> Self {
        self.capabilities.record_support(kind, &provider);
        self.providers.insert(kind, provider);
        self
    }

    #[must_use]
    pub fn capabilities(&self) -> &BackendCapabilities {
        &self.capabilities
    }

    #[must_use]
    pub fn default_template(&self) -> Template {
        self.default_template
    }

    /// Resolve the backend for a document kind and caller-supplied name.
    ///
    /// # Errors
    ///
    /// See [`select_backend`].
    pub fn select(
        &self,
        kind: DocumentKind,
        requested: &str,
    ) -> Result<Selection, SelectionError> {
        select_backend(kind, requested, self.default_backend, &self.capabilities)
    }

    /// Read a receipt. Never fails; problems are reported inside the result.
    pub async fn extract(&self, request: &ExtractionRequest) -> ExtractionResult {
        match self.run(request).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(
                    requested = %request.requested_backend,
                    kind = %request.document.kind(),
                    filename = request.document.filename(),
                    "extraction failed: {e}"
                );
                ExtractionResult::failure(&e)
            }
        }
    }

    /// Read a receipt, surfacing configuration and backend failures as typed errors.
    ///
    /// An answer with no recognizable fields is still `Ok`, with empty fields and a note.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] when no backend can take the document and
    /// [`PipelineError::Backend`] when the provider call fails.
    pub async fn run(
        &self,
        request: &ExtractionRequest,
    ) -> Result<ExtractionResult, PipelineError> {
        let selection = self.select(request.document.kind(), &request.requested_backend)?;
        let backend = selection.backend;

        tracing::info!(
            backend = %backend,
            template = %request.template,
            filename = request.document.filename(),
            "extracting document"
        );

        let raw = self
            .call(backend, &request.document, build_prompt(request.template))
            .await?;

        let mut notes = Vec::new();
        if selection.fell_back {
            notes.push(self.fallback_note(&request.requested_backend, backend));
        }

        let fields = match try_extract(&raw) {
            Ok(extraction) => {
                if extraction.strategy == Strategy::Pattern {
                    notes.push(
                        "response carried no usable JSON; fields were recovered by pattern matching"
                            .to_owned(),
                    );
                }
                extraction.fields
            }
            Err(ambiguity) => {
                tracing::info!(backend = %backend, "no fields recognized: {ambiguity}");
                notes.push(ambiguity.to_string());
                ExtractedFields::default()
            }
        };

        tracing::info!(
            backend = %backend,
            populated = fields.populated_count(),
            "extraction complete"
        );

        Ok(ExtractionResult {
            success: true,
            raw_text: Some(raw),
            fields: Some(fields),
            error: None,
            backend: Some(backend),
            notes,
        })
    }

    /// Read an odometer photo. Never fails; problems are reported inside the result.
    pub async fn read_odometer(
        &self,
        document: &Document,
        requested_backend: &str,
    ) -> OdometerResult {
        let backend = match self.select(document.kind(), requested_backend) {
            Ok(selection) => selection.backend,
            Err(e) => {
                tracing::warn!(requested = requested_backend, "backend selection failed: {e}");
                return OdometerResult::failure(e.to_string(), None);
            }
        };

        tracing::info!(backend = %backend, filename = document.filename(), "reading odometer");

        match self
            .call(backend, document, build_prompt(Template::Odometer))
            .await
        {
            Ok(raw) => {
                let result = normalize_reading(&raw);
                if !result.success {
                    tracing::warn!(backend = %backend, raw_text = %raw, "no reading in response");
                }
                result
            }
            Err(e) => {
                tracing::warn!(backend = %backend, "odometer read failed: {e}");
                OdometerResult::failure(e.to_string(), None)
            }
        }
    }

    async fn call(
        &self,
        backend: BackendKind,
        document: &Document,
        prompt: &str,
    ) -> Result<String, PipelineError> {
        let provider = self
            .providers
            .get(&backend)
            .ok_or(SelectionError::MissingCredential { backend })?;
        provider
            .extract(document, prompt)
            .await
            .map_err(|e| PipelineError::backend(backend, e))
    }

    fn fallback_note(&self, requested: &str, used: BackendKind) -> String {
        let requested = requested.trim();
        if requested.is_empty() {
            format!(
                "default backend {} is not configured for PDF documents; used {used}",
                self.default_backend
            )
        } else {
            format!("requested backend '{requested}' cannot read this PDF; used {used}")
        }
    }
}
