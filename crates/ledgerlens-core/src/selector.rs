//! Resolve the backend that will actually read a document.
//!
//! Images go to the requested backend or fail. PDFs prefer the requested backend but fall
//! back to the first credentialed backend in [`BackendKind::ALL`] order.

use serde::Serialize;

use ledgerlens_vision::{DocumentKind, VisionProvider};

use crate::config::{BackendKind, Config};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BackendCapability {
    pub backend: BackendKind,
    pub supports_image: bool,
    pub supports_pdf: bool,
    pub has_credential: bool,
}

impl BackendCapability {
    #[must_use]
    pub fn supports(&self, kind: DocumentKind) -> bool {
        match kind {
            DocumentKind::Image => self.supports_image,
            DocumentKind::Pdf => self.supports_pdf,
        }
    }
}

/// Capability table, one entry per backend in priority order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BackendCapabilities(Vec<BackendCapability>);

impl BackendCapabilities {
    #[must_use]
    pub fn new(entries: Vec<BackendCapability>) -> Self {
        let mut entries = entries;
        entries.sort_by_key(|c| priority(c.backend));
        Self(entries)
    }

    /// Credentials come from the config. Every backend is assumed to read images and PDFs
    /// until [`record_support`](Self::record_support) says otherwise.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self(
            BackendKind::ALL
                .into_iter()
                .map(|backend| BackendCapability {
                    backend,
                    supports_image: true,
                    supports_pdf: true,
                    has_credential: config.has_credential(backend),
                })
                .collect(),
        )
    }

    /// Take document support from the provider that serves `backend`.
    pub fn record_support(&mut self, backend: BackendKind, provider: &impl VisionProvider) {
        if let Some(cap) = self.0.iter_mut().find(|c| c.backend == backend) {
            cap.supports_image = provider.supports_images();
            cap.supports_pdf = provider.supports_pdf();
        }
    }

    #[must_use]
    pub fn get(&self, backend: BackendKind) -> Option<&BackendCapability> {
        self.0.iter().find(|c| c.backend == backend)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BackendCapability> {
        self.0.iter()
    }
}

fn priority(backend: BackendKind) -> usize {
    BackendKind::ALL
        .iter()
        .position(|k| *k == backend)
        .unwrap_or(usize::MAX)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("unknown backend '{0}'; choose one of openai, gemini, claude or openrouter")]
    UnknownBackend(String),

    #[error(
        "{} API key is not configured; set {}",
        .backend.display_name(),
        .backend.api_key_var()
    )]
    MissingCredential { backend: BackendKind },

    #[error(
        "no vision backend is configured for PDF documents; configure an API key for one of \
         OpenAI (LEDGERLENS_OPENAI_API_KEY), Gemini (LEDGERLENS_GEMINI_API_KEY), \
         Claude (LEDGERLENS_CLAUDE_API_KEY) or OpenRouter (LEDGERLENS_OPENROUTER_API_KEY)"
    )]
    NoCapableBackend,
}

/// Outcome of backend resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub backend: BackendKind,
    /// Set when a PDF was routed away from the requested backend.
    pub fell_back: bool,
}

/// Pick the effective backend for a document.
///
/// An empty `requested` name means `default_backend`.
///
/// # Errors
///
/// Images fail with [`SelectionError::UnknownBackend`] or
/// [`SelectionError::MissingCredential`]; PDFs only fail with
/// [`SelectionError::NoCapableBackend`].
pub fn select_backend(
    kind: DocumentKind,
    requested: &str,
    default_backend: BackendKind,
    capabilities: &BackendCapabilities,
) -> Result<Selection, SelectionError> {
    let requested = requested.trim();
    let parsed = if requested.is_empty() {
        Ok(default_backend)
    } else {
        requested.parse::<BackendKind>()
    };

    match kind {
        DocumentKind::Image => {
            let backend =
                parsed.map_err(|_| SelectionError::UnknownBackend(requested.to_owned()))?;
            let usable = capabilities
                .get(backend)
                .is_some_and(|c| c.has_credential && c.supports_image);
            if !usable {
                return Err(SelectionError::MissingCredential { backend });
            }
            Ok(Selection {
                backend,
                fell_back: false,
            })
        }
        DocumentKind::Pdf => {
            if let Ok(backend) = parsed
                && capabilities
                    .get(backend)
                    .is_some_and(|c| c.has_credential && c.supports_pdf)
            {
                return Ok(Selection {
                    backend,
                    fell_back: false,
                });
            }
            let fallback = capabilities
                .iter()
                .find(|c| c.has_credential && c.supports_pdf)
                .map(|c| c.backend)
                .ok_or(SelectionError::NoCapableBackend)?;
            tracing::info!(
                requested,
                backend = %fallback,
                "PDF routed to fallback backend"
            );
            Ok(Selection {
                backend: fallback,
                fell_back: true,
            })
        }
    }
}
