use ledgerlens_vision::VisionError;

use crate::config::BackendKind;
use crate::selector::SelectionError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// No usable backend: missing credential, unknown name or nothing PDF-capable.
    #[error(transparent)]
    Configuration(#[from] SelectionError),

    /// The provider call failed or answered with an unreadable envelope.
    #[error("{backend} extraction failed: {source}")]
    Backend {
        backend: BackendKind,
        #[source]
        source: VisionError,
    },

    #[error("unsupported file type '{filename}'; allowed extensions are jpg, jpeg, png, gif, pdf")]
    UnsupportedFile { filename: String },

    #[error("failed to read '{filename}': {source}")]
    Read {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    /// A required expense field is still missing after defaults were applied.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl PipelineError {
    #[must_use]
    pub fn backend(backend: BackendKind, source: VisionError) -> Self {
        Self::Backend { backend, source }
    }

    /// Backend that was called when the error happened, if any.
    #[must_use]
    pub fn backend_kind(&self) -> Option<BackendKind> {
        match self {
            Self::Backend { backend, .. } => Some(*backend),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_embeds_provider_body() {
        let err = PipelineError::backend(
            BackendKind::OpenAi,
            VisionError::Api {
                provider: "openai",
                status: 429,
                body: "{\"error\":\"rate limited\"}".into(),
            },
        );
        let msg = err.to_string();
        assert!(msg.starts_with("openai extraction failed"));
        assert!(msg.contains("429"));
        assert!(msg.contains("rate limited"));
        assert_eq!(err.backend_kind(), Some(BackendKind::OpenAi));
    }

    #[test]
    fn configuration_error_keeps_remediation_hint() {
        let err: PipelineError = SelectionError::MissingCredential {
            backend: BackendKind::Gemini,
        }
        .into();
        assert!(err.to_string().contains("LEDGERLENS_GEMINI_API_KEY"));
    }

    #[test]
    fn unsupported_file_lists_allowed_extensions() {
        let err = PipelineError::UnsupportedFile {
            filename: "notes.txt".into(),
        };
        assert!(err.to_string().contains("'notes.txt'"));
        assert!(err.to_string().contains("jpg, jpeg, png, gif, pdf"));
    }
}
