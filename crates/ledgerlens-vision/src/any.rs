use crate::claude::ClaudeProvider;
use crate::error::VisionError;
use crate::gemini::GeminiProvider;
#[cfg(feature = "mock")]
use crate::mock::MockProvider;
use crate::openai::OpenAiProvider;
use crate::openrouter::OpenRouterProvider;
use crate::provider::{Document, VisionProvider};

/// Generates a match over all `AnyProvider` variants, binding the inner provider
/// and evaluating the given expression for each arm.
macro_rules! delegate_provider {
    ($self:expr, |$p:ident| $expr:expr) => {
        match $self {
            AnyProvider::OpenAi($p) => $expr,
            AnyProvider::Gemini($p) => $expr,
            AnyProvider::Claude($p) => $expr,
            AnyProvider::OpenRouter($p) => $expr,
            #[cfg(feature = "mock")]
            AnyProvider::Mock($p) => $expr,
        }
    };
}

#[derive(Debug, Clone)]
pub enum AnyProvider {
    OpenAi(OpenAiProvider),
    Gemini(GeminiProvider),
    Claude(ClaudeProvider),
    OpenRouter(OpenRouterProvider),
    #[cfg(feature = "mock")]
    Mock(MockProvider),
}

impl VisionProvider for AnyProvider {
    async fn extract(&self, document: &Document, prompt: &str) -> Result<String, VisionError> {
        delegate_provider!(self, |p| p.extract(document, prompt).await)
    }

    fn name(&self) -> &'static str {
        delegate_provider!(self, |p| p.name())
    }

    fn supports_images(&self) -> bool {
        delegate_provider!(self, |p| p.supports_images())
    }

    fn supports_pdf(&self) -> bool {
        delegate_provider!(self, |p| p.supports_pdf())
    }
}
