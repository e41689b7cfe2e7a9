//! Test-only scripted vision provider.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::VisionError;
use crate::provider::{Document, DocumentKind, VisionProvider};

/// One scripted answer: either the raw text or an error message.
pub type MockReply = Result<String, String>;

#[derive(Debug, Clone)]
pub struct MockProvider {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    calls: Arc<AtomicUsize>,
    prompts: Arc<Mutex<Vec<String>>>,
    pub default_response: String,
    pub fail_all: bool,
    pub supports_pdf: bool,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(AtomicUsize::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
            default_response: "mock response".into(),
            fail_all: false,
            supports_pdf: true,
        }
    }
}

impl MockProvider {
    #[must_use]
    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            ..Self::default()
        }
    }

    /// Replies are consumed in order; once exhausted the default response is used.
    #[must_use]
    pub fn with_replies(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    /// Advertise and enforce image-only support.
    #[must_use]
    pub fn without_pdf(mut self) -> Self {
        self.supports_pdf = false;
        self
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received so far, in call order.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl VisionProvider for MockProvider {
    async fn extract(&self, document: &Document, prompt: &str) -> Result<String, VisionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_owned());
        }
        if document.kind() == DocumentKind::Pdf && !self.supports_pdf {
            return Err(VisionError::UnsupportedDocument {
                provider: "mock",
                mime_type: document.mime_type().to_owned(),
            });
        }
        if self.fail_all {
            return Err(VisionError::Other("mock vision error".into()));
        }
        let next = self.replies.lock().ok().and_then(|mut r| r.pop_front());
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(VisionError::Other(message)),
            None => Ok(self.default_response.clone()),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }

    fn supports_pdf(&self) -> bool {
        self.supports_pdf
    }
}
