use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use crate::error::VisionError;

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Coarse document class used for backend selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Image,
    Pdf,
}

impl DocumentKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Pdf => "pdf",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw document bytes plus the MIME type the provider is told about.
#[derive(Clone)]
pub struct Document {
    data: Vec<u8>,
    mime_type: String,
    filename: Option<String>,
}

impl Document {
    #[must_use]
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
            filename: None,
        }
    }

    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Filename sent with PDF uploads; providers require one for file parts.
    #[must_use]
    pub fn filename(&self) -> &str {
        self.filename.as_deref().unwrap_or(match self.kind() {
            DocumentKind::Pdf => "document.pdf",
            DocumentKind::Image => "image",
        })
    }

    #[must_use]
    pub fn kind(&self) -> DocumentKind {
        if self.mime_type.eq_ignore_ascii_case(PDF_MIME_TYPE) {
            DocumentKind::Pdf
        } else {
            DocumentKind::Image
        }
    }

    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }

    #[must_use]
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("len", &self.data.len())
            .field("mime_type", &self.mime_type)
            .field("filename", &self.filename)
            .finish()
    }
}

pub trait VisionProvider: Send + Sync {
    /// Submit a document together with an instruction prompt and return the model's text.
    ///
    /// Exactly one request is issued; failures are never retried.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential is missing, the provider answers with a non-2xx
    /// status, or the response envelope does not carry a text field.
    fn extract(
        &self,
        document: &Document,
        prompt: &str,
    ) -> impl Future<Output = Result<String, VisionError>> + Send;

    fn name(&self) -> &'static str;

    fn supports_images(&self) -> bool {
        true
    }

    fn supports_pdf(&self) -> bool {
        true
    }
}
