//! Uploaded files and their document formats.

use std::fmt;
use std::path::Path;

use ledgerlens_vision::{Document, DocumentKind};
use serde::{Deserialize, Serialize};

/// Extensions accepted for receipts, compared case-insensitively.
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "pdf"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Jpeg,
    Png,
    Gif,
    Pdf,
}

impl DocumentFormat {
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    #[must_use]
    pub fn from_filename(filename: &str) -> Option<Self> {
        Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Pdf => ledgerlens_vision::provider::PDF_MIME_TYPE,
        }
    }

    #[must_use]
    pub fn kind(self) -> DocumentKind {
        match self {
            Self::Pdf => DocumentKind::Pdf,
            Self::Jpeg | Self::Png | Self::Gif => DocumentKind::Image,
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// A file received from the caller, before any validation.
#[derive(Clone)]
pub struct UploadedFile {
    pub buffer: Vec<u8>,
    pub original_filename: String,
}

impl UploadedFile {
    #[must_use]
    pub fn new(buffer: Vec<u8>, original_filename: impl Into<String>) -> Self {
        Self {
            buffer,
            original_filename: original_filename.into(),
        }
    }

    /// Read a file from disk, keeping only its final path component as the name.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let buffer = std::fs::read(path)?;
        Ok(Self {
            buffer,
            original_filename: file_label(path),
        })
    }

    #[must_use]
    pub fn format(&self) -> Option<DocumentFormat> {
        DocumentFormat::from_filename(&self.original_filename)
    }

    /// Wrap the bytes for a vision backend. `None` when the extension is not allowed.
    #[must_use]
    pub fn to_document(&self) -> Option<Document> {
        let format = self.format()?;
        Some(
            Document::new(self.buffer.clone(), format.mime_type())
                .with_filename(self.original_filename.clone()),
        )
    }
}

impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("len", &self.buffer.len())
            .field("original_filename", &self.original_filename)
            .finish()
    }
}

/// Final path component, or the whole path when there is none.
pub(crate) fn file_label(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}
