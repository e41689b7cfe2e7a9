#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} API key is not configured")]
    MissingCredential { provider: &'static str },

    #[error("{provider} API request failed (status {status}): {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("unexpected response format from {provider}")]
    UnexpectedFormat { provider: &'static str },

    #[error("{provider} cannot read {mime_type} documents")]
    UnsupportedDocument {
        provider: &'static str,
        mime_type: String,
    },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, VisionError>;
