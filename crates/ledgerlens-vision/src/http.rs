//! Shared HTTP client construction and response handling for all providers.

use std::time::Duration;

use crate::error::VisionError;

/// Create the HTTP client shared by every provider.
///
/// Only the user-agent and redirect limit are fixed; a request timeout is applied when
/// the operator configures one, otherwise reqwest's defaults hold.
#[must_use]
pub fn default_client(timeout: Option<Duration>) -> reqwest::Client {
    let mut builder = reqwest::Client::builder()
        .user_agent(concat!("ledgerlens/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(10));
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().unwrap_or_else(|e| {
        tracing::warn!("falling back to default HTTP client: {e}");
        reqwest::Client::new()
    })
}

/// Read the body of a provider response, turning non-2xx statuses into
/// [`VisionError::Api`] with the provider's own error body attached.
pub(crate) async fn read_body(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<String, VisionError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        tracing::error!("{provider} API error {status}: {text}");
        return Err(VisionError::Api {
            provider,
            status: status.as_u16(),
            body: text,
        });
    }

    tracing::debug!(provider, raw_response = %text, "vision provider response");
    Ok(text)
}

/// Guard shared by every adapter: an empty key fails before any request is built.
pub(crate) fn require_key(provider: &'static str, api_key: &str) -> Result<(), VisionError> {
    if api_key.trim().is_empty() {
        return Err(VisionError::MissingCredential { provider });
    }
    Ok(())
}

pub(crate) fn trim_base_url(mut base_url: String) -> String {
    while base_url.ends_with('/') {
        base_url.pop();
    }
    base_url
}
