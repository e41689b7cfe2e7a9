mod env;
mod types;

#[cfg(test)]
mod tests;

pub use types::*;

use std::path::Path;
use std::time::Duration;

use anyhow::Context;

use crate::vault::{Secret, VaultProvider};

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Resolve backend API keys through the vault.
    ///
    /// Blank values are treated as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the vault backend fails.
    pub async fn resolve_secrets(&mut self, vault: &dyn VaultProvider) -> anyhow::Result<()> {
        for kind in BackendKind::ALL {
            if let Some(val) = vault.get_secret(kind.api_key_var()).await? {
                let secret = Secret::new(val);
                if secret.is_blank() {
                    continue;
                }
                self.secrets.api_keys.insert(kind, secret);
            }
        }
        tracing::debug!(
            configured = ?self.configured_backends(),
            "resolved backend credentials"
        );
        Ok(())
    }

    /// Reject settings no backend call could succeed with.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first offending provider section.
    pub fn validate(&self) -> anyhow::Result<()> {
        for kind in BackendKind::ALL {
            let provider = self.provider(kind);
            if provider.model.trim().is_empty() {
                anyhow::bail!("[{kind}] model must not be empty");
            }
            if provider.base_url.trim().is_empty() {
                anyhow::bail!("[{kind}] base_url must not be empty");
            }
            if provider.max_tokens == 0 {
                anyhow::bail!("[{kind}] max_tokens must be greater than zero");
            }
        }
        if self.extraction.timeout_secs == Some(0) {
            anyhow::bail!("[extraction] timeout_secs must be greater than zero");
        }
        Ok(())
    }

    #[must_use]
    pub fn provider(&self, kind: BackendKind) -> &ProviderConfig {
        match kind {
            BackendKind::OpenAi => &self.openai,
            BackendKind::Gemini => &self.gemini,
            BackendKind::Claude => &self.claude,
            BackendKind::OpenRouter => &self.openrouter,
        }
    }

    pub(crate) fn provider_mut(&mut self, kind: BackendKind) -> &mut ProviderConfig {
        match kind {
            BackendKind::OpenAi => &mut self.openai,
            BackendKind::Gemini => &mut self.gemini,
            BackendKind::Claude => &mut self.claude,
            BackendKind::OpenRouter => &mut self.openrouter,
        }
    }

    #[must_use]
    pub fn has_credential(&self, kind: BackendKind) -> bool {
        self.api_key(kind).is_some()
    }

    #[must_use]
    pub fn api_key(&self, kind: BackendKind) -> Option<&str> {
        self.secrets
            .api_keys
            .get(&kind)
            .filter(|s| !s.is_blank())
            .map(Secret::expose)
    }

    #[must_use]
    pub fn configured_backends(&self) -> Vec<BackendKind> {
        BackendKind::ALL
            .into_iter()
            .filter(|kind| self.has_credential(*kind))
            .collect()
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.extraction.timeout_secs.map(Duration::from_secs)
    }
}
