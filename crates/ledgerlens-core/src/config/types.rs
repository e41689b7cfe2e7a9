use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::prompt::Template;
use crate::vault::Secret;

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default = "default_openai")]
    pub openai: ProviderConfig,
    #[serde(default = "default_gemini")]
    pub gemini: ProviderConfig,
    #[serde(default = "default_claude")]
    pub claude: ProviderConfig,
    #[serde(default = "default_openrouter")]
    pub openrouter: ProviderConfig,
    #[serde(skip)]
    pub secrets: ResolvedSecrets,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extraction: ExtractionConfig::default(),
            openai: default_openai(),
            gemini: default_gemini(),
            claude: default_claude(),
            openrouter: default_openrouter(),
            secrets: ResolvedSecrets::default(),
        }
    }
}

/// Vision backend selector.
///
/// [`BackendKind::ALL`] doubles as the fallback priority order for PDF documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    OpenAi,
    Gemini,
    Claude,
    OpenRouter,
}

impl BackendKind {
    pub const ALL: [Self; 4] = [Self::OpenAi, Self::Gemini, Self::Claude, Self::OpenRouter];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
            Self::Claude => "claude",
            Self::OpenRouter => "openrouter",
        }
    }

    /// Human-facing provider name used in remediation messages.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Gemini => "Gemini",
            Self::Claude => "Claude",
            Self::OpenRouter => "OpenRouter",
        }
    }

    /// Environment variable (and vault key) holding this backend's API key.
    #[must_use]
    pub fn api_key_var(self) -> &'static str {
        match self {
            Self::OpenAi => "LEDGERLENS_OPENAI_API_KEY",
            Self::Gemini => "LEDGERLENS_GEMINI_API_KEY",
            Self::Claude => "LEDGERLENS_CLAUDE_API_KEY",
            Self::OpenRouter => "LEDGERLENS_OPENROUTER_API_KEY",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown backend '{0}'")]
pub struct UnknownBackend(pub String);

impl FromStr for BackendKind {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| UnknownBackend(needle.to_owned()))
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ExtractionConfig {
    #[serde(default = "default_backend")]
    pub default_backend: BackendKind,
    #[serde(default)]
    pub default_template: Template,
    /// Per-request timeout for provider calls; unset keeps the HTTP client default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            default_backend: default_backend(),
            default_template: Template::default(),
            timeout_secs: None,
        }
    }
}

fn default_backend() -> BackendKind {
    BackendKind::OpenAi
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    pub base_url: String,
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_max_tokens() -> u32 {
    1024
}

fn provider(base_url: &str, model: &str) -> ProviderConfig {
    ProviderConfig {
        base_url: base_url.into(),
        model: model.into(),
        max_tokens: default_max_tokens(),
    }
}

pub(crate) fn default_openai() -> ProviderConfig {
    provider(ledgerlens_vision::openai::DEFAULT_BASE_URL, "gpt-4o")
}

pub(crate) fn default_gemini() -> ProviderConfig {
    provider(ledgerlens_vision::gemini::DEFAULT_BASE_URL, "gemini-2.0-flash")
}

pub(crate) fn default_claude() -> ProviderConfig {
    provider(
        ledgerlens_vision::claude::DEFAULT_BASE_URL,
        "claude-3-5-sonnet-latest",
    )
}

pub(crate) fn default_openrouter() -> ProviderConfig {
    provider(
        ledgerlens_vision::openrouter::DEFAULT_BASE_URL,
        "openai/gpt-4o",
    )
}

/// API keys resolved through the vault; never serialized.
#[derive(Debug, Default, Clone)]
pub struct ResolvedSecrets {
    pub api_keys: HashMap<BackendKind, Secret>,
}

impl ResolvedSecrets {
    pub fn insert(&mut self, kind: BackendKind, key: impl Into<String>) {
        self.api_keys.insert(kind, Secret::new(key));
    }
}
