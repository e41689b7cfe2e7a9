use std::collections::HashMap;
use std::io::Write;
use std::pin::Pin;

use serial_test::serial;

use super::*;
use crate::prompt::Template;

const ENV_KEYS: [&str; 19] = [
    "LEDGERLENS_DEFAULT_BACKEND",
    "LEDGERLENS_DEFAULT_TEMPLATE",
    "LEDGERLENS_TIMEOUT_SECS",
    "LEDGERLENS_OPENAI_MODEL",
    "LEDGERLENS_OPENAI_BASE_URL",
    "LEDGERLENS_OPENAI_MAX_TOKENS",
    "LEDGERLENS_GEMINI_MODEL",
    "LEDGERLENS_GEMINI_BASE_URL",
    "LEDGERLENS_GEMINI_MAX_TOKENS",
    "LEDGERLENS_CLAUDE_MODEL",
    "LEDGERLENS_CLAUDE_BASE_URL",
    "LEDGERLENS_CLAUDE_MAX_TOKENS",
    "LEDGERLENS_OPENROUTER_MODEL",
    "LEDGERLENS_OPENROUTER_BASE_URL",
    "LEDGERLENS_OPENROUTER_MAX_TOKENS",
    "LEDGERLENS_OPENAI_API_KEY",
    "LEDGERLENS_GEMINI_API_KEY",
    "LEDGERLENS_CLAUDE_API_KEY",
    "LEDGERLENS_OPENROUTER_API_KEY",
];

fn clear_env() {
    for key in ENV_KEYS {
        unsafe { std::env::remove_var(key) };
    }
}

struct MapVault(HashMap<&'static str, &'static str>);

impl VaultProvider for MapVault {
    fn get_secret(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<String>>> + Send + '_>> {
        let value = self.0.get(key).map(|v| (*v).to_owned());
        Box::pin(async move { Ok(value) })
    }
}

struct BrokenVault;

impl VaultProvider for BrokenVault {
    fn get_secret(
        &self,
        _key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<String>>> + Send + '_>> {
        Box::pin(async { Err(anyhow::anyhow!("vault sealed")) })
    }
}

#[test]
fn defaults_when_file_missing() {
    let config = Config::default();
    assert_eq!(config.extraction.default_backend, BackendKind::OpenAi);
    assert_eq!(config.extraction.default_template, Template::General);
    assert!(config.extraction.timeout_secs.is_none());
    assert_eq!(config.openai.model, "gpt-4o");
    assert_eq!(config.gemini.model, "gemini-2.0-flash");
    assert_eq!(config.claude.model, "claude-3-5-sonnet-latest");
    assert_eq!(config.openrouter.model, "openai/gpt-4o");
    assert_eq!(config.openrouter.base_url, "https://openrouter.ai/api/v1");
    assert_eq!(config.claude.max_tokens, 1024);
    assert!(config.configured_backends().is_empty());
}

#[test]
#[serial]
fn load_missing_file_uses_defaults() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config.extraction.default_backend, BackendKind::OpenAi);
    assert_eq!(config.gemini.model, "gemini-2.0-flash");
}

#[test]
#[serial]
fn parse_valid_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.toml");
    let mut f = std::fs::File::create(&path).unwrap();
    write!(
        f,
        r#"
[extraction]
default_backend = "claude"
default_template = "travel"
timeout_secs = 45

[claude]
base_url = "http://claude.local/v1"
model = "claude-3-haiku"
max_tokens = 2048
"#
    )
    .unwrap();

    clear_env();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.extraction.default_backend, BackendKind::Claude);
    assert_eq!(config.extraction.default_template, Template::Travel);
    assert_eq!(config.timeout(), Some(std::time::Duration::from_secs(45)));
    assert_eq!(config.claude.base_url, "http://claude.local/v1");
    assert_eq!(config.claude.model, "claude-3-haiku");
    assert_eq!(config.claude.max_tokens, 2048);
    assert_eq!(config.openai.model, "gpt-4o");
}

#[test]
#[serial]
fn provider_section_without_max_tokens_uses_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.toml");
    std::fs::write(
        &path,
        "[gemini]\nbase_url = \"http://g\"\nmodel = \"gemini-1.5-pro\"\n",
    )
    .unwrap();

    clear_env();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.gemini.model, "gemini-1.5-pro");
    assert_eq!(config.gemini.max_tokens, 1024);
}

#[test]
#[serial]
fn malformed_toml_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[extraction\ndefault_backend = ").unwrap();

    clear_env();

    let err = Config::load(&path).unwrap_err();
    assert!(err.to_string().contains("failed to parse config file"));
}

#[test]
#[serial]
fn unknown_backend_in_toml_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad_backend.toml");
    std::fs::write(&path, "[extraction]\ndefault_backend = \"ollama\"\n").unwrap();

    clear_env();

    assert!(Config::load(&path).is_err());
}

#[test]
#[serial]
fn unknown_template_in_toml_falls_back_to_general() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("template.toml");
    std::fs::write(
        &path,
        "[extraction]\ndefault_backend = \"claude\"\ndefault_template = \"invoice\"\n",
    )
    .unwrap();

    clear_env();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.extraction.default_template, Template::General);
    assert_eq!(config.extraction.default_backend, BackendKind::Claude);
}

#[test]
#[serial]
fn template_names_are_case_insensitive() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("template.toml");
    std::fs::write(&path, "[extraction]\ndefault_template = \"Odometer\"\n").unwrap();

    clear_env();
    let config = Config::load(&path).unwrap();
    assert_eq!(config.extraction.default_template, Template::Odometer);

    let mut config = Config::default();
    unsafe { std::env::set_var("LEDGERLENS_DEFAULT_TEMPLATE", "Travel") };
    config.apply_env_overrides();
    clear_env();
    assert_eq!(config.extraction.default_template, Template::Travel);
}

#[test]
#[serial]
fn env_overrides() {
    clear_env();
    let mut config = Config::default();

    unsafe {
        std::env::set_var("LEDGERLENS_DEFAULT_BACKEND", "Gemini");
        std::env::set_var("LEDGERLENS_DEFAULT_TEMPLATE", "odometer");
        std::env::set_var("LEDGERLENS_TIMEOUT_SECS", "20");
        std::env::set_var("LEDGERLENS_OPENROUTER_MODEL", "anthropic/claude-3.5-sonnet");
        std::env::set_var("LEDGERLENS_OPENAI_BASE_URL", "http://proxy.local/v1");
        std::env::set_var("LEDGERLENS_CLAUDE_MAX_TOKENS", "512");
    };
    config.apply_env_overrides();
    clear_env();

    assert_eq!(config.extraction.default_backend, BackendKind::Gemini);
    assert_eq!(config.extraction.default_template, Template::Odometer);
    assert_eq!(config.extraction.timeout_secs, Some(20));
    assert_eq!(config.openrouter.model, "anthropic/claude-3.5-sonnet");
    assert_eq!(config.openai.base_url, "http://proxy.local/v1");
    assert_eq!(config.claude.max_tokens, 512);
}

#[test]
#[serial]
fn invalid_env_values_are_ignored() {
    clear_env();
    let mut config = Config::default();

    unsafe {
        std::env::set_var("LEDGERLENS_DEFAULT_BACKEND", "ollama");
        std::env::set_var("LEDGERLENS_DEFAULT_TEMPLATE", "invoice");
        std::env::set_var("LEDGERLENS_TIMEOUT_SECS", "soon");
        std::env::set_var("LEDGERLENS_GEMINI_MAX_TOKENS", "0");
        std::env::set_var("LEDGERLENS_GEMINI_MODEL", "   ");
    };
    config.apply_env_overrides();
    clear_env();

    assert_eq!(config.extraction.default_backend, BackendKind::OpenAi);
    assert_eq!(config.extraction.default_template, Template::General);
    assert!(config.extraction.timeout_secs.is_none());
    assert_eq!(config.gemini.max_tokens, 1024);
    assert_eq!(config.gemini.model, "gemini-2.0-flash");
}

#[tokio::test]
async fn resolve_secrets_populates_api_keys() {
    let mut config = Config::default();
    let vault = MapVault(HashMap::from([
        ("LEDGERLENS_GEMINI_API_KEY", "AIza-123"),
        ("LEDGERLENS_CLAUDE_API_KEY", "  "),
    ]));

    config.resolve_secrets(&vault).await.unwrap();

    assert!(config.has_credential(BackendKind::Gemini));
    assert_eq!(config.api_key(BackendKind::Gemini), Some("AIza-123"));
    assert!(!config.has_credential(BackendKind::Claude));
    assert!(!config.has_credential(BackendKind::OpenAi));
    assert_eq!(config.configured_backends(), vec![BackendKind::Gemini]);
}

#[tokio::test]
async fn resolve_secrets_propagates_vault_failure() {
    let mut config = Config::default();
    let err = config.resolve_secrets(&BrokenVault).await.unwrap_err();
    assert!(err.to_string().contains("vault sealed"));
}

#[tokio::test]
#[serial]
async fn env_vault_resolves_process_environment() {
    clear_env();
    unsafe { std::env::set_var("LEDGERLENS_OPENROUTER_API_KEY", "sk-or-1") };

    let mut config = Config::default();
    config
        .resolve_secrets(&crate::vault::EnvVaultProvider)
        .await
        .unwrap();
    clear_env();

    assert_eq!(config.configured_backends(), vec![BackendKind::OpenRouter]);
}

#[test]
fn secrets_never_leak_through_debug() {
    let mut config = Config::default();
    config.secrets.insert(BackendKind::OpenAi, "sk-very-secret");
    let debug = format!("{config:?}");
    assert!(!debug.contains("sk-very-secret"));
}

#[test]
fn validate_accepts_defaults() {
    assert!(Config::default().validate().is_ok());
}

#[test]
fn validate_rejects_zero_max_tokens() {
    let mut config = Config::default();
    config.claude.max_tokens = 0;
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("[claude] max_tokens"));
}

#[test]
fn validate_rejects_empty_model() {
    let mut config = Config::default();
    config.openrouter.model = String::new();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("[openrouter] model"));
}

#[test]
fn backend_kind_parses_case_insensitively() {
    assert_eq!("OpenAI".parse::<BackendKind>().unwrap(), BackendKind::OpenAi);
    assert_eq!(" claude ".parse::<BackendKind>().unwrap(), BackendKind::Claude);
    assert_eq!(
        "OPENROUTER".parse::<BackendKind>().unwrap(),
        BackendKind::OpenRouter
    );
    let err = "ollama".parse::<BackendKind>().unwrap_err();
    assert_eq!(err.to_string(), "unknown backend 'ollama'");
}

#[test]
fn backend_kind_order_is_fallback_priority() {
    let names: Vec<_> = BackendKind::ALL.iter().map(|k| k.as_str()).collect();
    assert_eq!(names, ["openai", "gemini", "claude", "openrouter"]);
}

#[test]
fn backend_kind_serde_matches_as_str() {
    for kind in BackendKind::ALL {
        let json = serde_json::to_value(kind).unwrap();
        assert_eq!(json, kind.as_str());
    }
}
