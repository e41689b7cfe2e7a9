use super::{BackendKind, Config, ProviderConfig};
use crate::prompt::Template;

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_extraction();
        for kind in BackendKind::ALL {
            let prefix = format!("LEDGERLENS_{}", kind.as_str().to_uppercase());
            apply_provider_overrides(&prefix, self.provider_mut(kind));
        }
    }

    fn apply_env_overrides_extraction(&mut self) {
        if let Ok(v) = std::env::var("LEDGERLENS_DEFAULT_BACKEND") {
            if let Ok(kind) = v.parse::<BackendKind>() {
                self.extraction.default_backend = kind;
            } else {
                tracing::warn!("ignoring invalid LEDGERLENS_DEFAULT_BACKEND value: {v}");
            }
        }
        if let Ok(v) = std::env::var("LEDGERLENS_DEFAULT_TEMPLATE") {
            self.extraction.default_template = Template::from_name(&v);
        }
        if let Ok(v) = std::env::var("LEDGERLENS_TIMEOUT_SECS") {
            if let Ok(secs) = v.parse::<u64>()
                && secs > 0
            {
                self.extraction.timeout_secs = Some(secs);
            } else {
                tracing::warn!("ignoring invalid LEDGERLENS_TIMEOUT_SECS value: {v}");
            }
        }
    }
}

fn apply_provider_overrides(prefix: &str, provider: &mut ProviderConfig) {
    if let Ok(v) = std::env::var(format!("{prefix}_MODEL"))
        && !v.trim().is_empty()
    {
        provider.model = v;
    }
    if let Ok(v) = std::env::var(format!("{prefix}_BASE_URL"))
        && !v.trim().is_empty()
    {
        provider.base_url = v;
    }
    if let Ok(v) = std::env::var(format!("{prefix}_MAX_TOKENS")) {
        match v.parse::<u32>() {
            Ok(n) if n > 0 => provider.max_tokens = n,
            _ => tracing::warn!("ignoring invalid {prefix}_MAX_TOKENS value: {v}"),
        }
    }
}
