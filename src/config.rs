//! Client configuration loaded from environment.

const DEFAULT_API_BASE_URL: &str = "https://task-manager-backend-40f8.onrender.com/api";
const DEFAULT_ENCRYPTION_KEY: &str = "my_32_character_encryption_key_123";

/// Runtime mode controlling development-only behavior such as GET
/// cache-busting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RuntimeMode {
    Development,
    #[default]
    Production,
}

impl RuntimeMode {
    /// Parse a mode string. Returns `None` for unrecognized values.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }
}

/// Client configuration. Passed explicitly to the handles that need it.
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the backend API, no trailing slash required.
    pub api_base_url: String,
    /// Shared secret for decrypting the email field. Must match the
    /// backend's key per deployment.
    pub encryption_key: String,
    pub runtime_mode: RuntimeMode,
}

impl Config {
    /// Load from `API_BASE_URL`, `ENCRYPTION_KEY`, and `RUNTIME_MODE`,
    /// falling back to the hosted-backend defaults for anything unset.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            api_base_url: env_string("API_BASE_URL", DEFAULT_API_BASE_URL),
            encryption_key: env_string("ENCRYPTION_KEY", DEFAULT_ENCRYPTION_KEY),
            runtime_mode: std::env::var("RUNTIME_MODE")
                .ok()
                .and_then(|raw| RuntimeMode::parse(&raw))
                .unwrap_or_default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            encryption_key: DEFAULT_ENCRYPTION_KEY.to_owned(),
            runtime_mode: RuntimeMode::Production,
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_owned())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
