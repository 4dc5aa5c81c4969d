//! `petsoft serve` configuration: a TOML file plus environment overrides.
//!
//! ```toml
//! port = 8080
//! rate_limit = 60
//! log_format = "json"
//!
//! [checkout]
//! base_url = "https://checkout.example/pay"
//! price_label = "299€"
//! webhook_secret = "whsec_local"
//!
//! [[users]]
//! id = "ann"
//! email = "ann@example.com"
//! token = "ann-token"
//! has_access = true
//! ```

use std::path::{Path, PathBuf};

use petsoft_core::observability::LogFormat;
use petsoft_storage::{CheckoutConfig, UserIdentity};
use serde::Deserialize;

pub(crate) const DEFAULT_PORT: u16 = 8080;

/// Default rate limit: 60 requests per minute per IP.
pub(crate) const DEFAULT_RATE_LIMIT: u64 = 60;

#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfigError {
    #[error("error reading config '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("error parsing config '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid value for {var}: '{value}'")]
    Env { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct ServeConfig {
    pub(crate) port: u16,
    pub(crate) rate_limit: u64,
    pub(crate) log_format: LogFormat,
    pub(crate) checkout: CheckoutSettings,
    pub(crate) users: Vec<UserSeed>,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            rate_limit: DEFAULT_RATE_LIMIT,
            log_format: LogFormat::default(),
            checkout: CheckoutSettings::default(),
            users: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct CheckoutSettings {
    #[serde(flatten)]
    pub(crate) provider: CheckoutConfig,
    /// Shared secret the provider sends in `X-Webhook-Secret`. Without
    /// one, the webhook rejects every call.
    pub(crate) webhook_secret: Option<String>,
}

/// A user known to the server, reachable through a bearer token.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct UserSeed {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) token: String,
    #[serde(default)]
    pub(crate) has_access: bool,
}

impl UserSeed {
    pub(crate) fn identity(&self) -> UserIdentity {
        let user = UserIdentity::new(self.id.as_str(), self.email.as_str());
        if self.has_access {
            user.with_access()
        } else {
            user
        }
    }
}

impl ServeConfig {
    /// Load from `path`. A missing file yields the defaults.
    pub(crate) fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::parse(&text, path)
    }

    pub(crate) fn parse(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Apply `PETSOFT_PORT`, `PETSOFT_RATE_LIMIT` and `PETSOFT_LOG_FORMAT`.
    pub(crate) fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|var| std::env::var(var).ok())
    }

    pub(crate) fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = lookup("PETSOFT_PORT") {
            self.port = value.trim().parse().map_err(|_| ConfigError::Env {
                var: "PETSOFT_PORT",
                value,
            })?;
        }
        if let Some(value) = lookup("PETSOFT_RATE_LIMIT") {
            self.rate_limit = value.trim().parse().map_err(|_| ConfigError::Env {
                var: "PETSOFT_RATE_LIMIT",
                value,
            })?;
        }
        if let Some(value) = lookup("PETSOFT_LOG_FORMAT") {
            self.log_format = value.parse().map_err(|_| ConfigError::Env {
                var: "PETSOFT_LOG_FORMAT",
                value,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
port = 9000
rate_limit = 5
log_format = "json"

[checkout]
base_url = "https://pay.example/checkout"
price_label = "10€"
webhook_secret = "whsec"

[[users]]
id = "ann"
email = "ann@example.com"
token = "t-ann"
has_access = true

[[users]]
id = "bob"
email = "bob@example.com"
token = "t-bob"
"#;

    #[test]
    fn parses_full_file() {
        let config = ServeConfig::parse(SAMPLE, Path::new("petsoft.toml")).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.rate_limit, 5);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.checkout.provider.base_url, "https://pay.example/checkout");
        assert_eq!(config.checkout.provider.price_label, "10€");
        assert_eq!(config.checkout.webhook_secret.as_deref(), Some("whsec"));
        assert_eq!(config.users.len(), 2);
        assert!(config.users[0].identity().has_access);
        assert!(!config.users[1].identity().has_access);
    }

    #[test]
    fn empty_file_is_defaults() {
        let config = ServeConfig::parse("", Path::new("petsoft.toml")).unwrap();
        assert_eq!(config, ServeConfig::default());
        assert_eq!(config.checkout.provider, CheckoutConfig::default());
    }

    #[test]
    fn missing_file_is_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServeConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, ServeConfig::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let err = ServeConfig::parse("port = \"eighty\"", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn env_overrides_win() {
        let mut config = ServeConfig::parse(SAMPLE, Path::new("petsoft.toml")).unwrap();
        config
            .apply_overrides(|var| match var {
                "PETSOFT_PORT" => Some("9100".to_string()),
                "PETSOFT_LOG_FORMAT" => Some("pretty".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.rate_limit, 5);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn bad_env_value_is_reported() {
        let mut config = ServeConfig::default();
        let err = config
            .apply_overrides(|var| (var == "PETSOFT_RATE_LIMIT").then(|| "lots".to_string()))
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid value for PETSOFT_RATE_LIMIT: 'lots'");
    }
}
