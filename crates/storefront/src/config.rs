//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `VITRINE_DATA_DIR` - Directory holding cart, order and account files (default: ./data)
//! - `VITRINE_FREE_SHIPPING_THRESHOLD` - Subtotal above which shipping is free (default: 200.00)
//! - `VITRINE_FLAT_SHIPPING_FEE` - Shipping fee up to the threshold (default: 29.90)
//! - `VITRINE_POSTAL_LOOKUP` - `on` or `off` (default: on)
//! - `VITRINE_POSTAL_LOOKUP_URL` - Postal lookup base URL (default: <https://viacep.com.br/ws>)
//! - `VITRINE_POSTAL_TIMEOUT_MS` - Postal lookup timeout (default: 3000)
//! - `VITRINE_STORAGE_TIMEOUT_MS` - Storage call timeout (default: 5000)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;
use vitrine_core::Money;

use crate::services::viacep::DEFAULT_BASE_URL;
use crate::shipping::ShippingRule;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Where `FileStorage` keeps its documents
    pub data_dir: PathBuf,
    /// Shipping fee rule
    pub shipping: ShippingRule,
    /// Postal code lookup settings
    pub postal: PostalConfig,
    /// Deadline for every storage call
    pub storage_timeout: Duration,
    /// Sentry error tracking settings
    pub sentry: SentryConfig,
}

/// Postal code lookup configuration.
#[derive(Debug, Clone)]
pub struct PostalConfig {
    /// Whether zip codes are looked up at all
    pub enabled: bool,
    /// Base URL; requests go to `{base_url}/{zip}/json/`
    pub base_url: Url,
    /// Deadline for one lookup
    pub timeout: Duration,
}

/// Sentry configuration.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_source(env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(&env);

        let data_dir = PathBuf::from(vars.get_or_default("VITRINE_DATA_DIR", "./data"));
        let free_threshold = vars.money("VITRINE_FREE_SHIPPING_THRESHOLD", "200.00")?;
        let flat_fee = vars.money("VITRINE_FLAT_SHIPPING_FEE", "29.90")?;
        let storage_timeout = vars.millis("VITRINE_STORAGE_TIMEOUT_MS", "5000")?;

        Ok(Self {
            data_dir,
            shipping: ShippingRule::new(free_threshold, flat_fee),
            postal: PostalConfig::from_vars(&vars)?,
            storage_timeout,
            sentry: SentryConfig {
                dsn: vars.get("SENTRY_DSN"),
                environment: vars.get("SENTRY_ENVIRONMENT"),
            },
        })
    }
}

impl PostalConfig {
    fn from_vars(vars: &Vars<'_>) -> Result<Self, ConfigError> {
        let enabled = match vars
            .get_or_default("VITRINE_POSTAL_LOOKUP", "on")
            .to_ascii_lowercase()
            .as_str()
        {
            "on" | "true" | "1" => true,
            "off" | "false" | "0" => false,
            other => {
                return Err(invalid(
                    "VITRINE_POSTAL_LOOKUP",
                    format!("expected on or off, got {other}"),
                ));
            }
        };

        let base_url = Url::parse(&vars.get_or_default("VITRINE_POSTAL_LOOKUP_URL", DEFAULT_BASE_URL))
            .map_err(|e| invalid("VITRINE_POSTAL_LOOKUP_URL", e.to_string()))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(invalid(
                "VITRINE_POSTAL_LOOKUP_URL",
                format!("unsupported scheme {}", base_url.scheme()),
            ));
        }

        Ok(Self {
            enabled,
            base_url,
            timeout: vars.millis("VITRINE_POSTAL_TIMEOUT_MS", "3000")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Vars<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Vars<'_> {
    /// Get an optional variable. Blank values count as unset.
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn get_or_default(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn money(&self, key: &str, default: &str) -> Result<Money, ConfigError> {
        Money::parse(&self.get_or_default(key, default)).map_err(|e| invalid(key, e.to_string()))
    }

    fn millis(&self, key: &str, default: &str) -> Result<Duration, ConfigError> {
        let millis = self
            .get_or_default(key, default)
            .trim()
            .parse::<u64>()
            .map_err(|e| invalid(key, e.to_string()))?;
        if millis == 0 {
            return Err(invalid(key, "must be greater than zero".to_string()));
        }
        Ok(Duration::from_millis(millis))
    }
}

fn invalid(key: &str, reason: String) -> ConfigError {
    ConfigError::InvalidEnvVar(key.to_string(), reason)
}
