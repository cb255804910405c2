//! Storefront configuration loaded from environment variables.
//!
//! Nothing here is required: without a Supabase project the storefront runs
//! in preview mode on the sample catalog, and without a database URL sessions
//! live in memory and the catalog is not live-updated.
//!
//! # Environment Variables
//!
//! ## Remote store
//! - `SUPABASE_URL` - Project URL (e.g., `https://abc.supabase.co`)
//! - `SUPABASE_ANON_KEY` - Public anon key
//! - `STOREFRONT_DATABASE_URL` or `DATABASE_URL` - Postgres connection for
//!   sessions and change notifications
//!
//! ## Server
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BASE_URL` - Public URL (default: `http://localhost:3000`)
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text
//!
//! ## Checkout
//! - `CHECKOUT_PARTIAL_ORDER` - `compensate` (default) or `accept`
//! - `ORDER_EMAIL` - Recipient of preview-mode order mails
//!
//! ## Site
//! - `SITE_NAME`, `SITE_SUBTITLE`, `SITE_LINE_ID`, `SITE_HERO_TITLE`,
//!   `SITE_HERO_SUBTITLE`, `SITE_CURRENCY`
//!
//! ## Error tracking
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`,
//!   `SENTRY_TRACES_SAMPLE_RATE`

use std::net::{IpAddr, SocketAddr};

use aquarium_core::DEFAULT_CURRENCY;
use aquarium_supabase::RemoteConfig;
use secrecy::SecretString;
use thiserror::Error;

use crate::services::checkout::PartialOrderPolicy;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Remote store mode and change feed connection
    pub remote: RemoteConfig,
    /// Postgres connection for sessions (contains password)
    pub database_url: Option<SecretString>,
    /// Checkout behavior
    pub checkout: CheckoutConfig,
    /// Shop branding and contact settings
    pub site: SiteSettings,
    /// Emit JSON logs
    pub log_json: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
}

/// Checkout settings.
#[derive(Debug, Clone, Default)]
pub struct CheckoutConfig {
    /// What to do when order lines fail after the header was written
    pub partial_order: PartialOrderPolicy,
    /// Recipient for preview-mode order mails (may be empty)
    pub order_email: String,
}

/// Shop branding shown on every page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSettings {
    pub name: String,
    pub subtitle: String,
    /// LINE account id for contact links
    pub line_id: String,
    pub hero_title: String,
    pub hero_subtitle: String,
    /// Currency prefix for prices
    pub currency: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            name: "Aquarium Studio".to_string(),
            subtitle: "Guppy specialists".to_string(),
            line_id: "tsAGZrm9vt".to_string(),
            hero_title: "Guppies, bred and sold with care".to_string(),
            hero_subtitle: "Selected strains | A beautiful aquarium, made easy".to_string(),
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("STOREFRONT_PORT", "3000")?;
        let base_url = get_env_or_default("STOREFRONT_BASE_URL", "http://localhost:3000");

        let database_url = get_database_url("STOREFRONT_DATABASE_URL");
        let remote = RemoteConfig::resolve(
            get_optional_env("SUPABASE_URL").as_deref(),
            get_optional_env("SUPABASE_ANON_KEY").as_deref(),
            database_url.clone(),
        )
        .map_err(|e| ConfigError::InvalidEnvVar("SUPABASE_URL".to_string(), e.to_string()))?;

        let checkout = CheckoutConfig {
            partial_order: parse_env("CHECKOUT_PARTIAL_ORDER", "compensate")?,
            order_email: get_env_or_default("ORDER_EMAIL", ""),
        };

        Ok(Self {
            host,
            port,
            base_url,
            remote,
            database_url,
            checkout,
            site: SiteSettings::from_env(),
            log_json: get_optional_env("LOG_FORMAT")
                .is_some_and(|v| v.eq_ignore_ascii_case("json")),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether session cookies must be HTTPS-only.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Configuration for tests: preview mode, in-memory everything.
    #[must_use]
    pub fn for_tests() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            remote: RemoteConfig::preview("tests"),
            database_url: None,
            checkout: CheckoutConfig::default(),
            site: SiteSettings::default(),
            log_json: false,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }
}

impl SiteSettings {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            name: get_env_or_default("SITE_NAME", &defaults.name),
            subtitle: get_env_or_default("SITE_SUBTITLE", &defaults.subtitle),
            line_id: get_env_or_default("SITE_LINE_ID", &defaults.line_id),
            hero_title: get_env_or_default("SITE_HERO_TITLE", &defaults.hero_title),
            hero_subtitle: get_env_or_default("SITE_HERO_SUBTITLE", &defaults.hero_subtitle),
            currency: get_env_or_default("SITE_CURRENCY", &defaults.currency),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Option<SecretString> {
    get_optional_env(primary_key)
        .or_else(|| get_optional_env("DATABASE_URL"))
        .map(SecretString::from)
}

/// Get an optional environment variable, treating blank as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &get_env_or_default(key, default))
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_port() {
        let port: u16 = parse_value("STOREFRONT_PORT", " 8080 ").unwrap();
        assert_eq!(port, 8080);
    }

    #[test]
    fn test_parse_value_invalid_names_variable() {
        let err = parse_value::<u16>("STOREFRONT_PORT", "eighty").unwrap_err();
        let ConfigError::InvalidEnvVar(key, _) = err;
        assert_eq!(key, "STOREFRONT_PORT");
    }

    #[test]
    fn test_parse_value_partial_order_policy() {
        let policy: PartialOrderPolicy = parse_value("CHECKOUT_PARTIAL_ORDER", "accept").unwrap();
        assert_eq!(policy, PartialOrderPolicy::AcceptPartial);
        assert!(parse_value::<PartialOrderPolicy>("CHECKOUT_PARTIAL_ORDER", "maybe").is_err());
    }

    #[test]
    fn test_socket_addr() {
        let config = StorefrontConfig::for_tests();
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
        assert!(!config.secure_cookies());
    }

    #[test]
    fn test_site_defaults() {
        let site = SiteSettings::default();
        assert_eq!(site.name, "Aquarium Studio");
        assert_eq!(site.line_id, "tsAGZrm9vt");
        assert_eq!(site.currency, "NT$");
    }

    #[test]
    fn test_debug_hides_database_url() {
        let mut config = StorefrontConfig::for_tests();
        config.database_url = Some(SecretString::from("postgres://user:hunter2@db/shop"));
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
    }
}
