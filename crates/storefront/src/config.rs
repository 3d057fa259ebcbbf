//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `MARKETPLACE_DATA_SOURCE` - `mock` (default) or `api`
//! - `MARKETPLACE_BACKEND_URL` - REST backend base URL (required when the data source is `api`)
//! - `MARKETPLACE_STORAGE_PATH` - Local key-value storage file
//!   (default: `.marketplace/storage.json`)
//! - `MARKETPLACE_TAX_RATE` - Sales tax rate applied to the cart summary (default: 0.08)
//! - `MARKETPLACE_CACHE_TTL_SECS` - Catalog cache lifetime (default: 300)
//! - `MARKETPLACE_PAGE_SIZE` - Products per page, 1-100 (default: 20)
//! - `MARKETPLACE_REQUEST_TIMEOUT_SECS` - Backend request timeout (default: 10)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;
use url::Url;

const DEFAULT_STORAGE_PATH: &str = ".marketplace/storage.json";
const MAX_PAGE_SIZE: u32 = 100;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Where catalog, auth and profile data come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// Built-in static catalog with mock authentication.
    Mock,
    /// REST backend at this base URL (without the `/api` suffix).
    Api(Url),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Catalog/auth backend
    pub data_source: DataSource,
    /// Durable key-value storage file for the signed-in user and token
    pub storage_path: PathBuf,
    /// Sales tax rate for the cart summary
    pub tax_rate: Decimal,
    /// Lifetime of cached catalog reads
    pub cache_ttl: Duration,
    /// Products per page
    pub page_size: u32,
    /// Backend request timeout
    pub request_timeout: Duration,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            data_source: DataSource::Mock,
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            tax_rate: Decimal::new(8, 2),
            cache_ttl: Duration::from_secs(300),
            page_size: 20,
            request_timeout: Duration::from_secs(10),
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
    /// Returns `ConfigError` if a variable is present but invalid, or if the
    /// `api` data source is selected without a backend URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`StorefrontConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let data_source = match get_env_or_default(&lookup, "MARKETPLACE_DATA_SOURCE", "mock")
            .to_ascii_lowercase()
            .as_str()
        {
            "mock" => DataSource::Mock,
            "api" => DataSource::Api(parse_backend_url(&get_required_env(
                &lookup,
                "MARKETPLACE_BACKEND_URL",
            )?)?),
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "MARKETPLACE_DATA_SOURCE".to_string(),
                    format!("expected 'mock' or 'api', got '{other}'"),
                ));
            }
        };

        let storage_path = lookup("MARKETPLACE_STORAGE_PATH")
            .map_or(defaults.storage_path, PathBuf::from);

        let tax_rate: Decimal =
            parse_env(&lookup, "MARKETPLACE_TAX_RATE")?.unwrap_or(defaults.tax_rate);
        if tax_rate.is_sign_negative() || tax_rate >= Decimal::ONE {
            return Err(ConfigError::InvalidEnvVar(
                "MARKETPLACE_TAX_RATE".to_string(),
                format!("must be in [0, 1), got {tax_rate}"),
            ));
        }

        let cache_ttl = parse_env(&lookup, "MARKETPLACE_CACHE_TTL_SECS")?
            .map_or(defaults.cache_ttl, Duration::from_secs);

        let page_size = parse_env(&lookup, "MARKETPLACE_PAGE_SIZE")?.unwrap_or(defaults.page_size);
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(ConfigError::InvalidEnvVar(
                "MARKETPLACE_PAGE_SIZE".to_string(),
                format!("must be between 1 and {MAX_PAGE_SIZE}, got {page_size}"),
            ));
        }

        let request_timeout = parse_env(&lookup, "MARKETPLACE_REQUEST_TIMEOUT_SECS")?
            .map_or(defaults.request_timeout, Duration::from_secs);

        Ok(Self {
            data_source,
            storage_path,
            tax_rate,
            cache_ttl,
            page_size,
            request_timeout,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(
    lookup: impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<String, ConfigError> {
    lookup(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(
    lookup: impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> String {
    lookup(key).unwrap_or_else(|| default.to_string())
}

/// Parse an optional environment variable.
fn parse_env<T>(
    lookup: impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
        .transpose()
}

/// Validate the backend base URL: http(s) with a host.
fn parse_backend_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| {
        ConfigError::InvalidEnvVar("MARKETPLACE_BACKEND_URL".to_string(), reason)
    };

    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("must have a host".to_string()));
    }
    Ok(url)
}
