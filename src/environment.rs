use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::places::types::{FALLBACK_TIMEOUT, PAGE_LIMIT, PRIMARY_TIMEOUT};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000/api/places";
pub const DEFAULT_OPEN_DATA_URL: &str = "https://www.datos.gov.co/resource/gi7q-5bgv.json";
pub const DEFAULT_DATABASE_PATH: &str = "dime.db";
pub const DEFAULT_PUBLIC_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8000;

/// Runtime settings for the fetch pipeline, the cache and the API server.
#[derive(Clone, Debug)]
pub struct Config {
    pub backend_url: String,
    pub open_data_url: String,
    pub app_token: Option<String>,
    /// Host name the application is served from, used to detect production.
    pub public_host: String,
    /// Extra host names that count as local development hosts.
    pub local_hosts: Vec<String>,
    pub database_path: String,
    pub cache_ttl: Duration,
    pub primary_timeout: Duration,
    pub fallback_timeout: Duration,
    pub pipeline_timeout: Duration,
    pub page_limit: u32,
    pub port: u16,
    /// Browser origins allowed by the API server; empty allows any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            open_data_url: DEFAULT_OPEN_DATA_URL.to_string(),
            app_token: None,
            public_host: DEFAULT_PUBLIC_HOST.to_string(),
            local_hosts: Vec::new(),
            database_path: DEFAULT_DATABASE_PATH.to_string(),
            cache_ttl: Duration::from_secs(300),
            primary_timeout: PRIMARY_TIMEOUT,
            fallback_timeout: FALLBACK_TIMEOUT,
            pipeline_timeout: Duration::from_secs(10),
            page_limit: PAGE_LIMIT,
            port: DEFAULT_PORT,
            allowed_origins: Vec::new(),
        }
    }
}

impl Config {
    /// Builds the configuration from environment variables, keeping the default for
    /// anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let app_token = env::var("DIME_APP_TOKEN")
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());
        if app_token.is_none() {
            warn!("DIME_APP_TOKEN environment variable not set. Open data requests will be unauthenticated.");
        }

        Self {
            backend_url: env::var("DIME_BACKEND_URL").unwrap_or(defaults.backend_url),
            open_data_url: env::var("DIME_OPEN_DATA_URL").unwrap_or(defaults.open_data_url),
            app_token,
            public_host: env::var("DIME_PUBLIC_HOST").unwrap_or(defaults.public_host),
            local_hosts: get_env_var_as_vec("DIME_EXTRA_LOCAL_HOSTS", ';')
                .into_iter()
                .filter(|host| !host.is_empty())
                .collect(),
            database_path: env::var("DATABASE_PATH").unwrap_or(defaults.database_path),
            cache_ttl: Duration::from_secs(get_env_var_or(
                "DIME_CACHE_TTL_SECS",
                defaults.cache_ttl.as_secs(),
            )),
            primary_timeout: defaults.primary_timeout,
            fallback_timeout: Duration::from_secs(get_env_var_or(
                "DIME_FALLBACK_TIMEOUT_SECS",
                defaults.fallback_timeout.as_secs(),
            )),
            pipeline_timeout: Duration::from_secs(get_env_var_or(
                "DIME_PIPELINE_TIMEOUT_SECS",
                defaults.pipeline_timeout.as_secs(),
            )),
            page_limit: defaults.page_limit,
            port: get_env_var_or("PORT", defaults.port),
            allowed_origins: get_env_var_as_vec("DIME_ALLOWED_ORIGINS", ',')
                .into_iter()
                .filter(|origin| !origin.is_empty())
                .collect(),
        }
    }
}

/// Retrieves an environment variable and splits it into a vector of strings based on a delimiter.
///
/// # Arguments
/// - `var`: The name of the environment variable.
/// - `delimiter`: The character to split the environment variable's value by.
///
/// # Returns
/// - `Vec<String>`
pub fn get_env_var_as_vec(var: &str, delimiter: char) -> Vec<String> {
    env::var(var)
        .unwrap_or_default()
        .split(delimiter)
        .map(|s| s.trim().to_string())
        .collect()
}

/// Parses an environment variable, falling back to `default` when it is unset or invalid.
pub fn get_env_var_or<T: FromStr>(var: &str, default: T) -> T {
    match env::var(var) {
        Ok(value) => match value.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!("Ignoring invalid value '{}' for {}", value, var);
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.cache_ttl, Duration::from_millis(300_000));
        assert_eq!(config.primary_timeout, Duration::from_secs(3));
        assert_eq!(config.pipeline_timeout, Duration::from_secs(10));
        assert_eq!(config.page_limit, 5000);
        assert!(config.app_token.is_none());
    }

    #[test]
    fn test_get_env_var_or_falls_back() {
        env::set_var("DIME_TEST_NUMERIC_VAR", "not-a-number");
        assert_eq!(get_env_var_or("DIME_TEST_NUMERIC_VAR", 42u64), 42);
        env::set_var("DIME_TEST_NUMERIC_VAR", " 17 ");
        assert_eq!(get_env_var_or("DIME_TEST_NUMERIC_VAR", 42u64), 17);
        env::remove_var("DIME_TEST_NUMERIC_VAR");
        assert_eq!(get_env_var_or("DIME_TEST_NUMERIC_VAR", 42u64), 42);
    }

    #[test]
    fn test_get_env_var_as_vec() {
        env::set_var("DIME_TEST_LIST_VAR", "alpha; beta ;gamma");
        assert_eq!(
            get_env_var_as_vec("DIME_TEST_LIST_VAR", ';'),
            vec!["alpha", "beta", "gamma"]
        );
        env::remove_var("DIME_TEST_LIST_VAR");
    }
}
