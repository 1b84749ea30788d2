use crate::config::types::{AuthConfig, Config};
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

/// Environment variables consulted after the file is parsed
const ENV_START_URL: &str = "START_URL";
const ENV_LOGIN_URL: &str = "LOGIN_URL";
const ENV_LOGIN_EMAIL: &str = "LOGIN_EMAIL";
const ENV_LOGIN_PASSWORD: &str = "LOGIN_PASSWORD";
const ENV_WORKERS: &str = "CRAWL_WORKERS";

/// Loads and parses a configuration file from the given path
///
/// Environment overrides from the process environment are applied before
/// validation, so credentials can stay out of the file.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use link_ledger::config::load_config;
///
/// let config = load_config(Path::new("ledger.toml")).unwrap();
/// println!("Workers: {}", config.crawler.workers);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content, |key| std::env::var(key).ok())
}

/// Parses configuration text, applies overrides from `lookup`, and validates
///
/// `lookup` stands in for the process environment so callers (and tests)
/// control exactly which variables are visible.
pub fn parse_config<F>(content: &str, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config: Config = toml::from_str(content)?;
    apply_env_overrides(&mut config, lookup)?;
    validate(&config)?;
    Ok(config)
}

/// Applies environment overrides to a parsed configuration
///
/// | Variable         | Overrides                              |
/// |------------------|----------------------------------------|
/// | `START_URL`      | `crawler.start-url`                    |
/// | `CRAWL_WORKERS`  | `crawler.workers`                      |
/// | `LOGIN_URL`      | `auth.login-url` (creates `[auth]`)    |
/// | `LOGIN_EMAIL`    | `auth.username`                        |
/// | `LOGIN_PASSWORD` | `auth.password`                        |
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(start_url) = lookup(ENV_START_URL) {
        config.crawler.start_url = start_url;
    }

    if let Some(workers) = lookup(ENV_WORKERS) {
        config.crawler.workers = workers.trim().parse().map_err(|_| {
            ConfigError::Validation(format!("{} must be a positive integer, got '{}'", ENV_WORKERS, workers))
        })?;
    }

    if let Some(login_url) = lookup(ENV_LOGIN_URL) {
        match config.auth.as_mut() {
            Some(auth) => auth.login_url = login_url,
            None => {
                config.auth = Some(AuthConfig {
                    login_url,
                    username_field: "username".to_string(),
                    password_field: "password".to_string(),
                    username: String::new(),
                    password: String::new(),
                    extra_fields: BTreeMap::new(),
                    failure_marker: None,
                })
            }
        }
    }

    if let Some(auth) = config.auth.as_mut() {
        if let Some(username) = lookup(ENV_LOGIN_EMAIL) {
            auth.username = username;
        }
        if let Some(password) = lookup(ENV_LOGIN_PASSWORD) {
            auth.password = password;
        }
    }

    Ok(())
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so a report can be traced back to the configuration
/// that produced it.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
