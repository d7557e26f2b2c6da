//! Configuration loading: TOML file, environment, CLI overrides.
//!
//! Precedence is CLI > environment > file > built-in defaults. Every field of
//! the file is optional; unknown keys are rejected so typos surface early.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::fetch::constants::{DEFAULT_COOLDOWN, DEFAULT_REQUEST_SPACING, REQUEST_TIMEOUT_SECS};
use crate::fetch::{DEFAULT_MAX_RETRIES, DEFAULT_PAGE_SIZE, RetryPolicy};
use crate::forge::DEFAULT_API_BASE_URL;
use crate::locate::DEFAULT_NOMINATIM_URL;

/// Environment variable holding comma-separated forge tokens.
pub const TOKENS_ENV: &str = "FORGE_TOKENS";

/// Directory name under the user config directory.
const CONFIG_DIR_NAME: &str = "forge-harvest";

/// Configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Errors from reading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read config file '{path}': {source}")]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or has unknown keys.
    #[error("failed to parse config file '{path}': {message}")]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// A value is outside its allowed range.
    #[error("invalid config value for `{field}`: {value}. Expected range: {range}")]
    OutOfRange {
        /// Offending key.
        field: &'static str,
        /// Offending value.
        value: u64,
        /// Allowed range.
        range: &'static str,
    },
}

impl ConfigError {
    fn out_of_range(field: &'static str, value: u64, range: &'static str) -> Self {
        Self::OutOfRange {
            field,
            value,
            range,
        }
    }
}

/// Contents of `config.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Forge API root (self-hosted forges mount it under `/api/v3`).
    pub api_base_url: Option<String>,
    /// Forge API tokens, rotated round-robin.
    pub tokens: Option<Vec<SecretString>>,
    /// Worker pool size.
    pub concurrency: Option<usize>,
    /// Entries requested per page.
    pub page_size: Option<u32>,
    /// Attempt budget for transient retries and rate-limit cycles.
    pub max_retries: Option<u32>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: Option<u64>,
    /// Sleep between rate-limit cycles, in seconds.
    pub cooldown_secs: Option<u64>,
    /// Minimum spacing between forge requests, in milliseconds.
    pub request_spacing_ms: Option<u64>,
    /// Nominatim root used by the geocoding fallback.
    pub geocoder_base_url: Option<String>,
    /// Whether unresolved locations fall back to geocoding.
    pub geocoding: Option<bool>,
}

impl FileConfig {
    /// Parses and validates TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys and
    /// [`ConfigError::OutOfRange`] for values outside their ranges.
    pub fn parse(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            message: error.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read, plus the
    /// errors of [`Self::parse`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw, path)
    }

    /// Validates value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OutOfRange`] for the first offending value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(concurrency) = self.concurrency
            && !(1..=100).contains(&concurrency)
        {
            return Err(ConfigError::out_of_range(
                "concurrency",
                concurrency as u64,
                "1..=100",
            ));
        }
        if let Some(page_size) = self.page_size
            && !(1..=100).contains(&page_size)
        {
            return Err(ConfigError::out_of_range(
                "page_size",
                u64::from(page_size),
                "1..=100",
            ));
        }
        if let Some(max_retries) = self.max_retries
            && max_retries > 10
        {
            return Err(ConfigError::out_of_range(
                "max_retries",
                u64::from(max_retries),
                "0..=10",
            ));
        }
        if let Some(timeout) = self.request_timeout_secs
            && !(1..=3600).contains(&timeout)
        {
            return Err(ConfigError::out_of_range(
                "request_timeout_secs",
                timeout,
                "1..=3600",
            ));
        }
        if let Some(cooldown) = self.cooldown_secs
            && cooldown > 3600
        {
            return Err(ConfigError::out_of_range("cooldown_secs", cooldown, "0..=3600"));
        }
        if let Some(spacing) = self.request_spacing_ms
            && spacing > 60_000
        {
            return Err(ConfigError::out_of_range(
                "request_spacing_ms",
                spacing,
                "0..=60000",
            ));
        }
        Ok(())
    }
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/forge-harvest/config.toml`
/// 2. `$HOME/.config/forge-harvest/config.toml`
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join(CONFIG_DIR_NAME)
                .join(CONFIG_FILE_NAME),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the file config.
///
/// An explicit path must exist; the default path is optional.
///
/// # Errors
///
/// Propagates [`FileConfig::load`] errors.
pub fn load_file_config(explicit: Option<&Path>) -> Result<Option<FileConfig>, ConfigError> {
    if let Some(path) = explicit {
        debug!(path = %path.display(), "loading explicit config file");
        return FileConfig::load(path).map(Some);
    }
    let Some(path) = default_config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        debug!(path = %path.display(), "no config file");
        return Ok(None);
    }
    debug!(path = %path.display(), "loading config file");
    FileConfig::load(&path).map(Some)
}

/// Splits a comma-separated token list, dropping blanks.
#[must_use]
pub fn tokens_from_env_value(value: &str) -> Vec<SecretString> {
    value
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| SecretString::new(token.to_string()))
        .collect()
}

/// Values given on the command line.
#[derive(Debug, Default)]
pub struct Overrides {
    /// `--token` values.
    pub tokens: Vec<SecretString>,
    /// `--concurrency`.
    pub concurrency: Option<usize>,
    /// `--offline` turns geocoding off.
    pub offline: bool,
}

/// Fully resolved settings.
#[derive(Debug)]
pub struct Settings {
    /// Forge API root.
    pub api_base_url: String,
    /// Forge tokens; may be empty for offline commands.
    pub tokens: Vec<SecretString>,
    /// Explicit pool size; `None` sizes the pool from the token count.
    pub concurrency: Option<usize>,
    /// Entries per page.
    pub page_size: u32,
    /// Attempt budget.
    pub max_retries: u32,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Rate-limit cooldown.
    pub cooldown: Duration,
    /// Forge request spacing.
    pub request_spacing: Duration,
    /// Nominatim root.
    pub geocoder_base_url: String,
    /// Whether geocoding is enabled.
    pub geocoding: bool,
}

impl Settings {
    /// Merges CLI overrides, the token environment value and the file config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OutOfRange`] for an out-of-range CLI concurrency.
    pub fn resolve(
        file: Option<FileConfig>,
        env_tokens: Option<&str>,
        overrides: Overrides,
    ) -> Result<Self, ConfigError> {
        let file = file.unwrap_or_default();

        if let Some(concurrency) = overrides.concurrency
            && !(1..=100).contains(&concurrency)
        {
            return Err(ConfigError::out_of_range(
                "concurrency",
                concurrency as u64,
                "1..=100",
            ));
        }

        let env_tokens = env_tokens.map(tokens_from_env_value).unwrap_or_default();
        let (tokens, source) = if !overrides.tokens.is_empty() {
            (overrides.tokens, "cli")
        } else if !env_tokens.is_empty() {
            (env_tokens, "env")
        } else {
            (file.tokens.unwrap_or_default(), "file")
        };
        debug!(count = tokens.len(), source, "resolved credentials");

        Ok(Self {
            api_base_url: file
                .api_base_url
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            tokens,
            concurrency: overrides.concurrency.or(file.concurrency),
            page_size: file.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            max_retries: file.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            request_timeout: Duration::from_secs(
                file.request_timeout_secs.unwrap_or(REQUEST_TIMEOUT_SECS),
            ),
            cooldown: file
                .cooldown_secs
                .map_or(DEFAULT_COOLDOWN, Duration::from_secs),
            request_spacing: file
                .request_spacing_ms
                .map_or(DEFAULT_REQUEST_SPACING, Duration::from_millis),
            geocoder_base_url: file
                .geocoder_base_url
                .unwrap_or_else(|| DEFAULT_NOMINATIM_URL.to_string()),
            geocoding: !overrides.offline && file.geocoding.unwrap_or(true),
        })
    }

    /// The retry policy these settings describe.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_max_attempts(self.max_retries).with_cooldown(self.cooldown)
    }
}
