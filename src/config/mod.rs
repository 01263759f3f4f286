//! Configuration (layered: code > env > `.env` file).

use std::time::Duration;

use reqwest::Url;

use crate::error::{DeviceFlowError, Result};

pub const DEFAULT_DEVICE_CODE_URL: &str = "https://github.com/login/device/code";
pub const DEFAULT_ACCESS_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";

/// Added to the server-declared interval before the first poll. Some servers
/// reject requests issued at exactly the declared cadence.
pub const DEFAULT_INTERVAL_PADDING: Duration = Duration::from_secs(1);
/// Upper bound on the `slow_down` backoff.
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(300);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub const ENV_CLIENT_ID: &str = "DEVGRANT_CLIENT_ID";
pub const ENV_SCOPE: &str = "DEVGRANT_SCOPE";
pub const ENV_DEVICE_CODE_URL: &str = "DEVGRANT_DEVICE_CODE_URL";
pub const ENV_ACCESS_TOKEN_URL: &str = "DEVGRANT_ACCESS_TOKEN_URL";
pub const ENV_MAX_INTERVAL_SECS: &str = "DEVGRANT_MAX_INTERVAL_SECS";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "DEVGRANT_REQUEST_TIMEOUT_SECS";

/// Settings for one device authorization flow.
///
/// An empty `scope` is valid and asks the provider for its default access
/// (read-only public information on GitHub).
///
/// # Example
/// ```
/// use std::time::Duration;
/// use devgrant::config::DeviceFlowConfig;
///
/// let config = DeviceFlowConfig::new("Iv1.0123456789abcdef")
///     .with_scope("read:user")
///     .with_max_interval(Some(Duration::from_secs(60)));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFlowConfig {
    pub client_id: String,
    pub scope: String,
    pub device_code_url: String,
    pub access_token_url: String,
    pub interval_padding: Duration,
    /// `None` lets `slow_down` double the interval without bound.
    pub max_interval: Option<Duration>,
    pub request_timeout: Duration,
}

impl DeviceFlowConfig {
    /// Config with GitHub endpoints and an empty scope.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            scope: String::new(),
            device_code_url: DEFAULT_DEVICE_CODE_URL.to_string(),
            access_token_url: DEFAULT_ACCESS_TOKEN_URL.to_string(),
            interval_padding: DEFAULT_INTERVAL_PADDING,
            max_interval: Some(DEFAULT_MAX_INTERVAL),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_device_code_url(mut self, url: impl Into<String>) -> Self {
        self.device_code_url = url.into();
        self
    }

    pub fn with_access_token_url(mut self, url: impl Into<String>) -> Self {
        self.access_token_url = url.into();
        self
    }

    pub fn with_interval_padding(mut self, padding: Duration) -> Self {
        self.interval_padding = padding;
        self
    }

    pub fn with_max_interval(mut self, max_interval: Option<Duration>) -> Self {
        self.max_interval = max_interval;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Load from `DEVGRANT_*` environment variables, reading `.env` first.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::from_process_env()
    }

    /// Load from the process environment only; no `.env` lookup.
    pub fn from_process_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let client_id = get(ENV_CLIENT_ID).ok_or_else(|| {
            DeviceFlowError::Configuration(format!("{ENV_CLIENT_ID} is not set"))
        })?;
        let mut config = Self::new(client_id.trim());

        if let Some(scope) = lookup(ENV_SCOPE) {
            config.scope = scope.trim().to_string();
        }
        if let Some(url) = get(ENV_DEVICE_CODE_URL) {
            config.device_code_url = url.trim().to_string();
        }
        if let Some(url) = get(ENV_ACCESS_TOKEN_URL) {
            config.access_token_url = url.trim().to_string();
        }
        if let Some(raw) = get(ENV_MAX_INTERVAL_SECS) {
            // 0 disables the cap
            config.max_interval = match parse_secs(ENV_MAX_INTERVAL_SECS, &raw)? {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            };
        }
        if let Some(raw) = get(ENV_REQUEST_TIMEOUT_SECS) {
            config.request_timeout = Duration::from_secs(parse_secs(ENV_REQUEST_TIMEOUT_SECS, &raw)?);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(DeviceFlowError::Configuration(
                "client_id must not be empty".to_string(),
            ));
        }
        validate_url("device_code_url", &self.device_code_url)?;
        validate_url("access_token_url", &self.access_token_url)?;
        if self.request_timeout.is_zero() {
            return Err(DeviceFlowError::Configuration(
                "request_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_secs(key: &str, raw: &str) -> Result<u64> {
    raw.trim().parse().map_err(|_| {
        DeviceFlowError::Configuration(format!("{key} must be a whole number of seconds, got '{raw}'"))
    })
}

fn validate_url(field: &str, raw: &str) -> Result<()> {
    let url = Url::parse(raw)
        .map_err(|e| DeviceFlowError::Configuration(format!("{field} '{raw}' is invalid: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(DeviceFlowError::Configuration(format!(
            "{field} must use http or https, got '{other}'"
        ))),
    }
}
