//! HTTP transport settings for the blob storage client.
//!
//! # Example
//! ```no_run
//! use azcache_config::http::{build_http_client, HttpClientParams};
//!
//! let config: serde_yaml::Value = serde_yaml::from_str(r#"
//! http:
//!     timeout: 30
//!     connect_timeout: 10
//! "#).unwrap();
//!
//! let params = HttpClientParams::from_config(&config["http"]).unwrap();
//! let client = build_http_client(&params).unwrap();
//! ```
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

pub const DEFAULT_TIMEOUT: u64 = 60;
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 10;
pub const DEFAULT_USER_AGENT: &str =
    concat!("azcache/", env!("CARGO_PKG_VERSION"));

/// Parameters for configuring the HTTP client, timeouts in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpClientParams {
    pub timeout: u64,
    pub connect_timeout: u64,
    pub user_agent: String,
}

impl Default for HttpClientParams {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HttpClientParams {
    /// Creates an HttpClientParams instance from a YAML configuration.
    ///
    /// ```yaml
    /// http:
    ///     timeout: 30
    ///     connect_timeout: 10
    ///     user_agent: my-service/1.0
    /// ```
    ///
    /// Missing fields keep their defaults; a present field of the wrong type
    /// is an error.
    pub fn from_config(
        http_config: &serde_yaml::Value,
    ) -> Result<Self, ConfigError> {
        let mut params = Self::default();
        if http_config.is_null() {
            return Ok(params);
        }

        if let Some(timeout) = read_u64(http_config, "timeout")? {
            params.timeout = timeout;
        }
        if let Some(connect_timeout) = read_u64(http_config, "connect_timeout")? {
            params.connect_timeout = connect_timeout;
        }
        match &http_config["user_agent"] {
            serde_yaml::Value::Null => {}
            serde_yaml::Value::String(ua) => params.user_agent = ua.clone(),
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "http.user_agent".to_string(),
                    value: format!("{other:?}"),
                })
            }
        }

        Ok(params)
    }
}

fn read_u64(
    config: &serde_yaml::Value,
    key: &str,
) -> Result<Option<u64>, ConfigError> {
    match &config[key] {
        serde_yaml::Value::Null => Ok(None),
        value => value.as_u64().map(Some).ok_or_else(|| {
            ConfigError::InvalidValue {
                key: format!("http.{key}"),
                value: format!("{value:?}"),
            }
        }),
    }
}

/// Builds a reqwest::Client with rustls TLS, the configured timeouts and
/// user agent.
pub fn build_http_client(
    params: &HttpClientParams,
) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::ClientBuilder::new()
        .use_rustls_tls()
        .timeout(Duration::from_secs(params.timeout))
        .connect_timeout(Duration::from_secs(params.connect_timeout))
        .user_agent(params.user_agent.as_str())
        .build()
}
