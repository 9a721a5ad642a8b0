//! Azure Storage account and container settings.
use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ConfigError, HttpClientParams};

pub const ACCOUNT_NAME_ENV: &str = "AZURESTORAGE_ACCOUNT_NAME";
pub const ACCESS_KEY_ENV: &str = "AZURESTORAGE_ACCESS_KEY";
pub const NO_LOG_ERRORS_ENV: &str = "NO_LOG_AZUREBSCACHE_ERRORS";
pub const DEFAULT_CONTAINER: &str = "cache";

/// Public access level requested when the container is created.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ContainerAccess {
    /// No anonymous access.
    Private,
    /// Anonymous read access to blobs only.
    #[default]
    Blob,
    /// Anonymous read access to blobs and container listing.
    Container,
}

impl ContainerAccess {
    /// Value of the `x-ms-blob-public-access` header, if one is sent.
    pub fn header_value(self) -> Option<&'static str> {
        match self {
            ContainerAccess::Private => None,
            ContainerAccess::Blob => Some("blob"),
            ContainerAccess::Container => Some("container"),
        }
    }
}

impl FromStr for ContainerAccess {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "private" => Ok(ContainerAccess::Private),
            "blob" => Ok(ContainerAccess::Blob),
            "container" => Ok(ContainerAccess::Container),
            _ => Err(ConfigError::InvalidValue {
                key: "azure.access".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Resolved settings for one cache instance.
///
/// All fields are final once constructed: empty credentials have already been
/// replaced from the environment and the container name has been validated.
#[derive(Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub account_name: String,
    pub account_key: String,
    pub container_name: String,
    /// Blob service endpoint override, e.g. an Azurite emulator URL.
    pub endpoint: Option<String>,
    pub access: ContainerAccess,
    /// Emit warnings when best-effort operations swallow a failure.
    pub log_errors: bool,
    pub http: HttpClientParams,
}

impl CacheConfig {
    /// Resolve a config from explicit values, falling back to the process
    /// environment for empty credentials and to [`DEFAULT_CONTAINER`] for an
    /// empty container name.
    pub fn new(
        account_name: &str,
        account_key: &str,
        container_name: &str,
    ) -> Result<Self, ConfigError> {
        Self::resolve(account_name, account_key, container_name, env_lookup)
    }

    /// Resolve everything from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new("", "", "")
    }

    /// Same as [`CacheConfig::new`] with an injectable variable lookup.
    pub fn resolve<F>(
        account_name: &str,
        account_key: &str,
        container_name: &str,
        lookup: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let account_name = non_empty_or(account_name, || lookup(ACCOUNT_NAME_ENV))
            .ok_or(ConfigError::MissingCredential("account name"))?;
        let account_key = non_empty_or(account_key, || lookup(ACCESS_KEY_ENV))
            .ok_or(ConfigError::MissingCredential("account key"))?;

        let container_name = if container_name.is_empty() {
            debug!(container = DEFAULT_CONTAINER, "no container name given");
            DEFAULT_CONTAINER.to_string()
        } else {
            container_name.to_string()
        };
        validate_container_name(&container_name)?;

        let suppress = lookup(NO_LOG_ERRORS_ENV)
            .and_then(|v| parse_bool(&v))
            .unwrap_or(false);

        Ok(Self {
            account_name,
            account_key,
            container_name,
            endpoint: None,
            access: ContainerAccess::default(),
            log_errors: !suppress,
            http: HttpClientParams::default(),
        })
    }

    /// Read the `azure` section of a YAML config document.
    ///
    /// ```yaml
    /// azure:
    ///     account_name: myaccount
    ///     account_key: base64key==
    ///     container_name: pages
    ///     endpoint: http://127.0.0.1:10000/devstoreaccount1
    ///     access: private
    ///     log_errors: false
    ///     http:
    ///         timeout: 30
    /// ```
    ///
    /// Missing credentials still fall back to the environment.
    pub fn from_config(config: &serde_yaml::Value) -> Result<Self, ConfigError> {
        Self::from_config_with(config, env_lookup)
    }

    pub fn from_config_with<F>(
        config: &serde_yaml::Value,
        lookup: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let section = &config["azure"];
        let mut resolved = Self::resolve(
            read_str(section, "account_name")?.unwrap_or_default(),
            read_str(section, "account_key")?.unwrap_or_default(),
            read_str(section, "container_name")?.unwrap_or_default(),
            lookup,
        )?;

        resolved.endpoint = read_str(section, "endpoint")?
            .filter(|e| !e.is_empty())
            .map(|e| e.trim_end_matches('/').to_string());
        if let Some(access) = read_str(section, "access")? {
            resolved.access = access.parse()?;
        }
        match &section["log_errors"] {
            serde_yaml::Value::Null => {}
            serde_yaml::Value::Bool(flag) => resolved.log_errors = *flag,
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "azure.log_errors".to_string(),
                    value: format!("{other:?}"),
                })
            }
        }
        resolved.http = HttpClientParams::from_config(&section["http"])?;

        Ok(resolved)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        self.endpoint = Some(endpoint.trim_end_matches('/').to_string());
        self
    }

    pub fn with_access(mut self, access: ContainerAccess) -> Self {
        self.access = access;
        self
    }

    pub fn with_log_errors(mut self, log_errors: bool) -> Self {
        self.log_errors = log_errors;
        self
    }

    pub fn with_http(mut self, http: HttpClientParams) -> Self {
        self.http = http;
        self
    }

    /// Base URL of the blob service for this account.
    pub fn blob_endpoint(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("https://{}.blob.core.windows.net", self.account_name),
        }
    }
}

impl fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("account_name", &self.account_name)
            .field("account_key", &"<redacted>")
            .field("container_name", &self.container_name)
            .field("endpoint", &self.endpoint)
            .field("access", &self.access)
            .field("log_errors", &self.log_errors)
            .field("http", &self.http)
            .finish()
    }
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn non_empty_or<F>(value: &str, fallback: F) -> Option<String>
where
    F: FnOnce() -> Option<String>,
{
    if value.is_empty() {
        debug!("credential not given, reading environment");
        fallback().filter(|v| !v.is_empty())
    } else {
        Some(value.to_string())
    }
}

fn read_str<'a>(
    section: &'a serde_yaml::Value,
    key: &str,
) -> Result<Option<&'a str>, ConfigError> {
    match &section[key] {
        serde_yaml::Value::Null => Ok(None),
        serde_yaml::Value::String(s) => Ok(Some(s.as_str())),
        other => Err(ConfigError::InvalidValue {
            key: format!("azure.{key}"),
            value: format!("{other:?}"),
        }),
    }
}

/// Boolean parsing for environment flags.
///
/// Accepts `1`, `t`, `T`, `TRUE`, `true`, `True` and their false
/// counterparts; anything else is `None`.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Check a container name against the Blob service naming rules.
pub fn validate_container_name(name: &str) -> Result<(), ConfigError> {
    let invalid = |reason| ConfigError::InvalidContainerName {
        name: name.to_string(),
        reason,
    };

    if !(3..=63).contains(&name.len()) {
        return Err(invalid("must be 3 to 63 characters long"));
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    {
        return Err(invalid(
            "only lower-case letters, digits and hyphens are allowed",
        ));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(invalid("must start and end with a letter or digit"));
    }
    if name.contains("--") {
        return Err(invalid("consecutive hyphens are not allowed"));
    }
    Ok(())
}
