//! Configuration for the azcache Azure Blob Storage cache.
//!
//! Credentials and the container name are resolved from explicit values, a
//! YAML config file, or the process environment, in that order of precedence.
pub mod azure;
pub mod config;
pub mod http;

pub use azure::{
    parse_bool, validate_container_name, CacheConfig, ContainerAccess,
    ACCESS_KEY_ENV, ACCOUNT_NAME_ENV, DEFAULT_CONTAINER, NO_LOG_ERRORS_ENV,
};
pub use config::{ConfigError, ConfigFile, Configurable};
pub use http::{build_http_client, HttpClientParams};
