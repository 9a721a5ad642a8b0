use azcache_config::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Remote service error ({status}{}): {message}", fmt_code(.code))]
    RemoteService {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Failed to read blob body for {key}: {reason}")]
    BodyRead { key: String, reason: String },

    #[error("Invalid blob key {0:?}")]
    InvalidKey(String),

    #[error("Payload of {size} bytes exceeds the {limit} byte single upload limit")]
    PayloadTooLarge { size: u64, limit: u64 },

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

fn fmt_code(code: &Option<String>) -> String {
    code.as_deref().map(|c| format!(" {c}")).unwrap_or_default()
}

impl CacheError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound(_))
    }

    /// True for failures of the remote service or the path to it, as opposed
    /// to misuse of the cache (bad key, bad config).
    pub fn is_backend(&self) -> bool {
        matches!(
            self,
            CacheError::Connection(_)
                | CacheError::RemoteService { .. }
                | CacheError::BodyRead { .. }
                | CacheError::Transport(_)
        )
    }
}
