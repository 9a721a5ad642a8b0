//! Azure Blob Storage backend for HTTP response caches.
//!
//! Each cache entry is one block blob in a single container; the key is the
//! blob name. There is no eviction, TTL or local tier: everything beyond get,
//! set and delete is left to the storage account.
//!
//! ```no_run
//! use azcache::{BlobCache, ResponseCache};
//!
//! # async fn example() -> Result<(), azcache::CacheError> {
//! // Empty credentials fall back to AZURESTORAGE_ACCOUNT_NAME and
//! // AZURESTORAGE_ACCESS_KEY, an empty container name to "cache".
//! let cache = BlobCache::connect("", "", "").await?;
//!
//! cache.set("example.com/index.html", b"<html></html>").await;
//! assert_eq!(
//!     cache.get("example.com/index.html").await.as_deref(),
//!     Some(&b"<html></html>"[..])
//! );
//! cache.delete("example.com/index.html").await;
//! # Ok(())
//! # }
//! ```
//!
//! The verbs of [`ResponseCache`] never fail. Use [`BlobCache::try_get`],
//! [`BlobCache::try_set`] and [`BlobCache::try_delete`] to see backend errors.
pub mod azure;
mod cache;
mod error;
mod memory;
mod store;

pub use azure::{AzureBlobClient, SharedKeyCredential};
pub use cache::{AbstractResponseCache, BlobCache, ResponseCache};
pub use error::CacheError;
pub use memory::InMemoryBlobStore;
pub use store::{AbstractBlobStore, BlobStore, MAX_KEY_CHARS};

pub use azcache_config as config;
pub use azcache_config::{CacheConfig, ContainerAccess};
