//! The remote calls the cache is built on.
//!
//! A [`BlobStore`] speaks in containers and blob names. It knows nothing about
//! caching; [`crate::BlobCache`] layers the cache verbs on top.
use async_trait::async_trait;
use azcache_config::ContainerAccess;
use std::sync::Arc;

use crate::CacheError;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Create the container unless it already exists. Returns `true` when this
    /// call created it.
    async fn create_container_if_not_exists(
        &self,
        container: &str,
        access: ContainerAccess,
    ) -> Result<bool, CacheError>;

    /// Read a whole blob. Fails with [`CacheError::NotFound`] when it does not
    /// exist and [`CacheError::BodyRead`] when it exists but the body cannot be
    /// read.
    async fn get_blob(
        &self,
        container: &str,
        key: &str,
    ) -> Result<Vec<u8>, CacheError>;

    /// Upload `value` as a single block blob, replacing any existing blob.
    async fn put_block_blob(
        &self,
        container: &str,
        key: &str,
        value: &[u8],
    ) -> Result<(), CacheError>;

    /// Delete the blob if present. Returns whether it existed.
    async fn delete_blob_if_exists(
        &self,
        container: &str,
        key: &str,
    ) -> Result<bool, CacheError>;
}

pub type AbstractBlobStore = Arc<dyn BlobStore>;

#[async_trait]
impl<S> BlobStore for Arc<S>
where
    S: BlobStore + ?Sized,
{
    async fn create_container_if_not_exists(
        &self,
        container: &str,
        access: ContainerAccess,
    ) -> Result<bool, CacheError> {
        (**self).create_container_if_not_exists(container, access).await
    }

    async fn get_blob(
        &self,
        container: &str,
        key: &str,
    ) -> Result<Vec<u8>, CacheError> {
        (**self).get_blob(container, key).await
    }

    async fn put_block_blob(
        &self,
        container: &str,
        key: &str,
        value: &[u8],
    ) -> Result<(), CacheError> {
        (**self).put_block_blob(container, key, value).await
    }

    async fn delete_blob_if_exists(
        &self,
        container: &str,
        key: &str,
    ) -> Result<bool, CacheError> {
        (**self).delete_blob_if_exists(container, key).await
    }
}

/// Reject keys the Blob service cannot name.
///
/// `.` and `..` segments are dropped by URL path normalization, so `a/./b`
/// would address the same blob as `a/b` and `.` the container itself.
pub fn validate_key(key: &str) -> Result<(), CacheError> {
    if key.is_empty()
        || key.chars().count() > MAX_KEY_CHARS
        || key.split('/').any(|segment| segment == "." || segment == "..")
    {
        return Err(CacheError::InvalidKey(key.to_string()));
    }
    Ok(())
}

pub const MAX_KEY_CHARS: usize = 1024;
