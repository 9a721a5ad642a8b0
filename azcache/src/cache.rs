use async_trait::async_trait;
use azcache_config::CacheConfig;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{AzureBlobClient, BlobStore, CacheError};

/// Cache verbs an HTTP response cache layer relies on.
///
/// None of them fail: a read failure is a miss, a write failure is dropped and
/// a delete failure reports that nothing was deleted.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Cached value for `key`, `None` on a miss.
    async fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &[u8]);

    /// Remove `key`. Returns whether a value was present.
    async fn delete(&self, key: &str) -> bool;
}

pub type AbstractResponseCache = Arc<dyn ResponseCache>;

/// Cache storing each entry as one blob in a single container.
#[derive(Debug)]
pub struct BlobCache<S = AzureBlobClient> {
    store: S,
    config: CacheConfig,
    container_created: bool,
}

impl BlobCache<AzureBlobClient> {
    /// Connect with explicit credentials. Empty values fall back to
    /// `AZURESTORAGE_ACCOUNT_NAME`, `AZURESTORAGE_ACCESS_KEY` and the `cache`
    /// container.
    pub async fn connect(
        account_name: &str,
        account_key: &str,
        container_name: &str,
    ) -> Result<Self, CacheError> {
        let config = CacheConfig::new(account_name, account_key, container_name)?;
        Self::new(config).await
    }

    /// Connect to the Blob service described by `config` and make sure the
    /// container exists.
    pub async fn new(config: CacheConfig) -> Result<Self, CacheError> {
        let client = AzureBlobClient::new(&config)?;
        Self::with_store(client, config).await
    }
}

impl<S> BlobCache<S>
where
    S: BlobStore,
{
    /// Wrap an existing store, creating the configured container if missing.
    pub async fn with_store(
        store: S,
        config: CacheConfig,
    ) -> Result<Self, CacheError> {
        let container_created = store
            .create_container_if_not_exists(&config.container_name, config.access)
            .await?;

        if container_created {
            info!(container = %config.container_name, "cache container created");
        } else {
            debug!(container = %config.container_name, "using existing cache container");
        }

        Ok(Self {
            store,
            config,
            container_created,
        })
    }

    /// Whether construction created the container.
    pub fn container_created(&self) -> bool {
        self.container_created
    }

    pub fn container(&self) -> &str {
        &self.config.container_name
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read `key`. A missing blob is `Ok(None)`; a blob whose body could not
    /// be read is [`CacheError::BodyRead`].
    pub async fn try_get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        match self.store.get_blob(self.container(), key).await {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Upload `value` under `key`, last writer wins.
    pub async fn try_set(&self, key: &str, value: &[u8]) -> Result<(), CacheError> {
        self.store.put_block_blob(self.container(), key, value).await
    }

    /// Delete `key`. Returns whether the blob existed.
    pub async fn try_delete(&self, key: &str) -> Result<bool, CacheError> {
        self.store.delete_blob_if_exists(self.container(), key).await
    }

    fn log_failure(&self, op: &str, key: &str, err: &CacheError) {
        if self.config.log_errors {
            warn!(op, key, error = %err, "azcache.{op} failed");
        }
    }
}

#[async_trait]
impl<S> ResponseCache for BlobCache<S>
where
    S: BlobStore,
{
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        match self.try_get(key).await {
            Ok(value) => value,
            Err(err) => {
                self.log_failure("get", key, &err);
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &[u8]) {
        if let Err(err) = self.try_set(key, value).await {
            self.log_failure("set", key, &err);
        }
    }

    async fn delete(&self, key: &str) -> bool {
        match self.try_delete(key).await {
            Ok(existed) => {
                if self.config.log_errors {
                    debug!(key, existed, "azcache.delete result");
                }
                existed
            }
            Err(err) => {
                self.log_failure("delete", key, &err);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AbstractBlobStore, InMemoryBlobStore};
    use azcache_config::ContainerAccess;

    fn config(container: &str) -> CacheConfig {
        CacheConfig::resolve("acct", "a2V5", container, |_| None).unwrap()
    }

    async fn memory_cache() -> BlobCache<Arc<InMemoryBlobStore>> {
        BlobCache::with_store(Arc::new(InMemoryBlobStore::new()), config(""))
            .await
            .unwrap()
    }

    /// Store whose every call fails the way an unreachable service would.
    struct BrokenStore;

    #[async_trait]
    impl BlobStore for BrokenStore {
        async fn create_container_if_not_exists(
            &self,
            _container: &str,
            _access: ContainerAccess,
        ) -> Result<bool, CacheError> {
            Ok(false)
        }

        async fn get_blob(
            &self,
            _container: &str,
            key: &str,
        ) -> Result<Vec<u8>, CacheError> {
            Err(CacheError::BodyRead {
                key: key.to_string(),
                reason: "connection reset".to_string(),
            })
        }

        async fn put_block_blob(
            &self,
            _container: &str,
            _key: &str,
            _value: &[u8],
        ) -> Result<(), CacheError> {
            Err(CacheError::RemoteService {
                status: 503,
                code: Some("ServerBusy".to_string()),
                message: "busy".to_string(),
            })
        }

        async fn delete_blob_if_exists(
            &self,
            _container: &str,
            _key: &str,
        ) -> Result<bool, CacheError> {
            Err(CacheError::Connection("refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = memory_cache().await;
        cache.set("mykey", b"payload").await;
        assert_eq!(cache.get("mykey").await, Some(b"payload".to_vec()));
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let cache = memory_cache().await;
        assert_eq!(cache.get("never-set").await, None);
        assert!(cache.try_get("never-set").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_then_get() {
        let cache = memory_cache().await;
        cache.set("mykey", b"payload").await;
        assert!(cache.delete("mykey").await);
        assert_eq!(cache.get("mykey").await, None);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let cache = memory_cache().await;
        assert!(!cache.delete("ghost").await);
        assert!(!cache.try_delete("ghost").await.unwrap());
        assert_eq!(cache.store().blob_count("cache"), Some(0));
    }

    #[tokio::test]
    async fn test_overwrite() {
        let cache = memory_cache().await;
        cache.set("k", b"v1").await;
        cache.set("k", b"v2").await;
        assert_eq!(cache.get("k").await, Some(b"v2".to_vec()));
        assert_eq!(cache.store().blob_count("cache"), Some(1));
    }

    #[tokio::test]
    async fn test_empty_value_round_trips() {
        let cache = memory_cache().await;
        cache.set("empty", b"").await;
        assert_eq!(cache.get("empty").await, Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_container_created_flag() {
        let store = Arc::new(InMemoryBlobStore::new());

        let first = BlobCache::with_store(store.clone(), config("pages"))
            .await
            .unwrap();
        assert!(first.container_created());
        assert_eq!(first.container(), "pages");

        let second = BlobCache::with_store(store.clone(), config("pages"))
            .await
            .unwrap();
        assert!(!second.container_created());
    }

    #[tokio::test]
    async fn test_shared_store_sees_writes() {
        let store = Arc::new(InMemoryBlobStore::new());
        let writer = BlobCache::with_store(store.clone(), config(""))
            .await
            .unwrap();
        let reader = BlobCache::with_store(store, config("")).await.unwrap();

        writer.set("shared", b"hello").await;
        assert_eq!(reader.get("shared").await, Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn test_best_effort_verbs_swallow_failures() {
        let cache = BlobCache::with_store(BrokenStore, config("").with_log_errors(false))
            .await
            .unwrap();

        assert_eq!(cache.get("k").await, None);
        cache.set("k", b"v").await;
        assert!(!cache.delete("k").await);
    }

    #[tokio::test]
    async fn test_typed_verbs_surface_failures() {
        let cache = BlobCache::with_store(BrokenStore, config("")).await.unwrap();

        let err = cache.try_get("k").await.unwrap_err();
        assert!(matches!(err, CacheError::BodyRead { .. }));

        let err = cache.try_set("k", b"v").await.unwrap_err();
        assert!(matches!(err, CacheError::RemoteService { status: 503, .. }));

        let err = cache.try_delete("k").await.unwrap_err();
        assert!(matches!(err, CacheError::Connection(_)));
    }

    #[tokio::test]
    async fn test_usable_as_trait_object() {
        let cache: AbstractResponseCache = Arc::new(memory_cache().await);
        cache.set("dyn", b"value").await;
        assert_eq!(cache.get("dyn").await, Some(b"value".to_vec()));
        assert!(cache.delete("dyn").await);
    }

    #[tokio::test]
    async fn test_type_erased_stores() {
        let memory = Arc::new(InMemoryBlobStore::new());
        let stores: Vec<AbstractBlobStore> = vec![
            memory.clone() as AbstractBlobStore,
            Arc::new(BrokenStore) as AbstractBlobStore,
        ];

        let mut caches = Vec::new();
        for store in stores {
            let quiet = config("").with_log_errors(false);
            let cache = BlobCache::with_store(store, quiet).await.unwrap();
            caches.push(cache);
        }

        for cache in &caches {
            cache.set("k", b"v").await;
        }
        assert_eq!(caches[0].get("k").await, Some(b"v".to_vec()));
        assert_eq!(caches[1].get("k").await, None);
        assert_eq!(memory.blob_count("cache"), Some(1));
    }
}
