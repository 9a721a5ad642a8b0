//! In-memory implementation of the BlobStore trait. Containers must be created
//! before use, the same as against the real service.
use async_trait::async_trait;
use azcache_config::ContainerAccess;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::store::validate_key;
use crate::{BlobStore, CacheError};

type Container = HashMap<String, Vec<u8>>;

#[derive(Default)]
pub struct InMemoryBlobStore {
    pub containers: Mutex<HashMap<String, Container>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs held in `container`, `None` if it does not exist.
    pub fn blob_count(&self, container: &str) -> Option<usize> {
        self.containers
            .lock()
            .ok()?
            .get(container)
            .map(|blobs| blobs.len())
    }

    fn with_container<T>(
        &self,
        container: &str,
        f: impl FnOnce(&mut Container) -> T,
    ) -> Result<T, CacheError> {
        let mut containers = self
            .containers
            .lock()
            .map_err(|e| poisoned(e.to_string()))?;
        let blobs = containers
            .get_mut(container)
            .ok_or_else(|| container_not_found(container))?;
        Ok(f(blobs))
    }
}

fn poisoned(message: String) -> CacheError {
    CacheError::RemoteService {
        status: 500,
        code: None,
        message,
    }
}

fn container_not_found(container: &str) -> CacheError {
    CacheError::RemoteService {
        status: 404,
        code: Some("ContainerNotFound".to_string()),
        message: format!("The specified container {container} does not exist."),
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn create_container_if_not_exists(
        &self,
        container: &str,
        _access: ContainerAccess,
    ) -> Result<bool, CacheError> {
        let mut containers = self
            .containers
            .lock()
            .map_err(|e| poisoned(e.to_string()))?;
        if containers.contains_key(container) {
            return Ok(false);
        }
        containers.insert(container.to_string(), HashMap::new());
        Ok(true)
    }

    async fn get_blob(
        &self,
        container: &str,
        key: &str,
    ) -> Result<Vec<u8>, CacheError> {
        validate_key(key)?;
        self.with_container(container, |blobs| blobs.get(key).cloned())?
            .ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    async fn put_block_blob(
        &self,
        container: &str,
        key: &str,
        value: &[u8],
    ) -> Result<(), CacheError> {
        validate_key(key)?;
        self.with_container(container, |blobs| {
            blobs.insert(key.to_string(), value.to_vec());
        })
    }

    async fn delete_blob_if_exists(
        &self,
        container: &str,
        key: &str,
    ) -> Result<bool, CacheError> {
        validate_key(key)?;
        self.with_container(container, |blobs| blobs.remove(key).is_some())
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("InMemoryBlobStore");
        if let Ok(containers) = self.containers.lock() {
            for (name, blobs) in containers.iter() {
                debug.field(name, &blobs.len());
            }
        }
        debug.finish()
    }
}
