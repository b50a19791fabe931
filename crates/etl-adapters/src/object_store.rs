use async_trait::async_trait;

use crate::error::SourceError;

/// Blob storage the orchestrator and export packager depend on through this
/// trait rather than a concrete SDK, so either can be driven by a fake in
/// tests.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, SourceError>;
    async fn put(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<(), SourceError>;
}

/// [`ObjectStore`] backed by Amazon S3 (or an S3-compatible endpoint).
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }

    /// Builds a client from the ambient AWS config (environment, profile,
    /// or instance metadata), following the SDK's standard credential chain.
    pub async fn from_env() -> Self {
        let config = aws_config::load_from_env().await;
        Self::new(aws_sdk_s3::Client::new(&config))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, SourceError> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| SourceError::ObjectStore(e.to_string()))?;
        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| SourceError::ObjectStore(e.to_string()))?
            .into_bytes();
        Ok(bytes.to_vec())
    }

    async fn put(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<(), SourceError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(data.into())
            .send()
            .await
            .map_err(|e| SourceError::ObjectStore(e.to_string()))?;
        Ok(())
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod fakes {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// In-memory [`ObjectStore`] for orchestrator tests.
    #[derive(Default)]
    pub struct InMemoryObjectStore {
        objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    }

    impl InMemoryObjectStore {
        pub fn with_object(bucket: &str, key: &str, data: Vec<u8>) -> Self {
            let store = Self::default();
            store.objects.lock().unwrap().insert((bucket.to_string(), key.to_string()), data);
            store
        }
    }

    #[async_trait]
    impl ObjectStore for InMemoryObjectStore {
        async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, SourceError> {
            self.objects
                .lock()
                .unwrap()
                .get(&(bucket.to_string(), key.to_string()))
                .cloned()
                .ok_or_else(|| SourceError::ObjectStore(format!("no such object: {bucket}/{key}")))
        }

        async fn put(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<(), SourceError> {
            self.objects.lock().unwrap().insert((bucket.to_string(), key.to_string()), data);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fakes::InMemoryObjectStore;
    use super::*;

    #[tokio::test]
    async fn in_memory_store_roundtrips_put_and_get() {
        let store = InMemoryObjectStore::default();
        store.put("bucket", "key", b"hello".to_vec()).await.unwrap();
        let data = store.get("bucket", "key").await.unwrap();
        assert_eq!(data, b"hello");
    }

    #[tokio::test]
    async fn in_memory_store_errors_on_missing_key() {
        let store = InMemoryObjectStore::default();
        assert!(store.get("bucket", "missing").await.is_err());
    }
}
