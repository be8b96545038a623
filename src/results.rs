//! Persistence hand-off for finished validations.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;

use crate::orchestrator::ValidationResult;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("result store unavailable: {0}")]
    Unavailable(String),
    #[error("result {id} could not be stored: {message}")]
    Write { id: String, message: String },
}

/// Where finished results go. Failures are logged by the caller and never
/// fail a validation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn store(&self, result: &ValidationResult) -> Result<(), StoreError>;

    async fn get(&self, id: &str) -> Result<Option<ValidationResult>, StoreError>;
}

#[derive(Default)]
pub struct MemoryResultStore {
    results: RwLock<HashMap<String, ValidationResult>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.results.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.read().is_empty()
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn store(&self, result: &ValidationResult) -> Result<(), StoreError> {
        self.results.write().insert(result.id.clone(), result.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<ValidationResult>, StoreError> {
        Ok(self.results.read().get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_and_fetches_by_id() {
        let store = MemoryResultStore::new();
        let result = ValidationResult::errored("a@example.com", "boom");

        store.store(&result).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&result.id).await.unwrap(), Some(result));
        assert_eq!(store.get("missing").await.unwrap(), None);
    }
}
