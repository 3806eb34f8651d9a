use crate::backend::types::{Filter, ReadRequest};
use crate::error::BackendError;
use async_trait::async_trait;
use serde_json::Value;

/// Common trait for the tabular stores the browser talks to.
/// Rows travel as JSON objects; callers decode them into models.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Run a read and return the matching rows in request order
    async fn select(&self, request: &ReadRequest) -> Result<Vec<Value>, BackendError>;

    /// Insert one row and return it as stored
    async fn insert(&self, table: &str, row: Value) -> Result<Value, BackendError>;

    /// Patch every row matching `filters` and return the updated rows
    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Value,
    ) -> Result<Vec<Value>, BackendError>;

    /// Delete every row matching `filters` and return how many went away
    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<usize, BackendError>;

    /// Get the name of the backend
    fn backend_name(&self) -> &'static str;
}
