//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::SampleRecord;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreateSampleParams {
    pub foo: String,
    pub int_val: i64,
}

/// Partial-update parameters for a sample.
///
/// Sentinel semantics inherited from the wire format: `foo` is applied only
/// when non-empty and `int_val` only when non-zero. A field left at its
/// sentinel is not touched, which also means an explicit "reset to empty/zero"
/// cannot be expressed through this path.
#[derive(Debug, Clone, Default)]
pub struct UpdateSampleParams {
    pub foo: String,
    pub int_val: i64,
}

impl UpdateSampleParams {
    /// True when neither field would be applied.
    pub fn is_noop(&self) -> bool {
        self.foo.is_empty() && self.int_val == 0
    }
}

/// CRUD contract for the `sample` entity. The store is the sole owner of
/// durable state; the cache layer never writes through it.
#[async_trait]
pub trait SamplesRepo: Send + Sync {
    /// Insert a sample and return its assigned id.
    async fn create_sample(&self, params: CreateSampleParams) -> Result<i64, RepoError>;

    /// Fetch one sample; absence is `RepoError::NotFound`.
    async fn get_sample(&self, id: i64) -> Result<SampleRecord, RepoError>;

    /// All samples ordered by id ascending.
    async fn list_samples(&self) -> Result<Vec<SampleRecord>, RepoError>;

    /// Apply a partial update and return the number of rows affected.
    async fn update_sample(&self, id: i64, params: UpdateSampleParams) -> Result<u64, RepoError>;

    /// Cheap liveness probe against the backend.
    async fn health_check(&self) -> Result<(), RepoError>;
}
