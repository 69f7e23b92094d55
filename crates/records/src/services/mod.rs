//! Resource services.
//!
//! The facade a resource-provider boundary calls: every operation takes and
//! returns external representations, translating through the resource
//! translators and persisting through the record repositories.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use helios_records::backends::sqlite::SqliteBackend;
//! use helios_records::services::{ConditionService, ResourceService};
//! use helios_records::types::ConditionSearchParams;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = SqliteBackend::in_memory()?;
//! backend.init_schema()?;
//!
//! let service = ConditionService::new(Arc::new(backend));
//! let all = service.search(&ConditionSearchParams::new()).await?;
//! assert!(all.is_empty());
//! # Ok(())
//! # }
//! ```

mod allergy;
mod condition;

use async_trait::async_trait;

use crate::error::{StorageResult, ValidationError};

pub use allergy::AllergyIntoleranceService;
pub use condition::ConditionService;

/// Operations on one resource type in terms of its external representation.
#[async_trait]
pub trait ResourceService: Send + Sync {
    /// The external representation.
    type Resource: Send + Sync;
    /// The search parameter set.
    type Params: Send + Sync;

    /// Reads a resource by id.
    async fn get(&self, id: &str) -> StorageResult<Option<Self::Resource>>;

    /// Searches for resources.
    async fn search(&self, params: &Self::Params) -> StorageResult<Vec<Self::Resource>>;

    /// Creates a resource, generating its id when it carries none.
    ///
    /// # Errors
    ///
    /// * `ResourceError::AlreadyExists` - If a record already has the id
    async fn create(&self, resource: Self::Resource) -> StorageResult<Self::Resource>;

    /// Updates the resource with the given id.
    ///
    /// # Errors
    ///
    /// * `ValidationError::IdMismatch` - If the body carries a different id
    /// * `ResourceError::NotFound` - If no record has the id
    async fn update(&self, id: &str, resource: Self::Resource) -> StorageResult<Self::Resource>;

    /// Voids the resource with the given id.
    async fn void(&self, id: &str, reason: &str) -> StorageResult<Self::Resource>;
}

/// Rejects a body id that differs from the id being updated.
fn check_id(expected: &str, body_id: Option<&str>) -> StorageResult<()> {
    match body_id {
        Some(body_id) if body_id != expected => Err(ValidationError::IdMismatch {
            expected_id: expected.to_string(),
            body_id: body_id.to_string(),
        }
        .into()),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_id() {
        assert!(check_id("c-1", None).is_ok());
        assert!(check_id("c-1", Some("c-1")).is_ok());
        assert!(check_id("c-1", Some("c-2")).is_err());
    }
}
