//! The condition service.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::core::{ConceptLookup, ConditionStorage, PatientLookup};
use crate::error::{ResourceError, StorageError, StorageResult};
use crate::translators::{ConditionTranslator, ResourceTranslator};
use crate::types::{ConditionResource, ConditionSearchParams};

use super::{ResourceService, check_id};

/// Serves [`ConditionResource`]s from a condition repository.
///
/// # Type Parameters
///
/// * `B` - The backend, providing the repository and the lookups the
///   translator resolves references through
pub struct ConditionService<B> {
    backend: Arc<B>,
}

impl<B> Clone for ConditionService<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B> ConditionService<B>
where
    B: ConditionStorage + ConceptLookup + PatientLookup + 'static,
{
    /// Creates a service over `backend`.
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Returns the backend.
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    fn translator(&self) -> ConditionTranslator<'_> {
        ConditionTranslator::new(self.backend.as_ref(), self.backend.as_ref())
    }
}

#[async_trait]
impl<B> ResourceService for ConditionService<B>
where
    B: ConditionStorage + ConceptLookup + PatientLookup + 'static,
{
    type Resource = ConditionResource;
    type Params = ConditionSearchParams;

    async fn get(&self, id: &str) -> StorageResult<Option<ConditionResource>> {
        match self.backend.get_condition_by_uuid(id).await? {
            Some(record) => Ok(Some(self.translator().to_external(&record)?)),
            None => Ok(None),
        }
    }

    async fn search(&self, params: &ConditionSearchParams) -> StorageResult<Vec<ConditionResource>> {
        let records = self.backend.search_conditions(params).await?;
        let translator = self.translator();
        records.iter().map(|r| translator.to_external(r)).collect()
    }

    async fn create(&self, resource: ConditionResource) -> StorageResult<ConditionResource> {
        if let Some(id) = resource.id.as_deref() {
            if self.backend.get_condition_by_uuid(id).await?.is_some() {
                return Err(StorageError::Resource(ResourceError::AlreadyExists {
                    resource_type: "Condition".to_string(),
                    id: id.to_string(),
                }));
            }
        }

        let record = self.translator().to_internal(None, &resource)?;
        let saved = self.backend.save_condition(record).await?;
        debug!(uuid = %saved.uuid, "created condition");
        self.translator().to_external(&saved)
    }

    async fn update(&self, id: &str, resource: ConditionResource) -> StorageResult<ConditionResource> {
        check_id(id, resource.id.as_deref())?;

        let existing = self
            .backend
            .get_condition_by_uuid(id)
            .await?
            .ok_or_else(|| {
                StorageError::Resource(ResourceError::NotFound {
                    resource_type: "Condition".to_string(),
                    id: id.to_string(),
                })
            })?;

        let record = self.translator().to_internal(Some(existing), &resource)?;
        let saved = self.backend.save_condition(record).await?;
        debug!(uuid = %saved.uuid, "updated condition");
        self.translator().to_external(&saved)
    }

    async fn void(&self, id: &str, reason: &str) -> StorageResult<ConditionResource> {
        let voided = self.backend.void_condition(id, reason).await?;
        self.translator().to_external(&voided)
    }
}
