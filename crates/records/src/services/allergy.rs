//! The allergy service.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::core::{AllergyStorage, ConceptLookup, GlobalPropertyResolver, PatientLookup};
use crate::error::{ResourceError, StorageError, StorageResult};
use crate::translators::{AllergyTranslator, ResourceTranslator};
use crate::types::{AllergyIntoleranceResource, AllergySearchParams};
use crate::vocabulary::VocabularyConfig;

use super::{ResourceService, check_id};

const RESOURCE_TYPE: &str = "AllergyIntolerance";

/// Serves [`AllergyIntoleranceResource`]s from an allergy repository.
///
/// Severities are translated with the global property keys named in the
/// service's [`VocabularyConfig`]; it should match the one the backend
/// searches with.
pub struct AllergyIntoleranceService<B> {
    backend: Arc<B>,
    vocabulary: Arc<VocabularyConfig>,
}

impl<B> Clone for AllergyIntoleranceService<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            vocabulary: Arc::clone(&self.vocabulary),
        }
    }
}

impl<B> AllergyIntoleranceService<B>
where
    B: AllergyStorage + ConceptLookup + PatientLookup + GlobalPropertyResolver + 'static,
{
    /// Creates a service over `backend`.
    pub fn new(backend: Arc<B>, vocabulary: VocabularyConfig) -> Self {
        Self {
            backend,
            vocabulary: Arc::new(vocabulary),
        }
    }

    /// Returns the backend.
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    fn translator(&self) -> AllergyTranslator<'_> {
        let backend = self.backend.as_ref();
        AllergyTranslator::new(backend, backend, backend, &self.vocabulary)
    }

    fn not_found(id: &str) -> StorageError {
        StorageError::Resource(ResourceError::NotFound {
            resource_type: RESOURCE_TYPE.to_string(),
            id: id.to_string(),
        })
    }
}

#[async_trait]
impl<B> ResourceService for AllergyIntoleranceService<B>
where
    B: AllergyStorage + ConceptLookup + PatientLookup + GlobalPropertyResolver + 'static,
{
    type Resource = AllergyIntoleranceResource;
    type Params = AllergySearchParams;

    async fn get(&self, id: &str) -> StorageResult<Option<AllergyIntoleranceResource>> {
        match self.backend.get_allergy_by_uuid(id).await? {
            Some(record) => Ok(Some(self.translator().to_external(&record)?)),
            None => Ok(None),
        }
    }

    async fn search(
        &self,
        params: &AllergySearchParams,
    ) -> StorageResult<Vec<AllergyIntoleranceResource>> {
        let records = self.backend.search_allergies(params).await?;
        let translator = self.translator();
        records.iter().map(|r| translator.to_external(r)).collect()
    }

    async fn create(
        &self,
        resource: AllergyIntoleranceResource,
    ) -> StorageResult<AllergyIntoleranceResource> {
        if let Some(id) = resource.id.as_deref() {
            if self.backend.get_allergy_by_uuid(id).await?.is_some() {
                return Err(StorageError::Resource(ResourceError::AlreadyExists {
                    resource_type: RESOURCE_TYPE.to_string(),
                    id: id.to_string(),
                }));
            }
        }

        let record = self.translator().to_internal(None, &resource)?;
        let saved = self.backend.save_allergy(record).await?;
        debug!(uuid = %saved.uuid, "created allergy");
        self.translator().to_external(&saved)
    }

    async fn update(
        &self,
        id: &str,
        resource: AllergyIntoleranceResource,
    ) -> StorageResult<AllergyIntoleranceResource> {
        check_id(id, resource.id.as_deref())?;

        let existing = self
            .backend
            .get_allergy_by_uuid(id)
            .await?
            .ok_or_else(|| Self::not_found(id))?;

        let record = self.translator().to_internal(Some(existing), &resource)?;
        let saved = self.backend.save_allergy(record).await?;
        debug!(uuid = %saved.uuid, "updated allergy");
        self.translator().to_external(&saved)
    }

    async fn void(&self, id: &str, reason: &str) -> StorageResult<AllergyIntoleranceResource> {
        let voided = self.backend.void_allergy(id, reason).await?;
        self.translator().to_external(&voided)
    }
}
